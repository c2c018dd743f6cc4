//! The pluggable mapping between record members and index fields
//!
//! A [`Mapping`] tells the translator how member chains become dotted field paths, how record
//! types become document types, and how captured values become the JSON scalars the index
//! actually holds. Implementations must be stateless (or otherwise safe for concurrent reads);
//! translator calls are arbitrarily interleaved and the translator never mutates a mapping.

use serde_json::Value;

use crate::criteria::Criterion;
use crate::expressions::{MemberRef, Scalar};
use crate::{ElasticResult, Error};

/// The sentinel declaring type whose members address document metadata rather than source fields.
/// See [`MetaFieldsMapping`].
pub const DOCUMENT_METADATA_TYPE: &str = "DocumentMetadata";

/// How enum values format into index terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumFormat {
    /// The symbolic name of the value; an ordinal with no defined symbol is a domain error.
    #[default]
    Symbol,
    /// The underlying ordinal.
    Ordinal,
}

/// Capability set the translator consumes to resolve names and format values.
pub trait Mapping: Send + Sync {
    /// The index field name for a single member of a chain.
    fn field_segment(&self, member: &MemberRef) -> String;

    /// Prefix inserted before every member chain when the record lives nested inside a wrapper
    /// document, or `None` when records are indexed at the top level.
    fn document_mapping_prefix(&self, type_name: &str) -> Option<String> {
        let _ = type_name;
        None
    }

    /// The document type derived from a record type name.
    fn document_type(&self, type_name: &str) -> String;

    /// Converts a captured value into the JSON scalar to put on the wire for the given member.
    fn format_value(&self, member: &MemberRef, value: &Scalar) -> ElasticResult<Value>;

    /// An additional criterion AND-ed at the request root to restrict results to documents of the
    /// intended type, or `None` when the index holds only one record kind.
    fn type_selection_criteria(&self, doc_type: &str) -> Option<Criterion> {
        let _ = doc_type;
        None
    }
}

/// The standard mapping: camelCase field names, camelCase pluralized document types, symbolic
/// enum formatting, and lower-cased terms for analyzed string fields so emitted terms match the
/// index's analyzed tokens.
#[derive(Debug, Clone, Default)]
pub struct DefaultMapping {
    pub enum_format: EnumFormat,
    /// Set to keep analyzed string terms in their original case.
    pub preserve_case: bool,
}

impl DefaultMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enum_format(mut self, enum_format: EnumFormat) -> Self {
        self.enum_format = enum_format;
        self
    }

    fn format_string(&self, member: &MemberRef, value: &str) -> Value {
        if self.preserve_case || member.not_analyzed {
            Value::String(value.to_string())
        } else {
            Value::String(value.to_lowercase())
        }
    }
}

impl Mapping for DefaultMapping {
    fn field_segment(&self, member: &MemberRef) -> String {
        match &member.name_override {
            Some(name) => name.clone(),
            None => camel_case(&member.name),
        }
    }

    fn document_type(&self, type_name: &str) -> String {
        pluralize(&camel_case(type_name))
    }

    fn format_value(&self, member: &MemberRef, value: &Scalar) -> ElasticResult<Value> {
        match value {
            Scalar::Enum(e) => match self.enum_format {
                EnumFormat::Symbol => match &e.symbol {
                    Some(symbol) => Ok(self.format_string(member, symbol)),
                    None => Err(Error::domain_range(format!(
                        "ordinal {} is not defined on enum {}",
                        e.ordinal, e.type_name
                    ))),
                },
                EnumFormat::Ordinal => Ok(Value::Number(e.ordinal.into())),
            },
            Scalar::String(s) => Ok(self.format_string(member, s)),
            Scalar::Sequence(items) => items
                .iter()
                .map(|item| self.format_value(member, item))
                .collect::<ElasticResult<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other.to_json()),
        }
    }
}

/// Decorates an inner mapping for records stored nested inside a wrapper document: every field
/// path gains a fixed prefix and, when a type field is configured, a term over it selects the
/// intended record kind.
#[derive(Debug, Clone)]
pub struct PrefixedMapping<M> {
    inner: M,
    prefix: String,
    type_field: Option<String>,
}

impl<M> PrefixedMapping<M> {
    pub fn new(inner: M, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
            type_field: None,
        }
    }

    /// Configures the wrapper field holding the record kind, e.g. `type` for a `doc.type` term.
    pub fn with_type_field(mut self, type_field: impl Into<String>) -> Self {
        self.type_field = Some(type_field.into());
        self
    }
}

impl<M: Mapping> Mapping for PrefixedMapping<M> {
    fn field_segment(&self, member: &MemberRef) -> String {
        self.inner.field_segment(member)
    }

    fn document_mapping_prefix(&self, type_name: &str) -> Option<String> {
        let _ = type_name;
        Some(self.prefix.clone())
    }

    fn document_type(&self, type_name: &str) -> String {
        self.inner.document_type(type_name)
    }

    fn format_value(&self, member: &MemberRef, value: &Scalar) -> ElasticResult<Value> {
        self.inner.format_value(member, value)
    }

    fn type_selection_criteria(&self, doc_type: &str) -> Option<Criterion> {
        let type_field = self.type_field.as_ref()?;
        Criterion::term(
            format!("{}.{}", self.prefix, type_field),
            Value::String(doc_type.to_string()),
        )
        .ok()
    }
}

/// Decorates an inner mapping to short-circuit the virtual members of the document-metadata
/// sentinel type onto engine fields (`Id` to `_id`, `Score` to `_score`) before delegating
/// everything else.
#[derive(Debug, Clone)]
pub struct MetaFieldsMapping<M> {
    inner: M,
}

impl<M> MetaFieldsMapping<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<M: Mapping> Mapping for MetaFieldsMapping<M> {
    fn field_segment(&self, member: &MemberRef) -> String {
        if member.declaring_type == DOCUMENT_METADATA_TYPE {
            match member.name.as_str() {
                "Id" => return "_id".to_string(),
                "Score" => return "_score".to_string(),
                _ => {}
            }
        }
        self.inner.field_segment(member)
    }

    fn document_mapping_prefix(&self, type_name: &str) -> Option<String> {
        self.inner.document_mapping_prefix(type_name)
    }

    fn document_type(&self, type_name: &str) -> String {
        self.inner.document_type(type_name)
    }

    fn format_value(&self, member: &MemberRef, value: &Scalar) -> ElasticResult<Value> {
        self.inner.format_value(member, value)
    }

    fn type_selection_criteria(&self, doc_type: &str) -> Option<Criterion> {
        self.inner.type_selection_criteria(doc_type)
    }
}

/// Lower-cases the first character, leaving the rest of the name alone.
fn camel_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Naive English pluralization, enough for conventional record type names.
fn pluralize(name: &str) -> String {
    if name.ends_with('s') || name.ends_with('x') || name.ends_with('z')
        || name.ends_with("ch") || name.ends_with("sh")
    {
        format!("{name}es")
    } else if let Some(stem) = name.strip_suffix('y') {
        match stem.chars().last() {
            Some(c) if !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u') => format!("{stem}ies"),
            _ => format!("{name}s"),
        }
    } else {
        format!("{name}s")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::expressions::EnumValue;

    #[test]
    fn test_camel_case_segments() {
        let mapping = DefaultMapping::new();
        assert_eq!(
            mapping.field_segment(&MemberRef::new("Robot", "InvoicePrice")),
            "invoicePrice"
        );
        assert_eq!(mapping.field_segment(&MemberRef::new("Robot", "cost")), "cost");
    }

    #[test]
    fn test_name_override_wins() {
        let mapping = DefaultMapping::new();
        let member = MemberRef::new("Robot", "InvoicePrice").with_name_override("invoice_price");
        assert_eq!(mapping.field_segment(&member), "invoice_price");
    }

    #[test]
    fn test_document_type_pluralizes() {
        let mapping = DefaultMapping::new();
        let cases = [
            ("Robot", "robots"),
            ("Address", "addresses"),
            ("Category", "categories"),
            ("Day", "days"),
            ("Box", "boxes"),
        ];
        for (type_name, expected) in cases {
            assert_eq!(mapping.document_type(type_name), expected);
        }
    }

    #[test]
    fn test_analyzed_strings_lower_case() {
        let mapping = DefaultMapping::new();
        let analyzed = MemberRef::new("Robot", "Name");
        assert_eq!(
            mapping.format_value(&analyzed, &Scalar::from("Marvin")).unwrap(),
            json!("marvin")
        );

        let keyword = MemberRef::new("Robot", "Name").not_analyzed();
        assert_eq!(
            mapping.format_value(&keyword, &Scalar::from("Marvin")).unwrap(),
            json!("Marvin")
        );
    }

    #[test]
    fn test_enum_formats() {
        let member = MemberRef::new("Robot", "Zone").not_analyzed();
        let defined = Scalar::from(EnumValue::new("Zone", "Secure", 2));
        let undefined = Scalar::from(EnumValue::undefined("Zone", 9));

        let symbolic = DefaultMapping::new();
        assert_eq!(
            symbolic.format_value(&member, &defined).unwrap(),
            json!("Secure")
        );
        assert!(matches!(
            symbolic.format_value(&member, &undefined),
            Err(Error::DomainRange(_))
        ));

        let ordinal = DefaultMapping::new().with_enum_format(EnumFormat::Ordinal);
        assert_eq!(ordinal.format_value(&member, &defined).unwrap(), json!(2));
        assert_eq!(ordinal.format_value(&member, &undefined).unwrap(), json!(9));
    }

    #[test]
    fn test_sequence_values_format_elementwise() {
        let mapping = DefaultMapping::new();
        let member = MemberRef::new("Robot", "Name");
        let value = Scalar::Sequence(vec![Scalar::from("Robbie"), Scalar::Null]);
        assert_eq!(
            mapping.format_value(&member, &value).unwrap(),
            json!(["robbie", null])
        );
    }

    #[test]
    fn test_prefixed_mapping() {
        let mapping = PrefixedMapping::new(DefaultMapping::new(), "doc").with_type_field("type");
        assert_eq!(mapping.document_mapping_prefix("Robot"), Some("doc".to_string()));
        assert_eq!(
            mapping.type_selection_criteria("robots"),
            Some(Criterion::term("doc.type", json!("robots")).unwrap())
        );
    }

    #[test]
    fn test_meta_fields_mapping() {
        let mapping = MetaFieldsMapping::new(DefaultMapping::new());
        assert_eq!(
            mapping.field_segment(&MemberRef::new(DOCUMENT_METADATA_TYPE, "Id")),
            "_id"
        );
        assert_eq!(
            mapping.field_segment(&MemberRef::new(DOCUMENT_METADATA_TYPE, "Score")),
            "_score"
        );
        // Everything else still goes through the inner mapping.
        assert_eq!(
            mapping.field_segment(&MemberRef::new("Robot", "Name")),
            "name"
        );
    }
}
