//! Assembly of the search-request shell around a translated filter

use serde::Serialize;
use tracing::debug;

use crate::criteria::{AndCriterion, ConstantCriterion, Criterion};
use crate::expressions::Expression;
use crate::mapping::Mapping;
use crate::translate::translate_predicate;
use crate::ElasticResult;

/// A search request ready to serialize as the body of a `_search` call. The document type routes
/// the request path and therefore stays out of the body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    #[serde(skip)]
    pub doc_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Criterion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Criterion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
}

impl SearchRequest {
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_from(mut self, from: u64) -> Self {
        self.from = Some(from);
        self
    }
}

/// Translates `predicate` over the given record type and wraps the result as a request filter,
/// AND-ing in the mapping's type-selection criterion. The query slot stays empty on the pure
/// filter path.
///
/// A predicate that reduced to `TRUE` leaves only the type-selection criterion (or no filter at
/// all); one that reduced to `FALSE` stays `FALSE` and matches nothing.
pub fn build_search_request<M: Mapping + ?Sized>(
    record_type: &str,
    predicate: &Expression,
    mapping: &M,
) -> ElasticResult<SearchRequest> {
    let doc_type = mapping.document_type(record_type);
    let translated = translate_predicate(predicate, mapping)?;
    let filter = match (translated, mapping.type_selection_criteria(&doc_type)) {
        (Criterion::Constant(ConstantCriterion::True), selection) => selection,
        (filter, Some(selection)) => Some(AndCriterion::combine([filter, selection])),
        (filter, None) => Some(filter),
    };
    debug!(%doc_type, "assembled search request");
    Ok(SearchRequest {
        doc_type,
        filter,
        query: None,
        size: None,
        from: None,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::criteria::RangeComparison;
    use crate::expressions::{Expression, MemberRef};
    use crate::mapping::{DefaultMapping, EnumFormat, Mapping};

    /// A mapping that restricts results through a wrapper field, like records sharing an index.
    #[derive(Debug, Default)]
    struct SelectiveMapping(DefaultMapping);

    impl Mapping for SelectiveMapping {
        fn field_segment(&self, member: &MemberRef) -> String {
            self.0.field_segment(member)
        }

        fn document_type(&self, type_name: &str) -> String {
            self.0.document_type(type_name)
        }

        fn format_value(
            &self,
            member: &MemberRef,
            value: &crate::expressions::Scalar,
        ) -> crate::ElasticResult<serde_json::Value> {
            self.0.format_value(member, value)
        }

        fn type_selection_criteria(&self, _doc_type: &str) -> Option<Criterion> {
            Criterion::exists("doc.id").ok()
        }
    }

    fn cost() -> Expression {
        Expression::member(Expression::parameter("r"), MemberRef::new("Robot", "Cost"))
    }

    #[test]
    fn test_tautological_predicate_leaves_selection_filter() {
        // r => r.Cost < 10 || true || r.Cost > 1
        let predicate = Expression::lambda(
            "r",
            Expression::or_else(
                Expression::or_else(
                    cost().lt(Expression::constant(10i64)),
                    Expression::constant(true),
                ),
                cost().gt(Expression::constant(1i64)),
            ),
        );
        let request = build_search_request("Robot", &predicate, &SelectiveMapping::default()).unwrap();
        assert_eq!(request.doc_type, "robots");
        assert_eq!(request.filter, Some(Criterion::exists("doc.id").unwrap()));
        assert_eq!(request.query, None);
    }

    #[test]
    fn test_tautological_predicate_without_selection_has_no_filter() {
        let predicate = Expression::lambda("r", Expression::constant(true));
        let request = build_search_request("Robot", &predicate, &DefaultMapping::new()).unwrap();
        assert_eq!(request.filter, None);
        assert_eq!(serde_json::to_value(&request).unwrap(), json!({}));
    }

    #[test]
    fn test_selection_criterion_joins_the_user_filter() {
        let predicate = Expression::lambda("r", cost().gt(Expression::constant(5i64)));
        let request = build_search_request("Robot", &predicate, &SelectiveMapping::default()).unwrap();
        assert_eq!(
            request.filter,
            Some(AndCriterion::combine([
                Criterion::range("cost", RangeComparison::GreaterThan, json!(5)).unwrap(),
                Criterion::exists("doc.id").unwrap(),
            ]))
        );
    }

    #[test]
    fn test_contradictory_predicate_stays_false() {
        let predicate = Expression::lambda("r", Expression::constant(false));
        let request = build_search_request("Robot", &predicate, &SelectiveMapping::default()).unwrap();
        assert_eq!(request.filter, Some(Criterion::FALSE));
    }

    #[test]
    fn test_request_body_shape() {
        let predicate = Expression::lambda(
            "r",
            Expression::member(Expression::parameter("r"), MemberRef::new("Robot", "Name"))
                .eq(Expression::constant("Marvin")),
        );
        let request = build_search_request("Robot", &predicate, &DefaultMapping::new())
            .unwrap()
            .with_size(10)
            .with_from(20);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "filter": {"term": {"name": "marvin"}},
                "size": 10,
                "from": 20,
            })
        );
    }

    #[test]
    fn test_enum_format_flows_through_the_mapping() {
        use crate::expressions::EnumValue;
        let zone = Expression::member(Expression::parameter("r"), MemberRef::new("Robot", "Zone"));
        let predicate = Expression::lambda(
            "r",
            zone.eq(Expression::constant(EnumValue::new("Zone", "Secure", 2))),
        );
        let mapping = DefaultMapping::new().with_enum_format(EnumFormat::Ordinal);
        let request = build_search_request("Robot", &predicate, &mapping).unwrap();
        assert_eq!(
            request.filter,
            Some(Criterion::term("zone", json!(2)).unwrap())
        );
    }
}
