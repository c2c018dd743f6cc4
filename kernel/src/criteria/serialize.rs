//! Hand-written serde serialization for criteria
//!
//! Every criterion serializes as a single-entry object `{"<name>": <payload>}`; the payload
//! shapes are bespoke enough (field names as keys, conditionally omitted entries) that derive
//! cannot express them.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::{
    AndCriterion, ConstantCriterion, Criterion, ExistsCriterion, MissingCriterion, NotCriterion,
    OrCriterion, PrefixCriterion, RangeCriterion, RegexpCriterion, TermCriterion, TermsCriterion,
    TermsExecution,
};

impl Serialize for Criterion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Criterion::Term(t) => map.serialize_entry(self.name(), &TermBody(t))?,
            Criterion::Terms(t) => map.serialize_entry(self.name(), &TermsBody(t))?,
            Criterion::Range(r) => map.serialize_entry(self.name(), &RangeBody(r))?,
            Criterion::Missing(m) => {
                map.serialize_entry(self.name(), &FieldBody { field: &m.field })?
            }
            Criterion::Exists(e) => {
                map.serialize_entry(self.name(), &FieldBody { field: &e.field })?
            }
            Criterion::Prefix(p) => map.serialize_entry(
                self.name(),
                &SingleEntryBody {
                    key: &p.field,
                    value: &p.prefix,
                },
            )?,
            Criterion::Regexp(r) => map.serialize_entry(
                self.name(),
                &SingleEntryBody {
                    key: &r.field,
                    value: &r.pattern,
                },
            )?,
            Criterion::Not(n) => map.serialize_entry(self.name(), &NotBody(n))?,
            Criterion::And(a) => map.serialize_entry(self.name(), &AndBody(a))?,
            Criterion::Or(o) => map.serialize_entry(self.name(), &OrBody(o))?,
            // The assembler replaces constant criteria before a request is written; these shapes
            // are a safety net for anyone serializing a bare criterion.
            Criterion::Constant(ConstantCriterion::True) => {
                map.serialize_entry("match_all", &EmptyBody)?
            }
            Criterion::Constant(ConstantCriterion::False) => {
                map.serialize_entry("match_none", &EmptyBody)?
            }
        }
        map.end()
    }
}

struct TermBody<'a>(&'a TermCriterion);

impl Serialize for TermBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.0.field, &self.0.value)?;
        map.end()
    }
}

struct TermsBody<'a>(&'a TermsCriterion);

impl Serialize for TermsBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let plain = self.0.execution == TermsExecution::Plain;
        let mut map = serializer.serialize_map(Some(if plain { 1 } else { 2 }))?;
        map.serialize_entry(&self.0.field, &self.0.values)?;
        if !plain {
            map.serialize_entry("execution", self.0.execution.as_ref())?;
        }
        map.end()
    }
}

struct RangeBody<'a>(&'a RangeCriterion);

impl Serialize for RangeBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.0.field, &RangeSpecsBody(self.0))?;
        map.end()
    }
}

struct RangeSpecsBody<'a>(&'a RangeCriterion);

impl Serialize for RangeSpecsBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.specs.len()))?;
        for spec in &self.0.specs {
            map.serialize_entry(spec.comparison.as_ref(), &spec.value)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct FieldBody<'a> {
    field: &'a str,
}

struct SingleEntryBody<'a> {
    key: &'a str,
    value: &'a str,
}

impl Serialize for SingleEntryBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.key, self.value)?;
        map.end()
    }
}

struct NotBody<'a>(&'a NotCriterion);

impl Serialize for NotBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("filter", &*self.0.criterion)?;
        map.end()
    }
}

struct AndBody<'a>(&'a AndCriterion);

impl Serialize for AndBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("filters", &self.0.criteria)?;
        map.end()
    }
}

struct OrBody<'a>(&'a OrCriterion);

impl Serialize for OrBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("filters", &self.0.criteria)?;
        map.end()
    }
}

struct EmptyBody;

impl Serialize for EmptyBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_map(Some(0))?.end()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::criteria::{
        AndCriterion, Criterion, NotCriterion, OrCriterion, RangeComparison, TermsCriterion,
        TermsExecution,
    };

    #[test]
    fn test_term_shape() {
        let criterion = Criterion::term("name", json!("marvin")).unwrap();
        assert_eq!(
            serde_json::to_value(&criterion).unwrap(),
            json!({"term": {"name": "marvin"}})
        );
    }

    #[test]
    fn test_terms_shape_omits_plain_execution() {
        let criterion = TermsCriterion::build(
            "name",
            [json!("robbie"), json!("ig-88")],
            TermsExecution::Plain,
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&criterion).unwrap(),
            json!({"terms": {"name": ["robbie", "ig-88"]}})
        );
    }

    #[test]
    fn test_terms_shape_writes_execution() {
        let criterion =
            TermsCriterion::build("tags", [json!("a"), json!("b")], TermsExecution::And).unwrap();
        assert_eq!(
            serde_json::to_value(&criterion).unwrap(),
            json!({"terms": {"tags": ["a", "b"], "execution": "and"}})
        );
        let criterion =
            TermsCriterion::build("tags", [json!("a"), json!("b")], TermsExecution::Bool).unwrap();
        assert_eq!(
            serde_json::to_value(&criterion).unwrap(),
            json!({"terms": {"tags": ["a", "b"], "execution": "bool"}})
        );
    }

    #[test]
    fn test_range_shape() {
        let criterion = AndCriterion::combine([
            Criterion::range("cost", RangeComparison::GreaterThan, json!(710.956)).unwrap(),
            Criterion::range("cost", RangeComparison::LessThan, json!(3428.9)).unwrap(),
        ]);
        assert_eq!(
            serde_json::to_value(&criterion).unwrap(),
            json!({"range": {"cost": {"gt": 710.956, "lt": 3428.9}}})
        );
    }

    #[test]
    fn test_missing_and_exists_shape() {
        assert_eq!(
            serde_json::to_value(Criterion::missing("name").unwrap()).unwrap(),
            json!({"missing": {"field": "name"}})
        );
        assert_eq!(
            serde_json::to_value(Criterion::exists("name").unwrap()).unwrap(),
            json!({"exists": {"field": "name"}})
        );
    }

    #[test]
    fn test_prefix_and_regexp_shape() {
        assert_eq!(
            serde_json::to_value(Criterion::prefix("name", "mar").unwrap()).unwrap(),
            json!({"prefix": {"name": "mar"}})
        );
        assert_eq!(
            serde_json::to_value(Criterion::regexp("name", "mar.*n").unwrap()).unwrap(),
            json!({"regexp": {"name": "mar.*n"}})
        );
    }

    #[test]
    fn test_compound_shapes_preserve_child_order() {
        let criterion = OrCriterion::combine([
            Criterion::exists("a").unwrap(),
            NotCriterion::create(Criterion::term("b", json!(1)).unwrap()),
        ]);
        assert_eq!(
            serde_json::to_value(&criterion).unwrap(),
            json!({"or": {"filters": [
                {"exists": {"field": "a"}},
                {"not": {"filter": {"term": {"b": 1}}}},
            ]}})
        );
    }

    #[test]
    fn test_constant_safety_net_shapes() {
        assert_eq!(
            serde_json::to_value(Criterion::TRUE).unwrap(),
            json!({"match_all": {}})
        );
        assert_eq!(
            serde_json::to_value(Criterion::FALSE).unwrap(),
            json!({"match_none": {}})
        );
    }
}
