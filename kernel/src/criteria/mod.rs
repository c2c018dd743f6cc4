//! The criteria algebra: filter nodes emitted by the translator and the smart combinators that
//! keep them in canonical form
//!
//! Criteria are immutable values. Translator rules construct them, the combinators in this module
//! combine them, and the serde impls in the sibling serializer module write them out once. The
//! combinators enforce the algebraic invariants on every call, so a constructed criterion is
//! always canonical: conjunctions and disjunctions are flat, constants are absorbed, same-field
//! terms and ranges are coalesced, and double negation never survives.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use itertools::Itertools;
use serde_json::Value;

use crate::utils::require;
use crate::{ElasticResult, Error};

mod serialize;

/// Execution hint for a set-membership criterion. `Plain` is the engine default and is omitted on
/// the wire; `And` changes the semantics to all-of and therefore never merges into disjunctions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum TermsExecution {
    Plain,
    Bool,
    And,
    Or,
}

impl TermsExecution {
    /// True when a terms criterion with this mode still means "match any of the values", making
    /// it safe to union with other terms over the same field inside a disjunction.
    pub(crate) fn admits_disjunction(&self) -> bool {
        matches!(self, Self::Plain | Self::Bool | Self::Or)
    }
}

/// A bound comparison inside a range criterion; the strum form is the wire key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr)]
pub enum RangeComparison {
    #[strum(serialize = "lt")]
    LessThan,
    #[strum(serialize = "lte")]
    LessThanOrEqual,
    #[strum(serialize = "gt")]
    GreaterThan,
    #[strum(serialize = "gte")]
    GreaterThanOrEqual,
}

/// One bound of a range criterion.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSpec {
    pub comparison: RangeComparison,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TermCriterion {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TermsCriterion {
    pub field: String,
    pub values: Vec<Value>,
    pub execution: TermsExecution,
}

impl TermsCriterion {
    /// Builds the canonical criterion for a set-membership test: no values can match nothing,
    /// a single value is a plain term, anything else is a terms criterion.
    pub fn build(
        field: impl Into<String>,
        values: impl IntoIterator<Item = Value>,
        execution: TermsExecution,
    ) -> ElasticResult<Criterion> {
        let field = field.into();
        require!(
            !field.trim().is_empty(),
            Error::argument("terms criterion requires a field name")
        );
        let mut distinct: Vec<Value> = Vec::new();
        for value in values {
            if !distinct.contains(&value) {
                distinct.push(value);
            }
        }
        Ok(match distinct.len() {
            0 => Criterion::FALSE,
            1 => Criterion::Term(TermCriterion {
                field,
                value: distinct.remove(0),
            }),
            _ => Criterion::Terms(TermsCriterion {
                field,
                values: distinct,
                execution,
            }),
        })
    }
}

/// A set of bounds over one field. At most one spec per comparison; merging the same comparison
/// keeps the tighter bound.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeCriterion {
    pub field: String,
    pub specs: Vec<RangeSpec>,
}

impl RangeCriterion {
    fn merge_spec(&mut self, spec: RangeSpec) {
        match self
            .specs
            .iter_mut()
            .find(|s| s.comparison == spec.comparison)
        {
            Some(existing) => {
                if tighter(spec.comparison, &existing.value, &spec.value) {
                    existing.value = spec.value;
                }
            }
            None => self.specs.push(spec),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissingCriterion {
    pub field: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExistsCriterion {
    pub field: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrefixCriterion {
    pub field: String,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegexpCriterion {
    pub field: String,
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotCriterion {
    pub criterion: Box<Criterion>,
}

impl NotCriterion {
    /// Negates a criterion, applying the algebraic identities: double negation unwraps, constants
    /// invert, and missing/exists flip into each other.
    pub fn create(inner: Criterion) -> Criterion {
        match inner {
            Criterion::Not(n) => *n.criterion,
            Criterion::Constant(ConstantCriterion::True) => Criterion::FALSE,
            Criterion::Constant(ConstantCriterion::False) => Criterion::TRUE,
            Criterion::Missing(m) => Criterion::Exists(ExistsCriterion { field: m.field }),
            Criterion::Exists(e) => Criterion::Missing(MissingCriterion { field: e.field }),
            inner => Criterion::Not(NotCriterion {
                criterion: Box::new(inner),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AndCriterion {
    pub criteria: Vec<Criterion>,
}

impl AndCriterion {
    /// Conjunction of criteria in canonical form: same-kind children flatten into the parent,
    /// `TRUE` children drop out, a `FALSE` child collapses the whole conjunction, duplicate
    /// children dedupe, ranges over one field merge with tightening, and a single survivor is
    /// returned bare. The identity of an empty conjunction is `TRUE`.
    pub fn combine(criteria: impl IntoIterator<Item = Criterion>) -> Criterion {
        let mut flat = Vec::new();
        for criterion in criteria {
            match criterion {
                // Children of a canonical And are themselves flat, so one level suffices.
                Criterion::And(and) => flat.extend(and.criteria),
                Criterion::Constant(ConstantCriterion::True) => {}
                Criterion::Constant(ConstantCriterion::False) => return Criterion::FALSE,
                other => flat.push(other),
            }
        }
        let mut children: Vec<Criterion> = Vec::with_capacity(flat.len());
        for criterion in flat {
            if !children.contains(&criterion) {
                children.push(criterion);
            }
        }
        let mut children = merge_ranges(children);
        match children.len() {
            0 => Criterion::TRUE,
            1 => children.remove(0),
            _ => Criterion::And(AndCriterion { criteria: children }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrCriterion {
    pub criteria: Vec<Criterion>,
}

impl OrCriterion {
    /// Disjunction of criteria in canonical form: same-kind children flatten into the parent, a
    /// `TRUE` child collapses the whole disjunction, `FALSE` children drop out, duplicate
    /// children dedupe, terms over one field union into a single terms criterion, and a single
    /// survivor is returned bare. The identity of an empty disjunction is `FALSE`.
    pub fn combine(criteria: impl IntoIterator<Item = Criterion>) -> Criterion {
        let mut flat = Vec::new();
        for criterion in criteria {
            match criterion {
                Criterion::Or(or) => flat.extend(or.criteria),
                Criterion::Constant(ConstantCriterion::True) => return Criterion::TRUE,
                Criterion::Constant(ConstantCriterion::False) => {}
                other => flat.push(other),
            }
        }
        let mut children: Vec<Criterion> = Vec::with_capacity(flat.len());
        for criterion in flat {
            if !children.contains(&criterion) {
                children.push(criterion);
            }
        }
        let mut children = coalesce_or_terms(children);
        match children.len() {
            0 => Criterion::FALSE,
            1 => children.remove(0),
            _ => Criterion::Or(OrCriterion { criteria: children }),
        }
    }
}

/// Sentinel criteria for predicates that reduced to a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantCriterion {
    True,
    False,
}

/// A node in the filter algebra. Leaf criteria target a single field; compound criteria compose
/// children. Construct compounds through the combinators so the invariants hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Term(TermCriterion),
    Terms(TermsCriterion),
    Range(RangeCriterion),
    Missing(MissingCriterion),
    Exists(ExistsCriterion),
    Prefix(PrefixCriterion),
    Regexp(RegexpCriterion),
    Not(NotCriterion),
    And(AndCriterion),
    Or(OrCriterion),
    Constant(ConstantCriterion),
}

impl Criterion {
    /// The always-true sentinel; the assembler replaces it with the mapping's type-selection
    /// criterion (or no filter at all).
    pub const TRUE: Criterion = Criterion::Constant(ConstantCriterion::True);

    /// The always-false sentinel.
    pub const FALSE: Criterion = Criterion::Constant(ConstantCriterion::False);

    /// The stable name used as this criterion's JSON object key on serialization.
    pub fn name(&self) -> &'static str {
        match self {
            Criterion::Term(_) => "term",
            Criterion::Terms(_) => "terms",
            Criterion::Range(_) => "range",
            Criterion::Missing(_) => "missing",
            Criterion::Exists(_) => "exists",
            Criterion::Prefix(_) => "prefix",
            Criterion::Regexp(_) => "regexp",
            Criterion::Not(_) => "not",
            Criterion::And(_) => "and",
            Criterion::Or(_) => "or",
            Criterion::Constant(_) => "constant",
        }
    }

    /// A single-field equality criterion.
    pub fn term(field: impl Into<String>, value: Value) -> ElasticResult<Self> {
        let field = field.into();
        require!(
            !field.trim().is_empty(),
            Error::argument("term criterion requires a field name")
        );
        Ok(Criterion::Term(TermCriterion { field, value }))
    }

    /// Matches documents with no value for the field.
    pub fn missing(field: impl Into<String>) -> ElasticResult<Self> {
        let field = field.into();
        require!(
            !field.trim().is_empty(),
            Error::argument("missing criterion requires a field name")
        );
        Ok(Criterion::Missing(MissingCriterion { field }))
    }

    /// Matches documents with any value for the field.
    pub fn exists(field: impl Into<String>) -> ElasticResult<Self> {
        let field = field.into();
        require!(
            !field.trim().is_empty(),
            Error::argument("exists criterion requires a field name")
        );
        Ok(Criterion::Exists(ExistsCriterion { field }))
    }

    /// A single-bound range criterion; further bounds merge in through [`AndCriterion::combine`].
    pub fn range(
        field: impl Into<String>,
        comparison: RangeComparison,
        value: Value,
    ) -> ElasticResult<Self> {
        let field = field.into();
        require!(
            !field.trim().is_empty(),
            Error::argument("range criterion requires a field name")
        );
        Ok(Criterion::Range(RangeCriterion {
            field,
            specs: vec![RangeSpec { comparison, value }],
        }))
    }

    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> ElasticResult<Self> {
        let field = field.into();
        require!(
            !field.trim().is_empty(),
            Error::argument("prefix criterion requires a field name")
        );
        Ok(Criterion::Prefix(PrefixCriterion {
            field,
            prefix: prefix.into(),
        }))
    }

    pub fn regexp(field: impl Into<String>, pattern: impl Into<String>) -> ElasticResult<Self> {
        let field = field.into();
        require!(
            !field.trim().is_empty(),
            Error::argument("regexp criterion requires a field name")
        );
        Ok(Criterion::Regexp(RegexpCriterion {
            field,
            pattern: pattern.into(),
        }))
    }
}

////////////////////////////////////////////////////////////////////////
// Coalescing helpers
////////////////////////////////////////////////////////////////////////

/// Merges every range over one field into the first one seen, tightening duplicate bounds.
fn merge_ranges(children: Vec<Criterion>) -> Vec<Criterion> {
    let mut out: Vec<Criterion> = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Criterion::Range(range) => {
                let existing = out.iter_mut().find_map(|c| match c {
                    Criterion::Range(r) if r.field == range.field => Some(r),
                    _ => None,
                });
                match existing {
                    Some(r) => {
                        for spec in range.specs {
                            r.merge_spec(spec);
                        }
                    }
                    None => out.push(Criterion::Range(range)),
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// True if `candidate` is a tighter bound than `current` for the given comparison. Incomparable
/// values keep the bound already held.
fn tighter(comparison: RangeComparison, current: &Value, candidate: &Value) -> bool {
    let Some(ord) = compare_values(candidate, current) else {
        return false;
    };
    match comparison {
        RangeComparison::LessThan | RangeComparison::LessThanOrEqual => ord == Ordering::Less,
        RangeComparison::GreaterThan | RangeComparison::GreaterThanOrEqual => {
            ord == Ordering::Greater
        }
    }
}

fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) {
        return a.partial_cmp(&b);
    }
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// The field of a child that can participate in same-field term unioning inside a disjunction.
fn or_combinable_field(criterion: &Criterion) -> Option<&str> {
    match criterion {
        Criterion::Term(t) => Some(&t.field),
        Criterion::Terms(t) if t.execution.admits_disjunction() => Some(&t.field),
        _ => None,
    }
}

/// Unions term criteria over one field into a single criterion. The merged node keeps the
/// execution mode of the first participant.
fn coalesce_or_terms(children: Vec<Criterion>) -> Vec<Criterion> {
    let mut out: Vec<Criterion> = Vec::with_capacity(children.len());
    'next: for child in children {
        if let Some(field) = or_combinable_field(&child) {
            let field = field.to_owned();
            for existing in out.iter_mut() {
                if or_combinable_field(existing).is_some_and(|f| f == field) {
                    let merged =
                        merge_or_terms(std::mem::replace(existing, Criterion::FALSE), child);
                    *existing = merged;
                    continue 'next;
                }
            }
        }
        out.push(child);
    }
    out
}

fn merge_or_terms(first: Criterion, second: Criterion) -> Criterion {
    let (field, mut values, execution) = match first {
        Criterion::Term(t) => (t.field, vec![t.value], TermsExecution::Plain),
        Criterion::Terms(t) => (t.field, t.values, t.execution),
        other => return other,
    };
    let incoming = match second {
        Criterion::Term(t) => vec![t.value],
        Criterion::Terms(t) => t.values,
        _ => Vec::new(),
    };
    for value in incoming {
        if !values.contains(&value) {
            values.push(value);
        }
    }
    match values.len() {
        1 => Criterion::Term(TermCriterion {
            field,
            value: values.remove(0),
        }),
        _ => Criterion::Terms(TermsCriterion {
            field,
            values,
            execution,
        }),
    }
}

////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////

// Helper for displaying the children of compound criteria
fn format_child_list<T: Display>(children: &[T]) -> String {
    children.iter().map(|c| format!("{c}")).join(", ")
}

impl Display for Criterion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Criterion::Term(t) => write!(f, "term({}: {})", t.field, t.value),
            Criterion::Terms(t) => write!(
                f,
                "terms({}: [{}] {})",
                t.field,
                format_child_list(&t.values),
                t.execution.as_ref()
            ),
            Criterion::Range(r) => {
                let specs = r
                    .specs
                    .iter()
                    .map(|s| format!("{} {}", s.comparison.as_ref(), s.value))
                    .join(", ");
                write!(f, "range({}: {specs})", r.field)
            }
            Criterion::Missing(m) => write!(f, "missing({})", m.field),
            Criterion::Exists(e) => write!(f, "exists({})", e.field),
            Criterion::Prefix(p) => write!(f, "prefix({}: {})", p.field, p.prefix),
            Criterion::Regexp(r) => write!(f, "regexp({}: {})", r.field, r.pattern),
            Criterion::Not(n) => write!(f, "NOT({})", n.criterion),
            Criterion::And(a) => write!(f, "AND({})", format_child_list(&a.criteria)),
            Criterion::Or(o) => write!(f, "OR({})", format_child_list(&o.criteria)),
            Criterion::Constant(ConstantCriterion::True) => write!(f, "TRUE"),
            Criterion::Constant(ConstantCriterion::False) => write!(f, "FALSE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn term(field: &str, value: Value) -> Criterion {
        Criterion::term(field, value).unwrap()
    }

    #[test]
    fn test_not_not_unwraps() {
        let cases = [
            term("name", json!("marvin")),
            Criterion::range("cost", RangeComparison::GreaterThan, json!(5)).unwrap(),
            AndCriterion::combine([term("a", json!(1)), term("b", json!(2))]),
        ];
        for criterion in cases {
            assert_eq!(
                NotCriterion::create(NotCriterion::create(criterion.clone())),
                criterion
            );
        }
    }

    #[test]
    fn test_not_constants_invert() {
        assert_eq!(NotCriterion::create(Criterion::TRUE), Criterion::FALSE);
        assert_eq!(NotCriterion::create(Criterion::FALSE), Criterion::TRUE);
    }

    #[test]
    fn test_not_flips_missing_and_exists() {
        assert_eq!(
            NotCriterion::create(Criterion::missing("name").unwrap()),
            Criterion::exists("name").unwrap()
        );
        assert_eq!(
            NotCriterion::create(Criterion::exists("name").unwrap()),
            Criterion::missing("name").unwrap()
        );
    }

    #[test]
    fn test_and_flattens_nested_ands() {
        let inner = AndCriterion::combine([term("a", json!(1)), term("b", json!(2))]);
        let outer = AndCriterion::combine([inner, term("c", json!(3))]);
        let Criterion::And(and) = outer else {
            panic!("expected an And");
        };
        assert_eq!(and.criteria.len(), 3);
        assert!(and
            .criteria
            .iter()
            .all(|c| !matches!(c, Criterion::And(_))));
    }

    #[test]
    fn test_and_constant_absorption() {
        assert_eq!(
            AndCriterion::combine([term("a", json!(1)), Criterion::FALSE]),
            Criterion::FALSE
        );
        assert_eq!(
            AndCriterion::combine([Criterion::TRUE, term("a", json!(1))]),
            term("a", json!(1))
        );
        assert_eq!(AndCriterion::combine([]), Criterion::TRUE);
    }

    #[test]
    fn test_or_constant_absorption() {
        assert_eq!(
            OrCriterion::combine([term("a", json!(1)), Criterion::TRUE]),
            Criterion::TRUE
        );
        assert_eq!(
            OrCriterion::combine([Criterion::FALSE, term("a", json!(1))]),
            term("a", json!(1))
        );
        assert_eq!(OrCriterion::combine([]), Criterion::FALSE);
    }

    #[test]
    fn test_single_child_returned_bare() {
        let exists = Criterion::exists("name").unwrap();
        assert_eq!(AndCriterion::combine([exists.clone()]), exists);
        assert_eq!(OrCriterion::combine([exists.clone()]), exists);
    }

    #[test]
    fn test_duplicate_children_dedupe() {
        let combined = AndCriterion::combine([
            term("a", json!(1)),
            term("a", json!(1)),
            Criterion::exists("b").unwrap(),
        ]);
        let Criterion::And(and) = combined else {
            panic!("expected an And");
        };
        assert_eq!(and.criteria.len(), 2);
    }

    #[test]
    fn test_and_merges_ranges_over_one_field() {
        let combined = AndCriterion::combine([
            Criterion::range("cost", RangeComparison::GreaterThan, json!(710.956)).unwrap(),
            Criterion::range("cost", RangeComparison::LessThan, json!(3428.9)).unwrap(),
        ]);
        let Criterion::Range(range) = combined else {
            panic!("expected a single Range, not an And");
        };
        assert_eq!(range.field, "cost");
        assert_eq!(
            range.specs,
            vec![
                RangeSpec {
                    comparison: RangeComparison::GreaterThan,
                    value: json!(710.956)
                },
                RangeSpec {
                    comparison: RangeComparison::LessThan,
                    value: json!(3428.9)
                },
            ]
        );
    }

    #[test]
    fn test_range_merge_tightens_same_comparison() {
        let combined = AndCriterion::combine([
            Criterion::range("cost", RangeComparison::LessThan, json!(10)).unwrap(),
            Criterion::range("cost", RangeComparison::LessThan, json!(5)).unwrap(),
            Criterion::range("cost", RangeComparison::GreaterThan, json!(1)).unwrap(),
            Criterion::range("cost", RangeComparison::GreaterThan, json!(3)).unwrap(),
        ]);
        let Criterion::Range(range) = combined else {
            panic!("expected a single Range");
        };
        assert_eq!(
            range.specs,
            vec![
                RangeSpec {
                    comparison: RangeComparison::LessThan,
                    value: json!(5)
                },
                RangeSpec {
                    comparison: RangeComparison::GreaterThan,
                    value: json!(3)
                },
            ]
        );
    }

    #[test]
    fn test_ranges_on_distinct_fields_stay_separate() {
        let combined = AndCriterion::combine([
            Criterion::range("cost", RangeComparison::GreaterThan, json!(1)).unwrap(),
            Criterion::range("built", RangeComparison::LessThan, json!(2200)).unwrap(),
        ]);
        assert!(matches!(combined, Criterion::And(ref a) if a.criteria.len() == 2));
    }

    #[test]
    fn test_or_coalesces_terms_over_one_field() {
        let combined = OrCriterion::combine([
            TermsCriterion::build(
                "name",
                [json!("robbie"), json!("marvin")],
                TermsExecution::Plain,
            )
            .unwrap(),
            term("name", json!("ig-88")),
            Criterion::exists("cost").unwrap(),
        ]);
        let Criterion::Or(or) = combined else {
            panic!("expected an Or");
        };
        assert_eq!(or.criteria.len(), 2);
        let Criterion::Terms(terms) = &or.criteria[0] else {
            panic!("expected coalesced terms first");
        };
        assert_eq!(terms.field, "name");
        assert_eq!(
            terms.values,
            vec![json!("robbie"), json!("marvin"), json!("ig-88")]
        );
        assert_eq!(terms.execution, TermsExecution::Plain);
    }

    #[test]
    fn test_or_coalesces_two_terms_into_one_bare_terms() {
        let combined = OrCriterion::combine([
            term("name", json!("robbie")),
            term("name", json!("marvin")),
        ]);
        let Criterion::Terms(terms) = combined else {
            panic!("expected a bare Terms");
        };
        assert_eq!(terms.values, vec![json!("robbie"), json!("marvin")]);
    }

    #[test]
    fn test_all_of_terms_never_join_disjunctions() {
        let all_of =
            TermsCriterion::build("tags", [json!("a"), json!("b")], TermsExecution::And).unwrap();
        let combined = OrCriterion::combine([all_of.clone(), term("tags", json!("c"))]);
        let Criterion::Or(or) = combined else {
            panic!("expected an Or");
        };
        assert_eq!(or.criteria.len(), 2);
        assert_eq!(or.criteria[0], all_of);
    }

    #[test]
    fn test_terms_build_edge_cases() {
        assert_eq!(
            TermsCriterion::build("name", [], TermsExecution::Plain).unwrap(),
            Criterion::FALSE
        );
        assert_eq!(
            TermsCriterion::build("name", [json!("x"), json!("x")], TermsExecution::Plain)
                .unwrap(),
            term("name", json!("x"))
        );
        assert!(matches!(
            TermsCriterion::build("  ", [json!("x")], TermsExecution::Plain),
            Err(Error::Argument(_))
        ));
    }

    #[test]
    fn test_blank_field_names_rejected() {
        assert!(matches!(Criterion::term("", json!(1)), Err(Error::Argument(_))));
        assert!(matches!(Criterion::missing(" "), Err(Error::Argument(_))));
        assert!(matches!(Criterion::exists(""), Err(Error::Argument(_))));
        assert!(matches!(
            Criterion::range("", RangeComparison::LessThan, json!(1)),
            Err(Error::Argument(_))
        ));
        assert!(matches!(Criterion::prefix("", "p"), Err(Error::Argument(_))));
        assert!(matches!(Criterion::regexp("", "p"), Err(Error::Argument(_))));
    }

    #[test]
    fn test_recombining_canonical_children_is_idempotent() {
        let and = AndCriterion::combine([
            Criterion::range("cost", RangeComparison::GreaterThan, json!(1)).unwrap(),
            Criterion::range("cost", RangeComparison::LessThan, json!(9)).unwrap(),
            term("name", json!("marvin")),
            Criterion::exists("kind").unwrap(),
        ]);
        let Criterion::And(ref inner) = and else {
            panic!("expected an And");
        };
        assert_eq!(AndCriterion::combine(inner.criteria.clone()), and);

        let or = OrCriterion::combine([
            term("name", json!("robbie")),
            term("name", json!("ig-88")),
            Criterion::missing("name").unwrap(),
        ]);
        let Criterion::Or(ref inner) = or else {
            panic!("expected an Or");
        };
        assert_eq!(OrCriterion::combine(inner.criteria.clone()), or);
    }

    #[test]
    fn test_criterion_names() {
        let cases: [(Criterion, &str); 6] = [
            (term("f", json!(1)), "term"),
            (Criterion::missing("f").unwrap(), "missing"),
            (Criterion::exists("f").unwrap(), "exists"),
            (
                Criterion::range("f", RangeComparison::LessThan, json!(1)).unwrap(),
                "range",
            ),
            (
                NotCriterion::create(term("f", json!(1))),
                "not",
            ),
            (
                AndCriterion::combine([term("a", json!(1)), Criterion::exists("b").unwrap()]),
                "and",
            ),
        ];
        for (criterion, name) in cases {
            assert_eq!(criterion.name(), name);
        }
    }

    #[test]
    fn test_display() {
        let criterion = AndCriterion::combine([
            term("name", json!("marvin")),
            NotCriterion::create(term("kind", json!("toaster"))),
        ]);
        assert_eq!(
            format!("{criterion}"),
            r#"AND(term(name: "marvin"), NOT(term(kind: "toaster")))"#
        );
    }
}
