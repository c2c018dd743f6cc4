//! The predicate translator: recursive descent over a partially-evaluated lambda body, producing
//! a criterion via pattern dispatch
//!
//! Dispatch looks at the top node of the body after stripping quotes and boolean conversions:
//! logical connectives become combinator calls, comparisons become terms and ranges, null tests
//! become missing/exists, and a small table of well-known method identities covers equality
//! helpers, set membership, and the domain helper methods. Anything else fails the whole
//! translation; partial criteria are never emitted.

use tracing::debug;

use crate::criteria::{
    AndCriterion, Criterion, NotCriterion, OrCriterion, RangeComparison, TermsCriterion,
    TermsExecution,
};
use crate::expressions::evaluate::partially_evaluate;
use crate::expressions::transforms::ExpressionDepthChecker;
use crate::expressions::{
    BinaryExpression, BinaryOp, Expression, MemberExpression, MemberRef, MethodCallExpression,
    Scalar, ScalarKind, UnaryOp,
};
use crate::mapping::Mapping;
use crate::utils::require;
use crate::{ElasticResult, Error};

/// Depth guard applied before translation; predicates deeper than this are rejected rather than
/// risking the recursive passes.
pub(crate) const MAX_PREDICATE_DEPTH: usize = 128;

/// The declaring type of the domain helper methods (`ContainsAny`, `ContainsAll`, `Regexp`,
/// `Prefix`) recognized by the translator.
pub const ELASTIC_METHODS_TYPE: &str = "ElasticMethods";

/// Translates a boolean lambda over a record parameter into a criterion.
///
/// The input is partially evaluated first, so closed-over arithmetic and captured sequence
/// literals arrive at the rules as constants. The result is canonical: it went through the same
/// combinators that enforce the criteria invariants everywhere else.
pub fn translate_predicate<M: Mapping + ?Sized>(
    predicate: &Expression,
    mapping: &M,
) -> ElasticResult<Criterion> {
    let depth = ExpressionDepthChecker::check_expr(predicate, MAX_PREDICATE_DEPTH);
    require!(
        depth <= MAX_PREDICATE_DEPTH,
        Error::unsupported(format!(
            "predicate expression exceeds depth limit {MAX_PREDICATE_DEPTH}"
        ))
    );

    let evaluated = partially_evaluate(predicate)?;
    let lambda = match strip_transparent(&evaluated) {
        Expression::Lambda(lambda) => lambda,
        other => {
            return Err(Error::unsupported(format!(
                "predicate root must be a lambda, found {}",
                other.kind_name()
            )))
        }
    };

    let translator = Translator {
        mapping,
        parameter: &lambda.parameter,
    };
    let criterion = translator.translate(&lambda.body)?;
    debug!(%criterion, "translated predicate");
    Ok(criterion)
}

struct Translator<'a, M: ?Sized> {
    mapping: &'a M,
    parameter: &'a str,
}

impl<M: Mapping + ?Sized> Translator<'_, M> {
    fn translate(&self, expr: &Expression) -> ElasticResult<Criterion> {
        let expr = strip_transparent(expr);
        match expr {
            // A predicate that reduced to a constant is a sentinel for the assembler.
            Expression::Constant(s) => match s.as_bool() {
                Some(true) => Ok(Criterion::TRUE),
                Some(false) => Ok(Criterion::FALSE),
                None => Err(Error::unsupported(format!(
                    "constant {s} as a predicate body"
                ))),
            },
            Expression::Binary(b) => self.translate_binary(b),
            Expression::Unary(u) if u.op == UnaryOp::Not => {
                Ok(NotCriterion::create(self.translate(&u.expr)?))
            }
            Expression::Member(m) => self.translate_member(expr, m),
            Expression::Call(c) => self.translate_call(c),
            other => Err(Error::unsupported(format!(
                "cannot translate a {} expression into a filter: {other}",
                other.kind_name()
            ))),
        }
    }

    fn translate_binary(&self, binary: &BinaryExpression) -> ElasticResult<Criterion> {
        match binary.op {
            BinaryOp::AndAlso => Ok(AndCriterion::combine([
                self.translate(&binary.left)?,
                self.translate(&binary.right)?,
            ])),
            BinaryOp::OrElse => Ok(OrCriterion::combine([
                self.translate(&binary.left)?,
                self.translate(&binary.right)?,
            ])),
            BinaryOp::Equal | BinaryOp::NotEqual => {
                self.translate_equality(binary.op, &binary.left, &binary.right)
            }
            op if op.is_ordering() => self.translate_comparison(op, &binary.left, &binary.right),
            op => Err(Error::unsupported(format!(
                "binary operator {op} in a filter context"
            ))),
        }
    }

    fn translate_equality(
        &self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
    ) -> ElasticResult<Criterion> {
        let l = strip_converts(left);
        let r = strip_converts(right);

        // A boolean constant on either side unwraps into the other side's own translation.
        if let Expression::Constant(Scalar::Boolean(b)) = l {
            return self.equality_with_bool(op, *b, r);
        }
        if let Expression::Constant(Scalar::Boolean(b)) = r {
            return self.equality_with_bool(op, *b, l);
        }

        // Null tests become presence criteria instead of sentinel-valued terms.
        if matches!(l, Expression::Constant(s) if s.is_null()) {
            return self.null_test(op, r);
        }
        if matches!(r, Expression::Constant(s) if s.is_null()) {
            return self.null_test(op, l);
        }

        let Some((member, constant, _)) = member_and_constant(l, r) else {
            return Err(Error::unsupported(format!(
                "equality over {} and {} operands",
                l.kind_name(),
                r.kind_name()
            )));
        };
        let (field, leaf) = self.field_of(member)?;
        let value = self.mapping.format_value(&leaf, constant)?;
        let term = Criterion::term(field, value)?;
        Ok(match op {
            BinaryOp::NotEqual => NotCriterion::create(term),
            _ => term,
        })
    }

    fn equality_with_bool(
        &self,
        op: BinaryOp,
        constant: bool,
        other: &Expression,
    ) -> ElasticResult<Criterion> {
        let criterion = self.translate(other)?;
        let keep = (op == BinaryOp::Equal) == constant;
        Ok(if keep {
            criterion
        } else {
            NotCriterion::create(criterion)
        })
    }

    fn null_test(&self, op: BinaryOp, member: &Expression) -> ElasticResult<Criterion> {
        let (field, _) = self.field_of(member)?;
        match op {
            BinaryOp::NotEqual => Criterion::exists(field),
            _ => Criterion::missing(field),
        }
    }

    fn translate_comparison(
        &self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
    ) -> ElasticResult<Criterion> {
        let l = strip_converts(left);
        let r = strip_converts(right);
        let Some((member, constant, constant_on_left)) = member_and_constant(l, r) else {
            return Err(Error::unsupported(format!(
                "comparison over {} and {} operands",
                l.kind_name(),
                r.kind_name()
            )));
        };
        // The member side normalizes to the left: `c < m` reads as `m > c`.
        let op = if constant_on_left { op.flipped() } else { op };
        let comparison = match op {
            BinaryOp::LessThan => RangeComparison::LessThan,
            BinaryOp::LessThanOrEqual => RangeComparison::LessThanOrEqual,
            BinaryOp::GreaterThan => RangeComparison::GreaterThan,
            _ => RangeComparison::GreaterThanOrEqual,
        };
        let (field, leaf) = self.field_of(member)?;
        let value = self.mapping.format_value(&leaf, constant)?;
        Criterion::range(field, comparison, value)
    }

    fn translate_member(
        &self,
        whole: &Expression,
        member: &MemberExpression,
    ) -> ElasticResult<Criterion> {
        if member.member.is_nullable_has_value() {
            let target = member.target.as_deref().ok_or_else(|| {
                Error::unsupported("nullable test on a static member".to_string())
            })?;
            let (field, _) = self.field_of(target)?;
            return Criterion::exists(field);
        }
        // A bare member chain in predicate position is a boolean field tested for true.
        let (field, leaf) = self.field_of(whole)?;
        let value = self.mapping.format_value(&leaf, &Scalar::Boolean(true))?;
        Criterion::term(field, value)
    }

    fn translate_call(&self, call: &MethodCallExpression) -> ElasticResult<Criterion> {
        let declaring = call.method.declaring_type.as_str();
        match (declaring, call.method.name.as_str(), call.arity()) {
            // String scans have no filter-level equivalent and are rejected loudly rather than
            // silently dropped.
            ("String", "Contains" | "StartsWith" | "EndsWith", _) => Err(Error::unsupported(
                format!("method {} in a filter context", call.method),
            )),
            (ELASTIC_METHODS_TYPE, "ContainsAny", 2) if call.receiver.is_none() => {
                self.translate_terms_helper(call, TermsExecution::Bool)
            }
            (ELASTIC_METHODS_TYPE, "ContainsAll", 2) if call.receiver.is_none() => {
                self.translate_terms_helper(call, TermsExecution::And)
            }
            (ELASTIC_METHODS_TYPE, "Regexp", 2) if call.receiver.is_none() => {
                let (field, pattern) = self.member_and_literal(call)?;
                Criterion::regexp(field, pattern)
            }
            (ELASTIC_METHODS_TYPE, "Prefix", 2) if call.receiver.is_none() => {
                let (field, prefix) = self.member_and_literal(call)?;
                Criterion::prefix(field, prefix)
            }
            // Object.Equals and the per-type Equals overloads, static or instance form.
            (_, "Equals", 2) => match &call.receiver {
                Some(receiver) => {
                    self.translate_equality(BinaryOp::Equal, receiver, &call.args[0])
                }
                None => self.translate_equality(BinaryOp::Equal, &call.args[0], &call.args[1]),
            },
            (_, "Contains", 2) => match &call.receiver {
                Some(receiver) => self.translate_contains(receiver, &call.args[0]),
                None => self.translate_contains(&call.args[0], &call.args[1]),
            },
            _ => Err(Error::unsupported(format!(
                "method {} with arity {}",
                call.method,
                call.arity()
            ))),
        }
    }

    /// Set membership: either a constant sequence probed with a record field, or a sequence-typed
    /// record field probed with a constant.
    fn translate_contains(
        &self,
        collection: &Expression,
        item: &Expression,
    ) -> ElasticResult<Criterion> {
        let collection = strip_converts(collection);
        let item = strip_converts(item);
        match (collection, item) {
            (Expression::Constant(Scalar::Sequence(values)), item) => {
                let (field, leaf) = self.field_of(item)?;
                let mut formatted = Vec::with_capacity(values.len());
                let mut saw_null = false;
                for value in values {
                    if value.is_null() {
                        saw_null = true;
                    } else {
                        formatted.push(self.mapping.format_value(&leaf, value)?);
                    }
                }
                let terms = TermsCriterion::build(field.clone(), formatted, TermsExecution::Plain)?;
                Ok(if saw_null {
                    // A null in the probe sequence also matches documents with no value at all.
                    OrCriterion::combine([terms, Criterion::missing(field)?])
                } else {
                    terms
                })
            }
            (Expression::Constant(other), _) => Err(Error::unsupported(format!(
                "membership test over non-sequence constant {other}"
            ))),
            (collection @ Expression::Member(_), Expression::Constant(value)) => {
                require!(
                    !value.is_null(),
                    Error::unsupported("membership test for a null value")
                );
                let (field, leaf) = self.field_of(collection)?;
                let value = self.mapping.format_value(&leaf, value)?;
                Criterion::term(field, value)
            }
            (collection, item) => Err(Error::unsupported(format!(
                "membership test over {} and {} operands",
                collection.kind_name(),
                item.kind_name()
            ))),
        }
    }

    /// `ContainsAny`/`ContainsAll`: a sequence-typed record field against a constant sequence,
    /// in either argument order.
    fn translate_terms_helper(
        &self,
        call: &MethodCallExpression,
        execution: TermsExecution,
    ) -> ElasticResult<Criterion> {
        let a = strip_converts(&call.args[0]);
        let b = strip_converts(&call.args[1]);
        let (member, values) = match (a, b) {
            (Expression::Constant(Scalar::Sequence(values)), member) => (member, values),
            (member, Expression::Constant(Scalar::Sequence(values))) => (member, values),
            _ => {
                return Err(Error::unsupported(format!(
                    "{} requires a field and a constant sequence",
                    call.method
                )))
            }
        };
        let (field, leaf) = self.field_of(member)?;
        let formatted = values
            .iter()
            .filter(|value| !value.is_null())
            .map(|value| self.mapping.format_value(&leaf, value))
            .collect::<ElasticResult<Vec<_>>>()?;
        TermsCriterion::build(field, formatted, execution)
    }

    fn member_and_literal(&self, call: &MethodCallExpression) -> ElasticResult<(String, String)> {
        let (field, _) = self.field_of(&call.args[0])?;
        match strip_converts(&call.args[1]) {
            Expression::Constant(Scalar::String(literal)) => Ok((field, literal.clone())),
            other => Err(Error::unsupported(format!(
                "{} requires a constant string, found a {}",
                call.method,
                other.kind_name()
            ))),
        }
    }

    /// Walks a member-access spine to its parameter root, collecting segments in document order
    /// and delegating per-segment naming to the mapping. Returns the dotted field path and the
    /// leaf member (whose metadata drives value formatting).
    fn field_of(&self, expr: &Expression) -> ElasticResult<(String, MemberRef)> {
        let mut segments: Vec<&MemberRef> = Vec::new();
        let mut current = strip_converts(expr);
        loop {
            match current {
                Expression::Member(m) => {
                    // Reading `.Value` off a nullable member addresses the same field.
                    if !m.member.is_nullable_value() {
                        segments.push(&m.member);
                    }
                    current = match &m.target {
                        Some(target) => strip_converts(target),
                        None => {
                            return Err(Error::unsupported(format!(
                                "member chain rooted at static member {}.{}",
                                m.member.declaring_type, m.member.name
                            )))
                        }
                    };
                }
                Expression::Parameter(name) => {
                    require!(
                        name == self.parameter,
                        Error::unsupported(format!(
                            "member chain rooted at parameter '{name}' instead of the bound \
                             parameter '{}'",
                            self.parameter
                        ))
                    );
                    break;
                }
                other => {
                    return Err(Error::unsupported(format!(
                        "member chain rooted at a {} expression: {other}",
                        other.kind_name()
                    )))
                }
            }
        }
        segments.reverse();
        let Some(root) = segments.first() else {
            return Err(Error::unsupported(
                "the bound parameter itself is not a filterable field".to_string(),
            ));
        };
        let leaf = segments
            .last()
            .map(|m| (*m).clone())
            .unwrap_or_else(|| (*root).clone());
        let path = segments
            .iter()
            .map(|member| self.mapping.field_segment(member))
            .collect::<Vec<_>>()
            .join(".");
        let path = match self.mapping.document_mapping_prefix(&root.declaring_type) {
            Some(prefix) => format!("{prefix}.{path}"),
            None => path,
        };
        Ok((path, leaf))
    }
}

/// Identifies which operand is the member chain and which the captured constant.
fn member_and_constant<'e>(
    left: &'e Expression,
    right: &'e Expression,
) -> Option<(&'e Expression, &'e Scalar, bool)> {
    match (left, right) {
        (Expression::Constant(c), member @ Expression::Member(_)) => Some((member, c, true)),
        (member @ Expression::Member(_), Expression::Constant(c)) => Some((member, c, false)),
        _ => None,
    }
}

/// Strips quotes and boolean conversions off a predicate body.
fn strip_transparent(mut expr: &Expression) -> &Expression {
    loop {
        match expr {
            Expression::Quote(inner) => expr = inner,
            Expression::Convert(c) if c.target == ScalarKind::Boolean => expr = &c.expr,
            _ => return expr,
        }
    }
}

/// Strips quotes and every conversion off an operand; comparisons proceed in the converted
/// numeric domain.
fn strip_converts(mut expr: &Expression) -> &Expression {
    loop {
        match expr {
            Expression::Quote(inner) => expr = inner,
            Expression::Convert(c) => expr = &c.expr,
            _ => return expr,
        }
    }
}
