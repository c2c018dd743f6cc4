//! Partial evaluation of predicate expressions
//!
//! Before translation, every maximal sub-expression that does not depend on a bound parameter is
//! replaced by a [`Constant`] carrying its computed value. Closed-over values enter the tree as
//! constants when the query builder captures them, so the evaluator's job is folding the pure
//! forms built on top of them: arithmetic, comparisons, boolean connectives, conversions, and
//! sequence literals. Anything that would need host reflection to compute is a fatal
//! [`Error::Evaluation`].
//!
//! [`Constant`]: crate::expressions::Expression::Constant

use std::cmp::Ordering;

use crate::expressions::{
    BinaryOp, Expression, LambdaExpression, MemberExpression, MethodCallExpression, Scalar,
    ScalarKind, UnaryOp,
};
use crate::{ElasticResult, Error};

/// Replaces every maximal parameter-independent subtree of `expr` with a constant holding its
/// evaluated value. Parameter-dependent spines are rebuilt around the folded children; binder
/// nodes (lambdas, quotes) are never collapsed themselves.
pub fn partially_evaluate(expr: &Expression) -> ElasticResult<Expression> {
    match expr {
        Expression::Constant(_) | Expression::Parameter(_) => Ok(expr.clone()),
        // Binders fold their body but survive as binders.
        Expression::Lambda(l) => Ok(Expression::Lambda(Box::new(LambdaExpression {
            parameter: l.parameter.clone(),
            body: Box::new(partially_evaluate(&l.body)?),
        }))),
        Expression::Quote(q) => Ok(Expression::Quote(Box::new(partially_evaluate(q)?))),
        _ if expr.references().is_empty() => Ok(Expression::Constant(evaluate_constant(expr)?)),
        Expression::Member(m) => {
            let target = match &m.target {
                Some(target) => Some(Box::new(partially_evaluate(target)?)),
                None => None,
            };
            Ok(Expression::Member(MemberExpression {
                target,
                member: m.member.clone(),
            }))
        }
        Expression::Binary(b) => Ok(Expression::binary(
            b.op,
            partially_evaluate(&b.left)?,
            partially_evaluate(&b.right)?,
        )),
        Expression::Unary(u) => Ok(Expression::unary(u.op, partially_evaluate(&u.expr)?)),
        Expression::Convert(c) => Ok(Expression::convert(
            partially_evaluate(&c.expr)?,
            c.target,
        )),
        Expression::Call(c) => {
            let receiver = match &c.receiver {
                Some(receiver) => Some(Box::new(partially_evaluate(receiver)?)),
                None => None,
            };
            let args = c
                .args
                .iter()
                .map(partially_evaluate)
                .collect::<ElasticResult<Vec<_>>>()?;
            Ok(Expression::Call(MethodCallExpression {
                receiver,
                method: c.method.clone(),
                args,
            }))
        }
        Expression::Sequence(items) => Ok(Expression::Sequence(
            items
                .iter()
                .map(partially_evaluate)
                .collect::<ElasticResult<Vec<_>>>()?,
        )),
    }
}

/// Computes the value of a parameter-independent expression.
fn evaluate_constant(expr: &Expression) -> ElasticResult<Scalar> {
    match expr {
        Expression::Constant(s) => Ok(s.clone()),
        Expression::Quote(q) => evaluate_constant(q),
        Expression::Sequence(items) => items
            .iter()
            .map(evaluate_constant)
            .collect::<ElasticResult<Vec<_>>>()
            .map(Scalar::Sequence),
        Expression::Convert(c) => convert_scalar(evaluate_constant(&c.expr)?, c.target),
        Expression::Unary(u) => {
            let value = evaluate_constant(&u.expr)?;
            match (u.op, value) {
                (UnaryOp::Not, Scalar::Boolean(b)) => Ok(Scalar::Boolean(!b)),
                (UnaryOp::Negate, Scalar::Integer(i)) => i
                    .checked_neg()
                    .map(Scalar::Integer)
                    .ok_or_else(|| Error::evaluation("integer overflow negating constant")),
                (UnaryOp::Negate, Scalar::Double(d)) => Ok(Scalar::Double(-d)),
                (op, value) => Err(Error::evaluation(format!(
                    "unary {op:?} is not defined for value {value}"
                ))),
            }
        }
        Expression::Binary(b) => {
            let left = evaluate_constant(&b.left)?;
            let right = evaluate_constant(&b.right)?;
            fold_binary(b.op, left, right)
        }
        other => Err(Error::evaluation(format!(
            "cannot evaluate a {} expression without host support: {other}",
            other.kind_name()
        ))),
    }
}

fn fold_binary(op: BinaryOp, left: Scalar, right: Scalar) -> ElasticResult<Scalar> {
    use BinaryOp::*;
    match op {
        AndAlso | OrElse => {
            let (Some(a), Some(b)) = (left.as_bool(), right.as_bool()) else {
                return Err(Error::evaluation(format!(
                    "{op:?} requires boolean operands, found {left} and {right}"
                )));
            };
            let value = match op {
                AndAlso => a && b,
                _ => a || b,
            };
            Ok(Scalar::Boolean(value))
        }
        Equal => Ok(Scalar::Boolean(scalars_equal(&left, &right))),
        NotEqual => Ok(Scalar::Boolean(!scalars_equal(&left, &right))),
        LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual => {
            let ord = compare_scalars(&left, &right).ok_or_else(|| {
                Error::evaluation(format!("cannot order {left} against {right}"))
            })?;
            let value = match op {
                LessThan => ord == Ordering::Less,
                LessThanOrEqual => ord != Ordering::Greater,
                GreaterThan => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            };
            Ok(Scalar::Boolean(value))
        }
        Add | Subtract | Multiply | Divide | Modulo => fold_arithmetic(op, left, right),
    }
}

fn fold_arithmetic(op: BinaryOp, left: Scalar, right: Scalar) -> ElasticResult<Scalar> {
    use BinaryOp::*;
    match (&left, &right) {
        (Scalar::Integer(a), Scalar::Integer(b)) => {
            let (a, b) = (*a, *b);
            let result = match op {
                Add => a.checked_add(b),
                Subtract => a.checked_sub(b),
                Multiply => a.checked_mul(b),
                Divide => a.checked_div(b),
                _ => a.checked_rem(b),
            };
            result.map(Scalar::Integer).ok_or_else(|| {
                Error::evaluation(format!("integer {op:?} of {a} and {b} has no value"))
            })
        }
        (Scalar::String(a), Scalar::String(b)) if op == Add => {
            Ok(Scalar::String(format!("{a}{b}")))
        }
        _ => {
            let (Some(a), Some(b)) = (as_double(&left), as_double(&right)) else {
                return Err(Error::evaluation(format!(
                    "arithmetic {op:?} is not defined for {left} and {right}"
                )));
            };
            let value = match op {
                Add => a + b,
                Subtract => a - b,
                Multiply => a * b,
                Divide => a / b,
                _ => a % b,
            };
            Ok(Scalar::Double(value))
        }
    }
}

fn as_double(scalar: &Scalar) -> Option<f64> {
    match scalar {
        Scalar::Integer(i) => Some(*i as f64),
        Scalar::Double(d) => Some(*d),
        _ => None,
    }
}

/// Structural equality with numeric promotion, so `1 == 1.0` folds to true.
fn scalars_equal(left: &Scalar, right: &Scalar) -> bool {
    match (as_double(left), as_double(right)) {
        (Some(a), Some(b)) => a == b,
        _ => left == right,
    }
}

fn compare_scalars(left: &Scalar, right: &Scalar) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (as_double(left), as_double(right)) {
        return a.partial_cmp(&b);
    }
    match (left, right) {
        (Scalar::String(a), Scalar::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn convert_scalar(value: Scalar, target: ScalarKind) -> ElasticResult<Scalar> {
    match (value, target) {
        // Null passes through any conversion (a nullable cast keeps its emptiness).
        (Scalar::Null, _) => Ok(Scalar::Null),
        (value, target) if value.kind() == target => Ok(value),
        (Scalar::Integer(i), ScalarKind::Double) => Ok(Scalar::Double(i as f64)),
        (Scalar::Double(d), ScalarKind::Integer) => Ok(Scalar::Integer(d as i64)),
        (Scalar::Enum(e), ScalarKind::Integer) => Ok(Scalar::Integer(e.ordinal)),
        (value, target) => Err(Error::evaluation(format!(
            "cannot convert {value} to {target}"
        ))),
    }
}
