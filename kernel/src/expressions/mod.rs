//! Definitions and functions to create and manipulate the predicate expression trees handed to
//! the translator
//!
//! The tree is the source-agnostic shape of a deferred-execution query predicate: a lambda whose
//! body mixes member accesses on the bound record parameter with constants closed over from the
//! calling scope. The translator never mutates a tree; rewrite passes produce new nodes.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

pub use self::scalars::{EnumValue, Scalar, ScalarKind};
use self::transforms::{ExpressionTransform as _, GetParameterReferences};

pub mod evaluate;
mod scalars;
pub mod transforms;

/// The declaring type of the nullable-wrapper members recognized by the translator
/// (`HasValue`, `Value`).
pub const NULLABLE_TYPE: &str = "Nullable";

////////////////////////////////////////////////////////////////////////
// Operators
////////////////////////////////////////////////////////////////////////

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    /// Short-circuiting conjunction
    AndAlso,
    /// Short-circuiting disjunction
    OrElse,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOp {
    /// True for the four ordering comparisons (not equality).
    pub(crate) fn is_ordering(&self) -> bool {
        use BinaryOp::*;
        matches!(
            self,
            LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual
        )
    }

    /// The operator that holds when the two operands swap sides, e.g. `c < m` becomes `m > c`.
    pub(crate) fn flipped(&self) -> BinaryOp {
        use BinaryOp::*;
        match self {
            LessThan => GreaterThan,
            LessThanOrEqual => GreaterThanOrEqual,
            GreaterThan => LessThan,
            GreaterThanOrEqual => LessThanOrEqual,
            other => *other,
        }
    }
}

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Boolean inversion
    Not,
    /// Arithmetic negation
    Negate,
}

////////////////////////////////////////////////////////////////////////
// Members and methods
////////////////////////////////////////////////////////////////////////

/// Identity and metadata of a record member, as the query builder captured it.
///
/// Carries what host reflection would otherwise supply: the declaring type name, the member name,
/// an optional attribute-supplied literal field name (which beats any mapping name conversion),
/// and whether the backing index field is not-analyzed (which suppresses term lower-casing).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberRef {
    pub declaring_type: String,
    pub name: String,
    pub name_override: Option<String>,
    pub not_analyzed: bool,
}

impl MemberRef {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            name_override: None,
            not_analyzed: false,
        }
    }

    /// Attribute-supplied literal field name; wins over the mapping's name conversion.
    pub fn with_name_override(mut self, name: impl Into<String>) -> Self {
        self.name_override = Some(name.into());
        self
    }

    /// Marks the backing field as not-analyzed.
    pub fn not_analyzed(mut self) -> Self {
        self.not_analyzed = true;
        self
    }

    pub(crate) fn is_nullable_has_value(&self) -> bool {
        self.declaring_type == NULLABLE_TYPE && self.name == "HasValue"
    }

    pub(crate) fn is_nullable_value(&self) -> bool {
        self.declaring_type == NULLABLE_TYPE && self.name == "Value"
    }
}

/// Identity of a well-known method, matched by declaring type and name; the arity comes from the
/// call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodId {
    pub declaring_type: String,
    pub name: String,
}

impl MethodId {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
        }
    }
}

impl Display for MethodId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.name)
    }
}

////////////////////////////////////////////////////////////////////////
// Expression nodes
////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberExpression {
    /// The expression the member is read from, or `None` for a static member.
    pub target: Option<Box<Expression>>,
    pub member: MemberRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpression {
    pub op: BinaryOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

impl BinaryExpression {
    fn new(op: BinaryOp, left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self {
            op,
            left: Box::new(left.into()),
            right: Box::new(right.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpression {
    pub op: UnaryOp,
    pub expr: Box<Expression>,
}

impl UnaryExpression {
    fn new(op: UnaryOp, expr: impl Into<Expression>) -> Self {
        Self {
            op,
            expr: Box::new(expr.into()),
        }
    }
}

/// A type conversion. Kept as its own node (not a [`UnaryOp`]) so rewrite passes can elide it
/// transparently: the translator compares in the converted numeric domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertExpression {
    pub expr: Box<Expression>,
    pub target: ScalarKind,
}

impl ConvertExpression {
    fn new(expr: impl Into<Expression>, target: ScalarKind) -> Self {
        Self {
            expr: Box::new(expr.into()),
            target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCallExpression {
    /// The receiver of an instance call, or `None` for a static call.
    pub receiver: Option<Box<Expression>>,
    pub method: MethodId,
    pub args: Vec<Expression>,
}

impl MethodCallExpression {
    /// Number of inputs to the call, counting the receiver of an instance call.
    pub fn arity(&self) -> usize {
        self.args.len() + usize::from(self.receiver.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaExpression {
    /// Name of the bound record parameter.
    pub parameter: String,
    pub body: Box<Expression>,
}

/// A predicate expression tree.
///
/// Nodes do not track or validate static types beyond what their shape implies; the translator
/// validates shapes during pattern dispatch and reports anything it cannot express.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// An evaluated value.
    Constant(Scalar),
    /// A reference to a bound lambda parameter, by name.
    Parameter(String),
    /// A member access, e.g. `r.stats.cost`.
    Member(MemberExpression),
    /// An operation over two expressions.
    Binary(BinaryExpression),
    /// An operation over one expression.
    Unary(UnaryExpression),
    /// A type conversion; transparently elided by the translator.
    Convert(ConvertExpression),
    /// A quoted nested lambda; transparently unwrapped.
    Quote(Box<Expression>),
    /// A call to a well-known method.
    Call(MethodCallExpression),
    /// A sequence literal; folds to a [`Scalar::Sequence`] once every element is constant.
    Sequence(Vec<Expression>),
    /// A lambda binding a record parameter over a body.
    Lambda(Box<LambdaExpression>),
}

impl Expression {
    /// Returns the set of parameter names referenced anywhere in this expression.
    pub fn references(&self) -> HashSet<&str> {
        let mut references = GetParameterReferences::default();
        let _ = references.transform_expr(self);
        references.into_inner()
    }

    /// Short node-kind label used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expression::Constant(_) => "constant",
            Expression::Parameter(_) => "parameter",
            Expression::Member(_) => "member access",
            Expression::Binary(_) => "binary",
            Expression::Unary(_) => "unary",
            Expression::Convert(_) => "convert",
            Expression::Quote(_) => "quote",
            Expression::Call(_) => "method call",
            Expression::Sequence(_) => "sequence",
            Expression::Lambda(_) => "lambda",
        }
    }

    /// Create a new expression for a constant value.
    pub fn constant(value: impl Into<Scalar>) -> Self {
        Self::Constant(value.into())
    }

    /// Creates a null constant.
    pub const fn null_constant() -> Self {
        Self::Constant(Scalar::Null)
    }

    /// Creates a reference to a bound parameter.
    pub fn parameter(name: impl Into<String>) -> Self {
        Self::Parameter(name.into())
    }

    /// Creates a member access on a target expression.
    pub fn member(target: impl Into<Expression>, member: MemberRef) -> Self {
        Self::Member(MemberExpression {
            target: Some(Box::new(target.into())),
            member,
        })
    }

    /// Creates a static member access.
    pub fn static_member(member: MemberRef) -> Self {
        Self::Member(MemberExpression {
            target: None,
            member,
        })
    }

    /// Creates a new binary expression `lhs OP rhs`.
    pub fn binary(op: BinaryOp, lhs: impl Into<Expression>, rhs: impl Into<Expression>) -> Self {
        Self::Binary(BinaryExpression::new(op, lhs, rhs))
    }

    /// Create a new expression `self == other`.
    pub fn eq(self, other: impl Into<Expression>) -> Self {
        Self::binary(BinaryOp::Equal, self, other)
    }

    /// Create a new expression `self != other`.
    pub fn ne(self, other: impl Into<Expression>) -> Self {
        Self::binary(BinaryOp::NotEqual, self, other)
    }

    /// Create a new expression `self < other`.
    pub fn lt(self, other: impl Into<Expression>) -> Self {
        Self::binary(BinaryOp::LessThan, self, other)
    }

    /// Create a new expression `self <= other`.
    pub fn le(self, other: impl Into<Expression>) -> Self {
        Self::binary(BinaryOp::LessThanOrEqual, self, other)
    }

    /// Create a new expression `self > other`.
    pub fn gt(self, other: impl Into<Expression>) -> Self {
        Self::binary(BinaryOp::GreaterThan, self, other)
    }

    /// Create a new expression `self >= other`.
    pub fn ge(self, other: impl Into<Expression>) -> Self {
        Self::binary(BinaryOp::GreaterThanOrEqual, self, other)
    }

    /// Create a new expression `a && b`.
    pub fn and_also(a: impl Into<Expression>, b: impl Into<Expression>) -> Self {
        Self::binary(BinaryOp::AndAlso, a, b)
    }

    /// Create a new expression `a || b`.
    pub fn or_else(a: impl Into<Expression>, b: impl Into<Expression>) -> Self {
        Self::binary(BinaryOp::OrElse, a, b)
    }

    /// Creates a new unary expression.
    pub fn unary(op: UnaryOp, expr: impl Into<Expression>) -> Self {
        Self::Unary(UnaryExpression::new(op, expr))
    }

    /// Create a new expression `!self`.
    pub fn not(expr: impl Into<Expression>) -> Self {
        Self::unary(UnaryOp::Not, expr)
    }

    /// Creates a conversion of `expr` into the target scalar kind.
    pub fn convert(expr: impl Into<Expression>, target: ScalarKind) -> Self {
        Self::Convert(ConvertExpression::new(expr, target))
    }

    /// Creates a quoted expression.
    pub fn quote(expr: impl Into<Expression>) -> Self {
        Self::Quote(Box::new(expr.into()))
    }

    /// Creates a call to a well-known method.
    pub fn call(
        receiver: Option<Expression>,
        method: MethodId,
        args: impl IntoIterator<Item = Expression>,
    ) -> Self {
        Self::Call(MethodCallExpression {
            receiver: receiver.map(Box::new),
            method,
            args: args.into_iter().collect(),
        })
    }

    /// Creates a sequence literal.
    pub fn sequence(items: impl IntoIterator<Item = impl Into<Expression>>) -> Self {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }

    /// Creates a lambda binding `parameter` over `body`.
    pub fn lambda(parameter: impl Into<String>, body: impl Into<Expression>) -> Self {
        Self::Lambda(Box::new(LambdaExpression {
            parameter: parameter.into(),
            body: Box::new(body.into()),
        }))
    }
}

////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use BinaryOp::*;
        let symbol = match self {
            Equal => "==",
            NotEqual => "!=",
            LessThan => "<",
            LessThanOrEqual => "<=",
            GreaterThan => ">",
            GreaterThanOrEqual => ">=",
            AndAlso => "&&",
            OrElse => "||",
            Add => "+",
            Subtract => "-",
            Multiply => "*",
            Divide => "/",
            Modulo => "%",
        };
        write!(f, "{symbol}")
    }
}

// Helper for displaying the children of calls and sequence literals
fn format_child_list<T: Display>(children: &[T]) -> String {
    children.iter().map(|c| format!("{c}")).join(", ")
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use Expression::*;
        match self {
            Constant(s) => write!(f, "{s}"),
            Parameter(name) => write!(f, "{name}"),
            Member(m) => match &m.target {
                Some(target) => write!(f, "{target}.{}", m.member.name),
                None => write!(f, "{}.{}", m.member.declaring_type, m.member.name),
            },
            Binary(b) => write!(f, "{} {} {}", b.left, b.op, b.right),
            Unary(u) => match u.op {
                UnaryOp::Not => write!(f, "!({})", u.expr),
                UnaryOp::Negate => write!(f, "-({})", u.expr),
            },
            Convert(c) => write!(f, "Convert({}, {})", c.expr, c.target),
            Quote(q) => write!(f, "Quote({q})"),
            Call(c) => match &c.receiver {
                Some(receiver) => {
                    write!(f, "{receiver}.{}({})", c.method.name, format_child_list(&c.args))
                }
                None => write!(f, "{}({})", c.method, format_child_list(&c.args)),
            },
            Sequence(items) => write!(f, "[{}]", format_child_list(items)),
            Lambda(l) => write!(f, "{} => {}", l.parameter, l.body),
        }
    }
}

impl From<Scalar> for Expression {
    fn from(value: Scalar) -> Self {
        Self::Constant(value)
    }
}

impl From<bool> for Expression {
    fn from(value: bool) -> Self {
        Self::constant(value)
    }
}

impl From<i64> for Expression {
    fn from(value: i64) -> Self {
        Self::constant(value)
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl From<&str> for Expression {
    fn from(value: &str) -> Self {
        Self::constant(value)
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use serde::de::DeserializeOwned;
    use serde::Serialize;

    use super::*;

    /// Helper function to verify roundtrip serialization/deserialization
    fn assert_roundtrip<T: Serialize + DeserializeOwned + PartialEq + Debug>(value: &T) {
        let json = serde_json::to_string(value).expect("serialization should succeed");
        let deserialized: T = serde_json::from_str(&json).expect("deserialization should succeed");
        assert_eq!(value, &deserialized, "roundtrip should preserve value");
    }

    fn name_member() -> MemberRef {
        MemberRef::new("Robot", "Name")
    }

    #[test]
    fn test_expression_format() {
        let cases = [
            (
                Expression::member(Expression::parameter("r"), name_member())
                    .eq(Expression::constant("Marvin")),
                "r.Name == 'Marvin'",
            ),
            (
                Expression::lambda(
                    "r",
                    Expression::not(Expression::member(
                        Expression::parameter("r"),
                        name_member(),
                    )),
                ),
                "r => !(r.Name)",
            ),
            (
                Expression::call(
                    None,
                    MethodId::new("ElasticMethods", "Prefix"),
                    [
                        Expression::member(Expression::parameter("r"), name_member()),
                        Expression::constant("mar"),
                    ],
                ),
                "ElasticMethods.Prefix(r.Name, 'mar')",
            ),
            (
                Expression::sequence([Expression::constant(1i64), Expression::constant(2i64)]),
                "[1, 2]",
            ),
            (
                Expression::convert(Expression::constant(1i64), ScalarKind::Double),
                "Convert(1, double)",
            ),
        ];

        for (expr, expected) in cases {
            assert_eq!(format!("{expr}"), expected);
        }
    }

    #[test]
    fn test_references_collects_parameters() {
        let expr = Expression::and_also(
            Expression::member(Expression::parameter("r"), name_member())
                .eq(Expression::constant("x")),
            Expression::member(Expression::parameter("s"), name_member())
                .eq(Expression::constant("y")),
        );
        let refs = expr.references();
        assert_eq!(refs.len(), 2);
        assert!(refs.contains("r"));
        assert!(refs.contains("s"));

        assert!(Expression::constant(1i64).references().is_empty());
    }

    #[test]
    fn test_arity_counts_receiver() {
        let instance = Expression::call(
            Some(Expression::parameter("r")),
            MethodId::new("Object", "Equals"),
            [Expression::constant(1i64)],
        );
        let Expression::Call(call) = instance else {
            panic!("expected call");
        };
        assert_eq!(call.arity(), 2);

        let stat = Expression::call(
            None,
            MethodId::new("Object", "Equals"),
            [Expression::constant(1i64), Expression::constant(2i64)],
        );
        let Expression::Call(call) = stat else {
            panic!("expected call");
        };
        assert_eq!(call.arity(), 2);
    }

    #[test]
    fn test_expression_roundtrip() {
        let cases = [
            Expression::constant(42i64),
            Expression::null_constant(),
            Expression::lambda(
                "r",
                Expression::and_also(
                    Expression::member(Expression::parameter("r"), name_member())
                        .ne(Expression::constant("x")),
                    Expression::member(
                        Expression::parameter("r"),
                        MemberRef::new("Robot", "Cost"),
                    )
                    .gt(Expression::constant(3.5)),
                ),
            ),
            Expression::quote(Expression::lambda("r", Expression::constant(true))),
            Expression::call(
                None,
                MethodId::new("Enumerable", "Contains"),
                [
                    Expression::sequence([Expression::constant("a"), Expression::constant("b")]),
                    Expression::member(Expression::parameter("r"), name_member()),
                ],
            ),
        ];

        for expr in &cases {
            assert_roundtrip(expr);
        }
    }
}
