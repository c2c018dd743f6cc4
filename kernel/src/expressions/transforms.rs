use std::borrow::{Cow, ToOwned};
use std::collections::HashSet;

use crate::expressions::{
    BinaryExpression, ConvertExpression, Expression, LambdaExpression, MemberExpression,
    MethodCallExpression, Scalar, UnaryExpression,
};
use crate::utils::CowExt as _;

/// Generic framework for recursive bottom-up transforms of expression trees. Transformations
/// return `Option<Cow>` with the following semantics:
///
/// * `Some(Cow::Owned)` -- The input was transformed and the parent should be updated with it.
/// * `Some(Cow::Borrowed)` -- The input was not transformed.
/// * `None` -- The input was filtered out and the parent should be updated to not reference it.
///
/// The transform starts from the generic [`Self::transform_expr`], or directly from a specific
/// expression variant (e.g. [`Self::transform_member`] for [`MemberExpression`]).
///
/// The provided `transform_xxx` methods all default to no-op (returning their input as
/// `Some(Cow::Borrowed)`), and implementations should selectively override specific
/// `transform_xxx` methods as needed for the task at hand.
///
/// The provided `recurse_into_xxx` methods encapsulate the boilerplate work of recursing into the
/// children of each expression variant. Implementations can call these as needed but will
/// generally not need to override them.
pub trait ExpressionTransform<'a> {
    /// Called for each constant encountered during the traversal.
    fn transform_constant(&mut self, value: &'a Scalar) -> Option<Cow<'a, Scalar>> {
        Some(Cow::Borrowed(value))
    }

    /// Called for each parameter reference encountered during the traversal.
    fn transform_parameter(&mut self, name: &'a String) -> Option<Cow<'a, String>> {
        Some(Cow::Borrowed(name))
    }

    /// Called for each [`MemberExpression`] encountered during the traversal. Implementations can
    /// call [`Self::recurse_into_member`] if they wish to recursively transform the target.
    fn transform_member(
        &mut self,
        member: &'a MemberExpression,
    ) -> Option<Cow<'a, MemberExpression>> {
        self.recurse_into_member(member)
    }

    /// Called for each [`BinaryExpression`] encountered during the traversal. Implementations can
    /// call [`Self::recurse_into_binary`] if they wish to recursively transform the children.
    fn transform_binary(
        &mut self,
        expr: &'a BinaryExpression,
    ) -> Option<Cow<'a, BinaryExpression>> {
        self.recurse_into_binary(expr)
    }

    /// Called for each [`UnaryExpression`] encountered during the traversal. Implementations can
    /// call [`Self::recurse_into_unary`] if they wish to recursively transform the child.
    fn transform_unary(&mut self, expr: &'a UnaryExpression) -> Option<Cow<'a, UnaryExpression>> {
        self.recurse_into_unary(expr)
    }

    /// Called for each [`ConvertExpression`] encountered during the traversal. Implementations
    /// can call [`Self::recurse_into_convert`] if they wish to recursively transform the child.
    fn transform_convert(
        &mut self,
        expr: &'a ConvertExpression,
    ) -> Option<Cow<'a, ConvertExpression>> {
        self.recurse_into_convert(expr)
    }

    /// Called for the child of each [`Expression::Quote`] encountered during the traversal.
    fn transform_quote(&mut self, expr: &'a Expression) -> Option<Cow<'a, Expression>> {
        self.transform_expr(expr)
    }

    /// Called for each [`MethodCallExpression`] encountered during the traversal. Implementations
    /// can call [`Self::recurse_into_call`] if they wish to recursively transform the children.
    fn transform_call(
        &mut self,
        call: &'a MethodCallExpression,
    ) -> Option<Cow<'a, MethodCallExpression>> {
        self.recurse_into_call(call)
    }

    /// Called for the element list of each [`Expression::Sequence`] encountered during the
    /// traversal. Implementations can call [`Self::recurse_into_sequence`] if they wish to
    /// recursively transform the elements.
    fn transform_sequence(&mut self, items: &'a [Expression]) -> Option<Cow<'a, [Expression]>> {
        self.recurse_into_sequence(items)
    }

    /// Called for each [`LambdaExpression`] encountered during the traversal. Implementations can
    /// call [`Self::recurse_into_lambda`] if they wish to recursively transform the body.
    fn transform_lambda(
        &mut self,
        lambda: &'a LambdaExpression,
    ) -> Option<Cow<'a, LambdaExpression>> {
        self.recurse_into_lambda(lambda)
    }

    /// General entry point for transforming an expression. This method will dispatch to the
    /// specific transform for each expression variant. Also invoked internally in order to recurse
    /// on the child(ren) of non-leaf variants.
    fn transform_expr(&mut self, expr: &'a Expression) -> Option<Cow<'a, Expression>> {
        let expr = match expr {
            Expression::Constant(s) => self
                .transform_constant(s)?
                .map_owned_or_else(expr, Expression::Constant),
            Expression::Parameter(name) => self
                .transform_parameter(name)?
                .map_owned_or_else(expr, Expression::Parameter),
            Expression::Member(m) => self
                .transform_member(m)?
                .map_owned_or_else(expr, Expression::Member),
            Expression::Binary(b) => self
                .transform_binary(b)?
                .map_owned_or_else(expr, Expression::Binary),
            Expression::Unary(u) => self
                .transform_unary(u)?
                .map_owned_or_else(expr, Expression::Unary),
            Expression::Convert(c) => self
                .transform_convert(c)?
                .map_owned_or_else(expr, Expression::Convert),
            Expression::Quote(q) => self
                .transform_quote(q)?
                .map_owned_or_else(expr, |e| Expression::Quote(Box::new(e))),
            Expression::Call(c) => self
                .transform_call(c)?
                .map_owned_or_else(expr, Expression::Call),
            Expression::Sequence(items) => self
                .transform_sequence(items)?
                .map_owned_or_else(expr, Expression::Sequence),
            Expression::Lambda(l) => self
                .transform_lambda(l)?
                .map_owned_or_else(expr, |l| Expression::Lambda(Box::new(l))),
        };
        Some(expr)
    }

    /// Recursively transforms a member access target. Returns `None` if the target was removed,
    /// `Some(Cow::Owned)` if the target changed, and `Some(Cow::Borrowed)` otherwise. Static
    /// member accesses have no target and pass through borrowed.
    fn recurse_into_member(
        &mut self,
        m: &'a MemberExpression,
    ) -> Option<Cow<'a, MemberExpression>> {
        match &m.target {
            Some(target) => {
                let nested_result = self.transform_expr(target)?;
                Some(nested_result.map_owned_or_else(m, |target| MemberExpression {
                    target: Some(Box::new(target)),
                    member: m.member.clone(),
                }))
            }
            None => Some(Cow::Borrowed(m)),
        }
    }

    /// Recursively transforms a binary expression's children. Returns `None` if at least one child
    /// was removed, `Some(Cow::Owned)` if at least one child changed, and `Some(Cow::Borrowed)`
    /// otherwise.
    fn recurse_into_binary(
        &mut self,
        b: &'a BinaryExpression,
    ) -> Option<Cow<'a, BinaryExpression>> {
        let left = self.transform_expr(&b.left)?;
        let right = self.transform_expr(&b.right)?;
        let f = |(left, right)| BinaryExpression {
            op: b.op,
            left: Box::new(left),
            right: Box::new(right),
        };
        Some((left, right).map_owned_or_else(b, f))
    }

    /// Recursively transforms a unary expression's child. Returns `None` if the child was removed,
    /// `Some(Cow::Owned)` if the child was changed, and `Some(Cow::Borrowed)` otherwise.
    fn recurse_into_unary(&mut self, u: &'a UnaryExpression) -> Option<Cow<'a, UnaryExpression>> {
        let nested_result = self.transform_expr(&u.expr)?;
        Some(nested_result.map_owned_or_else(u, |expr| UnaryExpression {
            op: u.op,
            expr: Box::new(expr),
        }))
    }

    /// Recursively transforms a conversion's child. Returns `None` if the child was removed,
    /// `Some(Cow::Owned)` if the child was changed, and `Some(Cow::Borrowed)` otherwise.
    fn recurse_into_convert(
        &mut self,
        c: &'a ConvertExpression,
    ) -> Option<Cow<'a, ConvertExpression>> {
        let nested_result = self.transform_expr(&c.expr)?;
        Some(nested_result.map_owned_or_else(c, |expr| ConvertExpression {
            expr: Box::new(expr),
            target: c.target,
        }))
    }

    /// Recursively transforms a method call's receiver and arguments. Returns `None` if the
    /// receiver or any argument was removed, `Some(Cow::Owned)` if any of them changed, and
    /// `Some(Cow::Borrowed)` otherwise.
    fn recurse_into_call(
        &mut self,
        c: &'a MethodCallExpression,
    ) -> Option<Cow<'a, MethodCallExpression>> {
        let receiver = match &c.receiver {
            Some(receiver) => Some(self.transform_expr(receiver)?),
            None => None,
        };
        // An empty argument list passes through borrowed; removal semantics only apply to calls
        // that actually have arguments.
        let args = if c.args.is_empty() {
            Cow::Borrowed(&c.args[..])
        } else {
            recurse_into_children(&c.args, |e| self.transform_expr(e))?
        };
        let receiver_borrowed = !matches!(&receiver, Some(Cow::Owned(_)));
        if receiver_borrowed && matches!(&args, Cow::Borrowed(_)) {
            Some(Cow::Borrowed(c))
        } else {
            Some(Cow::Owned(MethodCallExpression {
                receiver: receiver.map(|r| Box::new(r.into_owned())),
                method: c.method.clone(),
                args: args.into_owned(),
            }))
        }
    }

    /// Recursively transforms a sequence literal's elements. Returns `None` if all elements were
    /// removed, `Some(Cow::Owned)` if at least one element was changed or removed, and
    /// `Some(Cow::Borrowed)` otherwise.
    fn recurse_into_sequence(&mut self, items: &'a [Expression]) -> Option<Cow<'a, [Expression]>> {
        recurse_into_children(items, |e| self.transform_expr(e))
    }

    /// Recursively transforms a lambda's body. Returns `None` if the body was removed,
    /// `Some(Cow::Owned)` if the body changed, and `Some(Cow::Borrowed)` otherwise.
    fn recurse_into_lambda(
        &mut self,
        l: &'a LambdaExpression,
    ) -> Option<Cow<'a, LambdaExpression>> {
        let nested_result = self.transform_expr(&l.body)?;
        Some(nested_result.map_owned_or_else(l, |body| LambdaExpression {
            parameter: l.parameter.clone(),
            body: Box::new(body),
        }))
    }
}

/// Shared recursion over the variadic child lists (call arguments, sequence elements). An
/// untouched list stays borrowed; a rewritten or filtered child forces an owned rebuild; a list
/// whose every child was filtered out disappears entirely.
fn recurse_into_children<'a, T: Clone>(
    children: &'a [T],
    mut recurse_fn: impl FnMut(&'a T) -> Option<Cow<'a, T>>,
) -> Option<Cow<'a, [T]>> {
    let mut surviving: Vec<Cow<'a, T>> = Vec::with_capacity(children.len());
    let mut rewritten = false;
    for child in children {
        match recurse_fn(child) {
            Some(result) => {
                rewritten |= matches!(&result, Cow::Owned(_));
                surviving.push(result);
            }
            None => rewritten = true,
        }
    }
    if surviving.is_empty() {
        return None;
    }
    if !rewritten {
        return Some(Cow::Borrowed(children));
    }
    Some(Cow::Owned(
        surviving.into_iter().map(Cow::into_owned).collect(),
    ))
}

/// Retrieves the set of parameter names referenced by an expression.
#[derive(Default)]
pub(crate) struct GetParameterReferences<'a> {
    references: HashSet<&'a str>,
}

impl<'a> GetParameterReferences<'a> {
    pub(crate) fn into_inner(self) -> HashSet<&'a str> {
        self.references
    }
}

impl<'a> ExpressionTransform<'a> for GetParameterReferences<'a> {
    fn transform_parameter(&mut self, name: &'a String) -> Option<Cow<'a, String>> {
        self.references.insert(name);
        Some(Cow::Borrowed(name))
    }
}

/// An expression "transform" that doesn't actually change the expression at all. Instead, it
/// measures the maximum depth of an expression, with a depth limit to prevent stack overflow.
/// Useful for verifying that an expression has reasonable depth before attempting to work with it.
pub struct ExpressionDepthChecker {
    depth_limit: usize,
    max_depth_seen: usize,
    current_depth: usize,
}

impl ExpressionDepthChecker {
    /// Depth-checks the given expression against a given depth limit. The return value is the
    /// largest depth seen, which is capped at one more than the depth limit (indicating the
    /// recursion was terminated).
    pub fn check_expr(expr: &Expression, depth_limit: usize) -> usize {
        let mut checker = Self::new(depth_limit);
        checker.transform_expr(expr);
        checker.max_depth_seen
    }

    fn new(depth_limit: usize) -> Self {
        Self {
            depth_limit,
            max_depth_seen: 0,
            current_depth: 0,
        }
    }

    // Triggers the requested recursion only if doing so would not exceed the depth limit.
    fn depth_limited<'a, T: std::fmt::Debug + ToOwned + ?Sized>(
        &mut self,
        recurse: impl FnOnce(&mut Self, &'a T) -> Option<Cow<'a, T>>,
        arg: &'a T,
    ) -> Option<Cow<'a, T>> {
        if self.max_depth_seen < self.current_depth {
            self.max_depth_seen = self.current_depth;
            if self.depth_limit < self.current_depth {
                tracing::warn!(
                    "Max expression depth {} exceeded by {arg:?}",
                    self.depth_limit
                );
            }
        }
        if self.max_depth_seen <= self.depth_limit {
            self.current_depth += 1;
            let _ = recurse(self, arg);
            self.current_depth -= 1;
        }
        None
    }
}

impl<'a> ExpressionTransform<'a> for ExpressionDepthChecker {
    fn transform_member(
        &mut self,
        member: &'a MemberExpression,
    ) -> Option<Cow<'a, MemberExpression>> {
        self.depth_limited(Self::recurse_into_member, member)
    }

    fn transform_binary(
        &mut self,
        expr: &'a BinaryExpression,
    ) -> Option<Cow<'a, BinaryExpression>> {
        self.depth_limited(Self::recurse_into_binary, expr)
    }

    fn transform_unary(&mut self, expr: &'a UnaryExpression) -> Option<Cow<'a, UnaryExpression>> {
        self.depth_limited(Self::recurse_into_unary, expr)
    }

    fn transform_convert(
        &mut self,
        expr: &'a ConvertExpression,
    ) -> Option<Cow<'a, ConvertExpression>> {
        self.depth_limited(Self::recurse_into_convert, expr)
    }

    fn transform_quote(&mut self, expr: &'a Expression) -> Option<Cow<'a, Expression>> {
        self.depth_limited(Self::transform_expr, expr)
    }

    fn transform_call(
        &mut self,
        call: &'a MethodCallExpression,
    ) -> Option<Cow<'a, MethodCallExpression>> {
        self.depth_limited(Self::recurse_into_call, call)
    }

    fn transform_sequence(&mut self, items: &'a [Expression]) -> Option<Cow<'a, [Expression]>> {
        self.depth_limited(Self::recurse_into_sequence, items)
    }

    fn transform_lambda(
        &mut self,
        lambda: &'a LambdaExpression,
    ) -> Option<Cow<'a, LambdaExpression>> {
        self.depth_limited(Self::recurse_into_lambda, lambda)
    }
}
