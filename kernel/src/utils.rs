//! Small helpers shared across the crate

use std::borrow::Cow;

/// Convenience macro for checking a condition and returning an error if it is not met.
macro_rules! require {
    ( $cond: expr, $err: expr ) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}
pub(crate) use require;

/// Extension trait for rebuilding a parent value from the possibly-rewritten pieces of its
/// children. If every piece is still borrowed the parent is returned borrowed as well; as soon as
/// one piece was rewritten, `f` assembles a new owned parent.
pub(crate) trait CowExt<'a> {
    type Owned;

    fn map_owned_or_else<U, F>(self, original: &'a U, f: F) -> Cow<'a, U>
    where
        U: ToOwned + ?Sized,
        F: FnOnce(Self::Owned) -> U::Owned;
}

impl<'a, T: ToOwned + ?Sized> CowExt<'a> for Cow<'a, T> {
    type Owned = T::Owned;

    fn map_owned_or_else<U, F>(self, original: &'a U, f: F) -> Cow<'a, U>
    where
        U: ToOwned + ?Sized,
        F: FnOnce(<Self as CowExt<'a>>::Owned) -> U::Owned,
    {
        match self {
            Cow::Owned(value) => Cow::Owned(f(value)),
            Cow::Borrowed(_) => Cow::Borrowed(original),
        }
    }
}

impl<'a, A, B> CowExt<'a> for (Cow<'a, A>, Cow<'a, B>)
where
    A: ToOwned + ?Sized,
    B: ToOwned + ?Sized,
{
    type Owned = (A::Owned, B::Owned);

    fn map_owned_or_else<U, F>(self, original: &'a U, f: F) -> Cow<'a, U>
    where
        U: ToOwned + ?Sized,
        F: FnOnce(Self::Owned) -> U::Owned,
    {
        match self {
            (Cow::Borrowed(_), Cow::Borrowed(_)) => Cow::Borrowed(original),
            (a, b) => Cow::Owned(f((a.into_owned(), b.into_owned()))),
        }
    }
}
