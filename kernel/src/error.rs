//! Definitions of errors that the translation kernel can encounter

/// A [`std::result::Result`] that has the kernel [`Error`] as the error variant
pub type ElasticResult<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while translating a predicate expression into a search request.
///
/// Translation is all-or-nothing: any error aborts the whole predicate, no partial
/// criteria are ever emitted.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An expression node, member chain, or method identity the translator does not know how to
    /// express as a filter.
    #[error("Unsupported expression: {0}")]
    Unsupported(String),

    /// The partial evaluator failed to reduce a parameter-independent sub-expression to a value.
    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    /// A constructor received an argument it forbids, such as a blank field name.
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// A value fell outside the domain of its declared type, such as an enum ordinal with no
    /// defined symbol when symbolic formatting is requested.
    #[error("Value out of domain: {0}")]
    DomainRange(String),
}

// Convenience constructors. These can be dangerous as they make it easy to swallow the error
// context, so prefer including the offending expression (or its node kind) in the message.
impl Error {
    pub fn unsupported(msg: impl ToString) -> Self {
        Self::Unsupported(msg.to_string())
    }

    pub fn evaluation(msg: impl ToString) -> Self {
        Self::Evaluation(msg.to_string())
    }

    pub fn argument(msg: impl ToString) -> Self {
        Self::Argument(msg.to_string())
    }

    pub fn domain_range(msg: impl ToString) -> Self {
        Self::DomainRange(msg.to_string())
    }
}
