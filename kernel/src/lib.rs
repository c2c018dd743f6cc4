//! elastic-kernel: the core of a typed-query translator for Elasticsearch
//!
//! The crate turns a strongly-typed predicate expression tree, the shape a deferred-execution
//! query builder produces over a user-defined record type, into the filter of an Elasticsearch
//! search request. The pipeline is a sequence of pure rewrites:
//!
//! 1. [`expressions::evaluate::partially_evaluate`] folds every sub-expression that does not
//!    depend on the bound record parameter into a constant.
//! 2. [`translate::translate_predicate`] pattern-matches the evaluated body into the
//!    [`criteria`] algebra, resolving member chains to dotted field paths through a pluggable
//!    [`mapping::Mapping`].
//! 3. The criteria combinators normalize as they build, so the emitted tree is always canonical:
//!    flat conjunctions, absorbed constants, coalesced terms and ranges.
//! 4. [`request::build_search_request`] wraps the result in the request shell together with the
//!    mapping's type-selection criterion.
//!
//! Everything is stateless and allocation-per-call; concurrent translations over shared mappings
//! never interfere. Transport, response handling, projections, and ordering wrappers live outside
//! this crate.

pub mod criteria;
mod error;
pub mod expressions;
pub mod mapping;
pub mod request;
pub mod translate;
pub(crate) mod utils;

pub use error::{ElasticResult, Error};
pub use request::{build_search_request, SearchRequest};
pub use translate::translate_predicate;
