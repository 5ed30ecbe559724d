//! docdex-query
//!
//! Query planning (natural-language query + options -> weighted multi-field
//! request) and the highlight negotiator that guarantees a search never
//! fails because a document is too large to highlight.

pub mod highlight;
pub mod planner;

pub use highlight::{negotiate, NegotiatedHits};
pub use planner::{QueryOptions, QueryPlanner};
