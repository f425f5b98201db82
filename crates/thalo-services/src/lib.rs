//! Editor-facing services over a thalo workspace: query execution, link
//! navigation, semantic tokens, and change tracking.

mod navigation;
mod query;
mod semantic_tokens;
mod tracker;

pub use navigation::{ReferencesResult, find_definition, find_references, find_references_at, link_id_at};
pub use query::{QueryHit, QueryOptions, QueryResult, execute_queries, execute_query};
pub use semantic_tokens::{EncodedToken, TokensLegend, legend, semantic_tokens};
pub use tracker::{
    ChangeTracker, GitClient, GitTracker, Marker, TimestampTracker, TrackerError, TrackerKind,
};
