//! Error types for the netweave merge pipeline.
//!
//! Schema errors are fatal at load time; id collisions and shift-range
//! violations after the merge indicate an upstream shift-computation bug and
//! are surfaced as invariant failures rather than silently corrupted output.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A required column is absent from an input table.
    #[error("{file} is missing required columns: {columns:?}")]
    MissingColumns { file: String, columns: Vec<String> },

    /// A cell failed to parse as the type its column requires.
    #[error("{file}: record {row}: invalid value {value:?} in column {column}")]
    InvalidValue {
        file: String,
        row: usize,
        column: String,
        value: String,
    },

    /// TAZ identifiers must be unique; they become node ids after the merge.
    #[error("duplicate TAZ identifier {taz_id} in {file}")]
    DuplicateTaz { taz_id: i64, file: String },

    /// The meso network has no largest strongly connected component to
    /// attach connectors to.
    #[error("meso network has no routable core (largest SCC is empty)")]
    EmptyRoutableCore,

    /// A TAZ reached connector generation without a rank-1 access candidate.
    #[error("TAZ {taz_id} has no access candidate in the routable core")]
    NoCandidate { taz_id: i64 },

    /// A connector references a TAZ missing from the centroid table.
    #[error("TAZ {taz_id} referenced by the micro access map does not exist")]
    UnknownTaz { taz_id: i64 },

    /// A connector target node id resolves to no node row.
    #[error("node {node_id} referenced by a connector does not exist")]
    UnknownNode { node_id: i64 },

    /// Post-merge uniqueness invariant violated.
    #[error("duplicate {kind} ids after merge: {sample:?}")]
    DuplicateIds { kind: &'static str, sample: Vec<i64> },

    /// A merged link endpoint resolves to no row in the merged node table.
    #[error("link {link_id} references missing node {node_id}")]
    DanglingEndpoint { link_id: i64, node_id: i64 },

    /// Shifted ids fall outside the range the shift plan reserved for them.
    #[error("id shift outside planned range: {0}")]
    ShiftViolation(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience result type for netweave operations.
pub type Result<T> = std::result::Result<T, Error>;
