use std::time::Duration;

use thiserror::Error;

pub mod aggregator;
pub mod backend;
pub mod config_file;
pub mod export;
pub mod filter;
pub mod graph;
pub mod ids;
pub mod merge;
pub mod model;
pub mod rate_limit;

// Re-export for convenience
pub use aggregator::{AggregateOutput, CitationAggregator, SeedOutput, SeedPartition};
pub use backend::{BackendError, PdfBackend};
pub use config_file::AggregatorConfig;
pub use filter::InclusionFilter;
pub use graph::{GraphClient, GraphError, PaperDetails, RelatedRecord, SeedRecord};
pub use merge::{AggregatedRow, Provenance, UnionState, merge_relation};
pub use model::{PaperRef, Relation, RelationKind, SeedPaper};
pub use rate_limit::CallThrottle;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("graph API error: {0}")]
    Graph(#[from] GraphError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

/// Progress events emitted while aggregating citations.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A seed paper was resolved and its relations are about to be processed.
    SeedStarted {
        index: usize,
        total: usize,
        label: String,
        citations: usize,
        references: usize,
    },
    /// One related record was looked at (included or not).
    RelationProcessed {
        label: String,
        kind: RelationKind,
        title: String,
        included: bool,
    },
    /// The call throttle hit its window and is sleeping.
    Throttled { pause: Duration },
    /// Per-seed CSVs were written.
    SeedWritten {
        label: String,
        citations: usize,
        references: usize,
    },
    /// The union CSV was written.
    UnionWritten { rows: usize },
}
