//! Scholarly graph client trait and implementations.

pub mod mock;
pub mod semantic_scholar;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::model::PaperRef;

pub use semantic_scholar::SemanticScholar;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rate limited (429) on {url}")]
    RateLimited { url: String },
    #[error("paper not found: {0}")]
    NotFound(String),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// One citation or reference edge as listed on a seed paper.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelatedRecord {
    pub paper_id: String,
    pub title: String,
    pub year: Option<i32>,
    pub url: Option<String>,
    /// Intent/section labels attached to the edge (may be empty).
    pub intents: Vec<String>,
    pub is_influential: bool,
}

/// A seed paper together with its edges.
#[derive(Debug, Clone, Default)]
pub struct SeedRecord {
    pub paper: PaperRef,
    pub citations: Vec<RelatedRecord>,
    pub references: Vec<RelatedRecord>,
}

/// Fields only available from a full-record lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperDetails {
    pub authors: Vec<String>,
    pub abstract_text: Option<String>,
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
}

/// A scholarly graph that can list a paper's edges and look up full records.
pub trait GraphClient: Send + Sync {
    /// The canonical name of this graph (e.g., "Semantic Scholar").
    fn name(&self) -> &str;

    /// Fetch a seed paper with its citations and references.
    fn fetch_seed<'a>(
        &'a self,
        paper_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<SeedRecord, GraphError>> + Send + 'a>>;

    /// Fetch the full record of a related paper by its graph-native ID.
    fn fetch_details<'a>(
        &'a self,
        paper_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<PaperDetails, GraphError>> + Send + 'a>>;
}
