//! Core records shared by the fetcher, the merger, and the exporter.

use std::collections::BTreeSet;
use std::fmt;

/// Bibliographic record for one paper, as returned by the graph API.
///
/// `paper_id` is the graph-native identifier and is the key used for
/// deduplication; the other identifiers are carried for export only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperRef {
    pub paper_id: String,
    pub title: String,
    pub abstract_text: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub url: Option<String>,
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
}

/// Direction of an edge between a seed and a related paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationKind {
    /// The related paper cites the seed.
    Citation,
    /// The seed cites the related paper.
    Reference,
}

impl RelationKind {
    /// Plural form used in output file names (`Smith2020_citations.csv`).
    pub fn file_suffix(self) -> &'static str {
        match self {
            RelationKind::Citation => "citations",
            RelationKind::Reference => "references",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKind::Citation => write!(f, "citation"),
            RelationKind::Reference => write!(f, "reference"),
        }
    }
}

/// A seed paper and the label used to group its outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedPaper {
    pub paper: PaperRef,
    pub label: String,
}

impl SeedPaper {
    pub fn new(paper: PaperRef) -> Self {
        let label = seed_label(&paper);
        Self { paper, label }
    }
}

/// Derive a human-readable label: first author's surname followed by the year.
///
/// The surname is the last whitespace-separated token of the first author's
/// name. Papers without authors get `Anonymous`. Path separators are replaced
/// because the label becomes part of a file name.
pub fn seed_label(paper: &PaperRef) -> String {
    let surname = paper
        .authors
        .first()
        .and_then(|name| name.split_whitespace().last())
        .unwrap_or("Anonymous");
    let year = paper.year.map(|y| y.to_string()).unwrap_or_default();
    format!("{surname}{year}").replace(['/', '\\'], "_")
}

/// One edge traversal: `related` appears as a citation or reference of `seed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Graph identifier of the seed that produced this edge.
    pub seed_id: String,
    pub seed_label: String,
    pub related: PaperRef,
    pub kind: RelationKind,
    pub intents: BTreeSet<String>,
    pub is_influential: bool,
}
