//! Seed identifier normalization for the Semantic Scholar graph API.
//!
//! The graph API wants typed identifiers (`DOI:10.x/...`, `ARXIV:2106.01234`).
//! Configs usually list bare DOIs and arXiv IDs, so those get a prefix here;
//! native paper IDs and already-prefixed IDs pass through.

use once_cell::sync::Lazy;
use regex::Regex;

/// Prefixes the graph API understands.
const KNOWN_PREFIXES: &[&str] = &[
    "DOI:", "ARXIV:", "CORPUSID:", "MAG:", "ACL:", "PMID:", "PMCID:", "URL:",
];

static DOI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^10\.\d{4,9}/\S+$").unwrap());

static ARXIV_NEW_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}\.\d{4,5}(v\d+)?$").unwrap());

static ARXIV_OLD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z\-]*(\.[A-Z]{2})?/\d{7}(v\d+)?$").unwrap());

/// Turn a configured seed identifier into the form the graph API expects.
pub fn normalize_paper_id(raw: &str) -> String {
    let id = raw.trim();

    let upper = id.to_ascii_uppercase();
    if KNOWN_PREFIXES.iter().any(|p| upper.starts_with(p)) {
        // "arXiv:1234.5678" is common in configs; the API wants it upper-cased.
        if upper.starts_with("ARXIV:") {
            return format!("ARXIV:{}", &id["ARXIV:".len()..]);
        }
        return id.to_string();
    }

    let without_doi_url = id
        .strip_prefix("https://doi.org/")
        .or_else(|| id.strip_prefix("http://doi.org/"))
        .unwrap_or(id);
    if DOI_RE.is_match(without_doi_url) {
        return format!("DOI:{without_doi_url}");
    }

    if ARXIV_NEW_RE.is_match(id) || ARXIV_OLD_RE.is_match(id) {
        return format!("ARXIV:{id}");
    }

    id.to_string()
}
