//! ACL Anthology corpus reader and keyword scanner.
//!
//! Reads the anthology's bibliography XML, gates papers on abstract keywords,
//! downloads each candidate's PDF, and counts prompt and bias terms in the
//! body text. Also fetches the XML corpus from the anthology's GitHub tarball.

pub mod corpus;
pub mod download;
pub mod fetch;
pub mod keywords;
pub mod scanner;
mod xml_parser;

use thiserror::Error;

pub use corpus::AnthologyCorpus;
pub use download::{HttpDownloader, PdfDownloader};
pub use fetch::{FetchProgress, fetch_anthology};
pub use keywords::{KeywordCounts, KeywordSets};
pub use scanner::{ScanError, ScanProgress, ScanSettings, ScanSummary, Scanner};
pub use xml_parser::{AnthologyPaper, parse_xml};

#[derive(Error, Debug)]
pub enum AclError {
    #[error("download error: {0}")]
    Download(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
