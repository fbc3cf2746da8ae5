//! Anthology keyword scan.
//!
//! Candidates are papers whose abstract passes the keyword gate. For each
//! one the PDF is downloaded, its text extracted and saved next to it, and
//! the body is scored. Qualifying papers get a row in the output file, which
//! is flushed per row so partial runs keep what they found. A failure on one
//! paper never stops the scan.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use citescout_core::PdfBackend;
use thiserror::Error;

use crate::AclError;
use crate::corpus::AnthologyCorpus;
use crate::download::PdfDownloader;
use crate::keywords::{KeywordCounts, KeywordSets};
use crate::xml_parser::AnthologyPaper;

/// Header of the scan output file.
pub const OUTPUT_HEADER: [&str; 3] = ["link", "prompt count", "bias count"];

/// Why a single paper could not be scored.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("download failed for {id}: {reason}")]
    DownloadFailed { id: String, reason: String },
    #[error("text extraction failed for {id}: {reason}")]
    ExtractionFailed { id: String, reason: String },
    #[error("scan failed for {id}: {reason}")]
    Other { id: String, reason: String },
}

impl ScanError {
    pub fn paper_id(&self) -> &str {
        match self {
            ScanError::DownloadFailed { id, .. }
            | ScanError::ExtractionFailed { id, .. }
            | ScanError::Other { id, .. } => id,
        }
    }
}

/// Where the scan reads and writes.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Output file (`link,prompt count,bias count`).
    pub output: PathBuf,
    /// Scratch directory for downloaded PDFs and their text.
    pub work_dir: PathBuf,
    /// Directory for the extraction-failure log.
    pub log_dir: PathBuf,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            output: PathBuf::from("file_list.txt"),
            work_dir: std::env::temp_dir().join("citescout-scan"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// Progress events emitted during a scan.
#[derive(Debug, Clone)]
pub enum ScanProgress {
    /// The corpus was read and the abstract gate applied.
    Candidates { scanned: usize, candidates: usize },
    PaperStarted {
        index: usize,
        total: usize,
        id: String,
    },
    /// The paper qualified and its row was written.
    RowWritten { id: String, counts: KeywordCounts },
    /// The paper was scored but did not qualify.
    Skipped { id: String, counts: KeywordCounts },
    /// The paper failed; the scan moves on.
    Failed { id: String, error: String },
}

/// Totals for a finished scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub scanned: usize,
    pub candidates: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Removes its files when dropped.
struct ScratchFiles(Vec<PathBuf>);

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for path in &self.0 {
            if path.exists()
                && let Err(e) = std::fs::remove_file(path)
            {
                tracing::warn!(path = %path.display(), error = %e, "could not remove scratch file");
            }
        }
    }
}

/// Append-only log of papers whose text could not be extracted.
///
/// The file is only created on the first failure.
#[derive(Debug, Clone)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    /// `{log_dir}/failed_pdf_extractions_{timestamp}.log`
    pub fn new(log_dir: &Path) -> Self {
        let stamp = chrono::Local::now().format("%Y-%m-%dT%H-%M-%S");
        Self {
            path: log_dir.join(format!("failed_pdf_extractions_{stamp}.log")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, pdf: &Path, reason: &str) -> Result<(), AclError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "Could not extract text from: {} - {reason}", pdf.display())?;
        Ok(())
    }
}

pub struct Scanner {
    downloader: Arc<dyn PdfDownloader>,
    backend: Arc<dyn PdfBackend>,
    keywords: KeywordSets,
    settings: ScanSettings,
}

impl Scanner {
    pub fn new(
        downloader: Arc<dyn PdfDownloader>,
        backend: Arc<dyn PdfBackend>,
        keywords: KeywordSets,
        settings: ScanSettings,
    ) -> Self {
        Self {
            downloader,
            backend,
            keywords,
            settings,
        }
    }

    pub fn keywords(&self) -> &KeywordSets {
        &self.keywords
    }

    /// Papers in `corpus` whose abstract passes the keyword gate, plus the
    /// number of papers looked at.
    pub fn candidates(
        &self,
        corpus: &AnthologyCorpus,
    ) -> Result<(Vec<AnthologyPaper>, usize), AclError> {
        corpus.select(|paper| {
            paper
                .abstract_text
                .as_deref()
                .is_some_and(|a| self.keywords.abstract_matches(a))
        })
    }

    /// Scan the whole corpus.
    ///
    /// Only setup errors (unreadable corpus, output file not writable) are
    /// returned; per-paper failures are reported through `progress` and
    /// counted in the summary.
    pub async fn run(
        &self,
        corpus: &AnthologyCorpus,
        progress: impl Fn(ScanProgress),
    ) -> Result<ScanSummary, AclError> {
        let (candidates, scanned) = self.candidates(corpus)?;
        tracing::info!(scanned, candidates = candidates.len(), "abstract gate applied");
        progress(ScanProgress::Candidates {
            scanned,
            candidates: candidates.len(),
        });

        let mut summary = self.scan_papers(&candidates, &progress).await?;
        summary.scanned = scanned;
        Ok(summary)
    }

    /// Scan a list of already-selected papers.
    pub async fn scan_papers(
        &self,
        papers: &[AnthologyPaper],
        progress: &impl Fn(ScanProgress),
    ) -> Result<ScanSummary, AclError> {
        std::fs::create_dir_all(&self.settings.work_dir)?;
        if let Some(dir) = self.settings.output.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }

        let mut out = csv::Writer::from_writer(File::create(&self.settings.output)?);
        out.write_record(OUTPUT_HEADER)?;
        out.flush()?;

        let failures = FailureLog::new(&self.settings.log_dir);
        let mut summary = ScanSummary {
            candidates: papers.len(),
            ..Default::default()
        };

        for (index, paper) in papers.iter().enumerate() {
            progress(ScanProgress::PaperStarted {
                index,
                total: papers.len(),
                id: paper.anthology_id.clone(),
            });

            match self.scan_paper(paper, &failures).await {
                Ok(counts) if counts.qualifies() => {
                    out.write_record([
                        paper.pdf_url(),
                        counts.prompt.to_string(),
                        counts.bias.to_string(),
                    ])?;
                    out.flush()?;
                    summary.written += 1;
                    progress(ScanProgress::RowWritten {
                        id: paper.anthology_id.clone(),
                        counts,
                    });
                }
                Ok(counts) => {
                    summary.skipped += 1;
                    progress(ScanProgress::Skipped {
                        id: paper.anthology_id.clone(),
                        counts,
                    });
                }
                Err(e) => {
                    tracing::warn!(id = %paper.anthology_id, error = %e, "skipping paper");
                    summary.failed += 1;
                    progress(ScanProgress::Failed {
                        id: e.paper_id().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            written = summary.written,
            skipped = summary.skipped,
            failed = summary.failed,
            output = %self.settings.output.display(),
            "scan finished"
        );
        Ok(summary)
    }

    /// Download, extract, and score one paper.
    ///
    /// The PDF and its text file are removed before this returns, whatever
    /// the outcome. Extraction failures are also written to `failures`.
    pub async fn scan_paper(
        &self,
        paper: &AnthologyPaper,
        failures: &FailureLog,
    ) -> Result<KeywordCounts, ScanError> {
        let id = paper.anthology_id.clone();
        let stem = id.replace(['/', '\\'], "_");
        let pdf_path = self.settings.work_dir.join(format!("{stem}.pdf"));
        let txt_path = self.settings.work_dir.join(format!("{stem}.txt"));
        let _scratch = ScratchFiles(vec![pdf_path.clone(), txt_path.clone()]);

        self.downloader
            .download(&paper.pdf_url(), &pdf_path)
            .await
            .map_err(|e| ScanError::DownloadFailed {
                id: id.clone(),
                reason: e.to_string(),
            })?;

        let backend = Arc::clone(&self.backend);
        let path = pdf_path.clone();
        let extracted = tokio::task::spawn_blocking(move || backend.extract_text(&path))
            .await
            .map_err(|e| ScanError::Other {
                id: id.clone(),
                reason: format!("extraction task panicked: {e}"),
            })?;

        let text = match extracted {
            Ok(text) => text,
            Err(e) => {
                let reason = e.to_string();
                if let Err(log_err) = failures.append(&pdf_path, &reason) {
                    tracing::warn!(error = %log_err, "could not write extraction failure log");
                }
                return Err(ScanError::ExtractionFailed { id, reason });
            }
        };

        std::fs::write(&txt_path, &text).map_err(|e| ScanError::Other {
            id: id.clone(),
            reason: format!("writing {}: {e}", txt_path.display()),
        })?;

        let counts = self.keywords.count_body(&text);
        tracing::debug!(id = %id, prompt = counts.prompt, bias = counts.bias, "scored paper");
        Ok(counts)
    }
}
