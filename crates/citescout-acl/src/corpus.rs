//! Access to a local copy of the anthology's bibliography XML.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::AclError;
use crate::xml_parser::{AnthologyPaper, parse_xml};

/// The set of XML files making up the anthology bibliography.
#[derive(Debug, Clone)]
pub struct AnthologyCorpus {
    root: PathBuf,
    files: Vec<PathBuf>,
}

impl AnthologyCorpus {
    /// Open a corpus directory.
    ///
    /// Accepts an anthology checkout (`<root>/data/xml`), its `data`
    /// directory (`<root>/xml`), or a flat directory of XML files such as the
    /// one `fetch-anthology` produces. Files are read in name order.
    pub fn open(root: &Path) -> Result<Self, AclError> {
        let xml_dir = [root.join("data").join("xml"), root.join("xml")]
            .into_iter()
            .find(|p| p.is_dir())
            .unwrap_or_else(|| root.to_path_buf());

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&xml_dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == "xml") {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(AclError::Parse(format!(
                "no anthology XML files under {}",
                xml_dir.display()
            )));
        }

        tracing::info!(dir = %xml_dir.display(), files = files.len(), "opened anthology corpus");
        Ok(Self { root: xml_dir, files })
    }

    /// Directory the XML files were found in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Visit every paper in the corpus. Returns the number visited.
    pub fn for_each_paper(&self, mut f: impl FnMut(AnthologyPaper)) -> Result<usize, AclError> {
        let mut total = 0;
        for path in &self.files {
            let reader = BufReader::new(File::open(path)?);
            total += parse_xml(reader, &mut f)
                .map_err(|e| AclError::Parse(format!("{}: {e}", path.display())))?;
        }
        Ok(total)
    }

    /// Papers for which `keep` returns true, in corpus order.
    pub fn select(
        &self,
        mut keep: impl FnMut(&AnthologyPaper) -> bool,
    ) -> Result<(Vec<AnthologyPaper>, usize), AclError> {
        let mut kept = Vec::new();
        let seen = self.for_each_paper(|paper| {
            if keep(&paper) {
                kept.push(paper);
            }
        })?;
        Ok((kept, seen))
    }
}
