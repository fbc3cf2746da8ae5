//! Download the anthology bibliography XML from GitHub.
//!
//! Pulls the repository tarball, then unpacks `data/xml/*.xml` into a flat
//! directory that [`AnthologyCorpus::open`](crate::AnthologyCorpus::open)
//! reads directly.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;

use crate::AclError;

/// GitHub API URL for the anthology repository tarball.
pub const TARBALL_URL: &str = "https://api.github.com/repos/acl-org/acl-anthology/tarball/master";

/// Progress events emitted while fetching the corpus.
#[derive(Debug, Clone)]
pub enum FetchProgress {
    Downloading {
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },
    Extracting {
        files_extracted: u64,
    },
    Complete {
        files: u64,
    },
}

/// Download the anthology tarball and unpack its XML files into `dest`.
///
/// Returns the number of XML files written.
pub async fn fetch_anthology(
    dest: &Path,
    progress: impl FnMut(FetchProgress),
) -> Result<u64, AclError> {
    fetch_from(TARBALL_URL, dest, progress).await
}

/// Like [`fetch_anthology`] with an explicit tarball URL.
pub async fn fetch_from(
    url: &str,
    dest: &Path,
    mut progress: impl FnMut(FetchProgress),
) -> Result<u64, AclError> {
    std::fs::create_dir_all(dest)?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("citescout/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AclError::Download(e.to_string()))?;

    progress(FetchProgress::Downloading {
        bytes_downloaded: 0,
        total_bytes: None,
    });

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AclError::Download(e.to_string()))?;
    if !response.status().is_success() {
        return Err(AclError::Download(format!(
            "HTTP error: {}",
            response.status()
        )));
    }
    let total_bytes = response.content_length();

    let tmp_dir = tempfile::TempDir::new_in(dest)?;
    let tarball_path = tmp_dir.path().join("acl-anthology.tar.gz");
    {
        let mut out = std::fs::File::create(&tarball_path)?;
        let mut stream = response.bytes_stream();
        let mut bytes_downloaded: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| AclError::Download(e.to_string()))?;
            std::io::Write::write_all(&mut out, &chunk)?;
            bytes_downloaded += chunk.len() as u64;
            progress(FetchProgress::Downloading {
                bytes_downloaded,
                total_bytes,
            });
        }
        std::io::Write::flush(&mut out)?;
    }
    tracing::info!(path = %tarball_path.display(), "downloaded anthology tarball");

    let (tx, mut rx) = tokio::sync::mpsc::channel::<FetchProgress>(64);
    let dest_owned: PathBuf = dest.to_path_buf();
    let handle = tokio::task::spawn_blocking(move || {
        let _tmp_dir = tmp_dir;
        extract_xml(&tarball_path, &dest_owned, |files_extracted| {
            if files_extracted % 100 == 0 {
                let _ = tx.blocking_send(FetchProgress::Extracting { files_extracted });
            }
        })
    });

    while let Some(evt) = rx.recv().await {
        progress(evt);
    }

    let files = handle
        .await
        .map_err(|e| AclError::Download(format!("extract task panicked: {e}")))??;

    tracing::info!(files, dest = %dest.display(), "extracted anthology XML");
    progress(FetchProgress::Complete { files });
    Ok(files)
}

/// Unpack every `data/xml/*.xml` entry of a gzipped tarball into `dest`,
/// dropping the directory prefix. `on_file` gets the running count.
pub fn extract_xml(
    tarball: &Path,
    dest: &Path,
    mut on_file: impl FnMut(u64),
) -> Result<u64, AclError> {
    let file = std::fs::File::open(tarball)?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(decoder);

    let mut extracted: u64 = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let path_str = path.to_string_lossy();
        if !(path_str.contains("data/xml/") && path_str.ends_with(".xml")) {
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        entry.unpack(dest.join(name))?;
        extracted += 1;
        on_file(extracted);
    }
    Ok(extracted)
}
