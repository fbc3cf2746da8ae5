use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{GraphClient, GraphError, PaperDetails, RelatedRecord, SeedRecord};
use crate::model::{PaperRef, RelationKind};

/// Base URL of the Semantic Scholar graph API.
pub const DEFAULT_BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";

/// Largest page the citations/references endpoints hand out.
const PAGE_SIZE: usize = 1000;

const SEED_FIELDS: &str = "paperId,title,year,url,authors,abstract,externalIds";
const DETAIL_FIELDS: &str = "authors,abstract,externalIds";
const EDGE_FIELDS: &str = "paperId,title,year,url,intents,isInfluential";

pub struct SemanticScholar {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
}

impl SemanticScholar {
    pub fn new(client: reqwest::Client, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }

    /// Point the client at a different API root (proxies, local mirrors).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, GraphError> {
        tracing::debug!(url, "semantic scholar request");
        let mut req = self
            .client
            .get(url)
            .header("User-Agent", "citescout/0.1")
            .timeout(self.timeout);

        if let Some(ref key) = self.api_key {
            req = req.header("x-api-key", key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(GraphError::RateLimited { url: url.into() });
        }
        if status.as_u16() == 404 {
            return Err(GraphError::NotFound(url.into()));
        }
        if !status.is_success() {
            return Err(GraphError::Status {
                status: status.as_u16(),
                url: url.into(),
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| GraphError::Decode(format!("{url}: {e}")))
    }

    async fn fetch_edges(
        &self,
        paper_id: &str,
        kind: RelationKind,
    ) -> Result<Vec<RelatedRecord>, GraphError> {
        let mut records = Vec::new();
        let mut offset = 0;

        loop {
            let url = format!(
                "{}/paper/{}/{}?fields={}&offset={}&limit={}",
                self.base_url,
                paper_id,
                kind.file_suffix(),
                EDGE_FIELDS,
                offset,
                PAGE_SIZE
            );
            let page: EdgePage = self.get_json(&url).await?;
            let next = page.next;
            records.extend(page.into_records(kind));

            match next_offset(offset, next) {
                Some(n) => offset = n,
                None => break,
            }
        }

        Ok(records)
    }
}

/// Offset of the next page, or `None` once the listing is done. A `next`
/// that does not move past the current offset also ends it.
fn next_offset(offset: usize, next: Option<usize>) -> Option<usize> {
    next.filter(|&n| n > offset)
}

impl GraphClient for SemanticScholar {
    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    fn fetch_seed<'a>(
        &'a self,
        paper_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<SeedRecord, GraphError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/paper/{}?fields={}", self.base_url, paper_id, SEED_FIELDS);
            let full: FullPaper = self.get_json(&url).await?;
            let paper = full.into_paper_ref(paper_id)?;

            let citations = self.fetch_edges(&paper.paper_id, RelationKind::Citation).await?;
            let references = self
                .fetch_edges(&paper.paper_id, RelationKind::Reference)
                .await?;

            Ok(SeedRecord {
                paper,
                citations,
                references,
            })
        })
    }

    fn fetch_details<'a>(
        &'a self,
        paper_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<PaperDetails, GraphError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!(
                "{}/paper/{}?fields={}",
                self.base_url, paper_id, DETAIL_FIELDS
            );
            let full: FullPaper = self.get_json(&url).await?;
            Ok(full.into_details())
        })
    }
}

// ── Wire format ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FullPaper {
    paper_id: Option<String>,
    title: Option<String>,
    year: Option<i32>,
    url: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    authors: Vec<Author>,
    external_ids: Option<ExternalIds>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "ArXiv")]
    arxiv: Option<String>,
}

impl FullPaper {
    fn author_names(&self) -> Vec<String> {
        self.authors.iter().filter_map(|a| a.name.clone()).collect()
    }

    fn into_paper_ref(self, requested_id: &str) -> Result<PaperRef, GraphError> {
        let authors = self.author_names();
        let paper_id = self
            .paper_id
            .ok_or_else(|| GraphError::Decode(format!("no paperId for {requested_id}")))?;
        let ext = self.external_ids.unwrap_or_default();
        Ok(PaperRef {
            paper_id,
            title: self.title.unwrap_or_default(),
            abstract_text: self.abstract_text,
            authors,
            year: self.year,
            url: self.url,
            doi: ext.doi,
            arxiv_id: ext.arxiv,
        })
    }

    fn into_details(self) -> PaperDetails {
        let authors = self.author_names();
        let ext = self.external_ids.unwrap_or_default();
        PaperDetails {
            authors,
            abstract_text: self.abstract_text,
            doi: ext.doi,
            arxiv_id: ext.arxiv,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EdgePage {
    next: Option<usize>,
    #[serde(default)]
    data: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Edge {
    #[serde(default)]
    intents: Option<Vec<String>>,
    #[serde(default)]
    is_influential: Option<bool>,
    citing_paper: Option<EdgePaper>,
    cited_paper: Option<EdgePaper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EdgePaper {
    paper_id: Option<String>,
    title: Option<String>,
    year: Option<i32>,
    url: Option<String>,
}

impl EdgePage {
    fn into_records(self, kind: RelationKind) -> Vec<RelatedRecord> {
        self.data
            .into_iter()
            .filter_map(|edge| {
                let paper = match kind {
                    RelationKind::Citation => edge.citing_paper,
                    RelationKind::Reference => edge.cited_paper,
                }?;
                // Unresolved entries carry no paperId and can't be merged.
                let Some(paper_id) = paper.paper_id else {
                    tracing::debug!(title = ?paper.title, "skipping {kind} without paperId");
                    return None;
                };
                Some(RelatedRecord {
                    paper_id,
                    title: paper.title.unwrap_or_default(),
                    year: paper.year,
                    url: paper.url,
                    intents: edge.intents.unwrap_or_default(),
                    is_influential: edge.is_influential.unwrap_or(false),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Raw request heads received by the stub server.
    type Seen = Arc<Mutex<Vec<String>>>;

    /// Serve canned JSON on a local port. `respond` maps the request target
    /// (path and query) to a status code and body. Returns the API root to
    /// hand to [`SemanticScholar::with_base_url`].
    async fn stub_server(respond: fn(&str) -> (u16, String)) -> (String, Seen) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen: Seen = Arc::default();
        let log = seen.clone();

        tokio::spawn(async move {
            while let Ok((mut sock, _)) = listener.accept().await {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = sock.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&buf[..n]);
                }
                let head = String::from_utf8_lossy(&head).into_owned();
                let target = head.split_whitespace().nth(1).unwrap_or_default().to_string();
                log.lock().unwrap().push(head);

                let (status, body) = respond(&target);
                let resp = format!(
                    "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                sock.write_all(resp.as_bytes()).await.unwrap();
                let _ = sock.shutdown().await;
            }
        });

        (format!("http://{addr}/graph/v1"), seen)
    }

    fn client(base_url: &str, api_key: Option<&str>) -> SemanticScholar {
        SemanticScholar::new(
            reqwest::Client::new(),
            api_key.map(String::from),
            Duration::from_secs(5),
        )
        .with_base_url(base_url)
    }

    fn targets(seen: &Seen) -> Vec<String> {
        seen.lock()
            .unwrap()
            .iter()
            .map(|h| h.split_whitespace().nth(1).unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn next_offset_stops_when_absent_or_stalled() {
        assert_eq!(next_offset(0, Some(1000)), Some(1000));
        assert_eq!(next_offset(1000, None), None);
        assert_eq!(next_offset(1000, Some(1000)), None);
        assert_eq!(next_offset(1000, Some(0)), None);
    }

    #[tokio::test]
    async fn seed_fetch_follows_edge_pages() {
        let (base, seen) = stub_server(|target| {
            let body = if target.contains("/citations") && target.contains("offset=0&") {
                r#"{"offset": 0, "next": 1000, "data": [
                    {"intents": ["methodology"], "isInfluential": true,
                     "citingPaper": {"paperId": "c1", "title": "First"}}]}"#
            } else if target.contains("/citations") {
                r#"{"offset": 1000, "data": [
                    {"citingPaper": {"paperId": "c2", "title": "Second"}}]}"#
            } else if target.contains("/references") {
                r#"{"offset": 0, "data": []}"#
            } else {
                r#"{"paperId": "seed1", "title": "Seed", "year": 2020,
                    "authors": [{"name": "Jane Smith"}]}"#
            };
            (200, body.to_string())
        })
        .await;

        let record = client(&base, None).fetch_seed("DOI:10.1/abc").await.unwrap();
        assert_eq!(record.paper.paper_id, "seed1");
        let ids: Vec<&str> = record.citations.iter().map(|r| r.paper_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert!(record.references.is_empty());

        assert_eq!(
            targets(&seen),
            vec![
                format!("/graph/v1/paper/DOI:10.1/abc?fields={SEED_FIELDS}"),
                format!("/graph/v1/paper/seed1/citations?fields={EDGE_FIELDS}&offset=0&limit=1000"),
                format!("/graph/v1/paper/seed1/citations?fields={EDGE_FIELDS}&offset=1000&limit=1000"),
                format!("/graph/v1/paper/seed1/references?fields={EDGE_FIELDS}&offset=0&limit=1000"),
            ]
        );
    }

    #[tokio::test]
    async fn error_statuses_are_mapped() {
        let (base, _) = stub_server(|target| {
            let status = if target.starts_with("/graph/v1/paper/limited") {
                429
            } else if target.starts_with("/graph/v1/paper/missing") {
                404
            } else {
                500
            };
            (status, "{}".to_string())
        })
        .await;
        let s2 = client(&base, None);

        assert!(matches!(
            s2.fetch_details("limited").await,
            Err(GraphError::RateLimited { .. })
        ));
        assert!(matches!(
            s2.fetch_details("missing").await,
            Err(GraphError::NotFound(_))
        ));
        assert!(matches!(
            s2.fetch_details("broken").await,
            Err(GraphError::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn api_key_header_sent_only_when_set() {
        let (base, seen) = stub_server(|_| (200, r#"{"paperId": "x"}"#.to_string())).await;

        client(&base, Some("k-123")).fetch_details("x").await.unwrap();
        client(&base, None).fetch_details("x").await.unwrap();

        let heads = seen.lock().unwrap().clone();
        assert_eq!(heads.len(), 2);
        assert!(heads[0].to_ascii_lowercase().contains("x-api-key: k-123"));
        assert!(!heads[1].to_ascii_lowercase().contains("x-api-key"));
    }

    #[test]
    fn parses_citation_page() {
        let json = r#"{
            "offset": 0,
            "next": 1000,
            "data": [
                {"intents": ["background"], "isInfluential": true,
                 "citingPaper": {"paperId": "abc", "title": "Citing One", "year": 2021, "url": "https://x/abc"}},
                {"intents": [], "isInfluential": false,
                 "citingPaper": {"paperId": null, "title": "Unresolved"}}
            ]
        }"#;
        let page: EdgePage = serde_json::from_str(json).unwrap();
        assert_eq!(page.next, Some(1000));
        let records = page.into_records(RelationKind::Citation);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].paper_id, "abc");
        assert_eq!(records[0].intents, vec!["background"]);
        assert!(records[0].is_influential);
        assert_eq!(records[0].year, Some(2021));
    }

    #[test]
    fn parses_reference_page_with_null_intents() {
        let json = r#"{
            "offset": 0,
            "data": [
                {"intents": null, "isInfluential": null,
                 "citedPaper": {"paperId": "def", "title": "Cited", "year": null, "url": null}}
            ]
        }"#;
        let page: EdgePage = serde_json::from_str(json).unwrap();
        assert_eq!(page.next, None);
        let records = page.into_records(RelationKind::Reference);
        assert_eq!(records.len(), 1);
        assert!(records[0].intents.is_empty());
        assert!(!records[0].is_influential);
        assert_eq!(records[0].year, None);
    }

    #[test]
    fn wrong_side_of_edge_is_ignored() {
        let json = r#"{"data": [{"citedPaper": {"paperId": "def", "title": "Cited"}}]}"#;
        let page: EdgePage = serde_json::from_str(json).unwrap();
        assert!(page.into_records(RelationKind::Citation).is_empty());
    }

    #[test]
    fn parses_full_paper() {
        let json = r#"{
            "paperId": "seed1",
            "title": "Seed Paper",
            "year": 2020,
            "url": "https://x/seed1",
            "abstract": "An abstract.",
            "authors": [{"authorId": "1", "name": "Jane Smith"}, {"authorId": null, "name": "Bob Jones"}],
            "externalIds": {"DOI": "10.1/abc", "ArXiv": "2001.00001", "CorpusId": 42}
        }"#;
        let full: FullPaper = serde_json::from_str(json).unwrap();
        let paper = full.into_paper_ref("DOI:10.1/abc").unwrap();
        assert_eq!(paper.paper_id, "seed1");
        assert_eq!(paper.authors, vec!["Jane Smith", "Bob Jones"]);
        assert_eq!(paper.doi.as_deref(), Some("10.1/abc"));
        assert_eq!(paper.arxiv_id.as_deref(), Some("2001.00001"));
        assert_eq!(paper.abstract_text.as_deref(), Some("An abstract."));
    }

    #[test]
    fn details_tolerate_missing_external_ids() {
        let json = r#"{"paperId": "x", "authors": [], "abstract": null}"#;
        let full: FullPaper = serde_json::from_str(json).unwrap();
        assert_eq!(full.into_details(), PaperDetails::default());
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let s2 = SemanticScholar::new(reqwest::Client::new(), None, Duration::from_secs(5))
            .with_base_url("http://localhost:9000/graph/v1/");
        assert_eq!(s2.base_url, "http://localhost:9000/graph/v1");
    }
}
