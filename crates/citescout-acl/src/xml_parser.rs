//! Parser for ACL Anthology bibliography XML.
//!
//! Each file follows the structure:
//! ```xml
//! <collection id="2020.acl">
//!   <volume id="main" type="proceedings">
//!     <paper id="485">
//!       <title>Some <fixed-case>BERT</fixed-case> Paper</title>
//!       <author><first>Alice</first><last>Smith</last></author>
//!       <abstract>We probe <fixed-case>BERT</fixed-case> for bias.</abstract>
//!       <doi>10.18653/v1/2020.acl-main.485</doi>
//!       <url hash="abc">2020.acl-main.485</url>
//!     </paper>
//!   </volume>
//! </collection>
//! ```

use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::AclError;

/// One paper from the anthology bibliography.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnthologyPaper {
    pub anthology_id: String,
    pub title: String,
    pub abstract_text: Option<String>,
    pub authors: Vec<String>,
    pub doi: Option<String>,
}

impl AnthologyPaper {
    /// Where the anthology serves this paper's PDF.
    pub fn pdf_url(&self) -> String {
        format!("https://www.aclanthology.org/{}.pdf", self.anthology_id)
    }
}

/// Which text-bearing element we are inside, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Abstract,
    First,
    Last,
    Doi,
    Url,
}

fn id_attr(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == b"id")
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Collapse runs of whitespace (including newlines inside the XML) to single
/// spaces.
fn squash(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(s: &str) -> Option<String> {
    let s = squash(s);
    (!s.is_empty()).then_some(s)
}

/// Parse one anthology XML document, calling `on_paper` for each paper.
///
/// Frontmatter entries (`<paper id="0">`) and papers without a title are
/// skipped. Inline markup inside titles and abstracts is flattened to its
/// text. Returns the number of papers emitted.
pub fn parse_xml<R: BufRead>(
    reader: R,
    mut on_paper: impl FnMut(AnthologyPaper),
) -> Result<usize, AclError> {
    let mut xml = Reader::from_reader(reader);
    let mut buf = Vec::new();

    let mut collection_id = String::new();
    let mut volume_id = String::new();

    let mut in_paper = false;
    let mut paper_id = String::new();
    let mut field: Option<Field> = None;

    let mut title = String::new();
    let mut abstract_text = String::new();
    let mut authors: Vec<String> = Vec::new();
    let mut first = String::new();
    let mut last = String::new();
    let mut doi = String::new();
    let mut url = String::new();

    let mut emitted = 0;

    loop {
        let event = xml
            .read_event_into(&mut buf)
            .map_err(|e| AclError::Parse(format!("at byte {}: {e}", xml.buffer_position())))?;

        match event {
            Event::Start(ref e) => match e.name().as_ref() {
                b"collection" => collection_id = id_attr(e).unwrap_or_default(),
                b"volume" => volume_id = id_attr(e).unwrap_or_default(),
                b"paper" => {
                    in_paper = true;
                    paper_id = id_attr(e).unwrap_or_default();
                    title.clear();
                    abstract_text.clear();
                    authors.clear();
                    doi.clear();
                    url.clear();
                }
                b"title" if in_paper => field = Some(Field::Title),
                b"abstract" if in_paper => field = Some(Field::Abstract),
                b"author" if in_paper => {
                    first.clear();
                    last.clear();
                }
                b"first" if in_paper => field = Some(Field::First),
                b"last" if in_paper => field = Some(Field::Last),
                // Only direct children of <paper>; inside a title or abstract
                // these are inline markup.
                b"doi" if in_paper && field.is_none() => field = Some(Field::Doi),
                b"url" if in_paper && field.is_none() => field = Some(Field::Url),
                // Inline markup (<fixed-case>, <tex-math>, <i>, <url>, ...)
                // keeps the enclosing field.
                _ => {}
            },
            Event::Empty(ref e) if e.name().as_ref() == b"collection" => {
                collection_id = id_attr(e).unwrap_or_default();
            }
            Event::Text(ref e) => {
                if let Some(f) = field {
                    let text = e
                        .unescape()
                        .map_err(|err| AclError::Parse(err.to_string()))?;
                    let target = match f {
                        Field::Title => &mut title,
                        Field::Abstract => &mut abstract_text,
                        Field::First => &mut first,
                        Field::Last => &mut last,
                        Field::Doi => &mut doi,
                        Field::Url => &mut url,
                    };
                    target.push_str(&text);
                }
            }
            Event::End(ref e) => match e.name().as_ref() {
                b"title" | b"abstract" | b"first" | b"last" => field = None,
                b"doi" if field == Some(Field::Doi) => field = None,
                b"url" if field == Some(Field::Url) => field = None,
                b"author" if in_paper => {
                    let name = squash(&format!("{first} {last}"));
                    if !name.is_empty() {
                        authors.push(name);
                    }
                }
                b"paper" if in_paper => {
                    in_paper = false;
                    field = None;

                    let title = squash(&title);
                    if paper_id != "0" && !title.is_empty() {
                        let anthology_id = non_empty(&url).unwrap_or_else(|| {
                            format!("{collection_id}-{volume_id}.{paper_id}")
                        });

                        on_paper(AnthologyPaper {
                            anthology_id,
                            title,
                            abstract_text: non_empty(&abstract_text),
                            authors: std::mem::take(&mut authors),
                            doi: non_empty(&doi),
                        });
                        emitted += 1;
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(emitted)
}
