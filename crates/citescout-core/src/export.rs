//! CSV output for per-seed relation lists and the union view.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::CoreError;
use crate::merge::{AggregatedRow, Provenance, UnionState};
use crate::model::{PaperRef, Relation, RelationKind};

/// Columns of every per-seed CSV, and the leading columns of the union CSV.
pub const HEADERS: [&str; 9] = [
    "Title",
    "Section",
    "Influential",
    "Year",
    "Authors",
    "Abstract",
    "URL",
    "DOI",
    "Arxiv",
];

/// Columns appended to [`HEADERS`] in the union CSV.
pub const SUMMARY_HEADERS: [&str; 4] = ["Cite Count", "Cites", "Reference Count", "ReferencedBy"];

/// File name of the union CSV inside the output directory.
pub const UNION_FILE_NAME: &str = "all_papers_union.csv";

/// Separator used inside multi-valued cells (authors, sections, seed labels).
const LIST_SEP: &str = ";";

fn opt(s: &Option<String>) -> String {
    s.clone().unwrap_or_default()
}

fn paper_columns<'a, I>(paper: &PaperRef, sections: I, influential: String) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    vec![
        paper.title.clone(),
        sections
            .into_iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(LIST_SEP),
        influential,
        paper.year.map(|y| y.to_string()).unwrap_or_default(),
        paper.authors.join(LIST_SEP),
        opt(&paper.abstract_text),
        opt(&paper.url),
        opt(&paper.doi),
        opt(&paper.arxiv_id),
    ]
}

/// Row for a per-seed CSV.
pub fn relation_record(relation: &Relation) -> Vec<String> {
    paper_columns(
        &relation.related,
        &relation.intents,
        relation.is_influential.to_string(),
    )
}

/// Row for the union CSV: paper columns, influence count, then provenance.
pub fn union_record(row: &AggregatedRow, provenance: &Provenance) -> Vec<String> {
    let mut record = paper_columns(&row.paper, &row.sections, row.influential_count.to_string());
    record.push(provenance.citing_count().to_string());
    record.push(provenance.citing_labels().join(LIST_SEP));
    record.push(provenance.referencing_count().to_string());
    record.push(provenance.referencing_labels().join(LIST_SEP));
    record
}

/// Write `header` followed by `rows` to `path`, overwriting it.
///
/// Returns the number of data rows written.
pub fn write_csv<P, I, R, F>(path: P, header: &[&str], rows: I) -> Result<usize, CoreError>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = F>,
    F: AsRef<[u8]>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(header)?;

    let mut n = 0;
    for row in rows {
        writer.write_record(row)?;
        n += 1;
    }
    writer.flush()?;
    Ok(n)
}

/// Read a CSV written by [`write_csv`], header included, as raw strings.
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<String>>, CoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path.as_ref())?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(String::from).collect());
    }
    Ok(rows)
}

/// Path of the per-seed CSV for `label` and `kind`.
pub fn seed_csv_path(output_dir: &Path, label: &str, kind: RelationKind) -> PathBuf {
    output_dir.join(format!("{}_{}.csv", label, kind.file_suffix()))
}

/// Write one per-seed CSV.
pub fn write_seed_csv(
    output_dir: &Path,
    label: &str,
    kind: RelationKind,
    relations: &[Relation],
) -> Result<PathBuf, CoreError> {
    let path = seed_csv_path(output_dir, label, kind);
    write_csv(&path, &HEADERS, relations.iter().map(relation_record))?;
    Ok(path)
}

/// Write the union CSV. Rows are ordered by paper ID.
pub fn write_union_csv(output_dir: &Path, state: &UnionState) -> Result<PathBuf, CoreError> {
    let path = output_dir.join(UNION_FILE_NAME);
    let header: Vec<&str> = HEADERS.iter().chain(SUMMARY_HEADERS.iter()).copied().collect();
    write_csv(
        &path,
        &header,
        state.iter().map(|(row, prov)| union_record(row, prov)),
    )?;
    Ok(path)
}
