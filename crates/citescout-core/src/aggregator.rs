//! Citation aggregation pipeline.
//!
//! For each seed: fetch its edges, filter them, look up full records for the
//! related papers, fold every relation into the union state, and write the
//! seed's CSVs. The union CSV is written once all seeds are done. Seeds and
//! lookups run one at a time; the first API error aborts the run, leaving any
//! CSVs already written in place.
//!
//! Seed IDs that normalize to the same ID are processed once. Seeds whose
//! labels collide get a numbered file stem (`Smith2020`, `Smith2020_2`, ...)
//! so no per-seed CSV overwrites another.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config_file::AggregatorConfig;
use crate::export;
use crate::filter::InclusionFilter;
use crate::graph::{GraphClient, PaperDetails, RelatedRecord};
use crate::ids::normalize_paper_id;
use crate::merge::UnionState;
use crate::model::{PaperRef, Relation, RelationKind, SeedPaper};
use crate::rate_limit::CallThrottle;
use crate::{CoreError, ProgressEvent};

/// Relations of one kind for one seed, one row per related paper.
///
/// An edge listed twice under the same seed collapses into a single row with
/// its intents unioned and its influential flag OR'd.
#[derive(Debug, Clone, Default)]
pub struct SeedPartition {
    relations: Vec<Relation>,
    index: HashMap<String, usize>,
}

impl SeedPartition {
    pub fn push(&mut self, relation: Relation) {
        match self.index.get(&relation.related.paper_id) {
            Some(&i) => {
                let existing = &mut self.relations[i];
                existing.intents.extend(relation.intents);
                existing.is_influential |= relation.is_influential;
            }
            None => {
                self.index
                    .insert(relation.related.paper_id.clone(), self.relations.len());
                self.relations.push(relation);
            }
        }
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

/// Everything gathered for one seed.
#[derive(Debug, Clone)]
pub struct SeedOutput {
    pub seed: SeedPaper,
    /// Stem of this seed's CSV file names; the label unless another seed in
    /// the run already used it.
    pub file_stem: String,
    pub citations: SeedPartition,
    pub references: SeedPartition,
}

impl SeedOutput {
    pub fn partition(&self, kind: RelationKind) -> &SeedPartition {
        match kind {
            RelationKind::Citation => &self.citations,
            RelationKind::Reference => &self.references,
        }
    }
}

/// Result of a full run.
#[derive(Debug, Clone)]
pub struct AggregateOutput {
    pub seeds: Vec<SeedOutput>,
    pub union: UnionState,
    pub union_path: PathBuf,
}

pub struct CitationAggregator {
    graph: Arc<dyn GraphClient>,
    filter: InclusionFilter,
    throttle: CallThrottle,
    output_dir: PathBuf,
    details_cache: HashMap<String, PaperDetails>,
}

impl CitationAggregator {
    pub fn new(graph: Arc<dyn GraphClient>, config: &AggregatorConfig) -> Self {
        Self {
            graph,
            filter: config.filter.clone(),
            throttle: CallThrottle::new(config.max_calls, config.pause),
            output_dir: config.output_dir.clone(),
            details_cache: HashMap::new(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run every seed, writing per-seed CSVs as each seed completes and the
    /// union CSV at the end.
    pub async fn run(
        &mut self,
        seed_ids: &[String],
        progress: impl Fn(ProgressEvent),
    ) -> Result<AggregateOutput, CoreError> {
        ensure_dir(&self.output_dir)?;

        let seed_ids = unique_seed_ids(seed_ids);
        let mut union = UnionState::new();
        let mut seeds = Vec::with_capacity(seed_ids.len());
        let mut used_stems = HashSet::new();

        for (index, paper_id) in seed_ids.iter().enumerate() {
            let (mut output, next) = self
                .collect_seed(paper_id, union, index, seed_ids.len(), &progress)
                .await?;
            union = next;
            output.file_stem = unique_stem(&output.seed.label, &mut used_stems);

            for kind in [RelationKind::Citation, RelationKind::Reference] {
                export::write_seed_csv(
                    &self.output_dir,
                    &output.file_stem,
                    kind,
                    output.partition(kind).relations(),
                )?;
            }
            progress(ProgressEvent::SeedWritten {
                label: output.seed.label.clone(),
                citations: output.citations.len(),
                references: output.references.len(),
            });
            seeds.push(output);
        }

        let union_path = export::write_union_csv(&self.output_dir, &union)?;
        progress(ProgressEvent::UnionWritten { rows: union.len() });
        tracing::info!(
            seeds = seeds.len(),
            papers = union.len(),
            path = %union_path.display(),
            "wrote union CSV"
        );

        Ok(AggregateOutput {
            seeds,
            union,
            union_path,
        })
    }

    /// Fetch and fold one seed. Takes the union state by value and hands it
    /// back with this seed's relations folded in. Writes nothing to disk.
    pub async fn collect_seed(
        &mut self,
        raw_id: &str,
        mut union: UnionState,
        index: usize,
        total: usize,
        progress: &impl Fn(ProgressEvent),
    ) -> Result<(SeedOutput, UnionState), CoreError> {
        let paper_id = normalize_paper_id(raw_id);
        let record = self.graph.fetch_seed(&paper_id).await?;
        let seed = SeedPaper::new(record.paper);

        tracing::info!(
            seed = %seed.label,
            id = %paper_id,
            source = self.graph.name(),
            citations = record.citations.len(),
            references = record.references.len(),
            "working on seed"
        );
        progress(ProgressEvent::SeedStarted {
            index,
            total,
            label: seed.label.clone(),
            citations: record.citations.len(),
            references: record.references.len(),
        });

        let mut citations = SeedPartition::default();
        let mut references = SeedPartition::default();

        for (kind, records, partition) in [
            (RelationKind::Citation, &record.citations, &mut citations),
            (RelationKind::Reference, &record.references, &mut references),
        ] {
            for related in records {
                let included = self.filter.includes(related);
                progress(ProgressEvent::RelationProcessed {
                    label: seed.label.clone(),
                    kind,
                    title: related.title.clone(),
                    included,
                });
                if !included {
                    continue;
                }

                let details = self.details(&related.paper_id, progress).await?;
                let relation = build_relation(&seed, kind, related, details);
                union.observe(&relation);
                partition.push(relation);
            }
        }

        Ok((
            SeedOutput {
                file_stem: seed.label.clone(),
                seed,
                citations,
                references,
            },
            union,
        ))
    }

    /// Full-record lookup, once per paper per run. Only real API calls count
    /// against the throttle.
    async fn details(
        &mut self,
        paper_id: &str,
        progress: &impl Fn(ProgressEvent),
    ) -> Result<PaperDetails, CoreError> {
        if let Some(cached) = self.details_cache.get(paper_id) {
            return Ok(cached.clone());
        }

        self.throttle
            .tick(|pause| progress(ProgressEvent::Throttled { pause }))
            .await;
        let details = self.graph.fetch_details(paper_id).await?;
        self.details_cache
            .insert(paper_id.to_string(), details.clone());
        Ok(details)
    }
}

fn build_relation(
    seed: &SeedPaper,
    kind: RelationKind,
    record: &RelatedRecord,
    details: PaperDetails,
) -> Relation {
    Relation {
        seed_id: seed.paper.paper_id.clone(),
        seed_label: seed.label.clone(),
        related: PaperRef {
            paper_id: record.paper_id.clone(),
            title: record.title.clone(),
            abstract_text: details.abstract_text,
            authors: details.authors,
            year: record.year,
            url: record.url.clone(),
            doi: details.doi,
            arxiv_id: details.arxiv_id,
        },
        kind,
        intents: record.intents.iter().cloned().collect(),
        is_influential: record.is_influential,
    }
}

/// Normalized seed IDs in order of first appearance.
fn unique_seed_ids(raw_ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::with_capacity(raw_ids.len());
    for raw in raw_ids {
        let id = normalize_paper_id(raw);
        if seen.insert(id.clone()) {
            ids.push(id);
        } else {
            tracing::warn!(seed = %raw, id = %id, "skipping repeated seed");
        }
    }
    ids
}

/// `label`, or `label_2`, `label_3`, ... if already taken in this run.
fn unique_stem(label: &str, used: &mut HashSet<String>) -> String {
    let mut stem = label.to_string();
    let mut n = 1;
    while !used.insert(stem.clone()) {
        n += 1;
        stem = format!("{label}_{n}");
    }
    stem
}

fn ensure_dir(dir: &Path) -> Result<(), CoreError> {
    if !dir.exists() {
        tracing::info!(path = %dir.display(), "creating output directory");
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(paper_id: &str, intents: &[&str], influential: bool) -> Relation {
        Relation {
            seed_id: "s".into(),
            seed_label: "Smith2020".into(),
            related: PaperRef {
                paper_id: paper_id.into(),
                ..Default::default()
            },
            kind: RelationKind::Citation,
            intents: intents.iter().map(|s| s.to_string()).collect(),
            is_influential: influential,
        }
    }

    #[test]
    fn repeated_seeds_are_dropped_after_normalization() {
        let ids = unique_seed_ids(&[
            "2005.14165".to_string(),
            "10.18653/v1/2020.acl-main.485".to_string(),
            "arXiv:2005.14165".to_string(),
            "DOI:10.18653/v1/2020.acl-main.485".to_string(),
        ]);
        assert_eq!(
            ids,
            vec!["ARXIV:2005.14165", "DOI:10.18653/v1/2020.acl-main.485"]
        );
    }

    #[test]
    fn colliding_labels_get_numbered_stems() {
        let mut used = HashSet::new();
        assert_eq!(unique_stem("Smith2020", &mut used), "Smith2020");
        assert_eq!(unique_stem("Smith2020", &mut used), "Smith2020_2");
        assert_eq!(unique_stem("Lee2019", &mut used), "Lee2019");
        assert_eq!(unique_stem("Smith2020", &mut used), "Smith2020_3");
    }

    #[test]
    fn partition_collapses_repeated_edges() {
        let mut p = SeedPartition::default();
        p.push(rel("a", &["intro"], false));
        p.push(rel("b", &[], false));
        p.push(rel("a", &["results"], true));

        assert_eq!(p.len(), 2);
        let a = &p.relations()[0];
        assert_eq!(a.related.paper_id, "a");
        assert!(a.is_influential);
        assert_eq!(a.intents.len(), 2);
        assert_eq!(p.relations()[1].related.paper_id, "b");
    }

    #[test]
    fn build_relation_combines_edge_and_details() {
        let seed = SeedPaper::new(PaperRef {
            paper_id: "seed".into(),
            authors: vec!["Jane Smith".into()],
            year: Some(2020),
            ..Default::default()
        });
        let record = RelatedRecord {
            paper_id: "r1".into(),
            title: "Related".into(),
            year: Some(2021),
            url: Some("https://x/r1".into()),
            intents: vec!["methodology".into(), "methodology".into()],
            is_influential: true,
        };
        let details = PaperDetails {
            authors: vec!["Ann Lee".into()],
            abstract_text: Some("Abs".into()),
            doi: Some("10.1/r1".into()),
            arxiv_id: None,
        };

        let r = build_relation(&seed, RelationKind::Reference, &record, details);
        assert_eq!(r.seed_label, "Smith2020");
        assert_eq!(r.seed_id, "seed");
        assert_eq!(r.related.title, "Related");
        assert_eq!(r.related.authors, vec!["Ann Lee"]);
        assert_eq!(r.related.doi.as_deref(), Some("10.1/r1"));
        assert_eq!(r.intents.len(), 1);
        assert_eq!(r.kind, RelationKind::Reference);
    }
}
