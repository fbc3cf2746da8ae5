//! Union view over all relations observed in a run.
//!
//! Every relation for a related paper is folded into one [`AggregatedRow`]
//! regardless of which seed or kind produced it. The fold is commutative:
//! rows live in a sorted map, sections in a sorted set, influence is a sum,
//! provenance is a set of seeds per kind, and when two observations disagree
//! on a paper field the smaller present value wins.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{PaperRef, Relation, RelationKind};

/// Accumulated view of one related paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedRow {
    pub paper: PaperRef,
    /// Union of intent sections over every observation.
    pub sections: BTreeSet<String>,
    /// Number of observations flagged influential.
    pub influential_count: usize,
}

impl AggregatedRow {
    fn seed(relation: &Relation) -> Self {
        Self {
            paper: relation.related.clone(),
            sections: relation.intents.clone(),
            influential_count: usize::from(relation.is_influential),
        }
    }

    fn absorb(&mut self, relation: &Relation) {
        self.sections.extend(relation.intents.iter().cloned());
        self.influential_count += usize::from(relation.is_influential);
        merge_fields(&mut self.paper, &relation.related);
    }
}

/// Combine paper fields from two observations of the same paper.
///
/// Present values beat missing ones; between two present values the smaller
/// wins, so the result does not depend on fold order.
fn merge_fields(into: &mut PaperRef, from: &PaperRef) {
    pick_text(&mut into.title, &from.title);
    if !from.authors.is_empty() && (into.authors.is_empty() || from.authors < into.authors) {
        into.authors.clone_from(&from.authors);
    }
    pick_min(&mut into.abstract_text, &from.abstract_text);
    pick_min(&mut into.year, &from.year);
    pick_min(&mut into.url, &from.url);
    pick_min(&mut into.doi, &from.doi);
    pick_min(&mut into.arxiv_id, &from.arxiv_id);
}

fn pick_text(into: &mut String, from: &str) {
    if !from.is_empty() && (into.is_empty() || from < into.as_str()) {
        *into = from.to_string();
    }
}

fn pick_min<T: Ord + Clone>(into: &mut Option<T>, from: &Option<T>) {
    *into = match (into.take(), from) {
        (Some(a), Some(b)) => Some(if *b < a { b.clone() } else { a }),
        (a, b) => a.or_else(|| b.clone()),
    };
}

/// Which seeds cite / are cited by a related paper.
///
/// Keyed by seed ID so two seeds that happen to share a label are still
/// counted separately, while a seed listing the same edge twice counts once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    citing: BTreeMap<String, String>,
    referencing: BTreeMap<String, String>,
}

impl Provenance {
    fn record(&mut self, kind: RelationKind, seed_id: &str, seed_label: &str) {
        let side = match kind {
            RelationKind::Citation => &mut self.citing,
            RelationKind::Reference => &mut self.referencing,
        };
        side.entry(seed_id.to_string())
            .or_insert_with(|| seed_label.to_string());
    }

    /// Number of seeds this paper cites (it appears in their citations).
    pub fn citing_count(&self) -> usize {
        self.citing.len()
    }

    /// Number of seeds that reference this paper.
    pub fn referencing_count(&self) -> usize {
        self.referencing.len()
    }

    /// Sorted labels of seeds this paper cites.
    pub fn citing_labels(&self) -> Vec<&str> {
        sorted_labels(&self.citing)
    }

    /// Sorted labels of seeds that reference this paper.
    pub fn referencing_labels(&self) -> Vec<&str> {
        sorted_labels(&self.referencing)
    }
}

fn sorted_labels(side: &BTreeMap<String, String>) -> Vec<&str> {
    let mut labels: Vec<&str> = side.values().map(String::as_str).collect();
    labels.sort_unstable();
    labels
}

/// Owned accumulator for the union CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnionState {
    rows: BTreeMap<String, AggregatedRow>,
    provenance: BTreeMap<String, Provenance>,
}

impl UnionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one relation into the state in place.
    pub fn observe(&mut self, relation: &Relation) {
        let key = &relation.related.paper_id;

        match self.rows.get_mut(key) {
            Some(row) => row.absorb(relation),
            None => {
                self.rows
                    .insert(key.clone(), AggregatedRow::seed(relation));
            }
        }

        self.provenance.entry(key.clone()).or_default().record(
            relation.kind,
            &relation.seed_id,
            &relation.seed_label,
        );
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, paper_id: &str) -> Option<(&AggregatedRow, &Provenance)> {
        let row = self.rows.get(paper_id)?;
        let prov = self.provenance.get(paper_id)?;
        Some((row, prov))
    }

    /// Rows with their provenance, ordered by paper ID.
    pub fn iter(&self) -> impl Iterator<Item = (&AggregatedRow, &Provenance)> {
        self.rows.iter().filter_map(|(id, row)| {
            self.provenance.get(id).map(|prov| (row, prov))
        })
    }
}

/// Fold `relation` into `state` and hand the state back.
pub fn merge_relation(mut state: UnionState, relation: &Relation) -> UnionState {
    state.observe(relation);
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation(
        seed: &str,
        paper_id: &str,
        kind: RelationKind,
        intents: &[&str],
        influential: bool,
    ) -> Relation {
        Relation {
            seed_id: format!("id-{seed}"),
            seed_label: seed.to_string(),
            related: PaperRef {
                paper_id: paper_id.to_string(),
                title: format!("Title of {paper_id}"),
                ..Default::default()
            },
            kind,
            intents: intents.iter().map(|s| s.to_string()).collect(),
            is_influential: influential,
        }
    }

    fn fold(relations: &[Relation]) -> UnionState {
        relations.iter().fold(UnionState::new(), merge_relation)
    }

    #[test]
    fn first_observation_seeds_row() {
        let state = fold(&[relation("Smith2020", "p1", RelationKind::Citation, &["intro"], true)]);
        let (row, prov) = state.get("p1").unwrap();
        assert_eq!(row.influential_count, 1);
        assert_eq!(row.sections, BTreeSet::from(["intro".to_string()]));
        assert_eq!(prov.citing_labels(), vec!["Smith2020"]);
        assert_eq!(prov.referencing_count(), 0);
    }

    #[test]
    fn sections_are_unioned_not_overwritten() {
        let state = fold(&[
            relation("Smith2020", "p1", RelationKind::Citation, &["intro"], false),
            relation("Lee2019", "p1", RelationKind::Reference, &["related-work"], false),
        ]);
        let (row, _) = state.get("p1").unwrap();
        let expected: BTreeSet<String> =
            ["intro", "related-work"].iter().map(|s| s.to_string()).collect();
        assert_eq!(row.sections, expected);
    }

    #[test]
    fn duplicate_sections_collapse() {
        let state = fold(&[
            relation("A2020", "p1", RelationKind::Citation, &["intro", "methods"], false),
            relation("B2021", "p1", RelationKind::Citation, &["intro"], false),
        ]);
        assert_eq!(state.get("p1").unwrap().0.sections.len(), 2);
    }

    #[test]
    fn influence_is_counted() {
        let state = fold(&[
            relation("A2020", "p1", RelationKind::Citation, &[], true),
            relation("B2021", "p1", RelationKind::Citation, &[], false),
            relation("C2022", "p1", RelationKind::Reference, &[], true),
        ]);
        assert_eq!(state.get("p1").unwrap().0.influential_count, 2);
    }

    #[test]
    fn provenance_split_by_kind() {
        let state = fold(&[
            relation("A2020", "p1", RelationKind::Citation, &[], false),
            relation("B2021", "p1", RelationKind::Reference, &[], false),
            relation("C2022", "p1", RelationKind::Reference, &[], false),
        ]);
        let (_, prov) = state.get("p1").unwrap();
        assert_eq!(prov.citing_count(), 1);
        assert_eq!(prov.referencing_count(), 2);
        assert_eq!(prov.referencing_labels(), vec!["B2021", "C2022"]);
    }

    #[test]
    fn same_seed_same_kind_counts_once() {
        let state = fold(&[
            relation("Smith2020", "p1", RelationKind::Citation, &[], true),
            relation("Smith2020", "p1", RelationKind::Citation, &[], false),
        ]);
        let (row, prov) = state.get("p1").unwrap();
        assert_eq!(prov.citing_labels(), vec!["Smith2020"]);
        assert_eq!(row.influential_count, 1);
    }

    #[test]
    fn seeds_sharing_a_label_count_separately() {
        let mut a = relation("Smith2020", "p1", RelationKind::Citation, &[], false);
        let mut b = relation("Smith2020", "p1", RelationKind::Citation, &[], false);
        a.seed_id = "seed-a".into();
        b.seed_id = "seed-b".into();
        let state = fold(&[a, b]);
        assert_eq!(state.get("p1").unwrap().1.citing_count(), 2);
    }

    #[test]
    fn merge_is_order_independent() {
        let relations = vec![
            relation("A2020", "p1", RelationKind::Citation, &["intro"], true),
            relation("B2021", "p1", RelationKind::Reference, &["results"], false),
            relation("A2020", "p2", RelationKind::Reference, &[], true),
            relation("C2022", "p1", RelationKind::Citation, &["methods"], true),
            relation("B2021", "p2", RelationKind::Citation, &["intro"], false),
            relation("A2020", "p1", RelationKind::Citation, &["background"], false),
        ];

        let forward = fold(&relations);

        let mut reversed = relations.clone();
        reversed.reverse();
        assert_eq!(fold(&reversed), forward);

        // Every rotation yields the same state too.
        for shift in 1..relations.len() {
            let mut rotated = relations.clone();
            rotated.rotate_left(shift);
            assert_eq!(fold(&rotated), forward, "rotation by {shift} differs");
        }
    }

    #[test]
    fn missing_fields_are_filled_from_later_observations() {
        let bare = relation("A2020", "p1", RelationKind::Citation, &[], false);
        let mut rich = relation("B2021", "p1", RelationKind::Citation, &[], false);
        rich.related.doi = Some("10.1/x".into());
        rich.related.year = Some(2019);

        let state = fold(&[bare, rich]);
        let (row, _) = state.get("p1").unwrap();
        assert_eq!(row.paper.doi.as_deref(), Some("10.1/x"));
        assert_eq!(row.paper.year, Some(2019));
    }

    #[test]
    fn conflicting_fields_resolve_the_same_in_any_order() {
        let mut a = relation("A2020", "p1", RelationKind::Citation, &[], false);
        let mut b = relation("B2021", "p1", RelationKind::Reference, &[], false);
        a.related.title = "Zebra Paper".into();
        a.related.url = Some("https://b.example/p1".into());
        a.related.authors = vec!["Zoe Lee".into()];
        b.related.title = "Apple Paper".into();
        b.related.url = Some("https://a.example/p1".into());
        b.related.authors = vec!["Ann Lee".into()];
        b.related.year = Some(2021);
        a.related.year = Some(2020);

        let forward = fold(&[a.clone(), b.clone()]);
        let backward = fold(&[b, a]);
        assert_eq!(forward, backward);

        let (row, _) = forward.get("p1").unwrap();
        assert_eq!(row.paper.title, "Apple Paper");
        assert_eq!(row.paper.url.as_deref(), Some("https://a.example/p1"));
        assert_eq!(row.paper.authors, vec!["Ann Lee"]);
        assert_eq!(row.paper.year, Some(2020));
    }

    #[test]
    fn iter_is_sorted_by_paper_id() {
        let state = fold(&[
            relation("A2020", "zeta", RelationKind::Citation, &[], false),
            relation("A2020", "alpha", RelationKind::Citation, &[], false),
        ]);
        let ids: Vec<&str> = state.iter().map(|(r, _)| r.paper.paper_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }
}
