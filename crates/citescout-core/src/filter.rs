//! Inclusion filter applied to citation/reference records before merging.

use std::collections::BTreeSet;

use crate::graph::RelatedRecord;

/// Decides which related records make it into the outputs.
#[derive(Debug, Clone, Default)]
pub struct InclusionFilter {
    pub only_influential: bool,
    /// Allowed intent/section labels. Empty means "no section filter".
    pub only_include_sections: BTreeSet<String>,
}

impl InclusionFilter {
    pub fn new<I, S>(only_influential: bool, sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            only_influential,
            only_include_sections: sections.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `record` passes the filter.
    ///
    /// A record with no intent labels passes the section filter: an unknown
    /// section is kept rather than dropped.
    pub fn includes(&self, record: &RelatedRecord) -> bool {
        if self.only_influential && !record.is_influential {
            return false;
        }

        if self.only_include_sections.is_empty() || record.intents.is_empty() {
            return true;
        }

        record
            .intents
            .iter()
            .any(|intent| self.only_include_sections.contains(intent))
    }
}
