//! In-memory graph client for testing.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{GraphClient, GraphError, PaperDetails, SeedRecord};

/// A hand-rolled mock implementing [`GraphClient`] for tests.
///
/// Seeds and details are looked up by ID; unknown IDs yield
/// [`GraphError::NotFound`]. IDs registered with [`MockGraph::fail_on`] yield
/// [`GraphError::RateLimited`] to simulate a transient API failure.
#[derive(Default)]
pub struct MockGraph {
    seeds: HashMap<String, SeedRecord>,
    details: HashMap<String, PaperDetails>,
    failing: Vec<String>,
    seed_calls: AtomicUsize,
    detail_calls: AtomicUsize,
}

impl MockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a seed under the identifier the aggregator will ask for.
    pub fn with_seed(mut self, requested_id: &str, seed: SeedRecord) -> Self {
        self.seeds.insert(requested_id.to_string(), seed);
        self
    }

    pub fn with_details(mut self, paper_id: &str, details: PaperDetails) -> Self {
        self.details.insert(paper_id.to_string(), details);
        self
    }

    /// Make every call for `id` fail.
    pub fn fail_on(mut self, id: &str) -> Self {
        self.failing.push(id.to_string());
        self
    }

    pub fn seed_calls(&self) -> usize {
        self.seed_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    fn check_failing(&self, id: &str) -> Result<(), GraphError> {
        if self.failing.iter().any(|f| f == id) {
            return Err(GraphError::RateLimited {
                url: format!("mock://{id}"),
            });
        }
        Ok(())
    }
}

impl GraphClient for MockGraph {
    fn name(&self) -> &str {
        "Mock"
    }

    fn fetch_seed<'a>(
        &'a self,
        paper_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<SeedRecord, GraphError>> + Send + 'a>> {
        self.seed_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            self.check_failing(paper_id)?;
            self.seeds
                .get(paper_id)
                .cloned()
                .ok_or_else(|| GraphError::NotFound(paper_id.to_string()))
        })
    }

    fn fetch_details<'a>(
        &'a self,
        paper_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<PaperDetails, GraphError>> + Send + 'a>> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            self.check_failing(paper_id)?;
            // Papers without a registered record still resolve, with empty details.
            Ok(self.details.get(paper_id).cloned().unwrap_or_default())
        })
    }
}
