//! Order-book depth post-filter.
//!
//! Checks the top-ranked candidates concurrently, at most K lookups in
//! flight. Each lookup task reports its outcome over the join set and one
//! collector assembles the retained list.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::budget::RunBudget;
use super::candidate::{rank, Candidate};
use super::config::DepthConfig;
use crate::data::OrderBookProvider;

/// Result of the depth pass.
#[derive(Debug, Clone, Default)]
pub struct DepthOutcome {
    /// Candidates that met the threshold, ranked
    pub retained: Vec<Candidate>,
    /// Lookups issued
    pub checked: usize,
    /// Lookups that failed, timed out, or came back below threshold
    pub rejected: usize,
}

/// Minimum-liquidity filter.
#[derive(Debug, Clone)]
pub struct DepthFilter {
    config: DepthConfig,
}

impl DepthFilter {
    pub fn new(config: DepthConfig) -> Self {
        Self { config }
    }

    /// Filter the first `top_n` of `ranked` by USD depth.
    pub async fn apply(
        &self,
        ranked: Vec<Candidate>,
        books: Arc<dyn OrderBookProvider>,
        budget: &RunBudget,
    ) -> DepthOutcome {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut tasks: JoinSet<(Candidate, Option<f64>)> = JoinSet::new();

        for candidate in ranked.into_iter().take(self.config.top_n) {
            let permits = Arc::clone(&permits);
            let books = Arc::clone(&books);
            let budget = budget.clone();
            let limit = self.config.book_limit;

            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (candidate, None);
                };
                let depth = budget
                    .run(books.get_depth(&candidate.pair, limit))
                    .await
                    .flatten();
                (candidate, depth)
            });
        }

        let mut outcome = DepthOutcome {
            checked: tasks.len(),
            ..DepthOutcome::default()
        };

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((candidate, Some(depth))) if depth >= self.config.min_usd => {
                    outcome.retained.push(candidate);
                }
                Ok((candidate, depth)) => {
                    debug!(
                        symbol = %candidate.symbol,
                        pair = %candidate.pair,
                        depth = ?depth,
                        min_usd = self.config.min_usd,
                        "Depth rejected"
                    );
                    outcome.rejected += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Depth lookup task failed");
                    outcome.rejected += 1;
                }
            }
        }

        rank(&mut outcome.retained);
        outcome
    }
}
