use std::collections::HashSet;

use plyt_core::{CandidateMatch, PlytError, PlytResult, SearchQuery};
use tracing::{debug, info, warn};

use crate::backend::Destination;
use crate::policy::AcceptancePolicy;
use crate::retry::RetryPolicy;

/// Picks one destination item for a track by walking its queries in priority
/// order and taking the first candidate that passes the acceptance policy and
/// is not already used in this run.
pub struct MatchResolver<'a, D: Destination + ?Sized> {
    destination: &'a D,
    policy: &'a dyn AcceptancePolicy,
    retry: &'a RetryPolicy,
    max_results: u32,
}

impl<'a, D: Destination + ?Sized> MatchResolver<'a, D> {
    pub fn new(
        destination: &'a D,
        policy: &'a dyn AcceptancePolicy,
        retry: &'a RetryPolicy,
        max_results: u32,
    ) -> Self {
        Self {
            destination,
            policy,
            retry,
            max_results: max_results.max(1),
        }
    }

    /// `Ok(None)` means every query came back without an acceptable hit.
    ///
    /// Errors: run-fatal errors are passed through untouched. A query whose
    /// transient failures outlast the retry budget ends the track with that
    /// error. Any other per-query error moves on to the next query and is
    /// returned only if no later query produces a match.
    pub async fn resolve(
        &self,
        queries: &[SearchQuery],
        exclude_ids: &HashSet<String>,
    ) -> PlytResult<Option<CandidateMatch>> {
        let mut ordered: Vec<&SearchQuery> = queries.iter().collect();
        ordered.sort_by_key(|query| query.priority_rank);

        let mut skipped_error: Option<PlytError> = None;

        for query in ordered {
            if query.text.trim().is_empty() {
                continue;
            }

            let destination = self.destination;
            let text = query.text.as_str();
            let max_results = self.max_results;
            let hits = match self
                .retry
                .run("search", move || destination.search(text, max_results))
                .await
            {
                Ok(hits) => hits,
                Err(err) if err.is_run_fatal() || err.is_transient() => return Err(err),
                Err(err) => {
                    warn!(query = text, error = %err, "search query failed, trying next variant");
                    skipped_error = Some(err);
                    continue;
                }
            };

            for candidate in hits {
                if exclude_ids.contains(&candidate.item_id) {
                    debug!(query = text, item_id = %candidate.item_id, "already used in this run");
                    continue;
                }
                if !self.policy.accept(query, &candidate) {
                    debug!(
                        query = text,
                        item_id = %candidate.item_id,
                        title = %candidate.title,
                        "rejected by acceptance policy"
                    );
                    continue;
                }
                info!(query = text, item_id = %candidate.item_id, "match found");
                return Ok(Some(candidate));
            }

            debug!(query = text, "no acceptable result for query");
        }

        match skipped_error {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }
}
