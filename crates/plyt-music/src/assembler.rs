use plyt_core::{AddOutcome, AddStatus, PlaylistCreationResult, PlytResult, Privacy};
use tracing::{info, warn};

use crate::backend::Destination;
use crate::retry::RetryPolicy;

/// Creates the destination playlist and fills it one item at a time.
pub struct PlaylistAssembler<'a, D: Destination + ?Sized> {
    destination: &'a D,
    retry: &'a RetryPolicy,
}

impl<'a, D: Destination + ?Sized> PlaylistAssembler<'a, D> {
    pub fn new(destination: &'a D, retry: &'a RetryPolicy) -> Self {
        Self { destination, retry }
    }

    /// Any error here leaves the run without a playlist.
    pub async fn create(
        &self,
        name: &str,
        privacy: Privacy,
        description: &str,
    ) -> PlytResult<PlaylistCreationResult> {
        let destination = self.destination;
        let created = self
            .retry
            .run("create_playlist", move || {
                destination.create_playlist(name, privacy, description)
            })
            .await?;
        info!(
            playlist_id = %created.playlist_id,
            %name,
            %privacy,
            "destination playlist created"
        );
        Ok(created)
    }

    /// Adds one item. Only run-fatal errors come back as `Err`; everything
    /// else is folded into the outcome.
    pub async fn add_item(&self, playlist_id: &str, item_id: &str) -> PlytResult<AddOutcome> {
        let destination = self.destination;
        let result = self
            .retry
            .run("add_item", move || destination.add_item(playlist_id, item_id))
            .await;
        let status = match result {
            Ok(status) => status,
            Err(err) if err.is_run_fatal() => return Err(err),
            Err(err) => {
                warn!(%playlist_id, %item_id, error = %err, "failed to add item");
                AddStatus::Failed
            }
        };
        Ok(AddOutcome {
            item_id: item_id.to_string(),
            status,
        })
    }

    /// Adds every item in order, carrying on past per-item failures.
    pub async fn add_items(
        &self,
        playlist_id: &str,
        item_ids: &[String],
    ) -> PlytResult<Vec<AddOutcome>> {
        let mut outcomes = Vec::with_capacity(item_ids.len());
        for item_id in item_ids {
            outcomes.push(self.add_item(playlist_id, item_id).await?);
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDestination;
    use plyt_core::PlytError;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn create_returns_playlist_url() {
        let destination = FakeDestination::new();
        let retry = RetryPolicy::immediate(3);
        let assembler = PlaylistAssembler::new(&destination, &retry);

        let created = assembler
            .create("Road Trip (on YouTube)", Privacy::Unlisted, "from spotify")
            .await
            .unwrap();
        assert_eq!(created.playlist_id, "PL1");
        assert!(created.playlist_url.ends_with("list=PL1"));
        assert_eq!(
            destination.created(),
            vec![(
                "Road Trip (on YouTube)".to_string(),
                Privacy::Unlisted,
                "from spotify".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn create_failure_is_an_error() {
        let destination = FakeDestination::new();
        destination.fail_create(PlytError::Api("playlistTitleInvalid".into()));
        let retry = RetryPolicy::immediate(3);
        let assembler = PlaylistAssembler::new(&destination, &retry);

        let result = assembler.create("x", Privacy::Private, "").await;
        assert!(matches!(result, Err(PlytError::Api(_))));
    }

    #[tokio::test]
    async fn adds_keep_order_and_continue_past_failures() {
        let destination = FakeDestination::new();
        destination.fail_add("B", || PlytError::NotFound("videoNotFound".into()), 1);
        destination.duplicate("C");
        destination.fail_add("D", || PlytError::TransientUpstream("503".into()), 5);
        let retry = RetryPolicy::immediate(3);
        let assembler = PlaylistAssembler::new(&destination, &retry);

        let outcomes = assembler
            .add_items("PL1", &ids(&["A", "B", "C", "D", "E"]))
            .await
            .unwrap();
        let statuses: Vec<AddStatus> = outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                AddStatus::Added,
                AddStatus::Failed,
                AddStatus::SkippedDuplicate,
                AddStatus::Failed,
                AddStatus::Added,
            ]
        );
        let outcome_ids: Vec<&str> = outcomes.iter().map(|o| o.item_id.as_str()).collect();
        assert_eq!(outcome_ids, vec!["A", "B", "C", "D", "E"]);
        // D retried up to the budget before giving up
        assert_eq!(
            destination.adds(),
            ids(&["A", "B", "C", "D", "D", "D", "E"])
        );
    }

    #[tokio::test]
    async fn quota_stops_adding() {
        let destination = FakeDestination::new();
        destination.fail_add("B", || PlytError::QuotaExceeded("quotaExceeded".into()), 1);
        let retry = RetryPolicy::immediate(3);
        let assembler = PlaylistAssembler::new(&destination, &retry);

        let result = assembler.add_items("PL1", &ids(&["A", "B", "C"])).await;
        assert!(matches!(result, Err(PlytError::QuotaExceeded(_))));
        assert_eq!(destination.adds(), ids(&["A", "B"]));
    }
}
