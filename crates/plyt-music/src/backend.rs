//! Service boundaries the transfer pipeline talks to.

use async_trait::async_trait;
use plyt_core::{AddStatus, CandidateMatch, PlaylistCreationResult, PlytResult, Privacy, Track};

/// Read-only access to a source playlist.
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// Ordered tracks of the playlist. Local files are kept with `is_local`
    /// set; entries that are not songs at all are dropped.
    async fn list_tracks(&self, playlist_id: &str) -> PlytResult<Vec<Track>>;

    async fn playlist_name(&self, playlist_id: &str) -> PlytResult<Option<String>>;
}

/// Search and playlist writes on the destination service.
#[async_trait]
pub trait Destination: Send + Sync {
    async fn search(&self, query: &str, max_results: u32) -> PlytResult<Vec<CandidateMatch>>;

    async fn create_playlist(
        &self,
        name: &str,
        privacy: Privacy,
        description: &str,
    ) -> PlytResult<PlaylistCreationResult>;

    /// `Ok(AddStatus::SkippedDuplicate)` when the item is already present.
    async fn add_item(&self, playlist_id: &str, item_id: &str) -> PlytResult<AddStatus>;
}
