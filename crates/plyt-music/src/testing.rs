//! In-memory service doubles for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use plyt_core::{
    AddStatus, CandidateMatch, PlaylistCreationResult, PlytError, PlytResult, Privacy, Track,
};

use crate::backend::{Destination, TrackSource};
use crate::events::ProgressReceiver;

pub(crate) fn candidate(item_id: &str, title: &str) -> CandidateMatch {
    CandidateMatch {
        item_id: item_id.to_string(),
        title: title.to_string(),
        channel_or_uploader: "Some Channel".to_string(),
        rank: 0,
    }
}

#[derive(Default)]
struct DestinationState {
    hits: HashMap<String, Vec<CandidateMatch>>,
    search_failures: HashMap<String, VecDeque<PlytError>>,
    add_failures: HashMap<String, VecDeque<PlytError>>,
    duplicates: Vec<String>,
    create_failures: VecDeque<PlytError>,
    searches: Vec<String>,
    max_results_seen: Vec<u32>,
    created: Vec<(String, Privacy, String)>,
    adds: Vec<(String, String)>,
    close_on_add: Option<ProgressReceiver>,
}

/// Search results keyed by exact query text; everything else returns nothing.
#[derive(Default)]
pub(crate) struct FakeDestination {
    state: Mutex<DestinationState>,
}

impl FakeDestination {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn hit(&self, query: &str, candidates: Vec<CandidateMatch>) {
        let mut state = self.state.lock().unwrap();
        state.hits.insert(query.to_string(), candidates);
    }

    pub(crate) fn fail_search(&self, query: &str, make: impl Fn() -> PlytError, times: usize) {
        let mut state = self.state.lock().unwrap();
        let queue = state.search_failures.entry(query.to_string()).or_default();
        for _ in 0..times {
            queue.push_back(make());
        }
    }

    pub(crate) fn fail_add(&self, item_id: &str, make: impl Fn() -> PlytError, times: usize) {
        let mut state = self.state.lock().unwrap();
        let queue = state.add_failures.entry(item_id.to_string()).or_default();
        for _ in 0..times {
            queue.push_back(make());
        }
    }

    pub(crate) fn duplicate(&self, item_id: &str) {
        self.state.lock().unwrap().duplicates.push(item_id.to_string());
    }

    pub(crate) fn fail_create(&self, err: PlytError) {
        self.state.lock().unwrap().create_failures.push_back(err);
    }

    /// Drops `rx` during the first `add_item` call, as a consumer that goes
    /// away mid-assembly would.
    pub(crate) fn close_progress_on_first_add(&self, rx: ProgressReceiver) {
        self.state.lock().unwrap().close_on_add = Some(rx);
    }

    pub(crate) fn searches(&self) -> Vec<String> {
        self.state.lock().unwrap().searches.clone()
    }

    pub(crate) fn max_results_seen(&self) -> Vec<u32> {
        self.state.lock().unwrap().max_results_seen.clone()
    }

    pub(crate) fn created(&self) -> Vec<(String, Privacy, String)> {
        self.state.lock().unwrap().created.clone()
    }

    /// Item ids in the order `add_item` was called, including failed calls.
    pub(crate) fn adds(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .adds
            .iter()
            .map(|(_, item)| item.clone())
            .collect()
    }
}

#[async_trait]
impl Destination for FakeDestination {
    async fn search(&self, query: &str, max_results: u32) -> PlytResult<Vec<CandidateMatch>> {
        let mut state = self.state.lock().unwrap();
        state.searches.push(query.to_string());
        state.max_results_seen.push(max_results);
        if let Some(err) = state
            .search_failures
            .get_mut(query)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }
        let mut hits = state.hits.get(query).cloned().unwrap_or_default();
        hits.truncate(max_results as usize);
        for (rank, hit) in hits.iter_mut().enumerate() {
            hit.rank = rank;
        }
        Ok(hits)
    }

    async fn create_playlist(
        &self,
        name: &str,
        privacy: Privacy,
        description: &str,
    ) -> PlytResult<PlaylistCreationResult> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.create_failures.pop_front() {
            return Err(err);
        }
        state
            .created
            .push((name.to_string(), privacy, description.to_string()));
        Ok(PlaylistCreationResult::from_id(format!("PL{}", state.created.len())))
    }

    async fn add_item(&self, playlist_id: &str, item_id: &str) -> PlytResult<AddStatus> {
        let mut state = self.state.lock().unwrap();
        state
            .adds
            .push((playlist_id.to_string(), item_id.to_string()));
        drop(state.close_on_add.take());
        if let Some(err) = state
            .add_failures
            .get_mut(item_id)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }
        if state.duplicates.iter().any(|id| id == item_id) {
            return Ok(AddStatus::SkippedDuplicate);
        }
        Ok(AddStatus::Added)
    }
}

pub(crate) struct FakeSource {
    pub(crate) tracks: Vec<Track>,
    pub(crate) name: Option<String>,
    pub(crate) missing: bool,
}

impl FakeSource {
    pub(crate) fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            name: None,
            missing: false,
        }
    }
}

#[async_trait]
impl TrackSource for FakeSource {
    async fn list_tracks(&self, playlist_id: &str) -> PlytResult<Vec<Track>> {
        if self.missing {
            return Err(PlytError::NotFound(format!("playlist {playlist_id}")));
        }
        Ok(self.tracks.clone())
    }

    async fn playlist_name(&self, _playlist_id: &str) -> PlytResult<Option<String>> {
        Ok(self.name.clone())
    }
}
