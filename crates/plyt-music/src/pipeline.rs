//! Orchestrates one conversion run: list, match, assemble.
//!
//! A run moves through `INIT → LISTING → MATCHING → (ASSEMBLING |
//! ABORTED_NO_MATCHES) → DONE` and never steps back. Every step pushes at
//! least one [`ProgressEvent`]; the stream always ends with
//! [`ProgressEvent::EndOfStream`] unless the consumer has gone away.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use plyt_config::TransferConfig;
use plyt_core::{
    AddStatus, MatchStatus, PlaylistSpec, PlytError, PlytResult, RunState, Track, TransferReport,
    TransferResult, sanitize_playlist_title,
};
use tracing::{debug, info, warn};

use crate::assembler::PlaylistAssembler;
use crate::backend::{Destination, TrackSource};
use crate::events::{ProgressEvent, ProgressSender};
use crate::policy::{AcceptancePolicy, KeywordDenylist};
use crate::query::QueryBuilder;
use crate::resolver::MatchResolver;
use crate::retry::RetryPolicy;

pub const FALLBACK_PLAYLIST_NAME: &str = "My Spotify Playlist on YouTube";

#[derive(Clone)]
pub struct TransferOptions {
    pub queries: QueryBuilder,
    pub policy: Arc<dyn AcceptancePolicy>,
    pub search_retry: RetryPolicy,
    pub write_retry: RetryPolicy,
    pub max_results: u32,
    /// Pause between consecutive tracks.
    pub throttle: Duration,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self::from_config(&TransferConfig::default())
    }
}

impl TransferOptions {
    pub fn from_config(config: &TransferConfig) -> Self {
        let base = Duration::from_millis(config.backoff_ms);
        let retry = RetryPolicy::exponential(config.max_attempts, base, base.saturating_mul(8));
        Self {
            queries: QueryBuilder::new(config.qualifiers.clone()),
            policy: Arc::new(KeywordDenylist::new(&config.denylist)),
            search_retry: retry.clone(),
            write_retry: retry,
            max_results: config.max_results,
            throttle: Duration::from_millis(config.throttle_ms),
        }
    }
}

/// Single-use pipeline; build a fresh one per run.
pub struct TransferPipeline<'a, D: Destination + ?Sized> {
    destination: &'a D,
    options: TransferOptions,
    events: ProgressSender,
    state: RunState,
}

impl<'a, D: Destination + ?Sized> TransferPipeline<'a, D> {
    pub fn new(destination: &'a D, options: TransferOptions, events: ProgressSender) -> Self {
        Self {
            destination,
            options,
            events,
            state: RunState::Init,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(from = ?self.state, to = ?next, "run state");
        self.state = next;
    }

    fn emit(&self, event: ProgressEvent) -> PlytResult<()> {
        if self.events.emit(event) {
            Ok(())
        } else {
            info!("progress consumer disconnected, stopping run");
            Err(PlytError::Cancelled)
        }
    }

    /// Reports `err` as the terminal event and hands it back.
    fn abort(&self, err: PlytError) -> PlytError {
        if !matches!(err, PlytError::Cancelled) {
            warn!(error = %err, state = ?self.state, "run aborted");
            self.events.emit(ProgressEvent::fatal(&err));
            self.events.emit(ProgressEvent::EndOfStream);
        }
        err
    }

    /// Fetches the playlist from `source`, then behaves like [`Self::run`].
    /// Without an explicit name the source playlist's name is used.
    pub async fn run_from_source<S: TrackSource + ?Sized>(
        mut self,
        source: &S,
        playlist_id: &str,
        mut spec: PlaylistSpec,
    ) -> PlytResult<TransferReport> {
        self.advance(RunState::Listing);
        self.emit(ProgressEvent::status("Fetching tracks from Spotify playlist..."))?;

        let tracks = match source.list_tracks(playlist_id).await {
            Ok(tracks) => tracks,
            Err(err) => return Err(self.abort(err)),
        };
        info!(%playlist_id, count = tracks.len(), "source playlist listed");

        if spec.name.is_none() {
            match source.playlist_name(playlist_id).await {
                Ok(Some(name)) => spec.name = Some(format!("{name} (on YouTube)")),
                Ok(None) => {}
                Err(err) => warn!(%playlist_id, error = %err, "could not read playlist name"),
            }
        }
        if spec.description.is_none() {
            spec.description = Some(format!(
                "Playlist created from Spotify playlist: https://open.spotify.com/playlist/{playlist_id}"
            ));
        }

        self.execute(tracks, spec).await
    }

    /// Matches `tracks` and builds the destination playlist from the hits.
    pub async fn run(
        mut self,
        tracks: Vec<Track>,
        spec: PlaylistSpec,
    ) -> PlytResult<TransferReport> {
        self.execute(tracks, spec).await
    }

    async fn execute(
        &mut self,
        tracks: Vec<Track>,
        spec: PlaylistSpec,
    ) -> PlytResult<TransferReport> {
        let total_listed = tracks.len();
        let tracks: Vec<Track> = tracks.into_iter().filter(|track| !track.is_local).collect();
        if tracks.len() < total_listed {
            info!(skipped = total_listed - tracks.len(), "skipping local files");
        }
        self.emit(ProgressEvent::status(format!("{} tracks found.", tracks.len())))?;

        self.advance(RunState::Matching);
        let results = self.match_tracks(&tracks).await?;

        let matched: Vec<(&TransferResult, &str)> = results
            .iter()
            .filter_map(|result| result.matched_item_id.as_deref().map(|id| (result, id)))
            .collect();

        if matched.is_empty() {
            self.advance(RunState::AbortedNoMatches);
            let message = if results.is_empty() {
                "No playable tracks found in the playlist. Nothing to transfer.".to_string()
            } else {
                format!(
                    "None of the {} tracks could be matched on YouTube. No playlist was created.",
                    results.len()
                )
            };
            self.emit(ProgressEvent::NoMatches(message))?;
            self.advance(RunState::Done);
            self.emit(ProgressEvent::EndOfStream)?;
            return Ok(TransferReport {
                state: RunState::AbortedNoMatches,
                playlist: None,
                results,
                outcomes: Vec::new(),
            });
        }

        self.advance(RunState::Assembling);
        let name = playlist_name(spec.name.as_deref(), tracks.first());
        let description = spec.description.clone().unwrap_or_default();
        self.emit(ProgressEvent::status(format!(
            "Creating YouTube playlist: '{name}' (Privacy: {})...",
            spec.privacy
        )))?;

        let assembler = PlaylistAssembler::new(self.destination, &self.options.write_retry);
        let playlist = match assembler.create(&name, spec.privacy, &description).await {
            Ok(playlist) => playlist,
            Err(err) => return Err(self.abort(err)),
        };
        self.emit(ProgressEvent::status(format!(
            "YouTube playlist created! ID: {}",
            playlist.playlist_id
        )))?;

        let mut outcomes = Vec::with_capacity(matched.len());
        for (index, (result, item_id)) in matched.iter().enumerate() {
            if self.events.is_closed() {
                info!(added = outcomes.len(), "progress consumer gone, leaving playlist as is");
                return Err(PlytError::Cancelled);
            }
            let outcome = match assembler.add_item(&playlist.playlist_id, item_id).await {
                Ok(outcome) => outcome,
                Err(err) => return Err(self.abort(err)),
            };
            let name = result.track.display_name();
            let message = match outcome.status {
                AddStatus::Added => format!("  [{}/{}] Added '{name}'.", index + 1, matched.len()),
                AddStatus::SkippedDuplicate => format!(
                    "  [{}/{}] '{name}' is already in the playlist.",
                    index + 1,
                    matched.len()
                ),
                AddStatus::Failed => format!(
                    "  [{}/{}] Failed to add '{name}' (video {item_id}). It may be unavailable.",
                    index + 1,
                    matched.len()
                ),
            };
            self.emit(ProgressEvent::status(message))?;
            outcomes.push(outcome);
        }

        let report = TransferReport {
            state: RunState::Done,
            playlist: Some(playlist.clone()),
            results,
            outcomes,
        };
        let summary = report.summary();
        let mut text = format!(
            "Added {} of {} tracks to '{name}'.",
            summary.added,
            report.results.len()
        );
        if summary.not_found > 0 {
            text.push_str(&format!(" {} not found.", summary.not_found));
        }
        if summary.search_errors > 0 {
            text.push_str(&format!(" {} search errors.", summary.search_errors));
        }
        if summary.skipped > 0 {
            text.push_str(&format!(" {} already present.", summary.skipped));
        }
        if summary.failed > 0 {
            text.push_str(&format!(" {} failed to add.", summary.failed));
        }
        info!(
            playlist_id = %playlist.playlist_id,
            added = summary.added,
            not_found = summary.not_found,
            failed = summary.failed,
            "transfer complete"
        );

        self.advance(RunState::Done);
        self.emit(ProgressEvent::Completed {
            playlist_url: playlist.playlist_url,
            summary: text,
        })?;
        self.emit(ProgressEvent::EndOfStream)?;
        Ok(report)
    }

    async fn match_tracks(&self, tracks: &[Track]) -> PlytResult<Vec<TransferResult>> {
        let total = tracks.len();
        let resolver = MatchResolver::new(
            self.destination,
            self.options.policy.as_ref(),
            &self.options.search_retry,
            self.options.max_results,
        );
        let mut used_ids: HashSet<String> = HashSet::new();
        let mut results = Vec::with_capacity(total);

        for (index, track) in tracks.iter().enumerate() {
            if index > 0 && !self.options.throttle.is_zero() {
                tokio::time::sleep(self.options.throttle).await;
            }
            let name = track.display_name();
            self.emit(ProgressEvent::status(format!(
                "[{}/{}] Searching for: '{name}'...",
                index + 1,
                total
            )))?;

            let queries = self.options.queries.build(track);
            let (status, matched_item_id) = match resolver.resolve(&queries, &used_ids).await {
                Ok(Some(hit)) => {
                    self.emit(ProgressEvent::status(format!(
                        "  Found YouTube video: '{}' ({})",
                        hit.title, hit.item_id
                    )))?;
                    used_ids.insert(hit.item_id.clone());
                    (MatchStatus::Matched, Some(hit.item_id))
                }
                Ok(None) => {
                    self.emit(ProgressEvent::status(format!(
                        "  Could not find a suitable YouTube video for '{name}'. Skipping."
                    )))?;
                    (MatchStatus::NotFound, None)
                }
                Err(err) if err.is_run_fatal() => return Err(self.abort(err)),
                Err(err) => {
                    warn!(track = %name, error = %err, "search failed for track");
                    self.emit(ProgressEvent::status(format!(
                        "  Search failed for '{name}': {err}. Skipping."
                    )))?;
                    (MatchStatus::SearchError, None)
                }
            };

            results.push(TransferResult {
                track: track.clone(),
                matched_item_id,
                status,
            });
        }

        Ok(results)
    }
}

/// Explicit name, else `"<first title> and others (on YouTube)"`, else the
/// fallback. Always sanitized.
pub fn playlist_name(explicit: Option<&str>, first_track: Option<&Track>) -> String {
    let raw = explicit
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(|| {
            first_track
                .filter(|track| !track.title.trim().is_empty())
                .map(|track| format!("{} and others (on YouTube)", track.title.trim()))
        })
        .unwrap_or_else(|| FALLBACK_PLAYLIST_NAME.to_string());
    let sanitized = sanitize_playlist_title(&raw);
    if sanitized.is_empty() {
        FALLBACK_PLAYLIST_NAME.to_string()
    } else {
        sanitized
    }
}
