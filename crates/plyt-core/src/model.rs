use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const PLAYLIST_URL_BASE: &str = "https://www.youtube.com/playlist?list=";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub primary_artist: String,
    #[serde(default)]
    pub additional_artists: Vec<String>,
    #[serde(default)]
    pub is_local: bool,
    pub duration_ms: Option<u64>,
}

impl Track {
    pub fn new(title: impl Into<String>, primary_artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            primary_artist: primary_artist.into(),
            additional_artists: Vec::new(),
            is_local: false,
            duration_ms: None,
        }
    }

    /// "Title - Artist" as shown in progress output.
    pub fn display_name(&self) -> String {
        let artist = self.primary_artist.trim();
        if artist.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.title, artist)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub priority_rank: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateMatch {
    pub item_id: String,
    pub title: String,
    pub channel_or_uploader: String,
    /// Position in the search response, 0 is the service's top hit.
    pub rank: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Matched,
    NotFound,
    SearchError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub track: Track,
    pub matched_item_id: Option<String>,
    pub status: MatchStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistCreationResult {
    pub playlist_id: String,
    pub playlist_url: String,
}

impl PlaylistCreationResult {
    pub fn from_id(playlist_id: impl Into<String>) -> Self {
        let playlist_id = playlist_id.into();
        let playlist_url = format!("{PLAYLIST_URL_BASE}{playlist_id}");
        Self {
            playlist_id,
            playlist_url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddStatus {
    Added,
    SkippedDuplicate,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOutcome {
    pub item_id: String,
    pub status: AddStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Public,
    #[default]
    Private,
    Unlisted,
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Public => "public",
            Privacy::Private => "private",
            Privacy::Unlisted => "unlisted",
        }
    }
}

impl FromStr for Privacy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "public" => Ok(Privacy::Public),
            "private" => Ok(Privacy::Private),
            "unlisted" => Ok(Privacy::Unlisted),
            other => Err(format!("unknown privacy status: {other}")),
        }
    }
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination playlist settings for one run.
#[derive(Debug, Clone, Default)]
pub struct PlaylistSpec {
    pub name: Option<String>,
    pub privacy: Privacy,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Init,
    Listing,
    Matching,
    Assembling,
    AbortedNoMatches,
    Done,
}

impl RunState {
    fn order(self) -> u8 {
        match self {
            RunState::Init => 0,
            RunState::Listing => 1,
            RunState::Matching => 2,
            RunState::Assembling | RunState::AbortedNoMatches => 3,
            RunState::Done => 4,
        }
    }

    /// Whether `next` is reachable from `self` without going backwards.
    pub fn can_advance_to(self, next: RunState) -> bool {
        match (self, next) {
            // tracks handed in directly skip listing
            (RunState::Init, RunState::Matching) => true,
            _ => next.order() == self.order() + 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReport {
    pub state: RunState,
    pub playlist: Option<PlaylistCreationResult>,
    pub results: Vec<TransferResult>,
    pub outcomes: Vec<AddOutcome>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferSummary {
    pub matched: usize,
    pub not_found: usize,
    pub search_errors: usize,
    pub added: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl TransferReport {
    pub fn summary(&self) -> TransferSummary {
        let mut summary = TransferSummary::default();
        for result in &self.results {
            match result.status {
                MatchStatus::Matched => summary.matched += 1,
                MatchStatus::NotFound => summary.not_found += 1,
                MatchStatus::SearchError => summary.search_errors += 1,
            }
        }
        for outcome in &self.outcomes {
            match outcome.status {
                AddStatus::Added => summary.added += 1,
                AddStatus::SkippedDuplicate => summary.skipped += 1,
                AddStatus::Failed => summary.failed += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privacy_parses_known_values() {
        assert_eq!("PUBLIC".parse::<Privacy>(), Ok(Privacy::Public));
        assert_eq!(" unlisted ".parse::<Privacy>(), Ok(Privacy::Unlisted));
        assert!("friends-only".parse::<Privacy>().is_err());
    }

    #[test]
    fn playlist_url_built_from_id() {
        let created = PlaylistCreationResult::from_id("PL123");
        assert_eq!(
            created.playlist_url,
            "https://www.youtube.com/playlist?list=PL123"
        );
    }

    #[test]
    fn run_state_never_goes_backwards() {
        assert!(RunState::Init.can_advance_to(RunState::Listing));
        assert!(RunState::Init.can_advance_to(RunState::Matching));
        assert!(RunState::Listing.can_advance_to(RunState::Matching));
        assert!(RunState::Matching.can_advance_to(RunState::Assembling));
        assert!(RunState::Matching.can_advance_to(RunState::AbortedNoMatches));
        assert!(RunState::Assembling.can_advance_to(RunState::Done));
        assert!(RunState::AbortedNoMatches.can_advance_to(RunState::Done));

        assert!(!RunState::Matching.can_advance_to(RunState::Listing));
        assert!(!RunState::Assembling.can_advance_to(RunState::AbortedNoMatches));
        assert!(!RunState::Matching.can_advance_to(RunState::Done));
        assert!(!RunState::Done.can_advance_to(RunState::Init));
    }

    #[test]
    fn summary_counts_statuses() {
        let report = TransferReport {
            state: RunState::Done,
            playlist: Some(PlaylistCreationResult::from_id("PL1")),
            results: vec![
                TransferResult {
                    track: Track::new("a", "x"),
                    matched_item_id: Some("A".into()),
                    status: MatchStatus::Matched,
                },
                TransferResult {
                    track: Track::new("b", "x"),
                    matched_item_id: None,
                    status: MatchStatus::NotFound,
                },
            ],
            outcomes: vec![AddOutcome {
                item_id: "A".into(),
                status: AddStatus::Failed,
            }],
        };
        let summary = report.summary();
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.not_found, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.added, 0);
    }
}
