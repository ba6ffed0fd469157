pub mod api;
pub mod assembler;
pub mod auth;
pub mod backend;
pub mod events;
pub mod parsers;
pub mod pipeline;
pub mod policy;
pub mod query;
pub mod resolver;
pub mod retry;

#[cfg(test)]
mod testing;

pub use api::spotify::SpotifyClient;
pub use api::youtube::{YoutubeClient, youtube_token_cache};
pub use assembler::PlaylistAssembler;
pub use auth::{AccessToken, StaticToken, TokenCache, TokenRefresher};
pub use backend::{Destination, TrackSource};
pub use events::{FatalKind, ProgressEvent, ProgressReceiver, ProgressSender, progress_channel};
pub use parsers::spotify::parse_spotify_playlist_id;
pub use pipeline::{TransferOptions, TransferPipeline, playlist_name};
pub use policy::{AcceptAll, AcceptancePolicy, KeywordDenylist};
pub use query::{QueryBuilder, build_queries};
pub use resolver::MatchResolver;
pub use retry::RetryPolicy;
