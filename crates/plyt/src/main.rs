use std::io::{self, IsTerminal};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Input, Password, theme::ColorfulTheme};
use plyt_config::{
    PlytConfigData, config_exists, config_path, load_config, open_in_editor, resolve_privacy,
    resolve_simple_output, resolve_spotify_credentials, resolve_youtube_access_token,
    resolve_youtube_client_secrets, resolve_youtube_token_file, save_config, set_config_value,
};
use plyt_core::{PlaylistSpec, PlytError, PlytResult, RunState, TransferReport, validate_url};
use plyt_music::{
    ProgressEvent, ProgressReceiver, SpotifyClient, TransferOptions, TransferPipeline,
    YoutubeClient, parse_spotify_playlist_id, progress_channel, youtube_token_cache,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Open config file in editor
    Edit,
}

#[derive(Debug, Parser)]
#[command(name = "plyt")]
#[command(version, about = "Copy a Spotify playlist to YouTube", long_about = None)]
struct Cli {
    /// Spotify playlist URL, URI or id
    #[arg(value_name = "PLAYLIST")]
    playlist: Option<String>,
    /// Name of the YouTube playlist to create
    #[arg(long)]
    name: Option<String>,
    /// public, private or unlisted
    #[arg(long)]
    privacy: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Print only the resulting playlist URL
    #[arg(long)]
    simple: bool,
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(Commands::Config { action }) = cli.command {
        if let Err(err) = handle_config_command(action) {
            eprintln!("{} {err}", style("Error:").red());
            std::process::exit(1);
        }
        return;
    }

    match run(cli).await {
        Ok(true) => {}
        // already rendered from the event stream
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("{} {err}", style("Error:").red());
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    // `plyt` also covers the plyt_* library targets
    let default = if verbose { "plyt=debug" } else { "plyt=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// `Ok(false)` when the transfer aborted after reporting why.
async fn run(cli: Cli) -> PlytResult<bool> {
    let input = cli
        .playlist
        .as_deref()
        .ok_or_else(|| PlytError::InvalidInput("no playlist URL provided".to_string()))?;
    if input.contains("://") {
        validate_url(input)?;
    }
    let playlist_id = parse_spotify_playlist_id(input).ok_or_else(|| {
        PlytError::InvalidInput(format!("not a Spotify playlist URL, URI or id: {input}"))
    })?;

    let mut config = load_config()?;
    let (client_id, client_secret) = resolve_or_prompt_spotify(&mut config)?;
    let simple = cli.simple || resolve_simple_output(&config).unwrap_or(false);

    let options = TransferOptions::from_config(&config.transfer);
    let source =
        SpotifyClient::new(&client_id, &client_secret)?.with_retry(options.search_retry.clone());

    let token_file = resolve_youtube_token_file(&config);
    let client_secrets = resolve_youtube_client_secrets(&config);
    let tokens = youtube_token_cache(
        resolve_youtube_access_token(&config),
        token_file.as_deref(),
        client_secrets.as_deref(),
    )?;
    let destination = YoutubeClient::new(Arc::new(tokens))?;

    let spec = PlaylistSpec {
        name: cli.name.clone(),
        privacy: resolve_privacy(&config, cli.privacy.as_deref()),
        description: cli.description.clone(),
    };
    info!(%playlist_id, privacy = %spec.privacy, "starting transfer");

    let (tx, rx) = progress_channel();
    let renderer = tokio::spawn(render(rx, simple));
    let result = TransferPipeline::new(&destination, options, tx)
        .run_from_source(&source, &playlist_id, spec)
        .await;
    if let Err(err) = renderer.await {
        debug!(error = %err, "renderer task ended abnormally");
    }

    match result {
        Ok(report) => {
            debug!(state = ?report.state, summary = ?report.summary(), "transfer finished");
            Ok(transfer_succeeded(&report))
        }
        Err(PlytError::Cancelled) => Err(PlytError::Cancelled),
        Err(err) => {
            debug!(error = %err, "transfer aborted");
            Ok(false)
        }
    }
}

/// A run that created no playlist counts as a failure.
fn transfer_succeeded(report: &TransferReport) -> bool {
    report.state != RunState::AbortedNoMatches
}

async fn render(mut rx: ProgressReceiver, simple: bool) {
    while let Some(event) = rx.next().await {
        match event {
            ProgressEvent::Status(message) => {
                if !simple {
                    println!("{message}");
                }
            }
            ProgressEvent::NoMatches(message) => {
                eprintln!("{} {message}", style("Nothing to do:").yellow());
            }
            ProgressEvent::Completed {
                playlist_url,
                summary,
            } => {
                if simple {
                    println!("{playlist_url}");
                } else {
                    println!();
                    println!("{} {summary}", style("Done!").green().bold());
                    println!("{} {playlist_url}", style("Playlist:").cyan());
                }
            }
            ProgressEvent::Fatal { message, .. } => {
                eprintln!("{} {message}", style("Error:").red().bold());
            }
            ProgressEvent::EndOfStream => {}
        }
    }
}

fn resolve_or_prompt_spotify(config: &mut PlytConfigData) -> PlytResult<(String, String)> {
    if let Some(credentials) = resolve_spotify_credentials(config) {
        return Ok(credentials);
    }

    // Prompt only on a first run with someone at the keyboard
    if config_exists()? || !io::stdin().is_terminal() {
        return Err(PlytError::Config(
            "Spotify credentials missing; run `plyt config set spotify.client_id <id>` and \
             `plyt config set spotify.client_secret <secret>`, or set PLYT_SPOTIFY_CLIENT_ID \
             and PLYT_SPOTIFY_CLIENT_SECRET"
                .to_string(),
        ));
    }

    let theme = ColorfulTheme::default();
    println!(
        "{} {}",
        style("First-time setup:").bold().cyan(),
        "Spotify app credentials are needed to read playlists"
    );

    let client_id: String = Input::with_theme(&theme)
        .with_prompt("Spotify client id")
        .interact_text()
        .map_err(|err| PlytError::InvalidInput(format!("prompt failed: {err}")))?;
    let client_secret = Password::with_theme(&theme)
        .with_prompt("Spotify client secret")
        .interact()
        .map_err(|err| PlytError::InvalidInput(format!("prompt failed: {err}")))?;

    config.spotify.client_id = Some(client_id.trim().to_string());
    config.spotify.client_secret = Some(client_secret.trim().to_string());

    match save_config(config) {
        Ok(()) => println!(
            "{} Config file created at {}",
            style("✓").green(),
            config_path()?.display()
        ),
        Err(err) => eprintln!("{} {err}", style("Warning:").yellow()),
    }

    resolve_spotify_credentials(config).ok_or_else(|| {
        PlytError::Config("Spotify client id and secret must not be empty".to_string())
    })
}

fn handle_config_command(action: ConfigAction) -> PlytResult<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = load_config()?;
            match get_nested_config_value(&config, &key) {
                Some(v) => println!("{} = {}", key, v),
                None => println!("{} = <null>", key),
            }
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            set_config_value(&key, &value)?;
            println!("{} Set {} = {}", style("✓").green(), key, value);
            Ok(())
        }
        ConfigAction::List => {
            let config = load_config()?;
            println!("Current configuration:");
            println!("\n[spotify]");
            println!("client_id = {}", or_null(config.spotify.client_id.as_deref()));
            println!(
                "client_secret = {}",
                if config.spotify.client_secret.is_some() { "<set>" } else { "<null>" }
            );
            println!("\n[youtube]");
            println!("token_file = {}", or_null(config.youtube.token_file.as_deref()));
            println!(
                "client_secrets_file = {}",
                or_null(config.youtube.client_secrets_file.as_deref())
            );
            println!(
                "access_token = {}",
                if config.youtube.access_token.is_some() { "<set>" } else { "<null>" }
            );
            let transfer = &config.transfer;
            println!("\n[transfer]");
            println!("privacy = {}", or_null(transfer.privacy.as_deref()));
            println!("max_results = {}", transfer.max_results);
            println!("max_attempts = {}", transfer.max_attempts);
            println!("backoff_ms = {}", transfer.backoff_ms);
            println!("throttle_ms = {}", transfer.throttle_ms);
            println!("qualifiers = {}", transfer.qualifiers.join(", "));
            println!("denylist = {}", transfer.denylist.join(", "));
            println!("\n[output]");
            println!("simple = {}", config.output.simple.unwrap_or(false));
            Ok(())
        }
        ConfigAction::Edit => {
            open_in_editor()?;
            Ok(())
        }
    }
}

fn or_null(value: Option<&str>) -> &str {
    value.unwrap_or("<null>")
}

fn get_nested_config_value(config: &PlytConfigData, key_path: &str) -> Option<String> {
    let parts: Vec<&str> = key_path.split('.').collect();
    let transfer = &config.transfer;

    match parts.as_slice() {
        ["spotify", "client_id"] => config.spotify.client_id.clone(),
        ["spotify", "client_secret"] => config.spotify.client_secret.clone(),
        ["youtube", "token_file"] => config.youtube.token_file.clone(),
        ["youtube", "client_secrets_file"] => config.youtube.client_secrets_file.clone(),
        ["youtube", "access_token"] => config.youtube.access_token.clone(),
        ["transfer", "privacy"] => transfer.privacy.clone(),
        ["transfer", "max_results"] => Some(transfer.max_results.to_string()),
        ["transfer", "max_attempts"] => Some(transfer.max_attempts.to_string()),
        ["transfer", "backoff_ms"] => Some(transfer.backoff_ms.to_string()),
        ["transfer", "throttle_ms"] => Some(transfer.throttle_ms.to_string()),
        ["transfer", "qualifiers"] => Some(transfer.qualifiers.join(", ")),
        ["transfer", "denylist"] => Some(transfer.denylist.join(", ")),
        ["output", "simple"] => config.output.simple.map(|b| b.to_string()),
        _ => None,
    }
}
