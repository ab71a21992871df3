//! moodtune - command-line front end
//!
//! Detect a mood from a photo, explore matching tracks, save playlists to the
//! connected music account and manage backend records.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use moodtune::admin::{self, AdminAction, ListQuery, ResourceKind};
use moodtune::detection::{save_inference, ImageUpload, RecommendationState};
use moodtune::links::{link_for_uri, link_info_for_track};
use moodtune::playlist::PlaylistDraft;
use moodtune::recommendation::Recommendations;
use moodtune::tracks::{Track, TrackSelection};
use moodtune::AppContext;
use moodtune::auth::connect::OAuthCallback;
use moodtune_common::config::{resolve_config_path, CliOverrides, Settings, TomlConfig};
use moodtune_common::{Emotion, Intention, MoodKey};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "moodtune")]
#[command(about = "Mood detection and mood-based playlists")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Main API base URL
    #[arg(long, global = true)]
    api_base_url: Option<String>,

    /// FER inference endpoint
    #[arg(long, global = true)]
    fer_endpoint: Option<String>,

    /// Recommendation service base URL
    #[arg(long, global = true)]
    rag_base_url: Option<String>,

    /// Music-provider service base URL
    #[arg(long, global = true)]
    music_base_url: Option<String>,

    /// Data folder for persisted session state
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and persist the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "MOODTUNE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Clear the local session and end it on the server
    Logout,
    /// Show the active session
    Whoami,
    /// Check all collaborator services
    Health,
    /// Detect the mood in a photo
    Detect(DetectArgs),
    /// List tracks for a mood
    Explore {
        mood: MoodKey,
        #[arg(long, default_value_t = 20)]
        min: u32,
    },
    /// Suggest, save and browse playlists
    #[command(subcommand)]
    Playlist(PlaylistCommand),
    /// Connect the Spotify account
    #[command(subcommand)]
    Connect(ConnectCommand),
    /// Raw CRUD over backend records
    Admin(AdminArgs),
}

#[derive(Args, Debug)]
struct DetectArgs {
    image: PathBuf,
    /// Confirm the photo may be analyzed
    #[arg(long)]
    consent: bool,
    #[arg(long, value_parser = parse_intention)]
    intention: Option<Intention>,
    /// Target emotion when the intention is `change`
    #[arg(long, value_parser = parse_emotion)]
    target: Option<Emotion>,
    /// Store the inference record
    #[arg(long)]
    save: bool,
}

#[derive(Subcommand, Debug)]
enum PlaylistCommand {
    /// Generate a titled suggestion
    Suggest {
        mood: MoodKey,
        #[arg(long, default_value_t = 15)]
        min: u32,
    },
    /// Generate a suggestion and save it to the music account
    Save {
        mood: MoodKey,
        #[arg(long, default_value_t = 15)]
        min: u32,
        /// 1-based track numbers to keep (default: all)
        #[arg(long, value_delimiter = ',')]
        pick: Vec<usize>,
        #[arg(long)]
        title: Option<String>,
    },
    /// List saved playlists
    List,
    /// Show the provider-side content of a saved playlist
    Show { playlist_id: String },
}

#[derive(Subcommand, Debug)]
enum ConnectCommand {
    /// Print the authorization URL
    Begin {
        #[arg(long, default_value = "http://localhost:5173/connect-spotify")]
        callback_url: String,
    },
    /// Finish with tokens from the redirect fragment
    Complete {
        #[arg(long)]
        access_token: String,
        #[arg(long)]
        refresh_token: Option<String>,
        #[arg(long)]
        expires_in: Option<i64>,
        #[arg(long)]
        state: String,
    },
    /// Finish with an authorization code
    Code {
        #[arg(long)]
        code: String,
        #[arg(long)]
        state: String,
    },
    /// Show the connection state
    Status,
    /// Forget the local token metadata
    Disconnect,
}

#[derive(Args, Debug)]
struct AdminArgs {
    #[arg(value_enum)]
    resource: ResourceKind,
    #[command(subcommand)]
    action: AdminCommand,
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    List {
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
        /// key=value list filter (repeatable)
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },
    Get { id: String },
    /// JSON body
    Create { body: String },
    Patch { id: String, body: String },
    Delete { id: String },
}

fn parse_intention(s: &str) -> std::result::Result<Intention, String> {
    s.parse().map_err(|e: moodtune_common::Error| e.to_string())
}

fn parse_emotion(s: &str) -> std::result::Result<Emotion, String> {
    s.parse().map_err(|e: moodtune_common::Error| e.to_string())
}

fn parse_filter(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref());
    let toml = TomlConfig::load_or_default(config_path.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&toml.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "moodtune v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let overrides = CliOverrides {
        api_base_url: cli.api_base_url.clone(),
        fer_endpoint_url: cli.fer_endpoint.clone(),
        rag_base_url: cli.rag_base_url.clone(),
        music_base_url: cli.music_base_url.clone(),
        data_dir: cli.data_dir.clone(),
    };
    let settings = Settings::resolve(&overrides, &toml);
    let ctx = AppContext::from_settings(settings).context("Failed to initialize")?;

    if let Err(e) = run(&ctx, cli.command).await {
        error!("{:#}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(ctx: &AppContext, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let user = ctx.auth.login(&email, &password).await?;
            println!(
                "Logged in as {}",
                user.display_name.as_deref().unwrap_or(&user.user_id)
            );
        }
        Command::Logout => {
            let outcome = ctx.logout().await;
            println!("Logged out ({:?})", outcome);
        }
        Command::Whoami => match (ctx.session.user(), ctx.session.session_id()) {
            (Some(user), Some(session_id)) => {
                println!("user:    {}", user.user_id);
                if let Some(name) = user.display_name {
                    println!("name:    {}", name);
                }
                println!("session: {}", session_id);
            }
            _ => println!("Not logged in"),
        },
        Command::Health => {
            let report = ctx.health().await;
            println!("api:   {}", report.api);
            println!("fer:   {}", report.fer);
            println!("rag:   {}", report.rag);
            println!("music: {}", report.music);
        }
        Command::Detect(args) => detect(ctx, args).await?,
        Command::Explore { mood, min } => {
            let recs = ctx.recommender.search(mood, min).await?;
            print_recommendations(&recs);
        }
        Command::Playlist(cmd) => playlist(ctx, cmd).await?,
        Command::Connect(cmd) => connect(ctx, cmd).await?,
        Command::Admin(args) => {
            let action = match args.action {
                AdminCommand::List {
                    limit,
                    offset,
                    filters,
                } => {
                    let mut query = ListQuery {
                        limit,
                        offset,
                        ..Default::default()
                    };
                    for (k, v) in filters {
                        query = query.filter(k, v);
                    }
                    AdminAction::List(query)
                }
                AdminCommand::Get { id } => AdminAction::Get(id),
                AdminCommand::Create { body } => AdminAction::Create(parse_body(&body)?),
                AdminCommand::Patch { id, body } => AdminAction::Patch(id, parse_body(&body)?),
                AdminCommand::Delete { id } => AdminAction::Delete(id),
            };
            let value = admin::dispatch(&ctx.api, args.resource, action).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

fn parse_body(raw: &str) -> Result<serde_json::Value> {
    serde_json::from_str(raw).context("body must be valid JSON")
}

async fn detect(ctx: &AppContext, args: DetectArgs) -> Result<()> {
    let image = ImageUpload::from_path(&args.image)?;
    let report = ctx.detector.detect(&image, args.consent).await?;

    println!(
        "emotion: {} (confidence {:.2})",
        report.result.emotion, report.result.confidence
    );
    if let Some(ref version) = report.result.model_version {
        println!("model:   {}", version);
    }
    println!("latency: {} ms", report.latency_ms);
    if let Some(ref reason) = report.remote_error {
        println!("note:    remote classifier unavailable ({})", reason);
    }

    match report.recommendations {
        RecommendationState::Loaded(ref recs) => print_recommendations(recs),
        RecommendationState::Failed(ref msg) => println!("recommendations unavailable: {}", msg),
    }

    if args.save {
        let intention = args.intention.unwrap_or(Intention::Maintain);
        let inference = save_inference(
            ctx.api.as_ref(),
            &ctx.session,
            Some(&report.result),
            Some(report.latency_ms),
            intention,
            args.target,
        )
        .await?;
        println!("saved inference {}", inference.inference_id);
    }
    Ok(())
}

fn print_track(index: usize, track: &Track) {
    let link = link_info_for_track(track)
        .map(|info| info.url)
        .unwrap_or_default();
    println!("{:>3}. {}  {}", index + 1, track.label(), link);
}

fn print_recommendations(recs: &Recommendations) {
    println!("{} tracks for '{}':", recs.tracks.len(), recs.mood);
    for (i, track) in recs.tracks.iter().enumerate() {
        print_track(i, track);
    }
    if let Some(ref note) = recs.note {
        println!("note: {}", note);
    }
}

async fn playlist(ctx: &AppContext, cmd: PlaylistCommand) -> Result<()> {
    match cmd {
        PlaylistCommand::Suggest { mood, min } => {
            let suggestion = ctx.playlists.suggest(mood, min).await?;
            println!("{}", suggestion.title);
            if !suggestion.description.is_empty() {
                println!("{}", suggestion.description);
            }
            for (i, track) in suggestion.tracks.iter().enumerate() {
                print_track(i, track);
            }
            if let Some(note) = suggestion.note {
                println!("note: {}", note);
            }
        }
        PlaylistCommand::Save {
            mood,
            min,
            pick,
            title,
        } => {
            let suggestion = ctx.playlists.suggest(mood, min).await?;
            let mut selection = TrackSelection::new();
            if pick.is_empty() {
                selection.select_all(&suggestion.tracks);
            } else {
                for n in pick {
                    let track = n
                        .checked_sub(1)
                        .and_then(|i| suggestion.tracks.get(i).map(|t| (i, t)))
                        .ok_or_else(|| anyhow!("no track number {}", n))?;
                    selection.toggle(&track.1.selection_key(track.0));
                }
            }
            let selected = selection
                .selected(&suggestion.tracks)
                .into_iter()
                .cloned()
                .collect();

            let mut draft = PlaylistDraft::from_suggestion(&suggestion, selected);
            if let Some(title) = title {
                draft.title = title;
            }
            let saved = ctx.playlists.save(&draft).await?;
            println!(
                "Created \"{}\" with {} tracks",
                saved.created.title, saved.created.tracks_added
            );
            println!("{}", saved.created.deep_link_url);
            if saved.skipped > 0 {
                println!("{} tracks had no Spotify URI and were left out", saved.skipped);
            }
        }
        PlaylistCommand::List => {
            for p in ctx.playlists.list_saved().await? {
                println!(
                    "{}  {}  {}",
                    p.playlist_id,
                    p.title.as_deref().unwrap_or("(untitled)"),
                    p.deep_link_url.as_deref().unwrap_or("")
                );
            }
        }
        PlaylistCommand::Show { playlist_id } => {
            let saved = ctx.playlists.list_saved().await?;
            let record = saved
                .iter()
                .find(|p| p.playlist_id == playlist_id)
                .ok_or_else(|| anyhow!("playlist {} not found", playlist_id))?;
            let details = ctx.playlists.fetch_content(record).await?;
            println!("{}", details.title.as_deref().unwrap_or("(untitled)"));
            for (i, track) in details.tracks.iter().enumerate() {
                let link = track
                    .uri
                    .as_deref()
                    .and_then(link_for_uri)
                    .unwrap_or_default();
                println!(
                    "{:>3}. {} - {}  {}",
                    i + 1,
                    track.title.as_deref().unwrap_or("Untitled"),
                    track.artist.as_deref().unwrap_or("Unknown"),
                    link
                );
            }
        }
    }
    Ok(())
}

async fn connect(ctx: &AppContext, cmd: ConnectCommand) -> Result<()> {
    match cmd {
        ConnectCommand::Begin { callback_url } => {
            let auth = ctx.connect.begin(&callback_url).await?;
            println!("Open this URL to authorize:\n{}", auth.authorize_url);
        }
        ConnectCommand::Complete {
            access_token,
            refresh_token,
            expires_in,
            state,
        } => {
            let meta = ctx
                .connect
                .complete(OAuthCallback {
                    access_token,
                    refresh_token,
                    expires_in,
                    state,
                })
                .await?;
            println!("Spotify connected (expires {})", meta.expires_at);
        }
        ConnectCommand::Code { code, state } => {
            let meta = ctx.connect.complete_with_code(&code, &state).await?;
            println!("Spotify connected (expires {})", meta.expires_at);
        }
        ConnectCommand::Status => match ctx.tokens.metadata() {
            Some(meta) if meta.is_expired() => {
                println!("connected, token expired or expiring ({})", meta.expires_at)
            }
            Some(meta) => println!("connected until {}", meta.expires_at),
            None => println!("not connected"),
        },
        ConnectCommand::Disconnect => {
            ctx.connect.disconnect()?;
            println!("Spotify disconnected");
        }
    }
    Ok(())
}
