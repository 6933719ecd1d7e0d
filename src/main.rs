use anyhow::{Context, Result, bail};
use clap::Parser;
use owo_colors::OwoColorize;
use signrelay::chat::{
    ChangeFeed, ChatRelay, InMemoryRelay, IncomingMessageRouter, Lobby, MessageKind,
};
use signrelay::cli::{Cli, Commands, ConfigAction, ReplCommand};
use signrelay::config::Config;
use signrelay::defaults::{DEFAULT_USER_ID, DEMO_PARTNER_ID};
use signrelay::playback::{PlaybackConfig, PlaybackEngine, PlaybackPhase, compute_duration};
use signrelay::terminal::TerminalSink;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let overrides = PacingOverrides {
        letter_delay: cli.letter_delay,
        start_delay: cli.start_delay,
    };

    match cli.command {
        Commands::Play { sentence, no_face } => {
            let config = load_config(cli.config.as_deref())?;
            let playback = overrides.apply(config.playback.to_playback_config()?);
            play_once(playback, &sentence, no_face).await?;
        }
        Commands::Repl => {
            let config = load_config(cli.config.as_deref())?;
            let playback = overrides.apply(config.playback.to_playback_config()?);
            run_repl(&config, playback).await?;
        }
        Commands::Duration { sentence } => {
            let config = load_config(cli.config.as_deref())?;
            let playback = overrides.apply(config.playback.to_playback_config()?);
            let total = compute_duration(&sentence, playback.letter_delay);
            println!("{}", humantime::format_duration(total));
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over `-q`/`-v`.
fn init_tracing(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("signrelay={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .ok();
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/signrelay/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path).with_context(|| format!("Failed to load {}", path.display()))?
    } else {
        let default_path = Config::default_path()?;
        Config::load_or_default(&default_path)?
    };

    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Pacing flags from the command line, applied on top of the config file.
struct PacingOverrides {
    letter_delay: Option<Duration>,
    start_delay: Option<Duration>,
}

impl PacingOverrides {
    fn apply(&self, mut playback: PlaybackConfig) -> PlaybackConfig {
        if let Some(delay) = self.letter_delay {
            playback.letter_delay = delay;
        }
        if let Some(delay) = self.start_delay {
            playback.delay_before_start = delay;
        }
        playback
    }
}

fn terminal_engine(playback: PlaybackConfig) -> PlaybackEngine {
    let sink = Arc::new(TerminalSink::new(std::io::stdout().is_terminal()));
    PlaybackEngine::builder(playback)
        .with_animation_sink(sink.clone())
        .with_status_sink(sink)
        .build(Handle::current())
}

/// Play one sentence, returning once it is done or on Ctrl-C.
async fn play_once(playback: PlaybackConfig, sentence: &str, no_face: bool) -> Result<()> {
    if sentence.is_empty() {
        bail!("Nothing to play: sentence is empty");
    }

    let engine = terminal_engine(playback);
    if no_face {
        engine.set_face_detected(false);
    }

    let mut phases = engine.watch_phase();
    engine.play_sentence(sentence);

    tokio::select! {
        reached = phases.wait_for(|phase| *phase == PlaybackPhase::Done) => {
            reached.map(|_| ()).context("playback engine went away")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            engine.stop();
            eprintln!("{}", "Stopped".yellow());
        }
    }
    Ok(())
}

/// Interactive session over an in-process relay.
///
/// The local user opens a room and the demo partner joins it by code. Typed
/// sentences are posted as the partner and come back through the change
/// feed, so they take the same route a remote message would.
async fn run_repl(config: &Config, playback: PlaybackConfig) -> Result<()> {
    let user_id = config
        .relay
        .user_id
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_ID.to_string());

    let engine = terminal_engine(playback);
    let relay = InMemoryRelay::new();
    let token = CancellationToken::new();

    let room = Lobby::new(Arc::new(relay.clone()), &user_id)
        .create_room()
        .await
        .context("Failed to open a room")?;
    Lobby::new(Arc::new(relay.clone()), DEMO_PARTNER_ID)
        .join_room(&room.room_code)
        .await
        .context("Partner failed to join the room")?;
    let session_id = room.id;
    println!("{} {}", "Room code:".dimmed(), room.room_code.bold());

    let feed = relay.subscribe(&session_id).await?;
    let router = IncomingMessageRouter::new(engine.clone(), &session_id, &user_id);
    let router_task = tokio::spawn(router.run(feed, token.clone()));
    let partner = ChatRelay::new(Arc::new(relay.clone()), &session_id, DEMO_PARTNER_ID);

    info!(session = %session_id, user = %user_id, "interactive session started");
    print_repl_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = ReplCommand::parse(&line) else {
            continue;
        };
        debug!(?command, "repl input");

        match command {
            ReplCommand::Sentence(text) => {
                partner.send(MessageKind::TextToSign, &text).await?;
            }
            ReplCommand::Face(detected) => {
                engine.set_face_detected(detected);
                let label = if detected { "face in view" } else { "face out of view" };
                println!("{}", label.dimmed());
            }
            ReplCommand::Stop => engine.stop(),
            ReplCommand::Status => {
                let snapshot = engine.snapshot();
                println!(
                    "  {} {:?}  {} {}/{}  {} {}",
                    "Phase:".dimmed(),
                    snapshot.phase,
                    "Position:".dimmed(),
                    snapshot.position,
                    snapshot.sentence.chars().count(),
                    "Total:".dimmed(),
                    humantime::format_duration(snapshot.total),
                );
            }
            ReplCommand::Help => print_repl_help(),
            ReplCommand::Quit => break,
            ReplCommand::Unknown(input) => {
                eprintln!("{}", format!("Unknown command: {input}").red());
            }
        }
    }

    engine.stop();
    token.cancel();
    relay.close();
    router_task.await.context("router task failed")?;
    Ok(())
}

fn print_repl_help() {
    println!("Type a sentence to sign it. Commands:");
    println!("  {}   toggle face presence", "/face on|off".green());
    println!("  {}          cancel the sentence in flight", "/stop".green());
    println!("  {}        show the current session", "/status".green());
    println!("  {}          leave", "/quit".green());
}

/// Handle configuration commands.
fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(custom_path)?;
            let toml = toml::to_string_pretty(&config).context("Failed to render config")?;
            print!("{}", toml);
        }
        ConfigAction::Path => {
            let path = match custom_path {
                Some(path) => path.to_path_buf(),
                None => Config::default_path()?,
            };
            println!("{}", path.display());
        }
    }
    Ok(())
}
