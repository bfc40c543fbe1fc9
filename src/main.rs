mod app;
mod config;
mod input;
mod library;
mod lyrics;
mod matcher;
mod player;
mod session;
mod storage;
mod translate;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "lyricsync",
    version,
    about = "Play local audio with synchronized lyrics",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Override config file path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Audio files, lyric files or folders to play (same as `play`).
    paths: Vec<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import files and play them with lyrics (default).
    Play {
        paths: Vec<PathBuf>,
        /// Use the silent clock instead of mpv.
        #[arg(long)]
        clock: bool,
        /// Show translations from the start.
        #[arg(long)]
        translate: bool,
    },
    /// Match every imported track to lyrics and save the links.
    Link { paths: Vec<PathBuf> },
    /// Inspect or edit saved track -> lyrics links.
    Links {
        #[command(subcommand)]
        cmd: LinksCommand,
    },
    /// Print a parsed lyric file.
    Show { file: PathBuf },
    /// Print the lyric line active at a playback position.
    At { file: PathBuf, seconds: f64 },
    /// Print the normalized form of file names.
    Normalize { names: Vec<String> },
    /// Translate one line of text (uses the cache).
    Translate { text: String },
    /// Translation cache maintenance.
    Cache {
        #[command(subcommand)]
        cmd: CacheCommand,
    },
    /// Audio output device for mpv.
    Audio {
        #[command(subcommand)]
        cmd: AudioCommand,
    },
}

#[derive(Debug, Subcommand)]
enum LinksCommand {
    /// List saved links.
    List,
    /// Link a track name to a lyric file name.
    Set { track: String, lyric: String },
    /// Forget the link of a track name.
    Remove { track: String },
    /// Forget all links.
    Clear,
}

#[derive(Debug, Subcommand)]
enum AudioCommand {
    /// List mpv audio devices.
    List,
    /// Use a device (name as shown by `list`).
    Set { device: String },
    /// Go back to mpv's default device.
    Clear,
}

#[derive(Debug, Subcommand)]
enum CacheCommand {
    /// Delete cached translations.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let mut cfg = config::load(cli.config.as_deref()).context("load config")?;

    let command = match cli.command {
        Some(cmd) => cmd,
        None if cli.paths.is_empty() => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            return Ok(());
        }
        None => Command::Play {
            paths: cli.paths,
            clock: false,
            translate: false,
        },
    };

    match command {
        Command::Play { paths, clock, translate } => {
            if clock {
                cfg.player.backend = config::PlayerBackend::Clock;
            }
            if translate {
                cfg.translate.enabled = true;
            }
            let session = build_session(&cfg, &paths);
            let translator = build_translator(&cfg);
            let mut app = app::App::new(cfg, session, translator);
            app.run().await?;
        }
        Command::Link { paths } => {
            let mut session = build_session(&cfg, &paths);
            for i in 0..session.library().tracks().len() {
                let Some(change) = session.select_track(i) else {
                    continue;
                };
                match change.status {
                    session::LinkStatus::Linked { lyric_key, .. } => {
                        println!("{} -> {lyric_key}", change.track.name)
                    }
                    session::LinkStatus::Unlinked => println!("{} -> (none)", change.track.name),
                }
            }
        }
        Command::Links { cmd } => {
            let storage = storage::Storage::open(&cfg.database_path()).context("open database")?;
            let mut links = storage.load_links();
            match cmd {
                LinksCommand::List => {
                    if links.is_empty() {
                        println!("no saved links");
                    }
                    for (track, lyric) in links.iter() {
                        println!("{track} -> {lyric}");
                    }
                }
                LinksCommand::Set { track, lyric } => {
                    let key = matcher::normalize::normalize(&track);
                    if key.is_empty() {
                        anyhow::bail!("track name {track:?} normalizes to nothing");
                    }
                    links.insert(key.clone(), lyric.clone());
                    storage.save_links(&links)?;
                    println!("{key} -> {lyric}");
                }
                LinksCommand::Remove { track } => {
                    let key = matcher::normalize::normalize(&track);
                    match links.remove(&key) {
                        Some(_) => {
                            storage.save_links(&links)?;
                            println!("removed {key}");
                        }
                        None => println!("no link for {key}"),
                    }
                }
                LinksCommand::Clear => {
                    storage.clear_links()?;
                    println!("cleared {} links", links.len());
                }
            }
        }
        Command::Show { file } => {
            let doc = lyrics::load_document(&file, &cfg.import.fallback_encoding)?;
            for line in &doc.lines {
                match line.timestamp {
                    Some(ts) => println!("[{}] {}", lyrics::format_timestamp(ts), line.text),
                    None => println!("{}", line.text),
                }
            }
        }
        Command::At { file, seconds } => {
            let doc = lyrics::load_document(&file, &cfg.import.fallback_encoding)?;
            match matcher::active_line(&doc, seconds).and_then(|i| doc.line(i)) {
                Some(line) => println!("{}: {}", line.index + 1, line.text),
                None => println!("(no line)"),
            }
        }
        Command::Normalize { names } => {
            for name in names {
                println!("{name} -> {}", matcher::normalize::normalize(&name));
            }
        }
        Command::Translate { text } => {
            let storage = storage::StorageHandle::new(cfg.database_path());
            let translator = translate::Translator::from_config(&cfg.translate, Some(storage))?;
            let out = translator.translate(&text).await.context("translate")?;
            println!("{out}");
        }
        Command::Cache { cmd } => match cmd {
            CacheCommand::Clear => {
                let storage = storage::Storage::open(&cfg.database_path()).context("open database")?;
                let n = storage.clear_translations()?;
                println!("removed {n} cached translations");
            }
        },
        Command::Audio { cmd } => match cmd {
            AudioCommand::List => {
                let out = tokio::process::Command::new("mpv")
                    .args(["--audio-device=help", "--no-video", "--idle=no"])
                    .output()
                    .await
                    .context("run mpv --audio-device=help")?;
                print!("{}", String::from_utf8_lossy(&out.stdout));
            }
            AudioCommand::Set { device } => {
                cfg.player.audio_device = Some(device);
                config::save(&cfg, cli.config.as_deref()).context("save config")?;
                println!("audio device saved");
            }
            AudioCommand::Clear => {
                cfg.player.audio_device = None;
                config::save(&cfg, cli.config.as_deref()).context("save config")?;
                println!("audio device cleared");
            }
        },
    }

    Ok(())
}

/// Import `paths` into a fresh session. A broken database only costs
/// persistence.
fn build_session(cfg: &config::Config, paths: &[PathBuf]) -> session::Session {
    let storage = open_storage(&cfg.database_path());
    let matcher = matcher::Matcher::new(cfg.matcher.min_overlap);
    let mut session = session::Session::new(library::Library::new(), matcher, storage);
    let (summary, _) = session.import(paths, &cfg.import);
    println!(
        "imported {} tracks, {} lyric files ({} skipped)",
        summary.tracks, summary.lyrics, summary.skipped
    );
    session
}

fn open_storage(path: &std::path::Path) -> Option<storage::Storage> {
    match storage::Storage::open(path) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!("links will not be saved: {e:#}");
            None
        }
    }
}

fn build_translator(cfg: &config::Config) -> Option<translate::Translator> {
    let storage = storage::StorageHandle::new(cfg.database_path());
    match translate::Translator::from_config(&cfg.translate, Some(storage)) {
        Ok(t) => Some(t),
        Err(e) => {
            tracing::warn!("translation disabled: {e:#}");
            None
        }
    }
}
