use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hymnal::playback::{CountdownKind, PlaybackController, PlaybackEvent};
use hymnal::{load_hymn, stanza_layouts, Config, Hymn};

#[derive(Parser)]
#[command(name = "hymnal")]
#[command(about = "Karaoke-style hymn player and checker")]
struct Args {
    /// YAML configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a hymn and report repaired lines
    Check { file: PathBuf },

    /// Print every token with its note code and duration
    Timings {
        file: PathBuf,
        #[arg(long)]
        bpm: Option<u32>,
    },

    /// Play a hymn in the terminal
    Play {
        file: PathBuf,
        #[arg(long)]
        bpm: Option<u32>,
        /// Stanza to start from (1-based position)
        #[arg(long)]
        stanza: Option<usize>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("reading configuration '{}'", path.display()))?,
        None => Config::default(),
    };

    match args.command {
        Command::Check { file } => check(&file),
        Command::Timings { file, bpm } => timings(&file, bpm, &config),
        Command::Play { file, bpm, stanza } => play(&file, bpm, stanza, config),
    }
}

fn read_hymn(path: &Path) -> Result<(Hymn, Vec<hymnal::LoadWarning>)> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading hymn '{}'", path.display()))?;
    let loaded = load_hymn(&json).with_context(|| format!("loading '{}'", path.display()))?;
    Ok(loaded)
}

fn check(path: &Path) -> Result<()> {
    let (hymn, warnings) = read_hymn(path)?;
    println!("{}", hymn);
    for (index, stanza) in hymn.stanzas.iter().enumerate() {
        println!("  {:<12} {} lines", hymn.stanza_label(index), stanza.lines.len());
    }
    if warnings.is_empty() {
        println!("OK");
    } else {
        for warning in &warnings {
            println!("warning: {}", warning);
        }
    }
    Ok(())
}

fn timings(path: &Path, bpm: Option<u32>, config: &Config) -> Result<()> {
    let (hymn, _) = read_hymn(path)?;
    for (index, layout) in stanza_layouts(&hymn, bpm, config).iter().enumerate() {
        println!("== {} ({} ms)", hymn.stanza_label(index), layout.total_duration_ms());
        for step in &layout.steps {
            println!("{:<16} {:<12} {:>6}", step.token.to_string(), step.note_code.as_str(), step.duration_ms);
        }
    }
    Ok(())
}

fn play(path: &Path, bpm: Option<u32>, stanza: Option<usize>, config: Config) -> Result<()> {
    let (hymn, _) = read_hymn(path)?;
    let mut player = PlaybackController::realtime(config);
    for warning in player.load(hymn)? {
        eprintln!("warning: {}", warning);
    }
    if let Some(bpm) = bpm {
        player.set_tempo(i64::from(bpm));
    }
    if let Some(stanza) = stanza {
        if stanza == 0 {
            bail!("stanza numbers start at 1");
        }
        player.jump_to_stanza(stanza - 1)?;
    }

    info!(bpm = player.bpm(), "starting playback");
    player.start()?;

    loop {
        player.fire_due();
        for event in player.drain_events() {
            render(&player, &event);
        }
        if !player.state().is_running() {
            break;
        }
        match player.scheduler().time_until_next() {
            Some(wait) => thread::sleep(wait.max(Duration::from_millis(1))),
            None => break,
        }
    }
    Ok(())
}

fn render<S: hymnal::playback::Scheduler>(player: &PlaybackController<S>, event: &PlaybackEvent) {
    match event {
        PlaybackEvent::StanzaChanged { label, .. } => {
            println!();
            println!("[{}]", label);
        }
        PlaybackEvent::Countdown { kind, remaining_secs } => match kind {
            CountdownKind::Start => println!("starting in {}...", remaining_secs),
            CountdownKind::NextStanza { chorus: true, .. } => {
                println!("chorus in {}...", remaining_secs)
            }
            CountdownKind::NextStanza { .. } => println!("next stanza in {}...", remaining_secs),
        },
        PlaybackEvent::TokenHighlighted { span, .. } => {
            let layout = player.layout();
            let line = layout.text.lines().nth(span.line).unwrap_or_default();
            let line_start: usize = layout
                .text
                .lines()
                .take(span.line)
                .map(|l| l.chars().count() + 1)
                .sum();
            let offset = span.start.saturating_sub(line_start);
            let before: String = line.chars().take(offset).collect();
            let word: String = line.chars().skip(offset).take(span.len).collect();
            let after: String = line.chars().skip(offset + span.len).collect();
            println!("{}[{}]{}", before, word, after);
        }
        PlaybackEvent::Finished => println!("\nAmém."),
        _ => {}
    }
}
