//! Perform console - showsync example
//!
//! Runs an in-process show host, keeps a replica of its show through
//! [`ReplicaStore`], and drives playback from the terminal:
//! 1. crossterm events -> confirmation dialog (while a prompt is up)
//! 2. otherwise -> TerminalEvents -> the scoped key binding -> intents
//! 3. intents start host commands; the host broadcasts what changed
//! 4. the replica folds the broadcasts and the screen re-renders
//!
//! # Usage
//!
//! ```sh
//! cargo run -p perform
//!
//! # More actors and cues, with logs written to a file
//! cargo run -p perform -- --actors 16 --cues 12 --log-file perform.log
//! ```

mod perform;

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use showsync::model::{ActorId, ChannelId, GroupId, SingleDcaAssignment, WingColor};
use showsync::{
    spawn_event_poller, ChannelInfo, ConfirmationBroker, HostCommands, LoopbackHost, PollerConfig,
    RawEvent, ReplicaConfig, ReplicaStore, TerminalEvents,
};
use showsync_components::handle_confirmation_key;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::perform::{bind_keys, rebind_keys, Perform};

/// Perform console - showsync example
#[derive(Parser, Debug)]
#[command(name = "perform")]
#[command(about = "Run a show from the terminal against an in-process host")]
struct Args {
    /// Console channels imported as actors
    #[arg(long, default_value = "8", value_parser = clap::value_parser!(u32).range(1..=48))]
    actors: u32,

    /// Cues in the seeded show
    #[arg(long, default_value = "5")]
    cues: u32,

    /// Write logs to this file (the terminal is owned by the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Redraw interval in milliseconds
    #[arg(long, default_value = "250")]
    tick_ms: u64,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.log_file {
        let file = File::create(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    }

    // Build the show before entering TUI mode
    let host = LoopbackHost::new();
    if let Err(err) = seed_show(&host, args.actors, args.cues).await {
        eprintln!("Error: could not seed the show: {err}");
        std::process::exit(1);
    }
    let store = ReplicaStore::start(Arc::new(host), ReplicaConfig::default())
        .await
        .map_err(io::Error::other)?;

    // ===== Terminal setup =====
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, store, Duration::from_millis(args.tick_ms)).await;

    // ===== Cleanup =====
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Fill the host with actors from the console, one group and some cues.
async fn seed_show(host: &LoopbackHost, actors: u32, cues: u32) -> io::Result<()> {
    let commands = HostCommands::new(Arc::new(host.clone()));
    let first = ChannelId::new(1).map_err(io::Error::other)?;
    let last = ChannelId::new(actors).map_err(io::Error::other)?;

    for (channel, color) in ChannelId::all()
        .take_while(|channel| *channel <= last)
        .zip(WingColor::ALL.into_iter().cycle())
    {
        host.set_channel_info(
            channel,
            ChannelInfo {
                name: format!("Actor {channel}"),
                color: Some(color),
            },
        );
    }
    commands
        .import_actors(first, last)
        .await
        .map_err(io::Error::other)?;

    let ensemble = (1..=actors).map(ActorId).collect();
    commands
        .add_group(ensemble, "Ensemble", Some(WingColor::ALL[0]))
        .await
        .map_err(io::Error::other)?;

    for _ in 0..cues {
        commands.add_cue().await.map_err(io::Error::other)?;
    }
    for (n, cue) in host.show().cues.iter().enumerate() {
        let soloist = ActorId(n as u32 % actors + 1);
        for (dca, assignment) in [
            SingleDcaAssignment::Group(GroupId(1)),
            SingleDcaAssignment::Actor(soloist),
        ]
        .into_iter()
        .enumerate()
        {
            commands
                .set_cue_dca_assignment(cue.id, dca, assignment)
                .await
                .map_err(io::Error::other)?;
        }
    }

    info!(actors, cues, "Show seeded");
    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    store: ReplicaStore<LoopbackHost>,
    tick: Duration,
) -> io::Result<()> {
    // The snapshot has been fetched by now; a failed one never recovers
    let mut replica = store.handle();
    let Some(mut document) = replica.document() else {
        return Err(io::Error::other("the host did not deliver the show"));
    };

    let broker = ConfirmationBroker::new();
    let mut prompts = broker.subscribe();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut perform = Perform::new(store.commands().clone(), broker.clone(), tx.clone());

    let terminal_events = TerminalEvents::new();
    let mut keys = bind_keys(&terminal_events, &tx, perform.state.armed);

    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let poller = spawn_event_poller(raw_tx, PollerConfig::default(), cancel.clone());
    let mut ticker = tokio::time::interval(tick);

    loop {
        terminal.draw(|frame| perform.render(frame, &document.show, &document.show_state))?;

        tokio::select! {
            Some(raw) = raw_rx.recv() => {
                let answered = matches!(&raw, RawEvent::Key(key) if handle_confirmation_key(&broker, key));
                if !answered {
                    terminal_events.emit(&raw);
                }
            }
            Some(msg) = rx.recv() => perform.handle(msg, &document.show),
            alive = replica.changed() => {
                if !alive {
                    warn!("Replica closed");
                    break;
                }
                if let Some(latest) = replica.document() {
                    document = latest;
                }
            }
            _ = prompts.changed() => {}
            _ = ticker.tick() => {}
        }

        if perform.state.quit {
            break;
        }
        rebind_keys(&mut keys, &tx, perform.state.armed);
    }

    cancel.cancel();
    let _ = poller.await;
    drop(keys);
    store.shutdown().await.map_err(io::Error::other)
}
