use clapboard::cli::Args;
use clapboard::config::{self, PlayerSettings};
use clapboard::core::clock::ManualClock;
use clapboard::core::mediator::Mediator;
use clapboard::core::playback::{Playback, PlaybackContext, PlaybackOptions};
use clapboard::core::state::PlaybackState;
use clapboard::platform::Platform;
use clapboard::playbacks::flash::{FlashPlayback, PluginState, ScriptedPlugin};
use clapboard::playbacks::html5::{Html5Playback, NativeEvent, ScriptedElement};
use clapboard::playbacks::{BackendId, NoOpPlayback, PlaybackKind, select_backend};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::io::Write;
use std::sync::Arc;

/// Host loop step
const STEP_MS: u64 = 50;

/// What the simulated media technology does next
#[derive(Debug, Clone, Copy)]
enum Cue {
    Metadata,
    Buffering,
    Playing,
    Time(f64),
    Progress(f64),
    Ended,
}

/// Scripted stand-in for the media technology behind the selected backend
enum Simulator {
    Plugin(ScriptedPlugin),
    Element { element: ScriptedElement, ready_after: u32 },
    Nothing,
}

impl Simulator {
    fn cue(&self, playback: &mut PlaybackKind, cue: Cue, duration: f64) {
        match (self, playback) {
            (Simulator::Plugin(plugin), _) => match cue {
                Cue::Metadata => plugin.announce_ready(),
                Cue::Buffering => plugin.set_state(PluginState::PlayingBuffering),
                Cue::Playing => plugin.set_state(PluginState::Playing),
                Cue::Time(position) => plugin.set_time(position, duration),
                Cue::Progress(fraction) => plugin.set_progress((fraction * 1_000_000.0) as u64, 1_000_000),
                Cue::Ended => plugin.set_state(PluginState::Ended),
            },
            (Simulator::Element { element, .. }, PlaybackKind::Html5(html5)) => {
                let event = match cue {
                    Cue::Metadata => {
                        element.set_duration(duration);
                        NativeEvent::LoadedMetadata
                    }
                    Cue::Buffering => NativeEvent::Waiting,
                    Cue::Playing => NativeEvent::Playing,
                    Cue::Time(position) => {
                        element.set_position(position);
                        NativeEvent::TimeUpdate
                    }
                    Cue::Progress(fraction) => {
                        element.set_buffered(duration * fraction);
                        NativeEvent::Progress
                    }
                    Cue::Ended => NativeEvent::Ended,
                };
                html5.handle_event(event);
            }
            _ => {}
        }
    }
}

struct Session<W: Write> {
    playback: PlaybackKind,
    simulator: Simulator,
    clock: ManualClock,
    duration: f64,
    steps: u32,
    out: W,
}

impl<W: Write> Session<W> {
    /// Advance the virtual clock one step, pump the backend, print what it emitted.
    fn step(&mut self) -> Result<()> {
        self.clock.advance_ms(STEP_MS);
        self.steps += 1;
        let metadata_due = matches!(
            &self.simulator,
            Simulator::Element { ready_after, .. } if *ready_after == self.steps
        );
        if metadata_due {
            self.cue(Cue::Metadata);
        }
        self.playback.tick();
        self.flush()
    }

    fn cue(&mut self, cue: Cue) {
        debug!("Cue {:?}", cue);
        self.simulator.cue(&mut self.playback, cue, self.duration);
    }

    fn flush(&mut self) -> Result<()> {
        let at_ms = u64::from(self.steps) * STEP_MS;
        for emitted in self.playback.events().poll() {
            let line = serde_json::to_string(&emitted).context("Failed to serialize event")?;
            writeln!(self.out, "{:>6}ms {}", at_ms, line).context("Failed to write event")?;
        }
        Ok(())
    }

    fn run(&mut self, auto_play: bool, volume: u8, max_steps: u32) -> Result<()> {
        while !self.playback.is_ready() && self.playback.state() != PlaybackState::Error && self.steps < max_steps {
            self.step()?;
        }
        if !self.playback.is_ready() {
            info!("Backend {} never became ready ({})", self.playback.name(), self.playback.state());
            return Ok(());
        }

        self.playback.volume(volume);
        if !auto_play {
            self.playback.play();
        }
        self.flush()?;

        for cue in [Cue::Buffering, Cue::Playing, Cue::Progress(0.5)] {
            self.cue(cue);
            self.step()?;
        }
        for quarter in 1..=4 {
            self.cue(Cue::Time(self.duration * f64::from(quarter) / 4.0));
            self.step()?;
        }
        self.cue(Cue::Progress(1.0));
        self.cue(Cue::Ended);
        self.step()?;
        Ok(())
    }
}

fn init_logging(args: &Args, path_config: &config::PathConfig) -> Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| config::data_file(config::LOG_FILE, path_config));
        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Respects RUST_LOG if set
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}

fn platform_from_args(args: &Args) -> Platform {
    let mut platform = if args.mobile { Platform::mobile() } else { Platform::desktop() };
    if args.no_flash {
        platform.has_flash = false;
    }
    platform
}

fn main() -> Result<()> {
    let args = Args::parse();

    let path_config = config::PathConfig::from_env_and_cli(args.config_dir.clone());
    if let Err(e) = config::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {:#}", e);
    }
    init_logging(&args, &path_config)?;

    info!("Clapboard starting...");
    debug!("Command-line args: {:?}", args);

    let settings_path = config::config_file(config::SETTINGS_FILE, &path_config);
    info!("Settings file: {}", settings_path.display());
    let settings = PlayerSettings::load(&settings_path)?;

    let platform = platform_from_args(&args);
    let resource = serde_json::Value::String(args.resource.clone());
    let backend = select_backend(&resource, &platform, &settings.backend_order);
    info!("Playing {} with {}", args.resource, backend.name());

    let mediator = Mediator::new();
    let clock = ManualClock::new();
    let ctx = PlaybackContext::new(mediator.clone(), platform)
        .with_clock(Arc::new(clock.clone()))
        .with_config(settings.playback);

    let mut options = PlaybackOptions::new(args.resource.clone()).with_auto_play(args.autoplay);
    if let Some(page_url) = &args.page_url {
        options = options.with_page_url(page_url.clone());
    }

    let (playback, simulator): (PlaybackKind, Simulator) = match backend {
        BackendId::Flash => {
            let mut plugin = ScriptedPlugin::new().attach(mediator.clone(), options.unique_id.clone());
            if !args.never_ready {
                plugin = plugin.interactive_after(args.ready_after);
            }
            plugin.set_duration(args.duration);
            let flash = FlashPlayback::new(options, ctx, Box::new(plugin.clone()));
            (flash.into(), Simulator::Plugin(plugin))
        }
        BackendId::Html5Video => {
            let element = ScriptedElement::new();
            let html5 = Html5Playback::new(options, Box::new(element.clone()));
            let ready_after = if args.never_ready { u32::MAX } else { args.ready_after };
            (html5.into(), Simulator::Element { element, ready_after })
        }
        BackendId::NoOp => (NoOpPlayback::new(options).into(), Simulator::Nothing),
    };

    let stdout = std::io::stdout();
    let mut session = Session {
        playback,
        simulator,
        clock,
        duration: args.duration,
        steps: 0,
        out: stdout.lock(),
    };
    let max_steps = settings.playback.max_attempts.saturating_add(args.ready_after).saturating_add(1);
    session.run(args.autoplay, settings.volume, max_steps)?;

    session.playback.destroy();
    info!("Session over, {} mediator registration(s) left", mediator.listener_count());
    Ok(())
}
