use playbridge::cli::Args;
use playbridge::config::{self, Settings};
use playbridge::core::commands::{CommandTarget, PlaylistChange};
use playbridge::core::engine::{PlaylistStatus, Signal, SignalValue};
use playbridge::sim::{SimEngine, SimNotifier, SIM_VOLUME_MAX};
use playbridge::{Context, Runner};

use clap::Parser;
use crossbeam_channel::Sender;
use log::{debug, info};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Presentation side stand-in: quit stops the loop, refreshes are logged.
struct DemoTarget {
    stop: Sender<()>,
}

impl CommandTarget for DemoTarget {
    fn quit(&self) -> anyhow::Result<()> {
        info!("Quit requested by engine");
        // Loop may already be stopping; a full channel is fine
        let _ = self.stop.try_send(());
        Ok(())
    }

    fn notify_playlist(&self, change: PlaylistChange) -> anyhow::Result<()> {
        info!("Playlist refresh ({})", change);
        Ok(())
    }
}

/// Scripted engine session: play, scrub, pause, switch items, stop, quit.
fn run_scenario(engine: Arc<SimEngine>, notifier: Arc<SimNotifier>, duration: Duration) {
    let steps = 20u32;
    let step = duration / steps;

    engine.set_volume(Some(SIM_VOLUME_MAX * 3 / 4));
    let mut input = engine.start_input(true);
    engine.set_status(PlaylistStatus::Running);
    let _ = notifier.fire(Signal::PlaylistCurrent, SignalValue::Int(-1), SignalValue::Int(0));

    for i in 0..steps {
        thread::sleep(step);
        input.set_position(i as f32 / steps as f32);

        match i {
            5 => engine.set_status(PlaylistStatus::Paused),
            7 => engine.set_status(PlaylistStatus::Running),
            10 => {
                // Item switch: old input dies, burst of playlist signals
                engine.kill_input();
                input = engine.start_input(false);
                for sig in [Signal::PlaylistCurrent, Signal::ItemChange, Signal::IntfChange] {
                    let _ = notifier.fire(sig, SignalValue::Int(0), SignalValue::Int(1));
                }
            }
            14 => engine.set_volume(Some(SIM_VOLUME_MAX / 4)),
            17 => {
                engine.set_status(PlaylistStatus::Stopped);
                engine.kill_input();
            }
            _ => {}
        }
    }

    debug!("Scenario finished, engine dying");
    engine.set_dying(true);
}

fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for log setup)
    let args = Args::parse();

    let path_config = config::PathConfig::from_env_and_cli(args.config_dir.clone());

    // Determine log level based on verbosity flags
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        if let Err(e) = config::ensure_dirs(&path_config) {
            eprintln!("Warning: Failed to create application directories: {}", e);
        }
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| config::data_file(config::LOG_FILE, &path_config));

        let file = std::fs::File::create(&log_path)?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Console logging (respects RUST_LOG if set)
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

    debug!("Command-line args: {:?}", args);

    let settings_path = config::config_file(config::SETTINGS_FILE, &path_config);
    let mut settings = Settings::load(&settings_path)?;
    if let Some(ms) = args.interval_ms {
        settings.poll_interval_ms = ms;
    }
    settings.validate()?;

    if args.dump_config {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    let engine = Arc::new(SimEngine::new());
    let notifier = Arc::new(SimNotifier::new());
    let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
    let target = Arc::new(DemoTarget { stop: stop_tx });

    let mut ctx = Context::new(engine.clone(), notifier.clone(), target, settings);

    let vars = ctx.vars_mut();
    vars.volume.add_observer(|old, new| info!("volume {:.2} -> {:.2}", old, new));
    vars.seekable_playing
        .add_observer(|old, new| info!("seekable_playing {} -> {}", old, new));

    let scenario = {
        let engine = Arc::clone(&engine);
        let notifier = Arc::clone(&notifier);
        let duration = Duration::from_secs(args.duration_secs.max(1));
        thread::Builder::new()
            .name("sim-engine".into())
            .spawn(move || run_scenario(engine, notifier, duration))?
    };

    let runner = Runner::for_context(&ctx);
    let stats = runner.run(&mut ctx, &stop_rx);

    if scenario.join().is_err() {
        anyhow::bail!("simulated engine thread panicked");
    }

    let vars = ctx.vars();
    println!(
        "ticks: {}  commands: {}  time: {:.2}  volume: {:.2}  playing: {}  seekable_playing: {}",
        stats.ticks,
        stats.commands,
        vars.time.get(),
        vars.volume.get(),
        vars.playing.get(),
        vars.seekable_playing.get()
    );

    drop(ctx);
    info!("Outstanding input references after teardown: {}", engine.outstanding());
    Ok(())
}
