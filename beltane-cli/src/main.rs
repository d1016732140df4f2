use std::fs::File;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use beltane_core::config;
use beltane_core::{Director, HapticDevice, PlaybackSink};
use beltane_types::{AudioItem, ClusterId, CueBank, Feedback, HandleId, TimelineId};

const DEMO_BANK: &str = include_str!("../cues.toml");

/// Prints pool operations instead of making sound.
struct ConsoleSink {
    next_handle: u64,
}

impl PlaybackSink for ConsoleSink {
    fn spawn(&mut self, item: &AudioItem) -> HandleId {
        self.next_handle += 1;
        let handle = HandleId::new(self.next_handle);
        println!("        pool: spawn #{} ({})", handle, item.source);
        handle
    }

    fn despawn(&mut self, handle: HandleId) {
        println!("        pool: despawn #{}", handle);
    }

    fn set_volume(&mut self, handle: HandleId, volume: f32) {
        println!("        pool: volume #{} -> {:.2}", handle, volume);
    }

    fn set_muted(&mut self, handle: HandleId, muted: bool) {
        println!(
            "        pool: {} #{}",
            if muted { "mute" } else { "unmute" },
            handle
        );
    }
}

/// Prints pulse transitions instead of vibrating.
struct ConsoleHaptics {
    capable: bool,
}

impl HapticDevice for ConsoleHaptics {
    fn is_capable(&self) -> bool {
        self.capable
    }

    fn set_pulse(&mut self, on: bool) {
        println!("        haptics: pulse {}", if on { "on" } else { "off" });
    }
}

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("beltane")
        .join("beltane.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = File::create(&log_path)
        .unwrap_or_else(|_| File::create("/tmp/beltane.log").expect("Cannot create log file"));

    WriteLogger::init(log_level, Config::default(), log_file).expect("Failed to initialize logger");

    log::info!("beltane starting (log level: {:?})", log_level);
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let bank_arg = args
        .iter()
        .position(|a| a == "--bank")
        .and_then(|i| args.get(i + 1).cloned());

    // Comma-separated cluster/timeline IDs; default is everything playable
    let cluster_args: Vec<u32> = args
        .iter()
        .position(|a| a == "--cluster")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.split(',').filter_map(|n| n.trim().parse().ok()).collect())
        .unwrap_or_default();
    let timeline_args: Vec<u32> = args
        .iter()
        .position(|a| a == "--timeline")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.split(',').filter_map(|n| n.trim().parse().ok()).collect())
        .unwrap_or_default();

    let max_secs: f32 = args
        .iter()
        .position(|a| a == "--for")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(30.0);

    let config = config::Config::load();

    let bank = match bank_arg
        .map(PathBuf::from)
        .or_else(|| config.bank_path().map(|p| p.to_path_buf()))
    {
        Some(path) => match config::load_bank_file(&path) {
            Ok(bank) => {
                println!("loaded cue bank {}", path.display());
                bank
            }
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        },
        None => config::parse_bank(DEMO_BANK).expect("Failed to parse embedded cues.toml"),
    };

    let (clusters, timelines) = if cluster_args.is_empty() && timeline_args.is_empty() {
        (
            bank.clusters
                .iter()
                .filter(|c| !c.items.is_empty())
                .map(|c| c.id)
                .collect(),
            bank.timelines
                .iter()
                .filter(|t| !t.segments.is_empty())
                .map(|t| t.id)
                .collect(),
        )
    } else {
        (
            cluster_args.iter().map(|&n| ClusterId::new(n)).collect(),
            timeline_args.iter().map(|&n| TimelineId::new(n)).collect(),
        )
    };

    println!(
        "beltane: {} channel(s), {} cluster(s), {} timeline(s) in bank",
        bank.channels.len(),
        bank.clusters.len(),
        bank.timelines.len()
    );

    run(&config, bank, clusters, timelines, max_secs);
}

fn run(
    config: &config::Config,
    bank: CueBank,
    clusters: Vec<ClusterId>,
    timelines: Vec<TimelineId>,
    max_secs: f32,
) {
    let (mut director, feedback_rx) = Director::new(
        bank,
        Box::new(ConsoleSink { next_handle: 0 }),
        Box::new(ConsoleHaptics {
            capable: config.haptics_enabled(),
        }),
    );

    for &id in &clusters {
        if let Some(cluster) = director.bank().cluster(id) {
            println!(
                "starting cluster {} ({}, {} item(s))",
                id,
                cluster.name,
                cluster.items.len()
            );
        }
        director.start_cluster(id);
    }
    for &id in &timelines {
        if let Some(timeline) = director.bank().timeline(id) {
            println!(
                "starting timeline {} ({}, {:.1}s)",
                id,
                timeline.name,
                timeline.total_secs()
            );
        }
        director.start_timeline(id);
    }

    let tick = Duration::from_secs_f32(1.0 / config.tick_hz() as f32);
    let item_secs = config.sim_item_secs();
    let started = Instant::now();
    let mut last = started;
    // Simulated completion clock: handles due to finish, fed from feedback.
    // Entries for sounds that were stopped in the meantime resolve as stale
    // completions and are ignored by the core.
    let mut completions: Vec<(HandleId, Instant)> = Vec::new();

    loop {
        std::thread::sleep(tick);
        let now = Instant::now();
        director.tick(now.duration_since(last));
        last = now;

        let (due, waiting): (Vec<(HandleId, Instant)>, Vec<(HandleId, Instant)>) =
            completions.drain(..).partition(|&(_, due)| now >= due);
        completions = waiting;
        for (handle, _) in due {
            director.item_finished(handle);
        }

        let t = now.duration_since(started).as_secs_f32();
        while let Ok(fb) = feedback_rx.try_recv() {
            match fb {
                Feedback::ItemStarted { item, handle } => {
                    completions.push((handle, now + Duration::from_secs_f32(item_secs)));
                    println!("{:6.2}s item {} started as #{}", t, item, handle);
                }
                Feedback::ItemFinished(item) => println!("{:6.2}s item {} finished", t, item),
                Feedback::ItemStopped(item) => println!("{:6.2}s item {} stopped", t, item),
                Feedback::ClusterFinished(id) => println!("{:6.2}s cluster {} finished", t, id),
                Feedback::TimelineFinished {
                    timeline,
                    cancelled,
                } => {
                    if cancelled {
                        println!("{:6.2}s timeline {} cancelled", t, timeline);
                    } else {
                        println!("{:6.2}s timeline {} finished", t, timeline);
                    }
                }
            }
        }

        let idle = director.live_sound_count() == 0
            && clusters.iter().all(|&c| !director.is_cluster_active(c))
            && timelines.iter().all(|&t| !director.is_timeline_running(t));
        if idle {
            break;
        }
        if now.duration_since(started).as_secs_f32() >= max_secs {
            println!("stopping after {:.1}s", max_secs);
            break;
        }
    }

    director.shutdown();
    let mut stopped = 0;
    while let Ok(fb) = feedback_rx.try_recv() {
        if matches!(
            fb,
            Feedback::ItemStopped(_) | Feedback::TimelineFinished { cancelled: true, .. }
        ) {
            stopped += 1;
        }
    }
    if stopped > 0 {
        println!("shutdown: stopped {} in-flight cue(s)", stopped);
    }
    println!("done in {:.2}s", started.elapsed().as_secs_f32());
}
