//! Breathwatch - breathing-circuit monitor
//!
//! Entry point for the command line monitor.

use anyhow::Result;
use breathwatch::sink::{ConsoleSink, MetricsSink};
use breathwatch::source::live::LiveSource;
use breathwatch::source::replay::ReplaySource;
use breathwatch::source::SampleSource;
use breathwatch::{AnalyzerConfig, BreathAnalyzer, StatsStore};
use std::path::Path;
use tracing::warn;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("breathwatch=info".parse().unwrap()),
        )
        .init();

    println!("╔════════════════════════════════════════════════════════════╗");
    println!(
        "║        Breathwatch v{} - Breathing Circuit Monitor        ║",
        breathwatch::VERSION
    );
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    let mut replay_path: Option<String> = None;
    let mut live_path: Option<String> = None;
    let mut config_path: Option<String> = None;
    let mut looping = false;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--version" | "-v" => {
                println!("breathwatch {}", breathwatch::VERSION);
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--replay" | "-r" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --replay requires a file path");
                    return Ok(());
                }
                replay_path = Some(args[i + 1].clone());
                i += 2;
                continue;
            }
            "--live" | "-l" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --live requires a device path");
                    return Ok(());
                }
                live_path = Some(args[i + 1].clone());
                i += 2;
                continue;
            }
            "--config" | "-c" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --config requires a file path");
                    return Ok(());
                }
                config_path = Some(args[i + 1].clone());
                i += 2;
                continue;
            }
            "--loop" => {
                looping = true;
            }
            arg if arg.starts_with('-') => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                return Ok(());
            }
            _ => {
                // Positional argument - treat as a replay file if not set
                if replay_path.is_none() {
                    replay_path = Some(args[i].clone());
                }
            }
        }
        i += 1;
    }

    let config = match &config_path {
        Some(path) => AnalyzerConfig::load(Path::new(path)),
        None => AnalyzerConfig::default(),
    };

    if let Some(path) = live_path {
        let source = LiveSource::open(Path::new(&path))?;
        println!("Monitoring live sensor stream: {}", path);
        return run(source, &config);
    }

    if let Some(path) = replay_path {
        let source = ReplaySource::from_path(Path::new(&path), looping)?;
        println!(
            "Replaying {} samples from {}{}",
            source.len(),
            path,
            if looping { " (looping)" } else { "" }
        );
        return run(source, &config);
    }

    eprintln!("Error: no input given (use --replay FILE or --live PATH)");
    print_help();
    Ok(())
}

fn print_help() {
    println!("Usage: breathwatch [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -r, --replay FILE   Replay a recorded sensor stream from FILE");
    println!("      --loop          Restart the replay from the top at end of file");
    println!("  -l, --live PATH     Read the live sensor stream from a device PATH");
    println!("  -c, --config FILE   Load analyzer configuration from FILE");
    println!("  -v, --version       Show version");
    println!("  -h, --help          Show this help");
    println!();
    println!("Examples:");
    println!("  breathwatch --replay capture.csv");
    println!("  breathwatch --live /dev/ttyUSB0 --config monitor.json");
}

fn run<S: SampleSource>(mut source: S, config: &AnalyzerConfig) -> Result<()> {
    let mut analyzer = BreathAnalyzer::new(config);
    let mut store = StatsStore::new();
    let mut sink = ConsoleSink;

    println!("Monitoring started. Press Ctrl+C to stop.");
    println!();

    // Set up Ctrl+C handler
    let running = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, std::sync::atomic::Ordering::SeqCst);
    })
    .ok();

    let started = std::time::Instant::now();

    // Main monitoring loop
    while running.load(std::sync::atomic::Ordering::SeqCst) {
        let sample = match source.next_sample() {
            Ok(Some(sample)) => sample,
            Ok(None) => break,
            Err(e) => {
                // Malformed records are transient; skip and keep reading
                warn!("skipping bad record: {}", e);
                continue;
            }
        };

        let output = analyzer.process(&sample);

        store.add_sample();
        if let Some(stats) = &output.stats {
            store.record_breath(stats);
        }
        for alarm in &output.alarms {
            store.record_alarm(alarm);
        }
        store.set_uptime(started.elapsed().as_secs());

        sink.consume(&output);
    }

    println!();
    println!("Stopping...");
    let stats = store.stats();
    println!(
        "Processed {} samples, {} breaths, {} alarms",
        stats.samples_processed, stats.breath_count, stats.total_alarms
    );
    if stats.breath_count > 0 {
        println!(
            "Rate: {:.2}/min avg ({:.2} min, {:.2} max) | TV: {:.2}mL avg",
            stats.avg_rate, stats.min_rate, stats.max_rate, stats.avg_tidal
        );
    }
    println!("Done.");

    Ok(())
}
