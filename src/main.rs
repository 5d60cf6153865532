//! AudioConvert - Interruption-Resilient Audio File Converter

use std::path::Path;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use audioconvert::audio::WavFileIo;
use audioconvert::conversion::{InterruptionCenter, InterruptionEvent};
use audioconvert::{init_logging, Args, Config, ConversionJob, ConversionObserver, ConversionOutcome, ConvertError};
use clap::Parser;

/// Prints the job outcome to the console.
struct ConsoleObserver;

impl ConversionObserver for ConsoleObserver {
    fn on_error(&self, job: &ConversionJob, error: &ConvertError) {
        eprintln!("Conversion of {} failed: {}", job.source().display(), error);
    }

    fn on_complete(&self, _job: &ConversionJob, destination: &Path) {
        println!("Wrote {}", destination.display());
    }
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    if args.verbose {
        println!("{}", audioconvert::get_library_info());
        println!();
    }

    let config = Config::from_args_and_config(args).context("Invalid configuration")?;

    if !config.input_path.exists() {
        bail!("Input file does not exist: {}", config.input_path.display());
    }

    if let Some(parent) = config.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
        }
    }

    let request = config.request()?;

    println!("=== AudioConvert ===");
    println!("Input: {}", config.input_path.display());
    println!("Output: {}", config.output_path.display());
    println!("Format: {} in {}", request.output_format, request.container.name());
    if request.sample_rate > 0.0 {
        println!("Sample rate: {} Hz", request.sample_rate);
    } else {
        println!("Sample rate: same as source");
    }
    println!("====================\n");

    let observer = Arc::new(ConsoleObserver);
    let job = ConversionJob::builder(request, Arc::new(WavFileIo::new()))
        .observer(&observer)
        .build()?;

    let simulator = config
        .simulated_interruption()
        .map(|(delay, duration)| spawn_interruption_simulator(delay, duration))
        .transpose()?;

    let worker = Arc::clone(&job).start()?;
    let outcome = worker
        .join()
        .map_err(|_| anyhow::anyhow!("Conversion worker panicked"))?;

    if let Some(simulator) = simulator {
        if simulator.join().is_err() {
            log::warn!("Interruption simulator panicked");
        }
    }

    if let Some(report) = job.report() {
        println!("=== Conversion Complete ===");
        println!("Frames: {}", report.frames_written);
        if config.verbose() {
            println!("Cycles: {}", report.cycles);
            println!("Interruptions: {}", report.interruptions);
            println!("Resubmits: {}", report.resubmits);
        }
    }
    job.dispose();

    match outcome {
        ConversionOutcome::Success(_) => Ok(()),
        ConversionOutcome::Failure(e) => Err(e).context("Conversion failed"),
    }
}

/// Posts a begin event after `delay` and the matching end event after `duration`.
fn spawn_interruption_simulator(delay: Duration, duration: Duration) -> anyhow::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("interruption-simulator".to_string())
        .spawn(move || {
            let center = InterruptionCenter::global();
            thread::sleep(delay);
            let delivered = center.post(InterruptionEvent::Began);
            log::info!("Simulated {} delivered to {} job(s)", InterruptionEvent::Began, delivered);
            thread::sleep(duration);
            center.post(InterruptionEvent::Ended);
            log::info!("Simulated {}", InterruptionEvent::Ended);
        })
        .context("Failed to spawn interruption simulator")
}
