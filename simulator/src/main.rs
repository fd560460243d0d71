use clap::Parser;
use gui_bridge::bridge;
use log::warn;
use std::net::SocketAddr;
use std::path::PathBuf;
use workflow::config::{Overrides, WorkflowConfig};
use workflow::runner::Runner;

mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Road damage detection and report driver")]
struct Args {
    /// Image or video to analyse
    #[arg(long, default_value = "assets/road.jpg")]
    media: PathBuf,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Severity policy (dual_threshold or confidence_only)
    #[arg(long)]
    policy: Option<String>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Replay detections from a JSON file instead of generating them
    #[arg(long)]
    replay: Option<PathBuf>,
    #[arg(long)]
    frames: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    /// Serve the HTTP bridge instead of running once
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long, default_value = "127.0.0.1:9000")]
    bind: SocketAddr,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.workflow {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::default(),
    }
    .with_overrides(Overrides {
        policy: args.policy,
        output_dir: args.output_dir,
        frames: args.frames,
        seed: args.seed,
        replay: args.replay,
    });

    let runner = Runner::new(config)?;
    if args.serve {
        return bridge::serve(args.bind, runner.config().severity.clone());
    }

    let detector = runner.build_detector();
    let result = runner.execute(detector.as_ref(), &args.media)?;
    let analysis = &result.analysis;

    if analysis.no_damage_detected() {
        println!("No damage detected");
    } else {
        println!(
            "{} detections over {} frames ({} policy)",
            analysis.table.len(),
            analysis.stats.frames,
            runner.policy()
        );
        for entry in &analysis.summary.severity_counts {
            println!("  {:<10} {}", entry.tier, entry.count);
        }
        for class in &analysis.summary.classes {
            println!(
                "  {}: {} detections, mean confidence {:.3}",
                class.class_label, class.count, class.mean_confidence
            );
        }
    }

    let outcome = &result.outcome;
    for (artifact, path) in [
        ("table", &outcome.table_export),
        ("chart", &outcome.chart),
        ("report", &outcome.document),
    ] {
        match path {
            Ok(path) => println!("{artifact}: {}", path.display()),
            Err(err) => warn!("{artifact} not written: {err}"),
        }
    }
    if let Some(err) = outcome.first_error() {
        warn!("report bundle incomplete: {err}");
    }
    println!(
        "Processing time: {:.3} s",
        analysis.processing_time.as_secs_f64()
    );

    Ok(())
}
