use anyhow::Context;
use clap::Parser;
use generator::scan::ScanGenerator;
use gui_bridge::bridge::{default_bind_address, GuiBridge};
use gui_bridge::model::VisualizationModel;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Storm cell detection and intercept driver")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Number of simulated scans to process
    #[arg(long, default_value_t = 3)]
    scans: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Minimum dBZ for a cell to join a storm region
    #[arg(long, default_value_t = 40.0)]
    threshold: f32,
    #[arg(long, default_value_t = 10)]
    min_region_size: usize,
    /// Write the cycle reports as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,
    /// Keep the HTTP bridge alive for incoming scans
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long)]
    bind: Option<SocketAddr>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(args.scans, args.seed, args.threshold, args.min_region_size)
    };

    let runner = Runner::new(workflow_config.clone())?;
    let mut generator = ScanGenerator::new(workflow_config.generator.clone());
    log::info!(
        "simulating {} storms over {} scans from {}",
        generator.storm_count(),
        workflow_config.scans,
        workflow_config.generator.station_id
    );
    let result = runner
        .execute(&mut generator)
        .context("running simulated workflow")?;

    for cycle in &result.cycles {
        println!(
            "{} {} -> cells {}, reachable {}",
            cycle.station_id,
            cycle.captured_at.to_rfc3339(),
            cycle.cells.len(),
            cycle.reachable()
        );
        for (cell, intercept) in cycle.cells.iter().zip(&cycle.intercepts) {
            match &intercept.plan {
                Some(plan) => println!(
                    "  {} -> intercept in {:.0} min at ({:.3}, {:.3}), {:.1} mi bearing {:.0}, {:.0} min drive",
                    cell.description(),
                    plan.time_to_intercept,
                    plan.target_latitude,
                    plan.target_longitude,
                    plan.travel_distance,
                    plan.bearing_to_target,
                    plan.travel_time
                ),
                None => println!("  {} -> out of reach", cell.description()),
            }
        }
    }
    println!(
        "Workflow -> passes {}, cells {}, rejected grids {}",
        result.metrics.passes, result.metrics.cells, result.metrics.rejected_grids
    );

    if let Some(report_path) = args.report {
        if let Some(parent) = report_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating report directory {}", parent.display()))?;
        }
        let report = serde_json::to_string_pretty(&result).context("serializing workflow report")?;
        fs::write(&report_path, report)
            .with_context(|| format!("writing report {}", report_path.display()))?;
    }

    if args.serve {
        let gui_bridge = GuiBridge::new(Arc::new(runner));
        if let Some(last) = result.cycles.last() {
            gui_bridge.publish(VisualizationModel::from_report(last));
        }
        gui_bridge.serve(args.bind.unwrap_or_else(default_bind_address));
        gui_bridge.publish_status("HTTP bridge running (Ctrl+C to stop)...");
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
