/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use thermosched::config::SystemConfigLoader;
use thermosched::scheduler;
use thermosched::simulator::{simulate, SimulationTrace};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Multiprocessor real-time scheduling simulator with thermal modelling.
///
/// Example:
///   thermosched -s system.yaml --scheduler global_edf -o trace.yaml
#[derive(Debug, Parser)]
#[command(
    name = "thermosched",
    about = "TCPN real-time scheduling simulator with DVFS and thermal modelling",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML (or JSON) system definition.
    #[arg(short = 's', long = "system")]
    system: PathBuf,

    /// Simulated time in seconds.  Defaults to the definition's horizon or
    /// one hyperperiod.
    #[arg(long = "horizon")]
    horizon: Option<f64>,

    /// Scheduler plug-in, overrides the definition (jdeds, global_edf).
    #[arg(long = "scheduler")]
    scheduler: Option<String>,

    /// Write the trace as YAML to this file.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        system    = %cli.system.display(),
        horizon   = ?cli.horizon,
        scheduler = ?cli.scheduler,
        output    = ?cli.output,
        "Configuration"
    );

    if let Err(e) = run(&cli) {
        error!("Simulation failed: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut system = SystemConfigLoader::load_from_file(&cli.system)?;
    if let Some(horizon) = cli.horizon {
        system.simulation.horizon = Some(horizon);
    }
    if let Some(name) = &cli.scheduler {
        system.scheduler = name.clone();
    }
    system.validate().context("Overridden definition rejected")?;

    let mut scheduler = scheduler::by_name(&system.scheduler)?;
    let trace = simulate(&system, scheduler.as_mut())
        .with_context(|| format!("Scheduler '{}' failed", system.scheduler))?;

    summarize(&trace);

    if let Some(path) = &cli.output {
        let yaml = serde_yaml::to_string(&trace).context("Failed to serialise the trace")?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Cannot write trace file: {}", path.display()))?;
        info!("Trace written to: {}", path.display());
    }
    Ok(())
}

fn summarize(trace: &SimulationTrace) {
    info!(
        end_time = trace.end_time,
        have_been_scheduled = trace.have_been_scheduled,
        scheduling_points = trace.scheduling_points.len(),
        deadline_misses = trace.deadline_misses.len(),
        rejected_aperiodic = trace.warnings.len(),
        migrations = trace.migrations(),
        "Run summary"
    );
    for (core, sections) in trace.job_sections_execution.iter().enumerate() {
        let busy: f64 = sections
            .iter()
            .map(|s| s.execution_end_time - s.execution_start_time)
            .sum();
        let peak = trace
            .max_temperature_cores
            .as_ref()
            .and_then(|t| t.get(core))
            .map(|series| series.iter().copied().fold(f64::NEG_INFINITY, f64::max));
        info!(
            "  Core {}: {} sections, busy {:.3} s, peak temperature {:?}",
            core,
            sections.len(),
            busy,
            peak
        );
    }
}
