mod diagnostics;
mod enumerate;
mod error;
mod gate;
mod outcome;
mod resolver;
mod stats;
mod status;
mod sysman;
#[cfg(test)]
mod test_support;
mod traits;

use std::io::{IsTerminal, Write};

use clap::{Parser, ValueEnum};
use diagnostics::{DiagnosticRange, DiagnosticReport, DiagnosticsOrchestrator};
use error::DiagError;
use resolver::DeviceResolver;
use stats::CallStats;
use sysman::SimulatedSysman;
use traits::{SessionConfig, Sysman};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Backend {
    /// Level Zero loader (requires the `level-zero` build feature)
    LevelZero,
    /// In-process simulated GPU
    Simulated,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "GPU diagnostics runner for Level Zero Sysman", long_about = None)]
struct Args {
    /// Do not print per-device properties
    #[arg(short, long, default_value_t = false)]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[arg(
        long,
        default_value_t = false,
        help = "Treat any failed subsystem call as fatal"
    )]
    strict: bool,

    /// First sub-test index to run
    #[arg(long, default_value_t = 0)]
    start: u32,

    /// Sub-test index to stop before (0 with --start 0 runs the default set)
    #[arg(long, default_value_t = 0)]
    end: u32,

    /// Management backend to use
    #[arg(long, value_enum, default_value_t = Backend::LevelZero)]
    backend: Backend,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            verbose: !self.quiet,
            strict: self.strict,
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn open_backend(backend: Backend) -> Result<Box<dyn Sysman>, DiagError> {
    match backend {
        Backend::Simulated => Ok(Box::new(SimulatedSysman::demo())),
        #[cfg(feature = "level-zero")]
        Backend::LevelZero => Ok(Box::new(sysman::LevelZeroSysman::new())),
        #[cfg(not(feature = "level-zero"))]
        Backend::LevelZero => Err(DiagError::BackendUnavailable(
            "Level Zero support not compiled. Build with: cargo build --features level-zero"
                .to_string(),
        )),
    }
}

/// Resolves devices and runs diagnostics on the first one.
fn run_session(
    sysman: &mut dyn Sysman,
    config: &SessionConfig,
    range: DiagnosticRange,
    show_spinner: bool,
    out: &mut dyn Write,
) -> Result<DiagnosticReport, DiagError> {
    let stats = CallStats::new();
    log::debug!("using {} backend", sysman.name());

    let resolved = DeviceResolver::new(&mut *sysman, config, &stats).resolve(out)?;
    log::debug!(
        "driver {} exposes {} device(s)",
        resolved.driver.raw,
        resolved.devices.len()
    );

    let report = DiagnosticsOrchestrator::new(sysman, config, &stats)
        .with_spinner(show_spinner)
        .run(resolved.primary(), range, out)?;
    log::debug!(
        "suite {} (1 of {}) over {} returned {:#x} after {}",
        report.suite.raw,
        report.suite_count,
        report.range,
        report.raw_result,
        humantime::format_duration(report.elapsed)
    );

    if !stats.is_clean() {
        log::warn!(
            "{} of {} subsystem calls failed; results may be unreliable",
            stats.get_soft_errors(),
            stats.get_calls()
        );
    }
    if report.outcome.needs_attention() {
        log::warn!(
            "diagnostics '{}' reported: {}",
            report.properties.name,
            report.outcome
        );
    }
    Ok(report)
}

fn start_session(
    args: &Args,
    open: impl FnOnce(Backend) -> Result<Box<dyn Sysman>, DiagError>,
    out: &mut dyn Write,
) -> Result<DiagnosticReport, DiagError> {
    let range = DiagnosticRange::new(args.start, args.end)?;
    let mut sysman = open(args.backend)?;
    let show_spinner = std::io::stderr().is_terminal();
    run_session(
        sysman.as_mut(),
        &args.session_config(),
        range,
        show_spinner,
        out,
    )
}

/// Runs one gated session and returns the process exit status.
///
/// The backend is only opened once the gate has passed.
fn execute(
    args: &Args,
    enabled: bool,
    open: impl FnOnce(Backend) -> Result<Box<dyn Sysman>, DiagError>,
    out: &mut dyn Write,
) -> i32 {
    if !enabled {
        log::info!(
            "Must set environment variable {}=1",
            gate::SYSMAN_ENV_VAR
        );
        return 0;
    }

    let result = start_session(args, open, out);

    match result {
        Ok(_) => 0,
        Err(e @ (DiagError::NoDriver | DiagError::NoDevice | DiagError::NoSuites)) => {
            // Reported in the same stream as the rest of the run.
            if let Err(write_err) = writeln!(out, "{}", e) {
                eprintln!("{} (report write failed: {})", e, write_err);
            }
            e.exit_code()
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let code = execute(&args, gate::sysman_enabled(), open_backend, &mut out);
    let _ = out.flush();
    std::process::exit(code);
}
