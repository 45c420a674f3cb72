//! Diagnostic suite orchestration.
//!
//! Enumerates the suites of one device, runs the first one over the requested
//! sub-test range and classifies the result. A run moves through
//! [`RunState`] in order; a failed enumeration or fetch stops it before the
//! suite is ever started.

use crate::enumerate::enumerate;
use crate::error::DiagError;
use crate::outcome::DiagnosticOutcome;
use crate::stats::CallStats;
use crate::status::check_value;
use crate::sysman::{DeviceHandle, DiagSuiteHandle, DiagnosticSuiteProperties};
use crate::traits::{SessionConfig, Sysman};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::{Duration, Instant};

/// Sub-tests `start..end` of a suite. `0..0` runs the suite's default set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticRange {
    pub start: u32,
    pub end: u32,
}

impl DiagnosticRange {
    /// Creates a range, rejecting `start > end`.
    pub fn new(start: u32, end: u32) -> Result<Self, DiagError> {
        if start > end {
            return Err(DiagError::Config(format!(
                "diagnostic range start {} is past end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// True for the `0..0` range.
    pub fn is_default_set(&self) -> bool {
        self.start == 0 && self.end == 0
    }
}

impl std::fmt::Display for DiagnosticRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_default_set() {
            f.write_str("default set")
        } else {
            write!(f, "[{}, {})", self.start, self.end)
        }
    }
}

/// Progress of one diagnostic run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    SuitesEnumerated,
    SuiteSelected,
    PropertiesFetched,
    TestRunning,
    Outcome(DiagnosticOutcome),
}

impl RunState {
    fn successor(&self) -> Option<RunState> {
        match self {
            RunState::Init => Some(RunState::SuitesEnumerated),
            RunState::SuitesEnumerated => Some(RunState::SuiteSelected),
            RunState::SuiteSelected => Some(RunState::PropertiesFetched),
            RunState::PropertiesFetched => Some(RunState::TestRunning),
            RunState::TestRunning | RunState::Outcome(_) => None,
        }
    }

    /// True if `next` may directly follow this state.
    pub fn can_advance_to(&self, next: RunState) -> bool {
        match (self, next) {
            (RunState::TestRunning, RunState::Outcome(_)) => true,
            _ => self.successor() == Some(next),
        }
    }
}

/// Everything learned during one run.
#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    pub suite_count: usize,
    pub suite: DiagSuiteHandle,
    pub properties: DiagnosticSuiteProperties,
    pub range: DiagnosticRange,
    /// Raw code as returned by the subsystem.
    pub raw_result: u32,
    pub outcome: DiagnosticOutcome,
    pub elapsed: Duration,
}

/// Runs diagnostics on one device.
pub struct DiagnosticsOrchestrator<'a> {
    sysman: &'a mut dyn Sysman,
    config: &'a SessionConfig,
    stats: &'a CallStats,
    state: RunState,
    show_spinner: bool,
}

impl<'a> DiagnosticsOrchestrator<'a> {
    pub fn new(sysman: &'a mut dyn Sysman, config: &'a SessionConfig, stats: &'a CallStats) -> Self {
        Self {
            sysman,
            config,
            stats,
            state: RunState::Init,
            show_spinner: false,
        }
    }

    /// Shows a status line on stderr while the blocking run call is in flight.
    pub fn with_spinner(mut self, show: bool) -> Self {
        self.show_spinner = show;
        self
    }

    /// Current state of the run.
    #[allow(dead_code)] // Inspected by tests
    pub fn state(&self) -> RunState {
        self.state
    }

    fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        log::trace!("diagnostics state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Enumerates, selects, describes and runs a suite on `device`.
    ///
    /// Report lines go to `out`; the last line written is the outcome
    /// message.
    ///
    /// # Errors
    ///
    /// Returns `DiagError::NoSuites` if the device exposes no suites; the
    /// run call is not made in that case.
    pub fn run(
        &mut self,
        device: DeviceHandle,
        range: DiagnosticRange,
        out: &mut dyn Write,
    ) -> Result<DiagnosticReport, DiagError> {
        let sysman = &mut *self.sysman;
        let suites = enumerate(
            "diagnostic suite",
            "zesDeviceEnumDiagnosticTestSuites",
            self.config,
            self.stats,
            |count, buffer| sysman.enum_diagnostic_suites(device, count, buffer),
        )?;
        if suites.is_empty() {
            return Err(DiagError::NoSuites);
        }
        writeln!(out, "retrieved {} domains", suites.len())?;
        self.advance(RunState::SuitesEnumerated);

        // First in enumeration order; there is no selection policy.
        let suite = suites[0];
        self.advance(RunState::SuiteSelected);

        let properties = check_value(
            self.sysman.diagnostic_properties(suite),
            "zesDiagnosticsGetProperties",
            self.config,
            self.stats,
        )?;
        writeln!(out, "diagnostics name = {}", properties.name)?;
        if properties.on_subdevice {
            writeln!(out, "Subdevice Id = {}", properties.subdevice_id)?;
        }
        writeln!(out, "diagnostics have sub tests = {}", properties.have_tests)?;
        self.advance(RunState::PropertiesFetched);

        log::info!("running '{}' over {}", properties.name, range);
        self.advance(RunState::TestRunning);
        let spinner = self.spinner(&properties.name);
        let started = Instant::now();
        let result = self
            .sysman
            .run_diagnostic_tests(suite, range.start, range.end);
        let elapsed = started.elapsed();
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        let failed = result.as_ref().err().copied();
        // A tolerated failure leaves the result unset, which reads as the
        // first enumerator, same as an untouched output variable.
        let raw_result = check_value(
            result,
            "zesDiagnosticsRunTests",
            self.config,
            self.stats,
        )?;
        let outcome = DiagnosticOutcome::classify(raw_result);
        self.advance(RunState::Outcome(outcome));
        if let Some(status) = failed {
            writeln!(
                out,
                "zesDiagnosticsRunTests returned {}; discard the result below",
                status
            )?;
        }
        writeln!(out, "{}", outcome.message())?;

        Ok(DiagnosticReport {
            suite_count: suites.len(),
            suite,
            properties,
            range,
            raw_result,
            outcome,
            elapsed,
        })
    }

    /// Draws a single static status line. It is not ticked while the run
    /// call blocks; the session stays on one thread.
    fn spinner(&self, suite_name: &str) -> Option<ProgressBar> {
        if !self.show_spinner {
            return None;
        }
        let spinner = ProgressBar::new_spinner();
        // Template is a constant; a parse failure only loses the styling.
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(format!("Running {}", suite_name));
        spinner.tick();
        Some(spinner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{RAW_ABORT, RAW_FAIL_CANT_REPAIR, RAW_FORCE_UINT32, RAW_NO_ERRORS};
    use crate::status::Status;
    use crate::sysman::simulated::{Call, CallKind};
    use crate::sysman::{DeviceProperties, DriverHandle, SimulatedSysman};

    struct Run {
        result: Result<DiagnosticReport, DiagError>,
        state: RunState,
        out: String,
    }

    fn first_device(sim: &mut SimulatedSysman) -> DeviceHandle {
        let mut count = 1;
        let mut driver = [DriverHandle::default()];
        sim.driver_get(&mut count, Some(&mut driver[..]));
        let mut device = [DeviceHandle::default()];
        sim.device_get(driver[0], &mut count, Some(&mut device[..]));
        device[0]
    }

    fn run_with(sim: &mut SimulatedSysman, config: &SessionConfig, range: DiagnosticRange) -> Run {
        let device = first_device(sim);
        let stats = CallStats::new();
        let mut out = Vec::new();
        let mut orchestrator = DiagnosticsOrchestrator::new(sim, config, &stats);
        let result = orchestrator.run(device, range, &mut out);
        Run {
            result,
            state: orchestrator.state(),
            out: String::from_utf8(out).unwrap(),
        }
    }

    fn run(sim: &mut SimulatedSysman) -> Run {
        run_with(sim, &SessionConfig::default(), DiagnosticRange::default())
    }

    #[test]
    fn test_range_validation() {
        assert!(DiagnosticRange::new(0, 0).unwrap().is_default_set());
        assert!(!DiagnosticRange::new(1, 4).unwrap().is_default_set());
        assert!(matches!(
            DiagnosticRange::new(5, 2),
            Err(DiagError::Config(_))
        ));
        assert_eq!(DiagnosticRange::new(1, 4).unwrap().to_string(), "[1, 4)");
        assert_eq!(DiagnosticRange::default().to_string(), "default set");
    }

    #[test]
    fn test_state_transitions_are_sequential() {
        assert!(RunState::Init.can_advance_to(RunState::SuitesEnumerated));
        assert!(!RunState::Init.can_advance_to(RunState::SuiteSelected));
        assert!(!RunState::SuiteSelected.can_advance_to(RunState::TestRunning));
        assert!(RunState::TestRunning
            .can_advance_to(RunState::Outcome(DiagnosticOutcome::Aborted)));
        assert!(!RunState::PropertiesFetched
            .can_advance_to(RunState::Outcome(DiagnosticOutcome::NoErrors)));
        assert!(!RunState::Outcome(DiagnosticOutcome::NoErrors).can_advance_to(RunState::Init));
    }

    #[test]
    fn test_runs_first_suite() {
        let mut sim = SimulatedSysman::single_gpu(&[
            ("MemoryTest", RAW_NO_ERRORS),
            ("ArrayTest", RAW_FAIL_CANT_REPAIR),
        ]);
        let run = run(&mut sim);

        let report = run.result.unwrap();
        assert_eq!(report.suite_count, 2);
        assert_eq!(report.properties.name, "MemoryTest");
        assert_eq!(report.outcome, DiagnosticOutcome::NoErrors);
        assert_eq!(run.state, RunState::Outcome(DiagnosticOutcome::NoErrors));
        assert_eq!(
            run.out,
            "retrieved 2 domains\n\
             diagnostics name = MemoryTest\n\
             diagnostics have sub tests = false\n\
             no errors occurred\n"
        );
    }

    #[test]
    fn test_suite_enumeration_is_two_phase() {
        let mut sim = SimulatedSysman::single_gpu(&[("A", 0), ("B", 0), ("C", 0)]);
        run(&mut sim);

        let suite_calls: Vec<&Call> = sim
            .calls()
            .iter()
            .filter(|c| c.kind() == CallKind::EnumDiagnosticSuites)
            .collect();
        assert_eq!(
            suite_calls,
            vec![
                &Call::EnumDiagnosticSuites {
                    buffer_len: None,
                    count: 3
                },
                &Call::EnumDiagnosticSuites {
                    buffer_len: Some(3),
                    count: 3
                },
            ]
        );
    }

    #[test]
    fn test_no_suites_never_runs() {
        let mut sim = SimulatedSysman::single_gpu(&[]);
        let run = run(&mut sim);

        assert!(matches!(run.result, Err(DiagError::NoSuites)));
        assert_eq!(run.state, RunState::Init);
        assert!(run.out.is_empty());
        assert_eq!(sim.count_of(CallKind::EnumDiagnosticSuites), 1);
        assert_eq!(sim.count_of(CallKind::RunDiagnosticTests), 0);
    }

    #[test]
    fn test_range_is_passed_through() {
        let mut sim = SimulatedSysman::single_gpu(&[("MemoryTest", RAW_NO_ERRORS)]);
        let range = DiagnosticRange::new(2, 5).unwrap();
        let run = run_with(&mut sim, &SessionConfig::default(), range);

        assert_eq!(run.result.unwrap().range, range);
        let last = sim.calls().last().cloned();
        assert!(matches!(
            last,
            Some(Call::RunDiagnosticTests {
                start: 2,
                end: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_subdevice_suite_reports_id() {
        let mut sim = SimulatedSysman::new();
        let driver = sim.add_driver();
        let device = sim.add_device(driver, DeviceProperties::default());
        sim.add_suite(
            device,
            DiagnosticSuiteProperties {
                name: "ScanTest".to_string(),
                on_subdevice: true,
                subdevice_id: 1,
                have_tests: true,
            },
            RAW_ABORT,
        );

        let run = run(&mut sim);
        assert_eq!(run.result.unwrap().outcome, DiagnosticOutcome::Aborted);
        assert!(run.out.contains("Subdevice Id = 1\n"));
        assert!(run.out.contains("diagnostics have sub tests = true\n"));
        assert!(run.out.ends_with("run failed with unknown cause\n"));
    }

    #[test]
    fn test_unknown_result_is_undefined() {
        let mut sim = SimulatedSysman::single_gpu(&[("MemoryTest", RAW_FORCE_UINT32)]);
        let run = run(&mut sim);

        let report = run.result.unwrap();
        assert_eq!(report.raw_result, RAW_FORCE_UINT32);
        assert_eq!(report.outcome, DiagnosticOutcome::Undefined);
        assert!(run.out.ends_with("undefined error\n"));
    }

    #[test]
    fn test_run_failure_is_soft_by_default() {
        crate::test_support::init_logging();
        let mut sim = SimulatedSysman::single_gpu(&[("MemoryTest", RAW_FAIL_CANT_REPAIR)]);
        sim.fail(CallKind::RunDiagnosticTests, Status::NotAvailable);
        let run = run(&mut sim);

        // The unset result reads as the zero code.
        assert_eq!(run.result.unwrap().outcome, DiagnosticOutcome::NoErrors);
        let lines: Vec<&str> = run.out.lines().collect();
        assert_eq!(
            lines[lines.len() - 2..],
            [
                "zesDiagnosticsRunTests returned ZE_RESULT_ERROR_NOT_AVAILABLE; discard the result below",
                "no errors occurred",
            ]
        );
    }

    #[test]
    fn test_successful_run_has_no_discard_line() {
        let mut sim = SimulatedSysman::single_gpu(&[("MemoryTest", RAW_NO_ERRORS)]);
        let run = run(&mut sim);

        assert!(!run.out.contains("discard"));
    }

    #[test]
    fn test_suite_enumeration_failure_logs_orchestrator_site() {
        crate::test_support::init_logging();
        crate::test_support::take_logs();
        let mut sim = SimulatedSysman::single_gpu(&[("MemoryTest", RAW_NO_ERRORS)]);
        sim.fail(CallKind::EnumDiagnosticSuites, Status::UnsupportedFeature);
        let run = run(&mut sim);

        assert!(matches!(run.result, Err(DiagError::NoSuites)));
        let logs = crate::test_support::take_logs();
        let line = logs
            .iter()
            .find(|l| l.contains("returned by zesDeviceEnumDiagnosticTestSuites"))
            .expect("soft error was not logged");
        assert!(line.starts_with("WARN: ZE_RESULT_ERROR_UNSUPPORTED_FEATURE (0x78000003)"));
        assert!(line.contains("diagnostics.rs:"), "wrong call site in {:?}", line);
    }

    #[test]
    fn test_status_line_is_static() {
        let mut sim = SimulatedSysman::single_gpu(&[("MemoryTest", RAW_NO_ERRORS)]);
        let config = SessionConfig::default();
        let stats = CallStats::new();
        let orchestrator = DiagnosticsOrchestrator::new(&mut sim, &config, &stats).with_spinner(true);

        let line = orchestrator.spinner("MemoryTest").unwrap();
        assert_eq!(line.message(), "Running MemoryTest");
        assert_eq!(line.position(), 0);
        line.finish_and_clear();
        assert!(orchestrator.spinner("MemoryTest").is_some());
        assert!(DiagnosticsOrchestrator::new(&mut SimulatedSysman::new(), &config, &stats)
            .spinner("MemoryTest")
            .is_none());
    }

    #[test]
    fn test_run_with_status_line_completes() {
        let mut sim = SimulatedSysman::single_gpu(&[("MemoryTest", RAW_FAIL_CANT_REPAIR)]);
        let device = first_device(&mut sim);
        let config = SessionConfig::default();
        let stats = CallStats::new();
        let mut out = Vec::new();
        let report = DiagnosticsOrchestrator::new(&mut sim, &config, &stats)
            .with_spinner(true)
            .run(device, DiagnosticRange::default(), &mut out)
            .unwrap();

        assert_eq!(report.outcome, DiagnosticOutcome::FailedUnrepairable);
    }

    #[test]
    fn test_strict_properties_failure_stops_before_run() {
        let mut sim = SimulatedSysman::single_gpu(&[("MemoryTest", RAW_NO_ERRORS)]);
        sim.fail(CallKind::DiagnosticProperties, Status::InsufficientPermissions);
        let config = SessionConfig {
            strict: true,
            ..SessionConfig::default()
        };
        let run = run_with(&mut sim, &config, DiagnosticRange::default());

        assert!(matches!(run.result, Err(DiagError::Subsystem { .. })));
        assert_eq!(run.state, RunState::SuiteSelected);
        assert_eq!(sim.count_of(CallKind::RunDiagnosticTests), 0);
    }
}
