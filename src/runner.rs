//! Runs an assembled [`TestSuite`] and collects one report per case.
//!
//! Cases are independent: each owns its platform instance and writes to its own sink path, so
//! they may run on several threads. Reports always come back in suite order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::executor::{CaseExecutor, CaseFailure, CaseOutcome};
use crate::suite::{PlatformCase, TestSuite};

/// The result of one executed case.
#[derive(Debug)]
pub struct CaseReport {
    pub display_name: String,
    pub result: Result<CaseOutcome, CaseFailure>,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything a suite run produced.
#[derive(Debug, Default)]
pub struct SuiteRun {
    pub reports: Vec<CaseReport>,
    /// Cases excluded by the name filter.
    pub filtered: usize,
}

impl SuiteRun {
    pub fn summary(&self) -> SuiteSummary {
        let passed = self.reports.iter().filter(|r| r.passed()).count();
        let expected_errors = self
            .reports
            .iter()
            .filter(|r| matches!(r.result, Ok(CaseOutcome::ExpectedError { .. })))
            .count();
        SuiteSummary {
            total: self.reports.len(),
            passed,
            failed: self.reports.len() - passed,
            expected_errors,
            filtered: self.filtered,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.reports.iter().filter(|r| !r.passed())
    }

    pub fn is_success(&self) -> bool {
        self.reports.iter().all(CaseReport::passed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub expected_errors: usize,
    pub filtered: usize,
}

impl SuiteSummary {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.passed as f64 / self.total as f64) * 100.0
    }
}

// ============================================================================
// RUNNER
// ============================================================================

pub struct SuiteRunner {
    executor: CaseExecutor,
    jobs: usize,
    filter: Option<Regex>,
}

impl SuiteRunner {
    pub fn new(executor: CaseExecutor) -> Self {
        Self {
            executor,
            jobs: 1,
            filter: None,
        }
    }

    /// Worker threads; zero is treated as one.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Only run cases whose display name matches `filter`.
    pub fn with_filter(mut self, filter: Option<Regex>) -> Self {
        self.filter = filter;
        self
    }

    pub fn run(&self, suite: &TestSuite) -> SuiteRun {
        let selected: Vec<&PlatformCase> = suite
            .cases()
            .iter()
            .filter(|case| self.is_selected(case))
            .collect();
        let filtered = suite.len() - selected.len();

        info!(
            suite = suite.name(),
            cases = selected.len(),
            filtered,
            jobs = self.jobs,
            "running suite"
        );

        let reports = if self.jobs == 1 || selected.len() < 2 {
            selected.iter().map(|case| self.run_case(case)).collect()
        } else {
            self.run_parallel(&selected)
        };

        SuiteRun { reports, filtered }
    }

    fn is_selected(&self, case: &PlatformCase) -> bool {
        self.filter
            .as_ref()
            .map_or(true, |filter| filter.is_match(case.display_name()))
    }

    fn run_case(&self, case: &PlatformCase) -> CaseReport {
        let result = self.executor.execute(case);
        debug!(case = case.display_name(), passed = result.is_ok(), "case finished");
        CaseReport {
            display_name: case.display_name().to_string(),
            result,
        }
    }

    fn run_parallel(&self, cases: &[&PlatformCase]) -> Vec<CaseReport> {
        let next = AtomicUsize::new(0);
        let slots: Vec<Mutex<Option<CaseReport>>> = cases.iter().map(|_| Mutex::new(None)).collect();
        let workers = self.jobs.min(cases.len());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(case) = cases.get(index) else {
                        break;
                    };
                    let report = self.run_case(case);
                    let mut slot = slots[index].lock().unwrap_or_else(|e| e.into_inner());
                    *slot = Some(report);
                });
            }
        });

        slots
            .into_iter()
            .filter_map(|slot| slot.into_inner().unwrap_or_else(|e| e.into_inner()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_and_rate() {
        let run = SuiteRun {
            reports: vec![
                CaseReport {
                    display_name: "a[memory]".to_string(),
                    result: Ok(CaseOutcome::Verified { records: 20 }),
                },
                CaseReport {
                    display_name: "b[memory]".to_string(),
                    result: Ok(CaseOutcome::ExpectedError {
                        error: "boom".to_string(),
                    }),
                },
                CaseReport {
                    display_name: "c[memory]".to_string(),
                    result: Err(CaseFailure::ExpectedErrorMissing {
                        case: "c[memory]".to_string(),
                    }),
                },
            ],
            filtered: 2,
        };

        let summary = run.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.expected_errors, 1);
        assert_eq!(summary.filtered, 2);
        assert!(!run.is_success());
        assert_eq!(run.failures().count(), 1);
        assert!((summary.success_rate() - 66.666).abs() < 0.01);
    }

    #[test]
    fn empty_run_is_successful() {
        let run = SuiteRun::default();
        assert!(run.is_success());
        assert_eq!(run.summary().success_rate(), 0.0);
    }
}
