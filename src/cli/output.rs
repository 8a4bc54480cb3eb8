//! Handles all user-facing output for the CLI.
//!
//! Human output is colorized when stdout is a terminal. Every printer has a JSON twin so
//! that CI hosts can consume results without scraping text.

use std::io::Write;

use difference::{Changeset, Difference};
use miette::GraphicalReportHandler;
use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::errors::{MatrixError, MatrixResult};
use crate::executor::CaseOutcome;
use crate::expectations::CheckReport;
use crate::runner::{CaseReport, SuiteRun, SuiteSummary};

// ============================================================================
// JSON SHAPES
// ============================================================================

#[derive(Debug, Serialize)]
struct RunJson<'a> {
    summary: SuiteSummary,
    cases: Vec<CaseJson<'a>>,
}

#[derive(Debug, Serialize)]
struct CaseJson<'a> {
    name: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> From<&'a CaseReport> for CaseJson<'a> {
    fn from(report: &'a CaseReport) -> Self {
        let (status, records, error) = match &report.result {
            Ok(CaseOutcome::Verified { records }) => ("passed", Some(*records), None),
            Ok(CaseOutcome::ExpectedError { error }) => ("expected-error", None, Some(error.clone())),
            Err(failure) => ("failed", None, Some(failure.to_string())),
        };
        CaseJson {
            name: &report.display_name,
            status,
            records,
            error,
        }
    }
}

/// One row of `list` output.
#[derive(Debug, Clone, Serialize)]
pub struct ListedCase {
    pub name: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
struct ListJson<'a> {
    axes: &'a str,
    fingerprint: &'a str,
    cases: &'a [ListedCase],
}

#[derive(Debug, Serialize)]
struct CheckJson<'a> {
    resource: &'a str,
    clean: bool,
    malformed: Vec<String>,
    orphans: &'a [String],
    undefined: &'a [String],
}

// ============================================================================
// RUN
// ============================================================================

pub fn print_run(run: &SuiteRun) {
    let mut stdout = StandardStream::stdout(color_choice());

    for report in &run.reports {
        match &report.result {
            Ok(CaseOutcome::Verified { records }) => {
                mark(&mut stdout, Color::Green, "✓");
                let _ = writeln!(stdout, " {} ({} records)", report.display_name, records);
            }
            Ok(CaseOutcome::ExpectedError { .. }) => {
                mark(&mut stdout, Color::Green, "✓");
                let _ = writeln!(stdout, " {} (expected error)", report.display_name);
            }
            Err(_) => {
                mark(&mut stdout, Color::Red, "✗");
                let _ = writeln!(stdout, " {}", report.display_name);
            }
        }
    }

    for report in run.failures() {
        if let Err(failure) = &report.result {
            if let Some((expected, actual)) = failure.comparison() {
                let changeset = Changeset::new(&expected, &actual, "\t");
                print_diff(&mut stdout, &changeset.diffs);
            }
            let mut rendered = String::new();
            if GraphicalReportHandler::new()
                .render_report(&mut rendered, failure)
                .is_ok()
            {
                eprintln!("{rendered}\n----------------\n");
            }
        }
    }

    print_summary(&mut stdout, &run.summary());
}

pub fn print_run_json(run: &SuiteRun) -> MatrixResult<()> {
    let body = RunJson {
        summary: run.summary(),
        cases: run.reports.iter().map(CaseJson::from).collect(),
    };
    print_json(&body)
}

fn print_summary(stdout: &mut StandardStream, summary: &SuiteSummary) {
    let _ = stdout.set_color(ColorSpec::new().set_bold(true));
    let _ = writeln!(stdout, "\nSuite Summary");
    let _ = writeln!(stdout, "═════════════");
    let _ = stdout.reset();

    if summary.passed > 0 {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
        let _ = writeln!(
            stdout,
            "✓ Passed:  {} cases ({} expected errors)",
            summary.passed, summary.expected_errors
        );
    }
    if summary.failed > 0 {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
        let _ = writeln!(stdout, "✗ Failed:  {} cases", summary.failed);
    }
    let _ = stdout.reset();
    if summary.filtered > 0 {
        let _ = writeln!(stdout, "- Filtered: {} cases", summary.filtered);
    }

    let _ = stdout.set_color(ColorSpec::new().set_bold(true));
    let _ = writeln!(
        stdout,
        "\nSuccess Rate: {:.1}% ({}/{})",
        summary.success_rate(),
        summary.passed,
        summary.total
    );
    let _ = stdout.reset();
}

// ============================================================================
// LIST / CHECK
// ============================================================================

pub fn print_listing(cases: &[ListedCase], fingerprint: &str) {
    let mut stdout = StandardStream::stdout(color_choice());
    for case in cases {
        let color = match case.status {
            "defined" => Color::Green,
            "expect-error" => Color::Yellow,
            _ => Color::White,
        };
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)));
        let _ = write!(stdout, "{:<13}", case.status);
        let _ = stdout.reset();
        let _ = writeln!(stdout, "{}", case.name);
    }
    let _ = writeln!(stdout, "\n{} cases, fingerprint {}", cases.len(), fingerprint);
}

pub fn print_listing_json(axes: &str, cases: &[ListedCase], fingerprint: &str) -> MatrixResult<()> {
    print_json(&ListJson {
        axes,
        fingerprint,
        cases,
    })
}

pub fn print_check(resource: &str, report: &CheckReport) {
    let mut stdout = StandardStream::stdout(color_choice());

    for error in &report.malformed {
        mark(&mut stdout, Color::Red, "✗");
        let _ = writeln!(stdout, " {}", error);
    }
    for orphan in &report.orphans {
        mark(&mut stdout, Color::Red, "✗");
        let _ = writeln!(stdout, " orphan: '{}' matches no generated case", orphan);
    }
    for name in &report.undefined {
        mark(&mut stdout, Color::Yellow, "?");
        let _ = writeln!(stdout, " undefined: {}", name);
    }

    if report.is_clean() {
        mark(&mut stdout, Color::Green, "✓");
        let _ = writeln!(stdout, " {} is consistent", resource);
    }
}

pub fn print_check_json(resource: &str, report: &CheckReport) -> MatrixResult<()> {
    print_json(&CheckJson {
        resource,
        clean: report.is_clean(),
        malformed: report.malformed.iter().map(ToString::to_string).collect(),
        orphans: &report.orphans,
        undefined: &report.undefined,
    })
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn color_choice() -> ColorChoice {
    if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

fn mark(stdout: &mut StandardStream, color: Color, symbol: &str) {
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = write!(stdout, "{}", symbol);
    let _ = stdout.reset();
}

fn print_json<T: Serialize>(body: &T) -> MatrixResult<()> {
    let text = serde_json::to_string_pretty(body)
        .map_err(|e| MatrixError::config(format!("could not encode JSON output: {}", e)))?;
    println!("{}", text);
    Ok(())
}

fn print_diff(stdout: &mut StandardStream, diffs: &[Difference]) {
    for diff in diffs {
        match diff {
            Difference::Same(ref x) => {
                let _ = stdout.reset();
                let _ = writeln!(stdout, " {}", x);
            }
            Difference::Add(ref x) => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
                let _ = writeln!(stdout, "+{}", x);
            }
            Difference::Rem(ref x) => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
                let _ = writeln!(stdout, "-{}", x);
            }
        }
    }
    let _ = stdout.reset();
}
