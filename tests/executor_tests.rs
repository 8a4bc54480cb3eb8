mod common;

use std::fs;

use pipematrix::expectations::{ExpectedLength, Oracle};
use pipematrix::platform::{LocalPlatform, MemoryPlatform};
use pipematrix::{CaseExecutor, CaseFailure, CaseOutcome, Fields, MatrixError, PlatformCase};

use common::{assembly, data_dir, init_logging, memory_case};

fn executor() -> CaseExecutor {
    CaseExecutor::new("nums.20.txt", std::env::temp_dir().join("pipematrix-test-dot"))
}

#[test]
fn all_unknown_results_yields_twenty_values() {
    init_logging();
    let case = memory_case(
        "default.length=20\nALL_UNKNOWN_RESULTS.tuple=['value']",
        "ALL_UNKNOWN_RESULTS",
        Fields::All,
        Fields::Unknown,
        Fields::Results,
    );

    let expected = case.oracle().tuple.as_ref().map(|t| t.print());
    assert_eq!(expected.as_deref(), Some("['value']"));

    let outcome = executor().execute(&case).unwrap();
    assert_eq!(outcome, CaseOutcome::Verified { records: 20 });
}

#[test]
fn multi_value_tuple_compares_against_the_whole_line() {
    let case = memory_case(
        "default.length=20\n0_UNKNOWN_SWAP.tuple=['1', 'value']",
        "0_UNKNOWN_SWAP",
        Fields::pos(0),
        Fields::Unknown,
        Fields::Swap,
    );
    assert!(matches!(
        executor().execute(&case),
        Ok(CaseOutcome::Verified { records: 20 })
    ));
}

#[test]
fn wrong_length_fails() {
    let case = memory_case(
        "default.length=20\nALL_UNKNOWN_RESULTS.tuple=['value']\nALL_UNKNOWN_RESULTS.length=5",
        "ALL_UNKNOWN_RESULTS",
        Fields::All,
        Fields::Unknown,
        Fields::Results,
    );

    let failure = executor().execute(&case).unwrap_err();
    assert!(matches!(
        failure,
        CaseFailure::LengthMismatch {
            expected: 5,
            actual: 20,
            ..
        }
    ));
    assert_eq!(
        failure.comparison(),
        Some(("5".to_string(), "20".to_string()))
    );
}

#[test]
fn unbounded_length_skips_the_count() {
    let case = memory_case(
        "ALL_UNKNOWN_RESULTS.tuple=['value']\nALL_UNKNOWN_RESULTS.length=-1",
        "ALL_UNKNOWN_RESULTS",
        Fields::All,
        Fields::Unknown,
        Fields::Results,
    );
    assert!(executor().execute(&case).is_ok());
}

#[test]
fn missing_length_fails_when_reached() {
    let case = memory_case(
        "ALL_UNKNOWN_RESULTS.tuple=['value']",
        "ALL_UNKNOWN_RESULTS",
        Fields::All,
        Fields::Unknown,
        Fields::Results,
    );
    assert!(matches!(
        executor().execute(&case),
        Err(CaseFailure::MissingLength { .. })
    ));
}

#[test]
fn missing_length_is_irrelevant_for_error_cases() {
    let case = memory_case(
        "0_ARGS_ALL.ERROR=",
        "0_ARGS_ALL",
        Fields::pos(0),
        Fields::Args,
        Fields::All,
    );
    assert!(matches!(
        executor().execute(&case),
        Ok(CaseOutcome::ExpectedError { .. })
    ));
}

#[test]
fn wrong_value_fails_with_both_renderings() {
    let case = memory_case(
        "default.length=20\nALL_UNKNOWN_RESULTS.tuple=['other']",
        "ALL_UNKNOWN_RESULTS",
        Fields::All,
        Fields::Unknown,
        Fields::Results,
    );

    match executor().execute(&case) {
        Err(CaseFailure::ValueMismatch {
            case,
            expected,
            actual,
        }) => {
            assert_eq!(case, "ALL_UNKNOWN_RESULTS[memory]");
            assert_eq!(expected, "other");
            assert_eq!(actual, "value");
        }
        other => panic!("expected a value mismatch, got {:?}", other),
    }
}

#[test]
fn asserted_error_that_does_not_occur_fails() {
    let case = memory_case(
        "default.length=20\nALL_UNKNOWN_RESULTS.ERROR=\nALL_UNKNOWN_RESULTS.tuple=['value']",
        "ALL_UNKNOWN_RESULTS",
        Fields::All,
        Fields::Unknown,
        Fields::Results,
    );
    let failure = executor().execute(&case).unwrap_err();
    assert!(matches!(failure, CaseFailure::ExpectedErrorMissing { .. }));
    assert!(failure.to_string().contains("did not throw asserted error"));
}

#[test]
fn unasserted_error_is_resurfaced() {
    let case = memory_case(
        "default.length=20\n0_ARGS_ALL.tuple=['value']",
        "0_ARGS_ALL",
        Fields::pos(0),
        Fields::Args,
        Fields::All,
    );
    match executor().execute(&case) {
        Err(CaseFailure::UnexpectedError { source, .. }) => {
            assert!(matches!(source, MatrixError::AmbiguousField { .. }));
            assert!(source.is_planner_error());
        }
        other => panic!("expected the planner error, got {:?}", other),
    }
}

#[test]
fn success_without_a_tuple_is_not_a_pass() {
    let oracle = Oracle {
        key: "ALL_UNKNOWN_RESULTS".to_string(),
        tuple: None,
        length: ExpectedLength::Exact(20),
        expect_error: false,
        write_dot: false,
    };
    let case = PlatformCase::new(
        "ALL_UNKNOWN_RESULTS",
        assembly(Fields::All, Fields::Unknown, Fields::Results),
        oracle,
        Box::new(MemoryPlatform::new()),
    );
    assert!(matches!(
        executor().execute(&case),
        Err(CaseFailure::NoAssertion { result, .. }) if result == "value"
    ));
}

#[test]
fn empty_sink_has_no_first_record() {
    let oracle = Oracle {
        key: "ALL_UNKNOWN_RESULTS".to_string(),
        tuple: None,
        length: ExpectedLength::Exact(0),
        expect_error: false,
        write_dot: false,
    };
    let platform = MemoryPlatform::default().with_dataset("empty.txt", Vec::new());
    let case = PlatformCase::new(
        "ALL_UNKNOWN_RESULTS",
        assembly(Fields::All, Fields::Unknown, Fields::Results),
        oracle,
        Box::new(platform),
    );

    let executor = CaseExecutor::new("empty.txt", std::env::temp_dir());
    assert!(matches!(
        executor.execute(&case),
        Err(CaseFailure::EmptySink { .. })
    ));
}

#[test]
fn unknown_dataset_is_a_setup_failure() {
    let case = memory_case(
        "0_ARGS_ALL.ERROR=",
        "0_ARGS_ALL",
        Fields::pos(0),
        Fields::Args,
        Fields::All,
    );
    let executor = CaseExecutor::new("missing.txt", std::env::temp_dir());
    // not classified against .ERROR
    assert!(matches!(
        executor.execute(&case),
        Err(CaseFailure::Setup {
            source: MatrixError::UnknownDataset { .. },
            ..
        })
    ));
}

#[test]
fn writedot_dumps_the_planned_flow() {
    init_logging();
    let dot_dir = tempfile::tempdir().unwrap();
    let case = memory_case(
        "default.length=20\nALL_UNKNOWN_RESULTS.tuple=['value']\nALL_UNKNOWN_RESULTS.writedot=",
        "ALL_UNKNOWN_RESULTS",
        Fields::All,
        Fields::Unknown,
        Fields::Results,
    );
    let executor = CaseExecutor::new("nums.20.txt", dot_dir.path());

    assert!(executor.execute(&case).is_ok());
    let path = dot_dir.path().join("ALL_UNKNOWN_RESULTS[memory].dot");
    assert_eq!(executor.dot_path(&case), path);
    let dot = fs::read_to_string(path).unwrap();
    assert!(dot.starts_with("digraph"));
}

#[test]
fn unwritable_dot_only_warns() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "occupied").unwrap();

    let case = memory_case(
        "default.length=20\nALL_UNKNOWN_RESULTS.tuple=['value']\nALL_UNKNOWN_RESULTS.writedot=",
        "ALL_UNKNOWN_RESULTS",
        Fields::All,
        Fields::Unknown,
        Fields::Results,
    );
    let executor = CaseExecutor::new("nums.20.txt", &blocker);
    assert!(matches!(
        executor.execute(&case),
        Ok(CaseOutcome::Verified { records: 20 })
    ));
}

#[test]
fn local_platform_writes_a_replaced_sink_per_case() {
    let out = tempfile::tempdir().unwrap();
    let oracle = Oracle::resolve(
        &common::store("default.length=20\nALL_UNKNOWN_ALL.tuple=[0, '1', 'value']"),
        "ALL_UNKNOWN_ALL",
    )
    .unwrap();
    let case = PlatformCase::new(
        "ALL_UNKNOWN_ALL",
        assembly(Fields::All, Fields::Unknown, Fields::All),
        oracle,
        Box::new(LocalPlatform::new(data_dir(), out.path())),
    );

    assert_eq!(CaseExecutor::output_path(&case), "local/ALL_UNKNOWN_ALL");

    // a stale sink from an earlier run is replaced, not appended to
    let sink = out.path().join("local/ALL_UNKNOWN_ALL");
    fs::create_dir_all(sink.parent().unwrap()).unwrap();
    fs::write(&sink, "stale\nstale\n").unwrap();

    assert!(matches!(
        executor().execute(&case),
        Ok(CaseOutcome::Verified { records: 20 })
    ));
    let written = fs::read_to_string(&sink).unwrap();
    assert_eq!(written.lines().count(), 20);
    assert_eq!(written.lines().next(), Some("0\t1\tvalue"));
}

fn five_row_case(table: &str) -> PlatformCase {
    let lines: Vec<String> = (1..=5).map(|n| n.to_string()).collect();
    let platform = MemoryPlatform::default().with_dataset("nums.5.txt", lines);
    let oracle = Oracle::resolve(&common::store(table), "ALL_UNKNOWN_RESULTS").unwrap();
    PlatformCase::new(
        "ALL_UNKNOWN_RESULTS",
        assembly(Fields::All, Fields::Unknown, Fields::Results),
        oracle,
        Box::new(platform),
    )
}

#[test]
fn exact_length_and_matching_value_pass() {
    let case = five_row_case("ALL_UNKNOWN_RESULTS.tuple=['value']\nALL_UNKNOWN_RESULTS.length=5");
    let executor = CaseExecutor::new("nums.5.txt", std::env::temp_dir());
    assert_eq!(
        executor.execute(&case).unwrap(),
        CaseOutcome::Verified { records: 5 }
    );
}

#[test]
fn exact_length_with_wrong_value_reports_both() {
    let case = five_row_case("ALL_UNKNOWN_RESULTS.tuple=['other']\nALL_UNKNOWN_RESULTS.length=5");
    let executor = CaseExecutor::new("nums.5.txt", std::env::temp_dir());
    let failure = executor.execute(&case).unwrap_err();
    assert!(matches!(failure, CaseFailure::ValueMismatch { .. }));
    assert_eq!(
        failure.comparison(),
        Some(("other".to_string(), "value".to_string()))
    );
}
