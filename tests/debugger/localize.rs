use crate::ADDER_APP;
use faultline::localize::{FaultLocalizer, LocalizeConfig, Verdict, VectorOutcome};
use serial_test::serial;
use std::fs;

fn run_vectors(vectors_content: &str) -> faultline::localize::LocalizeReport {
    let dir = tempfile::tempdir().unwrap();
    let vectors = dir.path().join("vectors.txt");
    fs::write(&vectors, vectors_content).unwrap();

    // the debugee writes its capture relative to the working directory
    std::env::set_current_dir(dir.path()).unwrap();

    let localizer = FaultLocalizer::new(LocalizeConfig {
        program: ADDER_APP.to_string(),
        vectors,
        capture: dir.path().join("1.txt"),
    });
    localizer.run().unwrap()
}

#[test]
#[serial]
fn test_all_successful_runs_report_nothing() {
    let report = run_vectors("adder 1 2\n3\nadder 2 3\n5\n");

    assert_eq!(report.outcomes.len(), 2);
    for outcome in &report.outcomes {
        assert!(matches!(
            outcome,
            VectorOutcome::Classified {
                verdict: Verdict::Success,
                ..
            }
        ));
    }
    assert!(report.suspicious().is_empty());
}

#[test]
#[serial]
fn test_failing_run_isolates_divergent_lines() {
    // first vector takes the `add` branch and matches the oracle, second
    // takes the `add_offset` branch and misses it
    let report = run_vectors("adder 1 2\n3\nadder 6 2\n8\n");

    assert_eq!(report.outcomes.len(), 2);
    assert!(matches!(
        report.outcomes[0],
        VectorOutcome::Classified {
            verdict: Verdict::Success,
            ..
        }
    ));
    assert!(matches!(
        report.outcomes[1],
        VectorOutcome::Classified {
            verdict: Verdict::Failure,
            ..
        }
    ));

    let suspicious = report.suspicious();
    // the faulty branch body is only covered by the failing run
    assert!(suspicious.contains(&8));
    assert!(suspicious.contains(&18));
    // lines shared by both runs or covered only by the passing run are out
    assert!(!suspicious.contains(&4));
    assert!(!suspicious.contains(&12));
    assert!(!suspicious.contains(&16));
}

#[test]
#[serial]
fn test_crash_classifies_as_failure() {
    let report = run_vectors("adder 9 2\n12\n");

    assert_eq!(report.outcomes.len(), 1);
    assert!(matches!(
        report.outcomes[0],
        VectorOutcome::Classified {
            verdict: Verdict::Failure,
            ..
        }
    ));
}

#[test]
#[serial]
fn test_single_run_coverage() {
    let report = run_vectors("adder 1 2\n3\n");

    let VectorOutcome::Classified { coverage, .. } = &report.outcomes[0] else {
        panic!("classified outcome expected");
    };
    // lines entered once count once
    assert_eq!(coverage.get(&12), Some(&1));
    assert_eq!(coverage.get(&4), Some(&1));
    // the call line is re-entered when add returns into it
    assert!(coverage.contains_key(&16));
    // the untaken branch stays uncovered
    assert!(!coverage.contains_key(&18));
    assert!(coverage.values().all(|&count| count > 0));
}

#[test]
#[serial]
fn test_missing_vectors_file() {
    let dir = tempfile::tempdir().unwrap();
    let localizer = FaultLocalizer::new(LocalizeConfig {
        program: ADDER_APP.to_string(),
        vectors: dir.path().join("absent.txt"),
        capture: dir.path().join("1.txt"),
    });
    assert!(localizer.run().is_err());
}
