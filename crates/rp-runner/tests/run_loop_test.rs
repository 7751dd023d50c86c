mod common;

use common::*;
use crossbeam_channel::unbounded;
use rp_runner::{
    artifact_file_name, load_artifact, summary_file_name, verify_sequence, JsonFileSink,
    RunEndState, RunEvent, Runner,
};
use rp_types::TrialStage;
use std::fs;

#[test]
fn always_succeeding_writes_exactly_target_artifacts() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), 4);
    let optimizer = ScriptedOptimizer::always_succeeding();

    let summary = Runner::new(&config, &ConstantSource, &optimizer, &JsonFileSink::new())
        .run()
        .unwrap();

    assert_eq!(summary.successes, 4);
    assert_eq!(summary.failures, 0);
    assert_eq!(summary.state, RunEndState::Completed);
    assert!(summary.target_reached());
    assert_eq!(optimizer.calls(), 4);
    assert_eq!(indices_on_disk(&config), vec![1, 2, 3, 4]);
    assert_eq!(
        summary.artifacts,
        (1..=4)
            .map(|i| artifact_file_name("fake_R2_T5", i))
            .collect::<Vec<_>>()
    );
}

#[test]
fn always_failing_stops_at_budget_with_no_artifacts() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), 5);

    let summary = Runner::new(&config, &ConstantSource, &BrokenOptimizer, &JsonFileSink::new())
        .run()
        .unwrap();

    assert_eq!(summary.successes, 0);
    assert_eq!(summary.failures, 5);
    assert_eq!(summary.attempts, 5);
    assert_eq!(summary.state, RunEndState::BudgetExhausted);
    assert!(indices_on_disk(&config).is_empty());

    // Only the summary is left behind.
    let names: Vec<String> = fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![summary_file_name("fake_R2_T5")]);
}

#[test]
fn failed_attempts_do_not_consume_indices() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), 3).with_seed(10);
    let optimizer = ScriptedOptimizer::failing_on([2, 4]);

    let summary = Runner::new(&config, &ConstantSource, &optimizer, &JsonFileSink::new())
        .run()
        .unwrap();

    assert_eq!(summary.successes, 3);
    assert_eq!(summary.failures, 2);
    assert_eq!(indices_on_disk(&config), vec![1, 2, 3]);

    // Artifacts 1..3 come from attempts 1, 3 and 5 (seeds 10, 12, 14).
    let seeds: Vec<u64> = (1..=3)
        .map(|i| {
            let path = tmp.path().join(artifact_file_name(&config.naming_prefix(), i));
            load_artifact(&path).unwrap().generated_data.seed.unwrap()
        })
        .collect();
    assert_eq!(seeds, vec![10, 12, 14]);
}

#[test]
fn loop_stops_as_soon_as_target_is_met() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), 3);
    // The failure scheduled for call 5 is never reached.
    let optimizer = ScriptedOptimizer::failing_on([2, 5]);

    let summary = Runner::new(&config, &ConstantSource, &optimizer, &JsonFileSink::new())
        .run()
        .unwrap();

    assert_eq!(summary.successes, 3);
    assert_eq!(summary.failures, 1);
    assert_eq!(optimizer.calls(), 4);
    assert_eq!(indices_on_disk(&config), vec![1, 2, 3]);
}

#[test]
fn persistence_failure_counts_and_reuses_index() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), 3);
    let optimizer = ScriptedOptimizer::always_succeeding();
    let (tx, rx) = unbounded();

    let summary = Runner::new(&config, &ConstantSource, &optimizer, &FlakySink::failing_on([2]))
        .with_events(tx)
        .run()
        .unwrap();

    assert_eq!(summary.successes, 3);
    assert_eq!(summary.failures, 1);
    assert_eq!(indices_on_disk(&config), vec![1, 2, 3]);

    let failed: Vec<RunEvent> = rx
        .try_iter()
        .filter(|e| matches!(e, RunEvent::TrialFailed { .. }))
        .collect();
    assert_eq!(failed.len(), 1);
    let RunEvent::TrialFailed {
        attempt,
        stage,
        description,
        ..
    } = &failed[0]
    else {
        unreachable!()
    };
    assert_eq!(*attempt, 2);
    assert_eq!(*stage, TrialStage::Persistence);
    assert!(description.contains("disk full"));
}

#[test]
fn existing_artifact_is_never_overwritten() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), 2);
    let stale = tmp.path().join(artifact_file_name(&config.naming_prefix(), 1));
    fs::write(&stale, b"previous run").unwrap();

    let summary = Runner::new(
        &config,
        &ConstantSource,
        &ScriptedOptimizer::always_succeeding(),
        &JsonFileSink::new(),
    )
    .run()
    .unwrap();

    assert_eq!(summary.successes, 0);
    assert_eq!(summary.failures, 2);
    assert_eq!(fs::read(&stale).unwrap(), b"previous run");
}

#[test]
fn events_trace_the_whole_run() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), 2);
    let optimizer = ScriptedOptimizer::failing_on([1]);
    let sink = JsonFileSink::new();
    let (tx, rx) = unbounded();

    let runner = Runner::new(&config, &ConstantSource, &optimizer, &sink)
        .with_events(tx)
        .without_summary_file();
    let summary = runner.run().unwrap();
    drop(runner);

    let events: Vec<RunEvent> = rx.iter().collect();
    assert_eq!(events.len(), 5);
    assert!(matches!(events[0], RunEvent::Started { target_successes: 2, .. }));
    assert!(matches!(
        events[1],
        RunEvent::TrialFailed {
            attempt: 1,
            successes: 0,
            failures: 1,
            ..
        }
    ));
    let indices: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::TrialSucceeded { success_index, .. } => Some(*success_index),
            _ => None,
        })
        .collect();
    assert_eq!(indices, vec![1, 2]);
    match &events[4] {
        RunEvent::Finished { summary: s, .. } => assert_eq!(s, &summary),
        other => panic!("expected Finished, got {other:?}"),
    }
    assert!(events.windows(2).all(|w| w[0].at() <= w[1].at()));
    assert!(!tmp.path().join(summary_file_name(&summary.prefix)).exists());
}

#[test]
fn summary_file_is_written() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), 1);
    let summary = Runner::new(
        &config,
        &ConstantSource,
        &ScriptedOptimizer::always_succeeding(),
        &JsonFileSink::new(),
    )
    .run()
    .unwrap();

    let path = tmp.path().join(summary_file_name(&summary.prefix));
    let back: rp_runner::RunSummary =
        serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
    assert_eq!(back, summary);
}

#[test]
fn rerun_into_same_directory_keeps_first_summary() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), 2);

    let first = Runner::new(
        &config,
        &ConstantSource,
        &ScriptedOptimizer::always_succeeding(),
        &JsonFileSink::new(),
    )
    .run()
    .unwrap();
    let second = Runner::new(
        &config,
        &ConstantSource,
        &ScriptedOptimizer::always_succeeding(),
        &JsonFileSink::new(),
    )
    .run()
    .unwrap();

    assert_eq!(first.state, RunEndState::Completed);
    assert_eq!(second.state, RunEndState::BudgetExhausted);
    assert_eq!(second.successes, 0);

    let path = tmp.path().join(summary_file_name(&first.prefix));
    let on_disk: rp_runner::RunSummary =
        serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
    assert_eq!(on_disk.run_id, first.run_id);
    assert_eq!(on_disk, first);
    assert_eq!(indices_on_disk(&config), vec![1, 2]);
}

#[test]
fn naming_is_independent_of_which_attempts_failed() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let config_a = config(a.path(), 3);
    let config_b = config(b.path(), 3);

    let run_a = Runner::new(
        &config_a,
        &ConstantSource,
        &ScriptedOptimizer::always_succeeding(),
        &JsonFileSink::new(),
    )
    .run()
    .unwrap();
    let run_b = Runner::new(
        &config_b,
        &ConstantSource,
        &ScriptedOptimizer::failing_on([1, 3]),
        &JsonFileSink::new(),
    )
    .run()
    .unwrap();

    assert_eq!(run_a.artifacts, run_b.artifacts);
    assert!(verify_sequence(&indices_on_disk(&config_b)).is_ok());
}

#[test]
fn salt_separates_runs_in_one_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let first = config(tmp.path(), 2).with_naming_salt("a");
    let second = config(tmp.path(), 2).with_naming_salt("b");
    let optimizer = ScriptedOptimizer::always_succeeding();

    for c in [&first, &second] {
        let summary = Runner::new(c, &ConstantSource, &optimizer, &JsonFileSink::new())
            .run()
            .unwrap();
        assert_eq!(summary.failures, 0);
    }
    assert_eq!(indices_on_disk(&first), vec![1, 2]);
    assert_eq!(indices_on_disk(&second), vec![1, 2]);
}

#[test]
fn configuration_errors_abort_before_any_trial() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("file");
    fs::write(&blocker, b"").unwrap();
    let config = config(&blocker, 3);
    let optimizer = ScriptedOptimizer::always_succeeding();

    let err = Runner::new(&config, &ConstantSource, &optimizer, &JsonFileSink::new())
        .run()
        .unwrap_err();

    assert!(!err.is_recoverable());
    assert_eq!(optimizer.calls(), 0);
}

#[test]
fn records_carry_optimizer_output_and_timing() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), 1);
    Runner::new(
        &config,
        &ConstantSource,
        &ScriptedOptimizer::always_succeeding(),
        &JsonFileSink::new(),
    )
    .run()
    .unwrap();

    let record = load_artifact(&tmp.path().join(artifact_file_name("fake_R2_T5", 1))).unwrap();
    assert_eq!(record.optimization_output["parallelism"], 3);
    assert!(record.elapsed_seconds >= 0.0);
    assert!(record.generated_data.check_shape(2, 5).is_ok());
}
