// tests/pipe_chain.rs
#![cfg(unix)]

mod common;

use std::fs;

use procbuild::errors::ExecError;
use procbuild::{Cmd, ProcPool, RunOptions, StageOptions, cmd};
use tempfile::tempdir;

use common::{executor, read};

#[test]
fn three_stage_pipeline_counts_matching_lines() {
    let exec = executor(None);
    let mut chain = exec.pipe();
    chain.begin(RunOptions::default()).unwrap();

    let mut c = cmd!["printf", r"A\nB\nC\n"];
    chain.add_stage(&mut c, StageOptions::default()).unwrap();
    assert!(c.is_empty());
    c.append(["grep", "B"]);
    chain.add_stage(&mut c, StageOptions::default()).unwrap();
    c.append(["wc", "-l"]);
    chain.add_stage(&mut c, StageOptions::default()).unwrap();

    // Two stages started, the last one pending.
    assert_eq!(chain.started(), 2);
    assert!(chain.has_pending());

    let cap = chain.end_capture().unwrap();
    assert!(cap.success());
    assert_eq!(cap.stdout_lossy().trim(), "1");
    assert_eq!(chain.started(), 0);
}

#[test]
fn pipeline_output_to_file() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("b.txt");
    let exec = executor(None);
    let mut chain = exec.pipe();
    chain.begin(RunOptions::default()).unwrap();

    let mut c = cmd!["printf", r"A\nB\nC\n"];
    chain.add_stage(&mut c, StageOptions::default()).unwrap();
    c.append(["grep", "B"]);
    chain.add_stage(&mut c, StageOptions::default()).unwrap();
    c.append(["cat"]);
    chain.add_stage(&mut c, StageOptions::default()).unwrap();
    chain.end(RunOptions::new().stdout(&out)).unwrap();

    assert_eq!(read(&out), "B\n");
}

#[test]
fn stdin_file_feeds_first_stage() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("words.txt");
    let out = dir.path().join("sorted.txt");
    fs::write(&input, "pear\napple\nfig\n").unwrap();

    let exec = executor(None);
    let mut chain = exec.pipe();
    chain.begin(RunOptions::new().stdin(&input)).unwrap();
    let mut c = cmd!["sort"];
    chain.add_stage(&mut c, StageOptions::default()).unwrap();
    c.append(["head", "-n", "2"]);
    chain.add_stage(&mut c, StageOptions::default()).unwrap();
    chain.end(RunOptions::new().stdout(&out)).unwrap();

    assert_eq!(read(&out), "apple\nfig\n");
}

#[test]
fn merged_stderr_flows_into_next_stage() {
    let exec = executor(None);
    let mut chain = exec.pipe();
    chain.begin(RunOptions::default()).unwrap();

    let mut c = cmd!["sh", "-c", "echo out; echo err >&2"];
    chain.add_stage(&mut c, StageOptions::merged()).unwrap();
    c.append(["sort"]);
    chain.add_stage(&mut c, StageOptions::default()).unwrap();

    let cap = chain.end_capture().unwrap();
    assert_eq!(cap.stdout_lossy(), "err\nout\n");
}

#[test]
fn merged_final_stage_shares_stdout_file() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("both.txt");
    let exec = executor(None);
    let mut chain = exec.pipe();
    chain.begin(RunOptions::default()).unwrap();

    let mut c = cmd!["sh", "-c", "echo one; echo two >&2"];
    chain.add_stage(&mut c, StageOptions::merged()).unwrap();
    chain.end(RunOptions::new().stdout(&out)).unwrap();

    let text = read(&out);
    assert!(text.contains("one\n"), "got {text:?}");
    assert!(text.contains("two\n"), "got {text:?}");
}

#[test]
fn single_stage_chain_runs_like_a_plain_command() {
    let exec = executor(None);
    let mut chain = exec.pipe();
    chain.begin(RunOptions::default()).unwrap();
    let mut c = cmd!["echo", "solo"];
    chain.add_stage(&mut c, StageOptions::default()).unwrap();
    assert_eq!(chain.started(), 0);

    let cap = chain.end_capture().unwrap();
    assert_eq!(cap.stdout, b"solo\n");
}

#[test]
fn failing_intermediate_stage_fails_the_chain() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let exec = executor(None);
    let mut chain = exec.pipe();
    chain.begin(RunOptions::default()).unwrap();

    let mut c = cmd!["sh", "-c", "echo x; exit 5"];
    chain.add_stage(&mut c, StageOptions::default()).unwrap();
    c.append(["cat"]);
    chain.add_stage(&mut c, StageOptions::default()).unwrap();

    match chain.end(RunOptions::new().stdout(&out)) {
        Err(ExecError::Batch { failed, total }) => {
            assert_eq!(failed, 1);
            assert_eq!(total, 2);
        }
        other => panic!("expected Batch error, got {other:?}"),
    }
    // The final stage still ran and saw the first stage's output.
    assert_eq!(read(&out), "x\n");
}

#[test]
fn async_end_tracks_final_stage_in_pool() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("async.txt");
    let exec = executor(None);
    let mut pool = ProcPool::new();

    let mut chain = exec.pipe();
    chain.begin(RunOptions::default()).unwrap();
    let mut c = cmd!["printf", r"z\ny\n"];
    chain.add_stage(&mut c, StageOptions::default()).unwrap();
    c.append(["sort"]);
    chain.add_stage(&mut c, StageOptions::default()).unwrap();
    chain
        .end(RunOptions::new().pool(&mut pool).stdout(&out))
        .unwrap();

    assert_eq!(pool.len(), 1);
    assert_eq!(chain.started(), 0);
    pool.flush().unwrap();
    assert_eq!(read(&out), "y\nz\n");
}

#[test]
fn async_end_flushes_a_full_pool() {
    let exec = executor(Some(1));
    let mut pool = ProcPool::new();
    let mut c = Cmd::new();

    for _ in 0..3 {
        let mut chain = exec.pipe();
        chain.begin(RunOptions::default()).unwrap();
        c.append(["true"]);
        chain.add_stage(&mut c, StageOptions::default()).unwrap();
        chain.end(RunOptions::new().pool(&mut pool)).unwrap();
        assert_eq!(pool.len(), 1);
    }
    assert_eq!(pool.flush_count(), 2);
    pool.flush().unwrap();
}

#[test]
fn ending_an_empty_chain_is_a_no_op() {
    let exec = executor(None);
    let mut pool = ProcPool::new();
    let mut chain = exec.pipe();
    chain.begin(RunOptions::default()).unwrap();
    chain.end(RunOptions::default()).unwrap();
    chain.end(RunOptions::new().pool(&mut pool)).unwrap();
    assert!(pool.is_empty());
}

#[test]
fn capturing_an_empty_chain_is_an_error() {
    let exec = executor(None);
    let mut chain = exec.pipe();
    let err = chain.end_capture().unwrap_err();
    assert!(matches!(err, ExecError::EmptyPipeline));
}

#[test]
fn empty_stage_is_rejected_and_chain_can_be_aborted() {
    let exec = executor(None);
    let mut chain = exec.pipe();
    chain.begin(RunOptions::default()).unwrap();

    let mut c = cmd!["echo", "first"];
    chain.add_stage(&mut c, StageOptions::default()).unwrap();
    c.append(["cat"]);
    chain.add_stage(&mut c, StageOptions::default()).unwrap();

    let mut empty = Cmd::new();
    let err = chain
        .add_stage(&mut empty, StageOptions::default())
        .unwrap_err();
    assert!(matches!(err, ExecError::EmptyCommand));

    // The started `echo` may die of SIGPIPE once the read end is closed,
    // so only the chain state is checked.
    chain.abort();
    assert_eq!(chain.started(), 0);
    assert!(!chain.has_pending());
}

#[test]
fn keep_option_preserves_stage_command() {
    let exec = executor(None);
    let mut chain = exec.pipe();
    chain.begin(RunOptions::default()).unwrap();

    let mut c = cmd!["echo", "again"];
    let keep = StageOptions {
        merge_stderr: false,
        keep: true,
    };
    chain.add_stage(&mut c, keep).unwrap();
    assert_eq!(c.args(), ["echo", "again"]);
    chain.abort();
}

#[test]
fn missing_stdin_file_fails_begin() {
    let dir = tempdir().unwrap();
    let exec = executor(None);
    let mut chain = exec.pipe();
    let err = chain
        .begin(RunOptions::new().stdin(dir.path().join("missing")))
        .unwrap_err();
    assert!(matches!(err, ExecError::Redirect { .. }));
}

#[test]
fn failed_middle_stage_still_fails_end() {
    let exec = executor(None);
    let mut chain = exec.pipe();
    chain.begin(RunOptions::default()).unwrap();

    let mut c = cmd!["sh", "-c", "exit 7"];
    chain.add_stage(&mut c, StageOptions::default()).unwrap();
    c.append(["procbuild-test-no-such-program-xyz"]);
    chain.add_stage(&mut c, StageOptions::default()).unwrap();
    c.append(["cat"]);
    let err = chain
        .add_stage(&mut c, StageOptions::default())
        .unwrap_err();
    assert!(matches!(err, ExecError::Spawn { .. }), "got {err:?}");
    assert_eq!(chain.started(), 1);

    match chain.end(RunOptions::default()) {
        Err(ExecError::Batch { failed, total }) => {
            assert_eq!(failed, 2);
            assert_eq!(total, 2);
        }
        other => panic!("expected Batch error, got {other:?}"),
    }
    assert_eq!(chain.started(), 0);
}

#[test]
fn spawn_failure_closes_the_read_end() {
    // `yes` writes forever; it only stops once every read end of its pipe
    // is closed. If the failed spawn leaked one, `end` would hang here.
    let exec = executor(None);
    let mut chain = exec.pipe();
    chain.begin(RunOptions::default()).unwrap();

    let mut c = cmd!["yes"];
    chain.add_stage(&mut c, StageOptions::default()).unwrap();
    c.append(["procbuild-test-no-such-program-xyz"]);
    chain.add_stage(&mut c, StageOptions::default()).unwrap();
    c.append(["cat"]);
    assert!(chain.add_stage(&mut c, StageOptions::default()).is_err());

    let err = chain.end(RunOptions::default()).unwrap_err();
    assert!(matches!(err, ExecError::Batch { total: 2, .. }), "got {err:?}");
}

#[test]
fn capture_after_failed_stage_waits_started_stages() {
    let exec = executor(None);
    let mut chain = exec.pipe();
    chain.begin(RunOptions::default()).unwrap();

    let mut c = cmd!["true"];
    chain.add_stage(&mut c, StageOptions::default()).unwrap();
    c.append(["procbuild-test-no-such-program-xyz"]);
    chain.add_stage(&mut c, StageOptions::default()).unwrap();
    c.append(["cat"]);
    assert!(chain.add_stage(&mut c, StageOptions::default()).is_err());

    let err = chain.end_capture().unwrap_err();
    assert!(matches!(err, ExecError::EmptyPipeline));
    assert_eq!(chain.started(), 0);
}

#[test]
fn dropping_a_chain_waits_for_started_stages() {
    let dir = tempdir().unwrap();
    let marker = dir.path().join("stage-done");
    let exec = executor(None);

    {
        let mut chain = exec.pipe();
        chain.begin(RunOptions::default()).unwrap();
        let mut c = cmd!["sh", "-c"];
        c.arg(format!("sleep 0.2; touch {}", marker.display()));
        chain.add_stage(&mut c, StageOptions::default()).unwrap();
        c.append(["cat"]);
        chain.add_stage(&mut c, StageOptions::default()).unwrap();
        assert_eq!(chain.started(), 1);
    }

    assert!(marker.exists());
}
