//! Tests for batch admission, interleaving and stopping.

use std::sync::Arc;
use std::time::Duration;

use neet_kernel::testing::RecordingDevice;
use neet_kernel::{
    Kernel, KernelConfig, MemoryStore, StartError, StopTarget, TerminalMessage,
};

fn kernel_with(scripts: &[(&str, &str)]) -> Kernel {
    let store = scripts
        .iter()
        .fold(MemoryStore::new(), |store, (name, text)| store.with(*name, *text));
    Kernel::with_parts(
        KernelConfig::isolated(),
        Arc::new(store),
        Arc::new(RecordingDevice::default()),
    )
    .expect("Failed to create kernel")
}

fn outputs(messages: &[TerminalMessage]) -> Vec<String> {
    messages
        .iter()
        .filter(|m| !m.is_error())
        .filter_map(|m| m.text().map(str::to_string))
        .collect()
}

fn errors(messages: &[TerminalMessage]) -> Vec<String> {
    messages
        .iter()
        .filter(|m| m.is_error())
        .filter_map(|m| m.text().map(str::to_string))
        .collect()
}

const LOOP_A: &str = "print a\ngoto 1";
const LOOP_B: &str = "print b\ngoto 1";

// ============================================================================
// Admission
// ============================================================================

#[tokio::test]
async fn self_reference_starts_nothing() {
    let kernel = kernel_with(&[("A", "run A B"), ("B", "print b ran")]);
    kernel.submit_line("run A").await;
    let messages = kernel.drain_messages();

    assert_eq!(errors(&messages), vec!["A#1 > A script file cannot run itself.\n"]);
    assert!(!outputs(&messages).iter().any(|o| o.contains("b ran")));
    assert!(kernel.list_active_instances().is_empty());
}

#[tokio::test]
async fn duplicate_names_start_nothing() {
    let kernel = kernel_with(&[("a", "print a ran")]);
    let err = kernel.start(&["a", "a"]).unwrap_err();
    assert!(matches!(err, StartError::Duplicate(ref n) if n == "a"));
    assert!(kernel.drain_messages().is_empty());

    kernel.submit_line("run a a").await;
    let messages = kernel.drain_messages();
    assert_eq!(
        errors(&messages),
        vec!["Cannot run the same file more than once: a\n"]
    );
    assert!(outputs(&messages).is_empty());
}

#[tokio::test]
async fn unknown_script_rejects_whole_batch() {
    let kernel = kernel_with(&[("real", "print real ran")]);
    let err = kernel.start(&["real", "ghost"]).unwrap_err();
    assert_eq!(err.to_string(), "Invalid script: ghost");
    assert!(kernel.list_active_instances().is_empty());
    assert!(kernel.drain_messages().is_empty());
}

#[tokio::test]
async fn already_active_is_rejected() {
    let kernel = kernel_with(&[("a", LOOP_A)]);
    let _handle = kernel.start(&["a"]).expect("start");
    let err = kernel.start(&["a"]).unwrap_err();
    assert!(matches!(err, StartError::AlreadyActive(_)));
    kernel.stop_instance("all");
}

#[tokio::test]
async fn empty_run_is_a_noop() {
    let kernel = kernel_with(&[]);
    let eval = kernel.submit_line("run").await;
    assert!(!eval.failed);
    assert!(outputs(&kernel.drain_messages()).is_empty());
}

// ============================================================================
// Interleaving
// ============================================================================

#[tokio::test]
async fn looping_scripts_interleave() {
    let kernel = kernel_with(&[("a", LOOP_A), ("b", LOOP_B)]);
    let handle = kernel.start(&["a", "b"]).expect("start");
    assert_eq!(kernel.list_active_instances(), vec!["a", "b"]);

    tokio::time::sleep(Duration::from_millis(20)).await;
    let stopped = kernel.stop_instance(StopTarget::All);
    assert_eq!(stopped, vec!["a", "b"]);
    handle.wait().await;

    let out = outputs(&kernel.drain_messages());
    let a = out.iter().filter(|o| *o == "a\n").count();
    let b = out.iter().filter(|o| *o == "b\n").count();
    assert!(a >= 5 && b >= 5, "a={} b={}", a, b);

    // Round robin: neither script runs far ahead of the other.
    let first: Vec<_> = out.iter().take(10).collect();
    assert!(first.contains(&&"a\n".to_string()));
    assert!(first.contains(&&"b\n".to_string()));
}

#[tokio::test]
async fn one_failure_leaves_siblings_running() {
    let kernel = kernel_with(&[("bad", "nope"), ("good", "print one\nprint two")]);
    kernel.submit_line("run bad good").await;
    let messages = kernel.drain_messages();
    assert_eq!(outputs(&messages), vec!["one\n", "two\n"]);
    assert_eq!(errors(&messages).len(), 1);
}

#[tokio::test]
async fn oversized_wait_fails_only_its_script() {
    let kernel = kernel_with(&[("a", "wait 1e30\nprint a"), ("b", "print b")]);
    assert!(kernel.submit_line("wait 1e30").await.failed);
    kernel.drain_messages();

    let a = kernel.start(&["a"]).expect("start a");
    let b = kernel.start(&["b"]).expect("start b");
    tokio::time::timeout(Duration::from_secs(1), async {
        a.wait().await;
        b.wait().await;
    })
    .await
    .expect("both batches should end");

    let messages = kernel.drain_messages();
    assert_eq!(outputs(&messages), vec!["b\n"]);
    let errors = errors(&messages);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("a#1 > Invalid usage!"), "{:?}", errors[0]);
    assert!(kernel.list_active_instances().is_empty());
}

#[tokio::test(start_paused = true)]
async fn overlapping_batches() {
    let kernel = kernel_with(&[("slow", "wait 0.05\nprint slow"), ("fast", "print fast")]);
    let slow = kernel.start(&["slow"]).expect("start slow");
    kernel.submit_line("run fast").await;
    assert_eq!(kernel.list_active_instances(), vec!["slow"]);
    slow.wait().await;

    let out = outputs(&kernel.drain_messages());
    assert_eq!(out, vec!["fast\n", "slow\n"]);
}

// ============================================================================
// Stopping
// ============================================================================

#[tokio::test]
async fn stop_cancels_pending_wait() {
    let kernel = kernel_with(&[("sleeper", "wait 30\nprint woke")]);
    let handle = kernel.start(&["sleeper"]).expect("start");
    tokio::task::yield_now().await;

    assert_eq!(kernel.stop_instance("sleeper"), vec!["sleeper"]);
    tokio::time::timeout(Duration::from_secs(1), handle.wait())
        .await
        .expect("batch should end once its member is stopped");

    let messages = kernel.drain_messages();
    assert!(outputs(&messages).is_empty());
    assert_eq!(
        messages.last(),
        Some(&TerminalMessage::ScriptListChanged { names: vec![] })
    );
}

#[tokio::test]
async fn stop_unknown_name_is_silent() {
    let kernel = kernel_with(&[]);
    assert!(kernel.stop_instance("ghost").is_empty());
    assert!(kernel.drain_messages().is_empty());
}

#[tokio::test]
async fn stopped_name_can_restart() {
    let kernel = kernel_with(&[("a", LOOP_A)]);
    kernel.start(&["a"]).expect("first start");
    kernel.stop_instance("a");
    let handle = kernel.start(&["a"]).expect("restart");
    assert_eq!(kernel.list_active_instances(), vec!["a"]);
    kernel.stop_instance(StopTarget::All);
    handle.wait().await;
    kernel.wait_idle().await;
}

// ============================================================================
// Script directory
// ============================================================================

#[tokio::test]
async fn scripts_load_from_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("hello.neet"), "print hello from disk\r\n").expect("write");

    let kernel = Kernel::new(KernelConfig::isolated().with_script_dir(dir.path()))
        .expect("Failed to create kernel");
    kernel.submit_line("run hello").await;
    assert_eq!(outputs(&kernel.drain_messages()), vec!["hello from disk\n"]);

    kernel.submit_line("run missing").await;
    assert_eq!(errors(&kernel.drain_messages()), vec!["Invalid script: missing\n"]);
}
