mod common;
use crate::common::{init_tracing, with_timeout, TestResult};

use std::time::Duration;

use locimport::exec::{spawn_log_pump, PendingLog};
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;

#[test]
fn pending_log_take_swaps_and_clears() {
    let pending = PendingLog::new();
    assert!(pending.is_empty());

    pending.append("a");
    pending.append("");
    pending.append("b");
    assert_eq!(pending.take(), "ab");
    assert!(pending.is_empty());
    assert_eq!(pending.take(), "");

    let producer = pending.clone();
    producer.append("c");
    assert_eq!(pending.take(), "c");
}

/// Exit-code channel whose code is already published.
fn exited_with(code: i32) -> watch::Receiver<Option<i32>> {
    let (tx, rx) = watch::channel(None);
    tx.send_replace(Some(code));
    rx
}

#[tokio::test]
async fn pump_collects_output_until_eof() -> TestResult {
    init_tracing();
    let pending = PendingLog::new();
    let output: &'static [u8] = b"gathering...\nwarning: missing key\ndone\n";

    let summary =
        with_timeout(spawn_log_pump("t".into(), output, pending.clone(), exited_with(0))).await?;

    assert_eq!(summary.bytes, output.len());
    assert_eq!(summary.exit_code, Some(0));
    assert_eq!(pending.take(), "gathering...\nwarning: missing key\ndone\n");
    Ok(())
}

#[tokio::test]
async fn pump_waits_for_the_exit_code_after_eof() -> TestResult {
    init_tracing();
    let pending = PendingLog::new();
    let (tx, rx) = watch::channel(None);
    let output: &'static [u8] = b"compiled\n";

    let pump = spawn_log_pump("t".into(), output, pending.clone(), rx);
    with_timeout(async {
        while pending.is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!pump.is_finished());

    tx.send_replace(Some(7));
    let summary = with_timeout(pump).await?;
    assert_eq!(summary.exit_code, Some(7));
    Ok(())
}

#[tokio::test]
async fn pump_without_an_exit_code_reports_none() -> TestResult {
    let pending = PendingLog::new();
    let (tx, rx) = watch::channel(None);
    drop(tx);

    let summary = with_timeout(spawn_log_pump("t".into(), &b"x"[..], pending, rx)).await?;
    assert_eq!(summary.exit_code, None);
    assert_eq!(summary.bytes, 1);
    Ok(())
}

#[tokio::test]
async fn multibyte_characters_split_across_reads_survive() -> TestResult {
    init_tracing();
    let pending = PendingLog::new();
    let (mut writer, reader) = tokio::io::duplex(64);

    let pump = spawn_log_pump("t".into(), reader, pending.clone(), exited_with(0));

    let text = "Traduction: café, 翻訳\n";
    for byte in text.as_bytes() {
        writer.write_all(&[*byte]).await?;
        writer.flush().await?;
        tokio::task::yield_now().await;
    }
    drop(writer);

    let summary = with_timeout(pump).await?;
    assert_eq!(summary.bytes, text.len());
    assert_eq!(pending.take(), text);
    Ok(())
}

#[tokio::test]
async fn invalid_bytes_are_replaced() -> TestResult {
    let pending = PendingLog::new();
    let output: &'static [u8] = b"ok \xff\xfe end";

    with_timeout(spawn_log_pump("t".into(), output, pending.clone(), exited_with(0))).await?;

    assert_eq!(pending.take(), "ok \u{FFFD}\u{FFFD} end");
    Ok(())
}

#[tokio::test]
async fn output_is_visible_before_the_stream_closes() -> TestResult {
    let pending = PendingLog::new();
    let (mut writer, reader) = tokio::io::duplex(64);

    let pump = spawn_log_pump("t".into(), reader, pending.clone(), exited_with(0));

    writer.write_all(b"first line\n").await?;
    let mut seen = String::new();
    with_timeout(async {
        while !seen.contains("first line") {
            seen.push_str(&pending.take());
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await;
    assert!(!pump.is_finished());

    drop(writer);
    with_timeout(pump).await?;
    Ok(())
}
