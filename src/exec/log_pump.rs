// src/exec/log_pump.rs

//! Background log pump and the hand-off buffer it fills.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const CHUNK_SIZE: usize = 4096;

/// Shared output buffer between the log pump (producer) and the completion
/// poller (consumer).
///
/// The producer appends; the consumer takes the whole buffer and leaves it
/// empty, so the lock is only ever held for a push or a swap.
#[derive(Debug, Clone, Default)]
pub struct PendingLog {
    inner: Arc<Mutex<String>>,
}

impl PendingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.lock().push_str(text);
    }

    /// Swap-and-clear.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// What the pump saw before the output pipe closed, plus the exit code the
/// process reported once it had.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PumpSummary {
    pub bytes: usize,
    /// `None` when the handle went away without publishing an exit code.
    pub exit_code: Option<i32>,
}

/// Spawn the pump for one process.
///
/// `output` is the read end of the single pipe the child writes both stdout
/// and stderr to, so chunks land in `pending` in the order the process wrote
/// them. The pump reads until EOF, i.e. until the process (and anything that
/// inherited the pipe) is gone and the pipe is empty. It then waits for the
/// exit code published on `exit` and reports it in its summary.
pub fn spawn_log_pump<R>(
    task: String,
    output: R,
    pending: PendingLog,
    exit: watch::Receiver<Option<i32>>,
) -> JoinHandle<PumpSummary>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(pump(task, output, pending, exit))
}

async fn pump<R>(
    task: String,
    mut output: R,
    pending: PendingLog,
    mut exit: watch::Receiver<Option<i32>>,
) -> PumpSummary
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut decoder = Utf8Decoder::default();
    let mut bytes = 0;

    debug!(task = %task, "log pump started");

    loop {
        match output.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                bytes += n;
                pending.append(&decoder.decode(&buf[..n]));
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(task = %task, error = %e, "reading process output failed");
                break;
            }
        }
    }
    pending.append(&decoder.finish());

    let exit_code = exit.wait_for(Option::is_some).await.ok().and_then(|code| *code);
    let summary = PumpSummary { bytes, exit_code };
    debug!(task = %task, bytes, exit_code = ?exit_code, "log pump finished");
    summary
}

/// Incremental UTF-8 decoding: a multi-byte character split across two reads
/// is held back until its remaining bytes arrive. Invalid sequences become
/// U+FFFD.
#[derive(Debug, Default)]
struct Utf8Decoder {
    carry: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, chunk: &[u8]) -> String {
        self.carry.extend_from_slice(chunk);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.carry) {
                Ok(s) => {
                    out.push_str(s);
                    self.carry.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.carry[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.carry.drain(..valid + len);
                        }
                        None => {
                            // Incomplete sequence at the end; wait for more.
                            self.carry.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.carry).into_owned();
        self.carry.clear();
        rest
    }
}
