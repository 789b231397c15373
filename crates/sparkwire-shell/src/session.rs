//! An interactive REPL process driven over its standard streams.

use sparkwire_core::error::{ConnectionErrorKind, Error, Result};
use std::io::{Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{Span, debug, warn};

enum PipeEvent {
    Data(Vec<u8>),
    Closed,
}

/// A long-lived `sh -c <cmd>` process with merged stdout and stderr.
///
/// Output is consumed by [`ShellSession::expect`], which blocks until a
/// sentinel appears and returns everything printed before it.
pub struct ShellSession {
    child: Child,
    stdin: Option<ChildStdin>,
    events: Receiver<PipeEvent>,
    readers: Vec<JoinHandle<()>>,
    open_pipes: usize,
    pending: Vec<u8>,
    read_timeout: Option<Duration>,
    closed: bool,
    span: Span,
}

impl std::fmt::Debug for ShellSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellSession")
            .field("pid", &self.child.id())
            .field("open_pipes", &self.open_pipes)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl ShellSession {
    /// Launch `cmd` through `sh -c` with piped standard streams.
    pub fn spawn(cmd: &str, span: Span) -> Result<Self> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::connection(
                    ConnectionErrorKind::Connect,
                    format!("Failed to start shell command '{}': {}", cmd, e),
                )
            })?;

        let (tx, events) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(pump(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(pump(stderr, tx.clone()));
        }
        let stdin = child.stdin.take();
        span.in_scope(|| debug!(pid = child.id(), cmd = %cmd, "Shell process started"));

        Ok(Self {
            open_pipes: readers.len(),
            child,
            stdin,
            events,
            readers,
            pending: Vec::new(),
            read_timeout: None,
            closed: false,
            span,
        })
    }

    /// Bound how long [`expect`](Self::expect) waits for new output.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Write `text` followed by a newline.
    pub fn send_line(&mut self, text: &str) -> Result<()> {
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            Error::connection(ConnectionErrorKind::Closed, "Shell session is closed")
        })?;
        stdin.write_all(text.as_bytes())?;
        stdin.write_all(b"\n")?;
        stdin.flush()?;
        Ok(())
    }

    /// Block until `sentinel` is printed; return the output before it.
    pub fn expect(&mut self, sentinel: &str) -> Result<String> {
        let needle = sentinel.as_bytes();
        loop {
            if let Some(at) = find(&self.pending, needle) {
                let before = String::from_utf8_lossy(&self.pending[..at]).into_owned();
                self.pending.drain(..at + needle.len());
                return Ok(before);
            }
            if self.open_pipes == 0 {
                return Err(self.disconnected(sentinel));
            }

            let event = match self.read_timeout {
                Some(timeout) => match self.events.recv_timeout(timeout) {
                    Ok(event) => event,
                    Err(RecvTimeoutError::Timeout) => {
                        return Err(Error::Io(std::io::Error::new(
                            std::io::ErrorKind::TimedOut,
                            format!("Timed out waiting for '{}'", sentinel),
                        )));
                    }
                    Err(RecvTimeoutError::Disconnected) => PipeEvent::Closed,
                },
                None => self.events.recv().unwrap_or(PipeEvent::Closed),
            };
            match event {
                PipeEvent::Data(bytes) => self.pending.extend_from_slice(&bytes),
                PipeEvent::Closed => self.open_pipes = self.open_pipes.saturating_sub(1),
            }
        }
    }

    fn disconnected(&mut self, sentinel: &str) -> Error {
        let output = String::from_utf8_lossy(&std::mem::take(&mut self.pending)).into_owned();
        let status = self
            .child
            .try_wait()
            .ok()
            .flatten()
            .map_or_else(|| "running".to_string(), |s| s.to_string());
        Error::connection(
            ConnectionErrorKind::Disconnected,
            format!(
                "Shell process closed its output ({}) before printing '{}': {}",
                status,
                sentinel,
                output.trim()
            ),
        )
    }

    /// Ask the REPL to exit, then kill and reap the process.
    pub fn close(&mut self, quit_command: Option<&str>) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let span = self.span.clone();
        let _enter = span.enter();

        if let Some(quit) = quit_command {
            if let Err(e) = self.send_line(quit) {
                debug!(error = %e, "Failed to send quit command");
            }
        }
        self.stdin = None;
        if let Err(e) = self.child.kill() {
            // already exited
            debug!(error = %e, "Kill failed");
        }
        let status = self.child.wait()?;
        // grandchildren may still hold the pipes; their readers are detached
        for reader in self.readers.drain(..).filter(|r| r.is_finished()) {
            if reader.join().is_err() {
                warn!("Shell output reader panicked");
            }
        }
        debug!(status = %status, "Shell process closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for ShellSession {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Forward everything read from `pipe` into the session channel.
fn pump<R: Read + Send + 'static>(mut pipe: R, tx: Sender<PipeEvent>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(PipeEvent::Data(buf[..n].to_vec())).is_err() {
                        return;
                    }
                }
            }
        }
        let _ = tx.send(PipeEvent::Closed);
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
