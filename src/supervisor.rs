//! Child process supervision.
//!
//! [`ProcessSupervisor`] owns the full lifecycle of one status command: it
//! spawns the command through a shell with its stdout redirected into a
//! pipe, switches the read end to non-blocking mode, feeds whatever bytes
//! arrive into a [`LineAccumulator`], detects exit, and re-arms a restart
//! deadline so a crash-looping command is never respawned faster than the
//! configured interval.
//!
//! Nothing here blocks. Reads happen only after the event loop has seen the
//! pipe become readable, and reaping uses a non-blocking wait, so a child
//! that is slow to die delays its own replacement, never the bar.

use crate::linebuf::LineAccumulator;
use log::{debug, warn};
use std::io::Read;
use std::os::unix::io::{AsRawFd, RawFd};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

/// Where a supervised command currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildState {
    /// Never spawned, or stopped and awaiting its restart deadline.
    Unspawned,
    Running,
    /// Output reached end-of-file; the command exited.
    Exited,
    /// Reading the output pipe failed.
    Errored,
}

/// Result of servicing a readable child pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Bytes were read and fed to the accumulator.
    Data,
    Eof,
    /// Readiness was spurious; nothing to read right now.
    WouldBlock,
    IoError,
}

/// Process creation failed; the caller retries at the next deadline.
#[derive(Debug, thiserror::Error)]
#[error("failed to spawn {command:?}: {source}")]
pub struct SpawnError {
    pub command: String,
    #[source]
    pub source: std::io::Error,
}

/// Supervises one long-lived shell command.
pub struct ProcessSupervisor {
    command: String,
    restart_interval: Duration,
    state: ChildState,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    lines: LineAccumulator,
    /// Absolute deadline for the next spawn attempt. `None` means "never
    /// spawned": eligible immediately.
    next_spawn: Option<Instant>,
}

impl ProcessSupervisor {
    /// Create a supervisor for `command`. No process is spawned yet; the
    /// first [`maybe_restart`](Self::maybe_restart) call does that.
    pub fn new(command: impl Into<String>, restart_interval: Duration, capacity: usize) -> Self {
        Self {
            command: command.into(),
            restart_interval,
            state: ChildState::Unspawned,
            child: None,
            stdout: None,
            lines: LineAccumulator::new(capacity),
            next_spawn: None,
        }
    }

    /// The supervised command string.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChildState {
        self.state
    }

    /// Whether a child is live and its pipe belongs in the wait-set.
    pub fn is_running(&self) -> bool {
        self.state == ChildState::Running
    }

    /// The child's output fd, while running.
    pub fn output_fd(&self) -> Option<RawFd> {
        self.stdout.as_ref().map(|s| s.as_raw_fd())
    }

    /// Latest complete output line.
    pub fn current_line(&self) -> &str {
        self.lines.current_line()
    }

    /// Spawn the command through `sh -c`.
    ///
    /// Stdout goes to a pipe owned by this supervisor and switched to
    /// non-blocking mode; stdin and stderr are discarded. On failure the
    /// restart deadline is re-armed so the caller can simply try again
    /// later.
    pub fn spawn(&mut self, now: Instant) -> Result<(), SpawnError> {
        let spawned = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(source) => {
                self.next_spawn = Some(now + self.restart_interval);
                return Err(SpawnError {
                    command: self.command.clone(),
                    source,
                });
            }
        };

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                // Piped stdout should always be present; treat its absence
                // like a failed pipe.
                let _ = child.kill();
                let _ = child.wait();
                self.next_spawn = Some(now + self.restart_interval);
                return Err(SpawnError {
                    command: self.command.clone(),
                    source: std::io::Error::other("child stdout pipe missing"),
                });
            }
        };
        set_nonblocking(stdout.as_raw_fd());

        debug!("spawned {:?} (pid {})", self.command, child.id());
        self.child = Some(child);
        self.stdout = Some(stdout);
        self.state = ChildState::Running;
        self.next_spawn = Some(now + self.restart_interval);
        Ok(())
    }

    /// Service the output pipe after the event loop saw it readable.
    ///
    /// `Eof` and `IoError` both close the pipe, reap the child without
    /// blocking, and arm the restart deadline.
    pub fn poll_readable(&mut self, now: Instant) -> ReadOutcome {
        let Some(stdout) = self.stdout.as_mut() else {
            return ReadOutcome::WouldBlock;
        };
        let mut buf = [0u8; 1024];
        match stdout.read(&mut buf) {
            Ok(0) => {
                debug!("{:?}: eof", self.command);
                self.stop(ChildState::Exited, now);
                ReadOutcome::Eof
            }
            Ok(n) => {
                self.lines.feed(&buf[..n]);
                ReadOutcome::Data
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => ReadOutcome::WouldBlock,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => ReadOutcome::WouldBlock,
            Err(e) => {
                warn!("{:?}: read error: {}", self.command, e);
                self.stop(ChildState::Errored, now);
                ReadOutcome::IoError
            }
        }
    }

    /// Respawn if the child is gone and the restart deadline has passed.
    ///
    /// Returns whether a new process was started, so the caller can force
    /// an immediate redraw. The previous child must have been reaped before
    /// a new one is spawned; if it has not exited yet, the attempt is
    /// retried on a later tick.
    pub fn maybe_restart(&mut self, now: Instant) -> bool {
        if self.state == ChildState::Running {
            return false;
        }
        if let Some(deadline) = self.next_spawn {
            if now < deadline {
                return false;
            }
        }
        if !self.reap() {
            return false;
        }
        match self.spawn(now) {
            Ok(()) => true,
            Err(e) => {
                warn!("{}", e);
                false
            }
        }
    }

    /// Close the pipe, reap if possible, and arm the restart deadline.
    fn stop(&mut self, state: ChildState, now: Instant) {
        self.stdout = None;
        self.state = state;
        self.next_spawn = Some(now + self.restart_interval);
        self.reap();
    }

    /// Non-blocking wait on the previous child. Returns whether no child
    /// remains unreaped.
    fn reap(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return true;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("{:?}: reaped, {}", self.command, status);
                self.child = None;
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("{:?}: wait failed: {}", self.command, e);
                self.child = None;
                true
            }
        }
    }
}

fn set_nonblocking(fd: RawFd) {
    // Fresh pipe fds have no flags worth preserving beyond what F_GETFL
    // reports; a failed fcntl degrades to blocking reads, which the poll
    // gating makes survivable.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags >= 0 {
            libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
        }
    }
}

//  Tests
