//! Local media process control.
//!
//! A [`ManagedProcess`] wraps one spawned child. The child itself is
//! owned by a waiter task that reaps it and fires the exit callback
//! registered at spawn time; the handle keeps only the pid, an exit
//! flag and a kill switch. Dropping the handle kills the child.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{DiscarrError, Result};

// ── LaunchCommand ────────────────────────────────────────────────

/// Program, arguments and extra environment for one media process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl LaunchCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Look up an environment override by key.
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

// ── Signal ───────────────────────────────────────────────────────

/// Control signals a feeder may deliver to its process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Terminate,
    Suspend,
    Continue,
}

impl Signal {
    #[cfg(unix)]
    fn raw(self) -> libc::c_int {
        match self {
            Self::Terminate => libc::SIGTERM,
            Self::Suspend => libc::SIGSTOP,
            Self::Continue => libc::SIGCONT,
        }
    }
}

// ── ManagedProcess ───────────────────────────────────────────────

/// Handle to a spawned media process.
pub struct ManagedProcess {
    pid: Option<u32>,
    program: String,
    exited: watch::Receiver<bool>,
    kill_tx: Option<oneshot::Sender<()>>,
    waiter: JoinHandle<()>,
}

impl std::fmt::Debug for ManagedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedProcess")
            .field("pid", &self.pid)
            .field("program", &self.program)
            .field("exited", &self.has_exited())
            .finish()
    }
}

impl ManagedProcess {
    /// Spawn `command` and register `on_exit`, which runs on the waiter
    /// task once the child has been reaped (whatever the cause).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<F>(command: &LaunchCommand, on_exit: F) -> Result<Self>
    where
        F: FnOnce(Option<ExitStatus>) + Send + 'static,
    {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DiscarrError::process(&command.program, e))?;

        let pid = child.id();

        if let Some(stderr) = child.stderr.take() {
            let program = command.program.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(program = %program, "{line}");
                }
            });
        }

        let (exit_tx, exit_rx) = watch::channel(false);
        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let program = command.program.clone();

        let waiter = tokio::spawn(async move {
            // A dropped kill switch counts as a kill request.
            let status = tokio::select! {
                status = child.wait() => status,
                _ = kill_rx => {
                    if let Err(e) = child.start_kill() {
                        debug!(program = %program, "kill failed: {e}");
                    }
                    child.wait().await
                }
            };

            let status = match status {
                Ok(status) => {
                    debug!(program = %program, %status, "process exited");
                    Some(status)
                }
                Err(e) => {
                    warn!(program = %program, "failed to reap process: {e}");
                    None
                }
            };

            exit_tx.send_replace(true);
            on_exit(status);
        });

        Ok(Self {
            pid,
            program: command.program.clone(),
            exited: exit_rx,
            kill_tx: Some(kill_tx),
            waiter,
        })
    }

    /// OS process id, if the child was still running when spawned.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Whether the child has been reaped.
    pub fn has_exited(&self) -> bool {
        *self.exited.borrow()
    }

    /// Resolve once the child has been reaped.
    pub async fn wait_exit(&self) {
        let mut rx = self.exited.clone();
        // The sender publishes `true` before it is dropped.
        let _ = rx.wait_for(|done| *done).await;
    }

    /// Deliver `signal` to the child. A no-op once the child is gone.
    pub fn signal(&self, signal: Signal) -> Result<()> {
        if self.has_exited() {
            return Ok(());
        }
        let Some(pid) = self.pid else {
            return Ok(());
        };
        send_signal(&self.program, pid, signal)
    }

    /// Ask the child to terminate, force-kill it after `grace`, and wait
    /// until it has been reaped.
    pub async fn terminate(mut self, grace: Duration) {
        if !self.has_exited() {
            if cfg!(unix) {
                for signal in [Signal::Terminate, Signal::Continue] {
                    if let Err(e) = self.signal(signal) {
                        warn!(program = %self.program, "{e}");
                    }
                }
                if tokio::time::timeout(grace, self.wait_exit()).await.is_err() {
                    warn!(
                        program = %self.program,
                        "process ignored SIGTERM for {grace:?}; killing"
                    );
                    self.force_kill();
                }
            } else {
                self.force_kill();
            }
        }

        if let Err(e) = (&mut self.waiter).await {
            warn!(program = %self.program, "exit watcher failed: {e}");
        }
    }

    fn force_kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(unix)]
fn send_signal(program: &str, pid: u32, signal: Signal) -> Result<()> {
    // SAFETY: kill(2) has no memory-safety preconditions.
    let rc = unsafe { libc::kill(pid as libc::pid_t, signal.raw()) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        // Exited between the flag check and the signal.
        return Ok(());
    }
    Err(DiscarrError::process(program, err))
}

#[cfg(not(unix))]
fn send_signal(_program: &str, _pid: u32, _signal: Signal) -> Result<()> {
    Err(DiscarrError::NotImplemented("process signals on this platform"))
}

// ── Tests ─────────────────────────────────────────────────────────
