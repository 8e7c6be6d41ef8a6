//! Child process supervision for Switchyard.
//!
//! The supervisor owns every spawned child. Children are flat and independent:
//! an exit is logged but never restarts the child or touches its siblings.
//! Each child has a monitor task that races `wait()` against the shared
//! cancellation token. On shutdown every still-running child is sent SIGTERM
//! exactly once, so wrappers can pass it on to their own children, and is
//! force-killed only if it outlives the grace period.

pub mod launch;

use std::time::Duration;

use futures::future::join_all;
use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::SwitchyardError;
use crate::supervisor::launch::LaunchSpec;

/// How long a child gets to exit after SIGTERM before it is force-killed.
pub const DEFAULT_TERMINATION_GRACE: Duration = Duration::from_secs(5);

/// How a monitored child ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildOutcome {
    /// Exited on its own before shutdown, with its exit code if any.
    Exited(Option<i32>),
    /// Exited after the shutdown SIGTERM.
    Terminated,
    /// Outlived the grace period and was force-killed.
    Killed,
    /// Kill failed (typically already gone). Tolerated.
    KillFailed(String),
    /// Waiting on the child failed.
    WaitFailed(String),
}

/// A tracked child process.
pub struct ManagedChild {
    pub label: String,
    pub pid: Option<u32>,
    monitor: JoinHandle<ChildOutcome>,
}

impl ManagedChild {
    /// True once the child has exited or been killed.
    pub fn is_finished(&self) -> bool {
        self.monitor.is_finished()
    }
}

/// Tally of what shutdown did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Children that were running and received a termination request.
    pub signalled: usize,
    /// Of those, children that ignored it and had to be force-killed.
    pub forced: usize,
    /// Children that had already exited on their own.
    pub already_exited: usize,
    /// Children whose kill or wait failed.
    pub failed: usize,
}

/// Owner of the process registry.
///
/// Append-only while starting up; drained once by [`Supervisor::shutdown`].
pub struct Supervisor {
    children: Vec<ManagedChild>,
    cancel: CancellationToken,
    grace: Duration,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self::with_grace(DEFAULT_TERMINATION_GRACE)
    }

    /// Supervisor that waits `grace` after SIGTERM before force-killing.
    pub fn with_grace(grace: Duration) -> Self {
        Self {
            children: Vec::new(),
            cancel: CancellationToken::new(),
            grace,
        }
    }

    /// Spawn a child from `spec` and start monitoring it.
    ///
    /// Does not wait for the child to become ready. Fails if the program
    /// cannot be started or shutdown has already begun.
    pub fn spawn(&mut self, spec: &LaunchSpec) -> crate::Result<&ManagedChild> {
        if self.cancel.is_cancelled() {
            return Err(SwitchyardError::ShuttingDown(spec.label.clone()));
        }

        let child = spec
            .command()
            .spawn()
            .map_err(|e| SwitchyardError::Spawn(spec.label.clone(), e.to_string()))?;
        let pid = child.id();

        tracing::info!(
            child = %spec.label,
            pid = ?pid,
            program = %spec.program,
            "spawned child process"
        );

        let monitor = tokio::spawn(monitor_child(
            spec.label.clone(),
            child,
            self.cancel.child_token(),
            self.grace,
        ));

        self.children.push(ManagedChild {
            label: spec.label.clone(),
            pid,
            monitor,
        });
        Ok(&self.children[self.children.len() - 1])
    }

    /// Tracked children, in spawn order.
    pub fn children(&self) -> &[ManagedChild] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Terminate every still-running child and wait for each to be reaped.
    ///
    /// Children that already exited are counted but not signalled. Signal
    /// errors are logged at debug and never stop the remaining children.
    /// Calling this again returns an empty report.
    pub async fn shutdown(&mut self) -> ShutdownReport {
        if self.cancel.is_cancelled() {
            return ShutdownReport::default();
        }
        tracing::info!(children = self.children.len(), "terminating child processes");
        self.cancel.cancel();

        let children = std::mem::take(&mut self.children);
        let outcomes = join_all(
            children
                .into_iter()
                .map(|child| async move { (child.label, child.monitor.await) }),
        )
        .await;

        let mut report = ShutdownReport::default();
        for (label, outcome) in outcomes {
            match outcome {
                Ok(ChildOutcome::Terminated) => report.signalled += 1,
                Ok(ChildOutcome::Killed) => {
                    report.signalled += 1;
                    report.forced += 1;
                }
                Ok(ChildOutcome::Exited(_)) => report.already_exited += 1,
                Ok(ChildOutcome::KillFailed(_)) | Ok(ChildOutcome::WaitFailed(_)) => {
                    report.failed += 1
                }
                Err(e) => {
                    tracing::debug!(child = %label, error = %e, "monitor task did not complete");
                    report.failed += 1;
                }
            }
        }
        tracing::info!(
            signalled = report.signalled,
            forced = report.forced,
            already_exited = report.already_exited,
            failed = report.failed,
            "child processes terminated"
        );
        report
    }
}

/// Wait for `child` to exit, or terminate it when `cancel` fires.
///
/// `biased` polls `wait()` first so a child that already exited is reported
/// as exited rather than terminated.
async fn monitor_child(
    label: String,
    mut child: Child,
    cancel: CancellationToken,
    grace: Duration,
) -> ChildOutcome {
    tokio::select! {
        biased;
        status = child.wait() => match status {
            Ok(status) => {
                tracing::warn!(
                    child = %label,
                    code = ?status.code(),
                    "child process exited"
                );
                ChildOutcome::Exited(status.code())
            }
            Err(e) => {
                tracing::error!(child = %label, error = %e, "failed waiting on child process");
                ChildOutcome::WaitFailed(e.to_string())
            }
        },
        _ = cancel.cancelled() => terminate(&label, &mut child, grace).await,
    }
}

/// SIGTERM, wait up to `grace`, then SIGKILL.
async fn terminate(label: &str, child: &mut Child, grace: Duration) -> ChildOutcome {
    match request_termination(child) {
        Ok(()) => match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(child = %label, code = ?status.code(), "child process terminated");
                return ChildOutcome::Terminated;
            }
            Ok(Err(e)) => {
                tracing::debug!(child = %label, error = %e, "failed waiting on terminated child");
                return ChildOutcome::WaitFailed(e.to_string());
            }
            Err(_) => {
                tracing::warn!(
                    child = %label,
                    grace_ms = grace.as_millis() as u64,
                    "child ignored SIGTERM, killing"
                );
            }
        },
        Err(e) => {
            tracing::debug!(child = %label, error = %e, "SIGTERM failed, killing");
        }
    }

    match child.kill().await {
        Ok(()) => {
            tracing::debug!(child = %label, "child process killed");
            ChildOutcome::Killed
        }
        Err(e) => {
            tracing::debug!(child = %label, error = %e, "kill failed, child already gone");
            ChildOutcome::KillFailed(e.to_string())
        }
    }
}

#[cfg(unix)]
fn request_termination(child: &mut Child) -> std::io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid = child
        .id()
        .ok_or_else(|| std::io::Error::other("child already reaped"))?;
    kill(Pid::from_raw(pid as i32), Signal::SIGTERM)?;
    Ok(())
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}
