use crate::error::GatewayError;
use crate::transaction::Transaction;
use bytes::BytesMut;
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info, warn};

const STDERR_GRACE: Duration = Duration::from_secs(2);

/// A running git service process and the pipes owned by one HTTP exchange.
///
/// The child is spawned with kill-on-drop, so dropping the handle on any early
/// return takes the process down with it.
pub struct GitProcess {
    pub child: Child,
    pub stdin: Option<ChildStdin>,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
}

impl Transaction {
    /// `<binary> <service> --stateless-rpc [--advertise-refs] -- <name>.git`, run from the owner directory.
    pub fn command(&self, advertise: bool) -> Command {
        let mut cmd = Command::new(&self.git.binary);
        cmd.arg(self.service.command()).arg("--stateless-rpc");
        if advertise {
            cmd.arg("--advertise-refs");
        }
        cmd.arg("--")
            .arg(self.location.dir_name())
            .current_dir(self.location.parent())
            .stdin(if advertise { Stdio::null() } else { Stdio::piped() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(protocol) = &self.protocol {
            cmd.env("GIT_PROTOCOL", protocol);
        }
        cmd
    }

    pub fn spawn(&self, advertise: bool) -> Result<GitProcess, GatewayError> {
        let mut child = self.command(advertise).spawn().map_err(|e| {
            error!(service = %self.service, repo = %self.location, error = %e, "failed to start git process");
            GatewayError::SpawnFailed(e.to_string())
        })?;
        let stdin = if advertise {
            None
        } else {
            Some(child.stdin.take().ok_or(GatewayError::MissingPipe("stdin"))?)
        };
        let stdout = child.stdout.take().ok_or(GatewayError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(GatewayError::MissingPipe("stderr"))?;
        debug!(service = %self.service, repo = %self.location, pid = ?child.id(), "git process started");
        Ok(GitProcess {
            child,
            stdin,
            stdout,
            stderr,
        })
    }

    /// Drives `work` against a running child and reaps it.
    ///
    /// stderr is drained on its own task into a buffer capped at
    /// `git.stderr_limit` and logged once the task is joined. The child is killed
    /// when `work` fails (the client went away or a pipe broke) or when the
    /// exchange outlives `git.timeout_secs`. A failing exit status is only logged.
    pub(crate) async fn run_to_exit<F>(&self, mut child: Child, stderr: ChildStderr, work: F)
    where
        F: Future<Output = Result<(), GatewayError>>,
    {
        let deadline = Instant::now() + self.git.timeout();
        let mut drain = tokio::spawn(drain_stderr(stderr, self.git.stderr_limit));

        let mut kill = match timeout_at(deadline, work).await {
            Ok(Ok(())) => false,
            Ok(Err(err)) if err.is_disconnect() => {
                info!(error = %err, "client went away, stopping git");
                true
            }
            Ok(Err(err)) => {
                warn!(error = %err, "git transport failed, stopping git");
                true
            }
            Err(_) => {
                warn!(timeout_secs = self.git.timeout_secs, "git exchange exceeded its deadline, killing process");
                true
            }
        };
        if kill {
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "git process already gone");
            }
        }

        let grace = if kill { Instant::now() + STDERR_GRACE } else { deadline };
        match timeout_at(grace, &mut drain).await {
            Ok(Ok(captured)) => captured.log(self),
            Ok(Err(e)) => warn!(error = %e, "stderr drain task failed"),
            Err(_) => {
                drain.abort();
                warn!("git stderr still open at deadline, abandoning drain");
                kill = true;
            }
        }

        let status = match timeout_at(deadline.max(grace), child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                warn!("git process did not exit before its deadline, killing process");
                kill = true;
                if let Err(e) = child.start_kill() {
                    debug!(error = %e, "git process already gone");
                }
                child.wait().await
            }
        };
        match status {
            Ok(status) if status.success() => debug!("git process exited successfully"),
            Ok(status) if kill => debug!(%status, "git process stopped"),
            Ok(status) => warn!(%status, service = %self.service, repo = %self.location, "git process exited with failure"),
            Err(e) => error!(error = %e, "failed to wait on git process"),
        }
    }
}

/// What a stderr drain kept, and how much it read in total.
#[derive(Debug, Default)]
pub(crate) struct Captured {
    pub kept: Vec<u8>,
    pub total: usize,
}

impl Captured {
    fn log(&self, transaction: &Transaction) {
        if self.total == 0 {
            return;
        }
        let text = String::from_utf8_lossy(&self.kept);
        warn!(
            service = %transaction.service,
            repo = %transaction.location,
            truncated = self.total > self.kept.len(),
            stderr = %text.trim_end(),
            "git stderr"
        );
    }
}

pub(crate) async fn drain_stderr(mut stderr: ChildStderr, limit: usize) -> Captured {
    let mut captured = Captured::default();
    let mut buf = BytesMut::with_capacity(4096);
    loop {
        buf.clear();
        match stderr.read_buf(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                captured.total += n;
                let room = limit.saturating_sub(captured.kept.len());
                captured.kept.extend_from_slice(&buf[..n.min(room)]);
            }
            Err(e) => {
                debug!(error = %e, "git stderr read failed");
                break;
            }
        }
    }
    captured
}
