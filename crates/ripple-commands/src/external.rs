// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client for the external command helper.
//!
//! The helper is a child process speaking line-delimited JSON over its
//! stdio: each request is `{"id", "cmd", "args"}` and each answer is
//! `{"id", "ret", "exc"}`. Answers may arrive in any order. A helper that
//! died is respawned on the next call.

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use ripple_bus::{CommandContext, CommandHandler, HandlerResult, Reply};
use ripple_core::{Request, RippleError};

/// How long a call waits for its answer.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct HelperRequest<'a> {
    id: &'a str,
    cmd: &'a str,
    args: &'a [String],
}

#[derive(Debug, Deserialize)]
struct HelperAnswer {
    id: String,
    #[serde(default)]
    ret: Value,
    #[serde(default)]
    exc: Option<String>,
}

type Pending = Arc<DashMap<String, oneshot::Sender<HelperAnswer>>>;

/// One spawned helper process. Calls waiting on it live in `pending`, which
/// is emptied when its stdout closes.
struct Running {
    child: Child,
    stdin: ChildStdin,
    pending: Pending,
    reader: JoinHandle<()>,
}

impl Running {
    fn has_exited(&mut self) -> bool {
        !matches!(self.child.try_wait(), Ok(None))
    }

    async fn stop(mut self) {
        self.reader.abort();
        if let Err(e) = self.child.kill().await {
            debug!(error = %e, "external helper already gone");
        }
        self.pending.clear();
    }
}

pub struct ExternalHelper {
    argv: Vec<String>,
    timeout: Duration,
    running: Mutex<Option<Running>>,
    closed: AtomicBool,
}

impl ExternalHelper {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            timeout: DEFAULT_CALL_TIMEOUT,
            running: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Spawn the helper now rather than on the first call.
    pub async fn start(&self) -> Result<(), RippleError> {
        let mut running = self.running.lock().await;
        if running.is_none() {
            *running = Some(self.spawn()?);
        }
        Ok(())
    }

    fn spawn(&self) -> Result<Running, RippleError> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| RippleError::Config("external.command is empty".into()))?;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| helper_error(format!("failed to spawn {program}: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| helper_error("helper stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| helper_error("helper stdout unavailable"))?;
        let pending: Pending = Arc::new(DashMap::new());
        let reader = tokio::spawn(read_answers(stdout, Arc::clone(&pending)));
        info!(program = %program, pid = ?child.id(), "external helper started");
        Ok(Running {
            child,
            stdin,
            pending,
            reader,
        })
    }

    /// Send `cmd` to the helper and wait for its answer.
    ///
    /// A helper-side exception becomes a [`RippleError::Handler`].
    pub async fn call(&self, cmd: &str, args: Vec<String>) -> Result<Value, RippleError> {
        let id = Uuid::new_v4().to_string();
        let mut line = serde_json::to_string(&HelperRequest {
            id: &id,
            cmd,
            args: &args,
        })
        .map_err(|e| helper_error(e.to_string()))?;
        line.push('\n');

        let (pending, rx) = self.submit(&id, &line).await?;
        debug!(cmd, id = %id, "request sent to external helper");

        let answer = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(_)) => {
                return Err(RippleError::Handler {
                    name: cmd.to_string(),
                    message: "external helper exited before answering".into(),
                });
            }
            Err(_) => {
                pending.remove(&id);
                warn!(cmd, id = %id, "external helper did not answer in time");
                return Err(RippleError::Timeout {
                    duration: self.timeout,
                });
            }
        };
        match answer.exc {
            Some(exc) if !exc.is_empty() => {
                error!(cmd, exc = %exc, "external helper raised");
                Err(RippleError::Handler {
                    name: cmd.to_string(),
                    message: exc,
                })
            }
            _ => Ok(answer.ret),
        }
    }

    /// Register a waiter for `id` and write `line`, respawning the helper
    /// once if it is gone or its pipe is broken. Returns the map the waiter
    /// lives in together with its receiver.
    async fn submit(
        &self,
        id: &str,
        line: &str,
    ) -> Result<(Pending, oneshot::Receiver<HelperAnswer>), RippleError> {
        let mut guard = self.running.lock().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(helper_error("external helper is closed"));
        }
        let mut last_error = None;
        for attempt in 0..2 {
            let stale = guard.as_mut().is_none_or(Running::has_exited);
            if stale {
                if let Some(old) = guard.take() {
                    warn!(attempt, "external helper exited, respawning");
                    old.stop().await;
                }
                *guard = Some(self.spawn()?);
            }
            let Some(running) = guard.as_mut() else {
                continue;
            };
            let (tx, rx) = oneshot::channel();
            running.pending.insert(id.to_string(), tx);
            let written = async {
                running.stdin.write_all(line.as_bytes()).await?;
                running.stdin.flush().await
            }
            .await;
            match written {
                Ok(()) => return Ok((Arc::clone(&running.pending), rx)),
                Err(e) => {
                    running.pending.remove(id);
                    warn!(error = %e, "write to external helper failed");
                    last_error = Some(e);
                    if let Some(old) = guard.take() {
                        old.stop().await;
                    }
                }
            }
        }
        Err(helper_error(format!(
            "external helper unavailable: {}",
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Terminate the helper. Later calls fail.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        if let Some(running) = self.running.lock().await.take() {
            running.stop().await;
            info!("external helper stopped");
        }
    }
}

async fn read_answers(stdout: ChildStdout, pending: Pending) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<HelperAnswer>(line) {
                    Ok(answer) => match pending.remove(&answer.id) {
                        Some((_, tx)) => {
                            let _ = tx.send(answer);
                        }
                        None => warn!(id = %answer.id, "answer for unknown external request"),
                    },
                    Err(e) => warn!(error = %e, line, "malformed external helper answer"),
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "reading external helper output failed");
                break;
            }
        }
    }
    debug!(waiting = pending.len(), "external helper output closed");
    pending.clear();
}

fn helper_error(message: impl Into<String>) -> RippleError {
    RippleError::Handler {
        name: "external".into(),
        message: message.into(),
    }
}

/// A command answered by the external helper.
pub struct ExternalCommand {
    name: String,
    helper: Arc<ExternalHelper>,
}

impl ExternalCommand {
    pub fn new(name: impl Into<String>, helper: Arc<ExternalHelper>) -> Self {
        Self {
            name: name.into(),
            helper,
        }
    }
}

#[async_trait]
impl CommandHandler for ExternalCommand {
    async fn call(&self, _ctx: &CommandContext<'_>, req: &Request) -> HandlerResult {
        let ret = self.helper.call(&self.name, vec![req.args.clone()]).await?;
        Ok(match ret {
            Value::Null => None,
            Value::String(text) => Some(Reply::from(text)),
            other => Some(Reply::from(other.to_string())),
        })
    }
}
