use crate::job::{CrewJob, EngineOutcome};
use crate::Engine;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Engine backed by one external process per run.
///
/// Contract with the process: the job arrives as a single JSON payload on
/// stdin, exactly one JSON result payload is expected on stdout before exit,
/// and stderr is non-authoritative diagnostics. A wall-clock timeout bounds
/// the whole invocation; on expiry the process is killed, not left running.
pub struct ProcessEngine {
    command: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessEngine {
    pub fn new(command: PathBuf, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command,
            args,
            timeout,
        }
    }
}

#[async_trait]
impl Engine for ProcessEngine {
    async fn run(&self, job: &CrewJob) -> EngineOutcome {
        let payload = match serde_json::to_vec(job) {
            Ok(bytes) => bytes,
            Err(e) => return EngineOutcome::failure(format!("Failed to serialize job: {e}")),
        };

        debug!(
            command = %self.command.display(),
            crew = %job.name,
            "Starting engine process"
        );

        // Classification (a): the process fails to start.
        let mut child = match Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return EngineOutcome::failure(format!("Failed to start engine process: {e}"))
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(&payload).await {
                let _ = child.kill().await;
                return EngineOutcome::failure(format!("Failed to write job to engine: {e}"));
            }
            // Dropping stdin closes the pipe so the engine sees EOF.
        }

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let collect = async {
            let mut stdout = Vec::new();
            let mut stderr = Vec::new();
            let read_stdout = async {
                match stdout_pipe {
                    Some(mut pipe) => pipe.read_to_end(&mut stdout).await.map(|_| ()),
                    None => Ok(()),
                }
            };
            let read_stderr = async {
                match stderr_pipe {
                    Some(mut pipe) => pipe.read_to_end(&mut stderr).await.map(|_| ()),
                    None => Ok(()),
                }
            };
            let (out, err) = tokio::join!(read_stdout, read_stderr);
            out?;
            err?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, stdout, stderr))
        };

        let result = tokio::time::timeout(self.timeout, collect).await;

        let (status, stdout, stderr) = match result {
            Ok(Ok(collected)) => collected,
            Ok(Err(e)) => {
                let _ = child.kill().await;
                return EngineOutcome::failure(format!("Engine process I/O error: {e}"));
            }
            Err(_) => {
                let _ = child.kill().await;
                warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "Engine process timed out, killed"
                );
                return EngineOutcome::failure(format!(
                    "Engine process timed out after {}s",
                    self.timeout.as_secs()
                ));
            }
        };

        // Diagnostic channel only: forwarded to logs, never parsed.
        let stderr = String::from_utf8_lossy(&stderr);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            debug!(line, "Engine diagnostics");
        }

        // Classification (b): non-zero exit, with available diagnostics attached.
        if !status.success() {
            let code = status.code().unwrap_or(-1);
            return EngineOutcome::failure(format!(
                "Engine process exited with code {code}: {}",
                truncate(&stderr, 2_000)
            ));
        }

        // Classification (c): zero exit but unparsable result payload. A
        // claimed success with no output is the same protocol violation; a
        // completed execution must carry a result.
        match serde_json::from_slice::<EngineOutcome>(&stdout) {
            Ok(outcome) => {
                let missing_output = outcome.output.as_deref().map_or(true, str::is_empty);
                if outcome.success && missing_output {
                    EngineOutcome::failure("Engine reported success without an output payload")
                } else {
                    outcome
                }
            }
            Err(e) => {
                let stdout = String::from_utf8_lossy(&stdout);
                EngineOutcome::failure(format!(
                    "Failed to parse engine output ({e}): {}",
                    truncate(&stdout, 2_000)
                ))
            }
        }
    }

    fn name(&self) -> &'static str {
        "process"
    }
}

// Cuts on a char boundary; diagnostics are arbitrary text.
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated, {} total bytes]", &s[..end], s.len())
}
