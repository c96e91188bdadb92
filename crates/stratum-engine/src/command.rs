use crate::backend::{EngineBackend, EngineSpec};
use crate::EngineError;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use stratum_schema::Operation;
use stratum_store::{STATE_FILE, VARS_FILE};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Drives a Terraform-compatible binary (`terraform`, `tofu`) as a child process.
pub struct CommandBackend {
    binary: String,
    base_args: Vec<String>,
}

impl CommandBackend {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            base_args: Vec::new(),
        }
    }

    /// Arguments placed before the verb, for wrappers that take the engine
    /// command as their own arguments.
    #[must_use]
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn verb_args(op: Operation) -> Vec<String> {
        let mut args = vec![op.as_str().to_owned()];
        if op != Operation::Init {
            args.push("-auto-approve".to_owned());
        }
        args.push("-input=false".to_owned());
        args.push("-no-color".to_owned());
        if op != Operation::Init {
            args.push(format!("-var-file={VARS_FILE}"));
            args.push(format!("-state={STATE_FILE}"));
        }
        args
    }

    fn run(&self, op: Operation, spec: &EngineSpec) -> Result<(), EngineError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.base_args)
            .args(Self::verb_args(op))
            .current_dir(&spec.workspace_dir)
            .env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0")
            .envs(spec.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(spec.diagnostics.stdio())
            .stderr(spec.diagnostics.stdio());

        debug!(
            "running {} {op} for {} in {} (timeout {:?})",
            self.binary,
            spec.identity,
            spec.workspace_dir.display(),
            spec.timeout
        );
        let child = cmd.spawn().map_err(|source| EngineError::Spawn {
            binary: self.binary.clone(),
            source,
        })?;
        wait_with_timeout(child, op, spec.timeout)
    }
}

impl EngineBackend for CommandBackend {
    fn name(&self) -> &'static str {
        "terraform"
    }

    fn available(&self) -> bool {
        Command::new(&self.binary)
            .args(&self.base_args)
            .arg("version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn init(&self, spec: &EngineSpec) -> Result<(), EngineError> {
        self.run(Operation::Init, spec)
    }

    fn apply(&self, spec: &EngineSpec) -> Result<(), EngineError> {
        self.run(Operation::Apply, spec)
    }

    fn destroy(&self, spec: &EngineSpec) -> Result<(), EngineError> {
        self.run(Operation::Destroy, spec)
    }
}

/// Wait for `child`, killing it once `timeout` has elapsed.
pub fn wait_with_timeout(
    mut child: Child,
    op: Operation,
    timeout: Duration,
) -> Result<(), EngineError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return if status.success() {
                Ok(())
            } else {
                Err(EngineError::Failed {
                    op,
                    detail: exit_detail(status),
                })
            };
        }

        let now = Instant::now();
        if now >= deadline {
            warn!("engine {op} exceeded {timeout:?}, killing pid {}", child.id());
            if let Err(e) = child.kill() {
                warn!("failed to kill engine {op}: {e}");
            }
            if let Err(e) = child.wait() {
                warn!("failed to reap engine {op}: {e}");
            }
            return Err(EngineError::Timeout { op, timeout });
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

fn exit_detail(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit code {code}");
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return format!("killed by signal {sig}");
        }
    }
    "unknown exit status".to_owned()
}
