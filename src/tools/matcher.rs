use crate::tools::{CancelToken, ConsensusBuilder, NeighborMatcher, EXHAUSTIVE_TAU};
use crate::{RepquastError, Result};
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::Duration;
use tracing::debug;

/// External neighbor-graph builder executable.
#[derive(Debug)]
pub struct ExternalMatcher {
    binary_path: PathBuf,
    kmer_size: u32,
    strategy: u32,
    threads: usize,
    cancel: Option<CancelToken>,
}

impl ExternalMatcher {
    pub fn new(binary_path: PathBuf) -> Result<Self> {
        if !binary_path.exists() {
            return Err(RepquastError::Config(format!(
                "matcher binary not found at {}",
                binary_path.display()
            )));
        }

        Ok(Self {
            binary_path,
            kmer_size: 10,
            strategy: 3,
            threads: num_cpus::get(),
            cancel: None,
        })
    }

    pub fn with_kmer_size(mut self, kmer_size: u32) -> Self {
        self.kmer_size = kmer_size;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

impl NeighborMatcher for ExternalMatcher {
    fn run(&self, queries: &Path, targets: &Path, output: &Path, tau: u32) -> Result<()> {
        // Bounded search degenerates above the exhaustive threshold; the
        // candidate filter is switched off instead.
        let (tau, strategy) = if tau >= EXHAUSTIVE_TAU {
            (EXHAUSTIVE_TAU, 0)
        } else {
            (tau, self.strategy)
        };

        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("-i")
            .arg(queries)
            .arg("-r")
            .arg(targets)
            .arg("-o")
            .arg(output)
            .arg("-k")
            .arg(self.kmer_size.to_string())
            .arg("--tau")
            .arg(tau.to_string())
            .arg("-A")
            .arg(format!("--strategy={strategy}"))
            .arg("--threads")
            .arg(self.threads.to_string());

        run_checked(cmd, "neighbor matcher", self.cancel.as_ref())
    }
}

/// External consensus-builder executable.
pub struct ExternalConsensusBuilder {
    binary_path: PathBuf,
    cancel: Option<CancelToken>,
}

impl ExternalConsensusBuilder {
    pub fn new(binary_path: PathBuf) -> Result<Self> {
        if !binary_path.exists() {
            return Err(RepquastError::Config(format!(
                "consensus binary not found at {}",
                binary_path.display()
            )));
        }
        Ok(Self {
            binary_path,
            cancel: None,
        })
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

impl ConsensusBuilder for ExternalConsensusBuilder {
    fn run(&self, reads: &Path, rcm: &Path, output: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("-i")
            .arg(reads)
            .arg("-R")
            .arg(rcm)
            .arg("-o")
            .arg(output)
            .arg("-H");

        run_checked(cmd, "consensus builder", self.cancel.as_ref())
    }
}

fn command_line(cmd: &Command) -> String {
    let mut line = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

/// Run a subprocess to completion, polling the cancellation token. On
/// cancellation the child is killed and `Cancelled` is returned; the caller
/// owns any temp-file cleanup via scope guards.
fn run_checked(mut cmd: Command, tool: &str, cancel: Option<&CancelToken>) -> Result<()> {
    let command = command_line(&cmd);
    debug!("running {tool}: {command}");

    let mut child = cmd.spawn().map_err(|e| RepquastError::ExternalTool {
        tool: tool.to_string(),
        command: command.clone(),
        code: Some(e.raw_os_error().unwrap_or(-1)),
    })?;

    let status = wait_cancellable(&mut child, cancel)?;

    if !status.success() {
        return Err(RepquastError::ExternalTool {
            tool: tool.to_string(),
            command,
            code: status.code(),
        });
    }

    Ok(())
}

fn wait_cancellable(
    child: &mut Child,
    cancel: Option<&CancelToken>,
) -> Result<std::process::ExitStatus> {
    loop {
        if let Some(token) = cancel {
            if token.is_cancelled() {
                child.kill().ok();
                child.wait().ok();
                return Err(RepquastError::Cancelled);
            }
        }

        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}
