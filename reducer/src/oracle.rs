use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use ir::Formula;
use log::{debug, info, warn};
use wait_timeout::ChildExt;

use crate::ReduceError;

/// Result of one run of the oracle command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Exit code, `None` if the process was ended by a signal.
    Exited(Option<i32>),
    TimedOut,
}

/// Decides whether the scratch file still shows the behaviour of the
/// original input.
pub trait Oracle {
    /// Runs on the unmodified input and records the baseline.
    fn golden(&mut self) -> Result<RunOutcome, ReduceError>;

    /// Whether the current scratch file reproduces the baseline.
    /// `candidate` is the formula it was written from.
    fn test(&mut self, candidate: &Formula) -> Result<bool, ReduceError>;

    /// Number of runs so far, the golden run included.
    fn runs(&self) -> usize;
}

/// Runs an external command with a fixed scratch path.
///
/// The command is executed unchanged; it is expected to read the scratch
/// file, whose path is also exported as `DDSMT_SCRATCH`.
pub struct CommandOracle {
    cmd: Vec<String>,
    timeout: Option<Duration>,
    scratch: PathBuf,
    golden: Option<RunOutcome>,
    runs: usize,
}

impl CommandOracle {
    pub fn new(cmd: Vec<String>, timeout: Option<Duration>, scratch: &Path) -> CommandOracle {
        CommandOracle { cmd, timeout, scratch: scratch.to_path_buf(), golden: None, runs: 0 }
    }

    pub fn golden_outcome(&self) -> Option<RunOutcome> {
        self.golden
    }

    fn launch_error(&self, source: io::Error) -> ReduceError {
        ReduceError::Launch { cmd: self.cmd.join(" "), source }
    }

    /// Spawns the command and waits for it on a control thread, killing it
    /// once the timeout has elapsed.
    fn run(&mut self) -> Result<RunOutcome, ReduceError> {
        self.runs += 1;
        let (program, args) = self
            .cmd
            .split_first()
            .ok_or_else(|| self.launch_error(io::Error::new(io::ErrorKind::InvalidInput, "empty command")))?;
        let mut child = Command::new(program)
            .args(args)
            .env("DDSMT_SCRATCH", &self.scratch)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.launch_error(e))?;

        let timeout = self.timeout;
        let control = thread::spawn(move || -> io::Result<RunOutcome> {
            let status = match timeout {
                None => Some(child.wait()?),
                Some(t) => child.wait_timeout(t)?,
            };
            match status {
                Some(status) => Ok(RunOutcome::Exited(status.code())),
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    Ok(RunOutcome::TimedOut)
                }
            }
        });
        let outcome = control
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "oracle control thread panicked"))??;
        debug!("run {}: {:?}", self.runs, outcome);
        Ok(outcome)
    }
}

impl Oracle for CommandOracle {
    fn golden(&mut self) -> Result<RunOutcome, ReduceError> {
        let outcome = self.run()?;
        if outcome == RunOutcome::TimedOut {
            return Err(ReduceError::GoldenTimeout);
        }
        match outcome {
            RunOutcome::Exited(Some(code)) => info!("golden exit: {}", code),
            _ => info!("golden exit: killed by signal"),
        }
        self.golden = Some(outcome);
        Ok(outcome)
    }

    fn test(&mut self, _candidate: &Formula) -> Result<bool, ReduceError> {
        let outcome = self.run()?;
        if outcome == RunOutcome::TimedOut {
            warn!("timeout: process terminated");
            return Ok(false);
        }
        Ok(Some(outcome) == self.golden)
    }

    fn runs(&self) -> usize {
        self.runs
    }
}
