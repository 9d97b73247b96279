//! Separator backed by a spleeter-compatible command line tool
//!
//! Runs `<program> [launcher args] separate -p spleeter:2stems -o <output_dir> <input>`
//! and picks up `<output_dir>/<input stem>/vocals.wav` and `accompaniment.wav`.

use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{StemPaths, StemSeparator};
use crate::error::{Result, SpectraError};

/// Model preset passed to the tool
pub const TWO_STEMS_PRESET: &str = "spleeter:2stems";

const VOCALS_FILE: &str = "vocals.wav";
const ACCOMPANIMENT_FILE: &str = "accompaniment.wav";

/// How much of the tool's stderr to keep in error messages
const STDERR_TAIL: usize = 2000;

/// How often a running tool is checked against its deadline
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Invokes an external separation executable
#[derive(Debug, Clone)]
pub struct CommandSeparator {
    program: PathBuf,
    launcher_args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandSeparator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            launcher_args: Vec::new(),
            timeout: None,
        }
    }

    /// Parse a whitespace separated command line such as
    /// `python -m spleeter`. Returns `None` for a blank string.
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).with_launcher_args(parts.map(str::to_string).collect()))
    }

    /// Arguments placed between the program and `separate`
    pub fn with_launcher_args(mut self, args: Vec<String>) -> Self {
        self.launcher_args = args;
        self
    }

    /// Kill the tool if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Directory the tool writes stems into for `input`
    fn stem_dir(input: &Path, output_dir: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| "input".into());
        output_dir.join(stem)
    }

    /// Wait for the child, killing it once the deadline passes
    fn wait_with_deadline(&self, child: &mut Child) -> Result<ExitStatus> {
        let Some(timeout) = self.timeout else {
            return Ok(child.wait()?);
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                if let Err(e) = child.kill() {
                    warn!(program = %self.program.display(), error = %e, "failed to kill separator");
                }
                // Reap it so no zombie is left behind
                let _ = child.wait();
                return Err(SpectraError::Timeout {
                    timeout_secs: timeout.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Last `STDERR_TAIL` characters of the tool's stderr
fn stderr_tail(stderr: &str) -> String {
    let skip = stderr.chars().count().saturating_sub(STDERR_TAIL);
    stderr.chars().skip(skip).collect::<String>().trim().to_string()
}

impl StemSeparator for CommandSeparator {
    fn name(&self) -> &str {
        "command"
    }

    fn separate(&self, input: &Path, output_dir: &Path) -> Result<StemPaths> {
        debug!(
            program = %self.program.display(),
            input = %input.display(),
            "running separator"
        );

        let mut child = Command::new(&self.program)
            .args(&self.launcher_args)
            .arg("separate")
            .args(["-p", TWO_STEMS_PRESET])
            .arg("-o")
            .arg(output_dir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                    SpectraError::SeparationUnavailable {
                        reason: format!("cannot run {}: {}", self.program.display(), e),
                    }
                }
                _ => SpectraError::SeparationFailed {
                    reason: format!("failed to start {}: {}", self.program.display(), e),
                },
            })?;

        // Drain stderr on its own thread so a chatty tool cannot fill the pipe
        // and stall. On timeout the reader is left to finish on its own.
        let stderr = child.stderr.take();
        let stderr_reader = thread::spawn(move || {
            let mut text = String::new();
            if let Some(mut pipe) = stderr {
                let _ = pipe.read_to_string(&mut text);
            }
            text
        });

        let status = self.wait_with_deadline(&mut child)?;

        if !status.success() {
            let stderr = stderr_reader.join().unwrap_or_default();
            return Err(SpectraError::SeparationFailed {
                reason: format!(
                    "{} exited with {}: {}",
                    self.program.display(),
                    status,
                    stderr_tail(&stderr)
                ),
            });
        }

        let dir = Self::stem_dir(input, output_dir);
        let stems = StemPaths {
            vocals: dir.join(VOCALS_FILE),
            instrumental: dir.join(ACCOMPANIMENT_FILE),
        };

        for path in [&stems.vocals, &stems.instrumental] {
            if !path.is_file() {
                return Err(SpectraError::SeparationFailed {
                    reason: format!("expected output {} was not produced", path.display()),
                });
            }
        }

        Ok(stems)
    }
}
