use crate::config::LintConfig;
use crate::BoxError;
use std::io::{self, Write};
use std::process::{ChildStdin, Command, ExitStatus, Stdio};
use std::thread;
use thiserror::Error;
use tracing::{debug, info};

/// Candidate policy content handed to the lint engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LintRequest<'a> {
    pub content: &'a str,
    /// Print the parsed rules on success.
    pub show: bool,
    /// Parse as an include fragment (no service column).
    pub include_service: bool,
}

/// Static analysis of policy content. The grammar is owned by the engine.
pub trait PolicyLinter: Send + Sync {
    fn parse(&self, request: &LintRequest<'_>) -> Result<(), BoxError>;
}

#[derive(Debug, Error)]
pub enum LintFailure {
    #[error("Failed to run lint command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Lint command exited with {status}: {stderr}")]
    Rejected { status: ExitStatus, stderr: String },
}

/// Lints by running `qubes-policy-lint` (or a configured replacement) with
/// the content on stdin.
#[derive(Debug, Clone)]
pub struct CommandLinter {
    command: String,
    args: Vec<String>,
    show_flag: String,
    include_service_flag: String,
}

impl CommandLinter {
    pub fn new(command: impl Into<String>) -> Self {
        Self::from_config(&LintConfig {
            command: command.into(),
            ..LintConfig::default()
        })
    }

    pub fn from_config(config: &LintConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            show_flag: config.show_flag.clone(),
            include_service_flag: config.include_service_flag.clone(),
        }
    }

    /// Full argument list for `request`; the last argument is `-` (stdin).
    pub fn arguments(&self, request: &LintRequest<'_>) -> Vec<String> {
        let mut args = self.args.clone();
        if request.show {
            args.push(self.show_flag.clone());
        }
        if request.include_service {
            args.push(self.include_service_flag.clone());
        }
        args.push("-".to_string());
        args
    }

    fn run(&self, request: &LintRequest<'_>) -> Result<(), LintFailure> {
        let spawn_error = |source| LintFailure::Spawn {
            command: self.command.clone(),
            source,
        };

        let args = self.arguments(request);
        debug!(command = %self.command, ?args, "running lint command");

        let mut child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // Feed stdin from its own thread while stdout and stderr are drained,
        // so neither side can stall on a full pipe.
        let content = request.content.as_bytes();
        let stdin = child.stdin.take();
        let (output, written) = thread::scope(|scope| {
            let writer = stdin.map(|mut stdin| scope.spawn(move || feed(&mut stdin, content)));
            let output = child.wait_with_output();
            let written = match writer {
                Some(writer) => writer.join().unwrap_or_else(|_| {
                    Err(io::Error::new(io::ErrorKind::Other, "stdin writer panicked"))
                }),
                None => Ok(()),
            };
            (output, written)
        });
        let output = output.map_err(spawn_error)?;
        written.map_err(spawn_error)?;

        if !output.status.success() {
            return Err(LintFailure::Rejected {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if request.show && !output.stdout.is_empty() {
            info!("{}", String::from_utf8_lossy(&output.stdout).trim_end());
        }
        Ok(())
    }
}

/// Write the whole of `content`, then close stdin. The exit status decides
/// the outcome, so a command that stops reading early is not an error here.
fn feed(stdin: &mut ChildStdin, content: &[u8]) -> io::Result<()> {
    match stdin.write_all(content) {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

impl Default for CommandLinter {
    fn default() -> Self {
        Self::from_config(&LintConfig::default())
    }
}

impl PolicyLinter for CommandLinter {
    fn parse(&self, request: &LintRequest<'_>) -> Result<(), BoxError> {
        Ok(self.run(request)?)
    }
}
