//! # External Command Execution
//!
//! Every `git` and `tar` invocation goes through this module. A command is
//! described by a [`CommandSpec`]; running it returns a [`CommandOutput`]
//! whose captured streams are named optional fields, so a caller asks only
//! for what it needs via [`Capture`] and checks the exit status explicitly.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use log::debug;

use crate::config::Settings;
use crate::error::{Error, Result};

/// A command line to run, with an optional working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }
}

impl fmt::Display for CommandSpec {
    /// Render the command the way it would be typed in a shell.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

fn shell_quote(s: &OsStr) -> String {
    let s = s.to_string_lossy();
    let plain = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:^{}@+,".contains(c));
    if plain {
        s.into_owned()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// Which output streams to capture. Uncaptured streams are inherited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capture {
    pub stdout: bool,
    pub stderr: bool,
}

impl Capture {
    pub const NONE: Capture = Capture {
        stdout: false,
        stderr: false,
    };
    pub const STDOUT: Capture = Capture {
        stdout: true,
        stderr: false,
    };
    pub const ALL: Capture = Capture {
        stdout: true,
        stderr: true,
    };
}

/// Result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    /// Captured standard output, `None` when not requested.
    pub stdout: Option<String>,
    /// Captured standard error, `None` when not requested.
    pub stderr: Option<String>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Turn a non-zero exit into [`Error::ExternalProcess`].
    pub fn require_success(self, spec: &CommandSpec) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::ExternalProcess {
                command: spec.to_string(),
                code: self.status.code(),
                stderr: self.stderr,
            })
        }
    }

    /// Captured stdout, or an empty string when it was not captured.
    pub fn stdout_str(&self) -> &str {
        self.stdout.as_deref().unwrap_or("")
    }
}

/// Run a command to completion, capturing the requested streams.
pub fn run(spec: &CommandSpec, capture: Capture, settings: Settings) -> Result<CommandOutput> {
    if settings.debug {
        debug!("running: {}", spec);
    }
    let mut cmd = spec.to_command();
    cmd.stdin(Stdio::null());
    cmd.stdout(if capture.stdout {
        Stdio::piped()
    } else {
        Stdio::inherit()
    });
    cmd.stderr(if capture.stderr {
        Stdio::piped()
    } else {
        Stdio::inherit()
    });

    let output = cmd.output().map_err(|e| Error::ProcessSpawn {
        command: spec.to_string(),
        message: e.to_string(),
    })?;

    Ok(CommandOutput {
        status: output.status,
        stdout: capture
            .stdout
            .then(|| String::from_utf8_lossy(&output.stdout).into_owned()),
        stderr: capture
            .stderr
            .then(|| String::from_utf8_lossy(&output.stderr).into_owned()),
    })
}

/// Start a command without waiting for it. Output streams are inherited.
pub fn spawn(spec: &CommandSpec, settings: Settings) -> Result<Child> {
    if settings.debug {
        debug!("running: {}", spec);
    }
    spec.to_command()
        .stdin(Stdio::null())
        .spawn()
        .map_err(|e| Error::ProcessSpawn {
            command: spec.to_string(),
            message: e.to_string(),
        })
}
