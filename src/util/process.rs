//! Subprocess execution utilities.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use crate::core::error::{InteropError, Result};

/// Where a child process reads its standard input from.
#[derive(Debug, Clone)]
enum StdinSource {
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    stdin: Option<StdinSource>,
}

/// Exit status plus captured output, stdout lines first.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub lines: Vec<String>,
    pub stdout: Vec<u8>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            stdin: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set stdin data.
    pub fn stdin(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(StdinSource::Bytes(data.into()));
        self
    }

    /// Redirect stdin from a file.
    pub fn stdin_file(mut self, path: impl AsRef<Path>) -> Self {
        self.stdin = Some(StdinSource::File(path.as_ref().to_path_buf()));
        self
    }

    /// Execute the command and wait for completion.
    pub fn exec(&self) -> Result<ProcessOutput> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        match &self.stdin {
            Some(StdinSource::Bytes(_)) => {
                cmd.stdin(Stdio::piped());
            }
            Some(StdinSource::File(path)) => {
                let file = File::open(path).map_err(|e| InteropError::io(path, e))?;
                cmd.stdin(Stdio::from(file));
            }
            None => {
                cmd.stdin(Stdio::null());
            }
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| InteropError::io(&self.program, e))?;

        // Feed stdin from its own thread so a child that fills its stdout
        // pipe before reading all input cannot block us.
        let writer = match (&self.stdin, child.stdin.take()) {
            (Some(StdinSource::Bytes(data)), Some(mut stdin)) => {
                let data = data.clone();
                Some(thread::spawn(move || stdin.write_all(&data)))
            }
            _ => None,
        };

        let output = child
            .wait_with_output()
            .map_err(|e| InteropError::io(&self.program, e))?;

        if let Some(writer) = writer {
            let written = writer.join().unwrap_or_else(|_| {
                Err(io::Error::new(io::ErrorKind::Other, "stdin writer panicked"))
            });
            match written {
                // The child exited without reading everything; its status decides.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(InteropError::io(&self.program, e)),
                Ok(()) => {}
            }
        }

        let lines = String::from_utf8_lossy(&output.stdout)
            .lines()
            .chain(String::from_utf8_lossy(&output.stderr).lines())
            .map(str::to_string)
            .collect();

        Ok(ProcessOutput {
            status: output.status,
            lines,
            stdout: output.stdout,
        })
    }

    /// Execute and require success.
    pub fn exec_and_check(&self) -> Result<ProcessOutput> {
        let output = self.exec()?;
        if !output.success() {
            return Err(InteropError::Process {
                command: self.display_command(),
                code: output.status.code(),
                output: output.lines,
            });
        }
        Ok(output)
    }

    /// Display the command for logs and error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        let mut line = parts.join(" ");
        if let Some(StdinSource::File(path)) = &self.stdin {
            line.push_str(&format!(" < {}", path.display()));
        }
        line
    }
}

/// Run a compiler or linker command.
///
/// In verbose mode the command line and the tool's output are echoed to
/// stdout. A non-zero exit is a fatal process error carrying the output.
pub fn run_cmd(cmd: &ProcessBuilder, verbose: bool) -> Result<ProcessOutput> {
    if verbose {
        println!("COMMAND: {}", cmd.display_command());
    }
    tracing::debug!("running {}", cmd.display_command());

    let output = cmd.exec_and_check()?;
    if verbose {
        for line in &output.lines {
            println!("{}", line);
        }
    }
    Ok(output)
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}
