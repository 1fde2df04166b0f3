//! The clasp child process.
//!
//! The ground program goes in on standard input through a writer
//! thread while a reader thread drains standard output, so that
//! neither side can block on a full pipe. [`ClaspProcess::solve`]
//! closes the input and waits for the output, killing the process if
//! the deadline passes first.

use std::ffi::OsStr;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use aspify_tracer::*;

use super::SolverError;

/// How long to wait for the rest of the output after a kill.
const GRACE: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SolveMode {
    /// Enumerate at most `max_models` answer sets (0 = all of them).
    Enumerate { max_models: usize },
    /// Compute the cautious consequences: the intersection of all
    /// answer sets.
    Cautious,
}

impl Default for SolveMode {
    fn default() -> Self {
        Self::Enumerate { max_models: 0 }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClaspConfig {
    pub executable: PathBuf,
    pub mode: SolveMode,
    /// Wall-clock limit from spawn, including the time spent writing
    /// the program.
    pub timeout: Option<Duration>,
}

impl Default for ClaspConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("clasp"),
            mode: SolveMode::default(),
            timeout: None,
        }
    }
}

impl ClaspConfig {
    pub fn args(&self) -> Vec<String> {
        match self.mode {
            SolveMode::Enumerate { max_models } => vec![String::from("-n"), max_models.to_string()],
            SolveMode::Cautious => vec![String::from("-e"), String::from("cautious")],
        }
    }

    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.executable);
        command.args(self.args());
        command
    }
}

/// How the solver process ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// It exited by itself. clasp's exit code encodes the result
    /// (10 = satisfiable, 20 = unsatisfiable, ...), so a non-zero
    /// code is not an error. `None` means it was killed by a signal.
    Exited(Option<i32>),
    /// It was still running after this long, and was killed.
    TimedOut(Duration),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SolverOutput {
    pub text: String,
    pub outcome: Outcome,
}

/// The write end of the solver's standard input. Writes are queued for
/// a writer thread, so they never block on a full pipe.
pub struct SolverInput {
    chunks: Sender<Vec<u8>>,
}

impl Write for SolverInput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.chunks.send(buf.to_vec()).map_err(|_| {
            io::Error::new(io::ErrorKind::BrokenPipe, "solver stopped reading its input")
        })?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct ClaspProcess {
    program: String,
    child: Child,
    stdin: Option<SolverInput>,
    writer: Option<JoinHandle<io::Result<()>>>,
    output: Receiver<io::Result<String>>,
    reader: Option<JoinHandle<()>>,
    /// The timeout, and when it expires.
    deadline: Option<(Duration, Instant)>,
    trace: Trace,
}

impl ClaspProcess {
    pub fn spawn(config: &ClaspConfig, trace: Trace) -> Result<Self, SolverError> {
        Self::spawn_command(config.command(), config.timeout, trace)
    }

    /// Run an arbitrary command as the solver. The timeout runs from
    /// now, so it also bounds writing the program.
    pub fn spawn_command(
        mut command: Command,
        timeout: Option<Duration>,
        trace: Trace,
    ) -> Result<Self, SolverError> {
        let program = describe(&command);
        trace!(trace, Solve, "Spawning `{program}`");
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| SolverError::Spawn {
                program: program.clone(),
                source,
            })?;
        let deadline = timeout.map(|timeout| (timeout, Instant::now() + timeout));
        let mut stdin = child.stdin.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "solver has no standard input")
        })?;
        let mut stdout = child.stdout.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "solver has no standard output")
        })?;

        let (chunks, queued) = crossbeam_channel::unbounded::<Vec<u8>>();
        let writer = thread::spawn(move || -> io::Result<()> {
            for chunk in queued {
                stdin.write_all(&chunk)?;
            }
            // Dropping `stdin` here ends the solver's input.
            Ok(())
        });

        let (tx, output) = crossbeam_channel::bounded(1);
        let reader = thread::spawn(move || {
            let mut text = String::new();
            let result = stdout.read_to_string(&mut text).map(|_| text);
            // The receiver may be gone if the process was closed early.
            let _ = tx.send(result);
        });

        Ok(Self {
            program,
            child,
            stdin: Some(SolverInput { chunks }),
            writer: Some(writer),
            output,
            reader: Some(reader),
            deadline,
            trace,
        })
    }

    /// The solver's standard input, for writing the ground program.
    pub fn input(&mut self) -> Result<&mut SolverInput, SolverError> {
        self.stdin.as_mut().ok_or(SolverError::InputClosed)
    }

    /// Close the solver's input and collect its output, waiting at
    /// most until the deadline set at spawn.
    pub fn solve(mut self) -> Result<SolverOutput, SolverError> {
        drop(self.stdin.take());

        let (text, outcome) = match self.deadline {
            Some((timeout, deadline)) => match self.output.recv_deadline(deadline) {
                Ok(text) => (text?, None),
                Err(RecvTimeoutError::Timeout) => {
                    trace!(self.trace, Solve, "`{}` timed out after {timeout:?}", self.program);
                    self.kill()?;
                    let text = match self.output.recv_timeout(GRACE) {
                        Ok(text) => text?,
                        Err(_) => {
                            // Something else still holds the pipe open;
                            // leave the reader behind.
                            self.reader.take();
                            String::new()
                        }
                    };
                    // A write blocked on the full pipe fails once the
                    // solver is gone; nothing more is expected from it.
                    self.writer.take();
                    (text, Some(Outcome::TimedOut(timeout)))
                }
                Err(RecvTimeoutError::Disconnected) => return Err(SolverError::ReaderPanicked),
            },
            None => {
                let text = self.output.recv().map_err(|_| SolverError::ReaderPanicked)??;
                (text, None)
            }
        };

        let status = self.child.wait()?;
        if let Some(reader) = self.reader.take() {
            reader.join().map_err(|_| SolverError::ReaderPanicked)?;
        }
        if let Some(writer) = self.writer.take() {
            match writer.join().map_err(|_| SolverError::WriterPanicked)? {
                // The solver may stop reading once it has its answer.
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => return Err(e.into()),
                _ => (),
            }
        }
        let outcome = outcome.unwrap_or(Outcome::Exited(status.code()));
        trace!(self.trace, Solve, "`{}` finished: {outcome:?}", self.program);
        Ok(SolverOutput { text, outcome })
    }

    fn kill(&mut self) -> io::Result<()> {
        match self.child.kill() {
            // Already exited.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            result => result,
        }
    }

    /// Forcibly terminate the solver if it is still running.
    pub fn close(&mut self) -> Result<(), SolverError> {
        drop(self.stdin.take());
        if self.child.try_wait()?.is_none() {
            trace!(self.trace, Solve, "Killing `{}`", self.program);
            self.kill()?;
            self.child.wait()?;
        }
        Ok(())
    }
}

impl Drop for ClaspProcess {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            trace!(self.trace, Solve, "Unable to close `{}`: {e}", self.program);
        }
    }
}

fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(OsStr::to_string_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}
