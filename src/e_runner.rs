use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use which::which;

#[cfg(unix)]
use {
    nix::sys::signal::{killpg, Signal},
    nix::unistd::Pid,
    std::os::unix::process::CommandExt,
};

use crate::e_command_builder::CommandSpec;
use crate::e_error::{Error, Result};

/// Set by the Ctrl+C handler; running children are killed when they next get polled.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

const POLL: Duration = Duration::from_millis(50);

/// How long output is still collected after the child is gone. Anything that
/// inherited the pipes and keeps them open past this is cut off.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Registers a global Ctrl+C handler once.
/// The handler flags the running child for termination; with no child running it exits.
pub fn register_ctrlc_handler(child_running: &'static AtomicBool) -> Result<()> {
    ctrlc::set_handler(move || {
        if child_running.load(Ordering::SeqCst) {
            eprintln!("Ctrl+C pressed, terminating running child process...");
            INTERRUPTED.store(true, Ordering::SeqCst);
        } else {
            eprintln!("Ctrl+C pressed, no child process running. Exiting nicely.");
            std::process::exit(130);
        }
    })
    .map_err(|e| Error::Config(format!("cannot install Ctrl+C handler: {}", e)))
}

/// How a finished process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    /// Exited on its own. `None` when it was killed by a signal.
    Exited(Option<i32>),
    TimedOut,
    Interrupted,
}

/// Buffered result of one process invocation; delivered once, after exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub exit: ProcessExit,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub elapsed: Duration,
}

impl ProcessOutcome {
    pub fn exited(code: i32, stdout: Vec<String>, stderr: Vec<String>) -> Self {
        ProcessOutcome {
            exit: ProcessExit::Exited(Some(code)),
            stdout,
            stderr,
            elapsed: Duration::ZERO,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self.exit {
            ProcessExit::Exited(code) => code,
            _ => None,
        }
    }
}

/// Starts external processes. `launch` returns as soon as the process is
/// running; the outcome arrives on the returned channel.
pub trait ProcessRunner {
    fn launch(&self, spec: CommandSpec) -> Result<Receiver<ProcessOutcome>>;
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone)]
pub struct SystemRunner {
    running: Option<&'static AtomicBool>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps `flag` set while a child is alive, for [`register_ctrlc_handler`].
    pub fn with_running_flag(mut self, flag: &'static AtomicBool) -> Self {
        self.running = Some(flag);
        self
    }
}

/// Resolves `program` to an executable path, searching `PATH` for bare names.
pub fn resolve_program(program: &Path) -> Result<PathBuf> {
    if program.components().count() > 1 {
        if program.is_file() {
            return Ok(program.to_path_buf());
        }
        return Err(Error::ExecutableNotFound {
            program: program.display().to_string(),
            reason: "no such file".to_string(),
        });
    }
    which(program).map_err(|e| Error::ExecutableNotFound {
        program: program.display().to_string(),
        reason: e.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Forwards every line of `stream` until EOF. Bytes that are not UTF-8 are
/// replaced, so one bad line never stops the drain.
fn forward_lines<R: Read + Send + 'static>(
    stream: R,
    kind: Stream,
    tx: Sender<(Stream, String)>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    while matches!(buf.last(), Some(b'\n' | b'\r')) {
                        buf.pop();
                    }
                    // Keep reading after the receiver is gone so the writer never sees EPIPE.
                    let _ = tx.send((kind, String::from_utf8_lossy(&buf).into_owned()));
                }
                Err(e) => {
                    log::debug!("stopped reading {:?}: {}", kind, e);
                    break;
                }
            }
        }
    })
}

/// Kills the child and everything in its process group.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        let pgid = Pid::from_raw(child.id() as i32);
        if let Err(e) = killpg(pgid, Signal::SIGKILL) {
            log::debug!("killpg {} failed: {}", pgid, e);
            let _ = child.kill();
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.kill();
    }
    let _ = child.wait();
}

/// Collects forwarded lines until both streams close or `deadline` passes.
fn drain(lines: Receiver<(Stream, String)>, deadline: Instant) -> (Vec<String>, Vec<String>) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match lines.recv_timeout(left) {
            Ok((Stream::Stdout, line)) => stdout.push(line),
            Ok((Stream::Stderr, line)) => stderr.push(line),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("output pipes still open after the child exited; dropping the rest");
                break;
            }
        }
    }
    (stdout, stderr)
}

impl ProcessRunner for SystemRunner {
    fn launch(&self, spec: CommandSpec) -> Result<Receiver<ProcessOutcome>> {
        let program = resolve_program(&spec.program)?;
        log::debug!("launching {} in {}", spec.display_line(), spec.cwd.display());

        let mut command = Command::new(&program);
        command
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group: killing it on timeout also ends git fetches aptos started.
        #[cfg(unix)]
        command.process_group(0);
        let mut child = command.spawn().map_err(|source| Error::ProcessLaunch {
            program: program.clone(),
            source,
        })?;

        let (line_tx, line_rx) = mpsc::channel();
        if let Some(out) = child.stdout.take() {
            forward_lines(out, Stream::Stdout, line_tx.clone());
        }
        if let Some(err) = child.stderr.take() {
            forward_lines(err, Stream::Stderr, line_tx.clone());
        }
        drop(line_tx);
        let running = self.running;
        if let Some(flag) = running {
            INTERRUPTED.store(false, Ordering::SeqCst);
            flag.store(true, Ordering::SeqCst);
        }

        let (tx, rx) = mpsc::channel();
        let timeout = spec.timeout;
        thread::spawn(move || {
            let start = Instant::now();
            let exit = loop {
                match child.try_wait() {
                    Ok(Some(status)) => break ProcessExit::Exited(status.code()),
                    Ok(None) => {}
                    Err(e) => {
                        log::error!("failed to wait for child: {}", e);
                        break ProcessExit::Exited(None);
                    }
                }
                if INTERRUPTED.load(Ordering::SeqCst) {
                    kill_tree(&mut child);
                    break ProcessExit::Interrupted;
                }
                if start.elapsed() >= timeout {
                    log::debug!("child exceeded {:?}, killing", timeout);
                    kill_tree(&mut child);
                    break ProcessExit::TimedOut;
                }
                thread::sleep(POLL);
            };
            let elapsed = start.elapsed();
            let grace = Instant::now() + DRAIN_GRACE;
            let deadline = match exit {
                ProcessExit::Exited(_) => grace.max(start + timeout),
                ProcessExit::TimedOut | ProcessExit::Interrupted => grace,
            };
            let (stdout, stderr) = drain(line_rx, deadline);
            if let Some(flag) = running {
                flag.store(false, Ordering::SeqCst);
            }
            let outcome = ProcessOutcome {
                exit,
                stdout,
                stderr,
                elapsed,
            };
            log::debug!("child finished: {:?} after {:?}", outcome.exit, outcome.elapsed);
            // The receiver may already be gone if the caller stopped caring.
            let _ = tx.send(outcome);
        });
        Ok(rx)
    }
}
