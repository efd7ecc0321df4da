//! Drives one logical action from trigger to rendered diagnostics.
//!
//! Per action kind: `Idle -> Running -> {Succeeded, Failed, TimedOut} -> Idle`.
//! A trigger while the same kind is running is rejected; nothing is queued.

use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use crate::e_classifier::classify;
use crate::e_command_builder::{Action, ActionKind, AptosCommandBuilder, CommandSpec};
use crate::e_config::Config;
use crate::e_error::{Error, Result};
use crate::e_manifest::{find_project_root, read_package_name};
use crate::e_runner::{ProcessExit, ProcessOutcome, ProcessRunner};
use crate::e_sink::{BufferId, DiagnosticSink, Notification};
use crate::e_success::{parse_stdout, Summary};
use crate::e_types::{ClassificationResult, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Idle,
    Running,
}

/// How a finished run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Succeeded,
    Failed,
    TimedOut,
}

/// Everything known about one finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub action: Action,
    pub command: String,
    pub state: RunState,
    pub exit_code: Option<i32>,
    pub diagnostics: ClassificationResult,
    pub summary: Summary,
    pub notification: Notification,
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
}

struct InFlight {
    action: Action,
    root: Option<PathBuf>,
    command: String,
    buffer: BufferId,
    started_at: DateTime<Local>,
    rx: Receiver<ProcessOutcome>,
}

pub struct Coordinator<R: ProcessRunner, S: DiagnosticSink> {
    config: Config,
    runner: R,
    sink: S,
    cwd: PathBuf,
    package_dir: Option<PathBuf>,
    in_flight: HashMap<ActionKind, InFlight>,
    last: HashMap<ActionKind, RunReport>,
}

impl<R: ProcessRunner, S: DiagnosticSink> Coordinator<R, S> {
    pub fn new(config: Config, runner: R, sink: S, cwd: impl Into<PathBuf>) -> Self {
        Coordinator {
            config,
            runner,
            sink,
            cwd: cwd.into(),
            package_dir: None,
            in_flight: HashMap::new(),
            last: HashMap::new(),
        }
    }

    /// Use `dir` as the package directory instead of searching for `Move.toml`.
    pub fn with_package_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.package_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn state(&self, kind: ActionKind) -> ActionState {
        if self.in_flight.contains_key(&kind) {
            ActionState::Running
        } else {
            ActionState::Idle
        }
    }

    pub fn last_report(&self, kind: ActionKind) -> Option<&RunReport> {
        self.last.get(&kind)
    }

    fn package_root(&self, start: &Path) -> Result<PathBuf> {
        match &self.package_dir {
            Some(dir) => find_project_root(dir),
            None => find_project_root(start),
        }
    }

    /// Builds the command for `action` without running it.
    pub fn command_for(&self, action: &Action) -> Result<CommandSpec> {
        let root = if action.requires_project() {
            Some(self.package_root(&self.cwd)?)
        } else {
            None
        };
        let exec_dir = root.clone().unwrap_or_else(|| self.cwd.clone());
        let mut builder = AptosCommandBuilder::new(&self.config.aptos, exec_dir)
            .with_timeout(self.config.timeout)
            .with_profile(self.config.profile.clone())
            .with_action(action, root.as_deref());
        if self.config.assume_yes && action.prompts() {
            builder = builder.with_extra_args(&["--assume-yes".to_string()]);
        }
        Ok(builder.build())
    }

    /// Starts `action`. Precondition failures and launch failures are reported
    /// to the sink and returned before any process runs.
    pub fn launch(&mut self, action: Action) -> Result<ActionKind> {
        let kind = action.kind();
        if self.in_flight.contains_key(&kind) {
            self.sink
                .notify(&Notification::warn(format!("{} already running", kind)));
            return Err(Error::AlreadyRunning(kind));
        }
        let spec = match self.command_for(&action) {
            Ok(spec) => spec,
            Err(e) => {
                self.sink.notify(&Notification::error(e.to_string()));
                return Err(e);
            }
        };
        let command = spec.display_line();
        let buffer = BufferId(spec.cwd.display().to_string());
        let root = action.requires_project().then(|| spec.cwd.clone());
        log::info!("{}: {}", kind, command);
        let rx = match self.runner.launch(spec) {
            Ok(rx) => rx,
            Err(e) => {
                self.sink.notify(&Notification::error(e.to_string()));
                return Err(e);
            }
        };
        self.sink
            .notify(&Notification::info(format!("{} started: {}", kind, command)));
        self.in_flight.insert(
            kind,
            InFlight {
                action,
                root,
                command,
                buffer,
                started_at: Local::now(),
                rx,
            },
        );
        Ok(kind)
    }

    /// Handles every run that has finished since the last call, without blocking.
    pub fn poll(&mut self) -> Vec<RunReport> {
        let mut done = Vec::new();
        for (kind, flight) in &self.in_flight {
            match flight.rx.try_recv() {
                Ok(outcome) => done.push((*kind, Some(outcome))),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => done.push((*kind, None)),
            }
        }
        let mut reports = Vec::new();
        for (kind, outcome) in done {
            let Some(flight) = self.in_flight.remove(&kind) else {
                continue;
            };
            match outcome {
                Some(outcome) => reports.push(self.complete(flight, outcome)),
                None => {
                    let e = Error::ChannelClosed(kind);
                    log::error!("{}", e);
                    self.sink.notify(&Notification::error(e.to_string()));
                }
            }
        }
        reports
    }

    /// Blocks until the running `kind` finishes and handles it.
    pub fn wait(&mut self, kind: ActionKind) -> Result<RunReport> {
        let flight = self
            .in_flight
            .remove(&kind)
            .ok_or(Error::NotRunning(kind))?;
        match flight.rx.recv() {
            Ok(outcome) => Ok(self.complete(flight, outcome)),
            Err(_) => {
                let e = Error::ChannelClosed(kind);
                self.sink.notify(&Notification::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Launches `action` and waits for it.
    pub fn run(&mut self, action: Action) -> Result<RunReport> {
        let kind = self.launch(action)?;
        self.wait(kind)
    }

    fn complete(&mut self, flight: InFlight, outcome: ProcessOutcome) -> RunReport {
        let kind = flight.action.kind();
        // stderr is classified on success too: a clean exit can still carry warnings.
        let diagnostics = classify(&outcome.stderr, &self.config.patterns);
        let mut summary = parse_stdout(&flight.action, &outcome.stdout, &outcome.stderr);
        if let Summary::Built { package, .. } = &mut summary {
            if package.is_none() {
                *package = flight.root.as_deref().and_then(read_package_name);
            }
        }
        let state = match outcome.exit {
            ProcessExit::Exited(Some(0)) => RunState::Succeeded,
            ProcessExit::TimedOut => RunState::TimedOut,
            ProcessExit::Exited(_) | ProcessExit::Interrupted => RunState::Failed,
        };
        let notification = notification_for(kind, state, &outcome, &diagnostics, &self.config);
        log::debug!(
            "{} finished: {:?}, {} diagnostic(s)",
            kind,
            state,
            diagnostics.len()
        );

        self.sink.publish(&flight.buffer, &diagnostics);
        self.sink.notify(&notification);
        if let Summary::ParseFailure { reason } = &summary {
            self.sink.notify(&Notification::warn(format!(
                "could not parse {} output: {}",
                kind, reason
            )));
        }

        let report = RunReport {
            action: flight.action,
            command: flight.command,
            state,
            exit_code: outcome.exit_code(),
            diagnostics,
            summary,
            notification,
            started_at: flight.started_at,
            elapsed: outcome.elapsed,
        };
        self.last.insert(kind, report.clone());
        report
    }
}

fn notification_for(
    kind: ActionKind,
    state: RunState,
    outcome: &ProcessOutcome,
    diagnostics: &ClassificationResult,
    config: &Config,
) -> Notification {
    match state {
        RunState::Succeeded => {
            if diagnostics.is_empty() {
                Notification::info(format!("{} succeeded", kind))
            } else {
                Notification::warn(format!(
                    "{} succeeded with {} warning(s); see diagnostics",
                    kind,
                    diagnostics.severity_count(Severity::Warn)
                ))
            }
        }
        RunState::Failed if outcome.exit == ProcessExit::Interrupted => {
            Notification::error(format!("{} interrupted", kind))
        }
        RunState::Failed => {
            let code = outcome
                .exit_code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            Notification::error(format!(
                "{} failed (exit {}): {} diagnostic(s), see diagnostics list",
                kind,
                code,
                diagnostics.len()
            ))
        }
        RunState::TimedOut => Notification::error(format!(
            "{} timed out after {}s",
            kind,
            config.timeout.as_secs()
        )),
    }
}
