#![allow(dead_code)]
use move_e::e_runner::{ProcessOutcome, ProcessRunner};
use move_e::{CommandSpec, Error, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::io::Result as IoResult;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use tempfile::{tempdir, TempDir};

/// A wrapper around a temporary Move package.
pub struct TestProject {
    /// The temporary directory. When this is dropped, the directory and its contents are removed.
    pub temp_dir: TempDir,
    /// The package root, containing Move.toml.
    pub root: PathBuf,
}

impl TestProject {
    /// Create a new package with the given name and one module under `sources/`.
    pub fn new(package_name: &str) -> IoResult<Self> {
        let temp_dir = tempdir()?;
        let root = temp_dir.path().join(package_name);
        fs::create_dir_all(root.join("sources"))?;
        fs::write(
            root.join("Move.toml"),
            format!(
                "[package]\nname = \"{}\"\nversion = \"0.0.1\"\n\n[addresses]\n{} = \"_\"\n",
                package_name, package_name
            ),
        )?;
        fs::write(
            root.join("sources").join("main.move"),
            format!("module {}::main {{\n    public fun hello(): u64 {{ 1 }}\n}}\n", package_name),
        )?;
        Ok(TestProject { temp_dir, root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Writes an executable shell script standing in for `aptos`.
    #[cfg(unix)]
    pub fn fake_aptos(&self, script: &str) -> IoResult<PathBuf> {
        use std::os::unix::fs::PermissionsExt;
        let path = self.temp_dir.path().join("fake-aptos");
        fs::write(&path, format!("#!/bin/sh\n{}\n", script))?;
        let mut perms = fs::metadata(&path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms)?;
        Ok(path)
    }
}

/// A process runner that never starts anything.
///
/// Outcomes queued with [`ScriptedRunner::queue`] are delivered immediately on
/// launch; with nothing queued the run stays in flight until [`ScriptedRunner::finish`].
#[derive(Default)]
pub struct ScriptedRunner {
    pub launched: RefCell<Vec<CommandSpec>>,
    queued: RefCell<VecDeque<ProcessOutcome>>,
    pending: RefCell<VecDeque<Sender<ProcessOutcome>>>,
    fail_launch: bool,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        ScriptedRunner {
            fail_launch: true,
            ..Self::default()
        }
    }

    pub fn queue(self, outcome: ProcessOutcome) -> Self {
        self.queued.borrow_mut().push_back(outcome);
        self
    }

    /// Completes the oldest run still in flight.
    pub fn finish(&self, outcome: ProcessOutcome) {
        if let Some(tx) = self.pending.borrow_mut().pop_front() {
            tx.send(outcome).unwrap();
        }
    }

    pub fn launch_count(&self) -> usize {
        self.launched.borrow().len()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn launch(&self, spec: CommandSpec) -> Result<Receiver<ProcessOutcome>> {
        if self.fail_launch {
            return Err(Error::ProcessLaunch {
                program: spec.program,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not installed"),
            });
        }
        self.launched.borrow_mut().push(spec);
        let (tx, rx) = mpsc::channel();
        match self.queued.borrow_mut().pop_front() {
            Some(outcome) => tx.send(outcome).unwrap(),
            None => self.pending.borrow_mut().push_back(tx),
        }
        Ok(rx)
    }
}

pub fn lines(text: &[&str]) -> Vec<String> {
    text.iter().map(|s| s.to_string()).collect()
}
