use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::e_error::Error;

/// The aptos networks a profile can point at.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Network {
    Local,
    Devnet,
    Testnet,
    Mainnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Local => "local",
            Network::Devnet => "devnet",
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "local" => Ok(Network::Local),
            "devnet" => Ok(Network::Devnet),
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(Error::InvalidNetwork(other.to_string())),
        }
    }
}

/// A user-triggered operation on the current project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Build,
    Test,
    Publish,
    Init { network: Option<Network> },
    New { name: String },
    AddDependency { dependency: String },
    AccountList,
    NetworkSwitch { network: Network },
}

/// Identifies an action regardless of its parameters; at most one run per kind is in flight.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionKind {
    Build,
    Test,
    Publish,
    Init,
    New,
    AddDependency,
    AccountList,
    NetworkSwitch,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Build => "build",
            ActionKind::Test => "test",
            ActionKind::Publish => "publish",
            ActionKind::Init => "init",
            ActionKind::New => "new",
            ActionKind::AddDependency => "add-dependency",
            ActionKind::AccountList => "account-list",
            ActionKind::NetworkSwitch => "network-switch",
        };
        f.write_str(name)
    }
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Build => ActionKind::Build,
            Action::Test => ActionKind::Test,
            Action::Publish => ActionKind::Publish,
            Action::Init { .. } => ActionKind::Init,
            Action::New { .. } => ActionKind::New,
            Action::AddDependency { .. } => ActionKind::AddDependency,
            Action::AccountList => ActionKind::AccountList,
            Action::NetworkSwitch { .. } => ActionKind::NetworkSwitch,
        }
    }

    /// Whether aptos asks for confirmation on stdin before doing it.
    pub fn prompts(&self) -> bool {
        matches!(self, Action::Publish)
    }

    /// Whether the action only makes sense inside a Move package.
    pub fn requires_project(&self) -> bool {
        matches!(
            self,
            Action::Build | Action::Test | Action::Publish | Action::AddDependency { .. }
        )
    }
}

/// Everything needed to start one external process. Consumed by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

impl CommandSpec {
    /// The command line as a user would type it.
    pub fn display_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(' ') {
                line.push_str(&format!("\"{}\"", arg));
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

/// A builder that constructs an aptos command for a given action.
#[derive(Debug, Clone)]
pub struct AptosCommandBuilder {
    program: PathBuf,
    args: Vec<String>,
    execution_dir: PathBuf,
    timeout: Duration,
    profile: String,
}

impl AptosCommandBuilder {
    pub fn new(program: impl Into<PathBuf>, execution_dir: impl Into<PathBuf>) -> Self {
        AptosCommandBuilder {
            program: program.into(),
            args: Vec::new(),
            execution_dir: execution_dir.into(),
            timeout: Duration::from_secs(300),
            profile: "default".to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Configure the arguments for `action`. `package_dir` is the project root
    /// for actions that operate on a package.
    pub fn with_action(mut self, action: &Action, package_dir: Option<&Path>) -> Self {
        let package_dir = package_dir
            .unwrap_or(self.execution_dir.as_path())
            .display()
            .to_string();
        match action {
            Action::Build => self.push_package_cmd("build", package_dir),
            Action::Test => self.push_package_cmd("test", package_dir),
            Action::Publish => self.push_package_cmd("publish", package_dir),
            Action::AddDependency { dependency } => {
                self.push_package_cmd("add", package_dir);
                self.args.push(dependency.clone());
            }
            Action::New { name } => {
                self.args
                    .extend(["move".into(), "init".into(), "--name".into(), name.clone()]);
            }
            Action::AccountList => {
                self.args
                    .extend(["account".into(), "list".into(), "--output".into(), "json".into()]);
            }
            Action::Init { network } => self.push_init(network.as_ref()),
            Action::NetworkSwitch { network } => self.push_init(Some(network)),
        }
        self
    }

    pub fn with_extra_args(mut self, extra: &[String]) -> Self {
        self.args.extend(extra.iter().cloned());
        self
    }

    fn push_package_cmd(&mut self, sub: &str, package_dir: String) {
        self.args.extend([
            "move".to_string(),
            sub.to_string(),
            "--package-dir".to_string(),
            package_dir,
        ]);
    }

    fn push_init(&mut self, network: Option<&Network>) {
        self.args
            .extend(["init".into(), "--profile".into(), self.profile.clone()]);
        if let Some(network) = network {
            self.args.push("--network".into());
            self.args.push(network.to_string());
        }
    }

    pub fn build(self) -> CommandSpec {
        CommandSpec {
            program: self.program,
            args: self.args,
            cwd: self.execution_dir,
            timeout: self.timeout,
        }
    }
}
