use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::e_command_builder::{Action, Network};
use crate::e_config::ConfigOverrides;
use crate::e_error::Result;

#[derive(Parser, Debug)]
#[command(author, version, about = "move-e is for Error: aptos Move builds with structured diagnostics.", long_about = None)]
pub struct Cli {
    /// Path or name of the aptos executable.
    #[arg(long, global = true, help = "Path to the aptos executable (default: aptos on PATH).")]
    pub aptos: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Kill the aptos process after this many seconds (default: 300)."
    )]
    pub timeout: Option<u64>,

    #[arg(long, global = true, help = "Read settings from this file instead of move-e.toml.")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "aptos profile used by init and network (default: default).")]
    pub profile: Option<String>,

    #[arg(
        long = "package-dir",
        global = true,
        help = "Start the Move.toml search here instead of the current directory."
    )]
    pub package_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Disable colored output.")]
    pub no_color: bool,

    #[arg(long, global = true, help = "Print a run report table after the action.")]
    pub report: bool,

    #[arg(
        long = "assume-yes",
        global = true,
        help = "Pass --assume-yes to aptos for actions that ask for confirmation (publish)."
    )]
    pub assume_yes: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Compile the package (`aptos move build`).
    Build,
    /// Run the package's unit tests (`aptos move test`).
    Test,
    /// Publish the package (`aptos move publish`).
    Publish,
    /// Initialise the aptos profile (`aptos init`).
    Init {
        #[arg(long, help = "One of local, devnet, testnet, mainnet.")]
        network: Option<String>,
    },
    /// Create a new Move package in the current directory (`aptos move init`).
    New { name: String },
    /// Add a dependency to the package (`aptos move add`).
    Add { dependency: String },
    /// List accounts of the current profile.
    Accounts,
    /// Point the profile at another network.
    Network { network: String },
    /// Classify captured output read from FILES (or stdin) without running aptos.
    Classify {
        files: Vec<PathBuf>,
        #[arg(long, help = "Print the classification result as JSON.")]
        json: bool,
    },
    /// Print the active classification rules.
    Patterns,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            aptos: self.aptos.clone(),
            timeout_secs: self.timeout,
            profile: self.profile.clone(),
            network: None,
            no_color: self.no_color,
            assume_yes: self.assume_yes,
        }
    }
}

impl Commands {
    /// The aptos action behind this subcommand, or `None` for local-only commands.
    /// `default_network` fills in `init` when no `--network` is given.
    pub fn to_action(&self, default_network: Option<Network>) -> Result<Option<Action>> {
        let action = match self {
            Commands::Build => Action::Build,
            Commands::Test => Action::Test,
            Commands::Publish => Action::Publish,
            Commands::Init { network } => Action::Init {
                network: match network {
                    Some(name) => Some(name.parse()?),
                    None => default_network,
                },
            },
            Commands::New { name } => Action::New { name: name.clone() },
            Commands::Add { dependency } => Action::AddDependency {
                dependency: dependency.clone(),
            },
            Commands::Accounts => Action::AccountList,
            Commands::Network { network } => Action::NetworkSwitch {
                network: network.parse()?,
            },
            Commands::Classify { .. } | Commands::Patterns => return Ok(None),
        };
        Ok(Some(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::e_error::Error;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["move-e", "build", "--timeout", "30", "--no-color"]);
        assert_eq!(cli.command, Commands::Build);
        assert_eq!(cli.timeout, Some(30));
        assert!(cli.no_color);
    }

    #[test]
    fn network_subcommand_validates_value() {
        let cli = Cli::parse_from(["move-e", "network", "devnet"]);
        assert_eq!(
            cli.command.to_action(None).unwrap(),
            Some(Action::NetworkSwitch {
                network: Network::Devnet
            })
        );
        let cli = Cli::parse_from(["move-e", "network", "moonnet"]);
        assert!(matches!(
            cli.command.to_action(None),
            Err(Error::InvalidNetwork(_))
        ));
    }

    #[test]
    fn init_falls_back_to_configured_network() {
        let cli = Cli::parse_from(["move-e", "init"]);
        assert_eq!(
            cli.command.to_action(Some(Network::Local)).unwrap(),
            Some(Action::Init {
                network: Some(Network::Local)
            })
        );
    }
}
