//! # move-e
//!
//! `move-e` runs the `aptos` CLI for a Move package and turns whatever it prints
//! into structured diagnostics: category, severity and, when the line carries
//! one, a `line:column` position.
//!
//! ## Quick Start
//! ```sh
//! move-e build
//! move-e test --timeout 120
//! aptos move build 2> build.log; move-e classify build.log
//! ```

use anyhow::Context;
use clap::Parser;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::AtomicBool;

use move_e::e_cli::{Cli, Commands};
use move_e::e_config::{Config, ConfigFile};
use move_e::e_reports;
use move_e::e_runner::register_ctrlc_handler;
use move_e::e_sink::{BufferId, DiagnosticSink, TerminalSink};
use move_e::{
    classify, find_project_root, ClassificationResult, Coordinator, RunState, Summary,
    SystemRunner,
};

static CHILD_RUNNING: AtomicBool = AtomicBool::new(false);

const EXIT_FAILED: i32 = 1;
const EXIT_PRECONDITION: i32 = 2;
const EXIT_TIMEOUT: i32 = 124;

pub fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off")).init();

    let cli = Cli::parse();
    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            EXIT_PRECONDITION
        }
    };
    std::process::exit(code);
}

fn load_config(cli: &Cli, start: &Path) -> anyhow::Result<Config> {
    let file = match &cli.config {
        Some(path) => Some(ConfigFile::load(path)?),
        None => match find_project_root(start) {
            Ok(root) => ConfigFile::discover(&root)?,
            Err(_) => ConfigFile::discover(start)?,
        },
    };
    Ok(Config::resolve(file, cli.overrides())?)
}

/// Reads captured output; bytes that are not UTF-8 are replaced rather than rejected.
fn read_lines(file: Option<&Path>) -> anyhow::Result<Vec<String>> {
    let bytes = match file {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?
        }
        None => {
            let mut bytes = Vec::new();
            io::stdin().lock().read_to_end(&mut bytes)?;
            bytes
        }
    };
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_string)
        .collect())
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let cwd = std::env::current_dir()?;
    let start = cli.package_dir.clone().unwrap_or_else(|| cwd.clone());
    let config = load_config(cli, &start)?;

    match &cli.command {
        Commands::Patterns => {
            println!("{}", e_reports::pattern_table(&config.patterns));
            return Ok(0);
        }
        Commands::Classify { files, json } => {
            let inputs: Vec<Option<&Path>> = if files.is_empty() {
                vec![None]
            } else {
                files.iter().map(|p| Some(p.as_path())).collect()
            };
            let mut sink = TerminalSink::stdout(config.color);
            let mut total = ClassificationResult::new();
            for input in inputs {
                let lines = read_lines(input)?;
                let result = classify(&lines, &config.patterns);
                if !*json {
                    let buffer = BufferId(
                        input
                            .map(|p| p.display().to_string())
                            .unwrap_or_else(|| "<stdin>".to_string()),
                    );
                    sink.publish(&buffer, &result);
                }
                total.merge(result);
            }
            if *json {
                println!("{}", serde_json::to_string_pretty(&total)?);
            } else {
                println!("{}", e_reports::category_table(&total));
            }
            return Ok(if total.has_errors() { EXIT_FAILED } else { 0 });
        }
        _ => {}
    }

    let Some(action) = cli.command.to_action(config.network)? else {
        return Ok(0);
    };
    if let Err(e) = register_ctrlc_handler(&CHILD_RUNNING) {
        log::warn!("{}", e);
    }

    let color = config.color;
    let runner = SystemRunner::new().with_running_flag(&CHILD_RUNNING);
    let mut coordinator = Coordinator::new(config, runner, TerminalSink::stdout(color), cwd);
    if let Some(dir) = &cli.package_dir {
        coordinator = coordinator.with_package_dir(dir);
    }

    // The sink has already told the user why the action could not start.
    let report = match coordinator.run(action) {
        Ok(report) => report,
        Err(e) => {
            log::debug!("action aborted: {}", e);
            return Ok(EXIT_PRECONDITION);
        }
    };

    println!("{}", e_reports::summary_line(&report.summary));
    if let Summary::Accounts { entries } = &report.summary {
        for entry in entries {
            println!("{}", serde_json::to_string_pretty(entry)?);
        }
    }
    if !report.diagnostics.is_empty() {
        println!("{}", e_reports::category_table(&report.diagnostics));
    }
    if cli.report {
        println!("{}", e_reports::run_report(&report));
    }

    Ok(match report.state {
        RunState::Succeeded => 0,
        RunState::Failed => EXIT_FAILED,
        RunState::TimedOut => EXIT_TIMEOUT,
    })
}
