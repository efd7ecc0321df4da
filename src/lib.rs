#![doc = include_str!("../README.md")]

pub mod e_classifier;
pub use e_classifier::{classify, classify_text, extract_position};
pub mod e_cli;
pub use e_cli::Cli;
pub mod e_command_builder;
pub use e_command_builder::{Action, ActionKind, AptosCommandBuilder, CommandSpec, Network};
pub mod e_config;
pub use e_config::Config;
pub mod e_coordinator;
pub use e_coordinator::{ActionState, Coordinator, RunReport, RunState};
pub mod e_error;
pub use e_error::{Error, Result};
pub mod e_manifest;
pub use e_manifest::find_project_root;
pub mod e_patterns;
pub use e_patterns::{ErrorPattern, PatternTable};
pub mod e_reports;
pub mod e_runner;
pub use e_runner::{ProcessExit, ProcessOutcome, ProcessRunner, SystemRunner};
pub mod e_sink;
pub use e_sink::{BufferId, DiagnosticSink, Notification, NotifyLevel};
pub mod e_success;
pub use e_success::Summary;
pub mod e_types;
pub use e_types::{Category, ClassificationResult, Diagnostic, Severity};
