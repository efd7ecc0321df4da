//! Parsers for the output of finished aptos invocations.
//!
//! aptos prints progress lines (`BUILDING`, `INCLUDING DEPENDENCY`) on stderr and a
//! JSON object of the form `{"Result": ...}` or `{"Error": "..."}` on stdout.
//! These parsers turn that into a
//! [`Summary`]; a malformed payload becomes [`Summary::ParseFailure`] instead of
//! an error so the run still reports its exit status.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::e_command_builder::Action;

static BUILDING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^BUILDING\s+(\S+)").expect("static regex"));
static DEPENDENCY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^INCLUDING DEPENDENCY\s+(\S+)").expect("static regex"));
static TEST_PASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\s*PASS\s*\]\s+(\S+)").expect("static regex"));
static TEST_FAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\s*FAIL\s*\]\s+(\S+)").expect("static regex"));
static TEST_RESULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Test result:\s*(\w+)\.\s*Total tests:\s*(\d+);\s*passed:\s*(\d+);\s*failed:\s*(\d+)")
        .expect("static regex")
});

/// Structured view of a run's stdout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Summary {
    Built {
        package: Option<String>,
        dependencies: Vec<String>,
        modules: Vec<String>,
    },
    Tested {
        total: usize,
        passed: usize,
        failed: usize,
        failures: Vec<String>,
    },
    Published {
        transaction_hash: Option<String>,
        success: Option<bool>,
        gas_used: Option<u64>,
    },
    Accounts {
        entries: Vec<Value>,
    },
    /// The CLI reported `{"Error": ...}`.
    CliError {
        message: String,
    },
    Output {
        lines: Vec<String>,
    },
    ParseFailure {
        reason: String,
    },
}

enum Payload {
    Missing,
    Malformed(String),
    Parsed(Value),
}

/// Finds the trailing JSON object in `lines`, starting at the first line that opens one.
fn json_payload(lines: &[String]) -> Payload {
    let Some(start) = lines.iter().position(|l| l.trim_start().starts_with('{')) else {
        return Payload::Missing;
    };
    let text = lines[start..].join("\n");
    match serde_json::from_str::<Value>(&text) {
        Ok(value) => Payload::Parsed(value),
        Err(e) => Payload::Malformed(e.to_string()),
    }
}

fn cli_error(value: &Value) -> Option<Summary> {
    value.get("Error").map(|err| Summary::CliError {
        message: err
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string()),
    })
}

fn parse_build(lines: &[String], progress: &[String]) -> Summary {
    let mut package = None;
    let mut dependencies = Vec::new();
    for line in progress.iter().chain(lines) {
        if let Some(caps) = BUILDING.captures(line.trim()) {
            package = Some(caps[1].to_string());
        } else if let Some(caps) = DEPENDENCY.captures(line.trim()) {
            dependencies.push(caps[1].to_string());
        }
    }
    let modules = match json_payload(lines) {
        Payload::Missing => Vec::new(),
        Payload::Malformed(reason) => return Summary::ParseFailure { reason },
        Payload::Parsed(value) => {
            if let Some(err) = cli_error(&value) {
                return err;
            }
            value
                .get("Result")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|m| m.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default()
        }
    };
    Summary::Built {
        package,
        dependencies,
        modules,
    }
}

fn parse_test(lines: &[String]) -> Summary {
    let mut passed = 0;
    let mut failures = Vec::new();
    let mut totals = None;
    for line in lines {
        let line = line.trim();
        if TEST_PASS.is_match(line) {
            passed += 1;
        } else if let Some(caps) = TEST_FAIL.captures(line) {
            failures.push(caps[1].to_string());
        } else if let Some(caps) = TEST_RESULT.captures(line) {
            let n = |i: usize| caps[i].parse::<usize>().unwrap_or(0);
            totals = Some((n(2), n(3), n(4)));
        }
    }
    if let Payload::Parsed(value) = json_payload(lines) {
        if let Some(err) = cli_error(&value) {
            if totals.is_none() && passed == 0 && failures.is_empty() {
                return err;
            }
        }
    }
    let (total, passed, failed) =
        totals.unwrap_or((passed + failures.len(), passed, failures.len()));
    Summary::Tested {
        total,
        passed,
        failed,
        failures,
    }
}

fn parse_publish(lines: &[String]) -> Summary {
    match json_payload(lines) {
        Payload::Missing => Summary::Output {
            lines: lines.to_vec(),
        },
        Payload::Malformed(reason) => Summary::ParseFailure { reason },
        Payload::Parsed(value) => {
            if let Some(err) = cli_error(&value) {
                return err;
            }
            let result = value.get("Result");
            Summary::Published {
                transaction_hash: result
                    .and_then(|r| r.get("transaction_hash"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                success: result.and_then(|r| r.get("success")).and_then(Value::as_bool),
                gas_used: result.and_then(|r| r.get("gas_used")).and_then(Value::as_u64),
            }
        }
    }
}

fn parse_accounts(lines: &[String]) -> Summary {
    match json_payload(lines) {
        Payload::Missing => Summary::ParseFailure {
            reason: "no JSON object in `account list` output".to_string(),
        },
        Payload::Malformed(reason) => Summary::ParseFailure { reason },
        Payload::Parsed(value) => {
            if let Some(err) = cli_error(&value) {
                return err;
            }
            match value.get("Result") {
                Some(Value::Array(entries)) => Summary::Accounts {
                    entries: entries.clone(),
                },
                Some(other) => Summary::Accounts {
                    entries: vec![other.clone()],
                },
                None => Summary::ParseFailure {
                    reason: "`account list` output has no `Result` field".to_string(),
                },
            }
        }
    }
}

/// Parses the stdout of `action` into a [`Summary`]. `stderr` is only read for
/// build progress lines.
pub fn parse_stdout(action: &Action, lines: &[String], stderr: &[String]) -> Summary {
    match action {
        Action::Build => parse_build(lines, stderr),
        Action::Test => parse_test(lines),
        Action::Publish => parse_publish(lines),
        Action::AccountList => parse_accounts(lines),
        _ => match json_payload(lines) {
            Payload::Parsed(value) => cli_error(&value).unwrap_or(Summary::Output {
                lines: lines.to_vec(),
            }),
            _ => Summary::Output {
                lines: lines.to_vec(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn build_lists_package_dependencies_and_modules() {
        let out = lines(
            "Compiling, may take a little while to download git dependencies...\n\
             INCLUDING DEPENDENCY AptosFramework\n\
             INCLUDING DEPENDENCY MoveStdlib\n\
             BUILDING hello_blockchain\n\
             {\n  \"Result\": [\n    \"0xcafe::message\"\n  ]\n}",
        );
        assert_eq!(
            parse_stdout(&Action::Build, &out, &[]),
            Summary::Built {
                package: Some("hello_blockchain".into()),
                dependencies: vec!["AptosFramework".into(), "MoveStdlib".into()],
                modules: vec!["0xcafe::message".into()],
            }
        );
    }

    #[test]
    fn build_progress_is_read_from_stderr() {
        let out = lines("{\n  \"Result\": [\"0xcafe::message\"]\n}");
        let err = lines(
            "Compiling, may take a little while to download git dependencies...\n\
             INCLUDING DEPENDENCY AptosFramework\n\
             BUILDING hello_blockchain",
        );
        assert_eq!(
            parse_stdout(&Action::Build, &out, &err),
            Summary::Built {
                package: Some("hello_blockchain".into()),
                dependencies: vec!["AptosFramework".into()],
                modules: vec!["0xcafe::message".into()],
            }
        );
    }

    #[test]
    fn build_without_json_is_not_a_failure() {
        let out = lines("Compiling module Foo\nBuilt successfully");
        assert!(matches!(
            parse_stdout(&Action::Build, &out, &[]),
            Summary::Built { ref modules, .. } if modules.is_empty()
        ));
    }

    #[test]
    fn cli_error_payload_is_surfaced() {
        let out = lines("{\n  \"Error\": \"Move compilation failed: Compilation error\"\n}");
        assert_eq!(
            parse_stdout(&Action::Build, &out, &[]),
            Summary::CliError {
                message: "Move compilation failed: Compilation error".into()
            }
        );
    }

    #[test]
    fn test_summary_uses_result_line() {
        let out = lines(
            "Running Move unit tests\n\
             [ PASS    ] 0xcafe::message::sender_can_set_message\n\
             [ FAIL    ] 0xcafe::message::bad_path\n\
             Test result: FAILED. Total tests: 2; passed: 1; failed: 1",
        );
        assert_eq!(
            parse_stdout(&Action::Test, &out, &[]),
            Summary::Tested {
                total: 2,
                passed: 1,
                failed: 1,
                failures: vec!["0xcafe::message::bad_path".into()],
            }
        );
    }

    #[test]
    fn publish_reads_transaction_fields() {
        let out = lines(
            r#"{"Result": {"transaction_hash": "0xabc", "gas_used": 1234, "success": true}}"#,
        );
        assert_eq!(
            parse_stdout(&Action::Publish, &out, &[]),
            Summary::Published {
                transaction_hash: Some("0xabc".into()),
                success: Some(true),
                gas_used: Some(1234),
            }
        );
    }

    #[test]
    fn malformed_account_json_degrades() {
        let out = lines("{\"Result\": [ {\"account\": ");
        assert!(matches!(
            parse_stdout(&Action::AccountList, &out, &[]),
            Summary::ParseFailure { .. }
        ));
        let out = lines("nothing to see");
        assert!(matches!(
            parse_stdout(&Action::AccountList, &out, &[]),
            Summary::ParseFailure { .. }
        ));
        let out = lines(r#"{"Result": [{"account": "0x1"}, {"account": "0x2"}]}"#);
        assert!(matches!(
            parse_stdout(&Action::AccountList, &out, &[]),
            Summary::Accounts { ref entries } if entries.len() == 2
        ));
    }
}
