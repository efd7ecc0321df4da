use move_e::{classify, Category, ClassificationResult, PatternTable, Severity};
use regex::Regex;
use std::collections::BTreeMap;

/// Output captured from real and made-up aptos runs, mixed with chatter.
const CORPUS: &[&str] = &[
    "Compiling, may take a little while to download git dependencies...",
    "UPDATING GIT DEPENDENCY https://github.com/aptos-labs/aptos-core.git",
    "INCLUDING DEPENDENCY AptosFramework",
    "BUILDING hello_blockchain",
    "error[E01002]: unexpected token",
    "   ┌─ /work/hello/sources/message.move:14:9",
    "error[E04007]: incompatible types at 22:17",
    "error[E05001]: ability constraint not satisfied",
    "error[E07005]: invalid borrow of local 'x' at 3:3",
    "error[E03002]: unbound module '0x1::coinz'",
    "warning[W09001]: unused alias",
    "warning: unused variable 'x'",
    "note: this is a note",
    "help: consider removing it",
    "Test was not expected to error, but it aborted with code 65537",
    "[ FAIL    ] 0xcafe::message::bad_path",
    "error: expected ';' but found 'let' at 12:5",
    "",
    "{ \"Error\": \"Move compilation failed\" }",
];

fn table() -> PatternTable {
    PatternTable::default_move()
}

fn counts_of(result: &ClassificationResult) -> BTreeMap<Category, usize> {
    let mut counts = BTreeMap::new();
    for diag in &result.diagnostics {
        *counts.entry(diag.category).or_insert(0) += 1;
    }
    counts
}

#[test]
fn output_never_longer_than_input() {
    for n in 0..=CORPUS.len() {
        let result = classify(&CORPUS[..n], &table());
        assert!(result.len() <= n);
    }
}

#[test]
fn each_diagnostic_maps_to_one_input_line_in_order() {
    let result = classify(CORPUS, &table());
    let mut cursor = 0;
    for diag in &result.diagnostics {
        let found = CORPUS[cursor..]
            .iter()
            .position(|line| line.trim() == diag.message)
            .expect("diagnostic message must come from an input line");
        cursor += found + 1;
    }
}

#[test]
fn positions_round_trip_through_one_based_text() {
    let first_position = Regex::new(r"(\d+):(\d+)").unwrap();
    let mut input = CORPUS.to_vec();
    input.push("error[E04007]: expected u64 at 5:6, found address at 7:8");
    let result = classify(&input, &table());

    let mut located = 0;
    for diag in result.located() {
        let caps = first_position.captures(&diag.message).unwrap();
        assert_eq!(
            diag.position_label().unwrap(),
            format!("{}:{}", &caps[1], &caps[2]),
            "{}",
            diag.message
        );
        located += 1;
    }
    assert!(located >= 3);
    let last = result.diagnostics.last().unwrap();
    assert_eq!((last.line, last.column), (4, 5));
}

#[test]
fn unlocated_diagnostics_use_sentinel() {
    let result = classify(CORPUS, &table());
    assert!(result.unlocated().count() > 0);
    for diag in result.unlocated() {
        assert_eq!((diag.line, diag.column), (0, 0));
        assert!(diag.position_label().is_none());
    }
}

#[test]
fn classification_is_idempotent() {
    let first = classify(CORPUS, &table());
    let second = classify(CORPUS, &table());
    assert_eq!(first, second);
}

#[test]
fn counts_match_diagnostics() {
    for n in 0..=CORPUS.len() {
        let result = classify(&CORPUS[n..], &table());
        assert_eq!(result.counts, counts_of(&result));
    }
}

#[test]
fn corpus_categories() {
    let result = classify(CORPUS, &table());
    assert_eq!(result.count(Category::Syntax), 2);
    assert_eq!(result.count(Category::Type), 1);
    assert_eq!(result.count(Category::Resource), 1);
    assert_eq!(result.count(Category::Borrow), 1);
    assert_eq!(result.count(Category::Module), 1);
    assert_eq!(result.count(Category::Runtime), 2);
    // warnings, note, help and the compilation failure payload
    assert_eq!(result.count(Category::Compilation), 5);
}

#[test]
fn scenario_a_located_syntax_error() {
    let result = classify(&["error: expected ';' but found 'let' at 12:5"], &table());
    assert_eq!(result.len(), 1);
    let diag = &result.diagnostics[0];
    assert_eq!(diag.line, 11);
    assert_eq!(diag.column, 4);
    assert_eq!(diag.severity, Severity::Error);
    assert_eq!(diag.category, Category::Syntax);
    assert!(diag.located);
    assert_eq!(diag.source, "move_compiler");
}

#[test]
fn scenario_b_chatter_is_filtered() {
    let result = classify(&["Compiling module Foo", "Built successfully"], &table());
    assert!(result.is_empty());
    assert!(result.counts.is_empty());
}

#[test]
fn scenario_c_unlocated_warning() {
    let result = classify(&["warning: unused variable 'x'"], &table());
    assert_eq!(result.len(), 1);
    let diag = &result.diagnostics[0];
    assert_eq!((diag.line, diag.column), (0, 0));
    assert!(!diag.located);
    assert_eq!(diag.severity, Severity::Warn);
    assert_eq!(diag.category, Category::Compilation);
}
