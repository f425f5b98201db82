//! End-to-end checking scenarios over small workspaces.

use pretty_assertions::assert_eq;
use thalo_checker::{
    CancelToken, CheckConfig, Diagnostic, RuleCode, Severity, check, check_document,
};
use thalo_workspace_index::{AddDocumentOptions, Workspace};

const SCHEMA: &str = "2026-01-01T00:00Z define-entity lore \"Lore\"\n  # Metadata\n  type: \"fact\" | \"insight\"\n  subject: link\n  # Sections\n  Content\n";

fn workspace(files: &[(&str, &str)]) -> Workspace {
    let mut workspace = Workspace::new();
    for (path, source) in files {
        workspace.add_document(*source, AddDocumentOptions::new(*path));
    }
    workspace
}

fn run(files: &[(&str, &str)]) -> Vec<Diagnostic> {
    let report = check(&workspace(files), &CheckConfig::new(), &CancelToken::new());
    assert!(!report.cancelled);
    report.diagnostics
}

fn codes(diagnostics: &[Diagnostic]) -> Vec<RuleCode> {
    diagnostics.iter().map(|d| d.code).collect()
}

#[test]
fn schema_then_instance_across_files_is_clean() {
    let diagnostics = run(&[
        ("schema.thalo", SCHEMA),
        (
            "entries.thalo",
            "2026-01-05T18:00Z create lore \"E\" ^e1\n  type: \"fact\"\n  subject: ^self\n\n  # Content\n  Hi\n",
        ),
    ]);
    assert_eq!(diagnostics, vec![]);
}

#[test]
fn missing_required_field_names_the_field() {
    let diagnostics = run(&[
        ("schema.thalo", SCHEMA),
        (
            "entries.thalo",
            "2026-01-05T18:00Z create lore \"E\" ^e1\n  type: \"fact\"\n\n  # Content\n  Hi\n",
        ),
    ]);
    assert_eq!(codes(&diagnostics), vec![RuleCode::MissingRequiredField]);
    assert!(diagnostics[0].message.contains("subject"));
    assert_eq!(diagnostics[0].severity, Severity::Error);
    assert_eq!(diagnostics[0].file, "entries.thalo");
}

#[test]
fn invalid_enum_value_is_a_type_error_not_a_missing_field() {
    let diagnostics = run(&[
        ("schema.thalo", SCHEMA),
        (
            "entries.thalo",
            "2026-01-05T18:00Z create lore \"E\" ^e1\n  type: invalid\n  subject: ^self\n\n  # Content\n  Hi\n",
        ),
    ]);
    assert_eq!(codes(&diagnostics), vec![RuleCode::InvalidFieldType]);
    assert!(!codes(&diagnostics).contains(&RuleCode::MissingRequiredField));
}

#[test]
fn actualize_without_checkpoint_suggests_its_own_timestamp() {
    let diagnostics = run(&[
        ("schema.thalo", SCHEMA),
        (
            "synth.thalo",
            "2026-01-07T10:00Z define-synthesis \"P\" ^p\n  sources: lore where subject = ^self\n\n  # Prompt\n  x\n\n2026-01-07T12:00Z actualize-synthesis ^p\n",
        ),
    ]);
    assert_eq!(codes(&diagnostics), vec![RuleCode::ActualizeMissingUpdated]);
    assert!(diagnostics[0].message.contains("ts:2026-01-07T12:00Z"));
    assert_eq!(
        diagnostics[0].data.as_ref().and_then(|d| d["suggested"].as_str()),
        Some("ts:2026-01-07T12:00Z"),
    );
}

#[test]
fn out_of_order_timestamps_warn_at_the_second_entry() {
    let diagnostics = run(&[
        ("schema.thalo", SCHEMA),
        (
            "entries.thalo",
            "2026-01-05T18:00Z create lore \"A\" ^a\n  type: \"fact\"\n  subject: ^self\n\n  # Content\n  one\n\n2026-01-04T00:00Z create lore \"B\" ^b\n  type: \"fact\"\n  subject: ^self\n\n  # Content\n  two\n",
        ),
    ]);
    assert_eq!(codes(&diagnostics), vec![RuleCode::TimestampOutOfOrder]);
    let diagnostic = &diagnostics[0];
    assert!(diagnostic.message.contains("2026-01-04T00:00Z"));
    assert!(diagnostic.message.contains("2026-01-05T18:00Z"));
    // At the second entry's timestamp.
    assert_eq!(diagnostic.location.start_position.row, 7);
}

#[test]
fn duplicate_timestamps_without_links_flag_both_entries() {
    let diagnostics = run(&[
        ("schema.thalo", SCHEMA),
        (
            "entries.thalo",
            "2026-01-05T18:00Z create lore \"A\"\n  type: \"fact\"\n  subject: ^self\n\n  # Content\n  one\n\n2026-01-05T18:00Z create lore \"B\"\n  type: \"fact\"\n  subject: ^self\n\n  # Content\n  two\n",
        ),
    ]);
    let duplicates: Vec<&Diagnostic> = diagnostics
        .iter()
        .filter(|d| d.code == RuleCode::DuplicateTimestamp)
        .collect();
    assert_eq!(duplicates.len(), 2);
    let rows: Vec<u32> =
        duplicates.iter().map(|d| d.location.start_position.row).collect();
    assert_eq!(rows, vec![0, 7]);
}

#[test]
fn explicit_link_ids_exempt_entries_from_duplicate_timestamp() {
    let diagnostics = run(&[
        ("schema.thalo", SCHEMA),
        (
            "entries.thalo",
            "2026-01-05T18:00Z create lore \"A\" ^a\n  type: \"fact\"\n  subject: ^self\n\n  # Content\n  one\n\n2026-01-05T18:00Z create lore \"B\" ^b\n  type: \"fact\"\n  subject: ^self\n\n  # Content\n  two\n",
        ),
    ]);
    assert!(!codes(&diagnostics).contains(&RuleCode::DuplicateTimestamp));
}

#[test]
fn turning_a_rule_off_removes_only_its_diagnostics() {
    let files = [(
        "entries.thalo",
        // Unknown entity and a missing title, with no schema at all.
        "2026-01-05T18:00Z create mystery\n  # Content\n  x\n",
    )];
    let with_defaults =
        check(&workspace(&files), &CheckConfig::new(), &CancelToken::new()).diagnostics;
    assert!(codes(&with_defaults).contains(&RuleCode::UnknownEntity));
    assert!(codes(&with_defaults).contains(&RuleCode::MissingTitle));

    let mut config = CheckConfig::new();
    config.set(RuleCode::MissingTitle, Severity::Off);
    let without = check(&workspace(&files), &config, &CancelToken::new()).diagnostics;
    assert!(!codes(&without).contains(&RuleCode::MissingTitle));
    let expected: Vec<&Diagnostic> =
        with_defaults.iter().filter(|d| d.code != RuleCode::MissingTitle).collect();
    assert_eq!(without.iter().collect::<Vec<_>>(), expected);
}

#[test]
fn check_is_independent_of_document_insertion_order() {
    let forward = run(&[
        ("schema.thalo", SCHEMA),
        ("entries.thalo", "2026-01-05T18:00Z create lore \"E\"\n  type: \"fact\"\n\n  # Content\n  x\n"),
    ]);
    let reversed = run(&[
        ("entries.thalo", "2026-01-05T18:00Z create lore \"E\"\n  type: \"fact\"\n\n  # Content\n  x\n"),
        ("schema.thalo", SCHEMA),
    ]);
    let key = |d: &Diagnostic| {
        (d.code.as_str(), d.file.clone(), d.location.start_index, d.message.clone())
    };
    let mut a: Vec<_> = forward.iter().map(key).collect();
    let mut b: Vec<_> = reversed.iter().map(key).collect();
    a.sort();
    b.sort();
    assert_eq!(a, b);
}

#[test]
fn adding_then_removing_a_document_restores_check_output() {
    let mut ws = workspace(&[("schema.thalo", SCHEMA)]);
    let before = check(&ws, &CheckConfig::new(), &CancelToken::new()).diagnostics;

    ws.add_document(
        "2026-01-05T18:00Z create lore \"E\"\n  type: 7\n",
        AddDocumentOptions::new("scratch.thalo"),
    );
    let during = check(&ws, &CheckConfig::new(), &CancelToken::new()).diagnostics;
    assert!(during.len() > before.len());

    assert!(ws.remove_document("scratch.thalo").is_ok());
    let after = check(&ws, &CheckConfig::new(), &CancelToken::new()).diagnostics;
    assert_eq!(after, before);
}

#[test]
fn cancellation_returns_a_partial_report() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let report = check(&workspace(&[("schema.thalo", SCHEMA)]), &CheckConfig::new(), &cancel);
    assert!(report.cancelled);
    assert_eq!(report.diagnostics, vec![]);
}

#[test]
fn check_document_scopes_to_one_file_and_skips_workspace_rules() {
    let ws = workspace(&[
        ("schema.thalo", SCHEMA),
        (
            "entries.thalo",
            // Unknown entity (entry scope) and an unresolved target
            // (workspace scope) in the same file.
            "2026-01-05T18:00Z create mystery \"T\"\n  # Content\n  x\n\n2026-01-06T00:00Z actualize-synthesis ^ghost\n  checkpoint: \"git:0123abc\"\n",
        ),
    ]);
    let report = match check_document(&ws, "entries.thalo", &CheckConfig::new(), &CancelToken::new())
    {
        Ok(report) => report,
        Err(error) => return assert_eq!(error.to_string(), ""),
    };
    let scoped = codes(&report.diagnostics);
    assert!(scoped.contains(&RuleCode::UnknownEntity));
    assert!(!scoped.contains(&RuleCode::ActualizeUnresolvedTarget));
    // The schema file's diagnostics are not included.
    assert!(report.diagnostics.iter().all(|d| d.file == "entries.thalo"));

    // The full check does include the workspace-scoped rule.
    let full = check(&ws, &CheckConfig::new(), &CancelToken::new());
    assert!(codes(&full.diagnostics).contains(&RuleCode::ActualizeUnresolvedTarget));

    assert!(
        check_document(&ws, "missing.thalo", &CheckConfig::new(), &CancelToken::new()).is_err()
    );
}

#[test]
fn markdown_diagnostics_are_file_absolute() {
    let diagnostics = run(&[(
        "notes.md",
        "intro\n\n```thalo\n2026-01-05T18:00Z create mystery \"T\"\n  # Content\n  x\n```\n",
    )]);
    let unknown: Vec<&Diagnostic> =
        diagnostics.iter().filter(|d| d.code == RuleCode::UnknownEntity).collect();
    assert_eq!(unknown.len(), 1);
    // `mystery` sits on file row 3 (inside the fence), column 25.
    assert_eq!(unknown[0].location.start_position.row, 3);
    assert_eq!(unknown[0].location.start_position.column, 25);
}
