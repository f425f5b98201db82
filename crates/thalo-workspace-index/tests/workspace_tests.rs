//! Workspace integration: edit routing, schema folding, link aggregation.

use pretty_assertions::assert_eq;
use thalo_ast::{PrimitiveType, TypeExpr};
use thalo_workspace_index::{AddDocumentOptions, DocumentEdit, Workspace, WorkspaceIndex};

const SCHEMA: &str = "2026-01-01T00:00Z define-entity lore \"Lore\"\n  # Metadata\n  type: \"fact\" | \"insight\"\n  subject: link\n  # Sections\n  Content\n";

fn edit(start_row: u32, start_col: u32, end_row: u32, end_col: u32, text: &str) -> DocumentEdit {
    DocumentEdit {
        start_row,
        start_col,
        end_row,
        end_col,
        new_text: text.to_string(),
    }
}

#[test]
fn schema_registry_resolves_define_plus_alter() {
    let mut workspace = Workspace::new();
    workspace.add_document(SCHEMA, AddDocumentOptions::new("schema.thalo"));
    workspace.add_document(
        "2026-02-01T00:00Z alter-entity lore\n  # Metadata\n  rating?: number\n  # Remove Metadata\n  subject\n",
        AddDocumentOptions::new("alter.thalo"),
    );

    let schema = match workspace.schema_registry().get("lore") {
        Some(schema) => schema,
        None => return assert!(workspace.schema_registry().has("lore")),
    };
    assert_eq!(schema.defined_at, "2026-01-01T00:00Z");
    assert_eq!(schema.defined_in, "schema.thalo");
    assert!(schema.field("subject").is_none(), "removed by the alter");
    assert_eq!(
        schema.field("rating").map(|f| &f.ty),
        Some(&TypeExpr::Primitive(PrimitiveType::Number)),
    );
    assert!(schema.section("Content").is_some());
}

#[test]
fn alterations_apply_in_timestamp_order_not_insertion_order() {
    let mut workspace = Workspace::new();
    // The later alteration is inserted first.
    workspace.add_document(
        "2026-03-01T00:00Z alter-entity lore\n  # Metadata\n  status: \"open\" | \"done\"\n",
        AddDocumentOptions::new("b.thalo"),
    );
    workspace.add_document(
        "2026-02-01T00:00Z alter-entity lore\n  # Metadata\n  status: string\n",
        AddDocumentOptions::new("a.thalo"),
    );
    workspace.add_document(SCHEMA, AddDocumentOptions::new("schema.thalo"));

    let schema = match workspace.schema_registry().get("lore") {
        Some(schema) => schema,
        None => return assert!(workspace.schema_registry().has("lore")),
    };
    // The 2026-03-01 alteration replaces the 2026-02-01 one.
    assert!(matches!(
        schema.field("status").map(|f| &f.ty),
        Some(TypeExpr::Union(_)),
    ));
}

#[test]
fn link_index_spans_documents() {
    let mut workspace = Workspace::new();
    workspace.add_document(
        "2026-01-05T18:00Z create lore \"E\" ^e1\n",
        AddDocumentOptions::new("a.thalo"),
    );
    workspace.add_document(
        "2026-01-06T09:00Z create lore\n  subject: ^e1\n",
        AddDocumentOptions::new("b.thalo"),
    );

    let definition = workspace.link_index().link_definition("e1");
    assert_eq!(definition.map(|d| d.file.as_str()), Some("a.thalo"));
    assert_eq!(workspace.link_index().references("e1").len(), 1);
}

#[test]
fn edits_propagate_to_registry_and_links() {
    let mut workspace = Workspace::new();
    workspace.add_document(SCHEMA, AddDocumentOptions::new("schema.thalo"));
    workspace.add_document(
        "2026-01-05T18:00Z create lore ^e1\n",
        AddDocumentOptions::new("entries.thalo"),
    );

    // Rename the link id: ^e1 -> ^e2.
    let result = workspace
        .apply_edit("entries.thalo", &edit(0, 30, 0, 33, "^e2"))
        .unwrap_or_default();
    assert!(result.links_changed);
    assert!(!result.schemas_changed);
    assert!(workspace.link_index().link_definition("e1").is_none());
    assert!(workspace.link_index().link_definition("e2").is_some());

    // Metadata-only edits do not disturb schemas.
    let result = workspace
        .apply_edit("entries.thalo", &edit(0, 0, 0, 0, ""))
        .unwrap_or_default();
    assert!(!result.schemas_changed);
}

#[test]
fn removing_a_document_withdraws_its_contributions() {
    let mut workspace = Workspace::new();
    workspace.add_document(SCHEMA, AddDocumentOptions::new("schema.thalo"));
    assert!(workspace.schema_registry().has("lore"));

    assert!(workspace.remove_document("schema.thalo").is_ok());
    assert!(!workspace.schema_registry().has("lore"));
    assert!(workspace.get_model("schema.thalo").is_none());
    assert!(workspace.remove_document("schema.thalo").is_err());
}

#[test]
fn workspace_index_groups_entries() {
    let mut workspace = Workspace::new();
    workspace.add_document(SCHEMA, AddDocumentOptions::new("schema.thalo"));
    workspace.add_document(
        "2026-01-05T18:00Z create lore\n\n2026-01-06T09:00Z create note\n\n2026-01-07T10:00Z define-synthesis \"P\" ^p\n  sources: lore\n",
        AddDocumentOptions::new("entries.thalo"),
    );

    let index = WorkspaceIndex::build(&workspace);
    assert_eq!(index.define_entities_by_name["lore"].len(), 1);
    assert_eq!(index.instance_entries_by_entity["lore"].len(), 1);
    assert_eq!(index.instance_entries_by_entity["note"].len(), 1);
    assert_eq!(index.synthesis_entries.len(), 1);
    assert!(index.actualize_entries.is_empty());
}

#[test]
fn models_iterate_in_insertion_order() {
    let mut workspace = Workspace::new();
    workspace.add_document("", AddDocumentOptions::new("z.thalo"));
    workspace.add_document("", AddDocumentOptions::new("a.thalo"));
    let paths: Vec<&str> = workspace.all_models().map(|m| m.path()).collect();
    assert_eq!(paths, vec!["z.thalo", "a.thalo"]);
}
