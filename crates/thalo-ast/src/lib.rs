//! Typed AST for the thalo knowledge-description language.
//!
//! - `timestamp`: minute-precision instants with canonical UTC ordering.
//! - `entry`: the `Entry` sum type and its four shapes.
//! - `value`: metadata value content and structured queries.
//! - `types`: schema field type expressions.
//! - `error`: structured syntax errors kept as data inside partial parses.

mod entry;
mod error;
mod timestamp;
mod types;
mod value;

pub use entry::{
    ActualizeEntry, ActualizeHeader, ContentNode, Entry, EntryKey, EntryKind, FieldDecl,
    FieldDeclBlock, InstanceDirective, InstanceEntry, InstanceHeader, MetadataEntry, NameListBlock,
    NameRef, SchemaDirective, SchemaEntry, SchemaHeader, SectionDecl,
    SectionDeclBlock, SectionView, SynthesisEntry, SynthesisHeader, Tag, metadata_value, sections,
};
pub use error::{FieldOrError, SyntaxError};
pub use timestamp::{Date, Time, Timestamp, Timezone};
pub use types::{ElementType, PrimitiveType, ScalarType, TypeExpr};
pub use value::{Query, QueryCondition, ValueContent};

pub use thalo_position_tracking::{ByteSpan, Location, Position};
