//! Metadata value content and structured queries.

use crate::{Date, FieldOrError, Timestamp};
use serde::{Deserialize, Serialize};
use thalo_position_tracking::Location;

/// The normalized content of a metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueContent {
    /// `"text"`
    Quoted { value: String, location: Location },
    /// `^id`
    Link { id: String, location: Location },
    /// `2026-01-05T18:00Z`
    Datetime { value: Timestamp, location: Location },
    /// `42`, `-1.5`
    Number { value: f64, location: Location },
    /// `2026-01-01..2026-02-01`
    DateRange { start: Date, end: Date, location: Location },
    /// `lore where subject = ^self` — also the parse of a bare entity word
    Query(Query),
    /// `[v1, v2, ...]`
    Array { elements: Vec<FieldOrError<ValueContent>>, location: Location },
}

impl ValueContent {
    /// The value's location, regardless of variant.
    pub fn location(&self) -> Location {
        match self {
            ValueContent::Quoted { location, .. }
            | ValueContent::Link { location, .. }
            | ValueContent::Datetime { location, .. }
            | ValueContent::Number { location, .. }
            | ValueContent::DateRange { location, .. }
            | ValueContent::Array { location, .. } => *location,
            ValueContent::Query(query) => query.location,
        }
    }

    /// A short name for diagnostics (`"a link"`, `"a number"`, ...).
    pub fn describe(&self) -> &'static str {
        match self {
            ValueContent::Quoted { .. } => "a string",
            ValueContent::Link { .. } => "a link",
            ValueContent::Datetime { .. } => "a datetime",
            ValueContent::Number { .. } => "a number",
            ValueContent::DateRange { .. } => "a date range",
            ValueContent::Query(_) => "a query",
            ValueContent::Array { .. } => "an array",
        }
    }
}

/// A source query: an entity selector plus zero or more conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub entity: String,
    pub entity_location: Location,
    pub conditions: Vec<QueryCondition>,
    pub location: Location,
}

/// One `where` / `and` clause of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryCondition {
    /// `#tag` — the entry carries the tag
    Tag { name: String, location: Location },
    /// `^id` — the entry references the link
    Link { id: String, location: Location },
    /// `key = value` — a metadata field equals the scalar value
    Field { key: String, key_location: Location, value: Box<ValueContent>, location: Location },
}

impl QueryCondition {
    /// The condition's location.
    pub fn location(&self) -> Location {
        match self {
            QueryCondition::Tag { location, .. }
            | QueryCondition::Link { location, .. }
            | QueryCondition::Field { location, .. } => *location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_is_uniform_across_variants() {
        let loc = Location::default();
        let query = Query {
            entity: "lore".into(),
            entity_location: loc,
            conditions: vec![],
            location: loc,
        };
        for value in [
            ValueContent::Quoted { value: "x".into(), location: loc },
            ValueContent::Link { id: "a".into(), location: loc },
            ValueContent::Number { value: 1.0, location: loc },
            ValueContent::Query(query),
        ] {
            assert_eq!(value.location(), loc);
        }
    }
}
