//! Schema field type expressions.
//!
//! The grammar forbids arrays-of-arrays and unions-of-unions; the types below
//! make those shapes unrepresentable rather than checked.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of primitive field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    String,
    Number,
    Datetime,
    Daterange,
    Link,
}

impl PrimitiveType {
    /// Parses a primitive type name against the closed set.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "datetime" => Some(Self::Datetime),
            "daterange" => Some(Self::Daterange),
            "link" => Some(Self::Link),
            _ => None,
        }
    }

    /// The grammar-level name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Datetime => "datetime",
            Self::Daterange => "daterange",
            Self::Link => "link",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-composite type: a primitive or a quoted string literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    Primitive(PrimitiveType),
    Literal(String),
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::Primitive(p) => write!(f, "{p}"),
            ScalarType::Literal(text) => write!(f, "\"{text}\""),
        }
    }
}

/// What an array may hold: a scalar, or a union of scalars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Scalar(ScalarType),
    Union(Vec<ScalarType>),
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Scalar(s) => write!(f, "{s}"),
            ElementType::Union(members) => {
                write!(f, "(")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{member}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A complete field type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeExpr {
    Primitive(PrimitiveType),
    Literal(String),
    Union(Vec<ScalarType>),
    Array(ElementType),
}

impl TypeExpr {
    /// True when `scalar` is one of this type's admissible scalar shapes.
    /// Used by default-value and field-type checking.
    pub fn admits_scalar(&self, scalar: &ScalarType) -> bool {
        match self {
            TypeExpr::Primitive(p) => matches!(scalar, ScalarType::Primitive(q) if q == p),
            TypeExpr::Literal(text) => matches!(scalar, ScalarType::Literal(t) if t == text),
            TypeExpr::Union(members) => members.contains(scalar),
            TypeExpr::Array(_) => false,
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Primitive(p) => write!(f, "{p}"),
            TypeExpr::Literal(text) => write!(f, "\"{text}\""),
            TypeExpr::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
            TypeExpr::Array(element) => write!(f, "{element}[]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn primitive_parsing_is_closed() {
        assert_eq!(PrimitiveType::parse("link"), Some(PrimitiveType::Link));
        assert_eq!(PrimitiveType::parse("Link"), None);
        assert_eq!(PrimitiveType::parse("date"), None);
    }

    #[test]
    fn display_forms() {
        let union = TypeExpr::Union(vec![
            ScalarType::Literal("fact".into()),
            ScalarType::Literal("insight".into()),
        ]);
        assert_eq!(union.to_string(), "\"fact\" | \"insight\"");

        let array = TypeExpr::Array(ElementType::Scalar(ScalarType::Primitive(
            PrimitiveType::String,
        )));
        assert_eq!(array.to_string(), "string[]");

        let union_array = TypeExpr::Array(ElementType::Union(vec![
            ScalarType::Literal("a".into()),
            ScalarType::Literal("b".into()),
        ]));
        assert_eq!(union_array.to_string(), "(\"a\" | \"b\")[]");
    }

    #[test]
    fn admits_scalar_checks_membership() {
        let union = TypeExpr::Union(vec![
            ScalarType::Literal("fact".into()),
            ScalarType::Primitive(PrimitiveType::Link),
        ]);
        assert!(union.admits_scalar(&ScalarType::Literal("fact".into())));
        assert!(union.admits_scalar(&ScalarType::Primitive(PrimitiveType::Link)));
        assert!(!union.admits_scalar(&ScalarType::Literal("other".into())));
    }
}
