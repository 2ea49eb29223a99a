// ABOUTME: Tagged value variant for decoded locals, fields, and array elements
// ABOUTME: Display produces the front-end string, keeping the raw datum for reuse

use crate::datatypes::descriptor;
use std::fmt;

/// A decoded target value.
///
/// Carries both the typed raw datum and, through `Display`, the string the
/// front-end shows. Strings are materialized eagerly from the target's
/// backing arrays and rendered quoted with `\` and `"` escaped.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// UTF-16 code unit
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// Materialized `String`/`StringBuilder` content, unescaped
    Str(String),
    /// Opaque handle to an unexpanded object or array
    Reference(u32),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Char(c) => {
                let ch = char::from_u32(u32::from(*c)).unwrap_or(char::REPLACEMENT_CHARACTER);
                write!(f, "'{ch}'")
            }
            Value::Int(n) => write!(f, "{n}"),
            Value::Long(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Double(x) => write!(f, "{x}"),
            Value::Str(s) => {
                let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{escaped}\"")
            }
            Value::Reference(r) => write!(f, "@{r:#x}"),
        }
    }
}

/// A named value decoded from the target, as held in the variable-ref table.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueInfo {
    pub name: String,
    /// Bare type: a primitive descriptor, an array descriptor, or a
    /// slash-form class name
    pub ty: String,
    pub value: Value,
    /// Byte size of the referenced object, when one is referenced
    pub size: u32,
    /// Nonzero for values that live in the target's object space
    pub reference: u32,
}

impl ValueInfo {
    /// The string shown as the variable's value. Unexpanded objects and
    /// arrays display as their short type name rather than a raw handle.
    pub fn display_value(&self) -> String {
        match &self.value {
            Value::Reference(_) => descriptor::simple_name(&self.ty),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_display() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Char(u16::from(b'A')).to_string(), "'A'");
        assert_eq!(Value::Int(-1).to_string(), "-1");
        assert_eq!(Value::Long(i64::MIN).to_string(), "-9223372036854775808");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::Double(-0.25).to_string(), "-0.25");
    }

    #[test]
    fn string_display_escapes_backslash_and_quote() {
        let v = Value::Str(r#"a"b\c"#.into());
        assert_eq!(v.to_string(), r#""a\"b\\c""#);
    }

    #[test]
    fn reference_displays_as_type_name() {
        let info = ValueInfo {
            name: "list".into(),
            ty: "java/util/ArrayList".into(),
            value: Value::Reference(0x20),
            size: 16,
            reference: 0x20,
        };
        assert_eq!(info.display_value(), "ArrayList");
    }
}
