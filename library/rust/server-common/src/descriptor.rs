//! Static variant -> descriptor tables for enums exposed to clients.
//!
//! Each enum carries a fixed table of `{ value, code, name, description }`
//! entries. `code` is the stable identifier sent over the wire; `name` is the
//! display text.

use serde::Serialize;

/// EnumDescriptor describes one enum variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnumDescriptor {
    pub value: i32,
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

impl EnumDescriptor {
    pub const fn new(
        value: i32,
        code: &'static str,
        name: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            value,
            code,
            name,
            description,
        }
    }
}

/// Described is implemented by enums backed by a descriptor table.
pub trait Described: Sized + Copy + PartialEq + 'static {
    /// Enum name used by the enum list endpoint.
    const TYPE_NAME: &'static str;

    /// Every variant, in display order.
    fn all() -> &'static [Self];

    fn descriptor(self) -> EnumDescriptor;

    fn code(self) -> &'static str {
        self.descriptor().code
    }

    fn display_name(self) -> &'static str {
        self.descriptor().name
    }

    fn value(self) -> i32 {
        self.descriptor().value
    }

    /// Case-insensitive lookup by code.
    fn from_code(code: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|v| v.code().eq_ignore_ascii_case(code))
    }

    fn from_value(value: i32) -> Option<Self> {
        Self::all().iter().copied().find(|v| v.value() == value)
    }

    fn descriptors() -> Vec<EnumDescriptor> {
        Self::all().iter().map(|v| v.descriptor()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Color {
        Red,
        Blue,
    }

    impl Described for Color {
        const TYPE_NAME: &'static str = "Color";

        fn all() -> &'static [Self] {
            &[Color::Red, Color::Blue]
        }

        fn descriptor(self) -> EnumDescriptor {
            match self {
                Color::Red => EnumDescriptor::new(1, "Red", "Red", "warm"),
                Color::Blue => EnumDescriptor::new(2, "Blue", "Blue", "cold"),
            }
        }
    }

    #[test]
    fn test_lookup_by_code_and_value() {
        assert_eq!(Color::from_code("red"), Some(Color::Red));
        assert_eq!(Color::from_value(2), Some(Color::Blue));
        assert_eq!(Color::from_code("green"), None);
        assert_eq!(Color::descriptors().len(), 2);
    }

    #[test]
    fn test_descriptor_serializes_pascal_case() {
        let json = serde_json::to_value(Color::Red.descriptor()).unwrap();
        assert_eq!(json["Code"], "Red");
        assert_eq!(json["Value"], 1);
        assert_eq!(json["Description"], "warm");
    }
}
