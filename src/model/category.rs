use serde::{Deserialize, Serialize};

/// A user-defined task category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Client-generated unique id
    pub id: String,
    pub name: String,
    /// Usually a palette value, but any string is accepted
    pub color: String,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Category {
            id: id.into(),
            name: name.into(),
            color: color.into(),
        }
    }
}

/// A named entry of the category color palette
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteColor {
    pub name: &'static str,
    pub value: &'static str,
}

pub const CATEGORY_COLORS: [PaletteColor; 10] = [
    PaletteColor { name: "Red", value: "#ef4444" },
    PaletteColor { name: "Orange", value: "#f97316" },
    PaletteColor { name: "Amber", value: "#f59e0b" },
    PaletteColor { name: "Green", value: "#22c55e" },
    PaletteColor { name: "Teal", value: "#14b8a6" },
    PaletteColor { name: "Blue", value: "#3b82f6" },
    PaletteColor { name: "Indigo", value: "#6366f1" },
    PaletteColor { name: "Purple", value: "#a855f7" },
    PaletteColor { name: "Pink", value: "#ec4899" },
    PaletteColor { name: "Gray", value: "#6b7280" },
];

/// Resolve a palette color name (case-insensitive) to its value
pub fn color_by_name(name: &str) -> Option<&'static str> {
    CATEGORY_COLORS
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
        .map(|c| c.value)
}

/// Name of the palette entry with this value, if any
pub fn palette_name(value: &str) -> Option<&'static str> {
    CATEGORY_COLORS
        .iter()
        .find(|c| c.value.eq_ignore_ascii_case(value))
        .map(|c| c.name)
}
