//! Column definitions and case-insensitive column names.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A column name that compares and hashes case-insensitively while keeping
/// its original spelling for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ColumnName {
    display: String,
    key: String,
}

impl ColumnName {
    /// Creates a column name.
    pub fn new(name: impl Into<String>) -> Self {
        let display = name.into();
        let key = display.to_lowercase();
        Self { display, key }
    }

    /// The name as originally spelled.
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// The normalised lookup key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Case-insensitive comparison against a raw name.
    pub fn matches(&self, name: &str) -> bool {
        self.key == name.to_lowercase()
    }
}

impl PartialEq for ColumnName {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ColumnName {}

impl Hash for ColumnName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for ColumnName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ColumnName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

/// Lets `HashMap<ColumnName, _>` be queried with a normalised `&str` key.
impl Borrow<str> for ColumnName {
    fn borrow(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl From<&str> for ColumnName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ColumnName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&String> for ColumnName {
    fn from(value: &String) -> Self {
        Self::new(value.as_str())
    }
}

impl From<ColumnName> for String {
    fn from(value: ColumnName) -> Self {
        value.display
    }
}

/// The semantic type declared for a column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
    Integer,
    Decimal,
    Date,
    Boolean,
    /// A closed set of allowed labels
    Enum(Vec<String>),
}

/// A grid column.
///
/// Everything except width and visibility is fixed once the grid is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    name: ColumnName,
    column_type: ColumnType,
    editable: bool,
    visible: bool,
    /// Special columns (delete buttons, alert markers) hold no data and are
    /// ignored when deriving `Row::is_empty`.
    special: bool,
    width: Option<u32>,
}

impl Column {
    /// Creates an editable, visible data column.
    pub fn new(name: impl Into<ColumnName>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            editable: true,
            visible: true,
            special: false,
            width: None,
        }
    }

    /// Creates a text column.
    pub fn text(name: impl Into<ColumnName>) -> Self {
        Self::new(name, ColumnType::Text)
    }

    /// Creates an integer column.
    pub fn integer(name: impl Into<ColumnName>) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    /// Creates a special (non-data) column.
    pub fn special(name: impl Into<ColumnName>) -> Self {
        Self {
            special: true,
            editable: false,
            ..Self::new(name, ColumnType::Text)
        }
    }

    pub fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn name(&self) -> &ColumnName {
        &self.name
    }

    pub fn column_type(&self) -> &ColumnType {
        &self.column_type
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_special(&self) -> bool {
        self.special
    }

    pub fn width(&self) -> Option<u32> {
        self.width
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn set_width(&mut self, width: Option<u32>) {
        self.width = width;
    }
}
