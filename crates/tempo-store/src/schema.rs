use crate::error::{Result, StoreError};

/// Semantic type of a schema attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    /// UTF-8 string, stored as TEXT.
    Text,
    /// 64-bit signed integer, stored as INTEGER.
    Integer,
    /// Boolean, stored as INTEGER 0/1.
    Bool,
    /// 64-bit float, stored as REAL.
    Real,
    /// JSON list/object, serialised to a TEXT blob.
    Structured,
}

impl AttrType {
    pub(crate) fn sql_type(self) -> &'static str {
        match self {
            AttrType::Text | AttrType::Structured => "TEXT",
            AttrType::Integer | AttrType::Bool => "INTEGER",
            AttrType::Real => "REAL",
        }
    }
}

impl std::fmt::Display for AttrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AttrType::Text => "text",
            AttrType::Integer => "integer",
            AttrType::Bool => "boolean",
            AttrType::Real => "real",
            AttrType::Structured => "structured",
        };
        write!(f, "{s}")
    }
}

/// A typed attribute value, as seen by callers of the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Bool(bool),
    Real(f64),
    Structured(serde_json::Value),
}

impl Value {
    /// The [`AttrType`] this value belongs to.
    pub fn type_of(&self) -> AttrType {
        match self {
            Value::Text(_) => AttrType::Text,
            Value::Integer(_) => AttrType::Integer,
            Value::Bool(_) => AttrType::Bool,
            Value::Real(_) => AttrType::Real,
            Value::Structured(_) => AttrType::Structured,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_structured(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Structured(j) => Some(j),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl From<serde_json::Value> for Value {
    fn from(j: serde_json::Value) -> Self {
        Value::Structured(j)
    }
}

/// Ordered attribute declaration for one store instance.
///
/// Attribute names become column names, so they are validated once here
/// rather than on every statement.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    attrs: Vec<(String, AttrType)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style: declare one attribute. Order is preserved and becomes
    /// the column order of the backing table.
    pub fn with_attr(mut self, name: &str, ty: AttrType) -> Self {
        self.attrs.push((name.to_string(), ty));
        self
    }

    pub fn attr_type(&self, name: &str) -> Option<AttrType> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| *ty)
    }

    pub fn has(&self, name: &str) -> bool {
        self.attrs.iter().any(|(n, _)| n == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attrs.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, AttrType)> {
        self.attrs.iter().map(|(n, ty)| (n.as_str(), *ty))
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Reject schemas that cannot be mapped onto a table: empty, duplicate
    /// names, the reserved `id` column, or names that are not plain
    /// identifiers.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.attrs.is_empty() {
            return Err(StoreError::InvalidSchema(
                "schema must declare at least one attribute".into(),
            ));
        }
        for (i, (name, _)) in self.attrs.iter().enumerate() {
            if name == "id" {
                return Err(StoreError::InvalidSchema(
                    "'id' is reserved for the primary key".into(),
                ));
            }
            if !is_identifier(name) {
                return Err(StoreError::InvalidSchema(format!(
                    "attribute name '{name}' is not a valid identifier"
                )));
            }
            if self.attrs[..i].iter().any(|(n, _)| n == name) {
                return Err(StoreError::InvalidSchema(format!(
                    "duplicate attribute name '{name}'"
                )));
            }
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
