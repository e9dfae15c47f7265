use std::collections::HashMap;

/// A single item as returned by the remote store: attribute name to value.
pub type Item = HashMap<String, AttributeValue>;

/// Typed attribute value in the store's wire representation.
///
/// Numbers are kept as their decimal string so that no precision is lost
/// passing through the scanner. With the `serde` feature the enum serializes
/// externally tagged, e.g. `{"S": "value"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeValue {
    #[cfg_attr(feature = "serde", serde(rename = "S"))]
    S(String),
    #[cfg_attr(feature = "serde", serde(rename = "N"))]
    N(String),
    #[cfg_attr(feature = "serde", serde(rename = "B"))]
    B(Vec<u8>),
    #[cfg_attr(feature = "serde", serde(rename = "BOOL"))]
    Bool(bool),
    #[cfg_attr(feature = "serde", serde(rename = "NULL"))]
    Null(bool),
    #[cfg_attr(feature = "serde", serde(rename = "L"))]
    L(Vec<AttributeValue>),
    #[cfg_attr(feature = "serde", serde(rename = "M"))]
    M(HashMap<String, AttributeValue>),
    #[cfg_attr(feature = "serde", serde(rename = "SS"))]
    Ss(Vec<String>),
    #[cfg_attr(feature = "serde", serde(rename = "NS"))]
    Ns(Vec<String>),
    #[cfg_attr(feature = "serde", serde(rename = "BS"))]
    Bs(Vec<Vec<u8>>),
}

impl AttributeValue {
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_n(&self) -> Option<&str> {
        match self {
            Self::N(value) => Some(value),
            _ => None,
        }
    }

    /// Raw bytes for the scalar types that may be used as a key
    /// (`S`, `N`, `B`). Everything else returns `None`.
    pub fn key_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::S(value) | Self::N(value) => Some(value.as_bytes()),
            Self::B(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::S(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::S(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::N(value.to_string())
    }
}
