//! Client classes: the labels endpoints authorize against.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A label from the application's own set of client kinds, such as
/// `"browser"`, `"admin"` or `"kiosk"`.
///
/// Every client carries exactly one class, fixed when it is added to a
/// session. Every endpoint lists the classes allowed to call it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientClass(String);

impl ClientClass {
    /// Creates a class from its label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Returns the label.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientClass {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for ClientClass {
    fn from(label: String) -> Self {
        Self(label)
    }
}
