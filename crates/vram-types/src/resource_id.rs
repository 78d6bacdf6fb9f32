//! Resource identifier validation.
//!
//! A resource id is chosen by the client and doubles as the stem of the
//! payload file (`<id>.bin`), so it must be safe to join onto the resources
//! directory. Valid ids:
//! - Must be non-empty and at most [`MAX_ID_LEN`] bytes
//! - Must not contain `/`, `\`, NUL or any other control character
//! - Must not contain `..`
//! - Must not start with `.`

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Longest accepted identifier, in bytes.
pub const MAX_ID_LEN: usize = 200;

/// Validated, client-supplied resource identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    /// Validate and wrap an identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use vram_types::ResourceId;
    ///
    /// assert!(ResourceId::new("demo_text").is_ok());
    /// assert!(ResourceId::new("").is_err());
    /// assert!(ResourceId::new("../etc/passwd").is_err());
    /// ```
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        validate(&id)?;
        Ok(Self(id))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

fn validate(id: &str) -> Result<(), TypeError> {
    let reject = |reason: &str| {
        Err(TypeError::InvalidResourceId {
            id: id.to_string(),
            reason: reason.to_string(),
        })
    };

    if id.is_empty() {
        return reject("must not be empty");
    }
    if id.len() > MAX_ID_LEN {
        return reject(&format!("longer than {MAX_ID_LEN} bytes"));
    }
    if id.contains('/') || id.contains('\\') {
        return reject("must not contain path separators");
    }
    if id.chars().any(char::is_control) {
        return reject("must not contain control characters");
    }
    if id.contains("..") {
        return reject("must not contain '..'");
    }
    if id.starts_with('.') {
        return reject("must not start with '.'");
    }
    Ok(())
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self.0)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ResourceId {
    type Error = TypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ResourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
