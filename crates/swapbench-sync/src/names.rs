//! Typed topic handles and barrier state names.

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

use crate::constants::MAX_NAME_LENGTH;
use crate::error::InvalidNameSnafu;
use crate::error::Result;

/// A named broadcast channel carrying values of type `T`.
///
/// The type parameter pins the message type of a topic at compile time, so a
/// publisher and a subscriber sharing the same `Topic` constant cannot
/// disagree on the payload shape.
pub struct Topic<T> {
    name: Cow<'static, str>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Topic<T> {
    /// Create a topic handle from a static name.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            _marker: PhantomData,
        }
    }

    /// Create a topic handle from a runtime name.
    pub fn owned(name: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            _marker: PhantomData,
        }
    }

    /// Topic name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Topic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Topic").field(&self.name).finish()
    }
}

impl<T> fmt::Display for Topic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A named barrier counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State(Cow<'static, str>);

impl State {
    /// Create a state from a static name.
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// State name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate a topic or state name.
///
/// Names must be non-empty, at most [`MAX_NAME_LENGTH`] bytes, and contain only
/// ASCII alphanumerics, `-`, `_` and `.`.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return InvalidNameSnafu {
            name,
            reason: "name is empty",
        }
        .fail();
    }

    if name.len() > MAX_NAME_LENGTH {
        return InvalidNameSnafu {
            name,
            reason: format!("name is {} bytes (max {})", name.len(), MAX_NAME_LENGTH),
        }
        .fail();
    }

    if let Some(ch) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))) {
        return InvalidNameSnafu {
            name,
            reason: format!("invalid character {:?}", ch),
        }
        .fail();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_name("ready").is_ok());
        assert!(validate_name("blocks.v1").is_ok());
        assert!(validate_name("run-42_provider").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        assert!(validate_name("").is_err());
        assert!(validate_name("has space").is_err());
        assert!(validate_name("slash/name").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_topic_clone_keeps_name() {
        const BLOCKS: Topic<String> = Topic::new("blocks");
        let copy = BLOCKS.clone();
        assert_eq!(copy.name(), "blocks");
        assert_eq!(Topic::<u32>::owned("dyn").to_string(), "dyn");
    }

    #[test]
    fn test_state_name_and_display() {
        const READY: State = State::new("ready");
        assert_eq!(READY.name(), "ready");
        assert_eq!(READY.to_string(), "ready");
        assert_eq!(READY.clone(), State::new("ready"));
    }
}
