use std::{borrow::Cow, collections::BTreeMap};

use derive_more::From;
use serde::{Deserialize, Serialize};

/// Attribute key holding the bucketing identifier used for percentage rollouts.
pub const BUCKETING_ATTRIBUTE: &str = "uid";

/// Request-scoped attributes a rollout is evaluated against.
///
/// Keys are attribute names such as `"owner"`, `"repo"`, or `"user"`. The bucketing identifier
/// lives under [`BUCKETING_ATTRIBUTE`].
///
/// # Examples
/// ```
/// # use rollout::{Attributes, AttributeValue};
/// let attributes = [
///     ("uid".to_owned(), 42.into()),
///     ("owner".to_owned(), "carlad".into()),
///     ("repo".to_owned(), AttributeValue::Null),
/// ].into_iter().collect::<Attributes>();
/// ```
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Value of a single request attribute.
///
/// Deserializes from plain JSON values, so attributes can be taken directly from a request
/// payload.
#[derive(Debug, Serialize, Deserialize, PartialEq, PartialOrd, From, Clone)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A string value.
    String(String),
    /// An integer value.
    Integer(i64),
    /// A non-integer numerical value.
    Number(f64),
    /// A boolean value.
    Boolean(bool),
    /// A null value or absence of value.
    Null,
}

impl AttributeValue {
    /// Returns the string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns `true` for [`AttributeValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Representation used when looking the value up in an allow-list.
    ///
    /// Only strings and integers can be listed. Everything else is never a member.
    pub(crate) fn as_list_member(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::String(s) => Some(Cow::Borrowed(s)),
            Self::Integer(i) => Some(Cow::Owned(i.to_string())),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        Self::Integer(value.into())
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
