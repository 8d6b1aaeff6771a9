//! Command metadata and typed argument values.
//!
//! [`CommandInfo`] is the immutable, handler-free description of a registered
//! command. It is shared (behind an `Arc`) between the registry, the
//! dispatcher and every event payload that mentions the command.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ParseNameError;

// =============================================================================
// Parameter types
// =============================================================================

/// Semantic type of one declared command parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamType {
    /// Passed through unchanged. Used when no type is declared.
    #[default]
    String,
    /// Signed 64-bit integer.
    Integer,
    /// 64-bit float.
    Float,
    /// A user id, bare or as a mention.
    UserRef,
    /// A role id, bare or as a mention.
    RoleRef,
    /// A channel id, bare or as a mention.
    ChannelRef,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::UserRef => "user-reference",
            Self::RoleRef => "role-reference",
            Self::ChannelRef => "channel-reference",
        }
    }

    /// Returns the reference kind for the three id-reference types.
    pub fn reference_kind(self) -> Option<ReferenceKind> {
        match self {
            Self::UserRef => Some(ReferenceKind::User),
            Self::RoleRef => Some(ReferenceKind::Role),
            Self::ChannelRef => Some(ReferenceKind::Channel),
            Self::String | Self::Integer | Self::Float => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamType {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "string" | "str" => Self::String,
            "integer" | "int" => Self::Integer,
            "float" => Self::Float,
            "user-reference" | "user" => Self::UserRef,
            "role-reference" | "role" => Self::RoleRef,
            "channel-reference" | "channel" => Self::ChannelRef,
            _ => return Err(ParseNameError::new("parameter type", s)),
        })
    }
}

/// Platform entity an id-reference parameter points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    User,
    Role,
    Channel,
}

// =============================================================================
// Argument values
// =============================================================================

/// One coerced argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Str(String),
    Int(i64),
    Float(f64),
    User(u64),
    Role(u64),
    Channel(u64),
}

impl Arg {
    /// The parameter type this value was coerced to.
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::Str(_) => ParamType::String,
            Self::Int(_) => ParamType::Integer,
            Self::Float(_) => ParamType::Float,
            Self::User(_) => ParamType::UserRef,
            Self::Role(_) => ParamType::RoleRef,
            Self::Channel(_) => ParamType::ChannelRef,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the id carried by any of the three reference variants.
    pub fn as_id(&self) -> Option<u64> {
        match self {
            Self::User(id) | Self::Role(id) | Self::Channel(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::User(id) | Self::Role(id) | Self::Channel(id) => write!(f, "{id}"),
        }
    }
}

/// Accessing an argument with the wrong index or type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("argument {index}: expected {expected}, found {found}")]
pub struct ArgAccessError {
    pub index: usize,
    pub expected: ParamType,
    /// `"nothing"` when the index is out of range.
    pub found: &'static str,
}

/// The coerced argument list handed to a handler.
///
/// Values line up with the command's declared parameters. Typed accessors
/// return an [`ArgAccessError`] which converts into a handler error with `?`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Arg>);

impl Args {
    pub fn new(values: Vec<Arg>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arg> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Arg> {
        self.0
    }

    fn typed<'a, T>(
        &'a self,
        index: usize,
        expected: ParamType,
        pick: impl FnOnce(&'a Arg) -> Option<T>,
    ) -> Result<T, ArgAccessError> {
        let arg = self.0.get(index).ok_or(ArgAccessError {
            index,
            expected,
            found: "nothing",
        })?;
        pick(arg).ok_or(ArgAccessError {
            index,
            expected,
            found: arg.param_type().as_str(),
        })
    }

    pub fn str(&self, index: usize) -> Result<&str, ArgAccessError> {
        self.typed(index, ParamType::String, Arg::as_str)
    }

    pub fn int(&self, index: usize) -> Result<i64, ArgAccessError> {
        self.typed(index, ParamType::Integer, Arg::as_int)
    }

    pub fn float(&self, index: usize) -> Result<f64, ArgAccessError> {
        self.typed(index, ParamType::Float, Arg::as_float)
    }

    pub fn user(&self, index: usize) -> Result<u64, ArgAccessError> {
        self.typed(index, ParamType::UserRef, |a| match a {
            Arg::User(id) => Some(*id),
            _ => None,
        })
    }

    pub fn role(&self, index: usize) -> Result<u64, ArgAccessError> {
        self.typed(index, ParamType::RoleRef, |a| match a {
            Arg::Role(id) => Some(*id),
            _ => None,
        })
    }

    pub fn channel(&self, index: usize) -> Result<u64, ArgAccessError> {
        self.typed(index, ParamType::ChannelRef, |a| match a {
            Arg::Channel(id) => Some(*id),
            _ => None,
        })
    }
}

impl From<Vec<Arg>> for Args {
    fn from(values: Vec<Arg>) -> Self {
        Self(values)
    }
}

impl<'a> IntoIterator for &'a Args {
    type Item = &'a Arg;
    type IntoIter = std::slice::Iter<'a, Arg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// =============================================================================
// Command metadata
// =============================================================================

/// Immutable description of a registered command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    name: String,
    description: String,
    aliases: Vec<String>,
    params: Vec<ParamType>,
}

impl CommandInfo {
    /// Builds command metadata.
    ///
    /// The name is always stored as the first alias; duplicate aliases are
    /// collapsed while keeping first-seen order.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        aliases: impl IntoIterator<Item = String>,
        params: Vec<ParamType>,
    ) -> Self {
        let name = name.into();
        let mut all = vec![name.clone()];
        for alias in aliases {
            if !all.contains(&alias) {
                all.push(alias);
            }
        }
        Self {
            name,
            description: description.into(),
            aliases: all,
            params,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// All names the command answers to, primary name first.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// Returns `true` if `token` equals the name or one of the aliases.
    pub fn answers_to(&self, token: &str) -> bool {
        self.aliases.iter().any(|a| a == token)
    }
}

// =============================================================================
// Cast failures
// =============================================================================

/// Why a raw token could not be coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastFailureReason {
    /// The token does not parse as the declared type.
    Invalid,
    /// No token was supplied for a non-string parameter.
    Missing,
}

/// The first argument that failed coercion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot cast argument {index} ('{token}') to {expected}")]
pub struct CastFailure {
    /// The raw token (empty when the argument was missing).
    pub token: String,
    /// Position of the parameter slot.
    pub index: usize,
    /// Declared type of the slot.
    pub expected: ParamType,
    pub reason: CastFailureReason,
}

impl CastFailure {
    pub fn invalid(index: usize, token: impl Into<String>, expected: ParamType) -> Self {
        Self {
            token: token.into(),
            index,
            expected,
            reason: CastFailureReason::Invalid,
        }
    }

    pub fn missing(index: usize, expected: ParamType) -> Self {
        Self {
            token: String::new(),
            index,
            expected,
            reason: CastFailureReason::Missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_always_an_alias() {
        let info = CommandInfo::new("add", "", vec!["plus".into(), "add".into()], vec![]);
        assert_eq!(info.aliases(), ["add", "plus"]);
        assert!(info.answers_to("add"));
        assert!(info.answers_to("plus"));
        assert!(!info.answers_to("sum"));
    }

    #[test]
    fn test_duplicate_aliases_collapse() {
        let info = CommandInfo::new(
            "x",
            "",
            vec!["y".into(), "y".into(), "z".into()],
            vec![],
        );
        assert_eq!(info.aliases(), ["x", "y", "z"]);
    }

    #[test]
    fn test_param_type_parse() {
        assert_eq!("int".parse::<ParamType>().unwrap(), ParamType::Integer);
        assert_eq!(
            "role-reference".parse::<ParamType>().unwrap(),
            ParamType::RoleRef
        );
        assert!("date".parse::<ParamType>().is_err());
        assert_eq!(ParamType::default(), ParamType::String);
    }

    #[test]
    fn test_typed_accessors() {
        let args = Args::new(vec![Arg::Int(2), Arg::Str("x".into()), Arg::User(9)]);
        assert_eq!(args.int(0).unwrap(), 2);
        assert_eq!(args.str(1).unwrap(), "x");
        assert_eq!(args.user(2).unwrap(), 9);

        let err = args.int(1).unwrap_err();
        assert_eq!(err.found, "string");
        let err = args.str(5).unwrap_err();
        assert_eq!(err.found, "nothing");
    }
}
