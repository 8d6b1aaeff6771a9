//! Argument coercion.
//!
//! Raw tokens are paired with a command's declared [`ParamType`]s and cast one
//! by one. Surplus tokens are bundled into the last slot, so a single `String`
//! parameter receives the whole rest of the message:
//!
//! | params              | tokens        | result                     |
//! |---------------------|---------------|----------------------------|
//! | `[]`                | `a b`         | `[]`                       |
//! | `[String]`          | `a b c`       | `["a b c"]`                |
//! | `[Integer, String]` | `2 a b`       | `[2, "a b"]`               |
//! | `[Integer, String]` | `2`           | `[2, ""]`                  |
//! | `[Integer, Integer]`| `2`           | missing argument 1         |
//! | `[Integer, Integer]`| `2 x`         | cannot cast `x`            |

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::trace;

use parley_core::{Arg, Args, CastFailure, ParamType, ReferenceKind};

// ============================================================================
// Mention resolution
// ============================================================================

/// Turns a reference token into a platform id.
///
/// Implement this to support a transport's own mention syntax.
pub trait MentionResolver: Send + Sync + 'static {
    /// Returns the id `token` refers to, or `None` if it is not a valid
    /// reference of the given kind.
    fn resolve(&self, kind: ReferenceKind, token: &str) -> Option<u64>;
}

static USER_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<@!?(\d+)>$").expect("user mention pattern is valid"));
static ROLE_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<@&(\d+)>$").expect("role mention pattern is valid"));
static CHANNEL_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<#(\d+)>$").expect("channel mention pattern is valid"));

/// Regex-based [`MentionResolver`].
///
/// Accepts a bare numeric id for every kind, plus `<@id>` / `<@!id>` for
/// users, `<@&id>` for roles and `<#id>` for channels by default.
#[derive(Debug, Clone)]
pub struct PatternMentionResolver {
    user: Regex,
    role: Regex,
    channel: Regex,
}

impl PatternMentionResolver {
    /// Uses custom patterns. Each pattern must match the whole token and
    /// capture the numeric id in its first group.
    pub fn with_patterns(user: &str, role: &str, channel: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            user: Regex::new(user)?,
            role: Regex::new(role)?,
            channel: Regex::new(channel)?,
        })
    }

    fn pattern(&self, kind: ReferenceKind) -> &Regex {
        match kind {
            ReferenceKind::User => &self.user,
            ReferenceKind::Role => &self.role,
            ReferenceKind::Channel => &self.channel,
        }
    }
}

impl Default for PatternMentionResolver {
    fn default() -> Self {
        Self {
            user: USER_MENTION.clone(),
            role: ROLE_MENTION.clone(),
            channel: CHANNEL_MENTION.clone(),
        }
    }
}

impl MentionResolver for PatternMentionResolver {
    fn resolve(&self, kind: ReferenceKind, token: &str) -> Option<u64> {
        if let Ok(id) = token.parse() {
            return Some(id);
        }
        self.pattern(kind)
            .captures(token)?
            .get(1)?
            .as_str()
            .parse()
            .ok()
    }
}

// ============================================================================
// ArgumentCoercer
// ============================================================================

/// Casts raw tokens to a command's declared parameter types.
#[derive(Clone)]
pub struct ArgumentCoercer {
    mentions: Arc<dyn MentionResolver>,
}

impl ArgumentCoercer {
    pub fn new(mentions: impl MentionResolver) -> Self {
        Self {
            mentions: Arc::new(mentions),
        }
    }

    pub fn from_arc(mentions: Arc<dyn MentionResolver>) -> Self {
        Self { mentions }
    }

    /// Coerces `tokens` into arguments matching `params`.
    ///
    /// Stops at the first token that cannot be cast; no partial argument list
    /// is ever returned.
    pub fn coerce<S: AsRef<str>>(
        &self,
        params: &[ParamType],
        tokens: &[S],
    ) -> Result<Args, CastFailure> {
        let slots = bundle_overflow(params.len(), tokens);
        let mut values = Vec::with_capacity(params.len());

        for (index, &expected) in params.iter().enumerate() {
            let value = match slots.get(index) {
                Some(token) => self.cast(index, token, expected)?,
                None if expected == ParamType::String => Arg::Str(String::new()),
                None => return Err(CastFailure::missing(index, expected)),
            };
            trace!(index, %expected, value = %value, "Coerced argument");
            values.push(value);
        }
        Ok(Args::new(values))
    }

    fn cast(&self, index: usize, token: &str, expected: ParamType) -> Result<Arg, CastFailure> {
        let invalid = || CastFailure::invalid(index, token, expected);
        match expected {
            ParamType::String => Ok(Arg::Str(token.to_owned())),
            ParamType::Integer => token.parse().map(Arg::Int).map_err(|_| invalid()),
            ParamType::Float => token.parse().map(Arg::Float).map_err(|_| invalid()),
            ParamType::UserRef => self.reference(ReferenceKind::User, token, Arg::User, invalid),
            ParamType::RoleRef => self.reference(ReferenceKind::Role, token, Arg::Role, invalid),
            ParamType::ChannelRef => {
                self.reference(ReferenceKind::Channel, token, Arg::Channel, invalid)
            }
        }
    }

    fn reference(
        &self,
        kind: ReferenceKind,
        token: &str,
        wrap: fn(u64) -> Arg,
        invalid: impl FnOnce() -> CastFailure,
    ) -> Result<Arg, CastFailure> {
        self.mentions.resolve(kind, token).map(wrap).ok_or_else(invalid)
    }
}

impl Default for ArgumentCoercer {
    fn default() -> Self {
        Self::new(PatternMentionResolver::default())
    }
}

impl fmt::Debug for ArgumentCoercer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentCoercer").finish_non_exhaustive()
    }
}

/// Lines tokens up with `slots` parameter slots.
///
/// With more tokens than slots, everything from the last slot onward is
/// joined with single spaces. With zero slots nothing is kept.
pub fn bundle_overflow<S: AsRef<str>>(slots: usize, tokens: &[S]) -> Vec<String> {
    if slots == 0 {
        return Vec::new();
    }
    if tokens.len() <= slots {
        return tokens.iter().map(|t| t.as_ref().to_owned()).collect();
    }

    let (head, tail) = tokens.split_at(slots - 1);
    let mut out: Vec<String> = head.iter().map(|t| t.as_ref().to_owned()).collect();
    out.push(tail.iter().map(|t| t.as_ref()).collect::<Vec<&str>>().join(" "));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::CastFailureReason;

    fn coerce(params: &[ParamType], text: &str) -> Result<Args, CastFailure> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        ArgumentCoercer::default().coerce(params, &tokens)
    }

    #[test]
    fn test_no_params_ignores_tokens() {
        let args = coerce(&[], "a b c").unwrap();
        assert!(args.is_empty());
    }

    #[test]
    fn test_overflow_bundles_into_last_slot() {
        let args = coerce(&[ParamType::String], "a b c").unwrap();
        assert_eq!(args.into_inner(), [Arg::Str("a b c".into())]);

        let args = coerce(&[ParamType::Integer, ParamType::String], "2 a  b").unwrap();
        assert_eq!(args.into_inner(), [Arg::Int(2), Arg::Str("a b".into())]);
    }

    #[test]
    fn test_integers() {
        let args = coerce(&[ParamType::Integer, ParamType::Integer], "2 -3").unwrap();
        assert_eq!(args.int(0).unwrap(), 2);
        assert_eq!(args.int(1).unwrap(), -3);
    }

    #[test]
    fn test_invalid_token_reports_first_failure() {
        let err = coerce(&[ParamType::Integer, ParamType::Integer], "2 x").unwrap_err();
        assert_eq!(err, CastFailure::invalid(1, "x", ParamType::Integer));

        let err = coerce(&[ParamType::Float, ParamType::Integer], "y x").unwrap_err();
        assert_eq!(err.token, "y");
        assert_eq!(err.index, 0);
    }

    #[test]
    fn test_missing_arguments() {
        let args = coerce(&[ParamType::Integer, ParamType::String], "2").unwrap();
        assert_eq!(args.str(1).unwrap(), "");

        let err = coerce(&[ParamType::Integer, ParamType::Integer], "2").unwrap_err();
        assert_eq!(err.reason, CastFailureReason::Missing);
        assert_eq!(err.index, 1);
        assert!(err.token.is_empty());
    }

    #[test]
    fn test_floats() {
        let args = coerce(&[ParamType::Float], "2.5").unwrap();
        assert_eq!(args.float(0).unwrap(), 2.5);
        assert!(coerce(&[ParamType::Float], "two").is_err());
    }

    #[test]
    fn test_references() {
        let params = [ParamType::UserRef, ParamType::RoleRef, ParamType::ChannelRef];
        let args = coerce(&params, "<@!10> <@&20> <#30>").unwrap();
        assert_eq!(args.user(0).unwrap(), 10);
        assert_eq!(args.role(1).unwrap(), 20);
        assert_eq!(args.channel(2).unwrap(), 30);

        let args = coerce(&params, "<@10> 20 30").unwrap();
        assert_eq!(args.into_inner(), [Arg::User(10), Arg::Role(20), Arg::Channel(30)]);

        // A role mention is not a user reference.
        let err = coerce(&[ParamType::UserRef], "<@&10>").unwrap_err();
        assert_eq!(err.expected, ParamType::UserRef);
    }

    #[test]
    fn test_mention_patterns_are_anchored() {
        let mentions = PatternMentionResolver::default();
        assert_eq!(mentions.resolve(ReferenceKind::User, "x<@1>"), None);
        assert_eq!(mentions.resolve(ReferenceKind::Channel, "<#1>x"), None);
    }

    #[test]
    fn test_custom_patterns() {
        let mentions =
            PatternMentionResolver::with_patterns(r"^@(\d+)$", r"^&(\d+)$", r"^#(\d+)$").unwrap();
        let coercer = ArgumentCoercer::new(mentions);
        let args = coercer
            .coerce(&[ParamType::UserRef, ParamType::ChannelRef], &["@5", "#6"])
            .unwrap();
        assert_eq!(args.into_inner(), [Arg::User(5), Arg::Channel(6)]);

        assert!(PatternMentionResolver::with_patterns("(", "", "").is_err());
    }

    #[test]
    fn test_bundle_overflow() {
        assert_eq!(bundle_overflow(2, &["a", "b", "c"]), ["a", "b c"]);
        assert_eq!(bundle_overflow(3, &["a"]), ["a"]);
        assert!(bundle_overflow(0, &["a"]).is_empty());
    }
}
