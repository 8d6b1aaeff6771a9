//! Prefix stripping and command matching.
//!
//! Matching is a plain "starts with" scan over commands in registration
//! order, checking each command's name before its aliases. The first hit
//! wins; there is no longest-match rule and no word boundary, so with
//! commands `a` and `ab` registered in that order, `!ab` resolves to `a`
//! with the token `b`.

use crate::registry::{Command, CommandRegistry};

/// Result of resolving one message.
#[derive(Debug, Clone, Copy)]
pub enum Resolution<'r> {
    /// The text does not start with any configured prefix.
    NotACommand,
    /// A prefix matched but no command name or alias did.
    NotFound,
    /// A command matched.
    Matched(Match<'r>),
}

/// A matched command and the raw argument text after it.
#[derive(Debug, Clone, Copy)]
pub struct Match<'r> {
    pub command: &'r Command,
    /// The name or alias that matched, as registered.
    pub alias: &'r str,
    /// Trimmed argument text; split it with [`Match::tokens`].
    pub rest: &'r str,
}

impl<'r> Match<'r> {
    /// Splits the argument text on whitespace.
    pub fn tokens(&self) -> Vec<&'r str> {
        self.rest.split_whitespace().collect()
    }
}

/// Strips a configured prefix and matches the remainder against a registry.
#[derive(Debug, Clone)]
pub struct Resolver {
    prefixes: Vec<String>,
    case_insensitive: bool,
}

impl Resolver {
    /// Creates a case-sensitive resolver with the given prefixes, tried in
    /// order.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            case_insensitive: false,
        }
    }

    /// Compares command names and aliases ignoring case. Prefixes are always
    /// compared exactly.
    pub fn case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Removes the first matching prefix and trims what remains.
    pub fn strip_prefix<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.prefixes
            .iter()
            .find_map(|prefix| text.strip_prefix(prefix.as_str()))
            .map(str::trim)
    }

    /// Resolves a full message text.
    pub fn resolve<'r>(&self, registry: &'r CommandRegistry, text: &'r str) -> Resolution<'r> {
        match self.strip_prefix(text) {
            None => Resolution::NotACommand,
            Some(remainder) => match self.match_command(registry, remainder) {
                Some(found) => Resolution::Matched(found),
                None => Resolution::NotFound,
            },
        }
    }

    /// Matches prefix-free text against the registry.
    pub fn match_command<'r>(
        &self,
        registry: &'r CommandRegistry,
        remainder: &'r str,
    ) -> Option<Match<'r>> {
        let remainder = remainder.trim();
        registry.iter().find_map(|command| {
            command.info().aliases().iter().find_map(|alias| {
                self.strip_name(remainder, alias).map(|rest| Match {
                    command,
                    alias: alias.as_str(),
                    rest: rest.trim(),
                })
            })
        })
    }

    fn strip_name<'t>(&self, text: &'t str, name: &str) -> Option<&'t str> {
        if self.case_insensitive {
            strip_prefix_ignore_case(text, name)
        } else {
            text.strip_prefix(name)
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(["!"])
    }
}

/// Char-wise case-insensitive `strip_prefix`.
///
/// Walks both strings in lockstep so the returned slice always starts on a
/// char boundary of `text`, even when lowercasing changes byte lengths.
fn strip_prefix_ignore_case<'t>(text: &'t str, prefix: &str) -> Option<&'t str> {
    let mut chars = text.chars();
    for expected in prefix.chars() {
        let actual = chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    Some(chars.as_str())
}
