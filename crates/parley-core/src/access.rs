//! Access restriction predicates.
//!
//! A [`Restriction`] is a pure predicate over a [`DispatchContext`]. Checking
//! it yields either `Ok(())` or a [`Denial`] naming the restriction kind and
//! the requirement the author failed. Wrapping handlers with restrictions is
//! done by the framework's restrict layer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::DispatchContext;
use crate::permission::Permission;

/// An authorization predicate attached to a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Restriction {
    /// The author must hold this role.
    Role(u64),
    /// The author must be one of these users.
    Users(Vec<u64>),
    /// The message must be posted in one of these channels.
    Channels(Vec<u64>),
    /// The message must come from one of these guilds. Direct messages never
    /// pass.
    Guilds(Vec<u64>),
    /// The author must hold every listed permission.
    Permissions(Vec<Permission>),
}

/// Discriminant of a [`Restriction`], used as the denial reason tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestrictionKind {
    Role,
    User,
    Channel,
    Guild,
    Permission,
}

impl RestrictionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Role => "ROLE",
            Self::User => "USER",
            Self::Channel => "CHANNEL",
            Self::Guild => "GUILD",
            Self::Permission => "PERMISSION",
        }
    }
}

impl fmt::Display for RestrictionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The specific requirement that was not met.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Role(u64),
    /// One of these users.
    Users(Vec<u64>),
    /// One of these channels.
    Channels(Vec<u64>),
    /// One of these guilds.
    Guilds(Vec<u64>),
    /// The first permission the author lacks.
    Permission(Permission),
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn ids(f: &mut fmt::Formatter<'_>, label: &str, ids: &[u64]) -> fmt::Result {
            write!(f, "{label} in [")?;
            for (i, id) in ids.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{id}")?;
            }
            f.write_str("]")
        }

        match self {
            Self::Role(id) => write!(f, "role {id}"),
            Self::Users(list) => ids(f, "user", list),
            Self::Channels(list) => ids(f, "channel", list),
            Self::Guilds(list) => ids(f, "guild", list),
            Self::Permission(p) => write!(f, "permission {p}"),
        }
    }
}

/// Why a restriction rejected a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub kind: RestrictionKind,
    pub requirement: Requirement,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: requires {}", self.kind, self.requirement)
    }
}

impl Restriction {
    pub fn kind(&self) -> RestrictionKind {
        match self {
            Self::Role(_) => RestrictionKind::Role,
            Self::Users(_) => RestrictionKind::User,
            Self::Channels(_) => RestrictionKind::Channel,
            Self::Guilds(_) => RestrictionKind::Guild,
            Self::Permissions(_) => RestrictionKind::Permission,
        }
    }

    /// Evaluates the predicate against `ctx`.
    pub fn check(&self, ctx: &DispatchContext) -> Result<(), Denial> {
        let failed = match self {
            Self::Role(role) => (!ctx.has_role(*role)).then(|| Requirement::Role(*role)),
            Self::Users(users) => {
                (!users.contains(&ctx.author_id())).then(|| Requirement::Users(users.clone()))
            }
            Self::Channels(channels) => (!channels.contains(&ctx.channel_id()))
                .then(|| Requirement::Channels(channels.clone())),
            Self::Guilds(guilds) => {
                let allowed = ctx.guild_id().is_some_and(|g| guilds.contains(&g));
                (!allowed).then(|| Requirement::Guilds(guilds.clone()))
            }
            Self::Permissions(required) => ctx
                .permissions()
                .first_missing(required)
                .map(Requirement::Permission),
        };

        match failed {
            None => Ok(()),
            Some(requirement) => Err(Denial {
                kind: self.kind(),
                requirement,
            }),
        }
    }
}
