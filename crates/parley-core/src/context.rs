//! The read-only view of one inbound message.
//!
//! A transport builds one [`DispatchContext`] per message and hands it to the
//! dispatcher. The context is shared as an `Arc` for the duration of a single
//! dispatch cycle and is never mutated afterwards; handlers that need data
//! beyond the cycle copy it out.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::permission::{Permission, PermissionSet};

/// Snapshot of a message and its author, as seen by the dispatch core.
///
/// # Example
///
/// ```rust
/// use parley_core::{DispatchContext, Permission};
///
/// let ctx = DispatchContext::new(42, 7, "!ping")
///     .with_guild(1)
///     .with_role(900)
///     .with_permission(Permission::SendMessages);
///
/// assert!(ctx.has_role(900));
/// assert!(ctx.permissions().contains(Permission::SendMessages));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchContext {
    author_id: u64,
    channel_id: u64,
    #[serde(default)]
    guild_id: Option<u64>,
    #[serde(default)]
    roles: BTreeSet<u64>,
    #[serde(default)]
    permissions: PermissionSet,
    content: String,
}

impl DispatchContext {
    /// Creates a context for a message outside any guild, with no roles and
    /// no permissions.
    pub fn new(author_id: u64, channel_id: u64, content: impl Into<String>) -> Self {
        Self {
            author_id,
            channel_id,
            guild_id: None,
            roles: BTreeSet::new(),
            permissions: PermissionSet::new(),
            content: content.into(),
        }
    }

    pub fn with_guild(mut self, guild_id: u64) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    pub fn with_role(mut self, role_id: u64) -> Self {
        self.roles.insert(role_id);
        self
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = u64>) -> Self {
        self.roles.extend(roles);
        self
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.insert(permission);
        self
    }

    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = permissions;
        self
    }

    /// Identifier of the message author.
    pub fn author_id(&self) -> u64 {
        self.author_id
    }

    /// Identifier of the channel the message was posted in.
    pub fn channel_id(&self) -> u64 {
        self.channel_id
    }

    /// Identifier of the guild, or `None` for direct messages.
    pub fn guild_id(&self) -> Option<u64> {
        self.guild_id
    }

    pub fn roles(&self) -> &BTreeSet<u64> {
        &self.roles
    }

    pub fn has_role(&self, role_id: u64) -> bool {
        self.roles.contains(&role_id)
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// The raw message text, prefix included.
    pub fn content(&self) -> &str {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let ctx = DispatchContext::new(1, 2, "hi");
        assert_eq!(ctx.author_id(), 1);
        assert_eq!(ctx.channel_id(), 2);
        assert_eq!(ctx.guild_id(), None);
        assert!(ctx.roles().is_empty());
        assert!(ctx.permissions().is_empty());
        assert_eq!(ctx.content(), "hi");
    }

    #[test]
    fn test_deserialize_from_transport_json() {
        let raw = r#"{
            "author_id": 10,
            "channel_id": 20,
            "guild_id": 30,
            "roles": [5, 6],
            "permissions": ["change_nickname"],
            "content": "!nick <@10> Bob"
        }"#;
        let ctx: DispatchContext = serde_json::from_str(raw).unwrap();
        assert_eq!(ctx.guild_id(), Some(30));
        assert!(ctx.has_role(6));
        assert!(ctx.permissions().contains(Permission::ChangeNickname));
    }

    #[test]
    fn test_deserialize_optional_fields() {
        let raw = r#"{"author_id": 1, "channel_id": 2, "content": "x"}"#;
        let ctx: DispatchContext = serde_json::from_str(raw).unwrap();
        assert_eq!(ctx.guild_id(), None);
        assert!(ctx.roles().is_empty());
    }
}
