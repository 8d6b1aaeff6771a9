//! Platform capabilities held by a message author.
//!
//! Capabilities are a closed [`Permission`] enum collected in a
//! [`PermissionSet`]. Restriction checks query the set through
//! [`PermissionSet::contains`] instead of looking flags up by name at runtime.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseNameError;

/// A single capability a platform can grant to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Administrator,
    ManageGuild,
    ManageRoles,
    ManageChannels,
    ManageMessages,
    ManageNicknames,
    ManageWebhooks,
    ChangeNickname,
    KickMembers,
    BanMembers,
    ModerateMembers,
    ViewAuditLog,
    ViewChannel,
    SendMessages,
    ReadMessageHistory,
    EmbedLinks,
    AttachFiles,
    AddReactions,
    MentionEveryone,
    UseExternalEmojis,
    CreateInstantInvite,
}

impl Permission {
    /// Every permission, in declaration order.
    pub const ALL: [Permission; 21] = [
        Self::Administrator,
        Self::ManageGuild,
        Self::ManageRoles,
        Self::ManageChannels,
        Self::ManageMessages,
        Self::ManageNicknames,
        Self::ManageWebhooks,
        Self::ChangeNickname,
        Self::KickMembers,
        Self::BanMembers,
        Self::ModerateMembers,
        Self::ViewAuditLog,
        Self::ViewChannel,
        Self::SendMessages,
        Self::ReadMessageHistory,
        Self::EmbedLinks,
        Self::AttachFiles,
        Self::AddReactions,
        Self::MentionEveryone,
        Self::UseExternalEmojis,
        Self::CreateInstantInvite,
    ];

    /// Returns the snake_case name used in configuration and log output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::ManageGuild => "manage_guild",
            Self::ManageRoles => "manage_roles",
            Self::ManageChannels => "manage_channels",
            Self::ManageMessages => "manage_messages",
            Self::ManageNicknames => "manage_nicknames",
            Self::ManageWebhooks => "manage_webhooks",
            Self::ChangeNickname => "change_nickname",
            Self::KickMembers => "kick_members",
            Self::BanMembers => "ban_members",
            Self::ModerateMembers => "moderate_members",
            Self::ViewAuditLog => "view_audit_log",
            Self::ViewChannel => "view_channel",
            Self::SendMessages => "send_messages",
            Self::ReadMessageHistory => "read_message_history",
            Self::EmbedLinks => "embed_links",
            Self::AttachFiles => "attach_files",
            Self::AddReactions => "add_reactions",
            Self::MentionEveryone => "mention_everyone",
            Self::UseExternalEmojis => "use_external_emojis",
            Self::CreateInstantInvite => "create_instant_invite",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == lowered)
            .ok_or_else(|| ParseNameError::new("permission", s))
    }
}

/// The set of capabilities held by the author of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the author holds `permission`.
    ///
    /// [`Permission::Administrator`] is treated as a plain capability; it does
    /// not imply the others.
    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    /// Returns the first permission in `required` that is not held.
    pub fn first_missing<'a, I>(&self, required: I) -> Option<Permission>
    where
        I: IntoIterator<Item = &'a Permission>,
    {
        required.into_iter().copied().find(|p| !self.contains(*p))
    }

    pub fn insert(&mut self, permission: Permission) -> bool {
        self.0.insert(permission)
    }

    pub fn remove(&mut self, permission: Permission) -> bool {
        self.0.remove(&permission)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Permission; N]> for PermissionSet {
    fn from(value: [Permission; N]) -> Self {
        value.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for permission in Permission::ALL {
            assert_eq!(permission.as_str().parse::<Permission>().unwrap(), permission);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(
            "Change_Nickname".parse::<Permission>().unwrap(),
            Permission::ChangeNickname
        );
        assert!("fly".parse::<Permission>().is_err());
    }

    #[test]
    fn test_first_missing_reports_in_order() {
        let held = PermissionSet::from([Permission::SendMessages, Permission::KickMembers]);
        let required = [
            Permission::SendMessages,
            Permission::BanMembers,
            Permission::ManageRoles,
        ];
        assert_eq!(held.first_missing(&required), Some(Permission::BanMembers));
        assert_eq!(held.first_missing(&[Permission::KickMembers]), None);
    }

    #[test]
    fn test_administrator_does_not_imply_others() {
        let held = PermissionSet::from([Permission::Administrator]);
        assert!(held.contains(Permission::Administrator));
        assert!(!held.contains(Permission::BanMembers));
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let set: PermissionSet = serde_json::from_str(r#"["kick_members","send_messages"]"#).unwrap();
        assert!(set.contains(Permission::KickMembers));
        assert_eq!(set.len(), 2);
    }
}
