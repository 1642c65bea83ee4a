use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

snowflake!(
    /// A text channel or category.
    ChannelId
);
snowflake!(UserId);
snowflake!(
    /// A guild role. The guild's own id doubles as its @everyone role.
    RoleId
);
snowflake!(MessageId);

/// Persisted state of one ticket channel.
///
/// The claimer is a single `Option` so "claimed without a claimer" cannot be
/// represented; the store maps it onto the `claimed`/`claimer_id` columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub channel_id: ChannelId,
    pub creator_id: UserId,
    pub other_user_id: Option<UserId>,
    pub other_user_input: String,
    pub trade_details: String,
    pub can_join_vip: String,
    pub claimer_id: Option<UserId>,
}

impl Ticket {
    pub fn is_claimed(&self) -> bool {
        self.claimer_id.is_some()
    }

    pub fn is_claimer(&self, user: UserId) -> bool {
        self.claimer_id == Some(user)
    }
}

/// Values submitted through the ticket request form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRequest {
    pub trade_details: String,
    pub other_user: String,
    pub can_join_vip: String,
}

/// A guild member as seen by the ticket workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: UserId,
    pub username: String,
    /// `name#discriminator` for legacy accounts, otherwise the username.
    pub tag: String,
    pub roles: Vec<RoleId>,
}

impl Member {
    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }

    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// One message of channel history, reduced to what a transcript needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub id: MessageId,
    pub author_tag: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// First embed of the message, if it carries any.
    pub embed: Option<EmbedPreview>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedPreview {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewChannel,
    SendMessages,
    ReadMessageHistory,
    ManageMessages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverwriteTarget {
    Role(RoleId),
    Member(UserId),
}

/// A channel permission overwrite. Setting one replaces any existing
/// overwrite for the same target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overwrite {
    pub target: OverwriteTarget,
    pub allow: Vec<Permission>,
    pub deny: Vec<Permission>,
}

impl Overwrite {
    pub fn allow(target: OverwriteTarget, allow: &[Permission]) -> Self {
        Self {
            target,
            allow: allow.to_vec(),
            deny: vec![],
        }
    }

    pub fn deny(target: OverwriteTarget, deny: &[Permission]) -> Self {
        Self {
            target,
            allow: vec![],
            deny: deny.to_vec(),
        }
    }

    pub fn grants(&self, permission: Permission) -> bool {
        self.allow.contains(&permission) && !self.deny.contains(&permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(claimer: Option<u64>) -> Ticket {
        Ticket {
            channel_id: ChannelId::new(1),
            creator_id: UserId::new(2),
            other_user_id: None,
            other_user_input: "someone".into(),
            trade_details: "a for b".into(),
            can_join_vip: "Yes".into(),
            claimer_id: claimer.map(UserId::new),
        }
    }

    #[test]
    fn claim_state_follows_claimer() {
        assert!(!ticket(None).is_claimed());
        assert!(!ticket(None).is_claimer(UserId::new(3)));

        let claimed = ticket(Some(3));
        assert!(claimed.is_claimed());
        assert!(claimed.is_claimer(UserId::new(3)));
        assert!(!claimed.is_claimer(UserId::new(4)));
    }

    #[test]
    fn snowflakes_parse_and_display() {
        let id: UserId = "123456789".parse().unwrap();
        assert_eq!(id.get(), 123456789);
        assert_eq!(id.to_string(), "123456789");
        assert!("12ab".parse::<UserId>().is_err());
    }

    #[test]
    fn denied_permission_is_not_granted() {
        let ow = Overwrite {
            target: OverwriteTarget::Role(RoleId::new(9)),
            allow: vec![Permission::ReadMessageHistory],
            deny: vec![Permission::ViewChannel],
        };
        assert!(ow.grants(Permission::ReadMessageHistory));
        assert!(!ow.grants(Permission::ViewChannel));
        assert!(!ow.grants(Permission::SendMessages));
    }
}
