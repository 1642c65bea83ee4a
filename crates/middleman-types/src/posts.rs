use crate::models::{RoleId, UserId};

/// Messages the workflow asks the platform to post into a channel.
/// Rendering (embeds, colours, buttons) is the platform's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Post {
    /// The public panel carrying the request button
    Panel,
    /// First message of a new ticket channel, with claim/unclaim/close buttons
    Welcome(WelcomePost),
    /// Archive delivery: summary plus the transcript document
    Transcript(TranscriptPost),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomePost {
    pub creator: UserId,
    pub staff_role: RoleId,
    pub trade_details: String,
    pub other_user_input: String,
    /// Resolved counterparty; `None` renders as "not found"
    pub counterparty: Option<UserId>,
    pub can_join_vip: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptPost {
    pub channel_name: String,
    pub opener: Opener,
    pub trade_details: String,
    pub other_user_input: String,
    pub can_join_vip: String,
    pub closed_by: UserId,
    pub file_name: String,
    pub document: String,
}

/// The ticket creator as known at close time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opener {
    Member(UserId),
    /// No longer in the guild
    Departed(UserId),
}
