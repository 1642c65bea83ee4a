use async_trait::async_trait;

use middleman_types::models::{
    ChannelId, ChannelMessage, Member, MessageId, Overwrite, OverwriteTarget, UserId,
};
use middleman_types::posts::Post;

use crate::error::PlatformError;

/// The chat platform operations the ticket workflow depends on. All calls
/// are scoped to the one guild the bot serves.
#[async_trait]
pub trait Platform: Send + Sync {
    /// `Ok(None)` when the user is not a member of the guild.
    async fn member(&self, user: UserId) -> Result<Option<Member>, PlatformError>;

    /// Every member of the guild.
    async fn members(&self) -> Result<Vec<Member>, PlatformError>;

    /// `Ok(None)` when the channel does not exist.
    async fn channel_name(&self, channel: ChannelId) -> Result<Option<String>, PlatformError>;

    async fn create_text_channel(
        &self,
        name: &str,
        category: ChannelId,
        overwrites: &[Overwrite],
    ) -> Result<ChannelId, PlatformError>;

    /// Replaces any existing overwrite for the same target.
    async fn set_overwrite(&self, channel: ChannelId, overwrite: &Overwrite) -> Result<(), PlatformError>;

    async fn remove_overwrite(
        &self,
        channel: ChannelId,
        target: OverwriteTarget,
    ) -> Result<(), PlatformError>;

    /// Up to `limit` messages older than `before` (or the newest ones),
    /// newest first.
    async fn messages(
        &self,
        channel: ChannelId,
        before: Option<MessageId>,
        limit: u8,
    ) -> Result<Vec<ChannelMessage>, PlatformError>;

    async fn post(&self, channel: ChannelId, post: &Post) -> Result<(), PlatformError>;

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError>;
}
