use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use serenity::all::{
    self as discord, ChannelType, CreateAttachment, CreateChannel, CreateMessage, GetMessages,
    Http, PermissionOverwrite, PermissionOverwriteType, Permissions,
};
use tracing::warn;

use middleman_core::{Platform, PlatformError};
use middleman_types::models::{
    ChannelId, ChannelMessage, EmbedPreview, Member, MessageId, Overwrite, OverwriteTarget,
    Permission, RoleId, UserId,
};
use middleman_types::posts::Post;

use crate::render;

/// Largest member page the API hands out.
const MEMBER_PAGE: u64 = 1000;

/// `Platform` backed by the Discord HTTP API, scoped to one guild.
pub struct SerenityPlatform {
    http: Arc<Http>,
    guild: discord::GuildId,
    banner: PathBuf,
}

impl SerenityPlatform {
    pub fn new(http: Arc<Http>, guild_id: u64, banner: PathBuf) -> Self {
        Self {
            http,
            guild: discord::GuildId::new(guild_id),
            banner,
        }
    }

    fn http(&self) -> &Http {
        &self.http
    }

    async fn send(&self, channel: ChannelId, message: CreateMessage) -> Result<(), PlatformError> {
        channel_id(channel)
            .send_message(self.http(), message)
            .await
            .map_err(|e| PlatformError::new("send message", e))?;
        Ok(())
    }

    async fn panel_message(&self) -> CreateMessage {
        let banner = match CreateAttachment::path(&self.banner).await {
            Ok(file) => Some(file),
            Err(e) => {
                warn!("Banner {} unavailable, posting panel without it: {}", self.banner.display(), e);
                None
            }
        };

        let image = banner.as_ref().map(|file| format!("attachment://{}", file.filename));
        let (embed, button) = render::panel(image.as_deref());
        let message = CreateMessage::new().embed(embed).components(vec![button]);

        match banner {
            Some(file) => message.add_file(file),
            None => message,
        }
    }
}

fn channel_id(id: ChannelId) -> discord::ChannelId {
    discord::ChannelId::new(id.get())
}

fn user_id(id: UserId) -> discord::UserId {
    discord::UserId::new(id.get())
}

fn is_not_found(err: &serenity::Error) -> bool {
    matches!(err, serenity::Error::Http(e) if e.status_code().map(|s| s.as_u16()) == Some(404))
}

fn to_member(member: &discord::Member) -> Member {
    Member {
        id: UserId::new(member.user.id.get()),
        username: member.user.name.clone(),
        tag: member.user.tag(),
        roles: member
            .roles
            .iter()
            .map(|r| RoleId::new(r.get()))
            .collect(),
    }
}

fn to_channel_message(message: &discord::Message) -> ChannelMessage {
    ChannelMessage {
        id: MessageId::new(message.id.get()),
        author_tag: message.author.tag(),
        content: message.content.clone(),
        created_at: DateTime::from_timestamp(message.timestamp.unix_timestamp(), 0).unwrap_or_default(),
        embed: message.embeds.first().map(|embed| EmbedPreview {
            title: embed.title.clone(),
            description: embed.description.clone(),
        }),
    }
}

fn permissions(list: &[Permission]) -> Permissions {
    list.iter().fold(Permissions::empty(), |acc, p| {
        acc | match p {
            Permission::ViewChannel => Permissions::VIEW_CHANNEL,
            Permission::SendMessages => Permissions::SEND_MESSAGES,
            Permission::ReadMessageHistory => Permissions::READ_MESSAGE_HISTORY,
            Permission::ManageMessages => Permissions::MANAGE_MESSAGES,
        }
    })
}

fn overwrite_kind(target: OverwriteTarget) -> PermissionOverwriteType {
    match target {
        OverwriteTarget::Role(role) => PermissionOverwriteType::Role(discord::RoleId::new(role.get())),
        OverwriteTarget::Member(user) => PermissionOverwriteType::Member(user_id(user)),
    }
}

fn to_overwrite(overwrite: &Overwrite) -> PermissionOverwrite {
    PermissionOverwrite {
        allow: permissions(&overwrite.allow),
        deny: permissions(&overwrite.deny),
        kind: overwrite_kind(overwrite.target),
    }
}

#[async_trait]
impl Platform for SerenityPlatform {
    async fn member(&self, user: UserId) -> Result<Option<Member>, PlatformError> {
        match self.guild.member(self.http(), user_id(user)).await {
            Ok(member) => Ok(Some(to_member(&member))),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(PlatformError::new("fetch member", e)),
        }
    }

    async fn members(&self) -> Result<Vec<Member>, PlatformError> {
        let mut members = Vec::new();
        let mut after: Option<discord::UserId> = None;

        loop {
            let page = self
                .guild
                .members(self.http(), Some(MEMBER_PAGE), after)
                .await
                .map_err(|e| PlatformError::new("list members", e))?;
            let page_len = page.len();
            after = page.last().map(|m| m.user.id);
            members.extend(page.iter().map(to_member));

            if (page_len as u64) < MEMBER_PAGE {
                break;
            }
        }

        Ok(members)
    }

    async fn channel_name(&self, channel: ChannelId) -> Result<Option<String>, PlatformError> {
        match channel_id(channel).to_channel(self.http()).await {
            Ok(found) => Ok(Some(
                found
                    .guild()
                    .map(|c| c.name)
                    .unwrap_or_else(|| channel.to_string()),
            )),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(PlatformError::new("fetch channel", e)),
        }
    }

    async fn create_text_channel(
        &self,
        name: &str,
        category: ChannelId,
        overwrites: &[Overwrite],
    ) -> Result<ChannelId, PlatformError> {
        let builder = CreateChannel::new(name)
            .kind(ChannelType::Text)
            .category(channel_id(category))
            .permissions(overwrites.iter().map(to_overwrite).collect::<Vec<_>>());

        let created = self
            .guild
            .create_channel(self.http(), builder)
            .await
            .map_err(|e| PlatformError::new("create channel", e))?;
        Ok(ChannelId::new(created.id.get()))
    }

    async fn set_overwrite(&self, channel: ChannelId, overwrite: &Overwrite) -> Result<(), PlatformError> {
        channel_id(channel)
            .create_permission(self.http(), to_overwrite(overwrite))
            .await
            .map_err(|e| PlatformError::new("set permission overwrite", e))
    }

    async fn remove_overwrite(
        &self,
        channel: ChannelId,
        target: OverwriteTarget,
    ) -> Result<(), PlatformError> {
        channel_id(channel)
            .delete_permission(self.http(), overwrite_kind(target))
            .await
            .map_err(|e| PlatformError::new("remove permission overwrite", e))
    }

    async fn messages(
        &self,
        channel: ChannelId,
        before: Option<MessageId>,
        limit: u8,
    ) -> Result<Vec<ChannelMessage>, PlatformError> {
        let mut request = GetMessages::new().limit(limit);
        if let Some(before) = before {
            request = request.before(discord::MessageId::new(before.get()));
        }

        let page = channel_id(channel)
            .messages(self.http(), request)
            .await
            .map_err(|e| PlatformError::new("fetch messages", e))?;
        Ok(page.iter().map(to_channel_message).collect())
    }

    async fn post(&self, channel: ChannelId, post: &Post) -> Result<(), PlatformError> {
        let message = match post {
            Post::Panel => self.panel_message().await,
            Post::Welcome(welcome) => {
                let (embeds, buttons) = render::welcome(welcome);
                CreateMessage::new().embeds(embeds).components(vec![buttons])
            }
            Post::Transcript(transcript) => CreateMessage::new()
                .embed(render::transcript_summary(transcript))
                .add_file(CreateAttachment::bytes(
                    transcript.document.as_bytes().to_vec(),
                    transcript.file_name.clone(),
                )),
        };
        self.send(channel, message).await
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError> {
        channel_id(channel)
            .delete(self.http())
            .await
            .map_err(|e| PlatformError::new("delete channel", e))?;
        Ok(())
    }
}
