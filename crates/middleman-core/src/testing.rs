//! In-memory `Platform` used by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use middleman_types::models::{
    ChannelId, ChannelMessage, Member, MessageId, Overwrite, OverwriteTarget, RoleId, UserId,
};
use middleman_types::posts::Post;

use crate::error::PlatformError;
use crate::platform::Platform;

#[derive(Default)]
pub struct FakeState {
    pub members: Vec<Member>,
    pub channels: HashMap<ChannelId, String>,
    pub overwrites: HashMap<ChannelId, HashMap<OverwriteTarget, Overwrite>>,
    /// Chronological history per channel
    pub history: HashMap<ChannelId, Vec<ChannelMessage>>,
    pub posts: Vec<(ChannelId, Post)>,
    /// Size of every history page handed out
    pub pages: Vec<usize>,
    pub deleted: Vec<ChannelId>,
    pub next_channel: u64,
    pub fail_set_overwrite: bool,
    pub fail_remove_overwrite: bool,
}

#[derive(Default)]
pub struct FakePlatform {
    pub state: Mutex<FakeState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_member(self, id: u64, username: &str, roles: &[RoleId]) -> Self {
        self.state.lock().unwrap().members.push(member(id, username, roles));
        self
    }

    pub fn with_channel(self, id: ChannelId, name: &str) -> Self {
        self.state.lock().unwrap().channels.insert(id, name.to_string());
        self
    }

    pub fn overwrite(&self, channel: ChannelId, target: OverwriteTarget) -> Option<Overwrite> {
        let state = self.state.lock().unwrap();
        state.overwrites.get(&channel)?.get(&target).cloned()
    }

    pub fn posts(&self) -> Vec<(ChannelId, Post)> {
        self.state.lock().unwrap().posts.clone()
    }

    /// Append `count` messages to a channel's history.
    pub fn push_messages(&self, channel: ChannelId, count: u64) {
        let mut state = self.state.lock().unwrap();
        let history = state.history.entry(channel).or_default();
        let start = history.len() as u64;
        for n in start..start + count {
            history.push(message(n + 1, &format!("message {}", n + 1)));
        }
    }
}

pub fn member(id: u64, username: &str, roles: &[RoleId]) -> Member {
    Member {
        id: UserId::new(id),
        username: username.to_string(),
        tag: username.to_string(),
        roles: roles.to_vec(),
    }
}

pub fn message(id: u64, content: &str) -> ChannelMessage {
    ChannelMessage {
        id: MessageId::new(id),
        author_tag: "trader".into(),
        content: content.into(),
        created_at: at(id as i64),
        embed: None,
    }
}

pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
}

fn refused(action: &'static str) -> PlatformError {
    PlatformError::new(action, std::io::Error::other("refused"))
}

#[async_trait]
impl Platform for FakePlatform {
    async fn member(&self, user: UserId) -> Result<Option<Member>, PlatformError> {
        let state = self.state.lock().unwrap();
        Ok(state.members.iter().find(|m| m.id == user).cloned())
    }

    async fn members(&self) -> Result<Vec<Member>, PlatformError> {
        Ok(self.state.lock().unwrap().members.clone())
    }

    async fn channel_name(&self, channel: ChannelId) -> Result<Option<String>, PlatformError> {
        Ok(self.state.lock().unwrap().channels.get(&channel).cloned())
    }

    async fn create_text_channel(
        &self,
        name: &str,
        _category: ChannelId,
        overwrites: &[Overwrite],
    ) -> Result<ChannelId, PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.next_channel += 1;
        let id = ChannelId::new(9_000 + state.next_channel);
        state.channels.insert(id, name.to_string());
        state.overwrites.insert(
            id,
            overwrites.iter().map(|ow| (ow.target, ow.clone())).collect(),
        );
        Ok(id)
    }

    async fn set_overwrite(&self, channel: ChannelId, overwrite: &Overwrite) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_set_overwrite {
            return Err(refused("set overwrite"));
        }
        state
            .overwrites
            .entry(channel)
            .or_default()
            .insert(overwrite.target, overwrite.clone());
        Ok(())
    }

    async fn remove_overwrite(
        &self,
        channel: ChannelId,
        target: OverwriteTarget,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_remove_overwrite {
            return Err(refused("remove overwrite"));
        }
        if let Some(overwrites) = state.overwrites.get_mut(&channel) {
            overwrites.remove(&target);
        }
        Ok(())
    }

    async fn messages(
        &self,
        channel: ChannelId,
        before: Option<MessageId>,
        limit: u8,
    ) -> Result<Vec<ChannelMessage>, PlatformError> {
        let mut state = self.state.lock().unwrap();
        let page: Vec<ChannelMessage> = state
            .history
            .get(&channel)
            .map(|history| {
                history
                    .iter()
                    .rev()
                    .filter(|m| before.is_none_or(|b| m.id < b))
                    .take(limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        state.pages.push(page.len());
        Ok(page)
    }

    async fn post(&self, channel: ChannelId, post: &Post) -> Result<(), PlatformError> {
        self.state.lock().unwrap().posts.push((channel, post.clone()));
        Ok(())
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.channels.remove(&channel);
        state.deleted.push(channel);
        Ok(())
    }
}
