use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use middleman_core::TicketSettings;
use middleman_types::models::{ChannelId, RoleId};

/// Runtime configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub db_path: PathBuf,
    pub guild_id: u64,
    pub category_id: ChannelId,
    pub staff_role_id: RoleId,
    pub transcripts_channel_id: ChannelId,
    pub prefix: String,
    pub close_delay: Duration,
    pub banner_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let id = |name: &str| -> Result<u64> {
            let raw = var(name).ok_or_else(|| anyhow!("{} is not set", name))?;
            raw.trim()
                .parse()
                .with_context(|| format!("{} must be a numeric id, got '{}'", name, raw))
        };

        let token = var("DISCORD_TOKEN").ok_or_else(|| anyhow!("DISCORD_TOKEN is not set"))?;

        let close_delay_secs: u64 = match var("MIDDLEMAN_CLOSE_DELAY_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("MIDDLEMAN_CLOSE_DELAY_SECS must be whole seconds, got '{}'", raw))?,
            None => 3,
        };

        Ok(Self {
            token,
            db_path: var("MIDDLEMAN_DB_PATH")
                .unwrap_or_else(|| "middleman.db".into())
                .into(),
            guild_id: id("MIDDLEMAN_GUILD_ID")?,
            category_id: ChannelId::new(id("MIDDLEMAN_CATEGORY_ID")?),
            staff_role_id: RoleId::new(id("MIDDLEMAN_STAFF_ROLE_ID")?),
            transcripts_channel_id: ChannelId::new(id("MIDDLEMAN_TRANSCRIPTS_CHANNEL_ID")?),
            prefix: var("MIDDLEMAN_PREFIX").unwrap_or_else(|| ".".into()),
            close_delay: Duration::from_secs(close_delay_secs),
            banner_path: var("MIDDLEMAN_BANNER_PATH")
                .unwrap_or_else(|| "attached_assets/banner.jpg".into())
                .into(),
        })
    }

    pub fn settings(&self) -> TicketSettings {
        TicketSettings {
            everyone_role: RoleId::new(self.guild_id),
            category: self.category_id,
            staff_role: self.staff_role_id,
            archive_channel: self.transcripts_channel_id,
            close_delay: self.close_delay,
        }
    }
}
