use chrono::{DateTime, Utc};
use tracing::debug;

use middleman_types::models::{ChannelId, ChannelMessage};

use crate::error::PlatformError;
use crate::platform::Platform;

/// Largest history page the platform hands out.
pub const PAGE_SIZE: u8 = 100;

const RULE_WIDTH: usize = 60;

/// Fetch a channel's whole history, oldest message first.
///
/// Pages are requested newest-first, each one starting before the oldest
/// message of the previous page, until a short page comes back.
pub async fn fetch_history(
    platform: &dyn Platform,
    channel: ChannelId,
) -> Result<Vec<ChannelMessage>, PlatformError> {
    let mut messages = Vec::new();
    let mut before = None;

    loop {
        let page = platform.messages(channel, before, PAGE_SIZE).await?;
        let page_len = page.len();
        before = page.last().map(|m| m.id);
        messages.extend(page);

        if page_len < PAGE_SIZE as usize {
            break;
        }
    }

    debug!("Fetched {} messages from {}", messages.len(), channel);
    messages.reverse();
    Ok(messages)
}

/// Render messages (oldest first) as a plain-text transcript.
pub fn render(channel_name: &str, generated_at: DateTime<Utc>, messages: &[ChannelMessage]) -> String {
    let mut out = format!(
        "Ticket: {}\nCreated: {}\n{}\n\n",
        channel_name,
        generated_at.format("%a, %d %b %Y %H:%M:%S GMT"),
        "=".repeat(RULE_WIDTH)
    );

    for msg in messages {
        out.push_str(&format!(
            "[{}] {}:\n",
            msg.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            msg.author_tag
        ));
        if !msg.content.is_empty() {
            out.push_str(&msg.content);
            out.push('\n');
        }
        if let Some(embed) = &msg.embed {
            let label = embed
                .title
                .as_deref()
                .filter(|t| !t.is_empty())
                .or(embed.description.as_deref().filter(|d| !d.is_empty()))
                .unwrap_or("No title");
            out.push_str(&format!("[Embed: {}]\n", label));
        }
        out.push('\n');
    }

    out
}

pub fn file_name(channel_name: &str) -> String {
    format!("transcript-{}.txt", channel_name)
}
