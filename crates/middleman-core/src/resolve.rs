use tracing::debug;

use middleman_types::models::{Member, UserId};

use crate::error::PlatformError;
use crate::platform::Platform;

fn is_snowflake(input: &str) -> bool {
    !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit())
}

/// Direct lookup by id. Input too large for an id cannot be a member.
async fn member_by_id(platform: &dyn Platform, raw: &str) -> Result<Option<Member>, PlatformError> {
    match raw.parse::<UserId>() {
        Ok(id) => platform.member(id).await,
        Err(_) => Ok(None),
    }
}

/// Resolve the counterparty typed into the request form.
///
/// Digits are looked up directly, and a failed lookup counts as "not
/// found". Anything else has its first `@` dropped and is matched
/// case-insensitively against every member's username and tag.
pub async fn resolve_counterparty(
    platform: &dyn Platform,
    raw: &str,
) -> Result<Option<Member>, PlatformError> {
    if is_snowflake(raw) {
        return Ok(member_by_id(platform, raw).await.unwrap_or_else(|e| {
            debug!("Counterparty lookup for {} failed: {}", raw, e);
            None
        }));
    }

    let wanted = raw.replacen('@', "", 1).to_lowercase();
    let members = platform.members().await?;
    Ok(members
        .into_iter()
        .find(|m| m.username.to_lowercase() == wanted || m.tag.to_lowercase() == wanted))
}

/// Resolve the argument of the `add` command: a mention, an id, or a
/// username (case-insensitive).
pub async fn find_participant(
    platform: &dyn Platform,
    raw: &str,
) -> Result<Option<Member>, PlatformError> {
    let cleaned = raw.replace(['<', '@', '!', '>'], "");

    if is_snowflake(&cleaned) {
        return member_by_id(platform, &cleaned).await;
    }

    let wanted = cleaned.to_lowercase();
    let members = platform.members().await?;
    Ok(members.into_iter().find(|m| m.username.to_lowercase() == wanted))
}
