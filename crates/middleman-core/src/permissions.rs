use tracing::warn;

use middleman_types::models::{ChannelId, Overwrite, OverwriteTarget, Permission, RoleId, UserId};

use crate::error::PlatformError;
use crate::platform::Platform;

use middleman_types::models::Permission::{
    ManageMessages, ReadMessageHistory, SendMessages, ViewChannel,
};

/// Creator, counterparty and added participants.
pub const STANDARD_ACCESS: &[Permission] = &[ViewChannel, SendMessages, ReadMessageHistory];

/// Staff role while unclaimed, and the claimer.
pub const ELEVATED_ACCESS: &[Permission] =
    &[ViewChannel, SendMessages, ReadMessageHistory, ManageMessages];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionEdit {
    Set(Overwrite),
    Remove(OverwriteTarget),
}

/// Overwrites a new ticket channel is created with: hidden from everyone,
/// visible to its creator and the staff role.
pub fn creation_overwrites(everyone: RoleId, creator: UserId, staff: RoleId) -> Vec<Overwrite> {
    vec![
        Overwrite::deny(OverwriteTarget::Role(everyone), &[ViewChannel]),
        Overwrite::allow(OverwriteTarget::Member(creator), STANDARD_ACCESS),
        Overwrite::allow(OverwriteTarget::Role(staff), ELEVATED_ACCESS),
    ]
}

/// Narrow the channel to the claimer (and the counterparty, when known).
pub fn claim_edits(staff: RoleId, claimer: UserId, counterparty: Option<UserId>) -> Vec<PermissionEdit> {
    let mut edits = vec![
        PermissionEdit::Set(Overwrite {
            target: OverwriteTarget::Role(staff),
            allow: vec![ReadMessageHistory, ManageMessages],
            deny: vec![ViewChannel, SendMessages],
        }),
        PermissionEdit::Set(Overwrite::allow(OverwriteTarget::Member(claimer), ELEVATED_ACCESS)),
    ];

    if let Some(user) = counterparty {
        edits.push(PermissionEdit::Set(Overwrite::allow(
            OverwriteTarget::Member(user),
            STANDARD_ACCESS,
        )));
    }

    edits
}

/// Give the staff role its blanket access back and drop the previous
/// claimer's own overwrite.
pub fn unclaim_edits(staff: RoleId, previous_claimer: UserId) -> Vec<PermissionEdit> {
    vec![
        PermissionEdit::Set(Overwrite::allow(OverwriteTarget::Role(staff), ELEVATED_ACCESS)),
        PermissionEdit::Remove(OverwriteTarget::Member(previous_claimer)),
    ]
}

pub fn participant_edit(user: UserId) -> PermissionEdit {
    PermissionEdit::Set(Overwrite::allow(OverwriteTarget::Member(user), STANDARD_ACCESS))
}

/// Apply edits in order. A failed `Set` aborts with the error and leaves
/// earlier edits in place; a failed `Remove` is only logged.
pub async fn apply(
    platform: &dyn Platform,
    channel: ChannelId,
    edits: &[PermissionEdit],
) -> Result<(), PlatformError> {
    for edit in edits {
        match edit {
            PermissionEdit::Set(overwrite) => platform.set_overwrite(channel, overwrite).await?,
            PermissionEdit::Remove(target) => {
                if let Err(e) = platform.remove_overwrite(channel, *target).await {
                    warn!("Could not remove overwrite {:?} on {}: {}", target, channel, e);
                }
            }
        }
    }
    Ok(())
}
