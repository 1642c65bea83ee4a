use thiserror::Error;

/// Failure of a call into the chat platform.
#[derive(Debug, Error)]
#[error("{action} failed: {source}")]
pub struct PlatformError {
    action: &'static str,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl PlatformError {
    pub fn new(action: &'static str, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            action,
            source: Box::new(source),
        }
    }
}

/// Everything a ticket operation can fail with. The `Display` text of the
/// non-external variants is shown to the user as-is.
#[derive(Debug, Error)]
pub enum TicketError {
    #[error("Ticket data not found.")]
    NotATicket,

    #[error("Only middleman team members can claim tickets.")]
    NotStaff,

    #[error("Only the claimer or middleman team can unclaim this ticket.")]
    NotAllowedToUnclaim,

    #[error("Only middleman team members or the ticket claimer can close tickets.")]
    NotAllowedToClose,

    #[error("Only middleman team members or the ticket claimer can add users.")]
    NotAllowedToAdd,

    #[error("This ticket has already been claimed.")]
    AlreadyClaimed,

    #[error("This ticket is not currently claimed.")]
    NotClaimed,

    #[error("Only the person who initiated the close can confirm it.")]
    NotInitiator,

    #[error("Close confirmation expired. Please initiate close again.")]
    ConfirmationExpired,

    #[error("Middleman category not found. Please contact an administrator.")]
    CategoryNotFound,

    #[error("Transcript channel not found.")]
    ArchiveChannelNotFound,

    #[error("Please mention a user or provide their ID.")]
    MissingUser,

    #[error("User not found in the server.")]
    UserNotFound,

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("Ticket store error: {0}")]
    Store(#[source] anyhow::Error),
}

impl TicketError {
    /// Network or database failures; everything else is a rejection the
    /// user caused and can read.
    pub fn is_external(&self) -> bool {
        matches!(self, Self::Platform(_) | Self::Store(_))
    }
}
