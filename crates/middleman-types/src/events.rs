use crate::models::UserId;

/// Custom id of the ticket request form.
pub const TICKET_MODAL_ID: &str = "ticket_modal";

/// Text input ids inside the ticket request form.
pub const FIELD_TRADE_DETAILS: &str = "trade_details";
pub const FIELD_OTHER_USER: &str = "other_user";
pub const FIELD_CAN_JOIN_VIP: &str = "can_join_vip";

const CONFIRM_CLOSE_PREFIX: &str = "confirm_close_";

/// Button presses the bot reacts to, keyed by component custom id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentAction {
    /// Panel button: open the request form
    RequestTicket,
    Claim,
    Unclaim,
    /// Start a two-step close
    Close,
    /// Second step of a close; carries the user who started it
    ConfirmClose { initiator: UserId },
}

impl ComponentAction {
    pub fn parse(custom_id: &str) -> Option<Self> {
        match custom_id {
            "request_ticket" => Some(Self::RequestTicket),
            "claim_ticket" => Some(Self::Claim),
            "unclaim_ticket" => Some(Self::Unclaim),
            "close_ticket" => Some(Self::Close),
            other => other
                .strip_prefix(CONFIRM_CLOSE_PREFIX)
                .and_then(|id| id.parse().ok())
                .map(|initiator| Self::ConfirmClose { initiator }),
        }
    }

    pub fn custom_id(&self) -> String {
        match self {
            Self::RequestTicket => "request_ticket".into(),
            Self::Claim => "claim_ticket".into(),
            Self::Unclaim => "unclaim_ticket".into(),
            Self::Close => "close_ticket".into(),
            Self::ConfirmClose { initiator } => format!("{CONFIRM_CLOSE_PREFIX}{initiator}"),
        }
    }
}

/// Prefix commands typed into a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextCommand {
    /// Post the ticket request panel
    Send,
    /// Add a user to the current ticket; `None` when no argument was given
    Add(Option<String>),
    Close,
}

impl TextCommand {
    /// Parse `content` if it starts with `prefix`. The command word is
    /// case-insensitive; arguments are split on runs of spaces.
    pub fn parse(prefix: &str, content: &str) -> Option<Self> {
        let rest = content.strip_prefix(prefix)?;
        let mut args = rest.trim().split(' ').filter(|s| !s.is_empty());
        let command = args.next()?.to_lowercase();

        match command.as_str() {
            "send" => Some(Self::Send),
            "add" => Some(Self::Add(args.next().map(str::to_string))),
            "close" => Some(Self::Close),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_ids() {
        assert_eq!(ComponentAction::parse("claim_ticket"), Some(ComponentAction::Claim));
        assert_eq!(
            ComponentAction::parse("confirm_close_42"),
            Some(ComponentAction::ConfirmClose { initiator: UserId::new(42) })
        );
        assert_eq!(ComponentAction::parse("confirm_close_"), None);
        assert_eq!(ComponentAction::parse("confirm_close_abc"), None);
        assert_eq!(ComponentAction::parse("something_else"), None);

        let confirm = ComponentAction::ConfirmClose { initiator: UserId::new(7) };
        assert_eq!(confirm.custom_id(), "confirm_close_7");
    }

    #[test]
    fn text_commands() {
        assert_eq!(TextCommand::parse(".", ".send"), Some(TextCommand::Send));
        assert_eq!(TextCommand::parse(".", ".CLOSE"), Some(TextCommand::Close));
        assert_eq!(
            TextCommand::parse(".", ".add   <@123>  extra"),
            Some(TextCommand::Add(Some("<@123>".into())))
        );
        assert_eq!(TextCommand::parse(".", ".add"), Some(TextCommand::Add(None)));
        assert_eq!(TextCommand::parse(".", "send"), None);
        assert_eq!(TextCommand::parse(".", ".unknown"), None);
        assert_eq!(TextCommand::parse(".", "."), None);
        assert_eq!(TextCommand::parse("!", "!send"), Some(TextCommand::Send));
    }
}
