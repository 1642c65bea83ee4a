use anyhow::{Context, Result, bail};
use middleman_types::models::{ChannelId, Ticket, UserId};

/// Row of the `tickets` table, ids as stored (TEXT).
/// Kept apart from the `Ticket` model so the schema can keep its
/// `claimed` column next to `claimer_id`.
#[derive(Debug, Clone)]
pub struct TicketRow {
    pub channel_id: String,
    pub creator_id: String,
    pub other_user_id: Option<String>,
    pub other_user_input: String,
    pub trade_details: String,
    pub can_join_vip: String,
    pub claimed: bool,
    pub claimer_id: Option<String>,
}

impl TicketRow {
    pub fn from_ticket(ticket: &Ticket) -> Self {
        Self {
            channel_id: ticket.channel_id.to_string(),
            creator_id: ticket.creator_id.to_string(),
            other_user_id: ticket.other_user_id.map(|id| id.to_string()),
            other_user_input: ticket.other_user_input.clone(),
            trade_details: ticket.trade_details.clone(),
            can_join_vip: ticket.can_join_vip.clone(),
            claimed: ticket.is_claimed(),
            claimer_id: ticket.claimer_id.map(|id| id.to_string()),
        }
    }

    pub fn into_ticket(self) -> Result<Ticket> {
        let claimer_id = match (self.claimed, self.claimer_id) {
            (true, Some(id)) => Some(parse_id(&id, "claimer_id")?),
            (false, None) => None,
            (claimed, claimer) => bail!(
                "Ticket {} has claimed={} but claimer_id={:?}",
                self.channel_id,
                claimed,
                claimer
            ),
        };

        Ok(Ticket {
            channel_id: parse_id::<ChannelId>(&self.channel_id, "channel_id")?,
            creator_id: parse_id::<UserId>(&self.creator_id, "creator_id")?,
            other_user_id: self
                .other_user_id
                .as_deref()
                .map(|id| parse_id(id, "other_user_id"))
                .transpose()?,
            other_user_input: self.other_user_input,
            trade_details: self.trade_details,
            can_join_vip: self.can_join_vip,
            claimer_id,
        })
    }
}

fn parse_id<T>(raw: &str, column: &str) -> Result<T>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    raw.parse()
        .with_context(|| format!("Corrupt {} '{}'", column, raw))
}
