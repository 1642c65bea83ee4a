use crate::Database;
use crate::models::TicketRow;
use anyhow::Result;
use middleman_types::models::{ChannelId, Ticket};
use rusqlite::Connection;

impl Database {
    pub fn get_ticket(&self, channel_id: ChannelId) -> Result<Option<Ticket>> {
        self.with_conn(|conn| query_ticket(conn, &channel_id.to_string()))?
            .map(TicketRow::into_ticket)
            .transpose()
    }

    /// Insert a ticket, or update only its claim columns if the channel
    /// already has one. Everything else is fixed at creation.
    pub fn upsert_ticket(&self, ticket: &Ticket) -> Result<()> {
        let row = TicketRow::from_ticket(ticket);
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tickets (channel_id, creator_id, other_user_id, other_user_input, trade_details, can_join_vip, claimed, claimer_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT (channel_id) DO UPDATE SET
                    claimed = excluded.claimed,
                    claimer_id = excluded.claimer_id",
                rusqlite::params![
                    row.channel_id,
                    row.creator_id,
                    row.other_user_id,
                    row.other_user_input,
                    row.trade_details,
                    row.can_join_vip,
                    row.claimed,
                    row.claimer_id,
                ],
            )?;
            Ok(())
        })
    }

    /// Returns whether a row was removed.
    pub fn delete_ticket(&self, channel_id: ChannelId) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM tickets WHERE channel_id = ?1",
                [channel_id.to_string()],
            )?;
            Ok(removed > 0)
        })
    }

    pub fn count_tickets(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM tickets", [], |r| r.get(0))?;
            Ok(count as u64)
        })
    }
}

fn query_ticket(conn: &Connection, channel_id: &str) -> Result<Option<TicketRow>> {
    let mut stmt = conn.prepare(
        "SELECT channel_id, creator_id, other_user_id, other_user_input, trade_details,
                can_join_vip, claimed, claimer_id
         FROM tickets WHERE channel_id = ?1",
    )?;

    let row = stmt
        .query_row([channel_id], |row| {
            Ok(TicketRow {
                channel_id: row.get(0)?,
                creator_id: row.get(1)?,
                other_user_id: row.get(2)?,
                other_user_input: row.get(3)?,
                trade_details: row.get(4)?,
                can_join_vip: row.get(5)?,
                claimed: row.get(6)?,
                claimer_id: row.get(7)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
