use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use middleman_db::Database;
use middleman_types::models::{ChannelId, Member, RoleId, Ticket, TicketRequest, UserId};
use middleman_types::posts::{Opener, Post, TranscriptPost, WelcomePost};

use crate::confirmations::{CloseKey, ConfirmationStore};
use crate::error::TicketError;
use crate::permissions;
use crate::platform::Platform;
use crate::resolve;
use crate::transcript;

/// Fixed identifiers and timings the workflow runs with.
#[derive(Debug, Clone)]
pub struct TicketSettings {
    /// The guild's @everyone role (same id as the guild)
    pub everyone_role: RoleId,
    pub category: ChannelId,
    pub staff_role: RoleId,
    pub archive_channel: ChannelId,
    /// Pause between a confirmed close and deleting the channel
    pub close_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct ClosedTicket {
    pub channel_name: String,
    pub message_count: usize,
}

/// Drives tickets through open -> claimed -> closing -> closed and
/// enforces who may do what at each step.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    platform: Arc<dyn Platform>,
    db: Arc<Database>,
    confirmations: Arc<dyn ConfirmationStore>,
    settings: TicketSettings,
}

impl Controller {
    pub fn new(
        platform: Arc<dyn Platform>,
        db: Arc<Database>,
        confirmations: Arc<dyn ConfirmationStore>,
        settings: TicketSettings,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                platform,
                db,
                confirmations,
                settings,
            }),
        }
    }

    pub fn settings(&self) -> &TicketSettings {
        &self.inner.settings
    }

    fn platform(&self) -> &dyn Platform {
        self.inner.platform.as_ref()
    }

    /// Run a blocking store call off the async runtime.
    async fn store<F, T>(&self, f: F) -> Result<T, TicketError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.inner.db.clone();
        tokio::task::spawn_blocking(move || f(db.as_ref()))
            .await
            .map_err(|e| TicketError::Store(e.into()))?
            .map_err(TicketError::Store)
    }

    async fn load_ticket(&self, channel: ChannelId) -> Result<Ticket, TicketError> {
        self.store(move |db| db.get_ticket(channel))
            .await?
            .ok_or(TicketError::NotATicket)
    }

    async fn save_ticket(&self, ticket: Ticket) -> Result<(), TicketError> {
        self.store(move |db| db.upsert_ticket(&ticket)).await
    }

    async fn is_staff(&self, user: UserId) -> Result<bool, TicketError> {
        let member = self.platform().member(user).await?;
        Ok(member.is_some_and(|m| m.has_role(self.inner.settings.staff_role)))
    }

    async fn is_staff_or_claimer(&self, ticket: &Ticket, user: UserId) -> Result<bool, TicketError> {
        Ok(ticket.is_claimer(user) || self.is_staff(user).await?)
    }

    /// Post the request panel into `channel`.
    pub async fn post_panel(&self, channel: ChannelId) -> Result<(), TicketError> {
        self.platform().post(channel, &Post::Panel).await?;
        info!("Posted ticket panel in {}", channel);
        Ok(())
    }

    /// Create a ticket channel from a submitted request form. An
    /// unresolved counterparty is recorded as such and does not block
    /// creation.
    pub async fn open_ticket(
        &self,
        creator: UserId,
        creator_name: &str,
        request: TicketRequest,
    ) -> Result<Ticket, TicketError> {
        let settings = &self.inner.settings;

        let counterparty = resolve::resolve_counterparty(self.platform(), &request.other_user).await?;

        if self.platform().channel_name(settings.category).await?.is_none() {
            return Err(TicketError::CategoryNotFound);
        }

        let name = channel_name(creator_name, Utc::now().timestamp_millis());
        let overwrites =
            permissions::creation_overwrites(settings.everyone_role, creator, settings.staff_role);
        let channel = self
            .platform()
            .create_text_channel(&name, settings.category, &overwrites)
            .await?;

        let ticket = Ticket {
            channel_id: channel,
            creator_id: creator,
            other_user_id: counterparty.as_ref().map(|m| m.id),
            other_user_input: request.other_user,
            trade_details: request.trade_details,
            can_join_vip: request.can_join_vip,
            claimer_id: None,
        };
        self.save_ticket(ticket.clone()).await?;

        let welcome = Post::Welcome(WelcomePost {
            creator,
            staff_role: settings.staff_role,
            trade_details: ticket.trade_details.clone(),
            other_user_input: ticket.other_user_input.clone(),
            counterparty: ticket.other_user_id,
            can_join_vip: ticket.can_join_vip.clone(),
        });
        self.platform().post(channel, &welcome).await?;

        info!(
            "Ticket {} ({}) opened by {}, counterparty {}",
            name,
            channel,
            creator,
            ticket
                .other_user_id
                .map_or_else(|| format!("unresolved '{}'", ticket.other_user_input), |id| id.to_string())
        );

        Ok(ticket)
    }

    /// Staff member takes the ticket: record the claim, then hide the
    /// channel from the rest of staff.
    pub async fn claim(&self, channel: ChannelId, actor: UserId) -> Result<Ticket, TicketError> {
        let ticket = self.load_ticket(channel).await?;

        if !self.is_staff(actor).await? {
            debug!("{} tried to claim {} without the staff role", actor, channel);
            return Err(TicketError::NotStaff);
        }
        if ticket.is_claimed() {
            return Err(TicketError::AlreadyClaimed);
        }

        let claimed = Ticket {
            claimer_id: Some(actor),
            ..ticket
        };
        self.save_ticket(claimed.clone()).await?;

        let edits = permissions::claim_edits(self.inner.settings.staff_role, actor, claimed.other_user_id);
        permissions::apply(self.platform(), channel, &edits).await?;

        info!("Ticket {} claimed by {}", channel, actor);
        Ok(claimed)
    }

    /// Release a claim. Returns the previous claimer.
    pub async fn unclaim(&self, channel: ChannelId, actor: UserId) -> Result<UserId, TicketError> {
        let ticket = self.load_ticket(channel).await?;

        let Some(previous) = ticket.claimer_id else {
            return Err(TicketError::NotClaimed);
        };
        if !self.is_staff_or_claimer(&ticket, actor).await? {
            debug!("{} tried to unclaim {}", actor, channel);
            return Err(TicketError::NotAllowedToUnclaim);
        }

        self.save_ticket(Ticket {
            claimer_id: None,
            ..ticket
        })
        .await?;

        let edits = permissions::unclaim_edits(self.inner.settings.staff_role, previous);
        permissions::apply(self.platform(), channel, &edits).await?;

        info!("Ticket {} unclaimed by {} (was {})", channel, actor, previous);
        Ok(previous)
    }

    /// First step of a close: remember who asked.
    pub async fn request_close(&self, channel: ChannelId, actor: UserId) -> Result<CloseKey, TicketError> {
        let ticket = self.load_ticket(channel).await?;

        if !self.is_staff_or_claimer(&ticket, actor).await? {
            debug!("{} tried to close {}", actor, channel);
            return Err(TicketError::NotAllowedToClose);
        }

        let key = CloseKey {
            channel,
            initiator: actor,
        };
        self.inner.confirmations.insert(key).await;

        info!("Close of {} requested by {}", channel, actor);
        Ok(key)
    }

    /// Check a confirmation click without acting on it.
    pub async fn verify_confirmation(
        &self,
        channel: ChannelId,
        actor: UserId,
        initiator: UserId,
    ) -> Result<CloseKey, TicketError> {
        let key = confirmation_key(channel, actor, initiator)?;
        if !self.inner.confirmations.contains(&key).await {
            return Err(TicketError::ConfirmationExpired);
        }
        Ok(key)
    }

    /// Second step of a close: archive the transcript, then forget the
    /// ticket. The channel itself is left for `schedule_channel_deletion`.
    ///
    /// The pending request is taken up front, so of two concurrent clicks
    /// only one archives. It is put back if the close fails.
    pub async fn confirm_close(
        &self,
        channel: ChannelId,
        actor: UserId,
        initiator: UserId,
    ) -> Result<ClosedTicket, TicketError> {
        let key = confirmation_key(channel, actor, initiator)?;
        if !self.inner.confirmations.remove(&key).await {
            return Err(TicketError::ConfirmationExpired);
        }

        match self.archive_and_forget(channel, actor).await {
            Ok(closed) => Ok(closed),
            Err(e) => {
                self.inner.confirmations.insert(key).await;
                Err(e)
            }
        }
    }

    async fn archive_and_forget(&self, channel: ChannelId, actor: UserId) -> Result<ClosedTicket, TicketError> {
        let ticket = self.load_ticket(channel).await?;
        let settings = &self.inner.settings;

        let messages = transcript::fetch_history(self.platform(), channel).await?;
        let channel_name = self
            .platform()
            .channel_name(channel)
            .await?
            .unwrap_or_else(|| channel.to_string());
        let document = transcript::render(&channel_name, Utc::now(), &messages);

        if self.platform().channel_name(settings.archive_channel).await?.is_none() {
            return Err(TicketError::ArchiveChannelNotFound);
        }

        let opener = match self.platform().member(ticket.creator_id).await {
            Ok(Some(_)) => Opener::Member(ticket.creator_id),
            Ok(None) => Opener::Departed(ticket.creator_id),
            Err(e) => {
                warn!("Could not look up ticket creator {}: {}", ticket.creator_id, e);
                Opener::Departed(ticket.creator_id)
            }
        };

        let archive = Post::Transcript(TranscriptPost {
            file_name: transcript::file_name(&channel_name),
            channel_name: channel_name.clone(),
            opener,
            trade_details: ticket.trade_details,
            other_user_input: ticket.other_user_input,
            can_join_vip: ticket.can_join_vip,
            closed_by: actor,
            document,
        });
        self.platform().post(settings.archive_channel, &archive).await?;

        self.store(move |db| db.delete_ticket(channel)).await?;

        info!(
            "Ticket {} ({}) closed by {}, {} messages archived",
            channel_name,
            channel,
            actor,
            messages.len()
        );

        Ok(ClosedTicket {
            channel_name,
            message_count: messages.len(),
        })
    }

    /// Delete a closed ticket's channel after the configured delay.
    pub fn schedule_channel_deletion(&self, channel: ChannelId) -> JoinHandle<()> {
        let platform = self.inner.platform.clone();
        let delay = self.inner.settings.close_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match platform.delete_channel(channel).await {
                Ok(()) => info!("Deleted ticket channel {}", channel),
                Err(e) => error!("Failed to delete ticket channel {}: {}", channel, e),
            }
        })
    }

    /// Let another user into the ticket. `input` is a mention, id or
    /// username; `None` when the command had no argument.
    pub async fn add_participant(
        &self,
        channel: ChannelId,
        actor: UserId,
        input: Option<&str>,
    ) -> Result<Member, TicketError> {
        let ticket = self.load_ticket(channel).await?;

        if !self.is_staff_or_claimer(&ticket, actor).await? {
            debug!("{} tried to add a user to {}", actor, channel);
            return Err(TicketError::NotAllowedToAdd);
        }

        let input = input.ok_or(TicketError::MissingUser)?;
        let member = resolve::find_participant(self.platform(), input)
            .await?
            .ok_or(TicketError::UserNotFound)?;

        permissions::apply(self.platform(), channel, &[permissions::participant_edit(member.id)]).await?;

        info!("{} added {} to ticket {}", actor, member.id, channel);
        Ok(member)
    }
}

fn confirmation_key(channel: ChannelId, actor: UserId, initiator: UserId) -> Result<CloseKey, TicketError> {
    if actor != initiator {
        debug!("{} tried to confirm a close started by {}", actor, initiator);
        return Err(TicketError::NotInitiator);
    }
    Ok(CloseKey { channel, initiator })
}

/// `ticket-<username>-<last six digits of the millisecond clock>`
fn channel_name(username: &str, now_millis: i64) -> String {
    format!("ticket-{}-{:06}", username, now_millis.rem_euclid(1_000_000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirmations::MemoryConfirmations;
    use crate::testing::FakePlatform;
    use middleman_types::models::{OverwriteTarget, Permission};

    const GUILD: RoleId = RoleId::new(1);
    const STAFF: RoleId = RoleId::new(2);
    const CATEGORY: ChannelId = ChannelId::new(100);
    const ARCHIVE: ChannelId = ChannelId::new(200);

    const CREATOR: UserId = UserId::new(10);
    const OTHER: UserId = UserId::new(11);
    const MOD_A: UserId = UserId::new(20);
    const MOD_B: UserId = UserId::new(21);
    const STRANGER: UserId = UserId::new(30);

    struct Harness {
        platform: Arc<FakePlatform>,
        db: Arc<Database>,
        confirmations: Arc<MemoryConfirmations>,
        controller: Controller,
    }

    fn harness() -> Harness {
        harness_with_delay(Duration::ZERO)
    }

    fn harness_with_delay(close_delay: Duration) -> Harness {
        let platform = Arc::new(
            FakePlatform::new()
                .with_member(CREATOR.get(), "en5s", &[])
                .with_member(OTHER.get(), "racoon", &[])
                .with_member(MOD_A.get(), "mod_a", &[STAFF])
                .with_member(MOD_B.get(), "mod_b", &[STAFF])
                .with_member(STRANGER.get(), "stranger", &[])
                .with_channel(CATEGORY, "Middleman")
                .with_channel(ARCHIVE, "transcripts"),
        );
        let db = Arc::new(Database::open_in_memory().unwrap());
        let confirmations = Arc::new(MemoryConfirmations::new());
        let controller = Controller::new(
            platform.clone(),
            db.clone(),
            confirmations.clone(),
            TicketSettings {
                everyone_role: GUILD,
                category: CATEGORY,
                staff_role: STAFF,
                archive_channel: ARCHIVE,
                close_delay,
            },
        );
        Harness {
            platform,
            db,
            confirmations,
            controller,
        }
    }

    fn request(other_user: &str) -> TicketRequest {
        TicketRequest {
            trade_details: "My frost dragon for his Racoon".into(),
            other_user: other_user.into(),
            can_join_vip: "Yes".into(),
        }
    }

    async fn open(h: &Harness) -> ChannelId {
        h.controller
            .open_ticket(CREATOR, "en5s", request("racoon"))
            .await
            .unwrap()
            .channel_id
    }

    #[test]
    fn channel_names_use_last_six_digits() {
        assert_eq!(channel_name("en5s", 1_731_000_123_456), "ticket-en5s-123456");
        assert_eq!(channel_name("en5s", 1_731_000_000_042), "ticket-en5s-000042");
    }

    #[tokio::test]
    async fn open_with_resolved_counterparty() {
        let h = harness();
        let opened = h
            .controller
            .open_ticket(CREATOR, "en5s", request("Racoon"))
            .await
            .unwrap();

        assert_eq!(opened.other_user_id, Some(OTHER));
        let stored = h.db.get_ticket(opened.channel_id).unwrap().unwrap();
        assert_eq!(stored.other_user_id, Some(OTHER));
        assert_eq!(stored.creator_id, CREATOR);
        assert!(!stored.is_claimed());

        let everyone = h.platform.overwrite(opened.channel_id, OverwriteTarget::Role(GUILD)).unwrap();
        assert!(everyone.deny.contains(&Permission::ViewChannel));
        let creator = h.platform.overwrite(opened.channel_id, OverwriteTarget::Member(CREATOR)).unwrap();
        assert!(creator.grants(Permission::SendMessages));
        // The counterparty only gets in once the ticket is claimed.
        assert!(h.platform.overwrite(opened.channel_id, OverwriteTarget::Member(OTHER)).is_none());

        let posts = h.platform.posts();
        assert_eq!(posts.len(), 1);
        match &posts[0] {
            (channel, Post::Welcome(welcome)) => {
                assert_eq!(*channel, opened.channel_id);
                assert_eq!(welcome.counterparty, Some(OTHER));
                assert_eq!(welcome.staff_role, STAFF);
            }
            other => panic!("unexpected post {:?}", other),
        }
    }

    #[tokio::test]
    async fn open_with_unknown_numeric_counterparty() {
        let h = harness();
        let opened = h
            .controller
            .open_ticket(CREATOR, "en5s", request("123456789"))
            .await
            .unwrap();

        assert!(opened.other_user_id.is_none());
        let stored = h.db.get_ticket(opened.channel_id).unwrap().unwrap();
        assert_eq!(stored.other_user_id, None);
        assert_eq!(stored.other_user_input, "123456789");

        match &h.platform.posts()[0].1 {
            Post::Welcome(welcome) => {
                assert_eq!(welcome.counterparty, None);
                assert_eq!(welcome.other_user_input, "123456789");
            }
            other => panic!("unexpected post {:?}", other),
        }
    }

    #[tokio::test]
    async fn open_without_category_creates_nothing() {
        let h = harness();
        h.platform.state.lock().unwrap().channels.remove(&CATEGORY);

        let err = h
            .controller
            .open_ticket(CREATOR, "en5s", request("racoon"))
            .await
            .unwrap_err();

        assert!(matches!(err, TicketError::CategoryNotFound));
        assert_eq!(h.db.count_tickets().unwrap(), 0);
        assert!(h.platform.posts().is_empty());
    }

    #[tokio::test]
    async fn staff_claims_open_ticket() {
        let h = harness();
        let channel = open(&h).await;

        let ticket = h.controller.claim(channel, MOD_A).await.unwrap();
        assert_eq!(ticket.claimer_id, Some(MOD_A));

        let stored = h.db.get_ticket(channel).unwrap().unwrap();
        assert!(stored.is_claimed());
        assert_eq!(stored.claimer_id, Some(MOD_A));

        let staff = h.platform.overwrite(channel, OverwriteTarget::Role(STAFF)).unwrap();
        assert!(!staff.grants(Permission::ViewChannel));
        let claimer = h.platform.overwrite(channel, OverwriteTarget::Member(MOD_A)).unwrap();
        assert!(claimer.grants(Permission::ManageMessages));
        let other = h.platform.overwrite(channel, OverwriteTarget::Member(OTHER)).unwrap();
        assert!(other.grants(Permission::ViewChannel));
    }

    #[tokio::test]
    async fn claim_requires_staff() {
        let h = harness();
        let channel = open(&h).await;

        let err = h.controller.claim(channel, CREATOR).await.unwrap_err();
        assert!(matches!(err, TicketError::NotStaff));
        assert!(!h.db.get_ticket(channel).unwrap().unwrap().is_claimed());
    }

    #[tokio::test]
    async fn second_claim_fails_without_change() {
        let h = harness();
        let channel = open(&h).await;
        h.controller.claim(channel, MOD_A).await.unwrap();

        let err = h.controller.claim(channel, MOD_B).await.unwrap_err();
        assert!(matches!(err, TicketError::AlreadyClaimed));
        assert_eq!(h.db.get_ticket(channel).unwrap().unwrap().claimer_id, Some(MOD_A));
        assert!(h.platform.overwrite(channel, OverwriteTarget::Member(MOD_B)).is_none());
    }

    #[tokio::test]
    async fn claim_outside_ticket() {
        let h = harness();
        let err = h.controller.claim(ChannelId::new(4242), MOD_A).await.unwrap_err();
        assert!(matches!(err, TicketError::NotATicket));
    }

    #[tokio::test]
    async fn unclaim_open_ticket_fails_without_change() {
        let h = harness();
        let channel = open(&h).await;
        let before = h.db.get_ticket(channel).unwrap();

        let err = h.controller.unclaim(channel, MOD_A).await.unwrap_err();
        assert!(matches!(err, TicketError::NotClaimed));
        assert_eq!(h.db.get_ticket(channel).unwrap(), before);
    }

    #[tokio::test]
    async fn unclaim_by_other_staff_restores_access() {
        let h = harness();
        let channel = open(&h).await;
        h.controller.claim(channel, MOD_A).await.unwrap();

        let previous = h.controller.unclaim(channel, MOD_B).await.unwrap();
        assert_eq!(previous, MOD_A);
        assert!(!h.db.get_ticket(channel).unwrap().unwrap().is_claimed());

        let staff = h.platform.overwrite(channel, OverwriteTarget::Role(STAFF)).unwrap();
        assert!(staff.grants(Permission::ViewChannel));
        assert!(h.platform.overwrite(channel, OverwriteTarget::Member(MOD_A)).is_none());

        // Claiming again works once released.
        h.controller.claim(channel, MOD_B).await.unwrap();
    }

    #[tokio::test]
    async fn unclaim_by_non_staff_is_rejected() {
        let h = harness();
        let channel = open(&h).await;
        h.controller.claim(channel, MOD_A).await.unwrap();

        let err = h.controller.unclaim(channel, CREATOR).await.unwrap_err();
        assert!(matches!(err, TicketError::NotAllowedToUnclaim));
        assert_eq!(h.db.get_ticket(channel).unwrap().unwrap().claimer_id, Some(MOD_A));
    }

    #[tokio::test]
    async fn claimer_without_role_can_still_unclaim_and_close() {
        let h = harness();
        let channel = open(&h).await;
        h.controller.claim(channel, MOD_A).await.unwrap();
        // The claimer loses the staff role after claiming.
        h.platform.state.lock().unwrap().members[2].roles.clear();

        h.controller.request_close(channel, MOD_A).await.unwrap();
        h.controller.unclaim(channel, MOD_A).await.unwrap();
    }

    #[tokio::test]
    async fn close_requires_staff_or_claimer() {
        let h = harness();
        let channel = open(&h).await;

        let err = h.controller.request_close(channel, CREATOR).await.unwrap_err();
        assert!(matches!(err, TicketError::NotAllowedToClose));
        assert_eq!(h.confirmations.len().await, 0);
    }

    #[tokio::test]
    async fn only_initiator_can_confirm() {
        let h = harness();
        let channel = open(&h).await;
        h.controller.claim(channel, MOD_A).await.unwrap();
        let key = h.controller.request_close(channel, MOD_A).await.unwrap();

        let err = h.controller.confirm_close(channel, MOD_B, MOD_A).await.unwrap_err();
        assert!(matches!(err, TicketError::NotInitiator));
        assert_eq!(
            err.to_string(),
            "Only the person who initiated the close can confirm it."
        );
        assert!(h.confirmations.contains(&key).await);
        assert!(h.db.get_ticket(channel).unwrap().is_some());
    }

    #[tokio::test]
    async fn confirm_without_request_has_expired() {
        let h = harness();
        let channel = open(&h).await;

        let err = h.controller.confirm_close(channel, MOD_A, MOD_A).await.unwrap_err();
        assert!(matches!(err, TicketError::ConfirmationExpired));
        assert!(h.db.get_ticket(channel).unwrap().is_some());
    }

    #[tokio::test]
    async fn confirmed_close_archives_and_deletes() {
        let h = harness();
        let channel = open(&h).await;
        h.db.upsert_ticket(&Ticket {
            channel_id: ChannelId::new(777),
            creator_id: STRANGER,
            other_user_id: None,
            other_user_input: "x".into(),
            trade_details: "y".into(),
            can_join_vip: "z".into(),
            claimer_id: None,
        })
        .unwrap();
        h.platform.push_messages(channel, 250);
        h.controller.claim(channel, MOD_A).await.unwrap();
        let key = h.controller.request_close(channel, MOD_A).await.unwrap();

        let closed = h.controller.confirm_close(channel, MOD_A, MOD_A).await.unwrap();
        assert_eq!(closed.message_count, 250);

        // Exactly one record removed.
        assert_eq!(h.db.get_ticket(channel).unwrap(), None);
        assert_eq!(h.db.count_tickets().unwrap(), 1);
        assert!(!h.confirmations.contains(&key).await);

        let archived: Vec<_> = h
            .platform
            .posts()
            .into_iter()
            .filter(|(c, _)| *c == ARCHIVE)
            .collect();
        assert_eq!(archived.len(), 1);
        let Post::Transcript(post) = &archived[0].1 else {
            panic!("expected a transcript post");
        };
        assert_eq!(post.opener, Opener::Member(CREATOR));
        assert_eq!(post.closed_by, MOD_A);
        assert_eq!(post.other_user_input, "racoon");
        assert!(post.file_name.starts_with("transcript-ticket-en5s-"));
        assert!(post.document.starts_with(&format!("Ticket: {}\n", closed.channel_name)));

        let positions: Vec<usize> = (1..=250)
            .map(|n| post.document.find(&format!("\nmessage {}\n", n)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        h.controller.schedule_channel_deletion(channel).await.unwrap();
        assert_eq!(h.platform.state.lock().unwrap().deleted, vec![channel]);
    }

    #[tokio::test]
    async fn close_with_departed_creator() {
        let h = harness();
        let channel = open(&h).await;
        h.platform.state.lock().unwrap().members.retain(|m| m.id != CREATOR);
        h.controller.request_close(channel, MOD_B).await.unwrap();

        h.controller.confirm_close(channel, MOD_B, MOD_B).await.unwrap();

        let (_, Post::Transcript(post)) = h.platform.posts().pop().unwrap() else {
            panic!("expected a transcript post");
        };
        assert_eq!(post.opener, Opener::Departed(CREATOR));
    }

    #[tokio::test]
    async fn missing_archive_keeps_ticket() {
        let h = harness();
        let channel = open(&h).await;
        h.platform.state.lock().unwrap().channels.remove(&ARCHIVE);
        let key = h.controller.request_close(channel, MOD_A).await.unwrap();

        let err = h.controller.confirm_close(channel, MOD_A, MOD_A).await.unwrap_err();
        assert!(matches!(err, TicketError::ArchiveChannelNotFound));
        assert!(h.db.get_ticket(channel).unwrap().is_some());
        assert!(h.confirmations.contains(&key).await);
    }

    #[tokio::test]
    async fn concurrent_close_requests_are_independent() {
        let h = harness();
        let channel = open(&h).await;
        h.controller.request_close(channel, MOD_A).await.unwrap();
        h.controller.request_close(channel, MOD_B).await.unwrap();
        assert_eq!(h.confirmations.len().await, 2);

        h.controller.confirm_close(channel, MOD_B, MOD_B).await.unwrap();
        assert_eq!(h.confirmations.len().await, 1);
    }

    #[tokio::test]
    async fn add_participant_rules() {
        let h = harness();
        let channel = open(&h).await;

        let err = h
            .controller
            .add_participant(channel, STRANGER, Some("racoon"))
            .await
            .unwrap_err();
        assert!(matches!(err, TicketError::NotAllowedToAdd));

        let err = h.controller.add_participant(channel, MOD_A, None).await.unwrap_err();
        assert!(matches!(err, TicketError::MissingUser));

        let err = h
            .controller
            .add_participant(channel, MOD_A, Some("<@999>"))
            .await
            .unwrap_err();
        assert!(matches!(err, TicketError::UserNotFound));

        let added = h
            .controller
            .add_participant(channel, MOD_A, Some(&format!("<@!{}>", STRANGER)))
            .await
            .unwrap();
        assert_eq!(added.id, STRANGER);
        let ow = h.platform.overwrite(channel, OverwriteTarget::Member(STRANGER)).unwrap();
        assert!(ow.grants(Permission::ReadMessageHistory));
        assert!(!ow.grants(Permission::ManageMessages));
    }

    #[tokio::test]
    async fn claimer_can_add_participants() {
        let h = harness();
        let channel = open(&h).await;
        h.controller.claim(channel, MOD_A).await.unwrap();
        h.platform.state.lock().unwrap().members[2].roles.clear();

        let added = h
            .controller
            .add_participant(channel, MOD_A, Some("Stranger"))
            .await
            .unwrap();
        assert_eq!(added.id, STRANGER);
    }

    #[tokio::test]
    async fn failed_permission_edit_surfaces_as_external() {
        let h = harness();
        let channel = open(&h).await;
        h.platform.state.lock().unwrap().fail_set_overwrite = true;

        let err = h.controller.claim(channel, MOD_A).await.unwrap_err();
        assert!(err.is_external());
    }

    #[tokio::test]
    async fn panel_is_posted_where_asked() {
        let h = harness();
        let lobby = ChannelId::new(50);
        h.controller.post_panel(lobby).await.unwrap();
        assert_eq!(h.platform.posts(), vec![(lobby, Post::Panel)]);
    }

    #[tokio::test]
    async fn simultaneous_confirmations_archive_once() {
        let h = harness();
        let channel = open(&h).await;
        h.controller.request_close(channel, MOD_A).await.unwrap();

        let (first, second) = tokio::join!(
            h.controller.confirm_close(channel, MOD_A, MOD_A),
            h.controller.confirm_close(channel, MOD_A, MOD_A)
        );

        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
        let rejected = first.err().or(second.err()).unwrap();
        assert!(matches!(rejected, TicketError::ConfirmationExpired));

        let archived = h.platform.posts().into_iter().filter(|(c, _)| *c == ARCHIVE).count();
        assert_eq!(archived, 1);
        assert_eq!(h.confirmations.len().await, 0);
        assert_eq!(h.db.get_ticket(channel).unwrap(), None);
    }

    #[tokio::test]
    async fn failed_close_can_be_confirmed_again() {
        let h = harness();
        let channel = open(&h).await;
        h.platform.state.lock().unwrap().channels.remove(&ARCHIVE);
        h.controller.request_close(channel, MOD_A).await.unwrap();

        assert!(h.controller.confirm_close(channel, MOD_A, MOD_A).await.is_err());

        h.platform.state.lock().unwrap().channels.insert(ARCHIVE, "transcripts".into());
        h.controller.confirm_close(channel, MOD_A, MOD_A).await.unwrap();
        assert_eq!(h.db.get_ticket(channel).unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn channel_deletion_waits_for_close_delay() {
        let h = harness_with_delay(Duration::from_secs(3));
        let channel = ChannelId::new(9001);

        let handle = h.controller.schedule_channel_deletion(channel);

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert!(h.platform.state.lock().unwrap().deleted.is_empty());

        handle.await.unwrap();
        assert_eq!(h.platform.state.lock().unwrap().deleted, vec![channel]);
    }
}
