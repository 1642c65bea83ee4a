use serenity::all::{
    ActionRowComponent, ComponentInteraction, Context, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateMessage, EditInteractionResponse, EventHandler,
    GuildId, Interaction, Message, ModalInteraction, Ready,
};
use serenity::async_trait;
use tracing::{debug, error, info, warn};

use middleman_core::{Controller, TicketError};
use middleman_types::events::{
    ComponentAction, FIELD_CAN_JOIN_VIP, FIELD_OTHER_USER, FIELD_TRADE_DETAILS, TICKET_MODAL_ID,
    TextCommand,
};
use middleman_types::models::{ChannelId, TicketRequest, UserId};

use crate::render;

const SEND_FAILED: &str = "An error occurred while sending the message.";
const ADD_FAILED: &str = "An error occurred while adding the user.";
const CLOSE_FAILED: &str = "An error occurred while processing the close command.";
const CLAIM_FAILED: &str = "An error occurred while claiming the ticket.";
const UNCLAIM_FAILED: &str = "An error occurred while unclaiming the ticket.";
const CONFIRM_FAILED: &str = "An error occurred while closing the ticket.";
const CREATE_FAILED: &str =
    "An error occurred while creating the ticket. Please try again or contact an administrator.";

/// Routes gateway events for one guild into the ticket controller.
pub struct Handler {
    controller: Controller,
    guild: GuildId,
    prefix: String,
}

impl Handler {
    pub fn new(controller: Controller, guild_id: u64, prefix: String) -> Self {
        Self {
            controller,
            guild: GuildId::new(guild_id),
            prefix,
        }
    }

    fn in_guild(&self, guild: Option<GuildId>) -> bool {
        guild == Some(self.guild)
    }

    async fn on_command(&self, ctx: &Context, msg: &Message, command: TextCommand) {
        let channel = ChannelId::new(msg.channel_id.get());
        let actor = UserId::new(msg.author.id.get());

        match command {
            TextCommand::Send => match self.controller.post_panel(channel).await {
                Ok(()) => {
                    if let Err(e) = msg.delete(&ctx.http).await {
                        debug!("Could not delete send command in {}: {}", channel, e);
                    }
                }
                Err(e) => self.reply_failure(ctx, msg, &e, SEND_FAILED).await,
            },
            TextCommand::Add(input) => {
                match self.controller.add_participant(channel, actor, input.as_deref()).await {
                    Ok(member) => {
                        let text = format!("{} has been added to the ticket.", member.mention());
                        reply(ctx, msg, CreateMessage::new().embed(render::success(text))).await;
                    }
                    Err(e) => self.reply_failure(ctx, msg, &e, ADD_FAILED).await,
                }
            }
            TextCommand::Close => match self.controller.request_close(channel, actor).await {
                Ok(key) => {
                    let (embed, button) = render::close_prompt(key.initiator);
                    reply(ctx, msg, CreateMessage::new().embed(embed).components(vec![button])).await;
                }
                Err(e) => self.reply_failure(ctx, msg, &e, CLOSE_FAILED).await,
            },
        }
    }

    async fn reply_failure(&self, ctx: &Context, msg: &Message, err: &TicketError, generic: &'static str) {
        log_failure(err, generic);
        let text = explain(err, true, &self.prefix, generic);
        reply(ctx, msg, CreateMessage::new().embed(render::failure(text))).await;
    }

    async fn on_component(&self, ctx: &Context, component: &ComponentInteraction) {
        let Some(action) = ComponentAction::parse(&component.data.custom_id) else {
            debug!("Ignoring unknown component {}", component.data.custom_id);
            return;
        };
        let channel = ChannelId::new(component.channel_id.get());
        let actor = UserId::new(component.user.id.get());

        match action {
            ComponentAction::RequestTicket => {
                let response = CreateInteractionResponse::Modal(render::request_form());
                if let Err(e) = component.create_response(&ctx.http, response).await {
                    error!("Failed to show ticket form to {}: {}", actor, e);
                }
            }
            ComponentAction::Claim => match self.controller.claim(channel, actor).await {
                Ok(_) => {
                    let text = format!("{} has claimed this ticket.", render::user_mention(actor));
                    respond(ctx, component, message(render::success(text))).await;
                }
                Err(e) => self.respond_failure(ctx, component, &e, CLAIM_FAILED).await,
            },
            ComponentAction::Unclaim => match self.controller.unclaim(channel, actor).await {
                Ok(_) => {
                    let text = format!("🔓 {} has unclaimed the ticket.", render::user_mention(actor));
                    respond(ctx, component, message(render::notice(render::ORANGE, text))).await;
                }
                Err(e) => self.respond_failure(ctx, component, &e, UNCLAIM_FAILED).await,
            },
            ComponentAction::Close => match self.controller.request_close(channel, actor).await {
                Ok(key) => {
                    let (embed, button) = render::close_prompt(key.initiator);
                    respond(ctx, component, message(embed).components(vec![button])).await;
                }
                Err(e) => self.respond_failure(ctx, component, &e, CLOSE_FAILED).await,
            },
            ComponentAction::ConfirmClose { initiator } => {
                self.on_confirm_close(ctx, component, channel, actor, initiator).await;
            }
        }
    }

    async fn on_confirm_close(
        &self,
        ctx: &Context,
        component: &ComponentInteraction,
        channel: ChannelId,
        actor: UserId,
        initiator: UserId,
    ) {
        // Rejections are answered privately before the slow part starts.
        if let Err(e) = self.controller.verify_confirmation(channel, actor, initiator).await {
            self.respond_failure(ctx, component, &e, CONFIRM_FAILED).await;
            return;
        }

        let defer = CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new());
        if let Err(e) = component.create_response(&ctx.http, defer).await {
            warn!("Failed to defer close confirmation in {}: {}", channel, e);
        }

        let embed = match self.controller.confirm_close(channel, actor, initiator).await {
            Ok(closed) => {
                debug!("Archived {} messages from {}", closed.message_count, closed.channel_name);
                self.controller.schedule_channel_deletion(channel);
                render::success(format!(
                    "Ticket closed. Transcript saved. Deleting channel in {} seconds...",
                    self.controller.settings().close_delay.as_secs()
                ))
            }
            Err(e) => {
                log_failure(&e, CONFIRM_FAILED);
                render::failure(explain(&e, false, &self.prefix, CONFIRM_FAILED))
            }
        };

        let edit = EditInteractionResponse::new().embed(embed);
        if let Err(e) = component.edit_response(&ctx.http, edit).await {
            warn!("Failed to update close confirmation in {}: {}", channel, e);
        }
    }

    async fn respond_failure(
        &self,
        ctx: &Context,
        component: &ComponentInteraction,
        err: &TicketError,
        generic: &'static str,
    ) {
        log_failure(err, generic);
        let text = explain(err, false, &self.prefix, generic);
        respond(ctx, component, message(render::failure(text)).ephemeral(true)).await;
    }

    async fn on_modal(&self, ctx: &Context, modal: &ModalInteraction) {
        if modal.data.custom_id != TICKET_MODAL_ID {
            debug!("Ignoring unknown modal {}", modal.data.custom_id);
            return;
        }

        let defer =
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new().ephemeral(true));
        if let Err(e) = modal.create_response(&ctx.http, defer).await {
            warn!("Failed to defer ticket form from {}: {}", modal.user.id, e);
        }

        let request = ticket_request(modal);
        let creator = UserId::new(modal.user.id.get());

        let embed = match self.controller.open_ticket(creator, &modal.user.name, request).await {
            Ok(ticket) => render::success(format!("Ticket created successfully! <#{}>", ticket.channel_id)),
            Err(e) => {
                log_failure(&e, CREATE_FAILED);
                render::failure(explain(&e, false, &self.prefix, CREATE_FAILED))
            }
        };

        let edit = EditInteractionResponse::new().embed(embed);
        if let Err(e) = modal.edit_response(&ctx.http, edit).await {
            warn!("Failed to answer ticket form from {}: {}", creator, e);
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        let settings = self.controller.settings();
        info!("Logged in as {}", ready.user.tag());
        info!(
            "Prefix '{}', category {}, staff role {}, transcripts {}",
            self.prefix, settings.category, settings.staff_role, settings.archive_channel
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot || !self.in_guild(msg.guild_id) {
            return;
        }
        let Some(command) = TextCommand::parse(&self.prefix, &msg.content) else {
            return;
        };

        debug!("{} ran {:?} in {}", msg.author.id, command, msg.channel_id);
        self.on_command(&ctx, &msg, command).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Component(component) if self.in_guild(component.guild_id) => {
                self.on_component(&ctx, &component).await;
            }
            Interaction::Modal(modal) if self.in_guild(modal.guild_id) => {
                self.on_modal(&ctx, &modal).await;
            }
            _ => {}
        }
    }
}

fn message(embed: serenity::all::CreateEmbed) -> CreateInteractionResponseMessage {
    CreateInteractionResponseMessage::new().embed(embed)
}

async fn respond(ctx: &Context, component: &ComponentInteraction, message: CreateInteractionResponseMessage) {
    let response = CreateInteractionResponse::Message(message);
    if let Err(e) = component.create_response(&ctx.http, response).await {
        warn!("Failed to answer {} in {}: {}", component.data.custom_id, component.channel_id, e);
    }
}

async fn reply(ctx: &Context, msg: &Message, message: CreateMessage) {
    if let Err(e) = msg.channel_id.send_message(&ctx.http, message.reference_message(msg)).await {
        warn!("Failed to reply in {}: {}", msg.channel_id, e);
    }
}

fn log_failure(err: &TicketError, generic: &str) {
    if err.is_external() {
        error!("{} User was told: {}", err, generic);
    } else {
        debug!("Rejected: {}", err);
    }
}

/// What the user is told when an operation fails. Infrastructure errors
/// collapse into `generic`; `via_command` marks the prefix-command path.
fn explain(err: &TicketError, via_command: bool, prefix: &str, generic: &str) -> String {
    match err {
        e if e.is_external() => generic.to_string(),
        TicketError::NotATicket if via_command => {
            "This command can only be used in ticket channels.".to_string()
        }
        TicketError::MissingUser => {
            format!("{} Usage: `{}add @user` or `{}add userID`", err, prefix, prefix)
        }
        other => other.to_string(),
    }
}

fn ticket_request(modal: &ModalInteraction) -> TicketRequest {
    let field = |id: &str| -> String {
        modal
            .data
            .components
            .iter()
            .flat_map(|row| row.components.iter())
            .find_map(|component| match component {
                ActionRowComponent::InputText(input) if input.custom_id == id => input.value.clone(),
                _ => None,
            })
            .unwrap_or_default()
    };

    TicketRequest {
        trade_details: field(FIELD_TRADE_DETAILS),
        other_user: field(FIELD_OTHER_USER),
        can_join_vip: field(FIELD_CAN_JOIN_VIP),
    }
}
