//! Embeds, buttons and forms for every message the bot sends.

use serenity::all::{
    ButtonStyle, CreateActionRow, CreateButton, CreateEmbed, CreateInputText, CreateModal,
    InputTextStyle, Timestamp,
};

use middleman_types::events::{
    ComponentAction, FIELD_CAN_JOIN_VIP, FIELD_OTHER_USER, FIELD_TRADE_DETAILS, TICKET_MODAL_ID,
};
use middleman_types::models::UserId;
use middleman_types::posts::{Opener, TranscriptPost, WelcomePost};

pub const GREEN: u32 = 0x00FF00;
pub const RED: u32 = 0xFF0000;
pub const ORANGE: u32 = 0xFFA500;
pub const BLURPLE: u32 = 0x5865F2;

const PANEL_TEXT: &str = "Found a trade and would like to ensure a safe trading experience?\n\n\
    ## Open a ticket below\n\n\
    **What we provide:**\n\
    • We provide safe traders between 2 parties\n\
    • We provide fast and easy deals\n\n\
    ## Important Notes\n\
    • Both parties must agree before opening a ticket\n\
    • Fake/Troll tickets will result into a ban or ticket blacklist\n\
    • Follow Discord Terms of Service and server guidelines";

pub fn notice(colour: u32, text: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new().colour(colour).description(text)
}

pub fn success(text: impl std::fmt::Display) -> CreateEmbed {
    notice(GREEN, format!("✅ {}", text))
}

pub fn failure(text: impl std::fmt::Display) -> CreateEmbed {
    notice(RED, format!("❌ {}", text))
}

pub fn user_mention(user: UserId) -> String {
    format!("<@{}>", user)
}

/// `image` is an `attachment://` url when the banner could be loaded.
pub fn panel(image: Option<&str>) -> (CreateEmbed, CreateActionRow) {
    let mut embed = CreateEmbed::new()
        .colour(GREEN)
        .title("🛡️ Middleman Service")
        .description(PANEL_TEXT)
        .timestamp(Timestamp::now());
    if let Some(url) = image {
        embed = embed.image(url);
    }

    let button = CreateButton::new(ComponentAction::RequestTicket.custom_id())
        .label("Request")
        .style(ButtonStyle::Primary)
        .emoji('🎫');

    (embed, CreateActionRow::Buttons(vec![button]))
}

pub fn request_form() -> CreateModal {
    let trade_details = CreateInputText::new(InputTextStyle::Paragraph, "Trade Details", FIELD_TRADE_DETAILS)
        .placeholder("Eg. My frost dragon for his Racoon")
        .required(true)
        .max_length(1000);
    let other_user = CreateInputText::new(InputTextStyle::Short, "Other User or ID", FIELD_OTHER_USER)
        .placeholder("Eg. en5s or 123456789")
        .required(true)
        .max_length(100);
    let can_join_vip = CreateInputText::new(InputTextStyle::Short, "Can you join VIP", FIELD_CAN_JOIN_VIP)
        .placeholder("Yes/No")
        .required(true)
        .max_length(10);

    CreateModal::new(TICKET_MODAL_ID, "Middleman Ticket Request").components(vec![
        CreateActionRow::InputText(trade_details),
        CreateActionRow::InputText(other_user),
        CreateActionRow::InputText(can_join_vip),
    ])
}

fn counterparty_status(welcome: &WelcomePost) -> String {
    match welcome.counterparty {
        Some(id) => format!(
            "✅ The user is found, use {} or `{}` to add the person to the ticket.",
            user_mention(id),
            id
        ),
        None => not_found(&welcome.other_user_input),
    }
}

fn not_found(input: &str) -> String {
    format!("❌ User \"{}\" not found in the server", input)
}

pub fn welcome(welcome: &WelcomePost) -> (Vec<CreateEmbed>, CreateActionRow) {
    let other_user = match welcome.counterparty {
        Some(id) => user_mention(id),
        None => not_found(&welcome.other_user_input),
    };

    let intro = CreateEmbed::new()
        .colour(GREEN)
        .title("🎫 New Ticket Created")
        .description(format!(
            "Hello {} and <@&{}>!",
            user_mention(welcome.creator),
            welcome.staff_role
        ))
        .field("📝 Trade Details", welcome.trade_details.clone(), false)
        .field("👤 Other User", other_user, true)
        .field("💎 Can Join VIP", welcome.can_join_vip.clone(), true)
        .timestamp(Timestamp::now());

    let status_colour = if welcome.counterparty.is_some() { GREEN } else { RED };
    let status = notice(status_colour, counterparty_status(welcome));
    let wait = notice(
        ORANGE,
        "⏳ Please wait for a middleman member to claim this ticket and help both parties.",
    );

    let buttons = CreateActionRow::Buttons(vec![
        CreateButton::new(ComponentAction::Claim.custom_id())
            .label("Claim")
            .style(ButtonStyle::Success),
        CreateButton::new(ComponentAction::Unclaim.custom_id())
            .label("Unclaim")
            .style(ButtonStyle::Secondary),
        CreateButton::new(ComponentAction::Close.custom_id())
            .label("Close")
            .style(ButtonStyle::Danger),
    ]);

    (vec![intro, status, wait], buttons)
}

/// The "are you sure" prompt; only `initiator` can use its button.
pub fn close_prompt(initiator: UserId) -> (CreateEmbed, CreateActionRow) {
    let button = CreateButton::new(ComponentAction::ConfirmClose { initiator }.custom_id())
        .label("Close")
        .style(ButtonStyle::Primary);
    (
        notice(ORANGE, "🗑️ Close Ticket?"),
        CreateActionRow::Buttons(vec![button]),
    )
}

pub fn transcript_summary(post: &TranscriptPost) -> CreateEmbed {
    let opener = match post.opener {
        Opener::Member(id) => user_mention(id),
        Opener::Departed(id) => format!("User ID: {} (Left server)", id),
    };

    CreateEmbed::new()
        .colour(BLURPLE)
        .title(format!("📄 Ticket Transcript - {}", post.channel_name))
        .description(format!(
            "**The opener of ticket:** {}\n\n\
             **Trade Details:** {}\n\
             **Other User or ID:** {}\n\
             **Can you join VIP:** {}\n\n\
             **Closed by:** {}",
            opener,
            post.trade_details,
            post.other_user_input,
            post.can_join_vip,
            user_mention(post.closed_by)
        ))
        .timestamp(Timestamp::now())
}
