//! /reminder command handlers
//!
//! Handles: reminder (create, edit, delete, list)
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 2.0.0: Subcommand options instead of the modal wizard
//! - 1.0.0: Initial implementation

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;
use serenity::model::application::interaction::application_command::{
    ApplicationCommandInteraction, CommandDataOption,
};
use serenity::model::application::interaction::InteractionResponseType;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::SlashCommandHandler;
use crate::commands::{get_channel_option, get_string_option};
use crate::features::reminders::{NewReminder, ReminderEdit, ReminderError};

/// Longest slice of the first message segment shown in listings
const LIST_EXCERPT_CHARS: usize = 50;

/// Builds the /reminder command definition
pub fn create_commands() -> Vec<CreateApplicationCommand> {
    let mut reminder = CreateApplicationCommand::default();
    reminder
        .name("reminder")
        .description("Manage recurring reminders for this server")
        .create_option(|option| {
            option
                .name("create")
                .description("Create a recurring reminder")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub| {
                    sub.name("channel")
                        .description("Channel the reminder posts to")
                        .kind(CommandOptionType::Channel)
                        .required(true)
                })
                .create_sub_option(|sub| {
                    sub.name("cron-time")
                        .description("Cron schedule, e.g. 0 9 * * 1-5")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
                .create_sub_option(|sub| {
                    sub.name("name")
                        .description("Display name for the reminder")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
                .create_sub_option(|sub| {
                    sub.name("message")
                        .description("Message to post on each firing")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
        })
        .create_option(|option| {
            option
                .name("edit")
                .description("Change an existing reminder")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub| {
                    sub.name("id")
                        .description("Reminder ID (from /reminder list)")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
                .create_sub_option(|sub| {
                    sub.name("name")
                        .description("New display name")
                        .kind(CommandOptionType::String)
                        .required(false)
                })
                .create_sub_option(|sub| {
                    sub.name("message")
                        .description("New message text")
                        .kind(CommandOptionType::String)
                        .required(false)
                })
                .create_sub_option(|sub| {
                    sub.name("cron-time")
                        .description("New cron schedule")
                        .kind(CommandOptionType::String)
                        .required(false)
                })
                .create_sub_option(|sub| {
                    sub.name("channel")
                        .description("New target channel")
                        .kind(CommandOptionType::Channel)
                        .required(false)
                })
        })
        .create_option(|option| {
            option
                .name("delete")
                .description("Delete a reminder")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub| {
                    sub.name("id")
                        .description("Reminder ID (from /reminder list)")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
        })
        .create_option(|option| {
            option
                .name("list")
                .description("List this server's reminders")
                .kind(CommandOptionType::SubCommand)
        });

    vec![reminder]
}

/// Handler for the /reminder command family
pub struct ReminderHandler;

#[async_trait]
impl SlashCommandHandler for ReminderHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["reminder"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let guild_id = match command.guild_id {
            Some(id) => id.to_string(),
            None => {
                return respond(serenity_ctx, command, "❌ Reminders only work in a server.").await;
            }
        };

        let Some(sub) = command.data.options.first() else {
            return respond(serenity_ctx, command, "❌ Missing subcommand.").await;
        };

        match sub.name.as_str() {
            "create" => {
                self.handle_create(&ctx, serenity_ctx, command, &guild_id, &sub.options)
                    .await
            }
            "edit" => {
                self.handle_edit(&ctx, serenity_ctx, command, &sub.options)
                    .await
            }
            "delete" => {
                self.handle_delete(&ctx, serenity_ctx, command, &sub.options)
                    .await
            }
            "list" => self.handle_list(&ctx, serenity_ctx, command, &guild_id).await,
            _ => Ok(()),
        }
    }
}

impl ReminderHandler {
    /// Handle /reminder create
    async fn handle_create(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
        guild_id: &str,
        options: &[CommandDataOption],
    ) -> Result<()> {
        let channel = get_channel_option(options, "channel")
            .ok_or_else(|| anyhow::anyhow!("Missing channel parameter"))?;
        let cron_time = get_string_option(options, "cron-time")
            .ok_or_else(|| anyhow::anyhow!("Missing cron-time parameter"))?;
        let name = get_string_option(options, "name")
            .ok_or_else(|| anyhow::anyhow!("Missing name parameter"))?;
        let message = get_string_option(options, "message")
            .ok_or_else(|| anyhow::anyhow!("Missing message parameter"))?;

        let result = ctx
            .service
            .create(NewReminder {
                name,
                message,
                cron_time,
                channel: channel.to_string(),
                guild: guild_id.to_string(),
                created_by: command.user.id.to_string(),
            })
            .await;

        match result {
            Ok(reminder) => {
                info!(
                    "user {} created reminder {} in guild {guild_id}",
                    command.user.id, reminder.id
                );
                respond(
                    serenity_ctx,
                    command,
                    &format!(
                        "⏰ Created **{}** on schedule `{}` in <#{}>.\n*ID: `{}`*",
                        reminder.name, reminder.cron_time, reminder.channel, reminder.id
                    ),
                )
                .await
            }
            Err(e) => respond(serenity_ctx, command, &user_error(&e)).await,
        }
    }

    /// Handle /reminder edit
    async fn handle_edit(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
        options: &[CommandDataOption],
    ) -> Result<()> {
        let id = get_string_option(options, "id")
            .ok_or_else(|| anyhow::anyhow!("Missing id parameter"))?;

        let fields = ReminderEdit {
            name: get_string_option(options, "name"),
            message: get_string_option(options, "message"),
            cron_time: get_string_option(options, "cron-time"),
            channel: get_channel_option(options, "channel").map(|c| c.to_string()),
        };

        match ctx.service.edit(&id, fields).await {
            Ok(reminder) => {
                info!("user {} edited reminder {id}", command.user.id);
                respond(
                    serenity_ctx,
                    command,
                    &format!(
                        "✅ Updated **{}**. Schedule `{}`, channel <#{}>.",
                        reminder.name, reminder.cron_time, reminder.channel
                    ),
                )
                .await
            }
            Err(e) => respond(serenity_ctx, command, &user_error(&e)).await,
        }
    }

    /// Handle /reminder delete
    async fn handle_delete(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
        options: &[CommandDataOption],
    ) -> Result<()> {
        let id = get_string_option(options, "id")
            .ok_or_else(|| anyhow::anyhow!("Missing id parameter"))?;

        match ctx.service.delete(&id).await {
            Ok(()) => {
                info!("user {} deleted reminder {id}", command.user.id);
                respond(serenity_ctx, command, &format!("🗑️ Deleted reminder `{id}`.")).await
            }
            Err(e) => respond(serenity_ctx, command, &user_error(&e)).await,
        }
    }

    /// Handle /reminder list
    async fn handle_list(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
        guild_id: &str,
    ) -> Result<()> {
        let reminders = match ctx.service.list(guild_id).await {
            Ok(reminders) => reminders,
            Err(e) => return respond(serenity_ctx, command, &user_error(&e)).await,
        };

        if reminders.is_empty() {
            return respond(
                serenity_ctx,
                command,
                "📋 No reminders on this server yet.\n\nUse `/reminder create` to add one!",
            )
            .await;
        }

        let mut listing = String::from("📋 **Reminders on this server:**\n\n");
        for reminder in &reminders {
            let excerpt = excerpt(reminder.messages.first().map(String::as_str).unwrap_or(""));
            listing.push_str(&format!(
                "**{}** (`{}`) in <#{}>\n> {excerpt}\n*ID: `{}`*\n\n",
                reminder.name, reminder.cron_time, reminder.channel, reminder.id
            ));
        }
        listing.push_str("*Use `/reminder edit` or `/reminder delete` with an ID.*");

        respond(serenity_ctx, command, &listing).await
    }
}

/// Reply with an ephemeral message; errors never leak internals.
async fn respond(
    serenity_ctx: &Context,
    command: &ApplicationCommandInteraction,
    content: &str,
) -> Result<()> {
    command
        .create_interaction_response(&serenity_ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|msg| msg.content(content).ephemeral(true))
        })
        .await?;
    Ok(())
}

fn user_error(e: &ReminderError) -> String {
    match e {
        ReminderError::InvalidCron(expr) => {
            format!("❌ `{expr}` is not a valid cron expression. Try `0 9 * * 1-5`.")
        }
        ReminderError::EmptyName => "❌ The reminder needs a name.".to_string(),
        ReminderError::EmptyMessage => "❌ The reminder message cannot be empty.".to_string(),
        ReminderError::NotFound(_) => {
            "❌ No reminder with that ID. Use `/reminder list` to see IDs.".to_string()
        }
        ReminderError::Store(_) => "❌ Something went wrong saving the reminder.".to_string(),
    }
}

/// First line of the first segment, trimmed for listings
fn excerpt(segment: &str) -> String {
    let first_line = segment.lines().next().unwrap_or("");
    let mut excerpt: String = first_line.chars().take(LIST_EXCERPT_CHARS).collect();
    if first_line.chars().count() > LIST_EXCERPT_CHARS || segment.lines().count() > 1 {
        excerpt.push('…');
    }
    excerpt
}
