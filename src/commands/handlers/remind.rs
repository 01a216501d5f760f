//! Reminder command handler
//!
//! Handles: remind (add, list, delete)
//!
//! - **Version**: 2.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 2.0.0: Subcommands backed by the reminder engine; multi-target, recurring
//!   and natural-language times
//! - 1.0.0: Extracted from command_handler.rs

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use serenity::model::application::interaction::application_command::{
    ApplicationCommandInteraction, CommandDataOption,
};
use serenity::model::application::interaction::InteractionResponseType;
use serenity::prelude::Context;
use std::sync::Arc;
use uuid::Uuid;

use crate::commands::context::CommandContext;
use crate::commands::handler::SlashCommandHandler;
use crate::commands::slash::{get_integer_option, get_string_option, get_subcommand};
use crate::features::reminders::format::{describe_error, format_created, format_list, usage};
use crate::features::reminders::{CreateReminder, ReminderManager};

/// `/remind` subcommands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemindAction {
    Add,
    List,
    Delete,
}

impl RemindAction {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "add" => Some(RemindAction::Add),
            "list" => Some(RemindAction::List),
            "delete" => Some(RemindAction::Delete),
            _ => None,
        }
    }
}

/// Platform-neutral reminder command extracted from an interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderCommand {
    pub subcommand: RemindAction,
    pub who: Option<String>,
    pub when: Option<String>,
    pub message: Option<String>,
    pub id: Option<i64>,
    pub requesting_user_id: String,
    pub channel_id: String,
    pub context_id: Option<String>,
}

impl ReminderCommand {
    pub fn new(subcommand: RemindAction, requesting_user_id: &str, channel_id: &str) -> Self {
        Self {
            subcommand,
            who: None,
            when: None,
            message: None,
            id: None,
            requesting_user_id: requesting_user_id.to_string(),
            channel_id: channel_id.to_string(),
            context_id: None,
        }
    }

    /// None when the interaction carries no known subcommand
    pub fn from_interaction(command: &ApplicationCommandInteraction) -> Option<Self> {
        let (name, options) = get_subcommand(&command.data.options)?;
        let mut parsed = Self::from_options(
            name,
            options,
            &command.user.id.to_string(),
            &command.channel_id.to_string(),
        )?;
        parsed.context_id = command.guild_id.map(|id| id.to_string());
        Some(parsed)
    }

    fn from_options(
        name: &str,
        options: &[CommandDataOption],
        requesting_user_id: &str,
        channel_id: &str,
    ) -> Option<Self> {
        let mut parsed = Self::new(RemindAction::from_name(name)?, requesting_user_id, channel_id);
        parsed.who = get_string_option(options, "who");
        parsed.when = get_string_option(options, "when");
        parsed.message = get_string_option(options, "message");
        parsed.id = get_integer_option(options, "id");
        Some(parsed)
    }

    /// Run the command and produce the reply text
    pub async fn execute(&self, manager: &ReminderManager) -> String {
        let tz = manager.parser().timezone();

        match self.subcommand {
            RemindAction::Add => {
                let (Some(who), Some(when), Some(message)) = (&self.who, &self.when, &self.message)
                else {
                    return format!("❌ `who`, `when` and `message` are required.\n\n{}", usage());
                };
                let request = CreateReminder {
                    owner_id: self.requesting_user_id.clone(),
                    who: who.clone(),
                    when: when.clone(),
                    message: message.clone(),
                    channel_id: self.channel_id.clone(),
                    context_id: self.context_id.clone(),
                };
                match manager.create(request).await {
                    Ok(reminder) => format_created(&reminder, tz),
                    Err(e) => describe_error(&e),
                }
            }
            RemindAction::List => match manager.list_by_owner(&self.requesting_user_id).await {
                Ok(reminders) => format_list(&reminders, tz),
                Err(e) => describe_error(&e),
            },
            RemindAction::Delete => {
                let Some(id) = self.id else {
                    return "❌ Please provide a reminder ID. Use `/remind list` to see your reminder IDs."
                        .to_string();
                };
                match manager.delete_by_id(id, &self.requesting_user_id).await {
                    Ok(_) => format!("✅ Cancelled reminder #{id}."),
                    Err(e) => describe_error(&e),
                }
            }
        }
    }
}

/// Handler for the /remind command
pub struct RemindHandler;

#[async_trait]
impl SlashCommandHandler for RemindHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["remind"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let request_id = Uuid::new_v4();

        let reply = match ReminderCommand::from_interaction(command) {
            Some(parsed) => {
                debug!(
                    "[{request_id}] /remind {:?} from user {} in channel {}",
                    parsed.subcommand, parsed.requesting_user_id, parsed.channel_id
                );
                let reply = parsed.execute(&ctx.reminders).await;
                info!(
                    "[{request_id}] /remind {:?} handled for user {}",
                    parsed.subcommand, parsed.requesting_user_id
                );
                reply
            }
            None => {
                warn!("[{request_id}] /remind invoked without a known subcommand");
                format!("❌ Use `/remind add`, `/remind list` or `/remind delete`.\n\n{}", usage())
            }
        };

        command
            .create_interaction_response(&serenity_ctx.http, |response| {
                response
                    .kind(InteractionResponseType::ChannelMessageWithSource)
                    .interaction_response_data(|msg| msg.content(&reply))
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::{MemoryStore, TimeParser};
    use std::time::Duration;

    fn manager() -> ReminderManager {
        ReminderManager::new(
            Arc::new(MemoryStore::new()),
            TimeParser::new(chrono_tz::America::New_York),
            Duration::from_secs(5),
        )
    }

    fn add(user: &str, who: &str, when: &str, message: &str) -> ReminderCommand {
        let mut cmd = ReminderCommand::new(RemindAction::Add, user, "100");
        cmd.who = Some(who.to_string());
        cmd.when = Some(when.to_string());
        cmd.message = Some(message.to_string());
        cmd
    }

    fn delete(user: &str, id: i64) -> ReminderCommand {
        let mut cmd = ReminderCommand::new(RemindAction::Delete, user, "100");
        cmd.id = Some(id);
        cmd
    }

    #[test]
    fn test_remind_handler_commands() {
        let handler = RemindHandler;
        assert_eq!(handler.command_names(), &["remind"]);
    }

    #[test]
    fn test_from_options_subcommand_names() {
        let list = ReminderCommand::from_options("list", &[], "42", "100").unwrap();
        assert_eq!(list.subcommand, RemindAction::List);
        assert_eq!(list.requesting_user_id, "42");
        assert!(list.who.is_none());

        assert!(ReminderCommand::from_options("snooze", &[], "42", "100").is_none());
    }

    #[tokio::test]
    async fn test_add_then_list_then_delete() {
        let manager = manager();

        let reply = add("42", "@me, <@7>", "in 10m", "stretch").execute(&manager).await;
        assert!(reply.starts_with("⏰ Got it!"), "{reply}");
        assert!(reply.contains("<@42>, <@7>"));
        assert!(reply.contains("#1"));

        let reply = ReminderCommand::new(RemindAction::List, "42", "100")
            .execute(&manager)
            .await;
        assert!(reply.contains("stretch"));

        let reply = delete("42", 1).execute(&manager).await;
        assert_eq!(reply, "✅ Cancelled reminder #1.");

        let reply = ReminderCommand::new(RemindAction::List, "42", "100")
            .execute(&manager)
            .await;
        assert!(reply.contains("don't have any pending reminders"));
    }

    #[tokio::test]
    async fn test_add_validation_errors() {
        let manager = manager();

        let reply = add("42", "@me", "next blursday", "x").execute(&manager).await;
        assert!(reply.starts_with("❌"));
        assert!(reply.contains("Supported formats"));

        let reply = add("42", "@everyone", "in 5m", "x").execute(&manager).await;
        assert!(reply.starts_with("❌"));

        let reply = add("42", "@me", "in 5m", "   ").execute(&manager).await;
        assert!(reply.starts_with("❌"));

        let reply = add("42", "@me", "in 5m", &"x".repeat(2500)).execute(&manager).await;
        assert!(reply.starts_with("❌"));
        assert!(reply.contains("limit"));

        let reply = ReminderCommand::new(RemindAction::Add, "42", "100")
            .execute(&manager)
            .await;
        assert!(reply.contains("required"));

        assert!(manager.list_by_owner("42").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_errors() {
        let manager = manager();
        add("42", "@me", "every 1h", "water").execute(&manager).await;

        let reply = delete("7", 1).execute(&manager).await;
        assert_eq!(reply, "❌ You can only delete your own reminders.");

        let reply = delete("42", 99).execute(&manager).await;
        assert_eq!(reply, "❌ Could not find reminder #99.");

        let reply = ReminderCommand::new(RemindAction::Delete, "42", "100")
            .execute(&manager)
            .await;
        assert!(reply.contains("/remind list"));

        assert_eq!(manager.list_by_owner("42").await.unwrap().len(), 1);
    }
}
