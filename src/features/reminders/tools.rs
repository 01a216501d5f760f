//! # LLM Reminder Tools
//!
//! Exposes the reminder lifecycle as callable functions for a chat model:
//! `add_reminder`, `list_reminders` and `delete_reminder`. Each call yields
//! either a structured success payload or plain failure text, never both.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use log::{debug, info};
use openai::chat::{ChatCompletionFunctionDefinition, ChatCompletionMessage, ChatCompletionMessageRole};
use serde::Deserialize;
use serde_json::{json, Value};

use super::format::{describe_error, format_created, format_list};
use super::manager::{CreateReminder, ReminderManager};

pub const ADD_REMINDER: &str = "add_reminder";
pub const LIST_REMINDERS: &str = "list_reminders";
pub const DELETE_REMINDER: &str = "delete_reminder";

/// Who is calling the tool and where
#[derive(Debug, Clone, Default)]
pub struct ToolCaller {
    pub user_id: String,
    pub channel_id: String,
    pub context_id: Option<String>,
}

/// Result of a tool invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// `{"status": "success", "message": ...}`
    Success(Value),
    Failure(String),
}

impl ToolOutcome {
    fn success(message: impl Into<String>) -> Self {
        ToolOutcome::Success(json!({
            "status": "success",
            "message": message.into(),
        }))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success(_))
    }

    /// Text relayed back to the model
    pub fn into_content(self) -> String {
        match self {
            ToolOutcome::Success(value) => value.to_string(),
            ToolOutcome::Failure(text) => text,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AddReminderArgs {
    who: String,
    when: String,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdArg {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct DeleteReminderArgs {
    id: IdArg,
}

/// Function-calling bridge over [`ReminderManager`]
#[derive(Clone)]
pub struct ReminderTools {
    manager: ReminderManager,
}

impl ReminderTools {
    pub fn new(manager: ReminderManager) -> Self {
        Self { manager }
    }

    /// Function definitions to advertise to the model
    pub fn definitions() -> Vec<ChatCompletionFunctionDefinition> {
        vec![
            ChatCompletionFunctionDefinition {
                name: ADD_REMINDER.to_string(),
                description: Some(
                    "Schedule a reminder message for one or more users, once or repeating."
                        .to_string(),
                ),
                parameters: Some(json!({
                    "type": "object",
                    "properties": {
                        "who": {
                            "type": "string",
                            "description": "Comma-separated recipients: @me, <@user_id> mentions or numeric user IDs"
                        },
                        "when": {
                            "type": "string",
                            "description": "When to send, e.g. 'in 10m', 'every 1h', 'tomorrow at 8pm', 'next monday at 9:30am', 'every day at 8am'"
                        },
                        "message": {
                            "type": "string",
                            "description": "The reminder text"
                        }
                    },
                    "required": ["who", "when", "message"]
                })),
            },
            ChatCompletionFunctionDefinition {
                name: LIST_REMINDERS.to_string(),
                description: Some("List the caller's pending reminders.".to_string()),
                parameters: Some(json!({
                    "type": "object",
                    "properties": {}
                })),
            },
            ChatCompletionFunctionDefinition {
                name: DELETE_REMINDER.to_string(),
                description: Some("Delete one of the caller's reminders by ID.".to_string()),
                parameters: Some(json!({
                    "type": "object",
                    "properties": {
                        "id": {
                            "type": "integer",
                            "description": "Reminder ID as shown by list_reminders"
                        }
                    },
                    "required": ["id"]
                })),
            },
        ]
    }

    /// Invoke tool `name` with JSON `arguments`
    pub async fn call(&self, name: &str, arguments: &str, caller: &ToolCaller) -> ToolOutcome {
        debug!("Tool call {name} from user {} with {arguments}", caller.user_id);

        match name {
            ADD_REMINDER => self.add_reminder(arguments, caller).await,
            LIST_REMINDERS => self.list_reminders(caller).await,
            DELETE_REMINDER => self.delete_reminder(arguments, caller).await,
            other => ToolOutcome::Failure(format!("Unknown tool `{other}`.")),
        }
    }

    async fn add_reminder(&self, arguments: &str, caller: &ToolCaller) -> ToolOutcome {
        let args: AddReminderArgs = match serde_json::from_str(arguments) {
            Ok(args) => args,
            Err(e) => return ToolOutcome::Failure(format!("Invalid arguments for {ADD_REMINDER}: {e}")),
        };

        let request = CreateReminder {
            owner_id: caller.user_id.clone(),
            who: args.who,
            when: args.when,
            message: args.message,
            channel_id: caller.channel_id.clone(),
            context_id: caller.context_id.clone(),
        };
        match self.manager.create(request).await {
            Ok(reminder) => {
                info!("🤖 Reminder #{} created via tool call", reminder.id);
                ToolOutcome::success(format_created(&reminder, self.manager.parser().timezone()))
            }
            Err(e) => ToolOutcome::Failure(describe_error(&e)),
        }
    }

    async fn list_reminders(&self, caller: &ToolCaller) -> ToolOutcome {
        match self.manager.list_by_owner(&caller.user_id).await {
            Ok(reminders) => {
                ToolOutcome::success(format_list(&reminders, self.manager.parser().timezone()))
            }
            Err(e) => ToolOutcome::Failure(describe_error(&e)),
        }
    }

    async fn delete_reminder(&self, arguments: &str, caller: &ToolCaller) -> ToolOutcome {
        let id = match serde_json::from_str::<DeleteReminderArgs>(arguments).map(|a| a.id) {
            Ok(IdArg::Number(id)) => id,
            Ok(IdArg::Text(text)) => match text.trim().trim_start_matches('#').parse() {
                Ok(id) => id,
                Err(_) => return ToolOutcome::Failure(format!("`{text}` is not a reminder ID.")),
            },
            Err(e) => {
                return ToolOutcome::Failure(format!("Invalid arguments for {DELETE_REMINDER}: {e}"))
            }
        };

        match self.manager.delete_by_id(id, &caller.user_id).await {
            Ok(_) => ToolOutcome::success(format!("✅ Cancelled reminder #{id}.")),
            Err(e) => ToolOutcome::Failure(describe_error(&e)),
        }
    }
}

/// Wrap a tool result as the function message sent back to the model
pub fn function_result_message(name: &str, outcome: ToolOutcome) -> ChatCompletionMessage {
    ChatCompletionMessage {
        role: ChatCompletionMessageRole::Function,
        content: Some(outcome.into_content()),
        name: Some(name.to_string()),
        function_call: None,
        tool_call_id: None,
        tool_calls: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::store::MemoryStore;
    use crate::features::reminders::time_parser::TimeParser;
    use std::sync::Arc;
    use std::time::Duration;

    fn tools() -> ReminderTools {
        ReminderTools::new(ReminderManager::new(
            Arc::new(MemoryStore::new()),
            TimeParser::new(chrono_tz::America::New_York),
            Duration::from_secs(5),
        ))
    }

    fn caller(user: &str) -> ToolCaller {
        ToolCaller {
            user_id: user.to_string(),
            channel_id: "100".to_string(),
            context_id: Some("900".to_string()),
        }
    }

    fn payload_message(outcome: &ToolOutcome) -> String {
        match outcome {
            ToolOutcome::Success(value) => {
                assert_eq!(value["status"], "success");
                value["message"].as_str().unwrap().to_string()
            }
            ToolOutcome::Failure(text) => panic!("expected success, got {text}"),
        }
    }

    #[test]
    fn test_definitions_cover_three_tools() {
        let names: Vec<String> = ReminderTools::definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec![ADD_REMINDER, LIST_REMINDERS, DELETE_REMINDER]);
    }

    #[tokio::test]
    async fn test_add_list_delete_flow() {
        let tools = tools();
        let me = caller("42");

        let added = tools
            .call(
                ADD_REMINDER,
                r#"{"who":"@me","when":"in 10m","message":"standup"}"#,
                &me,
            )
            .await;
        assert!(payload_message(&added).contains("#1"));

        let listed = tools.call(LIST_REMINDERS, "{}", &me).await;
        assert!(payload_message(&listed).contains("standup"));

        let deleted = tools.call(DELETE_REMINDER, r##"{"id":"#1"}"##, &me).await;
        assert!(payload_message(&deleted).contains("#1"));

        let listed = tools.call(LIST_REMINDERS, "{}", &me).await;
        assert!(payload_message(&listed).contains("don't have any"));
    }

    #[tokio::test]
    async fn test_failures_are_plain_text() {
        let tools = tools();
        let me = caller("42");

        let outcome = tools
            .call(
                ADD_REMINDER,
                r#"{"who":"@me","when":"someday","message":"x"}"#,
                &me,
            )
            .await;
        let ToolOutcome::Failure(text) = outcome else {
            panic!("expected failure");
        };
        assert!(text.contains("Supported formats"));

        let outcome = tools.call(ADD_REMINDER, "not json", &me).await;
        assert!(!outcome.is_success());

        let outcome = tools.call("order_pizza", "{}", &me).await;
        assert_eq!(
            outcome,
            ToolOutcome::Failure("Unknown tool `order_pizza`.".to_string())
        );
    }

    #[tokio::test]
    async fn test_delete_someone_elses_reminder() {
        let tools = tools();
        tools
            .call(
                ADD_REMINDER,
                r#"{"who":"@me","when":"every 1h","message":"water"}"#,
                &caller("42"),
            )
            .await;

        let outcome = tools
            .call(DELETE_REMINDER, r#"{"id":1}"#, &caller("7"))
            .await;
        assert_eq!(
            outcome.into_content(),
            "❌ You can only delete your own reminders."
        );

        let outcome = tools
            .call(DELETE_REMINDER, r#"{"id":99}"#, &caller("42"))
            .await;
        assert_eq!(outcome.into_content(), "❌ Could not find reminder #99.");
    }

    #[test]
    fn test_function_result_message() {
        let msg = function_result_message(LIST_REMINDERS, ToolOutcome::Failure("nope".into()));
        assert_eq!(msg.content.as_deref(), Some("nope"));
        assert_eq!(msg.name.as_deref(), Some(LIST_REMINDERS));
    }
}
