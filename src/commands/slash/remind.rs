//! Reminder slash command: /remind add | list | delete

use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;

use crate::features::reminders::MAX_MESSAGE_CHARS;

/// Creates reminder commands
pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![create_remind_command()]
}

fn create_remind_command() -> CreateApplicationCommand {
    let mut cmd = CreateApplicationCommand::default();

    cmd.name("remind")
        .description("Schedule, list or cancel reminders")
        .create_option(|add| {
            add.name("add")
                .description("Create a one-off or repeating reminder")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|o| {
                    o.name("who")
                        .description("Who to remind: @me, mentions or user IDs, comma-separated")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
                .create_sub_option(|o| {
                    o.name("when")
                        .description("When: in 10m, every 1h, tomorrow at 9am, every monday at 9:30am")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
                .create_sub_option(|o| {
                    o.name("message")
                        .description("What to remind about")
                        .kind(CommandOptionType::String)
                        .required(true)
                        .max_length(MAX_MESSAGE_CHARS as u16)
                })
        })
        .create_option(|list| {
            list.name("list")
                .description("Show your pending reminders")
                .kind(CommandOptionType::SubCommand)
        })
        .create_option(|delete| {
            delete
                .name("delete")
                .description("Cancel one of your reminders")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|o| {
                    o.name("id")
                        .description("Reminder ID from /remind list")
                        .kind(CommandOptionType::Integer)
                        .required(true)
                        .min_int_value(1)
                })
        });

    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remind_command_has_three_subcommands() {
        let commands = create_commands();
        assert_eq!(commands.len(), 1);

        let cmd = &commands[0];
        assert_eq!(cmd.0.get("name").unwrap().as_str().unwrap(), "remind");

        let options = cmd.0.get("options").unwrap().as_array().unwrap();
        let names: Vec<&str> = options
            .iter()
            .map(|o| o.get("name").unwrap().as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["add", "list", "delete"]);

        for option in options {
            assert_eq!(option.get("type").unwrap().as_u64().unwrap(), 1);
        }

        let add_params = options[0].get("options").unwrap().as_array().unwrap();
        assert_eq!(add_params.len(), 3);
        for param in add_params {
            // Discord caps option descriptions at 100 characters
            let description = param.get("description").unwrap().as_str().unwrap();
            assert!(description.chars().count() <= 100);
            assert!(param.get("required").unwrap().as_bool().unwrap());
        }

        let message = &add_params[2];
        assert_eq!(message.get("max_length").unwrap().as_u64().unwrap(), 1800);

        let delete_params = options[2].get("options").unwrap().as_array().unwrap();
        assert_eq!(delete_params[0].get("name").unwrap().as_str().unwrap(), "id");
        assert_eq!(delete_params[0].get("type").unwrap().as_u64().unwrap(), 4);
    }
}
