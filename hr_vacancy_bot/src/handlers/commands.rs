use teloxide::types::BotCommand;

pub struct Command {
    pub callname: &'static str,
    pub description: &'static str,
    /// Admin commands are left out of the command menu and user help.
    pub admin_only: bool,
}

const fn command(callname: &'static str, description: &'static str, admin_only: bool) -> Command {
    Command {
        callname,
        description,
        admin_only,
    }
}

pub const COMMANDS: &[Command] = &[
    command("/start", "Главное меню", false),
    command("/help", "Что умеет бот", false),
    command("/vacancies", "Список вакансий", false),
    command("/tags", "Мои теги подписки", false),
    command("/interview", "Пройти собеседование", false),
    command("/cancel", "Отменить текущее действие", false),
    command("/admin", "Админ-панель", true),
    command("/stats", "Статистика пользователей", true),
    command("/post &lt;текст&gt;", "Опубликовать текст в канал и разослать подписчикам", true),
];

pub fn generate_help(is_admin: bool) -> String {
    let mut response = String::from("<b>Команды:</b>\n\n");
    for command in COMMANDS {
        if command.admin_only && !is_admin {
            continue;
        }
        response.push_str(&format!("{} - {}\n", command.callname, command.description));
    }
    response.push_str(concat!(
        "\nПодпишитесь на теги, и бот пришлёт новые вакансии, ",
        "которые им подходят. Не больше нескольких сообщений в день."
    ));
    response
}

pub fn generate_bot_commands() -> Vec<BotCommand> {
    COMMANDS
        .iter()
        .filter(|command| !command.admin_only)
        .filter_map(|command| {
            let callname = command.callname.split_ascii_whitespace().next()?;
            // Cut off the /
            Some(BotCommand::new(&callname[1..], command.description))
        })
        .collect()
}

/// Split message text into a lowercase command and its parameters.
///
/// `/post@HrBot text` is taken as `/post` with `text` if `bot_username`
/// is `HrBot`. Commands meant for other bots, and anything that isn't a
/// command, give [`None`].
pub fn parse_command<'a>(text: &'a str, bot_username: &str) -> Option<(String, &'a str)> {
    if !text.starts_with('/') {
        return None;
    }
    let command = text.split_whitespace().next()?;
    if !command.is_ascii() {
        // Telegram commands must be ASCII.
        return None;
    }
    let params = text[command.len()..].trim();

    let callname = match command.split_once('@') {
        Some((callname, username)) => {
            if !username.eq_ignore_ascii_case(bot_username) {
                return None;
            }
            callname
        }
        None => command,
    };

    Some((callname.to_ascii_lowercase(), params))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_parsing() {
        assert_eq!(parse_command("/start", "HrBot"), Some(("/start".to_string(), "")));
        assert_eq!(
            parse_command("/POST@hrbot  Ищем курьеров #курьер ", "HrBot"),
            Some(("/post".to_string(), "Ищем курьеров #курьер"))
        );
        assert_eq!(parse_command("/start@OtherBot", "HrBot"), None);
        assert_eq!(parse_command("привет", "HrBot"), None);
        assert_eq!(parse_command("/старт", "HrBot"), None);
    }

    #[test]
    fn admin_commands_are_hidden() {
        let commands = generate_bot_commands();
        assert!(commands.iter().any(|c| c.command == "start"));
        assert!(!commands.iter().any(|c| c.command == "post"));

        assert!(!generate_help(false).contains("/post"));
        assert!(generate_help(true).contains("/post &lt;текст&gt;"));
    }
}
