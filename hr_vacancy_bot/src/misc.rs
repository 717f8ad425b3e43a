use chrono::{Local, NaiveDate};
use html_escape::encode_text;
use teloxide::types::User;

/// Today's date in the bot's local time zone. Daily limits and
/// "joined today" stats roll over at local midnight.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Tries to print the user in the prettiest way possible, with either `@username` or an
/// HTML link with their full name. Optionally includes the user ID.
#[must_use]
pub fn user_name_prettyprint(user: &User, with_id: bool) -> String {
    let mut name = if let Some(username) = &user.username {
        format!("@{username}")
    } else {
        format!(
            "<a href=\"tg://user?id={}\">{}</a>",
            user.id,
            encode_text(&user.full_name())
        )
    };

    if with_id {
        name.push_str(&format!(" (userid <code>{}</code>)", user.id));
    }

    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: Option<&str>) -> User {
        serde_json::from_value(serde_json::json!({
            "id": 42,
            "is_bot": false,
            "first_name": "Анна <3",
            "last_name": "Петрова",
            "username": username,
        }))
        .unwrap()
    }

    #[test]
    fn prettyprint() {
        assert_eq!(user_name_prettyprint(&user(Some("anna")), false), "@anna");
        assert_eq!(
            user_name_prettyprint(&user(None), true),
            "<a href=\"tg://user?id=42\">Анна &lt;3 Петрова</a> (userid <code>42</code>)"
        );
    }
}
