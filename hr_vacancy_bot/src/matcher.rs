use std::collections::{BTreeSet, HashSet};

use teloxide::types::UserId;

use crate::tags::Tag;

/// A user and the tags they asked to be notified about.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub user: UserId,
    pub tags: Vec<Tag>,
}

/// Pick every subscriber who shares at least one tag with the vacancy.
///
/// Each user shows up once even if they appear in several [`Subscription`]s,
/// and the result is sorted by user ID so broadcasts go out in a stable order.
pub fn match_subscribers<'a>(
    vacancy_tags: &[Tag],
    subscriptions: impl IntoIterator<Item = &'a Subscription>,
) -> Vec<UserId> {
    if vacancy_tags.is_empty() {
        return Vec::new();
    }
    let wanted: HashSet<&Tag> = vacancy_tags.iter().collect();

    subscriptions
        .into_iter()
        .filter(|sub| sub.tags.iter().any(|tag| wanted.contains(tag)))
        .map(|sub| sub.user.0)
        .collect::<BTreeSet<u64>>()
        .into_iter()
        .map(UserId)
        .collect()
}

/// Tags a user and a vacancy have in common, in vacancy order.
/// Used to tell the user why they got the message.
pub fn common_tags<'a>(vacancy_tags: &'a [Tag], user_tags: &[Tag]) -> Vec<&'a Tag> {
    vacancy_tags
        .iter()
        .filter(|tag| user_tags.contains(*tag))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(user: u64, tags: &[&str]) -> Subscription {
        Subscription {
            user: UserId(user),
            tags: tags.iter().filter_map(|x| Tag::new(x)).collect(),
        }
    }

    fn tags(list: &[&str]) -> Vec<Tag> {
        list.iter().filter_map(|x| Tag::new(x)).collect()
    }

    #[test]
    fn intersection_picks_users() {
        let subs = [
            sub(30, &["курьер"]),
            sub(10, &["офис", "продажи"]),
            sub(20, &["python"]),
            sub(40, &[]),
        ];
        let matched = match_subscribers(&tags(&["продажи", "курьер"]), &subs);
        assert_eq!(matched, vec![UserId(10), UserId(30)]);
    }

    #[test]
    fn users_are_not_duplicated() {
        let subs = [sub(5, &["офис"]), sub(5, &["удаленка"]), sub(6, &["офис"])];
        let matched = match_subscribers(&tags(&["офис", "удаленка"]), &subs);
        assert_eq!(matched, vec![UserId(5), UserId(6)]);
    }

    #[test]
    fn no_tags_no_matches() {
        let subs = [sub(1, &["офис"])];
        assert!(match_subscribers(&[], &subs).is_empty());
        assert!(match_subscribers(&tags(&["python"]), &subs).is_empty());
    }

    #[test]
    fn common_tags_keep_vacancy_order() {
        let vacancy = tags(&["python", "удаленка", "senior"]);
        let user = tags(&["senior", "python"]);
        let common: Vec<&str> = common_tags(&vacancy, &user)
            .into_iter()
            .map(Tag::as_str)
            .collect();
        assert_eq!(common, vec!["python", "senior"]);
    }
}
