//! Tags users can pick from, grouped the way the menus show them.

/// A button in a tag menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagChoice {
    pub label: &'static str,
    pub tag: &'static str,
}

const fn choice(label: &'static str, tag: &'static str) -> TagChoice {
    TagChoice { label, tag }
}

#[derive(Debug)]
pub struct Category {
    pub key: &'static str,
    pub title: &'static str,
    pub choices: &'static [TagChoice],
}

pub static CATEGORIES: &[Category] = &[
    Category {
        key: "delivery",
        title: "🚚 Доставка и курьеры",
        choices: &[
            choice("🚴 Курьер", "курьер"),
            choice("📦 Доставка", "доставка"),
            choice("🕒 Подработка", "подработка"),
        ],
    },
    Category {
        key: "remote",
        title: "🏠 Удалёнка",
        choices: &[
            choice("💻 Удалёнка", "удаленка"),
            choice("📞 Колл-центр", "callcenter"),
        ],
    },
    Category {
        key: "office",
        title: "💼 Офис и продажи",
        choices: &[
            choice("🏢 Офис", "офис"),
            choice("📈 Продажи", "продажи"),
            choice("🏬 Магазин", "магазин"),
        ],
    },
    Category {
        key: "it",
        title: "🧑‍💻 IT",
        choices: &[
            choice("🐍 Python", "python"),
            choice("🖥 Frontend", "frontend"),
            choice("⚙️ Backend", "backend"),
            choice("🎨 Дизайн", "designer"),
            choice("📋 Менеджмент", "manager"),
        ],
    },
    Category {
        key: "level",
        title: "📊 Уровень",
        choices: &[
            choice("👶 Без опыта", "без_опыта"),
            choice("🌱 Junior", "junior"),
            choice("🌿 Middle", "middle"),
            choice("🌳 Senior", "senior"),
        ],
    },
];

pub fn category(key: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.key == key)
}

/// Category a tag is offered in, if it is offered at all.
pub fn category_of(tag: &str) -> Option<&'static Category> {
    CATEGORIES
        .iter()
        .find(|c| c.choices.iter().any(|choice| choice.tag == tag))
}

/// An answer in the quick selection form. `tag` of [`None`] means "any".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormOption {
    pub key: &'static str,
    pub label: &'static str,
    pub tag: Option<&'static str>,
}

const fn option(key: &'static str, label: &'static str, tag: Option<&'static str>) -> FormOption {
    FormOption { key, label, tag }
}

#[derive(Debug)]
pub struct FormQuestion {
    pub question: &'static str,
    pub options: &'static [FormOption],
}

/// The quick form: work format, experience and salary, in that order.
pub static FORM: &[FormQuestion] = &[
    FormQuestion {
        question: "1️⃣ Какой формат работы вам подходит?",
        options: &[
            option("office", "🏢 Офис", Some("офис")),
            option("shop", "🏬 Магазин", Some("магазин")),
            option("remote", "🏠 Удалёнка", Some("удаленка")),
            option("part", "⏱ Подработка", Some("подработка")),
            option("any", "🔥 Всё подходит", None),
        ],
    },
    FormQuestion {
        question: "2️⃣ Есть ли у вас опыт работы?",
        options: &[
            option("no", "👶 Без опыта", Some("без_опыта")),
            option("yes", "💼 Есть опыт", Some("с_опытом")),
            option("any", "🤷 Неважно", None),
        ],
    },
    FormQuestion {
        question: "3️⃣ Какая зарплата вас интересует?",
        options: &[
            option("50", "до 50 000 ₽", Some("до_50")),
            option("80", "50 000 – 80 000 ₽", Some("50_80")),
            option("120", "80 000 – 120 000 ₽", Some("80_120")),
            option("max", "от 120 000 ₽", Some("120_plus")),
        ],
    },
];

/// Look up an answer of the form by question index and option key.
pub fn form_option(step: usize, key: &str) -> Option<&'static FormOption> {
    FORM.get(step)?.options.iter().find(|o| o.key == key)
}

#[cfg(test)]
mod tests {
    use crate::tags::{salary_bracket, Tag};

    use super::*;

    #[test]
    fn catalog_tags_are_normalized() {
        let catalog = CATEGORIES
            .iter()
            .flat_map(|c| c.choices.iter().map(|choice| choice.tag));
        let form = FORM
            .iter()
            .flat_map(|q| q.options.iter().filter_map(|o| o.tag));
        for tag in catalog.chain(form) {
            assert_eq!(Tag::new(tag).as_ref().map(Tag::as_str), Some(tag));
        }
    }

    #[test]
    fn salary_options_match_brackets() {
        let tags: Vec<&str> = FORM[2].options.iter().filter_map(|o| o.tag).collect();
        assert_eq!(
            tags,
            vec![
                salary_bracket(30),
                salary_bracket(60),
                salary_bracket(100),
                salary_bracket(200)
            ]
        );
    }

    #[test]
    fn lookups() {
        assert_eq!(category_of("курьер").map(|c| c.key), Some("delivery"));
        assert!(category_of("пилот").is_none());
        assert_eq!(category("it").map(|c| c.choices.len()), Some(5));
        assert_eq!(form_option(1, "no").and_then(|o| o.tag), Some("без_опыта"));
        assert_eq!(form_option(1, "max"), None);
        assert_eq!(form_option(7, "no"), None);
    }
}
