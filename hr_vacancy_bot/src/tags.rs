use std::{fmt::Display, sync::LazyLock};

use regex::Regex;

/// A single normalized tag, like `python` or `удаленка`.
///
/// Tags are lowercase, use `е` in place of `ё`, and have `_` where the
/// source had spaces or dashes, so `#Удалёнка`, `удаленка` and `УДАЛЁНКА`
/// are all the same tag.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    /// Normalize a string into a tag. Returns [`None`] if nothing usable is left.
    pub fn new(raw: &str) -> Option<Self> {
        let mut tag = String::with_capacity(raw.len());
        for c in raw.trim().trim_start_matches('#').chars() {
            match c {
                'ё' | 'Ё' => tag.push('е'),
                c if c.is_alphanumeric() => tag.extend(c.to_lowercase()),
                '_' | '-' => tag.push('_'),
                c if c.is_whitespace() => tag.push('_'),
                _ => (),
            }
        }
        let tag = tag.trim_matches('_');
        if tag.is_empty() {
            None
        } else {
            Some(Self(tag.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        self.as_ref()
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Join tags into the comma separated form they are stored in.
pub fn join_tags(tags: &[Tag]) -> String {
    tags.iter().map(Tag::as_str).collect::<Vec<_>>().join(",")
}

/// Inverse of [`join_tags`]. Garbage between commas is normalized or dropped.
pub fn split_tags(stored: &str) -> Vec<Tag> {
    let mut out = Vec::new();
    for tag in stored.split(',').filter_map(Tag::new) {
        push_unique(&mut out, tag);
    }
    out
}

/// Render tags as `#hashtags` for humans.
pub fn hashtags_line(tags: &[Tag]) -> String {
    tags.iter()
        .map(|t| format!("#{t}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn push_unique(tags: &mut Vec<Tag>, tag: Tag) {
    if !tags.contains(&tag) {
        tags.push(tag);
    }
}

static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([\w-]+)").expect("Regex will always be valid"));

/// Extract `#hashtags` from text, like `#офис #без_опыта #80_120`.
/// Order of first appearance is kept, duplicates are dropped.
pub fn parse_hashtags(text: &str) -> Vec<Tag> {
    let mut tags = Vec::new();
    for capture in HASHTAG.captures_iter(text) {
        if let Some(tag) = Tag::new(&capture[1]) {
            push_unique(&mut tags, tag);
        }
    }
    tags
}

/// Profession name and the keywords that point at it. First match wins.
static PROFESSIONS: &[(&str, &[&str])] = &[
    ("python", &["python", "django", "flask", "fastapi"]),
    ("designer", &["design", "figma", "ux", "ui", "дизайн"]),
    ("manager", &["manager", "pm", "product", "project", "менеджер"]),
    ("frontend", &["react", "vue", "javascript", "frontend"]),
    ("backend", &["backend", "api", "sql"]),
];

static LEVELS: &[(&str, &[&str])] = &[
    ("junior", &["junior", "джуниор", "стажер"]),
    ("middle", &["middle", "мидл"]),
    ("senior", &["senior", "сеньор", "lead"]),
];

/// Non-IT job kinds the channel posts a lot of. Every match counts.
static TOPICS: &[(&str, &[&str])] = &[
    ("курьер", &["курьер"]),
    ("доставка", &["доставк"]),
    ("продажи", &["продаж"]),
    ("callcenter", &["колл-центр", "call-центр", "callcenter", "call center", "оператор"]),
    ("подработка", &["подработ"]),
    ("магазин", &["магазин"]),
    ("без_опыта", &["без опыта"]),
];

static SKILLS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(python|django|fastapi|sql|react|figma|docker|linux)\b")
        .expect("Regex will always be valid")
});

static SALARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2,3}\s?000)").expect("Regex will always be valid"));

/// Where the job is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkFormat {
    Remote,
    Office,
}

impl WorkFormat {
    pub fn tag(self) -> &'static str {
        match self {
            WorkFormat::Remote => "удаленка",
            WorkFormat::Office => "офис",
        }
    }
}

/// Salary brackets as offered in the selection form.
pub fn salary_bracket(thousands: u32) -> &'static str {
    match thousands {
        0..=50 => "до_50",
        51..=80 => "50_80",
        81..=119 => "80_120",
        _ => "120_plus",
    }
}

/// What a vacancy text looks like to the keyword classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VacancyProfile {
    pub profession: Option<&'static str>,
    pub level: Option<&'static str>,
    pub work_format: Option<WorkFormat>,
    pub skills: Vec<String>,
    /// Salary figure as written, like `80 000`.
    pub salary: Option<String>,
    pub topics: Vec<&'static str>,
}

impl VacancyProfile {
    /// Salary in thousands, if one was found.
    pub fn salary_thousands(&self) -> Option<u32> {
        let digits: String = self
            .salary
            .as_deref()?
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        digits.parse::<u32>().ok().map(|x| x / 1000)
    }

    /// Everything the classifier found, as tags.
    pub fn tags(&self) -> Vec<Tag> {
        let mut tags = Vec::new();
        let found = self
            .profession
            .into_iter()
            .chain(self.level)
            .chain(self.work_format.map(WorkFormat::tag))
            .chain(self.skills.iter().map(String::as_str))
            .chain(self.topics.iter().copied())
            .chain(self.salary_thousands().map(salary_bracket));
        for tag in found.filter_map(Tag::new) {
            push_unique(&mut tags, tag);
        }
        tags
    }
}

/// Keywords of three letters or less ("ui", "pm", "api") are matched as
/// whole words, longer ones as substrings, so "backend" catches "backend-разработчик"
/// and "ui" doesn't catch "build".
fn contains_keyword(text: &str, keyword: &str) -> bool {
    if keyword.chars().count() > 3 {
        return text.contains(keyword);
    }
    text.split(|c: char| !c.is_alphanumeric())
        .any(|word| word == keyword)
}

fn first_match(text: &str, table: &[(&'static str, &[&str])]) -> Option<&'static str> {
    table
        .iter()
        .find(|(_, words)| words.iter().any(|w| contains_keyword(text, w)))
        .map(|(name, _)| *name)
}

/// Dictionary lookup over free vacancy text.
pub fn classify(text: &str) -> VacancyProfile {
    let text = text.to_lowercase().replace('ё', "е");

    let work_format = if text.contains("удал") || text.contains("remote") {
        Some(WorkFormat::Remote)
    } else if text.contains("офис") {
        Some(WorkFormat::Office)
    } else {
        None
    };

    let mut skills: Vec<String> = Vec::new();
    for capture in SKILLS.captures_iter(&text) {
        let skill = &capture[1];
        if !skills.iter().any(|s| s == skill) {
            skills.push(skill.to_string());
        }
    }

    let topics = TOPICS
        .iter()
        .filter(|(_, words)| words.iter().any(|w| contains_keyword(&text, w)))
        .map(|(name, _)| *name)
        .collect();

    VacancyProfile {
        profession: first_match(&text, PROFESSIONS),
        level: first_match(&text, LEVELS),
        work_format,
        skills,
        salary: SALARY.captures(&text).map(|c| c[1].to_string()),
        topics,
    }
}

/// All tags of a vacancy: explicit hashtags first, then whatever the
/// classifier found.
pub fn extract_vacancy_tags(text: &str) -> Vec<Tag> {
    let mut tags = parse_hashtags(text);
    for tag in classify(text).tags() {
        push_unique(&mut tags, tag);
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<Tag> {
        list.iter().filter_map(|x| Tag::new(x)).collect()
    }

    #[test]
    fn tag_normalization() {
        assert_eq!(Tag::new("#Удалёнка").unwrap().as_str(), "удаленка");
        assert_eq!(Tag::new("без опыта").unwrap().as_str(), "без_опыта");
        assert_eq!(Tag::new("CallCenter!").unwrap().as_str(), "callcenter");
        assert_eq!(Tag::new("  ##  "), None);
        assert_eq!(Tag::new("---"), None);
    }

    #[test]
    fn hashtags() {
        assert_eq!(
            parse_hashtags("Ищем! #офис #без_опыта #80_120 и снова #ОФИС"),
            tags(&["офис", "без_опыта", "80_120"])
        );
        assert!(parse_hashtags("").is_empty());
        assert!(parse_hashtags("no tags # here").is_empty());
    }

    #[test]
    fn stored_form_round_trips() {
        let list = tags(&["курьер", "удаленка", "python"]);
        assert_eq!(join_tags(&list), "курьер,удаленка,python");
        assert_eq!(split_tags("курьер,удаленка,,python,Курьер"), list);
        assert_eq!(hashtags_line(&list), "#курьер #удаленка #python");
    }

    #[test]
    fn classifier_picks_first_profession_and_level() {
        let profile = classify("Senior Python/Django developer, удалённо, 250 000 руб, Docker");
        assert_eq!(profile.profession, Some("python"));
        assert_eq!(profile.level, Some("senior"));
        assert_eq!(profile.work_format, Some(WorkFormat::Remote));
        assert_eq!(profile.skills, vec!["python", "django", "docker"]);
        assert_eq!(profile.salary.as_deref(), Some("250 000"));
        assert_eq!(profile.salary_thousands(), Some(250));
    }

    #[test]
    fn classifier_short_keywords_are_whole_words() {
        assert_eq!(classify("Build engineer").profession, None);
        assert_eq!(classify("UI/UX в офис").profession, Some("designer"));
        assert_eq!(
            classify("UI/UX в офис").work_format,
            Some(WorkFormat::Office)
        );
    }

    #[test]
    fn classifier_unknowns() {
        let profile = classify("Просто текст");
        assert_eq!(profile, VacancyProfile::default());
        assert!(profile.tags().is_empty());
    }

    #[test]
    fn salary_brackets() {
        assert_eq!(salary_bracket(45), "до_50");
        assert_eq!(salary_bracket(50), "до_50");
        assert_eq!(salary_bracket(70), "50_80");
        assert_eq!(salary_bracket(100), "80_120");
        assert_eq!(salary_bracket(120), "120_plus");
    }

    #[test]
    fn vacancy_tags_merge_hashtags_and_classifier() {
        let text = "Курьер на доставку еды, подработка, без опыта, 60 000 #СПб #курьер";
        assert_eq!(
            extract_vacancy_tags(text),
            tags(&["спб", "курьер", "доставка", "подработка", "без_опыта", "50_80"])
        );
    }
}
