mod types;
pub use types::*;

use std::{str::FromStr, sync::Arc};

use chrono::{DateTime, Duration, NaiveDate, Utc};
pub use sqlx::Error;
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Executor, Row, Sqlite,
};
use teloxide::types::UserId;

use crate::{
    matcher::Subscription,
    tags::{join_tags, split_tags, Tag},
};

type Pool = sqlx::Pool<Sqlite>;

const NOTIFY_NEW_USERS: &str = "notify_new_users";

pub struct Database {
    pool: Pool,
}

#[allow(clippy::cast_possible_wrap)]
fn user_key(user: UserId) -> i64 {
    user.0 as i64
}

#[allow(clippy::cast_sign_loss)]
fn user_from_key(key: i64) -> UserId {
    UserId(key as u64)
}

impl Database {
    /// Open (and create, if needed) the database at `url`,
    /// like `sqlite:hr_bot.sqlite`.
    pub async fn new(url: &str) -> Result<Arc<Database>, Error> {
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?;
        }
        let pool = SqlitePoolOptions::new()
            .max_connections(32)
            .connect_with(
                SqliteConnectOptions::from_str(url)?
                    .pragma("cache_size", "-32768")
                    .busy_timeout(std::time::Duration::from_secs(600)),
            )
            .await?;

        Ok(Arc::new(Self::init(pool).await?))
    }

    /// Fresh database that lives as long as this object does.
    /// One connection only, since every in-memory connection is its own database.
    #[cfg(test)]
    pub async fn new_in_memory() -> Result<Database, Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
            .await?;
        Self::init(pool).await
    }

    async fn init(pool: Pool) -> Result<Database, Error> {
        // USERS:
        // user_id (key, i64 because sqlite doesn't support u64)
        // joined (date of first /start, YYYY-MM-DD)
        // active (0 once the user blocked the bot, 1 otherwise)
        pool.execute(sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY NOT NULL,
                joined TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1
            ) STRICT;",
        ))
        .await?;

        // USER_TAGS:
        // user_id, tag (normalized, see `Tag`)
        pool.execute(sqlx::query(
            "CREATE TABLE IF NOT EXISTS user_tags (
                user_id INTEGER NOT NULL,
                tag TEXT NOT NULL,
                UNIQUE(user_id, tag)
            ) STRICT;",
        ))
        .await?;

        // VACANCIES:
        // tags (comma separated, see `join_tags`)
        // image_id (telegram file ID of the photo, may be NULL)
        // created_at (date+time in UTC in RFC3339 format)
        pool.execute(sqlx::query(
            "CREATE TABLE IF NOT EXISTS vacancies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                link TEXT NOT NULL,
                image_id TEXT NULL,
                tags TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            ) STRICT;",
        ))
        .await?;

        // SETTINGS:
        // key, value (integer flags)
        pool.execute(sqlx::query(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY NOT NULL,
                value INTEGER NOT NULL
            ) STRICT;",
        ))
        .await?;

        // DELIVERIES:
        // how many vacancy notifications a user got on a given local day.
        pool.execute(sqlx::query(
            "CREATE TABLE IF NOT EXISTS deliveries (
                user_id INTEGER NOT NULL,
                day TEXT NOT NULL,
                sent INTEGER NOT NULL,
                PRIMARY KEY (user_id, day)
            ) STRICT;",
        ))
        .await?;

        sqlx::query("INSERT OR IGNORE INTO settings(key, value) VALUES (?, 1);")
            .bind(NOTIFY_NEW_USERS)
            .execute(&pool)
            .await?;

        // Fails harmlessly if it already exists.
        let _ = sqlx::query("CREATE INDEX user_tags_tag ON user_tags(tag);")
            .execute(&pool)
            .await;

        Ok(Database { pool })
    }

    /// Remember a user who pressed `/start`. Returns `true` if they are new.
    /// A returning user who had blocked the bot is marked active again.
    pub async fn register_user(&self, user: UserId, today: NaiveDate) -> Result<bool, Error> {
        let inserted = sqlx::query("INSERT OR IGNORE INTO users(user_id, joined) VALUES (?, ?);")
            .bind(user_key(user))
            .bind(today)
            .execute(&self.pool)
            .await?
            .rows_affected()
            > 0;

        if !inserted {
            self.set_user_active(user, true).await?;
        }
        Ok(inserted)
    }

    pub async fn set_user_active(&self, user: UserId, active: bool) -> Result<(), Error> {
        sqlx::query("UPDATE users SET active=? WHERE user_id=?;")
            .bind(active)
            .bind(user_key(user))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Returns `true` if the tag wasn't there before.
    pub async fn add_user_tag(&self, user: UserId, tag: &Tag) -> Result<bool, Error> {
        Ok(
            sqlx::query("INSERT OR IGNORE INTO user_tags(user_id, tag) VALUES (?, ?);")
                .bind(user_key(user))
                .bind(tag.as_str())
                .execute(&self.pool)
                .await?
                .rows_affected()
                > 0,
        )
    }

    /// Returns `true` if the tag was there.
    pub async fn remove_user_tag(&self, user: UserId, tag: &Tag) -> Result<bool, Error> {
        Ok(
            sqlx::query("DELETE FROM user_tags WHERE user_id=? AND tag=?;")
                .bind(user_key(user))
                .bind(tag.as_str())
                .execute(&self.pool)
                .await?
                .rows_affected()
                > 0,
        )
    }

    /// Subscribe if not subscribed, unsubscribe otherwise.
    /// Returns `true` if the user is subscribed to the tag afterwards.
    pub async fn toggle_user_tag(&self, user: UserId, tag: &Tag) -> Result<bool, Error> {
        if self.remove_user_tag(user, tag).await? {
            Ok(false)
        } else {
            self.add_user_tag(user, tag).await
        }
    }

    /// Returns how many tags were removed.
    pub async fn clear_user_tags(&self, user: UserId) -> Result<u64, Error> {
        Ok(sqlx::query("DELETE FROM user_tags WHERE user_id=?;")
            .bind(user_key(user))
            .execute(&self.pool)
            .await?
            .rows_affected())
    }

    /// Tags of this user, in the order they subscribed to them.
    pub async fn user_tags(&self, user: UserId) -> Result<Vec<Tag>, Error> {
        let tags = sqlx::query("SELECT tag FROM user_tags WHERE user_id=? ORDER BY rowid;")
            .bind(user_key(user))
            .map(|row: SqliteRow| row.get::<String, _>("tag"))
            .fetch_all(&self.pool)
            .await?;
        Ok(tags.iter().filter_map(|x| Tag::new(x)).collect())
    }

    /// Everyone with at least one tag, excluding users who blocked the bot.
    pub async fn subscriptions(&self) -> Result<Vec<Subscription>, Error> {
        let rows = sqlx::query(
            "SELECT t.user_id, t.tag FROM user_tags t
            LEFT JOIN users u ON u.user_id = t.user_id
            WHERE COALESCE(u.active, 1) = 1
            ORDER BY t.user_id, t.rowid;",
        )
        .map(|row: SqliteRow| (row.get::<i64, _>(0), row.get::<String, _>(1)))
        .fetch_all(&self.pool)
        .await?;

        let mut subscriptions: Vec<Subscription> = Vec::new();
        for (user_id, tag) in rows {
            let user = user_from_key(user_id);
            let Some(tag) = Tag::new(&tag) else {
                continue;
            };
            match subscriptions.last_mut() {
                Some(last) if last.user == user => last.tags.push(tag),
                _ => subscriptions.push(Subscription {
                    user,
                    tags: vec![tag],
                }),
            }
        }
        Ok(subscriptions)
    }

    /// Store a new vacancy. Returns its ID.
    pub async fn add_vacancy(
        &self,
        draft: &VacancyDraft,
        tags: &[Tag],
        now: DateTime<Utc>,
    ) -> Result<i64, Error> {
        let result = sqlx::query(
            "INSERT INTO vacancies(title, description, link, image_id, tags, created_at)
            VALUES (?, ?, ?, ?, ?, ?);",
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.link)
        .bind(draft.image_id.as_deref())
        .bind(join_tags(tags))
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Overwrite a vacancy. The photo is kept if the draft has none.
    /// Returns `false` if there's no such vacancy.
    pub async fn update_vacancy(
        &self,
        id: i64,
        draft: &VacancyDraft,
        tags: &[Tag],
    ) -> Result<bool, Error> {
        Ok(sqlx::query(
            "UPDATE vacancies
            SET title=?, description=?, link=?, image_id=COALESCE(?, image_id), tags=?
            WHERE id=?;",
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.link)
        .bind(draft.image_id.as_deref())
        .bind(join_tags(tags))
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected()
            > 0)
    }

    /// Returns `false` if there was no such vacancy.
    pub async fn delete_vacancy(&self, id: i64) -> Result<bool, Error> {
        Ok(sqlx::query("DELETE FROM vacancies WHERE id=?;")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected()
            > 0)
    }

    pub async fn vacancy(&self, id: i64) -> Result<Option<Vacancy>, Error> {
        sqlx::query(
            "SELECT id, title, description, link, image_id, tags, created_at
            FROM vacancies WHERE id=?;",
        )
        .bind(id)
        .map(vacancy_from_row)
        .fetch_optional(&self.pool)
        .await
    }

    /// All vacancies, newest first.
    pub async fn list_vacancies(&self) -> Result<Vec<Vacancy>, Error> {
        sqlx::query(
            "SELECT id, title, description, link, image_id, tags, created_at
            FROM vacancies ORDER BY id DESC;",
        )
        .map(vacancy_from_row)
        .fetch_all(&self.pool)
        .await
    }

    /// IDs and titles for the vacancy menu, newest first.
    pub async fn vacancy_titles(&self, limit: u32) -> Result<Vec<(i64, String)>, Error> {
        sqlx::query("SELECT id, title FROM vacancies ORDER BY id DESC LIMIT ?;")
            .bind(limit)
            .map(|row: SqliteRow| (row.get::<i64, _>(0), row.get::<String, _>(1)))
            .fetch_all(&self.pool)
            .await
    }

    pub async fn stats(&self, today: NaiveDate) -> Result<UserStats, Error> {
        let week_ago = today - Duration::days(7);
        let month_ago = today - Duration::days(30);

        let row = sqlx::query(
            "SELECT
                (SELECT COUNT(*) FROM users WHERE joined=?),
                (SELECT COUNT(*) FROM users WHERE joined>=?),
                (SELECT COUNT(*) FROM users WHERE joined>=?),
                (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM users WHERE active=1),
                (SELECT COUNT(DISTINCT user_id) FROM user_tags),
                (SELECT COUNT(*) FROM vacancies);",
        )
        .bind(today)
        .bind(week_ago)
        .bind(month_ago)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserStats {
            joined_today: row.get(0),
            joined_week: row.get(1),
            joined_month: row.get(2),
            total: row.get(3),
            active: row.get(4),
            subscribers: row.get(5),
            vacancies: row.get(6),
        })
    }

    /// Whether the admin gets a message about every new user.
    pub async fn notify_new_users(&self) -> Result<bool, Error> {
        Ok(sqlx::query("SELECT value FROM settings WHERE key=?;")
            .bind(NOTIFY_NEW_USERS)
            .map(|row: SqliteRow| row.get::<i64, _>(0) != 0)
            .fetch_optional(&self.pool)
            .await?
            .unwrap_or(true))
    }

    /// Flip [`Self::notify_new_users`]. Returns the new value.
    pub async fn toggle_notify_new_users(&self) -> Result<bool, Error> {
        sqlx::query(
            "INSERT INTO settings(key, value) VALUES (?, 0)
            ON CONFLICT(key) DO UPDATE SET value = 1 - value
            RETURNING value;",
        )
        .bind(NOTIFY_NEW_USERS)
        .map(|row: SqliteRow| row.get::<i64, _>(0) != 0)
        .fetch_one(&self.pool)
        .await
    }

    /// Every user with their tags, newest first.
    pub async fn users_overview(&self) -> Result<Vec<UserOverview>, Error> {
        sqlx::query(
            "SELECT u.user_id, u.joined, u.active, COALESCE(GROUP_CONCAT(t.tag, ','), '')
            FROM users u LEFT JOIN user_tags t ON t.user_id = u.user_id
            GROUP BY u.user_id
            ORDER BY u.joined DESC, u.user_id;",
        )
        .map(|row: SqliteRow| UserOverview {
            user: user_from_key(row.get(0)),
            joined: row.get(1),
            active: row.get(2),
            tags: split_tags(row.get(3)),
        })
        .fetch_all(&self.pool)
        .await
    }

    /// Count one more notification for this user today, but only if that
    /// keeps them at or under `limit`. Returns `true` if it was counted and
    /// the message may be sent.
    pub async fn try_reserve_delivery(
        &self,
        user: UserId,
        day: NaiveDate,
        limit: u32,
    ) -> Result<bool, Error> {
        if limit == 0 {
            return Ok(false);
        }
        Ok(sqlx::query(
            "INSERT INTO deliveries(user_id, day, sent) VALUES (?, ?, 1)
            ON CONFLICT(user_id, day) DO UPDATE SET sent = sent + 1
            WHERE sent < ?;",
        )
        .bind(user_key(user))
        .bind(day)
        .bind(limit)
        .execute(&self.pool)
        .await?
        .rows_affected()
            > 0)
    }

    /// Give back a reservation for a message that didn't go through.
    pub async fn release_delivery(&self, user: UserId, day: NaiveDate) -> Result<(), Error> {
        sqlx::query("UPDATE deliveries SET sent = MAX(sent - 1, 0) WHERE user_id=? AND day=?;")
            .bind(user_key(user))
            .bind(day)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn deliveries_on(&self, user: UserId, day: NaiveDate) -> Result<u32, Error> {
        Ok(
            sqlx::query("SELECT sent FROM deliveries WHERE user_id=? AND day=?;")
                .bind(user_key(user))
                .bind(day)
                .map(|row: SqliteRow| row.get::<u32, _>(0))
                .fetch_optional(&self.pool)
                .await?
                .unwrap_or(0),
        )
    }

    /// Drop counters of days before `before`. Returns how many went away.
    pub async fn prune_deliveries(&self, before: NaiveDate) -> Result<u64, Error> {
        Ok(sqlx::query("DELETE FROM deliveries WHERE day<?;")
            .bind(before)
            .execute(&self.pool)
            .await?
            .rows_affected())
    }
}

fn vacancy_from_row(row: SqliteRow) -> Vacancy {
    Vacancy {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        link: row.get("link"),
        image_id: row.get("image_id"),
        tags: split_tags(row.get("tags")),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn tag(x: &str) -> Tag {
        Tag::new(x).unwrap()
    }

    fn draft(title: &str, image: Option<&str>) -> VacancyDraft {
        VacancyDraft {
            title: title.to_string(),
            description: "Описание".to_string(),
            link: "https://example.com".to_string(),
            image_id: image.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn users_register_once() {
        let db = Database::new_in_memory().await.unwrap();
        assert!(db.register_user(UserId(1), day(10)).await.unwrap());
        assert!(!db.register_user(UserId(1), day(11)).await.unwrap());
        assert!(db.register_user(UserId(2), day(11)).await.unwrap());

        let users = db.users_overview().await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].user, UserId(2));
        assert_eq!(users[1].joined, day(10));
    }

    #[tokio::test]
    async fn returning_user_is_reactivated() {
        let db = Database::new_in_memory().await.unwrap();
        db.register_user(UserId(1), day(1)).await.unwrap();
        db.set_user_active(UserId(1), false).await.unwrap();
        assert!(!db.users_overview().await.unwrap()[0].active);

        db.register_user(UserId(1), day(2)).await.unwrap();
        assert!(db.users_overview().await.unwrap()[0].active);
    }

    #[tokio::test]
    async fn tags_toggle_and_clear() {
        let db = Database::new_in_memory().await.unwrap();
        let user = UserId(7);
        assert!(db.toggle_user_tag(user, &tag("курьер")).await.unwrap());
        assert!(db.add_user_tag(user, &tag("офис")).await.unwrap());
        assert!(!db.add_user_tag(user, &tag("офис")).await.unwrap());
        assert_eq!(
            db.user_tags(user).await.unwrap(),
            vec![tag("курьер"), tag("офис")]
        );

        assert!(!db.toggle_user_tag(user, &tag("курьер")).await.unwrap());
        assert_eq!(db.user_tags(user).await.unwrap(), vec![tag("офис")]);

        assert_eq!(db.clear_user_tags(user).await.unwrap(), 1);
        assert!(db.user_tags(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn subscriptions_skip_inactive_users() {
        let db = Database::new_in_memory().await.unwrap();
        for id in [1, 2, 3] {
            db.register_user(UserId(id), day(1)).await.unwrap();
        }
        db.add_user_tag(UserId(1), &tag("офис")).await.unwrap();
        db.add_user_tag(UserId(1), &tag("продажи")).await.unwrap();
        db.add_user_tag(UserId(2), &tag("офис")).await.unwrap();
        db.add_user_tag(UserId(3), &tag("курьер")).await.unwrap();
        db.set_user_active(UserId(2), false).await.unwrap();

        let subs = db.subscriptions().await.unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].user, UserId(1));
        assert_eq!(subs[0].tags, vec![tag("офис"), tag("продажи")]);
        assert_eq!(subs[1].user, UserId(3));
    }

    #[tokio::test]
    async fn vacancy_crud() {
        let db = Database::new_in_memory().await.unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let first = db
            .add_vacancy(&draft("Курьер", Some("photo-1")), &[tag("курьер")], now)
            .await
            .unwrap();
        let second = db
            .add_vacancy(&draft("Оператор", None), &[], now)
            .await
            .unwrap();
        assert!(second > first);

        let stored = db.vacancy(first).await.unwrap().unwrap();
        assert_eq!(stored.title, "Курьер");
        assert_eq!(stored.image_id.as_deref(), Some("photo-1"));
        assert_eq!(stored.tags, vec![tag("курьер")]);
        assert_eq!(stored.created_at, now);

        // Editing without a photo keeps the old one.
        assert!(db
            .update_vacancy(first, &draft("Курьер 2", None), &[tag("доставка")])
            .await
            .unwrap());
        let stored = db.vacancy(first).await.unwrap().unwrap();
        assert_eq!(stored.title, "Курьер 2");
        assert_eq!(stored.image_id.as_deref(), Some("photo-1"));
        assert_eq!(stored.tags, vec![tag("доставка")]);

        let titles = db.vacancy_titles(10).await.unwrap();
        assert_eq!(
            titles,
            vec![(second, "Оператор".to_string()), (first, "Курьер 2".to_string())]
        );

        assert!(db.delete_vacancy(first).await.unwrap());
        assert!(!db.delete_vacancy(first).await.unwrap());
        assert!(db.vacancy(first).await.unwrap().is_none());
        assert!(!db.update_vacancy(first, &draft("x", None), &[]).await.unwrap());
        assert_eq!(db.list_vacancies().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stats_windows() {
        let db = Database::new_in_memory().await.unwrap();
        db.register_user(UserId(1), day(20)).await.unwrap();
        db.register_user(UserId(2), day(15)).await.unwrap();
        db.register_user(UserId(3), day(1)).await.unwrap();
        db.register_user(
            UserId(4),
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
        )
        .await
        .unwrap();
        db.add_user_tag(UserId(1), &tag("офис")).await.unwrap();
        db.set_user_active(UserId(4), false).await.unwrap();

        let stats = db.stats(day(20)).await.unwrap();
        assert_eq!(
            stats,
            UserStats {
                joined_today: 1,
                joined_week: 2,
                joined_month: 3,
                total: 4,
                active: 3,
                subscribers: 1,
                vacancies: 0,
            }
        );
    }

    #[tokio::test]
    async fn notify_setting_toggles() {
        let db = Database::new_in_memory().await.unwrap();
        assert!(db.notify_new_users().await.unwrap());
        assert!(!db.toggle_notify_new_users().await.unwrap());
        assert!(!db.notify_new_users().await.unwrap());
        assert!(db.toggle_notify_new_users().await.unwrap());
    }

    #[tokio::test]
    async fn daily_quota() {
        let db = Database::new_in_memory().await.unwrap();
        let user = UserId(9);

        assert!(db.try_reserve_delivery(user, day(1), 2).await.unwrap());
        assert!(db.try_reserve_delivery(user, day(1), 2).await.unwrap());
        assert!(!db.try_reserve_delivery(user, day(1), 2).await.unwrap());
        assert_eq!(db.deliveries_on(user, day(1)).await.unwrap(), 2);

        // A new day starts from zero.
        assert!(db.try_reserve_delivery(user, day(2), 2).await.unwrap());

        // Giving one back makes room again.
        db.release_delivery(user, day(1)).await.unwrap();
        assert!(db.try_reserve_delivery(user, day(1), 2).await.unwrap());

        assert!(!db.try_reserve_delivery(UserId(10), day(1), 0).await.unwrap());
        assert_eq!(db.deliveries_on(UserId(10), day(1)).await.unwrap(), 0);

        assert_eq!(db.prune_deliveries(day(2)).await.unwrap(), 1);
        assert_eq!(db.deliveries_on(user, day(1)).await.unwrap(), 0);
        assert_eq!(db.deliveries_on(user, day(2)).await.unwrap(), 1);
    }
}
