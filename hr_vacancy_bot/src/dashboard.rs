//! Read-only admin dashboard served over HTTP.
//!
//! There's no authentication here. Bind it to localhost or put it behind
//! something that does auth.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use html_escape::encode_text;
use tokio::net::TcpListener;

use crate::{
    database::{Database, UserOverview, UserStats, Vacancy},
    misc::today,
    tags::hashtags_line,
};

pub fn router(database: Arc<Database>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/users", get(users))
        .route("/vacancies", get(vacancies))
        .route("/health", get(health))
        .with_state(database)
}

/// Serve the dashboard until the process exits.
pub async fn serve(addr: SocketAddr, database: Arc<Database>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("Dashboard listening on http://{addr}");
    axum::serve(listener, router(database)).await
}

fn internal_error(e: crate::database::Error) -> Response {
    log::error!("Dashboard database error: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(page("Ошибка", "<p>Не удалось прочитать базу данных.</p>")),
    )
        .into_response()
}

async fn index(State(database): State<Arc<Database>>) -> Response {
    match database.stats(today()).await {
        Ok(stats) => Html(render_stats(&stats)).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn users(State(database): State<Arc<Database>>) -> Response {
    match database.users_overview().await {
        Ok(users) => Html(render_users(&users)).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn vacancies(State(database): State<Arc<Database>>) -> Response {
    match database.list_vacancies().await {
        Ok(vacancies) => Html(render_vacancies(&vacancies)).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn health() -> &'static str {
    "ok"
}

const STYLE: &str = "\
body{font-family:sans-serif;background:#0f172a;color:#e2e8f0;margin:2em}\
a{color:#38bdf8}nav a{margin-right:1em}\
table{border-collapse:collapse}td,th{border:1px solid #334155;padding:.4em .8em;text-align:left}\
.card{background:#1e293b;border-radius:8px;padding:1em;margin:1em 0}.tags{color:#94a3b8}";

/// Wrap `body` into the common layout. `title` is escaped, `body` is not.
fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{0}</title>\
         <style>{STYLE}</style></head><body>\
         <nav><a href=\"/\">Статистика</a><a href=\"/users\">Пользователи</a>\
         <a href=\"/vacancies\">Вакансии</a></nav><h1>{0}</h1>{body}</body></html>",
        encode_text(title)
    )
}

pub fn render_stats(stats: &UserStats) -> String {
    let rows = [
        ("Новых сегодня", stats.joined_today),
        ("Новых за 7 дней", stats.joined_week),
        ("Новых за 30 дней", stats.joined_month),
        ("Всего пользователей", stats.total),
        ("Активных", stats.active),
        ("С подпиской на теги", stats.subscribers),
        ("Вакансий", stats.vacancies),
    ];
    let mut body = String::from("<table>");
    for (name, value) in rows {
        body.push_str(&format!("<tr><th>{name}</th><td>{value}</td></tr>"));
    }
    body.push_str("</table>");
    page("Статистика", &body)
}

pub fn render_users(users: &[UserOverview]) -> String {
    let mut body = String::from(
        "<table><tr><th>ID</th><th>Присоединился</th><th>Активен</th><th>Теги</th></tr>",
    );
    for user in users {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"tags\">{}</td></tr>",
            user.user,
            user.joined.format("%Y-%m-%d"),
            if user.active { "да" } else { "нет" },
            encode_text(&hashtags_line(&user.tags))
        ));
    }
    body.push_str("</table>");
    page(&format!("Пользователи ({})", users.len()), &body)
}

pub fn render_vacancies(vacancies: &[Vacancy]) -> String {
    let mut body = String::new();
    if vacancies.is_empty() {
        body.push_str("<p>Вакансий пока нет.</p>");
    }
    for vacancy in vacancies {
        body.push_str(&format!(
            "<div class=\"card\"><h3>#{} {}</h3><p>{}</p><p><a href=\"{}\">{}</a></p>\
             <p class=\"tags\">{}</p><small>{}</small></div>",
            vacancy.id,
            encode_text(&vacancy.title),
            encode_text(&vacancy.description).replace('\n', "<br>"),
            html_escape::encode_double_quoted_attribute(&vacancy.link),
            encode_text(&vacancy.link),
            encode_text(&hashtags_line(&vacancy.tags)),
            vacancy.created_at.format("%Y-%m-%d %H:%M UTC"),
        ));
    }
    page("Вакансии", &body)
}
