//! A fake Bot API server for handler and broadcast tests.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use teloxide::Bot;
use tokio::net::TcpListener;

/// Every request the fake server got: method name and JSON body.
pub type Seen = Arc<Mutex<Vec<(String, Value)>>>;

type Answer = Arc<dyn Fn(&str, &Value) -> Value + Send + Sync>;

#[derive(Clone)]
struct Fake {
    answer: Answer,
    seen: Seen,
}

async fn method(
    State(fake): State<Fake>,
    Path(path): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    // Path is `bot<token>/<Method>`.
    let name = path.rsplit('/').next().unwrap_or_default().to_string();
    let reply = (fake.answer)(&name, &body);
    fake.seen.lock().unwrap().push((name, body));
    Json(reply)
}

/// A bot talking to a local server that answers with `answer(method, body)`.
pub async fn fake_bot(
    answer: impl Fn(&str, &Value) -> Value + Send + Sync + 'static,
) -> (Bot, Seen) {
    let fake = Fake {
        answer: Arc::new(answer),
        seen: Seen::default(),
    };
    let seen = fake.seen.clone();
    let app = Router::new()
        .route("/{*path}", post(method))
        .with_state(fake);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });

    let url = url::Url::parse(&format!("http://{addr}/")).unwrap();
    (Bot::new("t").set_api_url(url), seen)
}

pub fn ok(result: Value) -> Value {
    json!({"ok": true, "result": result})
}

pub fn error(code: u16, description: &str) -> Value {
    json!({"ok": false, "error_code": code, "description": description})
}

/// A sent text message, as Telegram returns it.
pub fn message(text: &Value) -> Value {
    ok(json!({
        "message_id": 1,
        "date": 0,
        "chat": {"id": 1, "type": "private", "first_name": "Тест"},
        "text": text,
    }))
}

/// Chat IDs of every request of this method, in order.
pub fn chats_of(seen: &Seen, method: &str) -> Vec<Value> {
    seen.lock()
        .unwrap()
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case(method))
        .map(|(_, body)| body["chat_id"].clone())
        .collect()
}
