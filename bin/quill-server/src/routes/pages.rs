//! Server-rendered chat pages.
//!
//! Both pages are rendered once at startup from the minijinja templates in
//! `templates/` and served from memory afterwards.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use minijinja::{context, Environment};
use quill_core::APOLOGY;

use crate::config::Config;
use crate::state::AppState;

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");
const CHAT_TEMPLATE: &str = include_str!("../../templates/chat.html");

#[derive(Debug, Clone)]
pub struct Pages {
    /// Single-shot page backed by `/v1/chat/completions`.
    pub index: String,
    /// Session widget backed by `/v1/sessions`.
    pub chat: String,
}

impl Pages {
    pub fn render(config: &Config) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("index.html", INDEX_TEMPLATE)?;
        env.add_template("chat.html", CHAT_TEMPLATE)?;

        let ctx = context! {
            page => config.page_text(),
            model => &config.model,
            apology => APOLOGY,
        };
        Ok(Self {
            index: env.get_template("index.html")?.render(&ctx)?,
            chat: env.get_template("chat.html")?.render(&ctx)?,
        })
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index_page))
        .route("/chat", get(chat_page))
}

async fn index_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.pages.index.clone())
}

async fn chat_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.pages.chat.clone())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
