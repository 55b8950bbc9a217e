//! Server-rendered pages.

use crate::models::Creature;
use askama::Template;

/// The quiz form. `shared_token` is set when the page is opened through a
/// permalink.
#[derive(Template)]
#[template(path = "quiz.html")]
pub struct QuizPage {
    pub shared_token: Option<String>,
}

/// Result page for browser form submissions.
#[derive(Template)]
#[template(path = "minted.html")]
pub struct MintedPage {
    pub horse: Creature,
    pub token_id: String,
    pub asset_url: Option<String>,
    pub metadata_url: Option<String>,
    pub permalink: String,
}

/// Standalone share page stored as `tokens/{token}/index.html`.
#[derive(Template)]
#[template(path = "share.html")]
pub struct SharePage {
    pub horse: Creature,
    pub token_id: String,
    pub asset_url: Option<String>,
    pub permalink: String,
}
