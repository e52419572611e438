use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::response::Html;
use axum::Form;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::state::AppState;

const CHAT_PAGE: &str = include_str!("../../../static/chat.html");

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    msg: Option<String>,
}

pub async fn index() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

/// Answers `msg` from the query string (GET) or the urlencoded body (POST).
/// A body that is not a urlencoded form counts as a missing `msg`.
pub async fn get_answer(
    State(state): State<Arc<AppState>>,
    form: Result<Form<ChatForm>, FormRejection>,
) -> Result<String, ApiError> {
    if let Err(rejection) = &form {
        tracing::debug!("Unreadable chat form: {}", rejection);
    }
    let msg = form.ok().and_then(|Form(form)| form.msg);
    let question = msg
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing form field: msg".to_string()))?;

    tracing::info!("Question: {}", question);
    let answer = state.query.answer(question).await.map_err(|err| {
        tracing::error!("Failed to answer question: {}", err);
        ApiError::from(err)
    })?;
    tracing::info!("Response: {}", answer.text);

    Ok(answer.text)
}
