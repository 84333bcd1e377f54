//! Handlers for `GET` and `POST /interactions`.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use autoblog_engine::highlight::wire::{
    CreateHighlightResponse, HighlightPayload, ListHighlightsResponse,
};
use autoblog_engine::{Highlight, HighlightColor, HighlightId, HighlightRange};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SlugQuery {
    pub slug: Option<String>,
}

/// POST body. Fields are optional so missing ones produce the service's own
/// error message instead of a generic decode failure.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
    pub slug: Option<String>,
    pub highlight: Option<IncomingHighlight>,
}

/// A highlight as submitted. Id and timestamp are filled in when absent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingHighlight {
    #[serde(default)]
    pub id: Option<HighlightId>,
    pub text: String,
    pub range: HighlightRange,
    #[serde(default)]
    pub color: HighlightColor,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl IncomingHighlight {
    fn into_highlight(self, slug: String) -> Highlight {
        Highlight {
            id: self.id.unwrap_or_else(|| HighlightId::new("")),
            article_slug: slug,
            text: self.text,
            color: self.color,
            range: self.range,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}

fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    result
        .map(|Json(value)| value)
        .map_err(|err| ApiError::bad_request(err.body_text()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

pub async fn list_interactions(
    State(state): State<AppState>,
    Query(query): Query<SlugQuery>,
) -> Result<Json<ListHighlightsResponse>, ApiError> {
    let slug = non_empty(query.slug).ok_or_else(|| ApiError::bad_request("Slug is required"))?;

    let highlights = state
        .store
        .list(&slug)
        .await
        .iter()
        .map(HighlightPayload::from)
        .collect();
    Ok(Json(ListHighlightsResponse { highlights }))
}

pub async fn create_interaction(
    State(state): State<AppState>,
    body: Result<Json<CreateBody>, JsonRejection>,
) -> Result<Json<CreateHighlightResponse>, ApiError> {
    let body = extract_json(body)?;
    let (Some(slug), Some(incoming)) = (non_empty(body.slug), body.highlight) else {
        return Err(ApiError::bad_request("Slug and highlight are required"));
    };
    if incoming.text.is_empty() {
        return Err(ApiError::bad_request("Highlight text is required"));
    }

    let stored = state
        .store
        .append(incoming.into_highlight(slug))
        .await?;
    log::info!(
        "stored {} highlight {} on '{}'",
        stored.color,
        stored.id,
        stored.article_slug
    );

    Ok(Json(CreateHighlightResponse {
        success: true,
        highlight: HighlightPayload::from(&stored),
    }))
}
