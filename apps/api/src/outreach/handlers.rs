//! Axum route handlers for outreach drafts.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::outreach::{
    DraftStatus, MessageType, OutreachDraft, Recipient, RecipientCategory,
};
use crate::outreach::schedule::{follow_up_schedule, FollowUp};
use crate::outreach::DraftRequest;
use crate::routes::fingerprint_param;
use crate::state::AppState;
use crate::store::DraftFilter;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListDraftsQuery {
    pub status: Option<String>,
    pub job: Option<String>,
    #[serde(default)]
    pub presentable_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateDraftRequest {
    pub job: Option<String>,
    pub recipient_name: String,
    pub recipient_title: String,
    pub recipient_category: RecipientCategory,
    pub linkedin_url: Option<String>,
    pub message_type: MessageType,
    /// Supplied text bypasses generation but still goes through the gate.
    pub text: Option<String>,
    pub additional_context: Option<String>,
}

/// A draft plus the derived fields the dashboard needs to gate sending.
#[derive(Debug, Serialize)]
pub struct DraftView {
    #[serde(flatten)]
    pub draft: OutreachDraft,
    pub presentable: bool,
    pub length: usize,
    pub ceiling: usize,
}

impl From<OutreachDraft> for DraftView {
    fn from(draft: OutreachDraft) -> Self {
        Self {
            presentable: draft.presentable(),
            length: draft.length(),
            ceiling: draft.message_type.ceiling(),
            draft,
        }
    }
}

fn draft_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation(format!("'{raw}' is not a valid draft id")))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/outreach
pub async fn handle_list_drafts(
    State(state): State<AppState>,
    Query(query): Query<ListDraftsQuery>,
) -> Result<Json<Vec<DraftView>>, AppError> {
    let filter = DraftFilter {
        status: query
            .status
            .as_deref()
            .map(str::parse::<DraftStatus>)
            .transpose()
            .map_err(AppError::Validation)?,
        job: query.job.as_deref().map(fingerprint_param).transpose()?,
        presentable_only: query.presentable_only,
    };
    let drafts = state.store.list_drafts(&filter).await?;
    Ok(Json(drafts.into_iter().map(DraftView::from).collect()))
}

/// POST /api/outreach/draft
///
/// Oversize text is stored (201) with `presentable: false`, not rejected.
pub async fn handle_create_draft(
    State(state): State<AppState>,
    Json(request): Json<CreateDraftRequest>,
) -> Result<(StatusCode, Json<DraftView>), AppError> {
    let job = request.job.as_deref().map(fingerprint_param).transpose()?;
    let draft = state
        .outreach()
        .draft(DraftRequest {
            job,
            recipient: Recipient {
                name: request.recipient_name.trim().to_string(),
                title: request.recipient_title.trim().to_string(),
                category: request.recipient_category,
                linkedin_url: request.linkedin_url,
            },
            message_type: request.message_type,
            text: request.text,
            additional_context: request.additional_context,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(draft.into())))
}

/// POST /api/outreach/:id/sent
///
/// Explicit human confirmation that the message went out.
pub async fn handle_mark_sent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DraftView>, AppError> {
    let draft = state.outreach().mark_sent(draft_id(&id)?).await?;
    Ok(Json(draft.into()))
}

/// GET /api/outreach/:id/follow-ups
pub async fn handle_follow_ups(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<FollowUp>>, AppError> {
    let id = draft_id(&id)?;
    let draft = state.outreach().get(id).await?;
    let sent_at = draft
        .sent_at
        .ok_or_else(|| AppError::Conflict(format!("draft {id} has not been sent")))?;
    Ok(Json(follow_up_schedule(sent_at)))
}
