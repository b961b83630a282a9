//! Outreach draft gate.
//!
//! Every draft is stored as generated. Over-ceiling text is marked `oversize`
//! and withheld from the presentable queue; it is never truncated. `sent` is
//! reachable only through `mark_sent`, which no automated path calls.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::GenerationGate;
use crate::models::job::Fingerprint;
use crate::models::outreach::{DraftStatus, MessageType, OutreachDraft, Recipient};
use crate::models::profile::BaseProfile;
use crate::store::{SendOutcome, Store};

pub mod compose;
pub mod handlers;
pub mod prompts;
pub mod schedule;

/// Classifies generated text against the ceiling for its type.
pub fn build_draft(
    job: Option<Fingerprint>,
    recipient: Recipient,
    message_type: MessageType,
    generated_text: String,
    at: DateTime<Utc>,
) -> OutreachDraft {
    let length = generated_text.chars().count();
    let status = if length > message_type.ceiling() {
        DraftStatus::Oversize
    } else {
        DraftStatus::Draft
    };
    OutreachDraft {
        id: Uuid::new_v4(),
        job,
        recipient,
        message_type,
        message_text: generated_text,
        status,
        created_at: at,
        sent_at: None,
    }
}

/// What to draft. `text` skips generation and goes straight to the gate.
#[derive(Debug, Clone)]
pub struct DraftRequest {
    pub job: Option<Fingerprint>,
    pub recipient: Recipient,
    pub message_type: MessageType,
    pub text: Option<String>,
    pub additional_context: Option<String>,
}

#[derive(Clone)]
pub struct Outreach {
    store: Arc<dyn Store>,
    gate: Arc<GenerationGate>,
    base_profile: Arc<BaseProfile>,
}

impl Outreach {
    pub fn new(
        store: Arc<dyn Store>,
        gate: Arc<GenerationGate>,
        base_profile: Arc<BaseProfile>,
    ) -> Self {
        Self {
            store,
            gate,
            base_profile,
        }
    }

    /// Stores a new draft. The text is composed by the model unless supplied.
    pub async fn draft(&self, request: DraftRequest) -> Result<OutreachDraft, AppError> {
        let job = match request.job {
            Some(fp) => Some(
                self.store
                    .get_job(&fp)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("job {fp}")))?,
            ),
            None => None,
        };

        let text = match request.text {
            Some(text) => text.trim().to_string(),
            None => {
                compose::compose(
                    &self.gate,
                    compose::ComposeInput {
                        job: job.as_ref(),
                        recipient: &request.recipient,
                        message_type: request.message_type,
                        highlights: &self.base_profile.highlights,
                        additional_context: request.additional_context.as_deref(),
                    },
                )
                .await?
            }
        };
        if text.is_empty() {
            return Err(AppError::Validation("message text cannot be empty".to_string()));
        }

        let draft = build_draft(
            request.job,
            request.recipient,
            request.message_type,
            text,
            Utc::now(),
        );
        if draft.status == DraftStatus::Oversize {
            warn!(
                "Draft {} is {} chars, over the {} ceiling for {}; withheld",
                draft.id,
                draft.length(),
                draft.message_type.ceiling(),
                draft.message_type.as_str()
            );
        }
        Ok(self.store.insert_draft(draft).await?)
    }

    /// One-way `draft → sent`. Human-triggered only.
    pub async fn mark_sent(&self, id: Uuid) -> Result<OutreachDraft, AppError> {
        match self.store.mark_draft_sent(id, Utc::now()).await? {
            SendOutcome::Sent(draft) => {
                info!("Draft {id} marked sent");
                Ok(draft)
            }
            SendOutcome::AlreadySent(_) => {
                Err(AppError::Conflict(format!("draft {id} was already sent")))
            }
            SendOutcome::NotPresentable(draft) => Err(AppError::DraftNotPresentable(format!(
                "draft {id} is {} ({} of {} chars, recipient complete: {})",
                draft.status,
                draft.length(),
                draft.message_type.ceiling(),
                draft.recipient.is_complete()
            ))),
            SendOutcome::NotFound => Err(AppError::NotFound(format!("draft {id}"))),
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<OutreachDraft, AppError> {
        self.store
            .get_draft(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("draft {id}")))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::outreach::RecipientCategory;
    use crate::store::MemoryStore;
    use crate::testkit::{self, ScriptedGenerator};

    fn recipient() -> Recipient {
        Recipient {
            name: "Dana Whitfield".to_string(),
            title: "Technical Recruiter".to_string(),
            category: RecipientCategory::Recruiter,
            linkedin_url: None,
        }
    }

    fn outreach(generator: ScriptedGenerator) -> (Outreach, Arc<ScriptedGenerator>) {
        let generator = Arc::new(generator);
        let gate = GenerationGate::new(generator.clone(), 2, Duration::from_secs(5));
        let outreach = Outreach::new(
            Arc::new(MemoryStore::new()),
            Arc::new(gate),
            Arc::new(testkit::base_profile()),
        );
        (outreach, generator)
    }

    fn request(text: Option<String>) -> DraftRequest {
        DraftRequest {
            job: None,
            recipient: recipient(),
            message_type: MessageType::ConnectionRequest,
            text,
            additional_context: None,
        }
    }

    #[tokio::test]
    async fn test_oversize_then_shorter_redraft() {
        let (outreach, _) = outreach(ScriptedGenerator::new(vec![
            Ok("x".repeat(310)),
            Ok("y".repeat(250)),
        ]));

        let long = outreach.draft(request(None)).await.unwrap();
        assert_eq!(long.status, DraftStatus::Oversize);
        assert!(!long.presentable());
        assert_eq!(long.length(), 310);

        let short = outreach.draft(request(None)).await.unwrap();
        assert_eq!(short.status, DraftStatus::Draft);
        assert!(short.presentable());
    }

    #[test]
    fn test_over_ceiling_is_never_presentable() {
        for message_type in [
            MessageType::ConnectionRequest,
            MessageType::FollowUp,
            MessageType::Inmail,
        ] {
            let at_ceiling = "a".repeat(message_type.ceiling());
            let over = "a".repeat(message_type.ceiling() + 1);

            assert!(build_draft(None, recipient(), message_type, at_ceiling, Utc::now()).presentable());
            let draft = build_draft(None, recipient(), message_type, over.clone(), Utc::now());
            assert!(!draft.presentable());
            assert_eq!(draft.message_text, over);
        }
    }

    #[test]
    fn test_ceiling_counts_characters_not_bytes() {
        let text = "é".repeat(280);
        let draft = build_draft(None, recipient(), MessageType::ConnectionRequest, text, Utc::now());
        assert!(draft.presentable());
    }

    #[tokio::test]
    async fn test_supplied_text_skips_generation() {
        let (outreach, generator) = outreach(ScriptedGenerator::new(vec![]));

        let draft = outreach
            .draft(request(Some("Hi Dana, I'd love to connect about the PM role.".into())))
            .await
            .unwrap();

        assert!(draft.presentable());
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_sent_is_terminal() {
        let (outreach, _) = outreach(ScriptedGenerator::new(vec![]));
        let draft = outreach
            .draft(request(Some("Hi Dana, quick note about the PM opening.".into())))
            .await
            .unwrap();

        let sent = outreach.mark_sent(draft.id).await.unwrap();
        assert_eq!(sent.status, DraftStatus::Sent);
        assert!(sent.sent_at.is_some());

        assert!(matches!(
            outreach.mark_sent(draft.id).await,
            Err(AppError::Conflict(_))
        ));
        let stored = outreach.get(draft.id).await.unwrap();
        assert_eq!(stored.sent_at, sent.sent_at);
    }

    #[tokio::test]
    async fn test_oversize_draft_cannot_be_sent() {
        let (outreach, _) = outreach(ScriptedGenerator::new(vec![]));
        let draft = outreach.draft(request(Some("z".repeat(281)))).await.unwrap();

        assert!(matches!(
            outreach.mark_sent(draft.id).await,
            Err(AppError::DraftNotPresentable(_))
        ));
        assert_eq!(outreach.get(draft.id).await.unwrap().status, DraftStatus::Oversize);
    }

    #[tokio::test]
    async fn test_incomplete_recipient_is_not_presentable() {
        let (outreach, _) = outreach(ScriptedGenerator::new(vec![]));
        let mut req = request(Some("Hello there".into()));
        req.recipient.name = "  ".into();

        let draft = outreach.draft(req).await.unwrap();

        assert_eq!(draft.status, DraftStatus::Draft);
        assert!(!draft.presentable());
    }

    #[tokio::test]
    async fn test_unknown_job_is_rejected() {
        let (outreach, _) = outreach(ScriptedGenerator::new(vec![]));
        let mut req = request(Some("Hello".into()));
        req.job = Some(testkit::job("https://a.co/1", "PM", "Acme", 0.5).fingerprint);

        assert!(matches!(outreach.draft(req).await, Err(AppError::NotFound(_))));
    }
}
