use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::Fingerprint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientCategory {
    Recruiter,
    HiringManager,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    ConnectionRequest,
    FollowUp,
    Inmail,
}

impl MessageType {
    /// Maximum message length in characters.
    pub fn ceiling(&self) -> usize {
        match self {
            MessageType::ConnectionRequest => 280,
            MessageType::FollowUp => 500,
            MessageType::Inmail => 1900,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::ConnectionRequest => "connection_request",
            MessageType::FollowUp => "follow_up",
            MessageType::Inmail => "inmail",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Draft,
    /// Over the ceiling for its type. Kept, never truncated, never sendable.
    Oversize,
    /// Set only by explicit human confirmation.
    Sent,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Draft => "draft",
            DraftStatus::Oversize => "oversize",
            DraftStatus::Sent => "sent",
        }
    }
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DraftStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "draft" => Ok(DraftStatus::Draft),
            "oversize" => Ok(DraftStatus::Oversize),
            "sent" => Ok(DraftStatus::Sent),
            other => Err(format!("unknown draft status '{other}'")),
        }
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "connection_request" => Ok(MessageType::ConnectionRequest),
            "follow_up" => Ok(MessageType::FollowUp),
            "inmail" => Ok(MessageType::Inmail),
            other => Err(format!("unknown message type '{other}'")),
        }
    }
}

impl RecipientCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientCategory::Recruiter => "recruiter",
            RecipientCategory::HiringManager => "hiring_manager",
        }
    }
}

impl FromStr for RecipientCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "recruiter" => Ok(RecipientCategory::Recruiter),
            "hiring_manager" => Ok(RecipientCategory::HiringManager),
            other => Err(format!("unknown recipient category '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub title: String,
    pub category: RecipientCategory,
    #[serde(default)]
    pub linkedin_url: Option<String>,
}

impl Recipient {
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.title.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachDraft {
    pub id: Uuid,
    pub job: Option<Fingerprint>,
    pub recipient: Recipient,
    pub message_type: MessageType,
    pub message_text: String,
    pub status: DraftStatus,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl OutreachDraft {
    pub fn length(&self) -> usize {
        self.message_text.chars().count()
    }

    /// Eligible to be shown to the human for sending.
    pub fn presentable(&self) -> bool {
        self.status == DraftStatus::Draft
            && self.length() <= self.message_type.ceiling()
            && self.recipient.is_complete()
    }
}
