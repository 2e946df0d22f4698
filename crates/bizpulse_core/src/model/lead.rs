//! CRM lead model.
//!
//! # Invariants
//! - `status` moves freely between stages; `won` and `lost` are terminal for
//!   pipeline aggregation purposes only.
//! - `value` is a non-negative amount when present.

use crate::model::space::SpaceId;
use crate::model::validation::{
    max_len, optional_email, optional_money, optional_phone, optional_text, required_text,
    ValidationError, ValidationResult, COMPANY_MAX, NAME_MAX, NOTES_MAX, SHORT_TEXT_MAX,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type LeadId = Uuid;

/// Pipeline stage of a lead, in board order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    MeetingScheduled,
    MeetingDone,
    Proposal,
    Negotiation,
    Won,
    Lost,
}

impl LeadStatus {
    /// All stages in pipeline order.
    pub const PIPELINE: [LeadStatus; 8] = [
        Self::New,
        Self::Contacted,
        Self::MeetingScheduled,
        Self::MeetingDone,
        Self::Proposal,
        Self::Negotiation,
        Self::Won,
        Self::Lost,
    ];

    /// Whether the lead still counts toward the open pipeline.
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Won | Self::Lost)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::MeetingScheduled => "meeting_scheduled",
            Self::MeetingDone => "meeting_done",
            Self::Proposal => "proposal",
            Self::Negotiation => "negotiation",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::PIPELINE
            .into_iter()
            .find(|status| status.as_str() == value)
    }
}

/// Sales temperature tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadTemperature {
    Cold,
    #[default]
    Warm,
    Hot,
}

impl LeadTemperature {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cold => "cold",
            Self::Warm => "warm",
            Self::Hot => "hot",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cold" => Some(Self::Cold),
            "warm" => Some(Self::Warm),
            "hot" => Some(Self::Hot),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub space_id: SpaceId,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: LeadStatus,
    /// Acquisition channel, e.g. `LinkedIn`.
    pub source: Option<String>,
    /// Deal amount; `None` counts as zero in every aggregate.
    pub value: Option<f64>,
    pub temperature: LeadTemperature,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Creates a `new`-stage lead with a generated id.
    pub fn new(space_id: impl Into<SpaceId>, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            space_id: space_id.into(),
            name: name.into(),
            company: None,
            email: None,
            phone: None,
            status: LeadStatus::New,
            source: None,
            value: None,
            temperature: LeadTemperature::default(),
            notes: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        if self.id.is_nil() {
            return Err(ValidationError::NilId("lead id"));
        }
        required_text("name", &self.name, NAME_MAX)?;
        optional_text("company", self.company.as_deref(), COMPANY_MAX)?;
        optional_email(self.email.as_deref())?;
        optional_phone(self.phone.as_deref(), true)?;
        if let Some(source) = self.source.as_deref() {
            max_len("source", source, SHORT_TEXT_MAX)?;
        }
        optional_money("value", self.value)?;
        optional_text("notes", self.notes.as_deref(), NOTES_MAX)?;
        Ok(())
    }
}
