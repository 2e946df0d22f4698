//! Client roster and NPS records.

use crate::model::space::SpaceId;
use crate::model::validation::{
    max_len, optional_email, optional_money, optional_phone, optional_text, required_text,
    ValidationError, ValidationResult, COMPANY_MAX, NAME_MAX, NOTES_MAX, NPS_MAX,
    SHORT_TEXT_MAX,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ClientId = Uuid;
pub type NpsRecordId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Active,
    Inactive,
    Churned,
}

impl ClientStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Churned => "churned",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "churned" => Some(Self::Churned),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub space_id: SpaceId,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub segment: Option<String>,
    pub status: ClientStatus,
    /// Recurring revenue; `None` counts as zero in every aggregate.
    pub monthly_value: Option<f64>,
    pub contract_start: Option<NaiveDate>,
    pub package: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Creates an active client with a generated id.
    pub fn new(space_id: impl Into<SpaceId>, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            space_id: space_id.into(),
            name: name.into(),
            company: None,
            email: None,
            phone: None,
            segment: None,
            status: ClientStatus::Active,
            monthly_value: None,
            contract_start: None,
            package: None,
            notes: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        if self.id.is_nil() {
            return Err(ValidationError::NilId("client id"));
        }
        required_text("name", &self.name, NAME_MAX)?;
        optional_text("company", self.company.as_deref(), COMPANY_MAX)?;
        optional_email(self.email.as_deref())?;
        optional_phone(self.phone.as_deref(), false)?;
        if let Some(segment) = self.segment.as_deref() {
            max_len("segment", segment, SHORT_TEXT_MAX)?;
        }
        optional_money("monthly_value", self.monthly_value)?;
        optional_text("notes", self.notes.as_deref(), NOTES_MAX)?;
        Ok(())
    }
}

/// Net Promoter Score bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NpsCategory {
    Promoter,
    Passive,
    Detractor,
}

impl NpsCategory {
    pub const PROMOTER_MIN: u8 = 9;
    pub const PASSIVE_MIN: u8 = 7;

    pub fn from_score(score: u8) -> Self {
        if score >= Self::PROMOTER_MIN {
            Self::Promoter
        } else if score >= Self::PASSIVE_MIN {
            Self::Passive
        } else {
            Self::Detractor
        }
    }
}

/// One NPS survey answer for a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpsRecord {
    pub id: NpsRecordId,
    pub client_id: ClientId,
    pub space_id: SpaceId,
    /// `None` when the client answered without a score.
    pub score: Option<u8>,
    pub feedback: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

impl NpsRecord {
    pub fn validate(&self) -> ValidationResult {
        if self.id.is_nil() {
            return Err(ValidationError::NilId("nps record id"));
        }
        if let Some(score) = self.score {
            if score > NPS_MAX {
                return Err(ValidationError::InvalidScore(score));
            }
        }
        optional_text("feedback", self.feedback.as_deref(), NOTES_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::NpsCategory;

    #[test]
    fn nps_buckets_follow_standard_thresholds() {
        assert_eq!(NpsCategory::from_score(10), NpsCategory::Promoter);
        assert_eq!(NpsCategory::from_score(9), NpsCategory::Promoter);
        assert_eq!(NpsCategory::from_score(8), NpsCategory::Passive);
        assert_eq!(NpsCategory::from_score(7), NpsCategory::Passive);
        assert_eq!(NpsCategory::from_score(6), NpsCategory::Detractor);
        assert_eq!(NpsCategory::from_score(0), NpsCategory::Detractor);
    }
}
