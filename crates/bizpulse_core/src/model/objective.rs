//! Strategic objective and progress ledger models.
//!
//! # Responsibility
//! - Define the objective record, its lifecycle status and auto-link source.
//! - Define immutable progress entries owned by one objective.
//!
//! # Invariants
//! - `current_value` and `status` are derived state; only the ledger and
//!   objective services write them.
//! - A non-auto-linked objective's `current_value` equals the sum of its
//!   entries.
//! - An auto-linked objective's `current_value` is whatever the auto-metric
//!   resolver returns for its space.
//! - `end_date` is not earlier than `start_date` when both are set.

use crate::model::space::SpaceId;
use crate::model::validation::{
    finite_in_range, optional_text, required_text, ValidationError, ValidationResult,
    DESCRIPTION_MAX, NAME_MAX, SHORT_TEXT_MAX, VALUE_MAX,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ObjectiveId = Uuid;
pub type ProgressEntryId = Uuid;

/// Objective lifecycle state.
///
/// `Paused` is only ever set explicitly; the classifier never returns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveStatus {
    InProgress,
    Completed,
    Overdue,
    Paused,
}

impl ObjectiveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Overdue => "overdue",
            Self::Paused => "paused",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "overdue" => Some(Self::Overdue),
            "paused" => Some(Self::Paused),
            _ => None,
        }
    }
}

/// Unit of measure shown next to target/current values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObjectiveUnit {
    #[default]
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "R$")]
    Currency,
    #[serde(rename = "un")]
    Count,
}

impl ObjectiveUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Percent => "%",
            Self::Currency => "R$",
            Self::Count => "un",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "%" => Some(Self::Percent),
            "R$" => Some(Self::Currency),
            "un" => Some(Self::Count),
            _ => None,
        }
    }
}

/// Lead/client aggregate that can drive an objective's current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoMetricSource {
    #[default]
    None,
    /// Sum of open lead values.
    PipelineValue,
    /// Sum of won lead values.
    WonValue,
    /// Sum of active client monthly values.
    ActiveRecurringRevenue,
    /// Number of active clients.
    ActiveCount,
}

impl AutoMetricSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::PipelineValue => "pipeline_value",
            Self::WonValue => "won_value",
            Self::ActiveRecurringRevenue => "active_recurring_revenue",
            Self::ActiveCount => "active_count",
        }
    }

    /// Parses a source name. Unknown names map to `None`.
    ///
    /// The older `crm_*` / `clients_*` identifiers are accepted as aliases.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "pipeline_value" | "crm_pipeline" => Self::PipelineValue,
            "won_value" | "crm_won" => Self::WonValue,
            "active_recurring_revenue" | "clients_mrr" => Self::ActiveRecurringRevenue,
            "active_count" | "clients_count" => Self::ActiveCount,
            _ => Self::None,
        }
    }
}

/// Tracked goal with a target, an optional deadline and derived status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub id: ObjectiveId,
    pub space_id: SpaceId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: ObjectiveUnit,
    pub target_value: Option<f64>,
    pub current_value: f64,
    pub start_date: Option<NaiveDate>,
    /// Deadline. The classifier treats it as 00:00 UTC of that day.
    pub end_date: Option<NaiveDate>,
    pub status: ObjectiveStatus,
    /// Commercial objectives may pull their value from CRM data.
    pub is_commercial: bool,
    pub auto_source: AutoMetricSource,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Objective {
    /// Creates an in-progress objective with zero value and a generated id.
    pub fn new(space_id: impl Into<SpaceId>, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            space_id: space_id.into(),
            title: title.into(),
            description: None,
            category: None,
            unit: ObjectiveUnit::default(),
            target_value: None,
            current_value: 0.0,
            start_date: None,
            end_date: None,
            status: ObjectiveStatus::InProgress,
            is_commercial: false,
            auto_source: AutoMetricSource::None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `current_value` comes from the auto-metric resolver.
    pub fn is_auto_linked(&self) -> bool {
        self.is_commercial && self.auto_source != AutoMetricSource::None
    }

    pub fn validate(&self) -> ValidationResult {
        if self.id.is_nil() {
            return Err(ValidationError::NilId("objective id"));
        }
        required_text("title", &self.title, NAME_MAX)?;
        optional_text("description", self.description.as_deref(), DESCRIPTION_MAX)?;
        optional_text("category", self.category.as_deref(), SHORT_TEXT_MAX)?;
        if let Some(target) = self.target_value {
            finite_in_range("target_value", target, f64::MIN_POSITIVE, VALUE_MAX)?;
        }
        if !self.current_value.is_finite() {
            return Err(ValidationError::NonFinite("current_value"));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ValidationError::ReversedDateRange);
            }
        }
        Ok(())
    }
}

/// One dated contribution toward an objective. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub id: ProgressEntryId,
    pub objective_id: ObjectiveId,
    /// Any sign is accepted; corrections are recorded as negative entries.
    pub value: f64,
    pub note: Option<String>,
    pub logged_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

impl ProgressEntry {
    pub fn new(objective_id: ObjectiveId, value: f64, logged_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            objective_id,
            value,
            note: None,
            logged_at,
            created_by: None,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        if self.id.is_nil() {
            return Err(ValidationError::NilId("progress entry id"));
        }
        finite_in_range("value", self.value, -VALUE_MAX, VALUE_MAX)?;
        optional_text("note", self.note.as_deref(), DESCRIPTION_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn auto_link_requires_commercial_flag_and_source() {
        let mut objective = Objective::new("acme", "MRR", Utc::now());
        objective.auto_source = AutoMetricSource::ActiveRecurringRevenue;
        assert!(!objective.is_auto_linked());

        objective.is_commercial = true;
        assert!(objective.is_auto_linked());

        objective.auto_source = AutoMetricSource::None;
        assert!(!objective.is_auto_linked());
    }

    #[test]
    fn source_parse_accepts_aliases_and_falls_back_to_none() {
        assert_eq!(
            AutoMetricSource::parse("crm_pipeline"),
            AutoMetricSource::PipelineValue
        );
        assert_eq!(
            AutoMetricSource::parse("clients_count"),
            AutoMetricSource::ActiveCount
        );
        assert_eq!(AutoMetricSource::parse("revenue_forecast"), AutoMetricSource::None);
        assert_eq!(AutoMetricSource::parse(""), AutoMetricSource::None);
    }

    #[test]
    fn validate_rejects_reversed_dates_and_non_positive_target() {
        let mut objective = Objective::new("acme", "Q1", Utc::now());
        objective.start_date = NaiveDate::from_ymd_opt(2025, 3, 1);
        objective.end_date = NaiveDate::from_ymd_opt(2025, 2, 1);
        assert_eq!(objective.validate(), Err(ValidationError::ReversedDateRange));

        objective.end_date = None;
        objective.target_value = Some(0.0);
        assert!(matches!(
            objective.validate(),
            Err(ValidationError::OutOfRange { field: "target_value", .. })
        ));
    }

    #[test]
    fn entry_accepts_negative_corrections_but_not_nan() {
        let objective_id = Uuid::new_v4();
        let entry = ProgressEntry::new(objective_id, -3.0, Utc::now());
        assert!(entry.validate().is_ok());

        let entry = ProgressEntry::new(objective_id, f64::INFINITY, Utc::now());
        assert_eq!(entry.validate(), Err(ValidationError::NonFinite("value")));
    }

    #[test]
    fn unit_serializes_as_symbol() {
        let json = serde_json::to_value(ObjectiveUnit::Currency).unwrap();
        assert_eq!(json, "R$");
        assert_eq!(ObjectiveUnit::parse("un"), Some(ObjectiveUnit::Count));
    }
}
