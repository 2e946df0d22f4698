//! Space (tenant) model.
//!
//! # Invariants
//! - `id` is the slug of the label at creation time and never changes.
//! - Every other record belongs to exactly one space.

use crate::model::validation::{
    max_len, required_text, ValidationError, ValidationResult, DESCRIPTION_MAX, SHORT_TEXT_MAX,
    SPACE_LABEL_MAX,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Tenant identifier. A lowercase ASCII slug such as `acme-brasil`.
pub type SpaceId = String;

pub const DEFAULT_SPACE_COLOR: &str = "bg-primary";

/// Isolation boundary for leads, clients and objectives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub id: SpaceId,
    pub label: String,
    pub description: String,
    /// Free-form UI color tag.
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl Space {
    /// Builds a space whose id is derived from `label`.
    ///
    /// A blank description is replaced by `Space <label>`.
    pub fn new(label: &str, description: &str, created_at: DateTime<Utc>) -> Self {
        let label = label.trim().to_string();
        let description = match description.trim() {
            "" => format!("Space {label}"),
            other => other.to_string(),
        };
        Self {
            id: slugify(&label),
            label,
            description,
            color: DEFAULT_SPACE_COLOR.to_string(),
            created_at,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        required_text("label", &self.label, SPACE_LABEL_MAX)?;
        max_len("description", &self.description, DESCRIPTION_MAX)?;
        required_text("color", &self.color, SHORT_TEXT_MAX)?;
        if self.id.is_empty() {
            return Err(ValidationError::Required("space id"));
        }
        Ok(())
    }
}

/// Derives a tenant slug from a human label.
///
/// Lowercases, decomposes to NFD and drops combining marks, then collapses
/// every run of other non `[a-z0-9]` characters into one `-` and trims
/// dashes at both ends.
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending_dash = false;
    let lowered = label.to_lowercase();
    for ch in lowered.nfd().filter(|ch| !is_combining_mark(*ch)) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    slug
}
