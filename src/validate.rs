use crate::errors::{AppError, AppResult};
use crate::models::{Lead, Opportunity};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Per-field checks for a lead. Enum membership (status/source) is already
/// enforced by the type system; decode boundaries map out-of-enum values to
/// VALIDATION_ERROR via [`parse_leads`].
pub fn lead_field_errors(lead: &Lead) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if lead.name.trim().is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    }
    if lead.company.trim().is_empty() {
        errors.push(FieldError::new("company", "Company is required"));
    }
    if !EMAIL_RE.is_match(&lead.email) {
        errors.push(FieldError::new("email", "Invalid email format"));
    }
    if !(MIN_SCORE..=MAX_SCORE).contains(&lead.score) {
        errors.push(FieldError::new("score", "Score must be between 0 and 100"));
    }
    errors
}

pub fn opportunity_field_errors(opportunity: &Opportunity) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if opportunity.name.trim().is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    }
    if opportunity.account_name.trim().is_empty() {
        errors.push(FieldError::new("accountName", "Account name is required"));
    }
    if let Some(amount) = opportunity.amount {
        if amount < 0.0 || !amount.is_finite() {
            errors.push(FieldError::new("amount", "Amount must be non-negative"));
        }
    }
    errors
}

pub fn validate_lead(lead: &Lead) -> AppResult<()> {
    collect(lead_field_errors(lead))
}

pub fn validate_opportunity(opportunity: &Opportunity) -> AppResult<()> {
    collect(opportunity_field_errors(opportunity))
}

fn collect(errors: Vec<FieldError>) -> AppResult<()> {
    if errors.is_empty() {
        return Ok(());
    }
    let joined = errors
        .iter()
        .map(|error| format!("{}: {}", error.field, error.message))
        .collect::<Vec<_>>()
        .join("; ");
    Err(AppError::Validation(joined))
}

/// Decode a JSON array of leads and validate every record. Used at all three
/// untrusted boundaries: seed data, durable-storage load, bulk import.
pub fn parse_leads(json: &str) -> AppResult<Vec<Lead>> {
    let leads: Vec<Lead> =
        serde_json::from_str(json).map_err(|error| AppError::Validation(error.to_string()))?;
    for lead in &leads {
        validate_lead(lead)?;
    }
    Ok(leads)
}

pub fn parse_opportunities(json: &str) -> AppResult<Vec<Opportunity>> {
    let opportunities: Vec<Opportunity> =
        serde_json::from_str(json).map_err(|error| AppError::Validation(error.to_string()))?;
    for opportunity in &opportunities {
        validate_opportunity(opportunity)?;
    }
    Ok(opportunities)
}
