use std::collections::HashMap;

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

/// One uploaded side of a document: where it lives and what to show for it.
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFile {
    pub url: String,
    pub file_name: String,
}

/// Front/back pair for a single required document.
#[derive(Debug, Default, Serialize, Deserialize, Clone, JsonSchema)]
pub struct DocumentSides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub front: Option<DocumentFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub back: Option<DocumentFile>,
}

/// Per-traveller passport record. Everything optional: the client sends
/// whatever OCR or manual entry produced, nothing is cross-checked against
/// the travellers count.
#[derive(Debug, Default, Serialize, Deserialize, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PassportRecord {
    pub traveller_index: Option<i32>,
    pub passport_number: Option<String>,
    pub surname: Option<String>,
    pub given_name: Option<String>,
    pub nationality: Option<String>,
    pub dob: Option<String>,
    pub place_of_birth: Option<String>,
    pub sex: Option<String>,
    pub date_of_issue: Option<String>,
    pub date_of_expiry: Option<String>,
    pub place_of_issue: Option<String>,
    pub file_number: Option<String>,
}

/// Audit-log entry. Labels are free text, not a closed vocabulary; the
/// history is append-only and duplicates are legal.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StatusEntry {
    pub label: String,
    pub date: DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VisaApplication {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Reference into the visa_configs catalog; many applications share one.
    pub visa_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub travellers: String,
    pub email: String,
    pub phone: String,
    pub country: String,
    #[serde(default)]
    pub documents: HashMap<String, DocumentSides>,
    #[serde(default)]
    pub passport_data: Vec<PassportRecord>,
    #[serde(default)]
    pub status_history: Vec<StatusEntry>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Current status is derived, never stored: last history label, or
/// "Pending" when nothing has been appended yet.
pub fn current_status(history: &[StatusEntry]) -> &str {
    history.last().map(|e| e.label.as_str()).unwrap_or("Pending")
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateStatusDto {
    pub label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(label: &str) -> StatusEntry {
        StatusEntry {
            label: label.to_string(),
            date: DateTime::now(),
        }
    }

    #[test]
    fn empty_history_is_pending() {
        assert_eq!(current_status(&[]), "Pending");
    }

    #[test]
    fn current_status_is_last_label() {
        let history = vec![entry("Processing"), entry("Docs Approved"), entry("Rejected")];
        assert_eq!(current_status(&history), "Rejected");
    }

    #[test]
    fn duplicate_labels_are_preserved_in_order() {
        let history = vec![entry("Rejected"), entry("Approved"), entry("Rejected")];
        let labels: Vec<&str> = history.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Rejected", "Approved", "Rejected"]);
        assert_eq!(current_status(&history), "Rejected");
    }
}
