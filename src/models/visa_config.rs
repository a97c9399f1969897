use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

/// One purchasable visa product for a country (fee, validity, processing).
#[derive(Debug, Default, Serialize, Deserialize, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisaType {
    pub id: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub code: Option<String>,
    pub entries: Option<String>,
    pub biometric_required: Option<bool>,
    pub interview_required: Option<bool>,
    pub processing_method: Option<String>,
    pub processing_time: Option<String>,
    pub stay_duration: Option<String>,
    pub validity: Option<String>,
    pub visa_fee: Option<f64>,
    pub currency: Option<String>,
    pub service_fee: Option<f64>,
    pub notes: Option<String>,
}

/// Required document, as presented by the upload wizard. Its `id` is the
/// key the intake flow uses for `documents[<id>][front|back]` fields.
#[derive(Debug, Default, Serialize, Deserialize, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSpec {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub format: Option<String>,
    pub example: Option<String>,
    pub is_mandatory: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectionReason {
    pub id: Option<String>,
    pub reason: Option<String>,
    pub description: Option<String>,
    pub frequency: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountryDetails {
    pub code: Option<String>,
    pub name: Option<String>,
    pub embassy_location: Option<String>,
    pub general_requirements: Option<String>,
}

/// Per-country visa catalog entry consumed by the booking flow.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VisaConfig {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub continent: String,
    pub country_details: CountryDetails,
    pub visa_types: Vec<VisaType>,
    pub documents: Vec<DocumentSpec>,
    pub eligibility: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub rejection_reasons: Vec<RejectionReason>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Card shown on the country-listing page: first image, first visa type's
/// combined fee and processing time.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisaSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub image: String,
    pub total_fee: f64,
    pub processing_time: String,
}

impl VisaSummary {
    pub fn from_config(config: &VisaConfig) -> Self {
        let first = config.visa_types.first();
        let visa_fee = first.and_then(|v| v.visa_fee).unwrap_or(0.0);
        let service_fee = first.and_then(|v| v.service_fee).unwrap_or(0.0);

        VisaSummary {
            id: config.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: config.country_details.name.clone().unwrap_or_default(),
            image: config.images.first().cloned().unwrap_or_default(),
            total_fee: visa_fee + service_fee,
            processing_time: first
                .and_then(|v| v.processing_time.clone())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_adds_visa_and_service_fee_of_first_type() {
        let config = VisaConfig {
            id: None,
            continent: "Europe".to_string(),
            country_details: CountryDetails {
                name: Some("France".to_string()),
                ..Default::default()
            },
            visa_types: vec![
                VisaType {
                    visa_fee: Some(4500.0),
                    service_fee: Some(999.0),
                    processing_time: Some("7-10 days".to_string()),
                    ..Default::default()
                },
                VisaType {
                    visa_fee: Some(9000.0),
                    ..Default::default()
                },
            ],
            documents: vec![],
            eligibility: String::new(),
            images: vec!["/uploads/visa-images/paris.jpg".to_string()],
            rejection_reasons: vec![],
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        };

        let summary = VisaSummary::from_config(&config);
        assert_eq!(summary.name, "France");
        assert_eq!(summary.total_fee, 5499.0);
        assert_eq!(summary.processing_time, "7-10 days");
        assert_eq!(summary.image, "/uploads/visa-images/paris.jpg");
    }

    #[test]
    fn summary_defaults_when_catalog_entry_is_bare() {
        let config = VisaConfig {
            id: None,
            continent: "Asia".to_string(),
            country_details: CountryDetails::default(),
            visa_types: vec![],
            documents: vec![],
            eligibility: String::new(),
            images: vec![],
            rejection_reasons: vec![],
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        };

        let summary = VisaSummary::from_config(&config);
        assert_eq!(summary.total_fee, 0.0);
        assert_eq!(summary.name, "");
        assert_eq!(summary.image, "");
    }
}
