use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub phone_number: String,
    pub email: String,
    /// bcrypt hash, never serialized back to clients.
    pub password: String,
    pub is_verified: bool,
    /// Assigned applications, by their catalog `visaId` string.
    pub visa_ids: Vec<String>,
    pub points: i64,
    pub refresh_token: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSignupDto {
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EmployeeLoginDto {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmployeeDto {
    pub is_verified: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddVisaIdDto {
    pub visa_id: Option<String>,
}

/// Public shape for employee listings: password and refresh token omitted.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeResponse {
    pub id: String,
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub is_verified: bool,
    pub visa_ids: Vec<String>,
    pub points: i64,
}

impl From<Employee> for EmployeeResponse {
    fn from(e: Employee) -> Self {
        EmployeeResponse {
            id: e.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: e.name,
            phone_number: e.phone_number,
            email: e.email,
            is_verified: e.is_verified,
            visa_ids: e.visa_ids,
            points: e.points,
        }
    }
}
