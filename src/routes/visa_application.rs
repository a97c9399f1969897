use std::collections::HashMap;

use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::serde::json::Json;
use rocket::State;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::options::{FindOneOptions, FindOptions};
use serde::Deserialize;
use rocket_okapi::openapi;

use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::models::{
    current_status, DocumentFile, DocumentSides, PassportRecord, UpdateStatusDto, VisaApplication,
};
use crate::services::storage;
use crate::utils::{ApiError, ApiResponse};

/// Front/back pair as it arrives in the multipart request. Field names are
/// `documents[<docId>][front]` / `documents[<docId>][back]`; anything else
/// under `documents` is ignored by form parsing and never persisted.
#[derive(FromForm)]
pub struct DocumentUpload<'v> {
    pub front: Option<TempFile<'v>>,
    pub back: Option<TempFile<'v>>,
}

#[derive(FromForm)]
pub struct ApplyVisaForm<'v> {
    #[field(name = "visaId")]
    pub visa_id: String,
    pub travellers: String,
    pub email: String,
    pub phone: String,
    pub country: String,
    #[field(name = "paymentId")]
    pub payment_id: Option<String>,
    /// JSON blob: one passport object or an array of them.
    #[field(name = "passportData")]
    pub passport_data: Option<String>,
    /// JSON blob: `[{id, name}]`, used only to resolve display names.
    #[field(name = "documentsMetadata")]
    pub documents_metadata: Option<String>,
    pub documents: HashMap<String, DocumentUpload<'v>>,
}

#[derive(Debug, Deserialize)]
struct DocumentMeta {
    id: String,
    name: String,
}

/// Normalize the client's passport blob to an array. A bare object becomes
/// a one-element array; malformed JSON degrades to empty rather than
/// failing the request (explicit policy, the rest of the form still lands).
fn parse_passport_data(raw: Option<&str>) -> Vec<PassportRecord> {
    let Some(raw) = raw else { return Vec::new() };

    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect(),
        Ok(value @ serde_json::Value::Object(_)) => serde_json::from_value(value)
            .map(|record| vec![record])
            .unwrap_or_default(),
        Ok(_) | Err(_) => {
            warn!("Failed to parse passportData, storing empty array");
            Vec::new()
        }
    }
}

fn parse_documents_metadata(raw: Option<&str>) -> Vec<DocumentMeta> {
    raw.and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default()
}

/// Display name for a stored file: the catalog name from the metadata blob
/// when the document id is known, the original file name otherwise.
fn resolve_file_name(metadata: &[DocumentMeta], doc_id: &str, original: &str) -> String {
    metadata
        .iter()
        .find(|m| m.id == doc_id)
        .map(|m| m.name.clone())
        .unwrap_or_else(|| original.to_string())
}

/// --------------------
/// Submit an application
/// --------------------
#[post("/VisaApplication/apply-visa", data = "<form>")]
pub async fn apply_visa(
    db: &State<DbConn>,
    _auth: AuthGuard,
    mut form: Form<ApplyVisaForm<'_>>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let passport_data = parse_passport_data(form.passport_data.as_deref());
    let metadata = parse_documents_metadata(form.documents_metadata.as_deref());

    if form.documents.is_empty() {
        info!("No document files received to process");
    }

    let mut documents: HashMap<String, DocumentSides> = HashMap::new();

    let uploads = std::mem::take(&mut form.documents);
    for (doc_id, mut upload) in uploads {
        let mut sides = DocumentSides::default();

        if let Some(file) = upload.front.as_mut() {
            let stored = storage::save_document_upload(file, "visa-documents")
                .await
                .map_err(ApiError::internal_error)?;
            sides.front = Some(DocumentFile {
                url: stored.url,
                file_name: resolve_file_name(&metadata, &doc_id, &stored.file_name),
            });
        }
        if let Some(file) = upload.back.as_mut() {
            let stored = storage::save_document_upload(file, "visa-documents")
                .await
                .map_err(ApiError::internal_error)?;
            sides.back = Some(DocumentFile {
                url: stored.url,
                file_name: resolve_file_name(&metadata, &doc_id, &stored.file_name),
            });
        }

        if sides.front.is_some() || sides.back.is_some() {
            documents.insert(doc_id, sides);
        }
    }

    let application = VisaApplication {
        id: None,
        visa_id: form.visa_id.clone(),
        payment_id: form.payment_id.clone(),
        travellers: form.travellers.clone(),
        email: form.email.clone(),
        phone: form.phone.clone(),
        country: form.country.clone(),
        documents,
        passport_data,
        status_history: Vec::new(),
        created_at: DateTime::now(),
        updated_at: DateTime::now(),
    };

    let result = db
        .collection::<VisaApplication>("visa_applications")
        .insert_one(&application, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to save application: {}", e)))?;

    let mut saved = application;
    saved.id = result.inserted_id.as_object_id();

    Ok(Json(ApiResponse::success_with_message(
        "Visa application created successfully.".to_string(),
        serde_json::json!({ "visaApplication": saved }),
    )))
}

/// --------------------
/// List all applications, newest first
/// --------------------
#[openapi(tag = "Visa Applications")]
#[get("/VisaApplication/GetAll")]
pub async fn get_all(
    db: &State<DbConn>,
    _auth: AuthGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let find_options = FindOptions::builder()
        .sort(doc! { "createdAt": -1 })
        .build();

    let mut cursor = db
        .collection::<VisaApplication>("visa_applications")
        .find(doc! {}, find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut applications = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let app = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        applications.push(app);
    }

    Ok(Json(ApiResponse::success_with_message(
        "Visa applications fetched successfully".to_string(),
        serde_json::json!(applications),
    )))
}

/// --------------------
/// Append to the status history
/// --------------------
#[openapi(tag = "Visa Applications")]
#[post("/VisaApplication/visa-status/<id>", data = "<dto>")]
pub async fn update_status(
    db: &State<DbConn>,
    _auth: AuthGuard,
    id: String,
    dto: Json<UpdateStatusDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let label = dto
        .label
        .as_deref()
        .filter(|l| !l.is_empty())
        .ok_or_else(|| ApiError::bad_request("Status label is required."))?;

    let object_id = ObjectId::parse_str(&id)
        .map_err(|_| ApiError::bad_request("Invalid application ID"))?;

    let collection = db.collection::<VisaApplication>("visa_applications");

    // $push keeps the append atomic; concurrent appends both land.
    let result = collection
        .update_one(
            doc! { "_id": object_id },
            doc! {
                "$push": { "statusHistory": { "label": label, "date": DateTime::now() } },
                "$set": { "updatedAt": DateTime::now() }
            },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update status: {}", e)))?;

    if result.matched_count == 0 {
        return Err(ApiError::not_found("Visa application not found."));
    }

    let application = collection
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Visa application not found."))?;

    Ok(Json(ApiResponse::success_with_message(
        "Status updated successfully.".to_string(),
        serde_json::json!({ "statusHistory": application.status_history }),
    )))
}

/// --------------------
/// Fetch one application (status history excluded)
/// --------------------
#[openapi(tag = "Visa Applications")]
#[get("/VisaApplication/getById/<id>")]
pub async fn get_by_id(
    db: &State<DbConn>,
    _auth: AuthGuard,
    id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&id)
        .map_err(|_| ApiError::bad_request("Invalid application ID"))?;

    let options = FindOneOptions::builder()
        .projection(doc! { "statusHistory": 0 })
        .build();

    let application = db
        .collection::<VisaApplication>("visa_applications")
        .find_one(doc! { "_id": object_id }, options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Visa application not found"))?;

    Ok(Json(ApiResponse::success(serde_json::json!(application))))
}

/// --------------------
/// Applications for a phone (documents & history trimmed off)
/// --------------------
#[openapi(tag = "Visa Applications")]
#[get("/VisaApplication/getby/byPhone?<phone>")]
pub async fn get_by_phone_query(
    db: &State<DbConn>,
    _auth: AuthGuard,
    phone: Option<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let phone = phone
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::bad_request("Phone number is required in query params."))?;

    let find_options = FindOptions::builder()
        .sort(doc! { "createdAt": -1 })
        .projection(doc! { "documents": 0, "statusHistory": 0 })
        .build();

    let mut cursor = db
        .collection::<VisaApplication>("visa_applications")
        .find(doc! { "phone": &phone }, find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut applications = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let app = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        applications.push(app);
    }

    Ok(Json(ApiResponse::success_with_message(
        format!("Visa applications for phone {} fetched successfully.", phone),
        serde_json::json!(applications),
    )))
}

/// --------------------
/// Status history by payment id
/// --------------------
#[openapi(tag = "Visa Applications")]
#[get("/VisaApplication/status/<payment_id>")]
pub async fn status_by_payment_id(
    db: &State<DbConn>,
    _auth: AuthGuard,
    payment_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let application = db
        .collection::<VisaApplication>("visa_applications")
        .find_one(doc! { "paymentId": &payment_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Visa application not found."))?;

    Ok(Json(ApiResponse::success_with_message(
        format!("Status history for payment ID {} fetched successfully.", payment_id),
        serde_json::json!({ "statusHistory": application.status_history }),
    )))
}

/// --------------------
/// Does an application exist for this payment?
/// --------------------
#[openapi(tag = "Visa Applications")]
#[get("/VisaApplication/getbyPaymentID/<payment_id>")]
pub async fn exists_by_payment_id(
    db: &State<DbConn>,
    _auth: AuthGuard,
    payment_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let count = db
        .collection::<VisaApplication>("visa_applications")
        .count_documents(doc! { "paymentId": &payment_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    if count == 0 {
        return Err(ApiError::not_found("No application for this payment ID"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({ "exists": true }))))
}

async fn find_by_phone_and_label(
    db: &DbConn,
    phone: &str,
    label: &str,
) -> Result<Vec<VisaApplication>, ApiError> {
    let filter = doc! {
        "phone": phone,
        "statusHistory": {
            "$elemMatch": {
                "label": { "$regex": format!("^{}$", label), "$options": "i" }
            }
        }
    };

    let mut cursor = db
        .collection::<VisaApplication>("visa_applications")
        .find(filter, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut applications = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let app = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        applications.push(app);
    }

    Ok(applications)
}

/// --------------------
/// Ever-rejected applications for a phone
/// --------------------
#[openapi(tag = "Visa Applications")]
#[get("/VisaApplication/rejected/<phone>")]
pub async fn rejected_by_phone(
    db: &State<DbConn>,
    _auth: AuthGuard,
    phone: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let applications = find_by_phone_and_label(db, &phone, "rejected").await?;
    Ok(Json(ApiResponse::success(serde_json::json!(applications))))
}

/// --------------------
/// Ever-approved applications for a phone
/// --------------------
#[openapi(tag = "Visa Applications")]
#[get("/VisaApplication/approved/<phone>")]
pub async fn approved_by_phone(
    db: &State<DbConn>,
    _auth: AuthGuard,
    phone: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let applications = find_by_phone_and_label(db, &phone, "approved").await?;
    Ok(Json(ApiResponse::success(serde_json::json!(applications))))
}

/// --------------------
/// All applications for a phone, full records
/// --------------------
#[openapi(tag = "Visa Applications")]
#[get("/VisaApplication/by-phone/<phone>")]
pub async fn by_phone(
    db: &State<DbConn>,
    _auth: AuthGuard,
    phone: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let mut cursor = db
        .collection::<VisaApplication>("visa_applications")
        .find(doc! { "phone": &phone }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut applications = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let app = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        applications.push(app);
    }

    if applications.is_empty() {
        return Err(ApiError::not_found("No records found for this phone number"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!(applications))))
}

/// --------------------
/// Status history by application id
/// --------------------
#[openapi(tag = "Visa Applications")]
#[get("/VisaApplication/status-history/<id>")]
pub async fn status_history(
    db: &State<DbConn>,
    _auth: AuthGuard,
    id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&id)
        .map_err(|_| ApiError::bad_request("Invalid application ID"))?;

    let application = db
        .collection::<VisaApplication>("visa_applications")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Record not found with this ID"))?;

    Ok(Json(ApiResponse::success(serde_json::json!(
        application.status_history
    ))))
}

/// --------------------
/// Dashboard counters by derived current status
/// --------------------
#[openapi(tag = "Visa Applications")]
#[get("/VisaApplication/stats")]
pub async fn stats(
    db: &State<DbConn>,
    _auth: AuthGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let mut cursor = db
        .collection::<VisaApplication>("visa_applications")
        .find(doc! {}, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut total: u64 = 0;
    let mut approved: u64 = 0;
    let mut rejected: u64 = 0;
    let mut pending: u64 = 0;

    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let app: VisaApplication = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;

        total += 1;
        match current_status(&app.status_history).to_lowercase().as_str() {
            "approved" => approved += 1,
            "rejected" => rejected += 1,
            _ => pending += 1,
        }
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "totalApplications": total,
        "approved": approved,
        "rejected": rejected,
        "pending": pending,
    }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passport_array_parses_in_order() {
        let raw = r#"[
            {"travellerIndex": 0, "passportNumber": "A1234567", "surname": "KAUR"},
            {"travellerIndex": 1, "passportNumber": "B7654321", "surname": "SINGH"}
        ]"#;
        let records = parse_passport_data(Some(raw));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].passport_number.as_deref(), Some("A1234567"));
        assert_eq!(records[1].traveller_index, Some(1));
    }

    #[test]
    fn single_passport_object_becomes_one_element_array() {
        let raw = r#"{"passportNumber": "A1234567", "nationality": "IND"}"#;
        let records = parse_passport_data(Some(raw));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].nationality.as_deref(), Some("IND"));
    }

    #[test]
    fn malformed_passport_json_degrades_to_empty() {
        assert!(parse_passport_data(Some("{not json")).is_empty());
        assert!(parse_passport_data(Some("42")).is_empty());
        assert!(parse_passport_data(None).is_empty());
    }

    #[test]
    fn metadata_resolves_display_name_with_filename_fallback() {
        let metadata = parse_documents_metadata(Some(
            r#"[{"id": "passport", "name": "Passport (front & back)"}]"#,
        ));
        assert_eq!(
            resolve_file_name(&metadata, "passport", "IMG_0042.jpg"),
            "Passport (front & back)"
        );
        assert_eq!(
            resolve_file_name(&metadata, "bank-statement", "statement.pdf"),
            "statement.pdf"
        );
    }

    #[test]
    fn malformed_metadata_degrades_to_empty() {
        assert!(parse_documents_metadata(Some("oops")).is_empty());
        assert!(parse_documents_metadata(None).is_empty());
    }

    // Form-layer contract: only fields shaped `documents[<id>][front|back]`
    // land in the documents map; anything else is dropped silently.
    #[rocket::post("/parse-documents", data = "<form>")]
    fn parse_documents(form: Form<ApplyVisaForm<'_>>) -> String {
        let mut sides: Vec<String> = form
            .documents
            .iter()
            .flat_map(|(id, upload)| {
                let mut found = Vec::new();
                if upload.front.is_some() {
                    found.push(format!("{}.front", id));
                }
                if upload.back.is_some() {
                    found.push(format!("{}.back", id));
                }
                found
            })
            .collect();
        sides.sort();
        sides.join(",")
    }

    fn multipart_body(boundary: &str) -> String {
        let mut body = String::new();
        let text_fields = [
            ("visaId", "cfg-1"),
            ("travellers", "2"),
            ("email", "a@b.com"),
            ("phone", "9999999999"),
            ("country", "France"),
        ];
        for (name, value) in text_fields {
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                boundary, name, value
            ));
        }
        let file_fields = [
            "documents[passport][front]",
            "documents[bank][back]",
            // None of these match the front/back shape.
            "documents[passport][selfie]",
            "paperwork[passport][front]",
            "documents[pan][front][extra]",
        ];
        for name in file_fields {
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"f.jpg\"\r\n\
                 Content-Type: image/jpeg\r\n\r\nfilebytes\r\n",
                boundary, name
            ));
        }
        body.push_str(&format!("--{}--\r\n", boundary));
        body
    }

    #[test]
    fn only_front_back_shaped_document_fields_are_kept() {
        use rocket::http::{Header, Status};
        use rocket::local::blocking::Client;

        let client = Client::untracked(
            rocket::build().mount("/", rocket::routes![parse_documents]),
        )
        .expect("valid rocket instance");

        let boundary = "X-FORM-BOUNDARY";
        let response = client
            .post("/parse-documents")
            .header(Header::new(
                "Content-Type",
                format!("multipart/form-data; boundary={}", boundary),
            ))
            .body(multipart_body(boundary))
            .dispatch();

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().unwrap(), "bank.back,passport.front");
    }
}
