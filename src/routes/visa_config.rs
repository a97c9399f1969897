use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::options::FindOneOptions;

use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::models::{
    CountryDetails, DocumentSpec, RejectionReason, VisaConfig, VisaSummary, VisaType,
};
use crate::services::storage;
use crate::utils::{ApiError, ApiResponse};

const MAX_IMAGES: usize = 5;

#[derive(FromForm)]
pub struct VisaConfigForm<'v> {
    pub continent: String,
    /// JSON blobs; malformed input degrades to defaults rather than
    /// failing the whole submission.
    #[field(name = "countryDetails")]
    pub country_details: String,
    #[field(name = "visaTypes")]
    pub visa_types: String,
    pub documents: String,
    pub eligibility: String,
    #[field(name = "rejectionReasons")]
    pub rejection_reasons: Option<String>,
    pub images: Vec<TempFile<'v>>,
}

fn parse_lenient<T: serde::de::DeserializeOwned + Default>(raw: &str) -> T {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Failed to parse config blob, using default: {}", e);
        T::default()
    })
}

async fn save_images(files: &mut [TempFile<'_>]) -> Result<Vec<String>, ApiError> {
    let mut urls = Vec::with_capacity(files.len());
    for file in files.iter_mut() {
        let stored = storage::save_image_upload(file, "visa-images")
            .await
            .map_err(ApiError::internal_error)?;
        urls.push(stored.url);
    }
    Ok(urls)
}

/// --------------------
/// Create a catalog entry (multipart, up to 5 images)
/// --------------------
#[post("/configurations/add", data = "<form>")]
pub async fn add_config(
    db: &State<DbConn>,
    _auth: AuthGuard,
    mut form: Form<VisaConfigForm<'_>>,
) -> Result<Json<ApiResponse<VisaConfig>>, ApiError> {
    if form.images.is_empty() {
        return Err(ApiError::bad_request("No files uploaded"));
    }
    if form.images.len() > MAX_IMAGES {
        return Err(ApiError::bad_request("At most 5 images are allowed"));
    }

    let country_details: CountryDetails = parse_lenient(&form.country_details);
    let visa_types: Vec<VisaType> = parse_lenient(&form.visa_types);
    let documents: Vec<DocumentSpec> = parse_lenient(&form.documents);
    let rejection_reasons: Vec<RejectionReason> = form
        .rejection_reasons
        .as_deref()
        .map(parse_lenient)
        .unwrap_or_default();

    let images = save_images(&mut form.images).await?;

    let config = VisaConfig {
        id: None,
        continent: form.continent.clone(),
        country_details,
        visa_types,
        documents,
        eligibility: form.eligibility.clone(),
        images,
        rejection_reasons,
        created_at: DateTime::now(),
        updated_at: DateTime::now(),
    };

    let result = db
        .collection::<VisaConfig>("visa_configs")
        .insert_one(&config, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create visa config: {}", e)))?;

    let mut saved = config;
    saved.id = result.inserted_id.as_object_id();

    Ok(Json(ApiResponse::success(saved)))
}

/// --------------------
/// Country cards for the listing page
/// --------------------
#[openapi(tag = "Visa Configurations")]
#[get("/configurations/visa-summaries")]
pub async fn visa_summaries(
    db: &State<DbConn>,
) -> Result<Json<ApiResponse<Vec<VisaSummary>>>, ApiError> {
    let mut cursor = db
        .collection::<VisaConfig>("visa_configs")
        .find(doc! {}, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut summaries = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let config: VisaConfig = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        summaries.push(VisaSummary::from_config(&config));
    }

    Ok(Json(ApiResponse::success(summaries)))
}

/// --------------------
/// Full catalog dump
/// --------------------
#[openapi(tag = "Visa Configurations")]
#[get("/configurations/getAll")]
pub async fn get_all_configs(
    db: &State<DbConn>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let mut cursor = db
        .collection::<VisaConfig>("visa_configs")
        .find(doc! {}, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut configs = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let config = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        configs.push(config);
    }

    Ok(Json(ApiResponse::success(serde_json::json!(configs))))
}

async fn find_config(db: &DbConn, id: &str) -> Result<VisaConfig, ApiError> {
    let object_id = ObjectId::parse_str(id)
        .map_err(|_| ApiError::bad_request("Invalid visa config ID"))?;

    db.collection::<VisaConfig>("visa_configs")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Visa submission not found"))
}

/// --------------------
/// Images only
/// --------------------
#[openapi(tag = "Visa Configurations")]
#[get("/configurations/images/<id>")]
pub async fn get_images(
    db: &State<DbConn>,
    id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let config = find_config(db, &id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "images": config.images
    }))))
}

/// --------------------
/// Booking view (heavy fields excluded)
/// --------------------
#[openapi(tag = "Visa Configurations")]
#[get("/configurations/getById/<id>")]
pub async fn get_by_id(
    db: &State<DbConn>,
    id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&id)
        .map_err(|_| ApiError::bad_request("Invalid visa config ID"))?;

    let options = FindOneOptions::builder()
        .projection(doc! {
            "images": 0,
            "documents": 0,
            "eligibility": 0,
            "rejectionReasons": 0,
        })
        .build();

    let config = db
        .collection::<mongodb::bson::Document>("visa_configs")
        .find_one(doc! { "_id": object_id }, options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Visa submission not found"))?;

    Ok(Json(ApiResponse::success(serde_json::json!(config))))
}

/// --------------------
/// Country name + document names + eligibility
/// --------------------
#[openapi(tag = "Visa Configurations")]
#[get("/configurations/essential/<id>")]
pub async fn get_essential_details(
    db: &State<DbConn>,
    id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let config = find_config(db, &id).await?;

    let country_name = config.country_details.name.clone().unwrap_or_default();
    let document_names: Vec<String> = config
        .documents
        .iter()
        .filter_map(|d| d.name.clone())
        .collect();

    let eligibility = if config.eligibility.is_empty() {
        "Eligibility not specified".to_string()
    } else {
        config.eligibility.clone()
    };

    Ok(Json(ApiResponse::success(serde_json::json!({
        "countryName": country_name,
        "documentNames": document_names,
        "eligibility": eligibility,
    }))))
}

/// --------------------
/// Rejection reasons only
/// --------------------
#[openapi(tag = "Visa Configurations")]
#[get("/configurations/rejection-reasons/<id>")]
pub async fn get_rejection_reasons(
    db: &State<DbConn>,
    id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let config = find_config(db, &id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "rejectionReasons": config.rejection_reasons
    }))))
}

/// --------------------
/// Required-documents list for the upload wizard
/// --------------------
#[openapi(tag = "Visa Configurations")]
#[get("/configurations/documents/<id>")]
pub async fn get_documents(
    db: &State<DbConn>,
    id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let config = find_config(db, &id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "documents": config.documents
    }))))
}

/// --------------------
/// Update (images replaced only when new ones arrive)
/// --------------------
#[put("/configurations/update/<id>", data = "<form>")]
pub async fn update_config(
    db: &State<DbConn>,
    _auth: AuthGuard,
    id: String,
    mut form: Form<VisaConfigForm<'_>>,
) -> Result<Json<ApiResponse<VisaConfig>>, ApiError> {
    if form.images.len() > MAX_IMAGES {
        return Err(ApiError::bad_request("At most 5 images are allowed"));
    }

    let object_id = ObjectId::parse_str(&id)
        .map_err(|_| ApiError::bad_request("Invalid visa config ID"))?;

    let country_details: CountryDetails = parse_lenient(&form.country_details);
    let visa_types: Vec<VisaType> = parse_lenient(&form.visa_types);
    let documents: Vec<DocumentSpec> = parse_lenient(&form.documents);
    let rejection_reasons: Vec<RejectionReason> = form
        .rejection_reasons
        .as_deref()
        .map(parse_lenient)
        .unwrap_or_default();

    let mut update_doc = doc! {
        "continent": &form.continent,
        "countryDetails": mongodb::bson::to_bson(&country_details)
            .map_err(|e| ApiError::internal_error(e.to_string()))?,
        "visaTypes": mongodb::bson::to_bson(&visa_types)
            .map_err(|e| ApiError::internal_error(e.to_string()))?,
        "documents": mongodb::bson::to_bson(&documents)
            .map_err(|e| ApiError::internal_error(e.to_string()))?,
        "eligibility": &form.eligibility,
        "rejectionReasons": mongodb::bson::to_bson(&rejection_reasons)
            .map_err(|e| ApiError::internal_error(e.to_string()))?,
        "updatedAt": DateTime::now(),
    };

    if !form.images.is_empty() {
        let images = save_images(&mut form.images).await?;
        update_doc.insert("images", images);
    }

    let options = mongodb::options::FindOneAndUpdateOptions::builder()
        .return_document(mongodb::options::ReturnDocument::After)
        .build();

    let config = db
        .collection::<VisaConfig>("visa_configs")
        .find_one_and_update(doc! { "_id": object_id }, doc! { "$set": update_doc }, options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update visa config: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Visa submission not found"))?;

    Ok(Json(ApiResponse::success(config)))
}

/// --------------------
/// Delete (stored images removed best-effort)
/// --------------------
#[openapi(tag = "Visa Configurations")]
#[delete("/configurations/delete/<id>")]
pub async fn delete_config(
    db: &State<DbConn>,
    _auth: AuthGuard,
    id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&id)
        .map_err(|_| ApiError::bad_request("Invalid visa config ID"))?;
    let config = find_config(db, &id).await?;

    for image in &config.images {
        let path = image.trim_start_matches('/');
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("Failed to remove image {}: {}", path, e);
        }
    }

    db.collection::<VisaConfig>("visa_configs")
        .delete_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to delete visa config: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Visa submission deleted successfully"
    }))))
}
