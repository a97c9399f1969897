use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};

use crate::db::DbConn;
use crate::models::{
    check_validity, CreatePromoCodeDto, PromoCode, PromoCodeQueryDto, UpdatePromoCodeDto,
};
use crate::utils::{ApiError, ApiResponse};

fn to_bson_datetime(dt: chrono::DateTime<chrono::Utc>) -> DateTime {
    DateTime::from_millis(dt.timestamp_millis())
}

/// --------------------
/// Create
/// --------------------
#[openapi(tag = "Promo Codes")]
#[post("/promocode/add", data = "<dto>")]
pub async fn create_promo_code(
    db: &State<DbConn>,
    dto: Json<CreatePromoCodeDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let code = dto.code.trim().to_uppercase();
    if code.is_empty() {
        return Err(ApiError::bad_request("Promo code is required"));
    }

    let collection = db.collection::<PromoCode>("promo_codes");

    let existing = collection
        .find_one(doc! { "code": &code }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
    if existing.is_some() {
        return Err(ApiError::bad_request("Promo code already exists"));
    }

    let promo = PromoCode {
        id: None,
        code,
        discount_type: dto.discount_type.clone(),
        discount_value: dto.discount_value,
        max_usage: dto.max_usage.unwrap_or(1),
        used_count: 0,
        valid_from: dto
            .valid_from
            .map(to_bson_datetime)
            .unwrap_or_else(DateTime::now),
        valid_until: to_bson_datetime(dto.valid_until),
        is_active: dto.is_active.unwrap_or(true),
        created_at: DateTime::now(),
        updated_at: DateTime::now(),
    };

    let result = collection
        .insert_one(&promo, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create promo code: {}", e)))?;

    let mut saved = promo;
    saved.id = result.inserted_id.as_object_id();

    Ok(Json(ApiResponse::success(serde_json::json!(saved))))
}

/// --------------------
/// List, newest first
/// --------------------
#[openapi(tag = "Promo Codes")]
#[get("/promocode/getAll")]
pub async fn get_all_promo_codes(
    db: &State<DbConn>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let find_options = FindOptions::builder()
        .sort(doc! { "createdAt": -1 })
        .build();

    let mut cursor = db
        .collection::<PromoCode>("promo_codes")
        .find(doc! {}, find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut promos = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let promo = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        promos.push(promo);
    }

    Ok(Json(ApiResponse::success(serde_json::json!(promos))))
}

/// --------------------
/// Fetch one
/// --------------------
#[openapi(tag = "Promo Codes")]
#[get("/promocode/<id>")]
pub async fn get_promo_code_by_id(
    db: &State<DbConn>,
    id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&id)
        .map_err(|_| ApiError::bad_request("Invalid promo code ID"))?;

    let promo = db
        .collection::<PromoCode>("promo_codes")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Promo code not found"))?;

    Ok(Json(ApiResponse::success(serde_json::json!(promo))))
}

/// --------------------
/// Update
/// --------------------
#[openapi(tag = "Promo Codes")]
#[put("/promocode/<id>", data = "<dto>")]
pub async fn update_promo_code(
    db: &State<DbConn>,
    id: String,
    dto: Json<UpdatePromoCodeDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&id)
        .map_err(|_| ApiError::bad_request("Invalid promo code ID"))?;

    let mut update_doc = doc! { "updatedAt": DateTime::now() };
    if let Some(ref code) = dto.code {
        update_doc.insert("code", code.trim().to_uppercase());
    }
    if let Some(ref discount_type) = dto.discount_type {
        update_doc.insert(
            "discountType",
            mongodb::bson::to_bson(discount_type)
                .map_err(|e| ApiError::internal_error(e.to_string()))?,
        );
    }
    if let Some(discount_value) = dto.discount_value {
        update_doc.insert("discountValue", discount_value);
    }
    if let Some(max_usage) = dto.max_usage {
        update_doc.insert("maxUsage", max_usage);
    }
    if let Some(valid_from) = dto.valid_from {
        update_doc.insert("validFrom", to_bson_datetime(valid_from));
    }
    if let Some(valid_until) = dto.valid_until {
        update_doc.insert("validUntil", to_bson_datetime(valid_until));
    }
    if let Some(is_active) = dto.is_active {
        update_doc.insert("isActive", is_active);
    }

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();

    let promo = db
        .collection::<PromoCode>("promo_codes")
        .find_one_and_update(doc! { "_id": object_id }, doc! { "$set": update_doc }, options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update promo code: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Promo code not found"))?;

    Ok(Json(ApiResponse::success(serde_json::json!(promo))))
}

/// --------------------
/// Delete
/// --------------------
#[openapi(tag = "Promo Codes")]
#[delete("/promocode/<id>")]
pub async fn delete_promo_code(
    db: &State<DbConn>,
    id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&id)
        .map_err(|_| ApiError::bad_request("Invalid promo code ID"))?;

    let result = db
        .collection::<PromoCode>("promo_codes")
        .delete_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to delete promo code: {}", e)))?;

    if result.deleted_count == 0 {
        return Err(ApiError::not_found("Promo code not found"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Promo code deleted successfully"
    }))))
}

/// --------------------
/// Validate (read-only)
/// --------------------
#[openapi(tag = "Promo Codes")]
#[post("/promocode/validate", data = "<dto>")]
pub async fn validate_promo_code(
    db: &State<DbConn>,
    dto: Json<PromoCodeQueryDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let code = dto.code.trim().to_uppercase();

    let promo = db
        .collection::<PromoCode>("promo_codes")
        .find_one(doc! { "code": &code, "isActive": true }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Invalid promo code"))?;

    check_validity(&promo, DateTime::now()).map_err(ApiError::bad_request)?;

    Ok(Json(ApiResponse::success(serde_json::json!(promo))))
}

/// --------------------
/// Redeem (validate + burn one use)
/// --------------------
#[openapi(tag = "Promo Codes")]
#[post("/promocode/redeem", data = "<dto>")]
pub async fn redeem_promo_code(
    db: &State<DbConn>,
    dto: Json<PromoCodeQueryDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let code = dto.code.trim().to_uppercase();
    let now = DateTime::now();

    let collection = db.collection::<PromoCode>("promo_codes");

    // The guarded filter makes the increment atomic: the counter can never
    // pass maxUsage even under concurrent redemptions.
    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();

    let redeemed = collection
        .find_one_and_update(
            doc! {
                "code": &code,
                "isActive": true,
                "$expr": { "$lt": ["$usedCount", "$maxUsage"] },
                "validFrom": { "$lte": now },
                "validUntil": { "$gte": now },
            },
            doc! {
                "$inc": { "usedCount": 1 },
                "$set": { "updatedAt": now },
            },
            options,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to redeem promo code: {}", e)))?;

    match redeemed {
        Some(promo) => Ok(Json(ApiResponse::success(serde_json::json!(promo)))),
        None => {
            // Nothing matched the guard; re-read to report why.
            let promo = collection
                .find_one(doc! { "code": &code, "isActive": true }, None)
                .await
                .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
                .ok_or_else(|| ApiError::not_found("Invalid promo code"))?;

            match check_validity(&promo, now) {
                Err(reason) => Err(ApiError::bad_request(reason)),
                Ok(()) => Err(ApiError::bad_request("Promo code could not be redeemed")),
            }
        }
    }
}
