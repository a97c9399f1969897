use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId, DateTime};

use crate::db::DbConn;
use crate::models::{Admin, AdminLoginDto, AdminSignupDto};
use crate::services::JwtService;
use crate::utils::{validate_email, ApiError, ApiResponse};

/// --------------------
/// Signup
/// --------------------
#[openapi(tag = "Admin")]
#[post("/admin/signup", data = "<dto>")]
pub async fn signup(
    db: &State<DbConn>,
    dto: Json<AdminSignupDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if !validate_email(&dto.email) {
        return Err(ApiError::bad_request("Invalid email"));
    }

    let collection = db.collection::<Admin>("admins");

    let existing = collection
        .find_one(doc! { "email": dto.email.to_lowercase() }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
    if existing.is_some() {
        return Err(ApiError::bad_request("Admin already exists"));
    }

    let hashed = bcrypt::hash(&dto.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::internal_error(format!("Password hashing failed: {}", e)))?;

    let admin = Admin {
        id: None,
        name: dto.name.trim().to_string(),
        email: dto.email.to_lowercase(),
        password: hashed,
        refresh_token: None,
        created_at: DateTime::now(),
    };

    let result = collection
        .insert_one(&admin, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Signup failed: {}", e)))?;

    let admin_id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::internal_error("Invalid admin ID"))?;

    Ok(Json(ApiResponse::success_with_message(
        "Admin created".to_string(),
        serde_json::json!({ "adminId": admin_id.to_hex() }),
    )))
}

/// --------------------
/// Login
/// --------------------
#[openapi(tag = "Admin")]
#[post("/admin/login", data = "<dto>")]
pub async fn login(
    db: &State<DbConn>,
    dto: Json<AdminLoginDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let collection = db.collection::<Admin>("admins");

    let admin = collection
        .find_one(doc! { "email": dto.email.to_lowercase() }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Admin not found"))?;

    let matches = bcrypt::verify(&dto.password, &admin.password)
        .map_err(|e| ApiError::internal_error(format!("Password check failed: {}", e)))?;
    if !matches {
        return Err(ApiError::bad_request("Invalid credentials"));
    }

    let admin_id = admin
        .id
        .ok_or_else(|| ApiError::internal_error("Admin has no id"))?;

    let access_token = JwtService::generate_access_token(&admin_id)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    let refresh_token = JwtService::generate_refresh_token(&admin_id)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    collection
        .update_one(
            doc! { "_id": admin_id },
            doc! { "$set": { "refreshToken": &refresh_token } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(ApiResponse::success_with_message(
        "Login successful".to_string(),
        serde_json::json!({
            "adminId": admin_id.to_hex(),
            "accessToken": access_token,
            "refreshToken": refresh_token,
        }),
    )))
}

#[derive(serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct TokenDto {
    pub token: Option<String>,
}

/// --------------------
/// Logout
/// --------------------
#[openapi(tag = "Admin")]
#[post("/admin/logout", data = "<dto>")]
pub async fn logout(
    db: &State<DbConn>,
    dto: Json<TokenDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let token = dto
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("Token required for logout"))?;

    let claims = JwtService::verify_token(token, true)
        .map_err(|_| ApiError::forbidden("Invalid or expired token"))?;
    let admin_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::forbidden("Invalid or expired token"))?;

    let result = db
        .collection::<Admin>("admins")
        .update_one(
            doc! { "_id": admin_id },
            doc! { "$set": { "refreshToken": null } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Logout failed: {}", e)))?;

    if result.matched_count == 0 {
        return Err(ApiError::not_found("Admin not found"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Logged out successfully"
    }))))
}

/// --------------------
/// Refresh access token
/// --------------------
#[openapi(tag = "Admin")]
#[post("/admin/refresh-token", data = "<dto>")]
pub async fn refresh_access_token(
    db: &State<DbConn>,
    dto: Json<TokenDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let token = dto
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("Refresh token required"))?;

    let claims = JwtService::verify_token(token, true)
        .map_err(|_| ApiError::unauthorized("Refresh token invalid"))?;
    let admin_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::unauthorized("Refresh token invalid"))?;

    // The presented token must still be the one we stored at login.
    let admin = db
        .collection::<Admin>("admins")
        .find_one(doc! { "_id": admin_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    match admin {
        Some(admin) if admin.refresh_token.as_deref() == Some(token) => {
            let access_token = JwtService::generate_access_token(&admin_id)
                .map_err(|e| ApiError::internal_error(e.to_string()))?;

            Ok(Json(ApiResponse::success(serde_json::json!({
                "accessToken": access_token
            }))))
        }
        _ => Err(ApiError::forbidden("Invalid refresh token")),
    }
}
