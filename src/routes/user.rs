use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, DateTime};
use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::models::{PhoneLoginDto, SendOtpDto, User, UserResponse, VerifyOtpDto};
use crate::services::{JwtService, OtpError, OtpStore, SmsService};
use crate::utils::{generate_otp, validate_mobile, ApiError, ApiResponse};

const OTP_WINDOW_MS: i64 = 10 * 60 * 1000;
const OTP_LIMIT: i32 = 3;

/// --------------------
/// Rate limiter helper
/// --------------------
async fn rate_limit(
    db: &DbConn,
    key: &str,
    limit: i32,
    window_ms: i64,
) -> Result<(), ApiError> {
    let now = chrono::Utc::now().timestamp_millis();
    let window_expires = DateTime::from_millis(now + window_ms);

    let collection = db.collection::<mongodb::bson::Document>("rate_limits");

    let doc = collection
        .find_one(doc! { "key": key }, None)
        .await
        .map_err(|_| ApiError::internal_error("Rate limiter lookup failed"))?;

    match doc {
        // First request OR expired window
        None => {
            collection
                .insert_one(
                    doc! {
                        "key": key,
                        "count": 1,
                        "expires_at": window_expires
                    },
                    None,
                )
                .await
                .map_err(|_| ApiError::internal_error("Rate limiter insert failed"))?;
            Ok(())
        }

        Some(d) => {
            let count = d.get_i32("count").unwrap_or(0);
            let expires_at = d.get_datetime("expires_at").ok();

            // Window expired → reset
            if expires_at.map(|e| *e < DateTime::now()).unwrap_or(true) {
                collection
                    .update_one(
                        doc! { "key": key },
                        doc! {
                            "$set": {
                                "count": 1,
                                "expires_at": window_expires
                            }
                        },
                        None,
                    )
                    .await
                    .map_err(|_| ApiError::internal_error("Rate limiter reset failed"))?;
                return Ok(());
            }

            if count >= limit {
                return Err(ApiError::too_many_requests(
                    "Too many requests. Please try later.",
                ));
            }

            collection
                .update_one(
                    doc! { "key": key },
                    doc! { "$inc": { "count": 1 } },
                    None,
                )
                .await
                .map_err(|_| ApiError::internal_error("Rate limiter increment failed"))?;

            Ok(())
        }
    }
}

/// Find-or-create by phone, then issue both tokens and persist the refresh
/// token on the user document.
async fn login_or_signup(
    db: &DbConn,
    phone_number: &str,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let users = db.collection::<User>("users");

    let existing = users
        .find_one(doc! { "phoneNumber": phone_number }, None)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    let (user, is_new_user) = match existing {
        Some(u) => (u, false),
        None => {
            let user = User::new(phone_number);
            let res = users
                .insert_one(&user, None)
                .await
                .map_err(|e| ApiError::internal_error(e.to_string()))?;

            let mut u = user;
            u.id = res.inserted_id.as_object_id();
            info!("New user created for {}", phone_number);
            (u, true)
        }
    };

    let user_id = user
        .id
        .ok_or_else(|| ApiError::internal_error("User has no id"))?;

    let access_token = JwtService::generate_access_token(&user_id)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    let refresh_token = JwtService::generate_refresh_token(&user_id)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    users
        .update_one(
            doc! { "_id": user_id },
            doc! { "$set": { "refreshToken": &refresh_token } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": if is_new_user { "Registration successful" } else { "User logged in successfully" },
        "isNewUser": is_new_user,
        "user": UserResponse::from(user),
        "accessToken": access_token,
        "refreshToken": refresh_token
    }))))
}

/// --------------------
/// Send OTP
/// --------------------
#[openapi(tag = "User")]
#[post("/User/send-otp", data = "<dto>")]
pub async fn send_otp(
    db: &State<DbConn>,
    otp_store: &State<OtpStore>,
    dto: Json<SendOtpDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if !validate_mobile(&dto.phone_number) {
        return Err(ApiError::bad_request("Phone number is required"));
    }

    rate_limit(
        db,
        &format!("send_otp:{}", dto.phone_number),
        OTP_LIMIT,
        OTP_WINDOW_MS,
    )
    .await?;

    let otp = generate_otp();

    SmsService::send_otp(&dto.phone_number, &otp)
        .await
        .map_err(|e| {
            error!("Failed to send OTP to {}: {}", dto.phone_number, e);
            ApiError::internal_error("Failed to send OTP")
        })?;

    // Only record the code once the gateway accepted the message.
    otp_store.put(&dto.phone_number, &otp);

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "OTP sent successfully"
    }))))
}

/// --------------------
/// Verify OTP + Login
/// --------------------
#[openapi(tag = "User")]
#[post("/User/verify-otp", data = "<dto>")]
pub async fn verify_otp(
    db: &State<DbConn>,
    otp_store: &State<OtpStore>,
    dto: Json<VerifyOtpDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if dto.phone_number.is_empty() || dto.otp.is_empty() {
        return Err(ApiError::bad_request("Phone number and OTP are required"));
    }

    otp_store.verify(&dto.phone_number, &dto.otp).map_err(|e| match e {
        OtpError::Mismatch => ApiError::unauthorized(e.message()),
        _ => ApiError::bad_request(e.message()),
    })?;

    login_or_signup(db, &dto.phone_number).await
}

/// --------------------
/// Direct login / signup by phone
/// --------------------
#[openapi(tag = "User")]
#[post("/User/login", data = "<dto>")]
pub async fn login(
    db: &State<DbConn>,
    dto: Json<PhoneLoginDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if dto.phone_number.is_empty() {
        return Err(ApiError::bad_request("Phone number is required"));
    }

    login_or_signup(db, &dto.phone_number).await
}

#[derive(serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogoutDto {
    pub refresh_token: Option<String>,
}

/// --------------------
/// Logout (clear stored refresh token)
/// --------------------
#[openapi(tag = "User")]
#[post("/User/logout", data = "<dto>")]
pub async fn logout(
    db: &State<DbConn>,
    _auth: AuthGuard,
    dto: Json<LogoutDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let token = dto
        .refresh_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("Refresh token is required for logout"))?;

    let result = db
        .collection::<User>("users")
        .update_one(
            doc! { "refreshToken": token },
            doc! { "$set": { "refreshToken": null } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    if result.matched_count == 0 {
        return Err(ApiError::bad_request("Invalid refresh token"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "User logged out successfully"
    }))))
}
