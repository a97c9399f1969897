use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId, DateTime};

use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::models::{
    AddVisaIdDto, Employee, EmployeeLoginDto, EmployeeResponse, EmployeeSignupDto,
    VerifyEmployeeDto, VisaApplication,
};
use crate::services::JwtService;
use crate::utils::{validate_email, ApiError, ApiResponse};

/// --------------------
/// Signup
/// --------------------
#[openapi(tag = "Employee")]
#[post("/employee/signup", data = "<dto>")]
pub async fn signup(
    db: &State<DbConn>,
    dto: Json<EmployeeSignupDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if !validate_email(&dto.email) {
        return Err(ApiError::bad_request("Invalid email"));
    }

    let collection = db.collection::<Employee>("employees");

    let existing = collection
        .find_one(doc! { "email": dto.email.to_lowercase() }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;
    if existing.is_some() {
        return Err(ApiError::bad_request("Email already registered"));
    }

    let hashed = bcrypt::hash(&dto.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::internal_error(format!("Password hashing failed: {}", e)))?;

    let employee = Employee {
        id: None,
        name: dto.name.trim().to_string(),
        phone_number: dto.phone_number.trim().to_string(),
        email: dto.email.to_lowercase(),
        password: hashed,
        is_verified: false,
        visa_ids: Vec::new(),
        points: 0,
        refresh_token: None,
        created_at: DateTime::now(),
        updated_at: DateTime::now(),
    };

    let result = collection
        .insert_one(&employee, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Signup failed: {}", e)))?;

    let employee_id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::internal_error("Invalid employee ID"))?;

    Ok(Json(ApiResponse::success_with_message(
        "Employee registered successfully".to_string(),
        serde_json::json!({
            "employee": {
                "id": employee_id.to_hex(),
                "name": employee.name,
                "email": employee.email,
            }
        }),
    )))
}

/// --------------------
/// Login
/// --------------------
#[openapi(tag = "Employee")]
#[post("/employee/login", data = "<dto>")]
pub async fn login(
    db: &State<DbConn>,
    dto: Json<EmployeeLoginDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let collection = db.collection::<Employee>("employees");

    let employee = collection
        .find_one(doc! { "email": dto.email.to_lowercase() }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Employee not found"))?;

    let matches = bcrypt::verify(&dto.password, &employee.password)
        .map_err(|e| ApiError::internal_error(format!("Password check failed: {}", e)))?;
    if !matches {
        return Err(ApiError::bad_request("Invalid credentials"));
    }

    let employee_id = employee
        .id
        .ok_or_else(|| ApiError::internal_error("Employee has no id"))?;

    let access_token = JwtService::generate_access_token(&employee_id)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    let refresh_token = JwtService::generate_refresh_token(&employee_id)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    collection
        .update_one(
            doc! { "_id": employee_id },
            doc! { "$set": { "refreshToken": &refresh_token, "updatedAt": DateTime::now() } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(ApiResponse::success_with_message(
        "Login successful".to_string(),
        serde_json::json!({
            "accessToken": access_token,
            "refreshToken": refresh_token,
            "employee": {
                "id": employee_id.to_hex(),
                "name": employee.name,
                "email": employee.email,
                "isVerified": employee.is_verified,
            }
        }),
    )))
}

/// --------------------
/// Logout
/// --------------------
#[openapi(tag = "Employee")]
#[post("/employee/logout")]
pub async fn logout(
    db: &State<DbConn>,
    auth: AuthGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let result = db
        .collection::<Employee>("employees")
        .update_one(
            doc! { "_id": auth.principal_id },
            doc! { "$set": { "refreshToken": null, "updatedAt": DateTime::now() } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Logout failed: {}", e)))?;

    if result.matched_count == 0 {
        return Err(ApiError::not_found("Employee not found"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Logout successful"
    }))))
}

/// --------------------
/// List employees (credentials omitted)
/// --------------------
#[openapi(tag = "Employee")]
#[get("/employee/getAll")]
pub async fn get_all_employees(
    db: &State<DbConn>,
) -> Result<Json<ApiResponse<Vec<EmployeeResponse>>>, ApiError> {
    let mut cursor = db
        .collection::<Employee>("employees")
        .find(doc! {}, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut employees = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let employee: Employee = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        employees.push(EmployeeResponse::from(employee));
    }

    Ok(Json(ApiResponse::success(employees)))
}

/// --------------------
/// Set verification flag
/// --------------------
#[openapi(tag = "Employee")]
#[patch("/employee/verify/<id>", data = "<dto>")]
pub async fn verify_employee(
    db: &State<DbConn>,
    id: String,
    dto: Json<VerifyEmployeeDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let is_verified = dto
        .is_verified
        .ok_or_else(|| ApiError::bad_request("isVerified must be a boolean (true or false)"))?;

    let object_id = ObjectId::parse_str(&id)
        .map_err(|_| ApiError::bad_request("Invalid employee ID"))?;

    let result = db
        .collection::<Employee>("employees")
        .update_one(
            doc! { "_id": object_id },
            doc! { "$set": { "isVerified": is_verified, "updatedAt": DateTime::now() } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Verification update failed: {}", e)))?;

    if result.matched_count == 0 {
        return Err(ApiError::not_found("Employee not found"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": format!("Employee verification status updated to {}", is_verified)
    }))))
}

/// --------------------
/// Assign an application to an employee
/// --------------------
#[openapi(tag = "Employee")]
#[post("/employee/addVisaId/<id>/add-visa", data = "<dto>")]
pub async fn add_visa_id(
    db: &State<DbConn>,
    id: String,
    dto: Json<AddVisaIdDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let visa_id = dto
        .visa_id
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request("visaId is required"))?;

    let object_id = ObjectId::parse_str(&id)
        .map_err(|_| ApiError::bad_request("Invalid employee ID"))?;

    let collection = db.collection::<Employee>("employees");

    let employee = collection
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Employee not found"))?;

    if employee.visa_ids.iter().any(|v| v == visa_id) {
        return Err(ApiError::bad_request("Visa ID already exists for this employee"));
    }

    // $addToSet keeps the list duplicate-free even if two assignments race
    // past the check above.
    collection
        .update_one(
            doc! { "_id": object_id },
            doc! {
                "$addToSet": { "visaIds": visa_id },
                "$set": { "updatedAt": DateTime::now() }
            },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to add visa ID: {}", e)))?;

    let mut visa_ids = employee.visa_ids;
    visa_ids.push(visa_id.to_string());

    Ok(Json(ApiResponse::success_with_message(
        "Visa ID added successfully".to_string(),
        serde_json::json!({ "visaIds": visa_ids }),
    )))
}

/// --------------------
/// Employee header + their assigned applications
/// --------------------
#[openapi(tag = "Employee")]
#[get("/employee/getByUserId/<user_id>/visas")]
pub async fn get_employee_visas(
    db: &State<DbConn>,
    user_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&user_id)
        .map_err(|_| ApiError::bad_request("Invalid user ID"))?;

    let employee = db
        .collection::<Employee>("employees")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    // Assignments reference the catalog visaId, not the application _id.
    let mut cursor = db
        .collection::<VisaApplication>("visa_applications")
        .find(doc! { "visaId": { "$in": employee.visa_ids.clone() } }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut visas = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let visa = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        visas.push(visa);
    }

    Ok(Json(ApiResponse::success_with_message(
        "Visa details fetched successfully".to_string(),
        serde_json::json!({
            "user": {
                "_id": object_id.to_hex(),
                "name": employee.name,
                "email": employee.email,
                "phoneNumber": employee.phone_number,
                "visaCount": employee.visa_ids.len(),
            },
            "visaDetails": visas,
        }),
    )))
}
