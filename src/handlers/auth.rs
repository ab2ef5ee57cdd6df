// POST /api/register and POST /api/login

use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::Reply;

use super::{respond, ApiError};
use crate::auth::{hash_password, verify_password, PasswordError};
use crate::models::{AuthResponse, CredentialsRequest};
use crate::state::AppState;
use crate::store::{StoreError, UserRecord};

const MISSING_CREDENTIALS: &str = "Username and password are required";
const BAD_CREDENTIALS: &str = "Invalid username or password";

pub async fn register(state: &AppState, req: &CredentialsRequest) -> Result<AuthResponse, ApiError> {
    let (username, password) = req
        .parts()
        .ok_or_else(|| ApiError::bad_request(MISSING_CREDENTIALS))?;

    if state
        .credentials
        .find_by_username(&username)
        .await
        .map_err(|e| {
            error!(error = %e, "credential lookup failed during registration");
            ApiError::internal()
        })?
        .is_some()
    {
        warn!(username = %username, "registration for taken username");
        return Err(ApiError::new(StatusCode::CONFLICT, "Username already exists"));
    }

    let password_hash = match hash_password(password) {
        Ok(hash) => hash,
        Err(e @ PasswordError::TooShort) => return Err(ApiError::bad_request(e.to_string())),
        Err(e) => {
            error!(error = %e, "password hashing failed");
            return Err(ApiError::internal());
        }
    };

    match state
        .credentials
        .create_user(UserRecord::new(username.clone(), password_hash))
        .await
    {
        Ok(()) => {}
        // Lost a race with a concurrent registration
        Err(StoreError::UserExists(_)) => {
            return Err(ApiError::new(StatusCode::CONFLICT, "Username already exists"))
        }
        Err(e) => {
            error!(error = %e, "failed to create user");
            return Err(ApiError::internal());
        }
    }

    let token = issue(state, &username)?;
    info!(username = %username, "user registered");

    Ok(AuthResponse {
        message: "User registered successfully".to_string(),
        token,
        username,
    })
}

pub async fn login(state: &AppState, req: &CredentialsRequest) -> Result<AuthResponse, ApiError> {
    let (username, password) = req
        .parts()
        .ok_or_else(|| ApiError::bad_request(MISSING_CREDENTIALS))?;

    let user = state
        .credentials
        .find_by_username(&username)
        .await
        .map_err(|e| {
            error!(error = %e, "credential lookup failed during login");
            ApiError::internal()
        })?
        .ok_or_else(|| {
            warn!(username = %username, "login for unknown user");
            ApiError::unauthorized(BAD_CREDENTIALS)
        })?;

    let matches = verify_password(password, &user.password_hash).map_err(|e| {
        error!(username = %username, error = %e, "stored password hash unusable");
        ApiError::internal()
    })?;
    if !matches {
        warn!(username = %username, "login with wrong password");
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    }

    let token = issue(state, &username)?;
    info!(username = %username, "user logged in");

    Ok(AuthResponse {
        message: "Login successful".to_string(),
        token,
        username,
    })
}

fn issue(state: &AppState, username: &str) -> Result<String, ApiError> {
    state.codec.issue(username).map_err(|e| {
        error!(username = %username, error = %e, "token issuance failed");
        ApiError::internal()
    })
}

pub async fn register_handler(
    req: CredentialsRequest,
    state: AppState,
) -> Result<impl Reply, warp::Rejection> {
    Ok(respond(register(&state, &req).await, StatusCode::CREATED))
}

pub async fn login_handler(
    req: CredentialsRequest,
    state: AppState,
) -> Result<impl Reply, warp::Rejection> {
    Ok(respond(login(&state, &req).await, StatusCode::OK))
}
