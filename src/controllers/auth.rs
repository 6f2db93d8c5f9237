//! Account lifecycle: signup, login/logout, email verification and password reset.
//!
//! Each handler keeps its database work inside one transaction and hands
//! `&mut tx` to the service functions, so the account change and its activity
//! log entry commit or roll back together. Email goes out only after commit.

use axum::{extract::State, http::StatusCode, Json};
use sqlx::SqliteConnection;

use crate::error::{validation::validate_email, validation::validate_password, AppError, AppResult};
use crate::extract::AppJson;
use crate::mailer::{self, OutgoingEmail};
use crate::middleware::{ip::ClientIp, AuthUser};
use crate::services::tokens::{generate_one_time_token, TokenService};
use crate::services::{logs, sessions, users};
use crate::state::AppState;
use crate::types::{
    normalize_email, CreateLogRequest, EmailRequest, LoginRequest, LoginResponse, LogLevel, MessageResponse,
    PublicUser, RegisterRequest, ResetPasswordRequest, UserResponse, VerifyEmailRequest,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const RESET_REQUESTED: &str = "If an account exists for that address, a password reset email has been sent";
const VERIFICATION_RESENT: &str = "If an unverified account exists for that address, a new verification email has been sent";

async fn audit(
    conn: &mut SqliteConnection,
    user_id: i64,
    level: LogLevel,
    action: &str,
    message: impl Into<String>,
) -> AppResult<()> {
    logs::create_log(conn, &CreateLogRequest::event(Some(user_id), level, action, message)).await?;
    Ok(())
}

// bcrypt is deliberately slow; keep it off the async workers.
async fn hash_password(tokens: &TokenService, password: &str) -> AppResult<String> {
    let tokens = tokens.clone();
    let password = password.to_string();
    tokio::task::spawn_blocking(move || tokens.hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
}

async fn verify_password(tokens: &TokenService, password: &str, hash: &str) -> AppResult<bool> {
    let tokens = tokens.clone();
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || tokens.verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
}

async fn send_email(state: &AppState, email: &OutgoingEmail) -> anyhow::Result<()> {
    let res = state.mailer.send(email).await;
    match &res {
        Ok(()) => state.metrics.inc_emails_sent(),
        Err(e) => {
            state.metrics.inc_emails_failed();
            tracing::warn!(to = %email.to, subject = %email.subject, "failed to send email: {:#}", e);
        }
    }
    res
}

fn required_token(token: &str) -> AppResult<&str> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::ValidationError { field: "token".into(), message: "must not be empty".into() });
    }
    Ok(token)
}

/// POST /signup
pub async fn handle_register(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    AppJson(req): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    state.rate_limiter.check_endpoint_limit("/signup", ip).await?;
    req.validate()?;

    let email = normalize_email(&req.email);
    let password_hash = hash_password(&state.tokens, &req.password).await?;
    let verification_token = generate_one_time_token();

    let mut tx = state.db.begin().await?;
    if users::find_by_email(&mut tx, &email).await?.is_some() {
        return Err(AppError::Conflict("An account with this email already exists".into()));
    }
    let user = users::create_user(
        &mut tx,
        &users::NewUser {
            name: &req.name,
            email: &email,
            password_hash: &password_hash,
            verification_token: &verification_token,
            verification_expires_at: state.tokens.verification_expiry(),
        },
    )
    .await?;
    audit(&mut tx, user.id, LogLevel::Info, "user.signup", format!("{} signed up", user.email)).await?;
    tx.commit().await?;

    state.metrics.inc_signups();
    state.metrics.add_logs_written(1);
    tracing::info!(user_id = user.id, "user registered");

    let email = mailer::verification_email(&state.config.mail, &user.email, &user.name, &verification_token);
    // The account exists either way; the user can ask for a resend.
    let _ = send_email(&state, &email).await;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            user: PublicUser::from(&user),
            message: "Account created. Check your inbox to verify your email address".into(),
        }),
    ))
}

/// POST /login
pub async fn handle_authenticate(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    AppJson(req): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    state.rate_limiter.check_endpoint_limit("/login", ip).await?;

    let email = normalize_email(&req.email);
    let user = {
        let mut conn = state.db.acquire().await?;
        users::find_by_email(&mut conn, &email).await?
    };
    let Some(user) = user else {
        // Same bcrypt work as a known account, so timing does not reveal which emails exist
        let _ = verify_password(&state.tokens, &req.password, state.tokens.dummy_hash()).await;
        state.metrics.inc_logins_failed();
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    if !verify_password(&state.tokens, &req.password, &user.password_hash).await? {
        state.metrics.inc_logins_failed();
        let mut conn = state.db.acquire().await?;
        audit(&mut conn, user.id, LogLevel::Warn, "user.login_failed", format!("failed login from {}", ip)).await?;
        state.metrics.add_logs_written(1);
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    if state.config.auth.require_verified_email && !user.email_verified {
        return Err(AppError::Forbidden("Email address has not been verified".into()));
    }

    let mut tx = state.db.begin().await?;
    let session = sessions::create_session(&mut tx, user.id, state.tokens.session_expiry()).await?;
    let issued = state.tokens.issue_access_token(user.id, &user.email, &session.id, session.expires_at)?;
    audit(&mut tx, user.id, LogLevel::Info, "user.login", format!("login from {}", ip)).await?;
    tx.commit().await?;

    state.metrics.inc_logins_succeeded();
    state.metrics.add_logs_written(1);
    tracing::info!(user_id = user.id, session_id = %session.id, "user logged in");

    Ok(Json(LoginResponse {
        access_token: issued.token,
        token_type: "Bearer".into(),
        expires_in: issued.expires_in,
        user: PublicUser::from(&user),
    }))
}

/// POST /logout
pub async fn handle_logout(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<MessageResponse>> {
    let mut tx = state.db.begin().await?;
    sessions::delete_session(&mut tx, &auth.session_id).await?;
    audit(&mut tx, auth.user_id, LogLevel::Info, "user.logout", "session ended").await?;
    tx.commit().await?;

    state.metrics.add_logs_written(1);
    tracing::info!(user_id = auth.user_id, session_id = %auth.session_id, "user logged out");
    Ok(Json(MessageResponse::new("Logged out")))
}

/// POST /forgot-password
///
/// Answers the same way whether or not the address is registered.
pub async fn handle_forgot_password(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    AppJson(req): AppJson<EmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    state.rate_limiter.check_endpoint_limit("/forgot-password", ip).await?;
    validate_email(&req.email)?;

    let email = normalize_email(&req.email);
    let user = {
        let mut conn = state.db.acquire().await?;
        users::find_by_email(&mut conn, &email).await?
    };

    match user {
        Some(user) => {
            let token = generate_one_time_token();
            let mut tx = state.db.begin().await?;
            users::set_reset_token(&mut tx, user.id, &token, state.tokens.reset_expiry()).await?;
            audit(&mut tx, user.id, LogLevel::Info, "user.password_reset_requested", "password reset requested")
                .await?;
            tx.commit().await?;
            state.metrics.add_logs_written(1);

            let email = mailer::password_reset_email(&state.config.mail, &user.email, &user.name, &token);
            let _ = send_email(&state, &email).await;
        }
        None => tracing::debug!("password reset requested for unknown address"),
    }

    Ok(Json(MessageResponse::new(RESET_REQUESTED)))
}

/// POST /reset-password
pub async fn handle_reset_password(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    AppJson(req): AppJson<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    state.rate_limiter.check_endpoint_limit("/reset-password", ip).await?;
    let token = required_token(&req.token)?;
    validate_password(&req.password)?;

    let password_hash = hash_password(&state.tokens, &req.password).await?;
    let now = chrono::Utc::now().timestamp();

    let mut tx = state.db.begin().await?;
    let user = users::find_by_reset_token(&mut tx, token, now)
        .await?
        .ok_or_else(|| AppError::BadRequest("Reset token is invalid or has expired".into()))?;
    users::update_password(&mut tx, user.id, &password_hash).await?;
    let revoked = sessions::delete_user_sessions(&mut tx, user.id).await?;
    audit(
        &mut tx,
        user.id,
        LogLevel::Info,
        "user.password_reset",
        format!("password reset; {} session(s) revoked", revoked),
    )
    .await?;
    tx.commit().await?;

    state.metrics.add_logs_written(1);
    tracing::info!(user_id = user.id, revoked, "password reset");
    Ok(Json(MessageResponse::new("Password has been reset. Please log in with your new password")))
}

/// POST /verify-email
pub async fn handle_verify_email(
    State(state): State<AppState>,
    AppJson(req): AppJson<VerifyEmailRequest>,
) -> AppResult<Json<UserResponse>> {
    let token = required_token(&req.token)?;
    let now = chrono::Utc::now().timestamp();

    let mut tx = state.db.begin().await?;
    let user = users::find_by_verification_token(&mut tx, token, now)
        .await?
        .ok_or_else(|| AppError::BadRequest("Verification token is invalid or has expired".into()))?;
    let user = users::mark_email_verified(&mut tx, user.id).await?;
    audit(&mut tx, user.id, LogLevel::Info, "user.email_verified", format!("{} verified", user.email)).await?;
    tx.commit().await?;

    state.metrics.add_logs_written(1);
    Ok(Json(UserResponse { user: PublicUser::from(&user), message: "Email address verified".into() }))
}

/// POST /resend-verification-email
pub async fn handle_resend_email(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    AppJson(req): AppJson<EmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    state.rate_limiter.check_endpoint_limit("/resend-verification-email", ip).await?;
    validate_email(&req.email)?;

    let email = normalize_email(&req.email);
    let user = {
        let mut conn = state.db.acquire().await?;
        users::find_by_email(&mut conn, &email).await?
    };
    let Some(user) = user else {
        return Ok(Json(MessageResponse::new(VERIFICATION_RESENT)));
    };
    if user.email_verified {
        return Err(AppError::Conflict("Email address is already verified".into()));
    }

    let token = generate_one_time_token();
    let mut tx = state.db.begin().await?;
    users::set_verification_token(&mut tx, user.id, &token, state.tokens.verification_expiry()).await?;
    audit(&mut tx, user.id, LogLevel::Info, "user.verification_resent", "verification email re-sent").await?;
    tx.commit().await?;
    state.metrics.add_logs_written(1);

    let email = mailer::verification_email(&state.config.mail, &user.email, &user.name, &token);
    send_email(&state, &email).await.map_err(|e| AppError::Mail(e.to_string()))?;

    Ok(Json(MessageResponse::new(VERIFICATION_RESENT)))
}
