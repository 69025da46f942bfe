use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use cipherchan_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::{ApiError, AppState, run_db};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    let username = req.username.trim().to_string();
    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::BadRequest("Username must be 3 to 32 characters.".into()));
    }
    let email = req.email.trim().to_string();
    if !looks_like_email(&email) {
        return Err(ApiError::BadRequest("Enter a valid email address.".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest("Password must be at least 8 characters.".into()));
    }

    let password = req.password;
    let user_id = Uuid::new_v4();
    let name = username.clone();

    run_db(&state, move |s| {
        // Check if username is taken
        if s.db.get_user_by_username(&name)?.is_some() {
            return Err(ApiError::Conflict("That username is already taken.".into()));
        }

        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();

        s.db.create_user(&user_id.to_string(), &name, &email, &password_hash)?;
        Ok(())
    })
    .await?;

    let token = create_token(&state, user_id, &username)?;
    info!("Registered {} ({})", username, user_id);

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let name = username.clone();
    let password = req.password;

    let user = run_db(&state, move |s| {
        let user = s
            .db
            .get_user_by_username(&name)?
            .ok_or(ApiError::InvalidCredentials)?;

        // Verify password
        {
            let parsed_hash = PasswordHash::new(&user.password)
                .map_err(|e| anyhow::anyhow!("stored hash for {} unreadable: {}", user.id, e))?;
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .map_err(|_| ApiError::InvalidCredentials)?;
        }

        Ok(user)
    })
    .await?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user.id, e))?;
    let token = create_token(&state, user_id, &user.username)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}

fn create_token(state: &AppState, user_id: Uuid, username: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + state.token_ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(|e| anyhow::anyhow!("token encoding failed: {}", e))?;

    Ok(token)
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}
