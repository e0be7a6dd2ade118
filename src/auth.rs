//! Email + password accounts and opaque session tokens.
//!
//! Passwords are stored as Argon2id PHC strings. Hashing and verification run
//! outside the document lock; only the resulting records go through
//! [`Backend::transact`](crate::storage::Backend::transact).

use crate::errors::{AppError, ServiceError};
use crate::models::{Account, AppData, Session};
use crate::state::AppState;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use tracing::info;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "seiton_session";
pub const MIN_PASSWORD_LEN: usize = 6;

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::PasswordHash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(hash).map_err(|e| ServiceError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn normalize_email(email: &str) -> Result<String, ServiceError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(ServiceError::validation("enter a valid email address"));
    }
    Ok(email)
}

pub fn validate_new_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::validation(format!(
            "password must have at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn find_account_by_email<'a>(data: &'a AppData, email: &str) -> Option<&'a Account> {
    data.accounts.values().find(|account| account.email == email)
}

/// Inserts the account and opens its first session.
pub fn register(
    data: &mut AppData,
    email: String,
    password_hash: String,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<(Account, String), ServiceError> {
    if find_account_by_email(data, &email).is_some() {
        return Err(ServiceError::EmailTaken);
    }
    let account = Account {
        user_id: Uuid::new_v4().to_string(),
        email,
        password_hash,
        created_at: now,
    };
    data.accounts.insert(account.user_id.clone(), account.clone());
    let token = open_session(data, &account.user_id, now, ttl);
    info!(user_id = %account.user_id, "account created");
    Ok((account, token))
}

pub fn open_session(data: &mut AppData, user_id: &str, now: DateTime<Utc>, ttl: Duration) -> String {
    data.sessions.retain(|_, session| session.expires_at > now);
    let token = Uuid::new_v4().simple().to_string();
    data.sessions.insert(
        token.clone(),
        Session {
            user_id: user_id.to_string(),
            created_at: now,
            expires_at: now + ttl,
        },
    );
    token
}

pub fn close_session(data: &mut AppData, token: &str) -> bool {
    data.sessions.remove(token).is_some()
}

/// Drops every session of `user_id` except `keep_token`. Returns how many went.
pub fn revoke_other_sessions(data: &mut AppData, user_id: &str, keep_token: &str) -> usize {
    let before = data.sessions.len();
    data.sessions
        .retain(|token, session| session.user_id != user_id || token == keep_token);
    before - data.sessions.len()
}

/// Resolves a live session token to its account.
pub fn resolve_session<'a>(data: &'a AppData, token: &str, now: DateTime<Utc>) -> Option<&'a Account> {
    let session = data.sessions.get(token)?;
    if session.expires_at <= now {
        return None;
    }
    data.accounts.get(&session.user_id)
}

pub async fn sign_up(state: &AppState, email: &str, password: &str) -> Result<(Account, String), ServiceError> {
    let backend = state.backend()?;
    let email = normalize_email(email)?;
    validate_new_password(password)?;
    let password_hash = hash_password(password)?;
    let ttl = state.config.session_ttl;
    backend
        .transact(|data| register(data, email, password_hash, Utc::now(), ttl))
        .await
}

pub async fn sign_in(state: &AppState, email: &str, password: &str) -> Result<(Account, String), ServiceError> {
    let backend = state.backend()?;
    let email = normalize_email(email).map_err(|_| ServiceError::InvalidCredentials)?;
    let account = backend
        .read(|data| find_account_by_email(data, &email).cloned())
        .await
        .ok_or(ServiceError::InvalidCredentials)?;
    if !verify_password(password, &account.password_hash)? {
        return Err(ServiceError::InvalidCredentials);
    }
    let ttl = state.config.session_ttl;
    let token = backend
        .transact(|data| Ok(open_session(data, &account.user_id, Utc::now(), ttl)))
        .await?;
    info!(user_id = %account.user_id, "signed in");
    Ok((account, token))
}

pub async fn sign_out(state: &AppState, token: &str) -> Result<(), ServiceError> {
    let backend = state.backend()?;
    backend
        .transact(|data| Ok(close_session(data, token)))
        .await?;
    Ok(())
}

/// Re-checks the current password before any credential change.
async fn reauthenticate(state: &AppState, user_id: &str, current_password: &str) -> Result<Account, ServiceError> {
    let backend = state.backend()?;
    let account = backend
        .read(|data| data.accounts.get(user_id).cloned())
        .await
        .ok_or(ServiceError::NotAuthenticated)?;
    if !verify_password(current_password, &account.password_hash)? {
        return Err(ServiceError::InvalidCredentials);
    }
    Ok(account)
}

/// Replaces the password and signs out every other session of the account.
pub async fn change_password(
    state: &AppState,
    user_id: &str,
    current_token: &str,
    current_password: &str,
    new_password: &str,
    confirm_password: &str,
) -> Result<(), ServiceError> {
    if new_password != confirm_password {
        return Err(ServiceError::validation("passwords do not match"));
    }
    validate_new_password(new_password)?;
    reauthenticate(state, user_id, current_password).await?;
    let password_hash = hash_password(new_password)?;
    let revoked = state
        .backend()?
        .transact(|data| {
            let account = data
                .accounts
                .get_mut(user_id)
                .ok_or(ServiceError::NotFound("account"))?;
            account.password_hash = password_hash;
            Ok(revoke_other_sessions(data, user_id, current_token))
        })
        .await?;
    info!(user_id, revoked, "password changed");
    Ok(())
}

pub async fn change_email(
    state: &AppState,
    user_id: &str,
    current_password: &str,
    new_email: &str,
) -> Result<Account, ServiceError> {
    let new_email = normalize_email(new_email)?;
    reauthenticate(state, user_id, current_password).await?;
    let account = state
        .backend()?
        .transact(|data| {
            if find_account_by_email(data, &new_email).is_some_and(|other| other.user_id != user_id) {
                return Err(ServiceError::EmailTaken);
            }
            let account = data
                .accounts
                .get_mut(user_id)
                .ok_or(ServiceError::NotFound("account"))?;
            account.email = new_email;
            Ok(account.clone())
        })
        .await?;
    info!(user_id, "email changed");
    Ok(account)
}

/// Session token from `Authorization: Bearer` or the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        return Some(token.trim().to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_string())
}

pub fn session_cookie(token: &str, ttl: Duration) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl.num_seconds()
    )
}

pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    pub email: String,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let backend = state.backend()?;
        let token = session_token(&parts.headers).ok_or(ServiceError::NotAuthenticated)?;
        let now = Utc::now();
        let account = backend
            .read(|data| resolve_session(data, &token, now).cloned())
            .await
            .ok_or(ServiceError::NotAuthenticated)?;
        Ok(Self {
            user_id: account.user_id,
            email: account.email,
            token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("correct-horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct-horse", &hash).unwrap());
        assert!(!verify_password("wrong-horse", &hash).unwrap());
        assert!(verify_password("x", "not-a-hash").is_err());
    }

    #[test]
    fn emails_are_normalized_and_checked() {
        assert_eq!(normalize_email("  Ana@Example.COM ").unwrap(), "ana@example.com");
        assert!(normalize_email("ana").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("ana@localhost").is_err());
        assert!(normalize_email("a na@example.com").is_err());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_new_password("12345").is_err());
        assert!(validate_new_password("123456").is_ok());
    }

    #[test]
    fn register_rejects_duplicate_email() {
        let mut data = AppData::default();
        let ttl = Duration::hours(1);
        register(&mut data, "a@b.io".into(), "h".into(), now(), ttl).unwrap();
        assert!(matches!(
            register(&mut data, "a@b.io".into(), "h".into(), now(), ttl),
            Err(ServiceError::EmailTaken)
        ));
        assert_eq!(data.accounts.len(), 1);
    }

    #[test]
    fn sessions_expire() {
        let mut data = AppData::default();
        let (account, token) =
            register(&mut data, "a@b.io".into(), "h".into(), now(), Duration::hours(1)).unwrap();
        assert_eq!(
            resolve_session(&data, &token, now()).map(|a| a.user_id.clone()),
            Some(account.user_id)
        );
        assert!(resolve_session(&data, &token, now() + Duration::hours(2)).is_none());

        // Opening a later session prunes the expired one.
        open_session(&mut data, "other", now() + Duration::hours(2), Duration::hours(1));
        assert!(!data.sessions.contains_key(&token));
    }

    #[test]
    fn close_session_removes_token() {
        let mut data = AppData::default();
        let token = open_session(&mut data, "u1", now(), Duration::hours(1));
        assert!(close_session(&mut data, &token));
        assert!(!close_session(&mut data, &token));
    }

    #[test]
    fn revoking_keeps_current_and_foreign_sessions() {
        let mut data = AppData::default();
        let ttl = Duration::hours(1);
        let current = open_session(&mut data, "u1", now(), ttl);
        let laptop = open_session(&mut data, "u1", now(), ttl);
        let phone = open_session(&mut data, "u1", now(), ttl);
        let someone_else = open_session(&mut data, "u2", now(), ttl);

        assert_eq!(revoke_other_sessions(&mut data, "u1", &current), 2);
        assert!(data.sessions.contains_key(&current));
        assert!(data.sessions.contains_key(&someone_else));
        assert!(!data.sessions.contains_key(&laptop));
        assert!(!data.sessions.contains_key(&phone));
        assert_eq!(revoke_other_sessions(&mut data, "u1", &current), 0);
    }

    #[test]
    fn token_from_bearer_or_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; seiton_session=tok42"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("tok42"));

        assert!(session_token(&HeaderMap::new()).is_none());
    }
}
