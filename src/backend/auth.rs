use std::collections::HashMap;
use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use sqlx::Row;
use tokio::sync::{broadcast, Mutex};

use crate::backend::config::PortalConfig;
use crate::backend::database::Database;
use crate::backend::live::{ChangeBus, Collection};
use crate::common::error::{AuthError, PortalError, Result};
use crate::common::models::{Role, User};

/// Pushed whenever the identity provider's session state changes, so
/// every session store can re-evaluate its identity (login elsewhere,
/// logout, expiry sweep).
#[derive(Debug, Clone)]
pub enum SessionEvent {
    SignedIn { user_id: String, token: String },
    SignedOut { user_id: String },
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub role: Role,
    pub photo_url: Option<String>,
    pub major: Option<String>,
    pub year: Option<i64>,
    pub department: Option<String>,
    pub office_hours: Option<String>,
}

/// Embedded identity provider: principal accounts, sessions and the
/// mirrored profile records, plus the session-change broadcast.
pub struct AuthService {
    db: Arc<Database>,
    bus: ChangeBus,
    config: PortalConfig,
    events: broadcast::Sender<SessionEvent>,
    // email -> recent failed sign-in timestamps (seconds)
    failed_logins: Mutex<HashMap<String, Vec<i64>>>,
}

fn hash_password(password: &str, salt_length: u32) -> String {
    let mut salt_bytes = vec![0u8; salt_length as usize];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).unwrap();
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

fn verify_password(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn generate_session_token() -> String {
    let uuid = uuid::Uuid::new_v4().to_string();
    let mut random = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut random);
    format!("{}-{:x}", uuid, md5::compute(random))
}

pub(crate) fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        photo_url: row.get("photo_url"),
        role: Role::parse(&row.get::<String, _>("role")),
        major: row.get("major"),
        year: row.get("year"),
        department: row.get("department"),
        office_hours: row.get("office_hours"),
        created_at: row.get("created_at"),
        last_active: row.get("last_active"),
    }
}

/// Look up a mirrored profile record. `None` for dangling ids; callers
/// render those as "unknown user".
pub async fn fetch_profile(db: &Database, user_id: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&db.pool)
        .await?;
    Ok(row.as_ref().map(user_from_row))
}

impl AuthService {
    pub fn new(db: Arc<Database>, bus: ChangeBus, config: PortalConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            db,
            bus,
            config,
            events,
            failed_logins: Mutex::new(HashMap::new()),
        }
    }

    /// Receiver for session-change pushes. Push-based by contract;
    /// consumers must not poll.
    pub fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Create a principal account plus its mirrored profile record.
    pub async fn register(&self, new_user: NewUser) -> Result<User> {
        if new_user.email.trim().is_empty()
            || new_user.password.is_empty()
            || new_user.display_name.trim().is_empty()
        {
            return Err(PortalError::validation(
                "email, password and display name are required",
            ));
        }

        let existing = sqlx::query("SELECT principal_id FROM auth WHERE email = ?")
            .bind(&new_user.email)
            .fetch_optional(&self.db.pool)
            .await?;
        if existing.is_some() {
            return Err(PortalError::validation("email already registered"));
        }

        let user_id = uuid::Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().timestamp_millis();
        let password_hash = hash_password(&new_user.password, self.config.argon2_salt_length);

        let mut tx = self.db.pool.begin().await?;
        sqlx::query("INSERT INTO auth (principal_id, email, password_hash) VALUES (?, ?, ?)")
            .bind(&user_id)
            .bind(&new_user.email)
            .bind(&password_hash)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"INSERT INTO users
               (id, email, display_name, photo_url, role, major, year, department, office_hours, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&user_id)
        .bind(&new_user.email)
        .bind(&new_user.display_name)
        .bind(&new_user.photo_url)
        .bind(new_user.role.as_str())
        .bind(&new_user.major)
        .bind(new_user.year)
        .bind(&new_user.department)
        .bind(&new_user.office_hours)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.bus.notify(Collection::Users);
        log::info!("[AUTH] Registered {} (id={})", new_user.email, user_id);

        Ok(User {
            id: user_id,
            email: new_user.email,
            display_name: new_user.display_name,
            photo_url: new_user.photo_url,
            role: new_user.role,
            major: new_user.major,
            year: new_user.year,
            department: new_user.department,
            office_hours: new_user.office_hours,
            created_at,
            last_active: None,
        })
    }

    /// Authenticate and open a session. A principal that verifies but
    /// has no profile row fails with `ProfileMissing`: that is a data
    /// inconsistency, not a login error.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(User, String)> {
        if self.is_rate_limited(email).await {
            log::warn!("[AUTH] Rate limited sign-in for {}", email);
            return Err(AuthError::RateLimited.into());
        }

        let row = sqlx::query("SELECT principal_id, password_hash FROM auth WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.db.pool)
            .await?;
        let (principal_id, password_hash) = match row {
            Some(row) => (
                row.get::<String, _>("principal_id"),
                row.get::<String, _>("password_hash"),
            ),
            None => {
                self.record_failure(email).await;
                log::warn!("[AUTH] Sign-in failed for {}: unknown account", email);
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if !verify_password(&password_hash, password) {
            self.record_failure(email).await;
            log::warn!("[AUTH] Sign-in failed for {}: wrong password", email);
            return Err(AuthError::InvalidCredentials.into());
        }

        let user = fetch_profile(&self.db, &principal_id)
            .await?
            .ok_or_else(|| PortalError::from(AuthError::ProfileMissing(principal_id.clone())))?;

        let token = generate_session_token();
        let now_secs = chrono::Utc::now().timestamp();
        let expires = now_secs + 60 * 60 * 24 * self.config.session_expiry_days as i64;
        let last_active = chrono::Utc::now().timestamp_millis();

        let mut tx = self.db.pool.begin().await?;
        // Single-session semantics: a new login invalidates any session
        // opened elsewhere; those clients find out via the event push.
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(&principal_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO sessions (user_id, session_token, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&principal_id)
        .bind(&token)
        .bind(now_secs)
        .bind(expires)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE users SET last_active = ? WHERE id = ?")
            .bind(last_active)
            .bind(&principal_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO session_events (user_id, event_type, created_at) VALUES (?, ?, ?)")
            .bind(&principal_id)
            .bind("login_success")
            .bind(now_secs)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.clear_failures(email).await;
        self.bus.notify(Collection::Users);
        let _ = self.events.send(SessionEvent::SignedIn {
            user_id: principal_id.clone(),
            token: token.clone(),
        });
        log::info!("[AUTH] Sign-in success for {} (id={})", email, principal_id);

        Ok((user, token))
    }

    pub async fn sign_out(&self, token: &str) -> Result<()> {
        let row = sqlx::query("SELECT user_id FROM sessions WHERE session_token = ?")
            .bind(token)
            .fetch_optional(&self.db.pool)
            .await?;
        let user_id: String = match row {
            Some(row) => row.get("user_id"),
            None => return Err(PortalError::not_found("session")),
        };

        let now_secs = chrono::Utc::now().timestamp();
        let mut tx = self.db.pool.begin().await?;
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(&user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO session_events (user_id, event_type, created_at) VALUES (?, ?, ?)")
            .bind(&user_id)
            .bind("logout")
            .bind(now_secs)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let _ = self.events.send(SessionEvent::SignedOut {
            user_id: user_id.clone(),
        });
        log::info!("[AUTH] Sign-out for user {}", user_id);
        Ok(())
    }

    /// User id behind an unexpired session token, if any.
    pub async fn validate_session(&self, token: &str) -> Result<Option<String>> {
        let now_secs = chrono::Utc::now().timestamp();
        let row = sqlx::query(
            "SELECT user_id FROM sessions WHERE session_token = ? AND expires_at > ?",
        )
        .bind(token)
        .bind(now_secs)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(row.map(|r| r.get("user_id")))
    }

    /// Resolve a token to the full profile, or `None` if the session is
    /// gone or expired.
    pub async fn current_user(&self, token: &str) -> Result<Option<User>> {
        match self.validate_session(token).await? {
            Some(user_id) => fetch_profile(&self.db, &user_id).await,
            None => Ok(None),
        }
    }

    /// Idempotent sweep of expired sessions; safe to run periodically.
    pub async fn cleanup_expired_sessions(&self) -> Result<u64> {
        let now_secs = chrono::Utc::now().timestamp();
        let res = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now_secs)
            .execute(&self.db.pool)
            .await?;
        if res.rows_affected() > 0 {
            log::info!("[AUTH] Cleaned up {} expired sessions", res.rows_affected());
        }
        Ok(res.rows_affected())
    }

    async fn is_rate_limited(&self, email: &str) -> bool {
        let now_secs = chrono::Utc::now().timestamp();
        let cutoff = now_secs - self.config.login_attempt_window_secs;
        let mut map = self.failed_logins.lock().await;
        match map.get_mut(email) {
            Some(attempts) => {
                attempts.retain(|t| *t > cutoff);
                attempts.len() >= self.config.login_attempt_limit as usize
            }
            None => false,
        }
    }

    async fn record_failure(&self, email: &str) {
        let now_secs = chrono::Utc::now().timestamp();
        let mut map = self.failed_logins.lock().await;
        map.entry(email.to_string()).or_default().push(now_secs);
    }

    async fn clear_failures(&self, email: &str) {
        let mut map = self.failed_logins.lock().await;
        map.remove(email);
    }
}
