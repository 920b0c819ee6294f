//! # HTTP API
//!
//! axum-based REST API. Every route except `GET /health` lives under `/api`
//! and requires a bearer token; role checks happen in the handlers.
//!
//! ## Roles
//!
//! | Guard | Roles |
//! |-------|-------|
//! | admin | ADMIN |
//! | staff | ADMIN, TEACHER |
//! | any   | ADMIN, TEACHER, PARENT |
//!
//! PARENT callers only ever see students whose parent record is their own.
//!
//! The store is synchronous; every database closure runs on the blocking
//! thread pool via [`AppState::read`] and [`AppState::write`].

mod academic;
mod attendance;
mod error;
mod exams;
mod extract;
mod fees;
mod homework;
mod notices;
mod profile;
mod session;
mod sms;
mod students;
mod teachers;
mod transport;

pub use error::{ApiError, ApiResult};
pub use extract::{AuthUser, Body};

use crate::auth::{TokenKeys, hash_password};
use crate::sms::SmsGateway;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use schoolhub_core::students::Student;
use schoolhub_core::users::NewLogin;
use schoolhub_core::{Reader, Role, Snapshot, Store, Tx, school};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

// =============================================================================
// STATE
// =============================================================================

/// Tracked usernames before idle limiter entries are pruned.
const LIMITER_KEYS_MAX: usize = 10_000;

/// Runtime settings the server needs besides the store.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub keys: TokenKeys,
    pub sms: SmsGateway,
    /// Message signature used when no school profile is stored.
    pub school_name: String,
    pub login_rate_per_minute: u32,
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    keys: Arc<TokenKeys>,
    sms: SmsGateway,
    school_name: Arc<str>,
    login_limiter: Arc<DefaultKeyedRateLimiter<String>>,
}

impl AppState {
    pub fn new(store: Store, config: AppConfig) -> Self {
        let rate = NonZeroU32::new(config.login_rate_per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            store: Arc::new(store),
            keys: Arc::new(config.keys),
            sms: config.sms,
            school_name: Arc::from(config.school_name),
            login_limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(rate))),
        }
    }

    pub fn keys(&self) -> &TokenKeys {
        &self.keys
    }

    pub fn sms(&self) -> &SmsGateway {
        &self.sms
    }

    /// Run a query against a fresh snapshot on the blocking pool.
    pub async fn read<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Snapshot) -> schoolhub_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        Ok(tokio::task::spawn_blocking(move || store.read(f)).await??)
    }

    /// Run a write transaction on the blocking pool. Commits only on `Ok`.
    pub async fn write<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&mut Tx) -> schoolhub_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        Ok(tokio::task::spawn_blocking(move || store.write(f)).await??)
    }

    /// Name that signs outgoing messages: stored profile first, then config.
    pub async fn school_name(&self) -> ApiResult<String> {
        let fallback = self.school_name.to_string();
        self.read(move |r| school::school_name(r, &fallback)).await
    }

    /// Login attempts are budgeted per username, case-insensitively.
    fn login_allowed(&self, username: &str) -> bool {
        if self.login_limiter.len() > LIMITER_KEYS_MAX {
            self.login_limiter.retain_recent();
        }
        let key = username.trim().to_lowercase();
        self.login_limiter.check_key(&key).is_ok()
    }

    /// Forbid PARENT callers from students that are not their own.
    pub async fn ensure_student_visible(&self, user: &AuthUser, student_id: u64) -> ApiResult<()> {
        let student = self.read(move |r| r.fetch::<Student>(student_id)).await?;
        if user.role == Role::Parent
            && (student.parent_id.is_none() || student.parent_id != user.entity_id)
        {
            return Err(ApiError::Forbidden("Access denied".into()));
        }
        Ok(())
    }
}

/// Hash the plaintext half of optional login credentials off the async runtime.
pub async fn hash_login(credentials: Option<(String, String)>) -> ApiResult<Option<NewLogin>> {
    let Some((username, password)) = credentials else {
        return Ok(None);
    };
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await?
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Some(NewLogin {
        username,
        password_hash,
    }))
}

/// The server's idea of today.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// `{"message": ..., "success": true}`
pub fn done(message: impl Into<String>) -> Json<Value> {
    Json(json!({"message": message.into(), "success": true}))
}

// =============================================================================
// ROUTER
// =============================================================================

async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}))
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", session::routes())
        .nest("/academic", academic::routes())
        .nest("/students", students::routes())
        .nest("/teachers", teachers::routes())
        .nest("/attendance", attendance::routes())
        .nest("/examinations", exams::routes())
        .nest("/fees", fees::routes())
        .nest("/homework", homework::routes())
        .nest("/notices", notices::routes())
        .nest("/transport", transport::routes())
        .nest("/school", profile::routes())
        .nest("/sms", sms::routes());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("SchoolHub API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
}
