//! Shared harness for threereco-service integration tests.
//!
//! Builds the full router over the in-memory row store, an in-memory
//! session store and a manual clock, then drives it with `oneshot`.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use serde_json::Value;
use tower::util::ServiceExt;
use uuid::Uuid;

use service_core::config::Config as CoreConfig;
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use threereco_service::{
    build_router,
    config::{
        AdminSeedConfig, DatabaseConfig, Environment, MfaConfig, RateLimitConfig, RedisConfig,
        SecurityConfig, ServiceConfig, SessionConfig, DEFAULT_MFA_ISSUER, SESSION_COOKIE_NAME,
    },
    models::{AuditLog, Role, User, UserType, USERS_ROLES},
    services::{seed, ManualClock, MemorySessionStore, SessionManager},
    store::{record, AuditScope, Filter, MemoryStore, PageRequest, Record, Store},
    utils::password,
    AppState,
};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub sessions: Arc<MemorySessionStore>,
    pub clock: Arc<ManualClock>,
    pub admin_id: Uuid,
}

pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        common: CoreConfig::default(),
        environment: Environment::Dev,
        service_name: "threereco-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://localhost/threereco_test".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        redis: RedisConfig {
            url: "redis://127.0.0.1:6379".to_string(),
        },
        session: SessionConfig {
            cookie_secure: false,
            ..SessionConfig::default()
        },
        mfa: MfaConfig {
            issuer: DEFAULT_MFA_ISSUER.to_string(),
        },
        admin: AdminSeedConfig {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
            name: "Admin User".to_string(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        rate_limit: RateLimitConfig {
            login_attempts: 1000,
            login_window_seconds: 60,
            global_ip_limit: 1000,
            global_ip_window_seconds: 60,
        },
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let config = test_config();
        let store = Arc::new(MemoryStore::new());
        let admin_id = seed::seed_defaults(store.as_ref(), &config.admin)
            .await
            .expect("seeding failed");

        let sessions = Arc::new(MemorySessionStore::new());
        let clock = Arc::new(ManualClock::default());

        let state = AppState {
            sessions: SessionManager::new(sessions.clone(), clock.clone(), config.session.clone()),
            login_rate_limiter: create_ip_rate_limiter(
                config.rate_limit.login_attempts,
                config.rate_limit.login_window_seconds,
            ),
            ip_rate_limiter: create_ip_rate_limiter(
                config.rate_limit.global_ip_limit,
                config.rate_limit.global_ip_window_seconds,
            ),
            config: Arc::new(config),
            store: store.clone(),
            clock: clock.clone(),
            metrics: None,
        };

        let router = build_router(state.clone())
            .await
            .expect("router failed to build");

        TestApp {
            router,
            state,
            store,
            sessions,
            clock,
            admin_id,
        }
    }

    /// Inserts a user attributed to the seeded admin.
    pub async fn seed_user(&self, email: &str, password: &str, user_type: UserType) -> User {
        let hash = password::hash_blocking(password.to_string())
            .await
            .expect("hashing failed");
        let mut tx = self
            .store
            .begin(AuditScope::acting(self.admin_id))
            .await
            .unwrap();
        let user = record::insert(tx.as_mut(), User::new(email.to_string(), hash, None, user_type))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        user
    }

    /// Creates a role with `permissions` and assigns it to `user_id`.
    pub async fn grant_role(&self, user_id: Uuid, name: &str, permissions: &[&str]) -> Role {
        let mut tx = self
            .store
            .begin(AuditScope::acting(self.admin_id))
            .await
            .unwrap();
        let role = Role::new(
            name.to_string(),
            None,
            permissions.iter().map(|p| p.to_string()).collect(),
        );
        let role = record::insert(tx.as_mut(), role).await.unwrap();
        let user: User = record::find(tx.as_mut(), user_id, &Filter::True)
            .await
            .unwrap()
            .expect("user exists");
        record::link(tx.as_mut(), &USERS_ROLES, "roles", &user, role.id)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        role
    }

    /// Persists `record` without going through the API.
    pub async fn insert<R: Record>(&self, record: R) -> R {
        let mut tx = self
            .store
            .begin(AuditScope::acting(self.admin_id))
            .await
            .unwrap();
        let stored = record::insert(tx.as_mut(), record).await.unwrap();
        tx.commit().await.unwrap();
        stored
    }

    pub async fn find<R: Record>(&self, id: Uuid) -> Option<R> {
        let mut tx = self.store.begin(AuditScope::anonymous()).await.unwrap();
        let found = record::find(tx.as_mut(), id, &Filter::True).await.unwrap();
        tx.rollback().await.unwrap();
        found
    }

    pub async fn all<R: Record>(&self) -> Vec<R> {
        let mut tx = self.store.begin(AuditScope::anonymous()).await.unwrap();
        let (rows, _) = record::list(tx.as_mut(), &Filter::True, PageRequest::ALL)
            .await
            .unwrap();
        tx.rollback().await.unwrap();
        rows
    }

    /// Audit records for one table, oldest first.
    pub async fn audit_logs(&self, table: &str) -> Vec<AuditLog> {
        self.all::<AuditLog>()
            .await
            .into_iter()
            .filter(|log| log.table_name == table)
            .collect()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Logs in and returns the `name=value` cookie pair.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/authentication/login",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "login failed for {email}");
        session_cookie(&response).expect("login sets the session cookie")
    }
}

/// The `threereco_session=<token>` pair from a response's `Set-Cookie`.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    set_cookie(response).and_then(|c| {
        c.split(';')
            .next()
            .map(str::to_string)
            .filter(|pair| !pair.ends_with('='))
    })
}

pub fn set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{SESSION_COOKIE_NAME}=")))
        .map(str::to_string)
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}
