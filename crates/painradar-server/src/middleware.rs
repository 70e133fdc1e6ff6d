use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::time::Instant;
use uuid::Uuid;

use crate::api::ApiError;

const API_KEYS_VAR: &str = "PAINRADAR_API_KEYS";
const WORKSPACE_PATH_PREFIX: &str = "/api/v1/workspaces/";
/// Idle workspace windows are swept once this many are tracked.
const MAX_TRACKED_WINDOWS: usize = 1024;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Which workspaces a bearer token may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyScope {
    AllWorkspaces,
    Workspace(Uuid),
}

impl KeyScope {
    fn permits(self, workspace_id: Option<Uuid>) -> bool {
        match (self, workspace_id) {
            (KeyScope::AllWorkspaces, _) | (KeyScope::Workspace(_), None) => true,
            (KeyScope::Workspace(own), Some(requested)) => own == requested,
        }
    }
}

/// Bearer-token settings for the protected routes.
#[derive(Debug, Clone)]
pub struct AuthState {
    keys: Arc<HashMap<String, KeyScope>>,
    pub enabled: bool,
}

impl AuthState {
    /// Builds auth config from `PAINRADAR_API_KEYS`.
    ///
    /// Entries are comma-separated. A bare `token` may access every
    /// workspace; `<workspace-uuid>:token` is limited to that workspace's
    /// routes. Missing keys disable auth in development and fail startup
    /// elsewhere.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var(API_KEYS_VAR).unwrap_or_default();
        Self::from_keys(&raw, is_development)
    }

    fn from_keys(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let mut keys = HashMap::new();
        for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (token, scope) = parse_key_entry(entry)?;
            keys.insert(token.to_string(), scope);
        }

        if keys.is_empty() {
            if is_development {
                tracing::warn!("{API_KEYS_VAR} not set; bearer auth disabled in development");
                return Ok(Self::disabled());
            }
            anyhow::bail!("{API_KEYS_VAR} is required outside development");
        }

        let scoped = keys
            .values()
            .filter(|s| matches!(s, KeyScope::Workspace(_)))
            .count();
        tracing::info!(keys = keys.len(), scoped, "bearer auth enabled");
        Ok(Self {
            keys: Arc::new(keys),
            enabled: true,
        })
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self {
            keys: Arc::new(HashMap::new()),
            enabled: false,
        }
    }

    fn scope_of(&self, token: &str) -> Option<KeyScope> {
        self.keys.get(token).copied()
    }
}

fn parse_key_entry(entry: &str) -> anyhow::Result<(&str, KeyScope)> {
    let Some((workspace, token)) = entry.split_once(':') else {
        return Ok((entry, KeyScope::AllWorkspaces));
    };
    let workspace_id = Uuid::parse_str(workspace.trim()).map_err(|_| {
        anyhow::anyhow!("{API_KEYS_VAR} entry scope '{workspace}' is not a workspace id")
    })?;
    let token = token.trim();
    if token.is_empty() {
        anyhow::bail!("{API_KEYS_VAR} entry for workspace {workspace_id} has no token");
    }
    Ok((token, KeyScope::Workspace(workspace_id)))
}

/// Workspace addressed by a `/api/v1/workspaces/{id}/...` path.
fn workspace_in_path(path: &str) -> Option<Uuid> {
    let rest = path.strip_prefix(WORKSPACE_PATH_PREFIX)?;
    let segment = rest.split('/').next()?;
    Uuid::parse_str(segment).ok()
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    count: usize,
}

/// Fixed-window request limiter. Each workspace gets its own window so a
/// busy tenant cannot exhaust another's quota; routes without a workspace
/// share one window.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    windows: Arc<Mutex<HashMap<Option<Uuid>, Window>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count one request against the bucket, or return how long until the
    /// bucket reopens.
    fn admit(&self, bucket: Option<Uuid>) -> Result<(), Duration> {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        if windows.len() >= MAX_TRACKED_WINDOWS {
            windows.retain(|_, w| now.duration_since(w.started_at) < self.window);
        }

        let entry = windows.entry(bucket).or_insert(Window {
            started_at: now,
            count: 0,
        });
        let elapsed = now.duration_since(entry.started_at);
        if elapsed >= self.window {
            *entry = Window {
                started_at: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            return Err(self.window.saturating_sub(elapsed));
        }
        entry.count += 1;
        Ok(())
    }
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default()
}

/// Reuses an incoming `x-request-id` or generates a `UUIDv4`, exposing it as
/// a [`RequestId`] extension and echoing it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Rejects requests without a known bearer token, and workspace-scoped
/// tokens used against another workspace.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    let Some(scope) = extract_bearer_token(req.headers().get(header::AUTHORIZATION))
        .and_then(|token| auth.scope_of(token))
    else {
        return ApiError::new(
            request_id_of(&req),
            "unauthorized",
            "missing or invalid bearer token",
        )
        .into_response();
    };

    let workspace_id = workspace_in_path(req.uri().path());
    if !scope.permits(workspace_id) {
        tracing::warn!(
            workspace_id = ?workspace_id,
            "workspace-scoped key used outside its workspace"
        );
        return ApiError::new(
            request_id_of(&req),
            "forbidden",
            "API key is not valid for this workspace",
        )
        .into_response();
    }

    next.run(req).await
}

pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let bucket = workspace_in_path(req.uri().path());
    match rate_limit.admit(bucket) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            let mut res =
                ApiError::new(request_id_of(&req), "rate_limited", "rate limit exceeded")
                    .into_response();
            // Round up so clients never retry before the window reopens.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            res.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
            res
        }
    }
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
