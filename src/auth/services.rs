use std::sync::Arc;
use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

pub(crate) use crate::auth::dto::{Claims, JwtKeys, TokenKind};
use crate::config::JwtConfig;
use crate::local::{is_valid_session_id, MemoryStorage, SESSION_HEADER};
use crate::state::AppState;

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
            refresh_ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            access_ttl: Duration::from_secs((ttl_minutes.max(1) as u64) * 60),
            refresh_ttl: Duration::from_secs((refresh_ttl_minutes.max(1) as u64) * 60),
        }
    }
}

impl JwtKeys {
    fn sign_with_kind(&self, user_id: Uuid, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Access)
    }

    pub fn sign_refresh(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Refresh)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Refresh {
            anyhow::bail!("not a refresh token");
        }
        Ok(claims)
    }
}

type Rejection = (StatusCode, String);

fn unauthorized(msg: &str) -> Rejection {
    (StatusCode::UNAUTHORIZED, msg.to_string())
}

/// `Ok(None)` when no Authorization header is sent at all.
fn bearer_user(parts: &Parts, keys: &JwtKeys) -> Result<Option<Uuid>, Rejection> {
    let Some(header) = parts.headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let token = header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| unauthorized("Invalid Authorization header"))?;

    let claims = keys.verify(token).map_err(|_| {
        warn!("invalid or expired token");
        unauthorized("Invalid or expired token")
    })?;
    if claims.kind != TokenKind::Access {
        return Err(unauthorized("Access token required"));
    }
    Ok(Some(claims.sub))
}

/// Signed-in user id taken from a bearer access token.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        bearer_user(parts, &keys)?
            .map(AuthUser)
            .ok_or_else(|| unauthorized("Missing Authorization header"))
    }
}

/// The anonymous session named by the session header, with its local storage.
pub struct LocalSession {
    pub id: String,
    pub storage: Arc<MemoryStorage>,
}

fn session_from(parts: &Parts, state: &AppState) -> Result<Option<LocalSession>, Rejection> {
    let Some(raw) = parts.headers.get(SESSION_HEADER) else {
        return Ok(None);
    };
    let id = raw
        .to_str()
        .ok()
        .filter(|id| is_valid_session_id(id))
        .ok_or((StatusCode::BAD_REQUEST, format!("invalid {} header", SESSION_HEADER)))?;
    // Reads of an unknown session see an empty, unregistered storage.
    let storage = if parts.method.is_safe() {
        state.sessions.get(id).unwrap_or_default()
    } else {
        state.sessions.get_or_create(id)
    };
    Ok(Some(LocalSession {
        id: id.to_string(),
        storage,
    }))
}

#[async_trait]
impl FromRequestParts<AppState> for LocalSession {
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        session_from(parts, state)?.ok_or((
            StatusCode::BAD_REQUEST,
            format!("missing {} header", SESSION_HEADER),
        ))
    }
}

/// Whose data a request reads and writes: a signed-in user (hosted store) or
/// an anonymous session (local storage). A bearer token takes precedence.
pub enum Owner {
    User(Uuid),
    Session(Arc<MemoryStorage>),
}

#[async_trait]
impl FromRequestParts<AppState> for Owner {
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        if let Some(user_id) = bearer_user(parts, &keys)? {
            return Ok(Owner::User(user_id));
        }
        match session_from(parts, state)? {
            Some(session) => Ok(Owner::Session(session.storage)),
            None => Err(unauthorized(&format!(
                "sign in or send a {} header",
                SESSION_HEADER
            ))),
        }
    }
}
