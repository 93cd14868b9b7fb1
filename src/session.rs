// Session management: one cached authentication token per supplier
// connection, acquired lazily and refreshed after expiry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::client::ProtocolClient;
use crate::envelope::Params;
use crate::error::ProtocolError;

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    /// Checked before any network call so missing configuration fails
    /// locally instead of as a predictable bad-request round-trip.
    fn validate(&self) -> Result<(), ProtocolError> {
        if self.login.trim().is_empty() || self.password.trim().is_empty() {
            return Err(ProtocolError::Auth(
                "supplier credentials not configured".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SessionToken {
    pub value: String,
    pub acquired_at: Instant,
    pub expires_at: Instant,
}

impl SessionToken {
    pub fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Owns the token cache for one supplier connection. Instances are
/// injectable so tests and concurrent connections stay isolated; there is no
/// process-wide singleton.
pub struct SessionManager {
    client: Arc<ProtocolClient>,
    credentials: Credentials,
    ttl: Duration,
    cached: Mutex<Option<SessionToken>>,
}

impl SessionManager {
    pub fn new(client: Arc<ProtocolClient>, credentials: Credentials) -> Self {
        Self::with_ttl(client, credentials, DEFAULT_TOKEN_TTL)
    }

    pub fn with_ttl(client: Arc<ProtocolClient>, credentials: Credentials, ttl: Duration) -> Self {
        Self {
            client,
            credentials,
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// Return the cached token while it is valid, otherwise authenticate.
    ///
    /// Two concurrent callers that both observe an expired token may both
    /// authenticate; the second result wins and the redundant call is
    /// harmless. An expired token is never returned.
    pub async fn acquire(&self) -> Result<SessionToken, ProtocolError> {
        self.credentials.validate()?;

        if let Some(token) = self.cached_token() {
            debug!("using cached session token");
            return Ok(token);
        }

        debug!("requesting new session token");
        let params = Params::new()
            .push("login", self.credentials.login.clone())
            .push("password", self.credentials.password.clone());

        // The lock is not held across the call; see the race note above.
        let payload = match self.client.call("Connect", params).await {
            Ok(payload) => payload,
            Err(e) => {
                // A known-bad token must not be retried on the next call.
                self.invalidate();
                return Err(e);
            }
        };

        let value = match payload.as_str() {
            Ok(value) => value.to_string(),
            Err(e) => {
                self.invalidate();
                return Err(e);
            }
        };
        if value.trim().is_empty() {
            self.invalidate();
            return Err(ProtocolError::Auth(
                "authenticate call returned an empty token".to_string(),
            ));
        }

        let now = Instant::now();
        let token = SessionToken {
            value,
            acquired_at: now,
            expires_at: now + self.ttl,
        };
        *self.cached.lock() = Some(token.clone());
        Ok(token)
    }

    /// Clear the cache unconditionally.
    pub fn invalidate(&self) {
        *self.cached.lock() = None;
        debug!("session token cache cleared");
    }

    /// Force a new authenticate call.
    pub async fn refresh(&self) -> Result<SessionToken, ProtocolError> {
        self.invalidate();
        self.acquire().await
    }

    pub fn cached_token(&self) -> Option<SessionToken> {
        self.cached.lock().clone().filter(SessionToken::is_valid)
    }
}
