// Ties the admission gate, session cache and protocol client together for
// authenticated supplier operations.

use std::sync::Arc;

use crate::client::ProtocolClient;
use crate::envelope::Params;
use crate::error::ProtocolError;
use crate::normalize::NormalizedValue;
use crate::rate_limit::{Admission, RateLimiter, RateStats};
use crate::session::SessionManager;

/// One gateway per supplier connection.
///
/// Call flow: `admit` (local, before any network) → `acquire` (cached token
/// or fresh authenticate) → protocol call with the token prepended as the
/// first parameter, where the remote schemas expect it.
pub struct SupplierGateway {
    supplier_key: String,
    limiter: Arc<RateLimiter>,
    session: Arc<SessionManager>,
    client: Arc<ProtocolClient>,
}

impl SupplierGateway {
    pub fn new(
        supplier_key: impl Into<String>,
        limiter: Arc<RateLimiter>,
        session: Arc<SessionManager>,
        client: Arc<ProtocolClient>,
    ) -> Self {
        Self {
            supplier_key: supplier_key.into(),
            limiter,
            session,
            client,
        }
    }

    pub async fn call(
        &self,
        operation: &str,
        params: Params,
    ) -> Result<NormalizedValue, ProtocolError> {
        match self.limiter.admit(&self.supplier_key) {
            Admission::Rejected {
                retry_after_secs, ..
            } => return Err(ProtocolError::RateLimited { retry_after_secs }),
            Admission::Allowed { .. } => {}
        }

        let token = self.session.acquire().await?;
        let params = params.prepend("guid", token.value);
        self.client.call(operation, params).await
    }

    pub fn stats(&self) -> Option<RateStats> {
        self.limiter.stats(&self.supplier_key)
    }
}
