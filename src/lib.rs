// Supplier integration core: session-authenticated XML protocol client,
// per-supplier admission control, and the pricelist pricing engine.

pub mod client;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod normalize;
pub mod pricelist;
pub mod pricing;
pub mod rate_limit;
pub mod search;
pub mod session;

// Re-export key types for convenience
pub use client::{ClientConfig, HttpTransport, ProtocolClient, Transport, WireResponse};
pub use envelope::{Envelope, ParamValue, Params};
pub use error::ProtocolError;
pub use gateway::SupplierGateway;
pub use normalize::NormalizedValue;
pub use pricelist::{CommonItems, PaymentType, Pricelist, PricelistItem, StayRequest, Unit};
pub use pricing::{LineKind, PriceBreakdownLine, PriceResult, PricingEngine, PricingError};
pub use rate_limit::{Admission, RateLimitConfig, RateLimiter, RateStats};
pub use search::HotelSearchRequest;
pub use session::{Credentials, SessionManager, SessionToken};
