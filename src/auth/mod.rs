//! Authentication module for the feed server
//!
//! Login throttling, credential checks, bearer token issuance and the
//! gateway that guards the feed routes.

pub mod credentials;
pub mod handlers;
pub mod middleware;
pub mod rate_limit;
pub mod token;

pub use credentials::{BcryptHasher, CredentialVerifier, PasswordHasher};
pub use middleware::AuthGateway;
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use token::{Claims, Identity, TokenService};
