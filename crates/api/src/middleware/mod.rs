//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (locked down for a JSON API)
//! 5. CORS (frontend origin with credentials)
//! 6. Rate limiting on auth routes (governor)

pub mod auth;
pub mod guest;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{CurrentUser, OptionalAuth, RequireAdmin, RequireAuth};
pub use guest::{GUEST_COOKIE_NAME, guest_cookie, guest_removal_cookie, guest_token};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
