//! Business logic services for the shop API.
//!
//! # Services
//!
//! - `auth` - Registration, login and password changes (Argon2id)
//! - `checkout` - Order line snapshots and totals
//! - `jwt` - Session tokens and the session cookie
//! - `oauth` - Google sign-in (authorization-code flow)

pub mod auth;
pub mod checkout;
pub mod jwt;
pub mod oauth;

pub use auth::{AuthError, AuthService};
pub use checkout::CheckoutError;
pub use jwt::{Claims, JwtKeys};
pub use oauth::OAuthClient;
