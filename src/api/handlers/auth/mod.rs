//! Auth handlers and supporting modules.
//!
//! Three subsystems share the ephemeral KV store, each owning its own key
//! namespace:
//!
//! - [`tokens::TokenVault`]: JWT issuance/verification, the single-live
//!   refresh-token registry (`refresh_token:`), and the blacklist
//!   (`blacklist:`).
//! - [`csrf::CsrfGuard`]: double-submit CSRF tokens (`csrf_token:`).
//! - The handlers below: sign-up/sign-in/refresh/logout flows, federated
//!   sign-in, account administration, and the pre-signup probes.
//!
//! Admin bootstrap runs once at startup ([`admin::ensure_admin_user`]);
//! request handlers never create privileged accounts.

pub(crate) mod admin;
pub(crate) mod availability;
mod csrf;
pub(crate) mod csrf_token;
mod error;
pub(crate) mod federated;
pub(crate) mod logout;
mod password;
pub(crate) mod principal;
pub(crate) mod refresh;
pub(crate) mod session;
pub(crate) mod signin;
pub(crate) mod signup;
mod state;
mod storage;
mod tokens;
pub(crate) mod types;
pub(crate) mod users;
mod utils;

pub use admin::{ensure_admin_user, AdminBootstrap};
pub use csrf::CsrfGuard;
pub use error::AuthError;
pub use principal::Principal;
pub use state::{parse_expiry, AuthConfig, AuthState};
pub use tokens::{TokenKind, TokenVault};
