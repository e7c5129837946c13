//! # Gatehouse
//!
//! `gatehouse` is the session/token authentication service in front of a blog
//! CRUD API. It owns everything about proving who a caller is; the CRUD
//! service consumes its verdicts and never touches token internals.
//!
//! ## Token model
//!
//! Two HS256 JWT classes signed with independent secrets:
//!
//! - **Access tokens** (15 minutes): stateless bearer credentials carrying
//!   `{id, isAdmin}`. Nothing is stored server-side unless one is explicitly
//!   blacklisted at logout.
//! - **Refresh tokens** (7 days): registry-backed. `refresh_token:{user_id}`
//!   in Redis holds the single currently-valid refresh token per user, so
//!   issuing a new one silently logs out every other device and "logout all"
//!   is one key deletion.
//!
//! ## CSRF
//!
//! Double-submit with a server-side registry: a readable `csrf_token` cookie
//! must be echoed in the `X-CSRF-Token` header and exist under
//! `csrf_token:{user_id}:{token}` in Redis. Tokens are multi-use within
//! their TTL.
//!
//! ## Storage split
//!
//! Durable accounts live in `PostgreSQL`; every ephemeral artifact (refresh
//! registry, blacklist, CSRF registry) lives in Redis behind the
//! [`kv::KvStore`] trait, so token state never outlives its TTL and tests
//! run against an in-memory store.

pub mod api;
pub mod cli;
pub mod kv;
