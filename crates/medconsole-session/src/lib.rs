//! Session layer for the medconsole client.
//!
//! This crate owns everything about "who is signed in":
//!
//! 1. **Token codec**: unverified decoding of a bearer token's claims
//!    ([`codec::decode`], [`codec::is_expired`], [`codec::has_role`])
//! 2. **Storage gateway**: the [`KeyValueStore`] backends holding
//!    `auth_token` and `user_info`
//! 3. **Session manager**: [`SessionManager`], the single writer of the
//!    stored session and the answer to "is there a usable admin session"
//!
//! # How it fits in the stack
//!
//! ```text
//! Transport / Presence (above)  ← read the token, clear it on 401
//!     ↕
//! Session Layer (this crate)    ← decodes and persists the session
//!     ↕
//! KeyValueStore (below)         ← memory, file, or detached
//! ```
//!
//! Client-side claim checks are a UX shortcut only. The API verifies the
//! token on every request and stays the authority on authorization.

pub mod codec;

mod claims;
mod error;
mod manager;
mod store;

pub use claims::{ADMIN_ROLE, Claims};
pub use error::{SessionError, StoreError};
pub use manager::SessionManager;
pub use store::{FileStore, IDENTITY_KEY, KeyValueStore, MemoryStore, NullStore, TOKEN_KEY};
