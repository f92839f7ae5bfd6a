//! Live presence for the medconsole client.
//!
//! One [`PresenceChannel`] holds one socket to the API, authenticated with
//! the session token, and republishes the server's `online_stats` pushes as
//! a process-wide [`PresenceState`]. Any number of [`PresenceReader`]s can
//! watch that state; only the channel writes it.
//!
//! ```rust,no_run
//! use medconsole_presence::PresenceChannel;
//! use medconsole_session::SessionManager;
//!
//! # async fn run() -> Result<(), medconsole_presence::PresenceError> {
//! let channel = PresenceChannel::new("http://localhost:4000", SessionManager::in_memory())?;
//! let mut reader = channel.subscribe();
//! channel.connect();
//! while reader.changed().await {
//!     let state = reader.snapshot();
//!     println!("{} users, {} doctors online", state.user_count, state.doctor_count);
//! }
//! # Ok(())
//! # }
//! ```

mod channel;
mod error;
mod reconnect;
mod state;

pub use channel::{ConnectOutcome, DEFAULT_SOCKET_PATH, PresenceChannel, PresenceReader};
pub use error::PresenceError;
pub use reconnect::ReconnectPolicy;
pub use state::{ChannelStatus, PresenceState};
