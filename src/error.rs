//! The library's closed error set.
//!
//! Every fallible operation in `switcher` returns one of these variants —
//! callers match on `Error` rather than downcasting an opaque `anyhow::Error`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A UDP datagram's magic bytes or length didn't match any known Switcher
    /// framing. Contained within the bridge — never surfaced past discovery.
    #[error("datagram did not originate from a switcher device")]
    NotSwitcherOrigin,

    /// A datagram passed the magic/length gate but its model code is not in
    /// the known `DeviceType` table.
    #[error("unknown device model code {0:?}")]
    UnknownModel(String),

    /// The login response was missing, empty, or malformed.
    #[error("login request was not successful")]
    LoginFailed,

    /// A non-login request's response was missing, empty, or malformed.
    #[error("{0} request was not successful")]
    RequestFailed(&'static str),

    /// A read or connect exceeded its deadline.
    #[error("operation timed out")]
    Timeout,

    /// An argument failed validation (out-of-range duration, name too long,
    /// shutter position out of bounds, negative timer, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `RemoteManager::get_remote` was called with an id not present in the
    /// loaded database.
    #[error("unknown remote id {0:?}")]
    UnknownRemote(String),

    /// The requested mode is not in the remote's `supported_modes`.
    #[error("invalid mode \"{requested}\", available modes for this device are: {available}")]
    UnsupportedMode { requested: String, available: String },

    /// `get_swing_command` was called on a remote whose swing capability is
    /// not independent (none, or folded into the main command).
    #[error("swing special function doesn't apply on this remote {0}")]
    SwingNotApplicable(String),

    /// A remote database JSON document didn't match the expected schema.
    #[error("invalid remote definition: {0}")]
    InvalidRemoteDefinition(String),

    /// An explicit remote database path was given and does not exist.
    #[error("the specified remote db path {0} does not exist")]
    NotFound(String),

    /// The peer closed the connection mid-session (an empty read where a
    /// full frame was expected, outside of the login handshake).
    #[error("transport closed unexpectedly")]
    TransportClosed,

    /// A socket bind, connect, or I/O operation failed at the OS level.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Starting a bridge or session that is already running/connected.
    #[error("already running")]
    AlreadyRunning,
}

pub type Result<T> = std::result::Result<T, Error>;
