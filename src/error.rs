use std::sync::Arc;

use thiserror::Error;

/// Errors produced by the client and the sync managers.
///
/// Sentinel variants are stable and intended for matching; transport failures
/// carry their underlying cause.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The server rejected the configured username/password.
    #[error("authentication failed: bad credentials")]
    BadCredentials,

    /// The server banned this IP after too many failed login attempts.
    #[error("authentication failed: IP is banned")]
    IpBanned,

    /// A response status that no endpoint contract accounts for.
    #[error("unexpected status {status} from {endpoint}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    #[error("http request failed")]
    Http(#[from] reqwest::Error),

    #[error("invalid url")]
    InvalidUrl(#[from] url::ParseError),

    #[error("torrent {hash} not found")]
    TorrentNotFound { hash: String },

    #[error("category {name} not found")]
    CategoryNotFound { name: String },

    /// 409 responses: the server refused because a precondition does not hold.
    #[error("precondition failed on {endpoint}: {reason}")]
    Conflict {
        endpoint: String,
        reason: &'static str,
    },

    #[error("torrent queueing is not enabled")]
    QueueingDisabled,

    #[error("torrent metadata has not finished downloading")]
    MetadataNotReady,

    #[error("save path is empty")]
    EmptySavePath,

    #[error("invalid category name {name:?}")]
    InvalidCategoryName { name: String },

    #[error("invalid peer list")]
    InvalidPeers,

    #[error("invalid priority value")]
    InvalidPriority,

    #[error("no torrent sources were provided")]
    EmptyTorrentSource,

    #[error("cannot parse version string {0:?}")]
    InvalidVersion(String),

    /// The connected server is too old for the requested feature.
    #[error("server does not support {feature} (requires Web API {required})")]
    UnsupportedVersion {
        feature: &'static str,
        required: crate::version::ApiVersion,
    },

    #[error("reannounce attempts exhausted for {hash}")]
    ReannounceBudgetExceeded { hash: String },

    /// Outcome of a sync another caller performed on our behalf.
    ///
    /// The sync manager collapses concurrent syncs into one network call;
    /// every caller of that round observes the same underlying failure.
    #[error("sync failed: {0}")]
    Sync(Arc<Error>),
}

impl Error {
    pub(crate) fn unexpected_status(endpoint: &str, status: reqwest::StatusCode) -> Self {
        Self::UnexpectedStatus {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        }
    }

    /// Whether a failed request may be re-dispatched.
    ///
    /// Timeouts map to an expired deadline and are final; connection-level
    /// failures are worth another attempt.
    pub(crate) fn retryable(err: &reqwest::Error) -> bool {
        !err.is_timeout() && (err.is_connect() || err.is_request())
    }
}
