//! Error types for the Pithos node bootstrap layer.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the Pithos bootstrap layer.
#[derive(Error, Debug)]
pub enum Error {
    /// The repository root (or candidate root) is not writable by this user.
    #[error("{} is not writable by the current user", .path.display())]
    PermissionDenied {
        path: PathBuf,
    },

    /// An I/O failure that is neither "not found" nor "permission denied".
    #[error("unexpected error while checking writability of {}: {source}", .path.display())]
    UnexpectedIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A repository already exists at the given path. Reinitializing would
    /// overwrite the node's keys, so this is always refused.
    #[error("repository at {} is already initialized; refusing to overwrite node keys", .path.display())]
    RepoExists {
        path: PathBuf,
    },

    /// No initialized repository was found at the given path.
    #[error("no repository found at {}", .path.display())]
    RepoNotFound {
        path: PathBuf,
    },

    /// A configuration profile name did not match any registered transform.
    #[error("invalid configuration profile: {name}")]
    UnknownProfile {
        name: String,
    },

    /// Configuration generation or validation errors
    #[error("configuration error: {0}")]
    Config(String),

    /// A profile transform was found but failed to apply.
    #[error("profile transform failed: {0}")]
    Profile(String),

    /// A peer address string could not be parsed. Fatal to the whole
    /// connection batch: malformed addresses are a configuration bug.
    #[error("invalid peer address {addr}: {reason}")]
    AddressParse {
        addr: String,
        reason: String,
    },

    /// A single peer dial failed. Recovered locally by the peer connector.
    #[error("dial to {peer} failed: {reason}")]
    Dial {
        peer: String,
        reason: String,
    },

    /// Node bring-up failure (transport, listener, or swarm construction).
    #[error("node construction failed: {0}")]
    Construction(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;
    use std::io;

    #[test]
    fn test_error_display() {
        let err = Error::PermissionDenied { path: PathBuf::from("/tmp/repo") };
        assert_eq!(format!("{}", err), "/tmp/repo is not writable by the current user");

        let err = Error::RepoExists { path: PathBuf::from("/data/pithos") };
        assert!(format!("{}", err).contains("refusing to overwrite node keys"));

        let err = Error::RepoNotFound { path: PathBuf::from("/data/pithos") };
        assert_eq!(format!("{}", err), "no repository found at /data/pithos");

        let err = Error::UnknownProfile { name: "turbo".to_string() };
        assert_eq!(format!("{}", err), "invalid configuration profile: turbo");

        let err = Error::Config("bad key length".to_string());
        assert_eq!(format!("{}", err), "configuration error: bad key length");

        let err = Error::Other("something else".to_string());
        assert_eq!(format!("{}", err), "something else");
    }

    #[test]
    fn test_address_parse_carries_offending_address() {
        let err = Error::AddressParse {
            addr: "not-a-multiaddr".to_string(),
            reason: "unknown protocol".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("not-a-multiaddr"));
        assert!(msg.contains("unknown protocol"));
    }

    #[test]
    fn test_dial_error_names_peer() {
        let err = Error::Dial {
            peer: "12D3KooWExample".to_string(),
            reason: "connection refused".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("12D3KooWExample"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let converted: Error = io_error.into();

        match converted {
            Error::Io(_) => (),
            _ => panic!("expected Io error"),
        }
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let converted: Error = json_error.into();

        match converted {
            Error::Serialization(_) => (),
            _ => panic!("expected Serialization error"),
        }
    }

    #[test]
    fn test_unexpected_io_keeps_source() {
        let source = io::Error::new(io::ErrorKind::Other, "disk on fire");
        let err = Error::UnexpectedIo { path: PathBuf::from("/repo"), source };

        assert!(StdError::source(&err).is_some());
        assert!(format!("{}", err).contains("/repo"));
    }

    #[test]
    fn test_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
