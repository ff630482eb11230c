//! Error handling stuff
use displaydoc::Display;
use nix::errno::Errno;
use std::io;
use thiserror::Error;

/// Error type for property reads and writes
///
/// These are ordinary, expected outcomes. None of them are transient and
/// retrying with the same input and connection state gives the same result.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum PropertyError {
    /// Operation not supported by this property or bus mode
    NotSupported,

    /// Value outside the domain of the property
    InvalidArgument,

    /// Property payload or extension not found
    NotFound,
}

impl PropertyError {
    /// Negative POSIX error code for the filesystem layer.
    pub fn errno(self) -> i32 {
        let e = match self {
            Self::NotSupported => Errno::ENOTSUP,
            Self::InvalidArgument => Errno::EINVAL,
            Self::NotFound => Errno::ENOENT,
        };
        -(e as i32)
    }
}

/// Error type for [`crate::adapter`] primitives
#[derive(Debug, Display, Error)]
pub enum AdapterError {
    /// Adapter not present
    NotPresent,

    /// Primitive not supported by this adapter
    NotSupported,

    /// Hardware error: {0}
    Hardware(String),

    /// IO Failed: {0}
    Io(#[from] io::Error),
}

/// Error type for [`crate::config`]
#[derive(Debug, Display, Error)]
pub enum ConfigError {
    /// Couldn't parse config: {0}
    Parse(String),

    /// IO Failed: {0}
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno() {
        assert_eq!(PropertyError::NotSupported.errno(), -(Errno::ENOTSUP as i32));
        assert_eq!(PropertyError::InvalidArgument.errno(), -22);
        assert_eq!(PropertyError::NotFound.errno(), -2);
    }

    #[test]
    fn display() {
        assert_eq!(
            PropertyError::InvalidArgument.to_string(),
            "Value outside the domain of the property"
        );
        assert_eq!(
            AdapterError::Hardware("stuck bus".into()).to_string(),
            "Hardware error: stuck bus"
        );
    }
}
