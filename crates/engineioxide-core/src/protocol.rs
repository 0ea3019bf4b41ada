use std::{fmt, str::FromStr};

/// The `EIO` version is neither 3 nor 4.
#[derive(Debug)]
pub struct UnknownProtocolVersionError;
impl fmt::Display for UnknownProtocolVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown protocol version")
    }
}
impl std::error::Error for UnknownProtocolVersionError {}

/// The engine.io protocol version
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// The protocol version 3, the client is in charge of the heartbeat
    V3 = 3,
    /// The protocol version 4, the server is in charge of the heartbeat
    #[default]
    V4 = 4,
}

impl ProtocolVersion {
    /// The value of the `EIO` query parameter for this version
    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolVersion::V3 => "3",
            ProtocolVersion::V4 => "4",
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolVersion {
    type Err = UnknownProtocolVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "3" => Ok(ProtocolVersion::V3),
            "4" => Ok(ProtocolVersion::V4),
            _ => Err(UnknownProtocolVersionError),
        }
    }
}
