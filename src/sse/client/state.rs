use std::fmt;

/// Lifecycle state of a [`Client`](super::Client)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientState {
    /// not started, or stopped
    #[default]
    Closed,
    /// logging in, waiting to reconnect, or opening the stream
    Connecting,
    /// stream is open and being read
    Running,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Closed => "CLOSED",
            Self::Connecting => "CONNECTING",
            Self::Running => "RUNNING",
        };
        f.write_str(s)
    }
}
