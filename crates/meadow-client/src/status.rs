//! Human-readable connection status.

use std::fmt;

use meadow_core::{Fault, SessionStatus};

/// Connection status as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Never started, or hard-reset
    Idle,
    /// Waiting for a transport to open
    Connecting {
        /// Reconnect attempt, 0 for the first connect
        attempt: u32,
    },
    /// Transport open
    Connected,
    /// Shutdown in progress
    Closing,
    /// Transport lost, reconnect pending
    Reconnecting {
        /// Upcoming attempt
        attempt: u32,
    },
    /// Transport closed, no reconnect pending
    Disconnected,
}

impl ConnectionStatus {
    /// Derive the status from session state.
    pub fn from_session(status: SessionStatus, attempt: u32, reconnect_pending: bool) -> Self {
        match status {
            SessionStatus::Idle => Self::Idle,
            SessionStatus::Connecting => Self::Connecting { attempt },
            SessionStatus::Open => Self::Connected,
            SessionStatus::Closing => Self::Closing,
            SessionStatus::Closed if reconnect_pending => Self::Reconnecting { attempt },
            SessionStatus::Closed => Self::Disconnected,
        }
    }

    /// True only while commands can be sent.
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Not connected"),
            Self::Connecting { attempt: 0 } => f.write_str("Connecting..."),
            Self::Connecting { attempt } => write!(f, "Connecting (attempt {attempt})..."),
            Self::Connected => f.write_str("Connected"),
            Self::Closing => f.write_str("Disconnecting..."),
            Self::Reconnecting { attempt } => {
                write!(f, "Disconnected. Reconnecting... (attempt {attempt})")
            },
            Self::Disconnected => f.write_str("Disconnected"),
        }
    }
}

/// Everything a status line shows, in one value.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    /// Connection status
    pub connection: ConnectionStatus,
    /// Most recent undismissed fault
    pub last_error: Option<Fault>,
    /// Most recent success message from the authority
    pub last_notice: Option<String>,
    /// Reconnect attempts allowed by the policy, `None` if unbounded
    pub attempt_limit: Option<u32>,
}

impl StatusReport {
    /// Connection status with the attempt limit, if there is one.
    pub fn headline(&self) -> String {
        match (self.connection, self.attempt_limit) {
            (ConnectionStatus::Reconnecting { attempt }, Some(limit)) => {
                format!("Disconnected. Reconnecting... (attempt {attempt} of {limit})")
            },
            (ConnectionStatus::Connecting { attempt }, Some(limit)) if attempt > 0 => {
                format!("Connecting (attempt {attempt} of {limit})...")
            },
            (connection, _) => connection.to_string(),
        }
    }
}

impl Default for StatusReport {
    fn default() -> Self {
        Self {
            connection: ConnectionStatus::Idle,
            last_error: None,
            last_notice: None,
            attempt_limit: None,
        }
    }
}
