use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Class-of-service priority of a message, lowest to highest.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum Priority {
    /// No priority was set.
    #[default]
    Unspecified,
    /// Low priority, no bandwidth assurance.
    CS0,
    /// Standard, undifferentiated application.
    CS1,
    /// Operations, administration and management.
    CS2,
    /// Multimedia streaming.
    CS3,
    /// Real-time interactive.
    CS4,
    /// Signaling.
    CS5,
    /// Network control.
    CS6,
}

impl Priority {
    /// Lowest priority accepted for RPC requests.
    pub const MIN_RPC: Self = Self::CS4;

    /// Whether a request may be sent at this priority.
    #[must_use]
    pub fn is_rpc_eligible(self) -> bool {
        self >= Self::MIN_RPC
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unspecified => "UNSPECIFIED",
            Self::CS0 => "CS0",
            Self::CS1 => "CS1",
            Self::CS2 => "CS2",
            Self::CS3 => "CS3",
            Self::CS4 => "CS4",
            Self::CS5 => "CS5",
            Self::CS6 => "CS6",
        };
        f.write_str(name)
    }
}
