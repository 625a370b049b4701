use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// States in the Election lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionState {
    /// Under construction; candidates may still change.
    Draft,
    /// Open: credentials can be issued and votes cast.
    Active,
    /// Finished. The ledger is read-only and may be tallied.
    Closed,
}

impl Display for ElectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Closed => "closed",
        };
        write!(f, "{name}")
    }
}
