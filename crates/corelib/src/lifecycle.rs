//! Service lifecycle states reported by nodes and groups.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Lifecycle {
    #[default]
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
    OnFire,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lifecycle::Created => "CREATED",
            Lifecycle::Starting => "STARTING",
            Lifecycle::Running => "RUNNING",
            Lifecycle::Stopping => "STOPPING",
            Lifecycle::Stopped => "STOPPED",
            Lifecycle::OnFire => "ON_FIRE",
        })
    }
}
