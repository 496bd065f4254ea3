//! Which nodes may serve as seeds.

use corelib::{Lifecycle, Node};
use tracing::trace;

/// Unmanaged, on fire, stopped, or running without serving.
pub fn has_failed(node: &Node) -> bool {
    !node.managed
        || node.service_state == Lifecycle::OnFire
        || (node.service_state == Lifecycle::Running && !node.service_up)
        || node.service_state == Lifecycle::Stopped
}

/// Known hostname and not failed.
pub fn is_viable_seed(node: &Node) -> bool {
    let failed = has_failed(node);
    let viable = node.hostname.is_some() && !failed;
    trace!(
        node = %node.id,
        viable,
        hostname = ?node.hostname,
        service_up = node.service_up,
        state = %node.service_state,
        failed,
        "seed viability"
    );
    viable
}

/// Viable, serving, and RUNNING.
pub fn is_running_seed(node: &Node) -> bool {
    is_viable_seed(node) && node.service_up && node.service_state == Lifecycle::Running
}
