//! Read/unread bookkeeping and placement of the "jump to new messages"
//! affordance.

use crate::transcript::activity::ActivityId;
use crate::transcript::flatten::RenderDescriptor;

/// Tracks the most recent activity the user has seen. Explicit state, updated
/// once per recomputation pass; the host's acknowledgment policy may also set
/// it directly.
#[derive(Debug, Default)]
pub struct ReadTracker {
    last_read: Option<ActivityId>,
}

impl ReadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_read(&self) -> Option<&ActivityId> {
        self.last_read.as_ref()
    }

    /// Acknowledge the newest activity while the surface is stuck to bottom.
    pub fn observe(&mut self, stuck_to_bottom: bool, last_visible: Option<&ActivityId>) {
        if stuck_to_bottom {
            if let Some(id) = last_visible {
                self.last_read = Some(id.clone());
            }
        }
    }

    pub fn set_last_read(&mut self, id: Option<ActivityId>) {
        self.last_read = id;
    }
}

/// Where the affordance is inserted, if anywhere.
///
/// `None` suppresses it: everything read, the surface stuck to or animating
/// toward the bottom, or hidden by configuration. Otherwise the returned
/// value is the descriptor position immediately after the last read activity.
pub(crate) fn affordance_position(
    last_read: Option<&ActivityId>,
    descriptors: &[RenderDescriptor],
    stuck_to_bottom: bool,
    animating_to_end: bool,
    hidden_by_style: bool,
) -> Option<usize> {
    if hidden_by_style || stuck_to_bottom || animating_to_end {
        return None;
    }
    let last_read = last_read?;
    let read_position = descriptors
        .iter()
        .position(|descriptor| descriptor.activity_id() == Some(last_read))?;
    let after = read_position + 1;
    (after < descriptors.len()).then_some(after)
}
