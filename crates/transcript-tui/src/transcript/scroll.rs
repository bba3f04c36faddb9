//! Scroll coordination between semantic targets and the host surface.
//!
//! The host surface owns stick-to-bottom and animation state; this module
//! only translates between activity identities and raw offsets, and derives
//! the persistable position for incoming scroll events.

use crate::error::{Error, Result};
use crate::transcript::activity::{ActivityId, ActivityKey};
use crate::transcript::elements::ElementTable;
use crate::transcript::flatten::RenderDescriptor;

/// Host scroll surface contract: simple synchronous accessors over the
/// scrollable primitive.
pub trait ScrollSurface {
    fn stuck_to_bottom(&self) -> bool;
    fn animating_to_end(&self) -> bool;
    fn viewport_height(&self) -> f64;
    fn scroll_top(&self) -> f64;
    fn scroll_to(&mut self, offset: f64);
}

/// Scroll command accepted from hosts. Exactly one addressing mode must be
/// populated: a raw offset, or an activity to bring into view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollCommand {
    pub activity_id: Option<ActivityId>,
    pub scroll_top: Option<f64>,
}

impl ScrollCommand {
    pub fn to_offset(offset: f64) -> Self {
        Self {
            activity_id: None,
            scroll_top: Some(offset),
        }
    }

    pub fn to_activity(id: impl Into<ActivityId>) -> Self {
        Self {
            activity_id: Some(id.into()),
            scroll_top: None,
        }
    }
}

/// Position reported to the host's persistence hook on scroll changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollPosition {
    pub activity_id: Option<ActivityId>,
    pub scroll_top: f64,
}

/// Resolve a command into a concrete offset for the surface.
///
/// Raw offsets pass straight through without consulting any mounted element.
/// Activity targets align the element's top, unless that would leave its
/// bottom outside the viewport, in which case the bottom edge wins (minimal
/// movement, bottom-priority clamp). An unmounted target resolves to `None`,
/// meaning "not ready yet" rather than an error.
pub(crate) fn resolve_scroll_command(
    command: &ScrollCommand,
    elements: &ElementTable,
    viewport_height: f64,
) -> Result<Option<f64>> {
    if let Some(offset) = command.scroll_top {
        return Ok(Some(offset));
    }

    let Some(activity_id) = &command.activity_id else {
        return Err(Error::InvalidScrollTarget);
    };

    let key = ActivityKey::Id(activity_id.clone());
    let Some(rect) = elements.get(&key) else {
        tracing::debug!(
            target: "transcript.scroll",
            activity = %activity_id,
            "scroll target not mounted yet; ignoring"
        );
        return Ok(None);
    };

    let mut offset = rect.top;
    if rect.bottom() > offset + viewport_height {
        offset = rect.bottom() - viewport_height;
    }
    Ok(Some(offset))
}

/// Derive the persistable position for a raw scroll offset: scanning from the
/// newest activity backward, the first mounted activity whose top sits above
/// the viewport's effective bottom, or the first activity when the surface is
/// at its origin.
pub(crate) fn derive_scroll_position(
    scroll_top: f64,
    viewport_height: f64,
    descriptors: &[RenderDescriptor],
    elements: &ElementTable,
) -> ScrollPosition {
    let activity_id = if scroll_top <= 0.0 {
        descriptors
            .first()
            .and_then(|descriptor| descriptor.activity_id().cloned())
    } else {
        let effective_bottom = scroll_top + viewport_height;
        descriptors.iter().rev().find_map(|descriptor| {
            let rect = elements.get(&descriptor.key)?;
            if rect.top < effective_bottom {
                descriptor.activity_id().cloned()
            } else {
                None
            }
        })
    };

    ScrollPosition {
        activity_id,
        scroll_top,
    }
}
