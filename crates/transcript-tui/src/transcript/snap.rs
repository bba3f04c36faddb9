//! Auto-scroll snap offsets: settle streaming content at a configured
//! position instead of flush against the bottom.

use crate::transcript::elements::ElementTable;
use crate::transcript::flatten::RenderDescriptor;
use crate::transcript::style::StyleOptions;

/// Viewport geometry for one snap computation, in the surface's scroll units.
#[derive(Debug, Clone, Copy)]
pub struct SnapInputs {
    pub viewport_height: f64,
    pub scroll_top: f64,
}

/// Correction to apply on top of the default scroll-to-bottom motion.
///
/// Two candidates can be active: snap to the activity N past the last
/// acknowledged one, and snap to a fraction of the viewport relative to the
/// first unacknowledged activity. With both active the smaller correction
/// (least downward movement) wins. With neither, `f64::INFINITY` means the
/// unconstrained scroll-to-bottom behavior stays in charge.
pub(crate) fn snap_offset(
    style: &StyleOptions,
    inputs: SnapInputs,
    descriptors: &[RenderDescriptor],
    elements: &ElementTable,
    last_read_position: Option<usize>,
) -> f64 {
    let on_activity = style.auto_scroll_snap_on_activity.as_f64().max(0.0);
    let on_page = style.auto_scroll_snap_on_page.as_f64().clamp(0.0, 1.0);
    let activity_offset = finite_or_zero(style.auto_scroll_snap_on_activity_offset);
    let page_offset = finite_or_zero(style.auto_scroll_snap_on_page_offset);

    let mut correction = f64::INFINITY;
    // Descriptor position scans start right after the acknowledged activity;
    // with nothing acknowledged the whole transcript counts as unread.
    let first_unread = last_read_position.map_or(0, |position| position + 1);

    if on_activity >= 1.0 {
        // Fractional counts snap to the floor'd activity. The cast saturates
        // for huge coefficients; checked addition keeps an out-of-range
        // target unconstrained instead of overflowing.
        let steps = (on_activity.trunc() as usize).saturating_sub(1);
        if let Some(rect) = first_unread
            .checked_add(steps)
            .and_then(|target| descriptors.get(target))
            .and_then(|descriptor| elements.get(&descriptor.key))
        {
            correction = correction.min(
                rect.bottom() - inputs.viewport_height - inputs.scroll_top + activity_offset,
            );
        }
    }

    if on_page > 0.0 {
        if let Some(rect) = descriptors
            .get(first_unread)
            .and_then(|descriptor| elements.get(&descriptor.key))
        {
            correction = correction.min(
                rect.top - inputs.scroll_top - inputs.viewport_height * (1.0 - on_page)
                    + page_offset,
            );
        }
    }

    correction
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
