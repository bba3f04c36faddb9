//! Style options recognized by the transcript pipeline.

use crate::error::Result;
use crate::transcript::activity::SenderRole;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which group boundary the avatar callout attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvatarGrouping {
    Sender,
    #[default]
    Status,
    /// Show the callout on every activity, ignoring group boundaries.
    EveryActivity,
}

/// Numeric-or-boolean snap coefficient. Booleans map to 1/0; range clamping
/// happens at the point of use (activity count to `>= 0`, page fraction to
/// `[0, 1]`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapCoefficient {
    Enabled(bool),
    Value(f64),
}

impl Default for SnapCoefficient {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

impl SnapCoefficient {
    pub fn as_f64(self) -> f64 {
        match self {
            SnapCoefficient::Enabled(true) => 1.0,
            SnapCoefficient::Enabled(false) => 0.0,
            SnapCoefficient::Value(value) if value.is_finite() => value,
            SnapCoefficient::Value(_) => 0.0,
        }
    }
}

/// Host-provided styling knobs that affect the pipeline. Unrecognized keys in
/// a JSON payload are ignored so hosts can share one config object with their
/// presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleOptions {
    /// `false` disables timestamps everywhere.
    pub group_timestamp: bool,
    pub show_avatar_in_group: AvatarGrouping,
    /// Sign decides whether the callout sits above (`>= 0`) or below (`< 0`)
    /// the bubble.
    pub bubble_nub_offset: f64,
    pub bubble_from_user_nub_offset: f64,
    pub hide_scroll_to_end_button: bool,
    pub auto_scroll_snap_on_activity: SnapCoefficient,
    pub auto_scroll_snap_on_activity_offset: f64,
    pub auto_scroll_snap_on_page: SnapCoefficient,
    pub auto_scroll_snap_on_page_offset: f64,
    /// How long a live-region announcement lingers before fading.
    pub internal_live_region_fade_after: Duration,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            group_timestamp: true,
            show_avatar_in_group: AvatarGrouping::default(),
            bubble_nub_offset: 0.0,
            bubble_from_user_nub_offset: 0.0,
            hide_scroll_to_end_button: false,
            auto_scroll_snap_on_activity: SnapCoefficient::default(),
            auto_scroll_snap_on_activity_offset: 0.0,
            auto_scroll_snap_on_page: SnapCoefficient::default(),
            auto_scroll_snap_on_page_offset: 0.0,
            internal_live_region_fade_after: Duration::from_secs(1),
        }
    }
}

impl StyleOptions {
    /// Parse options from a JSON value, e.g. host configuration.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Nub offset applicable to a given sender.
    pub(crate) fn nub_offset_for(&self, sender: SenderRole) -> f64 {
        match sender {
            SenderRole::User => self.bubble_from_user_nub_offset,
            SenderRole::Bot => self.bubble_nub_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let style = StyleOptions::default();
        assert!(style.group_timestamp);
        assert_eq!(style.show_avatar_in_group, AvatarGrouping::Status);
        assert!(!style.hide_scroll_to_end_button);
        assert_eq!(style.auto_scroll_snap_on_activity.as_f64(), 0.0);
    }

    #[test]
    fn snap_coefficient_accepts_bools_and_numbers() {
        let style = StyleOptions::from_value(serde_json::json!({
            "autoScrollSnapOnActivity": true,
            "autoScrollSnapOnPage": 0.5,
            "autoScrollSnapOnPageOffset": -10.0,
        }))
        .unwrap();
        assert_eq!(style.auto_scroll_snap_on_activity.as_f64(), 1.0);
        assert_eq!(style.auto_scroll_snap_on_page.as_f64(), 0.5);
        assert_eq!(style.auto_scroll_snap_on_page_offset, -10.0);
    }

    #[test]
    fn nub_offset_is_per_sender() {
        let style = StyleOptions {
            bubble_nub_offset: 4.0,
            bubble_from_user_nub_offset: -4.0,
            ..StyleOptions::default()
        };
        assert_eq!(style.nub_offset_for(SenderRole::Bot), 4.0);
        assert_eq!(style.nub_offset_for(SenderRole::User), -4.0);
    }
}
