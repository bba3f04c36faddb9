//! Flattening of the group tree into per-activity render descriptors.

use crate::transcript::activity::{Activity, ActivityId, ActivityKey, SenderRole};
use crate::transcript::grouping::SenderGroup;
use crate::transcript::render::SimpleRendererFactory;
use crate::transcript::style::{AvatarGrouping, StyleOptions};

/// Per-activity render metadata produced by one recomputation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderDescriptor {
    pub key: ActivityKey,
    /// Position in the visible activity sequence.
    pub position: usize,
    pub first_in_sender_group: bool,
    pub last_in_sender_group: bool,
    pub first_in_status_group: bool,
    pub last_in_status_group: bool,
    /// Timestamps are shown once per status run, on its last activity.
    pub hide_timestamp: bool,
    /// Whether the avatar callout is rendered next to this activity.
    pub show_callout: bool,
    /// Whether assistive technology should read this activity aloud.
    pub should_speak: bool,
    /// Changes only when the effective displayed text changes; drives
    /// live-region re-announcements.
    pub live_region_key: String,
}

impl RenderDescriptor {
    pub fn activity_id(&self) -> Option<&ActivityId> {
        self.key.activity_id()
    }
}

pub(crate) struct FlattenInputs<'a> {
    /// Visible activities, in order.
    pub visible: &'a [&'a Activity],
    pub tree: &'a [SenderGroup],
    pub style: &'a StyleOptions,
    /// Avatar factory; no factory or a `None` renderer means no callout.
    pub avatars: Option<&'a dyn SimpleRendererFactory>,
    /// Visible position of the last acknowledged activity, if any.
    pub last_read_position: Option<usize>,
}

/// Walk sender groups, then status groups, then activities, assigning render
/// metadata to each visible activity in order.
pub(crate) fn flatten(inputs: &FlattenInputs<'_>) -> Vec<RenderDescriptor> {
    let mut descriptors = Vec::with_capacity(inputs.visible.len());

    for sender_group in inputs.tree {
        let sender_first = sender_group
            .status_groups
            .first()
            .and_then(|status_group| status_group.indices.first())
            .copied();
        let sender_last = sender_group
            .status_groups
            .last()
            .and_then(|status_group| status_group.indices.last())
            .copied();

        for status_group in &sender_group.status_groups {
            let run_len = status_group.indices.len();
            for (run_position, &position) in status_group.indices.iter().enumerate() {
                let activity = inputs.visible[position];
                let key = activity.key_at(position);

                let first_in_status_group = run_position == 0;
                let last_in_status_group = run_position + 1 == run_len;
                let first_in_sender_group = sender_first == Some(position);
                let last_in_sender_group = sender_last == Some(position);

                let hide_timestamp = !inputs.style.group_timestamp || !last_in_status_group;
                let show_callout = callout_visible(
                    inputs.style,
                    activity,
                    inputs.avatars,
                    first_in_sender_group,
                    last_in_sender_group,
                    first_in_status_group,
                    last_in_status_group,
                );
                let unread = inputs
                    .last_read_position
                    .map_or(true, |last_read| position > last_read);
                let should_speak = unread && activity.sender == SenderRole::Bot;
                let live_region_key = format!("{key}|{}", activity.effective_text());

                descriptors.push(RenderDescriptor {
                    key,
                    position,
                    first_in_sender_group,
                    last_in_sender_group,
                    first_in_status_group,
                    last_in_status_group,
                    hide_timestamp,
                    show_callout,
                    should_speak,
                    live_region_key,
                });
            }
        }
    }

    descriptors
}

fn callout_visible(
    style: &StyleOptions,
    activity: &Activity,
    avatars: Option<&dyn SimpleRendererFactory>,
    first_in_sender_group: bool,
    last_in_sender_group: bool,
    first_in_status_group: bool,
    last_in_status_group: bool,
) -> bool {
    let has_avatar = avatars.is_some_and(|factory| factory.create(activity).is_some());
    if !has_avatar {
        return false;
    }

    // Non-negative nub offsets point above the bubble, so the callout leads
    // the group; negative offsets trail it.
    let top_side = style.nub_offset_for(activity.sender) >= 0.0;
    match style.show_avatar_in_group {
        AvatarGrouping::Sender => {
            if top_side {
                first_in_sender_group
            } else {
                last_in_sender_group
            }
        }
        AvatarGrouping::Status => {
            if top_side {
                first_in_status_group
            } else {
                last_in_status_group
            }
        }
        AvatarGrouping::EveryActivity => true,
    }
}
