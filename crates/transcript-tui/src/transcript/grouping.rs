//! Two-level grouping of visible activities: by sender, then delivery status.
//!
//! The grouping policy is an external collaborator that classifies activities
//! into sender buckets and, independently, status buckets. The partition
//! algorithm here turns those bucket families into an ordered tree without
//! ever reordering the visible sequence. It operates over plain indices into
//! the visible list.

use crate::transcript::activity::Activity;

/// Bucket families returned by a grouping policy. Each inner `Vec<usize>` is
/// one bucket of visible-activity indices; buckets need not be
/// order-preserving, but each family must partition the visible index set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupBuckets {
    pub sender: Vec<Vec<usize>>,
    pub status: Vec<Vec<usize>>,
}

/// Classifies visible activities into sender and status buckets.
pub trait GroupingPolicy {
    fn group(&self, activities: &[&Activity]) -> GroupBuckets;
}

/// Default policy: contiguous runs of equal sender role, and contiguous runs
/// of equal delivery status.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContiguousRuns;

impl GroupingPolicy for ContiguousRuns {
    fn group(&self, activities: &[&Activity]) -> GroupBuckets {
        GroupBuckets {
            sender: runs_by(activities, |activity| activity.sender),
            status: runs_by(activities, |activity| activity.status),
        }
    }
}

fn runs_by<K: PartialEq>(
    activities: &[&Activity],
    classify: impl Fn(&Activity) -> K,
) -> Vec<Vec<usize>> {
    let mut buckets: Vec<Vec<usize>> = Vec::new();
    let mut last: Option<K> = None;

    for (index, activity) in activities.iter().enumerate() {
        let key = classify(activity);
        match (&last, buckets.last_mut()) {
            (Some(previous), Some(bucket)) if *previous == key => bucket.push(index),
            _ => buckets.push(vec![index]),
        }
        last = Some(key);
    }

    buckets
}

/// One run of activities sharing a delivery-status classification inside a
/// sender group. Indices refer to the visible activity sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusGroup {
    pub indices: Vec<usize>,
}

/// Activities sharing a sender classification, split into status runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderGroup {
    pub status_groups: Vec<StatusGroup>,
}

/// Partition the visible sequence into sender groups of status groups.
///
/// Repeatedly takes the first remaining unassigned index, finds its sender
/// bucket, and for each member of that bucket in original order splits off
/// the intersection of (remaining, sender bucket, member's status bucket) as
/// one status group. A sender+status combination that recurs after an
/// intervening different combination therefore yields two separate status
/// groups, never a merged one.
///
/// Policy violations (an index missing from a family, assigned twice, or out
/// of range) are logged and the affected activities are left out of the tree.
pub fn build_group_tree(visible_len: usize, buckets: &GroupBuckets) -> Vec<SenderGroup> {
    let sender_of = bucket_membership(visible_len, &buckets.sender, "sender");
    let status_of = bucket_membership(visible_len, &buckets.status, "status");

    let mut assigned = vec![false; visible_len];
    let mut tree: Vec<SenderGroup> = Vec::new();

    for first in 0..visible_len {
        if assigned[first] {
            continue;
        }
        let Some(sender_bucket) = sender_of[first] else {
            // Already warned in bucket_membership; skip silently here.
            assigned[first] = true;
            continue;
        };

        let mut members: Vec<usize> = buckets.sender[sender_bucket]
            .iter()
            .copied()
            .filter(|&index| index < visible_len)
            .collect();
        members.sort_unstable();

        let mut status_groups: Vec<StatusGroup> = Vec::new();
        for &member in &members {
            if assigned[member] {
                continue;
            }
            let Some(status_bucket) = status_of[member] else {
                assigned[member] = true;
                continue;
            };
            let run: Vec<usize> = members
                .iter()
                .copied()
                .filter(|&index| !assigned[index] && status_of[index] == Some(status_bucket))
                .collect();
            if run.is_empty() {
                continue;
            }
            for &index in &run {
                assigned[index] = true;
            }
            status_groups.push(StatusGroup { indices: run });
        }

        if !status_groups.is_empty() {
            tree.push(SenderGroup { status_groups });
        }
    }

    tree
}

/// Invert buckets into a per-index membership table, warning on any
/// partition violation.
fn bucket_membership(
    visible_len: usize,
    buckets: &[Vec<usize>],
    family: &'static str,
) -> Vec<Option<usize>> {
    let mut membership: Vec<Option<usize>> = vec![None; visible_len];

    for (bucket, indices) in buckets.iter().enumerate() {
        for &index in indices {
            if index >= visible_len {
                tracing::warn!(
                    target: "transcript.grouping",
                    family,
                    index,
                    "grouping policy referenced an activity outside the visible range"
                );
                continue;
            }
            if membership[index].is_some() {
                tracing::warn!(
                    target: "transcript.grouping",
                    family,
                    index,
                    "grouping policy assigned an activity to more than one bucket"
                );
                continue;
            }
            membership[index] = Some(bucket);
        }
    }

    for (index, bucket) in membership.iter().enumerate() {
        if bucket.is_none() {
            tracing::warn!(
                target: "transcript.grouping",
                family,
                index,
                "grouping policy left an activity unassigned; it will not be rendered"
            );
        }
    }

    membership
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::activity::{DeliveryStatus, SenderRole};

    fn activity(id: &str, sender: SenderRole, status: DeliveryStatus) -> Activity {
        Activity::new(id, sender, format!("text {id}")).with_status(status)
    }

    fn flatten_tree(tree: &[SenderGroup]) -> Vec<usize> {
        tree.iter()
            .flat_map(|sender_group| &sender_group.status_groups)
            .flat_map(|status_group| status_group.indices.iter().copied())
            .collect()
    }

    #[test]
    fn sender_contiguity_splits_groups() {
        let list = vec![
            activity("a", SenderRole::User, DeliveryStatus::Sent),
            activity("b", SenderRole::User, DeliveryStatus::Sent),
            activity("c", SenderRole::Bot, DeliveryStatus::Sent),
        ];
        let refs: Vec<&Activity> = list.iter().collect();
        let buckets = ContiguousRuns.group(&refs);
        assert_eq!(buckets.sender, vec![vec![0, 1], vec![2]]);

        let tree = build_group_tree(refs.len(), &buckets);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].status_groups[0].indices, vec![0, 1]);
        assert_eq!(tree[1].status_groups[0].indices, vec![2]);
    }

    #[test]
    fn concatenation_reproduces_visible_order() {
        let list = vec![
            activity("a", SenderRole::User, DeliveryStatus::Sending),
            activity("b", SenderRole::User, DeliveryStatus::Sent),
            activity("c", SenderRole::User, DeliveryStatus::Sent),
            activity("d", SenderRole::Bot, DeliveryStatus::Sent),
            activity("e", SenderRole::User, DeliveryStatus::Failed),
        ];
        let refs: Vec<&Activity> = list.iter().collect();
        let tree = build_group_tree(refs.len(), &ContiguousRuns.group(&refs));

        assert_eq!(flatten_tree(&tree), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn status_change_splits_runs_within_sender_group() {
        let list = vec![
            activity("a", SenderRole::User, DeliveryStatus::Sending),
            activity("b", SenderRole::User, DeliveryStatus::Sent),
            activity("c", SenderRole::User, DeliveryStatus::Sent),
        ];
        let refs: Vec<&Activity> = list.iter().collect();
        let tree = build_group_tree(refs.len(), &ContiguousRuns.group(&refs));

        assert_eq!(tree.len(), 1);
        let runs: Vec<&[usize]> = tree[0]
            .status_groups
            .iter()
            .map(|status_group| status_group.indices.as_slice())
            .collect();
        assert_eq!(runs, vec![&[0][..], &[1, 2][..]]);
    }

    // A sender+status combination that recurs after an interruption stays two
    // separate groups. Deliberate: the partition is stable within one sender
    // bucket pass, not a re-sort.
    #[test]
    fn recurring_status_combination_stays_split() {
        let list = vec![
            activity("a", SenderRole::Bot, DeliveryStatus::Sent),
            activity("b", SenderRole::Bot, DeliveryStatus::Failed),
            activity("c", SenderRole::Bot, DeliveryStatus::Sent),
        ];
        let refs: Vec<&Activity> = list.iter().collect();
        let tree = build_group_tree(refs.len(), &ContiguousRuns.group(&refs));

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].status_groups.len(), 3);
        assert_eq!(flatten_tree(&tree), vec![0, 1, 2]);
    }

    #[test]
    fn unassigned_activities_are_dropped_not_fatal() {
        let list = vec![
            activity("a", SenderRole::User, DeliveryStatus::Sent),
            activity("b", SenderRole::User, DeliveryStatus::Sent),
        ];
        let refs: Vec<&Activity> = list.iter().collect();
        // Policy "forgets" index 1 in both families.
        let buckets = GroupBuckets {
            sender: vec![vec![0]],
            status: vec![vec![0]],
        };
        let tree = build_group_tree(refs.len(), &buckets);
        assert_eq!(flatten_tree(&tree), vec![0]);
    }

    #[test]
    fn out_of_range_indices_are_ignored() {
        let buckets = GroupBuckets {
            sender: vec![vec![0, 7]],
            status: vec![vec![0]],
        };
        let tree = build_group_tree(1, &buckets);
        assert_eq!(flatten_tree(&tree), vec![0]);
    }

    #[test]
    fn empty_input_yields_empty_tree() {
        let tree = build_group_tree(0, &GroupBuckets::default());
        assert!(tree.is_empty());
    }

    mod warnings {
        use super::*;
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tracing::{Event, Level, Metadata, span, subscriber};

        struct WarnCounter(Arc<AtomicUsize>);

        impl subscriber::Subscriber for WarnCounter {
            fn enabled(&self, metadata: &Metadata<'_>) -> bool {
                *metadata.level() == Level::WARN
            }

            fn new_span(&self, _attrs: &span::Attributes<'_>) -> span::Id {
                span::Id::from_u64(1)
            }

            fn record(&self, _id: &span::Id, _record: &span::Record<'_>) {}

            fn record_follows_from(&self, _id: &span::Id, _follows: &span::Id) {}

            fn event(&self, _event: &Event<'_>) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }

            fn enter(&self, _id: &span::Id) {}

            fn exit(&self, _id: &span::Id) {}
        }

        fn warns_during(run: impl FnOnce()) -> usize {
            let count = Arc::new(AtomicUsize::new(0));
            subscriber::with_default(WarnCounter(Arc::clone(&count)), run);
            count.load(Ordering::Relaxed)
        }

        #[test]
        fn correct_partition_is_silent() {
            let list = vec![
                activity("a", SenderRole::User, DeliveryStatus::Sent),
                activity("b", SenderRole::Bot, DeliveryStatus::Sending),
            ];
            let refs: Vec<&Activity> = list.iter().collect();
            let warns = warns_during(|| {
                let tree = build_group_tree(refs.len(), &ContiguousRuns.group(&refs));
                assert_eq!(tree.len(), 2);
            });
            assert_eq!(warns, 0);
        }

        #[test]
        fn partition_violation_is_warned_not_fatal() {
            let buckets = GroupBuckets {
                sender: vec![vec![0], vec![0]],
                status: vec![vec![0]],
            };
            let warns = warns_during(|| {
                let tree = build_group_tree(1, &buckets);
                assert_eq!(flatten_tree(&tree), vec![0]);
            });
            assert!(warns > 0);
        }
    }
}
