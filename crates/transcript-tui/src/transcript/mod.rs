//! Transcript rendering pipeline.
//!
//! Data flows one direction: raw activities -> visibility filter + renderer
//! cache -> grouping engine -> flattener -> render descriptors consumed by
//! the presentation layer. Scroll events flow backward through the scroll
//! coordinator into persisted scroll-position state. All recomputation is
//! synchronous and single-threaded.

pub mod activity;
pub mod elements;
pub mod flatten;
pub mod grouping;
pub mod render;
pub mod scroll;
pub mod snap;
pub mod style;
pub mod unread;

pub use activity::{Activity, ActivityId, ActivityKey, DeliveryStatus, SenderRole};
pub use elements::{ElementRect, ElementTable};
pub use flatten::RenderDescriptor;
pub use grouping::{ContiguousRuns, GroupBuckets, GroupingPolicy, SenderGroup, StatusGroup};
pub use render::{
    ActivityBinding, ActivityRenderable, paragraph_factory, ParagraphRenderable, Renderer,
    RendererCache, RendererFactory, SimpleRendererFactory,
};
pub use scroll::{ScrollCommand, ScrollPosition, ScrollSurface};
pub use snap::SnapInputs;
pub use style::{AvatarGrouping, SnapCoefficient, StyleOptions};
pub use unread::ReadTracker;

use std::collections::HashSet;

use crate::error::Result;
use crate::transcript::flatten::FlattenInputs;
use crate::transcript::render::bind_visible_activities;

/// Localized string lookup supplied by the host.
pub type Localizer = Box<dyn Fn(&str) -> String>;

/// Callback notified with every derived scroll position.
pub type ScrollObserver = Box<dyn FnMut(ScrollPosition)>;

/// Localization key for the "jump to new messages" affordance label.
pub const NEW_MESSAGES_KEY: &str = "transcript.new_messages";

/// The transcript pipeline: owns the renderer cache, the mounted-element
/// table and the read marker, and recomputes bindings, grouping and render
/// descriptors whenever the activity list or style options change.
pub struct Transcript {
    style: StyleOptions,
    renderer_factory: Box<dyn RendererFactory>,
    status_factory: Option<Box<dyn SimpleRendererFactory>>,
    avatar_factory: Option<Box<dyn SimpleRendererFactory>>,
    grouping_policy: Box<dyn GroupingPolicy>,
    localize: Localizer,
    cache: RendererCache,
    elements: ElementTable,
    tracker: ReadTracker,
    bindings: Vec<ActivityBinding>,
    descriptors: Vec<RenderDescriptor>,
    scroll_observer: Option<ScrollObserver>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::builder(paragraph_factory).build()
    }
}

impl Transcript {
    pub fn builder(renderer_factory: impl RendererFactory + 'static) -> TranscriptBuilder {
        TranscriptBuilder::new(renderer_factory)
    }

    pub fn style(&self) -> &StyleOptions {
        &self.style
    }

    /// Replace the style options. Takes effect on the next [`Self::rebuild`].
    pub fn set_style(&mut self, style: StyleOptions) {
        self.style = style;
    }

    /// Recompute the render tree for the current activity list.
    ///
    /// Call whenever the list or grouping-relevant style options change. The
    /// whole pass is synchronous; the activity slice is only borrowed for its
    /// duration.
    pub fn rebuild(&mut self, activities: &[Activity], surface: &dyn ScrollSurface) {
        let bindings =
            bind_visible_activities(activities, self.renderer_factory.as_ref(), &mut self.cache);
        let visible: Vec<&Activity> = bindings
            .iter()
            .map(|binding| &activities[binding.index])
            .collect();

        let buckets = self.grouping_policy.group(&visible);
        let tree = grouping::build_group_tree(visible.len(), &buckets);

        // Acknowledge the newest activity before unread flags are computed,
        // so a stuck-to-bottom surface never reports unread content.
        let last_visible_id = visible.last().and_then(|activity| activity.id.clone());
        self.tracker
            .observe(surface.stuck_to_bottom(), last_visible_id.as_ref());
        let last_read_position = self.tracker.last_read().and_then(|last_read| {
            visible
                .iter()
                .position(|activity| activity.id.as_ref() == Some(last_read))
        });

        let descriptors = flatten::flatten(&FlattenInputs {
            visible: &visible,
            tree: &tree,
            style: &self.style,
            avatars: self.avatar_factory.as_deref(),
            last_read_position,
        });

        let live: HashSet<ActivityKey> = descriptors
            .iter()
            .map(|descriptor| descriptor.key.clone())
            .collect();
        self.elements.retain_keys(&live);

        self.bindings = bindings;
        self.descriptors = descriptors;
    }

    /// Render descriptors from the last rebuild, in render order.
    pub fn descriptors(&self) -> &[RenderDescriptor] {
        &self.descriptors
    }

    /// Renderer bindings from the last rebuild; positions match
    /// [`Self::descriptors`].
    pub fn bindings(&self) -> &[ActivityBinding] {
        &self.bindings
    }

    /// Renderer for the activity at a descriptor position. Descriptors can
    /// be fewer than bindings when a grouping policy drops activities, so
    /// the lookup goes through the descriptor's visible position.
    pub fn renderer_at(&self, position: usize) -> Option<&Renderer> {
        self.descriptors
            .get(position)
            .and_then(|descriptor| self.bindings.get(descriptor.position))
            .map(|binding| &binding.renderer)
    }

    pub fn status_renderer(&self, activity: &Activity) -> Option<Renderer> {
        self.status_factory
            .as_deref()
            .and_then(|factory| factory.create(activity))
    }

    pub fn avatar_renderer(&self, activity: &Activity) -> Option<Renderer> {
        self.avatar_factory
            .as_deref()
            .and_then(|factory| factory.create(activity))
    }

    /// Mount callback: associate an activity key with its element geometry.
    pub fn element_mounted(&mut self, key: ActivityKey, rect: ElementRect) {
        self.elements.register(key, rect);
    }

    /// Unmount callback: clear the association.
    pub fn element_unmounted(&mut self, key: &ActivityKey) {
        self.elements.release(key);
    }

    pub fn elements(&self) -> &ElementTable {
        &self.elements
    }

    /// Command handle: scroll to a raw offset or bring an activity into view.
    pub fn scroll_to(&self, command: &ScrollCommand, surface: &mut dyn ScrollSurface) -> Result<()> {
        let resolved =
            scroll::resolve_scroll_command(command, &self.elements, surface.viewport_height())?;
        if let Some(offset) = resolved {
            surface.scroll_to(offset);
        }
        Ok(())
    }

    /// Command handle: scroll to the newest content. Uses the last mounted
    /// element when available, otherwise hands the surface its maximum offset.
    pub fn scroll_to_end(&self, surface: &mut dyn ScrollSurface) {
        let last_bottom = self.descriptors.iter().rev().find_map(|descriptor| {
            self.elements.get(&descriptor.key).map(|rect| rect.bottom())
        });
        let offset = last_bottom
            .map_or(f64::MAX, |bottom| (bottom - surface.viewport_height()).max(0.0));
        surface.scroll_to(offset);
    }

    /// Register the persistence hook for derived scroll positions.
    pub fn observe_scroll(&mut self, observer: impl FnMut(ScrollPosition) + 'static) {
        self.scroll_observer = Some(Box::new(observer));
    }

    /// Feed a scroll-position change from the surface. Derives the nearest
    /// activity, notifies the registered observer, and returns the position.
    pub fn handle_scroll(&mut self, scroll_top: f64, surface: &dyn ScrollSurface) -> ScrollPosition {
        let position = scroll::derive_scroll_position(
            scroll_top,
            surface.viewport_height(),
            &self.descriptors,
            &self.elements,
        );
        if let Some(observer) = self.scroll_observer.as_mut() {
            observer(position.clone());
        }
        position
    }

    /// Descriptor position after which the "jump to new messages" affordance
    /// is inserted, or `None` when it should not be shown.
    pub fn new_messages_position(&self, surface: &dyn ScrollSurface) -> Option<usize> {
        unread::affordance_position(
            self.tracker.last_read(),
            &self.descriptors,
            surface.stuck_to_bottom(),
            surface.animating_to_end(),
            self.style.hide_scroll_to_end_button,
        )
    }

    pub fn new_messages_label(&self) -> String {
        (self.localize)(NEW_MESSAGES_KEY)
    }

    /// Auto-scroll correction for the current geometry; `f64::INFINITY` means
    /// the unconstrained scroll-to-bottom behavior wins.
    pub fn auto_scroll_snap_offset(&self, inputs: SnapInputs) -> f64 {
        let last_read_position = self.tracker.last_read().and_then(|last_read| {
            self.descriptors
                .iter()
                .position(|descriptor| descriptor.activity_id() == Some(last_read))
        });
        snap::snap_offset(
            &self.style,
            inputs,
            &self.descriptors,
            &self.elements,
            last_read_position,
        )
    }

    pub fn last_read_activity(&self) -> Option<&ActivityId> {
        self.tracker.last_read()
    }

    /// Written externally per the host's acknowledgment policy.
    pub fn set_last_read_activity(&mut self, id: Option<ActivityId>) {
        self.tracker.set_last_read(id);
    }
}

/// Builder for [`Transcript`]; collaborators default to the built-in
/// paragraph renderer, contiguous-run grouping, and identity localization.
pub struct TranscriptBuilder {
    style: StyleOptions,
    renderer_factory: Box<dyn RendererFactory>,
    status_factory: Option<Box<dyn SimpleRendererFactory>>,
    avatar_factory: Option<Box<dyn SimpleRendererFactory>>,
    grouping_policy: Box<dyn GroupingPolicy>,
    localize: Localizer,
}

impl TranscriptBuilder {
    pub fn new(renderer_factory: impl RendererFactory + 'static) -> Self {
        Self {
            style: StyleOptions::default(),
            renderer_factory: Box::new(renderer_factory),
            status_factory: None,
            avatar_factory: None,
            grouping_policy: Box::new(ContiguousRuns),
            localize: Box::new(|key| key.to_string()),
        }
    }

    pub fn with_style(mut self, style: StyleOptions) -> Self {
        self.style = style;
        self
    }

    pub fn with_grouping_policy(mut self, policy: impl GroupingPolicy + 'static) -> Self {
        self.grouping_policy = Box::new(policy);
        self
    }

    pub fn with_status_factory(mut self, factory: impl SimpleRendererFactory + 'static) -> Self {
        self.status_factory = Some(Box::new(factory));
        self
    }

    pub fn with_avatar_factory(mut self, factory: impl SimpleRendererFactory + 'static) -> Self {
        self.avatar_factory = Some(Box::new(factory));
        self
    }

    pub fn with_localizer(mut self, localize: impl Fn(&str) -> String + 'static) -> Self {
        self.localize = Box::new(localize);
        self
    }

    pub fn build(self) -> Transcript {
        Transcript {
            style: self.style,
            renderer_factory: self.renderer_factory,
            status_factory: self.status_factory,
            avatar_factory: self.avatar_factory,
            grouping_policy: self.grouping_policy,
            localize: self.localize,
            cache: RendererCache::new(),
            elements: ElementTable::new(),
            tracker: ReadTracker::new(),
            bindings: Vec::new(),
            descriptors: Vec::new(),
            scroll_observer: None,
        }
    }
}
