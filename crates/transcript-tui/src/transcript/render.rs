//! Renderer bindings and the pass-scoped renderer cache.
//!
//! The visibility pass walks the activity list back to front so each activity
//! is evaluated against the next activity that actually produced a renderer,
//! not merely the next list item. Results are memoized per
//! `(activity, next visible)` key so a stable suffix of the list is not
//! recomputed when only earlier activities change.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use ratatui::text::Line;

use crate::transcript::activity::{Activity, ActivityKey};

/// Render-side object produced by the factories. Yields formatted lines for a
/// width so hosts can both paint and measure.
pub trait ActivityRenderable {
    fn lines(&self, width: u16) -> Vec<Line<'static>>;

    fn line_count(&self, width: u16) -> usize {
        self.lines(width).len()
    }
}

/// Shared handle to a renderable; `Rc` because the pipeline is single-threaded.
pub type Renderer = Rc<dyn ActivityRenderable>;

/// Builds the renderer for one activity, given the next visible activity.
/// Returning `None` excludes the activity from the transcript entirely.
pub trait RendererFactory {
    fn create(&self, activity: &Activity, next_visible: Option<&Activity>) -> Option<Renderer>;
}

impl<F> RendererFactory for F
where
    F: Fn(&Activity, Option<&Activity>) -> Option<Renderer>,
{
    fn create(&self, activity: &Activity, next_visible: Option<&Activity>) -> Option<Renderer> {
        self(activity, next_visible)
    }
}

/// Per-activity factory with no pairing context (status glyphs, avatars).
pub trait SimpleRendererFactory {
    fn create(&self, activity: &Activity) -> Option<Renderer>;
}

impl<F> SimpleRendererFactory for F
where
    F: Fn(&Activity) -> Option<Renderer>,
{
    fn create(&self, activity: &Activity) -> Option<Renderer> {
        self(activity)
    }
}

/// Minimal built-in renderable: the activity text wrapped to the given width.
pub struct ParagraphRenderable {
    text: String,
}

impl ParagraphRenderable {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl ActivityRenderable for ParagraphRenderable {
    fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let width = usize::from(width.max(1));
        textwrap::wrap(&self.text, width)
            .into_iter()
            .map(|line| Line::from(line.into_owned()))
            .collect()
    }
}

/// Default renderer factory: every activity with non-empty display text is
/// visible and renders as a wrapped paragraph.
pub fn paragraph_factory(activity: &Activity, _next_visible: Option<&Activity>) -> Option<Renderer> {
    let text = activity.effective_text();
    if text.trim().is_empty() {
        return None;
    }
    Some(Rc::new(ParagraphRenderable::new(text)))
}

/// Ephemeral pairing of a visible activity with its renderer, valid only for
/// the render pass that produced it.
#[derive(Clone)]
pub struct ActivityBinding {
    /// Index into the raw activity list.
    pub index: usize,
    pub key: ActivityKey,
    pub renderer: Renderer,
}

type CacheKey = (ActivityKey, u64, Option<(ActivityKey, u64)>);

/// Hash of everything about an activity that can change its rendering while
/// its key stays stable. Streaming updates mutate the text in place, so the
/// key alone is not enough to prove a cached renderer is still current.
fn content_hash(activity: &Activity) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    activity.effective_text().hash(&mut hasher);
    activity.status.hash(&mut hasher);
    activity.sender.hash(&mut hasher);
    hasher.finish()
}

/// Pass-scoped memoization of `(activity, next visible) -> renderer`, keyed
/// by activity identity plus content hash.
///
/// Entries whose key recurs in the next pass are carried over; everything
/// else is dropped when the pass ends. Not a long-lived LRU.
pub struct RendererCache {
    previous: HashMap<CacheKey, Option<Renderer>>,
    current: HashMap<CacheKey, Option<Renderer>>,
    hits: usize,
    misses: usize,
}

impl Default for RendererCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererCache {
    pub fn new() -> Self {
        Self {
            previous: HashMap::new(),
            current: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    fn begin_pass(&mut self) {
        self.previous = std::mem::take(&mut self.current);
        self.hits = 0;
        self.misses = 0;
    }

    fn lookup_or_create(
        &mut self,
        key: CacheKey,
        activity: &Activity,
        next_visible: Option<&Activity>,
        factory: &dyn RendererFactory,
    ) -> Option<Renderer> {
        if let Some(entry) = self.previous.remove(&key) {
            self.hits += 1;
            self.current.insert(key, entry.clone());
            return entry;
        }
        self.misses += 1;
        let created = factory.create(activity, next_visible);
        self.current.insert(key, created.clone());
        created
    }

    fn end_pass(&mut self) {
        self.previous.clear();
        tracing::debug!(
            target: "transcript.render",
            hits = self.hits,
            misses = self.misses,
            "renderer cache pass complete"
        );
    }

    #[cfg(test)]
    fn pass_hits(&self) -> usize {
        self.hits
    }
}

/// Bind renderers to the activities that are renderable at all.
///
/// Output order matches the input order, restricted to activities whose
/// factory produced a renderer. An empty result is a valid state.
pub fn bind_visible_activities(
    activities: &[Activity],
    factory: &dyn RendererFactory,
    cache: &mut RendererCache,
) -> Vec<ActivityBinding> {
    cache.begin_pass();

    let mut bindings: Vec<ActivityBinding> = Vec::new();
    let mut next_visible: Option<usize> = None;

    for index in (0..activities.len()).rev() {
        let activity = &activities[index];
        let key = activity.key_at(index);
        let next_key = next_visible
            .map(|next| (activities[next].key_at(next), content_hash(&activities[next])));
        let renderer = cache.lookup_or_create(
            (key.clone(), content_hash(activity), next_key),
            activity,
            next_visible.map(|next| &activities[next]),
            factory,
        );
        if let Some(renderer) = renderer {
            bindings.push(ActivityBinding {
                index,
                key,
                renderer,
            });
            next_visible = Some(index);
        }
    }

    bindings.reverse();
    cache.end_pass();
    bindings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::activity::SenderRole;
    use std::cell::Cell;

    fn activities(texts: &[&str]) -> Vec<Activity> {
        texts
            .iter()
            .enumerate()
            .map(|(idx, text)| Activity::new(format!("a{idx}"), SenderRole::Bot, *text))
            .collect()
    }

    #[test]
    fn skips_activities_without_representation() {
        let list = activities(&["one", "", "three"]);
        let mut cache = RendererCache::new();
        let bindings = bind_visible_activities(&list, &paragraph_factory, &mut cache);

        let indices: Vec<usize> = bindings.iter().map(|binding| binding.index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn empty_transcript_is_valid() {
        let list = activities(&["", "   "]);
        let mut cache = RendererCache::new();
        let bindings = bind_visible_activities(&list, &paragraph_factory, &mut cache);
        assert!(bindings.is_empty());
    }

    #[test]
    fn factory_sees_next_visible_not_next_item() {
        let list = activities(&["one", "", "three"]);
        let seen = Cell::new(false);
        let factory = |activity: &Activity, next_visible: Option<&Activity>| {
            if activity.text == "one" {
                assert_eq!(next_visible.map(|next| next.text.as_str()), Some("three"));
                seen.set(true);
            }
            if activity.text.trim().is_empty() {
                None
            } else {
                Some(Rc::new(ParagraphRenderable::new(&activity.text)) as Renderer)
            }
        };

        let mut cache = RendererCache::new();
        bind_visible_activities(&list, &factory, &mut cache);
        assert!(seen.get(), "factory never saw the head activity");
    }

    #[test]
    fn stable_suffix_is_reused_across_passes() {
        let mut list = activities(&["one", "two", "three"]);
        let mut cache = RendererCache::new();
        bind_visible_activities(&list, &paragraph_factory, &mut cache);

        // Append at the tail: only the ("three", None) pair changes, the
        // earlier pairs recur and are reused.
        list.push(Activity::new("a3", SenderRole::Bot, "four"));
        bind_visible_activities(&list, &paragraph_factory, &mut cache);
        assert_eq!(cache.pass_hits(), 2);

        // Unchanged list: everything recurs.
        bind_visible_activities(&list, &paragraph_factory, &mut cache);
        assert_eq!(cache.pass_hits(), 4);
    }

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    // Streaming updates mutate the text behind a stable id; the cache must
    // rebuild the renderer instead of serving the old one.
    #[test]
    fn changed_text_invalidates_cached_renderer() {
        let mut list = activities(&["partial"]);
        let mut cache = RendererCache::new();
        let bindings = bind_visible_activities(&list, &paragraph_factory, &mut cache);
        assert_eq!(line_text(&bindings[0].renderer.lines(80)[0]), "partial");

        list[0].text = "partial plus more".to_string();
        let bindings = bind_visible_activities(&list, &paragraph_factory, &mut cache);
        assert_eq!(cache.pass_hits(), 0);
        assert_eq!(
            line_text(&bindings[0].renderer.lines(80)[0]),
            "partial plus more"
        );
    }

    #[test]
    fn display_override_change_invalidates_cached_renderer() {
        let mut list = activities(&["raw"]);
        let mut cache = RendererCache::new();
        bind_visible_activities(&list, &paragraph_factory, &mut cache);

        list[0].display_text = Some("pretty".to_string());
        let bindings = bind_visible_activities(&list, &paragraph_factory, &mut cache);
        assert_eq!(line_text(&bindings[0].renderer.lines(80)[0]), "pretty");
    }

    #[test]
    fn paragraph_renderable_wraps_to_width() {
        let renderable = ParagraphRenderable::new("alpha beta gamma delta");
        assert_eq!(renderable.line_count(11), 2);
        assert_eq!(renderable.line_count(80), 1);
    }
}
