//! Window scheduling state

use log::debug;

use super::range::{IndexSet, PageRange};

/// Default number of pages kept before the anchor page
pub const DEFAULT_PAGES_BEFORE: usize = 4;
/// Default number of pages kept after the anchor page
pub const DEFAULT_PAGES_AFTER: usize = 4;
/// Default number of pages loaded when a document is opened
pub const DEFAULT_INITIAL_PAGES: usize = 11;

/// Decomposition of an old and a new window
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowDiff {
    /// Pages kept as they are
    pub overlap: PageRange,
    /// Pages in the old window only
    pub evict: IndexSet,
    /// Pages in the new window only
    pub load: IndexSet,
}

impl WindowDiff {
    #[must_use]
    pub fn between(old: PageRange, new: PageRange) -> Self {
        let overlap = old.intersect(&new);
        Self {
            overlap,
            evict: old.difference(&overlap),
            load: new.difference(&overlap),
        }
    }
}

/// Inputs that decide which window a viewport position maps to
#[derive(Clone, Debug)]
pub struct WindowState {
    /// Total page count
    pub page_count: usize,

    /// Pages kept before the anchor page
    pub pages_before: usize,

    /// Pages kept after the anchor page
    pub pages_after: usize,

    /// Pages loaded on open
    pub initial_pages: usize,

    /// Last position a recompute was performed for
    last_acted: Option<usize>,
}

impl WindowState {
    #[must_use]
    pub fn new(page_count: usize) -> Self {
        Self {
            page_count,
            pages_before: DEFAULT_PAGES_BEFORE,
            pages_after: DEFAULT_PAGES_AFTER,
            initial_pages: DEFAULT_INITIAL_PAGES,
            last_acted: None,
        }
    }

    #[must_use]
    pub fn with_margins(mut self, before: usize, after: usize) -> Self {
        self.pages_before = before;
        self.pages_after = after;
        self
    }

    #[must_use]
    pub fn with_initial_pages(mut self, initial_pages: usize) -> Self {
        self.initial_pages = initial_pages;
        self
    }

    #[must_use]
    pub fn last_acted(&self) -> Option<usize> {
        self.last_acted
    }

    /// Window wanted for an anchor position
    #[must_use]
    pub fn desired_window(&self, position: usize) -> PageRange {
        PageRange::around(
            position,
            self.pages_before,
            self.pages_after,
            self.page_count,
        )
    }

    /// Apply a command against the cache's current window and return the
    /// effects to run, in order
    #[must_use]
    pub fn apply(&mut self, cmd: Command, current: PageRange) -> Vec<Effect> {
        match cmd {
            Command::Open => {
                let window = PageRange::leading(self.initial_pages, self.page_count);
                let mut effects = vec![Effect::ReplaceWindow(window)];
                if !window.is_empty() {
                    effects.push(Effect::Load(window.into()));
                }
                effects
            }

            Command::ViewportSettled(position) => {
                if self.last_acted == Some(position) {
                    return vec![];
                }
                self.last_acted = Some(position);

                let window = self.desired_window(position);
                let diff = WindowDiff::between(current, window);
                debug!(
                    "anchor {position}: window {current} -> {window}, keep {}, evict {}, load {}",
                    diff.overlap,
                    diff.evict.len(),
                    diff.load.len()
                );

                let mut effects = vec![Effect::ReplaceWindow(window)];
                if !diff.evict.is_empty() {
                    effects.push(Effect::Evict(diff.evict));
                }
                if !diff.load.is_empty() {
                    effects.push(Effect::Load(diff.load));
                }
                effects
            }
        }
    }
}

/// Commands that move the window
#[derive(Clone, Debug)]
pub enum Command {
    /// Document opened; install the initial window without evicting anything
    Open,
    /// The debounce timer fired for this anchor position
    ViewportSettled(usize),
}

/// Effects produced by window changes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Store the new window in the cache
    ReplaceWindow(PageRange),
    /// Empty these slots
    Evict(IndexSet),
    /// Render these pages into their slots
    Load(IndexSet),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(range: PageRange) -> IndexSet {
        range.into()
    }

    #[test]
    fn disjoint_windows_evict_all_and_load_all() {
        let mut state = WindowState::new(100);
        let effects = state.apply(Command::ViewportSettled(90), PageRange::new(0, 10));

        let diff = WindowDiff::between(PageRange::new(0, 10), PageRange::new(86, 94));
        assert_eq!(diff.overlap, PageRange::EMPTY);
        assert_eq!(diff.evict.len(), 11);
        assert_eq!(diff.load.len(), 9);

        assert_eq!(
            effects,
            vec![
                Effect::ReplaceWindow(PageRange::new(86, 94)),
                Effect::Evict(pages(PageRange::new(0, 10))),
                Effect::Load(pages(PageRange::new(86, 94))),
            ]
        );
    }

    #[test]
    fn overlapping_windows_only_touch_the_edges() {
        let diff = WindowDiff::between(PageRange::new(10, 20), PageRange::new(14, 24));
        assert_eq!(diff.overlap, PageRange::new(14, 20));
        assert_eq!(diff.evict, [10, 11, 12, 13].into_iter().collect::<IndexSet>());
        assert_eq!(diff.load, [21, 22, 23, 24].into_iter().collect::<IndexSet>());

        let mut state = WindowState::new(100).with_margins(0, 10);
        let effects = state.apply(Command::ViewportSettled(14), PageRange::new(10, 20));
        assert_eq!(
            effects,
            vec![
                Effect::ReplaceWindow(PageRange::new(14, 24)),
                Effect::Evict(diff.evict),
                Effect::Load(diff.load),
            ]
        );
    }

    #[test]
    fn open_loads_leading_pages_without_eviction() {
        let mut state = WindowState::new(3).with_initial_pages(10);
        let effects = state.apply(Command::Open, PageRange::EMPTY);
        assert_eq!(
            effects,
            vec![
                Effect::ReplaceWindow(PageRange::new(0, 2)),
                Effect::Load(pages(PageRange::new(0, 2))),
            ]
        );
    }

    #[test]
    fn open_default_loads_eleven_pages() {
        let mut state = WindowState::new(500);
        let effects = state.apply(Command::Open, PageRange::EMPTY);
        assert_eq!(effects[0], Effect::ReplaceWindow(PageRange::new(0, 10)));
    }

    #[test]
    fn open_empty_document_loads_nothing() {
        let mut state = WindowState::new(0);
        let effects = state.apply(Command::Open, PageRange::EMPTY);
        assert_eq!(effects, vec![Effect::ReplaceWindow(PageRange::EMPTY)]);
    }

    #[test]
    fn repeated_position_is_ignored() {
        let mut state = WindowState::new(100);
        let first = state.apply(Command::ViewportSettled(50), PageRange::new(0, 10));
        assert!(!first.is_empty());
        assert_eq!(state.last_acted(), Some(50));

        let second = state.apply(Command::ViewportSettled(50), PageRange::new(46, 54));
        assert!(second.is_empty());
    }

    #[test]
    fn small_move_within_window_only_shifts_edges() {
        let mut state = WindowState::new(100);
        let effects = state.apply(Command::ViewportSettled(51), PageRange::new(46, 54));
        assert_eq!(
            effects,
            vec![
                Effect::ReplaceWindow(PageRange::new(47, 55)),
                Effect::Evict([46].into_iter().collect()),
                Effect::Load([55].into_iter().collect()),
            ]
        );
    }

    #[test]
    fn empty_document_collapses_window() {
        let mut state = WindowState::new(0);
        let effects = state.apply(Command::ViewportSettled(3), PageRange::new(0, 5));
        assert_eq!(
            effects,
            vec![
                Effect::ReplaceWindow(PageRange::EMPTY),
                Effect::Evict(pages(PageRange::new(0, 5))),
            ]
        );
    }
}
