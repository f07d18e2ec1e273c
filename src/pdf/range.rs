//! Page range algebra
//!
//! Windows are contiguous inclusive ranges of page indices. Subtracting one
//! window from another can split it in two, so differences are returned as an
//! [`IndexSet`] rather than a range.

use std::collections::BTreeSet;
use std::fmt;

/// Contiguous inclusive range of page indices, or the empty range
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PageRange {
    bounds: Option<(usize, usize)>,
}

impl PageRange {
    /// The range containing no pages
    pub const EMPTY: Self = Self { bounds: None };

    /// Create `[first, last]`; yields the empty range when `first > last`
    #[must_use]
    pub const fn new(first: usize, last: usize) -> Self {
        if first > last {
            Self::EMPTY
        } else {
            Self {
                bounds: Some((first, last)),
            }
        }
    }

    /// Window of `before` pages ahead of and `after` pages behind `position`,
    /// clamped to `[0, page_count - 1]`
    #[must_use]
    pub fn around(position: usize, before: usize, after: usize, page_count: usize) -> Self {
        if page_count == 0 {
            return Self::EMPTY;
        }
        let first = position.saturating_sub(before);
        let last = position.saturating_add(after).min(page_count - 1);
        Self::new(first, last)
    }

    /// The first `count` pages of a document with `page_count` pages
    #[must_use]
    pub fn leading(count: usize, page_count: usize) -> Self {
        match count.min(page_count) {
            0 => Self::EMPTY,
            n => Self::new(0, n - 1),
        }
    }

    #[must_use]
    pub const fn first(&self) -> Option<usize> {
        match self.bounds {
            Some((first, _)) => Some(first),
            None => None,
        }
    }

    #[must_use]
    pub const fn last(&self) -> Option<usize> {
        match self.bounds {
            Some((_, last)) => Some(last),
            None => None,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    /// Number of pages in the range
    #[must_use]
    pub const fn len(&self) -> usize {
        match self.bounds {
            Some((first, last)) => last - first + 1,
            None => 0,
        }
    }

    #[must_use]
    pub fn contains(&self, page: usize) -> bool {
        self.bounds
            .is_some_and(|(first, last)| first <= page && page <= last)
    }

    /// Page indices in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + use<> {
        let (first, end) = match self.bounds {
            Some((first, last)) => (first, last + 1),
            None => (0, 0),
        };
        first..end
    }

    /// Pages present in both ranges
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        match (self.bounds, other.bounds) {
            (Some((a_first, a_last)), Some((b_first, b_last))) => {
                Self::new(a_first.max(b_first), a_last.min(b_last))
            }
            _ => Self::EMPTY,
        }
    }

    /// Pages of `self` that are not in `other`
    ///
    /// Removing an inner sub-range leaves two disjoint pieces, e.g.
    /// `[0, 10] - [4, 6] = {0, 1, 2, 3, 7, 8, 9, 10}`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> IndexSet {
        self.iter().filter(|page| !other.contains(*page)).collect()
    }
}

impl fmt::Debug for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bounds {
            Some((first, last)) => write!(f, "[{first}, {last}]"),
            None => f.write_str("[]"),
        }
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Ordered set of page indices, possibly non-contiguous
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexSet {
    pages: BTreeSet<usize>,
}

impl IndexSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, page: usize) -> bool {
        self.pages.insert(page)
    }

    #[must_use]
    pub fn contains(&self, page: usize) -> bool {
        self.pages.contains(&page)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Page indices in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.pages.iter().copied()
    }

    /// Smallest range covering every index in the set
    #[must_use]
    pub fn span(&self) -> PageRange {
        match (self.pages.first(), self.pages.last()) {
            (Some(&first), Some(&last)) => PageRange::new(first, last),
            _ => PageRange::EMPTY,
        }
    }

    /// Whether the indices form one contiguous run
    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        self.span().len() == self.len()
    }
}

impl FromIterator<usize> for IndexSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            pages: iter.into_iter().collect(),
        }
    }
}

impl From<PageRange> for IndexSet {
    fn from(range: PageRange) -> Self {
        range.iter().collect()
    }
}

impl<'a> IntoIterator for &'a IndexSet {
    type Item = usize;
    type IntoIter = std::iter::Copied<std::collections::btree_set::Iter<'a, usize>>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.iter().copied()
    }
}
