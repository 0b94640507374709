//! Touch zone resolver.
//!
//! Turns raw multi-touch coordinates into a [`KeyStateVector`].  The on-screen
//! keys are compiled once per layout into [`LogicalKey`]s that carry their
//! rectangle, their layout neighbours, and the two bias thresholds that let a
//! sliding finger wake the neighbour before it leaves the current key.
//!
//! # Single-row constraint
//!
//! Lookups are memoised per horizontal pixel column, which is only correct
//! while every key shares one row (identical top and bottom).  Layouts with
//! more than one row are rejected by [`TouchResolver::compile`] with
//! [`LayoutError::MultipleRows`].  Supporting them needs an index keyed by
//! (row, column) rather than a wider memo.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use super::key_state::{KeyChange, KeyStateVector};

/// Dense, unique integer identifying a logical key (`0..N`).
pub type Kflag = usize;

/// Offset rectangle of a key element in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRect {
    /// X coordinate of the left edge.
    pub left: i32,
    /// Y coordinate of the top edge.
    pub top: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl KeyRect {
    /// Returns the rightmost X coordinate (exclusive), or `None` if it does
    /// not fit in an `i32`.
    pub fn right(&self) -> Option<i32> {
        i32::try_from(self.width)
            .ok()
            .and_then(|width| self.left.checked_add(width))
    }

    /// Returns the bottommost Y coordinate (exclusive), or `None` if it does
    /// not fit in an `i32`.
    pub fn bottom(&self) -> Option<i32> {
        i32::try_from(self.height)
            .ok()
            .and_then(|height| self.top.checked_add(height))
    }
}

/// A reference to one key element as the page lays it out.
///
/// Elements are supplied in sibling order; the element before and after a key
/// in that order are its previous and next neighbours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyElement {
    /// The key's identity, carried by the element's data attribute.
    pub kflag: Kflag,
    /// The element's offset geometry.
    pub rect: KeyRect,
}

/// One key after layout compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalKey {
    pub kflag: Kflag,
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
    /// Touches left of this X also activate the previous key.
    /// `None` when there is no previous key.
    pub almost_left: Option<f64>,
    /// Touches right of this X also activate the next key.
    /// `None` when there is no next key.
    pub almost_right: Option<f64>,
    /// Position of the previous key in layout order.
    pub prev: Option<usize>,
    /// Position of the next key in layout order.
    pub next: Option<usize>,
}

impl LogicalKey {
    /// Returns `true` if `(x, y)` lies inside this key's rectangle.
    ///
    /// Left and top edges are inclusive, right and bottom edges exclusive.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.spans_column(x) && self.spans_row(y)
    }

    fn spans_column(&self, x: f64) -> bool {
        f64::from(self.left) <= x && x < f64::from(self.right)
    }

    fn spans_row(&self, y: f64) -> bool {
        f64::from(self.top) <= y && y < f64::from(self.bottom)
    }
}

/// One contact point of a touch sample, in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub x: f64,
    pub y: f64,
}

/// All simultaneous contact points sampled at one input event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TouchFrame {
    pub points: Vec<TouchPoint>,
}

impl TouchFrame {
    /// Builds a frame from `(x, y)` pairs.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        Self {
            points: points.into_iter().map(|(x, y)| TouchPoint { x, y }).collect(),
        }
    }
}

/// Errors raised while compiling a layout.
#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    /// The page supplied no key elements.
    #[error("layout has no keys")]
    Empty,

    /// Two elements carry the same kflag.
    #[error("duplicate kflag {0}")]
    DuplicateKflag(Kflag),

    /// Kflags must cover `0..count` with no gaps.
    #[error("kflag {kflag} is outside 0..{count}; kflags must be dense")]
    SparseKflag { kflag: Kflag, count: usize },

    /// A key does not share the first key's row.
    #[error("key {kflag} is not on the key row; only single-row layouts are supported")]
    MultipleRows { kflag: Kflag },

    /// Two neighbours overlap by more than their bias zones.
    #[error("keys {left} and {right} overlap beyond their bias zones")]
    Overlap { left: Kflag, right: Kflag },

    /// A key's right or bottom edge does not fit in pixel coordinates.
    #[error("key {kflag} extends past the coordinate range")]
    GeometryOverflow { kflag: Kflag },
}

/// Output of [`TouchResolver::compute_frame`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    /// The full key-state vector for the frame.
    pub state: KeyStateVector,
    /// Keys whose display state must flip relative to the previous frame.
    pub changes: Vec<KeyChange>,
}

/// Compiled key row plus the per-column lookup memo.
///
/// Every layout-affecting event (initial load, viewport resize) must go
/// through [`TouchResolver::recompile`]; the previous keys and memo are
/// dropped wholesale, never patched.
#[derive(Debug)]
pub struct TouchResolver {
    keys: Vec<LogicalKey>,
    /// Column → position in `keys` (or `None` for a gap), for columns in
    /// `0..viewport_width` only.
    memo: HashMap<i32, Option<usize>>,
    viewport_width: u32,
    row_top: i32,
    row_bottom: i32,
    last_state: KeyStateVector,
    generation: u64,
}

impl TouchResolver {
    /// Compiles `elements` (in sibling order) for a viewport `viewport_width`
    /// pixels wide.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] if the kflags are not unique and dense, the keys
    /// do not share one row, or neighbours overlap beyond their bias zones.
    pub fn compile(elements: &[KeyElement], viewport_width: u32) -> Result<Self, LayoutError> {
        let keys = compile_keys(elements)?;
        let row_top = keys[0].top;
        let row_bottom = keys[0].bottom;
        let mut resolver = Self {
            last_state: KeyStateVector::new(keys.len()),
            keys,
            memo: HashMap::new(),
            viewport_width,
            row_top,
            row_bottom,
            generation: 0,
        };
        resolver.fill_memo();
        Ok(resolver)
    }

    /// Replaces the compiled layout after a layout-affecting event.
    ///
    /// On error the resolver is left with no keys at all, so nothing resolves
    /// against the geometry that preceded the event.
    ///
    /// # Errors
    ///
    /// See [`TouchResolver::compile`].
    pub fn recompile(
        &mut self,
        elements: &[KeyElement],
        viewport_width: u32,
    ) -> Result<(), LayoutError> {
        let generation = self.generation + 1;
        match Self::compile(elements, viewport_width) {
            Ok(fresh) => {
                *self = Self { generation, ..fresh };
                debug!(
                    generation,
                    keys = self.keys.len(),
                    "touch layout recompiled"
                );
                Ok(())
            }
            Err(e) => {
                *self = Self {
                    keys: Vec::new(),
                    memo: HashMap::new(),
                    viewport_width,
                    row_top: 0,
                    row_bottom: 0,
                    last_state: KeyStateVector::new(0),
                    generation,
                };
                Err(e)
            }
        }
    }

    /// Number of logical keys, which is also the key-state vector length.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Compiled keys in layout order.
    pub fn keys(&self) -> &[LogicalKey] {
        &self.keys
    }

    /// Incremented on every recompilation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the key containing `(x, y)`, if any.
    ///
    /// Uses the memoised column when present, otherwise scans the row.  Only
    /// columns inside the viewport are cached.
    pub fn resolve_key(&mut self, x: f64, y: f64) -> Option<&LogicalKey> {
        let position = self.resolve_position(x, y)?;
        Some(&self.keys[position])
    }

    /// Resolves every contact point of `frame` into a full key-state vector.
    ///
    /// Points outside every key contribute nothing.  The returned `changes`
    /// list the keys whose active/inactive display must flip since the last
    /// frame.
    pub fn compute_frame(&mut self, frame: &TouchFrame) -> FrameResult {
        let mut state = KeyStateVector::new(self.keys.len());

        for point in &frame.points {
            let Some(position) = self.resolve_position(point.x, point.y) else {
                continue;
            };
            let key = &self.keys[position];
            state.set(key.kflag);

            if key.almost_left.is_some_and(|threshold| point.x < threshold) {
                if let Some(prev) = key.prev {
                    state.set(self.keys[prev].kflag);
                }
            }
            if key.almost_right.is_some_and(|threshold| threshold < point.x) {
                if let Some(next) = key.next {
                    state.set(self.keys[next].kflag);
                }
            }
        }

        let changes = state.changes_from(&self.last_state);
        self.last_state = state.clone();
        FrameResult { state, changes }
    }

    fn resolve_position(&mut self, x: f64, y: f64) -> Option<usize> {
        let column = x.floor() as i32;
        let hit = match self.memo.get(&column) {
            Some(&hit) => hit,
            None => {
                let hit = self.scan_column(column);
                if self.in_viewport(column) {
                    self.memo.insert(column, hit);
                }
                hit
            }
        };
        hit.filter(|&position| self.keys[position].spans_row(y))
    }

    /// Linear fallback: first key in layout order covering `column` on the row.
    fn scan_column(&self, column: i32) -> Option<usize> {
        let x = f64::from(column);
        let y = f64::from(self.row_top);
        self.keys.iter().position(|key| key.contains(x, y))
    }

    fn in_viewport(&self, column: i32) -> bool {
        u32::try_from(column).is_ok_and(|c| c < self.viewport_width)
    }

    fn fill_memo(&mut self) {
        if self.row_bottom <= self.row_top {
            return;
        }
        let width = i32::try_from(self.viewport_width).unwrap_or(i32::MAX);
        for column in 0..width {
            let hit = self.scan_column(column);
            self.memo.insert(column, hit);
        }
    }
}

fn compile_keys(elements: &[KeyElement]) -> Result<Vec<LogicalKey>, LayoutError> {
    if elements.is_empty() {
        return Err(LayoutError::Empty);
    }

    let count = elements.len();
    let mut seen = vec![false; count];
    for element in elements {
        if element.kflag >= count {
            return Err(LayoutError::SparseKflag {
                kflag: element.kflag,
                count,
            });
        }
        if std::mem::replace(&mut seen[element.kflag], true) {
            return Err(LayoutError::DuplicateKflag(element.kflag));
        }
    }

    let mut edges = Vec::with_capacity(count);
    for element in elements {
        let overflow = || LayoutError::GeometryOverflow {
            kflag: element.kflag,
        };
        let right = element.rect.right().ok_or_else(overflow)?;
        let bottom = element.rect.bottom().ok_or_else(overflow)?;
        edges.push((right, bottom));
    }

    let (row_top, row_bottom) = (elements[0].rect.top, edges[0].1);
    if let Some((off_row, _)) = elements
        .iter()
        .zip(&edges)
        .find(|(e, edge)| e.rect.top != row_top || edge.1 != row_bottom)
    {
        return Err(LayoutError::MultipleRows {
            kflag: off_row.kflag,
        });
    }

    for (pair, pair_edges) in elements.windows(2).zip(edges.windows(2)) {
        let (a, b) = (&pair[0].rect, &pair[1].rect);
        let (a_right, b_right) = (pair_edges[0].0, pair_edges[1].0);
        let overlap = i64::from(a_right.min(b_right)) - i64::from(a.left.max(b.left));
        if overlap > 0 {
            let allowed = f64::from(a.width.min(b.width)) / 4.0;
            if overlap as f64 > allowed {
                return Err(LayoutError::Overlap {
                    left: pair[0].kflag,
                    right: pair[1].kflag,
                });
            }
        }
    }

    let keys = elements
        .iter()
        .zip(edges)
        .enumerate()
        .map(|(position, (element, (right, bottom)))| {
            let rect = element.rect;
            let prev = position.checked_sub(1);
            let next = (position + 1 < count).then_some(position + 1);
            let quarter = f64::from(rect.width) / 4.0;
            LogicalKey {
                kflag: element.kflag,
                top: rect.top,
                bottom,
                left: rect.left,
                right,
                almost_left: prev.map(|_| f64::from(rect.left) + quarter),
                almost_right: next.map(|_| f64::from(rect.left) + quarter * 3.0),
                prev,
                next,
            }
        })
        .collect();

    Ok(keys)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
