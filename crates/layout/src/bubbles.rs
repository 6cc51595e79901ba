//! Marker card placement over a background photo.
//!
//! Each entry gets a fixed-size card. Cards start where the user dropped them
//! (or on their anchor), then are processed top to bottom and slid vertically,
//! flush against the cards they hit, until they find a free slot: downward
//! first, then upward once the bottom edge is reached. The search is bounded,
//! so extremely dense views degrade to overlapping cards instead of failing.

use log::trace;
use rigsheet_types::VehicleViewEntry;
use rigsheet_types::geometry::{Point, Rect, Size};

pub const BUBBLE_WIDTH: f32 = 150.0;
pub const BUBBLE_HEIGHT: f32 = 44.0;
pub const BUBBLE_PADDING: f32 = 6.0;
pub const MAX_ATTEMPTS: usize = 40;
pub const ANCHOR_DOT_RADIUS: f32 = 3.0;
const GAP_TOLERANCE: f32 = 0.01;

/// Straight pointer line from the card center to the anchor, ending in a dot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connector {
    pub from: Point,
    pub to: Point,
    pub dot_radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BubblePlacement {
    /// Index into the entry slice given to [`BubbleLayoutEngine::layout`].
    pub entry_index: usize,
    pub key: String,
    pub rect: Rect,
    pub anchor: Point,
    pub connector: Option<Connector>,
}

impl BubblePlacement {
    pub fn has_connector(&self) -> bool {
        self.connector.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Search {
    Down,
    Up,
}

#[derive(Debug, Clone, Copy)]
pub struct BubbleLayoutEngine {
    pub bubble_size: Size,
    pub padding: f32,
    pub max_attempts: usize,
}

impl Default for BubbleLayoutEngine {
    fn default() -> Self {
        Self {
            bubble_size: Size::new(BUBBLE_WIDTH, BUBBLE_HEIGHT),
            padding: BUBBLE_PADDING,
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

impl BubbleLayoutEngine {
    /// Computes one placement per entry, returned in input order.
    pub fn layout(
        &self,
        entries: &[VehicleViewEntry],
        bounds: Rect,
        pointer_mode: bool,
    ) -> Vec<BubblePlacement> {
        let half_w = self.bubble_size.width / 2.0;
        let half_h = self.bubble_size.height / 2.0;

        let seeds: Vec<(Point, Rect)> = entries
            .iter()
            .map(|entry| {
                let bubble = entry.bubble_ratios();
                let anchor_ratio = entry.anchor_ratios().or(bubble).unwrap_or((0.5, 0.5));
                let bubble_ratio = bubble.or(entry.anchor_ratios()).unwrap_or((0.5, 0.5));
                let anchor = bounds.point_at(anchor_ratio.0, anchor_ratio.1);
                let center = bounds.point_at(bubble_ratio.0, bubble_ratio.1);
                let raw = Rect::new(
                    center.x - half_w,
                    center.y - half_h,
                    self.bubble_size.width,
                    self.bubble_size.height,
                );
                (anchor, raw)
            })
            .collect();

        // sort_by is stable: ties keep input order
        let mut order: Vec<usize> = (0..entries.len()).collect();
        order.sort_by(|&a, &b| seeds[a].0.y.total_cmp(&seeds[b].0.y));

        let mut placed: Vec<Rect> = Vec::with_capacity(entries.len());
        let mut rects = vec![Rect::default(); entries.len()];
        for index in order {
            let rect = self.resolve(seeds[index].1, bounds, &placed);
            placed.push(rect);
            rects[index] = rect;
        }

        entries
            .iter()
            .zip(seeds)
            .zip(rects)
            .enumerate()
            .map(|(entry_index, ((entry, (anchor, _)), rect))| BubblePlacement {
                entry_index,
                key: entry.key.clone(),
                rect,
                anchor,
                connector: pointer_mode.then(|| Connector {
                    from: rect.center(),
                    to: anchor,
                    dot_radius: ANCHOR_DOT_RADIUS,
                }),
            })
            .collect()
    }

    fn resolve(&self, raw: Rect, bounds: Rect, placed: &[Rect]) -> Rect {
        let origin = self.clamp(raw, bounds);
        let top_limit = bounds.y + self.padding;
        let bottom_limit = bounds.bottom() - self.padding - origin.height;

        let mut candidate = origin;
        let mut search = Search::Down;
        let mut attempts = 0;

        while attempts < self.max_attempts {
            // jump flush past every card the candidate currently touches
            let blockers = placed.iter().filter(|other| self.collides(&candidate, other));
            let next = match search {
                Search::Down => blockers.map(|other| other.bottom() + self.padding).reduce(f32::max),
                Search::Up => blockers
                    .map(|other| other.y - self.padding - candidate.height)
                    .reduce(f32::min),
            };
            let Some(y) = next else {
                break;
            };
            attempts += 1;
            match search {
                Search::Down if y > bottom_limit => {
                    search = Search::Up;
                    candidate = origin;
                }
                Search::Up if y < top_limit => break,
                _ => candidate = Rect { y, ..origin },
            }
        }

        if attempts > 0 {
            trace!(
                "bubble moved from y={:.1} to y={:.1} after {} attempts",
                origin.y, candidate.y, attempts
            );
        }
        candidate
    }

    fn clamp(&self, rect: Rect, bounds: Rect) -> Rect {
        let clamp_axis = |value: f32, min: f32, max: f32| {
            if max < min { min } else { value.clamp(min, max) }
        };
        Rect {
            x: clamp_axis(
                rect.x,
                bounds.x + self.padding,
                bounds.right() - self.padding - rect.width,
            ),
            y: clamp_axis(
                rect.y,
                bounds.y + self.padding,
                bounds.bottom() - self.padding - rect.height,
            ),
            ..rect
        }
    }

    /// True when the two cards are closer than `padding` on both axes.
    fn collides(&self, candidate: &Rect, other: &Rect) -> bool {
        let gap = self.padding - GAP_TOLERANCE;
        candidate.x < other.right() + gap
            && other.x < candidate.right() + gap
            && candidate.y < other.bottom() + gap
            && other.y < candidate.bottom() + gap
    }
}

/// Lays out entries with the default card size and spacing.
pub fn layout_bubbles(
    entries: &[VehicleViewEntry],
    bounds: Rect,
    pointer_mode: bool,
) -> Vec<BubblePlacement> {
    BubbleLayoutEngine::default().layout(entries, bounds, pointer_mode)
}
