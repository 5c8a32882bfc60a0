use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::sys::geometry::{Point, Rect, Size};

/// Smallest frame a floating resize may produce.
pub const MIN_FLOATING_SIZE: Size = Size::new(50.0, 50.0);

/// Corner grabbed by a floating resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeCorner {
    pub fn affects_left(&self) -> bool { matches!(self, Self::TopLeft | Self::BottomLeft) }

    pub fn affects_right(&self) -> bool { matches!(self, Self::TopRight | Self::BottomRight) }

    pub fn affects_top(&self) -> bool { matches!(self, Self::TopLeft | Self::TopRight) }

    pub fn affects_bottom(&self) -> bool {
        matches!(self, Self::BottomLeft | Self::BottomRight)
    }

    /// Quadrant of `cursor` relative to the window center.
    pub fn from_cursor_position(cursor: Point, window_center: Point) -> Self {
        let left = cursor.x < window_center.x;
        let top = cursor.y < window_center.y;

        match (left, top) {
            (true, true) => Self::TopLeft,
            (false, true) => Self::TopRight,
            (true, false) => Self::BottomLeft,
            (false, false) => Self::BottomRight,
        }
    }

    /// Applies a cursor delta to `initial`, moving only the edges this corner
    /// owns. The opposite edges stay anchored.
    pub fn resize(&self, initial: Rect, dx: f64, dy: f64) -> Rect {
        let mut min_x = initial.min_x();
        let mut max_x = initial.max_x();
        let mut min_y = initial.min_y();
        let mut max_y = initial.max_y();

        if self.affects_left() {
            min_x = (min_x + dx).min(max_x - MIN_FLOATING_SIZE.width);
        } else if self.affects_right() {
            max_x = (max_x + dx).max(min_x + MIN_FLOATING_SIZE.width);
        }
        if self.affects_top() {
            min_y = (min_y + dy).min(max_y - MIN_FLOATING_SIZE.height);
        } else if self.affects_bottom() {
            max_y = (max_y + dy).max(min_y + MIN_FLOATING_SIZE.height);
        }
        Rect::from_xywh(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

/// Direction of a `--adjust-ratio` command relative to the focused window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RatioAdjustment {
    Expand,
    Reduce,
}

impl RatioAdjustment {
    /// Signed ratio delta for a window sitting on the given side of a split.
    pub fn delta(self, amount: f64, on_first: bool) -> f64 {
        let grow = match self {
            RatioAdjustment::Expand => amount,
            RatioAdjustment::Reduce => -amount,
        };
        if on_first { grow } else { -grow }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_from_quadrant() {
        let center = Point::new(100., 100.);
        assert_eq!(ResizeCorner::from_cursor_position(Point::new(10., 10.), center), ResizeCorner::TopLeft);
        assert_eq!(ResizeCorner::from_cursor_position(Point::new(150., 10.), center), ResizeCorner::TopRight);
        assert_eq!(ResizeCorner::from_cursor_position(Point::new(10., 150.), center), ResizeCorner::BottomLeft);
        assert_eq!(
            ResizeCorner::from_cursor_position(Point::new(150., 150.), center),
            ResizeCorner::BottomRight
        );
    }

    #[test]
    fn resize_moves_owned_edges_only() {
        let initial = Rect::from_xywh(100., 100., 400., 300.);
        assert_eq!(
            ResizeCorner::BottomRight.resize(initial, 20., 10.),
            Rect::from_xywh(100., 100., 420., 310.)
        );
        assert_eq!(
            ResizeCorner::TopLeft.resize(initial, 20., 10.),
            Rect::from_xywh(120., 110., 380., 290.)
        );
    }

    #[test]
    fn resize_keeps_minimum_size() {
        let initial = Rect::from_xywh(0., 0., 100., 100.);
        let shrunk = ResizeCorner::TopLeft.resize(initial, 500., 500.);
        assert_eq!(shrunk.size, MIN_FLOATING_SIZE);
        assert_eq!(shrunk.max_x(), 100.);
    }

    #[test]
    fn adjustment_sign_depends_on_side() {
        assert_eq!(RatioAdjustment::Expand.delta(0.1, true), 0.1);
        assert_eq!(RatioAdjustment::Expand.delta(0.1, false), -0.1);
        assert_eq!(RatioAdjustment::Reduce.delta(0.1, true), -0.1);
    }
}
