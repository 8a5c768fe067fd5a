/*
 * Size negotiation with an external layout engine. The engine only sees the
 * `Layout` contract; `WindowLayout` answers it for one owning object from the
 * object's ideal size and forwards the final bounds to the native window.
 */
use crate::types::{Rect, Size};
use crate::window_common::Window;

use std::rc::Rc;

/// Minimum and maximum size a layout item may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraints {
    pub min: Size,
    pub max: Size,
}

impl Constraints {
    pub fn new(min: Size, max: Size) -> Self {
        Self { min, max }
    }

    pub fn tight(size: Size) -> Self {
        Self::new(size, size)
    }

    pub fn loose(max: Size) -> Self {
        Self::new(Size::default(), max)
    }

    pub fn unbounded() -> Self {
        Self::loose(Size::new(i32::MAX, i32::MAX))
    }

    /// Clamps `size` into the range; `min` wins when the range is inverted.
    pub fn constrain(&self, size: Size) -> Size {
        Size::new(
            size.width.min(self.max.width).max(self.min.width),
            size.height.min(self.max.height).max(self.min.height),
        )
    }
}

pub trait Layout {
    fn layout(&self, constraints: Constraints) -> Size;
    fn min_intrinsic_width(&self, height: i32) -> i32;
    fn min_intrinsic_height(&self, width: i32) -> i32;
    fn set_bounds(&self, bounds: Rect);
}

pub struct WindowLayout {
    window: Rc<dyn Window>,
}

impl WindowLayout {
    pub fn new(window: Rc<dyn Window>) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &Rc<dyn Window> {
        &self.window
    }
}

impl Layout for WindowLayout {
    fn layout(&self, constraints: Constraints) -> Size {
        constraints.constrain(self.window.ideal_size())
    }

    // Native windows do not reflow: the ideal size holds for any extent.
    fn min_intrinsic_width(&self, _height: i32) -> i32 {
        self.window.ideal_size().width
    }

    fn min_intrinsic_height(&self, _width: i32) -> i32 {
        self.window.ideal_size().height
    }

    fn set_bounds(&self, bounds: Rect) {
        self.window.base().set_bounds(bounds);
    }
}
