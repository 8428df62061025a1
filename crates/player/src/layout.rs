//! Player container layout and the shields drawn over the widget's chrome.

use common::{Point, Rect, Size};

/// Height of the strip where the widget draws its title and channel badge.
pub const TITLE_STRIP_HEIGHT: f32 = 64.0;
/// Watermark/logo box in the bottom-right corner.
pub const WATERMARK_SIZE: Size = Size::new(128.0, 56.0);
/// Host-drawn control bar along the bottom edge.
pub const CONTROL_BAR_HEIGHT: f32 = 56.0;

/// Region of the widget covered by an opaque shield.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShieldKind {
    /// Title, channel avatar and "watch on" link.
    TitleBar,
    /// Logo watermark that links out.
    Watermark,
    /// Full-surface cover over the end-of-video suggestion grid.
    EndScreen,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shield {
    pub kind: ShieldKind,
    pub rect: Rect,
}

/// What a pointer at a given position would hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerTarget {
    /// Absorbed by a shield; the widget never sees it.
    Shield(ShieldKind),
    /// The host's own control bar.
    Controls,
    /// The video surface itself.
    Surface,
    /// Outside the player.
    Outside,
}

/// Geometry of the mounted player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerLayout {
    viewport: Rect,
    pseudo_fullscreen: bool,
    end_screen: bool,
}

impl PlayerLayout {
    pub fn new(viewport: Size) -> Self {
        Self {
            viewport: Rect::from_origin_size(Point::ZERO, viewport),
            pseudo_fullscreen: false,
            end_screen: false,
        }
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = Rect::from_origin_size(Point::ZERO, viewport);
    }

    pub fn is_pseudo_fullscreen(&self) -> bool {
        self.pseudo_fullscreen
    }

    /// Fill the viewport with the player using layout alone.
    pub fn enter_pseudo_fullscreen(&mut self) {
        self.pseudo_fullscreen = true;
    }

    pub fn exit_pseudo_fullscreen(&mut self) {
        self.pseudo_fullscreen = false;
    }

    pub fn is_end_screen_visible(&self) -> bool {
        self.end_screen
    }

    pub fn set_end_screen(&mut self, visible: bool) {
        self.end_screen = visible;
    }

    /// The player container: the whole viewport in pseudo-fullscreen,
    /// otherwise a 16:9 box at the top of the viewport.
    pub fn container(&self) -> Rect {
        if self.pseudo_fullscreen {
            return self.viewport;
        }
        let width = self.viewport.width;
        let height = (width * 9.0 / 16.0).min(self.viewport.height);
        Rect::new(self.viewport.x, self.viewport.y, width, height)
    }

    pub fn control_bar(&self) -> Rect {
        self.container().bottom_strip(CONTROL_BAR_HEIGHT)
    }

    /// Shields in stacking order, topmost first.
    pub fn shields(&self) -> Vec<Shield> {
        let container = self.container();
        let mut shields = Vec::with_capacity(3);
        if self.end_screen {
            shields.push(Shield {
                kind: ShieldKind::EndScreen,
                rect: container,
            });
        }
        shields.push(Shield {
            kind: ShieldKind::TitleBar,
            rect: container.top_strip(TITLE_STRIP_HEIGHT),
        });

        // The watermark sits just above the host's control bar.
        let above_controls = Rect::new(
            container.x,
            container.y,
            container.width,
            (container.height - CONTROL_BAR_HEIGHT).max(0.0),
        );
        shields.push(Shield {
            kind: ShieldKind::Watermark,
            rect: above_controls.bottom_right_corner(WATERMARK_SIZE),
        });
        shields
    }

    pub fn hit_test(&self, point: Point) -> PointerTarget {
        let container = self.container();
        if !container.contains_point(point) {
            return PointerTarget::Outside;
        }
        if let Some(shield) = self.shields().iter().find(|s| s.rect.contains_point(point)) {
            return PointerTarget::Shield(shield.kind);
        }
        if self.control_bar().contains_point(point) {
            return PointerTarget::Controls;
        }
        PointerTarget::Surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desktop() -> PlayerLayout {
        PlayerLayout::new(Size::new(1280.0, 720.0))
    }

    #[test]
    fn test_inline_container_is_16_by_9() {
        let layout = PlayerLayout::new(Size::new(390.0, 844.0));
        let container = layout.container();
        assert_eq!(container.width, 390.0);
        assert!((container.height - 219.375).abs() < 0.01);
    }

    #[test]
    fn test_pseudo_fullscreen_fills_viewport() {
        let mut layout = PlayerLayout::new(Size::new(844.0, 390.0));
        layout.enter_pseudo_fullscreen();
        assert_eq!(layout.container(), layout.viewport());
    }

    #[test]
    fn test_hit_testing() {
        let layout = desktop();
        assert_eq!(
            layout.hit_test(Point::new(640.0, 10.0)),
            PointerTarget::Shield(ShieldKind::TitleBar)
        );
        assert_eq!(
            layout.hit_test(Point::new(1270.0, 620.0)),
            PointerTarget::Shield(ShieldKind::Watermark)
        );
        assert_eq!(layout.hit_test(Point::new(100.0, 700.0)), PointerTarget::Controls);
        assert_eq!(layout.hit_test(Point::new(640.0, 360.0)), PointerTarget::Surface);
        assert_eq!(layout.hit_test(Point::new(-5.0, 10.0)), PointerTarget::Outside);
    }

    #[test]
    fn test_end_screen_covers_everything() {
        let mut layout = desktop();
        layout.set_end_screen(true);
        for point in [Point::new(640.0, 360.0), Point::new(100.0, 700.0)] {
            assert_eq!(
                layout.hit_test(point),
                PointerTarget::Shield(ShieldKind::EndScreen)
            );
        }
    }
}
