//! CPU-side 2D overlay surface for selection boxes and targeting guides.
//! Drawing is sparse and localized, so instead of wiping the whole canvas
//! every frame the surface tracks a dirty bounding box: every plotted point
//! folds into a min/max accumulator and `clear` erases only that rectangle
//! (with a small safety margin) before resetting the accumulator. The pixel
//! buffer is plain RGBA, uploaded as a texture by the viewer.

use winit::dpi::PhysicalSize;

/// Safety margin, in pixels, added around the dirty rectangle on clear so
/// anti-aliased or rounded edges never survive.
pub const CLEAR_MARGIN: f32 = 3.0;

pub const SELECTION_COLOR: [u8; 4] = [64, 160, 255, 220];
pub const TARGET_PRIMARY_COLOR: [u8; 4] = [255, 196, 64, 255];
pub const TARGET_SECONDARY_COLOR: [u8; 4] = [140, 140, 150, 180];

const DASH_ON: u32 = 6;
const DASH_PERIOD: u32 = 10;

/// Min/max fold over every point touched since the last clear. The empty
/// sentinel is an inverted box, so the first fold always re-establishes
/// correct bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirtyBounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl DirtyBounds {
    pub const EMPTY: Self = Self {
        min_x: f32::INFINITY,
        min_y: f32::INFINITY,
        max_x: f32::NEG_INFINITY,
        max_y: f32::NEG_INFINITY,
    };

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Fold a point in. Monotonic: the box never shrinks mid-frame.
    pub fn expand(&mut self, x: f32, y: f32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Padded and clamped integer rectangle, or `None` while empty.
    pub fn padded_rect(&self, margin: f32, size: PhysicalSize<u32>) -> Option<(u32, u32, u32, u32)> {
        if self.is_empty() {
            return None;
        }
        let min_x = ((self.min_x - margin).floor().max(0.0)) as u32;
        let min_y = ((self.min_y - margin).floor().max(0.0)) as u32;
        let max_x = ((self.max_x + margin).ceil() as u32).min(size.width.saturating_sub(1));
        let max_y = ((self.max_y + margin).ceil() as u32).min(size.height.saturating_sub(1));
        if min_x > max_x || min_y > max_y {
            return None;
        }
        Some((min_x, min_y, max_x, max_y))
    }
}

/// The overlay surface itself: an RGBA buffer plus the dirty accumulator.
pub struct OverlayCanvas {
    size: PhysicalSize<u32>,
    pixels: Vec<u8>,
    dirty: DirtyBounds,
    generation: u64,
}

impl OverlayCanvas {
    pub fn new(size: PhysicalSize<u32>) -> Self {
        Self {
            size,
            pixels: vec![0; (size.width * size.height * 4) as usize],
            dirty: DirtyBounds::EMPTY,
            generation: 0,
        }
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Bumped on every draw/clear; lets the uploader skip unchanged frames.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn dirty_bounds(&self) -> &DirtyBounds {
        &self.dirty
    }

    /// Reallocate for a new canvas size; everything is wiped.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
        self.pixels = vec![0; (size.width * size.height * 4) as usize];
        self.dirty = DirtyBounds::EMPTY;
        self.generation += 1;
    }

    /// Erase exactly the padded dirty rectangle, then reset the bounds to
    /// the empty sentinel. A no-op when nothing was drawn.
    pub fn clear(&mut self) {
        let Some((min_x, min_y, max_x, max_y)) = self.dirty.padded_rect(CLEAR_MARGIN, self.size)
        else {
            self.dirty = DirtyBounds::EMPTY;
            return;
        };
        for y in min_y..=max_y {
            let row = (y * self.size.width) as usize * 4;
            let start = row + min_x as usize * 4;
            let end = row + (max_x as usize + 1) * 4;
            self.pixels[start..end].fill(0);
        }
        self.dirty = DirtyBounds::EMPTY;
        self.generation += 1;
    }

    /// Outline of the drag-selection box between two corners.
    pub fn draw_selection_box(&mut self, corner_a: [f32; 2], corner_b: [f32; 2]) {
        let (x0, y0) = (corner_a[0], corner_a[1]);
        let (x1, y1) = (corner_b[0], corner_b[1]);
        self.draw_line([x0, y0], [x1, y0], SELECTION_COLOR, false);
        self.draw_line([x1, y0], [x1, y1], SELECTION_COLOR, false);
        self.draw_line([x1, y1], [x0, y1], SELECTION_COLOR, false);
        self.draw_line([x0, y1], [x0, y0], SELECTION_COLOR, false);
        self.generation += 1;
    }

    /// Targeting guides for an editing gesture: dashed lines from each
    /// secondary landmark to the cursor, then a solid line from the primary
    /// snap target so it stands out.
    pub fn draw_targeting_lines(
        &mut self,
        cursor: [f32; 2],
        primary: [f32; 2],
        secondary: &[[f32; 2]],
    ) {
        for &point in secondary {
            self.draw_line(point, cursor, TARGET_SECONDARY_COLOR, true);
        }
        self.draw_line(primary, cursor, TARGET_PRIMARY_COLOR, false);
        self.generation += 1;
    }

    /// DDA line plot; folds every plotted point into the dirty bounds.
    fn draw_line(&mut self, from: [f32; 2], to: [f32; 2], color: [u8; 4], dashed: bool) {
        let delta_x = to[0] - from[0];
        let delta_y = to[1] - from[1];
        let steps = delta_x.abs().max(delta_y.abs()).ceil().max(1.0) as u32;
        for step in 0..=steps {
            if dashed && step % DASH_PERIOD >= DASH_ON {
                continue;
            }
            let t = step as f32 / steps as f32;
            let x = from[0] + delta_x * t;
            let y = from[1] + delta_y * t;
            self.plot(x, y, color);
        }
    }

    fn plot(&mut self, x: f32, y: f32, color: [u8; 4]) {
        self.dirty.expand(x, y);
        if x < 0.0 || y < 0.0 {
            return;
        }
        let (x, y) = (x.round() as u32, y.round() as u32);
        if x >= self.size.width || y >= self.size.height {
            return;
        }
        let offset = ((y * self.size.width + x) * 4) as usize;
        self.pixels[offset..offset + 4].copy_from_slice(&color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> OverlayCanvas {
        OverlayCanvas::new(PhysicalSize::new(64, 64))
    }

    fn drawn_pixel_count(canvas: &OverlayCanvas) -> usize {
        canvas
            .pixels()
            .chunks_exact(4)
            .filter(|pixel| pixel.iter().any(|&byte| byte != 0))
            .count()
    }

    #[test]
    fn bounds_cover_every_folded_point_in_any_order() {
        let points = [
            (10.0, 20.0),
            (3.0, 50.0),
            (40.0, 5.0),
            (22.0, 22.0),
            (3.0, 5.0),
        ];

        let mut forward = DirtyBounds::EMPTY;
        for &(x, y) in &points {
            forward.expand(x, y);
        }
        let mut reversed = DirtyBounds::EMPTY;
        for &(x, y) in points.iter().rev() {
            reversed.expand(x, y);
        }

        assert_eq!(forward, reversed);
        for &(x, y) in &points {
            assert!(x >= forward.min_x && x <= forward.max_x);
            assert!(y >= forward.min_y && y <= forward.max_y);
        }
    }

    #[test]
    fn empty_sentinel_reports_empty() {
        let bounds = DirtyBounds::EMPTY;
        assert!(bounds.is_empty());
        assert!(bounds.padded_rect(CLEAR_MARGIN, PhysicalSize::new(64, 64)).is_none());
    }

    #[test]
    fn first_draw_establishes_correct_bounds() {
        let mut canvas = canvas();
        canvas.draw_selection_box([10.0, 12.0], [30.0, 25.0]);
        let bounds = *canvas.dirty_bounds();
        assert_eq!(
            (bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y),
            (10.0, 12.0, 30.0, 25.0)
        );
    }

    #[test]
    fn clear_erases_only_the_dirty_region() {
        let mut canvas = canvas();
        canvas.draw_selection_box([10.0, 10.0], [20.0, 20.0]);
        // A pixel far outside the dirty region, written behind the
        // tracker's back, must survive a tracked clear.
        canvas.pixels[(60 * 64 + 60) * 4 + 3] = 255;

        canvas.clear();
        assert!(canvas.dirty_bounds().is_empty());
        assert_eq!(canvas.pixels[(60 * 64 + 60) * 4 + 3], 255);

        // Everything inside the tracked region is gone.
        for y in 7..=23 {
            for x in 7..=23 {
                let offset = (y * 64 + x) * 4;
                assert_eq!(&canvas.pixels[offset..offset + 4], &[0, 0, 0, 0]);
            }
        }
    }

    #[test]
    fn clear_after_clear_is_a_noop() {
        let mut canvas = canvas();
        canvas.draw_selection_box([5.0, 5.0], [9.0, 9.0]);
        canvas.clear();
        let generation = canvas.generation();
        canvas.clear();
        assert_eq!(canvas.generation(), generation);
    }

    #[test]
    fn targeting_lines_draw_solid_primary_and_dashed_secondary() {
        let mut canvas = canvas();
        canvas.draw_targeting_lines([32.0, 32.0], [32.0, 2.0], &[[2.0, 32.0]]);

        // Solid vertical line: every pixel between primary and cursor set.
        for y in 3..32 {
            let offset = (y * 64 + 32) * 4;
            assert_eq!(
                &canvas.pixels[offset..offset + 4],
                &TARGET_PRIMARY_COLOR,
                "missing solid pixel at y={y}"
            );
        }

        // Dashed horizontal line: some pixels in, some out.
        let mut on = 0;
        let mut off = 0;
        for x in 3..32 {
            let offset = (32 * 64 + x) * 4;
            if canvas.pixels[offset + 3] != 0 {
                on += 1;
            } else {
                off += 1;
            }
        }
        assert!(on > 0 && off > 0, "expected a dash pattern, got {on}/{off}");
    }

    #[test]
    fn out_of_canvas_points_still_expand_bounds_without_writing() {
        let mut canvas = canvas();
        canvas.draw_selection_box([-10.0, -10.0], [5.0, 5.0]);
        assert_eq!(canvas.dirty_bounds().min_x, -10.0);
        let before = drawn_pixel_count(&canvas);
        assert!(before > 0);
        canvas.clear();
        assert_eq!(drawn_pixel_count(&canvas), 0);
    }
}
