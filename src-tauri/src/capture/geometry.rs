//! Pure capture geometry: areas, displays, logical -> physical scaling.
//!
//! No windowing or I/O in here.

use serde::{Deserialize, Serialize};

/// A finished selection rectangle in whole pixels.
///
/// Logical when produced by an overlay; physical after [`to_physical`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureArea {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One connected display, bounds in logical pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayInfo {
    pub name: Option<String>,
    pub bounds_x: f64,
    pub bounds_y: f64,
    pub bounds_width: f64,
    pub bounds_height: f64,
    pub scale_factor: f64,
}

impl DisplayInfo {
    /// Bounds in physical screen pixels, the space windows are placed in.
    pub fn physical_bounds(&self) -> CaptureArea {
        let s = self.scale_factor;
        CaptureArea {
            x: round_half_up(self.bounds_x * s) as i32,
            y: round_half_up(self.bounds_y * s) as i32,
            width: round_half_up(self.bounds_width * s).max(0.0) as u32,
            height: round_half_up(self.bounds_height * s).max(0.0) as u32,
        }
    }

    /// Squared distance from a physical-pixel point to this display's
    /// physical rectangle; zero when the point is inside.
    fn physical_distance_sq(&self, point: Point) -> f64 {
        let s = self.scale_factor;
        let left = self.bounds_x * s;
        let top = self.bounds_y * s;
        let right = left + self.bounds_width * s;
        let bottom = top + self.bounds_height * s;

        let dx = if point.x < left {
            left - point.x
        } else if point.x > right {
            point.x - right
        } else {
            0.0
        };
        let dy = if point.y < top {
            top - point.y
        } else if point.y > bottom {
            point.y - bottom
        } else {
            0.0
        };
        dx * dx + dy * dy
    }
}

/// Round to nearest, halves toward positive infinity (`Math.round`).
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Scale every field by `scale_factor` and round each one independently.
pub fn to_physical(area: CaptureArea, scale_factor: f64) -> CaptureArea {
    let scale = |v: f64| round_half_up(v * scale_factor);
    CaptureArea {
        x: scale(area.x as f64) as i32,
        y: scale(area.y as f64) as i32,
        width: scale(area.width as f64).max(0.0) as u32,
        height: scale(area.height as f64).max(0.0) as u32,
    }
}

/// Display closest to `pointer` (physical pixels). Ties go to the earlier
/// display in enumeration order.
pub fn nearest_display(displays: &[DisplayInfo], pointer: Point) -> Option<&DisplayInfo> {
    let mut best: Option<(&DisplayInfo, f64)> = None;
    for display in displays {
        let distance = display.physical_distance_sq(pointer);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((display, distance)),
        }
    }
    best.map(|(display, _)| display)
}

/// Scale factor used for a capture that ends with the pointer at `pointer`.
///
/// The display nearest the pointer wins, even if the selection was drawn on
/// another display. Without a pointer position (or any display), falls back
/// to the display the selection came from, then to 1.0.
pub fn resolve_scale_factor(
    displays: &[DisplayInfo],
    pointer: Option<Point>,
    fallback: Option<&DisplayInfo>,
) -> f64 {
    if let Some(display) = pointer.and_then(|p| nearest_display(displays, p)) {
        return display.scale_factor;
    }
    log::warn!("[CAPTURE] Pointer display unknown, using the overlay's own scale factor");
    fallback.map(|d| d.scale_factor).unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(x: i32, y: i32, width: u32, height: u32) -> CaptureArea {
        CaptureArea {
            x,
            y,
            width,
            height,
        }
    }

    fn display(x: f64, y: f64, w: f64, h: f64, scale: f64) -> DisplayInfo {
        DisplayInfo {
            name: None,
            bounds_x: x,
            bounds_y: y,
            bounds_width: w,
            bounds_height: h,
            scale_factor: scale,
        }
    }

    #[test]
    fn unit_scale_is_identity() {
        let a = area(-1920, 37, 641, 9);
        assert_eq!(to_physical(a, 1.0), a);
    }

    #[test]
    fn double_scale() {
        assert_eq!(
            to_physical(area(100, 100, 200, 150), 2.0),
            area(200, 200, 400, 300)
        );
    }

    #[test]
    fn fields_round_independently() {
        // 1.25: 101 -> 126.25, 7 -> 8.75, 9 -> 11.25, 3 -> 3.75
        assert_eq!(to_physical(area(101, 7, 9, 3), 1.25), area(126, 9, 11, 4));
    }

    #[test]
    fn halves_round_up() {
        assert_eq!(to_physical(area(5, -5, 5, 1), 1.5), area(8, -7, 8, 2));
    }

    #[test]
    fn width_is_rounded_product_for_many_scales() {
        for scale in [0.0, 0.5, 1.0, 1.25, 1.5, 1.75, 2.0, 2.5, 3.0] {
            for width in [0u32, 1, 6, 99, 333, 1920] {
                let physical = to_physical(area(0, 0, width, width), scale);
                let expected = (width as f64 * scale + 0.5).floor() as u32;
                assert_eq!(physical.width, expected, "width {} scale {}", width, scale);
                assert_eq!(physical.height, expected);
            }
        }
    }

    #[test]
    fn physical_bounds_use_each_display_own_scale() {
        let primary = display(0.0, 0.0, 1920.0, 1080.0, 1.0);
        let retina = display(1920.0, 0.0, 1280.0, 800.0, 2.0);
        let left = display(-1024.0, 0.0, 1024.0, 614.4, 1.25);

        assert_eq!(primary.physical_bounds(), area(0, 0, 1920, 1080));
        assert_eq!(retina.physical_bounds(), area(3840, 0, 2560, 1600));
        assert_eq!(left.physical_bounds(), area(-1280, 0, 1280, 768));
    }

    #[test]
    fn pointer_inside_a_display_picks_it() {
        let displays = [
            display(0.0, 0.0, 1920.0, 1080.0, 1.0),
            display(1920.0, 0.0, 1280.0, 720.0, 2.0),
        ];
        // Second display spans physical x 3840..6400.
        let found = nearest_display(&displays, Point::new(4000.0, 100.0)).unwrap();
        assert_eq!(found.scale_factor, 2.0);
    }

    #[test]
    fn pointer_in_a_gap_picks_the_closest() {
        let displays = [
            display(0.0, 0.0, 100.0, 100.0, 1.0),
            display(300.0, 0.0, 100.0, 100.0, 1.5),
        ];
        // Second display: physical x 450..600.
        let found = nearest_display(&displays, Point::new(420.0, 50.0)).unwrap();
        assert_eq!(found.scale_factor, 1.5);
        let found = nearest_display(&displays, Point::new(150.0, 50.0)).unwrap();
        assert_eq!(found.scale_factor, 1.0);
    }

    #[test]
    fn ties_go_to_the_first_display() {
        let displays = [
            display(0.0, 0.0, 100.0, 100.0, 1.0),
            display(200.0, 0.0, 100.0, 100.0, 2.0),
        ];
        // Physical x 0..100 and 400..600; x=250 is 150 from both.
        let found = nearest_display(&displays, Point::new(250.0, 50.0)).unwrap();
        assert_eq!(found.scale_factor, 1.0);
    }

    #[test]
    fn no_displays_means_no_nearest() {
        assert!(nearest_display(&[], Point::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn scale_factor_follows_pointer_not_origin() {
        let displays = [
            display(0.0, 0.0, 1000.0, 1000.0, 1.0),
            display(1000.0, 0.0, 1000.0, 1000.0, 2.0),
        ];
        let origin = displays[0].clone();
        let scale = resolve_scale_factor(&displays, Some(Point::new(2500.0, 10.0)), Some(&origin));
        assert_eq!(scale, 2.0);
    }

    #[test]
    fn scale_factor_falls_back_to_origin_then_one() {
        let origin = display(0.0, 0.0, 10.0, 10.0, 1.75);
        assert_eq!(resolve_scale_factor(&[], None, Some(&origin)), 1.75);
        assert_eq!(resolve_scale_factor(&[], Some(Point::new(1.0, 1.0)), None), 1.0);
    }
}
