//! Per-finger "key down" test on pixel coordinates.
//!
//! A finger counts as down when its tip has dropped more than `min_drop`
//! pixels below its knuckle while staying within `max_drift` pixels
//! horizontally.  The thresholds were tuned on a 640×480 capture; other
//! frame sizes get proportionally scaled thresholds via
//! [`PressDetector::scaled_for`].
//!
//! Debouncing is not done here: this is a stateless predicate and the
//! rising/falling edge logic lives in [`crate::session`].

use crate::landmark::PixelPoint;

/// Capture size the default thresholds were tuned for.
pub const REFERENCE_SIZE: (u32, u32) = (640, 480);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PressDetector {
    /// Tip must be more than this many pixels below the base.
    pub min_drop:  f32,
    /// Tip must be less than this many pixels to either side of the base.
    pub max_drift: f32,
}

impl Default for PressDetector {
    fn default() -> Self {
        PressDetector { min_drop: 20.0, max_drift: 50.0 }
    }
}

impl PressDetector {
    pub fn is_down(&self, tip: PixelPoint, base: PixelPoint) -> bool {
        let drop  = (i64::from(tip.y) - i64::from(base.y)) as f32;
        let drift = (i64::from(tip.x) - i64::from(base.x)).abs() as f32;
        drop > self.min_drop && drift < self.max_drift
    }

    /// Thresholds for a `frame` sized capture, given the size they were
    /// tuned at.  Drop scales with height, drift with width.
    pub fn scaled_for(&self, reference: (u32, u32), frame: (u32, u32)) -> Self {
        if reference == frame || reference.0 == 0 || reference.1 == 0 {
            return *self;
        }
        PressDetector {
            min_drop:  self.min_drop  * frame.1 as f32 / reference.1 as f32,
            max_drift: self.max_drift * frame.0 as f32 / reference.0 as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: PixelPoint = PixelPoint { x: 300, y: 200 };

    fn at(dx: i32, dy: i32) -> PixelPoint {
        PixelPoint::new(BASE.x + dx, BASE.y + dy)
    }

    #[test]
    fn drop_of_21_is_down() {
        assert!(PressDetector::default().is_down(at(0, 21), BASE));
    }

    #[test]
    fn drop_of_19_is_up() {
        assert!(!PressDetector::default().is_down(at(0, 19), BASE));
    }

    #[test]
    fn drop_of_exactly_20_is_up() {
        assert!(!PressDetector::default().is_down(at(0, 20), BASE));
    }

    #[test]
    fn sideways_drift_of_51_is_up() {
        let d = PressDetector::default();
        assert!(!d.is_down(at(51, 21), BASE));
        assert!(!d.is_down(at(-51, 21), BASE));
        assert!(!d.is_down(at(50, 21), BASE));
        assert!(d.is_down(at(-49, 21), BASE));
    }

    #[test]
    fn tip_above_base_is_up() {
        assert!(!PressDetector::default().is_down(at(0, -40), BASE));
    }

    #[test]
    fn reference_size_is_unscaled() {
        let d = PressDetector::default();
        assert_eq!(d.scaled_for(REFERENCE_SIZE, (640, 480)), d);
    }

    #[test]
    fn doubled_frame_doubles_thresholds() {
        let d = PressDetector::default().scaled_for(REFERENCE_SIZE, (1280, 960));
        assert_eq!(d.min_drop, 40.0);
        assert_eq!(d.max_drift, 100.0);
        assert!(!d.is_down(at(0, 39), BASE));
        assert!(d.is_down(at(99, 41), BASE));
    }

    #[test]
    fn extreme_pixels_do_not_overflow() {
        let d = PressDetector::default();
        let low  = PixelPoint::new(320, i32::MAX);
        let high = PixelPoint::new(320, i32::MIN);
        assert!(d.is_down(low, high));
        assert!(!d.is_down(high, low));
        assert!(!d.is_down(PixelPoint::new(i32::MAX, 300), PixelPoint::new(i32::MIN, 200)));
    }
}
