//! Synthetic hands, used by the keyboard simulator and by tests.
//!
//! A built hand starts "relaxed": every finger extended straight up, tip
//! above its knuckle, in a column of its own.

use crate::landmark::{Finger, Hand, Handedness, Landmark, LANDMARK_COUNT, index};

/// Normalised y of every knuckle on a fresh hand.
pub const KNUCKLE_Y:  f32 = 0.60;
/// Tip y of an extended finger.
pub const EXTENDED_Y: f32 = 0.45;
/// Tip y of a pressed finger (below the knuckle).
pub const PRESSED_Y:  f32 = 0.68;
/// Tip y of a finger curled into a fist.
pub const CURLED_Y:   f32 = 0.66;
/// Horizontal gap between finger columns.
pub const FINGER_SPACING: f32 = 0.07;

#[derive(Clone, Debug)]
pub struct HandBuilder {
    hand: Hand,
}

impl HandBuilder {
    /// A relaxed hand whose thumb column sits at normalised `x0`.
    pub fn new(handedness: Handedness, x0: f32) -> Self {
        let mut landmarks = [Landmark::new(x0, 0.85); LANDMARK_COUNT];
        landmarks[index::WRIST] = Landmark::new(x0 + 2.0 * FINGER_SPACING, 0.85);
        for finger in Finger::ALL {
            let x = x0 + finger.index() as f32 * FINGER_SPACING;
            landmarks[finger.base()] = Landmark::new(x, KNUCKLE_Y);
            // PIP/DIP joints (or thumb IP) sit between knuckle and tip
            for joint in finger.base() + 1..finger.tip() {
                landmarks[joint] = Landmark::new(x, (KNUCKLE_Y + EXTENDED_Y) / 2.0);
            }
            landmarks[finger.tip()] = Landmark::new(x, EXTENDED_Y);
        }
        HandBuilder { hand: Hand::new(handedness, landmarks) }
    }

    /// Move a fingertip down below its knuckle, straight beneath it.
    pub fn press(self, finger: Finger) -> Self {
        self.tip_y(finger, PRESSED_Y)
    }

    /// Curl the four non-thumb fingers below their knuckles.
    pub fn fist(mut self) -> Self {
        for finger in [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky] {
            self = self.tip_y(finger, CURLED_Y);
        }
        self
    }

    pub fn tip_y(mut self, finger: Finger, y: f32) -> Self {
        self.hand.landmarks[finger.tip()].y = y;
        self
    }

    pub fn tip_x(mut self, finger: Finger, x: f32) -> Self {
        self.hand.landmarks[finger.tip()].x = x;
        self
    }

    pub fn base_y(mut self, finger: Finger, y: f32) -> Self {
        self.hand.landmarks[finger.base()].y = y;
        self
    }

    pub fn build(self) -> Hand {
        self.hand
    }
}
