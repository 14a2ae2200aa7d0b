//! Hand-landmark data as delivered by the tracker, one [`Frame`] at a time.
//!
//! Landmarks are normalised to the frame (`x`, `y` in 0.0–1.0, `y` growing
//! downward).  Indices follow the MediaPipe 21-point hand model.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Landmarks per hand.
pub const LANDMARK_COUNT: usize = 21;

/// Largest |x| or |y| accepted from a tracker.  Points slightly off-frame
/// are normal; anything beyond this is garbage.
pub const MAX_COORD: f32 = 2.0;

/// Landmark indices (MediaPipe hand model convention).
#[allow(dead_code)]
pub mod index {
    pub const WRIST:             usize = 0;
    pub const THUMB_CMC:         usize = 1;
    pub const THUMB_MCP:         usize = 2;
    pub const THUMB_IP:          usize = 3;
    pub const THUMB_TIP:         usize = 4;
    pub const INDEX_FINGER_MCP:  usize = 5;
    pub const INDEX_FINGER_PIP:  usize = 6;
    pub const INDEX_FINGER_DIP:  usize = 7;
    pub const INDEX_FINGER_TIP:  usize = 8;
    pub const MIDDLE_FINGER_MCP: usize = 9;
    pub const MIDDLE_FINGER_PIP: usize = 10;
    pub const MIDDLE_FINGER_DIP: usize = 11;
    pub const MIDDLE_FINGER_TIP: usize = 12;
    pub const RING_FINGER_MCP:   usize = 13;
    pub const RING_FINGER_PIP:   usize = 14;
    pub const RING_FINGER_DIP:   usize = 15;
    pub const RING_FINGER_TIP:   usize = 16;
    pub const PINKY_MCP:         usize = 17;
    pub const PINKY_PIP:         usize = 18;
    pub const PINKY_DIP:         usize = 19;
    pub const PINKY_TIP:         usize = 20;
}

// ════════════════════════════════════════════════════════════════════════════
// Landmark / PixelPoint
// ════════════════════════════════════════════════════════════════════════════

/// One normalised keypoint.  `z` is carried but unused.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Landmark { x, y, z: 0.0 }
    }

    /// Finite and within [`MAX_COORD`] of the frame on both axes.
    pub fn is_plausible(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
            && self.x.abs() <= MAX_COORD && self.y.abs() <= MAX_COORD
    }

    /// Scale to pixel coordinates, truncating toward zero.
    pub fn to_pixel(self, width: u32, height: u32) -> PixelPoint {
        PixelPoint {
            x: (self.x * width as f32) as i32,
            y: (self.y * height as f32) as i32,
        }
    }
}

/// Integer pixel position in frame space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub fn new(x: i32, y: i32) -> Self { PixelPoint { x, y } }
}

// ════════════════════════════════════════════════════════════════════════════
// Handedness / Hand
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

impl FromStr for Handedness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left"  => Ok(Handedness::Left),
            "right" => Ok(Handedness::Right),
            other   => Err(format!("unknown handedness \"{}\"", other)),
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handedness::Left  => write!(f, "Left"),
            Handedness::Right => write!(f, "Right"),
        }
    }
}

/// One tracked hand for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Hand {
    pub handedness: Handedness,
    pub landmarks:  [Landmark; LANDMARK_COUNT],
}

impl Hand {
    pub fn new(handedness: Handedness, landmarks: [Landmark; LANDMARK_COUNT]) -> Self {
        Hand { handedness, landmarks }
    }

    pub fn landmark(&self, idx: usize) -> Landmark {
        self.landmarks[idx]
    }

    /// Tip and base of `finger` in pixel space.
    pub fn finger_pixels(&self, finger: Finger, width: u32, height: u32) -> (PixelPoint, PixelPoint) {
        (
            self.landmarks[finger.tip()].to_pixel(width, height),
            self.landmarks[finger.base()].to_pixel(width, height),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Finger
// ════════════════════════════════════════════════════════════════════════════

/// Fingers in note order, thumb = 0 .. pinky = 4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb, Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky,
    ];

    /// Position in the note set.
    pub fn index(self) -> usize { self as usize }

    pub fn tip(self) -> usize {
        match self {
            Finger::Thumb  => index::THUMB_TIP,
            Finger::Index  => index::INDEX_FINGER_TIP,
            Finger::Middle => index::MIDDLE_FINGER_TIP,
            Finger::Ring   => index::RING_FINGER_TIP,
            Finger::Pinky  => index::PINKY_TIP,
        }
    }

    /// The MCP (knuckle) landmark.
    pub fn base(self) -> usize {
        match self {
            Finger::Thumb  => index::THUMB_MCP,
            Finger::Index  => index::INDEX_FINGER_MCP,
            Finger::Middle => index::MIDDLE_FINGER_MCP,
            Finger::Ring   => index::RING_FINGER_MCP,
            Finger::Pinky  => index::PINKY_MCP,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Finger::Thumb  => "thumb",
            Finger::Index  => "index",
            Finger::Middle => "middle",
            Finger::Ring   => "ring",
            Finger::Pinky  => "pinky",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Frame
// ════════════════════════════════════════════════════════════════════════════

/// Everything the tracker reported for one captured image.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub width:  u32,
    pub height: u32,
    pub hands:  Vec<Hand>,
}

impl Frame {
    /// A frame in which nothing was detected.
    pub fn empty(width: u32, height: u32) -> Self {
        Frame { width, height, hands: Vec::new() }
    }

    pub fn hands_with(&self, handedness: Handedness) -> impl Iterator<Item = &Hand> {
        self.hands.iter().filter(move |h| h.handedness == handedness)
    }
}
