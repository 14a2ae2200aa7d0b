//! Whole-hand pose recognition for the note-set switch.
//!
//! Only the four non-thumb fingers vote.  A finger is "up" when its tip is
//! strictly above its knuckle (smaller y) and "down" when strictly below.
//! Exact ties count as neither, so a hand touching the boundary never
//! switches the note set.

use crate::landmark::{Finger, Hand};

/// Pose of one hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandPose {
    /// All four fingers extended → alternate note set.
    OpenPalm,
    /// All four fingers curled → original note set.
    ClosedFist,
    Neither,
}

impl HandPose {
    pub fn name(self) -> &'static str {
        match self {
            HandPose::OpenPalm   => "open palm",
            HandPose::ClosedFist => "fist",
            HandPose::Neither    => "-",
        }
    }
}

const POSE_FINGERS: [Finger; 4] = [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky];

pub fn is_open_palm(hand: &Hand) -> bool {
    POSE_FINGERS.iter().all(|&f| hand.landmark(f.tip()).y < hand.landmark(f.base()).y)
}

pub fn is_closed_fist(hand: &Hand) -> bool {
    POSE_FINGERS.iter().all(|&f| hand.landmark(f.tip()).y > hand.landmark(f.base()).y)
}

/// Classify one hand.  Pure; never fails.
pub fn classify(hand: &Hand) -> HandPose {
    if is_open_palm(hand) {
        HandPose::OpenPalm
    } else if is_closed_fist(hand) {
        HandPose::ClosedFist
    } else {
        HandPose::Neither
    }
}
