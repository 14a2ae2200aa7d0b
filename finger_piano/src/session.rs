//! Per-frame session state machine.
//!
//! `SessionState` owns the active note set, its [`NoteBank`], the five
//! finger states and the gesture-switch cooldown.  [`SessionState::update`]
//! is called once per frame with a single clock reading, so every cooldown
//! comparison inside a frame sees the same `now`.
//!
//! ## Per-finger state machine
//!
//! ```text
//!          down && cooldown elapsed / play(i)
//!   ┌────┐ ───────────────────────────────────▶ ┌──────┐
//!   │ Up │                                      │ Down │
//!   └────┘ ◀─────────────────────────────────── └──────┘
//!                      !down (always)
//! ```
//!
//! The press cooldown is measured from the last *trigger*, not from the
//! last release.

use std::time::Duration;

use piano_notes::{NoteSet, NoteSetId, NOTES_PER_SET};

use crate::gesture::{self, HandPose};
use crate::landmark::{Finger, Frame, Handedness, PixelPoint};
use crate::note_bank::{BankLoader, NoteBank};
use crate::press::{PressDetector, REFERENCE_SIZE};

// ════════════════════════════════════════════════════════════════════════════
// SessionConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    /// Minimum time between two triggers of the same finger.
    pub press_cooldown:   Duration,
    /// Minimum time between two note-set switches.
    pub gesture_cooldown: Duration,
    /// Thresholds at `reference_size`.
    pub detector:         PressDetector,
    /// Frame size the thresholds were tuned at; `None` disables scaling.
    pub reference_size:   Option<(u32, u32)>,
    pub original:         NoteSet,
    pub alternate:        NoteSet,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            press_cooldown:   Duration::from_millis(100),
            gesture_cooldown: Duration::from_secs(1),
            detector:         PressDetector::default(),
            reference_size:   Some(REFERENCE_SIZE),
            original:         NoteSet::for_id(NoteSetId::Original),
            alternate:        NoteSet::for_id(NoteSetId::Alternate),
        }
    }
}

impl SessionConfig {
    pub fn note_set(&self, id: NoteSetId) -> &NoteSet {
        match id {
            NoteSetId::Original  => &self.original,
            NoteSetId::Alternate => &self.alternate,
        }
    }

    fn detector_for(&self, frame: &Frame) -> PressDetector {
        match self.reference_size {
            Some(reference) => self.detector.scaled_for(reference, (frame.width, frame.height)),
            None            => self.detector,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FingerState
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FingerState {
    pub pressed: bool,
    /// Time of the last trigger; `None` until the first one.
    pub last_press_time: Option<Duration>,
}

/// True if `cooldown` has strictly elapsed since `last` (or there was none).
fn cooled_down(now: Duration, last: Option<Duration>, cooldown: Duration) -> bool {
    last.map_or(true, |t| now.saturating_sub(t) > cooldown)
}

// ════════════════════════════════════════════════════════════════════════════
// FrameReport: what the overlay needs after an update
// ════════════════════════════════════════════════════════════════════════════

/// Overlay data for one Right-hand finger.
#[derive(Clone, Debug, PartialEq)]
pub struct FingerMarker {
    pub finger:  Finger,
    pub tip:     PixelPoint,
    pub base:    PixelPoint,
    pub pressed: bool,
    pub label:   String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub pressed:   [bool; NOTES_PER_SET],
    pub active:    NoteSetId,
    pub labels:    [String; NOTES_PER_SET],
    /// Fingers whose note was played this frame, in order.
    pub triggered: Vec<Finger>,
    /// Set selected this frame, if a switch happened.
    pub switched:  Option<NoteSetId>,
    /// Pose of the last Left hand classified this frame.
    pub left_pose: Option<HandPose>,
    pub markers:   Vec<FingerMarker>,
}

impl FrameReport {
    pub fn banner(&self) -> String {
        self.labels.join(" ")
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SessionState
// ════════════════════════════════════════════════════════════════════════════

pub struct SessionState<L: BankLoader> {
    config:  SessionConfig,
    loader:  L,
    bank:    L::Bank,
    active:  NoteSetId,
    fingers: [FingerState; NOTES_PER_SET],
    last_gesture_switch: Option<Duration>,
}

impl<L: BankLoader> SessionState<L> {
    /// Start on the original note set, all fingers up.
    pub fn new(config: SessionConfig, mut loader: L) -> Self {
        let bank = loader.load(&config.original);
        SessionState {
            config,
            loader,
            bank,
            active:  NoteSetId::Original,
            fingers: [FingerState::default(); NOTES_PER_SET],
            last_gesture_switch: None,
        }
    }

    pub fn active(&self) -> NoteSetId { self.active }

    pub fn note_set(&self) -> &NoteSet { self.config.note_set(self.active) }

    pub fn fingers(&self) -> &[FingerState; NOTES_PER_SET] { &self.fingers }

    pub fn pressed(&self) -> [bool; NOTES_PER_SET] {
        self.fingers.map(|f| f.pressed)
    }

    pub fn last_gesture_switch(&self) -> Option<Duration> { self.last_gesture_switch }

    pub fn loader(&self) -> &L { &self.loader }

    /// Process one frame captured at `now`.
    pub fn update(&mut self, now: Duration, frame: &Frame) -> FrameReport {
        let mut triggered = Vec::new();
        let mut switched  = None;
        let mut left_pose = None;
        let mut markers   = Vec::new();

        if frame.hands.is_empty() {
            for f in &mut self.fingers {
                f.pressed = false;
            }
            return self.report(triggered, switched, left_pose, markers);
        }

        // ── Left hand: note-set switch ───────────────────────────────────
        for hand in frame.hands_with(Handedness::Left) {
            if !cooled_down(now, self.last_gesture_switch, self.config.gesture_cooldown) {
                continue;
            }
            let pose = gesture::classify(hand);
            left_pose = Some(pose);
            let target = match pose {
                HandPose::OpenPalm   => NoteSetId::Alternate,
                HandPose::ClosedFist => NoteSetId::Original,
                HandPose::Neither    => continue,
            };
            self.switch_to(target, now);
            switched = Some(target);
        }

        // ── Right hand: finger presses ───────────────────────────────────
        let detector = self.config.detector_for(frame);
        let labels   = self.note_set().labels();
        for hand in frame.hands_with(Handedness::Right) {
            for finger in Finger::ALL {
                let i = finger.index();
                let (tip, base) = hand.finger_pixels(finger, frame.width, frame.height);
                let down  = detector.is_down(tip, base);
                let state = &mut self.fingers[i];

                if down && !state.pressed
                    && cooled_down(now, state.last_press_time, self.config.press_cooldown)
                {
                    self.bank.play(i);
                    state.pressed = true;
                    state.last_press_time = Some(now);
                    triggered.push(finger);
                    log::debug!(target: "session", "{} → {}", finger.name(), labels[i]);
                } else if !down {
                    state.pressed = false;
                }

                markers.push(FingerMarker {
                    finger,
                    tip,
                    base,
                    pressed: state.pressed,
                    label:   labels[i].clone(),
                });
            }
        }

        self.report(triggered, switched, left_pose, markers)
    }

    /// Make `target` active with a freshly loaded bank.  The switch time is
    /// recorded even when `target` was already active.
    fn switch_to(&mut self, target: NoteSetId, now: Duration) {
        self.active = target;
        self.bank = self.loader.load(self.config.note_set(target));
        self.last_gesture_switch = Some(now);
        log::info!(
            target: "session",
            "note set → {} ({})", target.name(), self.note_set().banner(),
        );
    }

    fn report(
        &self,
        triggered: Vec<Finger>,
        switched:  Option<NoteSetId>,
        left_pose: Option<HandPose>,
        markers:   Vec<FingerMarker>,
    ) -> FrameReport {
        FrameReport {
            pressed: self.pressed(),
            active:  self.active,
            labels:  self.note_set().labels(),
            triggered,
            switched,
            left_pose,
            markers,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::Hand;
    use crate::synth::HandBuilder;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records (set banner, finger) for every play.
    #[derive(Default)]
    struct Recorder {
        plays: Rc<RefCell<Vec<(String, usize)>>>,
        loads: usize,
    }

    struct RecBank {
        banner: String,
        plays:  Rc<RefCell<Vec<(String, usize)>>>,
    }

    impl NoteBank for RecBank {
        fn play(&mut self, index: usize) {
            self.plays.borrow_mut().push((self.banner.clone(), index));
        }
    }

    impl BankLoader for Recorder {
        type Bank = RecBank;
        fn load(&mut self, notes: &NoteSet) -> RecBank {
            self.loads += 1;
            RecBank { banner: notes.banner(), plays: Rc::clone(&self.plays) }
        }
    }

    fn session() -> SessionState<Recorder> {
        SessionState::new(SessionConfig::default(), Recorder::default())
    }

    fn ms(n: u64) -> Duration { Duration::from_millis(n) }

    fn frame(hands: Vec<Hand>) -> Frame {
        Frame { width: 640, height: 480, hands }
    }

    fn right() -> HandBuilder { HandBuilder::new(Handedness::Right, 0.5) }
    fn left()  -> HandBuilder { HandBuilder::new(Handedness::Left,  0.1) }

    fn plays(s: &SessionState<Recorder>) -> Vec<(String, usize)> {
        s.loader().plays.borrow().clone()
    }

    #[test]
    fn starts_on_original_with_fingers_up() {
        let s = session();
        assert_eq!(s.active(), NoteSetId::Original);
        assert_eq!(s.pressed(), [false; 5]);
        assert_eq!(s.loader().loads, 1);
    }

    #[test]
    fn first_press_plays_once() {
        let mut s = session();
        let r = s.update(ms(0), &frame(vec![right().press(Finger::Thumb).build()]));
        assert_eq!(r.triggered, vec![Finger::Thumb]);
        assert_eq!(plays(&s), vec![("A4 B4 C5 D5 E5".to_string(), 0)]);
        assert_eq!(s.pressed(), [true, false, false, false, false]);
        assert_eq!(s.fingers()[0].last_press_time, Some(ms(0)));
    }

    #[test]
    fn hold_does_not_retrigger() {
        let mut s = session();
        let held = frame(vec![right().press(Finger::Index).build()]);
        s.update(ms(0), &held);
        s.update(ms(50), &held);
        s.update(ms(500), &held);
        assert_eq!(plays(&s).len(), 1);
        assert!(s.pressed()[1]);
    }

    #[test]
    fn cooldown_counts_from_last_trigger_not_release() {
        let mut s = session();
        let down = frame(vec![right().press(Finger::Middle).build()]);
        let up   = frame(vec![right().build()]);

        s.update(ms(0), &down);
        s.update(ms(20), &up);
        assert!(!s.pressed()[2]);

        // 50ms after the trigger: still cooling down, and stays Up
        let r = s.update(ms(50), &down);
        assert!(r.triggered.is_empty());
        assert!(!s.pressed()[2]);

        // 150ms after the trigger: fires again
        let r = s.update(ms(150), &down);
        assert_eq!(r.triggered, vec![Finger::Middle]);
        assert_eq!(plays(&s).len(), 2);
        assert_eq!(s.fingers()[2].last_press_time, Some(ms(150)));
    }

    #[test]
    fn cooldown_is_strict() {
        let mut s = session();
        let down = frame(vec![right().press(Finger::Ring).build()]);
        let up   = frame(vec![right().build()]);
        s.update(ms(0), &down);
        s.update(ms(10), &up);
        s.update(ms(100), &down); // exactly 100ms: not > cooldown
        assert_eq!(plays(&s).len(), 1);
        s.update(ms(101), &down);
        assert_eq!(plays(&s).len(), 2);
    }

    #[test]
    fn release_is_immediate() {
        let mut s = session();
        s.update(ms(0), &frame(vec![right().press(Finger::Pinky).build()]));
        s.update(ms(1), &frame(vec![right().build()]));
        assert!(!s.pressed()[4]);
    }

    #[test]
    fn no_hands_resets_every_finger() {
        let mut s = session();
        let all = Finger::ALL.iter().fold(right(), |b, &f| b.press(f)).build();
        s.update(ms(0), &frame(vec![all]));
        assert_eq!(s.pressed(), [true; 5]);

        let r = s.update(ms(10), &frame(vec![]));
        assert_eq!(r.pressed, [false; 5]);
        assert!(r.markers.is_empty());
        assert_eq!(plays(&s).len(), 5);
    }

    #[test]
    fn left_hand_alone_keeps_right_hand_state() {
        let mut s = session();
        s.update(ms(0), &frame(vec![right().press(Finger::Thumb).build()]));
        s.update(ms(10), &frame(vec![left().press(Finger::Index).press(Finger::Ring).build()]));
        assert!(s.pressed()[0]);
    }

    #[test]
    fn open_palm_switches_then_cools_down() {
        let mut s = session();
        let palm = frame(vec![left().build()]);

        let r = s.update(ms(0), &palm);
        assert_eq!(r.switched, Some(NoteSetId::Alternate));
        assert_eq!(r.labels, ["F4", "G4", "A4", "B4", "C5"]);
        assert_eq!(s.loader().loads, 2);

        let r = s.update(ms(500), &palm);
        assert_eq!(r.switched, None);
        assert_eq!(r.left_pose, None);
        assert_eq!(s.last_gesture_switch(), Some(ms(0)));

        let r = s.update(ms(1100), &palm);
        assert_eq!(r.switched, Some(NoteSetId::Alternate));
        assert_eq!(s.last_gesture_switch(), Some(ms(1100)));
        assert_eq!(s.loader().loads, 3);
    }

    #[test]
    fn fist_restores_original() {
        let mut s = session();
        s.update(ms(0), &frame(vec![left().build()]));
        assert_eq!(s.active(), NoteSetId::Alternate);
        // Within cooldown: ignored
        s.update(ms(900), &frame(vec![left().fist().build()]));
        assert_eq!(s.active(), NoteSetId::Alternate);
        let r = s.update(ms(1200), &frame(vec![left().fist().build()]));
        assert_eq!(r.switched, Some(NoteSetId::Original));
        assert_eq!(r.left_pose, Some(HandPose::ClosedFist));
        assert_eq!(s.active(), NoteSetId::Original);
    }

    #[test]
    fn neither_pose_leaves_cooldown_alone() {
        let mut s = session();
        let r = s.update(ms(0), &frame(vec![left().press(Finger::Index).press(Finger::Middle).build()]));
        assert_eq!(r.left_pose, Some(HandPose::Neither));
        assert_eq!(r.switched, None);
        assert_eq!(s.last_gesture_switch(), None);
        // An open palm right after still switches
        let r = s.update(ms(10), &frame(vec![left().build()]));
        assert_eq!(r.switched, Some(NoteSetId::Alternate));
    }

    #[test]
    fn two_left_hands_switch_once_per_window() {
        let mut s = session();
        let r = s.update(ms(0), &frame(vec![left().build(), left().fist().build()]));
        assert_eq!(r.switched, Some(NoteSetId::Alternate));
        assert_eq!(s.active(), NoteSetId::Alternate);
        assert_eq!(s.loader().loads, 2);
    }

    #[test]
    fn switch_applies_to_presses_in_same_frame() {
        let mut s = session();
        s.update(ms(0), &frame(vec![left().build(), right().press(Finger::Thumb).build()]));
        assert_eq!(plays(&s), vec![("F4 G4 A4 B4 C5".to_string(), 0)]);
    }

    #[test]
    fn markers_carry_labels_and_state() {
        let mut s = session();
        let r = s.update(ms(0), &frame(vec![right().press(Finger::Ring).build()]));
        assert_eq!(r.markers.len(), 5);
        let ring = &r.markers[3];
        assert_eq!(ring.finger, Finger::Ring);
        assert!(ring.pressed);
        assert_eq!(ring.label, "D5");
        assert!(!r.markers[0].pressed);
        assert_eq!(r.banner(), "A4 B4 C5 D5 E5");
    }

    #[test]
    fn sideways_tip_is_not_a_press() {
        let mut s = session();
        // 0.1 * 640 = 64px of drift
        let hand = right().press(Finger::Index).tip_x(Finger::Index, 0.57 + 0.1).build();
        let r = s.update(ms(0), &frame(vec![hand]));
        assert!(r.triggered.is_empty());
    }

    #[test]
    fn thresholds_scale_with_frame_size() {
        // 15px drop at 320×240 is 30px at the reference size
        let mut s = session();
        let hand = right().tip_y(Finger::Thumb, 0.6 + 15.5 / 240.0).build();
        let r = s.update(ms(0), &Frame { width: 320, height: 240, hands: vec![hand.clone()] });
        assert_eq!(r.triggered, vec![Finger::Thumb]);

        let mut fixed = SessionState::new(
            SessionConfig { reference_size: None, ..SessionConfig::default() },
            Recorder::default(),
        );
        let r = fixed.update(ms(0), &Frame { width: 320, height: 240, hands: vec![hand] });
        assert!(r.triggered.is_empty());
    }
}
