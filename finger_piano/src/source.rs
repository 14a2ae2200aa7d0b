//! Where frames come from: a real tracker subprocess or the keyboard
//! simulator.
//!
//! The application loop only sees [`LandmarkSource`]; it doesn't care
//! whether landmarks came from a camera or from held keys.

use std::sync::mpsc::{Receiver, TryRecvError};

use crate::landmark::{Finger, Frame, Handedness};
use crate::synth::HandBuilder;

/// Anything that can deliver one [`Frame`] per call.
///
/// `Ok(None)` means the stream has ended and the loop should stop.
pub trait LandmarkSource {
    fn next_frame(&mut self) -> anyhow::Result<Option<Frame>>;
}

// ════════════════════════════════════════════════════════════════════════════
// SimHandSource: keyboard simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input event from the overlay window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimInput {
    KeyDown(SimKey),
    KeyUp(SimKey),
}

/// Simulated key codes (mapped from minifb keys by the overlay).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKey {
    Finger(Finger),    // 1–5
    OpenPalm,          // O
    Fist,              // F
    ToggleRightHand,   // R
}

/// Synthesises hands from the keys currently held.
///
/// * `1`–`5` hold thumb..pinky down on the Right hand.
/// * `O` / `F` show a Left hand as an open palm / closed fist while held.
/// * `R` hides or shows the Right hand (hiding both hands exercises the
///   no-hand reset).
pub struct SimHandSource {
    rx:          Receiver<SimInput>,
    width:       u32,
    height:      u32,
    held:        [bool; 5],
    open_palm:   bool,
    fist:        bool,
    right_shown: bool,
}

impl SimHandSource {
    pub fn new(rx: Receiver<SimInput>, width: u32, height: u32) -> Self {
        SimHandSource {
            rx,
            width,
            height,
            held:        [false; 5],
            open_palm:   false,
            fist:        false,
            right_shown: true,
        }
    }

    fn apply(&mut self, input: SimInput) {
        match input {
            SimInput::KeyDown(SimKey::Finger(f)) => self.held[f.index()] = true,
            SimInput::KeyUp(SimKey::Finger(f))   => self.held[f.index()] = false,
            SimInput::KeyDown(SimKey::OpenPalm)  => self.open_palm = true,
            SimInput::KeyUp(SimKey::OpenPalm)    => self.open_palm = false,
            SimInput::KeyDown(SimKey::Fist)      => self.fist = true,
            SimInput::KeyUp(SimKey::Fist)        => self.fist = false,
            SimInput::KeyDown(SimKey::ToggleRightHand) => self.right_shown = !self.right_shown,
            SimInput::KeyUp(SimKey::ToggleRightHand)   => {}
        }
    }

    /// Build the frame for the current key state.
    fn synth_frame(&self) -> Frame {
        let mut frame = Frame::empty(self.width, self.height);

        if self.open_palm || self.fist {
            let mut left = HandBuilder::new(Handedness::Left, 0.12);
            // Fist wins if both are held; it restores the default set
            if self.fist {
                left = left.fist();
            }
            frame.hands.push(left.build());
        }

        if self.right_shown {
            let right = Finger::ALL.iter()
                .filter(|f| self.held[f.index()])
                .fold(HandBuilder::new(Handedness::Right, 0.55), |b, &f| b.press(f));
            frame.hands.push(right.build());
        }

        frame
    }
}

impl LandmarkSource for SimHandSource {
    fn next_frame(&mut self) -> anyhow::Result<Option<Frame>> {
        loop {
            match self.rx.try_recv() {
                Ok(input)                       => self.apply(input),
                Err(TryRecvError::Empty)        => break,
                Err(TryRecvError::Disconnected) => return Ok(None),
            }
        }
        Ok(Some(self.synth_frame()))
    }
}
