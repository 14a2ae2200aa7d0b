//! # finger_piano
//!
//! Play a five-note piano with the fingers of your right hand in front of a
//! camera; switch note sets with your left hand.  Hand landmarks come from an
//! external tracker process, notes go out over MIDI, and a small overlay
//! window shows what the session sees.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Hand | Action |
//! |---|---|---|
//! | Fingertip drops below its knuckle | Right | Play that finger's note (thumb..pinky) |
//! | Open palm (four fingers up) | Left | Switch to the alternate set `F4 G4 A4 B4 C5` |
//! | Closed fist (four fingers curled) | Left | Switch back to the original set `A4 B4 C5 D5 E5` |
//! | No hands in view | – | Every finger is released |
//!
//! A finger can re-trigger only after 0.1 s, and the note set can change at
//! most once per second.
//!
//! ## Sources
//!
//! * (default) **Simulation**: keys held in the overlay window drive
//!   synthetic hands.
//! * **Tracker**: a subprocess (`[tracker] command` in the config, or
//!   `--tracker <cmd>`) prints one JSON line of landmarks per frame.
//!
//! ### Simulation keyboard shortcuts
//!
//! | Key | Gesture |
//! |---|---|
//! | `1`–`5` (hold) | Press thumb..pinky |
//! | `O` (hold) | Left open palm |
//! | `F` (hold) | Left closed fist |
//! | `R` | Hide / show the right hand |
//! | `I` | Next MIDI instrument (any mode) |
//! | `Q` | Quit |

pub mod landmark;
pub mod synth;
pub mod gesture;
pub mod press;
pub mod note_bank;
pub mod session;
pub mod source;
pub mod tracker;
pub mod config;
pub mod overlay;
pub mod app;
