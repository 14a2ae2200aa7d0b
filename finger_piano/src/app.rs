//! The frame loop.
//!
//! One iteration: read a frame → update the session with a single clock
//! reading → draw the overlay → poll for quit.  Everything runs on the
//! calling thread; only the MIDI player has a thread of its own.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::config::AppConfig;
use crate::note_bank::{BankLoader, Player};
use crate::overlay::Overlay;
use crate::session::{FrameReport, SessionState};
use crate::source::{LandmarkSource, SimHandSource};
use crate::tracker::SubprocessTracker;
use piano_notes::GeneralMidi;

/// Where landmarks come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceMode {
    /// Keyboard-driven synthetic hands.
    Simulation,
    /// The configured tracker subprocess.
    Tracker,
}

/// Run frames from `source` through `session` until the stream ends or
/// `present` returns false.  Returns the number of frames processed.
///
/// A failing source ends the loop like a closed stream does; the error is
/// logged, not returned.
pub fn drive<L: BankLoader>(
    source:      &mut dyn LandmarkSource,
    session:     &mut SessionState<L>,
    mut clock:   impl FnMut() -> Duration,
    mut present: impl FnMut(&FrameReport, (u32, u32)) -> bool,
) -> usize {
    let mut frames = 0;
    loop {
        let frame = match source.next_frame() {
            Ok(Some(f)) => f,
            Ok(None) => {
                log::info!("landmark stream ended after {} frames", frames);
                break;
            }
            Err(e) => {
                log::error!("landmark stream failed: {:#}", e);
                break;
            }
        };
        frames += 1;

        let report = session.update(clock(), &frame);
        if !present(&report, (frame.width, frame.height)) {
            log::info!("quit requested");
            break;
        }
    }
    frames
}

/// The instrument after `program`; programs outside the table restart it.
pub fn next_program(program: u8) -> u8 {
    GeneralMidi::from_program(program)
        .map_or(GeneralMidi::AcousticGrandPiano, GeneralMidi::next)
        .program()
}

/// Run the full application.
///
/// This is the entry point called from `main.rs`.  It builds the landmark
/// source, the overlay window and the MIDI player, then drives the frame
/// loop until quit or end of stream.
pub fn run(cfg: AppConfig, mode: SourceMode) -> anyhow::Result<()> {
    let (w, h) = (cfg.tracker.width, cfg.tracker.height);

    let mut sim_tx = None;
    let mut source: Box<dyn LandmarkSource> = match mode {
        SourceMode::Simulation => {
            let (tx, rx) = mpsc::channel();
            sim_tx = Some(tx);
            Box::new(SimHandSource::new(rx, w, h))
        }
        SourceMode::Tracker => Box::new(SubprocessTracker::spawn(&cfg.tracker)?),
    };

    let mut overlay = Overlay::new(w as usize, h as usize, sim_tx)?;
    let player = Player::spawn(cfg.midi.clone());
    let instruments = player.clone();
    let mut program = cfg.midi.program;
    let mut session = SessionState::new(cfg.session, player);
    log::info!("note set: {}", session.note_set().banner());

    let start = Instant::now();
    drive(
        source.as_mut(),
        &mut session,
        || start.elapsed(),
        |report, size| {
            overlay.render(report, size);
            if overlay.instrument_requested() {
                program = next_program(program);
                instruments.set_program(program);
            }
            overlay.poll_input()
        },
    );

    session.loader().all_off();
    session.loader().quit();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::Frame;
    use crate::note_bank::NoteBank;
    use crate::session::SessionConfig;
    use piano_notes::NoteSet;

    struct Silent;
    impl NoteBank for Silent { fn play(&mut self, _i: usize) {} }
    impl BankLoader for Silent {
        type Bank = Silent;
        fn load(&mut self, _n: &NoteSet) -> Silent { Silent }
    }

    struct Scripted(Vec<anyhow::Result<Option<Frame>>>);
    impl LandmarkSource for Scripted {
        fn next_frame(&mut self) -> anyhow::Result<Option<Frame>> {
            if self.0.is_empty() { Ok(None) } else { self.0.remove(0) }
        }
    }

    fn empty() -> anyhow::Result<Option<Frame>> { Ok(Some(Frame::empty(640, 480))) }

    #[test]
    fn stops_at_end_of_stream() {
        let mut src = Scripted(vec![empty(), empty(), empty()]);
        let mut s = SessionState::new(SessionConfig::default(), Silent);
        let n = drive(&mut src, &mut s, || Duration::ZERO, |_, _| true);
        assert_eq!(n, 3);
    }

    #[test]
    fn stops_on_read_error() {
        let mut src = Scripted(vec![empty(), Err(anyhow::anyhow!("camera unplugged")), empty()]);
        let mut s = SessionState::new(SessionConfig::default(), Silent);
        assert_eq!(drive(&mut src, &mut s, || Duration::ZERO, |_, _| true), 1);
    }

    #[test]
    fn stops_when_present_declines() {
        let mut src = Scripted(vec![empty(), empty(), empty()]);
        let mut s = SessionState::new(SessionConfig::default(), Silent);
        let mut seen = 0;
        let n = drive(&mut src, &mut s, || Duration::ZERO, |_, size| {
            assert_eq!(size, (640, 480));
            seen += 1;
            seen < 2
        });
        assert_eq!(n, 2);
    }

    #[test]
    fn instrument_key_walks_the_program_table() {
        assert_eq!(next_program(0), 1);
        assert_eq!(next_program(GeneralMidi::SteelDrums.program()), 0);
        // 40 (violin) is not in the table
        assert_eq!(next_program(40), 0);
    }

    #[test]
    fn clock_is_read_once_per_frame() {
        let mut src = Scripted(vec![empty(), empty()]);
        let mut s = SessionState::new(SessionConfig::default(), Silent);
        let mut reads = 0;
        drive(&mut src, &mut s, || { reads += 1; Duration::from_millis(reads * 33) }, |_, _| true);
        assert_eq!(reads, 2);
    }
}
