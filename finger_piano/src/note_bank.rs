//! Sounding the notes: the [`NoteBank`] seam plus its MIDI implementation.
//!
//! A bank is built for one [`NoteSet`] and never changes; switching sets
//! means loading a fresh bank from a [`BankLoader`] and dropping the old one.
//!
//! The MIDI implementation keeps the port on a dedicated output thread
//! ([`Player`]) so that note-offs can be scheduled without blocking the frame
//! loop.  Each bank is a thin handle that sends `NoteOn` commands to it.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use piano_notes::{GeneralMidi, NoteSet, NOTES_PER_SET};

// ════════════════════════════════════════════════════════════════════════════
// NoteBank / BankLoader: the collaborator seam used by the session
// ════════════════════════════════════════════════════════════════════════════

/// Plays the sample for finger `index` (0 = thumb .. 4 = pinky).
pub trait NoteBank {
    fn play(&mut self, index: usize);
}

/// Builds a [`NoteBank`] for a note set.
pub trait BankLoader {
    type Bank: NoteBank;
    fn load(&mut self, notes: &NoteSet) -> Self::Bank;
}

// ════════════════════════════════════════════════════════════════════════════
// PlayerCommand: sent to the output thread
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerCommand {
    /// Strike `pitch`; it is released after the configured hold time.
    NoteOn { pitch: u8 },
    /// Release everything that is sounding.
    AllOff,
    /// Change instrument (MIDI program 0–127).
    SetProgram(u8),
    /// Release everything and terminate the thread.
    Quit,
}

/// Output settings for the MIDI player.
#[derive(Clone, Debug, PartialEq)]
pub struct MidiSettings {
    pub program:   u8,
    pub channel:   u8,
    pub velocity:  u8,
    /// How long a struck note sounds before its note-off.
    pub hold:      Duration,
    /// Preferred port: first port whose name contains this (case-insensitive).
    pub port_hint: String,
}

impl Default for MidiSettings {
    fn default() -> Self {
        MidiSettings {
            program:   GeneralMidi::AcousticGrandPiano.program(),
            channel:   0,
            velocity:  100,
            hold:      Duration::from_millis(400),
            port_hint: String::new(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MidiOut: abstraction over midir / null
// ════════════════════════════════════════════════════════════════════════════

trait MidiOut: Send {
    fn program_change(&mut self, channel: u8, program: u8);
    fn note_on(&mut self,  channel: u8, note: u8, velocity: u8);
    fn note_off(&mut self, channel: u8, note: u8);
}

struct MidirOut {
    conn: midir::MidiOutputConnection,
}

impl MidiOut for MidirOut {
    fn program_change(&mut self, channel: u8, program: u8) {
        if let Err(e) = self.conn.send(&[0xC0 | (channel & 0x0F), program & 0x7F]) {
            log::warn!(target: "player", "program change failed: {}", e);
        }
    }
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        if let Err(e) = self.conn.send(&[0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]) {
            log::warn!(target: "player", "note on failed: {}", e);
        }
    }
    fn note_off(&mut self, channel: u8, note: u8) {
        if let Err(e) = self.conn.send(&[0x80 | (channel & 0x0F), note & 0x7F, 0]) {
            log::warn!(target: "player", "note off failed: {}", e);
        }
    }
}

/// Used when no MIDI port is available; notes still flow through the
/// session and overlay, they are just silent.
struct NullOut;

impl MidiOut for NullOut {
    fn program_change(&mut self, _ch: u8, _p: u8)   {}
    fn note_on(&mut self, _ch: u8, _n: u8, _v: u8)  {}
    fn note_off(&mut self, _ch: u8, _n: u8)          {}
}

/// Open the preferred MIDI output port, or the first one.
/// Falls back to `NullOut` with a warning if none can be opened.
fn open_midi_output(port_hint: &str) -> Box<dyn MidiOut> {
    let midi_out = match midir::MidiOutput::new("finger_piano") {
        Ok(m)  => m,
        Err(e) => {
            log::warn!(target: "player", "MIDI init error: {}; notes will be silent", e);
            return Box::new(NullOut);
        }
    };

    let ports = midi_out.ports();
    if ports.is_empty() {
        log::warn!(target: "player", "no MIDI output ports found; notes will be silent");
        log::warn!(target: "player", "start a synthesiser, e.g. `fluidsynth` or `timidity -iA` on Linux");
        return Box::new(NullOut);
    }

    let names: Vec<String> = ports.iter()
        .map(|p| midi_out.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
        .collect();
    let port_idx = pick_port(&names, port_hint);
    log::info!(target: "player", "opening MIDI port: {}", names[port_idx]);

    match midi_out.connect(&ports[port_idx], "finger-piano-out") {
        Ok(conn) => Box::new(MidirOut { conn }),
        Err(e) => {
            log::warn!(target: "player", "failed to connect: {}; notes will be silent", e);
            Box::new(NullOut)
        }
    }
}

/// Index of the port to open: the first name containing `hint`, else the
/// first that looks like a software synth, else 0.  `names` is non-empty.
fn pick_port(names: &[String], hint: &str) -> usize {
    let hint = hint.trim().to_lowercase();
    if !hint.is_empty() {
        if let Some(i) = names.iter().position(|n| n.to_lowercase().contains(&hint)) {
            return i;
        }
        log::warn!(target: "player", "no MIDI port matches \"{}\"", hint);
    }
    names.iter()
        .position(|n| {
            let n = n.to_lowercase();
            n.contains("fluid") || n.contains("timidity") ||
            n.contains("microsoft") || n.contains("gm") ||
            n.contains("synth")
        })
        .unwrap_or(0)
}

// ════════════════════════════════════════════════════════════════════════════
// Voices: which pitches are sounding and when they end
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct Voices {
    sounding: Vec<(u8, Instant)>,
}

impl Voices {
    /// Record a strike of `pitch` ending at `until`.  Returns true if the
    /// pitch was already sounding (caller must release it before re-striking).
    fn strike(&mut self, pitch: u8, until: Instant) -> bool {
        if let Some(v) = self.sounding.iter_mut().find(|(p, _)| *p == pitch) {
            v.1 = until;
            true
        } else {
            self.sounding.push((pitch, until));
            false
        }
    }

    /// Remove and return every pitch whose hold has ended by `now`.
    fn due(&mut self, now: Instant) -> Vec<u8> {
        let mut out = Vec::new();
        self.sounding.retain(|&(p, until)| {
            if until <= now { out.push(p); false } else { true }
        });
        out
    }

    fn drain(&mut self) -> Vec<u8> {
        self.sounding.drain(..).map(|(p, _)| p).collect()
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.sounding.iter().map(|&(_, until)| until).min()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Player: the output thread
// ════════════════════════════════════════════════════════════════════════════

/// Handle to the MIDI output thread.  Clones share the same thread.
#[derive(Clone)]
pub struct Player {
    cmd_tx: Sender<PlayerCommand>,
}

impl Player {
    /// Spawn the output thread.  The MIDI port is opened on that thread.
    pub fn spawn(settings: MidiSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<PlayerCommand>();
        thread::spawn(move || {
            let midi = open_midi_output(&settings.port_hint);
            player_thread(midi, settings, cmd_rx);
        });
        Player { cmd_tx }
    }

    pub fn all_off(&self) { let _ = self.cmd_tx.send(PlayerCommand::AllOff); }
    pub fn quit(&self)    { let _ = self.cmd_tx.send(PlayerCommand::Quit);   }

    pub fn set_program(&self, program: u8) {
        let _ = self.cmd_tx.send(PlayerCommand::SetProgram(program));
    }
}

impl BankLoader for Player {
    type Bank = MidiNoteBank;

    fn load(&mut self, notes: &NoteSet) -> MidiNoteBank {
        MidiNoteBank::new(self.cmd_tx.clone(), notes)
    }
}

fn player_thread(
    mut midi: Box<dyn MidiOut>,
    settings: MidiSettings,
    cmd_rx:   Receiver<PlayerCommand>,
) {
    const IDLE_WAIT: Duration = Duration::from_millis(250);

    let ch = settings.channel;
    let mut voices = Voices::default();

    midi.program_change(ch, settings.program);
    log_instrument(settings.program);

    loop {
        let wait = voices.next_deadline()
            .map(|d| d.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE_WAIT);

        match cmd_rx.recv_timeout(wait) {
            Ok(PlayerCommand::NoteOn { pitch }) => {
                if voices.strike(pitch, Instant::now() + settings.hold) {
                    midi.note_off(ch, pitch);
                }
                midi.note_on(ch, pitch, settings.velocity);
            }
            Ok(PlayerCommand::AllOff) => {
                for p in voices.drain() { midi.note_off(ch, p); }
            }
            Ok(PlayerCommand::SetProgram(p)) => {
                midi.program_change(ch, p);
                log_instrument(p);
            }
            Ok(PlayerCommand::Quit) | Err(RecvTimeoutError::Disconnected) => {
                for p in voices.drain() { midi.note_off(ch, p); }
                return;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        for p in voices.due(Instant::now()) {
            midi.note_off(ch, p);
        }
    }
}

fn log_instrument(program: u8) {
    match GeneralMidi::from_program(program) {
        Some(gm) => log::info!(target: "player", "instrument: {}", gm.name()),
        None     => log::info!(target: "player", "instrument: program {}", program),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MidiNoteBank
// ════════════════════════════════════════════════════════════════════════════

/// Five MIDI pitches bound to the player thread.
pub struct MidiNoteBank {
    tx:      Sender<PlayerCommand>,
    pitches: [u8; NOTES_PER_SET],
}

impl MidiNoteBank {
    fn new(tx: Sender<PlayerCommand>, notes: &NoteSet) -> Self {
        MidiNoteBank { tx, pitches: notes.midi_pitches() }
    }
}

impl NoteBank for MidiNoteBank {
    fn play(&mut self, index: usize) {
        if let Some(&pitch) = self.pitches.get(index) {
            let _ = self.tx.send(PlayerCommand::NoteOn { pitch });
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn bank_sends_note_on_for_finger_pitch() {
        let (tx, rx) = mpsc::channel();
        let mut bank = MidiNoteBank::new(tx, &NoteSet::original());
        bank.play(0);
        bank.play(4);
        assert_eq!(rx.try_recv(), Ok(PlayerCommand::NoteOn { pitch: 69 }));
        assert_eq!(rx.try_recv(), Ok(PlayerCommand::NoteOn { pitch: 76 }));
    }

    #[test]
    fn bank_ignores_out_of_range_finger() {
        let (tx, rx) = mpsc::channel();
        let mut bank = MidiNoteBank::new(tx, &NoteSet::original());
        bank.play(5);
        assert!(rx.try_recv().is_err());
    }

    fn played(rx: &Receiver<PlayerCommand>) -> Vec<u8> {
        rx.try_iter()
            .filter_map(|c| match c { PlayerCommand::NoteOn { pitch } => Some(pitch), _ => None })
            .collect()
    }

    #[test]
    fn banks_follow_their_note_set() {
        let (tx, rx) = mpsc::channel();
        let mut player = Player { cmd_tx: tx };
        let mut original  = player.load(&NoteSet::original());
        let mut alternate = player.load(&NoteSet::alternate());
        for i in 0..NOTES_PER_SET { original.play(i); }
        assert_eq!(played(&rx), [69, 71, 72, 74, 76]);
        for i in 0..NOTES_PER_SET { alternate.play(i); }
        assert_eq!(played(&rx), [65, 67, 69, 71, 72]);
    }

    // ── player_thread against a recording output ─────────────────────────

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Midi {
        Program(u8),
        On(u8),
        Off(u8),
    }

    #[derive(Clone, Default)]
    struct RecordingOut(Arc<Mutex<Vec<Midi>>>);

    impl MidiOut for RecordingOut {
        fn program_change(&mut self, _ch: u8, program: u8) {
            self.0.lock().unwrap().push(Midi::Program(program));
        }
        fn note_on(&mut self, _ch: u8, note: u8, _v: u8) {
            self.0.lock().unwrap().push(Midi::On(note));
        }
        fn note_off(&mut self, _ch: u8, note: u8) {
            self.0.lock().unwrap().push(Midi::Off(note));
        }
    }

    /// Queue `commands`, then run the thread body to completion on this thread.
    fn run_player(hold: Duration, commands: &[PlayerCommand]) -> Vec<Midi> {
        let out = RecordingOut::default();
        let (tx, rx) = mpsc::channel();
        for &c in commands {
            tx.send(c).unwrap();
        }
        let settings = MidiSettings { hold, ..MidiSettings::default() };
        player_thread(Box::new(out.clone()), settings, rx);
        let events = out.0.lock().unwrap().clone();
        events
    }

    #[test]
    fn restrike_releases_before_striking_again() {
        use PlayerCommand::*;
        let events = run_player(Duration::from_secs(60), &[
            NoteOn { pitch: 60 },
            NoteOn { pitch: 64 },
            NoteOn { pitch: 60 },
            Quit,
        ]);
        assert_eq!(events, [
            Midi::Program(0),
            Midi::On(60),
            Midi::On(64),
            Midi::Off(60),
            Midi::On(60),
            // Quit releases what is still sounding, oldest first
            Midi::Off(60),
            Midi::Off(64),
        ]);
    }

    #[test]
    fn elapsed_hold_releases_note() {
        use PlayerCommand::*;
        let events = run_player(Duration::ZERO, &[NoteOn { pitch: 72 }, Quit]);
        assert_eq!(events, [Midi::Program(0), Midi::On(72), Midi::Off(72)]);
    }

    #[test]
    fn program_change_and_all_off() {
        use PlayerCommand::*;
        let events = run_player(Duration::from_secs(60), &[
            NoteOn { pitch: 69 },
            SetProgram(108),
            AllOff,
            Quit,
        ]);
        assert_eq!(events, [
            Midi::Program(0),
            Midi::On(69),
            Midi::Program(108),
            Midi::Off(69),
        ]);
    }

    #[test]
    fn closed_channel_stops_the_thread() {
        let out = RecordingOut::default();
        let (tx, rx) = mpsc::channel::<PlayerCommand>();
        drop(tx);
        player_thread(Box::new(out.clone()), MidiSettings::default(), rx);
        assert_eq!(*out.0.lock().unwrap(), [Midi::Program(0)]);
    }

    #[test]
    fn voices_release_after_hold() {
        let t0 = Instant::now();
        let mut v = Voices::default();
        assert!(!v.strike(60, t0 + Duration::from_millis(100)));
        assert!(!v.strike(64, t0 + Duration::from_millis(300)));
        assert_eq!(v.next_deadline(), Some(t0 + Duration::from_millis(100)));
        assert!(v.due(t0 + Duration::from_millis(50)).is_empty());
        assert_eq!(v.due(t0 + Duration::from_millis(100)), vec![60]);
        assert_eq!(v.due(t0 + Duration::from_millis(400)), vec![64]);
        assert_eq!(v.next_deadline(), None);
    }

    #[test]
    fn restrike_extends_hold() {
        let t0 = Instant::now();
        let mut v = Voices::default();
        v.strike(60, t0 + Duration::from_millis(100));
        assert!(v.strike(60, t0 + Duration::from_millis(500)));
        assert!(v.due(t0 + Duration::from_millis(200)).is_empty());
        assert_eq!(v.drain(), vec![60]);
    }

    #[test]
    fn port_choice() {
        let names = vec![
            "Midi Through Port-0".to_string(),
            "FLUID Synth (1234)".to_string(),
            "USB Keyboard".to_string(),
        ];
        assert_eq!(pick_port(&names, ""), 1);
        assert_eq!(pick_port(&names, "usb"), 2);
        assert_eq!(pick_port(&names, "nothing-like-this"), 1);
        assert_eq!(pick_port(&names[..1], ""), 0);
    }
}
