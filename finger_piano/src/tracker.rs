//! Hand tracking via an external subprocess that writes JSON lines.
//!
//! The tracker owns the camera and the pose model (for example a small
//! MediaPipe script).  It prints one JSON object per processed frame:
//!
//! ```text
//! {"width":640,"height":480,"hands":[
//!     {"handedness":"Right","score":0.93,"landmarks":[{"x":0.51,"y":0.62,"z":-0.01}, … 21 …]}
//! ]}
//! ```
//!
//! Lines that don't start with `{` (start-up chatter such as `READY`) are
//! skipped.  A line that is not UTF-8 or fails to parse becomes an empty
//! frame, and a hand with the wrong number of landmarks, an unknown label or
//! coordinates far outside the frame is dropped, so bad data always lands on
//! the no-hand path instead of stopping the loop.

use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdout, Command, Stdio};

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::landmark::{Frame, Hand, Handedness, Landmark, LANDMARK_COUNT, MAX_COORD};
use crate::source::LandmarkSource;

/// How to launch and parameterise the tracker.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackerSettings {
    /// argv of the tracker; empty selects the keyboard simulator.
    pub command: Vec<String>,
    /// Requested capture size, also assumed for lines that omit it.
    pub width:   u32,
    pub height:  u32,
    pub max_hands: u32,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence:  f32,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        TrackerSettings {
            command:   Vec::new(),
            width:     640,
            height:    480,
            max_hands: 2,
            min_detection_confidence: 0.7,
            min_tracking_confidence:  0.7,
        }
    }
}

impl TrackerSettings {
    /// Flags appended to the tracker's own arguments.
    pub fn tracker_args(&self) -> Vec<String> {
        vec![
            "--width".into(),  self.width.to_string(),
            "--height".into(), self.height.to_string(),
            "--max-hands".into(), self.max_hands.to_string(),
            "--min-detection-confidence".into(), self.min_detection_confidence.to_string(),
            "--min-tracking-confidence".into(),  self.min_tracking_confidence.to_string(),
        ]
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Wire format
// ════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize, Debug)]
struct FrameJson {
    #[serde(default)]
    width:  Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    hands:  Vec<HandJson>,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    handedness: String,
    #[serde(default)]
    #[allow(dead_code)]
    score:      Option<f32>,
    landmarks:  Vec<Landmark>,
}

// ════════════════════════════════════════════════════════════════════════════
// JsonLinesSource
// ════════════════════════════════════════════════════════════════════════════

/// Reads frames from any line-oriented reader.
pub struct JsonLinesSource<R: BufRead> {
    reader:  R,
    width:   u32,
    height:  u32,
    line:    Vec<u8>,
    line_no: usize,
}

impl<R: BufRead> JsonLinesSource<R> {
    /// `width`/`height` are used for lines that don't carry a size.
    pub fn new(reader: R, width: u32, height: u32) -> Self {
        JsonLinesSource { reader, width, height, line: Vec::new(), line_no: 0 }
    }

    fn parse_frame(&self, text: &str) -> Frame {
        let parsed: FrameJson = match serde_json::from_str(text) {
            Ok(f)  => f,
            Err(e) => {
                log::warn!(target: "tracker", "line {}: malformed frame: {}", self.line_no, e);
                return Frame::empty(self.width, self.height);
            }
        };

        let mut frame = Frame::empty(
            parsed.width.unwrap_or(self.width),
            parsed.height.unwrap_or(self.height),
        );
        for hand in parsed.hands {
            let handedness: Handedness = match hand.handedness.parse() {
                Ok(h)  => h,
                Err(e) => {
                    log::warn!(target: "tracker", "line {}: {}", self.line_no, e);
                    continue;
                }
            };
            let count = hand.landmarks.len();
            let landmarks: [Landmark; LANDMARK_COUNT] = match hand.landmarks.try_into() {
                Ok(arr) => arr,
                Err(_)  => {
                    log::warn!(
                        target: "tracker",
                        "line {}: {} hand has {} landmarks, expected {}",
                        self.line_no, handedness, count, LANDMARK_COUNT,
                    );
                    continue;
                }
            };
            if !landmarks.iter().all(Landmark::is_plausible) {
                log::warn!(
                    target: "tracker",
                    "line {}: {} hand has coordinates outside ±{}, dropped",
                    self.line_no, handedness, MAX_COORD,
                );
                continue;
            }
            frame.hands.push(Hand::new(handedness, landmarks));
        }
        frame
    }
}

impl<R: BufRead> LandmarkSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> anyhow::Result<Option<Frame>> {
        loop {
            self.line.clear();
            let n = self.reader.read_until(b'\n', &mut self.line)
                .context("reading landmark stream")?;
            if n == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let text = match std::str::from_utf8(&self.line) {
                Ok(t)  => t.trim(),
                Err(e) => {
                    log::warn!(target: "tracker", "line {}: not UTF-8: {}", self.line_no, e);
                    return Ok(Some(Frame::empty(self.width, self.height)));
                }
            };
            if text.is_empty() {
                continue;
            }
            if !text.starts_with('{') {
                log::debug!(target: "tracker", "tracker says: {}", text);
                continue;
            }
            return Ok(Some(self.parse_frame(text)));
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SubprocessTracker
// ════════════════════════════════════════════════════════════════════════════

/// A tracker process whose stdout is a [`JsonLinesSource`].
///
/// The child is killed when this is dropped.
pub struct SubprocessTracker {
    child:  Child,
    source: JsonLinesSource<BufReader<ChildStdout>>,
}

impl SubprocessTracker {
    pub fn spawn(settings: &TrackerSettings) -> anyhow::Result<Self> {
        let Some((program, args)) = settings.command.split_first() else {
            bail!("no tracker command configured");
        };

        log::info!(target: "tracker", "starting tracker: {}", settings.command.join(" "));
        let mut child = Command::new(program)
            .args(args)
            .args(settings.tracker_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to start tracker \"{}\"", program))?;

        let stdout = child.stdout.take().context("tracker stdout not captured")?;
        let source = JsonLinesSource::new(BufReader::new(stdout), settings.width, settings.height);
        Ok(SubprocessTracker { child, source })
    }
}

impl LandmarkSource for SubprocessTracker {
    fn next_frame(&mut self) -> anyhow::Result<Option<Frame>> {
        self.source.next_frame()
    }
}

impl Drop for SubprocessTracker {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            log::info!(target: "tracker", "stopping tracker");
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}
