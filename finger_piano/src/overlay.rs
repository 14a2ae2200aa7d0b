//! Software-rendered overlay using `minifb`.
//!
//! Layout (frame-sized window):
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              A4 B4 C5 D5 E5                  │  ← active note banner
//! │                                              │
//! │               C5                             │
//! │           ●   ●   ●   ●   ●    ← fingertips  │
//! │           │   │   │   │   │      (green = down)
//! │           •   •   •   •   •    ← knuckles    │
//! │                                              │
//! │ set: original   left: fist                   │  ← status
//! │ 1-5=fingers  O=palm  F=fist  R=hand  I  Q    │  ← legend (sim only)
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Drawing goes to a [`Canvas`] so it can be exercised without a window.

use std::sync::mpsc::Sender;

use anyhow::anyhow;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::landmark::{Finger, PixelPoint};
use crate::session::FrameReport;
use crate::source::{SimInput, SimKey};

pub const BG_COLOR:        u32 = 0xFF101018;
pub const PRESSED_COLOR:   u32 = 0xFF00FF00;
pub const UNPRESSED_COLOR: u32 = 0xFFFF0000;
pub const BASE_COLOR:      u32 = 0xFFFFFFFF;
const TEXT_COLOR:          u32 = 0xFFFFFFFF;
const STATUS_COLOR:        u32 = 0xFFAADDFF;
const LEGEND_COLOR:        u32 = 0xFF888888;

const TIP_RADIUS:  i32 = 10;
const BASE_RADIUS: i32 = 5;
const BANNER_Y:    i32 = 50;
const BANNER_SCALE: usize = 4;

const LEGEND: &str = "1-5=fingers  O=palm  F=fist  R=right hand  I=instrument  Q=quit";

// ════════════════════════════════════════════════════════════════════════════
// Canvas
// ════════════════════════════════════════════════════════════════════════════

/// An ARGB framebuffer with clipped drawing primitives.
pub struct Canvas {
    width:  usize,
    height: usize,
    buf:    Vec<u32>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Canvas { width, height, buf: vec![BG_COLOR; width * height] }
    }

    pub fn width(&self)  -> usize { self.width }
    pub fn height(&self) -> usize { self.height }
    pub fn buffer(&self) -> &[u32] { &self.buf }

    pub fn pixel(&self, x: i32, y: i32) -> Option<u32> {
        self.index(x, y).map(|i| self.buf[i])
    }

    pub fn clear(&mut self) {
        self.buf.fill(BG_COLOR);
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            None
        } else {
            Some(y as usize * self.width + x as usize)
        }
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if let Some(i) = self.index(x, y) {
            self.buf[i] = color;
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u32) {
        for row in y..y + h {
            for col in x..x + w {
                self.set_pixel(col, row, color);
            }
        }
    }

    pub fn fill_circle(&mut self, cx: i32, cy: i32, r: i32, color: u32) {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Bresenham line, `thickness` pixels wide.
    pub fn draw_line(&mut self, from: PixelPoint, to: PixelPoint, thickness: i32, color: u32) {
        let (mut x, mut y) = (from.x, from.y);
        let dx =  (to.x - from.x).abs();
        let dy = -(to.y - from.y).abs();
        let sx = if from.x < to.x { 1 } else { -1 };
        let sy = if from.y < to.y { 1 } else { -1 };
        let mut err = dx + dy;
        let half = thickness / 2;

        loop {
            self.fill_rect(x - half, y - half, thickness.max(1), thickness.max(1), color);
            if x == to.x && y == to.y { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x += sx; }
            if e2 <= dx { err += dx; y += sy; }
        }
    }

    /// Pixel width of `text` at `scale`.
    pub fn text_width(text: &str, scale: usize) -> usize {
        let n = text.chars().count();
        if n == 0 { 0 } else { (n * 4 - 1) * scale }
    }

    /// 3×5 bitmap text, each font pixel drawn as a `scale`×`scale` block.
    pub fn draw_text(&mut self, text: &str, x: i32, y: i32, scale: usize, color: u32) {
        let s = scale.max(1) as i32;
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3i32 {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(cx + col * s, y + row as i32 * s, s, s, color);
                    }
                }
            }
            cx += 4 * s;
            if cx >= self.width as i32 { break; }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// paint: one overlay frame
// ════════════════════════════════════════════════════════════════════════════

/// Draw `report` onto `canvas`.  Marker positions are in `frame_size`
/// pixels and get rescaled if the canvas has a different size.
pub fn paint(
    canvas:     &mut Canvas,
    report:     &FrameReport,
    frame_size: (u32, u32),
    legend:     bool,
) {
    canvas.clear();

    let (cw, ch) = (canvas.width() as i32, canvas.height() as i32);
    let sx = cw as f32 / frame_size.0.max(1) as f32;
    let sy = ch as f32 / frame_size.1.max(1) as f32;
    // Off-canvas points are pinned one canvas-width/height outside the edge
    let map = |p: PixelPoint| PixelPoint::new(
        ((p.x as f32 * sx) as i32).clamp(-cw, 2 * cw),
        ((p.y as f32 * sy) as i32).clamp(-ch, 2 * ch),
    );

    // ── Right-hand fingers ───────────────────────────────────────────────
    for m in &report.markers {
        let color = if m.pressed { PRESSED_COLOR } else { UNPRESSED_COLOR };
        let (tip, base) = (map(m.tip), map(m.base));
        canvas.draw_line(tip, base, 2, color);
        canvas.fill_circle(tip.x, tip.y, TIP_RADIUS, color);
        canvas.fill_circle(base.x, base.y, BASE_RADIUS, BASE_COLOR);
        canvas.draw_text(&m.label, tip.x + 10, tip.y - 20, 2, color);
    }

    // ── Banner ───────────────────────────────────────────────────────────
    let banner = report.banner();
    let w = Canvas::text_width(&banner, BANNER_SCALE) as i32;
    let x = (canvas.width() as i32 - w) / 2;
    canvas.draw_text(&banner, x, BANNER_Y - 5 * BANNER_SCALE as i32, BANNER_SCALE, TEXT_COLOR);

    // ── Status / legend ──────────────────────────────────────────────────
    let h = canvas.height() as i32;
    let pose = report.left_pose.map(|p| p.name()).unwrap_or("-");
    let status = format!("set: {}   left: {}", report.active.name(), pose);
    canvas.draw_text(&status, 10, h - 40, 2, STATUS_COLOR);
    if legend {
        canvas.draw_text(LEGEND, 10, h - 18, 2, LEGEND_COLOR);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Overlay: the window
// ════════════════════════════════════════════════════════════════════════════

pub struct Overlay {
    window: Window,
    canvas: Canvas,
    /// Present in simulation mode: key events are forwarded here.
    sim_tx: Option<Sender<SimInput>>,
}

const SIM_KEYS: [(Key, SimKey); 8] = [
    (Key::Key1, SimKey::Finger(Finger::Thumb)),
    (Key::Key2, SimKey::Finger(Finger::Index)),
    (Key::Key3, SimKey::Finger(Finger::Middle)),
    (Key::Key4, SimKey::Finger(Finger::Ring)),
    (Key::Key5, SimKey::Finger(Finger::Pinky)),
    (Key::O,    SimKey::OpenPalm),
    (Key::F,    SimKey::Fist),
    (Key::R,    SimKey::ToggleRightHand),
];

impl Overlay {
    pub fn new(width: usize, height: usize, sim_tx: Option<Sender<SimInput>>) -> anyhow::Result<Self> {
        let mut window = Window::new(
            "Finger Piano",
            width, height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| anyhow!("could not open window: {}", e))?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Overlay { window, canvas: Canvas::new(width, height), sim_tx })
    }

    /// Returns false when the user asked to quit (`q` or window closed).
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() || self.window.is_key_pressed(Key::Q, KeyRepeat::No) {
            return false;
        }

        if let Some(tx) = &self.sim_tx {
            for (key, sim) in SIM_KEYS {
                if self.window.is_key_pressed(key, KeyRepeat::No) {
                    let _ = tx.send(SimInput::KeyDown(sim));
                }
                if self.window.is_key_released(key) {
                    let _ = tx.send(SimInput::KeyUp(sim));
                }
            }
        }
        true
    }

    /// True once per press of `I` (next instrument).
    pub fn instrument_requested(&self) -> bool {
        self.window.is_key_pressed(Key::I, KeyRepeat::No)
    }

    pub fn render(&mut self, report: &FrameReport, frame_size: (u32, u32)) {
        paint(&mut self.canvas, report, frame_size, self.sim_tx.is_some());
        let (w, h) = (self.canvas.width(), self.canvas.height());
        if let Err(e) = self.window.update_with_buffer(self.canvas.buffer(), w, h) {
            log::warn!(target: "overlay", "update failed: {}", e);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'A' | 'a' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'B'       => [0b110, 0b101, 0b110, 0b101, 0b110],
        // lower-case b is the flat sign
        'b'       => [0b100, 0b100, 0b110, 0b101, 0b110],
        'C' | 'c' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'D' | 'd' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' | 'e' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'F' | 'f' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'G' | 'g' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'H' | 'h' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' | 'i' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'K' | 'k' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' | 'l' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' | 'm' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'N' | 'n' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'O' | 'o' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'P' | 'p' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'Q' | 'q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'R' | 'r' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' | 's' => [0b111, 0b100, 0b111, 0b001, 0b111],
        'T' | 't' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' | 'u' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' | 'v' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'W' | 'w' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'Y' | 'y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        '#' => [0b101, 0b111, 0b101, 0b111, 0b101],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000],
    }
}
