use serde::{Deserialize, Serialize};

use crate::timeline::Timeline;
use crate::waveform::WaveformBuffer;

// ── Colors ──

/// RGBA color, alpha as 0-1 like the canvas rgba() the palette came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }
}

pub const BACKGROUND: Color = Color::opaque(0x11, 0x11, 0x11);
pub const TRACE: Color = Color::opaque(0x4c, 0xaf, 0x50);
pub const CURSOR: Color = Color::opaque(0xff, 0x44, 0x44);
pub const MARKER_A_IDLE: Color = Color::opaque(0xff, 0x44, 0x44);
pub const MARKER_B_IDLE: Color = Color::opaque(0x44, 0xaa, 0xff);
pub const MARKER_ACTIVE: Color = Color::opaque(0x4c, 0xaf, 0x50);
pub const REGION_ACTIVE: Color = Color { r: 76, g: 175, b: 80, a: 0.2 };
pub const REGION_IDLE: Color = Color { r: 100, g: 100, b: 100, a: 0.2 };
pub const BOUNDARY_ACTIVE: Color = Color::opaque(0x4c, 0xaf, 0x50);
pub const BOUNDARY_IDLE: Color = Color::opaque(0x66, 0x66, 0x66);
pub const LABEL: Color = Color::opaque(0xff, 0xff, 0xff);

// ── Viewport & coordinate mapping ──

/// Fixed-size logical drawing surface. All time-based drawing goes through
/// `time_to_x` / `x_to_time` so the trace, markers, cursor and hit tests
/// always agree on where a second lives on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 720.0, height: 180.0 }
    }
}

impl Viewport {
    pub fn time_to_x(&self, t: f64, duration: f64) -> f64 {
        if duration <= 0.0 {
            return 0.0;
        }
        t / duration * self.width
    }

    pub fn x_to_time(&self, x: f64, duration: f64) -> f64 {
        if self.width <= 0.0 {
            return 0.0;
        }
        x / self.width * duration
    }
}

// ── Draw commands ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DrawOp {
    Clear,
    FillRect { x: f64, y: f64, w: f64, h: f64, color: Color },
    /// Connected stroke through the points, in order.
    Polyline { points: Vec<(f64, f64)>, color: Color, width: f64 },
    Line { from: (f64, f64), to: (f64, f64), color: Color, width: f64 },
    FillCircle { center: (f64, f64), radius: f64, color: Color },
    FillTriangle { points: [(f64, f64); 3], color: Color },
    Text { at: (f64, f64), text: String, color: Color, size: f64, bold: bool },
}

/// `m:ss` for marker timestamp labels.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{}:{:02}", mins, secs)
}

fn marker_ops(ops: &mut Vec<DrawOp>, x: f64, label: &str, t: f64, color: Color) {
    ops.push(DrawOp::FillCircle { center: (x, 30.0), radius: 10.0, color });
    ops.push(DrawOp::Text {
        at: (x, 30.0),
        text: label.to_string(),
        color: LABEL,
        size: 12.0,
        bold: true,
    });
    ops.push(DrawOp::Text {
        at: (x, 50.0),
        text: format_time(t),
        color: LABEL,
        size: 10.0,
        bold: false,
    });
}

/// Map the waveform and timeline state onto draw commands for one frame.
///
/// Pure function: nothing here holds state between calls, so the host can
/// simply re-run it on every tick or boundary change. Draw order follows
/// the layering of the surface: background, loop region, trace, position
/// cursor, markers.
pub fn render(waveform: &WaveformBuffer, timeline: &Timeline, vp: Viewport) -> Vec<DrawOp> {
    let mut ops = vec![
        DrawOp::Clear,
        DrawOp::FillRect { x: 0.0, y: 0.0, w: vp.width, h: vp.height, color: BACKGROUND },
    ];

    let duration = timeline.duration().unwrap_or(waveform.duration);
    if duration <= 0.0 {
        return ops;
    }

    let active = timeline.ab_loop_enabled;

    // Loop region between the ordered pair, whichever way A and B were set.
    if let Some((lo, hi)) = timeline.loop_span() {
        let x_lo = vp.time_to_x(lo, duration);
        let x_hi = vp.time_to_x(hi, duration);
        ops.push(DrawOp::FillRect {
            x: x_lo,
            y: 0.0,
            w: x_hi - x_lo,
            h: vp.height,
            color: if active { REGION_ACTIVE } else { REGION_IDLE },
        });
        let boundary = if active { BOUNDARY_ACTIVE } else { BOUNDARY_IDLE };
        ops.push(DrawOp::Line { from: (x_lo, 0.0), to: (x_lo, vp.height), color: boundary, width: 2.0 });
        ops.push(DrawOp::Line { from: (x_hi, 0.0), to: (x_hi, vp.height), color: boundary, width: 2.0 });
    }

    // Waveform trace: fixed-stride nearest-neighbor decimation, one point
    // per pixel column. Deliberately not averaged.
    let width_px = vp.width.max(0.0) as usize;
    let step = if width_px > 0 { waveform.samples.len() / width_px } else { 0 };
    let mid = vp.height / 2.0;
    let mut points = Vec::with_capacity(width_px);
    for i in 0..width_px {
        let sample = waveform.samples.get(i * step).copied().unwrap_or(0.0) as f64;
        points.push((i as f64, mid - sample * mid * 0.8));
    }
    if !points.is_empty() {
        ops.push(DrawOp::Polyline { points, color: TRACE, width: 2.0 });
    }

    // Position cursor with its direction indicator.
    let x = vp.time_to_x(timeline.position, duration);
    ops.push(DrawOp::Line { from: (x, 0.0), to: (x, vp.height), color: CURSOR, width: 2.0 });
    ops.push(DrawOp::FillTriangle {
        points: [(x - 5.0, 5.0), (x + 5.0, 5.0), (x, 15.0)],
        color: CURSOR,
    });

    // A/B markers, colored by loop state.
    if let Some(a) = timeline.point_a {
        let color = if active { MARKER_ACTIVE } else { MARKER_A_IDLE };
        marker_ops(&mut ops, vp.time_to_x(a, duration), "A", a, color);
    }
    if let Some(b) = timeline.point_b {
        let color = if active { MARKER_ACTIVE } else { MARKER_B_IDLE };
        marker_ops(&mut ops, vp.time_to_x(b, duration), "B", b, color);
    }

    ops
}
