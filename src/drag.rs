use crate::controller::PlaybackCommand;
use crate::render::Viewport;
use crate::timeline::Timeline;

/// Hit-test tolerance around a marker's rendered x, in surface pixels.
/// Independent of any on-screen scaling of the surface.
const HIT_TOLERANCE_PX: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { shift: false, ctrl: false };
}

/// Pointer events over the rendering surface, x in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f64, modifiers: Modifiers },
    Move { x: f64 },
    Up { x: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragTarget {
    PointA,
    PointB,
}

/// Cosmetic cursor affordance for the host to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorHint {
    #[default]
    Pointer,
    Grab,
    Grabbing,
}

#[derive(Debug, Clone, Copy)]
struct Press {
    x: f64,
    modifiers: Modifiers,
    moved: bool,
}

/// Translates pointer-down/move/up sequences into marker drags, clicks and
/// hover hints. Writes boundary updates straight into the timeline; seek
/// clicks come back as playback commands for the host to forward.
#[derive(Debug, Default)]
pub struct DragController {
    session: Option<DragTarget>,
    press: Option<Press>,
    pub cursor: CursorHint,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a drag session is active.
    pub fn dragging(&self) -> bool {
        self.session.is_some()
    }

    fn marker_hit(timeline: &Timeline, vp: Viewport, duration: f64, x: f64) -> Option<DragTarget> {
        // A is checked first and wins when both markers are in range.
        if let Some(a) = timeline.point_a {
            if (vp.time_to_x(a, duration) - x).abs() < HIT_TOLERANCE_PX {
                return Some(DragTarget::PointA);
            }
        }
        if let Some(b) = timeline.point_b {
            if (vp.time_to_x(b, duration) - x).abs() < HIT_TOLERANCE_PX {
                return Some(DragTarget::PointB);
            }
        }
        None
    }

    /// Feed one pointer event. Returns commands for the playback engine
    /// (only plain clicks produce any).
    pub fn handle(
        &mut self,
        event: PointerEvent,
        timeline: &mut Timeline,
        vp: Viewport,
    ) -> Vec<PlaybackCommand> {
        let Some(duration) = timeline.duration().filter(|d| *d > 0.0) else {
            return Vec::new();
        };

        match event {
            PointerEvent::Down { x, modifiers } => {
                if let Some(target) = Self::marker_hit(timeline, vp, duration, x) {
                    self.session = Some(target);
                    self.cursor = CursorHint::Grabbing;
                } else {
                    self.press = Some(Press { x, modifiers, moved: false });
                }
                Vec::new()
            }

            PointerEvent::Move { x } => {
                if let Some(target) = self.session {
                    let clamped = x.max(0.0).min(vp.width);
                    let t = vp.x_to_time(clamped, duration);
                    match target {
                        DragTarget::PointA => timeline.set_point_a(t),
                        DragTarget::PointB => timeline.set_point_b(t),
                    }
                    self.cursor = CursorHint::Grabbing;
                } else if let Some(press) = &mut self.press {
                    if (x - press.x).abs() > f64::EPSILON {
                        press.moved = true;
                    }
                } else {
                    // Hover affordance only; no state of consequence changes.
                    self.cursor = match Self::marker_hit(timeline, vp, duration, x) {
                        Some(_) => CursorHint::Grab,
                        None => CursorHint::Pointer,
                    };
                }
                Vec::new()
            }

            PointerEvent::Up { x } => {
                if self.session.take().is_some() {
                    self.cursor = CursorHint::Pointer;
                    return Vec::new();
                }

                let Some(press) = self.press.take() else {
                    return Vec::new();
                };
                if press.moved {
                    return Vec::new();
                }

                let click_time = vp.x_to_time(x.max(0.0).min(vp.width), duration);
                if press.modifiers.shift {
                    timeline.set_point_a(click_time);
                    Vec::new()
                } else if press.modifiers.ctrl {
                    timeline.set_point_b(click_time);
                    Vec::new()
                } else {
                    vec![
                        PlaybackCommand::SeekTo(timeline.clamp_seek(click_time)),
                        PlaybackCommand::Resume,
                    ]
                }
            }
        }
    }
}
