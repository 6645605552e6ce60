use std::time::{Duration, Instant};

use crate::controller::{self, PlaybackCommand};
use crate::drag::{DragController, PointerEvent};
use crate::render::Viewport;
use crate::subtitle::{self, SubtitleCue};
use crate::timeline::{rate_step_down, rate_step_up, Timeline, DEFAULT_RATE_INDEX, RATES};

/// How long a transient hint stays up before `on_tick` expires it.
const HINT_TTL: Duration = Duration::from_millis(1500);

/// Arrow-key seek step in seconds.
const SEEK_STEP: f64 = 5.0;

/// Keys in the fixed command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Left,
    Right,
    Up,
    Down,
    A,
    B,
    L,
    C,
    R,
    F,
    Escape,
}

/// Everything a session can ask its host to do. Playback commands go to
/// the playback engine; recording commands go to the recorder service.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Playback(PlaybackCommand),
    TogglePlayPause,
    SetRate(f32),
    StartRecording,
    StopRecording,
}

/// The single dispatcher all external events enter through.
///
/// Owns the timeline, the parsed cues, the drag controller and the small
/// pieces of UI-adjacent state (rate ladder index, recording flag, the
/// transient hint and the help-dialog flag, kept independent of each
/// other). Handlers run to completion per event; nothing here blocks.
#[derive(Debug)]
pub struct Session {
    pub timeline: Timeline,
    pub cues: Vec<SubtitleCue>,
    pub drag: DragController,
    rate_index: usize,
    recording: bool,
    hint: Option<String>,
    hint_expires: Option<Instant>,
    pub help_open: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            timeline: Timeline::new(),
            cues: Vec::new(),
            drag: DragController::new(),
            rate_index: DEFAULT_RATE_INDEX,
            recording: false,
            hint: None,
            hint_expires: None,
            help_open: false,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Lifecycle ──

    /// A new media source was selected: the old timeline state dies with
    /// the old source. Subtitles and playback rate survive.
    pub fn load_media(&mut self, duration: f64) {
        self.timeline.reset();
        self.timeline.set_duration(duration);
        log::info!("media loaded: {:.2}s", duration);
    }

    /// Parse and install a subtitle document, replacing any previous one.
    pub fn load_subtitles(&mut self, text: &str) {
        self.cues = subtitle::parse(text);
        self.timeline.current_cue = None;
        log::info!("loaded {} subtitle cues", self.cues.len());
    }

    // ── Ticks ──

    /// Feed one reported playback position. Returns commands for the
    /// playback engine.
    pub fn on_tick(&mut self, position: f64) -> Vec<PlaybackCommand> {
        if let Some(expires) = self.hint_expires {
            if Instant::now() >= expires {
                self.hint = None;
                self.hint_expires = None;
            }
        }
        controller::on_tick(&mut self.timeline, &self.cues, position)
    }

    // ── Keyboard ──

    pub fn handle_key(&mut self, key: Key) -> Vec<SessionCommand> {
        match key {
            Key::Space => vec![SessionCommand::TogglePlayPause],

            Key::Left => self.seek_relative(-SEEK_STEP),
            Key::Right => self.seek_relative(SEEK_STEP),

            Key::Up => self.step_rate(rate_step_up(self.rate_index)),
            Key::Down => self.step_rate(rate_step_down(self.rate_index)),

            Key::A => {
                if self.timeline.has_media() {
                    self.timeline.set_point_a(self.timeline.position);
                    self.set_hint("Point A set");
                }
                Vec::new()
            }
            Key::B => {
                if self.timeline.has_media() {
                    self.timeline.set_point_b(self.timeline.position);
                    self.set_hint("Point B set");
                }
                Vec::new()
            }
            Key::L => {
                // Refused silently unless both points exist.
                if self.timeline.loop_span().is_some() {
                    let on = self.timeline.toggle_ab_loop();
                    self.set_hint(if on { "Loop on" } else { "Loop off" });
                }
                Vec::new()
            }
            Key::C => {
                self.timeline.clear_points();
                self.set_hint("Loop points cleared");
                Vec::new()
            }

            Key::R => {
                if self.recording {
                    self.recording = false;
                    self.set_hint("Recording stopped");
                    vec![SessionCommand::StopRecording]
                } else {
                    self.recording = true;
                    self.set_hint("Recording started");
                    vec![SessionCommand::StartRecording]
                }
            }

            Key::F => {
                self.help_open = !self.help_open;
                Vec::new()
            }
            Key::Escape => {
                self.hint = None;
                self.hint_expires = None;
                self.help_open = false;
                Vec::new()
            }
        }
    }

    fn seek_relative(&self, delta: f64) -> Vec<SessionCommand> {
        if !self.timeline.has_media() {
            return Vec::new();
        }
        let target = self.timeline.clamp_seek(self.timeline.position + delta);
        vec![SessionCommand::Playback(PlaybackCommand::SeekTo(target))]
    }

    fn step_rate(&mut self, new_index: usize) -> Vec<SessionCommand> {
        if new_index == self.rate_index {
            return Vec::new();
        }
        self.rate_index = new_index;
        vec![SessionCommand::SetRate(RATES[new_index])]
    }

    // ── Pointer ──

    pub fn handle_pointer(&mut self, event: PointerEvent, vp: Viewport) -> Vec<SessionCommand> {
        self.drag
            .handle(event, &mut self.timeline, vp)
            .into_iter()
            .map(SessionCommand::Playback)
            .collect()
    }

    // ── Sentence navigation (explicit only) ──

    pub fn next_sentence(&mut self) -> Vec<PlaybackCommand> {
        match self.timeline.current_cue {
            Some(cur) if !self.cues.is_empty() => {
                let next = (cur + 1).min(self.cues.len() - 1);
                controller::seek_to_cue(&mut self.timeline, &self.cues, next)
            }
            _ => Vec::new(),
        }
    }

    pub fn prev_sentence(&mut self) -> Vec<PlaybackCommand> {
        match self.timeline.current_cue {
            Some(cur) if !self.cues.is_empty() => {
                let prev = cur.saturating_sub(1);
                controller::seek_to_cue(&mut self.timeline, &self.cues, prev)
            }
            _ => Vec::new(),
        }
    }

    /// Jump to a cue picked directly (a subtitle-line click). Picking a
    /// line drops out of the A-B loop, as a direct override of it.
    pub fn select_cue(&mut self, index: usize) -> Vec<PlaybackCommand> {
        self.timeline.ab_loop_enabled = false;
        controller::seek_to_cue(&mut self.timeline, &self.cues, index)
    }

    // ── Recording status ──

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Recorder service reported a failure: revert the flag and surface
    /// the message. Nothing else in the engine is touched.
    pub fn recording_failed(&mut self, message: &str) {
        log::warn!("recording failed: {}", message);
        self.recording = false;
        self.set_hint(message);
    }

    // ── Hints ──

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn rate(&self) -> f32 {
        RATES[self.rate_index]
    }

    fn set_hint(&mut self, text: &str) {
        self.hint = Some(text.to_string());
        self.hint_expires = Some(Instant::now() + HINT_TTL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drag::Modifiers;

    fn session_with_media() -> Session {
        let mut s = Session::new();
        s.load_media(60.0);
        s
    }

    // ── Key table ──

    #[test]
    fn space_toggles_play_pause() {
        let mut s = session_with_media();
        assert_eq!(s.handle_key(Key::Space), vec![SessionCommand::TogglePlayPause]);
    }

    #[test]
    fn arrows_seek_five_seconds_clamped() {
        let mut s = session_with_media();
        s.timeline.position = 3.0;
        assert_eq!(
            s.handle_key(Key::Left),
            vec![SessionCommand::Playback(PlaybackCommand::SeekTo(0.0))]
        );
        s.timeline.position = 58.0;
        assert_eq!(
            s.handle_key(Key::Right),
            vec![SessionCommand::Playback(PlaybackCommand::SeekTo(60.0))]
        );
    }

    #[test]
    fn arrows_ignored_without_media() {
        let mut s = Session::new();
        assert!(s.handle_key(Key::Left).is_empty());
        assert!(s.handle_key(Key::Right).is_empty());
    }

    #[test]
    fn rate_steps_one_entry_and_clamps() {
        let mut s = session_with_media();
        assert_eq!(s.rate(), 1.0);
        assert_eq!(s.handle_key(Key::Up), vec![SessionCommand::SetRate(1.25)]);
        assert_eq!(s.handle_key(Key::Down), vec![SessionCommand::SetRate(1.0)]);

        for _ in 0..10 {
            s.handle_key(Key::Up);
        }
        assert_eq!(s.rate(), 2.0);
        // Clamped at the top: no command when nothing changes.
        assert!(s.handle_key(Key::Up).is_empty());

        for _ in 0..10 {
            s.handle_key(Key::Down);
        }
        assert_eq!(s.rate(), 0.25);
        assert!(s.handle_key(Key::Down).is_empty());
    }

    #[test]
    fn point_keys_capture_current_position() {
        let mut s = session_with_media();
        s.timeline.position = 12.5;
        s.handle_key(Key::A);
        s.timeline.position = 20.0;
        s.handle_key(Key::B);
        assert_eq!(s.timeline.point_a, Some(12.5));
        assert_eq!(s.timeline.point_b, Some(20.0));
        assert_eq!(s.hint(), Some("Point B set"));
    }

    #[test]
    fn loop_toggle_requires_both_points() {
        let mut s = session_with_media();
        s.handle_key(Key::L);
        assert!(!s.timeline.ab_loop_enabled);
        assert!(s.hint().is_none());

        s.timeline.set_point_a(1.0);
        s.timeline.set_point_b(2.0);
        s.handle_key(Key::L);
        assert!(s.timeline.ab_loop_enabled);
        assert_eq!(s.hint(), Some("Loop on"));
        s.handle_key(Key::L);
        assert!(!s.timeline.ab_loop_enabled);
        assert_eq!(s.hint(), Some("Loop off"));
    }

    #[test]
    fn clear_key_drops_points_and_loop() {
        let mut s = session_with_media();
        s.timeline.set_point_a(1.0);
        s.timeline.set_point_b(2.0);
        s.timeline.toggle_ab_loop();
        s.handle_key(Key::C);
        assert!(s.timeline.point_a.is_none());
        assert!(!s.timeline.ab_loop_enabled);
    }

    #[test]
    fn recording_toggle_round_trip() {
        let mut s = session_with_media();
        assert_eq!(s.handle_key(Key::R), vec![SessionCommand::StartRecording]);
        assert!(s.is_recording());
        assert_eq!(s.handle_key(Key::R), vec![SessionCommand::StopRecording]);
        assert!(!s.is_recording());
    }

    #[test]
    fn recording_failure_reverts_and_surfaces_message() {
        let mut s = session_with_media();
        s.handle_key(Key::R);
        s.recording_failed("Microphone unavailable, check permissions");
        assert!(!s.is_recording());
        assert_eq!(s.hint(), Some("Microphone unavailable, check permissions"));
    }

    // ── Hint / help independence ──

    #[test]
    fn help_and_hint_are_independent() {
        let mut s = session_with_media();
        s.handle_key(Key::F);
        assert!(s.help_open);
        s.handle_key(Key::A);
        assert!(s.hint().is_some());
        assert!(s.help_open);

        s.handle_key(Key::Escape);
        assert!(s.hint().is_none());
        assert!(!s.help_open);
    }

    #[test]
    fn hint_expires_on_tick() {
        let mut s = session_with_media();
        s.handle_key(Key::A);
        assert!(s.hint().is_some());

        // Force the deadline into the past instead of sleeping.
        s.hint_expires = Instant::now().checked_sub(Duration::from_secs(1));
        s.on_tick(0.1);
        assert!(s.hint().is_none());
    }

    // ── Navigation ──

    fn with_cues(s: &mut Session) {
        s.load_subtitles(
            "00:00:00,000 --> 00:00:02,000\nHi\n\n00:00:02,000 --> 00:00:04,000\nthere\n\n00:00:04,000 --> 00:00:06,000\nfriend",
        );
    }

    #[test]
    fn sentence_navigation_is_explicit_and_clamped() {
        let mut s = session_with_media();
        with_cues(&mut s);

        // Nothing selected yet: navigation is a no-op.
        assert!(s.next_sentence().is_empty());

        s.on_tick(2.5);
        assert_eq!(s.timeline.current_cue, Some(1));

        let cmds = s.next_sentence();
        assert_eq!(cmds, vec![PlaybackCommand::SeekTo(4.0), PlaybackCommand::Resume]);
        assert_eq!(s.timeline.current_cue, Some(2));

        // Clamped at the last cue.
        s.next_sentence();
        assert_eq!(s.timeline.current_cue, Some(2));

        s.prev_sentence();
        s.prev_sentence();
        s.prev_sentence();
        assert_eq!(s.timeline.current_cue, Some(0));
    }

    #[test]
    fn selecting_a_cue_disables_ab_loop() {
        let mut s = session_with_media();
        with_cues(&mut s);
        s.timeline.set_point_a(1.0);
        s.timeline.set_point_b(2.0);
        s.timeline.toggle_ab_loop();

        let cmds = s.select_cue(1);
        assert_eq!(cmds, vec![PlaybackCommand::SeekTo(2.0), PlaybackCommand::Resume]);
        assert!(!s.timeline.ab_loop_enabled);
    }

    // ── Pointer delegation ──

    #[test]
    fn pointer_click_becomes_playback_command() {
        let mut s = session_with_media();
        let vp = Viewport::default();
        s.handle_pointer(PointerEvent::Down { x: 360.0, modifiers: Modifiers::NONE }, vp);
        let cmds = s.handle_pointer(PointerEvent::Up { x: 360.0 }, vp);
        assert_eq!(
            cmds,
            vec![
                SessionCommand::Playback(PlaybackCommand::SeekTo(30.0)),
                SessionCommand::Playback(PlaybackCommand::Resume),
            ]
        );
    }

    // ── Lifecycle ──

    #[test]
    fn loading_new_media_resets_timeline_keeps_rate_and_cues() {
        let mut s = session_with_media();
        with_cues(&mut s);
        s.handle_key(Key::Up);
        s.timeline.set_point_a(1.0);
        s.timeline.set_point_b(2.0);

        s.load_media(90.0);
        assert_eq!(s.timeline.duration(), Some(90.0));
        assert!(s.timeline.point_a.is_none());
        assert_eq!(s.rate(), 1.25);
        assert_eq!(s.cues.len(), 3);
    }
}
