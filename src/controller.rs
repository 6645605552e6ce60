use crate::subtitle::SubtitleCue;
use crate::timeline::Timeline;

/// Command for the external playback engine. The controller never touches
/// the engine directly; it only emits these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackCommand {
    SeekTo(f64),
    Resume,
}

/// Decide what playback should do for one reported position tick.
///
/// Evaluated on every tick from the playback clock (~4-60 Hz). Mutates the
/// timeline (position mirror, cue selection) and returns the commands the
/// host must forward to the playback engine, in order.
///
/// Priority: A-B loop first, sentence loop second. While the A-B loop is
/// engaged, cue tracking is suspended entirely.
pub fn on_tick(
    timeline: &mut Timeline,
    cues: &[SubtitleCue],
    reported_position: f64,
) -> Vec<PlaybackCommand> {
    timeline.position = reported_position;

    // No usable duration yet: stay inert so no seek can go anywhere bogus.
    if !timeline.has_media() {
        return Vec::new();
    }

    if timeline.ab_loop_enabled {
        if let Some((lo, hi)) = timeline.loop_span() {
            if reported_position >= hi {
                let target = timeline.clamp_seek(lo);
                log::trace!("A-B wrap: {:.3} >= {:.3}, seeking {:.3}", reported_position, hi, target);
                return vec![PlaybackCommand::SeekTo(target), PlaybackCommand::Resume];
            }
            return Vec::new();
        }
    }

    // Sentence mode: first cue whose half-open span contains the position.
    let matched = cues
        .iter()
        .position(|c| c.start <= reported_position && reported_position < c.end);

    match matched {
        Some(idx) => {
            if timeline.current_cue != Some(idx) {
                timeline.current_cue = Some(idx);
            }
            Vec::new()
        }
        None => {
            // Ran past the end of the selected cue: repeat it. Advancing to
            // the next sentence only ever happens via explicit navigation.
            if let Some(cur) = timeline.current_cue {
                if let Some(cue) = cues.get(cur) {
                    if reported_position >= cue.end {
                        let target = timeline.clamp_seek(cue.start);
                        return vec![PlaybackCommand::SeekTo(target), PlaybackCommand::Resume];
                    }
                }
            }
            // Plain gap (or backward seek out of the cue): drop selection.
            timeline.current_cue = None;
            Vec::new()
        }
    }
}

/// Jump playback to a cue's start and select it. Used by explicit
/// navigation (next/previous sentence, subtitle-line clicks).
pub fn seek_to_cue(
    timeline: &mut Timeline,
    cues: &[SubtitleCue],
    index: usize,
) -> Vec<PlaybackCommand> {
    match cues.get(index) {
        Some(cue) => {
            timeline.current_cue = Some(index);
            let target = timeline.clamp_seek(cue.start);
            vec![PlaybackCommand::SeekTo(target), PlaybackCommand::Resume]
        }
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cues() -> Vec<SubtitleCue> {
        vec![
            SubtitleCue { start: 0.0, end: 2.0, text: "Hi".into() },
            SubtitleCue { start: 2.0, end: 4.0, text: "there".into() },
        ]
    }

    fn timeline(duration: f64) -> Timeline {
        let mut tl = Timeline::new();
        tl.set_duration(duration);
        tl
    }

    // ── Inert states ──

    #[test]
    fn inert_without_duration() {
        let mut tl = Timeline::new();
        let cmds = on_tick(&mut tl, &cues(), 1.0);
        assert!(cmds.is_empty());
        assert!(tl.current_cue.is_none());
        // Position mirror still updates.
        assert_eq!(tl.position, 1.0);
    }

    // ── A-B loop ──

    #[test]
    fn ab_loop_wraps_at_upper_bound() {
        let mut tl = timeline(60.0);
        tl.set_point_a(2.0);
        tl.set_point_b(5.0);
        tl.toggle_ab_loop();

        assert!(on_tick(&mut tl, &[], 4.0).is_empty());
        let cmds = on_tick(&mut tl, &[], 5.0);
        assert_eq!(cmds, vec![PlaybackCommand::SeekTo(2.0), PlaybackCommand::Resume]);
    }

    #[test]
    fn ab_loop_uses_min_max_when_points_reversed() {
        let mut tl = timeline(60.0);
        tl.set_point_a(5.0);
        tl.set_point_b(2.0);
        tl.toggle_ab_loop();

        let cmds = on_tick(&mut tl, &[], 5.5);
        assert_eq!(cmds, vec![PlaybackCommand::SeekTo(2.0), PlaybackCommand::Resume]);
    }

    #[test]
    fn ab_loop_suppresses_cue_tracking() {
        let mut tl = timeline(60.0);
        tl.set_point_a(0.5);
        tl.set_point_b(10.0);
        tl.toggle_ab_loop();

        on_tick(&mut tl, &cues(), 1.0);
        assert!(tl.current_cue.is_none());
    }

    // ── Sentence loop ──

    #[test]
    fn cue_selection_tracks_position() {
        let mut tl = timeline(60.0);
        let cues = cues();

        on_tick(&mut tl, &cues, 0.5);
        assert_eq!(tl.current_cue, Some(0));

        on_tick(&mut tl, &cues, 3.9);
        assert_eq!(tl.current_cue, Some(1));
    }

    #[test]
    fn sentence_repeats_at_cue_end() {
        let mut tl = timeline(60.0);
        let cues = cues();

        assert!(on_tick(&mut tl, &cues, 3.9).is_empty());
        assert_eq!(tl.current_cue, Some(1));

        let cmds = on_tick(&mut tl, &cues, 4.0);
        assert_eq!(cmds, vec![PlaybackCommand::SeekTo(2.0), PlaybackCommand::Resume]);
        // Selection survives the loop-back; the next tick lands inside.
        assert_eq!(tl.current_cue, Some(1));
        assert!(on_tick(&mut tl, &cues, 2.05).is_empty());
        assert_eq!(tl.current_cue, Some(1));
    }

    #[test]
    fn gap_clears_selection_without_seeking() {
        let gapped = vec![
            SubtitleCue { start: 0.0, end: 1.0, text: "a".into() },
            SubtitleCue { start: 5.0, end: 6.0, text: "b".into() },
        ];
        let mut tl = timeline(60.0);

        on_tick(&mut tl, &gapped, 5.5);
        assert_eq!(tl.current_cue, Some(1));

        // Backward seek into the gap: no cue, selected cue's end not reached.
        let cmds = on_tick(&mut tl, &gapped, 3.0);
        assert!(cmds.is_empty());
        assert!(tl.current_cue.is_none());

        // Still in the gap with nothing selected: stays quiet.
        assert!(on_tick(&mut tl, &gapped, 3.5).is_empty());
        assert!(tl.current_cue.is_none());
    }

    #[test]
    fn no_cues_means_free_play() {
        let mut tl = timeline(60.0);
        assert!(on_tick(&mut tl, &[], 10.0).is_empty());
        assert!(tl.current_cue.is_none());
    }

    // ── Explicit navigation ──

    #[test]
    fn seek_to_cue_selects_and_seeks() {
        let mut tl = timeline(60.0);
        let cues = cues();

        let cmds = seek_to_cue(&mut tl, &cues, 1);
        assert_eq!(cmds, vec![PlaybackCommand::SeekTo(2.0), PlaybackCommand::Resume]);
        assert_eq!(tl.current_cue, Some(1));

        assert!(seek_to_cue(&mut tl, &cues, 7).is_empty());
        assert_eq!(tl.current_cue, Some(1));
    }
}
