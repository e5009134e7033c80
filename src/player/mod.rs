//! Playback collaborator: the controller only sees [`PlaybackElement`].

mod mpv;

use crate::error::Result;

pub(crate) use mpv::MpvPlayer;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PlayerEvent {
    /// Duration became known.
    MetadataReady(f64),
    TimeAdvanced(f64),
    Play,
    Pause,
    Ended,
}

pub(crate) trait PlaybackElement {
    fn set_src(&mut self, url: &str);
    /// Prepares the current source; playback starts paused.
    fn load(&mut self) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn has_ended(&self) -> bool;
    fn current_time(&self) -> f64;
    fn seek(&mut self, seconds: f64);
    /// Zero until metadata is ready.
    fn duration(&self) -> f64;
    fn poll_events(&mut self) -> Vec<PlayerEvent>;
    /// Tears the player down; a later `load` starts over.
    fn stop(&mut self);
}

/// What a player reported at one instant. Players that can only be polled
/// feed these into an [`EventTracker`] to get lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct PlaybackSnapshot {
    pub(crate) time_pos: Option<f64>,
    pub(crate) duration: Option<f64>,
    pub(crate) paused: bool,
    pub(crate) eof: bool,
}

#[derive(Debug, Default)]
pub(crate) struct EventTracker {
    duration_known: bool,
    last_time: Option<f64>,
    last_paused: Option<bool>,
    ended: bool,
}

impl EventTracker {
    pub(crate) fn observe(&mut self, snapshot: &PlaybackSnapshot) -> Vec<PlayerEvent> {
        let mut events = Vec::new();

        if !self.duration_known
            && let Some(duration) = snapshot.duration.filter(|d| *d > 0.0)
        {
            self.duration_known = true;
            events.push(PlayerEvent::MetadataReady(duration));
        }

        match (self.last_paused, snapshot.paused) {
            (None | Some(true), false) => events.push(PlayerEvent::Play),
            // Reaching the end pauses too; that is reported as Ended alone.
            (Some(false), true) if !snapshot.eof => events.push(PlayerEvent::Pause),
            _ => {}
        }
        self.last_paused = Some(snapshot.paused);

        if let Some(time) = snapshot.time_pos
            && self.last_time != Some(time)
        {
            self.last_time = Some(time);
            events.push(PlayerEvent::TimeAdvanced(time));
        }

        if snapshot.eof && !self.ended {
            events.push(PlayerEvent::Ended);
        }
        self.ended = snapshot.eof;

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(time: f64, paused: bool) -> PlaybackSnapshot {
        PlaybackSnapshot {
            time_pos: Some(time),
            duration: Some(1200.0),
            paused,
            eof: false,
        }
    }

    #[test]
    fn first_snapshot_reports_metadata_and_initial_state() {
        let mut tracker = EventTracker::default();
        assert_eq!(
            tracker.observe(&snapshot(0.0, true)),
            vec![PlayerEvent::MetadataReady(1200.0), PlayerEvent::TimeAdvanced(0.0)]
        );
    }

    #[test]
    fn unknown_duration_defers_metadata() {
        let mut tracker = EventTracker::default();
        let loading = PlaybackSnapshot {
            paused: true,
            ..PlaybackSnapshot::default()
        };
        assert!(tracker.observe(&loading).is_empty());
        assert_eq!(
            tracker.observe(&snapshot(0.0, true))[0],
            PlayerEvent::MetadataReady(1200.0)
        );
    }

    #[test]
    fn pause_transitions_are_reported_once() {
        let mut tracker = EventTracker::default();
        tracker.observe(&snapshot(0.0, true));
        assert_eq!(
            tracker.observe(&snapshot(1.0, false)),
            vec![PlayerEvent::Play, PlayerEvent::TimeAdvanced(1.0)]
        );
        assert!(tracker.observe(&snapshot(1.0, false)).is_empty());
        assert_eq!(tracker.observe(&snapshot(1.0, true)), vec![PlayerEvent::Pause]);
    }

    #[test]
    fn end_of_file_reports_ended_without_pause() {
        let mut tracker = EventTracker::default();
        tracker.observe(&snapshot(1190.0, false));
        let at_end = PlaybackSnapshot {
            eof: true,
            ..snapshot(1200.0, true)
        };
        assert_eq!(
            tracker.observe(&at_end),
            vec![PlayerEvent::TimeAdvanced(1200.0), PlayerEvent::Ended]
        );
        assert!(tracker.observe(&at_end).is_empty());
    }
}
