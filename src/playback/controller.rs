//! The playback state machine
//!
//! [`PlaybackController`] owns one [`PlaybackSession`] at a time and moves it
//! through the [`PlaybackState`]s in response to entry-point calls and
//! scheduler wakeups. Nothing here blocks: every wait is a wakeup scheduled
//! on the injected [`Scheduler`].

use std::collections::VecDeque;
use tracing::{debug, info, warn};

use super::scheduler::{ManualScheduler, RealtimeScheduler, Scheduler, TimerHandle, Wakeup};
use super::types::{Countdown, CountdownKind, PlaybackEvent, PlaybackState};
use crate::config::Config;
use crate::duration::MIN_BPM;
use crate::error::HymnError;
use crate::layout::StanzaLayout;
use crate::model::Hymn;
use crate::reconcile::LoadWarning;
use crate::structure::StructureResolver;

/// Countdowns tick once per second.
const COUNTDOWN_TICK_MS: u64 = 1000;

/// Shortest wait used when a held note is rescheduled after a tempo change.
const MIN_RESCHEDULE_MS: u64 = 10;

/// Timing of the note currently sounding.
///
/// A note may be waited on in several segments (pause/resume, tempo changes);
/// `segment_ms` is what is left of it from `segment_started_at`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct NoteTiming {
    duration_ms: u64,
    segment_ms: u64,
    segment_started_at: u64,
}

impl NoteTiming {
    fn start(duration_ms: u64, now: u64) -> Self {
        Self {
            duration_ms,
            segment_ms: duration_ms,
            segment_started_at: now,
        }
    }

    fn remaining_at(&self, now: u64) -> u64 {
        let elapsed = now.saturating_sub(self.segment_started_at);
        self.segment_ms.saturating_sub(elapsed)
    }
}

/// Mutable state of one playback run. Replaced on every load.
#[derive(Debug, Default)]
struct PlaybackSession {
    id: u64,
    stanza_index: usize,
    token_index: usize,
    layout: StanzaLayout,
    structure: StructureResolver,
    timing: NoteTiming,
    highlighted: Option<usize>,
    pending: Option<TimerHandle>,
    generation: u64,
    countdown: Option<Countdown>,
}

impl PlaybackSession {
    fn new(id: u64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

/// Karaoke playback engine for one hymn.
///
/// # Example
/// ```rust
/// use hymnal::playback::{PlaybackController, PlaybackEvent, PlaybackState};
/// use hymnal::{Config, Hymn, Line, Stanza};
///
/// let hymn = Hymn {
///     title: "Amém".to_string(),
///     bpm: Some(60),
///     stanzas: vec![Stanza::verse(1, vec![Line::with_codes("A - mém", &["sm", "m"])])],
///     ..Hymn::default()
/// };
/// let config = Config { start_delay_sec: 0, ..Config::default() };
///
/// let mut player = PlaybackController::manual(config);
/// player.load(hymn).unwrap();
/// player.start().unwrap();
/// assert_eq!(player.state(), PlaybackState::Playing);
///
/// player.advance_clock(3000);
/// assert_eq!(player.state(), PlaybackState::Finished);
/// assert!(player.drain_events().contains(&PlaybackEvent::Finished));
/// ```
#[derive(Debug)]
pub struct PlaybackController<S: Scheduler> {
    scheduler: S,
    config: Config,
    hymn: Option<Hymn>,
    chorus: Option<usize>,
    bpm: u32,
    state: PlaybackState,
    session: PlaybackSession,
    next_session_id: u64,
    events: VecDeque<PlaybackEvent>,
}

impl PlaybackController<ManualScheduler> {
    /// Controller on a virtual clock starting at 0 ms.
    pub fn manual(config: Config) -> Self {
        Self::new(ManualScheduler::new(), config)
    }

    /// Move the virtual clock forward, firing every wakeup that falls due on
    /// the way at its own deadline.
    pub fn advance_clock(&mut self, ms: u64) {
        let target = self.scheduler.now_ms() + ms;
        while let Some(deadline) = self.scheduler.next_deadline() {
            if deadline > target {
                break;
            }
            self.scheduler.set_now(deadline);
            while let Some(wakeup) = self.scheduler.pop_due() {
                self.fire(wakeup);
            }
        }
        self.scheduler.set_now(target);
    }
}

impl PlaybackController<RealtimeScheduler> {
    pub fn realtime(config: Config) -> Self {
        Self::new(RealtimeScheduler::new(), config)
    }

    /// Deliver every wakeup whose deadline has passed. Returns how many were acted on.
    pub fn fire_due(&mut self) -> usize {
        let mut fired = 0;
        while let Some(wakeup) = self.scheduler.pop_due() {
            if self.fire(wakeup) {
                fired += 1;
            }
        }
        fired
    }
}

impl<S: Scheduler> PlaybackController<S> {
    pub fn new(scheduler: S, config: Config) -> Self {
        let bpm = config.default_bpm.max(MIN_BPM);
        Self {
            scheduler,
            config,
            hymn: None,
            chorus: None,
            bpm,
            state: PlaybackState::Idle,
            session: PlaybackSession::default(),
            next_session_id: 1,
            events: VecDeque::new(),
        }
    }

    // ---- accessors ----

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn hymn(&self) -> Option<&Hymn> {
        self.hymn.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn chorus_index(&self) -> Option<usize> {
        self.chorus
    }

    pub fn stanza_index(&self) -> usize {
        self.session.stanza_index
    }

    pub fn token_index(&self) -> usize {
        self.session.token_index
    }

    /// Layout of the loaded stanza (empty before the first load).
    pub fn layout(&self) -> &StanzaLayout {
        &self.session.layout
    }

    /// Token whose highlight is currently shown.
    pub fn highlighted_token(&self) -> Option<usize> {
        self.session.highlighted
    }

    /// Seconds left on the running countdown, if any.
    pub fn countdown_remaining(&self) -> Option<u32> {
        self.session.countdown.map(|countdown| countdown.remaining_secs)
    }

    /// Take every event emitted since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        self.events.drain(..).collect()
    }

    // ---- loading ----

    /// Load a hymn and rewind to its first stanza.
    ///
    /// Lines whose note codes don't fit their tokens are repaired; the repairs
    /// are returned and logged. An empty hymn is rejected and leaves the
    /// controller as it was.
    pub fn load(&mut self, mut hymn: Hymn) -> Result<Vec<LoadWarning>, HymnError> {
        if hymn.stanzas.is_empty() {
            return Err(HymnError::EmptyHymn);
        }

        let warnings = hymn.reconcile();
        for warning in &warnings {
            warn!(title = %hymn.title, "{}", warning);
        }

        self.halt();
        self.bpm = hymn.effective_bpm(&self.config);
        self.chorus = hymn.chorus_index();
        info!(
            title = %hymn.title,
            stanzas = hymn.stanzas.len(),
            chorus = ?self.chorus,
            bpm = self.bpm,
            "hymn loaded"
        );
        self.hymn = Some(hymn);
        self.session = PlaybackSession::new(self.next_session_id);
        self.next_session_id += 1;
        self.load_stanza(0);
        self.set_state(PlaybackState::Idle);
        Ok(warnings)
    }

    /// Parse a JSON document and load it.
    pub fn load_json(&mut self, json: &str) -> Result<Vec<LoadWarning>, HymnError> {
        let hymn = Hymn::from_json_str(json)?;
        self.load(hymn)
    }

    /// Load an edited version of the current hymn, keeping the selected
    /// stanza and the current tempo where possible.
    pub fn reload(&mut self, hymn: Hymn) -> Result<Vec<LoadWarning>, HymnError> {
        let stanza = self.session.stanza_index;
        let bpm = self.bpm;
        let was_loaded = self.hymn.is_some();

        let warnings = self.load(hymn)?;
        if was_loaded {
            self.bpm = bpm;
            if stanza > 0 && stanza < self.stanza_count() {
                self.load_stanza(stanza);
            } else {
                self.retime();
            }
        }
        Ok(warnings)
    }

    // ---- transport ----

    /// Start playing the loaded stanza, after the start countdown if one is
    /// configured. Starting a finished hymn rewinds it first.
    pub fn start(&mut self) -> Result<(), HymnError> {
        self.require_loaded()?;
        match self.state {
            PlaybackState::Idle => {}
            PlaybackState::Finished => self.load_stanza(0),
            other => {
                return Err(HymnError::InvalidTransition {
                    action: "start",
                    state: other.to_string(),
                })
            }
        }

        self.session.structure.reset();
        info!(stanza = self.session.stanza_index, bpm = self.bpm, "playback started");

        let delay = self.config.start_delay_sec;
        if delay > 0 {
            self.begin_countdown(CountdownKind::Start, delay, None, PlaybackState::CountdownToStart);
        } else {
            self.set_state(PlaybackState::Playing);
            self.play_current();
        }
        Ok(())
    }

    /// Freeze the current note, remembering how much of it is left.
    pub fn pause(&mut self) -> Result<(), HymnError> {
        if self.state != PlaybackState::Playing {
            return Err(HymnError::InvalidTransition {
                action: "pause",
                state: self.state.to_string(),
            });
        }
        let now = self.scheduler.now_ms();
        let remaining = self.session.timing.remaining_at(now);
        self.cancel_pending();
        self.session.timing.segment_ms = remaining;
        self.set_state(PlaybackState::Paused);
        debug!(token = self.session.token_index, remaining_ms = remaining, "paused");
        Ok(())
    }

    /// Continue the paused note for whatever was left of it.
    pub fn resume(&mut self) -> Result<(), HymnError> {
        if self.state != PlaybackState::Paused {
            return Err(HymnError::InvalidTransition {
                action: "resume",
                state: self.state.to_string(),
            });
        }
        let remaining = self.session.timing.segment_ms;
        self.set_state(PlaybackState::Playing);
        if remaining > 0 {
            self.session.timing.segment_started_at = self.scheduler.now_ms();
            self.schedule(remaining);
        } else {
            self.on_note_elapsed();
        }
        Ok(())
    }

    /// Play/pause button: pause while playing, resume while paused, start
    /// otherwise. Countdowns are left running.
    pub fn toggle(&mut self) -> Result<PlaybackState, HymnError> {
        match self.state {
            PlaybackState::Playing => self.pause()?,
            PlaybackState::Paused => self.resume()?,
            PlaybackState::Idle | PlaybackState::Finished => self.start()?,
            PlaybackState::CountdownToStart | PlaybackState::CountdownBetweenStanzas => {}
        }
        Ok(self.state)
    }

    /// Cancel everything and rewind to the first stanza.
    pub fn stop(&mut self) {
        self.halt();
        if self.hymn.is_some() {
            self.load_stanza(0);
        }
        self.set_state(PlaybackState::Idle);
    }

    // ---- navigation ----

    /// Stop and select stanza `index`. Playback resumes with [`start`](Self::start).
    pub fn jump_to_stanza(&mut self, index: usize) -> Result<(), HymnError> {
        self.require_loaded()?;
        let len = self.stanza_count();
        if index >= len {
            return Err(HymnError::StanzaOutOfRange { index, len });
        }
        self.halt();
        self.load_stanza(index);
        self.set_state(PlaybackState::Idle);
        Ok(())
    }

    pub fn jump_to_chorus(&mut self) -> Result<(), HymnError> {
        self.require_loaded()?;
        let chorus = self.chorus.ok_or(HymnError::NoChorus)?;
        self.jump_to_stanza(chorus)
    }

    /// Select the verse whose document number is `number`.
    pub fn jump_to_verse_number(&mut self, number: i64) -> Result<(), HymnError> {
        let index = self
            .hymn
            .as_ref()
            .ok_or(HymnError::NotLoaded)?
            .verse_index(number)
            .ok_or(HymnError::VerseNotFound(number))?;
        self.jump_to_stanza(index)
    }

    pub fn next_stanza(&mut self) -> Result<(), HymnError> {
        self.jump_to_stanza(self.session.stanza_index + 1)
    }

    /// Select the previous stanza; stays on the first one.
    pub fn previous_stanza(&mut self) -> Result<(), HymnError> {
        self.jump_to_stanza(self.session.stanza_index.saturating_sub(1))
    }

    /// Sing the current stanza again from its first syllable, without a countdown.
    pub fn restart_stanza(&mut self) -> Result<(), HymnError> {
        self.require_loaded()?;
        self.halt();
        self.load_stanza(self.session.stanza_index);
        self.session.structure.reset();
        self.set_state(PlaybackState::Playing);
        self.play_current();
        Ok(())
    }

    // ---- tempo ----

    /// Change the tempo, clamped to at least [`MIN_BPM`]. A note already
    /// sounding keeps its progress: if it was 25% done, it finishes after 75%
    /// of its duration at the new tempo.
    pub fn set_tempo(&mut self, bpm: i64) -> u32 {
        let bpm = bpm.clamp(i64::from(MIN_BPM), i64::from(u32::MAX)) as u32;
        if bpm == self.bpm {
            return bpm;
        }
        debug!(from = self.bpm, to = bpm, "tempo changed");
        self.bpm = bpm;
        self.retime();

        if matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            self.rescale_current_note();
        }
        self.emit(PlaybackEvent::TempoChanged { bpm });
        bpm
    }

    /// Step the tempo by `steps` times the configured BPM step.
    pub fn adjust_tempo(&mut self, steps: i64) -> u32 {
        let delta = steps.saturating_mul(i64::from(self.config.bpm_step));
        self.set_tempo(i64::from(self.bpm).saturating_add(delta))
    }

    // ---- scheduler callback ----

    /// Handle a wakeup delivered by the scheduler.
    ///
    /// Returns `false` for wakeups that no longer belong to the session
    /// (cancelled, superseded or from an earlier load); those are ignored.
    pub fn fire(&mut self, wakeup: Wakeup) -> bool {
        let current = wakeup.session == self.session.id
            && wakeup.generation == self.session.generation
            && self.session.pending.is_some();
        if !current {
            debug!(
                session = wakeup.session,
                generation = wakeup.generation,
                "ignoring stale wakeup"
            );
            return false;
        }
        self.session.pending = None;

        match self.state {
            PlaybackState::CountdownToStart | PlaybackState::CountdownBetweenStanzas => {
                self.on_countdown_tick();
                true
            }
            PlaybackState::Playing => {
                self.on_note_elapsed();
                true
            }
            other => {
                debug!(state = %other, "wakeup with nothing to do");
                false
            }
        }
    }

    // ---- internals ----

    fn require_loaded(&self) -> Result<(), HymnError> {
        match self.hymn {
            Some(_) => Ok(()),
            None => Err(HymnError::NotLoaded),
        }
    }

    fn stanza_count(&self) -> usize {
        self.hymn.as_ref().map_or(0, |hymn| hymn.stanzas.len())
    }

    fn emit(&mut self, event: PlaybackEvent) {
        self.events.push_back(event);
    }

    fn set_state(&mut self, to: PlaybackState) {
        let from = self.state;
        if from != to {
            debug!(%from, %to, "state change");
            self.state = to;
            self.emit(PlaybackEvent::StateChanged { from, to });
        }
    }

    fn schedule(&mut self, delay_ms: u64) {
        self.cancel_pending();
        let wakeup = Wakeup {
            session: self.session.id,
            generation: self.session.generation,
        };
        self.session.pending = Some(self.scheduler.schedule(delay_ms, wakeup));
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.session.pending.take() {
            self.scheduler.cancel(handle);
        }
        self.session.generation += 1;
    }

    /// Cancel the pending wakeup, drop the highlight and any countdown.
    fn halt(&mut self) {
        self.cancel_pending();
        self.clear_highlight();
        self.session.countdown = None;
        self.session.timing = NoteTiming::default();
    }

    fn clear_highlight(&mut self) {
        if let Some(token) = self.session.highlighted.take() {
            let stanza = self.session.stanza_index;
            self.emit(PlaybackEvent::TokenCleared { stanza, token });
        }
    }

    fn load_stanza(&mut self, index: usize) {
        let Some(hymn) = self.hymn.as_ref() else {
            return;
        };
        let Some(stanza) = hymn.stanzas.get(index) else {
            return;
        };
        let layout = StanzaLayout::build(stanza, self.bpm, &hymn.unit_note_value, &self.config);
        let label = hymn.stanza_label(index);

        self.session.stanza_index = index;
        self.session.token_index = 0;
        self.session.layout = layout;
        debug!(index, %label, "stanza loaded");
        self.emit(PlaybackEvent::StanzaChanged { index, label });
    }

    fn retime(&mut self) {
        if let Some(hymn) = self.hymn.as_ref() {
            self.session
                .layout
                .retime(self.bpm, &hymn.unit_note_value, &self.config);
        }
    }

    fn begin_countdown(
        &mut self,
        kind: CountdownKind,
        seconds: u32,
        target: Option<usize>,
        state: PlaybackState,
    ) {
        self.session.countdown = Some(Countdown {
            kind,
            remaining_secs: seconds,
            target,
        });
        self.set_state(state);
        self.emit(PlaybackEvent::Countdown {
            kind,
            remaining_secs: seconds,
        });
        self.schedule(COUNTDOWN_TICK_MS);
    }

    fn on_countdown_tick(&mut self) {
        let Some(mut countdown) = self.session.countdown else {
            return;
        };
        countdown.remaining_secs = countdown.remaining_secs.saturating_sub(1);

        if countdown.remaining_secs > 0 {
            self.session.countdown = Some(countdown);
            self.emit(PlaybackEvent::Countdown {
                kind: countdown.kind,
                remaining_secs: countdown.remaining_secs,
            });
            self.schedule(COUNTDOWN_TICK_MS);
            return;
        }

        self.session.countdown = None;
        if let Some(target) = countdown.target {
            self.load_stanza(target);
        }
        self.set_state(PlaybackState::Playing);
        self.play_current();
    }

    /// Highlight the token at the current index and wait for its duration.
    fn play_current(&mut self) {
        self.clear_highlight();

        let index = self.session.token_index;
        let Some(step) = self.session.layout.steps.get(index) else {
            self.finish_stanza();
            return;
        };
        let duration = u64::from(step.duration_ms);
        let span = step.span;

        if let Some(span) = span {
            let text = self
                .session
                .layout
                .highlighted_text(index)
                .unwrap_or_default()
                .to_string();
            self.session.highlighted = Some(index);
            self.emit(PlaybackEvent::TokenHighlighted {
                stanza: self.session.stanza_index,
                token: index,
                text,
                span,
            });
        }

        self.session.timing = NoteTiming::start(duration, self.scheduler.now_ms());
        self.schedule(duration);
    }

    fn on_note_elapsed(&mut self) {
        self.clear_highlight();
        self.session.token_index += 1;
        self.play_current();
    }

    fn finish_stanza(&mut self) {
        let count = self.stanza_count();
        let current = self.session.stanza_index;
        let next = self
            .session
            .structure
            .next_stanza_index(count, current, self.chorus);

        match next {
            Some(index) => {
                let kind = CountdownKind::NextStanza {
                    index,
                    chorus: self.chorus == Some(index),
                };
                let delay = self.config.effective_inter_stanza_delay_sec();
                debug!(from = current, to = index, delay, "stanza finished");
                self.begin_countdown(kind, delay, Some(index), PlaybackState::CountdownBetweenStanzas);
            }
            None => {
                self.session.timing = NoteTiming::default();
                self.set_state(PlaybackState::Finished);
                info!("hymn finished");
                self.emit(PlaybackEvent::Finished);
            }
        }
    }

    /// Carry the current note's progress over to its new duration.
    fn rescale_current_note(&mut self) {
        let Some(step) = self.session.layout.steps.get(self.session.token_index) else {
            return;
        };
        let new_duration = u64::from(step.duration_ms);
        let now = self.scheduler.now_ms();
        let timing = self.session.timing;

        let remaining = match self.state {
            PlaybackState::Paused => timing.segment_ms,
            _ => timing.remaining_at(now),
        };
        let ratio = if timing.duration_ms == 0 {
            1.0
        } else {
            timing.duration_ms.saturating_sub(remaining) as f64 / timing.duration_ms as f64
        };
        let rescheduled =
            ((new_duration as f64 * (1.0 - ratio)).round() as u64).max(MIN_RESCHEDULE_MS);

        self.session.timing = NoteTiming {
            duration_ms: new_duration,
            segment_ms: rescheduled,
            segment_started_at: now,
        };
        if self.state == PlaybackState::Playing {
            self.schedule(rescheduled);
        }
    }
}
