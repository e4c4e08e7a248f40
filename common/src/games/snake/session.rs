use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use crate::games::SessionRng;
use crate::log;
use crate::scheduler::{Clock, ScheduleHandle, Scheduler};
use super::game_state::{GameState, TickOutcome};
use super::settings::GameSettings;
use super::types::{Direction, GameMode, GameStatus};

/// Where a session reads and saves per-mode high scores. Saves must keep the
/// stored maximum (a lower score never overwrites a higher one) and are
/// best-effort: failures are the implementation's to report.
pub trait HighScorePersistence: Send + Sync {
    fn high_score(&self, mode: GameMode) -> u32;
    fn save_high_score(&self, mode: GameMode, score: u32);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The callback belongs to a superseded session generation.
    Stale,
    /// The session is not playing.
    Inactive,
    /// Less than `speed` has elapsed since the last tick.
    Waiting,
    Ticked(TickOutcome),
}

/// Owns one human game: buffered input, lifecycle and the hand-off to
/// persistence. Time is supplied by the caller so the controller stays
/// independent of any real timer.
pub struct SessionController {
    state: GameState,
    settings: GameSettings,
    rng: SessionRng,
    persistence: Arc<dyn HighScorePersistence>,
    generation: u64,
    last_tick_at: Option<Duration>,
}

impl SessionController {
    pub fn new(
        mode: GameMode,
        settings: GameSettings,
        mut rng: SessionRng,
        persistence: Arc<dyn HighScorePersistence>,
    ) -> Self {
        let state = GameState::new(mode, persistence.high_score(mode), &settings, &mut rng);
        Self {
            state,
            settings,
            rng,
            persistence,
            generation: 0,
            last_tick_at: None,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Bumped whenever previously scheduled ticks must stop applying.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn supersede(&mut self) {
        self.generation += 1;
        self.last_tick_at = None;
    }

    fn fresh_state(&mut self, mode: GameMode) -> GameState {
        let high_score = self.persistence.high_score(mode);
        GameState::new(mode, high_score, &self.settings, &mut self.rng)
    }

    /// idle / game-over -> playing with a fresh board.
    pub fn start(&mut self) -> bool {
        if !matches!(self.state.status, GameStatus::Idle | GameStatus::GameOver) {
            return false;
        }
        let mut state = self.fresh_state(self.state.mode);
        state.status = GameStatus::Playing;
        self.state = state;
        self.supersede();
        log!("Session started in {} mode", self.state.mode);
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.state.status != GameStatus::Playing {
            return false;
        }
        self.state.status = GameStatus::Paused;
        self.supersede();
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.state.status != GameStatus::Paused {
            return false;
        }
        self.state.status = GameStatus::Playing;
        self.supersede();
        true
    }

    pub fn toggle_pause(&mut self) -> bool {
        match self.state.status {
            GameStatus::Playing => self.pause(),
            GameStatus::Paused => self.resume(),
            GameStatus::Idle | GameStatus::GameOver => false,
        }
    }

    /// Any state -> idle with a fresh board and the stored high score.
    pub fn restart(&mut self) {
        self.state = self.fresh_state(self.state.mode);
        self.supersede();
    }

    pub fn set_mode(&mut self, mode: GameMode) {
        self.state = self.fresh_state(mode);
        self.supersede();
    }

    /// Buffers `direction` for the next tick. Reversals of the committed
    /// direction are dropped here; otherwise the latest request wins.
    pub fn request_direction(&mut self, direction: Direction) -> bool {
        if !matches!(self.state.status, GameStatus::Playing | GameStatus::Paused) {
            return false;
        }
        if direction.is_opposite(&self.state.direction) {
            return false;
        }
        self.state.next_direction = direction;
        true
    }

    /// Scheduling callback. Applies one tick once `speed` has elapsed since
    /// the previous one; the first frame after (re)starting only records the
    /// baseline.
    pub fn on_frame(&mut self, generation: u64, now: Duration) -> FrameOutcome {
        if generation != self.generation {
            return FrameOutcome::Stale;
        }
        if self.state.status != GameStatus::Playing {
            return FrameOutcome::Inactive;
        }

        let Some(last) = self.last_tick_at else {
            self.last_tick_at = Some(now);
            return FrameOutcome::Waiting;
        };
        if now.saturating_sub(last) < self.state.speed() {
            return FrameOutcome::Waiting;
        }

        self.last_tick_at = Some(now);
        let (next, outcome) =
            self.state
                .advance(self.state.next_direction, &self.settings, &mut self.rng);
        self.state = next;

        if let TickOutcome::Collided(_) = outcome {
            self.persistence
                .save_high_score(self.state.mode, self.state.score);
        }
        FrameOutcome::Ticked(outcome)
    }
}

/// Drives a [`SessionController`] from a [`Scheduler`]. Every lifecycle call
/// cancels the previous registration before any new one is made, and each
/// registration carries the generation it was created for.
pub struct GameRunner {
    controller: Arc<Mutex<SessionController>>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    handle: Option<ScheduleHandle>,
}

impl GameRunner {
    pub fn new(
        controller: SessionController,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
            scheduler,
            clock,
            handle: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionController> {
        self.controller.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> GameState {
        self.lock().state().clone()
    }

    pub fn is_scheduled(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_cancelled())
    }

    pub fn start(&mut self) -> bool {
        let started = self.lock().start();
        self.sync_schedule();
        started
    }

    pub fn pause(&mut self) -> bool {
        let paused = self.lock().pause();
        self.sync_schedule();
        paused
    }

    pub fn resume(&mut self) -> bool {
        let resumed = self.lock().resume();
        self.sync_schedule();
        resumed
    }

    pub fn toggle_pause(&mut self) -> bool {
        let toggled = self.lock().toggle_pause();
        self.sync_schedule();
        toggled
    }

    pub fn restart(&mut self) {
        self.lock().restart();
        self.sync_schedule();
    }

    pub fn set_mode(&mut self, mode: GameMode) {
        self.lock().set_mode(mode);
        self.sync_schedule();
    }

    pub fn request_direction(&self, direction: Direction) -> bool {
        self.lock().request_direction(direction)
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }

    fn sync_schedule(&mut self) {
        self.stop();

        let (playing, generation, frame_interval) = {
            let controller = self.lock();
            (
                controller.state().status == GameStatus::Playing,
                controller.generation(),
                controller.settings().frame_interval(),
            )
        };
        if !playing {
            return;
        }

        let controller = Arc::clone(&self.controller);
        let clock = Arc::clone(&self.clock);
        let own_handle: Arc<OnceLock<ScheduleHandle>> = Arc::new(OnceLock::new());
        let slot = Arc::clone(&own_handle);
        let handle = self.scheduler.schedule_tick(
            frame_interval,
            Box::new(move || {
                let mut controller = controller.lock().unwrap_or_else(PoisonError::into_inner);
                let outcome = controller.on_frame(generation, clock.now());
                // Game over deregisters the callback.
                if matches!(outcome, FrameOutcome::Ticked(TickOutcome::Collided(_)))
                    && let Some(handle) = slot.get()
                {
                    handle.cancel();
                }
            }),
        );
        let _ = own_handle.set(handle.clone());
        self.handle = Some(handle);
    }
}

impl Drop for GameRunner {
    fn drop(&mut self) {
        self.stop();
    }
}
