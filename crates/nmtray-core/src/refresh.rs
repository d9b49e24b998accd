// ── Periodic refresh driver ──
//
// Two timers on the foreground: the refresh tick re-resolves the display
// state unconditionally, the frame timer advances transitional animations.
// Registry version changes trigger an immediate re-resolve as well. The
// frame timer only runs while the display kind is transitional, and is
// restarted from phase 0 whenever the kind changes.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::model::{DisplayKind, DisplayState, DisplayView};
use crate::resolver::{Resolution, ResolverInput, resolve};
use crate::store::Registry;

/// Receives every rendered view. Implemented by the presentation layer.
pub trait Presenter {
    fn render(&mut self, view: &DisplayView);
}

// ── Animation ────────────────────────────────────────────────────────

/// What the frame timer should do after a state observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameTimerAction {
    /// Stop any running timer and start a fresh one.
    Restart,
    /// Stop any running timer.
    Stop,
    /// Leave the timer alone.
    Keep,
}

/// Tracks the displayed kind and the current animation phase.
#[derive(Debug, Default, Clone)]
pub struct Animation {
    kind: Option<DisplayKind>,
    phase: usize,
}

impl Animation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the freshly resolved state.
    pub fn observe(&mut self, state: DisplayState) -> FrameTimerAction {
        let kind = state.kind();
        if self.kind == Some(kind) {
            return FrameTimerAction::Keep;
        }
        trace!(from = ?self.kind, to = ?kind, "display kind changed");
        self.kind = Some(kind);
        self.phase = 0;
        if kind.is_transitional() {
            FrameTimerAction::Restart
        } else {
            FrameTimerAction::Stop
        }
    }

    /// Advance one frame. A no-op for static kinds.
    pub fn on_frame(&mut self) -> usize {
        if let Some(frames) = self.kind.and_then(DisplayKind::frame_count) {
            self.phase = (self.phase + 1) % frames;
        }
        self.phase
    }

    /// Phase to show for `state` without recording it.
    pub fn phase_for(&self, state: DisplayState) -> usize {
        if self.kind == Some(state.kind()) {
            self.phase
        } else {
            0
        }
    }

    pub fn phase(&self) -> usize {
        self.phase
    }
}

// ── RefreshDriver ────────────────────────────────────────────────────

/// Re-resolves the display state on a timer and on registry changes.
pub struct RefreshDriver {
    registry: Arc<Registry>,
    animation: Mutex<Animation>,
    refresh_interval: Duration,
    frame_interval: Duration,
}

impl RefreshDriver {
    pub fn new(registry: Arc<Registry>, refresh_interval: Duration, frame_interval: Duration) -> Self {
        Self {
            registry,
            animation: Mutex::new(Animation::new()),
            refresh_interval,
            frame_interval,
        }
    }

    /// The view as of now. Does not advance or reset the animation.
    pub fn current_view(&self) -> DisplayView {
        let resolution = self.resolve();
        DisplayView {
            state: resolution.state,
            phase: self.animation().phase_for(resolution.state),
            visible: resolution.visible,
        }
    }

    /// Drive the presenter until `cancel` fires.
    pub async fn run<P: Presenter>(&self, presenter: &mut P, cancel: CancellationToken) {
        let mut refresh = tokio::time::interval(self.refresh_interval);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut versions = self.registry.subscribe();
        let mut frames: Option<Interval> = None;
        let mut last = self.resolve();

        debug!(
            refresh = ?self.refresh_interval,
            frame = ?self.frame_interval,
            "refresh driver started"
        );

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                changed = versions.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    last = self.refresh(presenter, &mut frames);
                }
                _ = refresh.tick() => {
                    last = self.refresh(presenter, &mut frames);
                }
                () = next_frame(&mut frames) => {
                    let phase = self.animation().on_frame();
                    presenter.render(&DisplayView {
                        state: last.state,
                        phase,
                        visible: last.visible,
                    });
                }
            }
        }

        debug!("refresh driver stopped");
    }

    /// Re-resolve, update the animation, render.
    fn refresh<P: Presenter>(&self, presenter: &mut P, frames: &mut Option<Interval>) -> Resolution {
        let resolution = self.resolve();
        let (action, phase) = {
            let mut animation = self.animation();
            let action = animation.observe(resolution.state);
            (action, animation.phase())
        };

        match action {
            FrameTimerAction::Restart => *frames = Some(self.frame_timer()),
            FrameTimerAction::Stop => *frames = None,
            FrameTimerAction::Keep => {}
        }

        presenter.render(&DisplayView {
            state: resolution.state,
            phase,
            visible: resolution.visible,
        });
        resolution
    }

    fn resolve(&self) -> Resolution {
        resolve(&ResolverInput::from_registry(&self.registry))
    }

    /// First tick one period from now.
    fn frame_timer(&self) -> Interval {
        let mut timer =
            tokio::time::interval_at(Instant::now() + self.frame_interval, self.frame_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        timer
    }

    fn animation(&self) -> MutexGuard<'_, Animation> {
        self.animation.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolves on the next frame tick, or never while no timer runs.
async fn next_frame(frames: &mut Option<Interval>) {
    match frames {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}
