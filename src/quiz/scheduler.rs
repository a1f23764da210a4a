// src/quiz/scheduler.rs

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};

/// Callback invoked once per tick.
pub type TickCallback = Box<dyn FnMut() + Send + 'static>;

/// Source of countdown ticks for a quiz session.
///
/// The session actor schedules a one-second period on start and cancels it
/// as soon as the session leaves `InProgress`.
pub trait TickScheduler: Send {
    /// Starts invoking `on_tick` every `period`, replacing any earlier schedule.
    fn schedule(&mut self, period: Duration, on_tick: TickCallback);

    /// Stops ticking. Idempotent.
    fn cancel(&mut self);

    fn is_active(&self) -> bool;
}

/// Production scheduler backed by `tokio::time::interval`.
///
/// The first tick fires one full period after scheduling.
#[derive(Default)]
pub struct IntervalScheduler {
    task: Option<JoinHandle<()>>,
}

impl IntervalScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TickScheduler for IntervalScheduler {
    fn schedule(&mut self, period: Duration, mut on_tick: TickCallback) {
        self.cancel();

        self.task = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                on_tick();
            }
        }));
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for IntervalScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Default)]
struct ManualState {
    on_tick: Option<TickCallback>,
    period: Option<Duration>,
    cancellations: usize,
}

/// Scheduler driven by hand, for tests and simulations.
///
/// Clones share state: keep one clone to call [`ManualScheduler::fire`] after
/// handing another to a session.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers one tick. Returns `false` if nothing is scheduled.
    pub fn fire(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.on_tick.as_mut() {
            Some(on_tick) => {
                on_tick();
                true
            }
            None => false,
        }
    }

    /// Delivers up to `n` ticks, stopping early if the schedule is cancelled.
    pub fn fire_n(&self, n: usize) -> usize {
        (0..n).take_while(|_| self.fire()).count()
    }

    pub fn period(&self) -> Option<Duration> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).period
    }

    /// Number of `cancel` calls that stopped an active schedule.
    pub fn cancellations(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancellations
    }
}

impl TickScheduler for ManualScheduler {
    fn schedule(&mut self, period: Duration, on_tick: TickCallback) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.on_tick = Some(on_tick);
        state.period = Some(period);
    }

    fn cancel(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.on_tick.take().is_some() {
            state.cancellations += 1;
        }
    }

    fn is_active(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_tick
            .is_some()
    }
}
