//! Cosmetic progress shown while a request is in flight.
//!
//! The value climbs on a timer and never reaches 100 on its own; only a
//! resolved response snaps it to 100. It says nothing about bytes sent.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressPlan {
    /// Added on every tick.
    pub step: u8,
    pub interval_ms: u32,
    /// Highest value reachable by ticking. Always below 100.
    pub ceiling: u8,
}

/// Weight-loss analysis: +10 every 300 ms, holds at 90.
pub const ANALYSIS_PROGRESS: ProgressPlan = ProgressPlan {
    step: 10,
    interval_ms: 300,
    ceiling: 90,
};

/// Background removal: +5 every 150 ms, holds at 95.
pub const SEGMENTATION_PROGRESS: ProgressPlan = ProgressPlan {
    step: 5,
    interval_ms: 150,
    ceiling: 95,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticProgress {
    plan: ProgressPlan,
    value: u8,
    finished: bool,
}

impl SyntheticProgress {
    pub fn new(plan: ProgressPlan) -> Self {
        Self {
            plan: ProgressPlan {
                ceiling: plan.ceiling.min(99),
                ..plan
            },
            value: 0,
            finished: false,
        }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advance one step. No-op once finished or at the ceiling.
    pub fn tick(&mut self) -> u8 {
        if !self.finished {
            self.value = self.value.saturating_add(self.plan.step).min(self.plan.ceiling);
        }
        self.value
    }

    /// The real response arrived.
    pub fn finish(&mut self) -> u8 {
        self.finished = true;
        self.value = 100;
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0;
        self.finished = false;
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use ticker::ProgressTicker;

#[cfg(not(target_arch = "wasm32"))]
mod ticker {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tokio::task::JoinHandle;
    use tokio::time::{interval_at, Instant, MissedTickBehavior};

    use super::{ProgressPlan, SyntheticProgress};

    /// Drives a [`SyntheticProgress`] from a tokio timer.
    ///
    /// The timer task is aborted by [`ProgressTicker::finish`] or on drop, so
    /// it never outlives the request it decorates.
    pub struct ProgressTicker {
        state: Arc<Mutex<SyntheticProgress>>,
        task: JoinHandle<()>,
    }

    impl ProgressTicker {
        /// Start ticking. `on_tick` sees every new value. Must be called
        /// inside a tokio runtime.
        pub fn spawn<F>(plan: ProgressPlan, on_tick: F) -> Self
        where
            F: Fn(u8) + Send + 'static,
        {
            let state = Arc::new(Mutex::new(SyntheticProgress::new(plan)));
            let task_state = Arc::clone(&state);
            let period = Duration::from_millis(plan.interval_ms.max(1) as u64);

            let task = tokio::spawn(async move {
                let mut interval = interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    interval.tick().await;
                    let value = match task_state.lock() {
                        Ok(mut progress) => progress.tick(),
                        Err(_) => return,
                    };
                    on_tick(value);
                }
            });

            Self { state, task }
        }

        pub fn value(&self) -> u8 {
            self.state.lock().map(|p| p.value()).unwrap_or(0)
        }

        /// Stop the timer and snap to 100.
        pub fn finish(self) -> u8 {
            self.task.abort();
            self.state.lock().map(|mut p| p.finish()).unwrap_or(100)
        }

        /// Stop the timer and keep the last value (failure path).
        pub fn stop(self) -> u8 {
            self.task.abort();
            self.value()
        }
    }

    impl Drop for ProgressTicker {
        fn drop(&mut self) {
            self.task.abort();
        }
    }
}
