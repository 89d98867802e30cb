//! Two-phase start/stop rendezvous for one run.
//!
//! Workers register and block until the driver releases them all at once;
//! the driver then blocks until every worker has signalled stop. Each phase
//! is used exactly once per run, so a barrier is created fresh for every run.
//!
//! ```text
//!   worker 0 ─ register ─┐                          ┌─ work ─ stop ─┐
//!   worker 1 ─ register ─┼─ driver: release_start ──┼─ work ─ stop ─┼─ driver: wait_for_all_stopped
//!   worker N ─ register ─┘    (start instant)       └─ work ─ stop ─┘    (stop instant)
//! ```

use parking_lot::{Condvar, Mutex};
use std::time::Instant;

struct StartState {
    /// Workers registered so far, plus one once the driver arrives
    registered: usize,
    /// Bumped when the driver releases the workers
    generation: u64,
    last_registration: Option<Instant>,
    aborted: bool,
}

/// Start/stop barrier for `workers` participants plus the driver.
pub struct StartStopBarrier {
    workers: usize,
    start: Mutex<StartState>,
    start_changed: Condvar,
    stopped: Mutex<usize>,
    stop_changed: Condvar,
}

impl StartStopBarrier {
    /// Barrier for `workers` workers.
    pub fn new(workers: usize) -> Self {
        StartStopBarrier {
            workers,
            start: Mutex::new(StartState {
                registered: 0,
                generation: 0,
                last_registration: None,
                aborted: false,
            }),
            start_changed: Condvar::new(),
            stopped: Mutex::new(0),
            stop_changed: Condvar::new(),
        }
    }

    /// Register a worker and block until the driver releases the run.
    ///
    /// Returns `false` if the run was aborted instead of released; the worker
    /// must then skip its work (but still signal stop).
    pub fn register_and_wait_for_start(&self) -> bool {
        let mut state = self.start.lock();
        if state.generation > 0 || state.aborted {
            return !state.aborted;
        }

        state.registered += 1;
        debug_assert!(
            state.registered <= self.workers,
            "more workers registered than the barrier was built for"
        );
        state.last_registration = Some(Instant::now());
        self.start_changed.notify_all();

        let generation = state.generation;
        while state.generation == generation && !state.aborted {
            self.start_changed.wait(&mut state);
        }
        !state.aborted
    }

    /// Driver side of the start rendezvous.
    ///
    /// Blocks until every worker has registered, then counts the driver in,
    /// takes the start instant and wakes all workers, all under one lock so
    /// the instant can never precede the last registration.
    pub fn release_start(&self) -> Instant {
        let mut state = self.start.lock();
        while state.registered < self.workers && !state.aborted {
            self.start_changed.wait(&mut state);
        }
        state.registered += 1;
        state.generation += 1;
        let started = Instant::now();
        self.start_changed.notify_all();
        started
    }

    /// Release every waiting worker without starting the run.
    ///
    /// Used by the driver when it cannot spawn all workers, so the ones that
    /// did start are not left blocked forever.
    pub fn abort(&self) {
        let mut state = self.start.lock();
        state.aborted = true;
        self.start_changed.notify_all();
    }

    /// Instant the most recent worker registered, if any.
    pub fn last_registration(&self) -> Option<Instant> {
        self.start.lock().last_registration
    }

    /// Signal that one worker has finished.
    pub fn signal_stop(&self) {
        let mut stopped = self.stopped.lock();
        *stopped += 1;
        debug_assert!(
            *stopped <= self.workers,
            "a worker signalled stop more than once"
        );
        self.stop_changed.notify_all();
    }

    /// Block until every worker has signalled stop; returns the stop instant.
    pub fn wait_for_all_stopped(&self) -> Instant {
        let mut stopped = self.stopped.lock();
        while *stopped < self.workers {
            self.stop_changed.wait(&mut stopped);
        }
        Instant::now()
    }

    /// Workers that have signalled stop so far.
    pub fn stopped_count(&self) -> usize {
        *self.stopped.lock()
    }

    /// A handle that signals stop exactly once, when dropped.
    pub fn stop_guard(&self) -> StopSignal<'_> {
        StopSignal { barrier: self }
    }
}

/// Signals stop on drop, including during unwinding.
pub struct StopSignal<'a> {
    barrier: &'a StartStopBarrier,
}

impl Drop for StopSignal<'_> {
    fn drop(&mut self) {
        self.barrier.signal_stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_workers_block_until_release() {
        let barrier = StartStopBarrier::new(3);
        let passed = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..3 {
                s.spawn(|| {
                    assert!(barrier.register_and_wait_for_start());
                    passed.fetch_add(1, Ordering::SeqCst);
                    barrier.signal_stop();
                });
            }

            // Give every worker time to register and block
            while barrier.start.lock().registered < 3 {
                thread::yield_now();
            }
            thread::sleep(Duration::from_millis(20));
            assert_eq!(passed.load(Ordering::SeqCst), 0);

            barrier.release_start();
            barrier.wait_for_all_stopped();
            assert_eq!(passed.load(Ordering::SeqCst), 3);
        });
    }

    #[test]
    fn test_start_instant_not_before_last_registration() {
        for _ in 0..20 {
            let barrier = StartStopBarrier::new(8);
            thread::scope(|s| {
                for _ in 0..8 {
                    s.spawn(|| {
                        barrier.register_and_wait_for_start();
                        barrier.signal_stop();
                    });
                }
                let started = barrier.release_start();
                barrier.wait_for_all_stopped();
                let last = barrier.last_registration().unwrap();
                assert!(started >= last);
            });
        }
    }

    #[test]
    fn test_driver_counts_itself_in() {
        let barrier = StartStopBarrier::new(2);
        thread::scope(|s| {
            for _ in 0..2 {
                s.spawn(|| {
                    barrier.register_and_wait_for_start();
                    barrier.signal_stop();
                });
            }
            barrier.release_start();
            barrier.wait_for_all_stopped();
        });
        let state = barrier.start.lock();
        assert_eq!(state.registered, 3);
        assert_eq!(state.generation, 1);
    }

    #[test]
    fn test_wait_for_all_stopped_needs_every_signal() {
        let barrier = StartStopBarrier::new(2);
        barrier.signal_stop();
        assert_eq!(barrier.stopped_count(), 1);

        thread::scope(|s| {
            let waiter = s.spawn(|| barrier.wait_for_all_stopped());
            thread::sleep(Duration::from_millis(20));
            assert!(!waiter.is_finished());
            barrier.signal_stop();
            waiter.join().unwrap();
        });
        assert_eq!(barrier.stopped_count(), 2);
    }

    #[test]
    fn test_stop_guard_signals_on_panic() {
        let barrier = StartStopBarrier::new(1);
        let result = thread::scope(|s| {
            s.spawn(|| {
                let _stop = barrier.stop_guard();
                panic!("worker blew up");
            })
            .join()
        });
        assert!(result.is_err());
        assert_eq!(barrier.stopped_count(), 1);
        barrier.wait_for_all_stopped();
    }

    #[test]
    fn test_abort_releases_registered_workers() {
        let barrier = StartStopBarrier::new(3);
        thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| s.spawn(|| barrier.register_and_wait_for_start()))
                .collect();
            while barrier.start.lock().registered < 2 {
                thread::yield_now();
            }
            barrier.abort();
            for h in handles {
                assert!(!h.join().unwrap());
            }
        });
        assert!(!barrier.register_and_wait_for_start());
    }

    #[test]
    fn test_zero_workers_release_immediately() {
        let barrier = StartStopBarrier::new(0);
        barrier.release_start();
        barrier.wait_for_all_stopped();
    }
}
