//=========================================================================
// Suspension Points
//=========================================================================
//
// Futures that load units await to give the frame back to the scheduler.
//
// `NextFrame` wakes its own task before returning `Pending`; `Delay`
// arranges a wake at its deadline. Both make progress under a parking
// executor as well as under the per-tick `FrameScheduler`.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, Waker};
use std::thread;
use std::time::{Duration, Instant};

//=== NextFrame ===========================================================

/// Suspends exactly once, resuming on the following poll.
#[derive(Debug, Default)]
#[must_use = "futures do nothing unless awaited"]
pub struct NextFrame {
    yielded: bool,
}

impl Future for NextFrame {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }

        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Yields to the next frame.
pub fn next_frame() -> NextFrame {
    NextFrame::default()
}

//=== Delay ===============================================================

/// Suspends until a wall-clock deadline has passed.
///
/// The deadline is fixed on the first poll, not at construction, so a
/// delay created ahead of time does not start counting early. A timer
/// thread wakes the task at the deadline; executors that park between
/// wakes (such as `block_on`) sleep instead of polling in a loop.
#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct Delay {
    duration: Duration,
    deadline: Option<Instant>,
    waker: Option<Arc<Mutex<Waker>>>,
}

impl Future for Delay {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let duration = self.duration;
        let deadline = *self.deadline.get_or_insert_with(|| Instant::now() + duration);

        let now = Instant::now();
        if now >= deadline {
            return Poll::Ready(());
        }

        if let Some(shared) = &self.waker {
            let mut waker = shared.lock().unwrap_or_else(PoisonError::into_inner);
            if !waker.will_wake(cx.waker()) {
                *waker = cx.waker().clone();
            }
            return Poll::Pending;
        }

        let shared = Arc::new(Mutex::new(cx.waker().clone()));
        let timer = Arc::clone(&shared);
        let remaining = deadline - now;
        thread::spawn(move || {
            thread::sleep(remaining);
            let waker = timer.lock().unwrap_or_else(PoisonError::into_inner).clone();
            waker.wake();
        });

        self.waker = Some(shared);
        Poll::Pending
    }
}

/// Suspends for at least `duration`.
pub fn delay(duration: Duration) -> Delay {
    Delay {
        duration,
        deadline: None,
        waker: None,
    }
}

//=========================================================================
// Tests
//=========================================================================
