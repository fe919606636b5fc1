//=========================================================================
// Frame Scheduler
//=========================================================================
//
// Polls a single local task once per tick.
//
// Architecture:
//   spawn(future) → Some(task)
//   tick()        → poll(task, noop waker) → Pending | Ready(output)
//
// Wake-ups are ignored: the owner ticks at a fixed rate and every
// suspension point in a load unit resumes on the next tick anyway.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::future::Future;
use std::task::{Context, Poll};

use futures::future::LocalBoxFuture;
use futures::task::noop_waker_ref;
use futures::FutureExt;

//=== FrameScheduler ======================================================

/// Drives one `!Send` task cooperatively, one poll per frame.
pub struct FrameScheduler<T> {
    task: Option<LocalBoxFuture<'static, T>>,
    frames: u64,
}

impl<T> FrameScheduler<T> {
    pub fn new() -> Self {
        Self {
            task: None,
            frames: 0,
        }
    }

    /// Installs a task, replacing (and dropping) any current one.
    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = T> + 'static,
    {
        self.task = Some(future.boxed_local());
        self.frames = 0;
    }

    /// Polls the task once.
    ///
    /// Returns `Ready` with the output when the task finishes during this
    /// tick, and `Pending` while it is still running or when idle.
    pub fn tick(&mut self) -> Poll<T> {
        let mut cx = Context::from_waker(noop_waker_ref());
        self.poll_task(&mut cx)
    }

    /// Polls the task with a caller-supplied context.
    pub fn poll_task(&mut self, cx: &mut Context<'_>) -> Poll<T> {
        let Some(task) = self.task.as_mut() else {
            return Poll::Pending;
        };

        self.frames += 1;
        let poll = task.poll_unpin(cx);
        if poll.is_ready() {
            self.task = None;
        }
        poll
    }

    /// Drops the current task without finishing it.
    pub fn cancel(&mut self) {
        self.task = None;
    }

    /// True when no task is installed.
    pub fn is_idle(&self) -> bool {
        self.task.is_none()
    }

    /// Polls spent on the current (or last) task.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl<T> Default for FrameScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Tests
//=========================================================================
