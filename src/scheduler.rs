//! # Bounded Job Scheduler
//!
//! Runs external commands as child processes with a bound on how many run at
//! once, and hands them back strictly in launch order.
//!
//! ## Modes
//!
//! - [`JobLimit::Unlimited`]: every launch starts its process immediately.
//! - [`JobLimit::Sequential`]: a launch starts the process and waits for it
//!   before returning, so jobs never overlap. Handy when diagnosing a
//!   failing job.
//! - [`JobLimit::Bounded`]: a launch blocks until a slot is free. Slots are a
//!   counting semaphore (mutex + condvar); a watcher thread per job waits for
//!   the child and frees the slot the moment it exits, so admission never
//!   polls.
//!
//! ## Ordering
//!
//! [`JobScheduler::wait_next_in_order`] always waits for the oldest
//! outstanding job, even if younger ones already finished. Exit statuses are
//! only looked at there: a launch never fails because the command failed.

use std::collections::VecDeque;
use std::process::{Child, ExitStatus};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crate::config::{JobLimit, Settings};
use crate::error::{Error, Result};
use crate::process::{self, CommandSpec};

/// Counting semaphore limiting running jobs.
#[derive(Debug)]
struct JobSlots {
    free: Mutex<usize>,
    cv: Condvar,
}

impl JobSlots {
    fn new(total: usize) -> Arc<Self> {
        Arc::new(Self {
            free: Mutex::new(total),
            cv: Condvar::new(),
        })
    }

    /// Lock with poison recovery; a panicking watcher must not wedge the run.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.free.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Block until a slot is free and take it.
    fn acquire(self: &Arc<Self>) -> SlotPermit {
        let mut free = self.lock();
        while *free == 0 {
            free = self
                .cv
                .wait(free)
                .unwrap_or_else(|poison| poison.into_inner());
        }
        *free -= 1;
        SlotPermit {
            slots: Arc::clone(self),
        }
    }
}

/// A taken slot, given back on drop.
#[derive(Debug)]
struct SlotPermit {
    slots: Arc<JobSlots>,
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        *self.slots.lock() += 1;
        self.slots.cv.notify_one();
    }
}

/// How a launched job's exit status will be obtained.
#[derive(Debug)]
enum Completion {
    /// Already waited for at launch time.
    Exited(ExitStatus),
    /// Running, nobody waiting on it yet.
    Child(Child),
    /// Running, a watcher thread holds the child and its slot.
    Watched(JoinHandle<std::io::Result<ExitStatus>>),
}

#[derive(Debug)]
struct Job<T> {
    index: usize,
    spec: CommandSpec,
    metadata: T,
    completion: Completion,
}

/// A job handed back by [`JobScheduler::wait_next_in_order`].
#[derive(Debug)]
pub struct FinishedJob<T> {
    /// Position in launch order, starting at 0.
    pub index: usize,
    pub spec: CommandSpec,
    pub metadata: T,
    pub status: ExitStatus,
}

/// Launches commands with bounded concurrency and drains them in launch order.
#[derive(Debug)]
pub struct JobScheduler<T> {
    limit: JobLimit,
    slots: Option<Arc<JobSlots>>,
    pending: VecDeque<Job<T>>,
    launched: usize,
    settings: Settings,
}

impl<T> JobScheduler<T> {
    pub fn new(limit: JobLimit, settings: Settings) -> Self {
        let slots = match limit {
            JobLimit::Bounded(n) => Some(JobSlots::new(n)),
            JobLimit::Unlimited | JobLimit::Sequential => None,
        };
        Self {
            limit,
            slots,
            pending: VecDeque::new(),
            launched: 0,
            settings,
        }
    }

    /// Start `spec`, blocking first if the bound is reached. Returns the
    /// job's launch index. Only a failure to start the process is an error.
    pub fn launch(&mut self, spec: CommandSpec, metadata: T) -> Result<usize> {
        let completion = match &self.slots {
            Some(slots) => {
                let permit = slots.acquire();
                let mut child = process::spawn(&spec, self.settings)?;
                Completion::Watched(thread::spawn(move || {
                    let status = child.wait();
                    drop(permit);
                    status
                }))
            }
            None if self.limit == JobLimit::Sequential => {
                let mut child = process::spawn(&spec, self.settings)?;
                Completion::Exited(child.wait()?)
            }
            None => Completion::Child(process::spawn(&spec, self.settings)?),
        };

        let index = self.launched;
        self.launched += 1;
        self.pending.push_back(Job {
            index,
            spec,
            metadata,
            completion,
        });
        Ok(index)
    }

    /// Whether there are launched jobs not yet handed back.
    pub fn can_wait(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of launched jobs not yet handed back.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Wait for the oldest outstanding job. `Ok(None)` once all are drained.
    pub fn wait_next_in_order(&mut self) -> Result<Option<FinishedJob<T>>> {
        let Some(job) = self.pending.pop_front() else {
            return Ok(None);
        };
        let status = match job.completion {
            Completion::Exited(status) => status,
            Completion::Child(mut child) => child.wait()?,
            Completion::Watched(handle) => handle.join().map_err(|_| Error::InvariantViolation {
                message: format!("watcher thread for job {} panicked", job.index),
            })??,
        };
        Ok(Some(FinishedJob {
            index: job.index,
            spec: job.spec,
            metadata: job.metadata,
            status,
        }))
    }

    /// Wait for every outstanding job, discarding the results. Nothing is
    /// ever cancelled; this only makes sure no child outlives the run.
    pub fn drain(&mut self) {
        while let Some(job) = self.pending.pop_front() {
            match job.completion {
                Completion::Exited(_) => {}
                Completion::Child(mut child) => {
                    let _ = child.wait();
                }
                Completion::Watched(handle) => {
                    let _ = handle.join();
                }
            }
        }
    }
}
