//! Work-conserving dispatch over a fixed worker pool.
//!
//! The [`DispatchQueue`] owns one job sender per slot plus a single shared
//! event channel back from the workers. All bookkeeping (slot busy flags,
//! the pending FIFO, batch counters) runs on the coordinating thread, so no
//! synchronization is needed beyond the channels themselves. Assignment is
//! event-driven: each completion immediately hands the freed slot the next
//! pending job, so no slot idles while work remains. Failure results the
//! coordinator synthesizes itself (a job sent to a dead worker) are buffered
//! and delivered through [`DispatchQueue::recv_result`] exactly like results
//! from the event channel.

use std::collections::{HashSet, VecDeque};
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::job::{Job, JobResult};
use crate::worker::{self, WorkerEvent};

/// Batch lifecycle of the dispatch queue.
///
/// `Running` while pending jobs remain, `Draining` once the queue is empty
/// but results are still outstanding, `Idle` when every submitted job has
/// produced its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Running,
    Draining,
}

struct WorkerSlot {
    jobs: Sender<Job>,
    busy: bool,
    /// Set when a send to the worker fails; the slot is skipped thereafter.
    defunct: bool,
}

/// Coordinator-side queue manager for a fixed pool of worker threads.
pub struct DispatchQueue {
    slots: Vec<WorkerSlot>,
    events: Receiver<WorkerEvent>,
    pending: VecDeque<Job>,
    /// Coordinator-synthesized failure results awaiting delivery.
    ready: VecDeque<JobResult>,
    state: BatchState,
    submitted: usize,
    completed: usize,
    /// Ids already recorded this batch; guards exactly-once recording.
    recorded: HashSet<String>,
}

impl DispatchQueue {
    /// Create a queue with `pool_size` worker slots (minimum 1).
    ///
    /// The pool is created once and never resized; each slot's thread lives
    /// until the queue is dropped.
    pub fn new(pool_size: usize) -> Self {
        let pool_size = pool_size.max(1);
        let (event_tx, event_rx) = unbounded();

        let slots = (0..pool_size)
            .map(|slot| {
                let (job_tx, job_rx) = unbounded();
                worker::spawn(slot, job_rx, event_tx.clone());
                WorkerSlot {
                    jobs: job_tx,
                    busy: false,
                    defunct: false,
                }
            })
            .collect();

        tracing::debug!(pool_size, "worker pool created");
        Self {
            slots,
            events: event_rx,
            pending: VecDeque::new(),
            ready: VecDeque::new(),
            state: BatchState::Idle,
            submitted: 0,
            completed: 0,
            recorded: HashSet::new(),
        }
    }

    /// Create a queue sized to the detected hardware parallelism.
    pub fn with_default_pool_size() -> Self {
        Self::new(Self::default_pool_size())
    }

    /// Detected hardware parallelism, falling back to 1.
    pub fn default_pool_size() -> usize {
        thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    }

    pub fn pool_size(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots currently processing a job.
    pub fn busy_slots(&self) -> usize {
        self.slots.iter().filter(|slot| slot.busy).count()
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Jobs waiting for a free slot.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Jobs submitted in the current batch.
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Results received in the current batch.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Enqueue jobs and start (or extend) the batch.
    ///
    /// Submitting while `Running` or `Draining` appends to the batch in
    /// flight rather than starting a second one. Idle slots are filled
    /// immediately, up to min(pool size, queue length).
    pub fn submit(&mut self, jobs: impl IntoIterator<Item = Job>) {
        if self.state == BatchState::Idle {
            // Fresh batch: counters from the previous one are done with.
            self.submitted = 0;
            self.completed = 0;
            self.recorded.clear();
        }

        let mut added = 0;
        for job in jobs {
            self.pending.push_back(job);
            added += 1;
        }
        if added == 0 {
            return;
        }

        self.submitted += added;
        self.state = BatchState::Running;
        tracing::debug!(added, pending = self.pending.len(), "jobs submitted");
        self.fill_idle_slots();
    }

    /// Block until the next result arrives, or return `None` once the batch
    /// is idle.
    ///
    /// Each received event marks its slot idle and immediately assigns the
    /// next pending job before the result is returned.
    pub fn recv_result(&mut self) -> Option<JobResult> {
        loop {
            if let Some(result) = self.ready.pop_front() {
                return Some(result);
            }
            if self.state == BatchState::Idle {
                return None;
            }

            // Cannot disconnect while we hold every slot's job sender, but
            // fail soft rather than blocking forever if it somehow does.
            let event = self.events.recv().ok()?;
            if let Some(result) = self.handle_event(event) {
                return Some(result);
            }
        }
    }

    /// Drain the current batch, returning all results in completion order.
    pub fn run_until_idle(&mut self) -> Vec<JobResult> {
        let mut results = Vec::new();
        while let Some(result) = self.recv_result() {
            results.push(result);
        }
        results
    }

    /// Clear the pending queue, preventing any further dispatch.
    ///
    /// Already-dispatched jobs run to completion and their results are still
    /// delivered. Returns the number of jobs removed.
    pub fn cancel_pending(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.submitted -= dropped;
        self.update_state();
        tracing::debug!(dropped, "pending queue cleared");
        dropped
    }

    /// Apply one worker event: return the slot to service and convert the
    /// event into a recordable result. Yields `None` for stale results.
    fn handle_event(&mut self, event: WorkerEvent) -> Option<JobResult> {
        let result = match event {
            WorkerEvent::Finished { slot, result } => {
                self.release_slot(slot);
                result
            }
            WorkerEvent::Fault {
                slot,
                job_id,
                filename,
                original_size,
                message,
            } => {
                tracing::warn!(slot, job_id = %job_id, %message, "worker fault");
                self.release_slot(slot);
                JobResult::from_failure(job_id, filename, original_size, message)
            }
        };
        self.record(result)
    }

    /// Record a result exactly once; late or duplicate ids are discarded.
    fn record(&mut self, result: JobResult) -> Option<JobResult> {
        if !self.recorded.insert(result.id.clone()) {
            tracing::warn!(job_id = %result.id, "discarding stale result");
            return None;
        }

        self.completed += 1;
        self.update_state();
        tracing::debug!(
            job_id = %result.id,
            success = result.success,
            dimensions = %result.compressed_dimensions,
            completed = self.completed,
            submitted = self.submitted,
            "result recorded"
        );
        Some(result)
    }

    /// Mark a slot idle and keep the pool fed.
    fn release_slot(&mut self, slot: usize) {
        self.slots[slot].busy = false;
        self.fill_idle_slots();
    }

    fn fill_idle_slots(&mut self) {
        for slot in 0..self.slots.len() {
            if self.pending.is_empty() {
                break;
            }
            if !self.slots[slot].busy && !self.slots[slot].defunct {
                if let Some(job) = self.pending.pop_front() {
                    self.dispatch(slot, job);
                }
            }
        }
        self.fail_pending_if_stranded();
    }

    /// Hand one job to one slot. The slot must be idle; this is the only
    /// place a slot transitions to busy, so a job can never land on an
    /// occupied slot.
    fn dispatch(&mut self, slot: usize, job: Job) {
        debug_assert!(!self.slots[slot].busy, "job assigned to a busy slot");
        tracing::debug!(slot, job_id = %job.id, "dispatching job");

        match self.slots[slot].jobs.send(job) {
            Ok(()) => self.slots[slot].busy = true,
            Err(send_error) => {
                // The worker thread is gone. Retire the slot and put the
                // job back at the head of the queue for a live one.
                let job = send_error.into_inner();
                tracing::warn!(slot, job_id = %job.id, "worker unavailable, retiring slot");
                self.slots[slot].defunct = true;
                self.pending.push_front(job);
            }
        }
    }

    /// With every slot retired no completion event will ever arrive, so
    /// queued jobs are failed in place rather than left to stall the batch.
    fn fail_pending_if_stranded(&mut self) {
        if !self.slots.iter().all(|slot| slot.defunct) {
            return;
        }
        while let Some(job) = self.pending.pop_front() {
            let result = JobResult::from_failure(
                job.id,
                job.filename,
                job.bytes.len() as u64,
                "worker unavailable".to_string(),
            );
            if let Some(result) = self.record(result) {
                self.ready.push_back(result);
            }
        }
    }

    fn update_state(&mut self) {
        self.state = if self.completed == self.submitted
            && self.pending.is_empty()
            && self.busy_slots() == 0
        {
            BatchState::Idle
        } else if self.pending.is_empty() {
            BatchState::Draining
        } else {
            BatchState::Running
        };
    }
}
