//! Worker threads.
//!
//! Each slot in the pool owns one OS thread that loops over its private job
//! channel until the sender side disconnects. A job runs entirely inside the
//! worker: the executor's errors become failure results, and a panic inside
//! the image stack is caught and reported as a fault so the slot can be
//! returned to service instead of stalling the dispatcher.

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use pixelmill_core::compress;

use crate::job::{Job, JobResult};

/// Message from a worker back to the coordinator.
#[derive(Debug)]
pub(crate) enum WorkerEvent {
    /// The job ran to completion (successfully or not).
    Finished { slot: usize, result: JobResult },
    /// The job escaped the per-job error scope (panic in the image stack).
    Fault {
        slot: usize,
        job_id: String,
        filename: String,
        original_size: u64,
        message: String,
    },
}

/// Spawn the worker thread for one slot.
pub(crate) fn spawn(slot: usize, jobs: Receiver<Job>, events: Sender<WorkerEvent>) {
    thread::spawn(move || {
        for job in jobs.iter() {
            let event = run_job(slot, job);
            // Coordinator gone; nothing left to report to.
            if events.send(event).is_err() {
                break;
            }
        }
        tracing::debug!(slot, "worker shutting down");
    });
}

fn run_job(slot: usize, job: Job) -> WorkerEvent {
    let Job {
        id,
        bytes,
        filename,
        options,
    } = job;
    let original_size = bytes.len() as u64;
    tracing::trace!(slot, job_id = %id, size = original_size, "processing job");

    match panic::catch_unwind(AssertUnwindSafe(|| compress(&bytes, &options))) {
        Ok(Ok(image)) => WorkerEvent::Finished {
            slot,
            result: JobResult::from_success(id, filename, image),
        },
        Ok(Err(err)) => WorkerEvent::Finished {
            slot,
            result: JobResult::from_failure(id, filename, original_size, err.to_string()),
        },
        Err(payload) => WorkerEvent::Fault {
            slot,
            job_id: id,
            filename,
            original_size,
            message: panic_message(payload),
        },
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
