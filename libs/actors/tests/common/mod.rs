//! Actors shared by the runtime integration tests

#![allow(dead_code)]

use actor_runtime::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Running total
#[derive(Default)]
pub struct Counter {
    pub total: u64,
}

impl Actor for Counter {}

pub struct Increment(pub u64);

impl Message for Increment {
    type Result = u64;
}

#[async_trait(?Send)]
impl Handler<Increment> for Counter {
    type Result = u64;

    async fn handle(&mut self, msg: Increment, _ctx: &mut Context<Self>) -> u64 {
        self.total += msg.0;
        self.total
    }
}

pub struct Total;

impl Message for Total {
    type Result = u64;
}

#[async_trait(?Send)]
impl Handler<Total> for Counter {
    type Result = u64;

    async fn handle(&mut self, _msg: Total, _ctx: &mut Context<Self>) -> u64 {
        self.total
    }
}

/// Tracks how many of its handlers are in flight at once
#[derive(Clone, Default)]
pub struct Occupancy {
    pub active: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
    pub handled: Arc<AtomicUsize>,
}

impl Occupancy {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn handled(&self) -> usize {
        self.handled.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

pub struct Worker {
    pub occupancy: Occupancy,
}

impl Actor for Worker {}

/// Suspends the handler for the given duration
pub struct Work(pub Duration);

impl Message for Work {
    type Result = usize;
}

#[async_trait(?Send)]
impl Handler<Work> for Worker {
    type Result = usize;

    async fn handle(&mut self, msg: Work, _ctx: &mut Context<Self>) -> usize {
        let now = self.occupancy.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.occupancy.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(msg.0).await;

        self.occupancy.active.fetch_sub(1, Ordering::SeqCst);
        self.occupancy.handled.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Poll `condition` until it holds or roughly a second has passed
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
