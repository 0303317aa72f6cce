//! Background maintenance: reaps abandoned matches, compacts expired
//! cooldowns and drops stale matchmaking entries on fixed intervals.

use actix::prelude::*;
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, MessageResponse)]
pub struct SweepReport {
    pub reaped_matches: usize,
    pub expired_queue_entries: usize,
}

/// Run both sweeps right now
#[derive(Message)]
#[rtype(result = "SweepReport")]
pub struct Sweep;

pub struct Sweeper {
    state: Arc<AppState>,
    reap_interval: Duration,
    cleanup_interval: Duration,
}

impl Sweeper {
    pub fn new(state: Arc<AppState>, reap_interval: Duration, cleanup_interval: Duration) -> Self {
        Sweeper {
            state,
            reap_interval,
            cleanup_interval,
        }
    }

    fn reap(&self) -> usize {
        let reaped = self.state.registry.reap_abandoned();
        self.state.registry.compact();
        if !reaped.is_empty() {
            info!("Sweeper reaped {} matches", reaped.len());
        }
        debug!("{} matches live", self.state.registry.len());
        reaped.len()
    }

    fn cleanup_queue(&self) -> usize {
        self.state.queue.cleanup()
    }
}

impl Actor for Sweeper {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(
            "Sweeper started: reaping every {:?}, queue cleanup every {:?}",
            self.reap_interval, self.cleanup_interval
        );
        ctx.run_interval(self.reap_interval, |act, _| {
            act.reap();
        });
        ctx.run_interval(self.cleanup_interval, |act, _| {
            act.cleanup_queue();
        });
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        info!("Sweeper stopped");
    }
}

impl Handler<Sweep> for Sweeper {
    type Result = SweepReport;

    fn handle(&mut self, _: Sweep, _: &mut Self::Context) -> Self::Result {
        SweepReport {
            reaped_matches: self.reap(),
            expired_queue_entries: self.cleanup_queue(),
        }
    }
}
