//! [`ExpireStaleSessions`] [`Task`].

use std::{convert::Infallible, time};

use common::operations::{By, Perform, Start};
use tokio::time::interval;
use tracing as log;

use crate::{dialog::SessionStore, Service};

use super::Task;

/// Configuration for [`ExpireStaleSessions`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between expiry sweeps.
    pub interval: time::Duration,

    /// Idle time after which a session is considered abandoned.
    pub ttl: time::Duration,
}

/// [`Task`] for removing abandoned dialog sessions.
///
/// An abandoned dialog holds no durable state, but its session would pin
/// memory and resume a stale conversation arbitrarily later, so sessions
/// idle past the TTL are dropped.
#[derive(Clone, Debug)]
pub struct ExpireStaleSessions {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`SessionStore`] to sweep.
    sessions: SessionStore,
}

impl<Db> Task<Start<By<ExpireStaleSessions, Config>>> for Service<Db> {
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<ExpireStaleSessions, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = ExpireStaleSessions {
            config,
            sessions: self.sessions().clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(())).await;
        }
    }
}

impl Task<Perform<()>> for ExpireStaleSessions {
    type Ok = ();
    type Err = Infallible;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let removed = self.sessions.sweep(self.config.ttl).await;
        if removed > 0 {
            log::debug!("expired {removed} stale dialog session(s)");
        }
        Ok(())
    }
}
