//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod dialog;
pub mod domain;
pub mod gateway;
pub mod infra;
pub mod pricing;
pub mod query;
pub mod read;
pub mod task;

use common::operations::{By, Start};

use crate::{dialog::SessionStore, infra::Documents};

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Payment providers configuration.
    pub gateway: gateway::Config,

    /// [`task::ExpireStaleSessions`] configuration.
    pub expire_stale_sessions: task::expire_stale_sessions::Config,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    ///
    /// [`Database`]: infra::Database
    database: Db,

    /// [`Documents`] store of this [`Service`].
    documents: Documents,

    /// Dialog [`SessionStore`] of this [`Service`].
    sessions: SessionStore,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided parameters, along with
    /// the [`task::Background`] environment running its periodic tasks.
    pub fn new(
        config: Config,
        database: Db,
        documents: Documents,
    ) -> (Self, task::Background)
    where
        Self: Clone + 'static,
    {
        let this = Service {
            config,
            database,
            documents,
            sessions: SessionStore::new(),
        };

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn(async move {
            svc.execute(Start(By::<task::ExpireStaleSessions, _>::new(
                svc.config().expire_stale_sessions,
            )))
            .await
        });

        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    ///
    /// [`Database`]: infra::Database
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`Documents`] store of this [`Service`].
    #[must_use]
    pub fn documents(&self) -> &Documents {
        &self.documents
    }

    /// Returns dialog [`SessionStore`] of this [`Service`].
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}
