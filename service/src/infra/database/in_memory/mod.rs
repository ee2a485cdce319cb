//! In-memory [`Database`] implementation.
//!
//! A functional twin of the durable backend used by tests and local runs:
//! the whole store lives behind one async mutex, and a transaction stages
//! its writes on a private copy applied atomically on [`Commit`].
//!
//! [`Commit`]: common::operations::Commit

mod impls;

use std::{collections::HashMap, future::Future, sync::Arc};

use derive_more::Debug;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{
    booking, car, contract, payment, review, user, Booking, Car, Contract,
    Payment, Review, User,
};
#[cfg(doc)]
use crate::infra::Database;

/// In-memory [`Database`] client.
#[derive(Clone, Debug)]
pub struct InMemory<C = NonTx>(C);

impl InMemory {
    /// Creates a new empty [`InMemory`] client.
    #[must_use]
    pub fn new() -> Self {
        Self(NonTx {
            tables: Arc::new(Mutex::new(Tables::default())),
        })
    }
}

impl Default for InMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Tables of the in-memory store.
#[derive(Clone, Debug, Default)]
pub(crate) struct Tables {
    /// [`User`]s by their IDs.
    pub(crate) users: HashMap<user::Id, User>,

    /// [`Car`]s by their IDs.
    pub(crate) cars: HashMap<car::Id, Car>,

    /// [`Booking`]s by their IDs.
    pub(crate) bookings: HashMap<booking::Id, Booking>,

    /// [`Payment`]s by their IDs.
    pub(crate) payments: HashMap<payment::Id, Payment>,

    /// [`Contract`]s by their IDs.
    pub(crate) contracts: HashMap<contract::Id, Contract>,

    /// [`Review`]s by their IDs.
    pub(crate) reviews: HashMap<review::Id, Review>,
}

/// Access to the [`Tables`] of an [`InMemory`] client.
pub(crate) trait Access {
    /// Runs the provided closure over the [`Tables`] this client sees.
    fn with<R>(
        &self,
        f: impl FnOnce(&mut Tables) -> R + Send,
    ) -> impl Future<Output = R> + Send;
}

/// Non-transactional in-memory client.
///
/// Every operation locks the store for its own duration only.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// Shared [`Tables`] of the store.
    tables: Arc<Mutex<Tables>>,
}

impl Access for NonTx {
    async fn with<R>(&self, f: impl FnOnce(&mut Tables) -> R + Send) -> R {
        let mut tables = self.tables.lock().await;
        f(&mut tables)
    }
}

/// Transactional in-memory client.
///
/// Lazily acquires exclusive store access on the first operation, stages all
/// writes on a copy, and publishes the copy on commit. Dropping the client
/// without committing discards the staged writes.
#[derive(Clone, Debug)]
pub struct Tx {
    /// Shared [`Tables`] of the store.
    tables: Arc<Mutex<Tables>>,

    /// Lazily initialized transaction state.
    #[debug(skip)]
    state: Arc<Mutex<Option<State>>>,
}

/// State of a started [`Tx`].
struct State {
    /// Exclusive guard over the shared [`Tables`].
    ///
    /// Serializes concurrent transactions for the transaction's lifetime.
    guard: OwnedMutexGuard<Tables>,

    /// Private copy of the [`Tables`] all operations apply to.
    staged: Tables,
}

impl Tx {
    /// Creates a new [`Tx`] client over the provided [`NonTx`] client's
    /// store.
    fn from_non_tx(client: &NonTx) -> Self {
        Self {
            tables: Arc::clone(&client.tables),
            state: Arc::new(Mutex::new(None)),
        }
    }

    /// Commits the staged writes into the shared [`Tables`].
    ///
    /// A no-op if no operation has run yet.
    async fn commit(&self) {
        if let Some(State { mut guard, staged }) =
            self.state.lock().await.take()
        {
            *guard = staged;
        }
    }
}

impl Access for Tx {
    async fn with<R>(&self, f: impl FnOnce(&mut Tables) -> R + Send) -> R {
        let mut state = self.state.lock().await;
        if state.is_none() {
            let guard = Arc::clone(&self.tables).lock_owned().await;
            let staged = Tables::clone(&guard);
            *state = Some(State { guard, staged });
        }
        let state = state
            .as_mut()
            .expect("state cannot be empty after initialization");
        f(&mut state.staged)
    }
}
