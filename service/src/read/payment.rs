//! [`Payment`] read model definitions.

use crate::domain::{booking, payment};
#[cfg(doc)]
use crate::domain::Payment;

/// Selector of a [`Payment`] by the order reference a provider callback
/// carries.
///
/// Scoped by [`payment::Method`] so order IDs can never collide across
/// providers.
#[derive(Clone, Copy, Debug)]
pub struct Reference {
    /// ID of the [`Payment`], as passed to the provider.
    pub id: payment::Id,

    /// [`payment::Method`] the callback was verified for.
    pub method: payment::Method,
}

/// Selector of the active (non-terminal) [`Payment`] of the given booking.
#[derive(Clone, Copy, Debug)]
pub struct PendingOf(pub booking::Id);
