//! [`Contract`] read model definitions.

use crate::domain::user;
#[cfg(doc)]
use crate::domain::{Booking, Contract};

/// Selector of signed [`Contract`]s of the given renter, joined with their
/// [`Booking`]s for display.
#[derive(Clone, Copy, Debug)]
pub struct SignedOfRenter(pub user::Id);
