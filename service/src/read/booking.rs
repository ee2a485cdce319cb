//! [`Booking`] read model definitions.

use crate::domain::{booking, user};
#[cfg(doc)]
use crate::domain::Booking;

/// Selector of [`Booking`]s of the given renter in the given status.
#[derive(Clone, Copy, Debug)]
pub struct OfRenter {
    /// ID of the renter.
    pub renter_id: user::Id,

    /// [`booking::Status`] to filter by.
    pub status: booking::Status,
}

/// Selector of non-cancelled [`Booking`]s referencing the given [`Car`].
///
/// [`Car`]: crate::domain::Car
#[derive(Clone, Copy, Debug)]
pub struct ActiveOfCar(pub crate::domain::car::Id);
