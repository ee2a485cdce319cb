//! [`Query`] collection related to [`Contract`]s.

use common::operations::By;

use crate::{
    domain::{booking, Booking, Contract},
    read,
};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`Contract`] by the [`Booking`] it belongs to.
pub type OfBooking = DatabaseQuery<By<Option<Contract>, booking::Id>>;

/// Queries the signed [`Contract`]s of a renter, joined with their
/// [`Booking`]s.
pub type SignedOfRenter = DatabaseQuery<
    By<Vec<(Contract, Booking)>, read::contract::SignedOfRenter>,
>;
