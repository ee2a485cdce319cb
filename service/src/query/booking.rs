//! [`Query`] collection related to [`Booking`]s.

use common::operations::By;

use crate::{
    domain::{booking, Booking},
    read,
};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`Booking`] by its [`booking::Id`].
pub type ById = DatabaseQuery<By<Option<Booking>, booking::Id>>;

/// Queries the [`Booking`]s of a renter in a given status.
pub type OfRenter = DatabaseQuery<By<Vec<Booking>, read::booking::OfRenter>>;
