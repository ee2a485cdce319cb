//! [`Query`] collection related to [`Car`]s.

use common::operations::By;

use crate::{
    domain::{car, Car},
    read,
};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`Car`] by its [`car::Id`].
pub type ById = DatabaseQuery<By<Option<Car>, car::Id>>;

/// Queries the [`Car`]s available for booking in a city.
pub type AvailableIn = DatabaseQuery<By<Vec<Car>, read::car::AvailableIn>>;

/// Queries the cities having at least one available [`Car`].
pub type AvailableCities =
    DatabaseQuery<By<Vec<car::City>, read::car::AvailableCities>>;

/// Queries the [`Car`]s of an owner.
pub type OfOwner = DatabaseQuery<By<Vec<Car>, read::car::OfOwner>>;
