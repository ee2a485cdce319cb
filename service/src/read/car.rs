//! [`Car`] read model definitions.

use crate::domain::car;
#[cfg(doc)]
use crate::domain::Car;

/// Selector of [`Car`]s that are available for booking in the given city.
#[derive(Clone, Debug)]
pub struct AvailableIn(pub car::City);

/// Selector of distinct cities having at least one available [`Car`].
#[derive(Clone, Copy, Debug)]
pub struct AvailableCities;

/// Selector of [`Car`]s belonging to the given owner.
#[derive(Clone, Copy, Debug)]
pub struct OfOwner(pub crate::domain::user::Id);
