//! [`Contract`] definitions.

use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::booking;

/// Rental agreement generated for a confirmed [`Booking`].
///
/// At most one [`Contract`] exists per [`Booking`]: regeneration reuses the
/// row and resets the signature.
///
/// [`Booking`]: crate::domain::Booking
#[derive(Clone, Debug)]
pub struct Contract {
    /// ID of this [`Contract`].
    pub id: Id,

    /// ID of the contracted [`Booking`].
    ///
    /// [`Booking`]: crate::domain::Booking
    pub booking_id: booking::Id,

    /// Where the rendered document is stored.
    pub document_path: DocumentPath,

    /// Whether the renter has signed this [`Contract`].
    pub signed: bool,

    /// Signature payload provided by the renter, if any.
    pub signature: Option<Signature>,
}

/// ID of a [`Contract`].
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Storage path of a rendered [`Contract`] document.
#[derive(AsRef, Clone, Debug, Display, Eq, From, Hash, Into, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct DocumentPath(String);

/// Signature payload of a [`Contract`].
#[derive(AsRef, Clone, Debug, Display, Eq, From, Hash, Into, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Signature(String);

/// Rendered [`Contract`] document awaiting storage.
#[derive(Clone, Debug)]
pub struct Document {
    /// ID of the [`Booking`] the document belongs to.
    ///
    /// Documents are stored keyed by this ID, so regeneration overwrites.
    ///
    /// [`Booking`]: crate::domain::Booking
    pub booking_id: booking::Id,

    /// Rendered document text.
    pub text: String,
}
