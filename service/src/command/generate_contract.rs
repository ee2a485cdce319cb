//! [`Command`] for generating a rental [`Contract`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{booking, car, contract, user, Booking, Car, Contract, User},
    infra::{database, documents, Database},
    Service,
};

use super::Command;

/// [`Command`] for generating a rental [`Contract`].
///
/// Renders the agreement document, stores it keyed by the [`Booking`] and
/// upserts the [`Contract`] row: regenerating for an already-contracted
/// [`Booking`] reuses the row and resets the signature instead of
/// duplicating it.
#[derive(Clone, Copy, Debug)]
pub struct GenerateContract {
    /// ID of the [`Booking`] to contract.
    pub booking_id: booking::Id,

    /// ID of the renter requesting the [`Contract`].
    pub renter_id: user::Id,
}

impl<Db> Command<GenerateContract> for Service<Db>
where
    Db: Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Car>, car::Id>>,
            Ok = Option<Car>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Booking, booking::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Contract>, booking::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        > + Database<Insert<Contract>, Err = Traced<database::Error>>
        + Database<Update<Contract>, Err = Traced<database::Error>>
        + Database<Update<Booking>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Contract;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: GenerateContract,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let GenerateContract {
            booking_id,
            renter_id,
        } = cmd;

        let mut booking = self
            .database()
            .execute(Select(By::<Option<Booking>, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookingNotExists(booking_id))
            .map_err(tracerr::wrap!())?;
        if booking.renter_id != renter_id {
            return Err(tracerr::new!(E::NotBookingRenter(renter_id)));
        }
        if booking.status != booking::Status::Confirmed {
            return Err(tracerr::new!(E::NotContractable(booking.status)));
        }

        let car = self
            .database()
            .execute(Select(By::<Option<Car>, _>::new(booking.car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CarNotExists(booking.car_id))
            .map_err(tracerr::wrap!())?;
        let renter = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(renter_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(renter_id))
            .map_err(tracerr::wrap!())?;

        // Rendering and storage happen before the transaction opens; only
        // row bookkeeping is transactional.
        let document = contract::Document {
            booking_id: booking.id,
            text: render(&booking, &car, &renter),
        };
        let document_path = self
            .documents()
            .store(&document)
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Booking, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let existing = tx
            .execute(Select(By::<Option<Contract>, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let contract = if let Some(mut contract) = existing {
            contract.document_path = document_path;
            contract.signed = false;
            contract.signature = None;
            tx.execute(Update(contract.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            contract
        } else {
            let contract = Contract {
                id: contract::Id::new(),
                booking_id: booking.id,
                document_path,
                signed: false,
                signature: None,
            };
            tx.execute(Insert(contract.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            contract
        };

        if booking.contract_signed {
            booking.contract_signed = false;
            tx.execute(Update(booking))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(contract)
    }
}

/// Renders the agreement document text.
fn render(booking: &Booking, car: &Car, renter: &User) -> String {
    let terms = car
        .rental_terms
        .as_ref()
        .map(|t| format!("\nSpecial terms:\n{t}\n"))
        .unwrap_or_default();
    format!(
        "RENTAL AGREEMENT\n\
         \n\
         Booking reference: {}\n\
         Renter: {}{}\n\
         Car: {} {} ({})\n\
         Rental period: {} - {} (inclusive)\n\
         Total price: {}\n\
         {terms}\n\
         The renter takes over the car in the agreed city and returns it in\n\
         the same condition on the last rental day. The agreement becomes\n\
         effective once signed by the renter.\n",
        booking.id,
        renter.name,
        renter
            .phone
            .as_ref()
            .map(|p| format!(", {p}"))
            .unwrap_or_default(),
        car.brand,
        car.model,
        car.year,
        booking.date_from,
        booking.date_to,
        booking.total_price,
    )
}

/// Error of [`GenerateContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Documents`] store error.
    ///
    /// [`Documents`]: crate::infra::Documents
    #[display("`Documents` operation failed: {_0}")]
    #[from]
    Documents(documents::Error),

    /// [`Booking`] with the provided ID does not exist.
    #[display("`Booking(id: {_0})` does not exist")]
    BookingNotExists(#[error(not(source))] booking::Id),

    /// [`Booking`] belongs to another renter.
    #[display("`User(id: {_0})` is not the booking's renter")]
    NotBookingRenter(#[error(not(source))] user::Id),

    /// [`Booking`] is not in a contractable status.
    #[display("`Booking` in status `{_0}` cannot be contracted")]
    NotContractable(#[error(not(source))] booking::Status),

    /// [`Car`] referenced by the [`Booking`] does not exist.
    #[display("`Car(id: {_0})` does not exist")]
    CarNotExists(#[error(not(source))] car::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{fixtures, ConfirmBooking},
        domain::{booking, Booking, User},
        Command as _,
        Service,
    };

    use super::GenerateContract;

    async fn confirmed_booking(
        svc: &Service<crate::infra::InMemory>,
    ) -> (User, Booking) {
        let owner = fixtures::owner(svc, 1).await;
        let renter = fixtures::renter(svc, 2).await;
        let car = fixtures::car(svc, owner.id).await;
        let booking = svc
            .execute(ConfirmBooking {
                renter_id: renter.id,
                car_id: car.id,
                date_from: "01.03.2030".parse().unwrap(),
                date_to: "03.03.2030".parse().unwrap(),
                quoted_price: fixtures::eur("135.00"),
            })
            .await
            .unwrap();
        (renter, booking)
    }

    #[tokio::test]
    async fn generates_unsigned_contract_with_document() {
        let svc = fixtures::service();
        let (renter, booking) = confirmed_booking(&svc).await;

        let contract = svc
            .execute(GenerateContract {
                booking_id: booking.id,
                renter_id: renter.id,
            })
            .await
            .unwrap();

        assert!(!contract.signed);
        assert_eq!(contract.booking_id, booking.id);

        let text = svc.documents().read(booking.id).unwrap().unwrap();
        assert!(text.contains("RENTAL AGREEMENT"));
        assert!(text.contains("Skoda Octavia"));
        assert!(text.contains("135EUR"));
    }

    #[tokio::test]
    async fn regeneration_reuses_the_row() {
        let svc = fixtures::service();
        let (renter, booking) = confirmed_booking(&svc).await;

        let first = svc
            .execute(GenerateContract {
                booking_id: booking.id,
                renter_id: renter.id,
            })
            .await
            .unwrap();
        let second = svc
            .execute(GenerateContract {
                booking_id: booking.id,
                renter_id: renter.id,
            })
            .await
            .unwrap();

        assert_eq!(first.id, second.id, "no duplicate contract rows");
        assert!(!second.signed);
    }

    #[tokio::test]
    async fn pending_booking_is_not_contractable() {
        let svc = fixtures::service();
        let (renter, _) = confirmed_booking(&svc).await;

        let err = svc
            .execute(GenerateContract {
                booking_id: booking::Id::new(),
                renter_id: renter.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            super::ExecutionError::BookingNotExists(_),
        ));
    }
}
