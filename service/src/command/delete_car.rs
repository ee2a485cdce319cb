//! [`Command`] for withdrawing a [`Car`] from the inventory.

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{booking, car, user, Booking, Car},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for withdrawing a [`Car`] from the inventory.
///
/// Refused while any non-cancelled [`Booking`] references the [`Car`]: an
/// unavailable car must always be explainable by such a booking.
#[derive(Clone, Copy, Debug)]
pub struct DeleteCar {
    /// ID of the [`Car`] to withdraw.
    pub car_id: car::Id,

    /// ID of the [`User`] requesting the withdrawal.
    ///
    /// [`User`]: crate::domain::User
    pub editor_id: user::Id,
}

impl<Db> Command<DeleteCar> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Lock<By<Car, car::Id>>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Car>, car::Id>>,
            Ok = Option<Car>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Booking>, read::booking::ActiveOfCar>>,
            Ok = Vec<Booking>,
            Err = Traced<database::Error>,
        > + Database<Delete<By<Car, car::Id>>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteCar) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteCar { car_id, editor_id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::new(car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let car = tx
            .execute(Select(By::<Option<Car>, _>::new(car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CarNotExists(car_id))
            .map_err(tracerr::wrap!())?;
        if car.owner_id != editor_id {
            return Err(tracerr::new!(E::NotCarOwner(editor_id)));
        }

        let active = tx
            .execute(Select(By::<Vec<Booking>, _>::new(
                read::booking::ActiveOfCar(car_id),
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if let Some(booking) = active.first() {
            return Err(tracerr::new!(E::HasActiveBooking(booking.id)));
        }

        tx.execute(Delete(By::<Car, _>::new(car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(())
    }
}

/// Error of [`DeleteCar`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Car`] with the provided ID does not exist.
    #[display("`Car(id: {_0})` does not exist")]
    CarNotExists(#[error(not(source))] car::Id),

    /// Editor does not own the [`Car`].
    #[display("`User(id: {_0})` does not own the car")]
    NotCarOwner(#[error(not(source))] user::Id),

    /// A non-cancelled [`Booking`] still references the [`Car`].
    #[display("`Booking(id: {_0})` still references the car")]
    HasActiveBooking(#[error(not(source))] booking::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{fixtures, CancelBooking, ConfirmBooking},
        Command as _,
    };

    use super::{DeleteCar, ExecutionError};

    #[tokio::test]
    async fn booked_car_cannot_be_withdrawn() {
        let svc = fixtures::service();
        let owner = fixtures::owner(&svc, 1).await;
        let renter = fixtures::renter(&svc, 2).await;
        let car = fixtures::car(&svc, owner.id).await;

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

        let err = svc
            .execute(DeleteCar {
                car_id: car.id,
                editor_id: owner.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::HasActiveBooking(_),
        ));

        // Cancellation releases the car and unblocks the withdrawal.
        svc.execute(CancelBooking {
            booking_id: booking.id,
            renter_id: renter.id,
        })
        .await
        .unwrap();

        svc.execute(DeleteCar {
            car_id: car.id,
            editor_id: owner.id,
        })
        .await
        .unwrap();
    }
}
