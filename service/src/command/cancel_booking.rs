//! [`Command`] for cancelling a [`Booking`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{booking, car, user, Booking, Car},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for cancelling a [`Booking`].
///
/// The only transition releasing the booked [`Car`] back to availability.
#[derive(Clone, Copy, Debug)]
pub struct CancelBooking {
    /// ID of the [`Booking`] to cancel.
    pub booking_id: booking::Id,

    /// ID of the renter requesting the cancellation.
    pub renter_id: user::Id,
}

impl<Db> Command<CancelBooking> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Booking, booking::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<Lock<By<Car, car::Id>>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Car>, car::Id>>,
            Ok = Option<Car>,
            Err = Traced<database::Error>,
        > + Database<Update<Booking>, Err = Traced<database::Error>>
        + Database<Update<Car>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CancelBooking,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CancelBooking {
            booking_id,
            renter_id,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Booking, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut booking = tx
            .execute(Select(By::<Option<Booking>, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookingNotExists(booking_id))
            .map_err(tracerr::wrap!())?;
        if booking.renter_id != renter_id {
            return Err(tracerr::new!(E::NotBookingRenter(renter_id)));
        }
        match booking.status {
            booking::Status::Pending | booking::Status::Confirmed => {}
            status @ (booking::Status::Cancelled
            | booking::Status::Completed) => {
                return Err(tracerr::new!(E::NotCancellable(status)));
            }
        }

        booking.status = booking::Status::Cancelled;
        tx.execute(Update(booking.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Lock(By::<Car, _>::new(booking.car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        if let Some(mut car) = tx
            .execute(Select(By::<Option<Car>, _>::new(booking.car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        {
            car.available = true;
            tx.execute(Update(car))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(booking)
    }
}

/// Error of [`CancelBooking`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Booking`] with the provided ID does not exist.
    #[display("`Booking(id: {_0})` does not exist")]
    BookingNotExists(#[error(not(source))] booking::Id),

    /// [`Booking`] belongs to another renter.
    #[display("`User(id: {_0})` is not the booking's renter")]
    NotBookingRenter(#[error(not(source))] user::Id),

    /// [`Booking`] is already in a terminal status.
    #[display("`Booking` in status `{_0}` cannot be cancelled")]
    NotCancellable(#[error(not(source))] booking::Status),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};

    use crate::{
        command::{fixtures, ConfirmBooking},
        domain::{booking, Car},
        Command as _,
    };

    use super::{CancelBooking, ExecutionError};

    #[tokio::test]
    async fn cancellation_releases_the_car() {
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

        let cancelled = svc
            .execute(CancelBooking {
                booking_id: booking.id,
                renter_id: renter.id,
            })
            .await
            .unwrap();
        assert_eq!(cancelled.status, booking::Status::Cancelled);

        let car = svc
            .database()
            .execute(Select(By::<Option<Car>, _>::new(car.id)))
            .await
            .unwrap()
            .unwrap();
        assert!(car.available, "cancellation releases the car");

        // A second cancellation hits the terminal status guard.
        let err = svc
            .execute(CancelBooking {
                booking_id: booking.id,
                renter_id: renter.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::NotCancellable(booking::Status::Cancelled),
        ));
    }
}
