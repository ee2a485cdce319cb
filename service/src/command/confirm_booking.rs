//! [`Command`] for confirming a new [`Booking`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted, Update},
    Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{booking, car, user, Booking, Car, User},
    infra::{database, Database},
    pricing, Service,
};

use super::Command;

/// [`Command`] for confirming a new [`Booking`].
///
/// The terminal step of the booking dialog: everything the dialog validated
/// is re-validated here against the locked current state, so a car can never
/// be double-booked and a stale summary can never be silently charged.
#[derive(Clone, Debug)]
pub struct ConfirmBooking {
    /// ID of the renting [`User`].
    pub renter_id: user::Id,

    /// ID of the [`Car`] to book.
    pub car_id: car::Id,

    /// First rental day, inclusive.
    pub date_from: booking::StartDate,

    /// Last rental day, inclusive.
    pub date_to: booking::EndDate,

    /// Total price the renter confirmed in the dialog summary.
    pub quoted_price: Money,
}

impl<Db> Command<ConfirmBooking> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Lock<By<Car, car::Id>>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Car>, car::Id>>,
            Ok = Option<Car>,
            Err = Traced<database::Error>,
        > + Database<Insert<Booking>, Err = Traced<database::Error>>
        + Database<Update<Car>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ConfirmBooking,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ConfirmBooking {
            renter_id,
            car_id,
            date_from,
            date_to,
            quoted_price,
        } = cmd;

        let renter = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(renter_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(renter_id))
            .map_err(tracerr::wrap!())?;
        if !renter.registered {
            return Err(tracerr::new!(E::UserNotRegistered(renter_id)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serializes concurrent confirmations of the same `Car`: only one of
        // them may observe `available == true`.
        tx.execute(Lock(By::new(car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut car = tx
            .execute(Select(By::<Option<Car>, _>::new(car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CarNotExists(car_id))
            .map_err(tracerr::wrap!())?;
        if !car.available {
            return Err(tracerr::new!(E::CarUnavailable(car_id)));
        }

        // Priced from the locked row, not from any dialog snapshot.
        let total =
            pricing::quote(date_from, date_to, car.price_per_day, car.discount)
                .map_err(tracerr::from_and_wrap!(=> E))?;
        if total != quoted_price {
            return Err(tracerr::new!(E::PriceChanged {
                quoted: quoted_price,
                actual: total,
            }));
        }

        let booking = Booking {
            id: booking::Id::new(),
            car_id: car.id,
            renter_id: renter.id,
            date_from,
            date_to,
            total_price: total,
            status: booking::Status::Confirmed,
            contract_signed: false,
            created_at: booking::CreationDateTime::now(),
        };
        tx.execute(Insert(booking.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        car.available = false;
        tx.execute(Update(car))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(booking)
    }
}

/// Error of [`ConfirmBooking`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// [`User`] has not completed the registration.
    #[display("`User(id: {_0})` is not registered")]
    UserNotRegistered(#[error(not(source))] user::Id),

    /// [`Car`] with the provided ID does not exist.
    #[display("`Car(id: {_0})` does not exist")]
    CarNotExists(#[error(not(source))] car::Id),

    /// [`Car`] is no longer available for booking.
    #[display("`Car(id: {_0})` is not available")]
    CarUnavailable(#[error(not(source))] car::Id),

    /// Rental period is invalid.
    #[display("invalid rental period: {_0}")]
    #[from]
    InvalidPeriod(pricing::InvalidPeriod),

    /// Current price differs from the one the renter confirmed.
    #[display("price changed from `{quoted}` to `{actual}`")]
    PriceChanged {
        /// Total price the renter confirmed.
        quoted: Money,

        /// Total price computed from the current [`Car`] state.
        actual: Money,
    },
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};

    use crate::{
        command::fixtures,
        domain::{booking, Car},
        Command as _,
    };

    use super::{ConfirmBooking, ExecutionError};

    fn cmd(
        renter_id: crate::domain::user::Id,
        car_id: crate::domain::car::Id,
    ) -> ConfirmBooking {
        ConfirmBooking {
            renter_id,
            car_id,
            date_from: "01.03.2030".parse().unwrap(),
            date_to: "03.03.2030".parse().unwrap(),
            // 50/day, 3 days, 10% off.
            quoted_price: fixtures::eur("135.00"),
        }
    }

    #[tokio::test]
    async fn confirms_and_flips_availability() {
        let svc = fixtures::service();
        let owner = fixtures::owner(&svc, 1).await;
        let renter = fixtures::renter(&svc, 2).await;
        let car = fixtures::car(&svc, owner.id).await;

        let booking = svc.execute(cmd(renter.id, car.id)).await.unwrap();

        assert_eq!(booking.status, booking::Status::Confirmed);
        assert_eq!(booking.total_price, fixtures::eur("135.00"));

        let car = svc
            .database()
            .execute(Select(By::<Option<Car>, _>::new(car.id)))
            .await
            .unwrap()
            .unwrap();
        assert!(!car.available, "confirmation holds the car");
    }

    #[tokio::test]
    async fn rejects_stale_quoted_price() {
        let svc = fixtures::service();
        let owner = fixtures::owner(&svc, 1).await;
        let renter = fixtures::renter(&svc, 2).await;
        let car = fixtures::car(&svc, owner.id).await;

        let mut stale = cmd(renter.id, car.id);
        stale.quoted_price = fixtures::eur("150.00");
        let err = svc.execute(stale).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::PriceChanged { .. },
        ));
    }

    #[tokio::test]
    async fn unregistered_renter_cannot_confirm() {
        let svc = fixtures::service();
        let owner = fixtures::owner(&svc, 1).await;
        let car = fixtures::car(&svc, owner.id).await;

        let err = svc
            .execute(cmd(crate::domain::user::Id::new(), car.id))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UserNotExists(_)));
    }

    #[tokio::test]
    async fn concurrent_confirmations_race_for_one_car() {
        let svc = fixtures::service();
        let owner = fixtures::owner(&svc, 1).await;
        let first = fixtures::renter(&svc, 2).await;
        let second = fixtures::renter(&svc, 3).await;
        let car = fixtures::car(&svc, owner.id).await;

        let (a, b) = tokio::join!(
            svc.execute(cmd(first.id, car.id)),
            svc.execute(cmd(second.id, car.id)),
        );

        // Exactly one confirmation may win the car.
        let (winner, loser) = match (a, b) {
            (Ok(b), Err(e)) | (Err(e), Ok(b)) => (b, e),
            (Ok(_), Ok(_)) => panic!("both confirmations succeeded"),
            (Err(_), Err(_)) => panic!("both confirmations failed"),
        };
        assert_eq!(winner.status, booking::Status::Confirmed);
        assert!(matches!(
            loser.as_ref(),
            ExecutionError::CarUnavailable(_),
        ));

        let car = svc
            .database()
            .execute(Select(By::<Option<Car>, _>::new(car.id)))
            .await
            .unwrap()
            .unwrap();
        assert!(!car.available);
    }
}
