//! [`Command`] for creating a new [`Payment`] attempt.

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{booking, car, payment, user, Booking, Car, Payment},
    gateway,
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Payment`] attempt.
///
/// Records the PENDING [`Payment`] row first and only then builds the
/// provider artifact, so an inbound callback can never observe a missing
/// order reference. Completion is applied exclusively by
/// [`ReconcilePayment`].
///
/// [`ReconcilePayment`]: super::ReconcilePayment
#[derive(Clone, Copy, Debug)]
pub struct CreatePayment {
    /// ID of the [`Booking`] to collect funds for.
    pub booking_id: booking::Id,

    /// ID of the renter paying for the [`Booking`].
    pub renter_id: user::Id,

    /// [`payment::Method`] chosen by the renter.
    pub method: payment::Method,
}

impl<Db> Command<CreatePayment> for Service<Db>
where
    Db: Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Car>, car::Id>>,
            Ok = Option<Car>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Booking, booking::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Payment>, crate::read::payment::PendingOf>>,
            Ok = Option<Payment>,
            Err = Traced<database::Error>,
        > + Database<Insert<Payment>, Err = Traced<database::Error>>
        + Database<Update<Payment>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = (Payment, gateway::Artifact);
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreatePayment,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreatePayment {
            booking_id,
            renter_id,
            method,
        } = cmd;

        let booking = self
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
            return Err(tracerr::new!(E::NotPayable(booking.status)));
        }

        let car = self
            .database()
            .execute(Select(By::<Option<Car>, _>::new(booking.car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CarNotExists(booking.car_id))
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Booking, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        // At most one non-terminal `Payment` may exist per booking, so a
        // newer attempt supersedes the previous one.
        if let Some(mut previous) = tx
            .execute(Select(By::<Option<Payment>, _>::new(
                crate::read::payment::PendingOf(booking_id),
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        {
            previous.status = payment::Status::Cancelled;
            tx.execute(Update(previous))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        let payment = Payment {
            id: payment::Id::new(),
            booking_id: booking.id,
            amount: booking.total_price,
            status: payment::Status::Pending,
            method,
            transaction_id: None,
            created_at: payment::CreationDateTime::now(),
        };
        tx.execute(Insert(payment.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let artifact = self.config().gateway.issue(&payment, &booking, &car);

        Ok((payment, artifact))
    }
}

/// Error of [`CreatePayment`] [`Command`] execution.
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

    /// [`Booking`] is not awaiting a payment.
    #[display("`Booking` in status `{_0}` cannot be paid")]
    NotPayable(#[error(not(source))] booking::Status),

    /// [`Car`] referenced by the [`Booking`] does not exist.
    #[display("`Car(id: {_0})` does not exist")]
    CarNotExists(#[error(not(source))] car::Id),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};

    use crate::{
        command::{fixtures, ConfirmBooking},
        domain::{payment, Booking, Payment, User},
        gateway,
        read,
        Command as _,
        Service,
    };

    use super::CreatePayment;

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
    async fn records_pending_payment_with_artifact() {
        let svc = fixtures::service();
        let (renter, booking) = confirmed_booking(&svc).await;

        let (payment, artifact) = svc
            .execute(CreatePayment {
                booking_id: booking.id,
                renter_id: renter.id,
                method: payment::Method::LinkPay,
            })
            .await
            .unwrap();

        assert_eq!(payment.status, payment::Status::Pending);
        assert_eq!(payment.amount, booking.total_price);
        assert!(matches!(artifact, gateway::Artifact::RedirectUrl(url)
            if url.contains(&payment.id.to_string())));
    }

    #[tokio::test]
    async fn qr_method_yields_payload() {
        let svc = fixtures::service();
        let (renter, booking) = confirmed_booking(&svc).await;

        let (_, artifact) = svc
            .execute(CreatePayment {
                booking_id: booking.id,
                renter_id: renter.id,
                method: payment::Method::BankQr,
            })
            .await
            .unwrap();

        assert!(matches!(artifact, gateway::Artifact::QrPayload(payload)
            if payload.starts_with("ST01|") && payload.contains("135.00")));
    }

    #[tokio::test]
    async fn new_attempt_supersedes_pending_one() {
        let svc = fixtures::service();
        let (renter, booking) = confirmed_booking(&svc).await;

        let (first, _) = svc
            .execute(CreatePayment {
                booking_id: booking.id,
                renter_id: renter.id,
                method: payment::Method::LinkPay,
            })
            .await
            .unwrap();
        let (second, _) = svc
            .execute(CreatePayment {
                booking_id: booking.id,
                renter_id: renter.id,
                method: payment::Method::CardGate,
            })
            .await
            .unwrap();

        let first = svc
            .database()
            .execute(Select(By::<Option<Payment>, _>::new(
                read::payment::Reference {
                    id: first.id,
                    method: payment::Method::LinkPay,
                },
            )))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.status, payment::Status::Cancelled);
        assert_eq!(second.status, payment::Status::Pending);
    }
}
