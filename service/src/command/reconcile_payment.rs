//! [`Command`] for reconciling a verified provider callback.

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{booking, payment, Booking, Payment},
    gateway,
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for reconciling a verified provider callback against the
/// [`Payment`] and [`Booking`] state.
///
/// The only path that may move a [`Payment`] into a terminal status. The
/// caller verifies the callback signature BEFORE constructing the
/// [`gateway::Event`]; this command trusts its input.
///
/// Replays of the same callback are safe: a [`Payment`] already in the
/// reported status is acknowledged without re-applying side effects.
#[derive(Clone, Debug)]
pub struct ReconcilePayment(pub gateway::Event);

impl<Db> Command<ReconcilePayment> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Payment, payment::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Payment>, read::payment::Reference>>,
            Ok = Option<Payment>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<Update<Payment>, Err = Traced<database::Error>>
        + Database<Update<Booking>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Payment;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        ReconcilePayment(event): ReconcilePayment,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Payment, _>::new(event.payment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        // Scoping by the verified method keeps order references of different
        // providers from colliding.
        let mut payment = tx
            .execute(Select(By::<Option<Payment>, _>::new(
                read::payment::Reference {
                    id: event.payment_id,
                    method: event.method,
                },
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PaymentNotExists(event.payment_id))
            .map_err(tracerr::wrap!())?;

        let target = match &event.outcome {
            gateway::Outcome::Completed => payment::Status::Completed,
            gateway::Outcome::Failed => payment::Status::Failed,
            gateway::Outcome::Cancelled => payment::Status::Cancelled,
            gateway::Outcome::Unknown(reported) => {
                log::warn!(
                    payment = %payment.id,
                    %reported,
                    "unrecognized provider status, leaving `Payment` pending",
                );
                return Ok(payment);
            }
        };

        if payment.status == target {
            // Duplicate delivery of an already applied callback.
            return Ok(payment);
        }
        if payment.status.is_terminal() {
            log::warn!(
                payment = %payment.id,
                current = %payment.status,
                reported = %target,
                "conflicting callback replay ignored",
            );
            return Ok(payment);
        }

        payment.status = target;
        if let Some(transaction_id) = event.transaction_id {
            payment.transaction_id = Some(transaction_id);
        }
        tx.execute(Update(payment.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let booking_status = match target {
            payment::Status::Completed => Some(booking::Status::Confirmed),
            // A failed charge re-opens the booking for another attempt; the
            // car stays held until an explicit cancellation.
            payment::Status::Failed => Some(booking::Status::Pending),
            payment::Status::Cancelled | payment::Status::Pending => None,
        };
        if let Some(status) = booking_status {
            if let Some(mut booking) = tx
                .execute(Select(By::<Option<Booking>, _>::new(
                    payment.booking_id,
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
            {
                booking.status = status;
                tx.execute(Update(booking))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
            }
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(payment)
    }
}

/// Error of [`ReconcilePayment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Payment`] referenced by the callback does not exist.
    #[display("`Payment(id: {_0})` does not exist")]
    PaymentNotExists(#[error(not(source))] payment::Id),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};

    use crate::{
        command::{fixtures, ConfirmBooking, CreatePayment},
        domain::{booking, payment, Booking, Payment},
        gateway,
        Command as _,
        Service,
    };

    use super::{ExecutionError, ReconcilePayment};

    async fn pending_payment(
        svc: &Service<crate::infra::InMemory>,
    ) -> Payment {
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
        let (payment, _) = svc
            .execute(CreatePayment {
                booking_id: booking.id,
                renter_id: renter.id,
                method: payment::Method::LinkPay,
            })
            .await
            .unwrap();
        payment
    }

    fn completed_event(payment: &Payment) -> gateway::Event {
        gateway::Event {
            payment_id: payment.id,
            method: payment::Method::LinkPay,
            outcome: gateway::Outcome::Completed,
            transaction_id: payment::TransactionId::new("lp-42"),
        }
    }

    async fn booking_of(
        svc: &Service<crate::infra::InMemory>,
        payment: &Payment,
    ) -> Booking {
        svc.database()
            .execute(Select(By::<Option<Booking>, _>::new(payment.booking_id)))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn completed_callback_confirms_booking() {
        let svc = fixtures::service();
        let payment = pending_payment(&svc).await;

        let updated = svc
            .execute(ReconcilePayment(completed_event(&payment)))
            .await
            .unwrap();

        assert_eq!(updated.status, payment::Status::Completed);
        assert_eq!(
            updated.transaction_id,
            payment::TransactionId::new("lp-42"),
        );
        assert_eq!(
            booking_of(&svc, &payment).await.status,
            booking::Status::Confirmed,
        );
    }

    #[tokio::test]
    async fn replayed_callback_is_a_safe_no_op() {
        let svc = fixtures::service();
        let payment = pending_payment(&svc).await;

        let first = svc
            .execute(ReconcilePayment(completed_event(&payment)))
            .await
            .unwrap();
        let second = svc
            .execute(ReconcilePayment(completed_event(&payment)))
            .await
            .unwrap();

        assert_eq!(first.status, payment::Status::Completed);
        assert_eq!(second.status, payment::Status::Completed);
        assert_eq!(
            booking_of(&svc, &payment).await.status,
            booking::Status::Confirmed,
        );
    }

    #[tokio::test]
    async fn failed_callback_reopens_booking_without_releasing_car() {
        let svc = fixtures::service();
        let payment = pending_payment(&svc).await;

        let updated = svc
            .execute(ReconcilePayment(gateway::Event {
                payment_id: payment.id,
                method: payment::Method::LinkPay,
                outcome: gateway::Outcome::Failed,
                transaction_id: None,
            }))
            .await
            .unwrap();

        assert_eq!(updated.status, payment::Status::Failed);
        let booking = booking_of(&svc, &payment).await;
        assert_eq!(booking.status, booking::Status::Pending);

        let car = svc
            .database()
            .execute(Select(By::<Option<crate::domain::Car>, _>::new(
                booking.car_id,
            )))
            .await
            .unwrap()
            .unwrap();
        assert!(!car.available, "failed payment does not release the car");
    }

    #[tokio::test]
    async fn cancelled_callback_leaves_booking_untouched() {
        let svc = fixtures::service();
        let payment = pending_payment(&svc).await;

        let updated = svc
            .execute(ReconcilePayment(gateway::Event {
                payment_id: payment.id,
                method: payment::Method::LinkPay,
                outcome: gateway::Outcome::Cancelled,
                transaction_id: None,
            }))
            .await
            .unwrap();

        assert_eq!(updated.status, payment::Status::Cancelled);
        assert_eq!(
            booking_of(&svc, &payment).await.status,
            booking::Status::Confirmed,
        );
    }

    #[tokio::test]
    async fn unknown_status_leaves_payment_pending() {
        let svc = fixtures::service();
        let payment = pending_payment(&svc).await;

        let updated = svc
            .execute(ReconcilePayment(gateway::Event {
                payment_id: payment.id,
                method: payment::Method::LinkPay,
                outcome: gateway::Outcome::Unknown("on-hold".into()),
                transaction_id: None,
            }))
            .await
            .unwrap();

        assert_eq!(updated.status, payment::Status::Pending);
    }

    #[tokio::test]
    async fn wrong_method_scope_resolves_nothing() {
        let svc = fixtures::service();
        let payment = pending_payment(&svc).await;

        let err = svc
            .execute(ReconcilePayment(gateway::Event {
                payment_id: payment.id,
                // Verified for another provider than the payment was
                // created with.
                method: payment::Method::CardGate,
                outcome: gateway::Outcome::Completed,
                transaction_id: None,
            }))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::PaymentNotExists(_),
        ));
    }
}
