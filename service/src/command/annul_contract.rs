//! [`Command`] for annulling a signed [`Contract`].

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{booking, contract, user, Booking, Contract},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for annulling a signed [`Contract`].
///
/// Only a signed [`Contract`] may be annulled; the row is deleted and the
/// [`Booking`]'s signed flag reset in one transaction, then the stored
/// document is dropped.
#[derive(Clone, Copy, Debug)]
pub struct AnnulContract {
    /// ID of the [`Contract`] to annul.
    pub contract_id: contract::Id,

    /// ID of the renter requesting the annulment.
    pub renter_id: user::Id,
}

impl<Db> Command<AnnulContract> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Contract>, contract::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Booking, booking::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<Delete<By<Contract, contract::Id>>, Err = Traced<database::Error>>
        + Database<Update<Booking>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AnnulContract,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AnnulContract {
            contract_id,
            renter_id,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let contract = tx
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;
        if !contract.signed {
            // Annulment undoes a signature; an unsigned contract has
            // nothing to undo.
            return Err(tracerr::new!(E::NotSigned(contract_id)));
        }

        tx.execute(Lock(By::<Booking, _>::new(contract.booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut booking = tx
            .execute(Select(By::<Option<Booking>, _>::new(contract.booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookingNotExists(contract.booking_id))
            .map_err(tracerr::wrap!())?;
        if booking.renter_id != renter_id {
            return Err(tracerr::new!(E::NotBookingRenter(renter_id)));
        }

        tx.execute(Delete(By::<Contract, _>::new(contract.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        booking.contract_signed = false;
        tx.execute(Update(booking))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        // Best-effort cleanup: the durable state is already consistent.
        if let Err(e) = self.documents().remove(contract.booking_id) {
            log::warn!(
                booking = %contract.booking_id,
                "failed to remove annulled contract document: {e}",
            );
        }

        Ok(())
    }
}

/// Error of [`AnnulContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Contract`] is not signed.
    #[display("`Contract(id: {_0})` is not signed")]
    NotSigned(#[error(not(source))] contract::Id),

    /// [`Booking`] referenced by the [`Contract`] does not exist.
    #[display("`Booking(id: {_0})` does not exist")]
    BookingNotExists(#[error(not(source))] booking::Id),

    /// [`Booking`] belongs to another renter.
    #[display("`User(id: {_0})` is not the booking's renter")]
    NotBookingRenter(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};

    use crate::{
        command::{
            fixtures, ConfirmBooking, GenerateContract, SignContract,
        },
        domain::{contract, Booking, Contract, User},
        Command as _,
        Service,
    };

    use super::{AnnulContract, ExecutionError};

    async fn signed_contract(
        svc: &Service<crate::infra::InMemory>,
    ) -> (User, Booking, Contract) {
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
        let contract = svc
            .execute(GenerateContract {
                booking_id: booking.id,
                renter_id: renter.id,
            })
            .await
            .unwrap();
        let contract = svc
            .execute(SignContract {
                contract_id: contract.id,
                renter_id: renter.id,
                signature: None,
            })
            .await
            .unwrap();
        (renter, booking, contract)
    }

    #[tokio::test]
    async fn annulment_deletes_row_and_resets_booking() {
        let svc = fixtures::service();
        let (renter, booking, contract) = signed_contract(&svc).await;

        svc.execute(AnnulContract {
            contract_id: contract.id,
            renter_id: renter.id,
        })
        .await
        .unwrap();

        let gone = svc
            .database()
            .execute(Select(By::<Option<Contract>, _>::new(contract.id)))
            .await
            .unwrap();
        assert!(gone.is_none(), "contract row is deleted");

        let booking = svc
            .database()
            .execute(Select(By::<Option<Booking>, _>::new(booking.id)))
            .await
            .unwrap()
            .unwrap();
        assert!(!booking.contract_signed);

        assert!(
            svc.documents().read(booking.id).unwrap().is_none(),
            "stored document is dropped",
        );
    }

    #[tokio::test]
    async fn unsigned_contract_cannot_be_annulled() {
        let svc = fixtures::service();
        let (renter, _, contract) = signed_contract(&svc).await;

        // Regeneration resets the signature, leaving it unsigned.
        let unsigned = svc
            .execute(GenerateContract {
                booking_id: contract.booking_id,
                renter_id: renter.id,
            })
            .await
            .unwrap();

        let err = svc
            .execute(AnnulContract {
                contract_id: unsigned.id,
                renter_id: renter.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::NotSigned(_)));

        let still_there = svc
            .database()
            .execute(Select(By::<Option<Contract>, _>::new(unsigned.id)))
            .await
            .unwrap();
        assert!(still_there.is_some(), "no row is deleted on rejection");
    }

    #[tokio::test]
    async fn annulling_nonexistent_contract_fails() {
        let svc = fixtures::service();
        let (renter, ..) = signed_contract(&svc).await;

        let err = svc
            .execute(AnnulContract {
                contract_id: contract::Id::new(),
                renter_id: renter.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::ContractNotExists(_),
        ));
    }
}
