//! [`Payment`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Lock, Select, Update},
    Money,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{payment, Payment},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns selected for a [`Payment`].
const COLUMNS: &str = "\
    id, booking_id, amount, amount_currency, status, method, \
    transaction_id, created_at";

/// Restores a [`Payment`] from the provided [`Row`].
fn from_row(row: &Row) -> Payment {
    Payment {
        id: row.get("id"),
        booking_id: row.get("booking_id"),
        amount: Money {
            amount: row.get("amount"),
            currency: row.get("amount_currency"),
        },
        status: row.get("status"),
        method: row.get("method"),
        transaction_id: row.get("transaction_id"),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Payment>, read::payment::Reference>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Payment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Payment>, read::payment::Reference>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::payment::Reference { id, method } = by.into_inner();
        let sql = format!(
            "SELECT {COLUMNS} FROM payments WHERE id = $1 AND method = $2",
        );
        Ok(self
            .query_opt(&sql, &[&id, &method])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| from_row(&row)))
    }
}

impl<C> Database<Select<By<Option<Payment>, read::payment::PendingOf>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Payment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Payment>, read::payment::PendingOf>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::payment::PendingOf(booking_id) = by.into_inner();
        let sql = format!(
            "SELECT {COLUMNS} FROM payments \
             WHERE booking_id = $1 AND status = $2 \
             LIMIT 1",
        );
        Ok(self
            .query_opt(&sql, &[&booking_id, &payment::Status::Pending])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| from_row(&row)))
    }
}

impl<C> Database<Insert<Payment>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(payment): Insert<Payment>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            INSERT INTO payments (id, booking_id, amount, amount_currency, \
                                  status, method, transaction_id, created_at) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";
        self.exec(
            SQL,
            &[
                &payment.id,
                &payment.booking_id,
                &payment.amount.amount,
                &payment.amount.currency,
                &payment.status,
                &payment.method,
                &payment.transaction_id,
                &payment.created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<Payment>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(payment): Update<Payment>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            UPDATE payments \
            SET status = $2, transaction_id = $3 \
            WHERE id = $1";
        self.exec(
            SQL,
            &[&payment.id, &payment.status, &payment.transaction_id],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Payment, payment::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Payment, payment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "SELECT id FROM payments WHERE id = $1 FOR UPDATE";
        self.query(SQL, &[&by.into_inner()])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
