//! [`Contract`]-related [`Database`] implementations.

use common::{
    operations::{By, Delete, Insert, Select, Update},
    Money,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{booking, contract, Booking, Contract},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns selected for a [`Contract`].
const COLUMNS: &str = "id, booking_id, document_path, signed, signature";

/// Restores a [`Contract`] from the provided [`Row`].
fn from_row(row: &Row) -> Contract {
    Contract {
        id: row.get("id"),
        booking_id: row.get("booking_id"),
        document_path: row.get("document_path"),
        signed: row.get("signed"),
        signature: row.get("signature"),
    }
}

impl<C> Database<Select<By<Option<Contract>, contract::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Contract>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let sql = format!("SELECT {COLUMNS} FROM contracts WHERE id = $1");
        Ok(self
            .query_opt(&sql, &[&by.into_inner()])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| from_row(&row)))
    }
}

impl<C> Database<Select<By<Option<Contract>, booking::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Contract>, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let sql =
            format!("SELECT {COLUMNS} FROM contracts WHERE booking_id = $1");
        Ok(self
            .query_opt(&sql, &[&by.into_inner()])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| from_row(&row)))
    }
}

impl<C>
    Database<
        Select<By<Vec<(Contract, Booking)>, read::contract::SignedOfRenter>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<(Contract, Booking)>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<(Contract, Booking)>, read::contract::SignedOfRenter>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::contract::SignedOfRenter(renter_id) = by.into_inner();
        const SQL: &str = "\
            SELECT c.id, c.booking_id, c.document_path, c.signed, \
                   c.signature, \
                   b.id AS b_id, b.car_id, b.renter_id, \
                   b.date_from, b.date_to, \
                   b.total_price, b.total_price_currency, \
                   b.status, b.contract_signed, b.created_at \
            FROM contracts AS c \
            JOIN bookings AS b ON b.id = c.booking_id \
            WHERE c.signed AND b.renter_id = $1 \
            ORDER BY b.created_at";
        Ok(self
            .query(SQL, &[&renter_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| {
                let contract = from_row(row);
                let booking = Booking {
                    id: row.get("b_id"),
                    car_id: row.get("car_id"),
                    renter_id: row.get("renter_id"),
                    date_from: row.get("date_from"),
                    date_to: row.get("date_to"),
                    total_price: Money {
                        amount: row.get("total_price"),
                        currency: row.get("total_price_currency"),
                    },
                    status: row.get("status"),
                    contract_signed: row.get("contract_signed"),
                    created_at: row.get("created_at"),
                };
                (contract, booking)
            })
            .collect())
    }
}

impl<C> Database<Insert<Contract>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(contract): Insert<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            INSERT INTO contracts (id, booking_id, document_path, \
                                   signed, signature) \
            VALUES ($1, $2, $3, $4, $5)";
        self.exec(
            SQL,
            &[
                &contract.id,
                &contract.booking_id,
                &contract.document_path,
                &contract.signed,
                &contract.signature,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<Contract>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(contract): Update<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            UPDATE contracts \
            SET document_path = $2, signed = $3, signature = $4 \
            WHERE id = $1";
        self.exec(
            SQL,
            &[
                &contract.id,
                &contract.document_path,
                &contract.signed,
                &contract.signature,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Delete<By<Contract, contract::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Contract, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "DELETE FROM contracts WHERE id = $1";
        self.exec(SQL, &[&by.into_inner()])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
