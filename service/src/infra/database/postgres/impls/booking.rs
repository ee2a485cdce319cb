//! [`Booking`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Lock, Select, Update},
    Money,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{booking, Booking},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns selected for a [`Booking`].
const COLUMNS: &str = "\
    id, car_id, renter_id, date_from, date_to, \
    total_price, total_price_currency, status, contract_signed, created_at";

/// Restores a [`Booking`] from the provided [`Row`].
fn from_row(row: &Row) -> Booking {
    Booking {
        id: row.get("id"),
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
    }
}

impl<C> Database<Select<By<Option<Booking>, booking::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Booking>, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let sql = format!("SELECT {COLUMNS} FROM bookings WHERE id = $1");
        Ok(self
            .query_opt(&sql, &[&by.into_inner()])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| from_row(&row)))
    }
}

impl<C> Database<Select<By<Vec<Booking>, read::booking::OfRenter>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Booking>, read::booking::OfRenter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::booking::OfRenter { renter_id, status } = by.into_inner();
        let sql = format!(
            "SELECT {COLUMNS} FROM bookings \
             WHERE renter_id = $1 AND status = $2 \
             ORDER BY created_at",
        );
        Ok(self
            .query(&sql, &[&renter_id, &status])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Select<By<Vec<Booking>, read::booking::ActiveOfCar>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Booking>, read::booking::ActiveOfCar>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::booking::ActiveOfCar(car_id) = by.into_inner();
        let sql = format!(
            "SELECT {COLUMNS} FROM bookings \
             WHERE car_id = $1 AND status != $2 \
             ORDER BY created_at",
        );
        Ok(self
            .query(&sql, &[&car_id, &booking::Status::Cancelled])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Booking>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(booking): Insert<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            INSERT INTO bookings (id, car_id, renter_id, date_from, date_to, \
                                  total_price, total_price_currency, status, \
                                  contract_signed, created_at) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)";
        self.exec(
            SQL,
            &[
                &booking.id,
                &booking.car_id,
                &booking.renter_id,
                &booking.date_from,
                &booking.date_to,
                &booking.total_price.amount,
                &booking.total_price.currency,
                &booking.status,
                &booking.contract_signed,
                &booking.created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<Booking>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(booking): Update<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            UPDATE bookings \
            SET status = $2, contract_signed = $3 \
            WHERE id = $1";
        self.exec(
            SQL,
            &[&booking.id, &booking.status, &booking.contract_signed],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Booking, booking::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Booking, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "SELECT id FROM bookings WHERE id = $1 FOR UPDATE";
        self.query(SQL, &[&by.into_inner()])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
