//! [`Car`]-related [`Database`] implementations.

use common::{
    operations::{By, Delete, Insert, Lock, Select, Update},
    Money,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{car, Car},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns selected for a [`Car`].
const COLUMNS: &str = "\
    id, owner_id, brand, model, year, license_plate, \
    price_per_day, price_currency, discount, city, rental_terms, available";

/// Restores a [`Car`] from the provided [`Row`].
fn from_row(row: &Row) -> Car {
    Car {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        brand: row.get("brand"),
        model: row.get("model"),
        year: row.get("year"),
        license_plate: row.get("license_plate"),
        price_per_day: Money {
            amount: row.get("price_per_day"),
            currency: row.get("price_currency"),
        },
        discount: row.get("discount"),
        city: row.get("city"),
        rental_terms: row.get("rental_terms"),
        available: row.get("available"),
    }
}

impl<C> Database<Select<By<Option<Car>, car::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Car>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Car>, car::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let sql = format!("SELECT {COLUMNS} FROM cars WHERE id = $1");
        Ok(self
            .query_opt(&sql, &[&by.into_inner()])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| from_row(&row)))
    }
}

impl<C> Database<Select<By<Vec<Car>, read::car::AvailableIn>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Car>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Car>, read::car::AvailableIn>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::car::AvailableIn(city) = by.into_inner();
        let sql = format!(
            "SELECT {COLUMNS} FROM cars \
             WHERE available AND city = $1 \
             ORDER BY brand, model",
        );
        Ok(self
            .query(&sql, &[&city])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Select<By<Vec<car::City>, read::car::AvailableCities>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<car::City>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(_): Select<By<Vec<car::City>, read::car::AvailableCities>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            SELECT DISTINCT city FROM cars WHERE available ORDER BY city";
        Ok(self
            .query(SQL, &[])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| row.get("city"))
            .collect())
    }
}

impl<C> Database<Select<By<Vec<Car>, read::car::OfOwner>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Car>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Car>, read::car::OfOwner>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::car::OfOwner(owner_id) = by.into_inner();
        let sql = format!(
            "SELECT {COLUMNS} FROM cars \
             WHERE owner_id = $1 \
             ORDER BY brand, model",
        );
        Ok(self
            .query(&sql, &[&owner_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Car>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(car): Insert<Car>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            INSERT INTO cars (id, owner_id, brand, model, year, \
                              license_plate, price_per_day, price_currency, \
                              discount, city, rental_terms, available) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)";
        self.exec(
            SQL,
            &[
                &car.id,
                &car.owner_id,
                &car.brand,
                &car.model,
                &car.year,
                &car.license_plate,
                &car.price_per_day.amount,
                &car.price_per_day.currency,
                &car.discount,
                &car.city,
                &car.rental_terms,
                &car.available,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<Car>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(car): Update<Car>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            UPDATE cars \
            SET brand = $2, model = $3, year = $4, license_plate = $5, \
                price_per_day = $6, price_currency = $7, discount = $8, \
                city = $9, rental_terms = $10, available = $11 \
            WHERE id = $1";
        self.exec(
            SQL,
            &[
                &car.id,
                &car.brand,
                &car.model,
                &car.year,
                &car.license_plate,
                &car.price_per_day.amount,
                &car.price_per_day.currency,
                &car.discount,
                &car.city,
                &car.rental_terms,
                &car.available,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Delete<By<Car, car::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Car, car::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "DELETE FROM cars WHERE id = $1";
        self.exec(SQL, &[&by.into_inner()])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Car, car::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Car, car::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "SELECT id FROM cars WHERE id = $1 FOR UPDATE";
        self.query(SQL, &[&by.into_inner()])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
