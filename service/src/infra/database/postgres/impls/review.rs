//! [`Review`]-related [`Database`] implementations.

use common::operations::Insert;
use tracerr::Traced;

use crate::{
    domain::Review,
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Insert<Review>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(review): Insert<Review>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            INSERT INTO reviews (id, car_id, renter_id, rating, comment) \
            VALUES ($1, $2, $3, $4, $5)";
        self.exec(
            SQL,
            &[
                &review.id,
                &review.car_id,
                &review.renter_id,
                &review.rating,
                &review.comment,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}
