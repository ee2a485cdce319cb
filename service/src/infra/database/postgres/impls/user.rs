//! [`User`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Columns selected for a [`User`].
const COLUMNS: &str = "\
    id, chat_id, role, name, phone, company_name, tax_id, registered";

/// Restores a [`User`] from the provided [`Row`].
fn from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        chat_id: row.get("chat_id"),
        role: row.get("role"),
        name: row.get("name"),
        phone: row.get("phone"),
        company_name: row.get("company_name"),
        tax_id: row.get("tax_id"),
        registered: row.get("registered"),
    }
}

impl<C> Database<Select<By<Option<User>, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        Ok(self
            .query_opt(&sql, &[&by.into_inner()])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| from_row(&row)))
    }
}

impl<C> Database<Select<By<Option<User>, user::ChatId>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::ChatId>>,
    ) -> Result<Self::Ok, Self::Err> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE chat_id = $1");
        Ok(self
            .query_opt(&sql, &[&by.into_inner()])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| from_row(&row)))
    }
}

impl<C> Database<Insert<User>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            INSERT INTO users (id, chat_id, role, name, phone, \
                               company_name, tax_id, registered) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";
        self.exec(
            SQL,
            &[
                &user.id,
                &user.chat_id,
                &user.role,
                &user.name,
                &user.phone,
                &user.company_name,
                &user.tax_id,
                &user.registered,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<User>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            UPDATE users \
            SET role = $2, name = $3, phone = $4, \
                company_name = $5, tax_id = $6, registered = $7 \
            WHERE id = $1";
        self.exec(
            SQL,
            &[
                &user.id,
                &user.role,
                &user.name,
                &user.phone,
                &user.company_name,
                &user.tax_id,
                &user.registered,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}
