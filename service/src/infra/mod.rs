//! Infrastructure layer.

pub mod database;
pub mod documents;

pub use self::{
    database::{in_memory, Database, InMemory},
    documents::Documents,
};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
