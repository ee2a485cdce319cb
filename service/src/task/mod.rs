//! Background [`Task`]s definitions.

mod background;
pub mod expire_stale_sessions;

pub use common::Handler as Task;

pub use self::{
    background::Background, expire_stale_sessions::ExpireStaleSessions,
};
