//! Domain definitions.

pub mod booking;
pub mod car;
pub mod contract;
pub mod payment;
pub mod review;
pub mod user;

pub use self::{
    booking::Booking, car::Car, contract::Contract, payment::Payment,
    review::Review, user::User,
};
