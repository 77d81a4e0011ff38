//! API handlers.

pub mod awards;
pub mod health;
pub mod users;
