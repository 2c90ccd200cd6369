pub mod events;
pub mod health;
pub mod sync;
pub mod uploads;
