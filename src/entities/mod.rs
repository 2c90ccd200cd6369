pub mod prelude;

pub mod pending_uploads;
