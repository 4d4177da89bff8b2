pub mod aggregate;
pub mod classify;
pub mod countdown;
pub mod dates;
pub mod sources;
pub mod upstream;
