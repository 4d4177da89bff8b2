pub mod countdown;
pub mod feeds;
pub mod health;
