//! Canonical, platform-agnostic listing types shared by every source adapter
//! and by the feed endpoints.

pub mod event;
pub mod platform;

pub use self::event::*;
pub use self::platform::*;
