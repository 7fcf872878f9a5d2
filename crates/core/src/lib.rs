#![forbid(unsafe_code)]

pub mod model;
pub mod scheduler;
pub mod session;
pub mod time;
pub mod vocab;

pub use time::Clock;
