#![cfg_attr(not(test), no_std)]
#![warn(clippy::suspicious, clippy::complexity, clippy::perf, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::similar_names)]

extern crate alloc;

// Must come first so the logging macros are visible to the other modules.
#[macro_use]
mod fmt;

pub mod crc;
pub mod decode;
pub mod monitor;
pub mod regulation;
pub mod scd30;
pub mod telemetry;
pub mod transport;
pub mod units;

#[cfg(test)]
mod mock;

pub use self::{
    monitor::Monitor,
    regulation::Regulator,
    scd30::Scd30,
    transport::{Address, Transport, TransportError},
};
