#![no_std]
#![warn(clippy::suspicious, clippy::complexity, clippy::perf, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::similar_names)]

pub mod heater;
pub mod max31865;
pub mod scd30;
pub mod telemetry;

pub use self::{heater::Heater, max31865::Max31865, scd30::I2cTransport, telemetry::TelemetryLink};
