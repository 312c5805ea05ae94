//! Quantities used across the firmware.
pub use uom::si::f32::{ElectricalResistance, Ratio, ThermodynamicTemperature, Time};
