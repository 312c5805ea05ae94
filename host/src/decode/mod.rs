pub mod max31865;
pub mod scd30;
