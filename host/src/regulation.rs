//! Heater temperature regulation.
//!
//! A PID law over the setpoint error, evaluated once per control period:
//!
//! ```txt
//! e = setpoint - measured
//! D = (e₂ - e₁) / (t₂ - t₁)
//! I = Σ (t₂ - t₁) · e₁
//! power = Kp·e + Ki·I + Kd·D
//! ```
//!
//! The heater cannot cool, so power is 0 whenever the measurement is above the
//! setpoint, and is otherwise clamped to `0..=1`.
use core::future::Future;

use uom::si::{ratio::ratio, thermodynamic_temperature::degree_celsius, time::second};

use crate::units::{Ratio, ThermodynamicTemperature, Time};

/// PID gains. Errors are in °C and times in seconds.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl Default for Gains {
    fn default() -> Self {
        Self {
            kp: 0.01,
            ki: 0.0,
            kd: 0.0,
        }
    }
}

/// Hot plate target temperature.
pub const DEFAULT_SETPOINT_CELSIUS: f32 = 40.0;

#[derive(Debug, Copy, Clone, PartialEq)]
struct Sample {
    time_s: f32,
    error: f32,
}

/// Represents the regulator's working values after an update.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Terms {
    pub error: f32,
    pub integral: f32,
    pub derivative: f32,
    pub power: f32,
}

pub struct Regulator {
    gains: Gains,
    setpoint: ThermodynamicTemperature,
    previous: Option<Sample>,
    integral: f32,
    terms: Terms,
}

impl Default for Regulator {
    fn default() -> Self {
        Self::new(
            Gains::default(),
            ThermodynamicTemperature::new::<degree_celsius>(DEFAULT_SETPOINT_CELSIUS),
        )
    }
}

impl Regulator {
    #[must_use]
    pub fn new(gains: Gains, setpoint: ThermodynamicTemperature) -> Self {
        Self {
            gains,
            setpoint,
            previous: None,
            integral: 0.0,
            terms: Terms::default(),
        }
    }

    #[must_use]
    pub fn gains(&self) -> Gains {
        self.gains
    }

    #[must_use]
    pub fn setpoint(&self) -> ThermodynamicTemperature {
        self.setpoint
    }

    /// Terms computed by the last [`Regulator::update`].
    #[must_use]
    pub fn terms(&self) -> Terms {
        self.terms
    }

    /// Feeds a measurement taken at `now` and returns the heater power.
    pub fn update(&mut self, measured: ThermodynamicTemperature, now: Time) -> Ratio {
        let error = self.setpoint.get::<degree_celsius>() - measured.get::<degree_celsius>();
        let time_s = now.get::<second>();

        let derivative = match self.previous {
            Some(previous) if time_s > previous.time_s => {
                let dt = time_s - previous.time_s;
                self.integral += dt * previous.error;
                (error - previous.error) / dt
            }
            _ => 0.0,
        };
        self.previous = Some(Sample { time_s, error });

        let power = if error < 0.0 {
            0.0
        } else {
            let Gains { kp, ki, kd } = self.gains;
            (kp * error + ki * self.integral + kd * derivative).clamp(0.0, 1.0)
        };

        self.terms = Terms {
            error,
            integral: self.integral,
            derivative,
            power,
        };
        Ratio::new::<ratio>(power)
    }
}

/// Runs one control period: heats for the window, then reports the measurement.
///
/// The window always runs, so a failed report neither skips heating nor shortens the
/// period.
pub async fn run_period<E>(
    heat: impl Future<Output = ()>,
    report: impl Future<Output = Result<(), E>>,
) -> Result<(), E> {
    heat.await;
    report.await
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use float_eq::assert_float_eq;
    use futures::executor::block_on;

    use super::*;

    fn celsius(value: f32) -> ThermodynamicTemperature {
        ThermodynamicTemperature::new::<degree_celsius>(value)
    }

    fn seconds(value: f32) -> Time {
        Time::new::<second>(value)
    }

    #[test]
    fn proportional_only() {
        let mut regulator = Regulator::default();
        assert_float_eq!(regulator.setpoint().get::<degree_celsius>(), 40.0, abs <= 1e-3);

        let power = regulator.update(celsius(20.0), seconds(0.0));
        assert_float_eq!(power.get::<ratio>(), 0.2, abs <= 1e-3);

        let power = regulator.update(celsius(35.0), seconds(1.0));
        assert_float_eq!(power.get::<ratio>(), 0.05, abs <= 1e-3);
    }

    #[test]
    fn no_power_above_setpoint() {
        let gains = Gains {
            kp: 0.1,
            ki: 0.1,
            kd: 0.1,
        };
        let mut regulator = Regulator::new(gains, celsius(40.0));

        regulator.update(celsius(10.0), seconds(0.0));
        let power = regulator.update(celsius(40.5), seconds(1.0));
        assert_float_eq!(power.get::<ratio>(), 0.0, abs <= 0.0);
        // The integral still accumulated the earlier error.
        assert_float_eq!(regulator.terms().integral, 30.0, abs <= 1e-3);
    }

    #[test]
    fn power_is_clamped() {
        let gains = Gains {
            kp: 1.0,
            ..Gains::default()
        };
        let mut regulator = Regulator::new(gains, celsius(40.0));

        let power = regulator.update(celsius(0.0), seconds(0.0));
        assert_float_eq!(power.get::<ratio>(), 1.0, abs <= 0.0);
    }

    #[test]
    fn integral_and_derivative() {
        let gains = Gains {
            kp: 0.0,
            ki: 0.001,
            kd: 0.01,
        };
        let mut regulator = Regulator::new(gains, celsius(40.0));

        regulator.update(celsius(30.0), seconds(0.0));
        assert_eq!(regulator.terms().derivative, 0.0);
        assert_eq!(regulator.terms().integral, 0.0);

        regulator.update(celsius(32.0), seconds(2.0));
        let terms = regulator.terms();
        assert_float_eq!(terms.error, 8.0, abs <= 1e-3);
        assert_float_eq!(terms.integral, 20.0, abs <= 1e-3);
        assert_float_eq!(terms.derivative, -1.0, abs <= 1e-3);
        assert_float_eq!(terms.power, 0.001 * 20.0 - 0.01, abs <= 1e-3);

        regulator.update(celsius(35.0), seconds(3.0));
        let terms = regulator.terms();
        assert_float_eq!(terms.integral, 28.0, abs <= 1e-3);
        assert_float_eq!(terms.derivative, -3.0, abs <= 1e-3);
    }

    #[test]
    fn repeated_timestamp_has_no_derivative() {
        let gains = Gains {
            kp: 0.0,
            ki: 0.0,
            kd: 1.0,
        };
        let mut regulator = Regulator::new(gains, celsius(40.0));

        regulator.update(celsius(30.0), seconds(5.0));
        regulator.update(celsius(20.0), seconds(5.0));
        assert_eq!(regulator.terms().derivative, 0.0);
    }

    #[test]
    fn failed_report_still_heats() {
        let heated = Cell::new(false);

        let result = block_on(run_period(async { heated.set(true) }, async {
            // The window has already run by the time the report is sent.
            assert!(heated.get());
            Err(crate::telemetry::Error::OutOfRange(-5.0))
        }));

        assert!(heated.get());
        assert_eq!(result, Err(crate::telemetry::Error::OutOfRange(-5.0)));
    }

    #[test]
    fn reports_after_heating() {
        let heated = Cell::new(false);
        let reported = Cell::new(false);

        let result: Result<(), ()> = block_on(run_period(async { heated.set(true) }, async {
            reported.set(heated.get());
            Ok(())
        }));

        assert_eq!(result, Ok(()));
        assert!(reported.get());
    }
}
