use co2_monitor::{
    regulation::{self, Regulator},
    telemetry::Channel,
    units::{Ratio, Time},
};
use defmt::{debug, info};
use driver::{telemetry::TelemetryLink, Heater, Max31865};
use embassy_rp::{spi, uart};
use embassy_time::Instant;
use uom::si::{
    ratio::{percent, ratio},
    thermodynamic_temperature::degree_celsius,
    time::millisecond,
};

type Result<T> = core::result::Result<T, Error>;

/// Represents a regulation error.
#[derive(Debug, thiserror::Error, defmt::Format)]
pub enum Error {
    /// A probe driver error occurred.
    #[error("probe error: {0}")]
    ProbeError(#[from] driver::max31865::Error),
    /// A telemetry error occurred.
    #[error("telemetry error: {0}")]
    TelemetryError(#[from] driver::telemetry::Error),
}

#[derive(derive_builder::Builder)]
#[builder(no_std, pattern = "owned")]
pub struct HeaterControl<'a, P: spi::Instance, L: uart::Instance> {
    probe: Max31865<'a, P>,
    heater: Heater<'a>,
    link: TelemetryLink<'a, L>,
    #[builder(default)]
    regulator: Regulator,
}

impl<'a, P: spi::Instance, L: uart::Instance> HeaterControl<'a, P, L> {
    #[must_use]
    pub fn builder() -> HeaterControlBuilder<'a, P, L> {
        HeaterControlBuilder::default()
    }

    pub fn log_gains(&self) {
        let gains = self.regulator.gains();
        info!("Kp = {}; Ki = {}; Kd = {}", gains.kp, gains.ki, gains.kd);
    }

    /// Measures, heats for one window, then reports the measurement.
    pub async fn update(&mut self) -> Result<()> {
        let temp = match self.probe.temp().await {
            Ok(temp) => temp,
            Err(e) => {
                // No heating without a valid reading, but the period is kept.
                self.heater.run_window(Ratio::new::<ratio>(0.0)).await;
                return Err(e.into());
            }
        };
        let power = self.regulator.update(temp, now());
        let terms = self.regulator.terms();
        info!(
            "setpoint: {}°C, temp: {}°C, power: {}%",
            self.regulator.setpoint().get::<degree_celsius>(),
            temp.get::<degree_celsius>(),
            power.get::<percent>(),
        );
        debug!("regulator terms: {}", terms);

        regulation::run_period(
            self.heater.run_window(power),
            self.link
                .send(Channel::Temperature, temp.get::<degree_celsius>()),
        )
        .await?;
        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn now() -> Time {
    Time::new::<millisecond>(Instant::now().as_millis() as f32)
}
