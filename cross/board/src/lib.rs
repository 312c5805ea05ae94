#![no_std]
#![warn(clippy::suspicious, clippy::complexity, clippy::perf, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::similar_names)]

use co2_monitor::units::Time;
use defmt::info;
use driver::{max31865::Wires, scd30::Scd30, Heater, I2cTransport, Max31865, TelemetryLink};
use embassy_rp::{
    bind_interrupts, config,
    gpio::{self, Level},
    i2c, peripherals,
};
use uom::si::time::second;

type Result<T> = core::result::Result<T, Error>;

/// Represents a board error.
#[derive(Debug, thiserror::Error, defmt::Format)]
pub enum Error {
    /// The RTD converter could not be configured.
    #[error("probe error: {0}")]
    ProbeError(#[from] driver::max31865::Error),
}

type Sensor = peripherals::I2C0;
type Probe = peripherals::SPI1;
type Link = peripherals::UART0;

/// Relay switching window, one control period.
pub const HEATER_WINDOW_S: f32 = 1.0;

bind_interrupts!(struct Interrupts {
    I2C0_IRQ => i2c::InterruptHandler<peripherals::I2C0>;
});

pub struct Board<'a> {
    pub led: gpio::Output<'a>,
    pub sensor: Scd30<'a, Sensor>,
    pub probe: Max31865<'a, Probe>,
    pub heater: Heater<'a>,
    pub link: TelemetryLink<'a, Link>,
}

impl Board<'static> {
    pub async fn new() -> Result<Self> {
        let peripherals = embassy_rp::init(config::Config::default());

        let led = gpio::Output::new(peripherals.PIN_25, Level::Low);

        let sensor = I2cTransport::new(
            peripherals.I2C0,
            peripherals.PIN_17,
            peripherals.PIN_16,
            Interrupts,
        )
        .into_scd30();

        let mut probe = Max31865::new(
            peripherals.SPI1,
            peripherals.PIN_10,
            peripherals.PIN_11,
            peripherals.PIN_12,
            peripherals.DMA_CH0,
            peripherals.DMA_CH1,
            peripherals.PIN_13,
        );
        probe.begin(Wires::Three).await?;

        let heater = Heater::new(peripherals.PIN_15, Time::new::<second>(HEATER_WINDOW_S));

        let link = TelemetryLink::new(peripherals.UART0, peripherals.PIN_0, peripherals.DMA_CH2);

        info!("board initialized!");

        Ok(Self {
            led,
            sensor,
            probe,
            heater,
            link,
        })
    }
}
