//! SCD30 acquisition loop.
//!
//! Each cycle waits, polls the sensor's ready status and, when a measurement is
//! available, reads it. A reading outside the sensor's range is taken as a sign that
//! the sensor is wedged and triggers a full re-initialization.
use embedded_hal_async::delay::DelayNs;

use crate::{
    scd30::{Error, Measurement, Result, Scd30},
    transport::Transport,
};

/// CO2 readings above this many ppm are implausible.
pub const PLAUSIBLE_CO2_CEILING_PPM: i32 = 10_000;

/// Acquisition loop configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, derive_builder::Builder)]
#[builder(no_std, pattern = "owned", default)]
pub struct Config {
    /// Wait between ready status polls, in milliseconds.
    pub poll_period_ms: u32,
    /// Wait after a soft reset, in milliseconds.
    pub boot_delay_ms: u32,
    /// Continuous measurement interval, in seconds.
    pub measurement_interval_s: u16,
    /// Ambient pressure in mbar, 0 disables pressure compensation.
    pub pressure_mbar: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_period_ms: 250,
            boot_delay_ms: 2000,
            measurement_interval_s: 5,
            pressure_mbar: 0,
        }
    }
}

/// Represents the outcome of one acquisition cycle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Cycle {
    /// The sensor had no new measurement.
    NotReady,
    /// The ready status query failed, nothing was read.
    PollFailed(Error),
    /// A measurement was read.
    Acquired(Reading),
}

/// Represents a measurement read attempt.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Reading {
    /// Number of read attempts so far, this one included.
    pub count: u32,
    pub result: Result<Measurement>,
    /// Whether the sensor was re-initialized after this read.
    pub reinitialized: bool,
}

pub struct Monitor<T: Transport, D: DelayNs> {
    sensor: Scd30<T>,
    delay: D,
    config: Config,
    count: u32,
}

impl<T: Transport, D: DelayNs> Monitor<T, D> {
    pub fn new(sensor: Scd30<T>, delay: D, config: Config) -> Self {
        Self {
            sensor,
            delay,
            config,
            count: 0,
        }
    }

    pub fn sensor(&self) -> &Scd30<T> {
        &self.sensor
    }

    /// Resets and configures the sensor, then starts continuous measurement.
    ///
    /// Every step is attempted even if an earlier one fails; failures are logged.
    pub async fn init(&mut self) {
        info!("initializing scd30...");
        if let Err(e) = self.sensor.soft_reset().await {
            warn!("scd30 soft reset failed: {}", e);
        }

        self.delay.delay_ms(self.config.boot_delay_ms).await;

        match self.sensor.get_serial_number().await {
            Ok(()) => info!(
                "scd30 s/n: {}",
                self.sensor.record().serial().unwrap_or("<invalid>")
            ),
            Err(e) => warn!("scd30 serial number read failed: {}", e),
        }

        if let Err(e) = self
            .sensor
            .set_measurement_interval(self.config.measurement_interval_s)
            .await
        {
            warn!("scd30 set measurement interval failed: {}", e);
        }

        if let Err(e) = self.sensor.start_measurement(self.config.pressure_mbar).await {
            warn!("scd30 start measurement failed: {}", e);
        }
    }

    /// Runs one wait, poll, read and watchdog cycle.
    pub async fn cycle(&mut self) -> Cycle {
        self.delay.delay_ms(self.config.poll_period_ms).await;

        match self.sensor.get_ready_status().await {
            Ok(true) => {}
            Ok(false) => return Cycle::NotReady,
            Err(e) => {
                debug!("scd30 ready status failed: {}", e);
                return Cycle::PollFailed(e);
            }
        }

        self.count = self.count.wrapping_add(1);
        let result = self
            .sensor
            .read_measurement()
            .await
            .map(|()| self.sensor.record().measurement());
        self.report(&result);

        let co2 = self.sensor.record().co2.value;
        let reinitialized = is_implausible(co2);
        if reinitialized {
            warn!("implausible co2 reading of {}ppm", co2);
            self.init().await;
        }

        Cycle::Acquired(Reading {
            count: self.count,
            result,
            reinitialized,
        })
    }

    /// Runs the acquisition loop forever.
    pub async fn run(&mut self) -> ! {
        loop {
            self.cycle().await;
        }
    }

    fn report(&self, result: &Result<Measurement>) {
        match result {
            Ok(_) => {
                let record = self.sensor.record();
                info!(
                    "{} -> co2: {}ppm, temperature: {}°C, humidity: {}%",
                    self.count,
                    record.co2.value,
                    record.temperature.value,
                    record.humidity.value
                );
            }
            Err(e) => error!("ERROR: {} ({})", e.code(), e),
        }
    }
}

/// Whether a CO2 reading is outside what the sensor can measure. Fractions are
/// dropped before comparing, NaN is always implausible.
#[must_use]
pub fn is_implausible(co2_ppm: f32) -> bool {
    #[allow(clippy::cast_possible_truncation)]
    let whole_ppm = co2_ppm as i32;
    co2_ppm.is_nan() || whole_ppm > PLAUSIBLE_CO2_CEILING_PPM
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;
    use futures::executor::block_on;
    use uom::si::ratio::part_per_million;

    use super::*;
    use crate::mock::{float_words, words, Event, MockBus, MockDelay};

    fn measurement_words(co2: f32) -> Vec<u8> {
        let [co2_high, co2_low] = float_words(co2);
        let [temp_high, temp_low] = float_words(22.5);
        let [hum_high, hum_low] = float_words(45.25);
        words(&[co2_high, co2_low, temp_high, temp_low, hum_high, hum_low])
    }

    fn serial_words() -> Vec<u8> {
        let mut response = words(&[0x3132, 0x3334, 0x0000]);
        response.resize(33, 0);
        response
    }

    fn monitor(bus: &MockBus) -> Monitor<MockBus, MockDelay> {
        Monitor::new(Scd30::new(bus.clone()), bus.delay(), Config::default())
    }

    fn init_events() -> Vec<Event> {
        vec![
            Event::Write(vec![0xd3, 0x04]),
            Event::DelayMs(2000),
            Event::Write(vec![0xd0, 0x33]),
            Event::Read(33),
            Event::Write(vec![0x46, 0x00, 0x00, 0x05, 0x74]),
            Event::Write(vec![0x00, 0x10, 0x00, 0x00, 0x81]),
        ]
    }

    #[test]
    fn default_config() {
        let config = ConfigBuilder::default()
            .measurement_interval_s(2)
            .build()
            .unwrap();
        assert_eq!(config.measurement_interval_s, 2);
        assert_eq!(config.poll_period_ms, 250);
        assert_eq!(config.boot_delay_ms, 2000);
        assert_eq!(config.pressure_mbar, 0);
    }

    #[test]
    fn init_sequence() {
        let bus = MockBus::new();
        bus.respond(serial_words());
        let mut monitor = monitor(&bus);

        block_on(monitor.init());

        assert_eq!(bus.events(), init_events());
        assert_eq!(monitor.sensor().record().serial(), Some("1234"));
    }

    #[test]
    fn init_continues_after_failures() {
        let bus = MockBus::new();
        // Nothing queued for the serial number, the read times out.
        bus.fail_next_write(crate::transport::TransportError::NoAcknowledge);
        let mut monitor = monitor(&bus);

        block_on(monitor.init());

        assert_eq!(
            bus.events(),
            [
                Event::DelayMs(2000),
                Event::Write(vec![0xd0, 0x33]),
                Event::Write(vec![0x46, 0x00, 0x00, 0x05, 0x74]),
                Event::Write(vec![0x00, 0x10, 0x00, 0x00, 0x81]),
            ]
        );
    }

    #[test]
    fn busy_sensor_is_not_read() {
        let bus = MockBus::new();
        bus.respond(words(&[0]));
        let mut monitor = monitor(&bus);

        assert_eq!(block_on(monitor.cycle()), Cycle::NotReady);
        assert_eq!(
            bus.events(),
            [
                Event::DelayMs(250),
                Event::Write(vec![0x02, 0x02]),
                Event::Read(3),
            ]
        );
    }

    #[test]
    fn failed_poll_is_not_read() {
        let bus = MockBus::new();
        bus.respond(vec![0x00, 0x01, 0xff]);
        let mut monitor = monitor(&bus);

        assert!(matches!(
            block_on(monitor.cycle()),
            Cycle::PollFailed(Error::ChecksumMismatch { field: 1, .. })
        ));
        assert!(!bus
            .events()
            .contains(&Event::Write(vec![0x03, 0x00])));
    }

    #[test]
    fn acquires_when_ready() {
        let bus = MockBus::new();
        bus.respond(words(&[1]));
        bus.respond(measurement_words(412.5));
        let mut monitor = monitor(&bus);

        let Cycle::Acquired(reading) = block_on(monitor.cycle()) else {
            panic!("expected a reading");
        };
        assert_eq!(reading.count, 1);
        assert!(!reading.reinitialized);
        let measurement = reading.result.unwrap();
        assert_float_eq!(
            measurement.co2.get::<part_per_million>(),
            412.5,
            rmax <= 1e-6
        );

        assert_eq!(
            bus.events(),
            [
                Event::DelayMs(250),
                Event::Write(vec![0x02, 0x02]),
                Event::Read(3),
                Event::Write(vec![0x03, 0x00]),
                Event::Read(18),
            ]
        );
    }

    #[test]
    fn failed_read_is_reported_and_counted() {
        let bus = MockBus::new();
        bus.respond(words(&[1]));
        let mut corrupt = measurement_words(412.5);
        corrupt[2] ^= 0x01;
        bus.respond(corrupt);
        bus.respond(words(&[1]));
        bus.respond(measurement_words(415.0));
        let mut monitor = monitor(&bus);

        let Cycle::Acquired(reading) = block_on(monitor.cycle()) else {
            panic!("expected a reading");
        };
        assert_eq!(reading.count, 1);
        assert!(matches!(
            reading.result,
            Err(Error::ChecksumMismatch { field: 1, .. })
        ));
        assert!(!reading.reinitialized);

        let Cycle::Acquired(reading) = block_on(monitor.cycle()) else {
            panic!("expected a reading");
        };
        assert_eq!(reading.count, 2);
        assert!(reading.result.is_ok());
    }

    #[test]
    fn implausible_reading_reinitializes() {
        let bus = MockBus::new();
        bus.respond(words(&[1]));
        bus.respond(measurement_words(10001.0));
        bus.respond(serial_words());
        let mut monitor = monitor(&bus);

        let Cycle::Acquired(reading) = block_on(monitor.cycle()) else {
            panic!("expected a reading");
        };
        assert!(reading.reinitialized);
        assert!(reading.result.is_ok());

        let events = bus.events();
        assert_eq!(events[..5].last(), Some(&Event::Read(18)));
        assert_eq!(events[5..], init_events());
    }

    #[test]
    fn plausible_reading_does_not_reinitialize() {
        let bus = MockBus::new();
        bus.respond(words(&[1]));
        bus.respond(measurement_words(9999.0));
        let mut monitor = monitor(&bus);

        let Cycle::Acquired(reading) = block_on(monitor.cycle()) else {
            panic!("expected a reading");
        };
        assert!(!reading.reinitialized);
        assert_eq!(bus.events().len(), 5);
    }

    #[test]
    fn stale_implausible_reading_reinitializes_after_failed_read() {
        let bus = MockBus::new();
        bus.respond(words(&[1]));
        bus.respond(measurement_words(20000.0));
        bus.respond(serial_words());
        let mut monitor = monitor(&bus);
        block_on(monitor.cycle());

        bus.clear_events();
        bus.respond(words(&[1]));
        let mut corrupt = measurement_words(400.0);
        corrupt[17] ^= 0x01;
        bus.respond(corrupt);
        bus.respond(serial_words());

        let Cycle::Acquired(reading) = block_on(monitor.cycle()) else {
            panic!("expected a reading");
        };
        assert!(matches!(
            reading.result,
            Err(Error::ChecksumMismatch { field: 6, .. })
        ));
        // The float was not updated by the failed read, so it is still implausible.
        assert!(reading.reinitialized);
        assert_eq!(bus.events()[5..], init_events());
    }

    #[test]
    fn implausibility_threshold() {
        assert!(!is_implausible(0.0));
        assert!(!is_implausible(9999.0));
        assert!(!is_implausible(10000.0));
        assert!(!is_implausible(10000.9));
        assert!(is_implausible(10001.0));
        assert!(is_implausible(f32::INFINITY));
        assert!(is_implausible(f32::NAN));
    }
}
