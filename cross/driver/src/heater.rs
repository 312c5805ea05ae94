//! Hot plate relay.
//!
//! The relay is too slow for PWM, so power is applied by switching it on for a
//! share of a fixed window instead.
use co2_monitor::units::{Ratio, Time};
use defmt::trace;
use embassy_rp::{gpio, Peripheral};
use embassy_time::{Duration, Timer};
use uom::si::{ratio::ratio, time::millisecond};

/// The relay is normally open, driving the pin high closes the circuit.
pub struct Heater<'a> {
    relay: gpio::Output<'a>,
    window: Time,
}

impl<'a> Heater<'a> {
    #[must_use]
    pub fn new(relay_pin: impl Peripheral<P = impl gpio::Pin> + 'a, window: Time) -> Self {
        Self {
            relay: gpio::Output::new(relay_pin, gpio::Level::Low),
            window,
        }
    }

    #[must_use]
    pub fn window(&self) -> Time {
        self.window
    }

    /// Heats at `power` for one window, returning once the window has elapsed.
    pub async fn run_window(&mut self, power: Ratio) {
        let (on, off) = split_window(self.window, power);
        trace!("heater on for {}ms, off for {}ms", on.as_millis(), off.as_millis());

        if on > Duration::from_ticks(0) {
            self.relay.set_high();
            Timer::after(on).await;
        }
        self.relay.set_low();
        if off > Duration::from_ticks(0) {
            Timer::after(off).await;
        }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn split_window(window: Time, power: Ratio) -> (Duration, Duration) {
    let window_ms = window.get::<millisecond>().max(0.0) as u64;
    let on_ms = (window_ms as f32 * power.get::<ratio>().clamp(0.0, 1.0)) as u64;
    (
        Duration::from_millis(on_ms),
        Duration::from_millis(window_ms - on_ms),
    )
}
