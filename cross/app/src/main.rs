#![no_std]
#![no_main]
#![warn(clippy::suspicious, clippy::complexity, clippy::perf, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::similar_names)]

extern crate alloc;

mod regulation;

use core::mem::MaybeUninit;

use board::Board;
use co2_monitor::monitor::{self, Monitor};
use defmt::{info, unwrap, warn};
use driver::scd30::Scd30;
use embassy_executor::Spawner;
use embassy_rp::{gpio, peripherals};
use embassy_time::Delay;
use embedded_alloc::Heap;
use {defmt_rtt as _, panic_probe as _};

use crate::regulation::{HeaterControl, HeaterControlBuilderError};

type Control = HeaterControl<'static, peripherals::SPI1, peripherals::UART0>;

#[global_allocator]
static HEAP: Heap = Heap::empty();
const HEAP_SIZE: usize = 1024;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    {
        static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
        // SAFETY: called once, before anything allocates.
        unsafe { HEAP.init(core::ptr::addr_of_mut!(HEAP_MEM) as usize, HEAP_SIZE) }
    }

    let board = unwrap!(Board::new().await);

    let control = unwrap!(HeaterControl::builder()
        .probe(board.probe)
        .heater(board.heater)
        .link(board.link)
        .build()
        .map_err(|e| match e {
            HeaterControlBuilderError::UninitializedField(field) => field,
            HeaterControlBuilderError::ValidationError(_) => "validation",
        }));
    control.log_gains();

    unwrap!(spawner.spawn(monitor_task(board.sensor)));
    unwrap!(spawner.spawn(regulation_task(control, board.led)));
    info!("tasks spawned!");
}

#[embassy_executor::task]
async fn monitor_task(sensor: Scd30<'static, peripherals::I2C0>) {
    let mut monitor = Monitor::new(sensor, Delay, monitor::Config::default());
    monitor.init().await;
    monitor.run().await
}

#[embassy_executor::task]
async fn regulation_task(mut control: Control, mut led: gpio::Output<'static>) {
    loop {
        if let Err(e) = control.update().await {
            warn!("regulation failed: {}", e);
        }
        led.toggle();
    }
}
