//! Scripted bus and delay for driving the drivers in tests.
use std::{cell::RefCell, collections::VecDeque, rc::Rc, vec::Vec};

use embedded_hal_async::delay::DelayNs;

use crate::{
    crc,
    transport::{Address, Transport, TransportError},
};

/// Something the mock peripherals observed, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Write(Vec<u8>),
    Read(usize),
    DelayMs(u32),
    DelayNs(u32),
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    responses: VecDeque<Vec<u8>>,
    write_failures: VecDeque<TransportError>,
}

/// A bus that replays queued responses and records every completed transfer.
///
/// Failed writes are not recorded. Reads with nothing queued time out.
#[derive(Clone, Default)]
pub struct MockBus {
    state: Rc<RefCell<State>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the bytes returned by the next read.
    pub fn respond(&self, bytes: Vec<u8>) {
        self.state.borrow_mut().responses.push_back(bytes);
    }

    /// Makes the next write fail.
    pub fn fail_next_write(&self, error: TransportError) {
        self.state.borrow_mut().write_failures.push_back(error);
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    /// Returns a delay that records into the same event log.
    pub fn delay(&self) -> MockDelay {
        MockDelay {
            state: self.state.clone(),
        }
    }
}

impl Transport for MockBus {
    async fn write(&mut self, _address: Address, bytes: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        if let Some(error) = state.write_failures.pop_front() {
            return Err(error);
        }
        state.events.push(Event::Write(bytes.to_vec()));
        Ok(())
    }

    async fn read(&mut self, _address: Address, buffer: &mut [u8]) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        let response = state.responses.pop_front().ok_or(TransportError::Timeout)?;
        buffer.fill(0);
        let len = response.len().min(buffer.len());
        buffer[..len].copy_from_slice(&response[..len]);
        state.events.push(Event::Read(buffer.len()));
        Ok(())
    }
}

/// A delay that returns immediately and records how long it was asked to wait.
pub struct MockDelay {
    state: Rc<RefCell<State>>,
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.state.borrow_mut().events.push(Event::DelayNs(ns));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.state.borrow_mut().events.push(Event::DelayMs(ms));
    }
}

/// Encodes words the way the sensor sends them, each followed by its CRC.
pub fn words(values: &[u16]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|&value| {
            let [high, low] = value.to_be_bytes();
            [high, low, crc::compute(value)]
        })
        .collect()
}

/// Splits a float into the high and low words the sensor sends.
pub fn float_words(value: f32) -> [u16; 2] {
    let bits = value.to_bits();
    #[allow(clippy::cast_possible_truncation)]
    [(bits >> 16) as u16, bits as u16]
}
