//! Mock implementation of [`BlockDevice`]
//!
//! Used by tests that need to assert exactly which requests reached the
//! underlying device - in particular that an injected request never did.
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use super::{status, BlockDevice, Completion, Payload, Request};

/// When a configured fault should fire.
#[derive(Debug, Clone)]
pub enum When {
    Always,
    Never,
}

/// A fault is an error that is returned based on the [`When`]
#[derive(Debug, Clone)]
pub struct Fault {
    pub when: When,
}

impl Default for Fault {
    fn default() -> Self {
        Self { when: When::Never }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub n_reads: usize,
    pub n_writes: usize,
}

impl Stats {
    pub fn n_submitted(&self) -> usize {
        self.n_reads + self.n_writes
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockDeviceFaults {
    pub submit: Fault,
}

#[derive(Debug)]
pub struct MockDevice {
    capacity: u64,
    /// Byte every successful read comes back filled with.
    fill: u8,
    faults: MockDeviceFaults,
    stats: Mutex<Stats>,
}

impl MockDevice {
    pub fn new(capacity: u64) -> Self {
        Self::filled_with(capacity, 0)
    }

    /// A device whose every read returns `fill` bytes - handy for telling
    /// "data came from the device" apart from "data was made up".
    pub fn filled_with(capacity: u64, fill: u8) -> Self {
        Self {
            capacity,
            fill,
            faults: MockDeviceFaults::default(),
            stats: Mutex::new(Stats::default()),
        }
    }

    pub fn with_faults(capacity: u64, faults: MockDeviceFaults) -> Self {
        Self {
            capacity,
            fill: 0,
            faults,
            stats: Mutex::new(Stats::default()),
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlockDevice for MockDevice {
    fn capacity(&self) -> u64 {
        self.capacity
    }

    async fn submit(&self, request: Request) {
        {
            let mut stats = self.stats.lock().unwrap();
            match request.payload() {
                Payload::Read { .. } => stats.n_reads += 1,
                Payload::Write { .. } => stats.n_writes += 1,
            }
        }

        match self.faults.submit.when {
            When::Always => {
                request.fail(status::IOERR);
                return;
            }
            When::Never => { /* noop */ }
        }

        let completion = match request.payload() {
            Payload::Read { len } => {
                Completion::with_data(Bytes::from(vec![self.fill; *len as usize]))
            }
            Payload::Write { .. } => Completion::ok(),
        };
        request.complete(completion);
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::{Fault, MockDevice, MockDeviceFaults, When};
    use crate::block::{status, BlockDevice, Request};

    #[tokio::test]
    async fn counts_submissions_per_direction() {
        let device = MockDevice::new(1024);

        let (request, _rx) = Request::read(0, 16);
        device.submit(request).await;
        let (request, _rx) = Request::write(0, Bytes::from_static(b"x"));
        device.submit(request).await;

        let stats = device.stats();
        assert_eq!(stats.n_reads, 1);
        assert_eq!(stats.n_writes, 1);
        assert_eq!(stats.n_submitted(), 2);
    }

    #[tokio::test]
    async fn reads_return_the_fill_byte() {
        let device = MockDevice::filled_with(1024, 0xAB);

        let (request, rx) = Request::read(0, 4);
        device.submit(request).await;

        let completion = rx.await.unwrap();
        assert_eq!(completion.status, status::OK);
        assert_eq!(completion.data.unwrap(), Bytes::from(vec![0xAB; 4]));
    }

    #[tokio::test]
    async fn submit_fault_fails_requests() {
        let device = MockDevice::with_faults(
            1024,
            MockDeviceFaults {
                submit: Fault { when: When::Always },
            },
        );

        let (request, rx) = Request::read(0, 4);
        device.submit(request).await;

        assert_eq!(rx.await.unwrap().status, status::IOERR);
        assert_eq!(device.stats().n_reads, 1);
    }
}
