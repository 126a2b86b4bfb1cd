//! An in-memory [`BlockDevice`] implementation
//!
//! This implementation uses a zero-initialized [`Vec<u8>`] wrapped by a
//! [`Mutex`] and does nothing fancy around performance. It's the most
//! straightforward implementation of a [`BlockDevice`] used for
//! development/testing only.
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::instrument;

use super::{status, BlockDevice, Completion, Error, Payload, Request, Result};

/// The InMemory [`BlockDevice`] definition
#[derive(Clone, Debug)]
pub struct InMemory {
    inner: Arc<Mutex<Vec<u8>>>,
    capacity: u64,
}

impl InMemory {
    /// Creates a device of `capacity` bytes, all zero.
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(vec![0u8; capacity as usize])),
            capacity,
        }
    }

    /// private function used to acquire a lock over the backing storage.
    /// A fail to acquire a lock is considered a [`Error::Logic`] since the only reason why
    /// an [`Error`] should be returned is in case of [`Mutex`] poisoning
    fn acquire_lock(&self) -> Result<MutexGuard<Vec<u8>>> {
        match self.inner.lock() {
            Ok(guard) => Ok(guard),
            Err(_) => Err(Error::Logic {
                reason: "Unable to acquire lock for InMemory block device - poisoned...".to_string(),
            }),
        }
    }
}

#[async_trait]
impl BlockDevice for InMemory {
    fn capacity(&self) -> u64 {
        self.capacity
    }

    #[instrument(name = "block::in_memory::submit", level = "debug", skip(self, request), fields(offset = request.offset(), len = request.len()))]
    async fn submit(&self, request: Request) {
        let end = match request.offset().checked_add(u64::from(request.len())) {
            Some(end) if end <= self.capacity => end as usize,
            _ => {
                request.fail(status::INVAL);
                return;
            }
        };
        let start = request.offset() as usize;

        let guard = match self.acquire_lock() {
            Ok(guard) => guard,
            // The device has no error return - a poisoned lock surfaces as an
            // I/O failure on the request itself.
            Err(_) => {
                request.fail(status::IOERR);
                return;
            }
        };

        let completion = {
            let mut storage = guard;
            match request.payload() {
                Payload::Read { .. } => {
                    Completion::with_data(Bytes::copy_from_slice(&storage[start..end]))
                }
                Payload::Write { data } => {
                    storage[start..end].copy_from_slice(data);
                    Completion::ok()
                }
            }
        };

        request.complete(completion);
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::InMemory;
    use crate::block::{status, BlockDevice, Request};

    #[tokio::test]
    async fn write_then_read() {
        let device = InMemory::with_capacity(1024);
        let payload = Bytes::from_static(b"some payload");

        let (request, rx) = Request::write(100, payload.clone());
        device.submit(request).await;
        assert_eq!(rx.await.unwrap().status, status::OK);

        let (request, rx) = Request::read(100, payload.len() as u32);
        device.submit(request).await;

        let completion = rx.await.unwrap();
        assert_eq!(completion.status, status::OK);
        assert_eq!(completion.data.unwrap(), payload);
    }

    #[tokio::test]
    async fn unwritten_ranges_read_as_zeroes() {
        let device = InMemory::with_capacity(64);

        let (request, rx) = Request::read(0, 64);
        device.submit(request).await;

        let completion = rx.await.unwrap();
        assert_eq!(completion.data.unwrap(), Bytes::from(vec![0u8; 64]));
    }

    #[tokio::test]
    async fn out_of_range_request_fails_with_inval() {
        let device = InMemory::with_capacity(64);

        let (request, rx) = Request::read(60, 8);
        device.submit(request).await;
        assert_eq!(rx.await.unwrap().status, status::INVAL);

        let (request, rx) = Request::write(u64::MAX, Bytes::from_static(b"x"));
        device.submit(request).await;
        assert_eq!(rx.await.unwrap().status, status::INVAL);
    }

    // Concurrent submissions must each complete exactly once and never
    // deadlock on the storage lock.
    #[tokio::test]
    async fn concurrent_submissions_all_complete() {
        let device = InMemory::with_capacity(4096);

        let handles: Vec<_> = (0..16u64)
            .map(|i| {
                let device = device.clone();
                tokio::spawn(async move {
                    let payload = Bytes::from(vec![i as u8; 256]);
                    let (request, rx) = Request::write(i * 256, payload);
                    device.submit(request).await;
                    rx.await.unwrap().status
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), status::OK);
        }

        for i in 0..16u64 {
            let (request, rx) = Request::read(i * 256, 256);
            device.submit(request).await;
            let completion = rx.await.unwrap();
            assert_eq!(completion.data.unwrap(), Bytes::from(vec![i as u8; 256]));
        }
    }
}
