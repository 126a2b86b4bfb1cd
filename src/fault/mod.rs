//! The runtime-adjustable fault state shared between the control plane and
//! the request path.

use std::sync::atomic::{AtomicI32, Ordering};

use crate::block::StatusCode;

/// The completion status currently injected by one proxy target.
///
/// 0 means pass-through; anything else is handed back verbatim as the
/// terminal status of every request. A single atomic word is all the
/// synchronization required here: no invariant spans this value and anything
/// else, so readers and writers never coordinate, and a request racing a
/// [`FaultState::write`] may legitimately observe either the old or the new
/// value. Do not replace this with a mutex or a CAS loop.
#[derive(Debug, Default)]
pub struct FaultState {
    code: AtomicI32,
}

impl FaultState {
    /// Returns the currently configured status code. Never blocks, never fails.
    pub fn read(&self) -> StatusCode {
        self.code.load(Ordering::Relaxed)
    }

    /// Replaces the configured status code. Never blocks, never fails.
    ///
    /// Any value is accepted and stored verbatim - whether a given code is
    /// meaningful is the caller's policy, not ours.
    pub fn write(&self, code: StatusCode) {
        self.code.store(code, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::FaultState;

    #[test]
    fn starts_at_zero() {
        let state = FaultState::default();
        assert_eq!(state.read(), 0);
    }

    #[quickcheck]
    fn write_read_round_trip(code: i32) -> bool {
        let state = FaultState::default();
        state.write(code);
        state.read() == code
    }

    // Hammers the state from several writer tasks while a reader polls it.
    // Every observed value must be one that some writer actually stored.
    #[tokio::test]
    async fn concurrent_writers_never_tear() {
        let state = Arc::new(FaultState::default());
        let codes: Vec<i32> = vec![0, 5, -7, i32::MAX, i32::MIN, 42];

        let writers: Vec<_> = codes
            .iter()
            .map(|code| {
                let state = state.clone();
                let code = *code;
                tokio::spawn(async move {
                    for _ in 0..1000 {
                        state.write(code);
                    }
                })
            })
            .collect();

        let reader = {
            let state = state.clone();
            let codes = codes.clone();
            tokio::spawn(async move {
                for _ in 0..1000 {
                    let observed = state.read();
                    assert!(codes.contains(&observed), "torn value {}", observed);
                }
            })
        };

        for writer in writers {
            writer.await.unwrap();
        }
        reader.await.unwrap();
    }
}
