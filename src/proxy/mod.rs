//! The proxy target: a transparent pass-through over an underlying block
//! device that can be flipped, at runtime, into failing every request with an
//! operator-chosen status code.
//!
//! The whole data path is one atomic read followed by one branch. The control
//! plane reaches the target exclusively through the `error_code` attribute on
//! its control endpoint; the request path reads the same [`FaultState`] word
//! and nothing else is shared between the two.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{event, instrument, Level};

use crate::block::registry::{DeviceHandle, DeviceRegistry};
use crate::block::{Mode, Request, StatusCode};
use crate::control::{self, Attribute, AttributeHandle, ControlRegistry, EndpointHandle};
use crate::error::{Error, Result};
use crate::fault::FaultState;

/// Name the control endpoint is registered under, as a child of the
/// underlying device's identity.
pub const CONTROL_ENDPOINT_NAME: &str = "proxy_target";

/// The single attribute exposed on the control endpoint.
pub const ERROR_CODE_ATTR: &str = "error_code";

/// Tells the host side who completed a request handled by
/// [`ProxyTarget::map`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// The proxy completed the request itself, synchronously.
    Submitted,
    /// The request was forwarded; the underlying device owns its completion.
    Remapped,
}

/// One configured proxy instance, bound to one underlying device.
///
/// Construction either yields a fully-formed target (device bound, fault
/// code 0, control endpoint live) or nothing at all: each acquisition below
/// is held behind a scoped handle, so an early return unwinds everything
/// acquired so far in reverse order.
#[derive(Debug)]
pub struct ProxyTarget {
    // Field order is teardown order: attribute, endpoint, device.
    attribute: AttributeHandle,
    endpoint: EndpointHandle,
    fault: Arc<FaultState>,
    device: DeviceHandle,
}

impl ProxyTarget {
    /// Binds a new target to the single device named in `args`.
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] unless `args` has exactly one element
    /// - [`Error::DeviceLookup`] if the device is not registered
    /// - [`Error::ControlEndpointCreate`] / [`Error::ControlAttributeCreate`]
    ///   if the control plane registrations fail
    #[instrument(name = "proxy::construct", level = "info", skip(devices, control))]
    pub fn construct(
        args: &[String],
        mode: Mode,
        devices: &DeviceRegistry,
        control: &ControlRegistry,
    ) -> Result<Self> {
        if args.len() != 1 {
            return Err(Error::InvalidArgument {
                reason: format!("expected exactly 1 device argument, got {}", args.len()),
            });
        }

        let device = devices.lookup(&args[0], mode).map_err(Error::DeviceLookup)?;
        let fault = Arc::new(FaultState::default());

        let endpoint = control
            .create_endpoint(device.name(), CONTROL_ENDPOINT_NAME)
            .map_err(Error::ControlEndpointCreate)?;
        let attribute = control
            .create_attribute(
                endpoint.path(),
                ERROR_CODE_ATTR,
                Arc::new(ErrorCodeAttribute {
                    fault: fault.clone(),
                }),
            )
            .map_err(Error::ControlAttributeCreate)?;

        event!(Level::INFO, device = device.name(), "proxy target bound");
        Ok(Self {
            attribute,
            endpoint,
            fault,
            device,
        })
    }

    /// The hot path. One atomic read of the fault code, then either an
    /// immediate failure completion or a forward to the underlying device.
    ///
    /// Every request is completed exactly once: an injected request is
    /// consumed by [`Request::fail`] right here, a forwarded one is consumed
    /// by the device. Nothing here ever blocks on another request or on a
    /// concurrent fault-code store.
    #[instrument(name = "proxy::map", level = "debug", skip(self, request), fields(device = self.device.name()))]
    pub async fn map(&self, request: Request) -> Disposition {
        let code = self.fault.read();
        if code != 0 {
            request.fail(code);
            return Disposition::Submitted;
        }

        self.device.submit(request).await;
        Disposition::Remapped
    }

    /// The fault code as the request path would observe it right now.
    pub fn fault_code(&self) -> StatusCode {
        self.fault.read()
    }

    /// Path of this target's control endpoint in the control namespace.
    pub fn control_path(&self) -> &str {
        self.endpoint.path()
    }

    pub fn device_name(&self) -> &str {
        self.device.name()
    }
}

/// Textual view over the fault state, registered as the `error_code`
/// attribute on the target's control endpoint.
#[derive(Debug)]
struct ErrorCodeAttribute {
    fault: Arc<FaultState>,
}

impl Attribute for ErrorCodeAttribute {
    fn show(&self) -> String {
        format!("{}\n", self.fault.read())
    }

    fn store(&self, input: &str) -> control::Result<usize> {
        // One trailing newline is tolerated: `echo 5 > .../error_code`.
        let code = input
            .strip_suffix('\n')
            .unwrap_or(input)
            .parse::<StatusCode>()
            .map_err(|_| control::Error::InvalidInput {
                reason: format!("not a base-10 integer: {:?}", input),
            })?;

        self.fault.write(code);
        Ok(input.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use quickcheck::Arbitrary;

    use super::{Disposition, ProxyTarget, CONTROL_ENDPOINT_NAME, ERROR_CODE_ATTR};
    use crate::block::mock::MockDevice;
    use crate::block::registry::DeviceRegistry;
    use crate::block::{status, Mode, Request};
    use crate::control::ControlRegistry;
    use crate::error::Error;

    struct Fixture {
        devices: DeviceRegistry,
        control: ControlRegistry,
        mock: Arc<MockDevice>,
    }

    fn fixture() -> Fixture {
        let devices = DeviceRegistry::default();
        let mock = Arc::new(MockDevice::filled_with(4096, 0xEE));
        devices.register("d0", mock.clone()).unwrap();
        Fixture {
            devices,
            control: ControlRegistry::default(),
            mock,
        }
    }

    fn args(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn construct(f: &Fixture) -> ProxyTarget {
        ProxyTarget::construct(&args(&["d0"]), Mode::ReadWrite, &f.devices, &f.control).unwrap()
    }

    #[test]
    fn fault_code_starts_at_zero() {
        let f = fixture();
        let target = construct(&f);
        assert_eq!(target.fault_code(), 0);
    }

    #[test]
    fn construction_registers_the_control_endpoint() {
        let f = fixture();
        let target = construct(&f);

        assert_eq!(target.control_path(), "d0/proxy_target");
        assert!(f.control.endpoint_exists("d0/proxy_target"));
        assert_eq!(f.devices.open_handles("d0"), 1);
        assert_eq!(
            f.control.show(target.control_path(), ERROR_CODE_ATTR).unwrap(),
            "0\n"
        );
    }

    #[test]
    fn wrong_argument_count_is_rejected_before_any_acquisition() {
        let f = fixture();

        for bad in [args(&[]), args(&["d0", "d0"])] {
            let err =
                ProxyTarget::construct(&bad, Mode::ReadWrite, &f.devices, &f.control).err().unwrap();
            assert!(err.is_invalid_argument());
            assert_eq!(f.devices.open_handles("d0"), 0);
            assert!(!f.control.endpoint_exists("d0/proxy_target"));
        }
    }

    #[test]
    fn device_lookup_failure_creates_no_endpoint() {
        let f = fixture();

        let err = ProxyTarget::construct(&args(&["missing"]), Mode::ReadWrite, &f.devices, &f.control)
            .err()
            .unwrap();
        assert!(matches!(err, Error::DeviceLookup(_)));
        assert!(!f.control.endpoint_exists("missing/proxy_target"));
    }

    #[test]
    fn endpoint_collision_rolls_back_the_device_handle() {
        let f = fixture();
        let _first = construct(&f);
        assert_eq!(f.devices.open_handles("d0"), 1);

        // A second target on the same device collides on the endpoint path.
        let err = ProxyTarget::construct(&args(&["d0"]), Mode::ReadWrite, &f.devices, &f.control)
            .err()
            .unwrap();
        assert!(matches!(err, Error::ControlEndpointCreate(_)));
        assert_eq!(f.devices.open_handles("d0"), 1);
    }

    #[test]
    fn destruction_tears_everything_down() {
        let f = fixture();
        let target = construct(&f);

        drop(target);
        assert!(!f.control.endpoint_exists("d0/proxy_target"));
        assert_eq!(f.devices.open_handles("d0"), 0);

        // The device itself stays registered for other users.
        assert!(f.devices.lookup("d0", Mode::ReadOnly).is_ok());
    }

    #[tokio::test]
    async fn pass_through_forwards_to_the_device() {
        let f = fixture();
        let target = construct(&f);

        let (request, rx) = Request::read(0, 16);
        let disposition = target.map(request).await;

        assert_eq!(disposition, Disposition::Remapped);
        let completion = rx.await.unwrap();
        assert_eq!(completion.status, status::OK);
        assert_eq!(completion.data.unwrap(), Bytes::from(vec![0xEE; 16]));
        assert_eq!(f.mock.stats().n_reads, 1);
    }

    #[tokio::test]
    async fn injection_completes_immediately_and_bypasses_the_device() {
        let f = fixture();
        let target = construct(&f);

        f.control
            .store(target.control_path(), ERROR_CODE_ATTR, "5\n")
            .unwrap();

        let (request, rx) = Request::read(0, 16);
        let disposition = target.map(request).await;

        assert_eq!(disposition, Disposition::Submitted);
        let completion = rx.await.unwrap();
        assert_eq!(completion.status, 5);
        assert!(completion.data.is_none());
        assert_eq!(f.mock.stats().n_submitted(), 0);
    }

    #[tokio::test]
    async fn clearing_the_fault_restores_pass_through() {
        let f = fixture();
        let target = construct(&f);
        let path = target.control_path().to_string();

        f.control.store(&path, ERROR_CODE_ATTR, "-9").unwrap();
        let (request, rx) = Request::write(0, Bytes::from_static(b"data"));
        assert_eq!(target.map(request).await, Disposition::Submitted);
        assert_eq!(rx.await.unwrap().status, -9);

        f.control.store(&path, ERROR_CODE_ATTR, "0").unwrap();
        let (request, rx) = Request::write(0, Bytes::from_static(b"data"));
        assert_eq!(target.map(request).await, Disposition::Remapped);
        assert_eq!(rx.await.unwrap().status, status::OK);
        assert_eq!(f.mock.stats().n_writes, 1);
    }

    #[test]
    fn error_code_store_round_trips_any_integer() {
        let f = fixture();
        let target = construct(&f);
        let path = target.control_path();

        for code in [0i32, 5, -1, i32::MAX, i32::MIN] {
            let input = format!("{}\n", code);
            let consumed = f.control.store(path, ERROR_CODE_ATTR, &input).unwrap();
            assert_eq!(consumed, input.len());
            assert_eq!(f.control.show(path, ERROR_CODE_ATTR).unwrap(), input);
        }
    }

    #[test]
    fn malformed_error_code_store_is_rejected_and_keeps_the_old_value() {
        let f = fixture();
        let target = construct(&f);
        let path = target.control_path();

        f.control.store(path, ERROR_CODE_ATTR, "17").unwrap();
        for bad in ["", "\n", "five", "5x", "1.5", "0x10", "5 "] {
            let err = f.control.store(path, ERROR_CODE_ATTR, bad).err().unwrap();
            assert!(Error::from(err).is_invalid_argument());
            assert_eq!(f.control.show(path, ERROR_CODE_ATTR).unwrap(), "17\n");
        }
    }

    #[test]
    fn endpoint_name_matches_the_published_constant() {
        let f = fixture();
        let target = construct(&f);
        assert_eq!(
            target.control_path(),
            format!("{}/{}", target.device_name(), CONTROL_ENDPOINT_NAME)
        );
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct TestInput {
        codes: Vec<i32>,
    }

    impl Arbitrary for TestInput {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            // Bias towards flipping between injection and pass-through.
            let codes = (0..32)
                .map(|i| if i % 2 == 0 { 0 } else { i32::arbitrary(g) })
                .collect();
            Self { codes }
        }
    }

    // Requests racing fault-code stores must each complete exactly once, with
    // a status that was stored at some point (or pass-through).
    #[quickcheck_async::tokio]
    async fn concurrent_map_and_store(input: TestInput) {
        let f = fixture();
        let target = Arc::new(construct(&f));
        let path = target.control_path().to_string();

        let store_task = {
            let control = f.control.clone();
            let path = path.clone();
            let codes = input.codes.clone();
            tokio::spawn(async move {
                for code in codes {
                    control
                        .store(&path, ERROR_CODE_ATTR, &format!("{}\n", code))
                        .unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        let mappers: Vec<_> = (0..8)
            .map(|_| {
                let target = target.clone();
                tokio::spawn(async move {
                    let mut statuses = Vec::new();
                    for _ in 0..16 {
                        let (request, rx) = Request::read(0, 8);
                        let disposition = target.map(request).await;
                        let completion = rx.await.unwrap();
                        if completion.status == status::OK {
                            assert_eq!(disposition, Disposition::Remapped);
                            assert!(completion.data.is_some());
                        } else {
                            assert_eq!(disposition, Disposition::Submitted);
                            assert!(completion.data.is_none());
                        }
                        statuses.push(completion.status);
                    }
                    statuses
                })
            })
            .collect();

        store_task.await.unwrap();
        for mapper in mappers {
            for observed in mapper.await.unwrap() {
                assert!(
                    observed == 0 || input.codes.contains(&observed),
                    "observed a status nobody stored: {}",
                    observed
                );
            }
        }
    }
}
