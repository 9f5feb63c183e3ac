//! Host port allocation.
//!
//! Ports are checked by briefly binding a loopback listener and releasing it
//! straight away. Between the check and the engine binding the port another
//! process may take it; post-launch reconciliation exists to catch that.

use std::collections::BTreeSet;
use std::net::{Ipv4Addr, TcpListener};

use tracing::{debug, instrument};

use stack_shared_types::{PortAssignment, ServiceSpec, StackError};

/// Default number of ports tried above the preferred one.
pub const DEFAULT_SCAN_WINDOW: u16 = 100;

/// Answers whether a host port can be bound right now.
pub trait PortCheck {
    fn is_free(&self, port: u16) -> bool;
}

/// Check by binding `127.0.0.1:<port>` and dropping the listener.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopbackCheck;

impl PortCheck for LoopbackCheck {
    fn is_free(&self, port: u16) -> bool {
        TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_ok()
    }
}

impl<P: PortCheck + ?Sized> PortCheck for &P {
    fn is_free(&self, port: u16) -> bool {
        (**self).is_free(port)
    }
}

/// Allocator for one provisioning run.
///
/// Always returns the lowest port `>= preferred` that binds and was not
/// handed out earlier in the same run, so two services sharing a preferred
/// start never collide.
#[derive(Debug)]
pub struct PortAllocator<P> {
    check: P,
    scan_window: u16,
    claimed: BTreeSet<u16>,
}

impl PortAllocator<LoopbackCheck> {
    pub fn loopback(scan_window: u16) -> Self {
        Self::new(LoopbackCheck, scan_window)
    }
}

impl<P: PortCheck> PortAllocator<P> {
    pub fn new(check: P, scan_window: u16) -> Self {
        Self {
            check,
            scan_window,
            claimed: BTreeSet::new(),
        }
    }

    /// Find the lowest free, unclaimed port in `preferred..=preferred + scan_window`.
    pub fn allocate(&mut self, preferred: u16) -> Result<u16, StackError> {
        let start = preferred.max(1);
        let end = start.saturating_add(self.scan_window);

        for port in start..=end {
            if self.claimed.contains(&port) {
                continue;
            }
            if self.check.is_free(port) {
                self.claimed.insert(port);
                if port != preferred {
                    debug!("Port {} busy, using {}", preferred, port);
                }
                return Ok(port);
            }
        }

        Err(StackError::PortExhausted { start, end })
    }

    /// Allocate one port per spec, in list order.
    ///
    /// Fails on the first exhausted spec; nothing is returned for the others.
    #[instrument(skip_all, fields(services = specs.len()))]
    pub fn allocate_all(&mut self, specs: &[ServiceSpec]) -> Result<PortAssignment, StackError> {
        let mut assignment = PortAssignment::new();
        for spec in specs {
            let port = self.allocate(spec.preferred_host_port)?;
            debug!("{} ({}) -> host port {}", spec.service, spec.role, port);
            assignment.insert(spec.role, port);
        }
        Ok(assignment)
    }
}
