//! Types shared by every crate of the local telemetry stack.
//!
//! - [`service`]: the fixed set of backend services and their port roles
//! - [`state`]: the persisted [`StackState`] record
//! - [`agent`]: agent registrations surfaced by the dashboard
//! - [`error`]: the stack-wide error taxonomy

pub mod agent;
pub mod error;
pub mod service;
pub mod state;

pub use agent::{AgentConfig, AgentRegistration};
pub use error::{Result, StackError};
pub use service::{default_services, PortAssignment, PortRole, Protocol, ServiceSpec};
pub use state::{CollectorState, StackPorts, StackState};
