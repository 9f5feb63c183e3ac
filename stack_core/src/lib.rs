//! Stack core: port allocation, document synthesis, provisioning and
//! lifecycle management of the local telemetry stack.

pub mod lifecycle;
pub mod ports;
pub mod provision;
pub mod synth;

pub use lifecycle::{Lifecycle, PortUpdate, ReconcileReport, ReconciliationMiss};
pub use ports::{LoopbackCheck, PortAllocator, PortCheck, DEFAULT_SCAN_WINDOW};
pub use provision::{provision, ProvisionOutcome, WriteMode};
pub use synth::{synthesize, DocumentKind, StackDocuments, GENERATED_HEADER};
