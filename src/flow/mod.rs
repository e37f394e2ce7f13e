//! Flow orchestration and the status model
//!
//! The orchestrator drives the full sequence (discovery, operator
//! selection, authorization, token exchange, identity retrieval) over
//! injected collaborator services, and reports every outcome as a
//! [`MobileConnectStatus`]. Failures never cross this boundary as errors;
//! they are mapped to terminal `Error` statuses carrying a stable code, a
//! message, and the underlying cause.

mod orchestrator;
mod status;

pub use orchestrator::{
    AuthenticationOptions, AuthenticationService, DiscoveryOptions, DiscoveryService,
    IdentityService, MobileConnect,
};
pub use status::{FlowTask, MobileConnectStatus};
