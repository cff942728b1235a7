//! Outbound call mediation: every remote operation goes through the
//! bearer-injecting client and comes back as a uniform `CallResult`.

mod calls;
mod client;
mod operations;

pub use calls::{execute, CallResult};
pub use client::{AuthResponse, BackendClient, TokenCell, TokenSource};
pub use operations::{catalog_for, OperationKind, PlatformOps};
