//! HTTP surface and the scheduled-action loop.
//!
//! The gateway is deliberately small: one endpoint that runs a turn,
//! a health probe, a status view and an explicit session reset. The
//! scheduler shares the same engine through [`scheduler::run_scheduler`].

pub mod router;
pub mod scheduler;
pub mod server;
pub mod state;

pub use router::build_router;
pub use server::GatewayServer;
pub use state::{AppState, SharedState};
