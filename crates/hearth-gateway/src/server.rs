use hearth_common::{Error, Result};
use tracing::info;

use crate::router::build_router;
use crate::state::SharedState;

/// Binds the configured address and serves the router until the process
/// stops.
pub struct GatewayServer {
    state: SharedState,
}

impl GatewayServer {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    pub async fn run(self) -> Result<()> {
        let gateway = &self.state.config.gateway;
        let addr = format!("{}:{}", gateway.host, gateway.port);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Agent(format!("failed to bind {addr}: {e}")))?;
        info!("gateway listening on {addr}");

        let app = build_router(self.state);
        axum::serve(listener, app)
            .await
            .map_err(|e| Error::Agent(format!("gateway server failed: {e}")))?;
        Ok(())
    }
}
