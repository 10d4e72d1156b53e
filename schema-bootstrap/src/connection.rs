//! Scoped PostgreSQL connection

use crate::bootstrap::ConnectionParams;
use crate::error::{BootstrapError, Result};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, warn};

/// How long `close` waits for the driver task to finish
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// A client plus the task driving its socket.
///
/// `close` ends the session cleanly. Dropping a `Connection` without closing
/// it aborts the driver, which releases the socket immediately.
pub struct Connection {
    client: Client,
    driver: Option<JoinHandle<()>>,
}

impl Connection {
    /// Open a connection, failing with [`BootstrapError::Connection`]
    pub async fn open(params: &ConnectionParams) -> Result<Self> {
        let (client, connection) = params
            .pg_config()
            .connect(NoTls)
            .await
            .map_err(BootstrapError::Connection)?;

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "Connection closed with error");
            }
        });

        Ok(Self {
            client,
            driver: Some(driver),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut Client {
        &mut self.client
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    /// Terminate the session and wait for the driver to exit
    pub async fn close(mut self) {
        let driver = self.driver.take();
        // Drops the client, which lets the driver send Terminate and finish
        drop(self);

        let Some(mut driver) = driver else {
            return;
        };
        match tokio::time::timeout(CLOSE_TIMEOUT, &mut driver).await {
            Ok(Ok(())) => debug!("Connection closed"),
            Ok(Err(e)) => warn!(error = %e, "Connection driver task failed"),
            Err(_) => {
                warn!("Connection did not close in time, aborting driver");
                driver.abort();
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            debug!("Connection dropped without close, aborting driver");
            driver.abort();
        }
    }
}
