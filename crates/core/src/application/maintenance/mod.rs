// Maintenance Service
// Periodic purge of expired lock/progress/result rows plus conditional VACUUM

use super::shutdown::ShutdownToken;
use crate::error::Result;
use crate::port::{Maintenance, MaintenanceConfig, MaintenanceReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

/// Maintenance scheduler
///
/// Runs periodic maintenance in the background until shutdown
pub struct MaintenanceScheduler {
    maintenance: Arc<dyn Maintenance>,
    config: MaintenanceConfig,
    every: Duration,
}

impl MaintenanceScheduler {
    /// Create a new maintenance scheduler
    ///
    /// # Arguments
    /// * `maintenance` - Maintenance implementation
    /// * `config` - Maintenance configuration
    /// * `every` - How often to run maintenance
    pub fn new(maintenance: Arc<dyn Maintenance>, config: MaintenanceConfig, every: Duration) -> Self {
        Self {
            maintenance,
            config,
            every,
        }
    }

    /// Run maintenance loop (background task)
    ///
    /// Should be spawned in tokio::spawn
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        info!(every_secs = self.every.as_secs(), "Maintenance scheduler started");

        let mut tick = interval(self.every);
        // The first tick completes immediately; skip it so startup stays quiet
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = shutdown.wait() => {
                    info!("Maintenance scheduler stopped");
                    return;
                }
            }

            match self.maintenance.run_full_maintenance(&self.config).await {
                Ok(report) => {
                    info!(
                        purged = report.purged_entries,
                        reclaimed_mb = report.reclaimed_mb,
                        db_size_mb = report.stats.db_size_mb,
                        "Scheduled maintenance completed successfully"
                    );
                }
                Err(e) => {
                    error!(error = ?e, "Scheduled maintenance failed");
                }
            }
        }
    }

    /// Run maintenance immediately (for manual trigger)
    pub async fn run_now(&self, force_vacuum: bool) -> Result<MaintenanceReport> {
        info!(force_vacuum, "Running manual maintenance...");

        let config = MaintenanceConfig {
            force_vacuum,
            ..self.config.clone()
        };
        self.maintenance.run_full_maintenance(&config).await
    }
}
