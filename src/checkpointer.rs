//! Background WAL checkpointing on a fixed interval

use std::sync::Arc;
use std::time::Duration;

use sqlx_sqlite_conn_mgr::{CheckpointMode, SqliteDatabase};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Spawn a task that checkpoints `db` every `interval` until `cancel`
/// fires. Failed checkpoints are logged and the loop keeps going.
pub(crate) fn spawn_checkpointer(
   db: Arc<SqliteDatabase>,
   interval: Duration,
   mode: CheckpointMode,
   cancel: CancellationToken,
) -> JoinHandle<()> {
   tokio::spawn(async move {
      let mut ticker = time::interval(interval);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      // The first tick completes immediately
      ticker.tick().await;

      loop {
         tokio::select! {
            () = cancel.cancelled() => {
               debug!("Periodic checkpointer stopped");
               return;
            }
            _ = ticker.tick() => {
               match db.checkpoint(mode).await {
                  Ok(result) if result.busy => {
                     debug!(
                        "Periodic {} checkpoint could not finish (busy): {}/{} frames",
                        mode, result.checkpointed_frames, result.log_frames
                     );
                  }
                  Ok(result) => {
                     debug!(
                        "Periodic {} checkpoint: {}/{} frames",
                        mode, result.checkpointed_frames, result.log_frames
                     );
                  }
                  Err(e) => warn!("Periodic {} checkpoint failed: {}", mode, e),
               }
            }
         }
      }
   })
}
