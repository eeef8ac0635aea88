//! Ordered per-connection pragmas
//!
//! Pragmas are session scoped, so they are applied from the pool's
//! `after_connect` hook on every fresh physical connection. The order is
//! fixed: busy_timeout first so that the remaining statements already wait
//! on a locked file instead of failing, then synchronous, temp_store,
//! journal_mode (WAL only) and finally foreign_keys.

use std::fmt;

use sqlx::sqlite::SqliteConnection;
use tracing::{debug, warn};

use crate::config::SqliteDatabaseConfig;

/// A single `PRAGMA name = value` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pragma {
   name: &'static str,
   value: String,
}

impl Pragma {
   pub fn new(name: &'static str, value: impl Into<String>) -> Self {
      Self {
         name,
         value: value.into(),
      }
   }

   pub fn name(&self) -> &'static str {
      self.name
   }

   pub fn value(&self) -> &str {
      &self.value
   }

   pub fn statement(&self) -> String {
      format!("PRAGMA {} = {}", self.name, self.value)
   }
}

impl fmt::Display for Pragma {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(&self.statement())
   }
}

/// Builds the pragma sequence for `config`, in application order.
pub fn pragma_plan(config: &SqliteDatabaseConfig) -> Vec<Pragma> {
   let mut plan = vec![
      Pragma::new("busy_timeout", config.busy_timeout.as_millis().to_string()),
      Pragma::new("synchronous", config.synchronous.as_str()),
      Pragma::new("temp_store", config.temp_store.as_str()),
   ];

   if config.enable_wal {
      plan.push(Pragma::new("journal_mode", "WAL"));
   }

   plan.push(Pragma::new(
      "foreign_keys",
      if config.foreign_keys { "ON" } else { "OFF" },
   ));

   plan
}

/// Failure of one pragma, carried through sqlx's `after_connect` hook as a
/// configuration error and unpacked again by the connection manager.
#[derive(Debug, thiserror::Error)]
#[error("{pragma}: {source}")]
pub(crate) struct PragmaError {
   pub(crate) pragma: String,
   #[source]
   pub(crate) source: sqlx::Error,
}

impl From<PragmaError> for sqlx::Error {
   fn from(e: PragmaError) -> Self {
      sqlx::Error::Configuration(Box::new(e))
   }
}

/// Applies `plan` to `conn`, stopping at the first failure.
pub(crate) async fn apply_pragmas(
   conn: &mut SqliteConnection,
   plan: &[Pragma],
) -> Result<(), PragmaError> {
   for pragma in plan {
      let statement = pragma.statement();

      if pragma.name() == "journal_mode" {
         // journal_mode answers with the mode actually in effect
         let mode: String = sqlx::query_scalar(&statement)
            .fetch_one(&mut *conn)
            .await
            .map_err(|source| PragmaError {
               pragma: statement.clone(),
               source,
            })?;

         if !mode.eq_ignore_ascii_case(pragma.value()) {
            warn!(requested = pragma.value(), actual = %mode, "journal mode not applied");
         }
      } else {
         sqlx::query(&statement)
            .execute(&mut *conn)
            .await
            .map_err(|source| PragmaError {
               pragma: statement.clone(),
               source,
            })?;
      }

      debug!("Applied {}", statement);
   }

   Ok(())
}
