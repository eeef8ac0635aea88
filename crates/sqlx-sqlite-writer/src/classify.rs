//! Busy/locked detection for write errors.
//!
//! Structured SQLite result codes are checked first. Errors that carry no
//! usable code fall back to a case-insensitive match on the message text,
//! which keeps application errors that merely wrap a driver message
//! retryable.

use libsqlite3_sys::{SQLITE_BUSY, SQLITE_LOCKED};

use crate::Error;

/// Message fragments that mark an error as lock contention.
const BUSY_PHRASES: &[&str] = &[
   "database is locked",
   "database is busy",
   "database table is locked",
   "sql statements in progress",
   "locked",
   "busy",
];

/// Whether a failed write may be attempted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
   /// Lock contention; the write can be retried.
   Transient,
   /// Anything else; the error goes straight back to the caller.
   Fatal,
}

impl ErrorClass {
   pub fn is_transient(self) -> bool {
      matches!(self, ErrorClass::Transient)
   }
}

/// Classify an error raised during a write attempt.
pub fn classify(err: &Error) -> ErrorClass {
   match err {
      // Terminal outcomes of the coordinator itself are never retried
      Error::RetriesExhausted { .. } | Error::Cancelled { .. } => ErrorClass::Fatal,
      Error::Sqlx(e) => classify_sqlx(e),
      // Opening and configuring the database are not retried, whatever the cause
      Error::ConnectionManager(
         sqlx_sqlite_conn_mgr::Error::Open { .. }
         | sqlx_sqlite_conn_mgr::Error::Pragma { .. }
         | sqlx_sqlite_conn_mgr::Error::NotInitialized
         | sqlx_sqlite_conn_mgr::Error::DatabaseClosed,
      ) => ErrorClass::Fatal,
      Error::ConnectionManager(e) => match e.as_sqlx() {
         Some(inner) => classify_sqlx(inner),
         None => classify_message(&e.to_string()),
      },
      Error::Operation(boxed) => match boxed.downcast_ref::<sqlx::Error>() {
         Some(inner) => classify_sqlx(inner),
         None => classify_message(&boxed.to_string()),
      },
      Error::Io(e) => classify_message(&e.to_string()),
      Error::Other(msg) => classify_message(msg),
   }
}

/// True when a SQLite primary or extended result code is BUSY or LOCKED.
pub fn is_busy_code(code: i32) -> bool {
   matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED)
}

/// True when a message reads like lock contention.
pub fn is_busy_message(message: &str) -> bool {
   let lower = message.to_ascii_lowercase();
   BUSY_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

fn classify_sqlx(err: &sqlx::Error) -> ErrorClass {
   match err {
      // Another writer holds the only pooled connection
      sqlx::Error::PoolTimedOut => ErrorClass::Transient,
      sqlx::Error::Database(db_err) => {
         let code = db_err.code().and_then(|c| c.parse::<i32>().ok());
         // A result code is authoritative; the message only matters without one
         match code {
            Some(code) if is_busy_code(code) => ErrorClass::Transient,
            Some(_) => ErrorClass::Fatal,
            None => classify_message(db_err.message()),
         }
      }
      other => classify_message(&other.to_string()),
   }
}

fn classify_message(message: &str) -> ErrorClass {
   if is_busy_message(message) {
      ErrorClass::Transient
   } else {
      ErrorClass::Fatal
   }
}
