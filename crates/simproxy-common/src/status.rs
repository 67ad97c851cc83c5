//! ---
//! sp_section: "01-core-functionality"
//! sp_subsection: "module"
//! sp_type: "source"
//! sp_scope: "code"
//! sp_description: "Shared primitives for the co-simulation proxy."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};

/// Status enumeration returned by every standardized lifecycle call.
///
/// The numeric values mirror the C ABI of the co-simulation standard so
/// that statuses returned by a dynamically loaded engine pass through the
/// proxy verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Warning,
    Error,
    Fatal,
}

impl Status {
    /// Convert a raw status value returned over the C ABI.
    ///
    /// Unknown discriminants are treated as `Error` rather than panicking;
    /// a misbehaving engine must not take the proxy down with it.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Status::Ok,
            1 => Status::Warning,
            3 => Status::Error,
            4 => Status::Fatal,
            other => {
                tracing::debug!(raw = other, "unmapped engine status treated as error");
                Status::Error
            }
        }
    }

    /// The raw C ABI value for this status.
    pub fn as_raw(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Warning => 1,
            Status::Error => 3,
            Status::Fatal => 4,
        }
    }

    /// True when the call succeeded, possibly with a warning.
    pub fn is_ok(self) -> bool {
        matches!(self, Status::Ok | Status::Warning)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Ok => "ok",
            Status::Warning => "warning",
            Status::Error => "error",
            Status::Fatal => "fatal",
        };
        f.write_str(label)
    }
}
