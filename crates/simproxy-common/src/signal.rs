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

/// The three signals exposed by the proxy and its inner engine.
///
/// Value references match the variable description shipped with the
/// engine module: `u` is the input, `y` the computed output, `k` the
/// gain parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Input,
    Output,
    Gain,
}

impl Signal {
    /// The standardized value reference carried on the wire.
    pub fn value_reference(self) -> u32 {
        match self {
            Signal::Input => 0,
            Signal::Output => 1,
            Signal::Gain => 2,
        }
    }

    /// Reverse lookup from a value reference.
    pub fn from_value_reference(vr: u32) -> Option<Self> {
        match vr {
            0 => Some(Signal::Input),
            1 => Some(Signal::Output),
            2 => Some(Signal::Gain),
            _ => None,
        }
    }

    /// Variable name as published in the model description.
    pub fn name(self) -> &'static str {
        match self {
            Signal::Input => "u",
            Signal::Output => "y",
            Signal::Gain => "k",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
