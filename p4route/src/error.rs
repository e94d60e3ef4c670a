// P4Route: ECMP Route Computation for Programmable Switches
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Module containing all error types

use crate::control::ControlError;
use crate::installer::InstallReport;
use crate::topology::TopologyError;
use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// Referenced adjacency, interface or host attachment is missing or contradictory.
    #[error("Topology is inconsistent: {0}")]
    TopologyInconsistent(#[from] TopologyError),
    /// A component was invoked outside of its precondition.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A call to the control endpoint of a switch failed or timed out, even after retrying.
    #[error("Transport failure on {switch}: {cause}")]
    TransportFailure {
        /// Name of the switch
        switch: String,
        /// Error reported by the endpoint
        cause: ControlError,
    },
    /// The control endpoint rejected a rule, because it is already present.
    #[error("Rule already present on {switch} in table {table}: {key}")]
    DuplicateRuleConflict {
        /// Name of the switch
        switch: String,
        /// Table name
        table: String,
        /// Match fields of the rejected rule
        key: String,
    },
    /// The plan contains a switch, for which no control endpoint is available.
    #[error("No control endpoint for switch {0}")]
    MissingEndpoint(String),
    /// The installation failed on some switches. The report contains all installed switches and
    /// all failures.
    #[error("Installation failed on {} switch(es)", .0.failures.len())]
    InstallFailed(InstallReport),
}

impl Error {
    /// Classify an error reported by the control endpoint of a switch.
    pub fn from_control(switch: impl Into<String>, cause: ControlError) -> Self {
        match cause {
            ControlError::DuplicateRule { table, key } => {
                Self::DuplicateRuleConflict { switch: switch.into(), table, key }
            }
            cause => Self::TransportFailure { switch: switch.into(), cause },
        }
    }

    /// Returns true if the error is a transport failure.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::TransportFailure { .. })
    }
}
