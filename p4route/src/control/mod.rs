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

//! # Switch Control
//!
//! This module contains the interface through which table entries are pushed onto a switch, and
//! some endpoints implementing it. The endpoint of a single switch is only ever used by a single
//! thread at a time, but it may be moved between threads.
//!
//! - [`MemorySwitch`] stores all tables in memory, and can be inspected afterwards.
//! - [`CommandFileSwitch`] writes `simple_switch_CLI` commands into a writer.
//! - [`TimedSwitch`] wraps any other endpoint, and applies a timeout to every call.

mod command_file;
mod memory;
mod timed;

pub use command_file::CommandFileSwitch;
pub use memory::{MemorySwitch, SwitchCall, SwitchTables};
pub use timed::TimedSwitch;

use std::time::Duration;
use thiserror::Error;

/// Control endpoint of a single switch.
pub trait SwitchControl: Send {
    /// Remove all entries from the table. The default action is not changed.
    fn clear_table(&mut self, table: &str) -> Result<(), ControlError>;

    /// Set the default action of the table.
    fn set_default_action(
        &mut self,
        table: &str,
        action: &str,
        params: &[String],
    ) -> Result<(), ControlError>;

    /// Add a new entry (exact match or LPM) to the table. If an entry with the same match fields
    /// exists already, the endpoint must return [`ControlError::DuplicateRule`].
    fn add_rule(
        &mut self,
        table: &str,
        action: &str,
        match_fields: &[String],
        action_params: &[String],
    ) -> Result<(), ControlError>;
}

impl<S: SwitchControl + ?Sized> SwitchControl for Box<S> {
    fn clear_table(&mut self, table: &str) -> Result<(), ControlError> {
        (**self).clear_table(table)
    }

    fn set_default_action(
        &mut self,
        table: &str,
        action: &str,
        params: &[String],
    ) -> Result<(), ControlError> {
        (**self).set_default_action(table, action, params)
    }

    fn add_rule(
        &mut self,
        table: &str,
        action: &str,
        match_fields: &[String],
        action_params: &[String],
    ) -> Result<(), ControlError> {
        (**self).add_rule(table, action, match_fields, action_params)
    }
}

/// Errors reported by a control endpoint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// The request could not be delivered, or the switch reported a failure.
    #[error("Transport error: {0}")]
    Transport(String),
    /// The switch did not answer in time.
    #[error("No answer within {0:?}")]
    Timeout(Duration),
    /// An entry with the same match fields exists already.
    #[error("Entry {key} exists already in table {table}")]
    DuplicateRule {
        /// Table name
        table: String,
        /// Match fields of the entry
        key: String,
    },
}

impl ControlError {
    /// Returns true if the call may succeed when it is repeated.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::DuplicateRule { .. })
    }
}
