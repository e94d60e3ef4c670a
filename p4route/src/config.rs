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

//! # Configuration
//!
//! Settings of a control-plane run. All fields have defaults matching the `ipv4_lpm` /
//! `ecmp_group_to_nhop` pipeline, and can be read from a JSON file, in which missing fields take
//! their default value.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Names of the tables and actions of the switch pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    /// LPM table on the destination address
    pub lpm_table: String,
    /// Group table, with an exact match on the group id and the member index
    pub group_table: String,
    /// Action forwarding to a next hop, with the parameters next-hop address and port
    pub set_nhop: String,
    /// Action selecting an ECMP group, with the parameters group id and group size
    pub ecmp_group: String,
    /// Default action of both tables
    pub drop: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            lpm_table: String::from("ipv4_lpm"),
            group_table: String::from("ecmp_group_to_nhop"),
            set_nhop: String::from("set_nhop"),
            ecmp_group: String::from("ecmp_group"),
            drop: String::from("drop"),
        }
    }
}

impl TableNames {
    /// Both tables, in the order in which they are reset.
    pub fn all_tables(&self) -> [&str; 2] {
        [self.lpm_table.as_str(), self.group_table.as_str()]
    }
}

/// Configuration of the [`RouteInstaller`](crate::installer::RouteInstaller)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Names of the tables and actions
    pub tables: TableNames,
    /// Offset of the host address inside its subnet. Directly attached hosts are expected at
    /// `network + host_offset`.
    pub host_offset: u32,
    /// Number of worker threads. `None` uses one thread per CPU.
    pub threads: Option<usize>,
    /// Maximum number of attempts for a single call to the control endpoint.
    pub max_attempts: usize,
    /// Time to wait before retrying a failed call, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Timeout of a single call to the control endpoint, in milliseconds.
    pub call_timeout_ms: Option<u64>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            tables: TableNames::default(),
            host_offset: 2,
            threads: None,
            max_attempts: 3,
            retry_backoff_ms: 100,
            call_timeout_ms: None,
        }
    }
}

impl InstallerConfig {
    /// Parse the configuration from a JSON string.
    pub fn from_json_str(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Number of worker threads to use (at least 1).
    pub fn num_threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Time to wait between two attempts
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Timeout for a single call, if any.
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }
}
