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

#![deny(missing_docs, missing_debug_implementations)]

//! # P4Route: ECMP Route Computation for Programmable Switches
//! This is a library for computing the forwarding state of a set of programmable switches, and for
//! installing it as table entries onto the switches.
//!
//! ## Problem Statement
//! Given a topology of switches and hosts, compute for every switch the table entries required to
//! reach every host subnet, such that
//! - directly attached hosts are reached with a host route (`/32`),
//! - subnets reached over a single shortest path are forwarded directly to the next hop, and
//! - subnets reached over multiple shortest paths are forwarded to an ECMP group, where groups
//!   using the same egress ports are shared.
//!
//! ## Structure
//!
//! - **[`Topology`](topology)**: The topology store, and the computation of all shortest paths.
//!   Topologies can be built programmatically, or loaded from a JSON file.
//!
//! - **[`ECMP`](ecmp)**: Per-switch registry of ECMP groups, which deduplicates groups by their
//!   egress ports.
//!
//! - **[`Rules`](rules)**: The computed forwarding rules, and their translation into table
//!   entries.
//!
//! - **[`RouteInstaller`](installer)**: Computes the rules of all switches (in parallel), and
//!   installs them onto the switches.
//!
//! - **[`Control`](control)**: Interface to the control plane of a single switch, together with
//!   an in-memory endpoint, an endpoint writing `simple_switch_CLI` commands, and a timeout
//!   wrapper.
//!
//! - **[`ExampleNetworks`](example_networks)**: Collection of prepared topologies.
//!
//! ## Usage
//!
//! ```
//! use p4route::control::{MemorySwitch, SwitchControl};
//! use p4route::example_networks::*;
//! use p4route::{Error, InstallerConfig, RouteInstaller};
//! use std::collections::HashMap;
//!
//! fn main() -> Result<(), Error> {
//!     // prepare the topology
//!     // let topo = ...
//! # let topo = LeafSpineNet::net()?;
//!
//!     // prepare the endpoints, one per switch
//!     let mut endpoints: HashMap<String, Box<dyn SwitchControl>> = HashMap::new();
//!     for sw in topo.switches() {
//!         let name = topo.get_node_name(*sw)?;
//!         endpoints.insert(name.to_string(), Box::new(MemorySwitch::new(name)));
//!     }
//!
//!     // compute and install the rules
//!     let installer = RouteInstaller::new(&topo, InstallerConfig::default());
//!     let (plan, report) = installer.run(&mut endpoints)?;
//!
//!     assert_eq!(report.num_rules(), plan.num_rules());
//!     Ok(())
//! }
//! ```

// test modules
pub mod example_networks;
mod test;

pub mod config;
pub mod control;
pub mod ecmp;
mod error;
pub mod installer;
pub mod printer;
pub mod rules;
pub mod topology;

pub use config::InstallerConfig;
pub use error::Error;
pub use installer::RouteInstaller;
