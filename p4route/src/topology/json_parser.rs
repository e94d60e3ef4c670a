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

//! Parses JSON topology files in a (reduced) p4utils node-link format.
//!
//! ```json
//! {
//!   "nodes": [
//!     { "id": "s1", "isP4Switch": true },
//!     { "id": "h1", "isHost": true, "ip": "10.0.1.2/24" }
//!   ],
//!   "links": [
//!     { "node1": "h1", "node2": "s1", "port1": 0, "port2": 1,
//!       "addr1": "00:00:0a:00:01:02", "addr2": "00:01:0a:00:01:01" }
//!   ]
//! }
//! ```
//!
//! Any other field of the nodes or links is ignored.

use super::{Topology, TopologyError};

use log::*;
use serde::Deserialize;
use std::fs::read_to_string;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct TopologyFile {
    nodes: Vec<NodeEntry>,
    links: Vec<LinkEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeEntry {
    id: String,
    #[serde(default)]
    is_p4_switch: bool,
    #[serde(default)]
    is_switch: bool,
    #[serde(default)]
    is_host: bool,
    ip: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinkEntry {
    node1: String,
    node2: String,
    port1: u32,
    port2: u32,
    addr1: String,
    addr2: String,
}

impl Topology {
    /// Read and parse a JSON topology file.
    pub fn from_json_file(filename: impl AsRef<Path>) -> Result<Self, TopologyError> {
        let json_str = read_to_string(filename.as_ref())?;
        Self::from_json_str(&json_str)
    }

    /// Parse a JSON topology. All nodes are added in the order they appear in the file, and all
    /// links are added afterwards.
    pub fn from_json_str(json_str: &str) -> Result<Self, TopologyError> {
        let file: TopologyFile = serde_json::from_str(json_str)?;
        let mut topo = Topology::new();

        for NodeEntry { id, is_p4_switch, is_switch, is_host, ip } in file.nodes {
            if is_p4_switch || is_switch {
                topo.add_switch(id)?;
            } else if is_host {
                let ip = match ip {
                    Some(ip) => ip,
                    None => return Err(TopologyError::MissingField { node: id, field: "ip" }),
                };
                let address = match ip.parse() {
                    Ok(address) => address,
                    Err(_) => return Err(TopologyError::InvalidIpAddr { node: id, addr: ip }),
                };
                topo.add_host(id, address)?;
            } else {
                return Err(TopologyError::UnknownNodeKind(id));
            }
        }

        for link in file.links {
            let node1 = topo.get_node_id(&link.node1)?;
            let node2 = topo.get_node_id(&link.node2)?;
            topo.add_link(
                (node1, link.port1, link.addr1.parse()?),
                (node2, link.port2, link.addr2.parse()?),
            )?;
        }

        debug!(
            "Parsed topology with {} switches and {} hosts",
            topo.switches().len(),
            topo.hosts().len()
        );

        Ok(topo)
    }
}
