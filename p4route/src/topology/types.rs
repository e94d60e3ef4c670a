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

//! Module containing all type definitions of the topology

use petgraph::graph::{Graph, NodeIndex};
use petgraph::Undirected;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

type IndexType = u32;
/// Node Identification (and index into the graph). Both switches and hosts are nodes.
pub type NodeId = NodeIndex<IndexType>;
/// Port number of an interface, unique per node.
pub type Port = u32;
/// Topology graph. Every edge is a link with unit cost.
pub type TopologyGraph = Graph<NodeData, (), Undirected, IndexType>;

/// MAC address of an interface, used as next-hop address in the forwarding rules.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct MacAddr(pub [u8; 6]);

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", o[0], o[1], o[2], o[3], o[4], o[5])
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddr({})", self)
    }
}

impl FromStr for MacAddr {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.trim().split(':');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(|| TopologyError::InvalidMacAddr(s.to_string()))?;
            if part.len() != 2 || !part.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(TopologyError::InvalidMacAddr(s.to_string()));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| TopologyError::InvalidMacAddr(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(TopologyError::InvalidMacAddr(s.to_string()));
        }
        Ok(Self(octets))
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Interface of a node towards one of its neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interface {
    /// Local port number
    pub port: Port,
    /// Address of the interface on the other end of the link. This is the next-hop address
    /// programmed into a rule.
    pub neighbor_addr: MacAddr,
}

/// Kind of a node in the topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Programmable switch, for which the forwarding rules are computed
    Switch,
    /// End host with a single interface, `address` containing both the host address and the
    /// prefix length of its subnet.
    Host {
        /// Interface address of the host
        address: ipnet::Ipv4Net,
    },
}

/// Data stored in every node of the [`TopologyGraph`].
#[derive(Debug, Clone)]
pub struct NodeData {
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) interfaces: HashMap<NodeId, Interface>,
}

impl NodeData {
    pub(crate) fn new(name: String, kind: NodeKind) -> Self {
        Self { name, kind, interfaces: HashMap::new() }
    }

    /// Name of the node
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of the node
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns true if the node is a switch
    pub fn is_switch(&self) -> bool {
        matches!(self.kind, NodeKind::Switch)
    }

    /// All interfaces of the node, indexed by the neighbor.
    pub fn interfaces(&self) -> &HashMap<NodeId, Interface> {
        &self.interfaces
    }
}

/// Path through the topology, starting at the source and ending at the destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path(pub Vec<NodeId>);

impl Path {
    /// Source of the path
    pub fn source(&self) -> Option<NodeId> {
        self.0.first().copied()
    }

    /// First hop on the path, which is a neighbor of the source. Returns `None` if the path ends
    /// at its source.
    pub fn first_hop(&self) -> Option<NodeId> {
        self.0.get(1).copied()
    }

    /// All nodes along the path.
    pub fn nodes(&self) -> &[NodeId] {
        &self.0
    }

    /// Number of nodes on the path (including source and destination)
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the path contains no node
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Topology Errors
#[derive(Error, Debug)]
pub enum TopologyError {
    /// Node is not present in the topology
    #[error("Node was not found in topology: {0:?}")]
    DeviceNotFound(NodeId),
    /// Node name is not present in the topology
    #[error("Node name was not found in topology: {0}")]
    DeviceNameNotFound(String),
    /// The name is already used by a different node
    #[error("Node name is already used: {0}")]
    DuplicateName(String),
    /// Two hosts cannot have the same address
    #[error("Address {addr} of {node} is already used by {other}")]
    DuplicateAddress {
        /// Name of the new host
        node: String,
        /// Host which already has the address
        other: String,
        /// The address used twice
        addr: std::net::Ipv4Addr,
    },
    /// The node must be a switch, but it is a host.
    #[error("Node is not a switch: {0}")]
    NotASwitch(String),
    /// Two nodes are not adjacent
    #[error("Link does not exist: {0} -> {1}")]
    NotConnected(String, String),
    /// Two nodes are already adjacent
    #[error("Link does already exist: {0} -- {1}")]
    AlreadyConnected(String, String),
    /// The port is already used by a different interface
    #[error("Port {port} of {node} is already in use")]
    PortInUse {
        /// Node name
        node: String,
        /// Port number
        port: u32,
    },
    /// Hosts can only be connected to a single switch
    #[error("Host {0} can only be attached to a single switch")]
    HostAlreadyAttached(String),
    /// Hosts cannot be connected to each other
    #[error("Cannot connect two hosts: {0} -- {1}")]
    HostToHostLink(String, String),
    /// No host is attached with the gateway address of a subnet.
    #[error("No host with address {gateway} attached to {switch} (subnet {subnet})")]
    NoHostForGateway {
        /// Switch to which the subnet is attached
        switch: String,
        /// Subnet attached to the switch
        subnet: ipnet::Ipv4Net,
        /// Gateway address that was looked up
        gateway: std::net::Ipv4Addr,
    },
    /// The gateway address is outside of the subnet
    #[error("Gateway offset {offset} is outside of subnet {subnet}")]
    GatewayOutOfRange {
        /// Subnet of the host
        subnet: ipnet::Ipv4Net,
        /// Configured host offset
        offset: u32,
    },
    /// MAC address cannot be parsed
    #[error("Invalid MAC address: {0}")]
    InvalidMacAddr(String),
    /// IP address cannot be parsed
    #[error("Invalid IPv4 address of {node}: {addr}")]
    InvalidIpAddr {
        /// Node name
        node: String,
        /// Address which could not be parsed
        addr: String,
    },
    /// A node in a topology file is neither a switch nor a host
    #[error("Node {0} is neither a switch nor a host")]
    UnknownNodeKind(String),
    /// A field is missing in the topology file
    #[error("Node {node} is missing the field {field}")]
    MissingField {
        /// Node name
        node: String,
        /// Name of the missing field
        field: &'static str,
    },
    /// Cannot read the topology file
    #[error("Cannot read the topology file: {0}")]
    Io(#[from] std::io::Error),
    /// Cannot parse the topology file
    #[error("Cannot parse the topology file: {0}")]
    Json(#[from] serde_json::Error),
}
