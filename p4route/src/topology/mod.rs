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

//! # Topology
//!
//! This module stores the topology snapshot, from which the forwarding rules are computed. The
//! topology is a graph of switches and hosts, where every node knows its interfaces towards its
//! neighbors (the local port, and the address of the neighbor's interface). All links have the
//! same cost.
//!
//! ## Example usage
//!
//! The following example generates a line `s1 -- s2` with one host attached to `s2`.
//!
//! ```rust
//! use p4route::topology::{MacAddr, Topology};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut t = Topology::new();
//!
//!     let s1 = t.add_switch("s1")?;
//!     let s2 = t.add_switch("s2")?;
//!     let h2 = t.add_host("h2", "10.0.2.2/24".parse()?)?;
//!
//!     t.add_link((s1, 1, "00:01:00:00:01:01".parse()?), (s2, 1, "00:01:00:00:02:01".parse()?))?;
//!     t.add_link((s2, 2, "00:01:00:00:02:02".parse()?), (h2, 0, "00:00:0a:00:02:02".parse()?))?;
//!
//!     assert_eq!(t.direct_host_subnets(s2)?, vec!["10.0.2.0/24".parse::<ipnet::Ipv4Net>()?]);
//!     assert_eq!(t.interface(s1, s2)?.port, 1);
//!     assert_eq!(t.interface(s1, s2)?.neighbor_addr, MacAddr([0, 1, 0, 0, 2, 1]));
//!     assert_eq!(t.shortest_paths(s1, s2)?.len(), 1);
//!
//!     Ok(())
//! }
//! ```

mod json_parser;
mod types;

pub use types::{
    Interface, MacAddr, NodeData, NodeId, NodeKind, Path, Port, TopologyError, TopologyGraph,
};

use ipnet::Ipv4Net;
use itertools::Itertools;
use log::*;
use petgraph::algo::dijkstra;
use petgraph::graph::Graph;
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// One end of a link: the node, its local port, and the address of its interface.
pub type LinkEnd = (NodeId, Port, MacAddr);

/// # Topology
///
/// Read-only view on the network, used while computing the forwarding rules. Switches and hosts
/// are kept in insertion order, which makes every computation on the topology deterministic.
#[derive(Debug, Clone)]
pub struct Topology {
    graph: TopologyGraph,
    switches: Vec<NodeId>,
    hosts: Vec<NodeId>,
    names: HashMap<String, NodeId>,
}

impl Default for Topology {
    fn default() -> Self {
        Self::new()
    }
}

impl Topology {
    /// Generate an empty topology
    pub fn new() -> Self {
        Self {
            graph: Graph::new_undirected(),
            switches: Vec::new(),
            hosts: Vec::new(),
            names: HashMap::new(),
        }
    }

    /// Add a new switch to the topology and return its id.
    pub fn add_switch<S: Into<String>>(&mut self, name: S) -> Result<NodeId, TopologyError> {
        let id = self.add_node(name.into(), NodeKind::Switch)?;
        self.switches.push(id);
        Ok(id)
    }

    /// Add a new host to the topology and return its id. The `address` is the address of the
    /// host's interface, together with the prefix length of its subnet (e.g., `10.0.1.2/24`).
    /// Two hosts cannot share the same address.
    pub fn add_host<S: Into<String>>(
        &mut self,
        name: S,
        address: Ipv4Net,
    ) -> Result<NodeId, TopologyError> {
        let name = name.into();
        if let Some(other) = self.host_with_address(address.addr()) {
            return Err(TopologyError::DuplicateAddress {
                node: name,
                other: self.name_or_id(other),
                addr: address.addr(),
            });
        }
        let id = self.add_node(name, NodeKind::Host { address })?;
        self.hosts.push(id);
        Ok(id)
    }

    fn add_node(&mut self, name: String, kind: NodeKind) -> Result<NodeId, TopologyError> {
        if self.names.contains_key(&name) {
            return Err(TopologyError::DuplicateName(name));
        }
        let id = self.graph.add_node(NodeData::new(name.clone(), kind));
        self.names.insert(name, id);
        Ok(id)
    }

    /// Add a link between two nodes. Each end contains the node, the local port, and the address
    /// of the node's interface on this link. A host can only be attached to a single switch, and
    /// two hosts cannot be connected directly.
    pub fn add_link(&mut self, a: LinkEnd, b: LinkEnd) -> Result<(), TopologyError> {
        let (node_a, port_a, addr_a) = a;
        let (node_b, port_b, addr_b) = b;
        let data_a = self.node(node_a)?;
        let data_b = self.node(node_b)?;

        if node_a == node_b || data_a.interfaces.contains_key(&node_b) {
            return Err(TopologyError::AlreadyConnected(
                data_a.name.clone(),
                data_b.name.clone(),
            ));
        }
        if !data_a.is_switch() && !data_b.is_switch() {
            return Err(TopologyError::HostToHostLink(data_a.name.clone(), data_b.name.clone()));
        }
        for (data, port) in [(data_a, port_a), (data_b, port_b)].iter() {
            if !data.is_switch() && !data.interfaces.is_empty() {
                return Err(TopologyError::HostAlreadyAttached(data.name.clone()));
            }
            if data.interfaces.values().any(|i| i.port == *port) {
                return Err(TopologyError::PortInUse { node: data.name.clone(), port: *port });
            }
        }

        self.graph[node_a]
            .interfaces
            .insert(node_b, Interface { port: port_a, neighbor_addr: addr_b });
        self.graph[node_b]
            .interfaces
            .insert(node_a, Interface { port: port_b, neighbor_addr: addr_a });
        self.graph.add_edge(node_a, node_b, ());
        Ok(())
    }

    /// Returns the underlying graph
    pub fn graph(&self) -> &TopologyGraph {
        &self.graph
    }

    /// Returns the number of nodes (switches and hosts) in the topology.
    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    /// All switches, in the order they were added.
    pub fn switches(&self) -> &[NodeId] {
        &self.switches
    }

    /// All hosts, in the order they were added.
    pub fn hosts(&self) -> &[NodeId] {
        &self.hosts
    }

    /// Returns the data of a node.
    pub fn node(&self, id: NodeId) -> Result<&NodeData, TopologyError> {
        self.graph.node_weight(id).ok_or(TopologyError::DeviceNotFound(id))
    }

    /// Get the id of a node by its name.
    pub fn get_node_id(&self, name: impl AsRef<str>) -> Result<NodeId, TopologyError> {
        self.names
            .get(name.as_ref())
            .copied()
            .ok_or_else(|| TopologyError::DeviceNameNotFound(name.as_ref().to_string()))
    }

    /// Get the name of a node.
    pub fn get_node_name(&self, id: NodeId) -> Result<&str, TopologyError> {
        self.node(id).map(|n| n.name())
    }

    /// Returns true if the node exists and is a switch.
    pub fn is_switch(&self, id: NodeId) -> bool {
        self.graph.node_weight(id).map(|n| n.is_switch()).unwrap_or(false)
    }

    /// Returns all interfaces of a node, indexed by the neighbor.
    pub fn interfaces(&self, id: NodeId) -> Result<&HashMap<NodeId, Interface>, TopologyError> {
        self.node(id).map(|n| n.interfaces())
    }

    /// Returns the interface of `from` towards its neighbor `to`.
    pub fn interface(&self, from: NodeId, to: NodeId) -> Result<&Interface, TopologyError> {
        self.interfaces(from)?.get(&to).ok_or_else(|| {
            TopologyError::NotConnected(self.name_or_id(from), self.name_or_id(to))
        })
    }

    /// Returns all neighbors together with the interface towards them, ordered by the local port.
    pub fn neighbors_by_port(
        &self,
        id: NodeId,
    ) -> Result<Vec<(NodeId, Interface)>, TopologyError> {
        Ok(self
            .interfaces(id)?
            .iter()
            .map(|(n, i)| (*n, *i))
            .sorted_by_key(|(_, i)| i.port)
            .collect())
    }

    /// Returns the subnets of all hosts that are directly attached to the switch, ordered by the
    /// port of the switch towards the host. Each subnet is reported only once.
    pub fn direct_host_subnets(&self, switch: NodeId) -> Result<Vec<Ipv4Net>, TopologyError> {
        let data = self.node(switch)?;
        if !data.is_switch() {
            return Err(TopologyError::NotASwitch(data.name.clone()));
        }
        Ok(self
            .neighbors_by_port(switch)?
            .into_iter()
            .filter_map(|(n, _)| match self.graph[n].kind {
                NodeKind::Host { address } => Some(address.trunc()),
                NodeKind::Switch => None,
            })
            .unique()
            .collect())
    }

    /// Returns the host whose interface has the given address.
    pub fn host_with_address(&self, addr: Ipv4Addr) -> Option<NodeId> {
        self.hosts.iter().copied().find(|h| match self.graph[*h].kind {
            NodeKind::Host { address } => address.addr() == addr,
            NodeKind::Switch => false,
        })
    }

    /// Returns the host attached to `switch` whose interface has the given address.
    pub fn attached_host_with_address(
        &self,
        switch: NodeId,
        addr: Ipv4Addr,
    ) -> Result<Option<NodeId>, TopologyError> {
        Ok(self.neighbors_by_port(switch)?.into_iter().map(|(n, _)| n).find(|n| {
            match self.graph[*n].kind {
                NodeKind::Host { address } => address.addr() == addr,
                NodeKind::Switch => false,
            }
        }))
    }

    /// Compute all minimum-cost paths from `source` to `target`. Only switches are used as transit
    /// nodes. At every node, the next hops are explored in the order of the local port, which
    /// makes the order of the resulting paths deterministic. If both nodes are the same, the
    /// single path `[source]` is returned. If `target` cannot be reached, the result is empty.
    pub fn shortest_paths(
        &self,
        source: NodeId,
        target: NodeId,
    ) -> Result<Vec<Path>, TopologyError> {
        self.node(source)?;
        self.node(target)?;
        if source == target {
            return Ok(vec![Path(vec![source])]);
        }

        // hop count of every node towards the target
        let distance = dijkstra(&self.graph, target, None, |_| 1u32);
        if !distance.contains_key(&source) {
            trace!("{} cannot reach {}", self.name_or_id(source), self.name_or_id(target));
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        let mut current = vec![source];
        self.collect_paths(source, target, &distance, &mut current, &mut paths)?;
        Ok(paths)
    }

    fn collect_paths(
        &self,
        node: NodeId,
        target: NodeId,
        distance: &HashMap<NodeId, u32>,
        current: &mut Vec<NodeId>,
        paths: &mut Vec<Path>,
    ) -> Result<(), TopologyError> {
        if node == target {
            paths.push(Path(current.clone()));
            return Ok(());
        }
        let next_distance = match distance.get(&node) {
            Some(d) if *d > 0 => d - 1,
            _ => return Ok(()),
        };
        for (next, _) in self.neighbors_by_port(node)? {
            if next != target && !self.is_switch(next) {
                continue;
            }
            if distance.get(&next) == Some(&next_distance) {
                current.push(next);
                self.collect_paths(next, target, distance, current, paths)?;
                current.pop();
            }
        }
        Ok(())
    }

    /// Name of the node, or its debug representation if it doesn't exist. Used for error messages.
    pub(crate) fn name_or_id(&self, id: NodeId) -> String {
        self.graph
            .node_weight(id)
            .map(|n| n.name.clone())
            .unwrap_or_else(|| format!("{:?}", id))
    }
}
