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

//! # ECMP Group Allocation
//!
//! Every switch keeps its own registry of ECMP groups. A group is identified by the sorted
//! sequence of egress ports used by a multi-path set, such that two path sets using the same ports
//! always collapse to the same group, no matter in which order the paths were discovered. Group
//! ids are assigned per switch in first-seen order, starting at 1, and are never reused.

use crate::topology::{NodeId, Port, Topology};
use crate::Error;

use itertools::Itertools;
use log::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Identifier of an ECMP group, unique per switch.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signature of an ECMP group: the egress ports of all paths, sorted numerically. A port occurs
/// once per path using it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EcmpGroupKey(Vec<Port>);

impl EcmpGroupKey {
    /// Create the key from the egress ports of all paths, in any order.
    pub fn from_ports(ports: impl IntoIterator<Item = Port>) -> Self {
        Self(ports.into_iter().sorted().collect())
    }

    /// The sorted ports
    pub fn ports(&self) -> &[Port] {
        &self.0
    }

    /// Number of paths in the group
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the key contains no port.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EcmpGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(","))
    }
}

/// # ECMP Group Table
///
/// Registry of all ECMP groups of a single switch, together with the counter for the next group
/// id.
#[derive(Debug, Clone, PartialEq)]
pub struct EcmpGroupTable {
    groups: HashMap<EcmpGroupKey, GroupId>,
    next_id: u32,
}

impl Default for EcmpGroupTable {
    fn default() -> Self {
        Self::new()
    }
}

impl EcmpGroupTable {
    /// Create an empty table. The first group will get the id 1.
    pub fn new() -> Self {
        Self { groups: HashMap::new(), next_id: 1 }
    }

    /// Resolve the group used by `switch` to reach the first hops of a multi-path set. The egress
    /// port towards each first hop is looked up in the interfaces of the switch. Returns the group
    /// id, and `true` if the group was newly created. Only in that case, the caller must install
    /// the group members, one per path, in the order of `first_hops`.
    ///
    /// `first_hops` contains one entry per path, and must contain at least two distinct nodes.
    pub fn resolve(
        &mut self,
        topo: &Topology,
        switch: NodeId,
        first_hops: &[NodeId],
    ) -> Result<(GroupId, bool), Error> {
        if first_hops.iter().unique().count() < 2 {
            return Err(Error::InvalidArgument(format!(
                "ECMP group on {} requires at least two distinct next hops, got [{}]",
                topo.name_or_id(switch),
                first_hops.iter().map(|nh| topo.name_or_id(*nh)).join(", ")
            )));
        }
        let ports = first_hops
            .iter()
            .map(|nh| topo.interface(switch, *nh).map(|intf| intf.port))
            .collect::<Result<Vec<Port>, _>>()?;
        Ok(self.resolve_key(EcmpGroupKey::from_ports(ports)))
    }

    /// Resolve the group of a given signature. Returns the group id, and `true` if the group was
    /// newly created.
    pub fn resolve_key(&mut self, key: EcmpGroupKey) -> (GroupId, bool) {
        if let Some(id) = self.groups.get(&key) {
            return (*id, false);
        }
        let id = GroupId(self.next_id);
        self.next_id += 1;
        trace!("New ECMP group {} for ports [{}]", id, key);
        self.groups.insert(key, id);
        (id, true)
    }

    /// Get the id of an already registered signature.
    pub fn get(&self, key: &EcmpGroupKey) -> Option<GroupId> {
        self.groups.get(key).copied()
    }

    /// Number of registered groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if no group was registered.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterate over all groups, ordered by their id.
    pub fn iter(&self) -> impl Iterator<Item = (GroupId, &EcmpGroupKey)> {
        self.groups.iter().map(|(key, id)| (*id, key)).sorted_by_key(|(id, _)| *id)
    }
}

/// # Allocator State
///
/// ECMP group tables of all switches of a single run. While computing the rules of a switch, its
/// table can be moved out of the state (see [`AllocatorState::take`]), such that every switch is
/// only ever modified by a single worker.
#[derive(Debug, Clone, Default)]
pub struct AllocatorState {
    tables: HashMap<NodeId, EcmpGroupTable>,
}

impl AllocatorState {
    /// Create a new, empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the group of a multi-path set on `switch` (see [`EcmpGroupTable::resolve`]).
    pub fn resolve(
        &mut self,
        topo: &Topology,
        switch: NodeId,
        first_hops: &[NodeId],
    ) -> Result<(GroupId, bool), Error> {
        self.tables.entry(switch).or_default().resolve(topo, switch, first_hops)
    }

    /// Move the table of a switch out of the state. If the switch has no table yet, an empty one
    /// is returned.
    pub fn take(&mut self, switch: NodeId) -> EcmpGroupTable {
        self.tables.remove(&switch).unwrap_or_default()
    }

    /// Put the table of a switch (back) into the state.
    pub fn insert(&mut self, switch: NodeId, table: EcmpGroupTable) {
        self.tables.insert(switch, table);
    }

    /// Get the table of a switch
    pub fn get(&self, switch: NodeId) -> Option<&EcmpGroupTable> {
        self.tables.get(&switch)
    }

    /// Total number of groups on all switches
    pub fn num_groups(&self) -> usize {
        self.tables.values().map(|t| t.len()).sum()
    }
}
