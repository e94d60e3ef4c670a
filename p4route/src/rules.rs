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

//! # Forwarding Rules
//!
//! This module contains the rules computed for every switch, and their translation into table
//! entries of the switch pipeline.

use crate::config::TableNames;
use crate::ecmp::GroupId;
use crate::topology::{MacAddr, Port};

use ipnet::Ipv4Net;
use serde::Serialize;
use std::fmt;

/// A single forwarding rule on a switch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type")]
pub enum ForwardingRule {
    /// Forward the subnet directly to a next hop. This is used for directly attached hosts (with
    /// a `/32` subnet), and for destinations reached over a single path.
    Direct {
        /// Destination subnet
        subnet: Ipv4Net,
        /// Address of the next hop
        next_hop: MacAddr,
        /// Egress port
        port: Port,
    },
    /// Forward the subnet to an ECMP group
    EcmpReference {
        /// Destination subnet
        subnet: Ipv4Net,
        /// Referenced group
        group: GroupId,
        /// Number of members in the group
        group_size: u32,
    },
    /// Member of an ECMP group
    EcmpMember {
        /// Group to which the member belongs
        group: GroupId,
        /// Index of the member inside the group, starting at 0
        member_index: u32,
        /// Address of the next hop
        next_hop: MacAddr,
        /// Egress port
        port: Port,
    },
}

impl ForwardingRule {
    /// Returns the destination subnet of the rule (`None` for group members).
    pub fn subnet(&self) -> Option<Ipv4Net> {
        match self {
            Self::Direct { subnet, .. } | Self::EcmpReference { subnet, .. } => Some(*subnet),
            Self::EcmpMember { .. } => None,
        }
    }

    /// Returns the referenced group, if the rule is either a reference or a member of a group.
    pub fn group(&self) -> Option<GroupId> {
        match self {
            Self::EcmpReference { group, .. } | Self::EcmpMember { group, .. } => Some(*group),
            Self::Direct { .. } => None,
        }
    }

    /// Returns true if the rule is part of an ECMP group (reference or member).
    pub fn is_ecmp(&self) -> bool {
        self.group().is_some()
    }

    /// Translate the rule into a table entry.
    pub fn to_entry(&self, tables: &TableNames) -> TableEntry {
        match self {
            Self::Direct { subnet, next_hop, port } => TableEntry {
                table: tables.lpm_table.clone(),
                action: tables.set_nhop.clone(),
                match_fields: vec![subnet.to_string()],
                action_params: vec![next_hop.to_string(), port.to_string()],
            },
            Self::EcmpReference { subnet, group, group_size } => TableEntry {
                table: tables.lpm_table.clone(),
                action: tables.ecmp_group.clone(),
                match_fields: vec![subnet.to_string()],
                action_params: vec![group.to_string(), group_size.to_string()],
            },
            Self::EcmpMember { group, member_index, next_hop, port } => TableEntry {
                table: tables.group_table.clone(),
                action: tables.set_nhop.clone(),
                match_fields: vec![group.to_string(), member_index.to_string()],
                action_params: vec![next_hop.to_string(), port.to_string()],
            },
        }
    }
}

impl fmt::Display for ForwardingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct { subnet, next_hop, port } => {
                write!(f, "{} -> {} (port {})", subnet, next_hop, port)
            }
            Self::EcmpReference { subnet, group, group_size } => {
                write!(f, "{} -> group {} ({} paths)", subnet, group, group_size)
            }
            Self::EcmpMember { group, member_index, next_hop, port } => {
                write!(f, "group {}[{}] -> {} (port {})", group, member_index, next_hop, port)
            }
        }
    }
}

/// Entry of a table, in the notation of `simple_switch_CLI`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TableEntry {
    /// Table name
    pub table: String,
    /// Action name
    pub action: String,
    /// Match fields (exact or LPM)
    pub match_fields: Vec<String>,
    /// Action parameters
    pub action_params: Vec<String>,
}

impl TableEntry {
    /// The match fields, joined by a space. Two entries of the same table with the same key
    /// cannot coexist.
    pub fn key(&self) -> String {
        self.match_fields.join(" ")
    }
}

impl fmt::Display for TableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table_add {} {}", self.table, self.action)?;
        for field in self.match_fields.iter() {
            write!(f, " {}", field)?;
        }
        write!(f, " =>")?;
        for param in self.action_params.iter() {
            write!(f, " {}", param)?;
        }
        Ok(())
    }
}
