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

use p4route::example_networks::{DiamondNet, ExampleNetwork, LeafSpineNet, LineNet};
use p4route::topology::{Topology, TopologyError};
use std::fmt;

use clap::ValueEnum;

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ExampleTopology {
    Line,
    Diamond,
    LeafSpine,
}

impl fmt::Display for ExampleTopology {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExampleTopology::Line => write!(f, "LineNet"),
            ExampleTopology::Diamond => write!(f, "DiamondNet"),
            ExampleTopology::LeafSpine => write!(f, "LeafSpineNet"),
        }
    }
}

pub fn get_topo(topo: ExampleTopology) -> Result<Topology, TopologyError> {
    match topo {
        ExampleTopology::Line => LineNet::net(),
        ExampleTopology::Diamond => DiamondNet::net(),
        ExampleTopology::LeafSpine => LeafSpineNet::net(),
    }
}
