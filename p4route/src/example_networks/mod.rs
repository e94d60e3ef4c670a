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

//! Networks for testing

use crate::topology::{MacAddr, Topology, TopologyError};

use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

mod linenet;
pub use linenet::LineNet;

mod diamondnet;
pub use diamondnet::DiamondNet;

mod leafspinenet;
pub use leafspinenet::LeafSpineNet;

/// Trait for easier access to example networks.
pub trait ExampleNetwork {
    /// Get the topology
    fn net() -> Result<Topology, TopologyError>;
}

/// MAC address of the interface `port` on device `device`. Switches use device numbers below
/// `0x80`, and hosts use device numbers starting at `0x80`.
pub(crate) fn mac(device: u8, port: u8) -> MacAddr {
    MacAddr([0x00, 0x01, 0x00, 0x00, device, port])
}

/// Address `10.0.<net>.2/24` of the host `name`.
pub(crate) fn host_addr(name: &str, net: u8) -> Result<Ipv4Net, TopologyError> {
    Ipv4Net::new(Ipv4Addr::new(10, 0, net, 2), 24).map_err(|_| TopologyError::InvalidIpAddr {
        node: name.to_string(),
        addr: format!("10.0.{}.2/24", net),
    })
}
