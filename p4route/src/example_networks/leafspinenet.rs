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

//! # Leaf-Spine Network

use super::{host_addr, mac, ExampleNetwork};
use crate::topology::{Topology, TopologyError};

/// # LeafSpineNet
///
/// Two spines `sp1` and `sp2`, and three leaves `l1`, `l2` and `l3`. Every leaf is connected to
/// both spines, and has a single host attached (`h<i>` with address `10.0.<i>.2/24`). Every leaf
/// uses port 1 towards its host, port 2 towards `sp1` and port 3 towards `sp2`. Spine port `i`
/// leads to leaf `l<i>`.
///
/// Every leaf reaches both other leaves over the same two ports, so it needs a single ECMP group.
#[derive(Debug)]
pub struct LeafSpineNet {}

impl ExampleNetwork for LeafSpineNet {
    fn net() -> Result<Topology, TopologyError> {
        let mut t = Topology::new();

        // add switches
        let sp1 = t.add_switch("sp1")?;
        let sp2 = t.add_switch("sp2")?;
        let mut leaves = Vec::new();
        for i in 1..=3u8 {
            leaves.push((i, t.add_switch(format!("l{}", i))?));
        }

        for (i, leaf) in leaves {
            let name = format!("h{}", i);
            let host = t.add_host(name.clone(), host_addr(&name, i)?)?;
            let dev = 2 + i;
            t.add_link((leaf, 1, mac(dev, 1)), (host, 0, mac(0x80 + i, 0)))?;
            t.add_link((leaf, 2, mac(dev, 2)), (sp1, i as u32, mac(1, i)))?;
            t.add_link((leaf, 3, mac(dev, 3)), (sp2, i as u32, mac(2, i)))?;
        }

        Ok(t)
    }
}
