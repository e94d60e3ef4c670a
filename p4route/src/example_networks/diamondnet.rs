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

//! # Diamond Network

use super::{host_addr, mac, ExampleNetwork};
use crate::topology::{Topology, TopologyError};

/// # DiamondNet
///
/// Two equal-cost paths between `s1` and `s3`, one via `s2a` and one via `s2b`.
///
/// ```text
///                       .-- s2a --.
/// (10.0.1.2/24) h1 --- s1          s3 --- h3 (10.0.3.2/24)
///                       '-- s2b --'
/// ```
///
/// | Switch | Port 1 | Port 2 | Port 3 |
/// |--------|--------|--------|--------|
/// | s1     | h1     | s2a    | s2b    |
/// | s2a    | s1     | s3     |        |
/// | s2b    | s1     | s3     |        |
/// | s3     | h3     | s2a    | s2b    |
#[derive(Debug)]
pub struct DiamondNet {}

impl ExampleNetwork for DiamondNet {
    fn net() -> Result<Topology, TopologyError> {
        let mut t = Topology::new();

        // add switches
        let s1 = t.add_switch("s1")?;
        let s2a = t.add_switch("s2a")?;
        let s2b = t.add_switch("s2b")?;
        let s3 = t.add_switch("s3")?;

        // add hosts
        let h1 = t.add_host("h1", host_addr("h1", 1)?)?;
        let h3 = t.add_host("h3", host_addr("h3", 3)?)?;

        // add links
        t.add_link((s1, 1, mac(1, 1)), (h1, 0, mac(0x81, 0)))?;
        t.add_link((s1, 2, mac(1, 2)), (s2a, 1, mac(2, 1)))?;
        t.add_link((s1, 3, mac(1, 3)), (s2b, 1, mac(3, 1)))?;
        t.add_link((s3, 1, mac(4, 1)), (h3, 0, mac(0x83, 0)))?;
        t.add_link((s3, 2, mac(4, 2)), (s2a, 2, mac(2, 2)))?;
        t.add_link((s3, 3, mac(4, 3)), (s2b, 2, mac(3, 2)))?;

        Ok(t)
    }
}
