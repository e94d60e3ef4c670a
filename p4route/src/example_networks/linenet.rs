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

//! # Line Network

use super::{host_addr, mac, ExampleNetwork};
use crate::topology::{Topology, TopologyError};

/// # LineNet
///
/// Three switches in a line, with a single host attached to the last one.
///
/// ```text
/// s1 --- s2 --- s3 --- h3 (10.0.3.2/24)
/// ```
///
/// | Switch | Port 1 | Port 2 |
/// |--------|--------|--------|
/// | s1     | s2     |        |
/// | s2     | s1     | s3     |
/// | s3     | h3     | s2     |
#[derive(Debug)]
pub struct LineNet {}

impl ExampleNetwork for LineNet {
    fn net() -> Result<Topology, TopologyError> {
        let mut t = Topology::new();

        // add switches
        let s1 = t.add_switch("s1")?;
        let s2 = t.add_switch("s2")?;
        let s3 = t.add_switch("s3")?;

        // add hosts
        let h3 = t.add_host("h3", host_addr("h3", 3)?)?;

        // add links
        t.add_link((s1, 1, mac(1, 1)), (s2, 1, mac(2, 1)))?;
        t.add_link((s2, 2, mac(2, 2)), (s3, 2, mac(3, 2)))?;
        t.add_link((s3, 1, mac(3, 1)), (h3, 0, mac(0x83, 0)))?;

        Ok(t)
    }
}
