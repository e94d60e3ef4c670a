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

//! Test loading topologies from JSON files.

use crate::example_networks::{DiamondNet, ExampleNetwork};
use crate::topology::{Topology, TopologyError};
use crate::{InstallerConfig, RouteInstaller};
use lazy_static::lazy_static;
use std::io::Write;

lazy_static! {
    static ref DIAMOND_JSON: String = String::from(
        r#"{
  "directed": false,
  "multigraph": false,
  "nodes": [
    { "id": "s1", "isP4Switch": true, "thrift_port": 9090 },
    { "id": "s2a", "isP4Switch": true },
    { "id": "s2b", "isSwitch": true },
    { "id": "s3", "isP4Switch": true },
    { "id": "h1", "isHost": true, "ip": "10.0.1.2/24" },
    { "id": "h3", "isHost": true, "ip": "10.0.3.2/24" }
  ],
  "links": [
    { "node1": "s1", "node2": "h1", "port1": 1, "port2": 0,
      "addr1": "00:01:00:00:01:01", "addr2": "00:01:00:00:81:00" },
    { "node1": "s1", "node2": "s2a", "port1": 2, "port2": 1,
      "addr1": "00:01:00:00:01:02", "addr2": "00:01:00:00:02:01" },
    { "node1": "s1", "node2": "s2b", "port1": 3, "port2": 1,
      "addr1": "00:01:00:00:01:03", "addr2": "00:01:00:00:03:01" },
    { "node1": "s3", "node2": "h3", "port1": 1, "port2": 0,
      "addr1": "00:01:00:00:04:01", "addr2": "00:01:00:00:83:00" },
    { "node1": "s3", "node2": "s2a", "port1": 2, "port2": 2,
      "addr1": "00:01:00:00:04:02", "addr2": "00:01:00:00:02:02" },
    { "node1": "s3", "node2": "s2b", "port1": 3, "port2": 2,
      "addr1": "00:01:00:00:04:03", "addr2": "00:01:00:00:03:02", "weight": 1 }
  ]
}"#
    );
}

fn sequential() -> InstallerConfig {
    InstallerConfig { threads: Some(1), ..Default::default() }
}

#[test]
fn test_parse_diamond() {
    let parsed = Topology::from_json_str(&DIAMOND_JSON).unwrap();
    let built = DiamondNet::net().unwrap();

    assert_eq!(parsed.switches(), built.switches());
    assert_eq!(parsed.hosts(), built.hosts());
    for node in parsed.switches().iter().chain(parsed.hosts().iter()) {
        assert_eq!(parsed.get_node_name(*node).unwrap(), built.get_node_name(*node).unwrap());
        assert_eq!(parsed.interfaces(*node).unwrap(), built.interfaces(*node).unwrap());
    }

    let a = RouteInstaller::new(&parsed, sequential()).plan().unwrap();
    let b = RouteInstaller::new(&built, sequential()).plan().unwrap();
    assert_eq!(a.switches, b.switches);
}

#[test]
fn test_parse_file() {
    let path = std::env::temp_dir().join(format!("p4route-diamond-{}.json", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(DIAMOND_JSON.as_bytes()).unwrap();
    drop(file);

    let t = Topology::from_json_file(&path).unwrap();
    assert_eq!(t.switches().len(), 4);
    std::fs::remove_file(&path).unwrap();

    assert!(matches!(Topology::from_json_file(&path), Err(TopologyError::Io(_))));
}

#[test]
fn test_parse_errors() {
    assert!(matches!(Topology::from_json_str("{ \"nodes\": ["), Err(TopologyError::Json(_))));
    assert!(matches!(Topology::from_json_str("{ \"nodes\": [] }"), Err(TopologyError::Json(_))));

    let unknown_kind = r#"{ "nodes": [ { "id": "x1" } ], "links": [] }"#;
    assert!(matches!(
        Topology::from_json_str(unknown_kind),
        Err(TopologyError::UnknownNodeKind(n)) if n == "x1"
    ));

    let missing_ip = r#"{ "nodes": [ { "id": "h1", "isHost": true } ], "links": [] }"#;
    assert!(matches!(
        Topology::from_json_str(missing_ip),
        Err(TopologyError::MissingField { field: "ip", .. })
    ));

    let bad_ip = r#"{ "nodes": [ { "id": "h1", "isHost": true, "ip": "10.0.1.300/24" } ],
                      "links": [] }"#;
    assert!(matches!(
        Topology::from_json_str(bad_ip),
        Err(TopologyError::InvalidIpAddr { node, .. }) if node == "h1"
    ));

    let bad_mac = r#"{
        "nodes": [ { "id": "s1", "isSwitch": true }, { "id": "s2", "isSwitch": true } ],
        "links": [ { "node1": "s1", "node2": "s2", "port1": 1, "port2": 1,
                     "addr1": "00:01:00:00:01", "addr2": "00:01:00:00:02:01" } ]
    }"#;
    assert!(matches!(Topology::from_json_str(bad_mac), Err(TopologyError::InvalidMacAddr(_))));

    let unknown_node = r#"{
        "nodes": [ { "id": "s1", "isSwitch": true } ],
        "links": [ { "node1": "s1", "node2": "s2", "port1": 1, "port2": 1,
                     "addr1": "00:01:00:00:01:01", "addr2": "00:01:00:00:02:01" } ]
    }"#;
    assert!(matches!(
        Topology::from_json_str(unknown_node),
        Err(TopologyError::DeviceNameNotFound(n)) if n == "s2"
    ));
}
