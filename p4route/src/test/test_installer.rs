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

//! Test the computation of the forwarding rules.

use crate::config::{InstallerConfig, TableNames};
use crate::ecmp::GroupId;
use crate::example_networks::{mac, DiamondNet, ExampleNetwork, LeafSpineNet, LineNet};
use crate::installer::{gateway_address, RouteInstaller, RoutingPlan};
use crate::printer;
use crate::rules::{ForwardingRule, ForwardingRule::*, TableEntry};
use crate::topology::{Topology, TopologyError};
use crate::Error;
use ipnet::Ipv4Net;
use lazy_static::lazy_static;
use maplit::hashmap;
use std::collections::HashMap;
use std::net::Ipv4Addr;

lazy_static! {
    static ref SEQUENTIAL: InstallerConfig =
        InstallerConfig { threads: Some(1), ..Default::default() };
}

fn net(s: &str) -> Ipv4Net {
    s.parse().unwrap()
}

fn addr(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

fn plan(t: &Topology) -> RoutingPlan {
    RouteInstaller::new(t, SEQUENTIAL.clone()).plan().unwrap()
}

fn rules<'a>(plan: &'a RoutingPlan, switch: &str) -> &'a [ForwardingRule] {
    &plan.get(switch).unwrap().rules
}

#[test]
fn test_gateway_address() {
    assert_eq!(gateway_address(net("10.0.1.0/24"), 2).unwrap(), addr("10.0.1.2"));
    assert_eq!(gateway_address(net("10.0.1.7/24"), 2).unwrap(), addr("10.0.1.2"));
    assert_eq!(gateway_address(net("10.0.1.4/30"), 2).unwrap(), addr("10.0.1.6"));
    assert!(matches!(
        gateway_address(net("10.0.1.0/31"), 2),
        Err(TopologyError::GatewayOutOfRange { offset: 2, .. })
    ));
    assert!(gateway_address(net("255.255.255.255/32"), 1).is_err());
}

#[test]
fn test_line() {
    let p = plan(&LineNet::net().unwrap());

    assert_eq!(
        rules(&p, "s1"),
        &[Direct { subnet: net("10.0.3.0/24"), next_hop: mac(2, 1), port: 1 }]
    );
    assert_eq!(
        rules(&p, "s2"),
        &[Direct { subnet: net("10.0.3.0/24"), next_hop: mac(3, 2), port: 2 }]
    );
    assert_eq!(
        rules(&p, "s3"),
        &[Direct { subnet: net("10.0.3.2/32"), next_hop: mac(0x83, 0), port: 1 }]
    );
    assert!(p.switches.iter().flat_map(|sp| sp.rules.iter()).all(|r| !r.is_ecmp()));
    assert_eq!(p.groups.num_groups(), 0);
}

#[test]
fn test_diamond() {
    let p = plan(&DiamondNet::net().unwrap());

    assert_eq!(
        rules(&p, "s1"),
        &[
            Direct { subnet: net("10.0.1.2/32"), next_hop: mac(0x81, 0), port: 1 },
            EcmpMember { group: GroupId(1), member_index: 0, next_hop: mac(2, 1), port: 2 },
            EcmpMember { group: GroupId(1), member_index: 1, next_hop: mac(3, 1), port: 3 },
            EcmpReference { subnet: net("10.0.3.0/24"), group: GroupId(1), group_size: 2 },
        ]
    );
    assert_eq!(
        rules(&p, "s2a"),
        &[
            Direct { subnet: net("10.0.1.0/24"), next_hop: mac(1, 2), port: 1 },
            Direct { subnet: net("10.0.3.0/24"), next_hop: mac(4, 2), port: 2 },
        ]
    );
    assert_eq!(
        rules(&p, "s2b"),
        &[
            Direct { subnet: net("10.0.1.0/24"), next_hop: mac(1, 3), port: 1 },
            Direct { subnet: net("10.0.3.0/24"), next_hop: mac(4, 3), port: 2 },
        ]
    );
    assert_eq!(
        rules(&p, "s3"),
        &[
            EcmpMember { group: GroupId(1), member_index: 0, next_hop: mac(2, 2), port: 2 },
            EcmpMember { group: GroupId(1), member_index: 1, next_hop: mac(3, 2), port: 3 },
            EcmpReference { subnet: net("10.0.1.0/24"), group: GroupId(1), group_size: 2 },
            Direct { subnet: net("10.0.3.2/32"), next_hop: mac(0x83, 0), port: 1 },
        ]
    );

    let s1 = p.get("s1").unwrap().switch;
    assert_eq!(p.groups.get(s1).map(|t| t.len()), Some(1));
    assert_eq!(p.num_rules(), 12);
}

#[test]
fn test_leaf_spine() {
    let p = plan(&LeafSpineNet::net().unwrap());

    let num_rules: HashMap<&str, usize> =
        p.switches.iter().map(|sp| (sp.name.as_str(), sp.rules.len())).collect();
    assert_eq!(num_rules, hashmap! {"sp1" => 3, "sp2" => 3, "l1" => 5, "l2" => 5, "l3" => 5});

    // the same ports are used towards both other leaves, so the group is shared
    assert_eq!(
        rules(&p, "l1"),
        &[
            Direct { subnet: net("10.0.1.2/32"), next_hop: mac(0x81, 0), port: 1 },
            EcmpMember { group: GroupId(1), member_index: 0, next_hop: mac(1, 1), port: 2 },
            EcmpMember { group: GroupId(1), member_index: 1, next_hop: mac(2, 1), port: 3 },
            EcmpReference { subnet: net("10.0.2.0/24"), group: GroupId(1), group_size: 2 },
            EcmpReference { subnet: net("10.0.3.0/24"), group: GroupId(1), group_size: 2 },
        ]
    );
    assert_eq!(
        rules(&p, "sp2"),
        &[
            Direct { subnet: net("10.0.1.0/24"), next_hop: mac(3, 3), port: 1 },
            Direct { subnet: net("10.0.2.0/24"), next_hop: mac(4, 3), port: 2 },
            Direct { subnet: net("10.0.3.0/24"), next_hop: mac(5, 3), port: 3 },
        ]
    );
    assert_eq!(p.groups.num_groups(), 3);

    // member rules are only emitted for new groups
    for sp in p.switches.iter() {
        let members = sp.rules.iter().filter(|r| matches!(r, EcmpMember { .. })).count();
        let groups = p.groups.get(sp.switch).map(|t| t.len()).unwrap_or(0);
        assert_eq!(members, 2 * groups);
    }
}

#[test]
fn test_same_first_hop() {
    // two shortest paths from s1 to s4, both via s2
    let mut t = Topology::new();
    let s1 = t.add_switch("s1").unwrap();
    let s2 = t.add_switch("s2").unwrap();
    let s3a = t.add_switch("s3a").unwrap();
    let s3b = t.add_switch("s3b").unwrap();
    let s4 = t.add_switch("s4").unwrap();
    let h4 = t.add_host("h4", net("10.0.4.2/24")).unwrap();
    t.add_link((s1, 1, mac(1, 1)), (s2, 1, mac(2, 1))).unwrap();
    t.add_link((s2, 2, mac(2, 2)), (s3a, 1, mac(3, 1))).unwrap();
    t.add_link((s2, 3, mac(2, 3)), (s3b, 1, mac(4, 1))).unwrap();
    t.add_link((s3a, 2, mac(3, 2)), (s4, 1, mac(5, 1))).unwrap();
    t.add_link((s3b, 2, mac(4, 2)), (s4, 2, mac(5, 2))).unwrap();
    t.add_link((s4, 3, mac(5, 3)), (h4, 0, mac(0x84, 0))).unwrap();

    assert_eq!(t.shortest_paths(s1, s4).unwrap().len(), 2);

    let p = plan(&t);
    assert_eq!(
        rules(&p, "s1"),
        &[Direct { subnet: net("10.0.4.0/24"), next_hop: mac(2, 1), port: 1 }]
    );
    assert_eq!(p.groups.get(s1).map(|t| t.len()), Some(0));
    // s2 splits the traffic
    assert_eq!(
        rules(&p, "s2"),
        &[
            EcmpMember { group: GroupId(1), member_index: 0, next_hop: mac(3, 1), port: 2 },
            EcmpMember { group: GroupId(1), member_index: 1, next_hop: mac(4, 1), port: 3 },
            EcmpReference { subnet: net("10.0.4.0/24"), group: GroupId(1), group_size: 2 },
        ]
    );
}

#[test]
fn test_partially_shared_first_hop() {
    // three shortest paths from s1 to s5, two of them via s2
    let mut t = Topology::new();
    let s1 = t.add_switch("s1").unwrap();
    let s2 = t.add_switch("s2").unwrap();
    let s3 = t.add_switch("s3").unwrap();
    let s4a = t.add_switch("s4a").unwrap();
    let s4b = t.add_switch("s4b").unwrap();
    let s4c = t.add_switch("s4c").unwrap();
    let s5 = t.add_switch("s5").unwrap();
    let h5 = t.add_host("h5", net("10.0.5.2/24")).unwrap();
    t.add_link((s1, 1, mac(1, 1)), (s2, 1, mac(2, 1))).unwrap();
    t.add_link((s1, 2, mac(1, 2)), (s3, 1, mac(3, 1))).unwrap();
    t.add_link((s2, 2, mac(2, 2)), (s4a, 1, mac(4, 1))).unwrap();
    t.add_link((s2, 3, mac(2, 3)), (s4b, 1, mac(5, 1))).unwrap();
    t.add_link((s3, 2, mac(3, 2)), (s4c, 1, mac(6, 1))).unwrap();
    t.add_link((s4a, 2, mac(4, 2)), (s5, 1, mac(7, 1))).unwrap();
    t.add_link((s4b, 2, mac(5, 2)), (s5, 2, mac(7, 2))).unwrap();
    t.add_link((s4c, 2, mac(6, 2)), (s5, 3, mac(7, 3))).unwrap();
    t.add_link((s5, 4, mac(7, 4)), (h5, 0, mac(0x85, 0))).unwrap();

    let p = plan(&t);
    assert_eq!(
        rules(&p, "s1"),
        &[
            EcmpMember { group: GroupId(1), member_index: 0, next_hop: mac(2, 1), port: 1 },
            EcmpMember { group: GroupId(1), member_index: 1, next_hop: mac(2, 1), port: 1 },
            EcmpMember { group: GroupId(1), member_index: 2, next_hop: mac(3, 1), port: 2 },
            EcmpReference { subnet: net("10.0.5.0/24"), group: GroupId(1), group_size: 3 },
        ]
    );
    let groups = p.groups.get(s1).unwrap();
    let keys: Vec<String> = groups.iter().map(|(_, k)| k.to_string()).collect();
    assert_eq!(keys, vec!["1,1,2"]);
}

#[test]
fn test_unreachable() {
    let mut t = Topology::new();
    let s1 = t.add_switch("s1").unwrap();
    let s2 = t.add_switch("s2").unwrap();
    let h2 = t.add_host("h2", net("10.0.2.2/24")).unwrap();
    t.add_link((s2, 1, mac(2, 1)), (h2, 0, mac(0x82, 0))).unwrap();

    let p = plan(&t);
    assert!(rules(&p, "s1").is_empty());
    assert_eq!(
        rules(&p, "s2"),
        &[Direct { subnet: net("10.0.2.2/32"), next_hop: mac(0x82, 0), port: 1 }]
    );
    assert_eq!(p.get("s1").unwrap().switch, s1);
    assert_eq!(p.get("s2").unwrap().switch, s2);
}

#[test]
fn test_no_host_at_gateway() {
    let mut t = Topology::new();
    let s1 = t.add_switch("s1").unwrap();
    let h1 = t.add_host("h1", net("10.0.1.7/24")).unwrap();
    t.add_link((s1, 1, mac(1, 1)), (h1, 0, mac(0x81, 0))).unwrap();

    let result = RouteInstaller::new(&t, SEQUENTIAL.clone()).plan();
    assert!(matches!(
        result,
        Err(Error::TopologyInconsistent(TopologyError::NoHostForGateway { .. }))
    ));

    let config = InstallerConfig { host_offset: 7, ..SEQUENTIAL.clone() };
    let p = RouteInstaller::new(&t, config).plan().unwrap();
    assert_eq!(
        rules(&p, "s1"),
        &[Direct { subnet: net("10.0.1.7/32"), next_hop: mac(0x81, 0), port: 1 }]
    );
}

#[test]
fn test_parallel_equals_sequential() {
    let nets =
        vec![LineNet::net().unwrap(), DiamondNet::net().unwrap(), LeafSpineNet::net().unwrap()];
    for t in nets.iter() {
        let seq = plan(t);
        for threads in 2..=4 {
            let config = InstallerConfig { threads: Some(threads), ..Default::default() };
            let par = RouteInstaller::new(t, config).plan().unwrap();
            assert_eq!(seq.switches, par.switches);
            for sw in t.switches() {
                assert_eq!(seq.groups.get(*sw), par.groups.get(*sw));
            }
        }
    }
}

#[test]
fn test_table_entries() {
    let tables = TableNames::default();
    let p = plan(&DiamondNet::net().unwrap());
    let entries: Vec<TableEntry> = rules(&p, "s1").iter().map(|r| r.to_entry(&tables)).collect();

    assert_eq!(
        entries[0],
        TableEntry {
            table: "ipv4_lpm".to_string(),
            action: "set_nhop".to_string(),
            match_fields: vec!["10.0.1.2/32".to_string()],
            action_params: vec!["00:01:00:00:81:00".to_string(), "1".to_string()],
        }
    );
    assert_eq!(entries[1].key(), "1 0");
    assert_eq!(
        entries.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
        vec![
            "table_add ipv4_lpm set_nhop 10.0.1.2/32 => 00:01:00:00:81:00 1",
            "table_add ecmp_group_to_nhop set_nhop 1 0 => 00:01:00:00:02:01 2",
            "table_add ecmp_group_to_nhop set_nhop 1 1 => 00:01:00:00:03:01 3",
            "table_add ipv4_lpm ecmp_group 10.0.3.0/24 => 1 2",
        ]
    );
}

#[test]
fn test_printer() {
    let tables = TableNames::default();
    let p = plan(&DiamondNet::net().unwrap());
    let lines = printer::plan(&p, &tables);

    assert_eq!(lines[0], "s1 (4 rules)");
    assert_eq!(lines[1], "  group 1: ports [2,3]");
    assert!(lines[2].starts_with("  table_add ipv4_lpm set_nhop 10.0.1.2/32"));
    assert_eq!(lines.len(), 4 + 2 + 12);
}

#[test]
fn test_config_from_json() {
    let config =
        InstallerConfig::from_json_str(r#"{ "host_offset": 1, "tables": { "lpm_table": "lpm" } }"#)
            .unwrap();
    assert_eq!(config.host_offset, 1);
    assert_eq!(config.tables.lpm_table, "lpm");
    assert_eq!(config.tables.group_table, "ecmp_group_to_nhop");
    assert_eq!(config.max_attempts, 3);
    assert_eq!(config.call_timeout(), None);
    assert!(config.num_threads() >= 1);
    assert!(InstallerConfig::from_json_str(r#"{ "host_offset": "two" }"#).is_err());
}
