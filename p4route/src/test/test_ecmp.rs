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

//! Test the ECMP group allocation.

use crate::ecmp::{AllocatorState, EcmpGroupKey, EcmpGroupTable, GroupId};
use crate::example_networks::{DiamondNet, ExampleNetwork, LeafSpineNet};
use crate::topology::TopologyError;
use crate::Error;
use maplit::hashset;
use std::collections::HashSet;

#[test]
fn test_group_key() {
    let a = EcmpGroupKey::from_ports(vec![10, 2, 1]);
    let b = EcmpGroupKey::from_ports(vec![1, 10, 2]);
    assert_eq!(a, b);
    assert_eq!(a.ports(), &[1, 2, 10]);
    assert_eq!(a.to_string(), "1,2,10");
    assert_eq!(a.len(), 3);

    // one entry per path
    let c = EcmpGroupKey::from_ports(vec![3, 2, 3]);
    assert_eq!(c.ports(), &[2, 3, 3]);
    assert_ne!(c, EcmpGroupKey::from_ports(vec![2, 3]));
}

#[test]
fn test_resolve_key() {
    let mut table = EcmpGroupTable::new();
    assert!(table.is_empty());

    assert_eq!(table.resolve_key(EcmpGroupKey::from_ports(vec![2, 3])), (GroupId(1), true));
    assert_eq!(table.resolve_key(EcmpGroupKey::from_ports(vec![3, 2])), (GroupId(1), false));
    assert_eq!(table.resolve_key(EcmpGroupKey::from_ports(vec![2, 4])), (GroupId(2), true));
    assert_eq!(table.resolve_key(EcmpGroupKey::from_ports(vec![2, 3, 4])), (GroupId(3), true));
    assert_eq!(table.resolve_key(EcmpGroupKey::from_ports(vec![4, 2])), (GroupId(2), false));

    assert_eq!(table.len(), 3);
    assert_eq!(table.get(&EcmpGroupKey::from_ports(vec![4, 3, 2])), Some(GroupId(3)));
    assert_eq!(table.get(&EcmpGroupKey::from_ports(vec![1, 2])), None);

    let ids: Vec<GroupId> = table.iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![GroupId(1), GroupId(2), GroupId(3)]);
    let keys: Vec<String> = table.iter().map(|(_, key)| key.to_string()).collect();
    assert_eq!(keys, vec!["2,3", "2,4", "2,3,4"]);
}

#[test]
fn test_resolve_path_order() {
    let t = DiamondNet::net().unwrap();
    let s1 = t.get_node_id("s1").unwrap();
    let s2a = t.get_node_id("s2a").unwrap();
    let s2b = t.get_node_id("s2b").unwrap();

    let mut table = EcmpGroupTable::new();
    assert_eq!(table.resolve(&t, s1, &[s2a, s2b]).unwrap(), (GroupId(1), true));
    assert_eq!(table.resolve(&t, s1, &[s2b, s2a]).unwrap(), (GroupId(1), false));
    assert_eq!(table.get(&EcmpGroupKey::from_ports(vec![2, 3])), Some(GroupId(1)));
}

#[test]
fn test_resolve_invalid() {
    let t = DiamondNet::net().unwrap();
    let s1 = t.get_node_id("s1").unwrap();
    let s2a = t.get_node_id("s2a").unwrap();
    let s3 = t.get_node_id("s3").unwrap();

    let mut table = EcmpGroupTable::new();
    assert!(matches!(table.resolve(&t, s1, &[]), Err(Error::InvalidArgument(_))));
    assert!(matches!(table.resolve(&t, s1, &[s2a]), Err(Error::InvalidArgument(_))));
    assert!(matches!(table.resolve(&t, s1, &[s2a, s2a]), Err(Error::InvalidArgument(_))));
    assert!(matches!(
        table.resolve(&t, s1, &[s2a, s3]),
        Err(Error::TopologyInconsistent(TopologyError::NotConnected(_, _)))
    ));
    // nothing was allocated
    assert!(table.is_empty());
}

#[test]
fn test_allocator_per_switch() {
    let t = LeafSpineNet::net().unwrap();
    let sp1 = t.get_node_id("sp1").unwrap();
    let sp2 = t.get_node_id("sp2").unwrap();
    let l1 = t.get_node_id("l1").unwrap();
    let l2 = t.get_node_id("l2").unwrap();
    let l3 = t.get_node_id("l3").unwrap();

    let mut state = AllocatorState::new();
    assert_eq!(state.resolve(&t, l1, &[sp1, sp2]).unwrap(), (GroupId(1), true));
    assert_eq!(state.resolve(&t, l2, &[sp2, sp1]).unwrap(), (GroupId(1), true));
    assert_eq!(state.resolve(&t, l1, &[sp2, sp1]).unwrap(), (GroupId(1), false));
    assert_eq!(state.resolve(&t, sp1, &[l1, l2]).unwrap(), (GroupId(1), true));
    assert_eq!(state.resolve(&t, sp1, &[l1, l3]).unwrap(), (GroupId(2), true));
    assert_eq!(state.num_groups(), 4);

    // move a table out, and back in
    let mut table = state.take(sp1);
    assert_eq!(state.num_groups(), 2);
    assert!(state.get(sp1).is_none());
    assert_eq!(table.resolve(&t, sp1, &[l2, l3]).unwrap(), (GroupId(3), true));
    state.insert(sp1, table);
    assert_eq!(state.get(sp1).map(|t| t.len()), Some(3));

    // an unknown switch starts with an empty table
    assert!(state.take(l3).is_empty());
}

#[test]
fn test_contiguous_ids() {
    let t = LeafSpineNet::net().unwrap();
    let sp1 = t.get_node_id("sp1").unwrap();
    let leaves: Vec<_> = ["l1", "l2", "l3"].iter().map(|n| t.get_node_id(n).unwrap()).collect();

    let mut table = EcmpGroupTable::new();
    let mut new_groups = 0;
    for a in leaves.iter() {
        for b in leaves.iter() {
            if a != b {
                let (_, new) = table.resolve(&t, sp1, &[*a, *b]).unwrap();
                if new {
                    new_groups += 1;
                }
            }
        }
    }
    assert_eq!(new_groups, 3);
    let ids: HashSet<GroupId> = table.iter().map(|(id, _)| id).collect();
    assert_eq!(ids, hashset![GroupId(1), GroupId(2), GroupId(3)]);
}
