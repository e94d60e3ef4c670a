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

//! # Route Installer
//!
//! The route installer computes the forwarding rules of every switch, and pushes them onto the
//! control endpoints of the switches. This happens in two phases:
//!
//! 1. **Planning**: For every ordered pair of switches `(sw1, sw2)`, compute the rules required
//!    on `sw1` to reach the hosts attached to `sw2`. If `sw1 == sw2`, every attached host gets a
//!    `/32` rule. If there is a single shortest path, every subnet attached to `sw2` is forwarded
//!    directly to the next hop. Otherwise, the paths are resolved to an ECMP group, and the
//!    subnets reference this group. Planning fails as a whole, before anything is installed.
//! 2. **Installation**: On every switch, both tables are cleared, their default action is set to
//!    drop, and all planned rules are added in order. Failures are isolated per switch.
//!
//! Both phases distribute the switches on multiple threads. Every switch (including its ECMP
//! group table and its control endpoint) is only ever handled by a single thread.
//!
//! ## Example usage
//!
//! ```rust
//! use p4route::control::{MemorySwitch, SwitchControl};
//! use p4route::example_networks::{DiamondNet, ExampleNetwork};
//! use p4route::{InstallerConfig, RouteInstaller};
//! use std::collections::HashMap;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let topo = DiamondNet::net()?;
//!     let installer = RouteInstaller::new(&topo, InstallerConfig::default());
//!
//!     let plan = installer.plan()?;
//!     assert_eq!(plan.get("s1").map(|p| p.rules.len()), Some(4));
//!
//!     let mut endpoints: HashMap<String, Box<dyn SwitchControl>> = HashMap::new();
//!     for sp in plan.switches.iter() {
//!         endpoints.insert(sp.name.clone(), Box::new(MemorySwitch::new(sp.name.clone())));
//!     }
//!     let report = installer.install(&plan, &mut endpoints)?;
//!     assert!(report.failures.is_empty());
//!
//!     Ok(())
//! }
//! ```

use crate::config::InstallerConfig;
use crate::control::{ControlError, SwitchControl};
use crate::ecmp::{AllocatorState, EcmpGroupTable};
use crate::rules::{ForwardingRule, TableEntry};
use crate::topology::{NodeId, Topology, TopologyError};
use crate::Error;

use ipnet::Ipv4Net;
use itertools::Itertools;
use log::*;
use serde::Serialize;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::thread;

/// Rules computed for a single switch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwitchPlan {
    /// Node of the switch
    #[serde(skip)]
    pub switch: NodeId,
    /// Name of the switch
    pub name: String,
    /// Rules to install, in order
    pub rules: Vec<ForwardingRule>,
}

/// Result of the planning phase: The rules of all switches, and their ECMP group tables.
#[derive(Debug, Clone)]
pub struct RoutingPlan {
    /// Rules of every switch, in the order of [`Topology::switches`].
    pub switches: Vec<SwitchPlan>,
    /// Group tables of all switches
    pub groups: AllocatorState,
}

impl RoutingPlan {
    /// Get the plan of a switch by its name
    pub fn get(&self, name: &str) -> Option<&SwitchPlan> {
        self.switches.iter().find(|sp| sp.name == name)
    }

    /// Total number of rules on all switches
    pub fn num_rules(&self) -> usize {
        self.switches.iter().map(|sp| sp.rules.len()).sum()
    }
}

/// Switch on which the installation failed
#[derive(Debug)]
pub struct SwitchFailure {
    /// Name of the switch
    pub switch: String,
    /// Reason of the failure
    pub error: Error,
}

/// Result of the installation phase
#[derive(Debug, Default)]
pub struct InstallReport {
    /// Switches on which all rules were installed, together with the number of rules.
    pub installed: Vec<(String, usize)>,
    /// Switches on which the installation failed.
    pub failures: Vec<SwitchFailure>,
}

impl InstallReport {
    /// Returns true if every switch was installed successfully.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total number of installed rules
    pub fn num_rules(&self) -> usize {
        self.installed.iter().map(|(_, n)| n).sum()
    }
}

/// Computes and installs the forwarding rules of all switches in a topology.
#[derive(Debug)]
pub struct RouteInstaller<'a> {
    topo: &'a Topology,
    config: InstallerConfig,
}

impl<'a> RouteInstaller<'a> {
    /// Create a new installer for the given topology.
    pub fn new(topo: &'a Topology, config: InstallerConfig) -> Self {
        Self { topo, config }
    }

    /// Returns the configuration
    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// Number of threads to use for `n` jobs
    fn num_workers(&self, n: usize) -> usize {
        self.config.num_threads().min(n).max(1)
    }

    /// Compute the rules of all switches. Switches are distributed over the configured number of
    /// worker threads. The result does not depend on the number of threads.
    pub fn plan(&self) -> Result<RoutingPlan, Error> {
        let switches = self.topo.switches();
        let n_workers = self.num_workers(switches.len());
        info!("Computing the rules of {} switches on {} threads", switches.len(), n_workers);

        let mut groups = AllocatorState::new();
        let mut jobs: Vec<Vec<(usize, NodeId, EcmpGroupTable)>> =
            (0..n_workers).map(|_| Vec::new()).collect();
        for (i, sw) in switches.iter().enumerate() {
            jobs[i % n_workers].push((i, *sw, groups.take(*sw)));
        }

        let results = thread::scope(|s| {
            let handles = jobs
                .into_iter()
                .map(|job| {
                    s.spawn(move || {
                        job.into_iter()
                            .map(|(i, sw, mut table)| {
                                let rules = self.plan_switch(sw, &mut table);
                                (i, sw, table, rules)
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .sorted_by_key(|(i, _, _, _)| *i)
                .collect::<Vec<_>>()
        });

        let mut plan = Vec::with_capacity(results.len());
        for (_, sw, table, rules) in results {
            let rules = rules?;
            groups.insert(sw, table);
            let name = self.topo.get_node_name(sw)?.to_string();
            plan.push(SwitchPlan { switch: sw, name, rules });
        }

        let plan = RoutingPlan { switches: plan, groups };
        info!("Computed {} rules and {} ECMP groups", plan.num_rules(), plan.groups.num_groups());
        Ok(plan)
    }

    /// Compute the rules of a single switch `sw1` towards all switches, using (and extending) the
    /// ECMP group table of that switch.
    pub fn plan_switch(
        &self,
        sw1: NodeId,
        groups: &mut EcmpGroupTable,
    ) -> Result<Vec<ForwardingRule>, Error> {
        if !self.topo.is_switch(sw1) {
            return Err(TopologyError::NotASwitch(self.topo.name_or_id(sw1)).into());
        }
        let mut rules = Vec::new();
        for sw2 in self.topo.switches().iter().copied() {
            self.plan_pair(sw1, sw2, groups, &mut rules).map_err(|e| {
                error!(
                    "Cannot compute the rules of {} towards {}: {}",
                    self.topo.name_or_id(sw1),
                    self.topo.name_or_id(sw2),
                    e
                );
                e
            })?;
        }
        debug!("{}: {} rules", self.topo.name_or_id(sw1), rules.len());
        Ok(rules)
    }

    fn plan_pair(
        &self,
        sw1: NodeId,
        sw2: NodeId,
        groups: &mut EcmpGroupTable,
        rules: &mut Vec<ForwardingRule>,
    ) -> Result<(), Error> {
        if sw1 == sw2 {
            return self.add_attached_hosts(sw1, rules);
        }

        let subnets = self.topo.direct_host_subnets(sw2)?;
        if subnets.is_empty() {
            return Ok(());
        }

        let paths = self.topo.shortest_paths(sw1, sw2)?;
        let first_hops = paths
            .iter()
            .map(|p| {
                p.first_hop().ok_or_else(|| {
                    TopologyError::NotConnected(
                        self.topo.name_or_id(sw1),
                        self.topo.name_or_id(sw2),
                    )
                })
            })
            .collect::<Result<Vec<NodeId>, _>>()?;

        match first_hops.iter().unique().count() {
            0 => {
                debug!(
                    "{} cannot reach {}",
                    self.topo.name_or_id(sw1),
                    self.topo.name_or_id(sw2)
                );
                Ok(())
            }
            // a single path, or multiple paths through the same neighbor
            1 => self.add_single_path(sw1, first_hops[0], &subnets, rules),
            _ => self.add_ecmp(sw1, &first_hops, &subnets, groups, rules),
        }
    }

    /// Add a `/32` rule for every host attached to the switch.
    fn add_attached_hosts(
        &self,
        sw: NodeId,
        rules: &mut Vec<ForwardingRule>,
    ) -> Result<(), Error> {
        for subnet in self.topo.direct_host_subnets(sw)? {
            let gateway = gateway_address(subnet, self.config.host_offset)?;
            let host = self
                .topo
                .attached_host_with_address(sw, gateway)?
                .ok_or_else(|| TopologyError::NoHostForGateway {
                    switch: self.topo.name_or_id(sw),
                    subnet,
                    gateway,
                })?;
            let intf = self.topo.interface(sw, host)?;
            let rule = ForwardingRule::Direct {
                subnet: Ipv4Net::from(gateway),
                next_hop: intf.neighbor_addr,
                port: intf.port,
            };
            debug!("{}: {}", self.topo.name_or_id(sw), rule);
            rules.push(rule);
        }
        Ok(())
    }

    /// Forward all subnets directly to the next hop.
    fn add_single_path(
        &self,
        sw: NodeId,
        next_hop: NodeId,
        subnets: &[Ipv4Net],
        rules: &mut Vec<ForwardingRule>,
    ) -> Result<(), Error> {
        let intf = self.topo.interface(sw, next_hop)?;
        for subnet in subnets.iter() {
            let rule = ForwardingRule::Direct {
                subnet: *subnet,
                next_hop: intf.neighbor_addr,
                port: intf.port,
            };
            debug!("{}: {}", self.topo.name_or_id(sw), rule);
            rules.push(rule);
        }
        Ok(())
    }

    /// Resolve the group of the path set, add its members if it is new, and forward all subnets
    /// to the group.
    fn add_ecmp(
        &self,
        sw: NodeId,
        first_hops: &[NodeId],
        subnets: &[Ipv4Net],
        groups: &mut EcmpGroupTable,
        rules: &mut Vec<ForwardingRule>,
    ) -> Result<(), Error> {
        let (group, new) = groups.resolve(self.topo, sw, first_hops).map_err(|e| {
            error!(
                "Cannot resolve the ECMP group of {} for [{}] via [{}]",
                self.topo.name_or_id(sw),
                subnets.iter().join(", "),
                first_hops.iter().map(|nh| self.topo.name_or_id(*nh)).join(", ")
            );
            e
        })?;

        if new {
            for (idx, nh) in first_hops.iter().enumerate() {
                let intf = self.topo.interface(sw, *nh)?;
                rules.push(ForwardingRule::EcmpMember {
                    group,
                    member_index: idx as u32,
                    next_hop: intf.neighbor_addr,
                    port: intf.port,
                });
            }
        }

        for subnet in subnets.iter() {
            let rule = ForwardingRule::EcmpReference {
                subnet: *subnet,
                group,
                group_size: first_hops.len() as u32,
            };
            debug!("{}: {}", self.topo.name_or_id(sw), rule);
            rules.push(rule);
        }
        Ok(())
    }

    /// Install the plan onto the control endpoints, which are indexed by the switch name. On every
    /// switch, both tables are cleared and their default action is set to drop, before the rules
    /// are added in order. Transport failures are retried, and a switch on which the installation
    /// fails does not stop the other switches.
    ///
    /// If the installation failed on any switch, [`Error::InstallFailed`] is returned, which
    /// contains the full report.
    pub fn install(
        &self,
        plan: &RoutingPlan,
        endpoints: &mut HashMap<String, Box<dyn SwitchControl>>,
    ) -> Result<InstallReport, Error> {
        let n_workers = self.num_workers(plan.switches.len());
        info!("Installing {} switches on {} threads", plan.switches.len(), n_workers);

        let mut jobs: Vec<Vec<_>> = (0..n_workers).map(|_| Vec::new()).collect();
        for (i, sp) in plan.switches.iter().enumerate() {
            jobs[i % n_workers].push((i, sp, endpoints.remove(&sp.name)));
        }

        let results = thread::scope(|s| {
            let handles = jobs
                .into_iter()
                .map(|job| {
                    s.spawn(move || {
                        job.into_iter()
                            .map(|(i, sp, mut endpoint)| {
                                let result = match endpoint.as_mut() {
                                    Some(e) => self.install_switch(sp, e.as_mut()),
                                    None => Err(Error::MissingEndpoint(sp.name.clone())),
                                };
                                (i, sp, endpoint, result)
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .sorted_by_key(|(i, _, _, _)| *i)
                .collect::<Vec<_>>()
        });

        let mut report = InstallReport::default();
        for (_, sp, endpoint, result) in results {
            if let Some(e) = endpoint {
                endpoints.insert(sp.name.clone(), e);
            }
            match result {
                Ok(n) => {
                    info!("{}: installed {} rules", sp.name, n);
                    report.installed.push((sp.name.clone(), n));
                }
                Err(error) => {
                    error!("{}: installation failed: {}", sp.name, error);
                    report.failures.push(SwitchFailure { switch: sp.name.clone(), error });
                }
            }
        }

        if report.is_success() {
            Ok(report)
        } else {
            Err(Error::InstallFailed(report))
        }
    }

    /// Install the rules of a single switch. Returns the number of installed rules.
    pub fn install_switch(
        &self,
        sp: &SwitchPlan,
        endpoint: &mut dyn SwitchControl,
    ) -> Result<usize, Error> {
        let tables = &self.config.tables;
        for table in tables.all_tables().iter() {
            self.call(&sp.name, || endpoint.clear_table(table))?;
        }
        for table in tables.all_tables().iter() {
            self.call(&sp.name, || endpoint.set_default_action(table, &tables.drop, &[]))?;
        }
        for rule in sp.rules.iter() {
            let entry = rule.to_entry(tables);
            self.call(&sp.name, || {
                let TableEntry { table, action, match_fields, action_params } = &entry;
                endpoint.add_rule(table, action, match_fields, action_params)
            })?;
        }
        Ok(sp.rules.len())
    }

    /// Perform a call on the endpoint, and retry it on transient errors.
    fn call<F>(&self, switch: &str, mut f: F) -> Result<(), Error>
    where
        F: FnMut() -> Result<(), ControlError>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match f() {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!("{}: attempt {}/{} failed: {}", switch, attempt, max_attempts, e);
                    thread::sleep(self.config.retry_backoff());
                    attempt += 1;
                }
                Err(e) => return Err(Error::from_control(switch, e)),
            }
        }
    }

    /// Compute the plan and install it (see [`RouteInstaller::plan`] and
    /// [`RouteInstaller::install`]).
    pub fn run(
        &self,
        endpoints: &mut HashMap<String, Box<dyn SwitchControl>>,
    ) -> Result<(RoutingPlan, InstallReport), Error> {
        let plan = self.plan()?;
        let report = self.install(&plan, endpoints)?;
        Ok((plan, report))
    }
}

/// Address of the host inside the subnet, i.e., the network address plus `offset`.
pub fn gateway_address(subnet: Ipv4Net, offset: u32) -> Result<Ipv4Addr, TopologyError> {
    let addr = u32::from(subnet.network())
        .checked_add(offset)
        .map(Ipv4Addr::from)
        .filter(|a| subnet.contains(a))
        .ok_or(TopologyError::GatewayOutOfRange { subnet, offset })?;
    Ok(addr)
}
