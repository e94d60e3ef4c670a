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

//! # Helper (printer) functions
//! Module containing helper functions to get formatted strings of the computed rules and of the
//! installation result.

use crate::config::TableNames;
use crate::ecmp::EcmpGroupTable;
use crate::installer::{InstallReport, RoutingPlan, SwitchPlan};

/// Returns one line per rule of the switch, as `simple_switch_CLI` command.
pub fn switch_commands(sp: &SwitchPlan, tables: &TableNames) -> Vec<String> {
    sp.rules.iter().map(|r| r.to_entry(tables).to_string()).collect()
}

/// Returns one line per group of the table, with its id and its egress ports.
pub fn group_table(table: &EcmpGroupTable) -> Vec<String> {
    table.iter().map(|(id, key)| format!("group {}: ports [{}]", id, key)).collect()
}

/// Returns the formatted plan, grouped by switch. Every switch starts with a header line,
/// followed by its groups and its rules, each indented.
pub fn plan(plan: &RoutingPlan, tables: &TableNames) -> Vec<String> {
    let mut result = Vec::new();
    for sp in plan.switches.iter() {
        result.push(format!("{} ({} rules)", sp.name, sp.rules.len()));
        if let Some(groups) = plan.groups.get(sp.switch) {
            result.extend(group_table(groups).into_iter().map(|l| format!("  {}", l)));
        }
        for (rule, cmd) in sp.rules.iter().zip(switch_commands(sp, tables)) {
            result.push(format!("  {:<40} # {}", cmd, rule));
        }
    }
    result
}

/// Returns the formatted installation report.
pub fn install_report(report: &InstallReport) -> Vec<String> {
    let mut result: Vec<String> = report
        .installed
        .iter()
        .map(|(sw, n)| format!("{}: installed {} rules", sw, n))
        .collect();
    result.extend(report.failures.iter().map(|f| format!("{}: FAILED: {}", f.switch, f.error)));
    result
}
