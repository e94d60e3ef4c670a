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

//! In-memory switch endpoint

use super::{ControlError, SwitchControl};
use crate::rules::TableEntry;

use log::*;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Call received by a [`MemorySwitch`], in the order in which they arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchCall {
    /// `clear_table(table)`
    Clear(String),
    /// `set_default_action(table, action, ..)`
    SetDefault(String, String),
    /// `add_rule(table, action, match_fields, ..)`
    Add(String, String, Vec<String>),
}

#[derive(Debug, Default, Clone)]
struct Table {
    default_action: Option<(String, Vec<String>)>,
    entries: Vec<TableEntry>,
    keys: HashSet<Vec<String>>,
}

/// Content of all tables of a [`MemorySwitch`]
#[derive(Debug, Default, Clone)]
pub struct SwitchTables {
    tables: HashMap<String, Table>,
    log: Vec<SwitchCall>,
}

impl SwitchTables {
    /// All entries of the table, in insertion order.
    pub fn entries(&self, table: &str) -> Vec<TableEntry> {
        self.tables.get(table).map(|t| t.entries.clone()).unwrap_or_default()
    }

    /// The default action of the table, together with its parameters.
    pub fn default_action(&self, table: &str) -> Option<(String, Vec<String>)> {
        self.tables.get(table).and_then(|t| t.default_action.clone())
    }

    /// Number of entries, summed over all tables
    pub fn num_entries(&self) -> usize {
        self.tables.values().map(|t| t.entries.len()).sum()
    }

    /// All calls received so far
    pub fn log(&self) -> &[SwitchCall] {
        &self.log
    }
}

/// Switch endpoint which keeps all tables in memory. The endpoint is a handle: all clones share
/// the same tables, which allows inspecting the tables after the endpoint was handed over to the
/// installer.
#[derive(Debug, Default, Clone)]
pub struct MemorySwitch {
    name: String,
    state: Arc<Mutex<SwitchTables>>,
}

impl MemorySwitch {
    /// Create a new endpoint with empty tables.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), state: Arc::new(Mutex::new(SwitchTables::default())) }
    }

    /// Name of the switch
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a copy of the current state of all tables.
    pub fn snapshot(&self) -> SwitchTables {
        match self.state.lock() {
            Ok(s) => s.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// All entries of the table, in insertion order.
    pub fn entries(&self, table: &str) -> Vec<TableEntry> {
        self.snapshot().entries(table)
    }

    /// The default action of the table, together with its parameters.
    pub fn default_action(&self, table: &str) -> Option<(String, Vec<String>)> {
        self.snapshot().default_action(table)
    }

    /// All calls received so far
    pub fn log(&self) -> Vec<SwitchCall> {
        self.snapshot().log
    }

    fn lock(&self) -> Result<MutexGuard<'_, SwitchTables>, ControlError> {
        self.state
            .lock()
            .map_err(|_| ControlError::Transport(format!("tables of {} are poisoned", self.name)))
    }
}

impl SwitchControl for MemorySwitch {
    fn clear_table(&mut self, table: &str) -> Result<(), ControlError> {
        let mut state = self.lock()?;
        state.log.push(SwitchCall::Clear(table.to_string()));
        let t = state.tables.entry(table.to_string()).or_default();
        t.entries.clear();
        t.keys.clear();
        Ok(())
    }

    fn set_default_action(
        &mut self,
        table: &str,
        action: &str,
        params: &[String],
    ) -> Result<(), ControlError> {
        let mut state = self.lock()?;
        state.log.push(SwitchCall::SetDefault(table.to_string(), action.to_string()));
        state.tables.entry(table.to_string()).or_default().default_action =
            Some((action.to_string(), params.to_vec()));
        Ok(())
    }

    fn add_rule(
        &mut self,
        table: &str,
        action: &str,
        match_fields: &[String],
        action_params: &[String],
    ) -> Result<(), ControlError> {
        let mut state = self.lock()?;
        let call = SwitchCall::Add(table.to_string(), action.to_string(), match_fields.to_vec());
        state.log.push(call);
        let t = state.tables.entry(table.to_string()).or_default();
        if !t.keys.insert(match_fields.to_vec()) {
            return Err(ControlError::DuplicateRule {
                table: table.to_string(),
                key: match_fields.join(" "),
            });
        }
        t.entries.push(TableEntry {
            table: table.to_string(),
            action: action.to_string(),
            match_fields: match_fields.to_vec(),
            action_params: action_params.to_vec(),
        });
        trace!("{}: {} entries in {}", self.name, t.entries.len(), table);
        Ok(())
    }
}
