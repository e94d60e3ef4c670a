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

//! Switch endpoint writing `simple_switch_CLI` commands

use super::{ControlError, SwitchControl};

use log::*;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Switch endpoint, which writes every call as a `simple_switch_CLI` command into a writer. The
/// resulting file can be piped into `simple_switch_CLI --thrift-port <port>`. Duplicate entries are
/// detected locally.
#[derive(Debug)]
pub struct CommandFileSwitch<W: Write + Send> {
    writer: W,
    keys: HashSet<(String, Vec<String>)>,
    lines: usize,
}

impl CommandFileSwitch<BufWriter<File>> {
    /// Create (or truncate) the file at the given path, and write all commands into it.
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::create(path.as_ref())?;
        debug!("Writing commands to {}", path.as_ref().display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send> CommandFileSwitch<W> {
    /// Write all commands into the given writer.
    pub fn new(writer: W) -> Self {
        Self { writer, keys: HashSet::new(), lines: 0 }
    }

    /// Number of commands written so far
    pub fn num_lines(&self) -> usize {
        self.lines
    }

    /// Return the writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, words: &[&str]) -> Result<(), ControlError> {
        writeln!(self.writer, "{}", words.join(" "))
            .and_then(|_| self.writer.flush())
            .map_err(|e| ControlError::Transport(e.to_string()))?;
        self.lines += 1;
        Ok(())
    }
}

impl<W: Write + Send> SwitchControl for CommandFileSwitch<W> {
    fn clear_table(&mut self, table: &str) -> Result<(), ControlError> {
        self.write_line(&["table_clear", table])?;
        self.keys.retain(|(t, _)| t != table);
        Ok(())
    }

    fn set_default_action(
        &mut self,
        table: &str,
        action: &str,
        params: &[String],
    ) -> Result<(), ControlError> {
        let mut words = vec!["table_set_default", table, action];
        words.extend(params.iter().map(String::as_str));
        self.write_line(&words)
    }

    fn add_rule(
        &mut self,
        table: &str,
        action: &str,
        match_fields: &[String],
        action_params: &[String],
    ) -> Result<(), ControlError> {
        let key = (table.to_string(), match_fields.to_vec());
        if self.keys.contains(&key) {
            return Err(ControlError::DuplicateRule {
                table: table.to_string(),
                key: match_fields.join(" "),
            });
        }
        let mut words = vec!["table_add", table, action];
        words.extend(match_fields.iter().map(String::as_str));
        words.push("=>");
        words.extend(action_params.iter().map(String::as_str));
        // only written entries count as installed
        self.write_line(&words)?;
        self.keys.insert(key);
        Ok(())
    }
}
