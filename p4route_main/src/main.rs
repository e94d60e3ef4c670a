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

use p4route::control::{CommandFileSwitch, SwitchControl, TimedSwitch};
use p4route::ecmp::{EcmpGroupKey, GroupId};
use p4route::installer::RoutingPlan;
use p4route::printer;
use p4route::rules::ForwardingRule;
use p4route::topology::Topology;
use p4route::{InstallerConfig, RouteInstaller};

use clap::{Parser, Subcommand};
use log::*;
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

mod example_topologies;
use example_topologies::*;

fn main() -> Result<(), Box<dyn Error>> {
    // run clap
    let args = CommandLineArguments::parse();

    // initialize the env logger
    if args.verbose && std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();

    let mut config = match args.config.as_ref() {
        Some(file) => InstallerConfig::from_json_str(&fs::read_to_string(file)?)?,
        None => InstallerConfig::default(),
    };
    if args.threads.is_some() {
        config.threads = args.threads;
    }

    // match on the action
    match args.cmd {
        MainCommand::Plan { topology, json } => {
            let topo = Topology::from_json_file(&topology)?;
            let plan = RouteInstaller::new(&topo, config.clone()).plan()?;
            print_plan(&plan, &config);
            if let Some(json) = json {
                dump_plan(&plan, &json)?;
            }
        }
        MainCommand::Install { topology, out_dir } => {
            let topo = Topology::from_json_file(&topology)?;
            install(&topo, config, &out_dir)?;
        }
        MainCommand::Example { network } => {
            info!("Computing the rules of {}", network);
            let topo = get_topo(network)?;
            let plan = RouteInstaller::new(&topo, config.clone()).plan()?;
            print_plan(&plan, &config);
        }
    }

    Ok(())
}

fn print_plan(plan: &RoutingPlan, config: &InstallerConfig) {
    for line in printer::plan(plan, &config.tables) {
        println!("{}", line);
    }
}

#[derive(Serialize)]
struct GroupDump<'a> {
    id: GroupId,
    ports: &'a EcmpGroupKey,
}

#[derive(Serialize)]
struct SwitchDump<'a> {
    name: &'a str,
    groups: Vec<GroupDump<'a>>,
    rules: &'a [ForwardingRule],
}

/// Write the plan as JSON into the file.
fn dump_plan(plan: &RoutingPlan, filename: &Path) -> Result<(), Box<dyn Error>> {
    let dump: Vec<SwitchDump> = plan
        .switches
        .iter()
        .map(|sp| SwitchDump {
            name: &sp.name,
            groups: plan
                .groups
                .get(sp.switch)
                .map(|t| t.iter().map(|(id, ports)| GroupDump { id, ports }).collect())
                .unwrap_or_default(),
            rules: &sp.rules,
        })
        .collect();
    serde_json::to_writer_pretty(File::create(filename)?, &dump)?;
    info!("Plan written to {}", filename.display());
    Ok(())
}

/// Install the rules onto one command file per switch, in `out_dir`.
fn install(topo: &Topology, config: InstallerConfig, out_dir: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(out_dir)?;

    let mut endpoints: HashMap<String, Box<dyn SwitchControl>> = HashMap::new();
    for sw in topo.switches() {
        let name = topo.get_node_name(*sw)?;
        let endpoint = CommandFileSwitch::create(out_dir.join(format!("{}-commands.txt", name)))?;
        let endpoint: Box<dyn SwitchControl> = match config.call_timeout() {
            Some(timeout) => Box::new(TimedSwitch::new(name, endpoint, timeout)),
            None => Box::new(endpoint),
        };
        endpoints.insert(name.to_string(), endpoint);
    }

    let installer = RouteInstaller::new(topo, config);
    match installer.run(&mut endpoints) {
        Ok((plan, report)) => {
            for line in printer::install_report(&report) {
                println!("{}", line);
            }
            info!("Installed {} rules on {} switches", report.num_rules(), plan.switches.len());
            Ok(())
        }
        Err(p4route::Error::InstallFailed(report)) => {
            for line in printer::install_report(&report) {
                println!("{}", line);
            }
            Err(p4route::Error::InstallFailed(report).into())
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Parser, Debug)]
#[command(name = "p4route", author = "Tibor Schneider")]
/// Compute the ECMP routes of P4 switches, and install them as table entries.
struct CommandLineArguments {
    /// Main Command
    #[command(subcommand)]
    cmd: MainCommand,
    /// Number of worker threads (default: one per CPU)
    #[arg(short = 't', long, global = true)]
    threads: Option<usize>,
    /// Configuration file (JSON)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,
    /// Enable logging at level `info` (unless `RUST_LOG` is set)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum MainCommand {
    /// Compute and print the rules of every switch
    #[command(name = "plan")]
    Plan {
        /// Topology file (JSON)
        topology: PathBuf,
        /// Write the rules as JSON into this file
        #[arg(long = "json")]
        json: Option<PathBuf>,
    },
    /// Compute the rules, and write them as simple_switch_CLI commands, one file per switch
    #[command(name = "install")]
    Install {
        /// Topology file (JSON)
        topology: PathBuf,
        /// Output directory
        #[arg(short = 'o', long)]
        out_dir: PathBuf,
    },
    /// Compute and print the rules of an example network
    #[command(name = "example")]
    Example {
        /// Example network
        #[arg(value_enum)]
        network: ExampleTopology,
    },
}
