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

//! Timeout wrapper around a switch endpoint

use super::{ControlError, SwitchControl};

use log::*;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Request {
    Clear(String),
    SetDefault(String, String, Vec<String>),
    Add(String, String, Vec<String>, Vec<String>),
}

type Reply = Result<(), ControlError>;

/// Wrapper, which runs the inner endpoint on a dedicated thread, and waits for every call at most
/// for the configured timeout. If a call does not return in time, [`ControlError::Timeout`] is
/// returned, but the call keeps running on the endpoint. Later calls are queued behind it. If the
/// next call repeats the timed-out request, it waits for the late answer instead of sending the
/// request a second time.
#[derive(Debug)]
pub struct TimedSwitch {
    name: String,
    timeout: Duration,
    requests: Option<Sender<(Request, Sender<Reply>)>>,
    late: Option<(Request, Receiver<Reply>)>,
}

impl TimedSwitch {
    /// Move the endpoint onto a new thread, and apply the timeout to every call.
    pub fn new<S>(name: impl Into<String>, inner: S, timeout: Duration) -> Self
    where
        S: SwitchControl + 'static,
    {
        let name = name.into();
        let (tx, rx) = channel::<(Request, Sender<Reply>)>();
        let thread_name = format!("{}-control", name);
        let spawned = thread::Builder::new().name(thread_name).spawn(move || serve(inner, rx));
        let requests = match spawned {
            Ok(_) => Some(tx),
            Err(e) => {
                error!("Cannot spawn the control thread of {}: {}", name, e);
                None
            }
        };
        Self { name, timeout, requests, late: None }
    }

    /// Returns false if the control thread has stopped.
    pub fn is_alive(&self) -> bool {
        self.requests.is_some()
    }

    /// Returns true if the answer of a timed-out call is still outstanding.
    pub fn is_pending(&self) -> bool {
        self.late.is_some()
    }

    fn stopped(&mut self) -> ControlError {
        self.requests = None;
        self.late = None;
        ControlError::Transport(format!("endpoint of {} has stopped", self.name))
    }

    fn call(&mut self, request: Request) -> Result<(), ControlError> {
        if self.requests.is_none() {
            return Err(ControlError::Transport(format!("endpoint of {} is lost", self.name)));
        }

        // the previous call timed out, and its answer may have arrived in the meantime
        if let Some((late_request, late_reply)) = self.late.take() {
            match late_reply.recv_timeout(self.timeout) {
                Ok(reply) if late_request == request => {
                    debug!("{}: late answer to {:?}", self.name, request);
                    return reply;
                }
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) => {
                    warn!("{} is still busy after {:?}", self.name, self.timeout);
                    self.late = Some((late_request, late_reply));
                    return Err(ControlError::Timeout(self.timeout));
                }
                Err(RecvTimeoutError::Disconnected) => return Err(self.stopped()),
            }
        }

        let (reply_tx, reply_rx) = channel();
        let sent = match self.requests.as_ref() {
            Some(requests) => requests.send((request.clone(), reply_tx)).is_ok(),
            None => false,
        };
        if !sent {
            return Err(self.stopped());
        }
        match reply_rx.recv_timeout(self.timeout) {
            Ok(reply) => reply,
            Err(RecvTimeoutError::Timeout) => {
                warn!("{} did not answer within {:?}", self.name, self.timeout);
                self.late = Some((request, reply_rx));
                Err(ControlError::Timeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(self.stopped()),
        }
    }
}

fn serve<S: SwitchControl>(mut inner: S, requests: Receiver<(Request, Sender<Reply>)>) {
    for (request, reply) in requests {
        let result = match request {
            Request::Clear(table) => inner.clear_table(&table),
            Request::SetDefault(table, action, params) => {
                inner.set_default_action(&table, &action, &params)
            }
            Request::Add(table, action, fields, params) => {
                inner.add_rule(&table, &action, &fields, &params)
            }
        };
        // the caller may have given up already
        let _ = reply.send(result);
    }
}

impl SwitchControl for TimedSwitch {
    fn clear_table(&mut self, table: &str) -> Result<(), ControlError> {
        self.call(Request::Clear(table.to_string()))
    }

    fn set_default_action(
        &mut self,
        table: &str,
        action: &str,
        params: &[String],
    ) -> Result<(), ControlError> {
        self.call(Request::SetDefault(table.to_string(), action.to_string(), params.to_vec()))
    }

    fn add_rule(
        &mut self,
        table: &str,
        action: &str,
        match_fields: &[String],
        action_params: &[String],
    ) -> Result<(), ControlError> {
        self.call(Request::Add(
            table.to_string(),
            action.to_string(),
            match_fields.to_vec(),
            action_params.to_vec(),
        ))
    }
}
