//! Shared test doubles
//!
//! - `ScriptedTransport`: in-process peer answering from a per-command script
//! - `RecordingRunner`: records OS commands and answers from canned output

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use gnode::system::command::{CommandError, CommandRunner};
use gnode::system::ipc::codec::{decode_command, encode_rejection, encode_reply};
use gnode::system::ipc::{
    Command, Endpoint, IpcError, PeerDirectory, Rejection, Reply, RequestReplyClient, Transport,
};

pub const BROKER: &str = "broker";
pub const BRIDGE: &str = "bridge";
pub const TUNNEL: &str = "tunnel";

/// Scripted peer answer
#[derive(Debug, Clone)]
pub enum Scripted {
    Reply(Reply),
    Reject(Rejection),
    Unreachable,
}

impl Scripted {
    /// Authentication toggle confirmation
    pub fn ok() -> Self {
        Scripted::text("ok")
    }

    /// Tunnel command confirmation
    pub fn confirmed() -> Self {
        Scripted::text("OK")
    }

    /// Empty reply acknowledging a channel mutation
    pub fn done() -> Self {
        Scripted::text("")
    }

    pub fn flag(value: bool) -> Self {
        Scripted::Reply(Reply::Flag(value))
    }

    pub fn doc(value: serde_json::Value) -> Self {
        Scripted::Reply(Reply::Document(value))
    }

    pub fn text(value: &str) -> Self {
        Scripted::Reply(Reply::Text(value.to_string()))
    }

    pub fn refused(reason: &str) -> Self {
        Scripted::Reject(Rejection::refused(reason))
    }
}

fn key(address: &str, command: &Command) -> String {
    format!("{} {} {}", address, command.verb.name(), command.path)
        .trim_end()
        .to_string()
}

/// Peers answering from a script keyed by `"<address> <VERB> <path>"`
///
/// Answers are consumed in order; the last one repeats. Commands without a
/// script fail as unreachable.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, address: &str, verb: &str, path: &str, answer: Scripted) -> &Self {
        let key = format!("{} {} {}", address, verb, path).trim_end().to_string();
        self.script.lock().entry(key).or_default().push_back(answer);
        self
    }

    /// Every command seen so far as `"<address> <VERB> <path>"`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == call).count()
    }

    fn answer(&self, key: &str) -> Option<Scripted> {
        let mut script = self.script.lock();
        let queue = script.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn exchange(
        &self,
        address: &str,
        payload: &[u8],
        _wait: Duration,
    ) -> Result<Vec<u8>, IpcError> {
        let command = decode_command(payload)?;
        let key = key(address, &command);
        self.calls.lock().push(key.clone());

        match self.answer(&key) {
            Some(Scripted::Reply(reply)) => encode_reply(&reply),
            Some(Scripted::Reject(rejection)) => encode_rejection(&rejection),
            Some(Scripted::Unreachable) | None => {
                Err(IpcError::PeerUnreachable(format!("no script for {}", key)))
            }
        }
    }
}

pub fn directory() -> PeerDirectory {
    let endpoint = |address: &str| Endpoint {
        address: address.to_string(),
        timeout: Duration::from_millis(200),
    };
    PeerDirectory::new(endpoint(BROKER), endpoint(BRIDGE), endpoint(TUNNEL))
}

pub fn scripted_client(transport: &Arc<ScriptedTransport>) -> Arc<RequestReplyClient> {
    Arc::new(RequestReplyClient::new(transport.clone(), directory()))
}

/// One recorded OS command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub privileged: bool,
    pub line: String,
}

/// Records commands; answers from canned output keyed by the command line
#[derive(Default)]
pub struct RecordingRunner {
    outputs: Mutex<HashMap<String, Result<String, CommandError>>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl RecordingRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, line: &str, output: &str) -> &Self {
        self.outputs
            .lock()
            .insert(line.to_string(), Ok(output.to_string()));
        self
    }

    pub fn fail(&self, line: &str, stderr: &str) -> &Self {
        self.outputs
            .lock()
            .insert(line.to_string(), Err(CommandError::new(line, Some(1), stderr)));
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().clone()
    }

    pub fn privileged_lines(&self) -> Vec<String> {
        self.invocations
            .lock()
            .iter()
            .filter(|i| i.privileged)
            .map(|i| i.line.clone())
            .collect()
    }

    fn record(&self, privileged: bool, program: &str, args: &[&str]) -> Result<String, CommandError> {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.invocations.lock().push(Invocation {
            privileged,
            line: line.clone(),
        });
        self.outputs
            .lock()
            .get(&line)
            .cloned()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, CommandError> {
        self.record(false, program, args)
    }

    async fn run_privileged(&self, program: &str, args: &[&str]) -> Result<String, CommandError> {
        self.record(true, program, args)
    }
}

/// `systemctl show` output for a running unit
pub const SYSTEMD_RUNNING: &str = "ActiveState=active\nSubState=running\nLoadState=loaded";

pub fn systemd_show(unit: &str) -> String {
    format!(
        "systemctl show {} --property=ActiveState,SubState,LoadState",
        unit
    )
}
