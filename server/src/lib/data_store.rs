use common::message::{Command, Response};
use tracing::debug;

use crate::channel_registry::{ChannelRegistry, Record, DEFAULT_CHANNEL_CAPACITY};
use crate::error::StoreError;
use crate::kv_table::KeyValueTable;

/// The store shared by every connection: a key-value table and a registry of
/// named channels. The two never lock each other, so nothing here is atomic
/// across a key and a channel.
#[derive(Debug, Default)]
pub struct DataStore {
    kv: KeyValueTable,
    channels: ChannelRegistry,
}

impl DataStore {
    pub fn new() -> Self {
        Self::with_channel_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_channel_capacity(capacity: usize) -> Self {
        Self {
            kv: KeyValueTable::new(),
            channels: ChannelRegistry::with_capacity(capacity),
        }
    }

    pub fn channel_capacity(&self) -> usize {
        self.channels.capacity()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.kv.set(key, value);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.kv.get(key)
    }

    pub fn delete(&self, key: &str) {
        self.kv.delete(key);
    }

    pub fn create_channel(&self, name: &str) -> Result<(), StoreError> {
        self.channels.create_channel(name)
    }

    pub fn close_channel(&self, name: &str) -> Result<(), StoreError> {
        self.channels.close_channel(name)
    }

    pub fn send(&self, name: &str, key: &str, value: &str) -> Result<(), StoreError> {
        self.channels.send(name, key, value)
    }

    pub fn receive(&self, name: &str) -> Result<Record, StoreError> {
        self.channels.receive(name)
    }

    /// Runs one parsed command and builds its reply.
    ///
    /// Unless `report_channel_errors` is set, channel commands answer `OK`
    /// whatever the store said, and a received record is not echoed back.
    pub fn execute(&self, command: Command, report_channel_errors: bool) -> Response {
        match command {
            Command::SET { key, value } => {
                self.set(&key, &value);
                Response::OK
            }
            Command::GET { key } => self.get(&key).map_or(Response::NULL, Response::VALUE),
            Command::DEL { key } => {
                self.delete(&key);
                Response::OK
            }
            Command::CREATECHAN { name } => {
                acknowledge(self.create_channel(&name), &name, report_channel_errors)
            }
            Command::CLOSECHAN { name } => {
                acknowledge(self.close_channel(&name), &name, report_channel_errors)
            }
            Command::SETTOCHAN { name, key, value } => acknowledge(
                self.send(&name, &key, &value),
                &name,
                report_channel_errors,
            ),
            Command::READFROMCHAN { name } => match self.receive(&name) {
                Ok(Record { key, value }) if report_channel_errors => {
                    Response::RECORD { key, value }
                }
                Ok(_) => Response::OK,
                Err(e) => acknowledge(Err(e), &name, report_channel_errors),
            },
        }
    }
}

fn acknowledge(result: Result<(), StoreError>, channel: &str, report: bool) -> Response {
    match result {
        Ok(()) => Response::OK,
        Err(e) if report => Response::ERROR(e.to_string()),
        Err(e) => {
            debug!(channel = %channel, error = %e, "channel error acknowledged as OK");
            Response::OK
        }
    }
}
