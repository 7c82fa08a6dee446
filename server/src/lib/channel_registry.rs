use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use tokio::sync::{
    mpsc::{
        self,
        error::{TryRecvError, TrySendError},
    },
    Semaphore,
};
use tracing::debug;

use crate::error::StoreError;

/// Records a channel buffers before `send` starts failing with `ChannelFull`.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;

/// Largest buffer a bounded tokio channel accepts.
pub const MAX_CHANNEL_CAPACITY: usize = Semaphore::MAX_PERMITS;

/// One key/value pair travelling through a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub value: String,
}

impl Record {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A bounded queue. Producers go through the lock-free `tx`; consumers
/// serialize on `inbox` because `try_recv` needs the receiver mutably.
#[derive(Debug)]
struct Channel {
    tx: mpsc::Sender<Record>,
    inbox: Mutex<Inbox>,
}

#[derive(Debug)]
struct Inbox {
    rx: mpsc::Receiver<Record>,
    open: bool,
}

impl Channel {
    fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            inbox: Mutex::new(Inbox { rx, open: true }),
        }
    }

    fn push(&self, record: Record) -> Result<(), StoreError> {
        self.tx.try_send(record).map_err(|err| match err {
            TrySendError::Full(_) => StoreError::ChannelFull,
            TrySendError::Closed(_) => StoreError::NotFound,
        })
    }

    fn pop(&self) -> Result<Record, StoreError> {
        let mut inbox = self.lock_inbox();
        if !inbox.open {
            return Err(StoreError::NotFound);
        }
        inbox.rx.try_recv().map_err(|err| match err {
            TryRecvError::Empty => StoreError::ChannelEmpty,
            TryRecvError::Disconnected => StoreError::NotFound,
        })
    }

    /// Stops further sends and drops whatever is still buffered. Returns the
    /// number of discarded records.
    fn close(&self) -> usize {
        let mut inbox = self.lock_inbox();
        inbox.open = false;
        inbox.rx.close();

        let mut discarded = 0;
        while inbox.rx.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }

    fn lock_inbox(&self) -> MutexGuard<'_, Inbox> {
        // The guarded section never panics halfway through a mutation.
        self.inbox.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Named channels, looked up by name on every operation.
///
/// The name map and each channel's queue are separate lock domains: a map
/// guard is only held to look up, insert or remove an `Arc<Channel>` and is
/// always released before the queue is touched.
#[derive(Debug)]
pub struct ChannelRegistry {
    channels: DashMap<String, Arc<Channel>>,
    capacity: usize,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// `capacity` is clamped to `1..=MAX_CHANNEL_CAPACITY`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.clamp(1, MAX_CHANNEL_CAPACITY),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of open channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Opens `name`, or does nothing if it is already open.
    pub fn create_channel(&self, name: &str) -> Result<(), StoreError> {
        if name.is_empty() {
            return Err(StoreError::InvalidArgument("name is empty"));
        }
        self.get_or_create(name);
        Ok(())
    }

    /// Unregisters `name` and discards its buffered records. A later create
    /// with the same name starts from an empty queue.
    pub fn close_channel(&self, name: &str) -> Result<(), StoreError> {
        if name.is_empty() {
            return Err(StoreError::InvalidArgument("name is empty"));
        }

        let (_, channel) = self.channels.remove(name).ok_or(StoreError::NotFound)?;
        let discarded = channel.close();
        debug!(channel = %name, discarded, "channel closed");
        Ok(())
    }

    /// Enqueues `{key: value}` without waiting, opening the channel on first use.
    pub fn send(&self, name: &str, key: &str, value: &str) -> Result<(), StoreError> {
        if name.is_empty() || key.is_empty() {
            return Err(StoreError::InvalidArgument("name or key is empty"));
        }

        let channel = self.get_or_create(name);
        channel.push(Record::new(key, value))
    }

    /// Dequeues the oldest record without waiting.
    pub fn receive(&self, name: &str) -> Result<Record, StoreError> {
        let channel = self.lookup(name).ok_or(StoreError::NotFound)?;
        channel.pop()
    }

    fn lookup(&self, name: &str) -> Option<Arc<Channel>> {
        self.channels.get(name).map(|entry| Arc::clone(entry.value()))
    }

    fn get_or_create(&self, name: &str) -> Arc<Channel> {
        if let Some(channel) = self.lookup(name) {
            return channel;
        }

        // Re-checked under the shard's write lock so concurrent first uses
        // of a name all end up with the same channel.
        let entry = self.channels.entry(name.to_string()).or_insert_with(|| {
            debug!(channel = %name, capacity = self.capacity, "channel created");
            Arc::new(Channel::new(self.capacity))
        });
        let channel = Arc::clone(entry.value());
        drop(entry);
        channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn empty_names_and_keys_are_rejected() {
        let registry = ChannelRegistry::new();
        assert_eq!(
            registry.create_channel(""),
            Err(StoreError::InvalidArgument("name is empty"))
        );
        assert_eq!(
            registry.send("", "k", "v"),
            Err(StoreError::InvalidArgument("name or key is empty"))
        );
        assert_eq!(
            registry.send("jobs", "", "v"),
            Err(StoreError::InvalidArgument("name or key is empty"))
        );
        assert_eq!(
            registry.close_channel(""),
            Err(StoreError::InvalidArgument("name is empty"))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn empty_value_is_allowed() {
        let registry = ChannelRegistry::new();
        registry.send("jobs", "k", "").unwrap();
        assert_eq!(registry.receive("jobs"), Ok(Record::new("k", "")));
    }

    #[test]
    fn create_is_idempotent_and_keeps_contents() {
        let registry = ChannelRegistry::new();
        registry.create_channel("x").unwrap();
        registry.send("x", "a", "1").unwrap();
        registry.create_channel("x").unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.receive("x"), Ok(Record::new("a", "1")));
    }

    #[test]
    fn send_creates_channel_implicitly() {
        let registry = ChannelRegistry::new();
        assert!(!registry.contains("jobs"));
        registry.send("jobs", "a", "1").unwrap();
        assert!(registry.contains("jobs"));
    }

    #[test]
    fn receive_reports_missing_and_empty_channels() {
        let registry = ChannelRegistry::new();
        assert_eq!(registry.receive("nope"), Err(StoreError::NotFound));

        registry.create_channel("jobs").unwrap();
        assert_eq!(registry.receive("jobs"), Err(StoreError::ChannelEmpty));
    }

    #[test]
    fn records_come_out_in_send_order() {
        let registry = ChannelRegistry::new();
        for key in ["a", "b", "c"] {
            registry.send("jobs", key, "v").unwrap();
        }

        let keys: Vec<String> = (0..3)
            .map(|_| registry.receive("jobs").unwrap().key)
            .collect();
        assert_eq!(keys, ["a", "b", "c"]);
        assert_eq!(registry.receive("jobs"), Err(StoreError::ChannelEmpty));
    }

    #[test]
    fn send_fails_once_capacity_is_reached() {
        let registry = ChannelRegistry::with_capacity(4);
        for i in 0..4 {
            registry.send("jobs", &format!("k{i}"), "v").unwrap();
        }
        assert_eq!(
            registry.send("jobs", "overflow", "v"),
            Err(StoreError::ChannelFull)
        );

        for i in 0..4 {
            assert_eq!(registry.receive("jobs").unwrap().key, format!("k{i}"));
        }
        assert_eq!(registry.receive("jobs"), Err(StoreError::ChannelEmpty));
    }

    #[test]
    fn default_capacity_holds_exactly_ten_thousand_records() {
        let registry = ChannelRegistry::new();
        for i in 0..DEFAULT_CHANNEL_CAPACITY {
            registry.send("bulk", &i.to_string(), "v").unwrap();
        }
        assert_eq!(
            registry.send("bulk", "one-too-many", "v"),
            Err(StoreError::ChannelFull)
        );

        let mut received = 0;
        while registry.receive("bulk").is_ok() {
            received += 1;
        }
        assert_eq!(received, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn receiving_frees_capacity() {
        let registry = ChannelRegistry::with_capacity(1);
        registry.send("jobs", "a", "1").unwrap();
        assert_eq!(registry.send("jobs", "b", "2"), Err(StoreError::ChannelFull));
        registry.receive("jobs").unwrap();
        registry.send("jobs", "b", "2").unwrap();
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let registry = ChannelRegistry::with_capacity(0);
        assert_eq!(registry.capacity(), 1);
        registry.send("jobs", "a", "1").unwrap();
    }

    #[test]
    fn oversized_capacity_is_clamped_and_channels_still_open() {
        let registry = ChannelRegistry::with_capacity(usize::MAX);
        assert_eq!(registry.capacity(), MAX_CHANNEL_CAPACITY);
        registry.create_channel("huge").unwrap();
        registry.send("huge", "a", "1").unwrap();
        assert_eq!(registry.receive("huge"), Ok(Record::new("a", "1")));
    }

    #[test]
    fn close_discards_records_and_frees_the_name() {
        let registry = ChannelRegistry::new();
        registry.send("jobs", "a", "1").unwrap();
        registry.send("jobs", "b", "2").unwrap();

        registry.close_channel("jobs").unwrap();
        assert!(!registry.contains("jobs"));
        assert_eq!(registry.receive("jobs"), Err(StoreError::NotFound));
        assert_eq!(registry.close_channel("jobs"), Err(StoreError::NotFound));

        registry.create_channel("jobs").unwrap();
        assert_eq!(registry.receive("jobs"), Err(StoreError::ChannelEmpty));
    }

    #[test]
    fn closed_channel_handle_reports_not_found() {
        let channel = Channel::new(4);
        channel.push(Record::new("a", "1")).unwrap();

        assert_eq!(channel.close(), 1);
        assert_eq!(channel.pop(), Err(StoreError::NotFound));
        assert_eq!(
            channel.push(Record::new("b", "2")),
            Err(StoreError::NotFound)
        );
    }

    #[test]
    fn concurrent_senders_each_deliver_exactly_once() {
        const SENDERS: usize = 64;
        let registry = ChannelRegistry::with_capacity(SENDERS);
        let barrier = Barrier::new(SENDERS);

        thread::scope(|s| {
            for i in 0..SENDERS {
                let registry = &registry;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    registry.send("shared", &format!("k{i}"), "v").unwrap();
                });
            }
        });

        assert_eq!(registry.len(), 1);
        let mut keys = HashSet::new();
        while let Ok(record) = registry.receive("shared") {
            assert!(keys.insert(record.key), "record delivered twice");
        }
        assert_eq!(keys.len(), SENDERS);
    }

    #[test]
    fn concurrent_receivers_never_share_a_record() {
        const RECORDS: usize = 1_000;
        const RECEIVERS: usize = 8;
        let registry = ChannelRegistry::new();
        for i in 0..RECORDS {
            registry.send("shared", &i.to_string(), "v").unwrap();
        }

        let received: Vec<Vec<String>> = thread::scope(|s| {
            let handles: Vec<_> = (0..RECEIVERS)
                .map(|_| {
                    let registry = &registry;
                    s.spawn(move || {
                        let mut mine = Vec::new();
                        while let Ok(record) = registry.receive("shared") {
                            mine.push(record.key);
                        }
                        mine
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let all: HashSet<String> = received.iter().flatten().cloned().collect();
        let total: usize = received.iter().map(Vec::len).sum();
        assert_eq!(total, RECORDS);
        assert_eq!(all.len(), RECORDS);
    }

    #[test]
    fn racing_creates_share_one_channel() {
        const THREADS: usize = 16;
        let registry = ChannelRegistry::new();
        let barrier = Barrier::new(THREADS);

        thread::scope(|s| {
            for i in 0..THREADS {
                let registry = &registry;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    if i % 2 == 0 {
                        registry.create_channel("fresh").unwrap();
                    } else {
                        registry.send("fresh", &format!("k{i}"), "v").unwrap();
                    }
                });
            }
        });

        assert_eq!(registry.len(), 1);
        let mut count = 0;
        while registry.receive("fresh").is_ok() {
            count += 1;
        }
        assert_eq!(count, THREADS / 2);
    }
}
