// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-process partitioned broker.
//!
//! Semantics mirror the external broker the platform deploys against:
//! append-only partitioned logs per topic, key-hash partition assignment,
//! per-partition ordering, consumer groups with manual offset commit, and
//! at-least-once delivery. A subscription tracks its own fetch cursors; only
//! [`Subscription::commit`] advances the group offset, so a message fetched
//! but never committed is redelivered after a resubscribe (process restart)
//! or an explicit [`Subscription::rewind`].
//!
//! One subscription owns all partitions of its topic within a process;
//! partition rebalancing across processes is the external broker's job.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use crate::error::{BrokerError, Result};
use crate::publisher::EventPublisher;

/// A message header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Header name.
    pub key: String,
    /// Header value bytes.
    pub value: Vec<u8>,
}

impl Header {
    /// Create a header from a name and value.
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A message fetched from a partition.
#[derive(Debug, Clone)]
pub struct Message {
    /// Topic the message was read from.
    pub topic: String,
    /// Partition within the topic.
    pub partition: u32,
    /// Offset within the partition.
    pub offset: u64,
    /// Partition key the producer published with.
    pub key: String,
    /// Message payload bytes.
    pub payload: Vec<u8>,
    /// Message headers.
    pub headers: Vec<Header>,
}

#[derive(Debug, Clone)]
struct StoredMessage {
    key: String,
    payload: Vec<u8>,
    headers: Vec<Header>,
}

#[derive(Default)]
struct BrokerState {
    /// topic → partition logs.
    topics: HashMap<String, Vec<Vec<StoredMessage>>>,
    /// (group, topic, partition) → next offset to deliver after restart.
    committed: HashMap<(String, String, u32), u64>,
    closed: bool,
}

struct Inner {
    state: Mutex<BrokerState>,
    notify: Notify,
    partitions: u32,
}

/// In-process broker handle. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct InMemoryBroker {
    inner: Arc<Inner>,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    /// Create a broker with the default partition count (4 per topic).
    pub fn new() -> Self {
        Self::with_partitions(4)
    }

    /// Create a broker with `partitions` partitions per topic (minimum 1).
    pub fn with_partitions(partitions: u32) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(BrokerState::default()),
                notify: Notify::new(),
                partitions: partitions.max(1),
            }),
        }
    }

    /// Subscribe a consumer group to a topic.
    ///
    /// The subscription's fetch cursors start at the group's committed
    /// offsets, so uncommitted messages from a previous subscription are
    /// redelivered.
    pub fn subscribe(&self, topic: impl Into<String>, group: impl Into<String>) -> Subscription {
        let topic = topic.into();
        let group = group.into();
        let state = self.inner.state.lock();
        let mut cursors = HashMap::new();
        for partition in 0..self.inner.partitions {
            let committed = state
                .committed
                .get(&(group.clone(), topic.clone(), partition))
                .copied()
                .unwrap_or(0);
            cursors.insert(partition, committed);
        }
        drop(state);

        debug!(topic = %topic, group = %group, "Subscribed consumer group");
        Subscription {
            inner: self.inner.clone(),
            topic,
            group,
            cursors,
            next_partition: 0,
        }
    }

    /// Snapshot every message currently stored on a topic, partition by
    /// partition in offset order. Intended for tests and diagnostics.
    pub fn topic_messages(&self, topic: &str) -> Vec<Message> {
        let state = self.inner.state.lock();
        let Some(partitions) = state.topics.get(topic) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (partition, log) in partitions.iter().enumerate() {
            for (offset, stored) in log.iter().enumerate() {
                out.push(Message {
                    topic: topic.to_string(),
                    partition: partition as u32,
                    offset: offset as u64,
                    key: stored.key.clone(),
                    payload: stored.payload.clone(),
                    headers: stored.headers.clone(),
                });
            }
        }
        out
    }

    fn partition_for(&self, key: &str) -> u32 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % u64::from(self.inner.partitions)) as u32
    }
}

#[async_trait]
impl EventPublisher for InMemoryBroker {
    async fn publish_with_headers(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
        headers: Vec<Header>,
    ) -> Result<()> {
        let partition = self.partition_for(key);
        {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(BrokerError::Closed);
            }
            let partitions = state
                .topics
                .entry(topic.to_string())
                .or_insert_with(|| vec![Vec::new(); self.inner.partitions as usize]);
            partitions[partition as usize].push(StoredMessage {
                key: key.to_string(),
                payload: payload.to_vec(),
                headers,
            });
        }
        self.inner.notify.notify_waiters();
        Ok(())
    }

    async fn close(&self) {
        self.inner.state.lock().closed = true;
        self.inner.notify.notify_waiters();
    }
}

/// A consumer-group subscription to a single topic.
pub struct Subscription {
    inner: Arc<Inner>,
    topic: String,
    group: String,
    /// partition → next offset this subscription will fetch.
    cursors: HashMap<u32, u64>,
    /// Round-robin start so one busy partition cannot starve the others.
    next_partition: u32,
}

impl Subscription {
    /// Fetch the next message, waiting until one is available.
    ///
    /// Messages within a partition are delivered in offset order. Fetching
    /// advances only this subscription's cursor; the group offset moves on
    /// [`commit`](Self::commit). Cancel-safe: dropping the future before it
    /// resolves loses nothing.
    pub async fn fetch(&mut self) -> Result<Message> {
        loop {
            let inner = self.inner.clone();
            let notified = inner.notify.notified();
            if let Some(message) = self.poll_next()? {
                return Ok(message);
            }
            notified.await;
        }
    }

    /// Fetch without waiting; `Ok(None)` when no message is ready.
    pub fn poll_next(&mut self) -> Result<Option<Message>> {
        let state = self.inner.state.lock();
        if state.closed {
            return Err(BrokerError::Closed);
        }
        let Some(partitions) = state.topics.get(&self.topic) else {
            return Ok(None);
        };

        let count = partitions.len() as u32;
        for i in 0..count {
            let partition = (self.next_partition + i) % count;
            let cursor = self.cursors.get(&partition).copied().unwrap_or(0);
            let log = &partitions[partition as usize];
            if (cursor as usize) < log.len() {
                let stored = log[cursor as usize].clone();
                drop(state);
                self.cursors.insert(partition, cursor + 1);
                self.next_partition = (partition + 1) % count;
                return Ok(Some(Message {
                    topic: self.topic.clone(),
                    partition,
                    offset: cursor,
                    key: stored.key,
                    payload: stored.payload,
                    headers: stored.headers,
                }));
            }
        }
        Ok(None)
    }

    /// Commit a message, advancing the group offset past it.
    ///
    /// Offsets only move forward; committing an already-committed message is
    /// a no-op.
    pub fn commit(&self, message: &Message) -> Result<()> {
        let mut state = self.inner.state.lock();
        if state.closed {
            return Err(BrokerError::Closed);
        }
        let key = (self.group.clone(), self.topic.clone(), message.partition);
        let entry = state.committed.entry(key).or_insert(0);
        *entry = (*entry).max(message.offset + 1);
        Ok(())
    }

    /// Reset this subscription's fetch cursor so `message` is redelivered.
    ///
    /// Used when processing failed in a way that must not advance the offset
    /// (for example a dead-letter write that itself failed).
    pub fn rewind(&mut self, message: &Message) {
        self.cursors.insert(message.partition, message.offset);
    }
}
