//! Derived attributes handed back to the attribute bus.
//!
//! Sinks are called while the publishing coordinator holds its lock, so a
//! sink must not call back into any coordinator.

use std::collections::BTreeSet;

use corelib::{NodeId, Token};
use crossbeam::channel::{self, Receiver, Sender};
use serde::Serialize;
use tracing::trace;

use crate::usage::DatacenterUsage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "attribute", content = "value", rename_all = "camelCase")]
pub enum Attribute {
    CurrentSeeds(BTreeSet<NodeId>),
    HasPublishedSeeds(bool),
    Hostname(Option<String>),
    ThriftPort(Option<u16>),
    ClusterNodes(Vec<String>),
    ServiceUp(bool),
    DatacenterUsage(DatacenterUsage),
    Datacenters(BTreeSet<String>),
    Tokens { node: NodeId, tokens: BTreeSet<Token> },
}

/// An attribute published by the named datacenter or fabric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeChange {
    pub source: String,
    pub attribute: Attribute,
}

pub trait AttributeSink: Send + Sync {
    fn publish(&self, change: AttributeChange);
}

/// Discards everything; for coordinators nobody observes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl AttributeSink for NullSink {
    fn publish(&self, _change: AttributeChange) {}
}

/// Forwards changes over a crossbeam channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<AttributeChange>,
}

impl ChannelSink {
    pub fn new(tx: Sender<AttributeChange>) -> Self {
        Self { tx }
    }

    pub fn unbounded() -> (Self, Receiver<AttributeChange>) {
        let (tx, rx) = channel::unbounded();
        (Self::new(tx), rx)
    }
}

impl AttributeSink for ChannelSink {
    fn publish(&self, change: AttributeChange) {
        if let Err(err) = self.tx.send(change) {
            trace!(source = %err.0.source, "attribute receiver gone; dropping change");
        }
    }
}
