//! Task statistics and alert status aggregation
//!
//! Kapacitor reports per-node counters under `stats.node-stats`. Alert nodes
//! carry `crits_triggered`, `warns_triggered` and `oks_triggered`; this module
//! folds those counters into a single [`AlertSummary`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::ops::AddAssign;

use crate::client::Operation;
use crate::{Error, Result};

/// Node name prefix Kapacitor gives to alert nodes (`alert2`, `alert4`, ...).
pub const DEFAULT_ALERT_NODE_PREFIX: &str = "alert";

/// The part of a task response that carries runtime statistics.
///
/// Every other field of the response is ignored. Missing `stats` or
/// `node-stats` keys decode as an empty node mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsDocument {
    #[serde(default)]
    pub stats: TaskStats,
}

/// Per-node stats are kept raw; only alert nodes are decoded into [`NodeStats`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskStats {
    #[serde(rename = "node-stats", default)]
    pub node_stats: HashMap<String, Value>,
}

/// Alert counters of a single node. Counters a node does not report are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStats {
    #[serde(default)]
    pub crits_triggered: u64,
    #[serde(default)]
    pub warns_triggered: u64,
    #[serde(default)]
    pub oks_triggered: u64,
}

/// Sum of the alert counters across every alert node of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub crits_triggered: u64,
    pub warns_triggered: u64,
    pub oks_triggered: u64,
}

impl AlertSummary {
    pub fn new(crits_triggered: u64, warns_triggered: u64, oks_triggered: u64) -> Self {
        Self {
            crits_triggered,
            warns_triggered,
            oks_triggered,
        }
    }
}

impl AddAssign<&NodeStats> for AlertSummary {
    fn add_assign(&mut self, node: &NodeStats) {
        // Counters wrap on overflow.
        self.crits_triggered = self.crits_triggered.wrapping_add(node.crits_triggered);
        self.warns_triggered = self.warns_triggered.wrapping_add(node.warns_triggered);
        self.oks_triggered = self.oks_triggered.wrapping_add(node.oks_triggered);
    }
}

impl StatsDocument {
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    pub fn node_count(&self) -> usize {
        self.stats.node_stats.len()
    }
}

/// Default alert node selector: any node whose name starts with `alert`.
pub fn is_alert_node(name: &str) -> bool {
    name.starts_with(DEFAULT_ALERT_NODE_PREFIX)
}

/// Aggregate the alert counters of `doc` using [`is_alert_node`].
pub fn aggregate(doc: &StatsDocument) -> Result<AlertSummary> {
    aggregate_with(doc, is_alert_node)
}

/// Aggregate the alert counters of every node accepted by `is_alert`.
///
/// Fails with [`Error::Aggregation`] when no node is accepted.
pub fn aggregate_with<F>(doc: &StatsDocument, is_alert: F) -> Result<AlertSummary>
where
    F: Fn(&str) -> bool,
{
    aggregate_nodes(
        doc.stats
            .node_stats
            .iter()
            .map(|(name, node)| (name.as_str(), node)),
        is_alert,
    )
}

/// Fold `(name, stats)` pairs in the order given.
///
/// Nodes rejected by `is_alert` are skipped without being decoded. An accepted
/// node whose counters are not non-negative integers is a decoding error.
pub fn aggregate_nodes<'a, I, F>(nodes: I, is_alert: F) -> Result<AlertSummary>
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
    F: Fn(&str) -> bool,
{
    let mut summary = AlertSummary::default();
    let mut seen = 0usize;
    let mut matched = 0usize;

    for (name, raw) in nodes {
        seen += 1;
        if !is_alert(name) {
            continue;
        }
        let node = NodeStats::deserialize(raw).map_err(|source| Error::Decoding {
            operation: Operation::Status,
            target: name.to_string(),
            source,
        })?;
        summary += &node;
        matched += 1;
    }

    if matched == 0 {
        return Err(Error::Aggregation { node_count: seen });
    }

    Ok(summary)
}
