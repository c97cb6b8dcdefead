//! Recorded scenarios: chain data, the event stream, and optionally the
//! notifications it should produce.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use txwatch_common::messages::{ChainEvent, TxNotification};
use txwatch_module_tx_tracker::memory_chain::MemoryChain;
use txwatch_module_tx_tracker::tracker_observer::{
    drain_notifications, NotificationQueue, QueueObserver,
};
use txwatch_module_tx_tracker::{TxTracker, TxTrackerConfig};

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Chain data keyed by block hash
    #[serde(default)]
    pub chain: MemoryChain,

    /// Events in arrival order
    pub events: Vec<ChainEvent>,

    /// Notifications the events should produce, in order
    #[serde(default)]
    pub expected: Option<Vec<TxNotification>>,
}

impl Scenario {
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading scenario {}", path.display()))?;
        let scenario: Scenario = serde_json::from_str(&text)
            .with_context(|| format!("parsing scenario {}", path.display()))?;
        info!("Loaded {} events from {}", scenario.events.len(), path.display());
        Ok(scenario)
    }

    /// Feed every event through a fresh tracker.
    ///
    /// `sink` sees each notification as soon as the event producing it
    /// has been handled. Returns everything produced.
    pub fn replay<F>(&self, config: TxTrackerConfig, mut sink: F) -> Result<Vec<TxNotification>>
    where
        F: FnMut(&TxNotification) -> Result<()>,
    {
        let queue: NotificationQueue = Arc::new(Mutex::new(Vec::new()));
        let mut tracker = TxTracker::new(
            config,
            Box::new(self.chain.clone()),
            Box::new(QueueObserver::new(queue.clone())),
        );

        let mut produced = Vec::new();
        for (index, event) in self.events.iter().enumerate() {
            tracker
                .handle(event.clone())
                .with_context(|| format!("event {index} ({})", event.kind()))?;

            for notification in drain_notifications(&queue) {
                sink(&notification)?;
                produced.push(notification);
            }
        }

        let unpinned = self.chain.unpinned();
        info!(
            "Replayed {} events: {} notifications, {} blocks unpinned, {} still pending",
            self.events.len(),
            produced.len(),
            unpinned.len(),
            tracker.pending().len()
        );
        Ok(produced)
    }

    /// Compare produced notifications against the expected ones, if any.
    pub fn check(&self, produced: &[TxNotification]) -> Result<()> {
        let Some(expected) = &self.expected else {
            warn!("Scenario has no expected notifications, nothing to check");
            return Ok(());
        };

        for (index, (want, got)) in expected.iter().zip(produced).enumerate() {
            if want != got {
                bail!("notification {index} differs: expected {want:?}, got {got:?}");
            }
        }
        if expected.len() != produced.len() {
            bail!(
                "expected {} notifications, got {}",
                expected.len(),
                produced.len()
            );
        }

        info!("All {} notifications match", produced.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORK_SCENARIO: &str = r#"{
        "chain": {
            "B1": { "body": ["t1"] },
            "B2": { "invalid": ["t1"] }
        },
        "events": [
            { "type": "newTransaction", "value": "t1" },
            { "type": "newBlock", "blockHash": "B1", "parent": "B0" },
            { "type": "newBlock", "blockHash": "B2", "parent": "B0" },
            { "type": "finalized", "blockHash": "B2" }
        ],
        "expected": [
            { "type": "txSettled", "tx": "t1", "settlement": { "type": "valid", "blockHash": "B1", "successful": true } },
            { "type": "txSettled", "tx": "t1", "settlement": { "type": "invalid", "blockHash": "B2" } },
            { "type": "txDone", "tx": "t1", "settlement": { "type": "invalid", "blockHash": "B2" } }
        ]
    }"#;

    #[test]
    fn test_replay_matches_expected() {
        let scenario: Scenario = serde_json::from_str(FORK_SCENARIO).unwrap();
        let mut streamed = 0;

        let produced = scenario
            .replay(TxTrackerConfig::default(), |_| {
                streamed += 1;
                Ok(())
            })
            .unwrap();

        assert_eq!(streamed, 3);
        scenario.check(&produced).unwrap();
    }

    #[test]
    fn test_bundled_scenarios_match_expected() {
        for text in [
            include_str!("../scenarios/fork.json"),
            include_str!("../scenarios/skipped_finality.json"),
        ] {
            let scenario: Scenario = serde_json::from_str(text).unwrap();
            let produced = scenario.replay(TxTrackerConfig::default(), |_| Ok(())).unwrap();
            scenario.check(&produced).unwrap();
        }
    }

    #[test]
    fn test_check_reports_missing_notifications() {
        let scenario: Scenario = serde_json::from_str(FORK_SCENARIO).unwrap();
        let produced = scenario.replay(TxTrackerConfig::default(), |_| Ok(())).unwrap();

        assert!(scenario.check(&produced[..2]).is_err());
    }

    #[test]
    fn test_replay_stops_at_bad_event() {
        let scenario: Scenario = serde_json::from_str(
            r#"{ "events": [ { "type": "finalized", "blockHash": "B9" } ] }"#,
        )
        .unwrap();

        let error = scenario.replay(TxTrackerConfig::default(), |_| Ok(())).unwrap_err();
        assert!(error.to_string().contains("event 0 (finalized)"));
    }
}
