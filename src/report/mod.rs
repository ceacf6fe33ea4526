mod gemini;

pub use gemini::GeminiClient;

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mission::MissionId;

pub const FALLBACK_SUMMARY: &str =
    "Communication with assessment satellite failed. Manual review required.";

/// The six free-text fields the generator fills in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub location: String,
    pub impact_radius: String,
    pub casualty_estimate: String,
    pub infrastructure_damage: String,
    pub environmental_impact: String,
    pub summary: String,
}

impl Assessment {
    /// Canned record used whenever the generator cannot deliver
    pub fn fallback(location: &str) -> Self {
        Self {
            location: location.to_string(),
            impact_radius: "Unknown".to_string(),
            casualty_estimate: "Data unavailable".to_string(),
            infrastructure_damage: "Assessment failed".to_string(),
            environmental_impact: "Unknown".to_string(),
            summary: FALLBACK_SUMMARY.to_string(),
        }
    }
}

/// A filed assessment, bound to exactly one mission
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub mission_id: MissionId,
    pub assessment: Assessment,
}

impl Report {
    pub fn new(mission_id: MissionId, assessment: Assessment) -> Self {
        Self { mission_id, assessment }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no API key configured (set GEMINI_API_KEY or API_KEY)")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service responded with {0}")]
    Status(reqwest::StatusCode),
    #[error("no text in response")]
    EmptyResponse,
    #[error("malformed assessment: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("could not start report worker: {0}")]
    Worker(#[from] std::io::Error),
}

/// Anything that can turn a sector name into an assessment.
/// Implementations block; they are only ever called from worker threads.
pub trait ReportGenerator: Send + Sync {
    fn generate(&self, location: &str) -> Result<Assessment, ReportError>;
}

/// A settled request
#[derive(Debug)]
pub struct ReportOutcome {
    pub mission_id: MissionId,
    pub result: Result<Assessment, ReportError>,
}

/// Fans report requests out to one worker thread each. Results come back
/// over a channel the UI loop drains once per tick, so state changes stay
/// on the UI thread.
pub struct ReportDispatcher {
    generator: Arc<dyn ReportGenerator>,
    tx: Sender<ReportOutcome>,
    rx: Receiver<ReportOutcome>,
    in_flight: usize,
}

impl ReportDispatcher {
    pub fn new(generator: Arc<dyn ReportGenerator>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            generator,
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Number of requests that have not been drained yet
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Start one assessment request. Never blocks the caller.
    pub fn request(&mut self, mission_id: MissionId, location: String) {
        let generator = Arc::clone(&self.generator);
        let tx = self.tx.clone();
        self.in_flight += 1;

        let spawned = thread::Builder::new()
            .name(format!("report-{}", mission_id.tag()))
            .spawn(move || {
                let result = generator.generate(&location);
                // Receiver only goes away on shutdown
                let _ = tx.send(ReportOutcome { mission_id, result });
            });

        if let Err(e) = spawned {
            log::error!("Failed to spawn report worker for {}: {}", mission_id, e);
            let _ = self.tx.send(ReportOutcome {
                mission_id,
                result: Err(ReportError::Worker(e)),
            });
        }
    }

    /// Collect every outcome that has arrived since the last call
    pub fn drain(&mut self) -> Vec<ReportOutcome> {
        let mut outcomes = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(outcome) => outcomes.push(outcome),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        self.in_flight = self.in_flight.saturating_sub(outcomes.len());
        outcomes
    }
}
