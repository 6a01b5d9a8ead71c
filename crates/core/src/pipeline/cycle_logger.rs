use std::collections::HashMap;
use std::time::Instant;

/// How a single detection cycle ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CycleOutcome {
    /// Results applied; this many faces drawn and counted.
    Applied(usize),
    /// Inference failed; overlay cleared and error status published.
    Failed,
    /// The owning session ended while inference was in flight.
    Discarded,
}

impl CycleOutcome {
    fn tally_key(&self) -> &'static str {
        match self {
            CycleOutcome::Applied(_) => "applied",
            CycleOutcome::Failed => "failed",
            CycleOutcome::Discarded => "discarded",
        }
    }
}

/// Cross-cutting logger for detection cycle events.
///
/// Keeps the scheduler independent of where timings and outcomes end up
/// (stdout summary, a UI, or nowhere).
pub trait CycleLogger: Send {
    /// Record how long a named stage took for one cycle.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record how a cycle ended.
    fn cycle(&mut self, outcome: CycleOutcome);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullCycleLogger;

impl CycleLogger for NullCycleLogger {
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn cycle(&mut self, _outcome: CycleOutcome) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI-oriented logger that tracks per-stage timings and outcome tallies and
/// reports them through `log` when the session ends.
pub struct StdoutCycleLogger {
    timings: HashMap<String, Vec<f64>>,
    outcomes: HashMap<&'static str, usize>,
    faces: usize,
    start_time: Instant,
}

impl StdoutCycleLogger {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            outcomes: HashMap::new(),
            faces: 0,
            start_time: Instant::now(),
        }
    }

    /// Returns the formatted summary string, or `None` if no cycle ran.
    pub fn summary_string(&self) -> Option<String> {
        if self.outcomes.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let cycles: usize = self.outcomes.values().sum();
        let mut lines = Vec::new();

        lines.push(format!(
            "Detection summary ({cycles} cycles, {:.1}s total):",
            elapsed_ms / 1000.0
        ));

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = if durations.is_empty() {
                0.0
            } else {
                total_ms / durations.len() as f64
            };
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms"
            ));
        }

        for key in ["applied", "failed", "discarded"] {
            let n = self.outcome_count(key);
            if n > 0 {
                lines.push(format!("  {key}: {n}"));
            }
        }
        lines.push(format!("  faces: {}", self.faces));

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn outcome_count(&self, key: &str) -> usize {
        self.outcomes.get(key).copied().unwrap_or(0)
    }
}

impl Default for StdoutCycleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleLogger for StdoutCycleLogger {
    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn cycle(&mut self, outcome: CycleOutcome) {
        *self.outcomes.entry(outcome.tally_key()).or_default() += 1;
        match outcome {
            CycleOutcome::Applied(n) => {
                self.faces += n;
                log::debug!("Cycle applied: {n} face(s)");
            }
            CycleOutcome::Failed => log::warn!("Cycle failed"),
            CycleOutcome::Discarded => log::debug!("Cycle discarded: session ended"),
        }
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
