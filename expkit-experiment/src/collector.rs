use expkit_core::{TrialData, TrialSink};
use expkit_timing::Clock;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

/// One finished trial as stored by the collector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord {
    pub trial_type: String,
    pub trial_index: usize,
    /// Milliseconds since the session started.
    pub time_elapsed: u64,
    #[serde(flatten)]
    pub data: Map<String, Value>,
    #[serde(flatten)]
    pub outcome: TrialData,
}

/// Fields every record writes ahead of the trial's own data.
const RECORD_KEYS: [&str; 3] = ["trial_type", "trial_index", "time_elapsed"];

#[derive(Debug)]
struct PendingTrial {
    trial_type: String,
    trial_index: usize,
    data: Map<String, Value>,
}

/// Trial sink that keeps every finished trial in memory, in order
#[derive(Debug)]
pub struct DataCollector<C: Clock> {
    clock: C,
    session_start_ns: u64,
    pending: Option<PendingTrial>,
    records: Vec<TrialRecord>,
}

impl<C: Clock> DataCollector<C> {
    pub fn new(clock: C) -> Self {
        let session_start_ns = clock.now_ns();
        Self {
            clock,
            session_start_ns,
            pending: None,
            records: Vec::new(),
        }
    }

    /// Metadata attached to the next finished trial.
    pub fn begin_trial(&mut self, trial_type: &str, trial_index: usize, data: Map<String, Value>) {
        self.pending = Some(PendingTrial {
            trial_type: trial_type.to_owned(),
            trial_index,
            data,
        });
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<TrialRecord> {
        self.records
    }
}

impl<C: Clock> TrialSink for DataCollector<C> {
    fn finish(&mut self, outcome: TrialData) {
        let pending = self.pending.take().unwrap_or_else(|| {
            warn!("trial finished without metadata");
            PendingTrial {
                trial_type: "unknown".into(),
                trial_index: self.records.len(),
                data: Map::new(),
            }
        });
        let mut data = pending.data;
        drop_shadowed_keys(&mut data, &outcome);
        let time_elapsed = self.clock.elapsed(self.session_start_ns).as_millis() as u64;
        info!(
            trial_type = %pending.trial_type,
            trial_index = pending.trial_index,
            time_elapsed,
            "trial finished"
        );
        self.records.push(TrialRecord {
            trial_type: pending.trial_type,
            trial_index: pending.trial_index,
            time_elapsed,
            data,
            outcome,
        });
    }
}

/// Removes data keys the record or the outcome also writes, so each key
/// appears once in the flattened record and the measured value wins.
fn drop_shadowed_keys(data: &mut Map<String, Value>, outcome: &TrialData) {
    let outcome_fields = match serde_json::to_value(outcome) {
        Ok(Value::Object(fields)) => fields,
        _ => Map::new(),
    };
    let shadowed: Vec<String> = data
        .keys()
        .filter(|key| RECORD_KEYS.contains(&key.as_str()) || outcome_fields.contains_key(*key))
        .cloned()
        .collect();
    for key in shadowed {
        data.remove(&key);
        warn!(%key, "trial data key collides with a recorded field, dropped");
    }
}
