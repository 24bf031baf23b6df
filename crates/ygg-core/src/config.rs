use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;

/// Immutable-after-creation configuration for one show.
///
/// Assembled once at `createInitialState` time (spec.md §3's "Lifecycle")
/// and never mutated by the Conductor afterward — only `RESET_TO_LOBBY`
/// replaces the whole `Show`, config included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowConfig {
    pub row_count: usize,
    pub row_labels: Vec<String>,
    pub coup: CoupConfig,
    pub timing: TimingConfig,
    pub vote_policy: VotePolicy,
}

impl ShowConfig {
    pub fn label_for(&self, row: usize) -> String {
        self.row_labels
            .get(row)
            .cloned()
            .unwrap_or_else(|| format!("Row {}", row))
    }
}

impl Default for ShowConfig {
    fn default() -> Self {
        Self {
            row_count: 8,
            row_labels: Vec::new(),
            coup: CoupConfig::default(),
            timing: TimingConfig::default(),
            vote_policy: VotePolicy::default(),
        }
    }
}

/// Parameters governing a faction's one-shot coup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CoupConfig {
    /// Fraction of a faction's members who must cast `COUP_VOTE` during the
    /// current row's `coup_window` to arm the coup for the *next* row.
    pub threshold: f64,
    /// Coup multiplier bonus: weighted coherence = raw * (1 + bonus).
    pub multiplier_bonus: f64,
}

impl Default for CoupConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            multiplier_bonus: 0.5,
        }
    }
}

/// Row sub-phase durations driving the Timing Engine (spec.md §4.7).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(with = "duration_millis")]
    pub voting_window_ms: Duration,
    #[serde(with = "duration_millis")]
    pub reveal_duration_ms: Duration,
    #[serde(with = "duration_millis")]
    pub coup_window_ms: Duration,
    #[serde(with = "duration_millis")]
    pub audition_per_option_ms: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            voting_window_ms: Duration::from_secs(30),
            reveal_duration_ms: Duration::from_secs(8),
            coup_window_ms: Duration::from_secs(15),
            audition_per_option_ms: Duration::from_secs(12),
        }
    }
}

mod duration_millis {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// How `CAST_VOTE` behaves on a repeated vote for the same `(row, attempt)`.
///
/// Default is `Overwrite` per spec.md §7: "default policy: overwrite".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VotePolicy {
    #[default]
    Overwrite,
    Strict,
}
