use serde::Serialize;

/// Outcome of a dispatch or recurrence pass, reported to whoever triggered it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Candidates returned by the ledger query
    pub total: usize,
    pub success: usize,
    pub error: usize,
    /// Candidates left for a later pass without being an error, e.g. no
    /// tokens were found or the pass deadline was reached
    pub skipped: usize,
    /// Timestamp in millis at which the pass started
    pub ran_at: i64,
}
