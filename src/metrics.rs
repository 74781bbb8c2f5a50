use crate::model::{SendResult, SendStatus};
use serde::Serialize;

/// Aggregate counts over a batch of send results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsMetrics {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    /// Whole percent, rounded half up; 0 for an empty batch.
    pub success_rate: u32,
}

impl ResultsMetrics {
    pub fn from_results(results: &[SendResult]) -> Self {
        let total = results.len();
        let success = results
            .iter()
            .filter(|r| r.status == SendStatus::Success)
            .count();
        let failed = results
            .iter()
            .filter(|r| r.status == SendStatus::Failed)
            .count();
        Self {
            total,
            success,
            failed,
            success_rate: compute_success_rate(success, total),
        }
    }
}

/// Compute the success rate as a rounded whole percent.
pub fn compute_success_rate(success: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((success as f64 / total as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContactRecord;

    #[test]
    fn counts_and_rate() {
        let rec = ContactRecord::with_email("a@b.com");
        let results = vec![
            SendResult::success(&rec),
            SendResult::success(&rec),
            SendResult::failed(&rec, "x"),
        ];
        let m = ResultsMetrics::from_results(&results);
        assert_eq!(m.total, 3);
        assert_eq!(m.success, 2);
        assert_eq!(m.failed, 1);
        assert_eq!(m.success_rate, 67);
    }

    #[test]
    fn empty_batch_has_zero_rate() {
        assert_eq!(ResultsMetrics::from_results(&[]), ResultsMetrics::default());
        assert_eq!(compute_success_rate(1, 2), 50);
    }
}
