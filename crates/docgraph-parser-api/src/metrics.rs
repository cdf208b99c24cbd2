use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Metrics collected while loading sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserMetrics {
    /// Total files attempted to parse
    pub files_attempted: usize,

    /// Files successfully parsed
    pub files_succeeded: usize,

    /// Files that failed parsing
    pub files_failed: usize,

    /// Files skipped by ignore patterns or duplicate suppression
    pub files_skipped: usize,

    /// Total time spent parsing
    #[serde(with = "duration_serde")]
    pub total_parse_time: Duration,

    /// Total entity records produced (all nesting levels)
    pub total_entities: usize,
}

// Helper module for serializing Duration
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis: u64 = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

impl Default for ParserMetrics {
    fn default() -> Self {
        Self {
            files_attempted: 0,
            files_succeeded: 0,
            files_failed: 0,
            files_skipped: 0,
            total_parse_time: Duration::ZERO,
            total_entities: 0,
        }
    }
}

impl ParserMetrics {
    /// Success rate (0.0 to 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.files_attempted == 0 {
            0.0
        } else {
            self.files_succeeded as f64 / self.files_attempted as f64
        }
    }

    /// Average parse time per file
    pub fn avg_parse_time(&self) -> Duration {
        if self.files_succeeded == 0 {
            Duration::ZERO
        } else {
            self.total_parse_time / self.files_succeeded as u32
        }
    }

    /// Average entities per file
    pub fn avg_entities_per_file(&self) -> f64 {
        if self.files_succeeded == 0 {
            0.0
        } else {
            self.total_entities as f64 / self.files_succeeded as f64
        }
    }

    /// Merge another metrics object into this one
    pub fn merge(&mut self, other: &ParserMetrics) {
        self.files_attempted += other.files_attempted;
        self.files_succeeded += other.files_succeeded;
        self.files_failed += other.files_failed;
        self.files_skipped += other.files_skipped;
        self.total_parse_time += other.total_parse_time;
        self.total_entities += other.total_entities;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_on_empty_metrics() {
        let metrics = ParserMetrics::default();
        assert_eq!(metrics.success_rate(), 0.0);
        assert_eq!(metrics.avg_parse_time(), Duration::ZERO);
    }

    #[test]
    fn test_merge() {
        let mut a = ParserMetrics {
            files_attempted: 2,
            files_succeeded: 1,
            files_failed: 1,
            total_parse_time: Duration::from_millis(10),
            total_entities: 4,
            ..Default::default()
        };
        let b = ParserMetrics {
            files_attempted: 2,
            files_succeeded: 2,
            total_parse_time: Duration::from_millis(20),
            total_entities: 8,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.files_attempted, 4);
        assert_eq!(a.success_rate(), 0.75);
        assert_eq!(a.avg_parse_time(), Duration::from_millis(10));
        assert_eq!(a.avg_entities_per_file(), 4.0);
    }

    #[test]
    fn test_serializes_duration_as_millis() {
        let metrics = ParserMetrics {
            total_parse_time: Duration::from_millis(1500),
            ..Default::default()
        };
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["total_parse_time"], 1500);
        let back: ParserMetrics = serde_json::from_value(json).unwrap();
        assert_eq!(back, metrics);
    }
}
