use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// DamageReport records a fault observed at a node. Unresolved reports stop
/// downstream-impact traversal at that node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageReport {
    pub id: String,
    pub description: String,
    pub resolved: bool,
    pub reported_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Derived "XdYhZm" duration, computed once at resolution
    #[serde(default)]
    pub resolution_time: Option<String>,
}

impl DamageReport {
    pub fn new(id: String, description: String, reported_at: DateTime<Utc>) -> Self {
        Self {
            id,
            description,
            resolved: false,
            reported_at,
            resolved_at: None,
            resolution_time: None,
        }
    }

    /// Mark resolved and derive the resolution duration.
    pub fn resolve(&mut self, at: DateTime<Utc>) {
        self.resolved = true;
        self.resolved_at = Some(at);
        self.resolution_time = Some(format_duration(at - self.reported_at));
    }
}

fn format_duration(d: chrono::Duration) -> String {
    let minutes = d.num_minutes().max(0);
    format!("{}d {}h {}m", minutes / (60 * 24), (minutes / 60) % 24, minutes % 60)
}

/// CreateReportRequest for filing a damage report against a node
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReportRequest {
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_resolution_time_derivation() {
        let reported = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let mut report = DamageReport::new("r1".to_string(), "corte de fibra".to_string(), reported);
        assert!(!report.resolved);

        let resolved = Utc.with_ymd_and_hms(2024, 3, 2, 13, 45, 0).unwrap();
        report.resolve(resolved);

        assert!(report.resolved);
        assert_eq!(report.resolved_at, Some(resolved));
        assert_eq!(report.resolution_time.as_deref(), Some("1d 3h 45m"));
    }

    #[test]
    fn test_zero_duration() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let mut report = DamageReport::new("r1".to_string(), "x".to_string(), t);
        report.resolve(t);
        assert_eq!(report.resolution_time.as_deref(), Some("0d 0h 0m"));
    }
}
