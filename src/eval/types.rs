//! Evaluation types: MetricValue, SlotStatus, F1Scores.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Rendering of a metric that could not be computed.
pub const NAN_VAL: &str = "NA";

/// A summary metric, or the "not applicable" sentinel.
///
/// A metric is not applicable when the list it reduces over is empty, e.g.
/// categorical accuracy for an epoch in which no turn had a categorical
/// slot. Serializes as a plain number, or as the string `"NA"`.
///
/// # Example
///
/// ```rust
/// use sgd_eval::eval::MetricValue;
///
/// let v = MetricValue::Value(0.75);
/// assert_eq!(v.get(), Some(0.75));
/// assert_eq!(v.to_string(), "0.7500");
/// assert_eq!(MetricValue::NotApplicable.to_string(), "NA");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MetricValue {
    /// A computed value.
    Value(f64),
    /// Nothing to reduce over.
    #[default]
    NotApplicable,
}

impl MetricValue {
    /// The value, if applicable.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<f64> {
        match self {
            MetricValue::Value(v) => Some(*v),
            MetricValue::NotApplicable => None,
        }
    }

    /// Whether a value was computed.
    #[inline]
    #[must_use]
    pub fn is_applicable(&self) -> bool {
        matches!(self, MetricValue::Value(_))
    }

    /// The value, or `default` when not applicable.
    #[inline]
    #[must_use]
    pub fn unwrap_or(&self, default: f64) -> f64 {
        self.get().unwrap_or(default)
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Value(value)
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(MetricValue::NotApplicable, MetricValue::Value)
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Value(v) => write!(f, "{:.4}", v),
            MetricValue::NotApplicable => f.write_str(NAN_VAL),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Value(v) => serializer.serialize_f64(*v),
            MetricValue::NotApplicable => serializer.serialize_str(NAN_VAL),
        }
    }
}

impl<'de> Deserialize<'de> for MetricValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Value(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Value(v) => Ok(MetricValue::Value(v)),
            Repr::Text(s) if s == NAN_VAL => Ok(MetricValue::NotApplicable),
            Repr::Text(s) => Err(serde::de::Error::custom(format!(
                "expected a number or \"{}\", got {:?}",
                NAN_VAL, s
            ))),
        }
    }
}

/// Dialogue-state status of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SlotStatus {
    /// Slot not mentioned.
    Off = 0,
    /// Slot has a value.
    Active = 1,
    /// User explicitly does not care about the value.
    DontCare = 2,
}

impl SlotStatus {
    /// Map a label or prediction index to a status.
    #[must_use]
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(SlotStatus::Off),
            1 => Some(SlotStatus::Active),
            2 => Some(SlotStatus::DontCare),
            _ => None,
        }
    }

    /// Index used in label tensors.
    #[inline]
    #[must_use]
    pub const fn index(self) -> i64 {
        self as i64
    }
}

/// F1, precision and recall of a binary prediction task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct F1Scores {
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// true positives / predicted positives.
    pub precision: f64,
    /// true positives / actual positives.
    pub recall: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_value_json() {
        let json = serde_json::to_string(&vec![
            MetricValue::Value(0.5),
            MetricValue::NotApplicable,
        ])
        .unwrap();
        assert_eq!(json, r#"[0.5,"NA"]"#);

        let back: Vec<MetricValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![MetricValue::Value(0.5), MetricValue::NotApplicable]);
    }

    #[test]
    fn test_metric_value_rejects_other_strings() {
        let result: std::result::Result<MetricValue, _> = serde_json::from_str(r#""N/A""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_metric_value_from_option() {
        assert_eq!(MetricValue::from(Some(1.0)), MetricValue::Value(1.0));
        assert_eq!(MetricValue::from(None), MetricValue::NotApplicable);
        assert_eq!(MetricValue::NotApplicable.unwrap_or(-1.0), -1.0);
    }

    #[test]
    fn test_slot_status_roundtrip() {
        for status in [SlotStatus::Off, SlotStatus::Active, SlotStatus::DontCare] {
            assert_eq!(SlotStatus::from_index(status.index()), Some(status));
        }
        assert_eq!(SlotStatus::from_index(3), None);
        assert_eq!(SlotStatus::Active.index(), 1);
    }
}
