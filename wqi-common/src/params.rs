//! Eight-field physicochemical readings
//!
//! Two distinct types:
//! - [`ParameterSet`]: all eight fields present and numeric. Required at the
//!   inference boundary (HTTP input, model features, persistence log rows).
//! - [`PartialParameterSet`]: each field optional. Used while synthesizing or
//!   analyzing records whose columns may be incomplete.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of physicochemical fields in a reading
pub const FIELD_COUNT: usize = 8;

/// Canonical field identifiers, in feature order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "ph")]
    Ph,
    #[serde(rename = "turbidity")]
    Turbidity,
    #[serde(rename = "tds")]
    Tds,
    #[serde(rename = "do")]
    DissolvedOxygen,
    #[serde(rename = "temp")]
    Temperature,
    #[serde(rename = "conductivity")]
    Conductivity,
    #[serde(rename = "chlorine")]
    Chlorine,
    #[serde(rename = "nitrate")]
    Nitrate,
}

impl Field {
    /// All fields in canonical (feature vector) order
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::Ph,
        Field::Turbidity,
        Field::Tds,
        Field::DissolvedOxygen,
        Field::Temperature,
        Field::Conductivity,
        Field::Chlorine,
        Field::Nitrate,
    ];

    /// Canonical wire name (JSON keys, CSV headers, TOML tables)
    pub fn name(self) -> &'static str {
        match self {
            Self::Ph => "ph",
            Self::Turbidity => "turbidity",
            Self::Tds => "tds",
            Self::DissolvedOxygen => "do",
            Self::Temperature => "temp",
            Self::Conductivity => "conductivity",
            Self::Chlorine => "chlorine",
            Self::Nitrate => "nitrate",
        }
    }

    /// Position of this field in the feature vector
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a field by canonical name
    pub fn from_name(name: &str) -> Option<Field> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Complete reading: every field present
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub ph: f64,
    pub turbidity: f64,
    pub tds: f64,
    #[serde(rename = "do")]
    pub dissolved_oxygen: f64,
    #[serde(rename = "temp")]
    pub temperature: f64,
    pub conductivity: f64,
    pub chlorine: f64,
    pub nitrate: f64,
}

impl ParameterSet {
    /// Read a single field
    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Ph => self.ph,
            Field::Turbidity => self.turbidity,
            Field::Tds => self.tds,
            Field::DissolvedOxygen => self.dissolved_oxygen,
            Field::Temperature => self.temperature,
            Field::Conductivity => self.conductivity,
            Field::Chlorine => self.chlorine,
            Field::Nitrate => self.nitrate,
        }
    }

    /// Overwrite a single field
    pub fn set(&mut self, field: Field, value: f64) {
        match field {
            Field::Ph => self.ph = value,
            Field::Turbidity => self.turbidity = value,
            Field::Tds => self.tds = value,
            Field::DissolvedOxygen => self.dissolved_oxygen = value,
            Field::Temperature => self.temperature = value,
            Field::Conductivity => self.conductivity = value,
            Field::Chlorine => self.chlorine = value,
            Field::Nitrate => self.nitrate = value,
        }
    }

    /// Feature vector in canonical field order
    pub fn to_array(&self) -> [f64; FIELD_COUNT] {
        Field::ALL.map(|f| self.get(f))
    }

    /// Build from a feature vector in canonical field order
    pub fn from_array(values: [f64; FIELD_COUNT]) -> Self {
        Self {
            ph: values[0],
            turbidity: values[1],
            tds: values[2],
            dissolved_oxygen: values[3],
            temperature: values[4],
            conductivity: values[5],
            chlorine: values[6],
            nitrate: values[7],
        }
    }

    /// True when every field is a finite number
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Validate an untyped JSON object at the inference boundary
    ///
    /// Every canonical field must be present and either a JSON number or a
    /// string that parses as one. Extra keys are ignored. All problems are
    /// collected into a single [`Error::InvalidInput`] so the caller sees
    /// every offending field at once.
    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let mut values = [0.0; FIELD_COUNT];
        let mut problems = Vec::new();

        for field in Field::ALL {
            match object.get(field.name()) {
                None | Some(serde_json::Value::Null) => {
                    problems.push(format!("missing field '{}'", field));
                }
                Some(serde_json::Value::Number(n)) => match n.as_f64() {
                    Some(v) if v.is_finite() => values[field.index()] = v,
                    _ => problems.push(format!("field '{}' is not a finite number", field)),
                },
                Some(serde_json::Value::String(s)) => match s.trim().parse::<f64>() {
                    Ok(v) if v.is_finite() => values[field.index()] = v,
                    _ => problems.push(format!("field '{}' is not numeric: {:?}", field, s)),
                },
                Some(other) => {
                    problems.push(format!("field '{}' is not numeric: {}", field, other));
                }
            }
        }

        if problems.is_empty() {
            Ok(Self::from_array(values))
        } else {
            Err(Error::InvalidInput(problems.join("; ")))
        }
    }
}

/// Reading with optional fields
///
/// Missing or non-finite values are stored as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PartialParameterSet {
    values: [Option<f64>; FIELD_COUNT],
}

impl PartialParameterSet {
    /// Empty reading (no fields observed)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        self.values[field.index()]
    }

    /// Record a value; non-finite values are stored as absent
    pub fn set(&mut self, field: Field, value: Option<f64>) {
        self.values[field.index()] = value.filter(|v| v.is_finite());
    }

    #[must_use]
    pub fn with(mut self, field: Field, value: f64) -> Self {
        self.set(field, Some(value));
        self
    }

    /// Number of observed fields
    pub fn present_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.present_count() == FIELD_COUNT
    }

    /// Promote to a complete [`ParameterSet`] when every field is observed
    pub fn to_complete(&self) -> Option<ParameterSet> {
        let mut values = [0.0; FIELD_COUNT];
        for (slot, value) in values.iter_mut().zip(self.values.iter()) {
            *slot = (*value)?;
        }
        Some(ParameterSet::from_array(values))
    }
}

impl From<ParameterSet> for PartialParameterSet {
    fn from(params: ParameterSet) -> Self {
        let mut partial = PartialParameterSet::new();
        for field in Field::ALL {
            partial.set(field, Some(params.get(field)));
        }
        partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ParameterSet {
        ParameterSet {
            ph: 7.0,
            turbidity: 2.0,
            tds: 200.0,
            dissolved_oxygen: 8.0,
            temperature: 20.0,
            conductivity: 500.0,
            chlorine: 0.5,
            nitrate: 3.0,
        }
    }

    #[test]
    fn test_field_order_matches_index() {
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
            assert_eq!(Field::from_name(field.name()), Some(*field));
        }
    }

    #[test]
    fn test_array_conversion_preserves_values() {
        let params = sample();
        assert_eq!(ParameterSet::from_array(params.to_array()), params);
    }

    #[test]
    fn test_serde_uses_canonical_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["do"], json!(8.0));
        assert_eq!(value["temp"], json!(20.0));
        assert!(value.get("dissolved_oxygen").is_none());
    }

    #[test]
    fn test_from_json_object_accepts_numbers_and_numeric_strings() {
        let body = json!({
            "ph": 7.0, "turbidity": "2.0", "tds": 200, "do": 8.0,
            "temp": 20, "conductivity": 500, "chlorine": 0.5, "nitrate": " 3 ",
            "extra": "ignored"
        });
        let params = ParameterSet::from_json_object(body.as_object().unwrap()).unwrap();
        assert_eq!(params, sample());
    }

    #[test]
    fn test_from_json_object_reports_every_bad_field() {
        let body = json!({
            "ph": 7.0, "turbidity": "murky", "tds": 200, "do": null,
            "temp": 20, "conductivity": 500, "chlorine": [0.5]
        });
        let err = ParameterSet::from_json_object(body.as_object().unwrap()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("turbidity"));
        assert!(message.contains("missing field 'do'"));
        assert!(message.contains("chlorine"));
        assert!(message.contains("missing field 'nitrate'"));
        assert!(!message.contains("'ph'"));
    }

    #[test]
    fn test_partial_drops_non_finite_values() {
        let partial = PartialParameterSet::new()
            .with(Field::Ph, 7.0)
            .with(Field::Tds, f64::NAN);
        assert_eq!(partial.get(Field::Ph), Some(7.0));
        assert_eq!(partial.get(Field::Tds), None);
        assert_eq!(partial.present_count(), 1);
        assert!(partial.to_complete().is_none());
    }

    #[test]
    fn test_partial_round_trips_complete_set() {
        let partial = PartialParameterSet::from(sample());
        assert!(partial.is_complete());
        assert_eq!(partial.to_complete(), Some(sample()));
    }
}
