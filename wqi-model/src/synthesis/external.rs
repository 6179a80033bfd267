//! External dataset loading
//!
//! Source columns are renamed onto canonical fields through a fixed alias
//! table (matched case-insensitively, spaces treated as underscores). Missing
//! columns produce a warning and leave that field absent; unparseable cells
//! are absent too. Every row is relabeled with the scoring rules, and any
//! label column shipped with the file is ignored.

use super::{LabeledTable, ScoredRecord};
use crate::error::ModelResult;
use std::path::Path;
use tracing::{info, warn};
use wqi_common::params::{Field, PartialParameterSet, FIELD_COUNT};
use wqi_common::RuleTable;

/// Accepted source column names per canonical field
pub const COLUMN_ALIASES: &[(Field, &[&str])] = &[
    (Field::Ph, &["ph", "ph_value"]),
    (Field::Turbidity, &["turbidity", "turbidity_ntu"]),
    (Field::Tds, &["tds", "solids", "total_dissolved_solids"]),
    (Field::DissolvedOxygen, &["do", "dissolved_oxygen", "dissolvedoxygen", "d.o."]),
    (Field::Temperature, &["temp", "temperature", "water_temp"]),
    (Field::Conductivity, &["conductivity", "ec", "electrical_conductivity"]),
    (Field::Chlorine, &["chlorine", "chloramines", "residual_chlorine"]),
    (Field::Nitrate, &["nitrate", "nitrates", "no3"]),
];

/// Categorical ground-truth columns, carried through for comparison only
pub const GROUND_TRUTH_COLUMNS: &[&str] = &["quality", "potability"];

/// Pre-existing index columns; never used as labels
pub const IGNORED_LABEL_COLUMNS: &[&str] = &["wqi", "index", "water_quality_index"];

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

fn field_for_header(header: &str) -> Option<Field> {
    let normalized = normalize_header(header);
    COLUMN_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&normalized.as_str()))
        .map(|(field, _)| *field)
}

/// Potability is 0/1; map it onto the same vocabulary as a Quality column
fn ground_truth_value(column: &str, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if column == "potability" {
        return match raw.parse::<f64>() {
            Ok(v) if v == 1.0 => Some("Safe".to_string()),
            Ok(v) if v == 0.0 => Some("Unsafe".to_string()),
            _ => Some(raw.to_string()),
        };
    }
    Some(raw.to_string())
}

fn parse_cell(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Column positions resolved from a header row
#[derive(Debug, Clone, Default)]
struct ColumnMap {
    fields: [Option<usize>; FIELD_COUNT],
    ground_truth: Option<(usize, String)>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let mut map = ColumnMap::default();

        for (pos, header) in headers.iter().enumerate() {
            let normalized = normalize_header(header);
            if let Some(field) = field_for_header(header) {
                let slot = &mut map.fields[field.index()];
                if slot.is_some() {
                    warn!("Column '{}' duplicates field '{}', ignoring it", header, field);
                } else {
                    *slot = Some(pos);
                }
            } else if GROUND_TRUTH_COLUMNS.contains(&normalized.as_str()) {
                if map.ground_truth.is_none() {
                    map.ground_truth = Some((pos, normalized));
                }
            } else if IGNORED_LABEL_COLUMNS.contains(&normalized.as_str()) {
                info!("Ignoring pre-existing label column '{}'; labels are recomputed", header);
            }
        }

        for field in Field::ALL {
            if map.fields[field.index()].is_none() {
                warn!("Dataset has no column for '{}'; field treated as absent", field);
            }
        }

        map
    }
}

/// Load and relabel an external CSV dataset
///
/// # Errors
/// Returns an error if the file cannot be opened or is not valid CSV. Missing
/// columns and unparseable cells are not errors.
pub fn load_external_dataset(path: &Path, rules: &RuleTable) -> ModelResult<LabeledTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let columns = ColumnMap::from_headers(reader.headers()?);
    let mut records = Vec::new();

    for row in reader.records() {
        let row = row?;
        let mut params = PartialParameterSet::new();
        for field in Field::ALL {
            let value = columns.fields[field.index()]
                .and_then(|pos| row.get(pos))
                .and_then(parse_cell);
            params.set(field, value);
        }

        let ground_truth = columns
            .ground_truth
            .as_ref()
            .and_then(|(pos, name)| row.get(*pos).and_then(|raw| ground_truth_value(name, raw)));

        records.push(ScoredRecord::labeled(params, ground_truth, rules));
    }

    let incomplete = records.iter().filter(|r| !r.params.is_complete()).count();
    info!(
        "Loaded {} rows from {} ({} incomplete)",
        records.len(),
        path.display(),
        incomplete
    );

    Ok(LabeledTable::new(records))
}
