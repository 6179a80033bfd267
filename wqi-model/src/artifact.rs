//! Trained model artifact
//!
//! A single JSON document: format version, training metadata and the fitted
//! ensemble. Saves go through a sibling temp file and a rename so a reader
//! never sees a half-written model.

use crate::ensemble::TrainedEnsemble;
use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct ArtifactRef<'a> {
    format_version: u32,
    #[serde(flatten)]
    ensemble: &'a TrainedEnsemble,
}

#[derive(Deserialize)]
struct ArtifactOwned {
    format_version: u32,
    #[serde(flatten)]
    ensemble: TrainedEnsemble,
}

pub fn save(path: &Path, ensemble: &TrainedEnsemble) -> ModelResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("json.tmp");
    {
        let mut writer = BufWriter::new(fs::File::create(&tmp)?);
        serde_json::to_writer(
            &mut writer,
            &ArtifactRef {
                format_version: FORMAT_VERSION,
                ensemble,
            },
        )?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;

    info!("Model artifact written to {}", path.display());
    Ok(())
}

/// Load and structurally validate an artifact
///
/// # Errors
/// `Artifact` when the file is missing, has an unknown format version or
/// fails validation; `Json` when it does not parse.
pub fn load(path: &Path) -> ModelResult<TrainedEnsemble> {
    let file = fs::File::open(path).map_err(|e| {
        ModelError::Artifact(format!("cannot open model artifact {}: {}", path.display(), e))
    })?;
    let artifact: ArtifactOwned = serde_json::from_reader(BufReader::new(file))?;

    if artifact.format_version != FORMAT_VERSION {
        return Err(ModelError::Artifact(format!(
            "unsupported artifact format version {} (expected {})",
            artifact.format_version, FORMAT_VERSION
        )));
    }
    artifact.ensemble.model.validate()?;

    let meta = &artifact.ensemble.metadata;
    info!(
        "Loaded model trained {} (R2 {:.4}, MAE {:.3}, {} training rows)",
        wqi_common::time::format_timestamp(&meta.trained_at),
        meta.r2,
        meta.mae,
        meta.train_rows
    );
    Ok(artifact.ensemble)
}
