//! wqi-model configuration
//!
//! Sections read from the shared `wqi.toml`: common keys plus `[synthesis]`,
//! `[ensemble]` and `[training]`. Server-only sections are ignored.

use crate::ensemble::EnsembleConfig;
use crate::synthesis::SynthesisConfig;
use crate::training::TrainingConfig;
use serde::{Deserialize, Serialize};
use wqi_common::config::CommonConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(flatten)]
    pub common: CommonConfig,

    #[serde(default)]
    pub synthesis: SynthesisConfig,

    #[serde(default)]
    pub ensemble: EnsembleConfig,

    #[serde(default)]
    pub training: TrainingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wqi_common::Field;

    #[test]
    fn test_sections_parse_with_partial_overrides() {
        let config: ModelConfig = toml::from_str(
            r#"
root_folder = "/srv/wqi"

[rules.nitrate]
weight = 0.2

[ensemble]
cv_folds = 4

[ensemble.forest]
n_trees = 50

[training]
seed = 9

[server]
port = 8080
"#,
        )
        .unwrap();

        assert_eq!(config.common.root_folder.as_deref(), Some(std::path::Path::new("/srv/wqi")));
        assert_eq!(config.ensemble.cv_folds, 4);
        assert_eq!(config.ensemble.forest.n_trees, 50);
        assert_eq!(config.ensemble.forest.max_depth, 12);
        assert_eq!(config.ensemble.boosting.n_rounds, 400);
        assert_eq!(config.training.seed, 9);
        assert_eq!(config.training.test_fraction, 0.2);
        assert_eq!(config.synthesis.rows, 4000);

        let rules = config.common.rule_table().unwrap();
        assert!(rules.rule(Field::Nitrate).weight > rules.rule(Field::Chlorine).weight);
    }
}
