//! Mapper: matches a generated scene against the scene library and resolves
//! the strategies configured for the match.

use std::collections::HashMap;

use crate::config::AdaptConfig;
use crate::error::{AdaptError, Result};
use crate::scene::{Scene, SceneKind};
use crate::strategy::{Strategy, StrategyKind};

#[derive(Debug, Clone)]
pub struct Mapper {
    scenes: Vec<Scene>,
    strategies: Vec<Strategy>,
    /// Strategy indexes per scene, parallel to `scenes`.
    relations: Vec<Vec<usize>>,
}

impl Mapper {
    /// Resolve the scene-to-strategy mapping of `config` by name.
    ///
    /// Every library scene must map to at least one known strategy.
    pub fn new(config: &AdaptConfig) -> Result<Self> {
        if config.strategies.is_empty() {
            return Err(AdaptError::Config("strategy library is empty".into()));
        }

        let mut strategy_idx = HashMap::with_capacity(config.strategies.len());
        for (i, s) in config.strategies.iter().enumerate() {
            if let StrategyKind::StripedMap {
                build_concurrency: 0,
            } = s.kind
            {
                return Err(AdaptError::Config(format!(
                    "strategy {} has zero build concurrency",
                    s.name
                )));
            }
            if strategy_idx.insert(s.name.as_str(), i).is_some() {
                return Err(AdaptError::Config(format!("duplicate strategy {}", s.name)));
            }
        }

        let mut mapped: HashMap<&str, &[String]> = HashMap::with_capacity(config.mapping.len());
        for entry in &config.mapping {
            mapped.insert(entry.scene.as_str(), &entry.strategies);
        }

        let mut relations = Vec::with_capacity(config.scenes.len());
        for (i, scene) in config.scenes.iter().enumerate() {
            if config.scenes[..i].iter().any(|s| s.name == scene.name) {
                return Err(AdaptError::Config(format!("duplicate scene {}", scene.name)));
            }
            let names = mapped.get(scene.name.as_str()).copied().unwrap_or_default();
            if names.is_empty() {
                return Err(AdaptError::Config(format!(
                    "scene {} has no mapped strategy",
                    scene.name
                )));
            }
            let resolved = names
                .iter()
                .map(|n| {
                    strategy_idx.get(n.as_str()).copied().ok_or_else(|| {
                        AdaptError::Config(format!(
                            "scene {} maps to unknown strategy {}",
                            scene.name, n
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            relations.push(resolved);
        }

        Ok(Self {
            scenes: config.scenes.clone(),
            strategies: config.strategies.clone(),
            relations,
        })
    }

    /// First library scene, in configured order, that contains `generated`.
    pub fn match_scene(&self, generated: &Scene) -> Result<Option<&Scene>> {
        if generated.kind != SceneKind::Generated {
            return Err(AdaptError::Mismatch(format!(
                "scene {} is a library scene, not a generated one",
                generated.name
            )));
        }
        Ok(self.scenes.iter().find(|lib| lib.contains(generated)))
    }

    /// Preferred strategy of a library scene.
    pub fn get_strategy(&self, matched: &Scene) -> Result<&Strategy> {
        let idx = self
            .scenes
            .iter()
            .position(|s| s.name == matched.name)
            .ok_or_else(|| {
                AdaptError::Config(format!("scene {} is not in the library", matched.name))
            })?;
        self.relations[idx]
            .first()
            .and_then(|&i| self.strategies.get(i))
            .ok_or_else(|| AdaptError::Config(format!("scene {} has no strategy", matched.name)))
    }

    /// Used when no library scene matches.
    pub fn default_strategy(&self) -> &Strategy {
        // Non-empty, checked in `new`.
        &self.strategies[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SCENE_BALANCED, STRATEGY_STRIPED};

    #[test]
    fn unmapped_scene_fails_construction() {
        let mut cfg = AdaptConfig::default();
        cfg.mapping.retain(|m| m.scene != SCENE_BALANCED);
        let err = Mapper::new(&cfg).unwrap_err();
        assert!(matches!(err, AdaptError::Config(msg) if msg.contains(SCENE_BALANCED)));
    }

    #[test]
    fn library_probe_is_a_mismatch() {
        let cfg = AdaptConfig::default();
        let mapper = Mapper::new(&cfg).unwrap();
        let probe = cfg.scenes[1].clone();
        assert!(matches!(
            mapper.match_scene(&probe),
            Err(AdaptError::Mismatch(_))
        ));
    }

    #[test]
    fn default_is_first_library_strategy() {
        let mapper = Mapper::new(&AdaptConfig::default()).unwrap();
        assert_eq!(mapper.default_strategy().name, STRATEGY_STRIPED);
    }
}
