//! The adaptor: runs the decision pipeline for one operator.

use std::sync::Arc;

use crate::catalog::StatsCatalog;
use crate::config::AdaptConfig;
use crate::error::{AdaptError, Result};
use crate::hardware::HardwareProbe;
use crate::mapper::Mapper;
use crate::param::{InnerRelation, ParamGenerator};
use crate::registry::Registry;
use crate::scene::Scene;
use crate::scene_gen::SceneGenerator;
use crate::strategy::Strategy;

/// Everything a registered constructor may draw on.
#[derive(Clone)]
pub struct AdaptContext {
    pub catalog: Arc<dyn StatsCatalog>,
    pub hardware: Arc<dyn HardwareProbe>,
    /// Build-side base table, if the inner input is one.
    pub inner: Option<InnerRelation>,
    pub config: Arc<AdaptConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptorState {
    Uninitialized,
    Ready,
    Decided,
}

struct Pipeline {
    params: Box<dyn ParamGenerator>,
    scenes: Box<dyn SceneGenerator>,
    mapper: Mapper,
}

#[derive(Default)]
pub struct Adaptor {
    pipeline: Option<Pipeline>,
    strategy: Option<Strategy>,
    last_scene: Option<Scene>,
}

impl Adaptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AdaptorState {
        match (&self.pipeline, &self.strategy) {
            (None, _) => AdaptorState::Uninitialized,
            (Some(_), None) => AdaptorState::Ready,
            (Some(_), Some(_)) => AdaptorState::Decided,
        }
    }

    /// Wire up the generators registered under `name` and a mapper over the
    /// context's config. Clears any previous decision.
    pub fn init_adaptor(&mut self, registry: &Registry, name: &str, ctx: &AdaptContext) -> Result<()> {
        let ctor = registry.lookup(name)?;
        let mapper = Mapper::new(&ctx.config)?;
        let (params, scenes) = ctor(ctx);
        self.pipeline = Some(Pipeline {
            params,
            scenes,
            mapper,
        });
        self.strategy = None;
        self.last_scene = None;
        Ok(())
    }

    fn pipeline(&self) -> Result<&Pipeline> {
        self.pipeline
            .as_ref()
            .ok_or_else(|| AdaptError::Config("adaptor used before init_adaptor".into()))
    }

    /// Sample, classify and pick a strategy. The first failing stage aborts
    /// the decision. When no library scene matches, the default strategy is
    /// used. A failed call leaves no decision behind.
    pub fn adapt(&mut self) -> Result<Strategy> {
        self.strategy = None;
        self.last_scene = None;
        let pipeline = self.pipeline()?;
        #[cfg(feature = "tracing")]
        tracing::debug!("adapting hash table strategy");

        let hw = pipeline.params.system_state()?;
        let stats = pipeline.params.statistics()?;
        let scene = pipeline.scenes.gen_scene(&hw, &stats);

        let chosen = match pipeline.mapper.match_scene(&scene)? {
            Some(matched) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(scene = %matched.name, "matched library scene");
                pipeline.mapper.get_strategy(matched)?
            }
            None => {
                #[cfg(feature = "tracing")]
                tracing::info!("no library scene contains the generated scene, using default strategy");
                pipeline.mapper.default_strategy()
            }
        };
        let strategy = chosen.sized_for(scene.est_cardinality);
        #[cfg(feature = "tracing")]
        tracing::info!(
            strategy = %strategy.name,
            est_cardinality = strategy.est_cardinality,
            "chose strategy"
        );

        self.last_scene = Some(scene);
        self.strategy = Some(strategy.clone());
        Ok(strategy)
    }

    /// Like `adapt`, but recovers from sampling and catalog failures by
    /// returning the default strategy sized for `fallback_cardinality`.
    pub fn adapt_or_default(&mut self, fallback_cardinality: u64) -> Result<Strategy> {
        match self.adapt() {
            Ok(strategy) => Ok(strategy),
            Err(err) if err.is_input_error() => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %err, "adaptation failed, falling back to default strategy");
                #[cfg(not(feature = "tracing"))]
                let _ = err;
                let strategy = self
                    .pipeline()?
                    .mapper
                    .default_strategy()
                    .sized_for(fallback_cardinality);
                self.last_scene = None;
                self.strategy = Some(strategy.clone());
                Ok(strategy)
            }
            Err(err) => Err(err),
        }
    }

    /// The last decision, if any.
    pub fn strategy(&self) -> Option<&Strategy> {
        self.strategy.as_ref()
    }

    pub fn last_scene(&self) -> Option<&Scene> {
        self.last_scene.as_ref()
    }
}
