//! Name-keyed constructors for (parameter generator, scene generator) pairs.
//!
//! Populate the registry before any adaptor is initialised from it; it is
//! then shared read-only.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::adaptor::AdaptContext;
use crate::error::{AdaptError, Result};
use crate::param::{HashJoinParamGenerator, ParamGenerator};
use crate::scene_gen::{HashJoinSceneGenerator, SceneGenerator};

pub const HASH_JOIN: &str = "hash_join";

pub type GeneratorPair = (Box<dyn ParamGenerator>, Box<dyn SceneGenerator>);

pub type Constructor = Arc<dyn Fn(&AdaptContext) -> GeneratorPair + Send + Sync>;

#[derive(Clone, Default)]
pub struct Registry {
    map: HashMap<String, Constructor>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.names();
        names.sort_unstable();
        f.debug_struct("Registry").field("names", &names).finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the hash join generators under `HASH_JOIN`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(HASH_JOIN, |ctx: &AdaptContext| -> GeneratorPair {
            (
                Box::new(HashJoinParamGenerator::new(
                    ctx.catalog.clone(),
                    ctx.hardware.clone(),
                    ctx.inner.clone(),
                    ctx.config.analyze_before_read,
                )),
                Box::new(HashJoinSceneGenerator),
            )
        });
        registry
    }

    /// Register `name`, replacing any previous constructor.
    pub fn register<F>(&mut self, name: impl Into<String>, ctor: F)
    where
        F: Fn(&AdaptContext) -> GeneratorPair + Send + Sync + 'static,
    {
        self.map.insert(name.into(), Arc::new(ctor));
    }

    pub fn lookup(&self, name: &str) -> Result<Constructor> {
        self.map
            .get(name)
            .cloned()
            .ok_or_else(|| AdaptError::Config(format!("no such registered name: {}", name)))
    }

    pub fn names(&self) -> Vec<&str> {
        self.map.keys().map(String::as_str).collect()
    }
}
