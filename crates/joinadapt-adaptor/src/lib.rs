#![forbid(unsafe_code)]
//! joinadapt-adaptor: decide how a hash join materializes its build side.
//!
//! Pipeline (one decision per join operator):
//!
//! ```text
//! ParamGenerator ──(HardwareSnapshot, StatsSnapshot)──► SceneGenerator
//!        ──(generated Scene)──► Mapper::match_scene ──► Mapper::get_strategy
//!        ──(Strategy)──► Strategy::init(join operator)
//! ```
//!
//! The scene library, strategy library and their mapping are plain data in
//! `AdaptConfig`, built once at startup and shared by `Arc`.

pub mod adaptor;
pub mod catalog;
pub mod config;
pub mod error;
pub mod hardware;
pub mod mapper;
pub mod param;
pub mod registry;
pub mod scene;
pub mod scene_gen;
pub mod snapshot;
pub mod strategy;

pub use adaptor::{AdaptContext, Adaptor, AdaptorState};
pub use catalog::{MemoryCatalog, StatsCatalog};
pub use config::{AdaptConfig, SceneStrategies};
pub use error::{AdaptError, Result};
pub use hardware::{FixedProbe, HardwareProbe, SysinfoProbe};
pub use mapper::Mapper;
pub use param::{HashJoinParamGenerator, InnerRelation, ParamGenerator};
pub use registry::{Registry, HASH_JOIN};
pub use scene::{Interval, Scene, SceneKind};
pub use scene_gen::{balance_degree, HashJoinSceneGenerator, SceneGenerator};
pub use snapshot::{HardwareSnapshot, KeyStats, StatsSnapshot};
pub use strategy::{JoinOperator, Strategy, StrategyKind};
