//! reconfig-metadata: the runtime configuration handed to the store.
//!
//! `RuntimeConfig` is an insertion-ordered key/value set built during one
//! orchestration pass. It must validate (every required key present,
//! no empty value) before `MetadataEmitter` renders it as `KEY=value`
//! lines for the store's launcher.

pub mod emitter;
pub mod keys;
pub mod runtime_config;

pub use emitter::MetadataEmitter;
pub use runtime_config::RuntimeConfig;
