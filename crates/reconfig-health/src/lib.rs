//! reconfig-health: member liveness probing.
//!
//! A probe classifies one member as `Healthy`, `Unhealthy` or
//! `Indeterminate`. Members that have not advertised a client URL yet are
//! `Indeterminate` without any network call; every transport failure is
//! folded into `Unhealthy`, so probing never fails.

pub mod checker;

pub use checker::{HealthProber, HttpHealthProber, health_flag};
