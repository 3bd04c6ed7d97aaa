//! Infrastructure layer for the bridge.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `epos_core`, but MUST NOT be imported by the `application` layer outside
//! of tests.
//!
//! # Sub-modules
//!
//! - **`executor`** – implementations of `CommandExecutor`: a JSON-lines relay
//!   to a remote printer agent, an in-process simulated printer, and a
//!   recording executor for tests.
//!
//! - **`storage`** – TOML configuration file load/save.

pub mod executor;
pub mod storage;
