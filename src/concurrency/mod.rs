// src/concurrency/mod.rs
//
// SPDX-License-Identifier: Apache-2.0 OR MIT
//
// Bounded fan-out building blocks. Each piece is usable on its own:
// - `gate`: fixed-size admission gate (worker budget)
// - `context`: shared cancellable run context holding the first failure
// - `group`: join barrier for spawned tasks

pub mod context;
pub mod gate;
pub mod group;

pub use context::{FirstFailure, RunContext};
pub use gate::{AdmissionGate, AdmissionPermit};
pub use group::TaskGroup;
