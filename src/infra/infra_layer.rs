// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "folders/mod.rs"]
pub mod folders;

#[path = "graph/mod.rs"]
pub mod graph;
