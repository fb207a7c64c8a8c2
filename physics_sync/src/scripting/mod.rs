//! Scripting boundary using Rhai
//!
//! The physics bridge only knows the `ScriptHooks` trait. `ScriptEngine`
//! implements it by calling collision, trigger and raycast functions in the
//! entity's `.rhai` script.

pub mod components;
pub mod engine;
pub mod hooks;

pub use components::ScriptRef;
pub use engine::ScriptEngine;
pub use hooks::{NoScriptHooks, RecordingHooks, ScriptHook, ScriptHooks};

// Re-export commonly used types
pub use rhai::{Dynamic, EvalAltResult};
