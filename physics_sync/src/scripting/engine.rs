//! Rhai engine wrapper with script caching
//!
//! Implements the physics hook boundary by calling the matching function in
//! an entity's script, when the script defines it.

use super::components::ScriptRef;
use super::hooks::{ScriptHook, ScriptHooks};
use crate::config::AssetConfig;
use crate::error::ScriptError;
use rhai::{Dynamic, Engine, Scope, AST};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Hook functions a script may define, with their parameter counts
const HOOK_FUNCTIONS: [(&str, usize); 5] = [
    ("on_collision_begin", 2),
    ("on_collision_end", 2),
    ("on_trigger_begin", 2),
    ("on_trigger_end", 2),
    ("on_raycast_collision", 1),
];

/// Cached script data
#[derive(Clone)]
struct CachedScript {
    ast: AST,
    /// Hook functions defined with the expected arity
    defined_hooks: HashSet<&'static str>,
}

/// Script engine with caching
pub struct ScriptEngine {
    /// The Rhai engine instance
    engine: Engine,
    /// Compiled scripts; `None` marks a script that failed to load
    cache: HashMap<String, Option<CachedScript>>,
    /// Asset configuration for loading scripts
    asset_config: AssetConfig,
}

impl ScriptEngine {
    /// Create a new script engine with default asset configuration
    pub fn new() -> Self {
        Self::with_config(AssetConfig::default())
    }

    /// Create a new script engine with custom asset configuration
    pub fn with_config(asset_config: AssetConfig) -> Self {
        let mut engine = Engine::new();

        // Configure engine for safety
        engine.set_max_expr_depths(100, 100);
        engine.set_max_call_levels(50);
        engine.set_max_operations(100_000);
        engine.set_max_string_size(10_000);
        engine.set_max_array_size(10_000);
        engine.set_max_map_size(1_000);
        engine.disable_symbol("eval");

        Self {
            engine,
            cache: HashMap::new(),
            asset_config,
        }
    }

    /// Mutable access to the engine, e.g. to register native functions
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Load and compile a script by name from the configured scripts directory
    pub fn load_script(&mut self, script_name: &str) -> Result<(), ScriptError> {
        if self.is_loaded(script_name) {
            debug!(script_name = script_name, "Script already cached");
            return Ok(());
        }

        let path = self.asset_config.script_path(script_name)?;
        debug!(script_name = script_name, path = ?path, "Loading script");

        let source = std::fs::read_to_string(&path).map_err(|source| ScriptError::Read {
            name: script_name.to_string(),
            source,
        })?;
        self.load_script_source(script_name, &source)
    }

    /// Compile and cache a script from source text
    pub fn load_script_source(&mut self, script_name: &str, source: &str) -> Result<(), ScriptError> {
        let ast = self.engine.compile(source).map_err(|e| {
            let position = e.position();
            ScriptError::Compile {
                name: script_name.to_string(),
                line: position.line().unwrap_or(0),
                column: position.position().unwrap_or(0),
                message: e.to_string(),
            }
        })?;

        let defined_hooks: HashSet<&'static str> = HOOK_FUNCTIONS
            .iter()
            .filter(|(name, arity)| {
                ast.iter_functions()
                    .any(|f| f.name == *name && f.params.len() == *arity)
            })
            .map(|(name, _)| *name)
            .collect();

        debug!(
            script_name = script_name,
            hooks = ?defined_hooks,
            "Script hook functions detected"
        );

        self.cache.insert(
            script_name.to_string(),
            Some(CachedScript { ast, defined_hooks }),
        );
        Ok(())
    }

    /// Check if a script is compiled and cached
    pub fn is_loaded(&self, script_name: &str) -> bool {
        matches!(self.cache.get(script_name), Some(Some(_)))
    }

    /// Check whether a loaded script defines a hook function
    pub fn has_hook(&self, script_name: &str, function: &str) -> bool {
        match self.cache.get(script_name) {
            Some(Some(cached)) => cached.defined_hooks.contains(function),
            _ => false,
        }
    }

    /// Call the function implementing `hook` in a loaded script
    ///
    /// Returns `Ok(false)` if the script is not loaded or does not define it.
    pub fn call_hook(&self, script_name: &str, hook: ScriptHook) -> Result<bool, ScriptError> {
        let Some(Some(cached)) = self.cache.get(script_name) else {
            return Ok(false);
        };
        let function = hook.fn_name();
        if !cached.defined_hooks.contains(function) {
            return Ok(false);
        }

        let mut scope = Scope::new();
        let entity = hook.entity().0 as i64;
        let result = match hook.other() {
            Some(other) => self.engine.call_fn::<Dynamic>(
                &mut scope,
                &cached.ast,
                function,
                (entity, other.0 as i64),
            ),
            None => self
                .engine
                .call_fn::<Dynamic>(&mut scope, &cached.ast, function, (entity,)),
        };

        result.map(|_| true).map_err(|e| ScriptError::Call {
            name: script_name.to_string(),
            function,
            message: e.to_string(),
        })
    }

    /// Clear the script cache
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Get the number of cached scripts, including failed ones
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptHooks for ScriptEngine {
    fn invoke(&mut self, script: &ScriptRef, hook: ScriptHook) {
        if !self.cache.contains_key(&script.name) {
            if let Err(err) = self.load_script(&script.name) {
                warn!(script = %script.name, error = %err, "Failed to load script");
                // Remember the failure so every contact doesn't retry the file
                self.cache.insert(script.name.clone(), None);
                return;
            }
        }

        if let Err(err) = self.call_hook(&script.name, hook) {
            warn!(script = %script.name, error = %err, "Script hook failed");
        }
    }
}
