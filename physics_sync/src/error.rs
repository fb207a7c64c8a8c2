//! Error types for the physics synchronization bridge

use crate::core::entity::EntityId;

/// Errors returned by the public physics API
#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    /// No entity with this UUID exists in the scene
    #[error("Entity {0} not found in scene")]
    EntityNotFound(EntityId),

    /// The entity exists but lacks a component the operation requires
    #[error("Entity {entity} has no {component} component")]
    MissingComponent {
        entity: EntityId,
        component: &'static str,
    },

    /// A simulation-only operation was called between runs
    #[error("Physics simulation is not running")]
    SimulationNotRunning,

    /// IO error while reading or writing configuration
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file
    #[error("Invalid physics settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised at the script-runtime boundary
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Script file could not be read
    #[error("Failed to read script '{name}': {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Script failed to compile
    #[error("{name}:{line}:{column} - {message}")]
    Compile {
        name: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// Script function raised an error while running
    #[error("{name}: {function} failed - {message}")]
    Call {
        name: String,
        function: &'static str,
        message: String,
    },

    /// Script name would escape the scripts directory
    #[error("Invalid script name: {0}")]
    InvalidName(String),
}
