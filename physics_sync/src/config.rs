//! Configuration types for the physics bridge

use crate::error::{PhysicsError, ScriptError};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration for script asset paths
#[derive(Debug, Clone)]
pub struct AssetConfig {
    /// Root directory for all assets
    pub asset_root: PathBuf,
    /// Directory name for scripts (relative to asset_root)
    pub scripts_dir: String,
}

impl AssetConfig {
    /// Create a new AssetConfig with custom paths
    pub fn new(asset_root: PathBuf, scripts_dir: String) -> Self {
        debug!(
            asset_root = ?asset_root,
            scripts_dir = scripts_dir,
            "Creating new AssetConfig"
        );
        Self {
            asset_root,
            scripts_dir,
        }
    }

    /// Get the full path to a script file
    pub fn script_path(&self, name: &str) -> Result<PathBuf, ScriptError> {
        if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
            return Err(ScriptError::InvalidName(name.to_string()));
        }
        let path = self
            .asset_root
            .join(&self.scripts_dir)
            .join(format!("{name}.rhai"));
        debug!(name = name, path = ?path, "Generated script path");
        Ok(path)
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            scripts_dir: "scripts".to_string(),
        }
    }
}

/// Friction/restitution used for shapes whose entity carries no material
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MaterialSettings {
    /// Not read by the backend; see `PhysicsMaterial::static_friction`
    pub static_friction: f32,
    pub dynamic_friction: f32,
    pub restitution: f32,
}

impl Default for MaterialSettings {
    fn default() -> Self {
        Self {
            static_friction: 1.0,
            dynamic_friction: 1.0,
            restitution: 1.0,
        }
    }
}

/// Scene-level physics tunables
///
/// Gravity and solver iteration counts are pushed into the backend at the
/// start of every fixed tick, so they can be edited while simulating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Gravity vector in m/s²
    pub gravity: Vec3,
    /// Duration of one simulation step in seconds
    pub fixed_timestep: f32,
    /// Upper bound on steps run for a single frame
    pub max_substeps: u32,
    /// Solver position iterations
    pub position_iterations: u32,
    /// Solver velocity iterations
    pub velocity_iterations: u32,
    /// Fall speed a grounded character controller is re-armed with,
    /// as a fraction of `gravity.y`
    pub controller_landing_factor: f32,
    /// Prediction distance used for `ContinuousSpeculative` bodies
    pub soft_ccd_prediction: f32,
    /// Material applied when an entity has no `PhysicsMaterial`
    pub default_material: MaterialSettings,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fixed_timestep: 1.0 / 100.0,
            max_substeps: 8,
            position_iterations: 8,
            velocity_iterations: 2,
            controller_landing_factor: 0.01,
            soft_ccd_prediction: 0.5,
            default_material: MaterialSettings::default(),
        }
    }
}

impl PhysicsSettings {
    /// Load settings from a JSON file; missing fields keep their defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PhysicsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&content)?;
        info!(path = ?path, "Loaded physics settings");
        Ok(settings)
    }

    /// Save settings as pretty-printed JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), PhysicsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
