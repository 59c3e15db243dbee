//! Preset file locations.
//!
//! Programs live under `<root>/Emberwave/EmberSynth/bank<N>/program<NNN>.txt`
//! in two roots: a user-writable one (all saves go here) and a read-only
//! factory one. User files take precedence when loading. A flat
//! `programs/program<index>.txt` folder from early releases is recognized so
//! old sounds can be migrated into the bank layout.

use std::path::{Path, PathBuf};

pub const MANUFACTURER_DIR: &str = "Emberwave";
pub const PRODUCT_DIR: &str = "EmberSynth";
const LEGACY_DIR: &str = "programs";

pub const PROGRAMS_PER_BANK: usize = 128;

#[derive(Debug, Clone)]
pub struct PresetPaths {
    user_root: PathBuf,
    factory_root: PathBuf,
}

impl PresetPaths {
    /// Platform preset roots, or `None` when no user data directory exists.
    pub fn discover() -> Option<Self> {
        Some(Self {
            user_root: user_preset_root()?,
            factory_root: factory_preset_root(),
        })
    }

    /// Explicit roots, used by hosts with their own directory policy and by
    /// tests.
    pub fn with_roots(user_root: impl Into<PathBuf>, factory_root: impl Into<PathBuf>) -> Self {
        Self {
            user_root: user_root.into(),
            factory_root: factory_root.into(),
        }
    }

    pub fn user_program(&self, index: usize) -> PathBuf {
        product_dir(&self.user_root).join(slot_path(index))
    }

    pub fn factory_program(&self, index: usize) -> PathBuf {
        product_dir(&self.factory_root).join(slot_path(index))
    }

    /// Location a program had in the flat pre-bank layout.
    pub fn legacy_program(&self, index: usize) -> PathBuf {
        product_dir(&self.user_root)
            .join(LEGACY_DIR)
            .join(format!("program{index}.txt"))
    }
}

fn product_dir(root: &Path) -> PathBuf {
    root.join(MANUFACTURER_DIR).join(PRODUCT_DIR)
}

fn slot_path(index: usize) -> PathBuf {
    let bank = index / PROGRAMS_PER_BANK;
    let program = index % PROGRAMS_PER_BANK;
    PathBuf::from(format!("bank{bank}")).join(format!("program{program:03}.txt"))
}

fn user_preset_root() -> Option<PathBuf> {
    if cfg!(target_os = "macos") {
        dirs::home_dir().map(|home| home.join("Library/Audio/Presets"))
    } else {
        dirs::data_local_dir()
    }
}

fn factory_preset_root() -> PathBuf {
    if cfg!(target_os = "macos") {
        PathBuf::from("/Library/Audio/Presets")
    } else if cfg!(target_os = "windows") {
        std::env::var_os("ProgramData")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\ProgramData"))
    } else {
        PathBuf::from("/usr/share")
    }
}
