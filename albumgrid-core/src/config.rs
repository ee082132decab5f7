//! Persisted grid settings.
use std::path::Path;

use albumgrid_state::{GroupingMode, SortMode};
use serde::{Deserialize, Serialize};

const MIB: u64 = 1024 * 1024;

#[derive(Debug)]
/// An error that can occur when loading or saving the configuration.
pub enum ConfigError {
    /// The file could not be read or written.
    Io(std::io::Error),
    /// The file is not valid configuration.
    Parse(toml::de::Error),
    /// The configuration could not be serialized.
    Serialize(toml::ser::Error),
}
impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "parse error: {e}"),
            ConfigError::Serialize(e) => write!(f, "serialization error: {e}"),
        }
    }
}
impl std::error::Error for ConfigError {}
impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}
impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}
impl From<toml::ser::Error> for ConfigError {
    fn from(e: toml::ser::Error) -> Self {
        ConfigError::Serialize(e)
    }
}

/// Everything about the grid that survives a restart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    pub grouping: GroupingMode,
    /// Expression used when `grouping` is `custom`.
    pub grouping_pattern: String,
    pub sort: SortMode,
    /// Expression used when `sort` is `custom`.
    pub sort_pattern: String,
    pub descending: bool,
    /// Edge length of a thumbnail, in pixels.
    pub thumbnail_size: u32,
    /// Number of columns; 0 fits as many as the width allows.
    pub columns: u32,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
}
impl Default for GridConfig {
    fn default() -> Self {
        Self {
            grouping: GroupingMode::default(),
            grouping_pattern: "%album artist% - %album%".to_string(),
            sort: SortMode::default(),
            sort_pattern: "%album artist% - %year% - %album%".to_string(),
            descending: false,
            thumbnail_size: 160,
            columns: 0,
            layout: Layout::default(),
            cache: CacheConfig::default(),
            loader: LoaderConfig::default(),
        }
    }
}
impl GridConfig {
    pub const FILENAME: &str = "albumgrid.toml";

    pub const THUMBNAIL_SIZE_RANGE: std::ops::RangeInclusive<u32> = 32..=1024;
    pub const MAX_COLUMNS: u32 = 64;

    /// Loads the configuration, returning the defaults if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, toml::to_string(self)?)?;
        tracing::info!("saved config to {}", path.display());
        Ok(())
    }

    /// Clamps every setting into its supported range.
    pub fn validated(mut self) -> Self {
        self.thumbnail_size = clamp_logged(
            "thumbnail_size",
            self.thumbnail_size,
            *Self::THUMBNAIL_SIZE_RANGE.start(),
            *Self::THUMBNAIL_SIZE_RANGE.end(),
        );
        self.columns = clamp_logged("columns", self.columns, 0, Self::MAX_COLUMNS);
        self.layout.padding = clamp_logged("layout.padding", self.layout.padding, 0, 64);
        self.layout.label_height =
            clamp_logged("layout.label_height", self.layout.label_height, 0, 256);
        self.cache.budget_mb = self.cache.budget_mb.map(|mb| {
            clamp_logged(
                "cache.budget_mb",
                mb,
                CacheConfig::MIN_BUDGET_MB,
                CacheConfig::MAX_BUDGET_MB,
            )
        });
        if !(CacheConfig::MIN_AUTO_FRACTION..=CacheConfig::MAX_AUTO_FRACTION)
            .contains(&self.cache.auto_fraction)
        {
            let clamped = if self.cache.auto_fraction.is_nan() {
                CacheConfig::default().auto_fraction
            } else {
                self.cache.auto_fraction.clamp(
                    CacheConfig::MIN_AUTO_FRACTION,
                    CacheConfig::MAX_AUTO_FRACTION,
                )
            };
            tracing::warn!(
                "cache.auto_fraction {} out of range, using {clamped}",
                self.cache.auto_fraction
            );
            self.cache.auto_fraction = clamped;
        }
        self.loader.threads = clamp_logged("loader.threads", self.loader.threads, 1, 16);
        self
    }

    /// The width and height of one grid cell.
    pub fn item_size(&self) -> (u32, u32) {
        let width = self.thumbnail_size + 2 * self.layout.padding;
        (width, width + self.layout.label_height)
    }
}

fn clamp_logged<T: PartialOrd + Copy + std::fmt::Display>(
    name: &str,
    value: T,
    min: T,
    max: T,
) -> T {
    let clamped = if value < min {
        min
    } else if value > max {
        max
    } else {
        return value;
    };
    tracing::warn!("{name} {value} out of range, using {clamped}");
    clamped
}

/// Spacing around each cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Layout {
    /// Space on each side of the thumbnail, in pixels.
    pub padding: u32,
    /// Height reserved below the thumbnail for the title and subtitle, in pixels.
    pub label_height: u32,
}
impl Default for Layout {
    fn default() -> Self {
        Self {
            padding: 6,
            label_height: 40,
        }
    }
}

/// How much memory decoded thumbnails may use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Explicit budget in MiB. When absent, a share of available memory is used.
    pub budget_mb: Option<u64>,
    /// Share of available memory used when no explicit budget is set.
    pub auto_fraction: f64,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            budget_mb: None,
            auto_fraction: 0.0625,
        }
    }
}
impl CacheConfig {
    pub const MIN_BUDGET_MB: u64 = 1;
    pub const MAX_BUDGET_MB: u64 = 4096;
    pub const MIN_AUTO_FRACTION: f64 = 0.01;
    pub const MAX_AUTO_FRACTION: f64 = 0.5;
    /// Used when available memory can't be determined.
    const FALLBACK_BUDGET_MB: u64 = 256;
    /// Floor for auto-detected budgets.
    const MIN_AUTO_BUDGET_MB: u64 = 16;

    /// The budget in bytes, detecting available memory if no explicit budget is set.
    pub fn resolve_budget(&self) -> usize {
        let bytes = match self.budget_mb {
            Some(mb) => mb.clamp(Self::MIN_BUDGET_MB, Self::MAX_BUDGET_MB) * MIB,
            None => {
                let mut system = sysinfo::System::new();
                system.refresh_memory();
                let budget = Self::auto_budget(system.available_memory(), self.auto_fraction);
                tracing::info!(
                    "Thumbnail cache budget: {} MiB ({} MiB available)",
                    budget / MIB,
                    system.available_memory() / MIB
                );
                budget
            }
        };
        usize::try_from(bytes).unwrap_or(usize::MAX)
    }

    fn auto_budget(available_bytes: u64, fraction: f64) -> u64 {
        if available_bytes == 0 {
            return Self::FALLBACK_BUDGET_MB * MIB;
        }
        let fraction = fraction.clamp(Self::MIN_AUTO_FRACTION, Self::MAX_AUTO_FRACTION);
        ((available_bytes as f64 * fraction) as u64)
            .clamp(Self::MIN_AUTO_BUDGET_MB * MIB, Self::MAX_BUDGET_MB * MIB)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    /// Number of thumbnail decoding threads.
    pub threads: usize,
}
impl Default for LoaderConfig {
    fn default() -> Self {
        Self { threads: 2 }
    }
}
