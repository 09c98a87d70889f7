//! Configuration shared by every hyperplane component.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the data home used to locate the trash.
pub const DATA_HOME_ENV: &str = "HOST_XDG_DATA_HOME";

/// Context handed to resolvers, validators, the transfer engine and the tag projector.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct HyperplaneConfig {
    /// Home root. Tags are the directories directly below it.
    pub home: PathBuf,

    /// Explicit data home (the parent of `Trash/`).
    #[builder(default)]
    #[serde(default)]
    pub data_home: Option<PathBuf>,

    /// Whether views should show hidden entries.
    #[builder(default = "false")]
    #[serde(default)]
    pub show_hidden: bool,
}

impl HyperplaneConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.home {
            Some(ref home) if home.as_os_str().is_empty() => {
                Err("Home path cannot be empty".to_string())
            }
            Some(_) => Ok(()),
            None => Err("Home path is required".to_string()),
        }
    }
}

impl HyperplaneConfig {
    /// Create a new config builder.
    pub fn builder() -> HyperplaneConfigBuilder {
        HyperplaneConfigBuilder::default()
    }

    /// Create a config rooted at `home` with no data home override.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            data_home: None,
            show_hidden: false,
        }
    }

    /// Create a config rooted at `home`, picking up `HOST_XDG_DATA_HOME` if set.
    pub fn from_env(home: impl Into<PathBuf>) -> Self {
        let mut config = Self::new(home);
        config.data_home = std::env::var_os(DATA_HOME_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        config
    }

    /// The data home: the override if any, else the per-user data directory.
    pub fn data_home(&self) -> PathBuf {
        if let Some(ref data_home) = self.data_home {
            return data_home.clone();
        }

        dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
            .unwrap_or_else(|| self.home.join(".local").join("share"))
    }

    /// The freedesktop trash directory.
    pub fn trash_dir(&self) -> PathBuf {
        self.data_home().join("Trash")
    }

    /// Where trashed entries are stored.
    pub fn trash_files_dir(&self) -> PathBuf {
        self.trash_dir().join("files")
    }

    /// Where `.trashinfo` records are stored.
    pub fn trash_info_dir(&self) -> PathBuf {
        self.trash_dir().join("info")
    }

    /// The directory representing `tag`.
    pub fn tag_dir(&self, tag: &str) -> PathBuf {
        self.home.join(tag)
    }

    /// Check if an entry named `name` should be visible.
    pub fn should_show(&self, name: &str) -> bool {
        self.show_hidden || !name.starts_with('.')
    }
}
