use std::{collections::HashMap, env, fs, path::PathBuf, str::FromStr};

use color_eyre::Result;
use directories::BaseDirs;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize, de::Deserializer};

use crate::action::{Action, KeyChord};

const CONFIG: &str = include_str!("../.config/config.json5");

/// One palette entry: the name sent to the color-mark store and the hex used for rendering
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub config_dir: PathBuf,
}

/// Static description of one grid instance
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GridConfig {
    /// Field ids in display order
    pub fields: Vec<String>,
    pub read_only: Vec<String>,
    pub number_fields: Vec<String>,
    pub date_fields: Vec<String>,
    /// Fields offered in the alias editor
    pub alias_fields: Vec<String>,
    pub page_size: usize,
    pub default_column_width: f64,
    pub min_column_width: f64,
    /// Pointer travel in pixels, on either axis, before a press becomes a drag
    pub drag_threshold: f64,
    /// Preference key under which column visibility is persisted
    pub visibility_key: String,
    pub palette: Vec<PaletteEntry>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            read_only: Vec::new(),
            number_fields: Vec::new(),
            date_fields: Vec::new(),
            alias_fields: Vec::new(),
            page_size: 500,
            default_column_width: 120.0,
            min_column_width: 40.0,
            drag_threshold: 5.0,
            visibility_key: "visibleColumns".to_string(),
            palette: crate::core::color::default_palette(),
        }
    }
}

impl GridConfig {
    /// Minimal config over the given fields, everything else default
    pub fn with_fields<S: AsRef<str>>(fields: &[S]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.as_ref().to_string()).collect(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default, flatten)]
    pub config: AppConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub keybindings: KeyBindings,
}

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref DATA_FOLDER: Option<PathBuf> =
        env::var(format!("{}_DATA", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
    pub static ref CONFIG_FOLDER: Option<PathBuf> =
        env::var(format!("{}_CONFIG", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
}

impl Config {
    /// Embedded defaults only
    pub fn embedded() -> Result<Self> {
        Ok(json5::from_str(CONFIG)?)
    }

    /// Load the user config layered over the embedded defaults.
    ///
    /// Without an explicit path the file at `~/.datagrid-config.json5` is used,
    /// written from the defaults first if it does not exist.
    pub fn from_path(config_path: Option<&PathBuf>) -> Result<Self> {
        let default_config = Self::embedded()?;
        let data_dir = get_data_dir();
        let config_dir = get_config_dir();
        let mut builder = config::Config::builder()
            .set_default("data_dir", data_dir.to_string_lossy().to_string())?
            .set_default("config_dir", config_dir.to_string_lossy().to_string())?;

        let home_cfg = default_home_config_path();
        let selected_path = if let Some(p) = config_path {
            expand_tilde(p)
        } else {
            if !home_cfg.exists() {
                if let Some(parent) = home_cfg.parent() {
                    let _ = fs::create_dir_all(parent);
                }
                if let Err(e) = fs::write(&home_cfg, CONFIG) {
                    tracing::warn!("Could not write default config to {}: {e}", home_cfg.display());
                }
            }
            home_cfg
        };

        builder = builder.add_source(
            config::File::from(selected_path)
                .format(config::FileFormat::Json5)
                .required(false),
        );

        let mut cfg: Self = builder.build()?.try_deserialize()?;

        if cfg.grid.fields.is_empty() {
            cfg.grid = default_config.grid.clone();
        }
        for (chord, action) in default_config.keybindings.0.iter() {
            cfg.keybindings.0.entry(chord.clone()).or_insert(*action);
        }

        Ok(cfg)
    }

    /// Resolve the action bound to a chord
    pub fn action_for_chord(&self, chord: &KeyChord) -> Option<Action> {
        self.keybindings.0.get(chord).copied()
    }

    /// Find the chord for a given action
    pub fn chord_for_action(&self, action: Action) -> Option<String> {
        self.keybindings
            .0
            .iter()
            .find(|(_, a)| **a == action)
            .map(|(chord, _)| chord.to_string())
    }
}

fn expand_tilde(path: &PathBuf) -> PathBuf {
    if let Some(s) = path.to_str() {
        if s.starts_with('~') {
            if let Some(base) = BaseDirs::new() {
                return PathBuf::from(s.replacen('~', base.home_dir().to_str().unwrap_or(""), 1));
            }
        }
    }
    path.clone()
}

fn default_home_config_path() -> PathBuf {
    if let Some(base) = BaseDirs::new() {
        return base.home_dir().join(".datagrid-config.json5");
    }
    PathBuf::from(".datagrid-config.json5")
}

pub fn get_data_dir() -> PathBuf {
    if let Some(s) = DATA_FOLDER.clone() {
        s
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn get_config_dir() -> PathBuf {
    if let Some(s) = CONFIG_FOLDER.clone() {
        s
    } else {
        PathBuf::from(".").join(".config")
    }
}

#[derive(Clone, Debug, Default)]
pub struct KeyBindings(pub HashMap<KeyChord, Action>);

impl<'de> Deserialize<'de> for KeyBindings {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parsed_map = HashMap::<String, Action>::deserialize(deserializer)?;
        let mut bindings = HashMap::with_capacity(parsed_map.len());
        for (raw, action) in parsed_map {
            let chord = KeyChord::from_str(&raw).map_err(serde::de::Error::custom)?;
            bindings.insert(chord, action);
        }
        Ok(KeyBindings(bindings))
    }
}
