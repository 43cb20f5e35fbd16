use crate::layout::Layout;
use crate::stages::ExternalTools;
use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub workers: Option<usize>,
    pub temp_dir: Option<PathBuf>,
    pub tools: ExternalTools,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("/mnt/music/flac"),
            output_path: PathBuf::from("/mnt/music/mp3"),
            workers: None,
            temp_dir: None,
            tools: ExternalTools::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new() -> Result<Self> {
        let base = BaseDirs::new().context("unable to resolve home directory")?;
        let path = base.home_dir().join(".config").join("flacjack.yaml");
        Ok(Self { path })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("read config {}", self.path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("parse config {}", self.path.display()))?;
        Ok(config)
    }
}

/// Validated, immutable run settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub layout: Layout,
    pub workers: usize,
    pub temp_dir: Option<PathBuf>,
    pub tools: ExternalTools,
}

impl Settings {
    pub fn from_config(config: Config) -> Result<Self> {
        let workers = match config.workers {
            Some(0) => anyhow::bail!("workers must be at least 1"),
            Some(n) => n,
            None => default_workers(),
        };
        let meta = fs::metadata(&config.input_path)
            .with_context(|| format!("read input path {}", config.input_path.display()))?;
        anyhow::ensure!(
            meta.is_dir(),
            "input path {} is not a directory",
            config.input_path.display()
        );
        if let Some(dir) = &config.temp_dir {
            anyhow::ensure!(dir.is_dir(), "temp dir {} is not a directory", dir.display());
        }
        Ok(Self {
            layout: Layout::new(config.input_path, config.output_path),
            workers,
            temp_dir: config.temp_dir,
            tools: config.tools,
        })
    }
}

pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
