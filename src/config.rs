// Copyright 2026 Folio Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;

use crate::controller::DEFAULT_PAGE_SIZE;
use crate::manifest::ManifestSource;
use crate::render::DEFAULT_PREVIEW_CHARS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub manifest_path: String,
    pub threshold: f32,
    pub min_match_char_length: usize,
    pub page_size: usize,
    pub summary_preview_chars: usize,
    pub share_base_url: String,
    pub publish_flag: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest_path: "manifest.json".to_string(),
            threshold: 0.5,
            min_match_char_length: 2,
            page_size: DEFAULT_PAGE_SIZE,
            summary_preview_chars: DEFAULT_PREVIEW_CHARS,
            share_base_url: "index.html".to_string(),
            publish_flag: None,
        }
    }
}

impl Config {
    fn sanitize(mut self) -> Self {
        if !self.threshold.is_finite() {
            self.threshold = Config::default().threshold;
        }
        self.threshold = self.threshold.clamp(0.0, 1.0);
        self.min_match_char_length = self.min_match_char_length.max(1);
        self.page_size = self.page_size.max(1);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ConfigCtx {
    pub root: PathBuf,
    pub config: Config,
    pub manifest: ManifestSource,
}

impl ConfigCtx {
    pub fn load_from_cwd(manifest_override: Option<&str>) -> Result<Self> {
        let cwd = std::env::current_dir().context("get current dir")?;
        Self::load_from(&cwd, manifest_override)
    }

    pub fn load_from(start: &Path, manifest_override: Option<&str>) -> Result<Self> {
        let config = load_global_config()?;
        let location = manifest_override.unwrap_or(config.manifest_path.as_str());
        let manifest = match ManifestSource::parse(location) {
            ManifestSource::Url(url) => {
                return Ok(Self {
                    root: start.to_path_buf(),
                    config,
                    manifest: ManifestSource::Url(url),
                });
            }
            ManifestSource::Path(path) => path,
        };

        if manifest_override.is_some() || manifest.is_absolute() {
            let path = if manifest.is_absolute() {
                manifest
            } else {
                start.join(manifest)
            };
            if !path.exists() {
                anyhow::bail!("manifest not found at {}", path.display());
            }
            let root = path.parent().unwrap_or(start).to_path_buf();
            return Ok(Self {
                root,
                config,
                manifest: ManifestSource::Path(path),
            });
        }

        let root = find_manifest_root(start, &manifest).ok_or_else(|| {
            anyhow::anyhow!(
                "{} not found in this directory or any parent; pass --manifest",
                manifest.display()
            )
        })?;
        let path = root.join(&manifest);
        Ok(Self {
            root,
            config,
            manifest: ManifestSource::Path(path),
        })
    }
}

fn config_dir() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return Some(PathBuf::from(appdata));
        }
        if let Ok(profile) = std::env::var("USERPROFILE") {
            return Some(PathBuf::from(profile).join("AppData").join("Roaming"));
        }
        return None;
    }

    if cfg!(target_os = "macos") {
        let home = std::env::var("HOME").ok()?;
        return Some(
            PathBuf::from(home)
                .join("Library")
                .join("Application Support"),
        );
    }

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg));
    }
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".config"))
}

pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("folio").join("folio.toml"))
}

pub fn load_global_config() -> Result<Config> {
    let Some(path) = global_config_path() else {
        return Ok(Config::default());
    };
    if !path.exists() {
        return Ok(Config::default());
    }
    read_config(&path)
}

pub fn find_manifest_root(start: &Path, manifest: &Path) -> Option<PathBuf> {
    let mut cur = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    loop {
        if cur.join(manifest).is_file() {
            return Some(cur);
        }
        match cur.parent() {
            Some(parent) => cur = parent.to_path_buf(),
            None => return None,
        }
    }
}

pub fn read_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let config: Config = toml::from_str(&text).context("parse folio.toml")?;
    Ok(config.sanitize())
}

pub fn write_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let text = toml::to_string_pretty(config).context("serialize config")?;
    std::fs::write(path, text).with_context(|| format!("write {}", path.display()))
}
