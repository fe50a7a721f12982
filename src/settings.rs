//! Toolkit configuration.
//!
//! Settings are an explicit value handed to the toolkit when it is built.
//! Anything malformed is treated as not configured at all: an empty
//! colorspace, a quality outside 0-100 or a zero density simply do nothing.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use strum::{Display, EnumString, IntoStaticStr};

use crate::{error::MagickError, mt_err};

/// Which graphics package provides the binaries.
#[derive(
    EnumString,
    IntoStaticStr,
    Display,
    Deserialize,
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Binaries {
    #[default]
    ImageMagick,
    GraphicsMagick,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub binaries: Binaries,
    /// Directory holding the binaries. When unset they are looked up on the shell path.
    pub path_to_binaries: Option<PathBuf>,
    /// Raw text inserted once into every command line.
    pub prepend: Option<String>,
    /// Place `prepend` before the source image instead of right after it.
    pub prepend_pre_source: bool,
    pub quality: Option<u8>,
    pub colorspace: Option<String>,
    /// Output resolution in pixels per inch.
    pub density: Option<u32>,
    /// Log command lines at `info` rather than `debug`.
    pub debug: bool,
}

impl Settings {
    pub fn prepend(&self) -> Option<&str> {
        non_blank(self.prepend.as_deref())
    }

    pub fn colorspace(&self) -> Option<&str> {
        non_blank(self.colorspace.as_deref())
    }

    pub fn quality(&self) -> Option<u8> {
        self.quality.filter(|q| *q <= 100)
    }

    pub fn density(&self) -> Option<u32> {
        self.density.filter(|d| *d > 0)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, MagickError> {
        let raw: SettingsFile =
            toml::from_str(text).map_err(|e| mt_err!("invalid settings: {}", e))?;
        Ok(raw.into())
    }

    /// Reads settings from a TOML file. Keys missing from the file keep their defaults.
    pub fn load(path: &Path) -> Result<Self, MagickError> {
        let text = fs::read_to_string(path)
            .map_err(|e| mt_err!("unable to read settings `{}': {}", path.display(), e))?;
        Self::from_toml_str(&text)
            .map_err(|e| mt_err!("in settings file `{}': {}", path.display(), e))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// On-disk layout. Numbers are read wide so out-of-range values can be dropped
/// instead of failing the whole file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    binaries: Binaries,
    path_to_binaries: Option<String>,
    prepend: Option<String>,
    prepend_pre_source: bool,
    quality: Option<i64>,
    colorspace: Option<String>,
    density: Option<i64>,
    debug: bool,
    advanced: AdvancedSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AdvancedSettings {
    colorspace: Option<String>,
    density: Option<i64>,
}

impl From<SettingsFile> for Settings {
    fn from(raw: SettingsFile) -> Self {
        let colorspace = raw.colorspace.or(raw.advanced.colorspace);
        let density = raw.density.or(raw.advanced.density);
        Settings {
            binaries: raw.binaries,
            path_to_binaries: raw
                .path_to_binaries
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            prepend: raw.prepend.filter(|p| !p.trim().is_empty()),
            prepend_pre_source: raw.prepend_pre_source,
            quality: raw
                .quality
                .and_then(|q| u8::try_from(q).ok())
                .filter(|q| *q <= 100),
            colorspace: colorspace.filter(|c| !c.trim().is_empty()),
            density: density
                .and_then(|d| u32::try_from(d).ok())
                .filter(|d| *d > 0),
            debug: raw.debug,
        }
    }
}
