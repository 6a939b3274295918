//! Runtime configuration: where templates, the background image and fonts live.
//!
//! Configuration is read from a JSON file and/or environment variables.
//! Relative paths are resolved by searching upward from the working
//! directory, then from the directory of the running executable, so a binary
//! started anywhere inside a checkout finds `doc/template_files`.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CertprintError, Result};
use crate::fonts::FontFamily;
use crate::render::PageSize;

/// Overrides the template directory.
pub const ENV_TEMPLATE_DIR: &str = "CERTPRINT_TEMPLATE_DIR";
/// Overrides the default background image. An empty value disables it.
pub const ENV_BACKGROUND: &str = "CERTPRINT_BACKGROUND";
/// Overrides the directory searched for font files.
pub const ENV_FONT_DIR: &str = "CERTPRINT_FONT_DIR";

/// Family used when a request names none. Covers Cyrillic.
pub const DEFAULT_FONT_FAMILY: &str = "DejaVuSans";

/// Names accepted for the built-in Helvetica family.
const BUILTIN_FAMILY_NAMES: &[&str] = &["helvetica", "builtin"];

/// Where font files are looked for after the configured font directory.
const SYSTEM_FONT_DIRS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/dejavu",
    "/usr/share/fonts/TTF",
    "/usr/local/share/fonts",
    "/Library/Fonts",
    "C:\\Windows\\Fonts",
];

/// TrueType files of one named family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontFiles {
    pub regular: PathBuf,
    #[serde(default)]
    pub bold: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Directory holding both template workbooks.
    pub template_dir: PathBuf,
    /// Blank template used by default.
    pub template_file: String,
    /// Template used when a preview is requested.
    pub preview_template_file: String,
    /// Background image for variants that use one by default.
    pub background: Option<PathBuf>,
    /// Directory searched for `<Family>.ttf` / `<Family>-Bold.ttf`.
    pub font_dir: PathBuf,
    /// Explicitly configured families, by name.
    pub fonts: BTreeMap<String, FontFiles>,
    pub default_font: String,
    pub page: PageSize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("doc/template_files"),
            template_file: "krstenica-template.xlsx".to_string(),
            preview_template_file: "krstenica-template-empty.xlsx".to_string(),
            background: Some(PathBuf::from("krstenica_obrada.jpg")),
            font_dir: PathBuf::from("fonts"),
            fonts: BTreeMap::new(),
            default_font: DEFAULT_FONT_FAMILY.to_string(),
            page: PageSize::A4,
        }
    }
}

impl RenderConfig {
    /// Read a JSON configuration file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            CertprintError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_slice(&data)
            .map_err(|e| CertprintError::Config(format!("{}: {e}", path.display())))
    }

    /// Defaults with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `CERTPRINT_*` environment overrides on top of `self`.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(ENV_TEMPLATE_DIR).filter(|v| !v.trim().is_empty()) {
            self.template_dir = PathBuf::from(dir);
        }
        if let Some(background) = lookup(ENV_BACKGROUND) {
            self.background = if background.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(background))
            };
        }
        if let Some(dir) = lookup(ENV_FONT_DIR).filter(|v| !v.trim().is_empty()) {
            self.font_dir = PathBuf::from(dir);
        }
        self
    }

    /// Resolved path of the blank or preview template.
    #[must_use]
    pub fn template_path(&self, preview: bool) -> PathBuf {
        let file = if preview {
            &self.preview_template_file
        } else {
            &self.template_file
        };
        resolve_dir(&self.template_dir).join(file)
    }

    /// Resolved path of the default background image, if one is configured.
    #[must_use]
    pub fn background_path(&self) -> Option<PathBuf> {
        self.background.as_deref().map(resolve_file)
    }

    /// Load the font family `name`, or the default family.
    ///
    /// An explicitly requested family that cannot be found is a
    /// configuration error. A missing default family degrades to the
    /// built-in Helvetica with a warning, since it cannot show Cyrillic.
    pub fn font_family(&self, name: Option<&str>) -> Result<FontFamily> {
        let requested = name.map(str::trim).filter(|n| !n.is_empty());
        let name = requested.unwrap_or(&self.default_font);

        if BUILTIN_FAMILY_NAMES.contains(&name.to_ascii_lowercase().as_str()) {
            return Ok(FontFamily::builtin());
        }

        if let Some(files) = self.fonts.get(name) {
            let font_dir = resolve_dir(&self.font_dir);
            let locate = |path: &Path| {
                if path.is_absolute() {
                    path.to_path_buf()
                } else if font_dir.join(path).is_file() {
                    font_dir.join(path)
                } else {
                    resolve_file(path)
                }
            };
            let bold = files.bold.as_deref().map(locate);
            return FontFamily::from_files(name, &locate(&files.regular), bold.as_deref());
        }

        if let Some((regular, bold)) = self.discover_font(name) {
            log::debug!("font family {name} found at {}", regular.display());
            return FontFamily::from_files(name, &regular, bold.as_deref());
        }

        if requested.is_some() {
            return Err(CertprintError::Config(format!("unknown font family {name:?}")));
        }
        log::warn!("font family {name} not found; falling back to built-in Helvetica");
        Ok(FontFamily::builtin())
    }

    fn discover_font(&self, name: &str) -> Option<(PathBuf, Option<PathBuf>)> {
        let mut dirs = vec![resolve_dir(&self.font_dir)];
        dirs.extend(SYSTEM_FONT_DIRS.iter().map(PathBuf::from));

        dirs.into_iter().find_map(|dir| {
            let regular = dir.join(format!("{name}.ttf"));
            if !regular.is_file() {
                return None;
            }
            let bold = dir.join(format!("{name}-Bold.ttf"));
            Some((regular, bold.is_file().then_some(bold)))
        })
    }
}

/// Resolve a relative directory by searching upward. Falls back to the
/// path unchanged.
#[must_use]
pub fn resolve_dir(relative: &Path) -> PathBuf {
    search_upward(relative, true).unwrap_or_else(|| relative.to_path_buf())
}

/// Resolve a relative file by searching upward. Falls back to the path
/// unchanged.
#[must_use]
pub fn resolve_file(relative: &Path) -> PathBuf {
    search_upward(relative, false).unwrap_or_else(|| relative.to_path_buf())
}

fn search_upward(relative: &Path, want_dir: bool) -> Option<PathBuf> {
    if relative.is_absolute() {
        return None;
    }
    if let Some(found) = env::current_dir()
        .ok()
        .and_then(|wd| search_from(&wd, relative, want_dir))
    {
        return Some(found);
    }
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .and_then(|base| search_from(&base, relative, want_dir))
}

fn search_from(start: &Path, relative: &Path, want_dir: bool) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        let candidate = dir.join(relative);
        let matches = if want_dir {
            candidate.is_dir()
        } else {
            candidate.is_file()
        };
        matches.then_some(candidate)
    })
}
