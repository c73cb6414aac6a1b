//! Dataset directory layout
//!
//! Inputs live under a source root (`<image_dir>/<name>.tif`,
//! `<mask_dir>/<name>.png`, `<texture_dir>/<channel>/<name>.tif`); every
//! artifact is written below a destination root.

use std::path::{Path, PathBuf};

use crate::patch_pipeline::common::error::Result;

#[derive(Debug, Clone)]
pub struct DatasetLayout {
    pub source_root: PathBuf,
    pub destination_root: PathBuf,
    /// Directory (under the source root) holding the SAR rasters
    pub image_dir: String,
    /// Directory (under the source root) holding the oil masks
    pub mask_dir: String,
    /// Directory (under the source root) with one subdirectory per texture channel
    pub texture_dir: String,
    pub image_extension: String,
    pub mask_extension: String,
}

impl DatasetLayout {
    pub fn new(source_root: impl Into<PathBuf>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            destination_root: destination_root.into(),
            image_dir: "image_norm".to_string(),
            mask_dir: "mask_bin".to_string(),
            texture_dir: "textures".to_string(),
            image_extension: "tif".to_string(),
            mask_extension: "png".to_string(),
        }
    }

    pub fn with_image_dir(mut self, dir: impl Into<String>) -> Self {
        self.image_dir = dir.into();
        self
    }

    pub fn with_mask_dir(mut self, dir: impl Into<String>) -> Self {
        self.mask_dir = dir.into();
        self
    }

    pub fn with_texture_dir(mut self, dir: impl Into<String>) -> Self {
        self.texture_dir = dir.into();
        self
    }

    pub fn image_path(&self, image_name: &str) -> PathBuf {
        self.source_root
            .join(&self.image_dir)
            .join(format!("{image_name}.{}", self.image_extension))
    }

    pub fn mask_path(&self, image_name: &str) -> PathBuf {
        self.source_root
            .join(&self.mask_dir)
            .join(format!("{image_name}.{}", self.mask_extension))
    }

    pub fn texture_path(&self, channel: &str, image_name: &str) -> PathBuf {
        self.source_root
            .join(&self.texture_dir)
            .join(channel)
            .join(format!("{image_name}.tif"))
    }

    pub fn feature_dir(&self) -> PathBuf {
        self.destination_root.join("features").join("origin")
    }

    pub fn preview_dir(&self) -> PathBuf {
        self.destination_root.join("images")
    }

    pub fn label_dir(&self) -> PathBuf {
        self.destination_root.join("labels")
    }

    pub fn figure_dir(&self) -> PathBuf {
        self.destination_root.join("figures")
    }

    pub fn texture_output_dir(&self, channel: &str) -> PathBuf {
        self.destination_root.join("features").join("texture").join(channel)
    }

    pub fn counts_dir(&self) -> PathBuf {
        self.destination_root.join("counts")
    }

    pub fn feature_tile_path(&self, patch_name: &str) -> PathBuf {
        self.feature_dir().join(format!("{patch_name}.tif"))
    }

    pub fn preview_tile_path(&self, patch_name: &str) -> PathBuf {
        self.preview_dir().join(format!("{patch_name}.png"))
    }

    pub fn label_tile_path(&self, patch_name: &str) -> PathBuf {
        self.label_dir().join(format!("{patch_name}.png"))
    }

    pub fn figure_path(&self, patch_name: &str) -> PathBuf {
        self.figure_dir().join(format!("{patch_name}.png"))
    }

    pub fn texture_tile_path(&self, channel: &str, patch_name: &str) -> PathBuf {
        self.texture_output_dir(channel).join(format!("{patch_name}.tif"))
    }

    pub fn create_output_dirs(&self) -> Result<()> {
        for dir in [
            self.feature_dir(),
            self.preview_dir(),
            self.label_dir(),
            self.figure_dir(),
            self.counts_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Image names (file stems) in the image directory, sorted so that
    /// array-task indices map to the same image on every node.
    pub fn list_images(&self) -> Result<Vec<String>> {
        sorted_stems(&self.source_root.join(&self.image_dir), Some(&self.image_extension))
    }

    /// Texture channel names, sorted. A missing texture directory means no channels.
    pub fn texture_channels(&self) -> Result<Vec<String>> {
        let dir = self.source_root.join(&self.texture_dir);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut channels = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                channels.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        channels.sort();
        Ok(channels)
    }

    /// Patch names of the feature tiles currently written.
    pub fn feature_tiles(&self) -> Result<Vec<String>> {
        let dir = self.feature_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        sorted_stems(&dir, Some("tif"))
    }
}

pub(crate) fn sorted_stems(dir: &Path, extension: Option<&str>) -> Result<Vec<String>> {
    let mut stems = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = match extension {
            Some(ext) => path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case(ext))
                .unwrap_or(false),
            None => true,
        };
        if let (true, Some(stem)) = (matches, path.file_stem().and_then(|s| s.to_str())) {
            stems.push(stem.to_string());
        }
    }
    stems.sort();
    Ok(stems)
}
