use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::calendar::CalendarMonth;
use crate::decode::{ImageKind, ImageSource};

/// Directory layout of the per-day activity artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePaths {
    png_dir: PathBuf,
    svg_dir: PathBuf,
}

impl ImagePaths {
    pub fn new(png_dir: impl AsRef<Path>, svg_dir: impl AsRef<Path>) -> Self {
        Self {
            png_dir: png_dir.as_ref().to_path_buf(),
            svg_dir: svg_dir.as_ref().to_path_buf(),
        }
    }

    /// `root/png` and `root/svg`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(root.join("png"), root.join("svg"))
    }

    pub fn dir(&self, kind: ImageKind) -> &Path {
        match kind {
            ImageKind::Png => &self.png_dir,
            ImageKind::Svg => &self.svg_dir,
        }
    }

    pub fn dirs(&self) -> [&Path; 2] {
        [&self.png_dir, &self.svg_dir]
    }

    pub fn path(&self, kind: ImageKind, month: CalendarMonth, day: u32) -> PathBuf {
        self.dir(kind)
            .join(format!("{}.{}", file_stem(month, day), kind.extension()))
    }
}

/// `YYYY-MM-DD` with a one-based, zero-padded month.
pub fn file_stem(month: CalendarMonth, day: u32) -> String {
    format!("{}-{:02}-{:02}", month.year(), month.number(), day)
}

/// An existing artifact for one day of the displayed month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayImage {
    pub day: u32,
    pub kind: ImageKind,
    pub path: PathBuf,
}

/// Probes every day of `month` and returns the days that have an artifact,
/// ascending. PNG wins over SVG when both exist. Nothing is cached between calls.
pub fn days_with_image(
    month: CalendarMonth,
    paths: &ImagePaths,
    source: &dyn ImageSource,
) -> Vec<DayImage> {
    let mut found = Vec::new();
    for day in 1..=month.days_in() {
        for kind in [ImageKind::Png, ImageKind::Svg] {
            let path = paths.path(kind, month, day);
            if source.exists(&path) {
                tracing::debug!(day, path = %path.display(), "activity image present");
                found.push(DayImage { day, kind, path });
                break;
            }
        }
    }
    found
}
