use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarMonth;
use crate::error::ConfigError;
use crate::selector::{MAX_ITEMS, MAX_TOTAL_BYTES, PLATFORM_BYTE_CEILING};
use crate::decode::MAX_DECODE_BYTES;
use crate::thumbnail::{RenderBudget, MAX_SAMPLE_SIZE, TARGET_SIZE};

pub const DEFAULT_TITLE_FORMAT: &str = "%B %Y";

/// Whether the render surface can attach decoded thumbnails to cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThumbnailMode {
    /// Decode selected images and attach them to their cells.
    Attach,
    /// Only mark days that have an image; nothing is decoded.
    MarkerOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub max_items: usize,
    pub max_total_bytes: u64,
    pub target_size: u32,
    pub max_sample_size: u32,
    /// Ceiling on the full-resolution buffer of a single raster decode.
    pub max_decode_bytes: u64,
    pub thumbnails: ThumbnailMode,
    pub title_format: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_items: MAX_ITEMS,
            max_total_bytes: MAX_TOTAL_BYTES,
            target_size: TARGET_SIZE,
            max_sample_size: MAX_SAMPLE_SIZE,
            max_decode_bytes: MAX_DECODE_BYTES,
            thumbnails: ThumbnailMode::Attach,
            title_format: DEFAULT_TITLE_FORMAT.to_string(),
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_total_bytes > PLATFORM_BYTE_CEILING {
            return Err(ConfigError::BudgetAboveCeiling {
                requested: self.max_total_bytes,
                ceiling: PLATFORM_BYTE_CEILING,
            });
        }
        if self.target_size == 0 {
            return Err(ConfigError::Zero {
                field: "target_size",
            });
        }
        if self.max_sample_size == 0 {
            return Err(ConfigError::Zero {
                field: "max_sample_size",
            });
        }
        if self.max_decode_bytes == 0 {
            return Err(ConfigError::Zero {
                field: "max_decode_bytes",
            });
        }
        validate_title_format(&self.title_format)
    }

    /// A fresh budget for one render pass.
    pub fn budget(&self) -> RenderBudget {
        RenderBudget::new(self.max_items, self.max_total_bytes)
    }

    pub fn title(&self, month: CalendarMonth) -> String {
        let mut title = String::new();
        if write!(title, "{}", month.first_day().format(&self.title_format)).is_err() {
            title.clear();
            let _ = write!(title, "{}", month.first_day().format(DEFAULT_TITLE_FORMAT));
        }
        title
    }
}

pub fn validate_title_format(format: &str) -> Result<(), ConfigError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::TitleFormat(format.to_string()));
    }
    Ok(())
}
