use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::availability::DayImage;
use crate::decode::{DecodedImage, ImageKind, ImageSource};

/// Display edge length, in pixels, that thumbnails are sampled towards.
pub const TARGET_SIZE: u32 = 96;
pub const MAX_SAMPLE_SIZE: u32 = 8;

/// Item and byte ceilings for one render pass. Counters only grow; a new
/// budget is created for every pass and owned exclusively by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderBudget {
    max_items: usize,
    max_total_bytes: u64,
    used_bytes: u64,
    loaded_count: usize,
}

impl RenderBudget {
    pub fn new(max_items: usize, max_total_bytes: u64) -> Self {
        Self {
            max_items,
            max_total_bytes,
            used_bytes: 0,
            loaded_count: 0,
        }
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn max_total_bytes(&self) -> u64 {
        self.max_total_bytes
    }

    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded_count
    }

    pub fn remaining_bytes(&self) -> u64 {
        self.max_total_bytes.saturating_sub(self.used_bytes)
    }

    /// Records `bytes` if both ceilings still hold afterwards.
    pub fn try_commit(&mut self, bytes: u64) -> Result<(), SkipReason> {
        if self.loaded_count >= self.max_items {
            return Err(SkipReason::ItemLimit {
                limit: self.max_items,
            });
        }
        match self.used_bytes.checked_add(bytes) {
            Some(total) if total <= self.max_total_bytes => {
                self.used_bytes = total;
                self.loaded_count += 1;
                Ok(())
            }
            _ => Err(SkipReason::OverBudget {
                requested: bytes,
                used: self.used_bytes,
                limit: self.max_total_bytes,
            }),
        }
    }
}

/// Power-of-two divisor that leaves the image between roughly two and four
/// times `target` on its longer scale. Never exceeds `max_sample`, rounding a
/// cap that is not a power of two down to one.
pub fn sample_size(native_width: u32, native_height: u32, target: u32, max_sample: u32) -> u32 {
    let target = target.max(1);
    let width_scale = native_width / target;
    let height_scale = native_height / target;
    let mut sample: u32 = 1;
    while (width_scale / sample > 2 || height_scale / sample > 2)
        && sample.saturating_mul(2) <= max_sample
    {
        sample *= 2;
    }
    sample
}

/// An artifact whose native bounds have been read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCandidate {
    pub day: u32,
    pub kind: ImageKind,
    pub path: PathBuf,
    pub native_width: u32,
    pub native_height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Left out by the selector before any decoding.
    NotSelected,
    Unreadable(String),
    DecodeFailed(String),
    OverBudget { requested: u64, used: u64, limit: u64 },
    ItemLimit { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub day: u32,
    pub kind: ImageKind,
    pub sample_size: u32,
    pub image: Arc<DecodedImage>,
}

impl Thumbnail {
    pub fn byte_size(&self) -> u64 {
        self.image.byte_size()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Shown(Thumbnail),
    Skipped(SkipReason),
}

/// Probes, samples, decodes and budget-checks one day's artifact.
pub struct ThumbnailLoader<'a> {
    source: &'a dyn ImageSource,
    target_size: u32,
    max_sample_size: u32,
}

impl<'a> ThumbnailLoader<'a> {
    pub fn new(source: &'a dyn ImageSource) -> Self {
        Self {
            source,
            target_size: TARGET_SIZE,
            max_sample_size: MAX_SAMPLE_SIZE,
        }
    }

    pub fn with_target_size(mut self, target_size: u32) -> Self {
        self.target_size = target_size.max(1);
        self
    }

    pub fn with_max_sample_size(mut self, max_sample_size: u32) -> Self {
        self.max_sample_size = max_sample_size.max(1);
        self
    }

    pub fn probe(&self, image: &DayImage) -> Result<ImageCandidate, SkipReason> {
        let (native_width, native_height) = self
            .source
            .decode_bounds(&image.path)
            .map_err(|err| {
                tracing::warn!(day = image.day, %err, "unable to read image bounds");
                SkipReason::Unreadable(err.to_string())
            })?;
        Ok(ImageCandidate {
            day: image.day,
            kind: image.kind,
            path: image.path.clone(),
            native_width,
            native_height,
        })
    }

    /// Never fails the pass: unreadable files and exhausted budgets come back
    /// as [`LoadOutcome::Skipped`] and leave `budget` untouched.
    pub fn load(&self, image: &DayImage, budget: &mut RenderBudget) -> LoadOutcome {
        let candidate = match self.probe(image) {
            Ok(candidate) => candidate,
            Err(reason) => return LoadOutcome::Skipped(reason),
        };

        let sample = sample_size(
            candidate.native_width,
            candidate.native_height,
            self.target_size,
            self.max_sample_size,
        );

        let decoded = match self.source.decode(&candidate.path, sample) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!(day = candidate.day, %err, "unable to decode image");
                return LoadOutcome::Skipped(SkipReason::DecodeFailed(err.to_string()));
            }
        };

        let bytes = decoded.byte_size();
        if let Err(reason) = budget.try_commit(bytes) {
            tracing::debug!(
                day = candidate.day,
                bytes,
                used = budget.used_bytes(),
                "thumbnail dropped by render budget"
            );
            return LoadOutcome::Skipped(reason);
        }

        tracing::debug!(
            day = candidate.day,
            sample,
            width = decoded.width,
            height = decoded.height,
            bytes,
            "thumbnail loaded"
        );
        LoadOutcome::Shown(Thumbnail {
            day: candidate.day,
            kind: candidate.kind,
            sample_size: sample,
            image: Arc::new(decoded),
        })
    }
}
