use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};

use crate::availability::{days_with_image, ImagePaths};
use crate::calendar::CalendarMonth;
use crate::config::{RenderConfig, ThumbnailMode};
use crate::decode::ImageSource;
use crate::navigation::NavigationState;
use crate::selector::select;
use crate::style::{style_cell, CellStyle, DayCell};
use crate::thumbnail::{LoadOutcome, SkipReason, Thumbnail, ThumbnailLoader};

/// Six weeks of seven days.
pub const GRID_SLOTS: usize = 42;
pub const GRID_COLUMNS: usize = 7;

/// Zero-based slot of `day` in a Sunday-first grid.
pub fn grid_position(month: CalendarMonth, day: u32) -> usize {
    month.weekday_offset() as usize + day as usize - 1
}

/// Lays out every day of the displayed month.
pub fn layout(
    nav: &NavigationState,
    today: NaiveDate,
    has_image: impl Fn(u32) -> bool,
) -> Vec<DayCell> {
    let month = nav.displayed;
    (1..=month.days_in())
        .filter_map(|day| {
            let date = month.date(day)?;
            Some(DayCell {
                day,
                grid_position: grid_position(month, day),
                weekday: date.weekday(),
                is_today: date == today,
                is_selected: nav.is_selected(day),
                has_image: has_image(day),
            })
        })
        .collect()
}

/// What happened to the activity images during one render pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderReport {
    pub with_image: Vec<u32>,
    pub shown: Vec<u32>,
    pub skipped: Vec<(u32, SkipReason)>,
    pub used_bytes: u64,
    pub max_total_bytes: u64,
}

/// The complete output of a render: title plus one style per grid slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridDescriptor {
    pub title: String,
    pub month: CalendarMonth,
    #[serde(serialize_with = "serialize_slots")]
    pub cells: [CellStyle; GRID_SLOTS],
    pub report: RenderReport,
}

impl GridDescriptor {
    pub fn cell_for_day(&self, day: u32) -> Option<&CellStyle> {
        self.cells.iter().find(|cell| cell.day == Some(day))
    }

    pub fn weeks(&self) -> impl Iterator<Item = &[CellStyle]> {
        self.cells.chunks(GRID_COLUMNS)
    }
}

fn serialize_slots<S: Serializer>(
    cells: &[CellStyle; GRID_SLOTS],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(cells.iter())
}

pub struct GridRenderer<'a> {
    config: &'a RenderConfig,
    paths: &'a ImagePaths,
    source: &'a dyn ImageSource,
}

impl<'a> GridRenderer<'a> {
    pub fn new(
        config: &'a RenderConfig,
        paths: &'a ImagePaths,
        source: &'a dyn ImageSource,
    ) -> Self {
        Self {
            config,
            paths,
            source,
        }
    }

    /// Renders `nav` from scratch. Decoded images are not reused between calls.
    pub fn render(&self, nav: &NavigationState, today: NaiveDate) -> GridDescriptor {
        let month = nav.displayed;
        let images = days_with_image(month, self.paths, self.source);
        let mut report = RenderReport {
            with_image: images.iter().map(|image| image.day).collect(),
            max_total_bytes: self.config.max_total_bytes,
            ..RenderReport::default()
        };

        let mut thumbnails: BTreeMap<u32, Thumbnail> = BTreeMap::new();
        if self.config.thumbnails == ThumbnailMode::Attach {
            let mut budget = self.config.budget();
            let chosen = select(&images, self.config.max_items);
            let chosen_days: HashSet<u32> = chosen.iter().map(|image| image.day).collect();
            let loader = ThumbnailLoader::new(self.source)
                .with_target_size(self.config.target_size)
                .with_max_sample_size(self.config.max_sample_size);

            let mut skipped: BTreeMap<u32, SkipReason> = images
                .iter()
                .filter(|image| !chosen_days.contains(&image.day))
                .map(|image| (image.day, SkipReason::NotSelected))
                .collect();
            for image in &chosen {
                match loader.load(image, &mut budget) {
                    LoadOutcome::Shown(thumbnail) => {
                        thumbnails.insert(image.day, thumbnail);
                    }
                    LoadOutcome::Skipped(reason) => {
                        skipped.insert(image.day, reason);
                    }
                }
            }
            report.shown = thumbnails.keys().copied().collect();
            report.skipped = skipped.into_iter().collect();
            report.used_bytes = budget.used_bytes();
        }

        let with_image: HashSet<u32> = report.with_image.iter().copied().collect();
        let mut cells: [CellStyle; GRID_SLOTS] = std::array::from_fn(|_| CellStyle::blank());
        for cell in layout(nav, today, |day| with_image.contains(&day)) {
            match cells.get_mut(cell.grid_position) {
                Some(slot) => *slot = style_cell(&cell, thumbnails.get(&cell.day)),
                None => tracing::warn!(
                    day = cell.day,
                    position = cell.grid_position,
                    "day falls outside the grid"
                ),
            }
        }

        tracing::info!(
            year = month.year(),
            month = month.number(),
            images = report.with_image.len(),
            shown = report.shown.len(),
            used_bytes = report.used_bytes,
            "rendered month grid"
        );

        GridDescriptor {
            title: self.config.title(month),
            month,
            cells,
            report,
        }
    }
}
