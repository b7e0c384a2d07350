use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use calgrid_core::availability::{file_stem, ImagePaths};
use calgrid_core::decode::{DecodedImage, FsImageSource, ImageKind, ImageSource};
use calgrid_core::error::ImageError;
use calgrid_core::grid::grid_position;
use calgrid_core::style::{Background, CellKind};
use calgrid_core::thumbnail::SkipReason;
use calgrid_core::{CalendarMonth, GridRenderer, NavigationState, RenderConfig, ThumbnailMode};
use chrono::NaiveDate;
use parking_lot::Mutex;
use tempfile::tempdir;

/// In-memory image source keyed by path; records every decode call.
#[derive(Default)]
struct FakeImages {
    bounds: HashMap<PathBuf, (u32, u32)>,
    decodes: Mutex<Vec<(PathBuf, u32)>>,
}

impl FakeImages {
    fn with_days(paths: &ImagePaths, month: CalendarMonth, days: &[u32], size: (u32, u32)) -> Self {
        let bounds = days
            .iter()
            .map(|day| (paths.path(ImageKind::Png, month, *day), size))
            .collect();
        Self {
            bounds,
            decodes: Mutex::new(Vec::new()),
        }
    }

    fn decode_count(&self) -> usize {
        self.decodes.lock().len()
    }
}

impl ImageSource for FakeImages {
    fn exists(&self, path: &Path) -> bool {
        self.bounds.contains_key(path)
    }

    fn decode_bounds(&self, path: &Path) -> Result<(u32, u32), ImageError> {
        self.bounds
            .get(path)
            .copied()
            .ok_or_else(|| ImageError::UnsupportedFormat(path.to_path_buf()))
    }

    fn decode(&self, path: &Path, sample_size: u32) -> Result<DecodedImage, ImageError> {
        let (width, height) = self.decode_bounds(path)?;
        self.decodes.lock().push((path.to_path_buf(), sample_size));
        let (width, height) = (width / sample_size, height / sample_size);
        Ok(DecodedImage {
            width,
            height,
            pixels: vec![0; (width * height) as usize],
        })
    }
}

fn april_2024() -> CalendarMonth {
    CalendarMonth::new(2024, 3).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn april_without_images_styles_weekends_and_selection() {
    let config = RenderConfig::default();
    let paths = ImagePaths::under("/data/activity");
    let source = FakeImages::default();
    let nav = NavigationState::new(april_2024(), 15);

    let grid = GridRenderer::new(&config, &paths, &source).render(&nav, date(2024, 6, 1));

    assert_eq!(grid_position(april_2024(), 1), 1);
    assert_eq!(grid.cells[1].text, "1");
    assert_eq!(grid.cells[0].kind, CellKind::Blank);
    assert_eq!(grid.cell_for_day(15).unwrap().kind, CellKind::Selected);
    assert_eq!(
        grid.cell_for_day(15).unwrap().background,
        Background::Selected
    );

    for day in 1..=30 {
        let kind = grid.cell_for_day(day).unwrap().kind;
        let expected = match day {
            15 => CellKind::Selected,
            6 | 13 | 20 | 27 => CellKind::Saturday,
            7 | 14 | 21 | 28 => CellKind::Sunday,
            _ => CellKind::Default,
        };
        assert_eq!(kind, expected, "day {day}");
    }
    assert!(grid.cells[31..].iter().all(|cell| !cell.visible && cell.text.is_empty()));
    assert_eq!(source.decode_count(), 0);
}

#[test]
fn today_is_highlighted_only_in_its_month() {
    let config = RenderConfig::default();
    let paths = ImagePaths::under("/data/activity");
    let source = FakeImages::default();
    let renderer = GridRenderer::new(&config, &paths, &source);

    let grid = renderer.render(&NavigationState::new(april_2024(), 0), date(2024, 4, 10));
    assert_eq!(grid.cell_for_day(10).unwrap().kind, CellKind::Today);
    assert_eq!(grid.cell_for_day(10).unwrap().background, Background::Today);

    let may = NavigationState::new(april_2024().advance(), 0);
    let grid = renderer.render(&may, date(2024, 4, 10));
    assert_eq!(grid.cell_for_day(10).unwrap().kind, CellKind::Default);
}

#[test]
fn dense_month_selects_fifteen_recent_days() {
    let config = RenderConfig::default();
    let paths = ImagePaths::under("/data/activity");
    let days = [
        1, 2, 3, 5, 6, 8, 9, 11, 12, 14, 15, 17, 18, 20, 21, 23, 24, 26, 27, 29,
    ];
    let source = FakeImages::with_days(&paths, april_2024(), &days, (800, 600));
    let nav = NavigationState::new(april_2024(), 0);

    let grid = GridRenderer::new(&config, &paths, &source).render(&nav, date(2024, 6, 1));

    assert_eq!(grid.report.with_image, days.to_vec());
    assert_eq!(grid.report.shown.len(), 15);
    assert_eq!(grid.report.shown, days[5..].to_vec());
    let mean = grid.report.shown.iter().sum::<u32>() as f64 / 15.0;
    assert!(mean > 15.0);

    for day in &days[..5] {
        assert_eq!(grid.cell_for_day(*day).unwrap().kind, CellKind::ImageMarker);
        assert!(grid
            .report
            .skipped
            .contains(&(*day, SkipReason::NotSelected)));
    }
    let shown = grid.cell_for_day(29).unwrap();
    assert_eq!(shown.kind, CellKind::Thumbnail);
    let thumbnail = shown.thumbnail.as_ref().unwrap();
    assert_eq!(thumbnail.sample_size, 4);
    assert_eq!((thumbnail.image.width, thumbnail.image.height), (200, 150));
    assert_eq!(grid.report.used_bytes, 15 * 200 * 150 * 2);
    assert_eq!(source.decode_count(), 15);
}

#[test]
fn byte_budget_is_never_exceeded() {
    let config = RenderConfig {
        max_total_bytes: 200_000,
        ..RenderConfig::default()
    };
    let paths = ImagePaths::under("/data/activity");
    let source = FakeImages::with_days(&paths, april_2024(), &[2, 4, 6, 8], (800, 600));
    let nav = NavigationState::new(april_2024(), 0);

    let grid = GridRenderer::new(&config, &paths, &source).render(&nav, date(2024, 6, 1));

    assert_eq!(grid.report.shown, vec![2, 4, 6]);
    assert!(grid.report.used_bytes <= config.max_total_bytes);
    assert_eq!(grid.report.used_bytes, 180_000);
    assert!(matches!(
        grid.report.skipped.as_slice(),
        [(8, SkipReason::OverBudget { requested: 60_000, used: 180_000, limit: 200_000 })]
    ));
    assert_eq!(grid.cell_for_day(8).unwrap().kind, CellKind::ImageMarker);
}

#[test]
fn selected_day_keeps_thumbnail_under_accent_label() {
    let config = RenderConfig::default();
    let paths = ImagePaths::under("/data/activity");
    let source = FakeImages::with_days(&paths, april_2024(), &[9], (300, 300));
    let nav = NavigationState::new(april_2024(), 9);

    let grid = GridRenderer::new(&config, &paths, &source).render(&nav, date(2024, 6, 1));
    let cell = grid.cell_for_day(9).unwrap();
    assert_eq!(cell.kind, CellKind::Selected);
    assert_eq!(cell.overlay, Some(Background::Selected));
    assert!(cell.thumbnail.is_some());
}

#[test]
fn marker_mode_never_decodes() {
    let config = RenderConfig {
        thumbnails: ThumbnailMode::MarkerOnly,
        ..RenderConfig::default()
    };
    let paths = ImagePaths::under("/data/activity");
    let source = FakeImages::with_days(&paths, april_2024(), &[3, 13], (800, 600));
    let nav = NavigationState::new(april_2024(), 0);

    let grid = GridRenderer::new(&config, &paths, &source).render(&nav, date(2024, 6, 1));
    assert_eq!(grid.cell_for_day(3).unwrap().kind, CellKind::ImageMarker);
    assert_eq!(grid.cell_for_day(13).unwrap().kind, CellKind::ImageMarker);
    assert!(grid.report.shown.is_empty());
    assert_eq!(source.decode_count(), 0);
}

#[test]
fn corrupt_file_does_not_abort_the_pass() {
    let temp = tempdir().unwrap();
    let paths = ImagePaths::under(temp.path());
    fs::create_dir_all(paths.dir(ImageKind::Png)).unwrap();
    fs::create_dir_all(paths.dir(ImageKind::Svg)).unwrap();
    let month = april_2024();

    image::RgbaImage::from_pixel(400, 300, image::Rgba([0, 128, 255, 255]))
        .save(paths.path(ImageKind::Png, month, 3))
        .unwrap();
    fs::write(paths.path(ImageKind::Png, month, 4), b"garbage").unwrap();
    fs::write(
        paths.path(ImageKind::Svg, month, 5),
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="192" height="96"><circle cx="48" cy="48" r="40" fill="blue"/></svg>"#,
    )
    .unwrap();

    let config = RenderConfig::default();
    let nav = NavigationState::new(month, 0);
    let source = FsImageSource::new();
    let grid = GridRenderer::new(&config, &paths, &source).render(&nav, date(2024, 6, 1));

    assert_eq!(grid.report.with_image, vec![3, 4, 5]);
    assert_eq!(grid.report.shown, vec![3, 5]);
    assert_eq!(grid.cell_for_day(3).unwrap().kind, CellKind::Thumbnail);
    assert_eq!(grid.cell_for_day(4).unwrap().kind, CellKind::ImageMarker);
    assert!(matches!(
        grid.report.skipped.as_slice(),
        [(4, SkipReason::Unreadable(_))]
    ));

    let svg = grid.cell_for_day(5).unwrap().thumbnail.as_ref().unwrap();
    assert_eq!(svg.kind, ImageKind::Svg);
    assert_eq!((svg.image.width, svg.image.height), (192, 96));
    assert_eq!(file_stem(month, 5), "2024-04-05");
}

#[test]
fn oversized_source_is_skipped_without_decoding() {
    let temp = tempdir().unwrap();
    let paths = ImagePaths::under(temp.path());
    fs::create_dir_all(paths.dir(ImageKind::Png)).unwrap();
    let month = april_2024();
    image::RgbaImage::from_pixel(400, 300, image::Rgba([0, 128, 255, 255]))
        .save(paths.path(ImageKind::Png, month, 3))
        .unwrap();
    image::RgbaImage::from_pixel(1200, 900, image::Rgba([255, 0, 0, 255]))
        .save(paths.path(ImageKind::Png, month, 4))
        .unwrap();

    let config = RenderConfig::default();
    let source = FsImageSource::new().with_max_decode_bytes(400 * 300 * 4);
    let nav = NavigationState::new(month, 0);
    let grid = GridRenderer::new(&config, &paths, &source).render(&nav, date(2024, 6, 1));

    assert_eq!(grid.report.shown, vec![3]);
    assert_eq!(grid.cell_for_day(4).unwrap().kind, CellKind::ImageMarker);
    assert!(matches!(
        grid.report.skipped.as_slice(),
        [(4, SkipReason::DecodeFailed(_))]
    ));
    assert_eq!(grid.report.used_bytes, 200 * 150 * 2);
}
