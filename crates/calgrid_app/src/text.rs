use std::fmt::Write;

use calgrid_core::grid::GridDescriptor;
use calgrid_core::style::{CellKind, CellStyle};

const CELL_WIDTH: usize = 4;
const WEEKDAYS: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];

/// Plain-text rendering of a grid for terminals and logs.
///
/// `[d]` marks the selected day, `(d)` today, `d*` a day with an attached
/// thumbnail and `d+` a day that only carries the image marker.
pub fn render_text(grid: &GridDescriptor) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", grid.title);
    let mut header = String::new();
    for name in WEEKDAYS {
        let _ = write!(header, "{name:>CELL_WIDTH$}");
    }
    let _ = writeln!(out, "{}", header.trim_end());
    for week in grid.weeks() {
        let mut line = String::new();
        for cell in week {
            let _ = write!(line, "{:>CELL_WIDTH$}", label(cell));
        }
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}

fn label(cell: &CellStyle) -> String {
    let Some(day) = cell.day.filter(|_| cell.visible) else {
        return String::new();
    };
    match cell.kind {
        CellKind::Blank => String::new(),
        CellKind::Selected => format!("[{day}]"),
        CellKind::Today => format!("({day})"),
        CellKind::Thumbnail => format!("{day}*"),
        CellKind::ImageMarker => format!("{day}+"),
        CellKind::Saturday | CellKind::Sunday | CellKind::Default => day.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use calgrid_core::availability::ImagePaths;
    use calgrid_core::decode::{DecodedImage, ImageSource};
    use calgrid_core::error::ImageError;
    use calgrid_core::{CalendarMonth, GridRenderer, NavigationState, RenderConfig, ThumbnailMode};
    use chrono::NaiveDate;

    use super::*;

    struct OneImage;

    impl ImageSource for OneImage {
        fn exists(&self, path: &Path) -> bool {
            path.ends_with("png/2024-04-05.png")
        }

        fn decode_bounds(&self, path: &Path) -> Result<(u32, u32), ImageError> {
            Err(ImageError::UnsupportedFormat(path.to_path_buf()))
        }

        fn decode(&self, path: &Path, _sample_size: u32) -> Result<DecodedImage, ImageError> {
            Err(ImageError::UnsupportedFormat(path.to_path_buf()))
        }
    }

    fn april_grid() -> GridDescriptor {
        let config = RenderConfig {
            thumbnails: ThumbnailMode::MarkerOnly,
            ..RenderConfig::default()
        };
        let paths = ImagePaths::under("activity");
        let nav = NavigationState::new(CalendarMonth::new(2024, 3).unwrap(), 9);
        let today = NaiveDate::from_ymd_opt(2024, 4, 18).unwrap();
        GridRenderer::new(&config, &paths, &OneImage).render(&nav, today)
    }

    #[test]
    fn renders_title_header_and_weeks() {
        let text = render_text(&april_grid());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "April 2024");
        assert_eq!(lines[1], "  Su  Mo  Tu  We  Th  Fr  Sa");
        assert_eq!(lines[2], "       1   2   3   4  5+   6");
        assert_eq!(lines[3], "   7   8 [9]  10  11  12  13");
        assert!(lines[4].contains("(18)"));
        assert_eq!(lines[6], "  28  29  30");
        assert_eq!(lines[7], "");
    }
}
