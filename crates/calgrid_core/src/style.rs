use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::thumbnail::Thumbnail;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

pub const TEXT_DEFAULT: Rgb = Rgb::new(255, 255, 255);
pub const TEXT_ACCENT: Rgb = Rgb::new(255, 255, 255);
pub const TEXT_SATURDAY: Rgb = Rgb::new(64, 149, 255);
pub const TEXT_SUNDAY: Rgb = Rgb::new(255, 64, 64);
pub const IMAGE_MARKER: Rgb = Rgb::new(128, 0, 128);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Background {
    Default,
    Selected,
    Today,
    Flat(Rgb),
}

/// Which styling rule produced a cell, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    Blank,
    Selected,
    Today,
    Thumbnail,
    ImageMarker,
    Saturday,
    Sunday,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCell {
    pub day: u32,
    pub grid_position: usize,
    pub weekday: Weekday,
    pub is_today: bool,
    pub is_selected: bool,
    pub has_image: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellStyle {
    pub kind: CellKind,
    pub day: Option<u32>,
    pub text: String,
    pub text_color: Rgb,
    pub background: Background,
    pub visible: bool,
    pub thumbnail: Option<Thumbnail>,
    /// Background of the day label drawn over `thumbnail`, when one is attached.
    pub overlay: Option<Background>,
}

impl CellStyle {
    pub fn blank() -> Self {
        Self {
            kind: CellKind::Blank,
            day: None,
            text: String::new(),
            text_color: TEXT_DEFAULT,
            background: Background::Default,
            visible: false,
            thumbnail: None,
            overlay: None,
        }
    }

    fn day(cell: &DayCell, kind: CellKind, text_color: Rgb, background: Background) -> Self {
        Self {
            kind,
            day: Some(cell.day),
            text: cell.day.to_string(),
            text_color,
            background,
            visible: true,
            thumbnail: None,
            overlay: None,
        }
    }

    /// Attaches `thumbnail` as the cell content and moves the cell background onto its label.
    fn over(mut self, thumbnail: Option<&Thumbnail>) -> Self {
        if let Some(thumbnail) = thumbnail {
            self.overlay = Some(self.background);
            self.background = Background::Default;
            self.thumbnail = Some(thumbnail.clone());
        }
        self
    }
}

/// Resolves the style of one day; the first matching rule wins:
/// selected, today, shown thumbnail, image marker, Saturday, Sunday, default.
///
/// `thumbnail` is only ever present when the surface supports attachments.
/// Selected and today keep an attached thumbnail and carry their accent on
/// the overlaid label instead of the cell.
pub fn style_cell(cell: &DayCell, thumbnail: Option<&Thumbnail>) -> CellStyle {
    if cell.is_selected {
        return CellStyle::day(cell, CellKind::Selected, TEXT_ACCENT, Background::Selected)
            .over(thumbnail);
    }
    if cell.is_today {
        return CellStyle::day(cell, CellKind::Today, TEXT_ACCENT, Background::Today)
            .over(thumbnail);
    }
    if thumbnail.is_some() {
        return CellStyle::day(cell, CellKind::Thumbnail, TEXT_DEFAULT, Background::Default)
            .over(thumbnail);
    }
    if cell.has_image {
        return CellStyle::day(
            cell,
            CellKind::ImageMarker,
            TEXT_DEFAULT,
            Background::Flat(IMAGE_MARKER),
        );
    }
    let (kind, color) = match cell.weekday {
        Weekday::Sat => (CellKind::Saturday, TEXT_SATURDAY),
        Weekday::Sun => (CellKind::Sunday, TEXT_SUNDAY),
        _ => (CellKind::Default, TEXT_DEFAULT),
    };
    CellStyle::day(cell, kind, color, Background::Default)
}
