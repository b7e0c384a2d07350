use std::fs;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageReader};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;
use serde::{Deserialize, Serialize};

use crate::error::ImageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageKind {
    Png,
    Svg,
}

impl ImageKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Svg => "svg",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("png") {
            Some(ImageKind::Png)
        } else if ext.eq_ignore_ascii_case("svg") {
            Some(ImageKind::Svg)
        } else {
            None
        }
    }
}

/// A downsampled image held as RGB565, two bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub pixels: Vec<u16>,
}

impl DecodedImage {
    pub const BYTES_PER_PIXEL: u64 = 2;

    /// Packs straight RGBA8 into RGB565, flattening alpha against black.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Self {
        let pixels = rgba
            .chunks_exact(4)
            .map(|px| {
                let alpha = u16::from(px[3]);
                let blend = |c: u8| ((u16::from(c) * alpha) / 255) as u8;
                rgb565(blend(px[0]), blend(px[1]), blend(px[2]))
            })
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Packs premultiplied RGBA8 (already flattened against black) into RGB565.
    fn from_premultiplied(width: u32, height: u32, rgba: &[u8]) -> Self {
        let pixels = rgba
            .chunks_exact(4)
            .map(|px| rgb565(px[0], px[1], px[2]))
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn byte_size(&self) -> u64 {
        self.pixels.len() as u64 * Self::BYTES_PER_PIXEL
    }
}

pub fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((u16::from(r) >> 3) << 11) | ((u16::from(g) >> 2) << 5) | (u16::from(b) >> 3)
}

pub trait ImageSource: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Reads only the native width and height.
    fn decode_bounds(&self, path: &Path) -> Result<(u32, u32), ImageError>;

    /// Decodes at `1 / sample_size` of the native linear size.
    fn decode(&self, path: &Path, sample_size: u32) -> Result<DecodedImage, ImageError>;
}

/// Largest full-resolution buffer a raster decode may allocate (2048x2048 RGBA8).
pub const MAX_DECODE_BYTES: u64 = 2048 * 2048 * 4;

/// Decodes PNG files with `image` and rasterizes SVG files with `resvg`.
///
/// PNG decoding materializes the full image before it is reduced, so sources
/// whose native buffer would exceed `max_decode_bytes` are refused up front.
#[derive(Debug, Clone, Copy)]
pub struct FsImageSource {
    max_decode_bytes: u64,
}

impl Default for FsImageSource {
    fn default() -> Self {
        Self {
            max_decode_bytes: MAX_DECODE_BYTES,
        }
    }
}

impl FsImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_decode_bytes(mut self, max_decode_bytes: u64) -> Self {
        self.max_decode_bytes = max_decode_bytes;
        self
    }

    pub fn max_decode_bytes(&self) -> u64 {
        self.max_decode_bytes
    }

    fn kind(path: &Path) -> Result<ImageKind, ImageError> {
        ImageKind::from_path(path).ok_or_else(|| ImageError::UnsupportedFormat(path.to_path_buf()))
    }

    fn raster_reader(path: &Path) -> Result<ImageReader<std::io::BufReader<fs::File>>, ImageError> {
        let io_err = |source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        };
        ImageReader::open(path)
            .map_err(io_err)?
            .with_guessed_format()
            .map_err(io_err)
    }

    fn svg_tree(path: &Path) -> Result<usvg::Tree, ImageError> {
        let data = fs::read(path).map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        usvg::Tree::from_data(&data, &usvg::Options::default()).map_err(|source| {
            ImageError::Svg {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    fn checked(path: &Path, width: u32, height: u32) -> Result<(u32, u32), ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidDimensions {
                path: path.to_path_buf(),
                width,
                height,
            });
        }
        Ok((width, height))
    }
}

fn scaled(extent: u32, sample_size: u32) -> u32 {
    (extent / sample_size.max(1)).max(1)
}

impl ImageSource for FsImageSource {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn decode_bounds(&self, path: &Path) -> Result<(u32, u32), ImageError> {
        match Self::kind(path)? {
            ImageKind::Png => {
                let (width, height) =
                    Self::raster_reader(path)?
                        .into_dimensions()
                        .map_err(|source| ImageError::Raster {
                            path: path.to_path_buf(),
                            source,
                        })?;
                Self::checked(path, width, height)
            }
            ImageKind::Svg => {
                let size = Self::svg_tree(path)?.size();
                Self::checked(
                    path,
                    size.width().ceil() as u32,
                    size.height().ceil() as u32,
                )
            }
        }
    }

    fn decode(&self, path: &Path, sample_size: u32) -> Result<DecodedImage, ImageError> {
        match Self::kind(path)? {
            ImageKind::Png => {
                let raster_err = |source| ImageError::Raster {
                    path: path.to_path_buf(),
                    source,
                };
                let decoder = Self::raster_reader(path)?
                    .into_decoder()
                    .map_err(raster_err)?;
                let native_bytes = decoder.total_bytes();
                if native_bytes > self.max_decode_bytes {
                    return Err(ImageError::TooLarge {
                        path: path.to_path_buf(),
                        bytes: native_bytes,
                        limit: self.max_decode_bytes,
                    });
                }
                let full = DynamicImage::from_decoder(decoder).map_err(raster_err)?;
                let (width, height) = Self::checked(path, full.width(), full.height())?;
                let (width, height) = (scaled(width, sample_size), scaled(height, sample_size));
                let reduced = full.resize_exact(width, height, FilterType::Triangle);
                Ok(DecodedImage::from_rgba(
                    width,
                    height,
                    reduced.to_rgba8().as_raw(),
                ))
            }
            ImageKind::Svg => {
                let tree = Self::svg_tree(path)?;
                let size = tree.size();
                let (native_w, native_h) = Self::checked(
                    path,
                    size.width().ceil() as u32,
                    size.height().ceil() as u32,
                )?;
                let width = scaled(native_w, sample_size);
                let height = scaled(native_h, sample_size);
                let mut pixmap =
                    Pixmap::new(width, height).ok_or_else(|| ImageError::InvalidDimensions {
                        path: path.to_path_buf(),
                        width,
                        height,
                    })?;
                let transform = Transform::from_scale(
                    width as f32 / size.width(),
                    height as f32 / size.height(),
                );
                resvg::render(&tree, transform, &mut pixmap.as_mut());
                Ok(DecodedImage::from_premultiplied(width, height, pixmap.data()))
            }
        }
    }
}
