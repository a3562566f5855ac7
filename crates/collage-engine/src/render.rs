use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::error::{CollageError, RenderError};

pub trait CollageRenderer: Send + Sync {
    fn layout(&self, images: &[DynamicImage], width: u32) -> Result<DynamicImage, RenderError>;
}

pub trait ImageWriter: Send + Sync {
    fn save(&self, image: &DynamicImage, path: &Path) -> Result<(), CollageError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    pub columns: u32,
    pub rows: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    pub width: u32,
    pub height: u32,
}

/// Square-ish grid of 4:3 cells separated by a solid border.
#[derive(Debug, Clone, Copy)]
pub struct GridRenderer {
    border: u32,
    background: Rgba<u8>,
}

impl Default for GridRenderer {
    fn default() -> Self {
        Self {
            border: 2,
            background: Rgba([0xaf, 0xaf, 0xaf, 0xff]),
        }
    }
}

impl GridRenderer {
    pub fn geometry(&self, count: usize, width: u32) -> Result<GridGeometry, RenderError> {
        if count == 0 {
            return Err(RenderError::NoImages);
        }
        let mut columns = 1usize;
        while columns * columns < count {
            columns += 1;
        }
        let rows = count.div_ceil(columns) as u32;
        let columns = columns as u32;

        let gutters = self.border.saturating_mul(columns + 1);
        let cell_width = width.saturating_sub(gutters) / columns;
        if cell_width == 0 {
            return Err(RenderError::WidthTooSmall {
                width,
                columns,
                border: self.border,
            });
        }
        let cell_height = (cell_width * 3 / 4).max(1);

        Ok(GridGeometry {
            columns,
            rows,
            cell_width,
            cell_height,
            width,
            height: rows * cell_height + self.border * (rows + 1),
        })
    }
}

impl CollageRenderer for GridRenderer {
    fn layout(&self, images: &[DynamicImage], width: u32) -> Result<DynamicImage, RenderError> {
        let grid = self.geometry(images.len(), width)?;
        let mut canvas = RgbaImage::from_pixel(grid.width, grid.height, self.background);

        for (idx, image) in images.iter().enumerate() {
            let idx = idx as u32;
            let x = self.border + (idx % grid.columns) * (grid.cell_width + self.border);
            let y = self.border + (idx / grid.columns) * (grid.cell_height + self.border);
            let cell = image
                .resize_to_fill(grid.cell_width, grid.cell_height, FilterType::Triangle)
                .to_rgba8();
            imageops::overlay(&mut canvas, &cell, i64::from(x), i64::from(y));
        }

        Ok(DynamicImage::ImageRgba8(canvas))
    }
}

/// Writes JPEG unless the path's extension names another format.
#[derive(Debug, Clone, Copy)]
pub struct JpegWriter {
    quality: u8,
}

impl Default for JpegWriter {
    fn default() -> Self {
        Self { quality: 90 }
    }
}

impl ImageWriter for JpegWriter {
    fn save(&self, image: &DynamicImage, path: &Path) -> Result<(), CollageError> {
        let io_err = |source| CollageError::Io {
            path: path.to_path_buf(),
            source,
        };
        let encode_err = |source| CollageError::Encode {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Jpeg);
        if format != ImageFormat::Jpeg {
            return image.save_with_format(path, format).map_err(encode_err);
        }

        let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
        JpegEncoder::new_with_quality(&mut writer, self.quality)
            .encode_image(&image.to_rgb8())
            .map_err(encode_err)?;
        writer.flush().map_err(io_err)
    }
}
