use crate::cell::Cell;
use crate::{post_cell, SpreadsheetConfig};
use anyhow::Context;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use reqwest::Client;
use std::path::Path;
use tracing::{debug, info};

/// Cells per spreadsheet row; ids advance by this much per image row.
pub const ROW_WIDTH: i64 = 26;

/// Terminal-style cells are about twice as tall as wide, so rows are doubled.
pub const DEFAULT_HEIGHT_SCALE: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// Target width in cells.
    pub max_width: u32,
    /// Spreadsheet row the top of the image lands on.
    pub row_start: i64,
    pub height_scale: f64,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            max_width: ROW_WIDTH as u32,
            row_start: 0,
            height_scale: DEFAULT_HEIGHT_SCALE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadReport {
    pub cells_sent: usize,
    /// Responses whose status was not 200.
    pub failed: usize,
}

/// Resize to `max_width` columns keeping the aspect ratio, with the height
/// multiplied by `height_scale`.
pub fn prepare_image(
    img: &DynamicImage,
    max_width: u32,
    height_scale: f64,
) -> anyhow::Result<RgbaImage> {
    if max_width == 0 {
        anyhow::bail!("max_width must be greater than zero");
    }
    if !height_scale.is_finite() || height_scale < 0.0 {
        anyhow::bail!(
            "height_scale must be a finite, non-negative number, got {}",
            height_scale
        );
    }
    let rgba = img.to_rgba8();
    if rgba.width() == 0 {
        anyhow::bail!("image has zero width");
    }

    let width_ratio = max_width as f64 / rgba.width() as f64;
    let new_height = (rgba.height() as f64 * height_scale * width_ratio) as u32;
    debug!(
        width = rgba.width(),
        height = rgba.height(),
        new_width = max_width,
        new_height,
        "Resizing image"
    );

    if new_height == 0 {
        return Ok(RgbaImage::new(max_width, 0));
    }
    Ok(imageops::resize(&rgba, max_width, new_height, FilterType::Lanczos3))
}

/// Pack a pixel's R,G,B,A bytes big-endian into a signed 32-bit background.
pub fn pack_rgba(pixel: Rgba<u8>) -> i32 {
    i32::from_be_bytes(pixel.0)
}

/// `None` when the id does not fit in an `i64`.
pub fn cell_id(row_start: i64, row: u32, col: u32) -> Option<i64> {
    row_start
        .checked_add(row as i64)?
        .checked_mul(ROW_WIDTH)?
        .checked_add(col as i64)
}

/// One blank cell per pixel, row-major.
pub fn image_cells(img: &RgbaImage, row_start: i64) -> anyhow::Result<Vec<Cell>> {
    img.enumerate_pixels()
        .map(|(col, row, pixel)| {
            let id = cell_id(row_start, row, col).with_context(|| {
                format!("row_start {} too large: cell id for row {} overflows", row_start, row)
            })?;
            Ok(Cell::blank(id, pack_rgba(*pixel)))
        })
        .collect()
}

/// Send cells one after another over `client`.
///
/// Non-200 responses are counted; a transport failure aborts the upload.
pub async fn upload_cells<T, I>(
    client: &Client,
    config: &T,
    cells: I,
) -> anyhow::Result<UploadReport>
where
    T: SpreadsheetConfig + ?Sized,
    I: IntoIterator<Item = Cell>,
{
    let url = config.spreadsheet_url();
    let mut report = UploadReport::default();

    for cell in cells {
        let response = post_cell(client, url, &cell)
            .await
            .with_context(|| format!("Failed to send cell {} to {}", cell.id, url))?;
        report.cells_sent += 1;
        let status = response.status();
        // Drain the body so the connection goes back to the pool
        response
            .bytes()
            .await
            .with_context(|| {
                format!("Failed to read response for cell {} from {}", cell.id, url)
            })?;
        if status.as_u16() != 200 {
            debug!(id = cell.id, %status, "Cell rejected");
            report.failed += 1;
        }
    }

    Ok(report)
}

/// Load an image file and write it into the spreadsheet.
pub async fn convert_image_file<T: SpreadsheetConfig + ?Sized>(
    client: &Client,
    config: &T,
    path: impl AsRef<Path>,
    options: &ConvertOptions,
) -> anyhow::Result<UploadReport> {
    let path = path.as_ref();
    let img = image::open(path)
        .with_context(|| format!("Failed to open image {}", path.display()))?;
    let prepared = prepare_image(&img, options.max_width, options.height_scale)?;

    info!(
        image = %path.display(),
        width = prepared.width(),
        height = prepared.height(),
        row_start = options.row_start,
        "Uploading image"
    );

    let cells = image_cells(&prepared, options.row_start)?;
    let report = upload_cells(client, config, cells).await?;

    info!(sent = report.cells_sent, failed = report.failed, "Upload finished");
    Ok(report)
}
