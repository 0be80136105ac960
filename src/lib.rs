//! Tools that drive the spreadsheet HTTP API: a randomized load generator and
//! an image-to-cells converter, sharing the same cell payload.

pub mod cell;
pub mod error;
pub mod image_converter_lib;
pub mod load_generator_lib;

use reqwest::{header, Client, Response};

pub use cell::{random_cell, random_raw_value, Cell, ValueKind};
pub use error::{ConfigError, LoadTestError};
pub use image_converter_lib::{convert_image_file, ConvertOptions, UploadReport};
pub use load_generator_lib::{LoadTestConfig, RequestOutcome, RunReport};

// Trait to abstract where cell updates are sent
pub trait SpreadsheetConfig {
    fn spreadsheet_url(&self) -> &str;
}

impl SpreadsheetConfig for str {
    fn spreadsheet_url(&self) -> &str {
        self
    }
}

impl SpreadsheetConfig for String {
    fn spreadsheet_url(&self) -> &str {
        self
    }
}

/// POST a single cell as JSON. Any HTTP status is returned as a response;
/// only transport failures are errors.
pub async fn post_cell(client: &Client, url: &str, cell: &Cell) -> reqwest::Result<Response> {
    client
        .post(url)
        .header(header::CONTENT_TYPE, "application/json")
        .json(cell)
        .send()
        .await
}
