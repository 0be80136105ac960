use anyhow::Result;
use image::{Rgba, RgbaImage};
use mockito::{Matcher, Server};
use serde_json::json;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};
use xls_loadtest_lib::image_converter_lib::{convert_image_file, ConvertOptions, UploadReport};

fn write_image(dir: &TempDir, name: &str, img: &RgbaImage) -> Result<PathBuf> {
    let path = dir.path().join(name);
    img.save(&path)?;
    Ok(path)
}

fn write_red_pixel(dir: &TempDir) -> Result<PathBuf> {
    write_image(dir, "red.png", &RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 255])))
}

#[tokio::test]
async fn test_single_red_pixel() -> Result<()> {
    let temp_dir = tempdir()?;
    let path = write_red_pixel(&temp_dir)?;

    let mut server = Server::new_async().await;
    let red = i32::from_be_bytes([0xFF, 0x00, 0x00, 0xFF]);
    let mock = server
        .mock("POST", "/api/spreadsheet")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"id": 0, "raw_value": "", "background": red})))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let url = format!("{}/api/spreadsheet", server.url());
    let options = ConvertOptions {
        max_width: 1,
        row_start: 0,
        height_scale: 1.0,
    };
    let report = convert_image_file(&reqwest::Client::new(), url.as_str(), &path, &options).await?;

    assert_eq!(report, UploadReport { cells_sent: 1, failed: 0 });
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_default_options_double_the_rows() -> Result<()> {
    let temp_dir = tempdir()?;
    let path = write_red_pixel(&temp_dir)?;

    let mut server = Server::new_async().await;
    let red = i32::from_be_bytes([0xFF, 0x00, 0x00, 0xFF]);
    let first_row = server
        .mock("POST", "/api/spreadsheet")
        .match_body(Matcher::Json(json!({"id": 0, "raw_value": "", "background": red})))
        .expect(1)
        .create_async()
        .await;
    let second_row = server
        .mock("POST", "/api/spreadsheet")
        .match_body(Matcher::Json(json!({"id": 26, "raw_value": "", "background": red})))
        .expect(1)
        .create_async()
        .await;

    let url = format!("{}/api/spreadsheet", server.url());
    let options = ConvertOptions {
        max_width: 1,
        ..ConvertOptions::default()
    };
    let report = convert_image_file(&reqwest::Client::new(), url.as_str(), &path, &options).await?;

    assert_eq!(report.cells_sent, 2);
    assert_eq!(report.failed, 0);
    first_row.assert_async().await;
    second_row.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_counts_rejected_cells() -> Result<()> {
    let temp_dir = tempdir()?;
    let grey = RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]));
    let path = write_image(&temp_dir, "grey.png", &grey)?;

    // Large error bodies are drained before the next cell goes out
    let body = json!({"error": "Invalid cell ID", "detail": "x".repeat(64 * 1024)});

    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/spreadsheet")
        .with_status(400)
        .with_body(body.to_string())
        .expect(4)
        .create_async()
        .await;

    let url = format!("{}/api/spreadsheet", server.url());
    let options = ConvertOptions {
        max_width: 2,
        row_start: 10,
        height_scale: 1.0,
    };
    let report = convert_image_file(&reqwest::Client::new(), url.as_str(), &path, &options).await?;

    assert_eq!(report, UploadReport { cells_sent: 4, failed: 4 });
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_missing_image_is_an_error() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let path = temp_dir.path().join("missing.png");

    let result = convert_image_file(
        &reqwest::Client::new(),
        "http://127.0.0.1:9/api/spreadsheet",
        &path,
        &ConvertOptions::default(),
    )
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_transport_error_aborts_upload() -> Result<()> {
    let temp_dir = tempdir()?;
    let path = write_red_pixel(&temp_dir)?;

    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);

    let url = format!("http://127.0.0.1:{}/api/spreadsheet", port);
    let options = ConvertOptions::default();
    let result = convert_image_file(&reqwest::Client::new(), url.as_str(), &path, &options).await;

    let err = result.expect_err("Upload to a closed port must fail");
    assert!(format!("{:#}", err).contains("Failed to send cell 0"));
    Ok(())
}

#[tokio::test]
async fn test_overflowing_row_start_sends_nothing() -> Result<()> {
    let temp_dir = tempdir()?;
    let path = write_red_pixel(&temp_dir)?;

    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/spreadsheet")
        .expect(0)
        .create_async()
        .await;

    let url = format!("{}/api/spreadsheet", server.url());
    let options = ConvertOptions {
        max_width: 1,
        row_start: i64::MAX / 10,
        height_scale: 1.0,
    };
    let result = convert_image_file(&reqwest::Client::new(), url.as_str(), &path, &options).await;

    let err = result.expect_err("Overflowing cell ids must be rejected");
    assert!(format!("{:#}", err).contains("row_start"));
    mock.assert_async().await;
    Ok(())
}
