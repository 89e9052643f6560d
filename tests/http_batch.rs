//! End-to-end: serve the router on an ephemeral port and drive a batch
//! through the HTTP converter.

use image::{ImageFormat, Rgba, RgbaImage};
use image_converter::archive::build_archive;
use image_converter::batch::{Batch, BatchEvent, JobStatus};
use image_converter::client::HttpConverter;
use image_converter::format::{FormatKey, InputType};
use image_converter::imaging::RustBackend;
use image_converter::server::router;
use image_converter::upload::{UploadedFile, collect};
use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::Duration;

fn png_fixture() -> Vec<u8> {
    let image = RgbaImage::from_fn(24, 24, |x, _| {
        if x < 12 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([20, 120, 220, 255])
        }
    });
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

async fn spawn_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(Arc::new(RustBackend::new()), 10 * 1024 * 1024);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn corrupt_middle_file_fails_alone() {
    let base_url = spawn_server().await;
    let converter = HttpConverter::new(&base_url, Duration::from_secs(5)).unwrap();

    let good = png_fixture();
    let mut batch = Batch::new();
    batch.load(vec![
        UploadedFile::new(Some("first.png"), None, good.clone(), InputType::Png),
        UploadedFile::new(Some("second.png"), None, b"not an image".to_vec(), InputType::Png),
        UploadedFile::new(Some("third.png"), None, good, InputType::Png),
    ]);

    let (tx, rx) = std::sync::mpsc::channel();
    batch
        .run(
            &converter,
            InputType::Png,
            FormatKey::WebpBalanced,
            Duration::from_millis(10),
            Some(tx),
        )
        .await;

    assert_eq!(
        batch.statuses(),
        vec![JobStatus::Done, JobStatus::Error, JobStatus::Done]
    );
    assert_eq!(batch.total_uploaded(), 3);
    assert_eq!(batch.total_completed(), 2);
    assert!(!batch.all_done());

    let failed = batch.jobs().nth(1).unwrap();
    assert!(failed.error.as_deref().unwrap().contains("Conversion failed"));

    let events: Vec<BatchEvent> = rx.try_iter().collect();
    let starts: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            BatchEvent::Started { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(starts, vec![0, 1, 2]);

    let zip_bytes = build_archive(batch.jobs()).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(zip_bytes)).unwrap();
    assert_eq!(archive.len(), 2);
    for (i, expected) in ["first.webp", "third.webp"].iter().enumerate() {
        let mut entry = archive.by_index(i).unwrap();
        assert_eq!(entry.name(), *expected);
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        assert_eq!(image::guess_format(&contents).unwrap(), ImageFormat::WebP);
    }
}

#[tokio::test]
async fn collected_directory_converts_to_png() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.png"), png_fixture()).unwrap();
    std::fs::write(dir.path().join("b.PNG"), png_fixture()).unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"skip me").unwrap();

    let collection = collect(&[dir.path().to_path_buf()], InputType::Png).unwrap();
    assert_eq!(collection.files.len(), 2);
    assert_eq!(collection.skipped.len(), 1);

    let base_url = spawn_server().await;
    let converter = HttpConverter::new(&base_url, Duration::from_secs(5)).unwrap();
    let mut batch = Batch::new();
    batch.load(collection.files);
    batch
        .run(
            &converter,
            InputType::Png,
            FormatKey::Png,
            Duration::from_millis(10),
            None,
        )
        .await;

    assert!(batch.all_done());
    for job in batch.completed() {
        let bytes = job.result_bytes.as_ref().unwrap();
        let decoded = image::load_from_memory(bytes).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0[3], 0);
    }
}
