//! Integration tests decoding generated artifacts with an independent scanner.

use std::path::Path;

use qrid_core::Identifier;
use qrid_encoder::{DEFAULT_SIZE_PX, EncodeError, ErrorCorrection, encode_to_file, render_png};

fn decode_png(path: &Path) -> String {
    let bitmap = image::open(path).expect("artifact should open").to_luma8();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        bitmap.width() as usize,
        bitmap.height() as usize,
        |x, y| bitmap.get_pixel(x as u32, y as u32).0[0],
    );
    let grids = prepared.detect_grids();
    assert_eq!(grids.len(), 1, "exactly one symbol should be detected");
    let (_meta, content) = grids[0].decode().expect("symbol should decode");
    content
}

#[test]
fn qr_decode_tests_device_identifier_round_trips_through_scanner() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("output_qr_code.png");
    let identifier = Identifier::new("DEVICE-1234").expect("valid identifier");

    encode_to_file(&identifier, &path, DEFAULT_SIZE_PX, ErrorCorrection::Low)
        .expect("artifact should be written");

    let bitmap = image::open(&path).expect("artifact should open");
    assert_eq!(bitmap.width(), 256);
    assert_eq!(bitmap.height(), 256);
    assert_eq!(decode_png(&path), "DEVICE-1234");
}

#[test]
fn qr_decode_tests_varied_identifiers_decode_exactly() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("output_qr_code.png");

    for raw in [
        "A",
        "3F2504E0-4F89-11D3-9A0C-0305E82C3301",
        "device id with spaces",
        "ünïcödé-ÄÖÜ",
        "lowercase-and-UPPER-0123456789-plus/symbols:$%*+",
    ] {
        let identifier = Identifier::new(raw).expect("valid identifier");
        encode_to_file(&identifier, &path, DEFAULT_SIZE_PX, ErrorCorrection::Low)
            .expect("artifact should be written");
        assert_eq!(decode_png(&path), raw);
    }
}

#[test]
fn qr_decode_tests_output_is_deterministic() {
    let identifier = Identifier::new("DEVICE-1234").expect("valid identifier");
    let first = render_png(&identifier, DEFAULT_SIZE_PX, ErrorCorrection::Low).expect("render");
    let second = render_png(&identifier, DEFAULT_SIZE_PX, ErrorCorrection::Low).expect("render");
    assert_eq!(first, second);
    assert_eq!(&first[..8], &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
}

#[test]
fn qr_decode_tests_oversized_identifier_fails_without_artifact() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("output_qr_code.png");
    let identifier = Identifier::new("x".repeat(3_000)).expect("valid identifier");

    let error = encode_to_file(&identifier, &path, DEFAULT_SIZE_PX, ErrorCorrection::Low)
        .expect_err("capacity should be exceeded");

    assert!(matches!(error, EncodeError::DataTooLong { bytes: 3_000 }));
    assert_eq!(
        std::fs::read_dir(dir.path()).expect("list dir").count(),
        0,
        "no artifact or temp file may remain"
    );
}

#[test]
fn qr_decode_tests_too_small_bitmap_is_rejected() {
    let identifier = Identifier::new("DEVICE-1234").expect("valid identifier");
    let error = render_png(&identifier, 20, ErrorCorrection::Low).expect_err("size too small");
    assert!(matches!(
        error,
        EncodeError::SizeTooSmall {
            size: 20,
            required: 29
        }
    ));
}

#[test]
fn qr_decode_tests_unwritable_target_leaves_no_temp_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing_parent = dir.path().join("missing").join("output_qr_code.png");
    let identifier = Identifier::new("DEVICE-1234").expect("valid identifier");

    let error = encode_to_file(&identifier, &missing_parent, DEFAULT_SIZE_PX, ErrorCorrection::Low)
        .expect_err("write should fail");

    assert!(matches!(error, EncodeError::Write { .. }));
    assert_eq!(std::fs::read_dir(dir.path()).expect("list dir").count(), 0);
}

#[test]
fn qr_decode_tests_existing_artifact_is_replaced() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("output_qr_code.png");
    std::fs::write(&path, b"stale bytes").expect("seed stale artifact");
    let identifier = Identifier::new("DEVICE-1234").expect("valid identifier");

    encode_to_file(&identifier, &path, DEFAULT_SIZE_PX, ErrorCorrection::Low)
        .expect("artifact should be written");

    assert_eq!(decode_png(&path), "DEVICE-1234");
    assert_eq!(std::fs::read_dir(dir.path()).expect("list dir").count(), 1);
}
