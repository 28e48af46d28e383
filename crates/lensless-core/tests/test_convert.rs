mod common;

use std::fs;

use ndarray::{ArrayD, IxDyn};
use tempfile::tempdir;

use lensless_core::array::{Dtype, ImageArray};
use lensless_core::convert::{
    convert_file, prepare_for_admm, run_batch, ConversionKind, FileReport, Tag,
};
use lensless_core::error::LenslessError;
use lensless_core::io::npy::read_npy;

fn rgb_float(h: usize, w: usize, max: f32) -> ArrayD<f32> {
    ArrayD::from_shape_fn(IxDyn(&[h, w, 3]), |ix| {
        if ix[0] == h / 2 && ix[1] == w / 2 && ix[2] == 1 {
            max
        } else {
            (ix[0] + ix[1]) as f32 / (h + w) as f32
        }
    })
}

#[test]
fn test_generic_rgb_scenario() {
    let dir = tempdir().unwrap();
    let path = common::write_array(dir.path(), "meas.npy", rgb_float(100, 100, 2.5));

    let report = convert_file(ConversionKind::Generic, &path, "_1hw1").unwrap();
    assert_eq!(report.tag, Tag::Ok);
    assert_eq!(report.path, dir.path().join("meas_1hw1.npy"));

    let out = read_npy(&report.path).unwrap().into_u16().unwrap();
    assert_eq!(out.shape(), &[1, 100, 100, 1]);
    assert_eq!(out[[0, 50, 50, 0]], 65535);
    assert_eq!(out.iter().copied().max(), Some(65535));
}

#[test]
fn test_canonical_psf_is_skipped_without_rewrite() {
    let dir = tempdir().unwrap();
    let a = ArrayD::from_shape_fn(IxDyn(&[1, 50, 50, 1]), |ix| (ix[1] * 50 + ix[2]) as u16);
    let path = common::write_array(dir.path(), "psf.npy", a);
    let before = fs::read(&path).unwrap();

    let report = convert_file(ConversionKind::Psf, &path, "").unwrap();
    assert_eq!(report.tag, Tag::Skip);
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn test_canonical_shape_with_float_dtype_is_still_converted() {
    let dir = tempdir().unwrap();
    let a = ArrayD::from_elem(IxDyn(&[1, 4, 4, 1]), 0.5f32);
    let path = common::write_array(dir.path(), "psf.npy", a);

    let report = convert_file(ConversionKind::Psf, &path, "").unwrap();
    assert_eq!(report.tag, Tag::Ok);
    let out = read_npy(&path).unwrap();
    assert_eq!(out.dtype(), Dtype::U16);
    assert!(out.into_u16().unwrap().iter().all(|&v| v == 65535));
}

#[test]
fn test_bad_psf_shape_is_fatal_for_prep() {
    let dir = tempdir().unwrap();
    let psf = common::write_array(dir.path(), "psf.npy", ArrayD::<f32>::ones(IxDyn(&[10, 10, 5])));
    let data = common::write_array(dir.path(), "data.npy", ArrayD::<f32>::ones(IxDyn(&[10, 10, 3])));
    let data_before = fs::read(&data).unwrap();

    let mut reports = Vec::new();
    let err = prepare_for_admm(&psf, &data, "", |r| reports.push(r.clone())).unwrap_err();
    assert!(matches!(err, LenslessError::UnexpectedShape { .. }));
    assert!(reports.is_empty());
    // The measurement is never reached.
    assert_eq!(fs::read(&data).unwrap(), data_before);
}

#[test]
fn test_bad_psf_shape_stops_psf_batch() {
    let dir = tempdir().unwrap();
    let bad = common::write_array(dir.path(), "bad.npy", ArrayD::<f32>::ones(IxDyn(&[10, 10, 5])));
    let good = common::write_array(dir.path(), "good.npy", rgb_float(6, 8, 3.0));
    let good_before = fs::read(&good).unwrap();

    let mut reports = Vec::new();
    let paths = vec![bad, good.clone()];
    let err = run_batch(ConversionKind::Psf, &paths, "", |r| reports.push(r.clone())).unwrap_err();
    assert!(matches!(err, LenslessError::UnexpectedShape { .. }));
    assert!(reports.is_empty());
    assert_eq!(fs::read(&good).unwrap(), good_before);
}

#[test]
fn test_bad_shape_is_skipped_by_generic_converter() {
    let dir = tempdir().unwrap();
    let path = common::write_array(dir.path(), "odd.npy", ArrayD::<f32>::ones(IxDyn(&[10, 10, 5])));
    let before = fs::read(&path).unwrap();

    let report = convert_file(ConversionKind::Generic, &path, "_1hw1").unwrap();
    assert_eq!(report.tag, Tag::Skip);
    assert!(report.message.contains("(10, 10, 5)"));
    assert!(!dir.path().join("odd_1hw1.npy").exists());

    let report = convert_file(ConversionKind::Generic, &path, "").unwrap();
    assert_eq!(report.tag, Tag::Skip);
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn test_all_zero_data_warns() {
    let dir = tempdir().unwrap();
    let path = common::write_array(dir.path(), "dark.npy", ArrayD::<u8>::zeros(IxDyn(&[20, 20, 1])));

    let report = convert_file(ConversionKind::Data, &path, "").unwrap();
    assert_eq!(report.tag, Tag::Warn);
    let out = read_npy(&path).unwrap();
    assert_eq!(out.dtype(), Dtype::U16);
    assert_eq!(out.shape(), &[20, 20, 1]);
    assert!(out.into_u16().unwrap().iter().all(|&v| v == 0));
}

#[test]
fn test_prep_writes_both_canonical_shapes() {
    let dir = tempdir().unwrap();
    let psf = common::write_array(dir.path(), "psf.npy", rgb_float(6, 8, 3.0));
    let data_rgb = ArrayD::from_shape_fn(IxDyn(&[1, 6, 8, 3]), |ix| (ix[1] * 8 + ix[2]) as u8);
    let data = common::write_array(dir.path(), "data.npy", data_rgb);

    let mut reports: Vec<FileReport> = Vec::new();
    let summary = prepare_for_admm(&psf, &data, "_admm", |r| reports.push(r.clone())).unwrap();
    assert_eq!(summary.ok, 2);
    assert_eq!(reports.len(), 2);

    let psf_out = read_npy(&dir.path().join("psf_admm.npy")).unwrap();
    assert_eq!(psf_out.shape(), &[1, 6, 8, 1]);
    let data_out = read_npy(&dir.path().join("data_admm.npy")).unwrap();
    assert_eq!(data_out.shape(), &[6, 8, 1]);
    assert_eq!(data_out.dtype(), Dtype::U16);
}

#[test]
fn test_batch_continues_after_recoverable_errors() {
    let dir = tempdir().unwrap();
    let good = common::write_array(dir.path(), "good.npy", ArrayD::from_elem(IxDyn(&[2, 2]), 1.0f64));
    let missing = dir.path().join("missing.npy");
    let flags = common::write_array(dir.path(), "mask.npy", ArrayD::from_elem(IxDyn(&[2, 2]), true));
    let already = common::write_array(dir.path(), "u16.npy", ArrayD::<u16>::ones(IxDyn(&[2, 2])));

    let mut tags = Vec::new();
    let summary = run_batch(
        ConversionKind::Uint16,
        &[missing, good, flags, already],
        "",
        |r| tags.push(r.tag),
    )
    .unwrap();
    assert_eq!(tags, vec![Tag::Err, Tag::Ok, Tag::Err, Tag::Skip]);
    assert_eq!(summary.total(), 4);
    assert_eq!(summary.failed, 2);
}

#[test]
fn test_bad_data_shape_is_reported_not_fatal() {
    let dir = tempdir().unwrap();
    let a = common::write_array(dir.path(), "a.npy", ArrayD::<u16>::zeros(IxDyn(&[2, 4, 4, 3])));
    let b = common::write_array(dir.path(), "b.npy", ArrayD::from_elem(IxDyn(&[4, 4, 3]), 9u16));

    let mut reports = Vec::new();
    run_batch(ConversionKind::Data, &[a, b], "", |r| reports.push(r.clone())).unwrap();
    assert_eq!(reports[0].tag, Tag::Err);
    assert_eq!(reports[1].tag, Tag::Ok);
}

#[test]
fn test_squeeze_reports_depth_mismatch() {
    let dir = tempdir().unwrap();
    let path = common::write_array(dir.path(), "stack.npy", ImageArray::zeros(Dtype::F32, &[3, 4, 4]));
    let report = convert_file(ConversionKind::SqueezeDepth, &path, "").unwrap();
    assert_eq!(report.tag, Tag::Skip);
    assert!(report.message.contains("depth axis length is 3"));
}
