use ndarray::{Array3, Array4, ArrayD, Axis, IxDyn};

use lensless_core::array::ImageArray;
use lensless_core::error::LenslessError;
use lensless_core::normalize::{
    normalize_dims_generic, normalize_range, normalize_shape_data, normalize_shape_psf,
    squeeze_depth, RangeNote,
};

fn ramp_f32(shape: &[usize], max: f32) -> ArrayD<f32> {
    let n: usize = shape.iter().product();
    let values: Vec<f32> = (0..n).map(|i| i as f32 / (n - 1) as f32 * max).collect();
    ArrayD::from_shape_vec(IxDyn(shape), values).unwrap()
}

#[test]
fn test_u16_range_is_identity() {
    let a = ArrayD::from_shape_fn(IxDyn(&[4, 6, 1]), |ix| (ix[0] * 1000 + ix[1] * 7) as u16);
    let out = normalize_range(ImageArray::U16(a.clone())).unwrap();
    assert_eq!(out.note, RangeNote::AlreadyCanonical);
    assert_eq!(out.array, a);
}

#[test]
fn test_float_range_spans_full_scale() {
    let a = ramp_f32(&[8, 8, 3], 2.5);
    let out = normalize_range(ImageArray::F32(a)).unwrap();
    assert_eq!(out.array.iter().copied().max(), Some(65535));
    assert_eq!(out.array.iter().copied().min(), Some(0));
    assert!(matches!(out.note, RangeNote::Rescaled { .. }));
}

#[test]
fn test_integer_inputs_are_rescaled() {
    let a = ArrayD::from_shape_vec(IxDyn(&[4]), vec![0u8, 51, 102, 255]).unwrap();
    let out = normalize_range(ImageArray::U8(a)).unwrap();
    assert_eq!(out.array.as_slice().unwrap(), &[0, 13107, 26214, 65535]);

    let a = ArrayD::from_shape_vec(IxDyn(&[3]), vec![-10i32, 0, 20]).unwrap();
    let out = normalize_range(ImageArray::I32(a)).unwrap();
    assert_eq!(out.array.as_slice().unwrap(), &[0, 0, 65535]);
}

#[test]
fn test_f64_is_scaled_in_double_precision() {
    let a = ArrayD::from_shape_vec(IxDyn(&[3]), vec![0.0f64, 0.5, 1.0]).unwrap();
    let out = normalize_range(ImageArray::F64(a)).unwrap();
    // 0.5 * 65535 = 32767.5 rounds away from zero.
    assert_eq!(out.array.as_slice().unwrap(), &[0, 32768, 65535]);
}

#[test]
fn test_all_zero_input_stays_zero() {
    let a = ArrayD::<u8>::zeros(IxDyn(&[20, 20, 1]));
    let out = normalize_range(ImageArray::U8(a)).unwrap();
    assert_eq!(out.note, RangeNote::AllZero);
    assert_eq!(out.array.shape(), &[20, 20, 1]);
    assert!(out.array.iter().all(|&v| v == 0));
}

#[test]
fn test_bool_is_unsupported() {
    let a = ArrayD::from_elem(IxDyn(&[2, 2]), true);
    let err = normalize_range(ImageArray::Bool(a)).unwrap_err();
    assert!(matches!(err, LenslessError::UnsupportedDtype(_)));
}

#[test]
fn test_psf_canonical_shape_is_identity() {
    let a = ArrayD::from_shape_fn(IxDyn(&[1, 50, 50, 1]), |ix| (ix[1] + ix[2]) as u16);
    let out = normalize_shape_psf(ImageArray::U16(a.clone())).unwrap();
    assert!(out.is_unchanged());
    assert_eq!(out.into_inner(), ImageArray::U16(a));
}

#[test]
fn test_psf_from_rgb_equals_green_channel() {
    let rgb = Array3::from_shape_fn((5, 7, 3), |(r, c, ch)| (r * 100 + c * 10 + ch) as f32);
    let out = normalize_shape_psf(ImageArray::F32(rgb.clone().into_dyn())).unwrap();
    let out = match out.into_inner() {
        ImageArray::F32(a) => a,
        other => panic!("dtype changed to {}", other.dtype()),
    };
    assert_eq!(out.shape(), &[1, 5, 7, 1]);
    for r in 0..5 {
        for c in 0..7 {
            assert_eq!(out[[0, r, c, 0]], rgb[[r, c, 1]]);
        }
    }
}

#[test]
fn test_psf_rejects_five_channels() {
    let a = ArrayD::<f32>::zeros(IxDyn(&[10, 10, 5]));
    match normalize_shape_psf(ImageArray::F32(a)) {
        Err(LenslessError::UnexpectedShape { shape, .. }) => assert_eq!(shape, vec![10, 10, 5]),
        other => panic!("expected UnexpectedShape, got {other:?}"),
    }
}

#[test]
fn test_data_from_depth_rgb_equals_squeezed_green() {
    let a = Array4::from_shape_fn((1, 4, 6, 3), |(_, r, c, ch)| (r * 60 + c * 3 + ch) as u16);
    let out = normalize_shape_data(ImageArray::U16(a.clone().into_dyn())).unwrap();
    let out = out.into_inner().into_u16().unwrap();
    assert_eq!(out.shape(), &[4, 6, 1]);
    let green = a.index_axis(Axis(0), 0).index_axis(Axis(2), 1).to_owned();
    assert_eq!(out.index_axis(Axis(2), 0), green.into_dyn());
}

#[test]
fn test_data_canonical_shape_is_identity() {
    let a = ArrayD::<f32>::ones(IxDyn(&[3, 3, 1]));
    assert!(normalize_shape_data(ImageArray::F32(a)).unwrap().is_unchanged());
}

#[test]
fn test_data_rejects_two_dimensional() {
    let a = ArrayD::<f32>::ones(IxDyn(&[3, 3]));
    assert!(matches!(
        normalize_shape_data(ImageArray::F32(a)),
        Err(LenslessError::UnexpectedShape { .. })
    ));
}

#[test]
fn test_generic_scenario_rgb_float() {
    let a = ramp_f32(&[100, 100, 3], 2.5);
    let out = normalize_dims_generic(ImageArray::F32(a)).unwrap();
    assert_eq!(out.array.shape(), &[1, 100, 100, 1]);
    assert_eq!(out.array.iter().copied().max(), Some(65535));
}

#[test]
fn test_generic_rejects_non_rgb() {
    let a = ArrayD::<f32>::ones(IxDyn(&[10, 10, 5]));
    assert!(matches!(
        normalize_dims_generic(ImageArray::F32(a)),
        Err(LenslessError::UnexpectedShape { .. })
    ));
}

#[test]
fn test_squeeze_depth_drops_leading_axis() {
    let a = ArrayD::from_elem(IxDyn(&[1, 6, 4, 1]), 3u8);
    let out = squeeze_depth(ImageArray::U8(a)).unwrap();
    assert_eq!(out.array.shape(), &[6, 4, 1]);
    assert!(out.array.iter().all(|&v| v == 65535));
}
