use ndarray::{Array2, Axis};
use num_complex::Complex;
use rustfft::{FftDirection, FftPlanner};

/// 2D autocorrelation of `data`, centred and cropped to the input size.
///
/// The input is zero-padded to twice its size so the correlation does not
/// wrap. Zero lag lands at `(h / 2, w / 2)` and the result is scaled so that
/// it equals 1 there. An all-zero input gives all zeros.
pub fn autocorr2d(data: &Array2<f32>) -> Array2<f32> {
    let (h, w) = data.dim();
    if h == 0 || w == 0 {
        return Array2::zeros((h, w));
    }
    let (ph, pw) = (2 * h, 2 * w);

    let mut padded = Array2::<f32>::zeros((ph, pw));
    padded.slice_mut(ndarray::s![..h, ..w]).assign(data);

    let mut planner = FftPlanner::new();
    let mut spectrum = padded.mapv(|v| Complex::new(v as f64, 0.0));
    transform_2d(&mut planner, &mut spectrum, FftDirection::Forward);
    spectrum.mapv_inplace(|c| Complex::new(c.norm_sqr(), 0.0));
    transform_2d(&mut planner, &mut spectrum, FftDirection::Inverse);
    let scale = 1.0 / (ph * pw) as f64;
    let corr = spectrum.mapv(|c| c.re * scale);

    let (ch, cw) = (h / 2, w / 2);
    let mut out = Array2::<f32>::zeros((h, w));
    for row in 0..h {
        for col in 0..w {
            let r = (row + ph - ch) % ph;
            let c = (col + pw - cw) % pw;
            out[[row, col]] = corr[[r, c]] as f32;
        }
    }

    let peak = out[[ch, cw]];
    if peak > 0.0 {
        out.mapv_inplace(|v| v / peak);
    } else {
        out.fill(0.0);
    }
    out
}

/// Unnormalized 2D FFT in place: every row, then every column.
fn transform_2d(planner: &mut FftPlanner<f64>, data: &mut Array2<Complex<f64>>, direction: FftDirection) {
    let (h, w) = data.dim();
    let mut scratch = Vec::new();
    for (axis, len) in [(Axis(1), w), (Axis(0), h)] {
        let fft = planner.plan_fft(len, direction);
        scratch.resize(fft.get_inplace_scratch_len(), Complex::default());
        let mut buffer = vec![Complex::default(); len];
        for mut lane in data.lanes_mut(axis) {
            buffer.iter_mut().zip(lane.iter()).for_each(|(b, &v)| *b = v);
            fft.process_with_scratch(&mut buffer, &mut scratch);
            lane.iter_mut().zip(&buffer).for_each(|(v, &b)| *v = b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_single_point_is_delta() {
        let mut img = Array2::<f32>::zeros((8, 8));
        img[[3, 5]] = 2.0;
        let ac = autocorr2d(&img);
        assert_eq!(ac.dim(), (8, 8));
        assert_abs_diff_eq!(ac[[4, 4]], 1.0, epsilon = 1e-6);
        let off_peak: f32 = ac.iter().map(|v| v.abs()).sum::<f32>() - ac[[4, 4]];
        assert!(off_peak < 1e-4);
    }

    #[test]
    fn test_peak_is_maximum() {
        let img = Array2::from_shape_fn((6, 10), |(r, c)| ((r * 7 + c * 3) % 5) as f32);
        let ac = autocorr2d(&img);
        let max = ac.iter().copied().fold(f32::MIN, f32::max);
        assert_abs_diff_eq!(max, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(ac[[3, 5]], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_zero_input() {
        let ac = autocorr2d(&Array2::zeros((4, 4)));
        assert!(ac.iter().all(|&v| v == 0.0));
    }
}
