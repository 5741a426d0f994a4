//! Peak generation utilities for waveform display
//!
//! These functions downsample decoded audio into min/max peak pairs, one pair
//! per bar of the waveform surface.

/// Smoothing window size for peaks (moving average)
pub const PEAK_SMOOTHING_WINDOW: usize = 3;

/// Generate peak data for a mono signal
///
/// Downsamples the audio to one min/max pair per column. A signal shorter
/// than `width` yields one column per sample.
pub fn generate_peaks(samples: &[f32], width: usize) -> Vec<(f32, f32)> {
    let len = samples.len();
    if len == 0 || width == 0 {
        return Vec::new();
    }

    let columns = width.min(len);
    let samples_per_column = len / columns;

    (0..columns)
        .map(|col| {
            let start = col * samples_per_column;
            // Last column absorbs the remainder
            let end = if col + 1 == columns {
                len
            } else {
                (col + 1) * samples_per_column
            };

            let mut min = f32::INFINITY;
            let mut max = f32::NEG_INFINITY;
            for &sample in &samples[start..end] {
                min = min.min(sample);
                max = max.max(sample);
            }

            (min, max)
        })
        .collect()
}

/// Apply moving average smoothing to peaks
///
/// Note: This reduces the array length by (window_size - 1).
pub fn smooth_peaks(peaks: &[(f32, f32)]) -> Vec<(f32, f32)> {
    if peaks.len() < PEAK_SMOOTHING_WINDOW {
        return peaks.to_vec();
    }

    peaks
        .windows(PEAK_SMOOTHING_WINDOW)
        .map(|w| {
            let min_avg = w.iter().map(|(m, _)| m).sum::<f32>() / PEAK_SMOOTHING_WINDOW as f32;
            let max_avg = w.iter().map(|(_, m)| m).sum::<f32>() / PEAK_SMOOTHING_WINDOW as f32;
            (min_avg, max_avg)
        })
        .collect()
}

/// Scale peaks in place so the loudest one reaches ±1.0
///
/// Silence is left untouched.
pub fn normalize_peaks(peaks: &mut [(f32, f32)]) {
    let loudest = peaks
        .iter()
        .map(|&(min, max)| min.abs().max(max.abs()))
        .fold(0.0f32, f32::max);

    if loudest <= f32::EPSILON {
        return;
    }

    let gain = 1.0 / loudest;
    for (min, max) in peaks.iter_mut() {
        *min *= gain;
        *max *= gain;
    }
    log::debug!("Normalized {} peaks with gain {:.3}", peaks.len(), gain);
}
