use crate::{DownsampleMode, RawPoint};

fn stride(len: usize, max_points: usize) -> usize {
    len.div_ceil(max_points)
}

/// Keep every `skip`-th point, starting with the first, where
/// `skip = ceil(len / max_points)`.
///
/// Batches already within the ceiling are returned unchanged. The output is an
/// order-preserving subsequence of the input with `ceil(len / skip)` points.
/// A ceiling of zero yields an empty output.
#[must_use]
pub fn reduce(points: &[RawPoint], max_points: usize) -> Vec<RawPoint> {
    if max_points == 0 {
        return Vec::new();
    }
    if points.len() <= max_points {
        return points.to_vec();
    }
    let skip = stride(points.len(), max_points);
    points.iter().step_by(skip).copied().collect()
}

/// Fold each run of `skip` consecutive points into one candle.
///
/// A bucket takes the first open and open time, the highest high, the lowest
/// low, the last close and the summed volume. Bucket boundaries follow the
/// same stride as [`reduce`], so both modes produce the same output length.
#[must_use]
pub fn aggregate(points: &[RawPoint], max_points: usize) -> Vec<RawPoint> {
    if max_points == 0 {
        return Vec::new();
    }
    if points.len() <= max_points {
        return points.to_vec();
    }
    let skip = stride(points.len(), max_points);
    points
        .chunks(skip)
        .filter_map(|bucket| {
            let (first, rest) = bucket.split_first()?;
            Some(rest.iter().fold(*first, |mut acc, p| {
                acc.high = acc.high.max(p.high);
                acc.low = acc.low.min(p.low);
                acc.close = p.close;
                acc.volume += p.volume;
                acc
            }))
        })
        .collect()
}

/// Apply the reduction selected by `mode`.
#[must_use]
pub fn downsample(points: &[RawPoint], max_points: usize, mode: DownsampleMode) -> Vec<RawPoint> {
    let out = match mode {
        DownsampleMode::Decimate => reduce(points, max_points),
        DownsampleMode::Aggregate => aggregate(points, max_points),
    };
    #[cfg(feature = "tracing")]
    if out.len() < points.len() {
        tracing::debug!(
            raw = points.len(),
            kept = out.len(),
            ?mode,
            "downsampled batch"
        );
    }
    out
}
