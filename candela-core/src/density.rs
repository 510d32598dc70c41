/// Narrowest candle width handed to the renderer.
pub const MIN_WIDTH: f64 = 0.1;
/// Widest candle width handed to the renderer.
pub const MAX_WIDTH: f64 = 0.95;

/// Bucket of visible point counts sharing one width rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DensityTier {
    /// At most 20 points: widen by 1.5x, capped at [`MAX_WIDTH`].
    Sparse,
    /// 21 to 50 points: widen by 1.2x.
    Light,
    /// 51 to 100 points: base width.
    Normal,
    /// More than 100 points: narrow by 0.8x, floored at [`MIN_WIDTH`].
    Dense,
}

impl DensityTier {
    /// Tier for a visible point count.
    #[must_use]
    pub const fn for_count(points_in_view: usize) -> Self {
        match points_in_view {
            0..=20 => Self::Sparse,
            21..=50 => Self::Light,
            51..=100 => Self::Normal,
            _ => Self::Dense,
        }
    }

    /// Apply the tier rule to `base_width`, before the final clamp.
    #[must_use]
    pub fn scale(self, base_width: f64) -> f64 {
        match self {
            Self::Sparse => (base_width * 1.5).min(MAX_WIDTH),
            Self::Light => base_width * 1.2,
            Self::Normal => base_width,
            Self::Dense => (base_width * 0.8).max(MIN_WIDTH),
        }
    }
}

/// Candle width for `points_in_view` visible points.
///
/// The result is always within `[MIN_WIDTH, MAX_WIDTH]`. A non-finite or
/// non-positive `base_width` is treated as [`MIN_WIDTH`].
#[must_use]
pub fn density(points_in_view: usize, base_width: f64) -> f64 {
    let base = if base_width.is_finite() && base_width > 0.0 {
        base_width
    } else {
        MIN_WIDTH
    };
    DensityTier::for_count(points_in_view)
        .scale(base)
        .clamp(MIN_WIDTH, MAX_WIDTH)
}
