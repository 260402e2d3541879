/// Number of opacity buckets the fragment program can index.
pub const OPACITY_SLOTS: usize = 10;

/// Ascending default buckets, ending fully opaque.
pub const DEFAULT_OPACITIES: [f32; OPACITY_SLOTS] =
    [0.3, 0.3, 0.3, 0.5, 0.5, 0.5, 0.8, 0.8, 0.8, 1.0];

/// Opacity lookup table with exactly [`OPACITY_SLOTS`] entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpacityTable([f32; OPACITY_SLOTS]);

impl OpacityTable {
    /// Fits an arbitrary list into the table.
    ///
    /// Short lists are padded with their last entry, long lists are cut at
    /// the last slot the shader reads, and an empty list yields
    /// [`DEFAULT_OPACITIES`].
    pub fn from_values(values: &[f32]) -> Self {
        let Some(&last) = values.last() else {
            return Self::default();
        };
        if values.len() != OPACITY_SLOTS {
            tracing::debug!(
                supplied = values.len(),
                slots = OPACITY_SLOTS,
                "resizing opacity table"
            );
        }
        Self(std::array::from_fn(|index| {
            values.get(index).copied().unwrap_or(last)
        }))
    }

    pub fn values(&self) -> &[f32; OPACITY_SLOTS] {
        &self.0
    }

    /// Bucket lookup with the index clamped into range.
    pub fn get(&self, index: usize) -> f32 {
        self.0[index.min(OPACITY_SLOTS - 1)]
    }
}

impl Default for OpacityTable {
    fn default() -> Self {
        Self(DEFAULT_OPACITIES)
    }
}
