use std::fmt;

/// Lower bound of [`SizeCategory::Medium`] in square meters.
pub const MEDIUM_THRESHOLD: f64 = 7.98742676e01;
/// Lower bound of [`SizeCategory::Big`] in square meters.
pub const BIG_THRESHOLD: f64 = 1.57009277e02;
/// Lower bound of [`SizeCategory::Huge`] in square meters.
pub const HUGE_THRESHOLD: f64 = 3.72352295e02;

/// Ordinal size bucket of a detected silo area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SizeCategory {
    Small,
    Medium,
    Big,
    Huge,
}

impl SizeCategory {
    /// Bucket an area in square meters. Lower bounds are inclusive.
    pub fn from_area(area: f64) -> Self {
        if area < MEDIUM_THRESHOLD {
            Self::Small
        } else if area < BIG_THRESHOLD {
            Self::Medium
        } else if area < HUGE_THRESHOLD {
            Self::Big
        } else {
            Self::Huge
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Big => "big",
            Self::Huge => "huge",
        }
    }
}

impl fmt::Display for SizeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        let cases = vec![
            (0.0, SizeCategory::Small),
            (79.8742675, SizeCategory::Small),
            (79.8742676, SizeCategory::Medium),
            (80.0, SizeCategory::Medium),
            (157.009276, SizeCategory::Medium),
            (157.009277, SizeCategory::Big),
            (372.352294, SizeCategory::Big),
            (372.352295, SizeCategory::Huge),
            (372.5, SizeCategory::Huge),
            (1e9, SizeCategory::Huge),
        ];

        for (area, expected) in cases {
            assert_eq!(SizeCategory::from_area(area), expected, "area {area}");
        }
    }

    #[test]
    fn test_monotonic_in_area() {
        let categories: Vec<_> = (0..2000)
            .map(|i| SizeCategory::from_area(i as f64 * 0.25))
            .collect();
        assert!(categories.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_labels() {
        let labels: Vec<String> = [
            SizeCategory::Small,
            SizeCategory::Medium,
            SizeCategory::Big,
            SizeCategory::Huge,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(labels, ["small", "medium", "big", "huge"]);
    }
}
