use serde::Serialize;

use crate::config::ConfigError;

/// Validated train/val fractions; test gets the remainder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRatios {
    train: f64,
    val: f64,
}

/// Number of pairs per split for a given total
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SplitSizes {
    pub train: usize,
    pub val: usize,
    pub test: usize,
}

impl SplitSizes {
    pub fn total(&self) -> usize {
        self.train + self.val + self.test
    }
}

impl SplitRatios {
    /// Both fractions must be finite, in `[0, 1)`, and sum to less than 1.
    pub fn new(train: f64, val: f64) -> Result<Self, ConfigError> {
        for (name, value) in [("train", train), ("val", val)] {
            if !value.is_finite() || !(0.0..1.0).contains(&value) {
                return Err(ConfigError::InvalidRatio { name, value });
            }
        }
        if train + val >= 1.0 {
            return Err(ConfigError::RatioSumTooLarge { train, val });
        }
        Ok(Self { train, val })
    }

    pub fn train(&self) -> f64 {
        self.train
    }

    pub fn val(&self) -> f64 {
        self.val
    }

    pub fn test(&self) -> f64 {
        1.0 - self.train - self.val
    }

    /// `floor(n * train)` and `floor(n * val)`; test takes what is left
    pub fn sizes(&self, total: usize) -> SplitSizes {
        let train = ((total as f64 * self.train).floor() as usize).min(total);
        let val = ((total as f64 * self.val).floor() as usize).min(total - train);
        SplitSizes {
            train,
            val,
            test: total - train - val,
        }
    }
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.7,
            val: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_for_ten_pairs() {
        let ratios = SplitRatios::new(0.7, 0.2).unwrap();
        assert_eq!(
            ratios.sizes(10),
            SplitSizes {
                train: 7,
                val: 2,
                test: 1
            }
        );
    }

    #[test]
    fn test_sizes_always_sum_to_total() {
        let ratio_grid = [(0.0, 0.0), (0.5, 0.49), (0.33, 0.33), (0.8, 0.1), (0.99, 0.0)];
        for (train, val) in ratio_grid {
            let ratios = SplitRatios::new(train, val).unwrap();
            for total in 0..200 {
                let sizes = ratios.sizes(total);
                assert_eq!(sizes.total(), total);
                assert_eq!(sizes.train, (total as f64 * train).floor() as usize);
                assert_eq!(sizes.val, (total as f64 * val).floor() as usize);
            }
        }
    }

    #[test]
    fn test_rejects_invalid_ratios() {
        assert!(matches!(
            SplitRatios::new(0.8, 0.2),
            Err(ConfigError::RatioSumTooLarge { .. })
        ));
        assert!(matches!(
            SplitRatios::new(-0.1, 0.2),
            Err(ConfigError::InvalidRatio { name: "train", .. })
        ));
        assert!(matches!(
            SplitRatios::new(0.5, f64::NAN),
            Err(ConfigError::InvalidRatio { name: "val", .. })
        ));
        assert!(matches!(
            SplitRatios::new(1.0, 0.0),
            Err(ConfigError::InvalidRatio { .. })
        ));
    }
}
