pub struct StatsHelper;

impl StatsHelper {
    /// Largest value ignoring NaN, or `None` for an empty or all-NaN slice.
    pub fn max(samples: &[f64]) -> Option<f64> {
        samples
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                Some(current) if current >= v => Some(current),
                _ => Some(v),
            })
    }

    pub fn mean(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f64>() / samples.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_of_empty_is_none() {
        assert_eq!(StatsHelper::max(&[]), None);
        assert_eq!(StatsHelper::max(&[f64::NAN]), None);
    }

    #[test]
    fn max_skips_nan() {
        assert_eq!(StatsHelper::max(&[1.0, f64::NAN, 3.5, -2.0]), Some(3.5));
    }

    #[test]
    fn mean_handles_empty_and_values() {
        assert_eq!(StatsHelper::mean(&[]), 0.0);
        assert_eq!(StatsHelper::mean(&[1.0, 2.0, 6.0]), 3.0);
    }
}
