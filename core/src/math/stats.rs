pub struct StatsHelper;

impl StatsHelper {
    pub fn mean(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    /// Round half away from zero to `decimals` places.
    pub fn round_to(value: f64, decimals: u32) -> f64 {
        let scale = 10f64.powi(decimals as i32);
        (value * scale).round() / scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_sequence_is_zero() {
        assert_eq!(StatsHelper::mean(&[]), 0.0);
    }

    #[test]
    fn mean_handles_single_value() {
        assert_eq!(StatsHelper::mean(&[4.0]), 4.0);
        assert!((StatsHelper::mean(&[0.6, 0.4]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn round_to_three_places() {
        assert_eq!(StatsHelper::round_to(0.123_56, 3), 0.124);
        assert_eq!(StatsHelper::round_to(0.9, 3), 0.9);
    }
}
