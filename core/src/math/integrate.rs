use ndarray::ArrayView1;

pub struct Integrator;

impl Integrator {
    /// Composite trapezoidal rule over uniformly spaced samples.
    ///
    /// Fewer than two samples integrate to zero.
    pub fn trapezoid(values: ArrayView1<f64>, dx: f64) -> f64 {
        let n = values.len();
        if n < 2 {
            return 0.0;
        }
        let interior = values.sum();
        dx * (interior - 0.5 * (values[0] + values[n - 1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    #[test]
    fn short_series_integrate_to_zero() {
        assert_eq!(Integrator::trapezoid(Array1::<f64>::zeros(0).view(), 1.0), 0.0);
        assert_eq!(Integrator::trapezoid(array![5.0].view(), 1.0), 0.0);
    }

    #[test]
    fn linear_ramp_is_exact() {
        // y = x on [0, 4] sampled at dx = 1
        let area = Integrator::trapezoid(array![0.0, 1.0, 2.0, 3.0, 4.0].view(), 1.0);
        assert!((area - 8.0).abs() < 1e-12);
    }

    #[test]
    fn spacing_scales_area() {
        let values = array![2.0, 2.0, 2.0];
        assert!((Integrator::trapezoid(values.view(), 60.0) - 240.0).abs() < 1e-9);
    }
}
