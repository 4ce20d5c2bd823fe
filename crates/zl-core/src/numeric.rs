use crate::CoreError;

/// Floating point type used for every signal in the system.
pub type Real = f64;

/// Combined absolute/relative comparison tolerance.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

impl Tolerances {
    /// True when `a` and `b` agree to within the absolute tolerance or the
    /// relative tolerance scaled by the larger magnitude.
    pub fn close(&self, a: Real, b: Real) -> bool {
        let diff = (a - b).abs();
        if diff <= self.abs {
            return true;
        }
        diff <= self.rel * a.abs().max(b.abs())
    }
}

/// Compare with [`Tolerances::default`].
pub fn nearly_equal(a: Real, b: Real) -> bool {
    Tolerances::default().close(a, b)
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}
