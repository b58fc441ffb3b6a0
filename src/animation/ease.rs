/// Easing functions used to map normalized animation progress.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Ease {
    /// Linear interpolation.
    #[default]
    Linear,
    /// Sine ease-in.
    InSine,
    /// Sine ease-out.
    OutSine,
    /// Sine ease-in/out.
    InOutSine,
    /// Quadratic ease-in.
    InQuad,
    /// Quadratic ease-out.
    OutQuad,
    /// Quadratic ease-in/out.
    InOutQuad,
    /// Cubic ease-in.
    InCubic,
    /// Cubic ease-out.
    OutCubic,
    /// Cubic ease-in/out.
    InOutCubic,
    /// Quartic ease-in.
    InQuart,
    /// Quartic ease-out.
    OutQuart,
    /// Overshooting ease-in.
    InBack,
    /// Overshooting ease-out.
    OutBack,
}

impl Ease {
    /// All variants, in declaration order.
    pub const ALL: [Ease; 14] = [
        Self::Linear,
        Self::InSine,
        Self::OutSine,
        Self::InOutSine,
        Self::InQuad,
        Self::OutQuad,
        Self::InOutQuad,
        Self::InCubic,
        Self::OutCubic,
        Self::InOutCubic,
        Self::InQuart,
        Self::OutQuart,
        Self::InBack,
        Self::OutBack,
    ];

    /// Apply this easing function to normalized progress `t` in `[0, 1]`.
    ///
    /// Back curves overshoot outside `[0, 1]` between the endpoints.
    pub fn apply(self, t: f64) -> f64 {
        use std::f64::consts::PI;

        const C1: f64 = 1.701_58;
        const C3: f64 = C1 + 1.0;

        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InSine => 1.0 - ((t * PI) / 2.0).cos(),
            Self::OutSine => ((t * PI) / 2.0).sin(),
            Self::InOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
            Self::InQuart => t.powi(4),
            Self::OutQuart => 1.0 - (1.0 - t).powi(4),
            Self::InBack => C3 * t * t * t - C1 * t * t,
            Self::OutBack => 1.0 + C3 * (t - 1.0).powi(3) + C1 * (t - 1.0).powi(2),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
