use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Easing functions usable for opacity fades.
///
/// Every variant is monotonic on [0, 1] with `f(0) = 0` and `f(1) = 1`, so a
/// fade never overshoots its target opacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum EasingFunction {
    #[default]
    Linear,
    Ease,
    EaseIn,
    EaseOut,
    EaseInOut,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    EaseInQuint,
    EaseOutQuint,
    EaseInOutQuint,
    EaseInExpo,
    EaseOutExpo,
    EaseInOutExpo,
    EaseInCirc,
    EaseOutCirc,
    EaseInOutCirc,
    // Custom bezier curve, x1 and x2 within [0, 1]
    CubicBezier { x1: f64, y1: f64, x2: f64, y2: f64 },
}

impl EasingFunction {
    /// Look up an easing function by its CSS-style name.
    ///
    /// Returns `None` for unknown names and for curves that would overshoot.
    pub fn from_name(name: &str) -> Option<Self> {
        let easing = match name.trim().to_lowercase().as_str() {
            "linear" => EasingFunction::Linear,
            "ease" => EasingFunction::Ease,
            "easein" | "ease-in" => EasingFunction::EaseIn,
            "easeout" | "ease-out" => EasingFunction::EaseOut,
            "easeinout" | "ease-in-out" => EasingFunction::EaseInOut,
            "easeinsine" | "ease-in-sine" => EasingFunction::EaseInSine,
            "easeoutsine" | "ease-out-sine" => EasingFunction::EaseOutSine,
            "easeinoutsine" | "ease-in-out-sine" => EasingFunction::EaseInOutSine,
            "easeinquad" | "ease-in-quad" => EasingFunction::EaseInQuad,
            "easeoutquad" | "ease-out-quad" => EasingFunction::EaseOutQuad,
            "easeinoutquad" | "ease-in-out-quad" => EasingFunction::EaseInOutQuad,
            "easeincubic" | "ease-in-cubic" => EasingFunction::EaseInCubic,
            "easeoutcubic" | "ease-out-cubic" => EasingFunction::EaseOutCubic,
            "easeinoutcubic" | "ease-in-out-cubic" => EasingFunction::EaseInOutCubic,
            "easeinquart" | "ease-in-quart" => EasingFunction::EaseInQuart,
            "easeoutquart" | "ease-out-quart" => EasingFunction::EaseOutQuart,
            "easeinoutquart" | "ease-in-out-quart" => EasingFunction::EaseInOutQuart,
            "easeinquint" | "ease-in-quint" => EasingFunction::EaseInQuint,
            "easeoutquint" | "ease-out-quint" => EasingFunction::EaseOutQuint,
            "easeinoutquint" | "ease-in-out-quint" => EasingFunction::EaseInOutQuint,
            "easeinexpo" | "ease-in-expo" => EasingFunction::EaseInExpo,
            "easeoutexpo" | "ease-out-expo" => EasingFunction::EaseOutExpo,
            "easeinoutexpo" | "ease-in-out-expo" => EasingFunction::EaseInOutExpo,
            "easeincirc" | "ease-in-circ" => EasingFunction::EaseInCirc,
            "easeoutcirc" | "ease-out-circ" => EasingFunction::EaseOutCirc,
            "easeinoutcirc" | "ease-in-out-circ" => EasingFunction::EaseInOutCirc,
            other => return Self::parse_cubic_bezier(other),
        };
        Some(easing)
    }

    /// Parse cubic-bezier(x1,y1,x2,y2) format
    fn parse_cubic_bezier(input: &str) -> Option<Self> {
        let inner = input.strip_prefix("cubic-bezier(")?.strip_suffix(')')?;
        let parts: Vec<f64> = inner
            .split(',')
            .map(|s| s.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;

        let [x1, y1, x2, y2] = parts.as_slice() else {
            return None;
        };

        // Control points outside the unit square make the curve overshoot
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !(in_unit(*x1) && in_unit(*y1) && in_unit(*x2) && in_unit(*y2)) {
            return None;
        }

        Some(EasingFunction::CubicBezier {
            x1: *x1,
            y1: *y1,
            x2: *x2,
            y2: *y2,
        })
    }

    /// Apply easing function to progress value (0.0 to 1.0)
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);

        match self {
            EasingFunction::Linear => t,
            EasingFunction::Ease => cubic_bezier(t, 0.25, 0.1, 0.25, 1.0),
            EasingFunction::EaseIn => cubic_bezier(t, 0.42, 0.0, 1.0, 1.0),
            EasingFunction::EaseOut => cubic_bezier(t, 0.0, 0.0, 0.58, 1.0),
            EasingFunction::EaseInOut => cubic_bezier(t, 0.42, 0.0, 0.58, 1.0),

            // Sine
            EasingFunction::EaseInSine => 1.0 - (t * PI / 2.0).cos(),
            EasingFunction::EaseOutSine => (t * PI / 2.0).sin(),
            EasingFunction::EaseInOutSine => -(PI * t).cos() / 2.0 + 0.5,

            // Polynomial
            EasingFunction::EaseInQuad => t.powi(2),
            EasingFunction::EaseOutQuad => 1.0 - (1.0 - t).powi(2),
            EasingFunction::EaseInOutQuad => in_out_poly(t, 2),
            EasingFunction::EaseInCubic => t.powi(3),
            EasingFunction::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            EasingFunction::EaseInOutCubic => in_out_poly(t, 3),
            EasingFunction::EaseInQuart => t.powi(4),
            EasingFunction::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            EasingFunction::EaseInOutQuart => in_out_poly(t, 4),
            EasingFunction::EaseInQuint => t.powi(5),
            EasingFunction::EaseOutQuint => 1.0 - (1.0 - t).powi(5),
            EasingFunction::EaseInOutQuint => in_out_poly(t, 5),

            // Exponential
            EasingFunction::EaseInExpo => {
                if t == 0.0 {
                    0.0
                } else {
                    2.0_f64.powf(10.0 * (t - 1.0))
                }
            }
            EasingFunction::EaseOutExpo => {
                if t == 1.0 {
                    1.0
                } else {
                    1.0 - 2.0_f64.powf(-10.0 * t)
                }
            }
            EasingFunction::EaseInOutExpo => {
                if t == 0.0 {
                    0.0
                } else if t == 1.0 {
                    1.0
                } else if t < 0.5 {
                    2.0_f64.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2.0_f64.powf(-20.0 * t + 10.0)) / 2.0
                }
            }

            // Circular
            EasingFunction::EaseInCirc => 1.0 - (1.0 - t * t).sqrt(),
            EasingFunction::EaseOutCirc => (1.0 - (t - 1.0) * (t - 1.0)).sqrt(),
            EasingFunction::EaseInOutCirc => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).sqrt() + 1.0) / 2.0
                }
            }

            EasingFunction::CubicBezier { x1, y1, x2, y2 } => cubic_bezier(t, *x1, *y1, *x2, *y2),
        }
    }
}

fn in_out_poly(t: f64, power: i32) -> f64 {
    if t < 0.5 {
        2.0_f64.powi(power - 1) * t.powi(power)
    } else {
        1.0 - (-2.0 * t + 2.0).powi(power) / 2.0
    }
}

/// One coordinate of a cubic bezier with endpoints 0 and 1
fn bezier_coord(s: f64, p1: f64, p2: f64) -> f64 {
    let u = 1.0 - s;
    3.0 * u * u * s * p1 + 3.0 * u * s * s * p2 + s * s * s
}

fn bezier_slope(s: f64, p1: f64, p2: f64) -> f64 {
    let u = 1.0 - s;
    3.0 * u * u * p1 + 6.0 * u * s * (p2 - p1) + 3.0 * s * s * (1.0 - p2)
}

/// Evaluate the curve's y at the given x.
///
/// Newton-Raphson on x(s) with a bisection fallback when the slope vanishes.
fn cubic_bezier(x: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    if x <= 0.0 || x >= 1.0 {
        return x;
    }

    let mut s = x;
    for _ in 0..8 {
        let err = bezier_coord(s, x1, x2) - x;
        if err.abs() < 1e-7 {
            return bezier_coord(s, y1, y2);
        }
        let slope = bezier_slope(s, x1, x2);
        if slope.abs() < 1e-6 {
            break;
        }
        s -= err / slope;
    }

    let (mut lo, mut hi) = (0.0, 1.0);
    s = x;
    for _ in 0..64 {
        let value = bezier_coord(s, x1, x2);
        if (value - x).abs() < 1e-7 {
            break;
        }
        if value < x {
            lo = s;
        } else {
            hi = s;
        }
        s = (lo + hi) / 2.0;
    }

    bezier_coord(s, y1, y2)
}
