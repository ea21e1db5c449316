use crate::led::color::RGB;

/// Corners of the wheel in unit RGB: red, yellow, green, cyan, blue, magenta.
const WHEEL_POINTS: [(f64, f64, f64); 6] = [
    (1.0, 0.0, 0.0),
    (1.0, 1.0, 0.0),
    (0.0, 1.0, 0.0),
    (0.0, 1.0, 1.0),
    (0.0, 0.0, 1.0),
    (1.0, 0.0, 1.0),
];

/// Color at step `index` of a wheel divided into `steps` equal steps.
///
/// The wheel linearly interpolates between neighbouring corners and wraps
/// from magenta back to red. A wheel with zero steps is treated as one step.
pub fn color_wheel(index: usize, steps: usize) -> RGB {
    let steps = steps.max(1);
    let position = (index % steps) as f64 * WHEEL_POINTS.len() as f64 / steps as f64;
    let segment = position.floor() as usize % WHEEL_POINTS.len();
    let weight = position - position.floor();

    let from = WHEEL_POINTS[segment];
    let to = WHEEL_POINTS[(segment + 1) % WHEEL_POINTS.len()];
    let mix = |a: f64, b: f64| {
        ((a * (1.0 - weight) + b * weight) * 255.0)
            .round()
            .clamp(0.0, 255.0) as u8
    };

    RGB::new(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

/// A full turn of the wheel spread over `num_lights`, rotated by `offset` lights.
pub fn wheel_gradient(num_lights: usize, offset: usize) -> Vec<RGB> {
    (0..num_lights)
        .map(|i| color_wheel(i + offset, num_lights))
        .collect()
}
