//! Junction speed limits and the look-ahead passes.

use libm::sqrtf;

use crate::config::N_AXIS;
use crate::motion::max_allowable_speed;

use super::segment::MotionSegment;

/// Above this the corner is treated as a full reversal.
const REVERSAL_COSINE: f32 = 0.95;

/// Below this the corner is treated as a straight line.
const STRAIGHT_COSINE: f32 = -0.95;

/// Highest speed at which the corner between two unit directions can be taken
/// without exceeding `junction_deviation` from the path.
///
/// The corner is approximated by a circle tangent to both segments whose
/// closest point lies `junction_deviation` inside the corner; the centripetal
/// acceleration limit then fixes the speed. Nearly straight corners are only
/// limited by the two nominal speeds, nearly reversing corners collapse to
/// `minimum_speed`.
pub fn junction_speed(
    previous_unit: &[f32; N_AXIS],
    unit: &[f32; N_AXIS],
    previous_nominal_speed: f32,
    nominal_speed: f32,
    acceleration: f32,
    junction_deviation: f32,
    minimum_speed: f32,
) -> f32 {
    let cos_theta = -previous_unit
        .iter()
        .zip(unit.iter())
        .map(|(a, b)| a * b)
        .sum::<f32>();

    if cos_theta >= REVERSAL_COSINE {
        return minimum_speed;
    }

    let mut vmax = previous_nominal_speed.min(nominal_speed);
    if cos_theta > STRAIGHT_COSINE {
        let sin_theta_d2 = sqrtf(0.5 * (1.0 - cos_theta));
        vmax = vmax.min(sqrtf(
            acceleration * junction_deviation * sin_theta_d2 / (1.0 - sin_theta_d2),
        ));
    }
    vmax
}

/// Reverse kernel: limit `current`'s entry speed so it can still slow down to
/// `next`'s entry speed within its own length.
pub fn reverse_kernel(current: &mut MotionSegment, next: &MotionSegment, acceleration: f32) {
    if current.entry_speed == current.max_entry_speed {
        return;
    }
    current.entry_speed = if !current.is_nominal_length && current.max_entry_speed > next.entry_speed
    {
        current.max_entry_speed.min(max_allowable_speed(
            -acceleration,
            next.entry_speed,
            current.millimeters,
        ))
    } else {
        current.max_entry_speed
    };
}

/// Forward kernel: limit `current`'s entry speed to what `previous` can reach
/// by accelerating over its own length.
pub fn forward_kernel(previous: &MotionSegment, current: &mut MotionSegment, acceleration: f32) {
    if previous.is_nominal_length || previous.entry_speed >= current.entry_speed {
        return;
    }
    current.entry_speed = current.entry_speed.min(max_allowable_speed(
        -acceleration,
        previous.entry_speed,
        previous.millimeters,
    ));
}
