use approx::assert_abs_diff_eq;
use kinegate_rotation::{relative_angle, Quat};
use std::f64::consts::{FRAC_PI_2, PI};

const EPS: f64 = 1e-12;

#[derive(Clone, Copy)]
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    fn next_f64_sym(&mut self) -> f64 {
        let x = self.next_u64() >> 11;
        let unit = (x as f64) / ((1u64 << 53) as f64);
        (2.0 * unit) - 1.0
    }

    fn next_rotvec(&mut self) -> [f64; 3] {
        [
            self.next_f64_sym() * 2.0,
            self.next_f64_sym() * 2.0,
            self.next_f64_sym() * 2.0,
        ]
    }
}

#[test]
fn from_rotvec_recovers_angle() {
    let q = Quat::from_rotvec([FRAC_PI_2, 0.0, 0.0]).expect("quarter turn");
    assert_abs_diff_eq!(q.angle(), FRAC_PI_2, epsilon = EPS);

    let q = Quat::from_rotvec([0.0, 0.3, 0.0]).expect("small turn");
    assert_abs_diff_eq!(q.angle(), 0.3, epsilon = EPS);
}

#[test]
fn from_rotvec_is_unit_norm() {
    let mut rng = SplitMix64::new(7);
    for _ in 0..64 {
        let q = Quat::from_rotvec(rng.next_rotvec()).expect("random rotvec");
        assert_abs_diff_eq!(q.norm(), 1.0, epsilon = EPS);
    }
}

#[test]
fn angle_stays_in_zero_pi() {
    let mut rng = SplitMix64::new(11);
    for _ in 0..64 {
        let a = Quat::from_rotvec(rng.next_rotvec()).expect("a");
        let b = Quat::from_rotvec(rng.next_rotvec()).expect("b");
        let angle = relative_angle(a, b);
        assert!((0.0..=PI + EPS).contains(&angle), "angle={}", angle);
    }
}

#[test]
fn angle_of_negated_quaternion_is_unchanged() {
    let q = Quat::from_rotvec([0.4, -0.2, 1.1]).expect("rotvec");
    let negated = Quat {
        w: -q.w,
        x: -q.x,
        y: -q.y,
        z: -q.z,
    };
    assert_abs_diff_eq!(q.angle(), negated.angle(), epsilon = EPS);
}

#[test]
fn conjugate_composes_to_identity() {
    let mut rng = SplitMix64::new(23);
    for _ in 0..64 {
        let q = Quat::from_rotvec(rng.next_rotvec()).expect("random rotvec");
        let composed = q.mul(q.conjugate());
        assert_abs_diff_eq!(composed.w.abs(), 1.0, epsilon = EPS);
        assert_abs_diff_eq!(composed.angle(), 0.0, epsilon = 1e-7);
    }
}

#[test]
fn relative_angle_between_identical_rotations_is_zero() {
    let q = Quat::from_rotvec([0.1, 0.2, 0.3]).expect("rotvec");
    assert_abs_diff_eq!(relative_angle(q, q), 0.0, epsilon = 1e-7);
}

#[test]
fn relative_angle_of_incremental_turn_matches_step() {
    // Successive rotations about a shared axis differ by exactly the step.
    let step = 0.05;
    let a = Quat::from_rotvec([0.0, 0.0, 0.30]).expect("a");
    let b = Quat::from_rotvec([0.0, 0.0, 0.30 + step]).expect("b");
    assert_abs_diff_eq!(relative_angle(a, b), step, epsilon = 1e-9);
}

#[test]
fn composition_matches_sequential_rotation() {
    // Two quarter turns about the same axis are one half turn.
    let quarter = Quat::from_rotvec([0.0, FRAC_PI_2, 0.0]).expect("quarter");
    let half = quarter.mul(quarter);
    assert_abs_diff_eq!(half.angle(), PI, epsilon = EPS);
}
