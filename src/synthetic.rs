//! Plausible stand-in vitals for when no live source is reachable.
//!
//! Values jitter around a per-session baseline, follow a coarse day/night
//! rhythm and are clamped to safe physiological ranges. Step and calorie
//! counters only ever grow.

use chrono::{DateTime, FixedOffset, Timelike};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::metrics::{BloodPressure, HealthMetricsSnapshot};

pub const HEART_RATE_RANGE: (u32, u32) = (50, 120);
pub const SYSTOLIC_RANGE: (u32, u32) = (90, 140);
pub const DIASTOLIC_RANGE: (u32, u32) = (60, 90);
pub const BLOOD_OXYGEN_RANGE: (u8, u8) = (96, 100);
pub const STRESS_RANGE: (f64, f64) = (1.0, 10.0);
pub const TEMPERATURE_RANGE: (f64, f64) = (97.0, 100.0);

/// Basal burn in kcal per minute
const BASE_BURN_RATE: f64 = 1.3;

/// Resting values chosen once per session
#[derive(Clone, Debug, PartialEq)]
pub struct Baseline {
    pub heart_rate: u32,
    pub steps_today: u32,
    pub calories_burned: u32,
    pub blood_pressure: BloodPressure,
    pub blood_oxygen_level: u8,
    pub stress_level: f64,
    pub body_temperature: f64,
}

impl Baseline {
    /// Draw a baseline uniformly from normal resting-adult ranges
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Baseline {
            heart_rate: rng.gen_range(72..=88),
            steps_today: rng.gen_range(2000..=5000),
            calories_burned: rng.gen_range(150..=350),
            blood_pressure: BloodPressure {
                systolic: rng.gen_range(118..=132),
                diastolic: rng.gen_range(76..=84),
            },
            blood_oxygen_level: rng.gen_range(97..=100),
            stress_level: rng.gen_range(2..=5) as f64,
            body_temperature: rng.gen_range(98.1..=99.3),
        }
    }
}

/// The five readings refreshed on the short synthetic tick
#[derive(Clone, Debug, PartialEq)]
pub struct VitalsReading {
    pub heart_rate: u32,
    pub blood_pressure: BloodPressure,
    pub blood_oxygen_level: u8,
    pub stress_level: f64,
    pub body_temperature: f64,
}

/// Heart rate and alertness run higher between 06:00 and 22:00
pub fn is_waking_hour(hour: u32) -> bool {
    (6..=22).contains(&hour)
}

/// Stress trends down between 22:00 and 06:00
pub fn is_night_hour(hour: u32) -> bool {
    hour >= 22 || hour <= 6
}

/// Walking happens between 07:00 and 22:00
pub fn is_active_hour(hour: u32) -> bool {
    (7..=22).contains(&hour)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub struct SyntheticGenerator {
    baseline: Baseline,
    rng: StdRng,
}

impl SyntheticGenerator {
    /// Generator seeded from OS entropy
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic generator, for tests and reproducible demos
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_rng(mut rng: StdRng) -> Self {
        let baseline = Baseline::sample(&mut rng);
        SyntheticGenerator { baseline, rng }
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// First snapshot of a synthetic session, straight from the baseline
    pub fn seed_snapshot(&self, now: DateTime<FixedOffset>) -> HealthMetricsSnapshot {
        let b = &self.baseline;
        HealthMetricsSnapshot {
            heart_rate: b.heart_rate,
            steps_today: b.steps_today,
            calories_burned: b.calories_burned,
            blood_pressure: b.blood_pressure,
            blood_oxygen_level: b.blood_oxygen_level,
            stress_level: b.stress_level,
            body_temperature: round_tenth(b.body_temperature),
            timestamp: now,
        }
    }

    /// Jittered vitals for the given local hour
    pub fn vitals(&mut self, hour: u32) -> VitalsReading {
        let b = &self.baseline;

        let time_multiplier = if is_waking_hour(hour) { 1.1 } else { 0.9 };
        let heart_jitter = self.rng.gen_range(-3.0..=3.0);
        let heart_rate = (b.heart_rate as f64 * time_multiplier + heart_jitter).round();

        // Diastolic follows systolic at a reduced amplitude
        let bp_jitter = self.rng.gen_range(-2.0..=2.0);
        let systolic = (b.blood_pressure.systolic as f64 + bp_jitter).round();
        let diastolic = (b.blood_pressure.diastolic as f64 + bp_jitter * 0.6).round();

        let oxygen_jitter = self.rng.gen_range(-1.0..=1.0);
        let blood_oxygen_level = (b.blood_oxygen_level as f64 + oxygen_jitter).round().clamp(
            BLOOD_OXYGEN_RANGE.0 as f64,
            BLOOD_OXYGEN_RANGE.1 as f64,
        );

        let stress_multiplier = if is_night_hour(hour) { 0.5 } else { 1.0 };
        let stress_jitter = self.rng.gen_range(-1.0..=1.0);
        let stress_level = (b.stress_level * stress_multiplier + stress_jitter)
            .clamp(STRESS_RANGE.0, STRESS_RANGE.1)
            .round();

        let temperature_jitter = self.rng.gen_range(-0.2..=0.2);
        let body_temperature = round_tenth(b.body_temperature + temperature_jitter)
            .clamp(TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1);

        VitalsReading {
            heart_rate: (heart_rate as u32).clamp(HEART_RATE_RANGE.0, HEART_RATE_RANGE.1),
            blood_pressure: BloodPressure {
                systolic: (systolic as u32).clamp(SYSTOLIC_RANGE.0, SYSTOLIC_RANGE.1),
                diastolic: (diastolic as u32).clamp(DIASTOLIC_RANGE.0, DIASTOLIC_RANGE.1),
            },
            blood_oxygen_level: blood_oxygen_level as u8,
            stress_level,
            body_temperature,
        }
    }

    /// Steps walked in one minute at the given local hour
    pub fn step_increment(&mut self, hour: u32) -> u32 {
        if is_active_hour(hour) {
            self.rng.gen_range(5..=30)
        } else {
            self.rng.gen_range(0..=5)
        }
    }

    /// Calories burned in one minute given the current step count
    ///
    /// The basal rate is scaled up by how far the day's steps have grown past
    /// the session baseline, capped at double activity.
    pub fn calorie_increment(&self, steps_today: u32) -> u32 {
        let growth = steps_today.saturating_sub(self.baseline.steps_today) as f64 / 1000.0;
        let activity_multiplier = 1.0 + growth.min(2.0) * 0.5;
        (BASE_BURN_RATE * activity_multiplier).round() as u32
    }

    /// Next snapshot on the short tick: vitals move, counters stay
    pub fn refresh_vitals(
        &mut self,
        previous: &HealthMetricsSnapshot,
        now: DateTime<FixedOffset>,
    ) -> HealthMetricsSnapshot {
        let reading = self.vitals(now.hour());
        HealthMetricsSnapshot {
            heart_rate: reading.heart_rate,
            blood_pressure: reading.blood_pressure,
            blood_oxygen_level: reading.blood_oxygen_level,
            stress_level: reading.stress_level,
            body_temperature: reading.body_temperature,
            timestamp: now,
            ..previous.clone()
        }
    }

    /// Next snapshot on the long tick: counters grow, vitals stay
    pub fn advance_activity(
        &mut self,
        previous: &HealthMetricsSnapshot,
        now: DateTime<FixedOffset>,
    ) -> HealthMetricsSnapshot {
        let steps_today = previous
            .steps_today
            .saturating_add(self.step_increment(now.hour()));
        let calories_burned = previous
            .calories_burned
            .saturating_add(self.calorie_increment(steps_today));

        HealthMetricsSnapshot {
            steps_today,
            calories_burned,
            timestamp: now,
            ..previous.clone()
        }
    }
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_hour(hour: u32) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(&format!("2026-03-01T{:02}:15:00+00:00", hour)).unwrap()
    }

    #[test]
    fn baselines_fall_in_resting_ranges() {
        for seed in 0..200 {
            let generator = SyntheticGenerator::seeded(seed);
            let b = generator.baseline();

            assert!((72..=88).contains(&b.heart_rate));
            assert!((118..=132).contains(&b.blood_pressure.systolic));
            assert!((76..=84).contains(&b.blood_pressure.diastolic));
            assert!((97..=100).contains(&b.blood_oxygen_level));
            assert!((2.0..=5.0).contains(&b.stress_level));
            assert!((98.1..=99.3).contains(&b.body_temperature));
            assert!((2000..=5000).contains(&b.steps_today));
            assert!((150..=350).contains(&b.calories_burned));
        }
    }

    #[test]
    fn every_tick_stays_inside_safe_ranges() {
        for seed in 0..50 {
            let mut generator = SyntheticGenerator::seeded(seed);
            for hour in 0..24 {
                for _ in 0..20 {
                    let r = generator.vitals(hour);
                    assert!((50..=120).contains(&r.heart_rate), "heart rate {}", r.heart_rate);
                    assert!((96..=100).contains(&r.blood_oxygen_level));
                    assert!((97.0..=100.0).contains(&r.body_temperature));
                    assert!((90..=140).contains(&r.blood_pressure.systolic));
                    assert!((60..=90).contains(&r.blood_pressure.diastolic));
                    assert!((1.0..=10.0).contains(&r.stress_level));
                }
            }
        }
    }

    #[test]
    fn heart_rate_runs_higher_in_waking_hours() {
        let mut generator = SyntheticGenerator::seeded(7);
        let day: u32 = (0..100).map(|_| generator.vitals(14).heart_rate).sum();
        let night: u32 = (0..100).map(|_| generator.vitals(3).heart_rate).sum();
        assert!(day > night);
    }

    #[test]
    fn steps_follow_activity_hours() {
        let mut generator = SyntheticGenerator::seeded(11);
        for _ in 0..200 {
            assert!((5..=30).contains(&generator.step_increment(12)));
            assert!(generator.step_increment(3) <= 5);
        }
    }

    #[test]
    fn calories_scale_with_step_growth() {
        let generator = SyntheticGenerator::seeded(3);
        let base = generator.baseline().steps_today;

        assert_eq!(generator.calorie_increment(base), 1);
        assert_eq!(generator.calorie_increment(base.saturating_sub(500)), 1);
        assert_eq!(generator.calorie_increment(base + 1000), 2);
        assert_eq!(generator.calorie_increment(base + 50_000), 3);
    }

    #[test]
    fn counters_never_decrease_across_ticks() {
        let mut generator = SyntheticGenerator::seeded(5);
        let mut snapshot = generator.seed_snapshot(at_hour(0));

        for minute in 0..(24 * 60) {
            let now = at_hour(minute / 60);
            let next = if minute % 12 == 0 {
                generator.advance_activity(&snapshot, now)
            } else {
                generator.refresh_vitals(&snapshot, now)
            };
            assert!(next.steps_today >= snapshot.steps_today);
            assert!(next.calories_burned >= snapshot.calories_burned);
            snapshot = next;
        }
    }

    #[test]
    fn refresh_leaves_counters_alone() {
        let mut generator = SyntheticGenerator::seeded(9);
        let seed = generator.seed_snapshot(at_hour(10));
        let next = generator.refresh_vitals(&seed, at_hour(10));

        assert_eq!(next.steps_today, seed.steps_today);
        assert_eq!(next.calories_burned, seed.calories_burned);
    }

    #[test]
    fn same_seed_gives_same_session() {
        let mut a = SyntheticGenerator::seeded(42);
        let mut b = SyntheticGenerator::seeded(42);
        assert_eq!(a.baseline(), b.baseline());
        assert_eq!(a.vitals(9), b.vitals(9));
    }
}
