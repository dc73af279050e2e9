//! Tolerant extraction of vital readings from device payloads.
//!
//! Devices and relays name the same reading differently (`heartRate`,
//! `heart_rate`, bare `systolic`, ...). Every accepted spelling lives in
//! [`FIELD_ALIASES`]; one generic lookup walks that table, so the socket and
//! polling paths share exactly the same rules.

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use crate::error::PayloadError;
use crate::metrics::{BloodPressure, HealthMetricsSnapshot};

/// Canonical readings that can be pulled out of a payload
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    HeartRate,
    StepsToday,
    CaloriesBurned,
    Systolic,
    Diastolic,
    BloodOxygenLevel,
    StressLevel,
    BodyTemperature,
    Timestamp,
}

/// Accepted key paths per field, in priority order. Dots descend into
/// nested objects.
pub const FIELD_ALIASES: &[(Field, &[&str])] = &[
    (Field::HeartRate, &["heartRate", "heart_rate"]),
    (Field::StepsToday, &["stepsToday", "steps_today", "steps"]),
    (
        Field::CaloriesBurned,
        &["caloriesBurned", "calories_burned", "calories"],
    ),
    (
        Field::Systolic,
        &["bloodPressure.systolic", "blood_pressure.systolic", "systolic"],
    ),
    (
        Field::Diastolic,
        &[
            "bloodPressure.diastolic",
            "blood_pressure.diastolic",
            "diastolic",
        ],
    ),
    (
        Field::BloodOxygenLevel,
        &[
            "bloodOxygenLevel",
            "blood_oxygen_level",
            "blood_oxygen",
            "oxygen",
        ],
    ),
    (Field::StressLevel, &["stressLevel", "stress_level", "stress"]),
    (
        Field::BodyTemperature,
        &["bodyTemperature", "body_temperature", "temperature"],
    ),
    (Field::Timestamp, &["timestamp"]),
];

pub fn aliases(field: Field) -> &'static [&'static str] {
    FIELD_ALIASES
        .iter()
        .find(|(candidate, _)| *candidate == field)
        .map(|(_, names)| *names)
        .unwrap_or(&[])
}

fn lookup<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(payload, |node, key| node.get(key))
}

fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    // Negative or non-finite readings are device noise, treat them as absent
    (number.is_finite() && number >= 0.0).then_some(number)
}

/// First usable numeric value for `field`, trying every alias in order
pub fn extract_number(payload: &Value, field: Field) -> Option<f64> {
    aliases(field)
        .iter()
        .filter_map(|path| lookup(payload, path))
        .find_map(as_number)
}

/// Payload timestamp, if the device sent one in RFC 3339 form
pub fn extract_timestamp(payload: &Value) -> Option<DateTime<FixedOffset>> {
    aliases(Field::Timestamp)
        .iter()
        .filter_map(|path| lookup(payload, path))
        .filter_map(Value::as_str)
        .find_map(|text| DateTime::parse_from_rfc3339(text).ok())
}

/// Parse raw socket or HTTP body text into a payload object
pub fn parse_payload(text: &str) -> Result<Value, PayloadError> {
    let value: Value = serde_json::from_str(text)?;
    match value {
        Value::Object(_) => Ok(value),
        Value::Array(_) => Err(PayloadError::NotAnObject("an array")),
        Value::String(_) => Err(PayloadError::NotAnObject("a string")),
        Value::Number(_) => Err(PayloadError::NotAnObject("a number")),
        Value::Bool(_) => Err(PayloadError::NotAnObject("a boolean")),
        Value::Null => Err(PayloadError::NotAnObject("null")),
    }
}

fn whole(value: f64) -> u32 {
    value.round().min(u32::MAX as f64) as u32
}

/// Build the next snapshot from `previous` and a payload
///
/// Any reading missing from the payload keeps its previous value. Step and
/// calorie counters are held at their previous value when the device reports
/// less on the same calendar day, and accepted as-is once the day changes.
///
/// # Arguments
/// * `previous` - The snapshot currently on display, if any
/// * `payload` - Parsed payload object
/// * `now` - Generation time, used when the payload carries no timestamp
pub fn merge(
    previous: Option<&HealthMetricsSnapshot>,
    payload: &Value,
    now: DateTime<FixedOffset>,
) -> HealthMetricsSnapshot {
    let timestamp = extract_timestamp(payload).unwrap_or(now);
    let base = previous
        .cloned()
        .unwrap_or_else(|| HealthMetricsSnapshot::empty(timestamp));
    let same_day = previous.is_some_and(|prev| prev.same_day(&timestamp));

    let counter = |field: Field, prior: u32| match extract_number(payload, field).map(whole) {
        Some(reported) if same_day => reported.max(prior),
        Some(reported) => reported,
        None => prior,
    };
    let reading = |field: Field, prior: u32| extract_number(payload, field).map_or(prior, whole);

    HealthMetricsSnapshot {
        heart_rate: reading(Field::HeartRate, base.heart_rate),
        steps_today: counter(Field::StepsToday, base.steps_today),
        calories_burned: counter(Field::CaloriesBurned, base.calories_burned),
        blood_pressure: BloodPressure {
            systolic: reading(Field::Systolic, base.blood_pressure.systolic),
            diastolic: reading(Field::Diastolic, base.blood_pressure.diastolic),
        },
        blood_oxygen_level: extract_number(payload, Field::BloodOxygenLevel)
            .map_or(base.blood_oxygen_level, |v| v.round().clamp(0.0, 100.0) as u8),
        stress_level: extract_number(payload, Field::StressLevel).unwrap_or(base.stress_level),
        body_temperature: extract_number(payload, Field::BodyTemperature)
            .unwrap_or(base.body_temperature),
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(text: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(text).unwrap()
    }

    fn reading() -> HealthMetricsSnapshot {
        HealthMetricsSnapshot {
            heart_rate: 70,
            steps_today: 4000,
            calories_burned: 300,
            blood_pressure: BloodPressure {
                systolic: 120,
                diastolic: 80,
            },
            blood_oxygen_level: 98,
            stress_level: 3.0,
            body_temperature: 98.6,
            timestamp: at("2026-03-01T10:00:00+00:00"),
        }
    }

    #[test]
    fn every_field_has_aliases() {
        for field in [
            Field::HeartRate,
            Field::StepsToday,
            Field::CaloriesBurned,
            Field::Systolic,
            Field::Diastolic,
            Field::BloodOxygenLevel,
            Field::StressLevel,
            Field::BodyTemperature,
            Field::Timestamp,
        ] {
            assert!(!aliases(field).is_empty(), "{:?} has no aliases", field);
        }
    }

    #[test]
    fn snake_case_and_camel_case_payloads_agree() {
        let now = at("2026-03-01T10:00:05+00:00");
        let camel = json!({
            "heartRate": 81, "stepsToday": 5120, "caloriesBurned": 410,
            "bloodPressure": { "systolic": 124, "diastolic": 82 },
            "bloodOxygenLevel": 97, "stressLevel": 4, "bodyTemperature": 98.9
        });
        let snake = json!({
            "heart_rate": 81, "steps_today": 5120, "calories_burned": 410,
            "blood_pressure": { "systolic": 124, "diastolic": 82 },
            "blood_oxygen_level": 97, "stress_level": 4, "body_temperature": 98.9
        });

        let from_camel = merge(None, &camel, now);
        let from_snake = merge(None, &snake, now);

        assert_eq!(from_camel, from_snake);
        assert_eq!(from_snake.heart_rate, 81);
        assert_eq!(from_snake.steps_today, 5120);
    }

    #[test]
    fn bare_abbreviated_keys_are_accepted() {
        let payload = json!({
            "systolic": 131, "diastolic": 85, "oxygen": 96,
            "stress": 6, "temperature": 99.1, "steps": 7000, "calories": 520
        });
        let next = merge(Some(&reading()), &payload, at("2026-03-01T10:01:00+00:00"));

        assert_eq!(next.blood_pressure.systolic, 131);
        assert_eq!(next.blood_pressure.diastolic, 85);
        assert_eq!(next.blood_oxygen_level, 96);
        assert_eq!(next.stress_level, 6.0);
        assert_eq!(next.body_temperature, 99.1);
        assert_eq!(next.steps_today, 7000);
        assert_eq!(next.calories_burned, 520);
    }

    #[test]
    fn omitted_fields_keep_previous_values() {
        let previous = reading();
        let next = merge(
            Some(&previous),
            &json!({ "heart_rate": 92 }),
            at("2026-03-01T10:00:02+00:00"),
        );

        assert_eq!(next.heart_rate, 92);
        assert_eq!(next.steps_today, previous.steps_today);
        assert_eq!(next.blood_pressure, previous.blood_pressure);
        assert_eq!(next.body_temperature, previous.body_temperature);
        assert_eq!(next.timestamp, at("2026-03-01T10:00:02+00:00"));
    }

    #[test]
    fn null_and_garbage_values_count_as_absent() {
        let next = merge(
            Some(&reading()),
            &json!({ "heartRate": null, "heart_rate": "fast", "oxygen": -4, "stress": "5.5" }),
            at("2026-03-01T10:00:02+00:00"),
        );

        assert_eq!(next.heart_rate, 70);
        assert_eq!(next.blood_oxygen_level, 98);
        assert_eq!(next.stress_level, 5.5);
    }

    #[test]
    fn zero_is_a_real_reading() {
        let next = merge(
            Some(&reading()),
            &json!({ "stressLevel": 0 }),
            at("2026-03-01T10:00:02+00:00"),
        );
        assert_eq!(next.stress_level, 0.0);
    }

    #[test]
    fn counters_do_not_go_backwards_within_a_day() {
        let next = merge(
            Some(&reading()),
            &json!({ "steps": 3900, "calories": 250 }),
            at("2026-03-01T18:00:00+00:00"),
        );

        assert_eq!(next.steps_today, 4000);
        assert_eq!(next.calories_burned, 300);
    }

    #[test]
    fn counters_reset_when_the_day_changes() {
        let next = merge(
            Some(&reading()),
            &json!({ "steps": 12, "calories": 3 }),
            at("2026-03-02T00:01:00+00:00"),
        );

        assert_eq!(next.steps_today, 12);
        assert_eq!(next.calories_burned, 3);
    }

    #[test]
    fn payload_timestamp_wins_over_generation_time() {
        let next = merge(
            None,
            &json!({ "heartRate": 75, "timestamp": "2026-03-01T09:59:58+00:00" }),
            at("2026-03-01T10:00:00+00:00"),
        );
        assert_eq!(next.timestamp, at("2026-03-01T09:59:58+00:00"));

        let next = merge(
            None,
            &json!({ "heartRate": 75, "timestamp": "yesterday" }),
            at("2026-03-01T10:00:00+00:00"),
        );
        assert_eq!(next.timestamp, at("2026-03-01T10:00:00+00:00"));
    }

    #[test]
    fn oxygen_is_clamped_to_a_percentage() {
        let next = merge(None, &json!({ "oxygen": 140 }), at("2026-03-01T10:00:00+00:00"));
        assert_eq!(next.blood_oxygen_level, 100);
    }

    #[test]
    fn parse_payload_rejects_non_objects() {
        assert!(parse_payload(r#"{"heartRate": 80}"#).is_ok());
        assert!(matches!(
            parse_payload("[1, 2]"),
            Err(PayloadError::NotAnObject("an array"))
        ));
        assert!(matches!(
            parse_payload("{heartRate: 80"),
            Err(PayloadError::Malformed(_))
        ));
    }
}
