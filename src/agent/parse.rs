//! Decoding of loosely-typed agent results.
//!
//! A result may arrive as a JSON object or as a string that may or may not
//! contain JSON. Missing fields never fail decoding; they are filled from the
//! default table below.

use serde_json::{Map, Value};
use tracing::warn;

use crate::core::relationship::{
    CompatibilityResult, PredictionResult, DEFAULT_COMPATIBILITY_LEVEL,
    DEFAULT_EMOTIONAL_TRAJECTORY, DEFAULT_OVERALL_OUTLOOK,
};

pub const DEFAULT_SPECIALIST_REPLY: &str = "I am here for you. Could you tell me more?";

/// Turn a raw result into a field map. Strings that are not JSON become
/// `{"text": ...}`; JSON that is not an object carries no fields.
pub fn normalize(result: &Value) -> Map<String, Value> {
    match result {
        Value::Object(map) => map.clone(),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(_) => {
                let mut map = Map::new();
                map.insert("text".to_string(), Value::String(raw.clone()));
                map
            }
        },
        _ => Map::new(),
    }
}

pub fn decode_compatibility(result: &Value) -> CompatibilityResult {
    let fields = normalize(result);
    CompatibilityResult {
        match_percentage: percentage_field(&fields, "match_percentage"),
        compatibility_level: text_field(&fields, "compatibility_level", DEFAULT_COMPATIBILITY_LEVEL),
        advice: text_field(&fields, "advice", ""),
        strengths: text_field(&fields, "strengths", ""),
        areas_to_work_on: text_field(&fields, "areas_to_work_on", ""),
    }
}

pub fn decode_prediction(result: &Value) -> PredictionResult {
    let fields = normalize(result);
    PredictionResult {
        short_term_prediction: text_field(&fields, "short_term_prediction", ""),
        long_term_prediction: text_field(&fields, "long_term_prediction", ""),
        potential_challenges: text_field(&fields, "potential_challenges", ""),
        emotional_trajectory: text_field(&fields, "emotional_trajectory", DEFAULT_EMOTIONAL_TRAJECTORY),
        key_advice: text_field(&fields, "key_advice", ""),
        overall_outlook: text_field(&fields, "overall_outlook", DEFAULT_OVERALL_OUTLOOK),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpecialistReply {
    pub text: String,
    pub sentiment: Option<String>,
    pub topic: Option<String>,
}

pub fn decode_specialist_reply(result: &Value) -> SpecialistReply {
    let fields = normalize(result);
    let text = ["response_text", "text", "message"]
        .iter()
        .find_map(|key| non_empty_text(&fields, key))
        .unwrap_or_else(|| DEFAULT_SPECIALIST_REPLY.to_string());

    SpecialistReply {
        text,
        sentiment: non_empty_text(&fields, "sentiment"),
        topic: non_empty_text(&fields, "topic"),
    }
}

/// Clamp a percentage into 0..=100, warning when the input was out of range.
pub fn clamp_percentage(value: i64) -> u8 {
    if !(0..=100).contains(&value) {
        warn!(value, "match percentage out of range, clamping");
    }
    value.clamp(0, 100) as u8
}

/// Leading integer of a string: optional sign then digits, surrounding junk ignored.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    // Saturate rather than fail on absurdly long digit runs
    let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * magnitude)
}

fn percentage_field(fields: &Map<String, Value>, key: &str) -> u8 {
    let raw = match fields.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => parse_leading_int(s).unwrap_or(0),
        _ => 0,
    };
    clamp_percentage(raw)
}

fn non_empty_text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn text_field(fields: &Map<String, Value>, key: &str, default: &str) -> String {
    non_empty_text(fields, key).unwrap_or_else(|| default.to_string())
}
