//! Input validation for loops, tasks, documents and organizations

use crate::contract::{DetailValue, LoopDetails, LoopError, LoopPatch, NewLoop};
use serde_json::Value;
use uuid::Uuid;

/// `type` and `property_address` are required at creation
pub fn validate_new_loop(new_loop: &NewLoop) -> Result<(), LoopError> {
    if new_loop.r#type.trim().is_empty() || new_loop.property_address.trim().is_empty() {
        return Err(LoopError::validation(
            "Type and property address are required",
        ));
    }
    validate_participants(new_loop.participants.iter().map(|p| p.name.as_str()))
}

/// Required columns may be replaced but never blanked
pub fn validate_patch(patch: &LoopPatch) -> Result<(), LoopError> {
    if patch.r#type.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(LoopError::validation("Type cannot be empty"));
    }
    if patch
        .property_address
        .as_deref()
        .is_some_and(|a| a.trim().is_empty())
    {
        return Err(LoopError::validation("Property address cannot be empty"));
    }
    match &patch.participants {
        Some(participants) => validate_participants(participants.iter().map(|p| p.name.as_str())),
        None => Ok(()),
    }
}

fn validate_participants<'a>(mut names: impl Iterator<Item = &'a str>) -> Result<(), LoopError> {
    if names.any(|name| name.trim().is_empty()) {
        return Err(LoopError::validation("Participant name is required"));
    }
    Ok(())
}

/// Trimmed, non-empty task title
pub fn normalize_task_title(title: &str) -> Result<String, LoopError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(LoopError::validation("Task title is required"));
    }
    Ok(title.to_string())
}

/// Trimmed, non-empty organization name
pub fn normalize_org_name(name: &str) -> Result<String, LoopError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LoopError::validation("Organization name is required"));
    }
    Ok(name.to_string())
}

/// Unique stored name for an uploaded file: `<uuid>-<sanitised original name>`
pub fn stored_file_name(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);
    let sanitised: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitised = sanitised.trim_start_matches('.');
    if sanitised.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        format!("{}-{}", Uuid::new_v4(), sanitised)
    }
}

/// Convert a JSON object into loop details.
///
/// Strings, numbers and null are kept; booleans become text; nested arrays
/// and objects are rejected.
pub fn details_from_json(value: &Value) -> Result<LoopDetails, LoopError> {
    let object = match value {
        Value::Null => return Ok(LoopDetails::new()),
        Value::Object(map) => map,
        _ => return Err(LoopError::validation("details must be an object")),
    };
    object
        .iter()
        .map(|(key, value)| Ok((key.clone(), detail_value(key, value)?)))
        .collect()
}

fn detail_value(key: &str, value: &Value) -> Result<DetailValue, LoopError> {
    match value {
        Value::Null => Ok(DetailValue::Null),
        Value::String(s) => Ok(DetailValue::Text(s.clone())),
        Value::Bool(b) => Ok(DetailValue::Text(b.to_string())),
        Value::Number(n) => n
            .as_f64()
            .map(DetailValue::Number)
            .ok_or_else(|| LoopError::validation(format!("details.{key} is not a finite number"))),
        Value::Array(_) | Value::Object(_) => Err(LoopError::validation(format!(
            "details.{key} must be a string, number or null"
        ))),
    }
}

/// Render loop details back into a JSON object
pub fn details_to_json(details: &LoopDetails) -> Value {
    Value::Object(
        details
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    DetailValue::Text(s) => Value::String(s.clone()),
                    DetailValue::Number(n) => serde_json::Number::from_f64(*n)
                        .map(Value::Number)
                        .unwrap_or(Value::Null),
                    DetailValue::Null => Value::Null,
                };
                (key.clone(), value)
            })
            .collect(),
    )
}
