//! Target schemas for structured generation.
//!
//! A target type derives [`JsonSchema`] and implements [`Generable`], naming a
//! `Partial` counterpart whose fields are all optional. While the engine streams
//! JSON text, [`decode_partial`] repairs the unfinished document and decodes it into
//! the partial type; at stream end [`decode_complete`] decodes and validates the
//! full target.
//!
//! Per-field guidance for the model comes from `#[schemars(description = "...")]`
//! attributes and is collected into a [`SchemaDescriptor`].

use crate::error::{RecommenderError, Result};
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Guidance for a single top-level field of a target schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldGuide {
    pub name: String,
    pub kind: String,
    pub description: Option<String>,
    pub required: bool,
}

/// Machine-readable shape of a target type plus per-field guidance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub name: String,
    pub json_schema: Value,
    pub fields: Vec<FieldGuide>,
}

impl SchemaDescriptor {
    /// Describe `T` from its derived JSON schema
    pub fn of<T: JsonSchema>() -> Self {
        let json_schema = json_schema_for::<T>();
        let fields = field_guides(&json_schema);

        Self {
            name: T::schema_name(),
            json_schema,
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldGuide> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Natural-language rendering of the fields, appended to prompts on request
    pub fn guidance(&self) -> String {
        let mut text = format!("Respond with a JSON object `{}` with these fields:", self.name);
        for field in &self.fields {
            let presence = if field.required { "required" } else { "optional" };
            text.push_str(&format!("\n- {} ({}, {})", field.name, field.kind, presence));
            if let Some(description) = &field.description {
                text.push_str(&format!(": {}", description));
            }
        }
        text
    }
}

/// A type the engine can be asked to generate.
pub trait Generable: DeserializeOwned + JsonSchema + Send + 'static {
    /// All-optional counterpart filled in while streaming
    type Partial: DeserializeOwned + Default + Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::of::<Self>()
    }

    /// Domain checks beyond the JSON shape. Failures should be `SchemaViolation`.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// JSON schema for `T` with nested types inlined
pub fn json_schema_for<T: JsonSchema>() -> Value {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
    });
    let root = settings.into_generator().into_root_schema_for::<T>();

    let mut value = serde_json::to_value(&root).unwrap_or_else(|_| json!({"type": "object"}));
    if let Some(object) = value.as_object_mut() {
        object.remove("$schema");
    }
    value
}

fn field_guides(schema: &Value) -> Vec<FieldGuide> {
    let required: Vec<&str> = schema["required"]
        .as_array()
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    schema["properties"]
        .as_object()
        .map(|properties| {
            properties
                .iter()
                .map(|(name, property)| FieldGuide {
                    name: name.clone(),
                    kind: describe_kind(property),
                    description: property["description"].as_str().map(String::from),
                    required: required.contains(&name.as_str()),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn describe_kind(property: &Value) -> String {
    if property.get("enum").is_some() {
        return "enum".to_string();
    }

    match &property["type"] {
        Value::String(kind) if kind == "array" => {
            format!("array of {}", describe_kind(&property["items"]))
        }
        Value::String(kind) => kind.clone(),
        Value::Array(kinds) => kinds
            .iter()
            .filter_map(Value::as_str)
            .filter(|k| *k != "null")
            .collect::<Vec<_>>()
            .join(" or "),
        _ if property.get("properties").is_some() => "object".to_string(),
        _ => "any".to_string(),
    }
}

/// Decode an unfinished JSON document into `T::Partial`.
///
/// Returns `None` while the text cannot be repaired into an object of the right shape.
pub fn decode_partial<T: Generable>(text: &str) -> Option<T::Partial> {
    let value = repair_partial_json(text)?;
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// Decode and validate the finished document.
pub fn decode_complete<T: Generable>(text: &str) -> Result<T> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(RecommenderError::SchemaViolation(format!(
            "no content was generated for {}",
            T::schema_name()
        )));
    }

    let value: T = serde_json::from_str(trimmed).map_err(|e| {
        RecommenderError::SchemaViolation(format!("{}: {}", T::schema_name(), e))
    })?;
    value.validate()?;
    Ok(value)
}

/// Close unterminated strings, arrays and objects so a streamed prefix parses.
///
/// When the prefix ends mid-key or mid-literal, it is cut back to the last comma
/// outside a string and closed from there.
pub(crate) fn repair_partial_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if let Some(value) = close_prefix(trimmed) {
        return Some(value);
    }

    let cut = last_separator(trimmed)?;
    close_prefix(&trimmed[..cut])
}

fn close_prefix(prefix: &str) -> Option<Value> {
    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    // Byte offset of the backslash that opened the current `\uXXXX` escape
    let mut unicode_start: Option<usize> = None;
    let mut unicode_digits = 0;
    let mut high_surrogate_end: Option<(usize, usize)> = None;

    for (index, ch) in prefix.char_indices() {
        if let Some(start) = unicode_start {
            if ch.is_ascii_hexdigit() {
                unicode_digits += 1;
                if unicode_digits == 4 {
                    let code = u32::from_str_radix(&prefix[start + 2..=index], 16).unwrap_or(0);
                    high_surrogate_end = (0xD800..0xDC00)
                        .contains(&code)
                        .then_some((start, index + 1));
                    unicode_start = None;
                }
                continue;
            }
            unicode_start = None;
        }
        if escaped {
            escaped = false;
            if ch == 'u' {
                unicode_start = Some(index - 1);
                unicode_digits = 0;
            }
            continue;
        }
        if !matches!(ch, '\\') {
            high_surrogate_end = None;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                closers.pop();
            }
            _ => {}
        }
    }

    let mut fixed = prefix.to_string();
    if in_string {
        let mut cut = match (unicode_start, escaped) {
            (Some(start), _) => start,
            (None, true) => prefix.len() - 1,
            (None, false) => prefix.len(),
        };
        // A high surrogate only decodes together with its low half
        if let Some((start, end)) = high_surrogate_end {
            if end == cut {
                cut = start;
            }
        }
        fixed.truncate(cut);
        fixed.push('"');
    } else {
        trim_number_tail(&mut fixed);
    }

    let without_comma = fixed.trim_end().strip_suffix(',').map(str::to_string);
    if let Some(stripped) = without_comma {
        fixed = stripped;
    }

    while let Some(closer) = closers.pop() {
        fixed.push(closer);
    }

    serde_json::from_str::<Value>(&fixed).ok()
}

/// Drop a dangling fraction or exponent marker so `4.` or `4e-` reads as `4`.
fn trim_number_tail(text: &mut String) {
    let kept = text.trim_end_matches(|c: char| matches!(c, '.' | 'e' | 'E' | '+' | '-')).len();
    if kept < text.len() && text[..kept].ends_with(|c: char| c.is_ascii_digit()) {
        text.truncate(kept);
    }
}

fn last_separator(text: &str) -> Option<usize> {
    let mut in_string = false;
    let mut escaped = false;
    let mut last = None;

    for (index, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            ',' if !in_string => last = Some(index),
            _ => {}
        }
    }

    last
}
