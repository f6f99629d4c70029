//! Language-understanding boundary.
//!
//! The extractor and interpreter build prompts, send them through the
//! `LanguageService` trait, and coerce whatever comes back into strict
//! domain shapes. Service output is treated as an untrusted payload:
//! missing or malformed fields get the documented fallback defaults,
//! and only transport failure propagates as an error.

pub mod client;
pub mod extractor;
pub mod interpreter;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

pub use client::ChatClient;
pub use extractor::NoteExtractor;
pub use interpreter::CommandInterpreter;

/// One prompt in, one completion out.
#[async_trait]
pub trait LanguageService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Pull the first JSON value out of model output.
///
/// Models wrap payloads in prose or code fences often enough that a
/// plain `from_str` is not good enough; scan to the first bracket and
/// parse a single value from there, ignoring trailing text.
pub(crate) fn first_json_value(output: &str) -> Option<Value> {
    let start = output.find(|c| c == '{' || c == '[')?;
    let mut stream = serde_json::Deserializer::from_str(&output[start..]).into_iter::<Value>();
    stream.next()?.ok()
}

/// Read a string field trying several key spellings (the service is
/// not consistent about camelCase vs snake_case).
pub(crate) fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(value) = obj.get(*key).and_then(Value::as_str) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Read a list of strings, coercing scalar entries and dropping
/// anything else.
pub(crate) fn string_list_field(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    for key in keys {
        if let Some(items) = obj.get(*key).and_then(Value::as_array) {
            return items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }
    Vec::new()
}
