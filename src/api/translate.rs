//! Machine-translation adapter with auto-detected source language.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde_json::Value;

const ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Translates `text` into `target_lang`. Callers skip this entirely when the
/// caption is already in the target language.
pub async fn translate(http: &Client, text: &str, target_lang: &str) -> Result<String> {
    let response = http
        .get(ENDPOINT)
        .query(&[
            ("client", "gtx"),
            ("sl", "auto"),
            ("tl", target_lang),
            ("dt", "t"),
            ("q", text),
        ])
        .send()
        .await
        .context("translation request failed")?
        .error_for_status()
        .context("translation service returned an error status")?;

    let body: Value = response
        .json()
        .await
        .context("translation response was not JSON")?;
    translated_text(&body)
}

/// The service answers with nested arrays; the first element holds one
/// `[translated, original, ...]` entry per source segment.
fn translated_text(body: &Value) -> Result<String> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("unexpected translation response shape"))?;

    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    if text.is_empty() {
        return Err(anyhow!("translation response contained no text"));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_translated_segments() {
        let body = json!([
            [
                ["Un chien qui court ", "a dog running ", null, null, 3],
                ["sur la plage", "on the beach", null, null, 3]
            ],
            null,
            "en"
        ]);
        assert_eq!(
            translated_text(&body).unwrap(),
            "Un chien qui court sur la plage"
        );
    }

    #[test]
    fn single_segment_response() {
        let body = json!([[["Hund", "dog", null, null, 1]], null, "en"]);
        assert_eq!(translated_text(&body).unwrap(), "Hund");
    }

    #[test]
    fn rejects_unexpected_shape() {
        assert!(translated_text(&json!({"translation": "nope"})).is_err());
        assert!(translated_text(&json!([])).is_err());
    }

    #[test]
    fn rejects_empty_segments() {
        let body = json!([[[null, "dog", null]], null, "en"]);
        assert!(translated_text(&body).is_err());
    }
}
