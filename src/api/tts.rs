//! Text-to-speech adapter. Produces one MP3 buffer for the final caption.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;

const ENDPOINT: &str = "https://translate.google.com/translate_tts";

/// The service rejects queries beyond this many characters, so longer text
/// is synthesized in pieces and the MP3 payloads concatenated in order.
const MAX_CHUNK_CHARS: usize = 100;

pub async fn synthesize(http: &Client, text: &str, lang: &str) -> Result<Vec<u8>> {
    let mut audio = Vec::new();
    for chunk in chunk_text(text, MAX_CHUNK_CHARS) {
        let response = http
            .get(ENDPOINT)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", lang),
                ("q", chunk.as_str()),
            ])
            .send()
            .await
            .context("speech request failed")?
            .error_for_status()
            .context("speech service returned an error status")?;

        let bytes = response
            .bytes()
            .await
            .context("failed to read synthesized audio")?;
        audio.extend_from_slice(&bytes);
    }

    if audio.is_empty() {
        return Err(anyhow!("speech service returned no audio"));
    }
    Ok(audio)
}

/// Splits on whitespace into chunks of at most `max_chars` characters.
/// Counts characters rather than bytes, since captions may be translated
/// text. Words longer than the limit are hard-split so every chunk fits
/// one request.
fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for word in text.split_whitespace() {
        let word_chars = word.chars().count();

        if word_chars > max_chars {
            if current_chars > 0 {
                chunks.push(std::mem::take(&mut current));
                current_chars = 0;
            }
            let letters: Vec<char> = word.chars().collect();
            for piece in letters.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        if current_chars > 0 && current_chars + 1 + word_chars > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        if current_chars > 0 {
            current.push(' ');
            current_chars += 1;
        }
        current.push_str(word);
        current_chars += word_chars;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(
            chunk_text("A dog running on the beach", 100),
            vec!["A dog running on the beach"]
        );
    }

    #[test]
    fn splits_on_word_boundaries() {
        let chunks = chunk_text("one two three four five", 9);
        assert_eq!(chunks, vec!["one two", "three", "four five"]);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 9);
        }
    }

    #[test]
    fn preserves_all_words() {
        let text = "the quick brown fox jumps over the lazy dog";
        assert_eq!(chunk_text(text, 10).join(" "), text);
    }

    #[test]
    fn hard_splits_oversized_words() {
        let word = "x".repeat(250);
        let chunks = chunk_text(&word, 100);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 100);
        assert_eq!(chunks[2].chars().count(), 50);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "é".repeat(150);
        let chunks = chunk_text(&text, 100);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 100);
        assert_eq!(chunks[1].chars().count(), 50);
    }

    #[test]
    fn exact_fit_stays_single() {
        let text = "a".repeat(100);
        assert_eq!(chunk_text(&text, 100), vec![text]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", 100).is_empty());
        assert!(chunk_text("   ", 100).is_empty());
    }
}
