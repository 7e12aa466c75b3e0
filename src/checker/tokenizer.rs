use crate::Token;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Latin terminators plus the danda used as a full stop in Indic text
    static ref SENTENCE_STOP: Regex = Regex::new(r"[.?!।]").unwrap();
}

/// Split text into whitespace-separated word tokens.
///
/// Punctuation clinging to either end of a word is trimmed off and the
/// offsets are adjusted to match; tokens that are nothing but punctuation
/// are dropped.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word_start = None;

    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(start) = word_start.take() {
                push_trimmed(&mut tokens, text, start, idx, is_edge_punctuation);
            }
        } else if word_start.is_none() {
            word_start = Some(idx);
        }
    }

    if let Some(start) = word_start {
        push_trimmed(&mut tokens, text, start, text.len(), is_edge_punctuation);
    }

    tokens
}

/// Split text into sentences on terminal punctuation.
pub fn sentences(text: &str) -> Vec<Token> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for stop in SENTENCE_STOP.find_iter(text) {
        push_trimmed(&mut sentences, text, start, stop.start(), char::is_whitespace);
        start = stop.end();
    }
    push_trimmed(&mut sentences, text, start, text.len(), char::is_whitespace);

    sentences
}

/// True for words made only of digits, in any script.
pub fn is_numeric(word: &str) -> bool {
    !word.is_empty() && word.chars().all(char::is_numeric)
}

fn is_edge_punctuation(ch: char) -> bool {
    ch.is_ascii_punctuation() || matches!(ch, '।' | '॥' | '“' | '”' | '‘' | '’' | '…')
}

fn push_trimmed(
    tokens: &mut Vec<Token>,
    text: &str,
    start: usize,
    end: usize,
    strip: fn(char) -> bool,
) {
    let raw = &text[start..end];
    let without_lead = raw.trim_start_matches(strip);
    let trimmed = without_lead.trim_end_matches(strip);
    if trimmed.is_empty() {
        return;
    }

    let start = start + (raw.len() - without_lead.len());
    tokens.push(Token {
        text: trimmed.to_string(),
        start,
        end: start + trimmed.len(),
    });
}
