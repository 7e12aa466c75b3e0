use crate::Correction;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref WORD_CHAR: Regex = Regex::new(r"^\w$").unwrap();
}

/// Apply every non-advisory correction to `text`, in the order given.
///
/// Each replacement is a literal substitution of the first occurrence of
/// the correction's context that stands on its own, i.e. is not glued to
/// letters on either side, in the text as modified so far. When an
/// earlier replacement already rewrote part of a later correction's
/// context, the later one no longer finds its context and is skipped.
pub fn apply(text: &str, corrections: &[Correction]) -> String {
    apply_counted(text, corrections).0
}

/// Like [`apply`], also returning how many replacements took effect.
pub fn apply_counted(text: &str, corrections: &[Correction]) -> (String, usize) {
    let mut corrected = text.to_string();
    let mut applied = 0;

    for correction in corrections {
        let Some(replacement) = correction.replacement.as_deref() else {
            continue;
        };
        if correction.context.is_empty() {
            continue;
        }

        match find_standalone(&corrected, &correction.context) {
            Some(start) => {
                corrected.replace_range(start..start + correction.context.len(), replacement);
                applied += 1;
            }
            None => {
                debug!(
                    context = %correction.context,
                    "context no longer present, skipping replacement"
                );
            }
        }
    }

    (corrected, applied)
}

/// Byte offset of the first occurrence of `needle` that does not start or
/// end inside a word.
fn find_standalone(haystack: &str, needle: &str) -> Option<usize> {
    haystack.match_indices(needle).map(|(start, _)| start).find(|&start| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

/// Letters, digits and combining marks such as Tamil vowel signs.
fn is_word_char(ch: char) -> bool {
    let mut buf = [0; 4];
    WORD_CHAR.is_match(ch.encode_utf8(&mut buf))
}
