use anyhow::{Context, Result};
use fst::{Automaton, IntoStreamer, Map, Streamer};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Grammatical class recorded for a dictionary word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordClass {
    Pronoun,
    Noun,
    Verb,
    Adjective,
    Adverb,
    Postposition,
    Unknown,
}

impl WordClass {
    fn id(self) -> u64 {
        match self {
            WordClass::Pronoun => 0,
            WordClass::Noun => 1,
            WordClass::Verb => 2,
            WordClass::Adjective => 3,
            WordClass::Adverb => 4,
            WordClass::Postposition => 5,
            WordClass::Unknown => 6,
        }
    }

    fn from_id(id: u64) -> Self {
        match id {
            0 => WordClass::Pronoun,
            1 => WordClass::Noun,
            2 => WordClass::Verb,
            3 => WordClass::Adjective,
            4 => WordClass::Adverb,
            5 => WordClass::Postposition,
            _ => WordClass::Unknown,
        }
    }
}

impl FromStr for WordClass {
    type Err = std::convert::Infallible;

    /// Unrecognised class names map to `Unknown` rather than failing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "pronoun" => WordClass::Pronoun,
            "noun" => WordClass::Noun,
            "verb" => WordClass::Verb,
            "adjective" => WordClass::Adjective,
            "adverb" => WordClass::Adverb,
            "postposition" => WordClass::Postposition,
            _ => WordClass::Unknown,
        })
    }
}

impl fmt::Display for WordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WordClass::Pronoun => "pronoun",
            WordClass::Noun => "noun",
            WordClass::Verb => "verb",
            WordClass::Adjective => "adjective",
            WordClass::Adverb => "adverb",
            WordClass::Postposition => "postposition",
            WordClass::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

const SEED_WORDS: &[(&str, WordClass)] = &[
    // Pronouns
    ("நான்", WordClass::Pronoun),
    ("நாம்", WordClass::Pronoun),
    ("நாங்கள்", WordClass::Pronoun),
    ("நீ", WordClass::Pronoun),
    ("நீங்கள்", WordClass::Pronoun),
    ("அவன்", WordClass::Pronoun),
    ("அவள்", WordClass::Pronoun),
    ("அவர்", WordClass::Pronoun),
    ("அவர்கள்", WordClass::Pronoun),
    ("அது", WordClass::Pronoun),
    ("இது", WordClass::Pronoun),
    // Nouns
    ("பள்ளி", WordClass::Noun),
    ("பள்ளிக்கு", WordClass::Noun),
    ("பாடல்", WordClass::Noun),
    ("ஆசிரியர்", WordClass::Noun),
    ("மொழி", WordClass::Noun),
    ("புத்தகம்", WordClass::Noun),
    ("வீடு", WordClass::Noun),
    ("வீட்டுக்கு", WordClass::Noun),
    ("பேனா", WordClass::Noun),
    ("மேசையில்", WordClass::Noun),
    ("தமிழ்", WordClass::Noun),
    ("நண்பர்", WordClass::Noun),
    // Verbs
    ("செல்கிறேன்", WordClass::Verb),
    ("செல்கிறோம்", WordClass::Verb),
    ("செல்கிறாய்", WordClass::Verb),
    ("செல்கிறான்", WordClass::Verb),
    ("செல்கிறாள்", WordClass::Verb),
    ("செல்கிறார்", WordClass::Verb),
    ("செல்கிறார்கள்", WordClass::Verb),
    ("வருகிறேன்", WordClass::Verb),
    ("வருகிறான்", WordClass::Verb),
    ("வருகிறாள்", WordClass::Verb),
    ("வருகிறார்", WordClass::Verb),
    ("வருகிறார்கள்", WordClass::Verb),
    ("படிக்கிறேன்", WordClass::Verb),
    ("படிக்கிறான்", WordClass::Verb),
    ("படிக்கிறாள்", WordClass::Verb),
    ("பாடுகிறாள்", WordClass::Verb),
    ("கற்றுக்", WordClass::Verb),
    ("கொடுக்கிறார்", WordClass::Verb),
    ("வைக்கிறாள்", WordClass::Verb),
    // Adjectives and determiners
    ("நல்ல", WordClass::Adjective),
    ("அந்த", WordClass::Adjective),
    ("இந்த", WordClass::Adjective),
    ("புதிய", WordClass::Adjective),
    ("பழைய", WordClass::Adjective),
    ("பெரிய", WordClass::Adjective),
    // Adverbs
    ("எங்கு", WordClass::Adverb),
    ("இன்று", WordClass::Adverb),
    ("நாளை", WordClass::Adverb),
    // Postpositions
    ("உடன்", WordClass::Postposition),
    ("பற்றி", WordClass::Postposition),
];

/// Known words and their classes, frozen into an FST map at construction.
pub struct DictionaryStore {
    map: Map<Vec<u8>>,
}

impl DictionaryStore {
    /// Build the store from the built-in seed words alone.
    pub fn seed() -> Result<Self> {
        Self::from_entries(Self::seed_entries())
    }

    /// Build the store from the seed words plus an optional overlay file.
    ///
    /// A missing, unreadable or malformed overlay is never an error here:
    /// the seed set is used and the problem is logged.
    pub fn load(overlay: Option<&Path>) -> Result<Self> {
        let mut entries = Self::seed_entries();

        if let Some(path) = overlay {
            match fs::read_to_string(path) {
                Ok(content) => {
                    let added = merge_overlay(&mut entries, &content);
                    info!(path = %path.display(), added, "loaded dictionary overlay");
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %path.display(), "dictionary overlay not found, using seed words");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring unreadable dictionary overlay");
                }
            }
        }

        Self::from_entries(entries)
    }

    fn from_entries(entries: BTreeMap<String, WordClass>) -> Result<Self> {
        let map = Map::from_iter(entries.iter().map(|(word, class)| (word, class.id())))
            .context("Failed to build dictionary")?;
        Ok(Self { map })
    }

    fn seed_entries() -> BTreeMap<String, WordClass> {
        SEED_WORDS
            .iter()
            .map(|(word, class)| (word.to_string(), *class))
            .collect()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.map.contains_key(word)
    }

    pub fn class_of(&self, word: &str) -> WordClass {
        self.map
            .get(word)
            .map(WordClass::from_id)
            .unwrap_or(WordClass::Unknown)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Get all words starting with `prefix`, in byte order
    pub fn words_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut results = Vec::new();
        let mut stream = self
            .map
            .search(fst::automaton::Str::new(prefix).starts_with())
            .into_stream();

        while let Some((key, _)) = stream.next() {
            if let Ok(word) = String::from_utf8(key.to_vec()) {
                results.push(word);
            }
        }

        results
    }

    /// Every word in the store.
    ///
    /// Walks the whole map; callers on a hot path should prefer
    /// `words_with_prefix` or `contains`.
    pub fn words(&self) -> Vec<String> {
        let mut words = Vec::with_capacity(self.map.len());
        let mut stream = self.map.stream();

        while let Some((key, _)) = stream.next() {
            if let Ok(word) = String::from_utf8(key.to_vec()) {
                words.push(word);
            }
        }

        words
    }
}

/// Apply `word,wordClass` lines on top of `entries`; later lines win.
fn merge_overlay(entries: &mut BTreeMap<String, WordClass>, content: &str) -> usize {
    let mut added = 0;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split(',');
        let (Some(word), Some(class)) = (fields.next(), fields.next()) else {
            continue;
        };
        let word = word.trim();
        if word.is_empty() {
            continue;
        }

        let class = class.parse().unwrap_or(WordClass::Unknown);
        entries.insert(word.to_string(), class);
        added += 1;
    }

    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_seed_lookup() {
        let dict = DictionaryStore::seed().unwrap();
        assert!(dict.contains("அவர்கள்"));
        assert_eq!(dict.class_of("அவன்"), WordClass::Pronoun);
        assert_eq!(dict.class_of("செல்கிறான்"), WordClass::Verb);
        assert_eq!(dict.class_of("இல்லாதசொல்"), WordClass::Unknown);
        assert!(!dict.contains("சல்கிறேன்"));
    }

    #[test]
    fn test_missing_overlay_matches_seed() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("tamil_dictionary.txt");

        let seed = DictionaryStore::seed().unwrap();
        let loaded = DictionaryStore::load(Some(&missing)).unwrap();

        assert_eq!(seed.words(), loaded.words());
        for word in seed.words() {
            assert!(loaded.contains(&word));
        }
        assert!(!loaded.contains("சல்கிறேன்"));
    }

    #[test]
    fn test_overlay_adds_and_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "கணினி,noun").unwrap();
        writeln!(file, "அந்த,pronoun").unwrap();
        writeln!(file, "தனிச்சொல்").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "ஓடு,verb,extra").unwrap();
        writeln!(file, "ஓடு,noun").unwrap();

        let dict = DictionaryStore::load(Some(file.path())).unwrap();
        assert_eq!(dict.class_of("கணினி"), WordClass::Noun);
        assert_eq!(dict.class_of("அந்த"), WordClass::Pronoun);
        assert_eq!(dict.class_of("ஓடு"), WordClass::Noun);
        assert!(!dict.contains("தனிச்சொல்"));
        assert!(dict.contains("புத்தகம்"));
    }

    #[test]
    fn test_unknown_class_name_still_adds_word() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ஆஹா,interjection").unwrap();

        let dict = DictionaryStore::load(Some(file.path())).unwrap();
        assert!(dict.contains("ஆஹா"));
        assert_eq!(dict.class_of("ஆஹா"), WordClass::Unknown);
    }

    #[test]
    fn test_non_utf8_overlay_falls_back() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0xff, 0xfe, 0x00, b',', b'x']).unwrap();

        let dict = DictionaryStore::load(Some(file.path())).unwrap();
        assert_eq!(dict.len(), DictionaryStore::seed().unwrap().len());
    }

    #[test]
    fn test_words_with_prefix() {
        let dict = DictionaryStore::seed().unwrap();
        let words = dict.words_with_prefix("செல்");
        assert!(words.contains(&"செல்கிறேன்".to_string()));
        assert!(words.iter().all(|w| w.starts_with("செல்")));
    }
}
