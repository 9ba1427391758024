//! Arabic text primitives shared by the normalizer, the lexicon extractor and
//! the aggregator's word counts.
//!
//! Everything here is a pure function of its input.

use std::collections::HashSet;
use std::sync::LazyLock;

const TATWEEL: char = '\u{0640}';
const SUPERSCRIPT_ALEF: char = '\u{0670}';

/// Function words dropped from token lists, in their raw spelling.
const STOP_WORDS: &[&str] = &[
    "في", "على", "من", "إلى", "عن", "مع", "و", "أو", "لكن", "ثم", "هذا", "هذه", "ذلك", "تلك",
    "كل", "بعد", "قبل", "أن", "لا",
];

/// Stop words in canonical form, so lookups match normalized tokens.
static STOP_TOKENS: LazyLock<HashSet<String>> =
    LazyLock::new(|| STOP_WORDS.iter().map(|w| canonicalize(w)).collect());

/// `true` for characters in the Arabic block (U+0600..=U+06FF).
#[must_use]
pub fn is_arabic(c: char) -> bool {
    ('\u{0600}'..='\u{06FF}').contains(&c)
}

/// Tashkeel marks, superscript alef and tatweel.
#[must_use]
pub fn is_diacritic(c: char) -> bool {
    ('\u{064B}'..='\u{0652}').contains(&c) || c == SUPERSCRIPT_ALEF || c == TATWEEL
}

/// Map letter variants onto one canonical letter.
#[must_use]
pub fn normalize_letter(c: char) -> char {
    match c {
        'أ' | 'إ' | 'آ' | 'ٱ' => 'ا',
        'ى' => 'ي',
        'ة' => 'ه',
        other => other,
    }
}

/// Strip diacritics and unify letter variants. Does not touch any other character.
#[must_use]
pub fn canonicalize(text: &str) -> String {
    text.chars()
        .filter(|c| !is_diacritic(*c))
        .map(normalize_letter)
        .collect()
}

/// Collapse runs of whitespace into single spaces and trim the ends.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split on whitespace and punctuation.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[must_use]
pub fn is_stop_token(token: &str) -> bool {
    STOP_TOKENS.contains(token)
}

/// `#tags` as written, in order of appearance, without the `#`.
///
/// A tag runs over letters, digits and `_`, matching `#\w+`.
#[must_use]
pub fn literal_hashtags(content: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '#' {
            continue;
        }
        let mut tag = String::new();
        while let Some(&next) = chars.peek() {
            if next.is_alphanumeric() || next == '_' {
                tag.push(next);
                chars.next();
            } else {
                break;
            }
        }
        if !tag.is_empty() {
            tags.push(tag);
        }
    }
    tags
}

/// Lower-cased [`literal_hashtags`].
#[must_use]
pub fn extract_hashtags(content: &str) -> Vec<String> {
    literal_hashtags(content)
        .into_iter()
        .map(|tag| tag.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_strips_tashkeel_and_tatweel() {
        assert_eq!(canonicalize("مُحَمَّد"), "محمد");
        assert_eq!(canonicalize("هـــدف"), "هدف");
    }

    #[test]
    fn canonicalize_unifies_letter_variants() {
        assert_eq!(canonicalize("أحمد إبراهيم آدم"), "احمد ابراهيم ادم");
        assert_eq!(canonicalize("مصطفى"), "مصطفي");
        assert_eq!(canonicalize("مباراة"), "مباراه");
    }

    #[test]
    fn tokenize_splits_on_arabic_punctuation() {
        assert_eq!(tokenize("هدف، رائع؟ جدا"), vec!["هدف", "رائع", "جدا"]);
    }

    #[test]
    fn stop_tokens_match_canonical_forms() {
        assert!(is_stop_token("الي"));
        assert!(is_stop_token("في"));
        assert!(!is_stop_token("هدف"));
    }

    #[test]
    fn hashtags_are_lowercased_and_bounded() {
        assert_eq!(
            extract_hashtags("#Goal! مبروك #الهلال_بطل و # فارغ"),
            vec!["goal", "الهلال_بطل"]
        );
        assert_eq!(
            literal_hashtags("#Goal #GOAL #الهلال"),
            vec!["Goal", "GOAL", "الهلال"]
        );
    }

    #[test]
    fn arabic_block_bounds() {
        assert!(is_arabic('ا'));
        assert!(is_arabic('،'));
        assert!(!is_arabic('a'));
        assert!(!is_arabic('😀'));
    }
}
