// WHY: Canonical token stream for resegmentation: ASCII-transliterated, lowercase, `[a-z0-9' ]` only
// Only a literal space separates tokens; every other character outside the alphabet is deleted

use deunicode::deunicode_char;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Code points treated as an apostrophe after folding
const APOSTROPHE_LIKE: &[char] = &[
    '\'', '`', '\u{2018}', '\u{2019}', '\u{201A}', '\u{201B}', '\u{2032}', '\u{00B4}', '\u{02BC}',
];

/// Split raw text into normalized tokens.
///
/// Applies, in order: ASCII transliteration, apostrophe unification,
/// lowercasing, removal of everything outside `[a-z0-9' ]`, and space
/// collapsing. Blank input yields an empty vector.
pub fn normalize(raw: &str) -> Vec<String> {
    let mut buffer = String::with_capacity(raw.len());
    normalize_into(raw, &mut buffer);
    tokens(&buffer).map(str::to_owned).collect()
}

/// Normalize into a caller-supplied buffer.
/// The buffer holds single-space separated tokens with no leading or trailing space.
pub fn normalize_into(raw: &str, buffer: &mut String) {
    buffer.clear();
    buffer.reserve(raw.len());

    // Start as if a space was just written so leading separators are dropped
    let mut prev_was_space = true;
    let mut push = |c: char, buffer: &mut String| match c {
        'a'..='z' | '0'..='9' | '\'' => {
            buffer.push(c);
            prev_was_space = false;
        }
        ' ' => {
            if !prev_was_space {
                buffer.push(' ');
                prev_was_space = true;
            }
        }
        _ => {}
    };

    for ch in raw.chars() {
        if APOSTROPHE_LIKE.contains(&ch) {
            push('\'', buffer);
        } else if ch.is_ascii() {
            // Tabs and newlines fall through to deletion like any other symbol
            push(ch.to_ascii_lowercase(), buffer);
        } else if !ch.is_whitespace() {
            // Compatibility forms and accents first, then transliterate what is left
            for c in std::iter::once(ch).nfkd() {
                if is_combining_mark(c) || c.is_whitespace() {
                    continue;
                }
                if APOSTROPHE_LIKE.contains(&c) {
                    push('\'', buffer);
                } else if c.is_ascii() {
                    push(c.to_ascii_lowercase(), buffer);
                } else if let Some(ascii) = deunicode_char(c) {
                    for t in ascii.chars() {
                        push(t.to_ascii_lowercase(), buffer);
                    }
                }
            }
        }
    }

    if buffer.ends_with(' ') {
        buffer.pop();
    }
}

/// Iterate the tokens of an already-normalized buffer
pub fn tokens(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split(' ').filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("The Quick  brown fox"), vec!["the", "quick", "brown", "fox"]);
    }

    #[test]
    fn test_normalize_blank() {
        assert!(normalize("").is_empty());
        assert!(normalize("   \t\n ").is_empty());
        assert!(normalize("!!! --- ???").is_empty());
    }

    #[test]
    fn test_normalize_strips_diacritics() {
        assert_eq!(normalize("Café naïve résumé"), vec!["cafe", "naive", "resume"]);
        assert_eq!(normalize("Straße Ærø"), vec!["strasse", "aero"]);
    }

    #[test]
    fn test_normalize_unifies_apostrophes() {
        assert_eq!(normalize("don\u{2019}t it`s o\u{2018}clock"), vec!["don't", "it's", "o'clock"]);
        assert_eq!(normalize("rock\u{00B4}n"), vec!["rock'n"]);
    }

    #[test]
    fn test_normalize_removes_punctuation_and_hyphens() {
        assert_eq!(normalize("inter-national, (1999)!"), vec!["international", "1999"]);
    }

    #[test]
    fn test_normalize_only_space_separates_tokens() {
        assert_eq!(normalize("a\tb\r\nc\u{00A0}d"), vec!["abcd"]);
        assert_eq!(normalize("inter\nnational a\tb"), vec!["international", "ab"]);
        assert_eq!(normalize("one\u{3000}two three"), vec!["onetwo", "three"]);
    }

    #[test]
    fn test_normalize_ligatures_and_compat_forms() {
        assert_eq!(normalize("ﬁnal ﬂow"), vec!["final", "flow"]);
        assert_eq!(normalize("ＡＢＣ"), vec!["abc"]);
    }

    #[test]
    fn test_normalize_transliterates_other_scripts() {
        assert_eq!(normalize("Москва Αθήνα"), vec!["moskva", "athena"]);
        assert_eq!(normalize("Łódź Þór"), vec!["lodz", "thor"]);
        assert!(normalize("hello 世界 world").iter().all(|t| t.is_ascii()));
    }

    #[test]
    fn test_normalize_into_buffer_reuse() {
        let mut buffer = String::new();
        normalize_into("  One  Two ", &mut buffer);
        assert_eq!(buffer, "one two");

        normalize_into("Three", &mut buffer);
        assert_eq!(buffer, "three");
        assert_eq!(tokens(&buffer).collect::<Vec<_>>(), vec!["three"]);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let input = "Ünïcödé — text’s «mixed» 42nd";
        assert_eq!(normalize(input), normalize(input));
        assert_eq!(normalize(input), vec!["unicode", "text's", "mixed", "42nd"]);
    }
}
