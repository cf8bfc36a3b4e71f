//! Word splitting and pattern-character translation.
//!
//! A word is a maximal run of "alphabet" bytes (ASCII alphanumerics plus
//! every byte >= 0x80, so multibyte UTF-8 sequences count), optionally
//! containing interior apostrophes. Control characters, space, and DEL are
//! skipped; anything else becomes a one-byte token of its own.

use crate::automaton::PatternChar;

fn is_alphabet(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte >= 0x80
}

fn is_skipped(byte: u8) -> bool {
    byte < 0x20 || byte == b' ' || byte == 0x7f
}

fn split_with(text: &str, alphabet: impl Fn(u8) -> bool) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut current = 0;
    while current < bytes.len() {
        let byte = bytes[current];
        if is_skipped(byte) {
            current += 1;
            continue;
        }

        if alphabet(byte) {
            let word_start = current;
            current += 1;
            while current < bytes.len()
                && (alphabet(bytes[current]) || bytes[current] == b'\'')
            {
                current += 1;
            }
            // Only interior apostrophes belong to the word; back trailing
            // ones out.
            let mut end = current;
            while bytes[end - 1] == b'\'' {
                end -= 1;
            }
            tokens.push(&text[word_start..end]);
            current = end;
            continue;
        }

        // Anything else is a single-byte token.
        tokens.push(&text[current..current + 1]);
        current += 1;
    }
    tokens
}

/// Tokenizes field text into indexable words.
pub fn split(text: &str) -> Vec<&str> {
    split_with(text, is_alphabet)
}

/// Tokenizes one run of query text. Same rules as [`split`], except the
/// pattern metacharacters `?`, `*`, and `\` count as word characters, so
/// `c*n` stays one pattern while `'kosak` still sheds its leading
/// apostrophe.
pub fn split_query_run(text: &str) -> Vec<&str> {
    split_with(text, |b| {
        is_alphabet(b) || b == b'?' || b == b'*' || b == b'\\'
    })
}

/// Translates a query utterance into pattern characters.
///
/// Backslash plays two roles: it escapes the metacharacters `?` and `*`,
/// and it participates in the strictness rule. An unescaped uppercase
/// letter or an escaped lowercase letter makes the whole utterance strict
/// (every character `Exact`); otherwise unescaped lowercase letters are
/// `Loose`. So `cinnabon` is loose, while `cinnaBon` and `cinna\bon` are
/// strict and `cinna\Bon` is not.
pub fn translate_to_pattern_chars(utterance: &[char]) -> Vec<PatternChar> {
    let mut force_exact = false;
    let mut i = 0;
    while i < utterance.len() {
        let ch = utterance[i];
        if ch != '\\' {
            if ch.is_ascii_uppercase() {
                force_exact = true;
            }
            i += 1;
            continue;
        }
        i += 1;
        if i == utterance.len() {
            break;
        }
        if utterance[i].is_ascii_lowercase() {
            force_exact = true;
        }
        i += 1;
    }

    let mut result = Vec::with_capacity(utterance.len());
    let mut i = 0;
    while i < utterance.len() {
        let ch = utterance[i];
        if ch == '\\' {
            // An unmatched backslash at the end stays a literal backslash.
            if i != utterance.len() - 1 {
                i += 1;
            }
            result.push(PatternChar::literal(utterance[i], !force_exact));
            i += 1;
            continue;
        }
        result.push(match ch {
            '?' => PatternChar::MatchOne,
            '*' => PatternChar::MatchN,
            _ => PatternChar::literal(ch, !force_exact),
        });
        i += 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_partitioning() {
        let cases: [(&str, &[&str]); 4] = [
            ("kosak++", &["kosak", "+", "+"]),
            ("I don't like pie", &["I", "don't", "like", "pie"]),
            (
                "This \"pain\", no name",
                &["This", "\"", "pain", "\"", ",", "no", "name"],
            ),
            ("I am 🙀Cιηη🔥вση🙀!", &["I", "am", "🙀Cιηη🔥вση🙀", "!"]),
        ];
        for (text, expected) in cases {
            assert_eq!(split(text), expected, "splitting {text:?}");
        }
    }

    #[test]
    fn apostrophes() {
        assert_eq!(split("k'osa'k"), vec!["k'osa'k"]);
        assert_eq!(split("'kosak"), vec!["'", "kosak"]);
        assert_eq!(split("kosak'"), vec!["kosak", "'"]);
        assert_eq!(split("''"), vec!["'", "'"]);
    }

    #[test]
    fn query_runs_keep_metacharacters() {
        assert_eq!(split_query_run("c*n"), vec!["c*n"]);
        assert_eq!(split_query_run("*cinn?bon*"), vec!["*cinn?bon*"]);
        assert_eq!(split_query_run("'kosak"), vec!["'", "kosak"]);
        assert_eq!(split_query_run("sender:kosak"), vec!["sender", ":", "kosak"]);
        assert_eq!(split_query_run("kosak)$"), vec!["kosak", ")", "$"]);
    }

    fn translated(s: &str) -> Vec<PatternChar> {
        translate_to_pattern_chars(&s.chars().collect::<Vec<_>>())
    }

    #[test]
    fn loose_by_default() {
        assert_eq!(
            translated("ab"),
            vec![PatternChar::Loose('a'), PatternChar::Loose('b')]
        );
    }

    #[test]
    fn uppercase_forces_exact() {
        assert_eq!(
            translated("aB"),
            vec![PatternChar::Exact('a'), PatternChar::Exact('B')]
        );
    }

    #[test]
    fn escaped_lowercase_forces_exact() {
        assert_eq!(
            translated(r"a\b"),
            vec![PatternChar::Exact('a'), PatternChar::Exact('b')]
        );
    }

    #[test]
    fn escaped_uppercase_does_not_force_exact() {
        assert_eq!(
            translated(r"a\Bc"),
            vec![
                PatternChar::Loose('a'),
                PatternChar::Exact('B'),
                PatternChar::Loose('c')
            ]
        );
    }

    #[test]
    fn metacharacters_and_escapes() {
        assert_eq!(
            translated(r"a?b*"),
            vec![
                PatternChar::Loose('a'),
                PatternChar::MatchOne,
                PatternChar::Loose('b'),
                PatternChar::MatchN
            ]
        );
        assert_eq!(
            translated(r"a\*"),
            vec![PatternChar::Loose('a'), PatternChar::Exact('*')]
        );
        // Trailing unmatched backslash stays.
        assert_eq!(
            translated("a\\"),
            vec![PatternChar::Loose('a'), PatternChar::Exact('\\')]
        );
    }
}
