//! Scanning bodies for `key++` / `key--` score tokens.

use std::collections::BTreeMap;

/// Adds `weight` (for `++`) or `-weight` (for `--`) to `deltas[key]` for
/// every score token in `body`. A key whose mentions net to zero still gets
/// an entry; downstream bookkeeping depends on seeing it.
pub(crate) fn scan(body: &str, weight: i64, deltas: &mut BTreeMap<String, i64>) {
    let bytes = body.as_bytes();
    let is_alphabet = |b: u8| b.is_ascii_alphanumeric() || b >= 0x80;

    let mut current = 0;
    while current < bytes.len() {
        if !is_alphabet(bytes[current]) {
            current += 1;
            continue;
        }
        let word_start = current;
        current += 1;
        while current < bytes.len() && (is_alphabet(bytes[current]) || bytes[current] == b'\'') {
            current += 1;
        }
        let mut end = current;
        while bytes[end - 1] == b'\'' {
            end -= 1;
        }

        let sign = match bytes.get(end..end + 2) {
            Some([b'+', b'+']) => 1,
            Some([b'-', b'-']) => -1,
            _ => {
                current = end;
                continue;
            }
        };
        let key = &body[word_start..end];
        *deltas.entry(key.to_owned()).or_insert(0) += sign * weight;
        current = end + 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanned(body: &str) -> BTreeMap<String, i64> {
        let mut deltas = BTreeMap::new();
        scan(body, 1, &mut deltas);
        deltas
    }

    #[test]
    fn basic_tokens() {
        let deltas = scanned("kosak++ cinnabon-- pie");
        assert_eq!(deltas.get("kosak"), Some(&1));
        assert_eq!(deltas.get("cinnabon"), Some(&-1));
        assert_eq!(deltas.get("pie"), None);
    }

    #[test]
    fn net_zero_still_recorded() {
        let deltas = scanned("foo++ foo--");
        assert_eq!(deltas.get("foo"), Some(&0));
    }

    #[test]
    fn repeated_mentions_accumulate() {
        let deltas = scanned("c++ c++ c++");
        assert_eq!(deltas.get("c"), Some(&3));
    }

    #[test]
    fn negative_weight_subtracts() {
        let mut deltas = BTreeMap::new();
        scan("foo++", 1, &mut deltas);
        scan("foo++", -1, &mut deltas);
        assert_eq!(deltas.get("foo"), Some(&0));
    }

    #[test]
    fn bare_plus_is_not_a_token() {
        assert!(scanned("+ + - -").is_empty());
        assert!(scanned("foo+ bar-").is_empty());
    }
}
