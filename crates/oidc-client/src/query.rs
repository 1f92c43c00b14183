//! URL query string encoding and decoding
//!
//! Covers both directions of the wire: building the authorize-endpoint
//! query for login URLs, and parsing the query the authorization server
//! hands back on the redirect.

use std::collections::HashMap;

/// Encode ordered key/value pairs as `k=v&k2=v2`, percent-encoding both
/// sides.
///
/// Pair order is preserved so generated URLs are deterministic; the
/// protocol itself does not care about ordering.
pub fn encode<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Decode a query string into a key → value map.
///
/// Splits on `&`, then on the first `=` only (values may legitimately
/// contain `=`). Both sides are percent-decoded. Duplicate keys resolve
/// last-write-wins. An absent or empty query decodes to an empty map,
/// not an error.
pub fn decode(query: Option<&str>) -> HashMap<String, String> {
    let mut out = HashMap::new();
    let Some(query) = query else {
        return out;
    };
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        };
        out.insert(decode_component(key), decode_component(value));
    }
    out
}

/// Percent-decode one side of a pair, keeping the raw form when the
/// decoded bytes are not valid UTF-8.
fn decode_component(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_preserves_pair_order() {
        let encoded = encode([("b", "2"), ("a", "1"), ("c", "3")]);
        assert_eq!(encoded, "b=2&a=1&c=3");
    }

    #[test]
    fn encode_percent_encodes_values() {
        let encoded = encode([("redirect_uri", "https://app.example/cb?x=1")]);
        assert_eq!(encoded, "redirect_uri=https%3A%2F%2Fapp.example%2Fcb%3Fx%3D1");
    }

    #[test]
    fn encode_uses_percent20_for_spaces() {
        let encoded = encode([("scope", "openid offline_access")]);
        assert_eq!(encoded, "scope=openid%20offline_access");
    }

    #[test]
    fn decode_none_is_empty() {
        assert!(decode(None).is_empty());
        assert!(decode(Some("")).is_empty());
    }

    #[test]
    fn decode_splits_on_first_equals_only() {
        let params = decode(Some("code=abc=def&state=xyz"));
        assert_eq!(params["code"], "abc=def");
        assert_eq!(params["state"], "xyz");
    }

    #[test]
    fn decode_duplicate_keys_last_write_wins() {
        let params = decode(Some("k=first&k=second"));
        assert_eq!(params["k"], "second");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn decode_tolerates_valueless_keys() {
        let params = decode(Some("error&state=s1"));
        assert_eq!(params["error"], "");
        assert_eq!(params["state"], "s1");
    }

    #[test]
    fn roundtrip_printable_ascii() {
        let mut original = HashMap::new();
        original.insert("state".to_string(), "aZ9".to_string());
        original.insert("note".to_string(), "a b&c=d%e".to_string());
        original.insert("empty".to_string(), String::new());

        let pairs: Vec<(&str, &str)> = original
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let decoded = decode(Some(&encode(pairs)));
        assert_eq!(decoded, original);
    }
}
