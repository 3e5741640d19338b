//! OAuth parameter sets and their normalization (RFC 5849 Section 3.4.1.3).

use std::collections::BTreeMap;

use crate::encode::percent_encode;

/// Value of `oauth_signature_method`.
pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";

/// Value of `oauth_version`.
pub const OAUTH_VERSION: &str = "1.0";

/// Parameters that take part in a signature.
///
/// Keys are unique; inserting an existing key replaces its value. The set is
/// used as a value: [`ParameterSet::with`] and [`ParameterSet::merge`] hand
/// back a new set instead of mutating a shared one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet(BTreeMap<String, String>);

impl ParameterSet {
    /// Create an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return this set with `key` set to `value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Return the union of both sets. Entries from `other` win on key clashes.
    #[must_use]
    pub fn merge(&self, other: &ParameterSet) -> ParameterSet {
        let mut merged = self.0.clone();
        merged.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        ParameterSet(merged)
    }

    /// Look up a parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(key, value)` pairs in raw key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |params, (k, v)| params.with(k, v))
    }
}

/// Build the five protocol parameters every signed request carries.
#[must_use]
pub fn protocol_parameters(consumer_key: &str, nonce: &str, timestamp: &str) -> ParameterSet {
    ParameterSet::new()
        .with("oauth_consumer_key", consumer_key)
        .with("oauth_nonce", nonce)
        .with("oauth_signature_method", SIGNATURE_METHOD)
        .with("oauth_timestamp", timestamp)
        .with("oauth_version", OAUTH_VERSION)
}

/// Normalize parameters into the string that goes into the signature base.
///
/// Keys and values are percent-encoded first, then sorted by encoded key
/// (ties by encoded value) and joined as `key=value` pairs with `&`. Sorting
/// happens after encoding because the encoded byte order can differ from the
/// raw one for non-ASCII keys.
#[must_use]
pub fn normalize(params: &ParameterSet) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_normalize_sorts_by_key() {
        let params: ParameterSet = [("b", "2"), ("a", "1"), ("c", "3")].into_iter().collect();
        assert_eq!(normalize(&params), "a=1&b=2&c=3");
    }

    #[test]
    fn test_normalize_encodes_keys_and_values() {
        let params = ParameterSet::new()
            .with("search", "blue shirt")
            .with("filter[sku]", "a&b");
        assert_eq!(
            normalize(&params),
            "filter%5Bsku%5D=a%26b&search=blue%20shirt"
        );
    }

    #[test]
    fn test_normalize_orders_on_encoded_keys() {
        // Raw 'é' (0xC3) sorts after '~', encoded "%C3%A9" sorts before it.
        let params = ParameterSet::new().with("a~", "1").with("aé", "2");
        assert_eq!(normalize(&params), "a%C3%A9=2&a~=1");
    }

    #[test]
    fn test_normalize_empty_set() {
        assert_eq!(normalize(&ParameterSet::new()), "");
    }

    #[test]
    fn test_normalize_is_stable_under_resorting() {
        let params = ParameterSet::new()
            .with("per_page", "5")
            .with("oauth_nonce", "abc")
            .with("Status", "done")
            .with("after", "2024-01-01T00:00:00")
            .with("x y", "!");
        let normalized = normalize(&params);

        let mut pairs: Vec<&str> = normalized.split('&').collect();
        pairs.sort_unstable();
        assert_eq!(pairs.join("&"), normalized);

        let keys: Vec<&str> = pairs
            .iter()
            .filter_map(|pair| pair.split('=').next())
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_with_replaces_existing_key() {
        let params = ParameterSet::new().with("page", "1").with("page", "2");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("page"), Some("2"));
    }

    #[test]
    fn test_merge_leaves_inputs_untouched() {
        let query = ParameterSet::new().with("per_page", "5");
        let protocol = protocol_parameters("ck", "abc", "1700000000");

        let merged = query.merge(&protocol);

        assert_eq!(merged.len(), 6);
        assert_eq!(query.len(), 1);
        assert_eq!(protocol.len(), 5);
    }

    #[test]
    fn test_merge_other_wins() {
        let caller = ParameterSet::new().with("oauth_version", "2.0");
        let merged = caller.merge(&protocol_parameters("ck", "abc", "1"));
        assert_eq!(merged.get("oauth_version"), Some("1.0"));
    }

    #[test]
    fn test_protocol_parameters() {
        let params = protocol_parameters("ck", "abc", "1700000000");
        assert_eq!(
            normalize(&params),
            "oauth_consumer_key=ck&oauth_nonce=abc&oauth_signature_method=HMAC-SHA1\
             &oauth_timestamp=1700000000&oauth_version=1.0"
        );
    }
}
