//! Identifier validation and compound-key construction.
//!
//! Valid identifiers:
//! - Must be non-empty
//! - May contain only ASCII alphanumerics, `-`, and `_`
//!
//! Entities below the top level are identified by their ancestor ids joined
//! with [`KEY_DELIMITER`], e.g. `model1:paramsA:cp3`. List operations return
//! these compound keys; callers feed the terminal segment of the last one
//! back as the next page marker.

/// Separator between ancestor ids in a compound key.
pub const KEY_DELIMITER: char = ':';

/// Returns whether `s` is a valid entity identifier.
///
/// The charset deliberately excludes `:` (the compound-key delimiter) and
/// `/` (the object-path separator), so ids never need escaping in either
/// rendering.
///
/// # Examples
///
/// ```
/// use mlmeta_types::is_valid_id;
///
/// assert!(is_valid_id("resnet-50"));
/// assert!(is_valid_id("v2_base"));
/// assert!(!is_valid_id(""));
/// assert!(!is_valid_id("a:b"));
/// assert!(!is_valid_id("has space"));
/// ```
pub fn is_valid_id(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Compound key for a hyperparameter set: `<modelId>:<hyperparametersId>`.
pub fn hyperparameters_key(model_id: &str, hyperparameters_id: &str) -> String {
    format!("{model_id}{KEY_DELIMITER}{hyperparameters_id}")
}

/// Compound key for a checkpoint:
/// `<modelId>:<hyperparametersId>:<checkpointId>`.
pub fn checkpoint_key(model_id: &str, hyperparameters_id: &str, checkpoint_id: &str) -> String {
    format!("{model_id}{KEY_DELIMITER}{hyperparameters_id}{KEY_DELIMITER}{checkpoint_id}")
}

/// Extract the trailing (child-local) id from a compound key.
///
/// A bare id passes through unchanged, so this is safe to apply to the
/// output of any list operation regardless of hierarchy level.
///
/// ```
/// use mlmeta_types::terminal_segment;
///
/// assert_eq!(terminal_segment("model1:paramsA:cp3"), "cp3");
/// assert_eq!(terminal_segment("model1"), "model1");
/// ```
pub fn terminal_segment(key: &str) -> &str {
    key.rsplit(KEY_DELIMITER).next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn valid_ids() {
        assert!(is_valid_id("model1"));
        assert!(is_valid_id("ABC"));
        assert!(is_valid_id("0"));
        assert!(is_valid_id("snake_case"));
        assert!(is_valid_id("kebab-case"));
        assert!(is_valid_id("Mixed-1_2"));
    }

    #[test]
    fn reject_empty() {
        assert!(!is_valid_id(""));
    }

    #[test]
    fn reject_forbidden_chars() {
        assert!(!is_valid_id("a b"));
        assert!(!is_valid_id("a:b"));
        assert!(!is_valid_id("a/b"));
        assert!(!is_valid_id("a.b"));
        assert!(!is_valid_id("a\tb"));
        assert!(!is_valid_id("naïve"));
    }

    #[test]
    fn compound_keys() {
        assert_eq!(hyperparameters_key("m1", "p1"), "m1:p1");
        assert_eq!(checkpoint_key("m1", "p1", "c1"), "m1:p1:c1");
    }

    #[test]
    fn terminal_segment_of_each_level() {
        assert_eq!(terminal_segment("m1"), "m1");
        assert_eq!(terminal_segment("m1:p1"), "p1");
        assert_eq!(terminal_segment("m1:p1:c1"), "c1");
    }

    proptest! {
        #[test]
        fn charset_ids_always_valid(id in "[A-Za-z0-9_-]{1,64}") {
            prop_assert!(is_valid_id(&id));
        }

        #[test]
        fn valid_ids_round_trip_through_keys(
            m in "[A-Za-z0-9_-]{1,16}",
            h in "[A-Za-z0-9_-]{1,16}",
            c in "[A-Za-z0-9_-]{1,16}",
        ) {
            let hp_key = hyperparameters_key(&m, &h);
            prop_assert_eq!(terminal_segment(&hp_key), h.as_str());
            let cp_key = checkpoint_key(&m, &h, &c);
            prop_assert_eq!(terminal_segment(&cp_key), c.as_str());
        }

        #[test]
        fn ids_with_delimiter_are_invalid(a in "[A-Za-z0-9_-]{0,8}", b in "[A-Za-z0-9_-]{0,8}") {
            let joined = format!("{a}:{b}");
            prop_assert!(!is_valid_id(&joined));
        }
    }
}
