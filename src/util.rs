use std::fmt::Display;
use std::iter::repeat;
use std::path::{Path, PathBuf};

pub fn find_first_subpath<P: AsRef<Path>, F: Fn(&Path) -> bool>(
    root: impl AsRef<Path>,
    subpaths: &[P],
    search: F,
) -> Option<PathBuf> {
    subpaths
        .iter()
        .zip(repeat(root.as_ref()))
        .map(|(b, a)| a.join(b))
        .find(|it: &PathBuf| search(it))
}

/// Renders numbers as `[1, 2, 3]`.
pub fn bracket_list<T: Display>(items: &[T]) -> String {
    let inner: Vec<String> = items.iter().map(ToString::to_string).collect();
    format!("[{}]", inner.join(", "))
}

/// Renders names as `['alice', 'bob']`.
pub fn quoted_list(items: &[String]) -> String {
    let inner: Vec<String> = items.iter().map(|it| format!("'{}'", it)).collect();
    format!("[{}]", inner.join(", "))
}

pub mod date_time_as_unix_seconds {
    //! Serializes `DateTime<Utc>` as a JWT "NumericDate" (RFC 7519, section 2).
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(date.timestamp())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Utc.timestamp_opt(i64::deserialize(deserializer)?, 0)
            .single()
            .ok_or_else(|| serde::de::Error::custom("Invalid Unix timestamp value."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_render_like_the_legacy_messages() {
        assert_eq!(bracket_list(&[999i64]), "[999]");
        assert_eq!(bracket_list(&[1i64, 2, 3]), "[1, 2, 3]");
        assert_eq!(bracket_list::<i64>(&[]), "[]");
        assert_eq!(
            quoted_list(&["carol".to_string(), "dave".to_string()]),
            "['carol', 'dave']"
        );
    }

    #[test]
    fn first_existing_subpath_wins() {
        let root = std::env::temp_dir();
        let found = find_first_subpath(&root, &["a", "b"], |p| p.ends_with("b"));
        assert_eq!(found, Some(root.join("b")));
    }
}
