//! `extract_keys` handling for structured JSON files.
//!
//! Only the configured keys participate in comparison: the digest is taken
//! over a canonical sub-document (recursively sorted keys), and syncing
//! merges those keys into the destination while leaving its other keys
//! alone. Keys may be dotted paths (`provider.local.url`); a key that exists
//! literally at the top level is always taken literally.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use super::hash::ContentDigest;
use crate::config::SpecialHandling;
use crate::error::{Error, Result};

static COMMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:[^"\\]|\\.)*"|//[^\n]*|/\*[\s\S]*?\*/"#).expect("valid comment regex")
});

static TRAILING_COMMAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:[^"\\]|\\.)*"|,(\s*[}\]])"#).expect("valid trailing comma regex")
});

/// Special handling rules for one tool, looked up by relative path or file name
#[derive(Debug, Clone, Default)]
pub struct SpecialRules {
    rules: BTreeMap<String, SpecialHandling>,
}

impl SpecialRules {
    /// Wrap the configured rules
    #[must_use]
    pub const fn new(rules: BTreeMap<String, SpecialHandling>) -> Self {
        Self { rules }
    }

    /// Rule for a `/`-separated relative path; the full path takes precedence
    #[must_use]
    pub fn lookup(&self, relative: &str) -> Option<&SpecialHandling> {
        self.rules.get(relative).or_else(|| {
            let name = relative.rsplit('/').next()?;
            self.rules.get(name)
        })
    }

    /// Whether no rules are configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Parse JSON, accepting comments and trailing commas
pub fn parse_document(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_text(&text).map_err(|e| Error::SpecialHandling {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn parse_text(text: &str) -> serde_json::Result<Value> {
    serde_json::from_str(text).or_else(|_| serde_json::from_str(&strip_jsonc(text)))
}

fn strip_jsonc(text: &str) -> String {
    let keep_strings = |caps: &Captures<'_>, replacement: &str| -> String {
        let whole = &caps[0];
        if whole.starts_with('"') {
            whole.to_string()
        } else {
            replacement.to_string()
        }
    };
    let without_comments: Cow<'_, str> =
        COMMENTS.replace_all(text, |caps: &Captures<'_>| keep_strings(caps, ""));
    TRAILING_COMMAS
        .replace_all(&without_comments, |caps: &Captures<'_>| {
            let closing = caps.get(1).map_or("", |m| m.as_str());
            keep_strings(caps, closing)
        })
        .into_owned()
}

fn segments(literal: bool, key: &str) -> Vec<&str> {
    if literal || !key.contains('.') {
        vec![key]
    } else {
        key.split('.').collect()
    }
}

fn lookup<'v>(doc: &'v Value, path: &[&str]) -> Option<&'v Value> {
    path.iter().try_fold(doc, |node, segment| node.get(*segment))
}

fn insert(root: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut node = root;
    for segment in parents {
        let child = node
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !child.is_object() {
            *child = Value::Object(Map::new());
        }
        let Value::Object(map) = child else {
            return;
        };
        node = map;
    }
    node.insert((*last).to_string(), value);
}

fn remove(root: &mut Map<String, Value>, path: &[&str]) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut node = root;
    for segment in parents {
        match node.get_mut(*segment) {
            Some(Value::Object(map)) => node = map,
            _ => return,
        }
    }
    node.shift_remove(*last);
}

/// Sub-document containing only the selected keys
#[must_use]
pub fn extract(doc: &Value, keys: &[String]) -> Value {
    let mut selected = Map::new();
    for key in keys {
        let path = segments(doc.get(key).is_some(), key);
        if let Some(value) = lookup(doc, &path) {
            insert(&mut selected, &path, value.clone());
        }
    }
    Value::Object(selected)
}

/// Copy of `value` with every object's keys sorted
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            Value::Object(
                keys.into_iter()
                    .map(|k| (k.clone(), canonicalize(&map[k])))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Digest over the canonical extracted sub-document of a file
pub fn extracted_digest(path: &Path, rule: &SpecialHandling) -> Result<ContentDigest> {
    let doc = parse_document(path)?;
    let canonical = canonicalize(&extract(&doc, &rule.include_keys));
    Ok(ContentDigest::of_bytes(&serde_json::to_vec(&canonical)?))
}

/// Render `dest` with the selected keys taken from `source`.
///
/// Keys missing from `source` are removed from the destination; every other
/// destination key keeps its value and position. A missing destination
/// starts from an empty object.
pub fn merge(source: &Path, dest: &Path, rule: &SpecialHandling) -> Result<Vec<u8>> {
    let source_doc = parse_document(source)?;
    let mut dest_doc = if dest.exists() {
        parse_document(dest)?
    } else {
        Value::Object(Map::new())
    };
    let Value::Object(dest_map) = &mut dest_doc else {
        return Err(Error::SpecialHandling {
            path: dest.to_path_buf(),
            reason: "top-level value is not an object".to_string(),
        });
    };

    for key in &rule.include_keys {
        let from_source = segments(source_doc.get(key).is_some(), key);
        match lookup(&source_doc, &from_source) {
            Some(value) => insert(dest_map, &from_source, value.clone()),
            None => {
                let path = segments(dest_map.contains_key(key), key);
                remove(dest_map, &path);
            }
        }
    }

    let mut rendered = serde_json::to_vec_pretty(&dest_doc)?;
    rendered.push(b'\n');
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpecialMode;
    use serde_json::json;
    use tempfile::TempDir;

    fn rule(keys: &[&str]) -> SpecialHandling {
        SpecialHandling {
            mode: SpecialMode::ExtractKeys,
            include_keys: keys.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_lookup_by_path_or_name() {
        let mut map = BTreeMap::new();
        map.insert("settings.json".to_string(), rule(&["permissions"]));
        map.insert("nested/exact.json".to_string(), rule(&["a"]));
        let rules = SpecialRules::new(map);

        assert!(rules.lookup("settings.json").is_some());
        assert!(rules.lookup("profiles/work/settings.json").is_some());
        assert!(rules.lookup("nested/exact.json").is_some());
        assert!(rules.lookup("other/exact.json").is_none());
    }

    #[test]
    fn test_unlisted_key_does_not_change_digest() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.json");
        let b = tmp.path().join("b.json");
        fs::write(&a, r#"{"permissions": {"allow": ["Bash"]}, "theme": "dark"}"#).unwrap();
        fs::write(&b, r#"{"theme": "light", "permissions": {"allow": ["Bash"]}}"#).unwrap();
        let rule = rule(&["permissions"]);

        assert_eq!(
            extracted_digest(&a, &rule).unwrap(),
            extracted_digest(&b, &rule).unwrap()
        );

        fs::write(&b, r#"{"theme": "light", "permissions": {"allow": ["Read"]}}"#).unwrap();
        assert_ne!(
            extracted_digest(&a, &rule).unwrap(),
            extracted_digest(&b, &rule).unwrap()
        );
    }

    #[test]
    fn test_key_order_is_canonical() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.json");
        let b = tmp.path().join("b.json");
        fs::write(&a, r#"{"p": {"x": 1, "y": 2}}"#).unwrap();
        fs::write(&b, r#"{"p": {"y": 2, "x": 1}}"#).unwrap();
        let rule = rule(&["p"]);

        assert_eq!(
            extracted_digest(&a, &rule).unwrap(),
            extracted_digest(&b, &rule).unwrap()
        );
    }

    #[test]
    fn test_jsonc_comments_and_trailing_commas() {
        let text = r#"{
  // line comment
  "url": "http://example.com/path", /* block */
  "list": [1, 2,],
  "quoted": "has // slashes, and ,]",
}"#;
        let value = parse_text(text).unwrap();
        assert_eq!(value["url"], "http://example.com/path");
        assert_eq!(value["list"], json!([1, 2]));
        assert_eq!(value["quoted"], "has // slashes, and ,]");
    }

    #[test]
    fn test_dotted_paths() {
        let doc = json!({
            "provider": {"local": {"url": "http://x", "token": "secret"}, "other": 1},
            "editor.fontSize": 14
        });

        let extracted = extract(
            &doc,
            &["provider.local.url".to_string(), "editor.fontSize".to_string()],
        );

        assert_eq!(
            extracted,
            json!({"provider": {"local": {"url": "http://x"}}, "editor.fontSize": 14})
        );
    }

    #[test]
    fn test_merge_keeps_unlisted_destination_keys() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source.json");
        let dest = tmp.path().join("dest.json");
        fs::write(&source, r#"{"permissions": {"allow": ["Read"]}, "theme": "dark"}"#).unwrap();
        fs::write(
            &dest,
            r#"{"model": "opus", "permissions": {"allow": ["Bash"], "deny": []}, "theme": "light"}"#,
        )
        .unwrap();

        let merged: Value =
            serde_json::from_slice(&merge(&source, &dest, &rule(&["permissions"])).unwrap())
                .unwrap();

        assert_eq!(merged["permissions"], json!({"allow": ["Read"]}));
        assert_eq!(merged["theme"], "light");
        assert_eq!(merged["model"], "opus");
        let keys: Vec<_> = merged.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["model", "permissions", "theme"]);
    }

    #[test]
    fn test_merge_removes_key_absent_from_source() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source.json");
        let dest = tmp.path().join("dest.json");
        fs::write(&source, r#"{"theme": "dark"}"#).unwrap();
        fs::write(&dest, r#"{"hooks": {"pre": []}, "theme": "light"}"#).unwrap();

        let merged: Value =
            serde_json::from_slice(&merge(&source, &dest, &rule(&["hooks"])).unwrap()).unwrap();

        assert_eq!(merged, json!({"theme": "light"}));
    }

    #[test]
    fn test_merge_into_missing_destination() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source.json");
        fs::write(&source, r#"{"permissions": {"allow": []}, "theme": "dark"}"#).unwrap();

        let merged: Value = serde_json::from_slice(
            &merge(&source, &tmp.path().join("new.json"), &rule(&["permissions"])).unwrap(),
        )
        .unwrap();

        assert_eq!(merged, json!({"permissions": {"allow": []}}));
    }

    #[test]
    fn test_invalid_json_is_special_handling_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = extracted_digest(&path, &rule(&["a"])).unwrap_err();
        assert!(matches!(err, Error::SpecialHandling { .. }));
    }
}
