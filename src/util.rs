use chrono::NaiveDate;
use reqwest::Url;
use serde_json::{Map, Value};

/// Walks a dotted path such as `emailAddress.value`.
pub fn value_at<'a>(v: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(v, |cur, key| cur.get(key))
}

/// Reads a dotted path as a string. Numbers are stringified since iTunes Connect
/// is not consistent about identifier types.
pub fn string_at(v: &Value, path: &str) -> Option<String> {
    match value_at(v, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn bool_at(v: &Value, path: &str) -> Option<bool> {
    value_at(v, path).and_then(|b| b.as_bool())
}

/// Writes `new` at a dotted path, creating intermediate objects as needed.
/// Non-object values in the way are replaced.
pub fn set_at(v: &mut Value, path: &str, new: Value) {
    if !v.is_object() {
        *v = Value::Object(Map::new());
    }
    let Value::Object(obj) = v else {
        return;
    };
    match path.split_once('.') {
        None => {
            obj.insert(path.to_string(), new);
        }
        Some((head, rest)) => {
            let child = obj
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            set_at(child, rest, new);
        }
    }
}

/// Collects the error messages iTunes Connect embeds in otherwise successful responses.
pub fn service_errors(body: &Value) -> Vec<String> {
    let mut errors = Vec::new();
    for path in ["messages.error", "data.messages.error", "data.sectionErrorKeys"] {
        match value_at(body, path) {
            Some(Value::Array(list)) => errors.extend(
                list.iter()
                    .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string())),
            ),
            Some(Value::String(s)) if !s.is_empty() => errors.push(s.clone()),
            _ => {}
        }
    }
    errors
}

/// Analytics timestamps are whole days in UTC.
pub fn analytics_time(date: NaiveDate) -> String {
    format!("{}T00:00:00Z", date.format("%Y-%m-%d"))
}

/// Treats the URL as a directory so relative joins append to it rather than
/// replacing its last segment.
pub fn as_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Percent-encodes a value for use as a single path segment.
pub fn encode_segment(segment: &str) -> String {
    let Ok(mut url) = Url::parse("http://localhost/") else {
        return segment.to_string();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(segment);
    }
    url.path().trim_start_matches('/').to_string()
}
