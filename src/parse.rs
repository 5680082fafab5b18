//! Record parser: raw JSON bytes in, typed records plus warnings out.
//!
//! Two payload shapes are accepted:
//!
//! * **flat** — a bare array of post objects, as served by `wp/v2/posts`,
//!   with `title`/`excerpt`/`content` wrapped in `{ "rendered": … }`;
//! * **wrapped** — `{ "posts": { "items": [...] } }` for posts and
//!   `{ "locations": [...] }` for locations, with plain string fields.
//!
//! Decoding is best-effort per record.  A record missing `id` or `title` is
//! dropped and reported as a [`RecordSkipped`]; every other field has a
//! documented default.  In particular `excerpt` and `content` are optional
//! and default to an empty string.  Only a document that is not JSON at all
//! fails the whole page.

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ParseError, RecordSkipped};
use crate::source::{Location, Post};

/// Records decoded from one document, plus the ones that had to be dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub warnings: Vec<RecordSkipped>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Wrapper paths tried, in order, when the document is not a bare array.
const POST_PATHS: &[&[&str]] = &[&["posts", "items"], &["items"], &["posts"]];
const LOCATION_PATHS: &[&[&str]] = &[&["locations"]];

/// Parse a page of posts.
pub fn parse_posts(bytes: &[u8]) -> Result<Parsed<Post>, ParseError> {
    parse_with(bytes, POST_PATHS, post_from_object)
}

/// Parse the location list.
pub fn parse_locations(bytes: &[u8]) -> Result<Parsed<Location>, ParseError> {
    parse_with(bytes, LOCATION_PATHS, location_from_object)
}

fn parse_with<T>(
    bytes: &[u8],
    paths: &[&[&str]],
    decode: fn(&Map<String, Value>) -> Result<T, String>,
) -> Result<Parsed<T>, ParseError> {
    let doc: Value = serde_json::from_slice(bytes)?;

    let Some(array) = find_array(&doc, paths) else {
        return Ok(Parsed::default());
    };

    let mut parsed = Parsed::default();
    for (index, value) in array.iter().enumerate() {
        let result = match value.as_object() {
            Some(obj) => decode(obj),
            None => Err("not a JSON object".to_string()),
        };
        match result {
            Ok(record) => parsed.records.push(record),
            Err(reason) => {
                warn!(index, %reason, "skipping record");
                parsed.warnings.push(RecordSkipped { index, reason });
            }
        }
    }
    Ok(parsed)
}

/// Flat array first, then each wrapper path in turn.
fn find_array<'a>(doc: &'a Value, paths: &[&[&str]]) -> Option<&'a Vec<Value>> {
    if let Some(array) = doc.as_array() {
        return Some(array);
    }
    paths.iter().find_map(|path| {
        path.iter()
            .try_fold(doc, |node, key| node.get(*key))
            .and_then(Value::as_array)
    })
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Integer id; numeric strings are accepted too.
fn id_field(obj: &Map<String, Value>) -> Result<i64, String> {
    match obj.get("id") {
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| format!("id {n} is not an integer")),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| format!("id {s:?} is not an integer")),
        Some(other) => Err(format!("id has unexpected type: {other}")),
        None => Err("missing id".to_string()),
    }
}

/// Plain string or a WordPress `{ "rendered": "…" }` object.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(o) => o.get("rendered").and_then(Value::as_str).map(String::from),
        _ => None,
    }
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(text)
}

/// Optional string where blank means absent.
fn opt_string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// The source uses `false`, `null`, `""` and the *strings* `"false"` and
/// `"null"` interchangeably for "no image".
fn image_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    let s = obj.get(key)?.as_str()?.trim();
    match s {
        "" | "false" | "null" => None,
        _ => Some(s.to_string()),
    }
}

/// Number or numeric string; anything else is `0.0`.
fn coordinate(obj: &Map<String, Value>, key: &str) -> f64 {
    let value = match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    value.filter(|v: &f64| v.is_finite()).unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Record decoders
// ---------------------------------------------------------------------------

fn post_from_object(obj: &Map<String, Value>) -> Result<Post, String> {
    let id = id_field(obj)?;
    let title = text_field(obj, "title").ok_or_else(|| format!("post {id}: missing title"))?;

    Ok(Post {
        id,
        title,
        excerpt: text_field(obj, "excerpt").unwrap_or_default(),
        content: text_field(obj, "content").unwrap_or_default(),
        published_at: obj
            .get("date")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        url: opt_string(obj, "url").or_else(|| opt_string(obj, "link")),
        featured_image_url: image_field(obj, "featured_image")
            .or_else(|| image_field(obj, "jetpack_featured_media_url")),
        sticky: obj.get("sticky").and_then(Value::as_bool).unwrap_or(false),
    })
}

fn location_from_object(obj: &Map<String, Value>) -> Result<Location, String> {
    let id = id_field(obj)?;
    let name = opt_string(obj, "title")
        .or_else(|| opt_string(obj, "name"))
        .ok_or_else(|| format!("location {id}: missing title"))?;

    Ok(Location {
        id,
        name,
        city: opt_string(obj, "city"),
        address: opt_string(obj, "address"),
        phone: opt_string(obj, "phone"),
        email: opt_string(obj, "email"),
        contact: opt_string(obj, "contact"),
        description: opt_string(obj, "description"),
        logo_url: opt_string(obj, "logo_url"),
        latitude: coordinate(obj, "latitude"),
        longitude: coordinate(obj, "longitude"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_posts_with_missing_optionals_are_defaulted() {
        let parsed = parse_posts(br#"{"posts":{"items":[{"id":1,"title":"T"}]}}"#).unwrap();

        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.records.len(), 1);
        let post = &parsed.records[0];
        assert_eq!(post.id, 1);
        assert_eq!(post.title, "T");
        assert_eq!(post.excerpt, "");
        assert_eq!(post.content, "");
        assert!(!post.sticky);
        assert!(post.featured_image_url.is_none());
    }

    #[test]
    fn flat_array_with_rendered_fields() {
        let json = r#"[
          {
            "id": 42,
            "date": "2025-03-01T09:30:00",
            "link": "https://example.com/?p=42",
            "title": {"rendered": "Hello &amp; <em>welcome</em>"},
            "excerpt": {"rendered": "<p>Short</p>"},
            "content": {"rendered": "<p>Body</p>", "protected": false},
            "sticky": true,
            "jetpack_featured_media_url": "https://example.com/a.png"
          }
        ]"#;
        let parsed = parse_posts(json.as_bytes()).unwrap();

        let post = &parsed.records[0];
        assert_eq!(post.id, 42);
        assert_eq!(post.display_title(), "Hello &amp; welcome");
        assert_eq!(post.display_excerpt(), "Short");
        assert_eq!(post.content, "<p>Body</p>");
        assert_eq!(post.published_at, "2025-03-01T09:30:00");
        assert_eq!(post.url.as_deref(), Some("https://example.com/?p=42"));
        assert_eq!(post.featured_image_url.as_deref(), Some("https://example.com/a.png"));
        assert!(post.sticky);
    }

    #[test]
    fn bad_records_are_skipped_not_fatal() {
        let json = r#"{"posts":{"items":[
            {"id":1,"title":"ok"},
            {"id":2},
            "garbage",
            {"title":"no id"},
            {"id":"5","title":"string id"},
            {"id":1.5,"title":"fractional id"}
        ]}}"#;
        let parsed = parse_posts(json.as_bytes()).unwrap();

        let ids: Vec<i64> = parsed.records.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 5]);

        let skipped: Vec<usize> = parsed.warnings.iter().map(|w| w.index).collect();
        assert_eq!(skipped, vec![1, 2, 3, 5]);
        assert!(parsed.warnings[0].reason.contains("missing title"));
    }

    #[test]
    fn no_image_sentinels() {
        let json = r#"[
            {"id":1,"title":"a","featured_image":"false"},
            {"id":2,"title":"b","featured_image":"null"},
            {"id":3,"title":"c","featured_image":false},
            {"id":4,"title":"d","featured_image":null},
            {"id":5,"title":"e","featured_image":""},
            {"id":6,"title":"f","featured_image":"https://x/y.jpg"}
        ]"#;
        let parsed = parse_posts(json.as_bytes()).unwrap();
        let images: Vec<Option<&str>> = parsed
            .records
            .iter()
            .map(|p| p.featured_image_url.as_deref())
            .collect();
        assert_eq!(images, vec![None, None, None, None, None, Some("https://x/y.jpg")]);
    }

    #[test]
    fn missing_array_is_empty_not_error() {
        for doc in [r#"{}"#, r#"{"posts":{}}"#, r#"{"posts":{"items":[]}}"#, "[]", "null"] {
            let parsed = parse_posts(doc.as_bytes()).unwrap();
            assert!(parsed.records.is_empty(), "{doc}");
            assert!(parsed.warnings.is_empty(), "{doc}");
        }
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        assert!(parse_posts(b"<html>502 Bad Gateway</html>").is_err());
        assert!(parse_locations(b"").is_err());
    }

    #[test]
    fn url_prefers_url_over_link() {
        let parsed =
            parse_posts(br#"[{"id":1,"title":"t","url":"https://a","link":"https://b"}]"#).unwrap();
        assert_eq!(parsed.records[0].url.as_deref(), Some("https://a"));
    }

    #[test]
    fn locations_with_bad_coordinates_default_to_zero() {
        let json = r#"{"locations":[
            {"id":7,"title":"Main Hall","phone":"555-0100","email":"","latitude":"51.05","longitude":-114.07},
            {"id":8,"title":"Annex","latitude":"n/a"},
            {"id":9,"name":"Fallback Name"},
            {"id":10}
        ]}"#;
        let parsed = parse_locations(json.as_bytes()).unwrap();

        assert_eq!(parsed.records.len(), 3);
        let hall = &parsed.records[0];
        assert_eq!(hall.name, "Main Hall");
        assert_eq!(hall.phone.as_deref(), Some("555-0100"));
        assert!(hall.email.is_none());
        assert_eq!(hall.latitude, 51.05);
        assert!((hall.longitude + 114.07).abs() < 1e-9);
        assert!(hall.has_coordinates());

        let annex = &parsed.records[1];
        assert_eq!(annex.latitude, 0.0);
        assert!(!annex.has_coordinates());

        assert_eq!(parsed.records[2].name, "Fallback Name");
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].index, 3);
    }

    #[test]
    fn locations_flat_array_is_accepted() {
        let parsed = parse_locations(br#"[{"id":1,"title":"Only"}]"#).unwrap();
        assert_eq!(parsed.records[0].name, "Only");
    }
}
