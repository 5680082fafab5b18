//! The domain records shared by every endpoint.
//!
//! [`Post`] is a single content item from either feed shape; [`Location`] is
//! the optional filter dimension.  The parser in [`crate::parse`] is the only
//! producer of these values, so the rest of the engine can assume the
//! documented defaults have already been applied.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>\s][^>]*>").expect("static tag pattern"));

/// Remove markup tags and surrounding whitespace.  A `<` followed by
/// whitespace is text, not a tag.  Entities are left alone;
/// full HTML-to-text conversion belongs to the view layer.
pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").trim().to_string()
}

/// A remote content item.
///
/// Identity is `id` alone: two posts with the same id are the same post, even
/// when a later page carries an edited title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Unique within a feed and stable across pages.
    pub id: i64,

    /// Raw title, possibly carrying markup.
    pub title: String,

    /// Raw excerpt, possibly carrying markup.  Empty when the source omits it.
    pub excerpt: String,

    /// Full HTML body.  Never sanitized here.
    pub content: String,

    /// Publication date exactly as the server sent it.
    pub published_at: String,

    /// Permalink (`url` in the wrapped shape, `link` in the flat one).
    pub url: Option<String>,

    pub featured_image_url: Option<String>,

    pub sticky: bool,
}

impl Post {
    /// Title with markup removed.
    pub fn display_title(&self) -> String {
        strip_tags(&self.title)
    }

    /// Excerpt with markup removed.
    pub fn display_excerpt(&self) -> String {
        strip_tags(&self.excerpt)
    }
}

/// A place posts can be filtered by.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: i64,
    /// Display name.
    pub name: String,
    pub city: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    /// Decimal degrees; `0.0` when the source had nothing usable.
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// `false` when both coordinates fell back to the `0.0` default.
    pub fn has_coordinates(&self) -> bool {
        self.latitude != 0.0 || self.longitude != 0.0
    }

    /// Map search link for the location, when it has coordinates.
    pub fn directions_url(&self) -> Option<String> {
        self.has_coordinates().then(|| {
            format!(
                "https://www.google.com/maps/search/?api=1&query={},{}",
                self.latitude, self.longitude
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Shorthand constructor for tests.
    pub fn make_post(id: i64, title: &str) -> Post {
        Post {
            id,
            title: title.to_string(),
            excerpt: String::new(),
            content: String::new(),
            published_at: String::new(),
            url: None,
            featured_image_url: None,
            sticky: false,
        }
    }

    #[test]
    fn display_title_strips_markup() {
        let mut post = make_post(1, "  <b>Bold</b> move ");
        assert_eq!(post.display_title(), "Bold move");

        post.excerpt = "<p>Short <a href=\"/x\">summary</a></p>\n".into();
        assert_eq!(post.display_excerpt(), "Short summary");
    }

    #[test]
    fn content_is_never_touched() {
        let mut post = make_post(1, "t");
        post.content = "<p>keep</p>".into();
        let _ = post.display_excerpt();
        assert_eq!(post.content, "<p>keep</p>");
    }

    #[test]
    fn strip_tags_leaves_plain_text_alone() {
        assert_eq!(strip_tags("a < b and c > d"), "a < b and c > d");
        assert_eq!(strip_tags("line<br/>break"), "linebreak");
        assert_eq!(strip_tags("no markup"), "no markup");
    }

    #[test]
    fn coordinates_default_means_none() {
        let mut loc = Location {
            id: 1,
            name: "Hall".into(),
            city: None,
            address: None,
            phone: None,
            email: None,
            contact: None,
            description: None,
            logo_url: None,
            latitude: 0.0,
            longitude: 0.0,
        };
        assert!(!loc.has_coordinates());

        assert_eq!(loc.directions_url(), None);

        loc.latitude = 51.04;
        loc.longitude = -114.07;
        assert!(loc.has_coordinates());
        assert_eq!(
            loc.directions_url().as_deref(),
            Some("https://www.google.com/maps/search/?api=1&query=51.04,-114.07")
        );
    }
}
