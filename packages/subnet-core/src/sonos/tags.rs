//! Tolerant tag extraction over SOAP bodies and device documents.
//!
//! Sonos responses are well-formed, but only a handful of flat fields are
//! ever needed from them. Extraction works on raw text with these rules:
//!
//! - the first occurrence in document order wins
//! - tag names match case-insensitively (`CurrentVolume` == `currentvolume`)
//! - the opening tag may carry attributes (`<Foo a="1">Bar</Foo>`)
//! - self-closing tags never match
//! - the value is everything up to the next `<` and must be followed directly
//!   by the matching closing tag
//! - the value is trimmed, entities are left untouched
//!
//! Fields carrying embedded markup (track metadata, zone group state) arrive
//! escaped once; run [`unescape`] on the extracted value before scanning it.
//!
//! Call sites go through the [`Tags`] trait so the matching strategy can be
//! replaced without touching them. Matching is done with one compiled
//! pattern per tag (and per tag/attribute pair), built on first use and
//! cached for the life of the process.

use std::borrow::Cow;
use std::str::FromStr;
use std::sync::OnceLock;

use dashmap::DashMap;
use regex::Regex;

/// Key→value lookup over an XML-like document.
pub trait Tags {
    /// Returns the trimmed text of the first `tag` element, if any.
    fn tag(&self, tag: &str) -> Option<String>;

    /// Like [`Tags::tag`], but treats empty values as absent.
    fn tag_nonempty(&self, tag: &str) -> Option<String> {
        self.tag(tag).filter(|v| !v.is_empty())
    }

    /// Parses the tag as a number, falling back to `default` when the tag is
    /// missing or unparsable.
    fn tag_int<T: FromStr>(&self, tag: &str, default: T) -> T {
        self.tag(tag)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Coerces the tag to a boolean, see [`parse_bool`].
    fn tag_bool(&self, tag: &str, default: bool) -> bool {
        self.tag(tag).map_or(default, |v| parse_bool(&v))
    }
}

impl Tags for str {
    fn tag(&self, tag: &str) -> Option<String> {
        extract(self, tag)
    }
}

impl Tags for String {
    fn tag(&self, tag: &str) -> Option<String> {
        extract(self, tag)
    }
}

/// Compiled patterns keyed by their source text.
fn patterns() -> &'static DashMap<String, Regex> {
    static PATTERNS: OnceLock<DashMap<String, Regex>> = OnceLock::new();
    PATTERNS.get_or_init(DashMap::new)
}

fn cached(pattern: String) -> Option<Regex> {
    if let Some(re) = patterns().get(&pattern) {
        return Some(re.value().clone());
    }

    match Regex::new(&pattern) {
        Ok(re) => {
            patterns().insert(pattern, re.clone());
            Some(re)
        }
        Err(e) => {
            log::warn!("[Tags] Invalid pattern {}: {}", pattern, e);
            None
        }
    }
}

/// `<tag ...>value</tag>`, never matching a self-closing `<tag .../>`.
fn element_pattern(tag: &str) -> Option<Regex> {
    let name = regex::escape(tag);
    cached(format!(r"(?i)<{name}(?:\s(?:[^>]*[^/>])?)?>([^<]*)</{name}\s*>"))
}

/// Attribute list of the first `<tag ...>` opening tag.
fn opening_tag_pattern(tag: &str) -> Option<Regex> {
    let name = regex::escape(tag);
    cached(format!(r"(?i)<{name}(\s[^>]*)?/?>"))
}

/// `attr="value"` or `attr='value'` as a whole attribute name.
fn attribute_pattern(attr: &str) -> Option<Regex> {
    let name = regex::escape(attr);
    cached(format!(r#"(?i)(?:^|\s){name}\s*=\s*(?:"([^"]*)"|'([^']*)')"#))
}

/// Extracts the first `tag` value from `text`.
///
/// See the module docs for the matching rules.
#[must_use]
pub fn extract(text: &str, tag: &str) -> Option<String> {
    if tag.is_empty() {
        return None;
    }

    element_pattern(tag)?
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Reads attribute `attr` from the first `tag` opening tag.
///
/// Tag and attribute names match case-insensitively; the value is returned
/// as written (entities untouched). Both quote styles are accepted.
#[must_use]
pub fn extract_attr(text: &str, tag: &str, attr: &str) -> Option<String> {
    if tag.is_empty() || attr.is_empty() {
        return None;
    }

    let head = opening_tag_pattern(tag)?.captures(text)?.get(1)?;
    let caps = attribute_pattern(attr)?.captures(head.as_str())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Boolean coercion used for device flags.
///
/// `1`, `true`, `on` and `yes` (any case) are true; everything else is false.
#[must_use]
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

/// Decodes XML/HTML entities (`&lt;`, `&gt;`, `&quot;`, `&amp;`, numeric refs).
#[must_use]
pub fn unescape(text: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_is_case_insensitive_and_attribute_tolerant() {
        assert_eq!(extract(r#"<Foo a="1">Bar</Foo>"#, "foo").as_deref(), Some("Bar"));
    }

    #[test]
    fn extract_returns_first_match_trimmed() {
        let xml = "<a><Title>  First </Title><Title>Second</Title></a>";
        assert_eq!(extract(xml, "Title").as_deref(), Some("First"));
    }

    #[test]
    fn extract_ignores_longer_tag_names() {
        let xml = "<result>nope</result><res protocolInfo=\"x\">http://a/b.mp3</res>";
        assert_eq!(extract(xml, "res").as_deref(), Some("http://a/b.mp3"));
    }

    #[test]
    fn extract_skips_self_closing_and_nested_content() {
        let xml = "<Track/><Track><inner>x</inner></Track><Track>3</Track>";
        assert_eq!(extract(xml, "Track").as_deref(), Some("3"));
    }

    #[test]
    fn extract_handles_namespaced_tags() {
        let xml = "<dc:title>Song</dc:title><upnp:album>LP</upnp:album>";
        assert_eq!(extract(xml, "dc:title").as_deref(), Some("Song"));
        assert_eq!(extract(xml, "UPNP:ALBUM").as_deref(), Some("LP"));
    }

    #[test]
    fn extract_keeps_non_ascii_values_intact() {
        let xml = "<dc:creator>Beyoncé</dc:creator><dc:title>Ünïcödé ☕ Café</dc:title>";
        assert_eq!(extract(xml, "DC:TITLE").as_deref(), Some("Ünïcödé ☕ Café"));
        assert_eq!(extract(xml, "dc:creator").as_deref(), Some("Beyoncé"));
    }

    #[test]
    fn extract_skips_self_closing_tags_with_attributes() {
        let xml = r#"<res protocolInfo="x-rincon:*"/>ignored</res><res a="b">kept</res >"#;
        assert_eq!(extract(xml, "res").as_deref(), Some("kept"));
    }

    #[test]
    fn repeated_lookups_reuse_the_compiled_pattern() {
        let xml = "<RelTime>0:01:02</RelTime>";
        for _ in 0..3 {
            assert_eq!(xml.tag("RelTime").as_deref(), Some("0:01:02"));
        }
        assert!(patterns().iter().any(|entry| entry.key().contains("RelTime")));
    }

    #[test]
    fn extract_missing_or_unterminated_is_none() {
        assert_eq!(extract("<a>1</a>", "b"), None);
        assert_eq!(extract("<a>1", "a"), None);
        assert_eq!(extract("<a>1</a>", ""), None);
    }

    #[test]
    fn empty_value_is_present_but_not_nonempty() {
        let xml = "<CurrentURI></CurrentURI>";
        assert_eq!(xml.tag("CurrentURI").as_deref(), Some(""));
        assert_eq!(xml.tag_nonempty("CurrentURI"), None);
    }

    #[test]
    fn int_coercion_falls_back_to_default() {
        let xml = "<CurrentVolume>42</CurrentVolume><CurrentBass>x</CurrentBass>";
        assert_eq!(xml.tag_int::<u8>("CurrentVolume", 0), 42);
        assert_eq!(xml.tag_int::<i8>("CurrentBass", -1), -1);
        assert_eq!(xml.tag_int::<u32>("Missing", 7), 7);
    }

    #[test]
    fn bool_coercion_accepts_common_truthy_words() {
        for truthy in ["1", "true", "TRUE", "On", "yes"] {
            assert!(parse_bool(truthy), "{truthy} should be true");
        }
        for falsy in ["0", "false", "off", "no", ""] {
            assert!(!parse_bool(falsy), "{falsy} should be false");
        }
        assert!("<Mute>1</Mute>".tag_bool("mute", false));
        assert!("<x/>".tag_bool("mute", true));
    }

    #[test]
    fn attr_lookup_reads_first_matching_tag() {
        let didl = r#"<item><res protocolInfo="http-get:*:audio/mpeg:*" Duration='0:03:45'>x</res></item>"#;
        assert_eq!(extract_attr(didl, "res", "duration").as_deref(), Some("0:03:45"));
        assert_eq!(
            extract_attr(didl, "RES", "protocolInfo").as_deref(),
            Some("http-get:*:audio/mpeg:*")
        );
        assert_eq!(extract_attr(didl, "res", "info"), None);
        assert_eq!(extract_attr(didl, "item", "duration"), None);
    }

    #[test]
    fn unescape_decodes_markup_entities() {
        assert_eq!(
            unescape("&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&lt;/a&gt;"),
            "<a href=\"x\">Tom & Jerry</a>"
        );
    }
}
