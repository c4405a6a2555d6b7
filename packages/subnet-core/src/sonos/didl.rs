//! DIDL-Lite metadata: parsing what the speaker reports and formatting what
//! we send with `SetAVTransportURI`.

use crate::sonos::tags::{extract_attr, unescape, Tags};
use crate::sonos::types::TrackInfo;
use crate::sonos::utils::{escape_xml, parse_duration};

/// Marker Sonos uses for fields it does not support.
const NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";

/// URI fragments that identify a live stream rather than a queue track.
const STREAM_URI_MARKERS: &[&str] = &[
    "http",
    "x-rincon-mp3radio",
    "x-sonosapi-stream",
    "x-sonosapi-radio",
    "x-sonosapi-hls",
    "aac:",
];

/// Fields pulled from a `TrackMetaData` DIDL-Lite document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DidlMetadata {
    pub title: Option<String>,
    pub creator: Option<String>,
    pub album: Option<String>,
    pub album_art_uri: Option<String>,
    pub stream_content: Option<String>,
    pub radio_show: Option<String>,
    pub duration_secs: Option<u32>,
}

impl DidlMetadata {
    /// Parses an already-unescaped DIDL-Lite document.
    ///
    /// Field values are entity-decoded (`Tom &amp; Jerry` → `Tom & Jerry`).
    #[must_use]
    pub fn parse(didl: &str) -> Self {
        let field = |tag: &str| {
            didl.tag_nonempty(tag)
                .map(|v| unescape(&v).into_owned())
                .filter(|v| v != NOT_IMPLEMENTED)
        };

        Self {
            title: field("dc:title"),
            creator: field("dc:creator"),
            album: field("upnp:album"),
            album_art_uri: field("upnp:albumArtURI")
                .or_else(|| field("upnp:icon"))
                .or_else(|| field("albumArtURI")),
            stream_content: field("r:streamContent"),
            radio_show: field("r:radioShowMd").map(|show| strip_programme_id(&show)),
            duration_secs: extract_attr(didl, "res", "duration")
                .map(|d| parse_duration(&d))
                .filter(|d| *d > 0),
        }
    }
}

/// `"Morning Show,p123456"` → `"Morning Show"`.
fn strip_programme_id(show: &str) -> String {
    match show.rsplit_once(',') {
        Some((name, id))
            if id.len() > 1
                && id.starts_with('p')
                && id[1..].chars().all(|c| c.is_ascii_digit()) =>
        {
            name.trim().to_string()
        }
        _ => show.to_string(),
    }
}

/// True when the content URI points at a live stream.
#[must_use]
pub fn is_stream_uri(uri: &str) -> bool {
    let lower = uri.to_ascii_lowercase();
    STREAM_URI_MARKERS.iter().any(|m| lower.contains(m))
}

/// Builds [`TrackInfo`] from a `GetPositionInfo` response body.
///
/// Live streams often carry no `dc:title`; for those the title falls back to
/// the stream content and the artist to the radio show. An empty fallback
/// leaves the field absent; the raw URI never becomes a title.
#[must_use]
pub fn track_from_position_info(response: &str) -> TrackInfo {
    let uri = response
        .tag_nonempty("TrackURI")
        .map(|u| unescape(&u).into_owned());

    let metadata = response
        .tag_nonempty("TrackMetaData")
        .filter(|m| m != NOT_IMPLEMENTED)
        .map(|m| DidlMetadata::parse(&unescape(&m)))
        .unwrap_or_default();

    let mut title = metadata.title.clone();
    let mut artist = metadata.creator.clone();

    if title.is_none() && uri.as_deref().is_some_and(is_stream_uri) {
        title = response
            .tag_nonempty("StreamContent")
            .map(|v| unescape(&v).into_owned())
            .or_else(|| metadata.stream_content.clone());
        if artist.is_none() {
            artist = metadata.radio_show.clone();
        }
    }

    let duration = Some(parse_duration(
        &response.tag("TrackDuration").unwrap_or_default(),
    ))
    .filter(|d| *d > 0)
    .or(metadata.duration_secs);

    TrackInfo {
        title,
        artist,
        album: metadata.album,
        album_art_uri: metadata.album_art_uri,
        duration_secs: duration,
        position_secs: response.tag("RelTime").map(|t| parse_duration(&t)),
        number: response.tag("Track").and_then(|t| t.parse().ok()),
        uri,
    }
}

/// Formats the DIDL-Lite item sent alongside a plain URI.
///
/// The result is raw XML; the SOAP layer escapes it when it becomes the
/// `CurrentURIMetaData` argument.
#[must_use]
pub fn format_didl_lite(uri: &str, title: Option<&str>) -> String {
    let title = title.filter(|t| !t.is_empty()).unwrap_or("Audio Stream");

    let mut didl = String::from(
        r#"<DIDL-Lite xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/" xmlns:r="urn:schemas-rinconnetworks-com:metadata-1-0/" xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/">"#,
    );
    didl.push_str(r#"<item id="1" parentID="0" restricted="1">"#);
    didl.push_str(&format!("<dc:title>{}</dc:title>", escape_xml(title)));
    didl.push_str("<upnp:class>object.item.audioItem.musicTrack</upnp:class>");
    didl.push_str(&format!(
        r#"<res protocolInfo="http-get:*:audio/mpeg:*">{}</res>"#,
        escape_xml(uri)
    ));
    didl.push_str("</item>");
    didl.push_str("</DIDL-Lite>");

    didl
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_response(uri: &str, metadata: &str, extra: &str) -> String {
        format!(
            "<s:Envelope><s:Body><u:GetPositionInfoResponse><Track>3</Track><TrackDuration>0:04:10</TrackDuration><TrackMetaData>{}</TrackMetaData><TrackURI>{}</TrackURI><RelTime>0:01:05</RelTime>{}</u:GetPositionInfoResponse></s:Body></s:Envelope>",
            escape_xml(metadata),
            escape_xml(uri),
            extra
        )
    }

    #[test]
    fn queue_track_reads_structured_metadata() {
        let didl = r#"<DIDL-Lite><item><res duration="0:04:10">x</res><upnp:albumArtURI>/getaa?s=1&amp;u=abc</upnp:albumArtURI><dc:title>Tom &amp; Jerry</dc:title><dc:creator>Band</dc:creator><upnp:album>Record</upnp:album></item></DIDL-Lite>"#;
        let track = track_from_position_info(&position_response(
            "x-file-cifs://nas/a.flac",
            didl,
            "",
        ));

        assert_eq!(track.title.as_deref(), Some("Tom & Jerry"));
        assert_eq!(track.artist.as_deref(), Some("Band"));
        assert_eq!(track.album.as_deref(), Some("Record"));
        assert_eq!(track.album_art_uri.as_deref(), Some("/getaa?s=1&u=abc"));
        assert_eq!(track.duration_secs, Some(250));
        assert_eq!(track.position_secs, Some(65));
        assert_eq!(track.number, Some(3));
        assert_eq!(track.uri.as_deref(), Some("x-file-cifs://nas/a.flac"));
    }

    #[test]
    fn stream_without_title_falls_back_to_stream_content_and_show() {
        let didl = r#"<DIDL-Lite><item><r:streamContent>Artist - Song</r:streamContent><r:radioShowMd>Morning Show,p123456</r:radioShowMd></item></DIDL-Lite>"#;
        let track = track_from_position_info(&position_response(
            "x-sonosapi-stream:s1234?sid=254",
            didl,
            "",
        ));

        assert_eq!(track.title.as_deref(), Some("Artist - Song"));
        assert_eq!(track.artist.as_deref(), Some("Morning Show"));
    }

    #[test]
    fn stream_content_in_response_wins_over_metadata() {
        let didl = r#"<DIDL-Lite><item><r:streamContent>From metadata</r:streamContent></item></DIDL-Lite>"#;
        let track = track_from_position_info(&position_response(
            "x-rincon-mp3radio://radio.example/live",
            didl,
            "<StreamContent>From response</StreamContent>",
        ));

        assert_eq!(track.title.as_deref(), Some("From response"));
    }

    #[test]
    fn empty_stream_fallback_leaves_title_absent() {
        let track = track_from_position_info(&position_response(
            "http://radio.example/live.mp3",
            "<DIDL-Lite><item><r:streamContent></r:streamContent></item></DIDL-Lite>",
            "",
        ));

        assert_eq!(track.title, None);
        assert_eq!(track.artist, None);
        assert_eq!(track.uri.as_deref(), Some("http://radio.example/live.mp3"));
    }

    #[test]
    fn non_stream_never_uses_stream_fallback() {
        let didl = r#"<DIDL-Lite><item><r:streamContent>ignored</r:streamContent></item></DIDL-Lite>"#;
        let track =
            track_from_position_info(&position_response("x-rincon-queue:RINCON_1#0", didl, ""));
        assert_eq!(track.title, None);
    }

    #[test]
    fn not_implemented_metadata_is_ignored() {
        let response = "<Track>0</Track><TrackDuration>NOT_IMPLEMENTED</TrackDuration><TrackMetaData>NOT_IMPLEMENTED</TrackMetaData><TrackURI></TrackURI><RelTime>NOT_IMPLEMENTED</RelTime>";
        let track = track_from_position_info(response);
        assert_eq!(track.title, None);
        assert_eq!(track.uri, None);
        assert_eq!(track.duration_secs, None);
        assert_eq!(track.position_secs, Some(0));
    }

    #[test]
    fn album_art_falls_back_to_icon() {
        let meta = DidlMetadata::parse("<item><upnp:icon>/icon.png</upnp:icon></item>");
        assert_eq!(meta.album_art_uri.as_deref(), Some("/icon.png"));
    }

    #[test]
    fn formatted_didl_escapes_uri_and_title() {
        let didl = format_didl_lite("http://host/a.mp3?x=1&y=2", Some("A <B>"));
        assert!(didl.contains("<dc:title>A &lt;B&gt;</dc:title>"));
        assert!(didl.contains(">http://host/a.mp3?x=1&amp;y=2</res>"));
        assert!(format_didl_lite("u", None).contains("<dc:title>Audio Stream</dc:title>"));
    }

    #[test]
    fn stream_detection() {
        assert!(is_stream_uri("x-sonosapi-hls:abc"));
        assert!(is_stream_uri("aac://radio"));
        assert!(!is_stream_uri("x-rincon-queue:RINCON_1#0"));
        assert!(!is_stream_uri("x-file-cifs://nas/a.flac"));
    }
}
