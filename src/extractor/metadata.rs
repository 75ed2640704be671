use super::types::VideoMetadata;
use super::validate::unescape_url;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
enum Field {
    Id,
    Title,
    DurationMs,
    /// A quality-tier URL stored under its label.
    Quality,
}

struct MetadataPattern {
    label: &'static str,
    field: Field,
    regex: Regex,
}

fn pattern(label: &'static str, field: Field, re: &str) -> MetadataPattern {
    MetadataPattern {
        label,
        field,
        regex: Regex::new(re).unwrap(),
    }
}

static METADATA_PATTERNS: LazyLock<Vec<MetadataPattern>> = LazyLock::new(|| {
    vec![
        pattern("video_id", Field::Id, r#""video_id":"?(\d+)"?"#),
        pattern("title", Field::Title, r"<title>([^<]+)</title>"),
        pattern("duration", Field::DurationMs, r#""playable_duration_in_ms":(\d+)"#),
        pattern("browser_hd", Field::Quality, r#""browser_native_hd_url":"([^"]+)""#),
        pattern("browser_sd", Field::Quality, r#""browser_native_sd_url":"([^"]+)""#),
        pattern("hd_src", Field::Quality, r#""hd_src":"([^"]+)""#),
        pattern("sd_src", Field::Quality, r#""sd_src":"([^"]+)""#),
        pattern("playable_url", Field::Quality, r#""playable_url":"([^"]+)""#),
        pattern("dash_manifest", Field::Quality, r#""video_dash_manifest":"([^"]+)""#),
    ]
});

const SITE_MARKERS: &[&str] = &[" | Facebook", " - Facebook"];
const TITLE_SUFFIXES: &[&str] = &[" | Threads", " • Threads"];

/// Recover auxiliary video fields from raw page markup.
///
/// Every field is independent: a missing match leaves only that field empty.
pub fn extract_metadata(html: &str) -> VideoMetadata {
    let mut meta = VideoMetadata::default();

    for p in METADATA_PATTERNS.iter() {
        let Some(value) = p.regex.captures(html).and_then(|c| c.get(1)) else {
            continue;
        };
        let value = value.as_str();

        match p.field {
            Field::Id => {
                meta.id = Some(value.to_string());
                meta.extra.insert(p.label.into(), value.to_string());
            }
            Field::Title => {
                let title = clean_title(value);
                if title.is_empty() {
                    continue;
                }
                meta.extra.insert(p.label.into(), title.clone());
                meta.title = Some(title);
            }
            Field::DurationMs => {
                let Ok(ms) = value.parse::<u64>() else {
                    continue;
                };
                let secs = ms / 1000;
                meta.duration = Some(secs);
                meta.extra.insert(p.label.into(), format!("{} seconds", secs));
            }
            Field::Quality => {
                meta.qualities.insert(p.label.into(), unescape_url(value));
            }
        }
        debug!(field = p.label, "Extracted metadata field");
    }

    meta
}

/// Facebook markers are removed wherever they appear; Threads ones only
/// when trailing.
fn clean_title(raw: &str) -> String {
    let mut title = raw.to_string();
    for marker in SITE_MARKERS {
        title = title.replace(marker, "");
    }
    let mut title = title.trim();
    for suffix in TITLE_SUFFIXES {
        if let Some(stripped) = title.strip_suffix(suffix) {
            title = stripped.trim_end();
        }
    }
    title.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_metadata() {
        let html = r#"<html><head><title> Alice (@alice) on Threads | Threads </title></head>
            <script>{"video_id":"123456","playable_duration_in_ms":30999,
            "browser_native_hd_url":"https:\/\/video.xx.fbcdn.net\/v\/hd.mp4?a=1&b=2",
            "browser_native_sd_url":"https:\/\/video.xx.fbcdn.net\/v\/sd.mp4",
            "video_dash_manifest":"https:\/\/video.xx.fbcdn.net\/v\/manifest.mpd"}</script></html>"#;

        let meta = extract_metadata(html);
        assert_eq!(meta.id.as_deref(), Some("123456"));
        assert_eq!(meta.title.as_deref(), Some("Alice (@alice) on Threads"));
        assert_eq!(meta.duration, Some(30));
        assert_eq!(
            meta.qualities.get("browser_hd").map(String::as_str),
            Some("https://video.xx.fbcdn.net/v/hd.mp4?a=1&b=2")
        );
        assert_eq!(
            meta.qualities.get("browser_sd").map(String::as_str),
            Some("https://video.xx.fbcdn.net/v/sd.mp4")
        );
        assert!(meta.qualities.contains_key("dash_manifest"));
        assert_eq!(meta.extra.get("duration").map(String::as_str), Some("30 seconds"));
        assert_eq!(meta.extra.get("video_id").map(String::as_str), Some("123456"));
    }

    #[test]
    fn test_duration_only() {
        let meta = extract_metadata(r#"{"playable_duration_in_ms":1999}"#);
        assert_eq!(meta.duration, Some(1));
        assert!(meta.id.is_none());
        assert!(meta.title.is_none());
        assert!(meta.qualities.is_empty());
        assert_eq!(meta.extra.len(), 1);
    }

    #[test]
    fn test_empty_markup() {
        assert_eq!(extract_metadata(""), VideoMetadata::default());
    }

    #[test]
    fn test_title_suffixes() {
        assert_eq!(clean_title("Cat video | Facebook"), "Cat video");
        assert_eq!(clean_title("  Cat video - Facebook  "), "Cat video");
        assert_eq!(clean_title("Plain"), "Plain");
        assert_eq!(clean_title("Cat video | Facebook (2024)"), "Cat video (2024)");
        assert_eq!(clean_title("Reel - Facebook | Watch"), "Reel | Watch");
    }
}
