//! URL plausibility predicates shared by the classifier and every strategy.

use tracing::debug;

const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".webm", ".mov", ".m4v", ".avi", ".mkv"];
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp", ".gif"];
/// Content images never come as GIF.
const CONTENT_IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];

const VIDEO_CDN_MARKERS: &[&str] = &["video.fbcdn.net", "scontent-video", "video.xx.fbcdn.net", "video-"];
const PRIMARY_CDN: &str = "cdninstagram.com";
const SECONDARY_CDNS: &[&str] = &["fbcdn.net", "scontent"];
const TRUSTED_HOSTS: &[&str] = &["threads.net", "fbcdn.net", "scontent"];
const VIDEO_KEYWORDS: &[&str] = &["video", "playable", "stream", "media", ".mp4", ".webm", ".mov"];

pub(crate) const CONTENT_CDNS: &[&str] = &["cdninstagram.com", "fbcdn.net", "scontent"];
const UI_ASSET_KEYWORDS: &[&str] = &[
    "profile",
    "avatar",
    "logo",
    "icon",
    "badge",
    "button",
    "default",
    "safe_image",
];

fn contains_any(url: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| url.contains(n))
}

pub(crate) fn has_video_extension(url: &str) -> bool {
    contains_any(url, VIDEO_EXTENSIONS)
}

pub(crate) fn has_image_extension(url: &str) -> bool {
    contains_any(url, CONTENT_IMAGE_EXTENSIONS)
}

pub(crate) fn is_content_cdn(url: &str) -> bool {
    contains_any(url, CONTENT_CDNS)
}

/// Avatars, badges, icons and other page chrome served from the same CDNs.
pub(crate) fn is_ui_asset(url: &str) -> bool {
    contains_any(url, UI_ASSET_KEYWORDS)
}

/// Whether `url` plausibly points at a playable video.
pub fn is_video_candidate(url: &str) -> bool {
    if url.is_empty() || contains_any(url, IMAGE_EXTENSIONS) {
        return false;
    }

    if has_video_extension(url) {
        debug!(url, "video candidate by extension");
        return true;
    }

    if contains_any(url, VIDEO_CDN_MARKERS) {
        debug!(url, "video candidate by video CDN host");
        return true;
    }

    if url.contains(PRIMARY_CDN) {
        debug!(url, "video candidate by primary CDN");
        return true;
    }

    if contains_any(url, SECONDARY_CDNS) && url.contains("video") {
        debug!(url, "video candidate by secondary CDN");
        return true;
    }

    if contains_any(url, TRUSTED_HOSTS) {
        if let Some(keyword) = VIDEO_KEYWORDS.iter().find(|k| url.contains(*k)) {
            debug!(url, keyword, "video candidate by keyword");
            return true;
        }
    }

    debug!(url, "rejected as video");
    false
}

/// Whether `url` plausibly points at a content image rather than UI chrome.
pub fn is_image_candidate(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    if contains_any(url, &[".mp4", ".webm", ".mov", "video"]) || has_video_extension(url) {
        return false;
    }

    if !is_content_cdn(url) || !has_image_extension(url) {
        return false;
    }

    !is_ui_asset(url)
}

/// Image candidate that the video predicate would never accept.
pub fn is_strict_image_candidate(url: &str) -> bool {
    is_image_candidate(url) && !is_video_candidate(url)
}

/// Rank an image URL; higher is better, zero means "not an image".
pub fn score_image(url: &str) -> u32 {
    if !is_image_candidate(url) {
        return 0;
    }

    let mut score = 50;

    if url.contains("1080x1080") {
        score += 50;
    } else if url.contains("720x720") {
        score += 30;
    } else if url.contains("640x640") {
        score += 20;
    }

    if url.contains("full_res") || url.contains("original") {
        score += 25;
    }

    score
}

/// Undo the JSON string escapes the embedded state uses inside URLs.
pub fn unescape_url(raw: &str) -> String {
    raw.replace("\\u0026", "&").replace("\\/", "/")
}
