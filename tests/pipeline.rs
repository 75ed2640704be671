use std::thread;
use std::time::Duration;
use tget_lib::browser::{PageElement, RenderedPage, SnapshotPage};
use tget_lib::config::TimeoutConfig;
use tget_lib::extractor::{
    extract_metadata, normalize_url, Classifier, ExtractError, MediaType, Pipeline, StrategyChain,
    StrategyKind,
};

const POST: &str = "https://www.threads.net/@alice/post/Cabc123";

#[test]
fn test_mobile_url_with_query_is_canonicalized() {
    assert_eq!(
        normalize_url("https://m.threads.com/@bob/post/XyZ?utm=1").unwrap(),
        "https://www.threads.net/@bob/post/XyZ"
    );
}

#[test]
fn test_foreign_domain_rejected_before_page_work() {
    let html = r#"<video src="https://video.fbcdn.net/x.mp4"></video>"#;
    let err = Pipeline::default()
        .extract_markup("https://evil.com/@a/post/1", html)
        .unwrap_err();
    assert!(matches!(err, ExtractError::UntrustedDomain(_)));
    assert!(err.to_string().contains("threads.com or threads.net"));
}

#[test]
fn test_video_element_page() {
    let html = r#"<html><body><video src="https://video.fbcdn.net/x.mp4"></video></body></html>"#;
    let result = Pipeline::default().extract_markup(POST, html).unwrap();
    assert_eq!(result.media_type, MediaType::Video);
    assert_eq!(result.media_url, "https://video.fbcdn.net/x.mp4");
}

#[test]
fn test_embedded_state_with_metadata() {
    let html = r#"<html><head><title>Clip | Threads</title></head><body><script>
        {"browser_native_hd_url":"https:\/\/video.xx.fbcdn.net\/v\/hd.mp4?x=1&y=2","playable_duration_in_ms":30000}
    </script></body></html>"#;
    let result = Pipeline::default().extract_markup(POST, html).unwrap();

    assert_eq!(result.media_type, MediaType::Video);
    assert_eq!(result.media_url, "https://video.xx.fbcdn.net/v/hd.mp4?x=1&y=2");
    assert_eq!(result.duration, Some(30));
    assert_eq!(result.title.as_deref(), Some("Clip"));
    assert_eq!(
        result.qualities.get("browser_hd").map(String::as_str),
        Some("https://video.xx.fbcdn.net/v/hd.mp4?x=1&y=2")
    );

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["mediaType"], "video");
    assert_eq!(json["duration"], 30);
    assert_eq!(json["videoUrls"]["browser_hd"], "https://video.xx.fbcdn.net/v/hd.mp4?x=1&y=2");
}

#[test]
fn test_image_post_via_meta_tag() {
    let html = r#"<html><head>
        <meta property="og:image" content="https://scontent.cdninstagram.com/v/t51/12345_1080x1080_n.jpg">
    </head><body></body></html>"#;
    let pipeline = Pipeline::new(
        Classifier::new(Duration::from_secs(1)),
        StrategyChain::from_kinds(&[StrategyKind::MetaTags], &TimeoutConfig::default()),
    );
    let result = pipeline.extract_markup(POST, html).unwrap();
    assert_eq!(result.media_type, MediaType::Image);
    assert_eq!(
        result.media_url,
        "https://scontent.cdninstagram.com/v/t51/12345_1080x1080_n.jpg"
    );
}

#[test]
fn test_cdn_ui_assets_are_not_post_media() {
    for html in [
        r#"<img src="https://static.cdninstagram.com/rsrc.php/v3/badge_icon.png">"#,
        r#"<img src="https://scontent.cdninstagram.com/v/t51/default_avatar.jpg">"#,
        r#"<img src="https://external.fbcdn.net/safe_image.php?url=x">"#,
        r#"<img src="https://static.cdninstagram.com/rsrc.php/v3/button_sprite.png">"#,
    ] {
        let err = Pipeline::default().extract_markup(POST, html).unwrap_err();
        assert!(matches!(err, ExtractError::NoMediaFound), "{html}");
    }
}

#[test]
fn test_only_profile_picture_yields_no_media() {
    let html = r#"<html><body>
        <img src="https://scontent.cdninstagram.com/v/t51/profile_pic_s150x150.jpg">
    </body></html>"#;
    let err = Pipeline::default().extract_markup(POST, html).unwrap_err();
    assert!(matches!(err, ExtractError::NoMediaFound));
    assert_eq!(
        err.to_string(),
        "Threads extraction failed - unable to find media URLs in page source"
    );
}

#[test]
fn test_earlier_strategy_wins_deterministically() {
    let html = r#"<html><body>
        <video src="https://video.fbcdn.net/from-element.mp4"></video>
        <script>{"video_url":"https:\/\/video.fbcdn.net\/from-state.mp4"}</script>
    </body></html>"#;
    let pipeline = Pipeline::default();
    let first = pipeline.extract_markup(POST, html).unwrap();
    let second = pipeline.extract_markup(POST, html).unwrap();
    assert_eq!(first.media_url, "https://video.fbcdn.net/from-element.mp4");
    assert_eq!(first, second);
}

#[test]
fn test_configured_chain_order() {
    let timeouts = TimeoutConfig::default();
    let pipeline = Pipeline::new(
        Classifier::new(Duration::from_secs(1)),
        StrategyChain::from_kinds(&[StrategyKind::Source, StrategyKind::Dom], &timeouts),
    );
    assert_eq!(pipeline.strategy_names(), vec!["source", "dom"]);

    let html = r#"<html><body>
        <video src="https://video.fbcdn.net/from-element.mp4"></video>
        <script>{"video_url":"https:\/\/video.fbcdn.net\/from-state.mp4"}</script>
    </body></html>"#;
    let result = pipeline.run(&SnapshotPage::new(html)).unwrap();
    assert_eq!(result.media_url, "https://video.fbcdn.net/from-state.mp4");
}

#[test]
fn test_metadata_fields_are_independent() {
    let meta = extract_metadata(r#"{"video_id":"9876","sd_src":"https:\/\/video.fbcdn.net\/sd.mp4"}"#);
    assert_eq!(meta.id.as_deref(), Some("9876"));
    assert_eq!(meta.duration, None);
    assert_eq!(meta.title, None);
    assert_eq!(
        meta.qualities.get("sd_src").map(String::as_str),
        Some("https://video.fbcdn.net/sd.mp4")
    );
}

/// Markup that only becomes readable after a delay.
struct SlowMarkupPage;

impl RenderedPage for SlowMarkupPage {
    fn query_all(&self, _selector: &str) -> Vec<Box<dyn PageElement + '_>> {
        Vec::new()
    }

    fn wait_for(&self, _selector: &str, _timeout: Duration) -> bool {
        false
    }

    fn markup(&self) -> Option<String> {
        thread::sleep(Duration::from_millis(50));
        Some(r#"{"video_url":"https:\/\/video.fbcdn.net\/late.mp4"}"#.to_string())
    }
}

#[test]
fn test_markup_strategy_deadline_from_config() {
    let expired = TimeoutConfig {
        markup_strategy_ms: 0,
        ..TimeoutConfig::default()
    };
    let chain = StrategyChain::from_kinds(&[StrategyKind::Source], &expired);
    assert!(chain.run(&SlowMarkupPage, MediaType::Video).is_none());

    let chain = StrategyChain::from_kinds(&[StrategyKind::Source], &TimeoutConfig::default());
    let result = chain.run(&SlowMarkupPage, MediaType::Video).unwrap();
    assert_eq!(result.media_url, "https://video.fbcdn.net/late.mp4");
}
