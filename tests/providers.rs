//! Tests for provider request builders, response parsers and HTTP error
//! classification.

use mirage::dispatch::http::{AuthScheme, classify_failure};
use mirage::dispatch::registry::{CredentialSource, PROFILES, profile};
use mirage::dispatch::{JobStatus, VideoJob};
use mirage::error::GenerationError;
use mirage::providers::gemini::{GeminiImage, GeminiVideo};
use mirage::providers::siliconflow::SiliconFlowImage;
use mirage::providers::zhipu::{TEXT_ONLY_VIDEO_NOTE, ZhipuImage, ZhipuVideo};
use mirage::request::{AspectRatio, Capability, Credential, InputMedia, ProviderId};
use mirage::response::MimeClass;
use reqwest::StatusCode;

fn client() -> reqwest::Client {
    mirage::dispatch::http::build_client()
}

fn png() -> InputMedia {
    InputMedia::new(vec![0x89, b'P', b'N', b'G'], "image/png")
}

// ---------------------------------------------------------------------------
// Gemini image
// ---------------------------------------------------------------------------

#[test]
fn gemini_image_url_and_body() {
    let adapter = GeminiImage::new(
        client(),
        "https://generativelanguage.googleapis.com/v1beta/",
        "gemini-2.5-flash-image",
    );
    assert_eq!(
        adapter.url(),
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-image:generateContent"
    );

    let media = png();
    let body = GeminiImage::build_request_body("restore this photo", Some(&media));
    let parts = body["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
    assert_eq!(parts[0]["inlineData"]["data"], "iVBORw==");
    assert_eq!(parts[1]["text"], "restore this photo");

    let text_only = GeminiImage::build_request_body("a fox", None);
    assert_eq!(text_only["contents"][0]["parts"].as_array().unwrap().len(), 1);
}

#[test]
fn gemini_image_inline_data_becomes_data_url() {
    let body = br#"{"candidates":[{"content":{"parts":[
        {"text":"Here you go"},
        {"inlineData":{"mimeType":"image/png","data":"AAAA"}}
    ]},"finishReason":"STOP"}]}"#;
    let media = GeminiImage::parse_response(body).unwrap();
    assert_eq!(media.url, "data:image/png;base64,AAAA");
    assert_eq!(media.mime_class, MimeClass::Image);
}

#[test]
fn gemini_image_text_only_is_unexpected_shape() {
    let body = br#"{"candidates":[{"content":{"parts":[{"text":"I cannot edit photos of people."}]}}]}"#;
    match GeminiImage::parse_response(body) {
        Err(GenerationError::UnexpectedResponseShape { provider, message }) => {
            assert_eq!(provider, ProviderId::Gemini);
            assert!(message.contains("I cannot edit photos of people."));
        }
        other => panic!("expected UnexpectedResponseShape, got {other:?}"),
    }
}

#[test]
fn gemini_image_safety_blocks_are_content_policy() {
    let finish = br#"{"candidates":[{"finishReason":"IMAGE_SAFETY"}]}"#;
    assert!(matches!(
        GeminiImage::parse_response(finish),
        Err(GenerationError::ContentPolicy { .. })
    ));

    let prompt = br#"{"candidates":[],"promptFeedback":{"blockReason":"PROHIBITED_CONTENT"}}"#;
    assert!(matches!(
        GeminiImage::parse_response(prompt),
        Err(GenerationError::ContentPolicy { .. })
    ));
}

#[test]
fn gemini_image_empty_candidates_and_garbage() {
    assert!(matches!(
        GeminiImage::parse_response(br#"{"candidates":[]}"#),
        Err(GenerationError::UnexpectedResponseShape { .. })
    ));
    assert!(matches!(
        GeminiImage::parse_response(b"<html>502</html>"),
        Err(GenerationError::SchemaParse(_))
    ));
}

// ---------------------------------------------------------------------------
// Gemini video
// ---------------------------------------------------------------------------

#[test]
fn gemini_video_urls() {
    let adapter = GeminiVideo::new(
        client(),
        "https://generativelanguage.googleapis.com/v1beta",
        "veo-3.1-fast-generate-preview",
    );
    assert_eq!(
        adapter.submit_url(),
        "https://generativelanguage.googleapis.com/v1beta/models/veo-3.1-fast-generate-preview:predictLongRunning"
    );
    assert_eq!(
        adapter.status_url("models/veo/operations/abc"),
        "https://generativelanguage.googleapis.com/v1beta/models/veo/operations/abc"
    );
}

#[test]
fn gemini_video_body_carries_image_and_resolution() {
    let media = png();
    let job = VideoJob {
        feature_id: "img2vid",
        prompt: "make it move".to_string(),
        input_media: Some(&media),
        aspect_ratio: AspectRatio::Portrait,
    };
    let body = GeminiVideo::build_submit_body(&job);
    assert_eq!(body["instances"][0]["prompt"], "make it move");
    assert_eq!(body["instances"][0]["image"]["bytesBase64Encoded"], "iVBORw==");
    assert_eq!(body["instances"][0]["image"]["mimeType"], "image/png");
    assert_eq!(body["parameters"]["aspectRatio"], "9:16");
    assert_eq!(body["parameters"]["resolution"], "720p");
    assert_eq!(body["parameters"]["sampleCount"], 1);

    let enhance = VideoJob {
        feature_id: "vid-enhance",
        ..job
    };
    assert_eq!(GeminiVideo::resolution(&enhance), "1080p");

    let text_only = VideoJob {
        feature_id: "txt2vid",
        prompt: "waves".to_string(),
        input_media: None,
        aspect_ratio: AspectRatio::Landscape,
    };
    let body = GeminiVideo::build_submit_body(&text_only);
    assert!(body["instances"][0].get("image").is_none());
    assert_eq!(body["parameters"]["resolution"], "1080p");
    assert_eq!(body["parameters"]["aspectRatio"], "16:9");
}

#[test]
fn gemini_video_submit_and_status_parsing() {
    assert_eq!(
        GeminiVideo::parse_submit_response(br#"{"name":"models/veo/operations/op1"}"#).unwrap(),
        "models/veo/operations/op1"
    );
    assert!(matches!(
        GeminiVideo::parse_submit_response(b"{}"),
        Err(GenerationError::SchemaParse(_))
    ));

    assert_eq!(
        GeminiVideo::parse_status_response(br#"{"name":"op1"}"#).unwrap(),
        JobStatus::Running
    );
    assert_eq!(
        GeminiVideo::parse_status_response(
            br#"{"done":true,"response":{"generateVideoResponse":{"generatedSamples":[{"video":{"uri":"https://files.example/v.mp4"}}]}}}"#
        )
        .unwrap(),
        JobStatus::Succeeded(Some("https://files.example/v.mp4".to_string()))
    );
    assert_eq!(
        GeminiVideo::parse_status_response(br#"{"done":true,"error":{"code":3,"message":"bad prompt"}}"#)
            .unwrap(),
        JobStatus::Failed("bad prompt".to_string())
    );
    match GeminiVideo::parse_status_response(
        br#"{"done":true,"response":{"generateVideoResponse":{"raiMediaFilteredReasons":["celebrity"]}}}"#,
    ) {
        Err(GenerationError::ContentPolicy { provider, message }) => {
            assert_eq!(provider, ProviderId::Gemini);
            assert_eq!(message, "celebrity");
        }
        other => panic!("expected ContentPolicy, got {other:?}"),
    }
    assert_eq!(
        GeminiVideo::parse_status_response(br#"{"done":true,"response":{}}"#).unwrap(),
        JobStatus::Succeeded(None)
    );
}

// ---------------------------------------------------------------------------
// Zhipu
// ---------------------------------------------------------------------------

#[test]
fn zhipu_image_body_and_parse() {
    let adapter = ZhipuImage::new(client(), "https://open.bigmodel.cn/api/paas/v4", "cogview-3-plus");
    let body = adapter.build_request_body("a red lantern");
    assert_eq!(body["model"], "cogview-3-plus");
    assert_eq!(body["prompt"], "a red lantern");
    assert_eq!(body["size"], "1024x1024");

    let media = ZhipuImage::parse_response(br#"{"created":1,"data":[{"url":"https://z.example/i.png"}]}"#)
        .unwrap();
    assert_eq!(media.url, "https://z.example/i.png");
    assert!(matches!(
        ZhipuImage::parse_response(br#"{"data":[]}"#),
        Err(GenerationError::UnexpectedResponseShape { .. })
    ));
}

#[test]
fn zhipu_video_body_appends_note_when_image_dropped() {
    let adapter = ZhipuVideo::new(client(), "https://open.bigmodel.cn/api/paas/v4/", "cogvideox");
    assert_eq!(
        adapter.submit_url(),
        "https://open.bigmodel.cn/api/paas/v4/videos/generations"
    );
    assert_eq!(
        adapter.status_url("task-9"),
        "https://open.bigmodel.cn/api/paas/v4/async-result/task-9"
    );

    let media = png();
    let job = VideoJob {
        feature_id: "img2vid",
        prompt: "a dancing cat".to_string(),
        input_media: Some(&media),
        aspect_ratio: AspectRatio::Portrait,
    };
    let body = adapter.build_submit_body(&job);
    assert_eq!(body["prompt"], format!("a dancing cat{TEXT_ONLY_VIDEO_NOTE}"));
    assert_eq!(body["size"], "1080x1920");
    assert_eq!(body["with_audio"], true);
    assert_eq!(body["fps"], 30);
    assert!(body.get("image_url").is_none());

    let text_only = VideoJob {
        input_media: None,
        ..job
    };
    assert_eq!(adapter.build_submit_body(&text_only)["prompt"], "a dancing cat");
}

#[test]
fn zhipu_status_mapping() {
    assert_eq!(
        ZhipuVideo::parse_submit_response(br#"{"id":"task-9","task_status":"PROCESSING"}"#).unwrap(),
        "task-9"
    );
    assert_eq!(
        ZhipuVideo::parse_status_response(br#"{"task_status":"PROCESSING"}"#).unwrap(),
        JobStatus::Running
    );
    assert_eq!(
        ZhipuVideo::parse_status_response(
            br#"{"task_status":"SUCCESS","video_result":[{"url":"https://z.example/v.mp4","cover_image_url":"c"}]}"#
        )
        .unwrap(),
        JobStatus::Succeeded(Some("https://z.example/v.mp4".to_string()))
    );
    assert_eq!(
        ZhipuVideo::parse_status_response(br#"{"task_status":"SUCCESS","video_result":[]}"#).unwrap(),
        JobStatus::Succeeded(None)
    );

    let fail = br#"{"task_status":"FAIL","error":"sensitive"}"#;
    assert_eq!(
        ZhipuVideo::parse_status_response(fail).unwrap(),
        JobStatus::Failed(String::from_utf8_lossy(fail).into_owned())
    );
    assert_eq!(
        ZhipuVideo::parse_status_response(br#"{"task_status":"QUEUED"}"#).unwrap(),
        JobStatus::Pending
    );
    assert!(matches!(
        ZhipuVideo::parse_status_response(b"{}"),
        Err(GenerationError::SchemaParse(_))
    ));
}

// ---------------------------------------------------------------------------
// SiliconFlow
// ---------------------------------------------------------------------------

#[test]
fn siliconflow_body_and_both_response_shapes() {
    let adapter = SiliconFlowImage::new(client(), "https://api.siliconflow.cn/v1", "Kwai-Kolors/Kolors");
    let body = adapter.build_request_body("ink wash mountains");
    assert_eq!(body["model"], "Kwai-Kolors/Kolors");
    assert_eq!(body["image_size"], "1024x1024");
    assert_eq!(body["num_inference_steps"], 25);

    let images = SiliconFlowImage::parse_response(br#"{"images":[{"url":"https://sf.example/a.png"}]}"#)
        .unwrap();
    assert_eq!(images.url, "https://sf.example/a.png");

    let data = SiliconFlowImage::parse_response(br#"{"data":[{"url":"https://sf.example/b.png"}]}"#)
        .unwrap();
    assert_eq!(data.url, "https://sf.example/b.png");

    assert!(matches!(
        SiliconFlowImage::parse_response(br#"{"images":[{"url":""}]}"#),
        Err(GenerationError::UnexpectedResponseShape { .. })
    ));
}

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

#[test]
fn classify_auth_and_rate_limit() {
    let err = classify_failure(
        ProviderId::Deepseek,
        StatusCode::UNAUTHORIZED,
        br#"{"error":{"message":"Authentication Fails, Your api key is invalid"}}"#,
    );
    assert!(matches!(err, GenerationError::Auth { provider: ProviderId::Deepseek, .. }));

    let err = classify_failure(ProviderId::Gemini, StatusCode::FORBIDDEN, b"");
    assert!(matches!(err, GenerationError::Auth { .. }));

    let err = classify_failure(ProviderId::Moonshot, StatusCode::TOO_MANY_REQUESTS, b"{}");
    assert!(matches!(err, GenerationError::RateLimited { provider: ProviderId::Moonshot }));
    assert!(err.is_retryable());
}

#[test]
fn classify_zhipu_balance_and_policy_codes() {
    let balance = classify_failure(
        ProviderId::Zhipu,
        StatusCode::TOO_MANY_REQUESTS,
        r#"{"error":{"code":"1113","message":"余额不足或无可用资源包,请充值。"}}"#.as_bytes(),
    );
    assert!(matches!(balance, GenerationError::InsufficientBalance { .. }));

    let balance_by_message = classify_failure(
        ProviderId::Zhipu,
        StatusCode::BAD_REQUEST,
        r#"{"message":"账户余额不足"}"#.as_bytes(),
    );
    assert!(matches!(balance_by_message, GenerationError::InsufficientBalance { .. }));

    let policy = classify_failure(
        ProviderId::Zhipu,
        StatusCode::BAD_REQUEST,
        br#"{"error":{"code":"1301","message":"unsafe content"}}"#,
    );
    match policy {
        GenerationError::ContentPolicy { message, .. } => assert_eq!(message, "unsafe content"),
        other => panic!("expected ContentPolicy, got {other:?}"),
    }
}

#[test]
fn classify_upstream_keeps_status_and_truncates() {
    let long = "x".repeat(1_000);
    let body = format!(r#"{{"message":"{long}","code":50000}}"#);
    let err = classify_failure(ProviderId::SiliconFlow, StatusCode::BAD_GATEWAY, body.as_bytes());
    match &err {
        GenerationError::Upstream { status, message, .. } => {
            assert_eq!(*status, Some(502));
            assert!(message.len() < 300);
        }
        other => panic!("expected Upstream, got {other:?}"),
    }
    assert!(err.is_retryable());

    let client_err = classify_failure(ProviderId::Gemini, StatusCode::BAD_REQUEST, b"not json");
    match &client_err {
        GenerationError::Upstream { status, message, .. } => {
            assert_eq!(*status, Some(400));
            assert!(message.contains("Bad Request"));
        }
        other => panic!("expected Upstream, got {other:?}"),
    }
    assert!(!client_err.is_retryable());
}

#[test]
fn user_messages_do_not_leak_details() {
    let err = GenerationError::Upstream {
        provider: ProviderId::Zhipu,
        message: "500: internal trace at https://internal.example/".to_string(),
        status: Some(500),
    };
    let msg = err.user_message();
    assert!(!msg.contains("internal.example"));
    assert!(msg.contains("Zhipu AI"));
}

// ---------------------------------------------------------------------------
// Provider profiles
// ---------------------------------------------------------------------------

#[test]
fn profiles_cover_every_provider() {
    for id in ProviderId::ALL {
        assert_eq!(profile(id).id, id);
    }
    assert_eq!(PROFILES.len(), ProviderId::ALL.len());
}

#[test]
fn profile_capabilities_match_provider_matrix() {
    assert_eq!(profile(ProviderId::Deepseek).capabilities(), vec![Capability::Chat]);
    assert_eq!(profile(ProviderId::Moonshot).capabilities(), vec![Capability::Chat]);
    assert_eq!(
        profile(ProviderId::Zhipu).capabilities(),
        vec![Capability::Chat, Capability::Image, Capability::Video]
    );
    assert_eq!(profile(ProviderId::SiliconFlow).capabilities(), vec![Capability::Image]);
    assert_eq!(
        profile(ProviderId::Gemini).capabilities(),
        vec![Capability::Image, Capability::Video]
    );

    assert!(profile(ProviderId::Gemini).supports_image_input(Capability::Image));
    assert!(!profile(ProviderId::Zhipu).supports_image_input(Capability::Image));
    assert!(!profile(ProviderId::SiliconFlow).supports_image_input(Capability::Image));
    assert_eq!(profile(ProviderId::Gemini).credential, CredentialSource::Ambient);
    assert_eq!(profile(ProviderId::Deepseek).credential, CredentialSource::PerRequest);
}

#[test]
fn auth_scheme_headers() {
    let key = Credential::new("secret");
    assert_eq!(
        AuthScheme::Bearer.header(&key),
        ("Authorization".to_string(), "Bearer secret".to_string())
    );
    assert_eq!(
        AuthScheme::GoogApiKey.header(&key),
        ("x-goog-api-key".to_string(), "secret".to_string())
    );
    assert_eq!(format!("{key:?}"), "Credential([REDACTED])");
}
