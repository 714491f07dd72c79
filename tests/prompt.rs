//! Tests for feature prompt templates and the catalog lookups behind them.

use mirage::catalog;
use mirage::prompt::{
    ASSISTANT_SYSTEM_PROMPT, DEFAULT_VIDEO_PROMPT, FALLBACK_PROMPT, PROMPT_OPTIMIZER_SYSTEM_PROMPT,
    build_prompt, system_instruction,
};
use mirage::request::StructuredOptions;

fn no_options() -> StructuredOptions {
    StructuredOptions::default()
}

// ---------------------------------------------------------------------------
// Purity
// ---------------------------------------------------------------------------

#[test]
fn identical_inputs_yield_identical_prompts() {
    let options = StructuredOptions {
        background_color: Some("blue".to_string()),
        target_size: Some("2inch".to_string()),
        aspect_ratio: None,
    };
    for feature in catalog::FEATURES {
        let a = build_prompt(feature.id, Some("Oil painting"), Some("a cat"), &options);
        let b = build_prompt(feature.id, Some("Oil painting"), Some("a cat"), &options);
        assert_eq!(a, b, "prompt for {} is not deterministic", feature.id);
        assert!(!a.trim().is_empty(), "prompt for {} is empty", feature.id);
    }
}

// ---------------------------------------------------------------------------
// Text-to-image
// ---------------------------------------------------------------------------

#[test]
fn txt2img_quotes_user_text_and_appends_style() {
    let prompt = build_prompt("txt2img", Some("Cyberpunk, neon lights"), Some("a fox"), &no_options());
    assert_eq!(
        prompt,
        "Generate a high-quality image based on this description: \"a fox\". Style: Cyberpunk, neon lights."
    );
}

#[test]
fn txt2img_without_text_uses_default_subject() {
    let prompt = build_prompt("txt2img", None, Some("   "), &no_options());
    assert!(prompt.contains("A beautiful landscape"));
    assert!(!prompt.contains("Style:"));
}

// ---------------------------------------------------------------------------
// Style override precedence
// ---------------------------------------------------------------------------

#[test]
fn stylize_override_replaces_builtin_style() {
    let style = catalog::style_prompt("stylize", "clay").unwrap();
    let prompt = build_prompt("stylize", Some(style), None, &no_options());
    assert_eq!(prompt, style);
}

#[test]
fn stylize_without_override_uses_builtin_style() {
    let prompt = build_prompt("stylize", None, None, &no_options());
    assert!(prompt.contains("3D Pixar"));
}

#[test]
fn vid_enhance_override_and_content_suffix() {
    let prompt = build_prompt("vid-enhance", Some("Restored vintage film"), Some("a wedding"), &no_options());
    assert_eq!(prompt, "Restored vintage film Content: a wedding");

    let default = build_prompt("vid-enhance", None, None, &no_options());
    assert!(default.starts_with("High fidelity, 1080p resolution"));
    assert!(!default.contains("Content:"));
}

#[test]
fn features_without_style_slot_ignore_override() {
    let plain = build_prompt("upscale", None, None, &no_options());
    let styled = build_prompt("upscale", Some("Anime style"), None, &no_options());
    assert_eq!(plain, styled);
}

// ---------------------------------------------------------------------------
// ID photo structured options
// ---------------------------------------------------------------------------

#[test]
fn id_photo_defaults_to_white_background() {
    let prompt = build_prompt("id-photo", None, None, &no_options());
    assert!(prompt.contains("Use a clean white background."));
    assert!(prompt.contains("standard headshot composition."));
}

#[test]
fn id_photo_resolves_catalog_ids() {
    let options = StructuredOptions {
        background_color: Some("blue".to_string()),
        target_size: Some("1inch".to_string()),
        aspect_ratio: None,
    };
    let prompt = build_prompt("id-photo", None, None, &options);
    assert!(prompt.contains("Use a clean standard ID photo blue background."));
    assert!(prompt.contains(
        "composition, Standard 1 inch ID photo size (25mm x 35mm), aspect ratio 5:7."
    ));
}

#[test]
fn id_photo_uses_literal_values_verbatim() {
    let options = StructuredOptions {
        background_color: Some("light grey".to_string()),
        target_size: Some("600x800 pixels".to_string()),
        aspect_ratio: None,
    };
    let prompt = build_prompt("id-photo", None, None, &options);
    assert!(prompt.contains("Use a clean light grey background."));
    assert!(prompt.contains("composition, 600x800 pixels."));
}

// ---------------------------------------------------------------------------
// Video features
// ---------------------------------------------------------------------------

#[test]
fn talk_and_sing_frames_carry_user_text() {
    let talk = build_prompt("img2talk", None, Some("Hello everyone"), &no_options());
    assert!(talk.starts_with("A close-up, high-quality video of this person talking"));
    assert!(talk.ends_with(" Hello everyone"));

    let sing = build_prompt("img2sing", None, Some("a love song"), &no_options());
    assert!(sing.contains("singing emotionally"));
    assert!(sing.ends_with(" a love song"));
}

#[test]
fn txt2vid_falls_back_when_text_missing() {
    assert_eq!(build_prompt("txt2vid", None, None, &no_options()), DEFAULT_VIDEO_PROMPT);
    assert_eq!(
        build_prompt("txt2vid", None, Some("waves at dusk"), &no_options()),
        "waves at dusk"
    );
}

// ---------------------------------------------------------------------------
// Fallback and system prompts
// ---------------------------------------------------------------------------

#[test]
fn unknown_feature_fails_closed_to_generic_template() {
    let prompt = build_prompt("not-in-catalog", Some("style"), Some("text"), &no_options());
    assert_eq!(prompt, FALLBACK_PROMPT);
}

#[test]
fn system_instruction_per_chat_feature() {
    assert_eq!(system_instruction("prompt-optimize"), PROMPT_OPTIMIZER_SYSTEM_PROMPT);
    assert_eq!(system_instruction("assistant"), ASSISTANT_SYSTEM_PROMPT);
    assert_eq!(system_instruction("anything-else"), ASSISTANT_SYSTEM_PROMPT);
}

#[test]
fn catalog_marks_input_requirements() {
    let txt2img = catalog::find_feature("txt2img").unwrap();
    assert!(!txt2img.requires_input_media);
    assert!(txt2img.requires_user_text);

    let talk = catalog::find_feature("img2talk").unwrap();
    assert!(talk.requires_input_media && talk.requires_user_text);

    assert!(catalog::find_feature("nope").is_none());
    assert!(catalog::style_prompt("stylize", "missing").is_none());
}
