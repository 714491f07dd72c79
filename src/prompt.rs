//! Feature templates. Every function here is pure: the same inputs always
//! produce the same prompt, and the output carries no provider-specific syntax.

use crate::catalog::{ID_PHOTO_BACKGROUNDS, ID_PHOTO_SIZES, resolve_option};
use crate::request::{StructuredOptions, non_blank};

/// Used for unknown feature ids so a catalog mismatch never blocks generation.
pub const FALLBACK_PROMPT: &str = "Generate an enhanced, high-quality version of this media.";

pub const DEFAULT_VIDEO_PROMPT: &str = "High quality video.";

const DEFAULT_TXT2IMG_SUBJECT: &str = "A beautiful landscape";

const DEFAULT_STYLIZE_PROMPT: &str = "Generate a 3D Pixar style character portrait based on the person in the input image. Cute, big eyes, soft studio lighting, 3d render, vibrant colors.";

const DEFAULT_ENHANCE_PROMPT: &str = "High fidelity, 1080p resolution, cinematic lighting, sharp details, smooth motion. Enhance the quality of this visual.";

pub const ASSISTANT_SYSTEM_PROMPT: &str = "你是一位专业的摄影师和图像处理专家。你的任务是帮助用户优化AI绘画的提示词（Prompts），或者提供关于摄影构图、光影、后期修图的专业建议。请用简洁、友好的中文回答。";

pub const PROMPT_OPTIMIZER_SYSTEM_PROMPT: &str = "You are an expert AI Prompt Engineer. Translate the user's input to English if needed, and expand it into a detailed prompt suitable for high-quality generation. Return ONLY the raw prompt text.";

/// Build the instruction for an image or video feature.
///
/// `style_prompt_override` replaces the feature's built-in style text where the
/// feature has one (`stylize`, `vid-enhance`) and is appended for `txt2img`.
/// Features without a style slot ignore it.
pub fn build_prompt(
    feature_id: &str,
    style_prompt_override: Option<&str>,
    user_text: Option<&str>,
    options: &StructuredOptions,
) -> String {
    let style = non_blank(style_prompt_override);
    let text = non_blank(user_text);

    match feature_id {
        "txt2img" => {
            let subject = text.unwrap_or(DEFAULT_TXT2IMG_SUBJECT);
            let mut prompt =
                format!("Generate a high-quality image based on this description: \"{subject}\".");
            if let Some(style) = style {
                prompt.push_str(&format!(" Style: {style}."));
            }
            prompt
        }
        "face-restore" => "Generate a high-quality, sharp, and crystal clear portrait based on the input image. Reconstruct facial details, remove blur, and improve skin texture while maintaining the original identity. Photorealistic quality.".to_string(),
        "upscale" => "Generate a high-resolution, sharp, and detailed version of this image. Increase clarity, refine textures, and reduce noise while strictly maintaining the original composition and content. 4k resolution.".to_string(),
        "cutout" => "Generate an image of the main subject from the input image, but place it on a clean pure white background. The subject should be perfectly isolated (cutout) with sharp edges. Product photography style.".to_string(),
        "stylize" => style.unwrap_or(DEFAULT_STYLIZE_PROMPT).to_string(),
        "colorize" => "Generate a natural color version of this black and white photo. Accurately colorize the skin tones, clothing, and background environment based on the visual context.".to_string(),
        "beauty" => "Generate a professional beauty portrait based on the input image. Smooth skin naturally, enhance lighting, and apply subtle professional makeup look. Magazine cover quality.".to_string(),
        "id-photo" => id_photo_prompt(options),
        "txt2vid" | "img2vid" => text.unwrap_or(DEFAULT_VIDEO_PROMPT).to_string(),
        "img2talk" => with_suffix(
            "A close-up, high-quality video of this person talking expressively. Natural lip movements, eye contact, and head gestures.",
            text,
        ),
        "img2sing" => with_suffix(
            "A music video style shot of this person singing emotionally. Dynamic lighting, expressive facial movements, syncing with imaginary music.",
            text,
        ),
        "vid-enhance" => {
            let base = style.unwrap_or(DEFAULT_ENHANCE_PROMPT);
            match text {
                Some(text) => format!("{base} Content: {text}"),
                None => base.to_string(),
            }
        }
        _ => FALLBACK_PROMPT.to_string(),
    }
}

/// System prompt for a chat feature.
pub fn system_instruction(feature_id: &str) -> &'static str {
    match feature_id {
        "prompt-optimize" => PROMPT_OPTIMIZER_SYSTEM_PROMPT,
        _ => ASSISTANT_SYSTEM_PROMPT,
    }
}

fn id_photo_prompt(options: &StructuredOptions) -> String {
    let background = non_blank(options.background_color.as_deref())
        .map(|bg| resolve_option(ID_PHOTO_BACKGROUNDS, bg))
        .unwrap_or("white");
    let size = non_blank(options.target_size.as_deref())
        .map(|s| format!(", {}", resolve_option(ID_PHOTO_SIZES, s)))
        .unwrap_or_default();

    format!(
        "Generate a professional ID photo based on the person in this image. Crop to a standard headshot composition{size}. Use a clean {background} background. Ensure even, professional lighting and formal appearance."
    )
}

fn with_suffix(frame: &str, text: Option<&str>) -> String {
    match text {
        Some(text) => format!("{frame} {text}"),
        None => frame.to_string(),
    }
}
