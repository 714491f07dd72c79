//! Static description of the features the UI offers. Only the parts the
//! orchestration layer needs: capability, input requirements, style presets
//! and the ID photo option tables.

use crate::request::Capability;

#[derive(Debug)]
pub struct StylePreset {
    pub id: &'static str,
    pub name: &'static str,
    pub prompt: &'static str,
}

#[derive(Debug)]
pub struct Feature {
    pub id: &'static str,
    pub capability: Capability,
    pub requires_input_media: bool,
    pub requires_user_text: bool,
    pub styles: &'static [StylePreset],
}

/// `(id, literal background clause)`
pub const ID_PHOTO_BACKGROUNDS: &[(&str, &str)] = &[
    ("white", "white"),
    ("blue", "standard ID photo blue"),
    ("red", "standard ID photo red"),
];

/// `(id, literal size clause)`
pub const ID_PHOTO_SIZES: &[(&str, &str)] = &[
    ("1inch", "Standard 1 inch ID photo size (25mm x 35mm), aspect ratio 5:7"),
    ("2inch", "Standard 2 inch ID photo size (35mm x 49mm), aspect ratio 5:7"),
    ("small1inch", "Small 1 inch ID photo size (22mm x 32mm), aspect ratio 11:16"),
    ("large1inch", "Large 1 inch ID photo size (33mm x 48mm), aspect ratio 11:16"),
];

const TXT2IMG_STYLES: &[StylePreset] = &[
    StylePreset {
        id: "photorealistic",
        name: "写实摄影",
        prompt: "Photorealistic, 8k, highly detailed, cinematic lighting",
    },
    StylePreset {
        id: "anime",
        name: "二次元",
        prompt: "Anime style, vibrant colors, clean lines, Makoto Shinkai style",
    },
    StylePreset {
        id: "cyberpunk",
        name: "赛博朋克",
        prompt: "Cyberpunk, neon lights, futuristic city, sci-fi",
    },
    StylePreset {
        id: "watercolor",
        name: "水彩画",
        prompt: "Watercolor painting, soft edges, artistic, dreamy",
    },
    StylePreset {
        id: "oil",
        name: "油画",
        prompt: "Oil painting, thick brushstrokes, textured, classical",
    },
];

const STYLIZE_STYLES: &[StylePreset] = &[
    StylePreset {
        id: "3d",
        name: "3D 迪士尼",
        prompt: "Turn this into a 3D Pixar style character. Cute, big eyes, soft studio lighting, 3d render, high detail.",
    },
    StylePreset {
        id: "anime",
        name: "日系动漫",
        prompt: "Turn this into a Japanese Anime style illustration. Vibrant colors, clean lines, Makoto Shinkai style, high quality.",
    },
    StylePreset {
        id: "clay",
        name: "粘土风",
        prompt: "Turn this into a cute Claymation style, plasticine texture, soft rounded edges, stop-motion look.",
    },
    StylePreset {
        id: "sketch",
        name: "素描手绘",
        prompt: "Turn this into a pencil sketch drawing. Black and white, rough lines, artistic shading, graphite texture.",
    },
    StylePreset {
        id: "pixel",
        name: "像素艺术",
        prompt: "Turn this into a Pixel Art style portrait. Retro game aesthetic, 16-bit, vibrant colors.",
    },
];

const VID_ENHANCE_STYLES: &[StylePreset] = &[
    StylePreset {
        id: "general",
        name: "通用增强",
        prompt: "High fidelity, 1080p resolution, cinematic lighting, sharp details, smooth motion. Enhance the quality of this visual.",
    },
    StylePreset {
        id: "landscape",
        name: "风景增强",
        prompt: "Cinematic landscape video, 4k resolution, boost vibrancy, clear sky, sharp foliage details, remove haze, wide angle majestic view.",
    },
    StylePreset {
        id: "face",
        name: "人脸增强",
        prompt: "High-end portrait video, sharp focus on eyes and face, realistic skin texture, professional studio lighting, remove blur, restore facial details.",
    },
    StylePreset {
        id: "film",
        name: "电影修复",
        prompt: "Restored vintage film footage, remove grain and noise, stabilize camera shake, color correction, technicolor, 4k remaster quality.",
    },
];

const fn feature(
    id: &'static str,
    capability: Capability,
    requires_input_media: bool,
    requires_user_text: bool,
    styles: &'static [StylePreset],
) -> Feature {
    Feature {
        id,
        capability,
        requires_input_media,
        requires_user_text,
        styles,
    }
}

pub const FEATURES: &[Feature] = &[
    feature("txt2img", Capability::Image, false, true, TXT2IMG_STYLES),
    feature("face-restore", Capability::Image, true, false, &[]),
    feature("upscale", Capability::Image, true, false, &[]),
    feature("stylize", Capability::Image, true, false, STYLIZE_STYLES),
    feature("cutout", Capability::Image, true, false, &[]),
    feature("colorize", Capability::Image, true, false, &[]),
    feature("beauty", Capability::Image, true, false, &[]),
    feature("id-photo", Capability::Image, true, false, &[]),
    feature("txt2vid", Capability::Video, false, true, &[]),
    feature("img2vid", Capability::Video, true, false, &[]),
    feature("img2talk", Capability::Video, true, true, &[]),
    feature("img2sing", Capability::Video, true, true, &[]),
    feature("vid-enhance", Capability::Video, true, false, VID_ENHANCE_STYLES),
    feature("assistant", Capability::Chat, false, false, &[]),
    feature("prompt-optimize", Capability::Chat, false, true, &[]),
];

pub fn find_feature(id: &str) -> Option<&'static Feature> {
    FEATURES.iter().find(|f| f.id == id)
}

/// Prompt text of a style preset, for callers that hold a style id.
pub fn style_prompt(feature_id: &str, style_id: &str) -> Option<&'static str> {
    find_feature(feature_id)?
        .styles
        .iter()
        .find(|s| s.id == style_id)
        .map(|s| s.prompt)
}

/// Resolve a catalog id to its literal clause; unknown values pass through.
pub(crate) fn resolve_option<'a>(table: &[(&str, &'static str)], value: &'a str) -> &'a str {
    table
        .iter()
        .find(|(id, _)| *id == value)
        .map(|(_, literal)| *literal)
        .unwrap_or(value)
}
