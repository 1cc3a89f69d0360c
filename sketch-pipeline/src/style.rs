//! Built-in art style catalog.

use crate::error::{PipelineError, PipelineResult};

/// A named art style the transformer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StylePreset {
    /// Stable key sent by clients.
    pub key: &'static str,
    /// Display label.
    pub label: &'static str,
    /// Directive handed to the image transformer.
    pub description: &'static str,
}

/// All built-in styles.
pub const STYLE_PRESETS: &[StylePreset] = &[
    StylePreset {
        key: "photorealistic",
        label: "Photorealistic",
        description: "a photorealistic rendering with natural lighting, realistic textures and depth of field",
    },
    StylePreset {
        key: "anime",
        label: "Anime",
        description: "a vibrant anime illustration with clean line art, cel shading and expressive colors",
    },
    StylePreset {
        key: "watercolor",
        label: "Watercolor",
        description: "a soft watercolor painting with loose washes, visible paper grain and gentle color bleeding",
    },
    StylePreset {
        key: "oil-painting",
        label: "Oil Painting",
        description: "a classical oil painting with rich impasto brushwork and warm, layered tones",
    },
    StylePreset {
        key: "pixel-art",
        label: "Pixel Art",
        description: "retro 16-bit pixel art with a limited palette and crisp pixel edges",
    },
    StylePreset {
        key: "3d-render",
        label: "3D Render",
        description: "a polished 3D render with soft global illumination and smooth materials",
    },
    StylePreset {
        key: "sketch",
        label: "Pencil Sketch",
        description: "a detailed graphite pencil sketch with cross-hatching and subtle shading",
    },
];

/// Look up a built-in style by key (case-insensitive).
#[must_use]
pub fn find_style(key: &str) -> Option<&'static StylePreset> {
    let key = key.trim();
    STYLE_PRESETS
        .iter()
        .find(|preset| preset.key.eq_ignore_ascii_case(key))
}

/// Resolve the directive for a transform.
///
/// An explicit, non-blank description wins; otherwise the key must name a
/// built-in style.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] for an unknown key without a
/// description.
pub fn resolve_style(key: &str, description: Option<&str>) -> PipelineResult<String> {
    if let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) {
        return Ok(description.to_string());
    }
    find_style(key)
        .map(|preset| preset.description.to_string())
        .ok_or_else(|| PipelineError::InvalidInput(format!("unknown style '{}'", key.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_unique() {
        for (i, a) in STYLE_PRESETS.iter().enumerate() {
            for b in &STYLE_PRESETS[i + 1..] {
                assert_ne!(a.key, b.key);
            }
        }
    }

    #[test]
    fn test_explicit_description_wins() {
        let resolved = resolve_style("anime", Some("  neon cyberpunk  ")).expect("resolve");
        assert_eq!(resolved, "neon cyberpunk");
    }

    #[test]
    fn test_catalog_lookup() {
        let resolved = resolve_style("Watercolor", None).expect("resolve");
        assert!(resolved.contains("watercolor"));

        // Blank description falls through to the catalog
        let resolved = resolve_style("pixel-art", Some("   ")).expect("resolve");
        assert!(resolved.contains("pixel art"));
    }

    #[test]
    fn test_unknown_style_rejected() {
        let err = resolve_style("claymation", None).expect_err("unknown");
        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert!(err.to_string().contains("claymation"));
    }
}
