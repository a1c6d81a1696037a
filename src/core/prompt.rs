//! Prompt construction for the text and image backends.
//!
//! These are fixed templates carrying style and mood directives; the
//! interpolation is configuration, not logic. All builders are pure; the
//! one exception is [`compress_scene`], which round-trips through the text
//! backend.

use crate::adapters::TextBackend;
use crate::error::BackendError;

/// Build the prompt that asks the text backend for the story itself.
pub fn build_story_prompt(
    dream: &str,
    core_elements: &[String],
    target_words: u32,
    scene_count: usize,
) -> String {
    format!(
        "\
You are a fantasy storyteller for children and adults.

Write a short story (~{target_words} words) inspired by:
- Dream: {dream}
- Core elements: {elements}

Requirements:
- 2nd grade level English, emotionally warm; avoid scary or dark themes.
- Use magical settings, funny characters, and surreal logic.
- End with a gentle interpretive insight.
- Include {scene_count} clear scene beats suitable for illustration.
",
        elements = core_elements.join(", "),
    )
}

/// Build the image prompt for one scene.
///
/// Pure and deterministic; calling it twice on the same input yields the
/// same prompt.
pub fn build_image_prompt(scene_text: &str, style_hint: &str) -> String {
    format!(
        "\
Illustration of a whimsical fantasy scene.
Focus: {scene_text}
Style: {style_hint}
Mood: warm, curious, not dark
Palette: soft twilight pastels, cozy tones
Composition: clear focal subject, readable for children
"
    )
}

/// The prompt used by [`compress_scene`].
fn compression_prompt(scene_text: &str) -> String {
    format!(
        "\
Rewrite the following scene as a short, vivid description suitable for a \
storybook illustration.
Limit to 40 words.
Emphasize the main characters, setting, and what they are doing.
Use emotionally warm language that evokes visual clarity.
Scene: {scene_text}
Summary:"
    )
}

/// Compress a scene into a short vivid description via the text backend.
///
/// Optional preprocessing before prompt building; when the pipeline skips
/// it, the raw scene text goes into the image prompt directly.
pub async fn compress_scene(
    backend: &dyn TextBackend,
    scene_text: &str,
) -> Result<String, BackendError> {
    let summary = backend.generate(&compression_prompt(scene_text)).await?;
    Ok(summary.trim().to_owned())
}
