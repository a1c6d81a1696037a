//! Storybook document rendering.
//!
//! A pure function from (story, image files, metadata) to one
//! self-contained HTML page. No state, no I/O; the corpus carries no
//! template engine, so this is plain string building.

use chrono::{DateTime, Utc};

use crate::core::scenes::paragraphs;
use crate::core::slots::assign_slots;

/// Metadata shown in the document footer.
#[derive(Debug, Clone)]
pub struct DocumentMeta<'a> {
    pub title: &'a str,
    pub text_model: &'a str,
    pub image_model: &'a str,
    /// The dream text the story was generated from
    pub dream_prompt: &'a str,
    /// The prompts the illustrations were generated from, in scene order
    pub image_prompts: &'a [String],
    pub generated_at: DateTime<Utc>,
}

const STYLESHEET: &str = "\
    body {
      font-family: \"Comic Sans MS\", \"Comic Neue\", \"Trebuchet MS\", sans-serif;
      font-size: 1.4em;
      line-height: 1.6;
      margin: 2em;
      padding: 2em;
      background: linear-gradient(to bottom right, #fffaf0, #e6f7ff);
      color: #333;
      border: 12px solid #f0e6d2;
      border-radius: 24px;
      box-shadow: 0 0 20px rgba(0,0,0,0.1);
    }
    h1 {
      text-align: center;
      font-size: 2em;
      margin-bottom: 1em;
    }
    .scene {
      margin-bottom: 3em;
    }
    .scene img {
      display: block;
      margin: 0 auto;
      width: 70%;
      border-radius: 12px;
      box-shadow: 0 4px 12px rgba(0,0,0,0.1);
    }
    .scene p {
      margin-top: 1em;
      text-align: center;
    }
    .meta {
      font-size: 0.7em;
      color: #777;
    }
    a {
      display: block;
      text-align: center;
      margin-top: 2em;
      font-size: 1em;
    }
";

/// Render the storybook: the full story with images interleaved at their
/// mapped paragraphs, followed by a metadata footer.
///
/// Image references are relative file names, so the document works from
/// inside its run directory.
pub fn render_storybook(story: &str, image_files: &[String], meta: &DocumentMeta<'_>) -> String {
    let paragraphs = paragraphs(story);
    let slots = assign_slots(paragraphs.len(), image_files.len());

    let mut html = String::with_capacity(4096);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n  <meta charset=\"UTF-8\">\n");
    html.push_str(&format!("  <title>{}</title>\n", escape_html(meta.title)));
    html.push_str("  <style>\n");
    html.push_str(STYLESHEET);
    html.push_str("  </style>\n</head>\n<body>\n");
    html.push_str(&format!("  <h1>{}</h1>\n", escape_html(meta.title)));

    for (paragraph, slot) in paragraphs.iter().zip(&slots) {
        html.push_str("  <div class='scene'>\n");
        if let Some(image_index) = slot {
            html.push_str(&format!(
                "    <img src='{}' alt='Scene {}'/>\n",
                escape_html(&image_files[*image_index]),
                image_index + 1,
            ));
        }
        html.push_str(&format!("    <p>{}</p>\n", escape_html(paragraph)));
        html.push_str("  </div>\n");
    }

    html.push_str("  <details class='meta'>\n    <summary>How this story was made</summary>\n");
    html.push_str(&format!(
        "    <p>Text model: {}<br/>Image model: {}<br/>Generated: {}</p>\n",
        escape_html(meta.text_model),
        escape_html(meta.image_model),
        meta.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
    ));
    html.push_str(&format!(
        "    <p>Dream: {}</p>\n",
        escape_html(meta.dream_prompt)
    ));
    for (i, prompt) in meta.image_prompts.iter().enumerate() {
        html.push_str(&format!(
            "    <p>Scene {} prompt: {}</p>\n",
            i + 1,
            escape_html(prompt)
        ));
    }
    html.push_str("  </details>\n");

    html.push_str("  <a href='../index.html'>Back to gallery</a>\n</body>\n</html>\n");
    html
}

/// Minimal HTML escaping for model-generated text.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
