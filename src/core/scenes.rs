//! Scene splitting: story text to illustration-sized units.

/// Split a story into at most `desired` scenes.
///
/// Paragraph boundaries are newlines; blank paragraphs are dropped. A story
/// with fewer paragraphs than `desired` yields all of them. Selection is
/// first-N in original order; no reordering by length, relevance, or any
/// other heuristic.
pub fn split_scenes(story: &str, desired: usize) -> Vec<String> {
    story
        .lines()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .take(desired)
        .map(str::to_owned)
        .collect()
}

/// All non-empty paragraphs of a story, in order.
///
/// The renderer displays the whole story; scenes are only the illustrated
/// subset of these.
pub fn paragraphs(story: &str) -> Vec<String> {
    story
        .lines()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_owned)
        .collect()
}
