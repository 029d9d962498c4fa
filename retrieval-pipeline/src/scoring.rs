use common::types::alert::Alert;
use common::types::context::ResourceMetadata;

/// Boost granted per chunk tag matching the alert's metadata.
pub const TAG_BOOST_PER_MATCH: f32 = 0.1;
/// Upper bound on the accumulated tag boost.
pub const TAG_BOOST_CAP: f32 = 0.3;
/// Flat boost when a shape pattern matches the resource's shape.
pub const SHAPE_BOOST: f32 = 0.2;

/// Counts chunk tags that appear as a dimension key, a label key, or as a
/// case-insensitive substring of the alert title, capped at three matches
/// worth of boost.
pub fn tag_boost(tags: &[String], alert: &Alert) -> f32 {
    let title = alert.title().to_lowercase();
    let matches = tags
        .iter()
        .filter(|tag| {
            alert.dimensions().contains_key(tag.as_str())
                || alert.labels().contains_key(tag.as_str())
                || title.contains(&tag.to_lowercase())
        })
        .count();

    (matches as f32 * TAG_BOOST_PER_MATCH).min(TAG_BOOST_CAP)
}

/// 0.2 when any shape pattern applies. The literal patterns `*` and `all`
/// apply to every shape, resource metadata present or not; concrete patterns
/// need the resource's shape to match.
pub fn shape_boost(shapes: &[String], resource: Option<&ResourceMetadata>) -> f32 {
    if shapes.is_empty() {
        return 0.0;
    }

    let matches_any = shapes
        .iter()
        .any(|pattern| pattern == "*" || pattern.eq_ignore_ascii_case("all"));
    if matches_any {
        return SHAPE_BOOST;
    }

    match resource {
        Some(resource) if !resource.shape.is_empty() => {
            if shapes
                .iter()
                .any(|pattern| glob_match(pattern, &resource.shape))
            {
                SHAPE_BOOST
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Case-insensitive glob over `*` (any run) and `?` (one character),
/// anchored to the whole string.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();

    let mut p = 0;
    let mut t = 0;
    let mut star: Option<usize> = None;
    let mut star_t = 0;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            star_t = t;
            p += 1;
        } else if let Some(star_p) = star {
            // Backtrack: let the last * swallow one more character.
            p = star_p + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}
