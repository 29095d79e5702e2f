use super::types::{Candidate, GenerateContentResponse, PartKind};
use tracing::warn;

/// Collect the visible text of every candidate.
///
/// Structural gaps never fail: a response without candidates yields an empty
/// list and a candidate without parts yields `None`.
pub fn extract_candidate_texts(response: Option<&GenerateContentResponse>) -> Vec<Option<String>> {
    let Some(candidates) = response.and_then(|r| r.candidates.as_ref()) else {
        warn!("Gemini response does not contain candidates");
        return Vec::new();
    };

    candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| candidate_text(index, candidate.as_ref()))
        .collect()
}

fn candidate_text(index: usize, candidate: Option<&Candidate>) -> Option<String> {
    let Some(parts) = candidate
        .and_then(|c| c.content.as_ref())
        .and_then(|content| content.parts.as_ref())
    else {
        warn!(
            "Candidate {} has no content or parts (finish reason: {})",
            index,
            candidate
                .and_then(|c| c.finish_reason.as_deref())
                .unwrap_or("unknown")
        );
        return None;
    };

    let mut text = String::new();
    let mut found_text = false;
    let mut unsupported: Vec<&str> = Vec::new();

    for part in parts {
        for field in &part.unsupported_fields {
            if !unsupported.contains(&field.as_str()) {
                unsupported.push(field);
            }
        }

        if let PartKind::Text(part_text) = &part.kind {
            found_text = true;
            text.push_str(part_text);
        }
    }

    if !unsupported.is_empty() {
        warn!(
            "Candidate {} contains non-text parts {:?}; returning text parts only",
            index, unsupported
        );
    }

    found_text.then_some(text)
}
