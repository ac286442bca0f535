//! Prompt construction for kind handlers
//!
//! Create prompts describe the kind's output contract; update prompts
//! additionally embed the artifact's current content as system-level
//! context so the source regenerates with the prior state in mind.

use crate::document::ArtifactKind;

/// System instruction for creating a new artifact of a kind
pub(crate) fn create_system(kind: ArtifactKind) -> String {
    match kind {
        ArtifactKind::Text => {
            "You are a writing assistant. Write about the given topic. \
             Markdown is supported. Use headings wherever appropriate."
                .to_string()
        }
        ArtifactKind::Code => {
            "You are a code generator. Respond with a single JSON object \
             of the form {\"code\": \"...\"} containing a complete, \
             self-contained program for the given topic. Include helpful \
             comments."
                .to_string()
        }
        ArtifactKind::Slide => {
            "You are a presentation assistant. Respond with a single JSON \
             object of the form {\"title\": \"...\", \"slides\": \
             [{\"title\": \"...\", \"content\": [\"...\"]}]} covering the \
             given topic. Keep each slide to a few short bullet lines."
                .to_string()
        }
        ArtifactKind::Chart => {
            "You are a charting assistant. Respond with a single JSON \
             object of the form {\"chart_type\": \"...\", \"title\": \
             \"...\", \"data\": ...} for the given topic."
                .to_string()
        }
    }
}

/// System instruction for updating an existing artifact
pub(crate) fn update_system(kind: ArtifactKind, current_content: &str) -> String {
    format!(
        "{}\n\nImprove the following contents of the document based on \
         the given prompt.\n\n{current_content}",
        create_system(kind)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_system_embeds_current_content() {
        let system = update_system(ArtifactKind::Text, "Gravity pulls objects.");
        assert!(system.contains("Gravity pulls objects."));
        assert!(system.contains("writing assistant"));
    }

    #[test]
    fn test_structured_prompts_request_json() {
        for kind in [ArtifactKind::Code, ArtifactKind::Slide, ArtifactKind::Chart] {
            assert!(create_system(kind).contains("JSON object"));
        }
    }
}
