use ql_core::core::{ReviewVerdict, Style};

pub const WRITE_PREVIEW_CHARS: usize = 3000;
pub const EDIT_PREVIEW_CHARS: usize = 2000;
pub const REVIEW_PREVIEW_CHARS: usize = 500;

/// System and user message pair sent to a chat backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
}

/// First `limit` characters of `content`, with `...` appended when cut.
pub fn preview(content: &str, limit: usize) -> String {
    match content.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_owned(),
    }
}

pub fn write_prompt(content: &str, style: &Style) -> ChatPrompt {
    ChatPrompt {
        system: "You are an expert content writer.".to_owned(),
        user: format!(
            "Rewrite the following content to be more {style}. Keep the core information but \
             improve readability and engagement.\n\nOriginal content:\n{}\n\nRewritten version:",
            preview(content, WRITE_PREVIEW_CHARS)
        ),
    }
}

pub fn edit_prompt(content: &str, review: &ReviewVerdict, human_feedback: Option<&str>) -> ChatPrompt {
    let improvements = if review.improvements_needed.is_empty() {
        "None".to_owned()
    } else {
        review.improvements_needed.join(", ")
    };

    let mut user = format!(
        "Improve the content based on the following feedback.\n\nContent:\n{}\n\n\
         Review Feedback:\n- Quality Score: {}/10\n- Improvements needed: {}\n- Reviewer notes: {}",
        preview(content, EDIT_PREVIEW_CHARS),
        review.quality_score,
        improvements,
        review.overall_feedback,
    );
    if let Some(notes) = human_feedback.filter(|n| !n.trim().is_empty()) {
        user.push_str("\n\nHuman feedback: ");
        user.push_str(notes);
    }
    user.push_str("\n\nProvide the improved version addressing all feedback:");

    ChatPrompt {
        system: "You are an expert editor.".to_owned(),
        user,
    }
}

pub fn review_prompt(original: &str, candidate: &str) -> ChatPrompt {
    ChatPrompt {
        system: "You are an expert content reviewer. You answer with a single JSON object."
            .to_owned(),
        user: format!(
            "Analyze the rewritten content.\n\nOriginal (preview): {}\n\nRewritten (preview): {}\n\n\
             Provide a JSON response with these keys:\n\
             - quality_score (1-10)\n\
             - clarity_score (1-10)\n\
             - engagement_score (1-10)\n\
             - accuracy_score (1-10)\n\
             - improvements_needed (list of strings)\n\
             - ready_for_human (boolean)\n\
             - overall_feedback (string)\n\n\
             Return ONLY the JSON object, no other text.",
            preview(original, REVIEW_PREVIEW_CHARS),
            preview(candidate, REVIEW_PREVIEW_CHARS),
        ),
    }
}
