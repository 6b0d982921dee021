//! Prompt assembly for the two executors.
//!
//! The structured executor sees the ranked element list rendered as
//! indexed lines; the vision executor sees only the goals and the
//! attached screenshot. Both are told the verb grammar in the system
//! prompt.

use stride_snapshot::Element;
use stride_verify::VerifyContext;

const MAX_ELEMENT_TEXT_CHARS: usize = 80;

/// System prompt for the structured executor.
pub fn structured_system_prompt() -> String {
    "You drive a web browser one action at a time.\n\
     You are given the current task, the step goal and the interactive \
     elements extracted from the page, each prefixed with its id.\n\
     Reply with exactly one action and nothing else:\n\
     CLICK(<element id>) to click an element from the list\n\
     TYPE(\"<text>\") to type into the focused element\n\
     PRESS(<key>) to press a key such as Enter\n\
     FINISH when the step goal is already met"
        .to_string()
}

/// System prompt for the vision executor.
pub fn vision_system_prompt() -> String {
    "You drive a web browser one action at a time.\n\
     You are given the current task, the step goal and a screenshot of \
     the page.\n\
     Reply with exactly one action and nothing else:\n\
     CLICK_XY(<x>, <y>) to click at viewport coordinates\n\
     TYPE(\"<text>\") to type into the focused element\n\
     PRESS(<key>) to press a key such as Enter\n\
     FINISH when the step goal is already met"
        .to_string()
}

/// User prompt for the structured executor.
pub fn structured_prompt(task_goal: &str, step_goal: &str, context: Option<&VerifyContext>) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!("Task: {task_goal}\n"));
    prompt.push_str(&format!("Current step: {step_goal}\n"));

    match context {
        Some(ctx) => {
            prompt.push_str(&format!("Page: {}\n\n", ctx.url()));
            // Occluded and offscreen elements stay listed; their markers
            // carry the visibility state. Only inert roles are dropped.
            let operable: Vec<&Element> = ctx
                .elements()
                .iter()
                .filter(|e| e.has_actionable_role())
                .collect();
            if operable.is_empty() {
                prompt.push_str("No interactive elements were extracted from this page.\n");
            } else {
                prompt.push_str("Interactive elements:\n");
                for element in operable {
                    prompt.push_str(&element_line(element));
                    prompt.push('\n');
                }
            }
        }
        None => {
            prompt.push_str("Page: unknown (no snapshot is available)\n");
        }
    }

    prompt.push_str("\nReply with exactly one action.");
    prompt
}

/// User prompt for the vision executor.
pub fn vision_prompt(task_goal: &str, step_goal: &str) -> String {
    format!(
        "Task: {task_goal}\n\
         Current step: {step_goal}\n\
         A screenshot of the current page is attached.\n\
         \n\
         Reply with exactly one action."
    )
}

fn element_line(element: &Element) -> String {
    let mut line = format!(
        "[{}]<{}> {:?} (importance {:.2})",
        element.id,
        element.role,
        truncated(&element.text),
        element.importance
    );
    if !element.in_viewport {
        line.push_str(" [offscreen]");
    }
    if element.is_occluded {
        line.push_str(" [occluded]");
    }
    line
}

fn truncated(text: &str) -> String {
    if text.chars().count() <= MAX_ELEMENT_TEXT_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_ELEMENT_TEXT_CHARS).collect();
        format!("{head}…")
    }
}
