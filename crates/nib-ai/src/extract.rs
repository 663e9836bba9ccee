//! Fenced code-block extraction from assistant text

use crate::types::CodeBlock;

/// Scanner state: outside a fence, or inside one collecting lines.
enum State {
    Outside,
    Inside {
        language: Option<String>,
        lines: Vec<String>,
    },
}

/// Extract fenced code regions in source order.
///
/// An opening fence is a line that is exactly three backticks optionally
/// followed immediately (no space) by a language tag; a closing fence is
/// a line of exactly three backticks. Regions do not nest, text outside
/// any fence is ignored, and a region with no closing fence before the
/// text ends is discarded.
pub fn code_blocks(text: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut state = State::Outside;

    for line in text.lines() {
        state = match state {
            State::Outside => match fence_language(line) {
                Some(language) => State::Inside {
                    language,
                    lines: Vec::new(),
                },
                None => State::Outside,
            },
            State::Inside {
                language,
                mut lines,
            } => {
                if line == "```" {
                    blocks.push(CodeBlock {
                        language,
                        code: lines.join("\n"),
                    });
                    State::Outside
                } else {
                    lines.push(line.to_string());
                    State::Inside { language, lines }
                }
            }
        };
    }

    // An unterminated fence never makes it into `blocks`.
    blocks
}

/// If `line` opens a fence, return its language tag (`None` for a bare
/// fence). Returns `None` when the line is not an opening fence at all.
fn fence_language(line: &str) -> Option<Option<String>> {
    let rest = line.strip_prefix("```")?;
    if rest.is_empty() {
        return Some(None);
    }
    // The tag must follow the backticks immediately and be a single token.
    if rest.starts_with(char::is_whitespace) || rest.contains('`') {
        return None;
    }
    Some(Some(rest.to_string()))
}
