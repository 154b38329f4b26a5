//! Input parsing: role tokens from the "users" text, verb and outcome from
//! the goal.
//!
//! Both parsers are total. Any string yields a result; no validation happens
//! here.

/// Verb used when the goal contains no words.
pub const DEFAULT_VERB: &str = "accomplish";

/// Verb and outcome phrase extracted from a goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalParts {
    pub verb: String,
    pub outcome: String,
}

/// Normalized generator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInput {
    /// Role tokens in order of appearance. Duplicates are kept.
    pub roles: Vec<String>,
    pub verb: String,
    pub outcome: String,
}

/// Parse both free-text fields at once.
pub fn parse_input(goal: &str, users: &str) -> ParsedInput {
    let GoalParts { verb, outcome } = parse_goal(goal);
    ParsedInput {
        roles: parse_roles(users),
        verb,
        outcome,
    }
}

/// Split a users string into lower-cased role tokens.
///
/// Delimiters are `,`, `;`, and the word "and" in any case when it stands
/// alone between ASCII word boundaries ("sand" and "Andrew" are not split).
/// Tokens are trimmed and empty tokens dropped.
pub fn parse_roles(users: &str) -> Vec<String> {
    split_role_text(users)
        .into_iter()
        .map(|token| token.trim().to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Split a goal into its first word (lower-cased) and the rest.
///
/// With no words the verb is [`DEFAULT_VERB`]. With a single word the
/// outcome is the original goal text unchanged.
pub fn parse_goal(goal: &str) -> GoalParts {
    let mut words = goal.split_whitespace();
    let verb = words
        .next()
        .map(str::to_lowercase)
        .unwrap_or_else(|| DEFAULT_VERB.to_string());
    let rest: Vec<&str> = words.collect();
    let outcome = if rest.is_empty() {
        goal.to_string()
    } else {
        rest.join(" ")
    };
    GoalParts { verb, outcome }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Raw pieces between delimiters, untrimmed.
///
/// Works on bytes: every delimiter is ASCII, and ASCII bytes never occur
/// inside a multi-byte UTF-8 sequence, so each split index is a char
/// boundary.
fn split_role_text(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b',' || b == b';' {
            pieces.push(&text[start..i]);
            i += 1;
            start = i;
            continue;
        }
        if is_standalone_and(bytes, i) {
            pieces.push(&text[start..i]);
            i += 3;
            start = i;
            continue;
        }
        i += 1;
    }
    pieces.push(&text[start..]);
    pieces
}

fn is_standalone_and(bytes: &[u8], i: usize) -> bool {
    let Some(candidate) = bytes.get(i..i + 3) else {
        return false;
    };
    if !candidate.eq_ignore_ascii_case(b"and") {
        return false;
    }
    let boundary_before = i == 0 || !is_word_byte(bytes[i - 1]);
    let boundary_after = bytes.get(i + 3).is_none_or(|&b| !is_word_byte(b));
    boundary_before && boundary_after
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
