//! Judge prompts and verdict parsing
//!
//! Two prompting protocols, both directions:
//!
//! - **Direct**: the judge answers with a fixed verdict token on the first
//!   line plus one sentence of rationale. Parsed from the first non-empty
//!   line; the negative token is excluded explicitly so a shared prefix
//!   (GENUINE vs NOT_GENUINE) cannot flip a verdict.
//! - **Reasoning**: the judge works through evidence location, category
//!   classification, grounding and context-dependence checks, then emits a
//!   final `Verdict: <TOKEN>` line. Parsed from the *last* `Verdict:`
//!   occurrence, since models restate intermediate hypotheses.
//!
//! No parseable verdict defaults to negative - absence of evidence is not
//! evidence of genuineness.

use serde::{Deserialize, Serialize};

use crate::config::JudgeProtocol;
use crate::findings::Finding;

/// Positive token for forward ("was this found?") judging
pub const FORWARD_POSITIVE: &str = "YES";
/// Negative token for forward judging
pub const FORWARD_NEGATIVE: &str = "NO";
/// Positive token for reverse ("is this genuine?") judging
pub const REVERSE_POSITIVE: &str = "GENUINE";
/// Negative token for reverse judging
pub const REVERSE_NEGATIVE: &str = "NOT_GENUINE";

/// Binary verdict plus rationale for one (finding, reference) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub is_positive: bool,
    pub rationale: String,
}

// =============================================================================
// FORWARD PROMPTS: WAS THIS EXPECTED FLAW FOUND?
// =============================================================================

const FORWARD_DIRECT_SYSTEM: &str = "\
You are evaluating whether an AI reviewer identified a known design flaw.
Answer with exactly YES or NO on the first line, followed by one sentence of reasoning.
Do not add any other text before YES or NO.";

const FORWARD_REASONING_SYSTEM: &str = "\
You are evaluating whether an AI reviewer identified a known design flaw.
Work through the steps below in order, writing out your reasoning for each,
then end your response with a single line of the form:
Verdict: YES
or
Verdict: NO

1. Locate: quote the part of the reviewer output that comes closest to the known flaw.
2. Compare: does that part convey the same core problem, even with different wording, title, or framing?
3. Decide: a match requires the same underlying problem, not merely the same topic area.";

/// Build the forward judge prompt for one expected finding
pub fn forward_prompt(expected: &Finding, reviewer_output: &str) -> String {
    format!(
        "Known flaw to check for:\n  Title: {}\n  Issue: {}\n\n\
         Reviewer output (JSONL findings):\n{}\n\n\
         Did the reviewer identify this flaw, even if using different wording or framing?\n\
         A match counts if the reviewer's output conveys the same core problem, even with a different title.",
        expected.title, expected.issue, reviewer_output
    )
}

/// System instructions for the forward direction under a protocol
pub fn forward_system(protocol: JudgeProtocol) -> &'static str {
    match protocol {
        JudgeProtocol::Direct => FORWARD_DIRECT_SYSTEM,
        JudgeProtocol::Reasoning => FORWARD_REASONING_SYSTEM,
    }
}

// =============================================================================
// REVERSE PROMPTS: IS THIS PRODUCED FINDING GENUINE?
// =============================================================================

const REVERSE_DIRECT_SYSTEM: &str = "\
You are evaluating whether an AI design reviewer's finding is genuine.

A finding is GENUINE if:
- It identifies a real problem visible in the provided document
- The problem is a design flaw, not a matter of style or implementation preference
- The claim is supported by or reasonably inferable from the document content

A finding is NOT_GENUINE if it falls into any of these false positive categories:
- Implementation detail: a coding or operational choice, not a design flaw
- Hallucinated constraint: references requirements or assumptions not present in the document
- Style preference: subjective formatting, naming, or structural preference with no design impact
- Hypothetical future concern: speculates about future requirements not relevant to the current design
- Duplicate: substantively the same flaw already identified in another finding
- Context-dependent: requires external knowledge to evaluate; cannot be assessed from the document alone

Answer with exactly GENUINE or NOT_GENUINE on the first line, followed by one sentence of reasoning.
Do not add any other text before GENUINE or NOT_GENUINE.";

const REVERSE_REASONING_SYSTEM: &str = "\
You are evaluating whether an AI design reviewer's finding is genuine.
Work through the steps below in order, writing out your reasoning for each,
then end your response with a single line of the form:
Verdict: GENUINE
or
Verdict: NOT_GENUINE

1. Evidence: quote the part of the document the finding refers to, if any.
2. Category: is the claim a design flaw, or one of: implementation detail,
   style preference, hypothetical future concern, duplicate of another finding?
3. Grounding: does the claim rely on any requirement or assumption not
   present in the document (a hallucinated constraint)?
4. Scope: does evaluating the claim require information outside the provided
   document (context-dependent)?";

/// Build the reverse judge prompt for one produced finding
pub fn reverse_prompt(finding: &Finding, document: &str) -> String {
    format!(
        "Finding to evaluate:\n  Title: {}\n  Issue: {}\n  Severity: {}\n\n\
         Source document (evaluate the finding against this document only):\n{}\n\n\
         Is this finding GENUINE or NOT_GENUINE?",
        finding.title,
        finding.issue,
        finding.severity,
        document
    )
}

/// System instructions for the reverse direction under a protocol
pub fn reverse_system(protocol: JudgeProtocol) -> &'static str {
    match protocol {
        JudgeProtocol::Direct => REVERSE_DIRECT_SYSTEM,
        JudgeProtocol::Reasoning => REVERSE_REASONING_SYSTEM,
    }
}

// =============================================================================
// VERDICT PARSING
// =============================================================================

/// Parse a forward-direction response under the given protocol
pub fn parse_forward(protocol: JudgeProtocol, response: &str) -> JudgeVerdict {
    parse_verdict(protocol, response, FORWARD_POSITIVE, FORWARD_NEGATIVE)
}

/// Parse a reverse-direction response under the given protocol
pub fn parse_reverse(protocol: JudgeProtocol, response: &str) -> JudgeVerdict {
    parse_verdict(protocol, response, REVERSE_POSITIVE, REVERSE_NEGATIVE)
}

fn parse_verdict(
    protocol: JudgeProtocol,
    response: &str,
    positive: &str,
    negative: &str,
) -> JudgeVerdict {
    let is_positive = match protocol {
        JudgeProtocol::Direct => parse_direct_token(response, positive, negative),
        JudgeProtocol::Reasoning => parse_reasoning_token(response, positive, negative),
    };
    JudgeVerdict {
        is_positive,
        rationale: response.trim().to_string(),
    }
}

/// First non-empty line, uppercased, positive-prefix with explicit
/// negative exclusion
fn parse_direct_token(response: &str, positive: &str, negative: &str) -> bool {
    let first_line = response
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .to_uppercase();
    first_line.starts_with(positive) && !first_line.starts_with(negative)
}

/// Last `Verdict:` occurrence, emphasis markers stripped
fn parse_reasoning_token(response: &str, positive: &str, negative: &str) -> bool {
    let token = response
        .lines()
        .rev()
        .find_map(extract_verdict_token);

    match token {
        Some(token) => {
            // Negative checked first so NOT_GENUINE can never read as positive
            if token.starts_with(negative) {
                false
            } else {
                token.starts_with(positive)
            }
        }
        None => {
            tracing::warn!(
                response_len = response.len(),
                "no parseable Verdict line in judge response; defaulting to negative"
            );
            false
        }
    }
}

/// Pull the token after the last `Verdict:` marker in a line, if present
fn extract_verdict_token(line: &str) -> Option<String> {
    let lower = line.to_lowercase();
    let pos = lower.rfind("verdict:")?;
    let raw = &lower[pos + "verdict:".len()..];
    let cleaned = raw
        .trim()
        .trim_matches(|c| c == '*' || c == '_' || c == '`')
        .trim();
    if cleaned.is_empty() {
        return None;
    }
    // Normalize "not genuine" spelling to the underscore token
    Some(cleaned.to_uppercase().replace(' ', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::Severity;

    fn finding() -> Finding {
        Finding {
            id: Some("cf-002".to_string()),
            title: "API key security undefined".to_string(),
            issue: "No separation between work and personal API keys specified.".to_string(),
            severity: Severity::Critical,
            confidence: None,
            reviewer: None,
        }
    }

    #[test]
    fn test_direct_yes() {
        let v = parse_forward(JudgeProtocol::Direct, "YES\nThe reviewer flagged it.");
        assert!(v.is_positive);
        assert!(v.rationale.contains("flagged"));
    }

    #[test]
    fn test_direct_no() {
        let v = parse_forward(JudgeProtocol::Direct, "NO\nNot addressed.");
        assert!(!v.is_positive);
    }

    #[test]
    fn test_direct_case_insensitive() {
        let v = parse_forward(JudgeProtocol::Direct, "yes\nFound it.");
        assert!(v.is_positive);
    }

    #[test]
    fn test_direct_leading_blank_lines() {
        let v = parse_forward(JudgeProtocol::Direct, "\n\n  YES\nOk.");
        assert!(v.is_positive);
    }

    #[test]
    fn test_direct_genuine() {
        let v = parse_reverse(JudgeProtocol::Direct, "GENUINE\nClear design gap.");
        assert!(v.is_positive);
    }

    #[test]
    fn test_direct_not_genuine_prefix_excluded() {
        let v = parse_reverse(JudgeProtocol::Direct, "NOT_GENUINE\nStyle preference.");
        assert!(!v.is_positive);
    }

    #[test]
    fn test_direct_no_parseable_verdict_fails_closed() {
        let v = parse_forward(
            JudgeProtocol::Direct,
            "I cannot determine whether this was found.",
        );
        assert!(!v.is_positive);
        assert!(v.rationale.contains("cannot determine"));
    }

    #[test]
    fn test_reasoning_parses_last_verdict_occurrence() {
        let response = "\
1. Evidence: the document never mentions key rotation.
   A first guess would be Verdict: NOT_GENUINE, but checking further.
2. Category: this is a design flaw.
3. Grounding: the claim is grounded in the document.
4. Scope: assessable from the document alone.
Verdict: GENUINE";
        let v = parse_reverse(JudgeProtocol::Reasoning, response);
        assert!(v.is_positive);
    }

    #[test]
    fn test_reasoning_strips_emphasis_markers() {
        let v = parse_reverse(JudgeProtocol::Reasoning, "Reasoning here.\n**Verdict: GENUINE**");
        assert!(v.is_positive);

        let v = parse_forward(JudgeProtocol::Reasoning, "Steps...\nVerdict: **NO**");
        assert!(!v.is_positive);
    }

    #[test]
    fn test_reasoning_not_genuine_with_space() {
        let v = parse_reverse(JudgeProtocol::Reasoning, "Analysis.\nVerdict: NOT GENUINE");
        assert!(!v.is_positive);
    }

    #[test]
    fn test_reasoning_no_verdict_line_fails_closed() {
        let v = parse_reverse(JudgeProtocol::Reasoning, "The finding seems plausible overall.");
        assert!(!v.is_positive);
        assert_eq!(v.rationale, "The finding seems plausible overall.");
    }

    #[test]
    fn test_forward_prompt_includes_title_and_issue() {
        let prompt = forward_prompt(&finding(), "reviewer output text");
        assert!(prompt.contains("API key security undefined"));
        assert!(prompt.contains("No separation between work and personal API keys"));
        assert!(prompt.contains("reviewer output text"));
    }

    #[test]
    fn test_reverse_prompt_includes_severity_and_document() {
        let prompt = reverse_prompt(&finding(), "full document body");
        assert!(prompt.contains("Critical"));
        assert!(prompt.contains("full document body"));
    }

    #[test]
    fn test_reasoning_systems_request_verdict_line() {
        assert!(forward_system(JudgeProtocol::Reasoning).contains("Verdict: YES"));
        assert!(reverse_system(JudgeProtocol::Reasoning).contains("Verdict: NOT_GENUINE"));
    }
}
