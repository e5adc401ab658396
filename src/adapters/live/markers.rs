//! Marker-based extraction from worker output.
//!
//! Recognises the summary lines common test runners print, `+` lines of
//! unified diffs that declare tests, `Task ID:` markers, and
//! `SEVERITY: text` finding lines. Reviewers may instead emit a fenced
//! JSON block, which wins when it parses.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::graph::SpecVerdict;
use crate::ports::extract::{
    EvidenceExtractor, FindingExtractor, NewTestEvidence, ReviewFindings, ReviewVerdict,
    SpecFindings, TaskIdExtractor, TestEvidence,
};

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern compiles")
}

static EXPLICIT_TASK_ID: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)\btask[ _-]?id\s*[:=]\s*\**\s*(T\d+)\b"));
static BARE_TASK_ID: LazyLock<Regex> = LazyLock::new(|| regex(r"\b(T\d+)\b"));

static CARGO_RESULT: LazyLock<Regex> =
    LazyLock::new(|| regex(r"test result: (ok|FAILED)\. (\d+) passed; (\d+) failed"));
static JEST_RESULT: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"Tests:\s+(?:(\d+) failed,\s*)?(?:\d+ skipped,\s*)?(?:\d+ todo,\s*)?(\d+) passed")
});
static MOCHA_PASSING: LazyLock<Regex> = LazyLock::new(|| regex(r"\b(\d+) passing\b"));
static MOCHA_FAILING: LazyLock<Regex> = LazyLock::new(|| regex(r"\b(\d+) failing\b"));
static PYTEST_PASSED: LazyLock<Regex> = LazyLock::new(|| regex(r"\b(\d+) passed\b"));
static PYTEST_FAILED: LazyLock<Regex> = LazyLock::new(|| regex(r"\b(\d+) (?:failed|errors?)\b"));
static GO_RESULT: LazyLock<Regex> = LazyLock::new(|| regex(r"(?m)^(ok|FAIL)\s+\S+"));
static BUILD_SUCCESS: LazyLock<Regex> = LazyLock::new(|| regex(r"BUILD SUCCESS(?:FUL)?"));
static BUILD_FAILURE: LazyLock<Regex> = LazyLock::new(|| regex(r"BUILD FAIL(?:ED|URE)"));
static ZERO_FAILURES: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)(?:Tests run: (\d+), )?Failures: 0\b|\b0 failures\b"));

static NEW_TEST_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("rust", regex(r"^\+\s*#\[(?:tokio::)?test\]")),
        ("python", regex(r"^\+\s*(?:async\s+)?def test_\w*\s*\(")),
        ("javascript", regex(r"^\+\s*(?:it|test)\s*\(")),
        ("go", regex(r"^\+\s*func Test\w*\s*\(")),
        ("java", regex(r"^\+\s*@Test\b")),
    ]
});

static FILES_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)^\s*(?:\*\*)?(?:files?[ _](?:modified|changed)|files_modified)(?:\*\*)?\s*:\s*(.*)$")
});
static BULLET: LazyLock<Regex> = LazyLock::new(|| regex(r"^\s*[-*]\s+(.+?)\s*$"));

static FINDING: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"(?im)^\s*(?:[-*]\s*)?(?:\*\*)?\[?(CRITICAL|HIGH|MEDIUM|LOW|ADVISORY)\]?(?:\*\*)?\s*[:\-]\s*(.+?)\s*$",
    )
});
static VERDICT: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?im)^\s*(?:\*\*)?verdict(?:\*\*)?\s*:\s*\**\s*(PASSED|PASS|APPROVED|BLOCKED|BLOCK|CHANGES_REQUESTED)\b")
});
static JSON_BLOCK: LazyLock<Regex> = LazyLock::new(|| regex(r"(?s)```json\s*(\{.*?\})\s*```"));

/// Extractor for plain-text worker output.
#[derive(Debug, Default)]
pub struct MarkerExtractor;

impl TaskIdExtractor for MarkerExtractor {
    fn task_id(&self, text: &str) -> Option<String> {
        EXPLICIT_TASK_ID
            .captures(text)
            .or_else(|| BARE_TASK_ID.captures(text))
            .map(|caps| caps[1].to_string())
    }
}

fn count(caps: &regex::Captures<'_>, group: usize) -> u32 {
    caps.get(group).and_then(|m| m.as_str().parse().ok()).unwrap_or(0)
}

fn matched_lines(text: &str, re: &Regex) -> String {
    text.lines().filter(|line| re.is_match(line)).map(str::trim).collect::<Vec<_>>().join("\n")
}

fn cargo_evidence(text: &str) -> Option<TestEvidence> {
    let mut seen = false;
    let mut passed = 0;
    let mut failed = 0;
    let mut all_ok = true;
    for caps in CARGO_RESULT.captures_iter(text) {
        seen = true;
        all_ok &= &caps[1] == "ok";
        passed += count(&caps, 2);
        failed += count(&caps, 3);
    }
    seen.then(|| TestEvidence {
        framework: "cargo".to_string(),
        passed: all_ok && failed == 0,
        count: Some(passed),
        summary: matched_lines(text, &CARGO_RESULT),
    })
}

fn jest_evidence(text: &str) -> Option<TestEvidence> {
    let caps = JEST_RESULT.captures(text)?;
    Some(TestEvidence {
        framework: "jest".to_string(),
        passed: count(&caps, 1) == 0,
        count: Some(count(&caps, 2)),
        summary: caps[0].trim().to_string(),
    })
}

fn mocha_evidence(text: &str) -> Option<TestEvidence> {
    let passing = MOCHA_PASSING.captures(text)?;
    let failing = MOCHA_FAILING.captures(text).map_or(0, |caps| count(&caps, 1));
    Some(TestEvidence {
        framework: "mocha".to_string(),
        passed: failing == 0,
        count: Some(count(&passing, 1)),
        summary: passing[0].to_string(),
    })
}

fn pytest_evidence(text: &str) -> Option<TestEvidence> {
    let passed = PYTEST_PASSED.captures(text)?;
    let failed = PYTEST_FAILED.captures(text).map_or(0, |caps| count(&caps, 1));
    Some(TestEvidence {
        framework: "pytest".to_string(),
        passed: failed == 0,
        count: Some(count(&passed, 1)),
        summary: matched_lines(text, &PYTEST_PASSED),
    })
}

fn go_evidence(text: &str) -> Option<TestEvidence> {
    let mut seen = false;
    let mut failed = false;
    for caps in GO_RESULT.captures_iter(text) {
        seen = true;
        failed |= &caps[1] == "FAIL";
    }
    seen.then(|| TestEvidence {
        framework: "go".to_string(),
        passed: !failed,
        count: None,
        summary: matched_lines(text, &GO_RESULT),
    })
}

fn build_evidence(text: &str) -> Option<TestEvidence> {
    if BUILD_FAILURE.is_match(text) {
        return Some(TestEvidence {
            framework: "build".to_string(),
            passed: false,
            count: None,
            summary: matched_lines(text, &BUILD_FAILURE),
        });
    }
    if !BUILD_SUCCESS.is_match(text) {
        return None;
    }
    // A successful build alone proves nothing about tests.
    let zero = ZERO_FAILURES.captures(text)?;
    Some(TestEvidence {
        framework: "build".to_string(),
        passed: true,
        count: zero.get(1).and_then(|m| m.as_str().parse().ok()),
        summary: format!("{}\n{}", matched_lines(text, &BUILD_SUCCESS), zero[0].trim()),
    })
}

impl EvidenceExtractor for MarkerExtractor {
    fn test_evidence(&self, text: &str) -> Option<TestEvidence> {
        cargo_evidence(text)
            .or_else(|| jest_evidence(text))
            .or_else(|| mocha_evidence(text))
            .or_else(|| build_evidence(text))
            .or_else(|| pytest_evidence(text))
            .or_else(|| go_evidence(text))
    }

    fn new_tests(&self, text: &str) -> Option<NewTestEvidence> {
        let mut counts = BTreeMap::new();
        for line in text.lines().filter(|l| l.starts_with('+') && !l.starts_with("+++")) {
            if let Some((lang, _)) = NEW_TEST_PATTERNS.iter().find(|(_, re)| re.is_match(line)) {
                *counts.entry((*lang).to_string()).or_insert(0) += 1;
            }
        }
        (!counts.is_empty()).then_some(NewTestEvidence { counts })
    }

    fn files_modified(&self, text: &str) -> Vec<String> {
        let mut files: Vec<String> = Vec::new();
        let mut push = |raw: &str| {
            let path = raw.trim().trim_matches('`').trim();
            if !path.is_empty() && !files.iter().any(|f| f == path) {
                files.push(path.to_string());
            }
        };
        let mut in_list = false;
        for line in text.lines() {
            if let Some(caps) = FILES_HEADER.captures(line) {
                in_list = true;
                caps[1].split(',').for_each(&mut push);
            } else if in_list {
                match BULLET.captures(line) {
                    Some(caps) => push(&caps[1]),
                    None => in_list = false,
                }
            }
        }
        files
    }
}

#[derive(Debug, Default, Deserialize)]
struct VerdictBlock {
    #[serde(default)]
    verdict: Option<String>,
    #[serde(default)]
    critical: Vec<String>,
    #[serde(default)]
    high: Vec<String>,
    #[serde(default)]
    medium: Vec<String>,
    #[serde(default)]
    low: Vec<String>,
    #[serde(default)]
    advisory: Vec<String>,
}

fn json_block(text: &str) -> Option<VerdictBlock> {
    let caps = JSON_BLOCK.captures(text)?;
    match serde_json::from_str(&caps[1]) {
        Ok(block) => Some(block),
        Err(e) => {
            tracing::debug!("ignoring malformed verdict block: {e}");
            None
        }
    }
}

fn findings_by_severity(text: &str) -> BTreeMap<String, Vec<String>> {
    let mut buckets: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for caps in FINDING.captures_iter(text) {
        buckets.entry(caps[1].to_ascii_uppercase()).or_default().push(caps[2].to_string());
    }
    buckets
}

fn stated_verdict(raw: &str) -> Option<bool> {
    match raw.to_ascii_uppercase().as_str() {
        "PASSED" | "PASS" | "APPROVED" => Some(true),
        "BLOCKED" | "BLOCK" | "CHANGES_REQUESTED" => Some(false),
        _ => None,
    }
}

fn text_verdict(text: &str) -> Option<bool> {
    VERDICT.captures(text).and_then(|caps| stated_verdict(&caps[1]))
}

impl FindingExtractor for MarkerExtractor {
    fn review(&self, text: &str) -> ReviewFindings {
        let to_verdict = |passed: bool| if passed { ReviewVerdict::Passed } else { ReviewVerdict::Blocked };
        if let Some(block) = json_block(text) {
            return ReviewFindings {
                verdict: block.verdict.as_deref().and_then(stated_verdict).map(to_verdict),
                critical: block.critical,
                advisory: block.advisory,
            };
        }
        let mut buckets = findings_by_severity(text);
        ReviewFindings {
            verdict: text_verdict(text).map(to_verdict),
            critical: buckets.remove("CRITICAL").unwrap_or_default(),
            advisory: buckets.remove("ADVISORY").unwrap_or_default(),
        }
    }

    fn spec_alignment(&self, text: &str) -> SpecFindings {
        if text.trim().is_empty() {
            return SpecFindings {
                verdict: SpecVerdict::EvidenceCaptureFailed,
                critical: Vec::new(),
                high: Vec::new(),
                medium: Vec::new(),
                low: Vec::new(),
            };
        }
        let to_verdict = |stated: Option<bool>| match stated {
            Some(true) => SpecVerdict::Passed,
            Some(false) => SpecVerdict::Blocked,
            None => SpecVerdict::Unknown,
        };
        if let Some(block) = json_block(text) {
            return SpecFindings {
                verdict: to_verdict(block.verdict.as_deref().and_then(stated_verdict)),
                critical: block.critical,
                high: block.high,
                medium: block.medium,
                low: block.low,
            };
        }
        let mut buckets = findings_by_severity(text);
        SpecFindings {
            verdict: to_verdict(text_verdict(text)),
            critical: buckets.remove("CRITICAL").unwrap_or_default(),
            high: buckets.remove("HIGH").unwrap_or_default(),
            medium: buckets.remove("MEDIUM").unwrap_or_default(),
            low: buckets.remove("LOW").unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_task_id_wins_over_first_token() {
        let text = "Fixed T12 regression.\nTask ID: T7\n";
        assert_eq!(MarkerExtractor.task_id(text).as_deref(), Some("T7"));
        assert_eq!(MarkerExtractor.task_id("working on T3 now").as_deref(), Some("T3"));
        assert_eq!(MarkerExtractor.task_id("TASK-3 and T3x"), None);
    }

    #[test]
    fn cargo_summary_is_evidence() {
        let text = "running 4 tests\ntest result: ok. 4 passed; 0 failed; 0 ignored\n\
                    test result: ok. 2 passed; 0 failed; 0 ignored\n";
        let evidence = MarkerExtractor.test_evidence(text).unwrap();
        assert_eq!(evidence.framework, "cargo");
        assert!(evidence.passed);
        assert_eq!(evidence.count, Some(6));
    }

    #[test]
    fn cargo_failure_is_not_a_pass() {
        let text = "test result: FAILED. 3 passed; 1 failed; 0 ignored";
        assert!(!MarkerExtractor.test_evidence(text).unwrap().passed);
    }

    #[test]
    fn mocha_requires_no_failing() {
        let ok = MarkerExtractor.test_evidence("  12 passing (40ms)").unwrap();
        assert_eq!(ok.framework, "mocha");
        assert!(ok.passed);
        let bad = MarkerExtractor.test_evidence("  12 passing (40ms)\n  1 failing").unwrap();
        assert!(!bad.passed);
    }

    #[test]
    fn build_success_needs_zero_failures() {
        assert!(MarkerExtractor.test_evidence("BUILD SUCCESSFUL in 3s").is_none());
        let text = "Tests run: 8, Failures: 0, Errors: 0\nBUILD SUCCESS";
        let evidence = MarkerExtractor.test_evidence(text).unwrap();
        assert_eq!(evidence.framework, "build");
        assert_eq!(evidence.count, Some(8));
        assert!(evidence.passed);
    }

    #[test]
    fn pytest_and_jest_summaries() {
        let py = MarkerExtractor.test_evidence("===== 5 passed, 1 failed in 0.2s =====").unwrap();
        assert_eq!(py.framework, "pytest");
        assert!(!py.passed);
        let jest = MarkerExtractor.test_evidence("Tests:       9 passed, 9 total").unwrap();
        assert_eq!(jest.framework, "jest");
        assert!(jest.passed);
    }

    #[test]
    fn no_runner_output_is_no_evidence() {
        assert!(MarkerExtractor.test_evidence("All done, looks good to me.").is_none());
    }

    #[test]
    fn counts_added_test_declarations_per_language() {
        let diff = "+++ b/src/lib.rs\n+#[test]\n+fn adds() {}\n+    #[tokio::test]\n\
                    -#[test]\n+def test_parse():\n+  it('works', () => {})\n";
        let evidence = MarkerExtractor.new_tests(diff).unwrap();
        assert_eq!(evidence.counts["rust"], 2);
        assert_eq!(evidence.counts["python"], 1);
        assert_eq!(evidence.counts["javascript"], 1);
        assert_eq!(evidence.total(), 4);
        assert!(MarkerExtractor.new_tests("no diff here").is_none());
    }

    #[test]
    fn files_modified_reads_inline_and_bulleted_lists() {
        let text = "Summary\nFiles modified: src/a.rs, `src/b.rs`\n- src/c.rs\n* src/a.rs\n\nDone";
        assert_eq!(MarkerExtractor.files_modified(text), vec!["src/a.rs", "src/b.rs", "src/c.rs"]);
    }

    #[test]
    fn review_markers() {
        let text = "VERDICT: BLOCKED\n- CRITICAL: SQL built from user input\nADVISORY: rename helper\n";
        let findings = MarkerExtractor.review(text);
        assert_eq!(findings.verdict, Some(ReviewVerdict::Blocked));
        assert_eq!(findings.critical, vec!["SQL built from user input"]);
        assert_eq!(findings.advisory, vec!["rename helper"]);
    }

    #[test]
    fn review_json_block_wins_and_malformed_json_falls_back() {
        let json = "```json\n{\"verdict\": \"PASSED\", \"advisory\": [\"doc\"]}\n```";
        let findings = MarkerExtractor.review(json);
        assert_eq!(findings.verdict, Some(ReviewVerdict::Passed));
        assert_eq!(findings.advisory, vec!["doc"]);

        let broken = "```json\n{\"verdict\": PASSED}\n```\nVerdict: APPROVED";
        assert_eq!(MarkerExtractor.review(broken).verdict, Some(ReviewVerdict::Passed));
    }

    #[test]
    fn spec_alignment_severities() {
        let text = "CRITICAL: endpoint missing\nHIGH: wrong status code\nLOW: typo\nVerdict: BLOCKED";
        let findings = MarkerExtractor.spec_alignment(text);
        assert_eq!(findings.verdict, SpecVerdict::Blocked);
        assert_eq!(findings.critical.len(), 1);
        assert_eq!(findings.high.len(), 1);
        assert!(findings.medium.is_empty());
        assert_eq!(findings.low, vec!["typo"]);
        assert_eq!(MarkerExtractor.spec_alignment("  ").verdict, SpecVerdict::EvidenceCaptureFailed);
        assert_eq!(MarkerExtractor.spec_alignment("looks fine").verdict, SpecVerdict::Unknown);
    }
}
