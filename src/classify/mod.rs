//! Heuristic classification of blockchain CLI output.
//!
//! The CLI offers no trustworthy machine-readable status, so a captured
//! [`CommandOutput`] is mapped to an [`Outcome`] by ordered rules; the first
//! rule that matches decides:
//!
//! 1. stdout is a JSON envelope carrying the error field → failure;
//! 2. stderr contains a failure marker → failure with the full stderr;
//! 3. the exit status is non-zero and the step treats that as fatal →
//!    failure built from the status and captured streams;
//! 4. stdout contains a success marker → success;
//! 5. otherwise → success (optimistic default).
//!
//! Reordering these rules changes deployment outcomes for ambiguous output.
//! Marker lists are data on [`ClassifierRules`], not part of the order.

use std::fmt;

use serde_json::Value;

use crate::process::CommandOutput;

/// Pipeline step whose output is being classified.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StepKind {
    /// Keypair generation.
    Keygen,
    /// Address lookup from the public key.
    AddressLookup,
    /// Faucet funding.
    Fund,
    /// Package publication.
    Publish,
    /// Package compilation without publishing.
    Compile,
}

impl StepKind {
    /// Stable lowercase name used in logs and failure reasons.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Keygen => "keygen",
            Self::AddressLookup => "address lookup",
            Self::Fund => "funding",
            Self::Publish => "publish",
            Self::Compile => "compile",
        }
    }

    const fn default_payload(self) -> &'static str {
        match self {
            Self::Publish => "Contract deployed",
            Self::Compile => "Compiled",
            Self::Keygen | Self::AddressLookup | Self::Fund => "",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed verdict derived from a process result.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The step is considered to have succeeded.
    Success {
        /// Output worth surfacing to the caller.
        payload: String,
    },
    /// The step is considered to have failed.
    Failure {
        /// Reason text, surfaced verbatim.
        reason: String,
    },
}

impl Outcome {
    /// Returns `true` for [`Outcome::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Rule that decided a classification.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatchedRule {
    /// Rule 1: structured stdout carried an error field.
    StructuredError,
    /// Rule 2: stderr contained a failure marker.
    FailureMarker,
    /// Rule 3: non-zero exit treated as fatal for this step.
    NonZeroExit,
    /// Rule 4: stdout contained a success marker.
    SuccessMarker,
    /// Rule 5: nothing matched, so the output is presumed successful.
    OptimisticDefault,
}

/// Outcome together with the rule that produced it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Classification {
    /// Rule that matched first.
    pub rule: MatchedRule,
    /// Resulting verdict.
    pub outcome: Outcome,
}

/// Marker lists and switches consulted by [`classify`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClassifierRules {
    /// JSON key whose presence in structured stdout signals failure.
    pub error_field: String,
    /// Case-sensitive substrings of stderr that signal failure.
    pub failure_markers: Vec<String>,
    /// Case-sensitive substrings of stdout that signal success.
    pub success_markers: Vec<String>,
    /// Whether a non-zero exit status alone is enough to fail the step.
    pub nonzero_exit_is_failure: bool,
}

const GENERAL_FAILURE_MARKERS: [&str; 3] = ["error:", "Error:", "failed"];
const GENERAL_SUCCESS_MARKERS: [&str; 3] = ["Result", "success", "transaction_hash"];
const COMPILE_FAILURE_MARKERS: [&str; 4] = ["error[E", "error:", "Error:", "COMPILATION_ERROR"];
const COMPILE_SUCCESS_MARKERS: [&str; 2] = ["BUILDING", "Result"];

fn owned(markers: &[&str]) -> Vec<String> {
    markers.iter().map(|marker| (*marker).to_owned()).collect()
}

impl ClassifierRules {
    /// Default rules for `step`.
    ///
    /// Keygen, address lookup, and funding fail on any non-zero exit.
    /// Publish does not, because the tool exits non-zero on benign warnings.
    /// Compile only looks for compilation-failure markers.
    #[must_use]
    pub fn for_step(step: StepKind) -> Self {
        match step {
            StepKind::Keygen | StepKind::AddressLookup | StepKind::Fund => Self {
                error_field: String::from("Error"),
                failure_markers: owned(&GENERAL_FAILURE_MARKERS),
                success_markers: owned(&GENERAL_SUCCESS_MARKERS),
                nonzero_exit_is_failure: true,
            },
            StepKind::Publish => Self {
                error_field: String::from("Error"),
                failure_markers: owned(&GENERAL_FAILURE_MARKERS),
                success_markers: owned(&GENERAL_SUCCESS_MARKERS),
                nonzero_exit_is_failure: false,
            },
            StepKind::Compile => Self {
                error_field: String::from("Error"),
                failure_markers: owned(&COMPILE_FAILURE_MARKERS),
                success_markers: owned(&COMPILE_SUCCESS_MARKERS),
                nonzero_exit_is_failure: false,
            },
        }
    }

    /// Replaces the failure marker list.
    #[must_use]
    pub fn with_failure_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failure_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the success marker list.
    #[must_use]
    pub fn with_success_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.success_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Toggles rule 3.
    #[must_use]
    pub const fn with_nonzero_exit_is_failure(mut self, enabled: bool) -> Self {
        self.nonzero_exit_is_failure = enabled;
        self
    }
}

/// Per-step rule sets used across one pipeline.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RuleBook {
    keygen: ClassifierRules,
    address_lookup: ClassifierRules,
    fund: ClassifierRules,
    publish: ClassifierRules,
    compile: ClassifierRules,
}

impl Default for RuleBook {
    fn default() -> Self {
        Self {
            keygen: ClassifierRules::for_step(StepKind::Keygen),
            address_lookup: ClassifierRules::for_step(StepKind::AddressLookup),
            fund: ClassifierRules::for_step(StepKind::Fund),
            publish: ClassifierRules::for_step(StepKind::Publish),
            compile: ClassifierRules::for_step(StepKind::Compile),
        }
    }
}

impl RuleBook {
    /// Rules applied to `step`.
    #[must_use]
    pub const fn for_step(&self, step: StepKind) -> &ClassifierRules {
        match step {
            StepKind::Keygen => &self.keygen,
            StepKind::AddressLookup => &self.address_lookup,
            StepKind::Fund => &self.fund,
            StepKind::Publish => &self.publish,
            StepKind::Compile => &self.compile,
        }
    }

    /// Overrides the rules for `step`.
    #[must_use]
    pub fn with(mut self, step: StepKind, rules: ClassifierRules) -> Self {
        let slot = match step {
            StepKind::Keygen => &mut self.keygen,
            StepKind::AddressLookup => &mut self.address_lookup,
            StepKind::Fund => &mut self.fund,
            StepKind::Publish => &mut self.publish,
            StepKind::Compile => &mut self.compile,
        };
        *slot = rules;
        self
    }

    /// Classifies `output` from `step` with the matching rule set.
    #[must_use]
    pub fn classify(&self, output: &CommandOutput, step: StepKind) -> Classification {
        classify_detailed(output, step, self.for_step(step))
    }
}

/// Classifies `output`; a pure function of its inputs.
#[must_use]
pub fn classify(output: &CommandOutput, step: StepKind, rules: &ClassifierRules) -> Outcome {
    classify_detailed(output, step, rules).outcome
}

/// Classifies `output` and reports which rule decided.
#[must_use]
pub fn classify_detailed(
    output: &CommandOutput,
    step: StepKind,
    rules: &ClassifierRules,
) -> Classification {
    if let Some(reason) = structured_error(&output.stdout, &rules.error_field) {
        return failure(MatchedRule::StructuredError, reason);
    }

    if contains_any(&output.stderr, &rules.failure_markers) {
        return failure(MatchedRule::FailureMarker, output.stderr.clone());
    }

    if rules.nonzero_exit_is_failure && !output.is_success() {
        let reason = format!(
            "{step} exited with status {}: {}",
            output.status_text(),
            stream_detail(output)
        );
        return failure(MatchedRule::NonZeroExit, reason);
    }

    let rule = if contains_any(&output.stdout, &rules.success_markers) {
        MatchedRule::SuccessMarker
    } else {
        MatchedRule::OptimisticDefault
    };
    let payload = first_non_empty(&output.stdout, &output.stderr)
        .unwrap_or_else(|| step.default_payload())
        .to_owned();
    Classification {
        rule,
        outcome: Outcome::Success { payload },
    }
}

const fn failure(rule: MatchedRule, reason: String) -> Classification {
    Classification {
        rule,
        outcome: Outcome::Failure { reason },
    }
}

fn contains_any(haystack: &str, markers: &[String]) -> bool {
    markers
        .iter()
        .any(|marker| !marker.is_empty() && haystack.contains(marker.as_str()))
}

/// Both captured streams, stderr first, joined when both carry text.
fn stream_detail(output: &CommandOutput) -> String {
    let streams: Vec<&str> = [output.stderr.trim(), output.stdout.trim()]
        .into_iter()
        .filter(|text| !text.is_empty())
        .collect();
    if streams.is_empty() {
        String::from("no output")
    } else {
        streams.join("\n")
    }
}

fn first_non_empty<'a>(primary: &'a str, fallback: &'a str) -> Option<&'a str> {
    [primary, fallback]
        .into_iter()
        .find(|text| !text.trim().is_empty())
}

/// Extracts the error field from a JSON envelope on stdout.
///
/// The CLI may print progress text before the envelope, and that text can
/// contain braces of its own, so each opening brace is tried as the start of
/// a top-level JSON object. Objects nested inside a parsed value are skipped.
fn structured_error(stdout: &str, field: &str) -> Option<String> {
    let mut cursor = 0;
    while let Some(offset) = stdout.get(cursor..)?.find('{') {
        let start = cursor + offset;
        let candidate = stdout.get(start..)?;
        let mut values = serde_json::Deserializer::from_str(candidate).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Object(object))) => {
                if let Some(error) = object.get(field) {
                    return Some(error_text(error));
                }
                cursor = start + values.byte_offset();
            }
            _ => cursor = start + 1,
        }
    }
    None
}

fn error_text(error: &Value) -> String {
    match error {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
