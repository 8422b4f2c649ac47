//! # CI Event Resolution
//!
//! Turns the triggering CI event into the revision pair the rest of the
//! pipeline works on, and classifies whether the event comes from a fork.
//!
//! Only the handful of payload fields the pipeline needs are modeled:
//!
//! - push: `before`, `after`, `ref`, `repository.full_name`
//! - pull request: `pull_request.base.sha`, `pull_request.head.sha`,
//!   `pull_request.head.ref`, `pull_request.head.repo.full_name`,
//!   `repository.full_name`
//!
//! Everything else in the payload is ignored.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};

/// The reserved "no prior revision" identifier.
pub const ZERO_SHA: &str = "0000000000000000000000000000000000000000";

fn sha_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9a-fA-F]{40}$").expect("static regex is valid"))
}

/// A full 40-character hexadecimal commit identifier, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Revision(String);

impl Revision {
    /// Parse a revision identifier, returning `None` unless it is exactly 40
    /// hexadecimal characters.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        sha_pattern()
            .is_match(value)
            .then(|| Self(value.to_ascii_lowercase()))
    }

    /// The zero sentinel.
    pub fn zero() -> Self {
        Self(ZERO_SHA.to_string())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == ZERO_SHA
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines.
    pub fn short(&self) -> &str {
        &self.0[..7]
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Revision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::MalformedEvent {
            event: "revision".to_string(),
            message: format!("'{}' is not a 40-character hexadecimal revision", s),
        })
    }
}

/// The `(before, after)` pair a run diffs across.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionPair {
    pub before: Revision,
    pub after: Revision,
}

impl RevisionPair {
    pub fn new(before: Revision, after: Revision) -> Self {
        Self { before, after }
    }

    /// First push to a ref: there is no prior revision.
    pub fn is_first_push(&self) -> bool {
        self.before.is_zero()
    }

    /// The ref was deleted: there is nothing to check out or publish.
    pub fn is_branch_deletion(&self) -> bool {
        self.after.is_zero()
    }
}

/// The two event shapes the resolver understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Push,
    PullRequest,
}

impl EventKind {
    /// Classify a CI event name.
    pub fn from_event_name(name: &str) -> Result<Self> {
        match name {
            "push" => Ok(Self::Push),
            "pull_request" | "pull_request_target" => Ok(Self::PullRequest),
            other => Err(Error::UnsupportedEvent {
                event: other.to_string(),
            }),
        }
    }
}

/// Repository identity as it appears in event payloads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoryRef {
    pub full_name: Option<String>,
}

/// One side (base or head) of a pull request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestSide {
    pub sha: Option<String>,
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub repo: Option<RepositoryRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequest {
    pub base: Option<PullRequestSide>,
    pub head: Option<PullRequestSide>,
}

/// The subset of a CI event payload the pipeline reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    pub before: Option<String>,
    pub after: Option<String>,
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub pull_request: Option<PullRequest>,
    pub repository: Option<RepositoryRef>,
}

impl EventPayload {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    fn head(&self) -> Option<&PullRequestSide> {
        self.pull_request.as_ref().and_then(|pr| pr.head.as_ref())
    }

    fn base(&self) -> Option<&PullRequestSide> {
        self.pull_request.as_ref().and_then(|pr| pr.base.as_ref())
    }

    /// Identity of the repository the event targets.
    pub fn target_repository(&self) -> Option<&str> {
        self.repository
            .as_ref()
            .and_then(|r| r.full_name.as_deref())
            .or_else(|| {
                self.base()
                    .and_then(|b| b.repo.as_ref())
                    .and_then(|r| r.full_name.as_deref())
            })
    }

    /// Identity of the repository a pull request's head lives in, if the
    /// payload carries one (a deleted fork has none).
    pub fn head_repository(&self) -> Option<&str> {
        self.head()
            .and_then(|h| h.repo.as_ref())
            .and_then(|r| r.full_name.as_deref())
    }
}

fn required_revision(event: &str, field: &str, value: Option<&str>) -> Result<Revision> {
    let raw = value.ok_or_else(|| Error::MalformedEvent {
        event: event.to_string(),
        message: format!("missing {}", field),
    })?;
    Revision::parse(raw).ok_or_else(|| Error::MalformedEvent {
        event: event.to_string(),
        message: format!("{} is not a 40-character hexadecimal revision: '{}'", field, raw),
    })
}

/// Resolve the revision pair for an event.
///
/// Push events take `before`/`after` verbatim (`before` may be the zero
/// sentinel). Pull-request events use the base and head commits, both of
/// which are required.
pub fn resolve(payload: &EventPayload, event_name: &str) -> Result<RevisionPair> {
    match EventKind::from_event_name(event_name)? {
        EventKind::Push => Ok(RevisionPair::new(
            required_revision(event_name, "before", payload.before.as_deref())?,
            required_revision(event_name, "after", payload.after.as_deref())?,
        )),
        EventKind::PullRequest => Ok(RevisionPair::new(
            required_revision(
                event_name,
                "pull_request.base.sha",
                payload.base().and_then(|b| b.sha.as_deref()),
            )?,
            required_revision(
                event_name,
                "pull_request.head.sha",
                payload.head().and_then(|h| h.sha.as_deref()),
            )?,
        )),
    }
}

/// Whether the event's changes come from a fork of the target repository.
///
/// True only when the pull-request head names a source repository and that
/// name differs (case-insensitively) from the target's. A missing head
/// repository, as with a deleted fork, is not classified as a fork here.
pub fn is_fork_origin(payload: &EventPayload) -> bool {
    match (payload.head_repository(), payload.target_repository()) {
        (Some(head), Some(target)) => !head.eq_ignore_ascii_case(target),
        _ => false,
    }
}

/// Everything the pipeline needs to know about the triggering event.
///
/// Built once per invocation and read-only afterwards.
#[derive(Debug, Clone)]
pub struct EventContext {
    pub name: String,
    pub kind: EventKind,
    pub revisions: RevisionPair,
    pub repository: Option<String>,
    pub head_repository: Option<String>,
    /// Branch the artifacts would be published to, when the event names one.
    pub branch: Option<String>,
    pub is_fork: bool,
}

impl EventContext {
    pub fn from_payload(event_name: &str, payload: &EventPayload) -> Result<Self> {
        let kind = EventKind::from_event_name(event_name)?;
        let revisions = resolve(payload, event_name)?;

        let branch = match kind {
            EventKind::Push => payload
                .git_ref
                .as_deref()
                .and_then(|r| r.strip_prefix("refs/heads/"))
                .map(str::to_string),
            EventKind::PullRequest => payload.head().and_then(|h| h.git_ref.clone()),
        };

        Ok(Self {
            name: event_name.to_string(),
            kind,
            revisions,
            repository: payload.target_repository().map(str::to_string),
            head_repository: payload.head_repository().map(str::to_string),
            branch,
            is_fork: is_fork_origin(payload),
        })
    }

    pub fn from_file(event_name: &str, path: &Path) -> Result<Self> {
        let payload = EventPayload::from_file(path)?;
        Self::from_payload(event_name, &payload)
    }
}
