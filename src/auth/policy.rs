// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-endpoint access policy.
//!
//! A policy is an ordered list of `pattern → requirement` rules plus a
//! default. The first rule matching the request method and path decides.
//!
//! Patterns are `/`-separated:
//!
//! | Segment | Matches |
//! |---------|---------|
//! | `name` | exactly `name` |
//! | `*` or `{id}` | any single segment |
//! | `**` (last only) | any remainder, including nothing |

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AuthError, IdentityContext};

/// What a matched endpoint demands of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// No identity needed.
    Public,
    /// Any identity.
    Authenticated,
    /// An identity holding this exact authority.
    Authority(String),
}

impl Requirement {
    pub fn authority(name: impl Into<String>) -> Self {
        Requirement::Authority(name.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Any,
    Rest,
}

/// Compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s {
                "**" => Segment::Rest,
                "*" => Segment::Any,
                s if s.starts_with('{') && s.ends_with('}') => Segment::Any,
                s => Segment::Literal(s.to_string()),
            })
            .collect();

        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        let mut parts = path.split('/').filter(|s| !s.is_empty());

        for segment in &self.segments {
            match segment {
                Segment::Rest => return true,
                Segment::Any => {
                    if parts.next().is_none() {
                        return false;
                    }
                }
                Segment::Literal(expected) => {
                    if parts.next() != Some(expected.as_str()) {
                        return false;
                    }
                }
            }
        }

        parts.next().is_none()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

#[derive(Debug, Clone)]
struct AccessRule {
    method: Option<Method>,
    pattern: PathPattern,
    requirement: Requirement,
}

/// Ordered access rules with a fallback requirement.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<AccessRule>,
    default: Requirement,
}

impl AccessPolicy {
    /// Empty policy; unmatched requests get `default`.
    pub fn new(default: Requirement) -> Self {
        Self {
            rules: Vec::new(),
            default,
        }
    }

    /// Add a rule for any method.
    pub fn rule(mut self, pattern: &str, requirement: Requirement) -> Self {
        self.rules.push(AccessRule {
            method: None,
            pattern: PathPattern::parse(pattern),
            requirement,
        });
        self
    }

    /// Add a rule for one method.
    pub fn rule_for(mut self, method: Method, pattern: &str, requirement: Requirement) -> Self {
        self.rules.push(AccessRule {
            method: Some(method),
            pattern: PathPattern::parse(pattern),
            requirement,
        });
        self
    }

    /// Requirement of the first matching rule, else the default.
    pub fn requirement_for(&self, method: &Method, path: &str) -> &Requirement {
        self.rules
            .iter()
            .find(|rule| {
                rule.method.as_ref().is_none_or(|m| m == method) && rule.pattern.matches(path)
            })
            .map(|rule| &rule.requirement)
            .unwrap_or(&self.default)
    }

    /// Check `identity` against the requirement for `method path`.
    pub fn enforce(
        &self,
        method: &Method,
        path: &str,
        identity: Option<&IdentityContext>,
    ) -> Result<(), AuthError> {
        match (self.requirement_for(method, path), identity) {
            (Requirement::Public, _) => Ok(()),
            (_, None) => Err(AuthError::Unauthorized),
            (Requirement::Authenticated, Some(_)) => Ok(()),
            (Requirement::Authority(name), Some(identity)) => {
                if identity.has_authority(name) {
                    Ok(())
                } else {
                    tracing::info!(
                        subject = %identity.subject,
                        required = %name,
                        %path,
                        "Permission denied"
                    );
                    Err(AuthError::Forbidden)
                }
            }
        }
    }
}

/// Authorization middleware. Runs after the trust filters have attached (or
/// not) an [`IdentityContext`].
pub async fn authorization_filter(
    State(policy): State<Arc<AccessPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let decision = policy.enforce(
        request.method(),
        request.uri().path(),
        request.extensions().get::<IdentityContext>(),
    );

    match decision {
        Ok(()) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}
