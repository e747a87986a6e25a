use regex::{Captures, Regex, RegexBuilder};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

use super::template::{tokenize, Token};
use crate::description::{ParamKind, ParamSpec};
use crate::fault::{ConfigurationError, ServiceError};
use crate::message::ArgValue;

const STRING_SEGMENT: &str = r"([A-Za-z0-9_\-%.~\\]*?)";
const INTEGER_SEGMENT: &str = r"(\d*?)";
const UUID_SEGMENT: &str = r"([a-f0-9]{8}-(?:[a-f0-9]{4}-){3}[a-f0-9]{12})";
const GREEDY_SEGMENT: &str = r"(.*?)";
const ANY_SEGMENT: &str = r"([^/]*?)";
const WILDCARD: &str = ".*";

/// Where one handler parameter gets its value from.
#[derive(Debug, Clone)]
pub struct SlotPlan {
    pub name: Arc<str>,
    pub kind: ParamKind,
    /// Capture group that feeds the slot; `None` leaves it to negotiation.
    pub capture: Option<usize>,
}

/// A URL template compiled against an operation's parameters.
pub struct CompiledRoute {
    template: String,
    pattern: Regex,
    shape: Regex,
    slots: Vec<SlotPlan>,
}

impl CompiledRoute {
    /// Compile `template` for the ordered `params`.
    ///
    /// Fails when the template is malformed, has more placeholders than
    /// parameters, names a parameter that is not declared, or places a
    /// placeholder over a parameter kind that cannot come from a URL.
    pub fn compile(template: &str, params: &[ParamSpec]) -> Result<Self, ConfigurationError> {
        let start = Instant::now();
        let tokens = tokenize(template)?;

        let placeholders = tokens
            .iter()
            .filter(|t| matches!(t, Token::Placeholder { .. }))
            .count();
        if placeholders > params.len() {
            return Err(ConfigurationError::TooManyPlaceholders {
                template: template.to_string(),
                placeholders,
                parameters: params.len(),
            });
        }

        let mut body = String::with_capacity(template.len() * 2);
        let mut shape_body = String::with_capacity(template.len() * 2);
        let mut captured: Vec<&str> = Vec::with_capacity(placeholders);

        for token in &tokens {
            match token {
                Token::Literal(text) => {
                    let escaped = regex::escape(text);
                    body.push_str(&escaped);
                    shape_body.push_str(&escaped);
                }
                Token::Wildcard => {
                    body.push_str(WILDCARD);
                    shape_body.push_str(WILDCARD);
                }
                Token::Placeholder { name, greedy } => {
                    if captured.contains(&name.as_str()) {
                        return Err(ConfigurationError::MalformedTemplate {
                            template: template.to_string(),
                            reason: format!("placeholder '{name}' appears twice"),
                        });
                    }
                    let positional = &params[captured.len()];
                    body.push_str(segment_pattern(template, positional, *greedy)?);
                    shape_body.push_str(if *greedy { GREEDY_SEGMENT } else { ANY_SEGMENT });
                    captured.push(name);
                }
            }
        }

        let mut slots: Vec<SlotPlan> = params
            .iter()
            .map(|p| SlotPlan {
                name: Arc::clone(&p.name),
                kind: p.kind.clone(),
                capture: None,
            })
            .collect();
        for (index, name) in captured.iter().enumerate() {
            let slot = slots
                .iter_mut()
                .find(|s| &*s.name == *name)
                .ok_or_else(|| ConfigurationError::UnknownRouteParameter {
                    template: template.to_string(),
                    placeholder: name.to_string(),
                })?;
            if !slot.kind.is_route_bindable() {
                return Err(ConfigurationError::UnsupportedRouteParameterType {
                    template: template.to_string(),
                    parameter: name.to_string(),
                    kind: slot.kind.name(),
                });
            }
            slot.capture = Some(index + 1);
        }

        let pattern = build_regex(template, &body)?;
        let shape = build_regex(template, &shape_body)?;

        debug!(
            template = %template,
            pattern = %pattern.as_str(),
            placeholders,
            parameters = params.len(),
            duration_us = start.elapsed().as_micros() as u64,
            "Route compiled"
        );

        Ok(Self {
            template: template.to_string(),
            pattern,
            shape,
            slots,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// The generated regular expression.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn slots(&self) -> &[SlotPlan] {
        &self.slots
    }

    /// Pure match test against an operation-relative path.
    pub fn is_match(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }

    /// Bind the captures of `path` into argument slots, one per parameter.
    ///
    /// Slots not fed by a capture are `None`.
    pub fn bind(&self, path: &str) -> Result<Vec<Option<ArgValue>>, ServiceError> {
        let captures = self.pattern.captures(path).ok_or_else(|| {
            ServiceError::not_found(format!(
                "'{path}' does not match route '{}'",
                self.template
            ))
        })?;
        self.convert(&captures)
    }

    /// Explain why a path that has this route's shape failed to match it.
    ///
    /// Returns the conversion error for the first offending segment, or
    /// `None` when the path matches outright or differs in shape.
    pub fn diagnose(&self, path: &str) -> Option<ServiceError> {
        if self.pattern.is_match(path) {
            return None;
        }
        let captures = self.shape.captures(path)?;
        self.convert(&captures).err()
    }

    fn convert(&self, captures: &Captures<'_>) -> Result<Vec<Option<ArgValue>>, ServiceError> {
        self.slots
            .iter()
            .map(|slot| match slot.capture {
                None => Ok(None),
                Some(group) => {
                    let raw = captures.get(group).map(|m| m.as_str()).unwrap_or("");
                    convert_segment(slot, raw).map(Some)
                }
            })
            .collect()
    }
}

impl fmt::Debug for CompiledRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRoute")
            .field("template", &self.template)
            .field("pattern", &self.pattern.as_str())
            .field("slots", &self.slots)
            .finish()
    }
}

fn segment_pattern(
    template: &str,
    param: &ParamSpec,
    greedy: bool,
) -> Result<&'static str, ConfigurationError> {
    let pattern = match (&param.kind, greedy) {
        (ParamKind::String, true) => GREEDY_SEGMENT,
        (ParamKind::String, false) => STRING_SEGMENT,
        (ParamKind::Integer, false) => INTEGER_SEGMENT,
        (ParamKind::Uuid, false) => UUID_SEGMENT,
        (kind, _) => {
            return Err(ConfigurationError::UnsupportedRouteParameterType {
                template: template.to_string(),
                parameter: param.name.to_string(),
                kind: kind.name(),
            })
        }
    };
    Ok(pattern)
}

fn build_regex(template: &str, body: &str) -> Result<Regex, ConfigurationError> {
    let mut pattern = String::with_capacity(body.len() + 4);
    pattern.push('^');
    if body == "/" {
        pattern.push_str("/?");
    } else {
        match body.strip_prefix('/') {
            Some(rest) => {
                pattern.push_str("/?");
                pattern.push_str(rest);
            }
            None => pattern.push_str(body),
        }
        if body.ends_with('/') {
            pattern.push('?');
        }
    }
    pattern.push('$');

    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ConfigurationError::MalformedTemplate {
            template: template.to_string(),
            reason: e.to_string(),
        })
}

fn convert_segment(slot: &SlotPlan, raw: &str) -> Result<ArgValue, ServiceError> {
    let conversion = |target: &str, detail: String| {
        ServiceError::bad_request(format!(
            "cannot convert '{raw}' to {target} for parameter '{}': {detail}",
            slot.name
        ))
    };
    match slot.kind {
        ParamKind::String => urlencoding::decode(raw)
            .map(|s| ArgValue::Text(s.into_owned()))
            .map_err(|e| conversion("string", e.to_string())),
        ParamKind::Integer => raw
            .parse::<i32>()
            .map(ArgValue::Integer)
            .map_err(|e| conversion("integer", e.to_string())),
        ParamKind::Uuid => Uuid::parse_str(raw)
            .map(ArgValue::Uuid)
            .map_err(|e| conversion("uuid", e.to_string())),
        ref other => Err(conversion(other.name(), "not bindable from a URL".to_string())),
    }
}
