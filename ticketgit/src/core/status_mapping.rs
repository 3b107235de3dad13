//! Normalization of backend status strings onto [`InternalStatus`].
//!
//! Resolution order for a status without an internal value:
//! 1. the provider's rules, in declaration order (first match wins);
//! 2. the mapping-wide `default`;
//! 3. keyword inference on the raw text;
//! 4. none. Callers must treat an absent status as "not allowed".

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::{InternalStatus, TaskStatus};

/// Ordered rule set mapping provider statuses to internal ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TicketMapping {
    pub default: Option<InternalStatus>,
    pub providers: Vec<ProviderMapping>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMapping {
    pub provider: String,
    #[serde(default)]
    pub rules: Vec<MappingRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRule {
    pub to: InternalStatus,
    #[serde(rename = "match", default)]
    pub matches: Vec<String>,
    /// Treat each `match` entry as a whole-string regular expression.
    #[serde(default)]
    pub regex: bool,
    #[serde(default)]
    pub case_insensitive: bool,
}

impl MappingRule {
    fn matches(&self, raw: &str) -> bool {
        self.matches.iter().any(|candidate| {
            if self.regex {
                regex_matches(candidate, raw, self.case_insensitive)
            } else if self.case_insensitive {
                candidate.to_lowercase() == raw.to_lowercase()
            } else {
                candidate == raw
            }
        })
    }
}

fn regex_matches(pattern: &str, raw: &str, case_insensitive: bool) -> bool {
    let anchored = format!("^(?:{pattern})$");
    match RegexBuilder::new(&anchored)
        .case_insensitive(case_insensitive)
        .build()
    {
        Ok(re) => re.is_match(raw),
        Err(err) => {
            debug!(pattern, err = %err, "skipping invalid status rule regex");
            false
        }
    }
}

impl TicketMapping {
    fn rules_for(&self, provider: &str) -> &[MappingRule] {
        self.providers
            .iter()
            .find(|mapping| mapping.provider.eq_ignore_ascii_case(provider))
            .map(|mapping| mapping.rules.as_slice())
            .unwrap_or(&[])
    }

    /// Return a copy of `status` with `internal` populated where possible.
    pub fn to_internal(&self, status: &TaskStatus) -> TaskStatus {
        let mut normalized = status.clone();
        if normalized.internal.is_some() {
            return normalized;
        }
        normalized.internal = self.resolve(&status.provider, status.raw.as_deref());
        normalized
    }

    fn resolve(&self, provider: &str, raw: Option<&str>) -> Option<InternalStatus> {
        if let Some(raw) = raw
            && let Some(rule) = self.rules_for(provider).iter().find(|rule| rule.matches(raw))
        {
            debug!(provider, raw, to = %rule.to, "status matched provider rule");
            return Some(rule.to);
        }
        if let Some(default) = self.default {
            return Some(default);
        }
        raw.and_then(infer_from_keywords)
    }
}

/// Guess a status from well-known words in the raw text.
pub fn infer_from_keywords(raw: &str) -> Option<InternalStatus> {
    let upper = raw.to_uppercase();
    let has = |words: &[&str]| words.iter().any(|word| upper.contains(word));
    if has(&["BLOCK"]) {
        Some(InternalStatus::Blocked)
    } else if has(&["REVIEW"]) {
        Some(InternalStatus::Review)
    } else if has(&["PROGRESS"]) {
        Some(InternalStatus::InProgress)
    } else if has(&["READY", "TODO", "OPEN"]) {
        Some(InternalStatus::Todo)
    } else if has(&["DONE", "CLOSE", "RESOLVED"]) {
        Some(InternalStatus::Done)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(to: InternalStatus, matches: &[&str]) -> MappingRule {
        MappingRule {
            to,
            matches: matches.iter().map(|m| m.to_string()).collect(),
            regex: false,
            case_insensitive: false,
        }
    }

    fn mapping(rules: Vec<MappingRule>) -> TicketMapping {
        TicketMapping {
            default: None,
            providers: vec![ProviderMapping {
                provider: "jira".to_string(),
                rules,
            }],
        }
    }

    #[test]
    fn first_matching_rule_wins() {
        let mapping = mapping(vec![
            rule(InternalStatus::Review, &["Code Review"]),
            rule(InternalStatus::Done, &["Code Review", "Closed"]),
        ]);
        let status = mapping.to_internal(&TaskStatus::raw("jira", "P-1", "Code Review"));
        assert_eq!(status.internal, Some(InternalStatus::Review));
    }

    #[test]
    fn provider_lookup_ignores_case() {
        let mapping = mapping(vec![rule(InternalStatus::Todo, &["Backlog"])]);
        let status = mapping.to_internal(&TaskStatus::raw("JIRA", "P-1", "Backlog"));
        assert_eq!(status.internal, Some(InternalStatus::Todo));
    }

    #[test]
    fn literal_rules_are_case_sensitive_unless_flagged() {
        let strict = mapping(vec![rule(InternalStatus::Todo, &["Backlog"])]);
        let status = strict.to_internal(&TaskStatus::raw("jira", "P-1", "backlog"));
        assert_eq!(status.internal, None);

        let mut loose_rule = rule(InternalStatus::Todo, &["Backlog"]);
        loose_rule.case_insensitive = true;
        let loose = mapping(vec![loose_rule]);
        let status = loose.to_internal(&TaskStatus::raw("jira", "P-1", "backlog"));
        assert_eq!(status.internal, Some(InternalStatus::Todo));
    }

    #[test]
    fn regex_rules_match_whole_string() {
        let mut regex_rule = rule(InternalStatus::InProgress, &["dev.*"]);
        regex_rule.regex = true;
        let mapping = mapping(vec![regex_rule]);

        let hit = mapping.to_internal(&TaskStatus::raw("jira", "P-1", "development"));
        assert_eq!(hit.internal, Some(InternalStatus::InProgress));

        // Partial match does not count; keyword inference finds nothing either.
        let miss = mapping.to_internal(&TaskStatus::raw("jira", "P-1", "in development"));
        assert_eq!(miss.internal, None);
    }

    #[test]
    fn invalid_regex_rule_never_matches() {
        let mut broken = rule(InternalStatus::Done, &["[a-z"]);
        broken.regex = true;
        let mapping = mapping(vec![broken]);
        let status = mapping.to_internal(&TaskStatus::raw("jira", "P-1", "[a-z"));
        assert_eq!(status.internal, None);
    }

    #[test]
    fn existing_internal_status_is_kept() {
        let mapping = mapping(vec![rule(InternalStatus::Done, &["Open"])]);
        let mut status = TaskStatus::raw("jira", "P-1", "Open");
        status.internal = Some(InternalStatus::Blocked);
        assert_eq!(
            mapping.to_internal(&status).internal,
            Some(InternalStatus::Blocked)
        );
    }

    #[test]
    fn default_applies_before_keyword_inference() {
        let mut mapping = mapping(vec![]);
        mapping.default = Some(InternalStatus::Todo);
        let status = mapping.to_internal(&TaskStatus::raw("jira", "P-1", "Blocked by infra"));
        assert_eq!(status.internal, Some(InternalStatus::Todo));
    }

    #[test]
    fn keyword_inference_covers_common_words() {
        let cases = [
            ("Blocked", Some(InternalStatus::Blocked)),
            ("Peer review", Some(InternalStatus::Review)),
            ("In Progress", Some(InternalStatus::InProgress)),
            ("Ready for dev", Some(InternalStatus::Todo)),
            ("Reopened", Some(InternalStatus::Todo)),
            ("Closed", Some(InternalStatus::Done)),
            ("Resolved", Some(InternalStatus::Done)),
            ("Icebox", None),
        ];
        for (raw, expected) in cases {
            assert_eq!(infer_from_keywords(raw), expected, "raw={raw}");
        }
    }

    #[test]
    fn missing_raw_without_default_is_none() {
        let mapping = TicketMapping::default();
        let status = TaskStatus {
            provider: "jira".to_string(),
            key: "P-1".to_string(),
            raw: None,
            internal: None,
        };
        assert_eq!(mapping.to_internal(&status).internal, None);
    }

    #[test]
    fn deserializes_match_key() {
        let json = r#"{
            "default": "TODO",
            "providers": [
                {"provider": "youtrack", "rules": [
                    {"to": "DONE", "match": ["Fixed", "Verified"]},
                    {"to": "REVIEW", "match": ["to ?verify"], "regex": true, "caseInsensitive": true}
                ]}
            ]
        }"#;
        let mapping: TicketMapping = serde_json::from_str(json).expect("parse");
        assert_eq!(mapping.default, Some(InternalStatus::Todo));
        let rules = &mapping.providers[0].rules;
        assert_eq!(rules[0].matches, vec!["Fixed", "Verified"]);
        assert!(rules[1].regex && rules[1].case_insensitive);
        let status = mapping.to_internal(&TaskStatus::raw("YouTrack", "Y-1", "To Verify"));
        assert_eq!(status.internal, Some(InternalStatus::Review));
    }
}
