use quadratic_voting::builder::PollBuilder;
use quadratic_voting::{ConfigError, PollConfig, PollRules};
use serde::{Deserialize, Serialize};

/// The poll configuration document, as written by the operator.
///
/// The required fields are optional here so that a missing one is reported
/// as a configuration error naming the field.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PollDocument {
    pub title: Option<String>,
    pub options: Option<Vec<String>>,
    pub credits: Option<i64>,
    pub rules: Option<RulesDocument>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RulesDocument {
    #[serde(rename = "forbidFullBudgetOnOneOption")]
    pub forbid_full_budget_on_one_option: Option<bool>,
    #[serde(rename = "requireSpentCredits")]
    pub require_spent_credits: Option<bool>,
}

impl RulesDocument {
    pub fn to_rules(&self) -> PollRules {
        let d = PollRules::DEFAULT_RULES;
        PollRules {
            forbid_full_budget_on_one_option: self
                .forbid_full_budget_on_one_option
                .unwrap_or(d.forbid_full_budget_on_one_option),
            require_spent_credits: self
                .require_spent_credits
                .unwrap_or(d.require_spent_credits),
        }
    }
}

impl PollDocument {
    pub fn into_poll(self) -> Result<PollConfig, ConfigError> {
        let mut builder = PollBuilder::new();
        if let Some(title) = self.title {
            builder = builder.title(&title);
        }
        if let Some(options) = self.options {
            builder = builder.options(&options);
        }
        if let Some(credits) = self.credits {
            builder = builder.credits(credits);
        }
        if let Some(rules) = self.rules {
            builder = builder.rules(rules.to_rules());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qv::{read_poll_config, QvError};
    use std::fs;

    fn parse(s: &str) -> Result<PollConfig, ConfigError> {
        let doc: PollDocument = serde_json::from_str(s).unwrap();
        doc.into_poll()
    }

    #[test]
    fn reads_minimal_document() {
        let poll = parse(
            r#"{"title": "旅行", "options": ["温泉", "BBQ", "テーマパーク", "ハイキング"], "credits": 100}"#,
        )
        .unwrap();
        assert_eq!(poll.title(), "旅行");
        assert_eq!(poll.options().len(), 4);
        assert_eq!(poll.options()[0], "温泉");
        assert_eq!(poll.credits(), 100);
        assert_eq!(poll.rules(), PollRules::DEFAULT_RULES);
    }

    #[test]
    fn reads_rules() {
        let poll = parse(
            r#"{"title": "t", "options": ["A", "B"], "credits": 10,
                "rules": {"forbidFullBudgetOnOneOption": true}}"#,
        )
        .unwrap();
        assert!(poll.rules().forbid_full_budget_on_one_option);
        assert!(!poll.rules().require_spent_credits);
    }

    #[test]
    fn reports_missing_and_invalid_fields() {
        assert!(matches!(
            parse(r#"{"title": "t", "options": ["A"]}"#),
            Err(ConfigError::MissingField { field: "credits" })
        ));
        assert!(matches!(
            parse(r#"{"title": "t", "options": ["A"], "credits": 0}"#),
            Err(ConfigError::NonPositiveCredits { credits: 0 })
        ));
        assert!(matches!(
            parse(r#"{"title": "t", "options": ["A", "A"], "credits": 4}"#),
            Err(ConfigError::DuplicateOption { .. })
        ));
        assert!(matches!(
            parse(r#"{"title": "t", "options": [], "credits": 4}"#),
            Err(ConfigError::NoOptions {})
        ));
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.json");
        fs::write(&p, r#"{"title": "t", "options": ["A"], "credits": 9}"#).unwrap();
        let poll = read_poll_config(p.to_str().unwrap()).unwrap();
        assert_eq!(poll.credits(), 9);

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            read_poll_config(missing.to_str().unwrap()),
            Err(QvError::OpeningJson { .. })
        ));

        fs::write(&p, "{not json").unwrap();
        assert!(matches!(
            read_poll_config(p.to_str().unwrap()),
            Err(QvError::ParsingJson { .. })
        ));

        fs::write(&p, r#"{"options": ["A"], "credits": 9}"#).unwrap();
        assert!(matches!(
            read_poll_config(p.to_str().unwrap()),
            Err(QvError::Config {
                source: ConfigError::MissingField { field: "title" },
                ..
            })
        ));
    }
}
