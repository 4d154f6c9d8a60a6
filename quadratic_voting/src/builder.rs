use std::collections::HashSet;

use log::debug;
use snafu::prelude::*;

pub use crate::config::*;

/// A builder for assembling a poll configuration.
///
/// All the checks happen in [`PollBuilder::build`], so that a poll that
/// exists is always valid.
///
/// ```
/// pub use quadratic_voting::builder::PollBuilder;
/// # use quadratic_voting::ConfigError;
///
/// let poll = PollBuilder::new()
///     .title("Summer trip")
///     .options(&["Hot springs".to_string(), "BBQ".to_string()])
///     .credits(100)
///     .build()?;
///
/// assert_eq!(poll.credits(), 100);
/// # Ok::<(), ConfigError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct PollBuilder {
    _title: Option<String>,
    _options: Option<Vec<String>>,
    _credits: Option<i64>,
    _rules: PollRules,
}

impl PollBuilder {
    pub fn new() -> PollBuilder {
        PollBuilder::default()
    }

    pub fn title(self, title: &str) -> PollBuilder {
        PollBuilder {
            _title: Some(title.to_string()),
            ..self
        }
    }

    pub fn options(self, options: &[String]) -> PollBuilder {
        PollBuilder {
            _options: Some(options.to_vec()),
            ..self
        }
    }

    /// Signed on purpose: a non-positive budget is reported as a
    /// configuration error rather than rejected by the type.
    pub fn credits(self, credits: i64) -> PollBuilder {
        PollBuilder {
            _credits: Some(credits),
            ..self
        }
    }

    pub fn rules(self, rules: PollRules) -> PollBuilder {
        PollBuilder {
            _rules: rules,
            ..self
        }
    }

    pub fn build(self) -> Result<PollConfig, ConfigError> {
        let title = self._title.context(MissingFieldSnafu { field: "title" })?;
        let options = self
            ._options
            .context(MissingFieldSnafu { field: "options" })?;
        let credits = self
            ._credits
            .context(MissingFieldSnafu { field: "credits" })?;

        ensure!(!title.trim().is_empty(), EmptyTitleSnafu);
        ensure!(credits > 0, NonPositiveCreditsSnafu { credits });
        ensure!(!options.is_empty(), NoOptionsSnafu);

        let mut seen: HashSet<&str> = HashSet::new();
        for (idx, option) in options.iter().enumerate() {
            ensure!(
                !option.trim().is_empty(),
                EmptyOptionSnafu { position: idx + 1 }
            );
            ensure!(
                seen.insert(option.as_str()),
                DuplicateOptionSnafu {
                    option: option.clone()
                }
            );
        }

        debug!(
            "PollBuilder::build: title: {:?} options: {:?} credits: {} rules: {:?}",
            title, options, credits, self._rules
        );
        Ok(PollConfig {
            title,
            options,
            credits: credits as u64,
            rules: self._rules,
        })
    }
}
