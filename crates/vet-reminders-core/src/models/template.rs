//! Reminder template models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error parsing an `age_condition` expression.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid age condition '{input}': {reason}")]
pub struct ConditionParseError {
    pub input: String,
    pub reason: String,
}

/// When an age-triggered template is due.
///
/// Stored as text: `"10"` for an exact week count, `"last notified+4"` for a
/// recurrence four weeks after the previous notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AgeCondition {
    /// Due in the week the pet turns exactly this many weeks old.
    ExactWeeks(u32),
    /// Due once this many weeks have passed since the last notification.
    SinceLastSent { weeks: u32 },
}

const RECURRENCE_PREFIX: &str = "lastnotified+";

/// Longest accepted recurrence interval, about a century.
pub const MAX_RECURRENCE_WEEKS: u32 = 5200;

/// Longest accepted delay between an event and its reminder.
pub const MAX_DAYS_OFFSET: i64 = 3650;

impl AgeCondition {
    pub fn is_exact(&self) -> bool {
        matches!(self, AgeCondition::ExactWeeks(_))
    }
}

impl FromStr for AgeCondition {
    type Err = ConditionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason: &str| ConditionParseError {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        if compact.is_empty() {
            return Err(err("empty expression"));
        }

        if let Some(weeks) = compact.strip_prefix(RECURRENCE_PREFIX) {
            let weeks: u32 = weeks
                .parse()
                .map_err(|_| err("recurrence interval must be a whole number of weeks"))?;
            if weeks == 0 {
                return Err(err("recurrence interval must be at least one week"));
            }
            if weeks > MAX_RECURRENCE_WEEKS {
                return Err(err("recurrence interval exceeds 5200 weeks"));
            }
            return Ok(AgeCondition::SinceLastSent { weeks });
        }

        compact
            .parse::<u32>()
            .map(AgeCondition::ExactWeeks)
            .map_err(|_| err("expected a week count or 'last notified+K'"))
    }
}

impl fmt::Display for AgeCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgeCondition::ExactWeeks(weeks) => write!(f, "{}", weeks),
            AgeCondition::SinceLastSent { weeks } => write!(f, "last notified+{}", weeks),
        }
    }
}

impl TryFrom<String> for AgeCondition {
    type Error = ConditionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AgeCondition> for String {
    fn from(condition: AgeCondition) -> Self {
        condition.to_string()
    }
}

/// Match rules for event-triggered templates (evaluated once per event).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventCondition {
    /// Vaccine name, matched case-insensitively; `None` matches any vaccine
    pub vaccine: Option<String>,
    /// Inclusive lower bound on age at event time
    pub min_age_weeks: Option<u32>,
    /// Inclusive upper bound on age at event time
    pub max_age_weeks: Option<u32>,
}

impl EventCondition {
    /// Whether an event with this vaccine, for a pet of this age, qualifies.
    pub fn matches(&self, vaccine: &str, age_weeks: Option<i64>) -> bool {
        if let Some(expected) = &self.vaccine {
            if !expected.trim().eq_ignore_ascii_case(vaccine.trim()) {
                return false;
            }
        }

        if self.min_age_weeks.is_none() && self.max_age_weeks.is_none() {
            return true;
        }

        // Age bounds need a known age
        let Some(age) = age_weeks else {
            return false;
        };
        if let Some(min) = self.min_age_weeks {
            if age < i64::from(min) {
                return false;
            }
        }
        if let Some(max) = self.max_age_weeks {
            if age > i64::from(max) {
                return false;
            }
        }
        true
    }
}

/// What makes a template fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateTrigger {
    /// Evaluated by the daily age-condition cycle.
    Age { condition: AgeCondition },
    /// Pre-scheduled when a qualifying event is recorded.
    Event(EventCondition),
}

/// A reusable reminder definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Template {
    pub id: i64,
    /// Reminder category (e.g., "deworming", "vaccination")
    pub category: String,
    /// Species scope; `None` applies to every species
    pub species: Option<String>,
    /// Human-readable name
    pub name: String,
    pub trigger: TemplateTrigger,
    pub subject: String,
    /// Body with `{{placeholder}}` markers
    pub body: String,
    /// Days between the qualifying event and the reminder (event templates)
    pub days_offset: i64,
    pub is_active: bool,
}

impl Template {
    /// The age condition, for age-triggered templates.
    pub fn age_condition(&self) -> Option<AgeCondition> {
        match &self.trigger {
            TemplateTrigger::Age { condition } => Some(*condition),
            TemplateTrigger::Event(_) => None,
        }
    }

    /// True for templates that may fire at most once per pet.
    pub fn is_exact_age(&self) -> bool {
        self.age_condition().is_some_and(|c| c.is_exact())
    }
}

/// Admin-side edit of a template. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplatePatch {
    pub subject: Option<String>,
    pub body: Option<String>,
    pub days_offset: Option<i64>,
    pub is_active: Option<bool>,
}

impl TemplatePatch {
    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.body.is_none()
            && self.days_offset.is_none()
            && self.is_active.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_exact_weeks() {
        assert_eq!("10".parse(), Ok(AgeCondition::ExactWeeks(10)));
        assert_eq!(" 0 ".parse(), Ok(AgeCondition::ExactWeeks(0)));
    }

    #[test]
    fn test_parse_recurrence_variants() {
        let expected = AgeCondition::SinceLastSent { weeks: 4 };
        assert_eq!("last notified+4".parse(), Ok(expected));
        assert_eq!("Last Notified + 4".parse(), Ok(expected));
        assert_eq!("lastnotified+4".parse(), Ok(expected));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("".parse::<AgeCondition>().is_err());
        assert!("ten".parse::<AgeCondition>().is_err());
        assert!("-3".parse::<AgeCondition>().is_err());
        assert!("last notified+".parse::<AgeCondition>().is_err());
        assert!("last notified+0".parse::<AgeCondition>().is_err());
        assert!("last seen+4".parse::<AgeCondition>().is_err());
        assert!("last notified+5201".parse::<AgeCondition>().is_err());
        assert!("last notified+100000000".parse::<AgeCondition>().is_err());
        assert_eq!(
            "last notified+5200".parse(),
            Ok(AgeCondition::SinceLastSent { weeks: 5200 })
        );
    }

    #[test]
    fn test_serde_uses_text_form() {
        let json = serde_json::to_string(&AgeCondition::SinceLastSent { weeks: 12 }).unwrap();
        assert_eq!(json, r#""last notified+12""#);

        let parsed: AgeCondition = serde_json::from_str(r#""8""#).unwrap();
        assert_eq!(parsed, AgeCondition::ExactWeeks(8));

        assert!(serde_json::from_str::<AgeCondition>(r#""soon""#).is_err());
    }

    #[test]
    fn test_event_condition_matching() {
        let condition = EventCondition {
            vaccine: Some("Rabies".into()),
            min_age_weeks: Some(12),
            max_age_weeks: None,
        };
        assert!(condition.matches("rabies", Some(12)));
        assert!(!condition.matches("rabies", Some(11)));
        assert!(!condition.matches("DHPP", Some(20)));
        assert!(!condition.matches("rabies", None));

        let any = EventCondition::default();
        assert!(any.matches("anything", None));
    }

    #[test]
    fn test_is_exact_age() {
        let mut template = Template {
            id: 1,
            category: "deworming".into(),
            species: Some("dog".into()),
            name: "Puppy".into(),
            trigger: TemplateTrigger::Age {
                condition: AgeCondition::ExactWeeks(2),
            },
            subject: String::new(),
            body: String::new(),
            days_offset: 0,
            is_active: true,
        };
        assert!(template.is_exact_age());

        template.trigger = TemplateTrigger::Age {
            condition: AgeCondition::SinceLastSent { weeks: 4 },
        };
        assert!(!template.is_exact_age());
    }

    proptest! {
        #[test]
        fn prop_display_parses_back(weeks in 0u32..=MAX_RECURRENCE_WEEKS, recurring in any::<bool>()) {
            let condition = if recurring && weeks > 0 {
                AgeCondition::SinceLastSent { weeks }
            } else {
                AgeCondition::ExactWeeks(weeks)
            };
            prop_assert_eq!(condition.to_string().parse::<AgeCondition>(), Ok(condition));
        }

        #[test]
        fn prop_parse_never_panics(input in ".{0,40}") {
            let _ = input.parse::<AgeCondition>();
        }
    }
}
