//! Timezone Clock Tool
//!
//! Current local time in an IANA zone. A few common city and country names
//! are accepted as aliases and resolved before validation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use smartagent_core::{
    Arguments, Result as CoreResult, Tool, ToolOutput, ToolSchema,
    tool::{ParameterSchema, str_arg},
};

use crate::error::{Result, ToolsError};

/// Lower-cased alias -> IANA zone
const CITY_ALIASES: &[(&str, &str)] = &[
    ("mumbai", "Asia/Kolkata"),
    ("bombay", "Asia/Kolkata"),
    ("delhi", "Asia/Kolkata"),
    ("new delhi", "Asia/Kolkata"),
    ("kolkata", "Asia/Kolkata"),
    ("bangalore", "Asia/Kolkata"),
    ("bengaluru", "Asia/Kolkata"),
    ("chennai", "Asia/Kolkata"),
    ("pune", "Asia/Kolkata"),
    ("hyderabad", "Asia/Kolkata"),
    ("india", "Asia/Kolkata"),
];

/// Resolve an alias or IANA name to a zone
pub fn resolve_timezone(name: &str) -> Result<Tz> {
    let lower = name.trim().to_lowercase();
    let canonical = CITY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map_or(name, |(_, zone)| zone);

    canonical
        .parse::<Tz>()
        .map_err(|_| ToolsError::UnknownTimezone)
}

/// Format `now` in the named zone, e.g. `2024-05-01 17:30:00 IST+0530`
pub fn format_in_zone(name: &str, now: DateTime<Utc>) -> Result<String> {
    let tz = resolve_timezone(name)?;
    Ok(now.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S %Z%z").to_string())
}

pub struct TimeInTimezoneTool;

#[async_trait]
impl Tool for TimeInTimezoneTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "time_in_timezone".into(),
            description: "Get current local time in a given IANA timezone (accepts common Indian city names like 'Mumbai' too).".into(),
            parameters: vec![ParameterSchema::required(
                "tz",
                "string",
                "IANA timezone such as 'Europe/Paris', or a city name like 'Mumbai'",
            )],
        }
    }

    async fn execute(&self, args: &Arguments) -> CoreResult<ToolOutput> {
        let tz = str_arg(args, "tz")?;
        Ok(format_in_zone(tz, Utc::now())?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_city_alias_resolves_to_kolkata() {
        assert_eq!(resolve_timezone("Mumbai").unwrap(), chrono_tz::Asia::Kolkata);
        assert_eq!(resolve_timezone("  new delhi ").unwrap(), chrono_tz::Asia::Kolkata);
        assert_eq!(resolve_timezone("Europe/London").unwrap(), chrono_tz::Europe::London);
    }

    #[test]
    fn test_unknown_zone() {
        let err = resolve_timezone("Nowhere").unwrap_err();
        assert_eq!(err, ToolsError::UnknownTimezone);
        assert!(
            format!("error: {err}").starts_with("error: unknown timezone"),
            "{err}"
        );
    }

    #[test]
    fn test_format() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(
            format_in_zone("Mumbai", now).unwrap(),
            "2024-05-01 17:30:00 IST+0530"
        );
        assert_eq!(
            format_in_zone("UTC", now).unwrap(),
            "2024-05-01 12:00:00 UTC+0000"
        );
    }

    #[tokio::test]
    async fn test_tool_reports_unknown_zone() {
        let mut registry = smartagent_core::ToolRegistry::new();
        registry.register(TimeInTimezoneTool);
        let args = serde_json::json!({"tz": "Nowhere"});

        let result = registry
            .invoke(&smartagent_core::ToolCall::new(
                "time_in_timezone",
                args.as_object().cloned().unwrap(),
            ))
            .await;

        assert_eq!(
            result.text(),
            Some("error: unknown timezone (use IANA tz like 'Asia/Kolkata')")
        );
    }
}
