use std::env;

use chrono::Duration;
use log::*;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
const DEFAULT_REMINDER_LOOKAHEAD_HOURS: i64 = 24;
const DEFAULT_RATING_PROMPT_DELAY_MINS: i64 = 15;
const DEFAULT_LISTING_TTL_DAYS: i64 = 7;

#[derive(Clone, Debug)]
pub struct BotConfig {
    pub database_url: String,
    /// How often the scheduler worker polls for due events, reminders and expiries.
    pub poll_interval: std::time::Duration,
    /// How far ahead of expiry the one-shot reminder fires.
    pub reminder_lookahead: Duration,
    /// The grace period between mutual event confirmation and the rating prompts going out.
    pub rating_prompt_delay: Duration,
    /// Default lifetime of a new listing.
    pub listing_ttl: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            database_url: String::default(),
            poll_interval: std::time::Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            reminder_lookahead: Duration::hours(DEFAULT_REMINDER_LOOKAHEAD_HOURS),
            rating_prompt_delay: Duration::minutes(DEFAULT_RATING_PROMPT_DELAY_MINS),
            listing_ttl: Duration::days(DEFAULT_LISTING_TTL_DAYS),
        }
    }
}

impl BotConfig {
    pub fn from_env_or_default() -> Self {
        let database_url = env::var("TH_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ TH_DATABASE_URL is not set. Please set it to the URL for the Tradehall database.");
            String::default()
        });
        let poll_interval = std::time::Duration::from_secs(parse_env_number(
            "TH_POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL_SECS,
        ));
        let reminder_lookahead =
            Duration::hours(parse_env_number("TH_REMINDER_LOOKAHEAD_HOURS", DEFAULT_REMINDER_LOOKAHEAD_HOURS));
        let rating_prompt_delay =
            Duration::minutes(parse_env_number("TH_RATING_PROMPT_DELAY_MINS", DEFAULT_RATING_PROMPT_DELAY_MINS));
        let listing_ttl = Duration::days(parse_env_number("TH_LISTING_TTL_DAYS", DEFAULT_LISTING_TTL_DAYS));
        Self { database_url, poll_interval, reminder_lookahead, rating_prompt_delay, listing_ttl }
    }

    pub fn scheduler_config(&self) -> tradehall_engine::SchedulerConfig {
        tradehall_engine::SchedulerConfig {
            reminder_lookahead: self.reminder_lookahead,
            rating_prompt_delay: self.rating_prompt_delay,
        }
    }
}

fn parse_env_number<T>(name: &str, default: T) -> T
where T: std::str::FromStr + std::fmt::Display + Copy {
    match env::var(name) {
        Ok(s) => s.parse::<T>().unwrap_or_else(|_| {
            error!("🪛️ {s} is not a valid value for {name}. Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn malformed_values_fall_back_to_the_default() {
        env::set_var("TH_TEST_PARSE_A", "sixty");
        assert_eq!(parse_env_number("TH_TEST_PARSE_A", 60u64), 60);
        env::set_var("TH_TEST_PARSE_B", "90");
        assert_eq!(parse_env_number("TH_TEST_PARSE_B", 60u64), 90);
        assert_eq!(parse_env_number("TH_TEST_PARSE_MISSING", 7i64), 7);
    }
}
