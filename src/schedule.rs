use chrono::{DateTime, Utc};

use crate::sources::{LoadError, SiteSource, fetch_json};
use crate::types::{ScheduleEntry, parse_timestamp};

/// The site publishes its schedule under this (misspelled) name.
pub const SCHEDULE_PATH: &str = "shedule.json";

pub async fn load_schedule<S: SiteSource>(source: &S) -> Result<Vec<ScheduleEntry>, LoadError> {
    fetch_json(source, SCHEDULE_PATH).await
}

/// State of an entry's countdown at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Upcoming { hours: i64, minutes: i64, seconds: i64 },
    NowPlaying,
}

impl Countdown {
    pub fn at(target: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let remaining = (target - now).num_seconds();
        if remaining <= 0 {
            return Countdown::NowPlaying;
        }
        Countdown::Upcoming {
            hours: remaining / 3600,
            minutes: (remaining % 3600) / 60,
            seconds: remaining % 60,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Countdown::Upcoming {
                hours,
                minutes,
                seconds,
            } => format!("Starts in {hours}h {minutes}m {seconds}s"),
            Countdown::NowPlaying => String::from("Now Playing"),
        }
    }
}

impl ScheduleEntry {
    /// `None` when the entry has no countdown or it does not parse.
    pub fn countdown_at(&self, now: DateTime<Utc>) -> Option<Countdown> {
        let target = parse_timestamp(self.countdown.as_deref()?)?;
        Some(Countdown::at(target, now))
    }

    /// Compact "day • time • type" line.
    pub fn when_line(&self) -> String {
        [self.day.as_deref(), self.time.as_deref(), self.kind.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" \u{2022} ")
    }
}
