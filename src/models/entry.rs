use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub type EntryId = i64;

/// Five-point mood scale, very-sad (1) to very-happy (5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mood {
    VerySad,
    Sad,
    Neutral,
    Happy,
    VeryHappy,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::VerySad,
        Mood::Sad,
        Mood::Neutral,
        Mood::Happy,
        Mood::VeryHappy,
    ];

    pub fn score(self) -> i32 {
        match self {
            Mood::VerySad => 1,
            Mood::Sad => 2,
            Mood::Neutral => 3,
            Mood::Happy => 4,
            Mood::VeryHappy => 5,
        }
    }

    pub fn from_score(score: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|m| i64::from(m.score()) == score)
    }

    pub fn label(self) -> &'static str {
        match self {
            Mood::VerySad => "very-sad",
            Mood::Sad => "sad",
            Mood::Neutral => "neutral",
            Mood::Happy => "happy",
            Mood::VeryHappy => "very-happy",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.label() == label)
    }
}

/// One daily wellness check-in. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct WellnessEntry {
    pub id: EntryId,
    pub mood: Mood,
    #[validate(range(min = 1, max = 10, message = "Energy must be between 1 and 10"))]
    pub energy: Option<i32>,
    #[validate(range(min = 1, max = 10, message = "Sleep must be between 1 and 10"))]
    pub sleep: Option<i32>,
    #[validate(range(min = 1, max = 10, message = "Stress must be between 1 and 10"))]
    pub stress: Option<i32>,
    #[validate(length(max = 2000, message = "Notes must be under 2000 characters"))]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WellnessEntry {
    pub fn from_request(id: EntryId, created_at: DateTime<Utc>, req: CreateEntryRequest) -> Self {
        Self {
            id,
            mood: req.mood,
            energy: req.energy,
            sleep: req.sleep,
            stress: req.stress,
            notes: req.notes.filter(|n| !n.trim().is_empty()),
            created_at,
        }
    }

    /// Calendar day of the entry in the given fixed offset.
    pub fn local_date(&self, offset: FixedOffset) -> NaiveDate {
        self.created_at.with_timezone(&offset).date_naive()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    pub mood: Mood,
    pub energy: Option<i32>,
    pub sleep: Option<i32>,
    pub stress: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EntryQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Hands out ids from the creation time in epoch milliseconds, bumping past the
/// last issued id so two entries created in the same millisecond never collide.
#[derive(Debug, Default)]
pub struct EntryIdGenerator {
    last: AtomicI64,
}

impl EntryIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure future ids sort after an id already present in a store.
    pub fn observe(&self, id: EntryId) {
        self.last.fetch_max(id, Ordering::SeqCst);
    }

    pub fn next(&self, now: DateTime<Utc>) -> EntryId {
        let candidate = now.timestamp_millis();
        let mut last = self.last.load(Ordering::SeqCst);
        loop {
            let id = candidate.max(last + 1);
            match self
                .last
                .compare_exchange(last, id, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return id,
                Err(actual) => last = actual,
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::{Duration, TimeZone};

    pub fn noon(date: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
    }

    pub fn entry(id: EntryId, mood: Mood, created_at: DateTime<Utc>) -> WellnessEntry {
        WellnessEntry {
            id,
            mood,
            energy: Some(6),
            sleep: Some(7),
            stress: Some(3),
            notes: None,
            created_at,
        }
    }

    /// Entries one per day, oldest first, ending on `last_day`.
    pub fn daily_series(moods: &[Mood], last_day: NaiveDate) -> Vec<WellnessEntry> {
        let n = moods.len() as i64;
        moods
            .iter()
            .enumerate()
            .map(|(i, mood)| {
                let day = last_day - Duration::days(n - 1 - i as i64);
                entry(i as i64 + 1, *mood, noon(day))
            })
            .collect()
    }
}
