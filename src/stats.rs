//! Rolling mood statistics over the journal.

use std::collections::HashSet;

use chrono::{Duration, FixedOffset, NaiveDate};
use serde::Serialize;

use crate::models::WellnessEntry;

/// Size of each trend window.
const TREND_WINDOW: usize = 7;
/// Entries each window needs before a trend is classified.
const TREND_MIN_ENTRIES: usize = 3;
/// Difference in mean mood that counts as a change.
const TREND_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MoodTrend {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodStats {
    pub total_entries: usize,
    pub average_mood: f64,
    pub streak_days: u32,
    pub mood_trend: MoodTrend,
}

pub fn compute_stats(entries: &[WellnessEntry], today: NaiveDate, offset: FixedOffset) -> MoodStats {
    MoodStats {
        total_entries: entries.len(),
        average_mood: average_mood(entries.iter()),
        streak_days: streak_days(entries, today, offset),
        mood_trend: mood_trend(entries),
    }
}

fn average_mood<'a>(entries: impl ExactSizeIterator<Item = &'a WellnessEntry>) -> f64 {
    let count = entries.len();
    if count == 0 {
        return 0.0;
    }
    let sum: i32 = entries.map(|e| e.mood.score()).sum();
    f64::from(sum) / count as f64
}

/// Consecutive calendar days with an entry, walking back from `today`.
fn streak_days(entries: &[WellnessEntry], today: NaiveDate, offset: FixedOffset) -> u32 {
    let days: HashSet<NaiveDate> = entries.iter().map(|e| e.local_date(offset)).collect();

    let mut streak = 0;
    let mut check_date = today;
    while days.contains(&check_date) {
        streak += 1;
        check_date -= Duration::days(1);
    }
    streak
}

/// Mean mood of the latest window against the window before it.
fn mood_trend(entries: &[WellnessEntry]) -> MoodTrend {
    let mut ordered: Vec<&WellnessEntry> = entries.iter().collect();
    ordered.sort_by_key(|e| (e.created_at, e.id));

    let split = ordered.len().saturating_sub(TREND_WINDOW);
    let (older, recent) = ordered.split_at(split);
    let older = &older[older.len().saturating_sub(TREND_WINDOW)..];

    if recent.len() < TREND_MIN_ENTRIES || older.len() < TREND_MIN_ENTRIES {
        return MoodTrend::Stable;
    }

    let recent_avg = average_mood(recent.iter().copied());
    let older_avg = average_mood(older.iter().copied());

    if recent_avg > older_avg + TREND_THRESHOLD {
        MoodTrend::Improving
    } else if recent_avg < older_avg - TREND_THRESHOLD {
        MoodTrend::Declining
    } else {
        MoodTrend::Stable
    }
}
