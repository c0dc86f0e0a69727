//! Daily / weekly task planning and the end-of-week retrospective.

use crate::calendar::{iso_week_data, IsoWeekData};
use crate::error::{FinancePlannerError, Result};
use chrono::{Days, NaiveDate};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
    Skipped,
}

impl TaskStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, TaskStatus::Todo | TaskStatus::InProgress)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanItem {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub estimated_minutes: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub carried_over_from: Option<NaiveDate>,
}

impl PlanItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            date,
            priority: Priority::default(),
            status: TaskStatus::default(),
            estimated_minutes: None,
            notes: None,
            carried_over_from: None,
        }
    }
}

/// Time actually spent, optionally tied to a plan item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualEntry {
    #[serde(default)]
    pub plan_item_id: Option<String>,
    pub date: NaiveDate,
    pub minutes: u32,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub planned: usize,
    pub completed: usize,
    pub skipped: usize,
    pub completion_rate: f64,
    pub planned_minutes: u32,
    pub actual_minutes: u32,
}

fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

pub fn day_summary(date: NaiveDate, items: &[PlanItem], entries: &[ActualEntry]) -> DaySummary {
    let todays: Vec<&PlanItem> = items.iter().filter(|i| i.date == date).collect();
    let completed = todays.iter().filter(|i| i.status == TaskStatus::Done).count();

    DaySummary {
        date,
        planned: todays.len(),
        completed,
        skipped: todays
            .iter()
            .filter(|i| i.status == TaskStatus::Skipped)
            .count(),
        completion_rate: rate(completed, todays.len()),
        planned_minutes: todays.iter().filter_map(|i| i.estimated_minutes).sum(),
        actual_minutes: entries
            .iter()
            .filter(|e| e.date == date)
            .map(|e| e.minutes)
            .sum(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub date: NaiveDate,
    pub items: Vec<PlanItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekPlan {
    pub week: IsoWeekData,
    pub days: Vec<DayPlan>,
}

fn week_days(week: IsoWeekData) -> Result<Vec<NaiveDate>> {
    let (monday, _) = week.bounds()?;
    (0..7u64)
        .map(|offset| {
            monday.checked_add_days(Days::new(offset)).ok_or_else(|| {
                FinancePlannerError::DateError(format!("Week {} overflows the calendar", week))
            })
        })
        .collect()
}

/// Monday-to-Sunday view of the week; each day's items sorted by priority (high first), then title.
pub fn week_plan(week: IsoWeekData, items: &[PlanItem]) -> Result<WeekPlan> {
    let days = week_days(week)?
        .into_iter()
        .map(|date| {
            let mut day_items: Vec<PlanItem> =
                items.iter().filter(|i| i.date == date).cloned().collect();
            day_items.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.title.cmp(&b.title)));
            DayPlan {
                date,
                items: day_items,
            }
        })
        .collect();

    Ok(WeekPlan { week, days })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyRetrospective {
    pub week: IsoWeekData,
    pub days: Vec<DaySummary>,
    pub total_planned: usize,
    pub total_completed: usize,
    pub completion_rate: f64,
    pub high_priority_completion_rate: f64,
    /// Day with the highest completion rate among days that had a plan.
    pub best_day: Option<NaiveDate>,
    /// Actual minutes over estimated minutes for completed items that have both, in percent.
    pub estimate_accuracy_percent: Option<f64>,
    pub unfinished: Vec<PlanItem>,
}

pub fn retrospective(
    week: IsoWeekData,
    items: &[PlanItem],
    entries: &[ActualEntry],
) -> Result<WeeklyRetrospective> {
    let week_items: Vec<PlanItem> = items
        .iter()
        .filter(|i| iso_week_data(i.date) == week)
        .cloned()
        .collect();
    let week_entries: Vec<ActualEntry> = entries
        .iter()
        .filter(|e| iso_week_data(e.date) == week)
        .cloned()
        .collect();

    let days: Vec<DaySummary> = week_days(week)?
        .into_iter()
        .map(|date| day_summary(date, &week_items, &week_entries))
        .collect();

    let total_planned = week_items.len();
    let total_completed = week_items
        .iter()
        .filter(|i| i.status == TaskStatus::Done)
        .count();

    let high: Vec<&PlanItem> = week_items
        .iter()
        .filter(|i| i.priority == Priority::High)
        .collect();
    let high_done = high.iter().filter(|i| i.status == TaskStatus::Done).count();

    let best_day = days
        .iter()
        .filter(|d| d.planned > 0)
        .fold(None::<&DaySummary>, |best, d| match best {
            Some(b) if b.completion_rate >= d.completion_rate => Some(b),
            _ => Some(d),
        })
        .map(|d| d.date);

    let retro = WeeklyRetrospective {
        week,
        total_planned,
        total_completed,
        completion_rate: rate(total_completed, total_planned),
        high_priority_completion_rate: rate(high_done, high.len()),
        best_day,
        estimate_accuracy_percent: estimate_accuracy(&week_items, &week_entries),
        unfinished: week_items
            .iter()
            .filter(|i| i.status.is_open())
            .cloned()
            .collect(),
        days,
    };

    debug!(
        "Retrospective {}: {}/{} done, {} unfinished",
        week,
        retro.total_completed,
        retro.total_planned,
        retro.unfinished.len()
    );

    Ok(retro)
}

fn estimate_accuracy(items: &[PlanItem], entries: &[ActualEntry]) -> Option<f64> {
    let mut actual_by_item: HashMap<&str, u32> = HashMap::new();
    for entry in entries {
        if let Some(id) = entry.plan_item_id.as_deref() {
            *actual_by_item.entry(id).or_default() += entry.minutes;
        }
    }

    let (estimated, actual) = items
        .iter()
        .filter(|i| i.status == TaskStatus::Done)
        .filter_map(|i| {
            let estimate = i.estimated_minutes.filter(|m| *m > 0)?;
            let spent = actual_by_item.get(i.id.as_str())?;
            Some((estimate, *spent))
        })
        .fold((0u32, 0u32), |(e, a), (ei, ai)| (e + ei, a + ai));

    (estimated > 0).then(|| actual as f64 / estimated as f64 * 100.0)
}

/// Open items dated before `to` are moved to `to`, remembering their original date.
pub fn carry_over(items: &[PlanItem], to: NaiveDate) -> Vec<PlanItem> {
    items
        .iter()
        .filter(|i| i.status.is_open() && i.date < to)
        .map(|i| PlanItem {
            date: to,
            carried_over_from: Some(i.carried_over_from.unwrap_or(i.date)),
            ..i.clone()
        })
        .collect()
}
