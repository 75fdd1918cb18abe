// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Fan-out from primary records into calendar events, reminders and bills.
//!
//! Every dependent write is best effort. A failure is logged, recorded in
//! the returned [`SyncReport`] and never propagated, so the primary write
//! that triggered the sync always stands. Dependents are keyed by
//! `(user_id, reference_id, reference_type)`; there is at most one of each
//! kind per key.

use crate::bills;
use crate::models::{
    CalendarEvent, Category, DependentStatus, FinancialRecord, Frequency, OriginChain, RecordStatus,
    ReferenceType, Reminder,
};
use crate::recurrence::project;
use crate::schedule;
use crate::utils::default_reminder_time;
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, warn};

/// Back-reference from a dependent record to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ReferenceKey {
    pub reference_id: i64,
    pub reference_type: ReferenceType,
}

impl ReferenceKey {
    pub fn new(reference_id: i64, reference_type: ReferenceType) -> Self {
        ReferenceKey {
            reference_id,
            reference_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub target: ReferenceType,
    pub key: ReferenceKey,
    pub message: String,
}

/// What a sync pass did. Failures are partial: everything else still ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: u32,
    pub updated: u32,
    pub deleted: u32,
    pub skipped: u32,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn merge(&mut self, other: SyncReport) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn record(&mut self, outcome: Upsert) {
        match outcome {
            Upsert::Created(_) => self.created += 1,
            Upsert::Updated(_) => self.updated += 1,
        }
    }

    /// Log and keep a failed dependent write.
    pub(crate) fn fail(&mut self, target: ReferenceType, key: ReferenceKey, err: anyhow::Error) {
        warn!(
            target_type = %target,
            reference_id = key.reference_id,
            reference_type = %key.reference_type,
            "sync failed: {:#}",
            err
        );
        self.failures.push(SyncFailure {
            target,
            key,
            message: format!("{:#}", err),
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created(i64),
    Updated(i64),
}

/// The denormalized view of a source that its dependents carry.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub user_id: String,
    pub key: ReferenceKey,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Already projected to the next occurrence.
    pub date: NaiveDate,
    pub repeat: bool,
    pub frequency: Option<Frequency>,
    pub calendar_status: DependentStatus,
    pub reminder_status: DependentStatus,
    pub origin: OriginChain,
}

/// Calendar and reminder status for a source record status.
pub fn status_for(source: RecordStatus) -> (DependentStatus, DependentStatus) {
    match source {
        RecordStatus::Paid => (DependentStatus::Completed, DependentStatus::Paused),
        RecordStatus::Cancelled => (DependentStatus::Cancelled, DependentStatus::Cancelled),
        RecordStatus::Active => (DependentStatus::Active, DependentStatus::Active),
    }
}

/// Calendar status mirrored from a reminder; a paused reminder means the
/// underlying obligation is settled.
fn calendar_status_from_reminder(s: DependentStatus) -> DependentStatus {
    match s {
        DependentStatus::Paused => DependentStatus::Completed,
        other => other,
    }
}

/// Build the projection of a financial record, or `None` when it has no
/// usable date.
pub fn project_record(record: &FinancialRecord, today: NaiveDate) -> Option<Projection> {
    let anchor = record.target_date()?;
    let (calendar_status, reminder_status) = status_for(record.status);
    let repeat = record.is_recurring();
    // Settled and cancelled sources keep the date they were settled against.
    let date = if repeat && record.status == RecordStatus::Active {
        project(anchor, record.frequency, today)
    } else {
        anchor
    };
    let description = match (&record.provider, record.amount) {
        (Some(p), Some(a)) => Some(format!("{} - {}", p, a.round_dp(2))),
        (Some(p), None) => Some(p.clone()),
        (None, Some(a)) => Some(a.round_dp(2).to_string()),
        (None, None) => None,
    };
    Some(Projection {
        user_id: record.user_id.clone(),
        key: ReferenceKey::new(record.id, ReferenceType::Record),
        title: format!("{} ({})", record.name, record.category),
        description,
        category: Some(record.category.to_string()),
        date,
        repeat,
        frequency: record.frequency.filter(|f| f.months().is_some()),
        calendar_status,
        reminder_status,
        origin: OriginChain::root(ReferenceType::Record),
    })
}

pub fn upsert_calendar(conn: &Connection, p: &Projection) -> Result<Upsert> {
    match schedule::find_calendar_by_reference(conn, &p.user_id, p.key)? {
        Some(mut existing) => {
            existing.title = p.title.clone();
            existing.description = p.description.clone();
            existing.date = p.date;
            existing.category = p.category.clone();
            existing.status = p.calendar_status;
            existing.repeat = p.repeat;
            existing.frequency = p.frequency;
            existing.origin_chain = p.origin.clone();
            schedule::update_calendar(conn, &existing)?;
            Ok(Upsert::Updated(existing.id))
        }
        None => {
            let event = CalendarEvent {
                id: 0,
                user_id: p.user_id.clone(),
                title: p.title.clone(),
                description: p.description.clone(),
                date: p.date,
                category: p.category.clone(),
                status: p.calendar_status,
                repeat: p.repeat,
                frequency: p.frequency,
                reference_id: Some(p.key.reference_id),
                reference_type: Some(p.key.reference_type),
                origin_chain: p.origin.clone(),
            };
            Ok(Upsert::Created(schedule::insert_calendar(conn, &event)?))
        }
    }
}

pub fn upsert_reminder(conn: &Connection, p: &Projection) -> Result<Upsert> {
    match schedule::find_reminder_by_reference(conn, &p.user_id, p.key)? {
        Some(mut existing) => {
            existing.title = p.title.clone();
            existing.message = p.description.clone();
            // Keep a user-chosen time of day, move only the date.
            existing.date_time = p.date.and_time(existing.date_time.time());
            existing.status = p.reminder_status;
            existing.repeat = p.repeat;
            existing.frequency = p.frequency;
            existing.origin_chain = p.origin.clone();
            schedule::update_reminder(conn, &existing)?;
            Ok(Upsert::Updated(existing.id))
        }
        None => {
            let reminder = Reminder {
                id: 0,
                user_id: p.user_id.clone(),
                title: p.title.clone(),
                message: p.description.clone(),
                date_time: p.date.and_time(default_reminder_time()),
                status: p.reminder_status,
                repeat: p.repeat,
                frequency: p.frequency,
                reference_id: Some(p.key.reference_id),
                reference_type: Some(p.key.reference_type),
                origin_chain: p.origin.clone(),
            };
            Ok(Upsert::Created(schedule::insert_reminder(conn, &reminder)?))
        }
    }
}

/// Fan a financial record out to its calendar event, reminder and, for
/// bill checklists, its linked bill.
pub fn sync_record(conn: &Connection, record: &FinancialRecord, today: NaiveDate) -> SyncReport {
    let mut report = SyncReport::default();
    let key = ReferenceKey::new(record.id, ReferenceType::Record);
    let Some(p) = project_record(record, today) else {
        debug!(record = record.id, "no target date, skipping sync");
        report.skipped += 1;
        return report;
    };

    match upsert_calendar(conn, &p) {
        Ok(o) => report.record(o),
        Err(e) => report.fail(ReferenceType::Calendar, key, e),
    }
    match upsert_reminder(conn, &p) {
        Ok(o) => report.record(o),
        Err(e) => report.fail(ReferenceType::Reminder, key, e),
    }
    if record.category == Category::DailyBillChecklist {
        match bills::upsert_from_record(conn, record, p.date) {
            Ok(Some(o)) => report.record(o),
            Ok(None) => report.skipped += 1,
            Err(e) => report.fail(ReferenceType::Bill, key, e),
        }
    }
    report
}

/// Key a dependent propagates under: its own source's key when it has one
/// (so a record's event and reminder stay siblings), else itself.
fn propagation_key(
    own_id: i64,
    own_type: ReferenceType,
    reference_id: Option<i64>,
    reference_type: Option<ReferenceType>,
) -> ReferenceKey {
    match (reference_id, reference_type) {
        (Some(id), Some(t)) => ReferenceKey::new(id, t),
        _ => ReferenceKey::new(own_id, own_type),
    }
}

/// Mirror a calendar event into its reminder, unless the event itself
/// descends from a reminder.
pub fn propagate_calendar(conn: &Connection, event: &CalendarEvent, today: NaiveDate) -> SyncReport {
    let mut report = SyncReport::default();
    let chain = event.origin_chain.extended(ReferenceType::Calendar);
    let key = propagation_key(
        event.id,
        ReferenceType::Calendar,
        event.reference_id,
        event.reference_type,
    );
    if event.origin_chain.contains(ReferenceType::Reminder) {
        debug!(event = event.id, chain = %chain, "reminder already in origin chain");
        report.skipped += 1;
        return report;
    }
    let date = if event.repeat {
        project(event.date, event.frequency, today)
    } else {
        event.date
    };
    let reminder_status = match event.status {
        DependentStatus::Completed => DependentStatus::Paused,
        other => other,
    };
    let p = Projection {
        user_id: event.user_id.clone(),
        key,
        title: event.title.clone(),
        description: event.description.clone(),
        category: event.category.clone(),
        date,
        repeat: event.repeat,
        frequency: event.frequency,
        calendar_status: event.status,
        reminder_status,
        origin: chain,
    };
    match upsert_reminder(conn, &p) {
        Ok(o) => report.record(o),
        Err(e) => report.fail(ReferenceType::Reminder, key, e),
    }
    report
}

/// Mirror a reminder into its calendar event, unless the reminder itself
/// descends from a calendar event.
pub fn propagate_reminder(conn: &Connection, reminder: &Reminder, today: NaiveDate) -> SyncReport {
    let mut report = SyncReport::default();
    let chain = reminder.origin_chain.extended(ReferenceType::Reminder);
    let key = propagation_key(
        reminder.id,
        ReferenceType::Reminder,
        reminder.reference_id,
        reminder.reference_type,
    );
    if reminder.origin_chain.contains(ReferenceType::Calendar) {
        debug!(reminder = reminder.id, chain = %chain, "calendar already in origin chain");
        report.skipped += 1;
        return report;
    }
    let date = if reminder.repeat {
        project(reminder.date_time.date(), reminder.frequency, today)
    } else {
        reminder.date_time.date()
    };
    let p = Projection {
        user_id: reminder.user_id.clone(),
        key,
        title: reminder.title.clone(),
        description: reminder.message.clone(),
        category: None,
        date,
        repeat: reminder.repeat,
        frequency: reminder.frequency,
        calendar_status: calendar_status_from_reminder(reminder.status),
        reminder_status: reminder.status,
        origin: chain,
    };
    match upsert_calendar(conn, &p) {
        Ok(o) => report.record(o),
        Err(e) => report.fail(ReferenceType::Calendar, key, e),
    }
    report
}

/// Remove every calendar event and reminder pointing at `key`. Best effort:
/// a failed delete is reported and the next kind is still attempted.
pub fn cascade_delete(conn: &Connection, user_id: &str, key: ReferenceKey) -> SyncReport {
    let mut report = SyncReport::default();
    match schedule::delete_calendar_by_reference(conn, user_id, key) {
        Ok(n) => report.deleted += n as u32,
        Err(e) => report.fail(ReferenceType::Calendar, key, e),
    }
    match schedule::delete_reminders_by_reference(conn, user_id, key) {
        Ok(n) => report.deleted += n as u32,
        Err(e) => report.fail(ReferenceType::Reminder, key, e),
    }
    report
}
