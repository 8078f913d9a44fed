use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use shared_database::{ResolvedColumns, Row, StoreError, Table, TableStore};
use shared_utils::{format_dmy, parse_dmy, parse_flexible_date};

use crate::models::{
    AllocationRequest, DaySession, Reservation, ScheduleError, ScheduleSlot, SlotOutcome,
    SlotStatus, SCHEDULE_SCHEMA,
};

/// Case and honorific insensitive key for provider names, so `dr meena iyer`
/// and `Dr. Meena Iyer` compare equal.
pub fn provider_key(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    if tokens.len() > 1 && (tokens[0] == "dr" || tokens[0] == "doctor") {
        tokens.remove(0);
    }
    tokens.join(" ")
}

/// A schedule row of the requested provider and day, with its position in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct DayRow {
    pub index: usize,
    pub provider: String,
    pub time: String,
    pub status: SlotStatus,
}

/// First available row, in store order.
pub fn find_single_slot(rows: &[DayRow]) -> Option<usize> {
    rows.iter().position(|row| row.status.is_available())
}

/// Start of the first pair of neighbouring rows that are both available and in
/// the same morning or afternoon block.
pub fn find_consecutive_pair(rows: &[DayRow]) -> Option<usize> {
    rows.windows(2).position(|pair| {
        let (first, second) = (&pair[0], &pair[1]);
        if !first.status.is_available() || !second.status.is_available() {
            return false;
        }
        match (DaySession::of_label(&first.time), DaySession::of_label(&second.time)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    })
}

fn day_rows(table: &Table, columns: &ResolvedColumns, provider: &str, date: NaiveDate) -> Vec<DayRow> {
    let wanted = provider_key(provider);
    table
        .rows
        .iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let row_provider = columns.text(row, "doctor")?;
            if provider_key(&row_provider) != wanted {
                return None;
            }
            let row_date = columns.text(row, "date").and_then(|d| parse_flexible_date(&d))?;
            if row_date != date {
                return None;
            }
            Some(DayRow {
                index,
                provider: row_provider,
                time: columns.text(row, "time").unwrap_or_default(),
                status: SlotStatus::parse(&columns.text(row, "status").unwrap_or_default()),
            })
        })
        .collect()
}

fn set_status(row: &mut Row, columns: &ResolvedColumns, status: &SlotStatus) {
    columns.set(row, "status", status.to_string());
}

/// Slot Allocator over the provider schedule store.
pub struct SlotAllocator {
    store: Arc<dyn TableStore>,
}

impl SlotAllocator {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    async fn load_resolved(&self) -> Result<(Table, ResolvedColumns), ScheduleError> {
        let table = self.store.load().await?;
        let columns = SCHEDULE_SCHEMA
            .resolve(&table.columns)
            .map_err(StoreError::from)?;
        Ok((table, columns))
    }

    /// Reserves one slot for a returning patient or two neighbouring same-block slots
    /// for a new one. Every reservation is saved before `Confirmed` is returned.
    pub async fn allocate(&self, request: &AllocationRequest) -> SlotOutcome {
        let Some(date) = parse_dmy(&request.date) else {
            return SlotOutcome::Error {
                message: ScheduleError::InvalidDate(request.date.clone()).to_string(),
            };
        };

        let (mut table, columns) = match self.load_resolved().await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("Schedule unusable for allocation: {}", e);
                return SlotOutcome::Error {
                    message: e.to_string(),
                };
            }
        };

        let rows = day_rows(&table, &columns, &request.provider, date);
        if rows.is_empty() {
            debug!("No schedule rows for {} on {}", request.provider, request.date);
            return SlotOutcome::Error {
                message: ScheduleError::NotScheduled {
                    provider: request.provider.clone(),
                    date: request.date.clone(),
                }
                .to_string(),
            };
        }

        let picked: Vec<&DayRow> = if request.classification.is_new() {
            match find_consecutive_pair(&rows) {
                Some(start) => vec![&rows[start], &rows[start + 1]],
                None => {
                    return SlotOutcome::Unavailable {
                        message: format!(
                            "No 1 hour slots available for {} on {}",
                            request.provider, request.date
                        ),
                    };
                }
            }
        } else {
            match find_single_slot(&rows) {
                Some(position) => vec![&rows[position]],
                None => {
                    return SlotOutcome::Unavailable {
                        message: format!(
                            "No available slots for {} on {}",
                            request.provider, request.date
                        ),
                    };
                }
            }
        };

        let booked = SlotStatus::BookedBy(request.patient_name.trim().to_string());
        for day_row in &picked {
            if let Some(row) = table.rows.get_mut(day_row.index) {
                set_status(row, &columns, &booked);
            }
        }

        if let Err(e) = self.store.save(&table).await {
            error!("Failed to persist reservation: {}", e);
            return SlotOutcome::Error {
                message: format!("error_writing_schedule: {}", e),
            };
        }

        let reservation = Reservation {
            provider: picked[0].provider.clone(),
            date: format_dmy(date),
            times: picked.iter().map(|row| row.time.clone()).collect(),
            location: request.location.clone(),
        };
        info!(
            "Reserved {} with {} on {} for a {} patient",
            reservation.time_label(),
            reservation.provider,
            reservation.date,
            request.classification
        );
        SlotOutcome::Confirmed(reservation)
    }

    /// Marks the reserved rows `Available` again. Returns how many rows changed.
    pub async fn release(&self, reservation: &Reservation) -> Result<usize, ScheduleError> {
        let date = parse_flexible_date(&reservation.date)
            .ok_or_else(|| ScheduleError::InvalidDate(reservation.date.clone()))?;
        let (mut table, columns) = self.load_resolved().await?;

        let targets: Vec<usize> = day_rows(&table, &columns, &reservation.provider, date)
            .into_iter()
            .filter(|row| {
                !row.status.is_available()
                    && reservation.times.iter().any(|time| time.trim() == row.time)
            })
            .map(|row| row.index)
            .collect();

        if targets.is_empty() {
            warn!(
                "No booked rows to release for {} on {}",
                reservation.provider, reservation.date
            );
            return Ok(0);
        }

        for index in &targets {
            if let Some(row) = table.rows.get_mut(*index) {
                set_status(row, &columns, &SlotStatus::Available);
            }
        }
        self.store.save(&table).await?;

        info!(
            "Released {} slot(s) of {} on {}",
            targets.len(),
            reservation.provider,
            reservation.date
        );
        Ok(targets.len())
    }

    /// Distinct provider names, in store order.
    pub async fn list_providers(&self) -> Result<Vec<String>, ScheduleError> {
        let (table, columns) = self.load_resolved().await?;
        let mut providers: Vec<String> = Vec::new();
        for row in &table.rows {
            if let Some(name) = columns.text(row, "doctor") {
                if !providers.iter().any(|known| provider_key(known) == provider_key(&name)) {
                    providers.push(name);
                }
            }
        }
        Ok(providers)
    }

    /// The schedule's spelling of `name`, if that provider is on the schedule.
    pub async fn match_provider(&self, name: &str) -> Result<Option<String>, ScheduleError> {
        let wanted = provider_key(name);
        if wanted.is_empty() {
            return Ok(None);
        }
        Ok(self
            .list_providers()
            .await?
            .into_iter()
            .find(|known| provider_key(known) == wanted))
    }

    pub async fn day_slots(&self, provider: &str, date: &str) -> Result<Vec<ScheduleSlot>, ScheduleError> {
        let day = parse_dmy(date).ok_or_else(|| ScheduleError::InvalidDate(date.to_string()))?;
        let (table, columns) = self.load_resolved().await?;
        let rows = day_rows(&table, &columns, provider, day);
        if rows.is_empty() {
            return Err(ScheduleError::NotScheduled {
                provider: provider.to_string(),
                date: date.to_string(),
            });
        }
        Ok(rows
            .into_iter()
            .map(|row| ScheduleSlot {
                session: DaySession::of_label(&row.time),
                provider: row.provider,
                date: format_dmy(day),
                time: row.time,
                status: row.status,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(slots: &[(&str, &str)]) -> Vec<DayRow> {
        slots
            .iter()
            .enumerate()
            .map(|(index, (time, status))| DayRow {
                index,
                provider: "Dr. X".to_string(),
                time: time.to_string(),
                status: SlotStatus::parse(status),
            })
            .collect()
    }

    #[test]
    fn test_single_slot_skips_booked() {
        let rows = day(&[("10:00-10:30", "Booked by A"), ("10:30-11:00", "Available")]);
        assert_eq!(find_single_slot(&rows), Some(1));
    }

    #[test]
    fn test_pair_requires_same_session() {
        let rows = day(&[
            ("11:30-12:00", "Available"),
            ("02:00-02:30", "Available"),
            ("02:30-03:00", "Available"),
        ]);
        assert_eq!(find_consecutive_pair(&rows), Some(1));
    }

    #[test]
    fn test_pair_requires_both_available() {
        let rows = day(&[
            ("10:00-10:30", "Available"),
            ("10:30-11:00", "Booked by A"),
            ("11:00-11:30", "Available"),
        ]);
        assert_eq!(find_consecutive_pair(&rows), None);
    }

    #[test]
    fn test_half_hour_labels_use_start_hour() {
        assert_eq!(DaySession::of_label("10:30-11:00"), Some(DaySession::Morning));
        assert_eq!(DaySession::of_label("2:30 PM - 3:00 PM"), Some(DaySession::Afternoon));
        assert_eq!(DaySession::of_label("15:00-15:30"), Some(DaySession::Afternoon));
        assert_eq!(DaySession::of_label("12:00-12:30"), None);
        assert_eq!(DaySession::of_label("09:00-09:30"), None);
    }

    #[test]
    fn test_status_parse_round_trips_labels() {
        assert_eq!(SlotStatus::parse(" available "), SlotStatus::Available);
        assert_eq!(
            SlotStatus::parse("Booked by Priya Sharma"),
            SlotStatus::BookedBy("Priya Sharma".to_string())
        );
        assert_eq!(SlotStatus::parse("Leave").to_string(), "Leave");
    }

    #[test]
    fn test_provider_key_ignores_title_and_case() {
        assert_eq!(provider_key("dr meena iyer"), provider_key("Dr. Meena  Iyer"));
        assert_ne!(provider_key("Dr. Meena Iyer"), provider_key("Dr. Ravi Varma"));
    }
}
