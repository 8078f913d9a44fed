use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use shared_database::{ResolvedColumns, Row, StoreError, Table, TableStore};
use shared_utils::{format_dmy, parse_flexible_date};

use crate::models::{MatchKind, MatchedPatient, PatientLookup, PATIENT_SCHEMA};

const HONORIFICS: [&str; 4] = ["dr", "mr", "mrs", "ms"];

/// Lower-cases, strips ASCII punctuation, drops leading honorifics and collapses
/// whitespace. Applying it twice gives the same result as applying it once.
pub fn normalize_name(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();

    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    while tokens.len() > 1 && HONORIFICS.contains(&tokens[0]) {
        tokens.remove(0);
    }
    tokens.join(" ")
}

/// Normalized name with its tokens sorted alphabetically.
pub fn token_sort_key(name: &str) -> String {
    let normalized = normalize_name(name);
    let mut tokens: Vec<&str> = normalized.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Token-order-insensitive similarity in `[0, 1]`: Sørensen-Dice over character
/// bigrams of the token-sorted names.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    strsim::sorensen_dice(&token_sort_key(a), &token_sort_key(b))
}

fn round3(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

fn matched_patient(columns: &ResolvedColumns, row: &Row, dob: NaiveDate) -> MatchedPatient {
    MatchedPatient {
        name: columns.text(row, "name").unwrap_or_default(),
        dob: format_dmy(dob),
        location: columns.text(row, "location"),
        insurance_carrier: columns.text(row, "insurance_carrier"),
        member_id: columns.text(row, "member_id"),
        group: columns.text(row, "group"),
    }
}

/// Classifies `(name, dob)` against a loaded patient table. Never fails: schema
/// problems degrade to a `new` classification with the reason attached.
pub fn resolve_identity(table: &Table, name: &str, dob: NaiveDate, threshold: f64) -> PatientLookup {
    let columns = match PATIENT_SCHEMA.resolve(&table.columns) {
        Ok(columns) => columns,
        Err(e) => {
            warn!("Patient lookup skipped: {}", e);
            return PatientLookup::new_patient(format!("Patient store unusable: {}", e));
        }
    };

    let candidate = normalize_name(name);

    // only rows with the claimed date of birth are ever candidates
    let same_dob: Vec<&Row> = table
        .rows
        .iter()
        .filter(|row| {
            columns
                .text(row, "dob")
                .and_then(|value| parse_flexible_date(&value))
                == Some(dob)
        })
        .collect();

    let exact: Vec<&Row> = same_dob
        .iter()
        .copied()
        .filter(|row| {
            columns
                .text(row, "name")
                .map(|stored| normalize_name(&stored) == candidate)
                .unwrap_or(false)
        })
        .collect();

    if let Some(&first) = exact.first() {
        let duplicates = exact.len() - 1;
        debug!("Exact identity match with {} duplicate(s)", duplicates);
        return PatientLookup::returning(
            matched_patient(&columns, first, dob),
            MatchKind::Exact,
            1.0,
            duplicates,
        );
    }

    let mut best: Option<(&Row, f64)> = None;
    for &row in &same_dob {
        let Some(stored) = columns.text(row, "name") else {
            continue;
        };
        let score = name_similarity(name, &stored);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((row, score));
        }
    }

    match best {
        Some((row, score)) if score >= threshold => {
            debug!("Fuzzy identity match scored {:.3}", score);
            PatientLookup::returning(
                matched_patient(&columns, row, dob),
                MatchKind::Fuzzy,
                round3(score),
                0,
            )
        }
        Some((_, score)) => {
            debug!("Best fuzzy score {:.3} below threshold {}", score, threshold);
            PatientLookup::new_patient("No match above threshold.")
        }
        None => PatientLookup::new_patient("No match above threshold."),
    }
}

/// Identity Resolver over the patient store.
pub struct IdentityResolver {
    store: Arc<dyn TableStore>,
    threshold: f64,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn TableStore>, threshold: f64) -> Self {
        Self { store, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub async fn lookup(&self, name: Option<&str>, dob: Option<&str>) -> PatientLookup {
        let name = name.map(str::trim).filter(|n| !normalize_name(n).is_empty());
        let dob = dob.and_then(parse_flexible_date);

        let (Some(name), Some(dob)) = (name, dob) else {
            debug!("Patient lookup without a usable name and date of birth");
            return PatientLookup::new_patient("Insufficient info for lookup.");
        };

        let table = match self.store.load().await {
            Ok(table) => table,
            Err(StoreError::Missing { location, .. }) => {
                warn!("Patient store not found at {}", location);
                return PatientLookup::new_patient("Patient DB not found; treating as new.");
            }
            Err(e) => {
                warn!("Patient store could not be read: {}", e);
                return PatientLookup::new_patient(format!("Patient DB unreadable: {}", e));
            }
        };

        let lookup = resolve_identity(&table, name, dob, self.threshold);
        info!(
            "Patient lookup classified as {} ({})",
            lookup.status, lookup.reason
        );
        lookup
    }
}
