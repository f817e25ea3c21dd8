//! Census ingestion and the canonical employee record.
//!
//! RULE: column aliases are resolved ONCE here, at load time.
//! Calculators only ever see `EmployeeRecord` — they never look up
//! spreadsheet column names.

use crate::{
    error::{RatingError, RatingResult},
    types::{RatingAreaId, StateCode},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Family composition codes used by census files and rate tables.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum FamilyStatus {
    /// EE — employee only.
    #[default]
    #[serde(rename = "EE")]
    EmployeeOnly,
    /// ES — employee + spouse.
    #[serde(rename = "ES")]
    EmployeeSpouse,
    /// EC — employee + children.
    #[serde(rename = "EC")]
    EmployeeChildren,
    /// F — employee + spouse + children.
    #[serde(rename = "F")]
    Family,
}

impl FamilyStatus {
    pub const ALL: [FamilyStatus; 4] = [
        FamilyStatus::EmployeeOnly,
        FamilyStatus::EmployeeSpouse,
        FamilyStatus::EmployeeChildren,
        FamilyStatus::Family,
    ];

    pub fn code(self) -> &'static str {
        match self {
            FamilyStatus::EmployeeOnly => "EE",
            FamilyStatus::EmployeeSpouse => "ES",
            FamilyStatus::EmployeeChildren => "EC",
            FamilyStatus::Family => "F",
        }
    }

    /// Unknown or blank codes fall back to employee-only.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "ES" => FamilyStatus::EmployeeSpouse,
            "EC" => FamilyStatus::EmployeeChildren,
            "F" => FamilyStatus::Family,
            _ => FamilyStatus::EmployeeOnly,
        }
    }

    pub fn has_spouse(self) -> bool {
        matches!(self, FamilyStatus::EmployeeSpouse | FamilyStatus::Family)
    }

    pub fn has_children(self) -> bool {
        matches!(self, FamilyStatus::EmployeeChildren | FamilyStatus::Family)
    }
}

impl fmt::Display for FamilyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One employee row after alias resolution.
///
/// DOB fields stay as raw strings; the member resolver parses them
/// against the reference date and drops unparseable members softly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub state: Option<StateCode>,
    pub rating_area: Option<RatingAreaId>,
    /// Blank census cells stay `None`; readers use [`Self::status`],
    /// which defaults to employee-only.
    pub family_status: Option<FamilyStatus>,
    /// Direct age; takes precedence over `employee_dob`.
    pub age: Option<u32>,
    pub employee_dob: Option<String>,
    pub spouse_dob: Option<String>,
    /// Census dependent slots 2..=6.
    pub dependent_dobs: [Option<String>; 5],
    pub monthly_income: Option<f64>,
    pub current_ee_monthly: Option<f64>,
    pub current_er_monthly: Option<f64>,
    pub gap_insurance_monthly: Option<f64>,
    pub projected_renewal_monthly: Option<f64>,
}

impl EmployeeRecord {
    /// Family status with the employee-only fallback applied.
    pub fn status(&self) -> FamilyStatus {
        self.family_status.unwrap_or_default()
    }

    /// Count ALL covered lives on this row: the employee, the spouse for
    /// ES/F, and every dependent slot with a non-blank DOB for EC/F.
    ///
    /// This is intentionally broader than the rated-member list, which
    /// caps under-21 children at three.
    pub fn covered_lives(&self) -> u32 {
        let mut lives = 1;
        if self.status().has_spouse() {
            lives += 1;
        }
        if self.status().has_children() {
            lives += self
                .dependent_dobs
                .iter()
                .filter(|dob| dob.as_deref().is_some_and(|s| !s.trim().is_empty()))
                .count() as u32;
        }
        lives
    }
}

/// Per-state headcount rollup.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StateHeadcount {
    pub employees: u32,
    pub lives: u32,
}

/// An employer's census: the canonical record list.
#[derive(Debug, Clone, Default)]
pub struct Census {
    pub records: Vec<EmployeeRecord>,
}

impl Census {
    pub fn new(records: Vec<EmployeeRecord>) -> Self {
        Self { records }
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> RatingResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> RatingResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let columns = ColumnMap::resolve(&headers)?;

        let mut records = Vec::new();
        for row in csv_reader.records() {
            records.push(columns.record_from(&row?));
        }
        log::info!("census: loaded {} employees", records.len());
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True if at least one record carries a state code.
    pub fn has_state_data(&self) -> bool {
        self.records.iter().any(|r| r.state.is_some())
    }

    /// Unique states, most employees first (ties alphabetical).
    pub fn states_by_employee_count(&self) -> Vec<StateCode> {
        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for record in &self.records {
            if let Some(state) = record.state.as_deref() {
                *counts.entry(state).or_default() += 1;
            }
        }
        let mut states: Vec<(&str, u32)> = counts.into_iter().collect();
        states.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        states.into_iter().map(|(s, _)| s.to_string()).collect()
    }

    /// Employee and covered-lives counts per state.
    pub fn state_employee_counts(&self) -> BTreeMap<StateCode, StateHeadcount> {
        let mut result: BTreeMap<StateCode, StateHeadcount> = BTreeMap::new();
        for record in &self.records {
            let Some(state) = record.state.clone() else {
                continue;
            };
            let entry = result.entry(state).or_default();
            entry.employees += 1;
            entry.lives += record.covered_lives();
        }
        result
    }

    /// Total covered lives across the whole census.
    pub fn total_lives(&self) -> u32 {
        self.records.iter().map(EmployeeRecord::covered_lives).sum()
    }
}

/// Parse a census currency cell: strips `$`, thousands separators and
/// surrounding quotes. Blank or unparseable input is 0.0, never an error.
pub fn parse_currency(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '"'))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return 0.0;
    }
    cleaned.parse::<f64>().unwrap_or(0.0)
}

/// Parse a rating-area cell: a bare number, a float, or a
/// `Rating Area N` label.
pub fn parse_rating_area(raw: &str) -> Option<RatingAreaId> {
    let s = raw.trim();
    let s = s.strip_prefix("Rating Area ").unwrap_or(s);
    if let Ok(area) = s.parse::<u32>() {
        return Some(area);
    }
    s.parse::<f64>().ok().map(|f| f as u32)
}

// ── Column alias resolution ────────────────────────────────────

// Ordered candidate headers per concept; the first present wins.
const EMPLOYEE_ID_ALIASES: &[&str] = &["employee_id", "Employee Number", "emp_id"];
const FIRST_NAME_ALIASES: &[&str] = &["first_name", "First Name"];
const LAST_NAME_ALIASES: &[&str] = &["last_name", "Last Name"];
const STATE_ALIASES: &[&str] = &["Home State", "home_state", "state", "state_code", "State"];
const RATING_AREA_ALIASES: &[&str] = &["rating_area_id", "rating_area", "Rating Area"];
const FAMILY_STATUS_ALIASES: &[&str] = &["Family Status", "family_status"];
const AGE_ALIASES: &[&str] = &["age", "ee_age", "Age", "EE Age"];
const EMPLOYEE_DOB_ALIASES: &[&str] = &["EE DOB", "ee_dob", "dob"];
const SPOUSE_DOB_ALIASES: &[&str] = &["Spouse DOB", "spouse_dob"];
const INCOME_ALIASES: &[&str] = &["Monthly Income", "monthly_income", "income"];
const CURRENT_EE_ALIASES: &[&str] = &["current_ee_monthly", "Current EE Monthly"];
const CURRENT_ER_ALIASES: &[&str] = &["current_er_monthly", "Current ER Monthly"];
const GAP_INSURANCE_ALIASES: &[&str] = &["gap_insurance_monthly", "Gap Insurance"];
const RENEWAL_ALIASES: &[&str] = &["2026 Premium", "projected_2026_premium"];

struct ColumnMap {
    employee_id: Option<usize>,
    first_name: Option<usize>,
    last_name: Option<usize>,
    state: usize,
    rating_area: Option<usize>,
    family_status: Option<usize>,
    age: Option<usize>,
    employee_dob: Option<usize>,
    spouse_dob: Option<usize>,
    dependent_dobs: [Option<usize>; 5],
    monthly_income: Option<usize>,
    current_ee: Option<usize>,
    current_er: Option<usize>,
    gap_insurance: Option<usize>,
    renewal: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord) -> RatingResult<Self> {
        let find = |aliases: &[&str]| -> Option<usize> {
            aliases
                .iter()
                .find_map(|alias| headers.iter().position(|h| h.trim() == *alias))
        };

        let state = find(STATE_ALIASES).ok_or(RatingError::NoStateColumn)?;

        let mut dependent_dobs = [None; 5];
        for (i, slot) in dependent_dobs.iter_mut().enumerate() {
            let upper = format!("Dep {} DOB", i + 2);
            let lower = format!("dep_{}_dob", i + 2);
            *slot = headers
                .iter()
                .position(|h| h.trim() == upper || h.trim() == lower);
        }

        Ok(Self {
            employee_id: find(EMPLOYEE_ID_ALIASES),
            first_name: find(FIRST_NAME_ALIASES),
            last_name: find(LAST_NAME_ALIASES),
            state,
            rating_area: find(RATING_AREA_ALIASES),
            family_status: find(FAMILY_STATUS_ALIASES),
            age: find(AGE_ALIASES),
            employee_dob: find(EMPLOYEE_DOB_ALIASES),
            spouse_dob: find(SPOUSE_DOB_ALIASES),
            dependent_dobs,
            monthly_income: find(INCOME_ALIASES),
            current_ee: find(CURRENT_EE_ALIASES),
            current_er: find(CURRENT_ER_ALIASES),
            gap_insurance: find(GAP_INSURANCE_ALIASES),
            renewal: find(RENEWAL_ALIASES),
        })
    }

    fn record_from(&self, row: &csv::StringRecord) -> EmployeeRecord {
        let cell = |idx: Option<usize>| -> Option<&str> {
            idx.and_then(|i| row.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };
        let currency = |idx: Option<usize>| cell(idx).map(parse_currency);
        let owned = |idx: Option<usize>| cell(idx).map(str::to_string);

        let mut dependent_dobs: [Option<String>; 5] = Default::default();
        for (slot, idx) in dependent_dobs.iter_mut().zip(self.dependent_dobs) {
            *slot = cell(idx).map(str::to_string);
        }

        EmployeeRecord {
            employee_id: owned(self.employee_id).unwrap_or_default(),
            first_name: owned(self.first_name).unwrap_or_default(),
            last_name: owned(self.last_name).unwrap_or_default(),
            state: cell(Some(self.state)).map(|s| s.to_uppercase()),
            rating_area: cell(self.rating_area).and_then(parse_rating_area),
            family_status: cell(self.family_status).map(FamilyStatus::from_code),
            age: cell(self.age).and_then(|s| s.parse::<f64>().ok().map(|a| a as u32)),
            employee_dob: owned(self.employee_dob),
            spouse_dob: owned(self.spouse_dob),
            dependent_dobs,
            monthly_income: currency(self.monthly_income),
            current_ee_monthly: currency(self.current_ee),
            current_er_monthly: currency(self.current_er),
            gap_insurance_monthly: currency(self.gap_insurance),
            projected_renewal_monthly: currency(self.renewal),
        }
    }
}
