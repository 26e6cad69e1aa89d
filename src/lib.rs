use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use chrono::{Datelike, NaiveDate};

mod field_regex;

use field_regex::FieldRegex;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Pattern(String),
    AssertionFailed {
        subject: String,
        expected: String,
        actual: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(msg) => write!(f, "pattern error: {msg}"),
            Self::AssertionFailed {
                subject,
                expected,
                actual,
            } => write!(
                f,
                "assertion failed for {subject}: expected {expected}, actual {actual}"
            ),
        }
    }
}

impl StdError for Error {}

pub mod alert_text {
    pub const REQUIRED: &str = "Required field";
    pub const CHARSET: &str = "Alphanumeric characters only";
    pub const CAR_YEAR: &str = "Enter a valid year";
    pub const FUTURE_DATE: &str = "Enter future date";
    pub const DAY_RANGE: &str = "Up to 30 days";
    pub const CARD: &str = "Invalid Card";
    pub const CVV_DIGITS: &str = "Must be three digits";
    pub const EXPIRATION: &str = "Enter valid expiration date";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKey {
    Name,
    CarYear,
    CarMake,
    CarModel,
    StartDate,
    Days,
    CreditCard,
    Cvv,
    Expiration,
}

impl FieldKey {
    pub const ALL: [Self; 9] = [
        Self::Name,
        Self::CarYear,
        Self::CarMake,
        Self::CarModel,
        Self::StartDate,
        Self::Days,
        Self::CreditCard,
        Self::Cvv,
        Self::Expiration,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::CarYear => "car-year",
            Self::CarMake => "car-make",
            Self::CarModel => "car-model",
            Self::StartDate => "start-date",
            Self::Days => "days",
            Self::CreditCard => "credit-card",
            Self::Cvv => "cvv",
            Self::Expiration => "expiration",
        }
    }

    pub fn alert_catalog(self) -> &'static [&'static str] {
        use alert_text::*;
        match self {
            Self::Name => &[REQUIRED, CHARSET],
            Self::CarYear => &[REQUIRED, CAR_YEAR],
            Self::CarMake => &[REQUIRED, CHARSET],
            Self::CarModel => &[REQUIRED],
            Self::StartDate => &[REQUIRED, FUTURE_DATE],
            Self::Days => &[REQUIRED, DAY_RANGE],
            Self::CreditCard => &[REQUIRED, CARD],
            Self::Cvv => &[REQUIRED, CVV_DIGITS],
            Self::Expiration => &[REQUIRED, EXPIRATION],
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues {
    values: BTreeMap<FieldKey, String>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: FieldKey, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    pub fn get(&self, key: FieldKey) -> &str {
        self.values.get(&key).map_or("", String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    MissingValue,
    BadFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    active: BTreeMap<FieldKey, Vec<&'static str>>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.active.values().all(Vec::is_empty)
    }

    pub fn messages(&self, key: FieldKey) -> &[&'static str] {
        self.active.get(&key).map_or(&[], Vec::as_slice)
    }

    pub fn validity(&self, key: FieldKey) -> Validity {
        let messages = self.messages(key);
        if messages.is_empty() {
            Validity::Valid
        } else if messages.contains(&alert_text::REQUIRED) {
            Validity::MissingValue
        } else {
            Validity::BadFormat
        }
    }

    fn record(&mut self, key: FieldKey, messages: Vec<&'static str>) {
        self.active.insert(key, messages);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub start: NaiveDate,
    pub days: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Danger,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Danger => "danger",
            Self::Warning => "warning",
        }
    }
}

pub trait PageDisplay {
    fn show_message(&mut self, field: FieldKey, text: &str, severity: Severity);
    fn clear_message(&mut self, field: FieldKey, text: &str);
    fn mark_field_valid(&mut self, field: FieldKey);
    fn mark_field_invalid(&mut self, field: FieldKey);
    fn display_cost(&mut self, total: u32);
    fn erase_cost(&mut self);
}

#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    alerts: BTreeMap<FieldKey, Vec<(String, Severity)>>,
    marks: BTreeMap<FieldKey, bool>,
    cost_line: Option<String>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visible_alerts(&self, field: FieldKey) -> Vec<(&str, Severity)> {
        self.alerts.get(&field).map_or_else(Vec::new, |alerts| {
            alerts
                .iter()
                .map(|(text, severity)| (text.as_str(), *severity))
                .collect()
        })
    }

    pub fn visible_messages(&self, field: FieldKey) -> Vec<&str> {
        self.visible_alerts(field)
            .into_iter()
            .map(|(text, _)| text)
            .collect()
    }

    pub fn is_marked_valid(&self, field: FieldKey) -> Option<bool> {
        self.marks.get(&field).copied()
    }

    pub fn cost_text(&self) -> Option<&str> {
        self.cost_line.as_deref()
    }

    pub fn assert_messages(&self, field: FieldKey, expected: &[&str]) -> Result<()> {
        let actual = self.visible_messages(field);
        if actual == expected {
            Ok(())
        } else {
            Err(Error::AssertionFailed {
                subject: field.as_str().to_string(),
                expected: format!("{expected:?}"),
                actual: format!("{actual:?}"),
            })
        }
    }

    pub fn assert_marked(&self, field: FieldKey, valid: bool) -> Result<()> {
        let actual = self.is_marked_valid(field);
        if actual == Some(valid) {
            Ok(())
        } else {
            Err(Error::AssertionFailed {
                subject: field.as_str().to_string(),
                expected: format!("marked valid = {valid}"),
                actual: match actual {
                    Some(value) => format!("marked valid = {value}"),
                    None => "unmarked".to_string(),
                },
            })
        }
    }

    pub fn assert_cost_text(&self, expected: &str) -> Result<()> {
        match self.cost_line.as_deref() {
            Some(actual) if actual == expected => Ok(()),
            other => Err(Error::AssertionFailed {
                subject: "total-display".to_string(),
                expected: expected.to_string(),
                actual: other.unwrap_or("<empty>").to_string(),
            }),
        }
    }

    pub fn assert_no_cost(&self) -> Result<()> {
        match self.cost_line.as_deref() {
            None => Ok(()),
            Some(actual) => Err(Error::AssertionFailed {
                subject: "total-display".to_string(),
                expected: "<empty>".to_string(),
                actual: actual.to_string(),
            }),
        }
    }
}

impl PageDisplay for RecordingDisplay {
    fn show_message(&mut self, field: FieldKey, text: &str, severity: Severity) {
        let alerts = self.alerts.entry(field).or_default();
        // One alert entry per message text, however many passes run.
        if alerts.iter().all(|(existing, _)| existing != text) {
            alerts.push((text.to_string(), severity));
        }
    }

    fn clear_message(&mut self, field: FieldKey, text: &str) {
        if let Some(alerts) = self.alerts.get_mut(&field) {
            alerts.retain(|(existing, _)| existing != text);
        }
    }

    fn mark_field_valid(&mut self, field: FieldKey) {
        self.marks.insert(field, true);
    }

    fn mark_field_invalid(&mut self, field: FieldKey) {
        self.marks.insert(field, false);
    }

    fn display_cost(&mut self, total: u32) {
        self.cost_line = Some(format!("Your total cost is ${total}.00."));
    }

    fn erase_cost(&mut self) {
        self.cost_line = None;
    }
}

#[derive(Debug, Clone)]
pub struct Validator {
    today: NaiveDate,
    name_charset: FieldRegex,
    car_charset: FieldRegex,
    cvv_shape: FieldRegex,
    expiration_shape: FieldRegex,
}

impl Validator {
    pub fn new(today: NaiveDate) -> Result<Self> {
        Ok(Self {
            today,
            name_charset: FieldRegex::new(r"^[A-Za-z0-9 .,'-]+$")?,
            car_charset: FieldRegex::new(r"^[A-Za-z0-9 ]+$")?,
            cvv_shape: FieldRegex::new(r"^\s*[0-9]{3}\s*$")?,
            expiration_shape: FieldRegex::new(r"^\s*([0-9]{1,2})/([0-9]{2})\s*$")?,
        })
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn validate(&self, values: &FieldValues) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();
        for key in FieldKey::ALL {
            report.record(key, self.field_messages(key, values)?);
        }
        Ok(report)
    }

    fn field_messages(&self, key: FieldKey, values: &FieldValues) -> Result<Vec<&'static str>> {
        let raw = values.get(key);
        // An empty field reports only the required rule; format rules wait
        // until there is content.
        if raw.trim().is_empty() {
            return Ok(vec![alert_text::REQUIRED]);
        }
        let failure = match key {
            FieldKey::Name => self.check_name(raw)?,
            FieldKey::CarYear => self.check_car_year(raw),
            FieldKey::CarMake => self.check_car(raw, values.get(FieldKey::CarModel))?,
            FieldKey::CarModel => None,
            FieldKey::StartDate => self.check_start_date(raw),
            FieldKey::Days => Self::check_days(raw),
            FieldKey::CreditCard => Self::check_card(raw),
            FieldKey::Cvv => self.check_cvv(raw)?,
            FieldKey::Expiration => self.check_expiration(raw)?,
        };
        Ok(failure.into_iter().collect())
    }

    fn check_name(&self, value: &str) -> Result<Option<&'static str>> {
        Ok((!self.name_charset.is_match(value)?).then_some(alert_text::CHARSET))
    }

    fn check_car_year(&self, value: &str) -> Option<&'static str> {
        match value.trim().parse::<i32>() {
            Ok(year) if year > 1900 && year < self.today.year() => None,
            _ => Some(alert_text::CAR_YEAR),
        }
    }

    // Make and model validate as one string; a violation lands on the make
    // field.
    fn check_car(&self, make: &str, model: &str) -> Result<Option<&'static str>> {
        let combined = format!("{make}{model}");
        Ok((!self.car_charset.is_match(&combined)?).then_some(alert_text::CHARSET))
    }

    fn check_start_date(&self, value: &str) -> Option<&'static str> {
        match parse_start_date(value) {
            Some(date) if date >= self.today => None,
            _ => Some(alert_text::FUTURE_DATE),
        }
    }

    fn check_days(value: &str) -> Option<&'static str> {
        match value.trim().parse::<i64>() {
            Ok(days) if days > 0 && days < 31 => None,
            _ => Some(alert_text::DAY_RANGE),
        }
    }

    fn check_card(value: &str) -> Option<&'static str> {
        let digits: String = value.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
        let well_formed = digits.len() == 16
            && digits.bytes().all(|b| b.is_ascii_digit())
            && luhn_check(&digits);
        (!well_formed).then_some(alert_text::CARD)
    }

    fn check_cvv(&self, value: &str) -> Result<Option<&'static str>> {
        Ok((!self.cvv_shape.is_match(value)?).then_some(alert_text::CVV_DIGITS))
    }

    fn check_expiration(&self, value: &str) -> Result<Option<&'static str>> {
        let expanded = self
            .expiration_shape
            .captures_pair(value)?
            .and_then(|(month, year)| {
                let month: u32 = month.parse().ok()?;
                let year: i32 = year.parse().ok()?;
                if !(1..=12).contains(&month) {
                    return None;
                }
                NaiveDate::from_ymd_opt(2000 + year, month, 1)
            });
        match expanded {
            Some(first_of_month) if first_of_month >= self.today => Ok(None),
            _ => Ok(Some(alert_text::EXPIRATION)),
        }
    }
}

pub fn luhn_check(digits: &str) -> bool {
    let mut sum = 0u32;
    for (index, c) in digits.chars().enumerate() {
        let Some(mut digit) = c.to_digit(10) else {
            return false;
        };
        if index % 2 == 0 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }
    sum % 10 == 0
}

fn parse_start_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%Y"))
        .ok()
}

const WEEKDAY_RATE: u32 = 5;
const WEEKEND_RATE: u32 = 7;

pub fn calculate_cost(start: NaiveDate, days: u32) -> u32 {
    // Monday is index 0, so indexes 5 and 6 are the weekend.
    let start_index = start.weekday().num_days_from_monday();
    (0..days)
        .map(|offset| {
            if (start_index + offset % 7) % 7 >= 5 {
                WEEKEND_RATE
            } else {
                WEEKDAY_RATE
            }
        })
        .sum()
}

pub struct ParkingForm<D: PageDisplay> {
    validator: Validator,
    values: FieldValues,
    display: D,
}

impl<D: PageDisplay> ParkingForm<D> {
    pub fn new(today: NaiveDate, display: D) -> Result<Self> {
        Ok(Self {
            validator: Validator::new(today)?,
            values: FieldValues::new(),
            display,
        })
    }

    pub fn today(&self) -> NaiveDate {
        self.validator.today()
    }

    pub fn value(&self, field: FieldKey) -> &str {
        self.values.get(field)
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn validate(&self) -> Result<ValidationReport> {
        self.validator.validate(&self.values)
    }

    pub fn type_text(&mut self, field: FieldKey, text: &str) -> Result<ValidationReport> {
        self.values.set(field, text);
        let report = self.validator.validate(&self.values)?;
        self.refresh_alerts(&report);
        if matches!(field, FieldKey::StartDate | FieldKey::Days) || !report.is_valid() {
            self.display.erase_cost();
        }
        Ok(report)
    }

    pub fn submit(&mut self) -> Result<Option<Reservation>> {
        let report = self.validator.validate(&self.values)?;
        self.refresh_alerts(&report);
        if !report.is_valid() {
            self.display.erase_cost();
            return Ok(None);
        }
        let start = parse_start_date(self.values.get(FieldKey::StartDate));
        let days = self.values.get(FieldKey::Days).trim().parse::<u32>().ok();
        let (Some(start), Some(days)) = (start, days) else {
            self.display.erase_cost();
            return Ok(None);
        };
        let total = calculate_cost(start, days);
        self.display.display_cost(total);
        Ok(Some(Reservation { start, days, total }))
    }

    fn refresh_alerts(&mut self, report: &ValidationReport) {
        for key in FieldKey::ALL {
            let active = report.messages(key);
            for &text in key.alert_catalog() {
                if active.contains(&text) {
                    self.display.show_message(key, text, Severity::Danger);
                } else {
                    self.display.clear_message(key, text);
                }
            }
            if active.is_empty() {
                self.display.mark_field_valid(key);
            } else {
                self.display.mark_field_invalid(key);
            }
        }
    }
}
