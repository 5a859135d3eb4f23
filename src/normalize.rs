//! Record Normalizer: canonicalizes heterogeneous raw records.
//!
//! This is a pure transform. Malformed or missing fields never abort the
//! pass; each recovery is logged via `tracing` and captured as a
//! [`DataQualityEvent`] in the output so downstream consumers can audit how
//! much of the input needed repair.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Months, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::NormalizerConfig;
use crate::record::{PatentRecord, RawRecord, RecordSource};

/// Trailing kind-code suffix: exactly one letter followed by one digit,
/// preceded by the numeric tail of the serial.
static KIND_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<base>.*[0-9])(?P<kind>[A-Z][0-9])$").expect("static regex"));

/// Anything that is not part of a canonical number.
static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Z0-9]+").expect("static regex"));

/// Which fallback produced a recovered date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFallback {
    /// A sibling date field from the same record was substituted.
    SiblingField {
        /// Name of the field that supplied the value.
        field: String,
    },
    /// Derived from the record's publication date minus the statutory
    /// publication offset.
    PublicationOffset,
    /// Derived from the normalization clock minus a conservative offset.
    NormalizationClock,
}

/// One data-quality observation made while normalizing or resolving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum QualityIssue {
    /// A date field was missing or unparseable and a fallback was used.
    DateRecovered {
        /// Name of the repaired field.
        field: String,
        /// Which fallback supplied the value.
        fallback: DateFallback,
    },
    /// A date string was present but could not be parsed.
    UnparseableDate {
        /// Name of the field.
        field: String,
        /// The raw value as received.
        raw: String,
    },
    /// The record had no publication number; its PCT or priority number was
    /// used as the record key instead.
    MissingPublicationNumber {
        /// The substitute key.
        substitute: String,
    },
    /// The record had neither a publication number nor any priority/PCT
    /// linkage and was dropped; it cannot be grouped into any family.
    DroppedNoLinkage,
    /// Member records of one family disagreed on the priority date; the
    /// earliest won.
    PriorityDateConflict {
        /// The date that was kept.
        kept: NaiveDate,
        /// A later date that was discarded.
        discarded: NaiveDate,
    },
}

/// A data-quality event tied to one record (or family).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQualityEvent {
    /// Source of the affected record, when known.
    pub source: Option<RecordSource>,
    /// Human-readable reference: publication number, PCT number, or index.
    pub record: String,
    /// What happened.
    pub issue: QualityIssue,
}

impl fmt::Display for DataQualityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?}", self.record, self.issue)
    }
}

/// Output of one normalization pass.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    /// Canonical records, in input order.
    pub records: Vec<PatentRecord>,
    /// Everything that needed repair.
    pub quality_events: Vec<DataQualityEvent>,
    /// Count of records dropped for missing linkage.
    pub dropped: usize,
}

/// Per-source field alias tables.
///
/// Each collaborator names its fields differently; all of that knowledge is
/// confined to this table.
struct FieldAliases {
    publication: &'static [&'static str],
    country: &'static [&'static str],
    kind: &'static [&'static str],
    priority_number: &'static [&'static str],
    priority_date: &'static [&'static str],
    pct: &'static [&'static str],
    applicant: &'static [&'static str],
    filing_date: &'static [&'static str],
    publication_date: &'static [&'static str],
}

const NATIONAL_OFFICE_ALIASES: FieldAliases = FieldAliases {
    publication: &["patent_number", "publication_number"],
    country: &["country", "country_code"],
    kind: &["kind", "kind_code"],
    priority_number: &["priority_number", "priority_application"],
    priority_date: &["priority_date", "pct_date"],
    pct: &["pct_number", "wo_number", "wo_reference"],
    applicant: &["applicant", "applicants"],
    filing_date: &["national_phase_date", "filing_date", "deposit_date"],
    publication_date: &["publication_date", "rpi_date"],
};

const INTERNATIONAL_OFFICE_ALIASES: FieldAliases = FieldAliases {
    publication: &["publication_number", "doc_number"],
    country: &["country", "country_code"],
    kind: &["kind", "kind_code"],
    priority_number: &["priority_number", "priority_claim"],
    priority_date: &["priority_date"],
    pct: &["pct_application_number", "wo_number"],
    applicant: &["applicant_name", "applicant", "applicants"],
    filing_date: &["filing_date", "application_date"],
    publication_date: &["publication_date"],
};

const PCT_REGISTRY_ALIASES: FieldAliases = FieldAliases {
    publication: &["wo_number", "publication_number"],
    country: &["country", "country_code"],
    kind: &["kind", "kind_code"],
    priority_number: &["priority_number"],
    priority_date: &["priority_date", "earliest_priority"],
    pct: &["wo_number", "pct_number"],
    applicant: &["applicant", "applicants"],
    filing_date: &["international_filing_date", "filing_date"],
    publication_date: &["publication_date", "wo_date"],
};

const AGGREGATOR_ALIASES: FieldAliases = FieldAliases {
    publication: &["patent_number", "publication_number", "id"],
    country: &["country_code", "country"],
    kind: &["kind", "kind_code"],
    priority_number: &["priority_number", "priority_application"],
    priority_date: &["priority_date"],
    pct: &["pct_number", "wo_number"],
    applicant: &["assignee", "applicant", "applicants"],
    filing_date: &["filing_date"],
    publication_date: &["publication_date", "grant_date"],
};

const fn aliases_for(source: RecordSource) -> &'static FieldAliases {
    match source {
        RecordSource::NationalOffice => &NATIONAL_OFFICE_ALIASES,
        RecordSource::InternationalOffice => &INTERNATIONAL_OFFICE_ALIASES,
        RecordSource::PctRegistry => &PCT_REGISTRY_ALIASES,
        RecordSource::CommercialAggregator => &AGGREGATOR_ALIASES,
    }
}

/// Uppercases a number and strips separators (`WO 2016/170102` →
/// `WO2016170102`).
#[must_use]
pub fn clean_number(raw: &str) -> String {
    let upper = raw.to_ascii_uppercase();
    NON_ALNUM_RE.replace_all(&upper, "").into_owned()
}

/// Splits a trailing kind-code suffix off a cleaned publication number.
///
/// A number ending in one letter followed by one digit has that pair removed
/// and returned separately; anything else passes through unchanged.
///
/// # Examples
///
/// ```
/// use patfam::normalize::split_kind_code;
///
/// assert_eq!(
///     split_kind_code("BR112019017103A2"),
///     ("BR112019017103".to_string(), Some("A2".to_string()))
/// );
/// assert_eq!(split_kind_code("BRPI1011363"), ("BRPI1011363".to_string(), None));
/// ```
#[must_use]
pub fn split_kind_code(number: &str) -> (String, Option<String>) {
    if let Some(caps) = KIND_CODE_RE.captures(number) {
        (caps["base"].to_string(), Some(caps["kind"].to_string()))
    } else {
        (number.to_string(), None)
    }
}

/// Parses the calendar-date formats seen across sources:
/// `YYYY-MM-DD`, `YYYYMMDD`, and ISO-8601 datetimes.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if raw.len() == 8 && raw.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y%m%d") {
            return Some(date);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    None
}

/// The Record Normalizer.
///
/// Stateless apart from its configuration and the injected reference date
/// (the clock fallback must be deterministic under test).
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: NormalizerConfig,
    today: NaiveDate,
}

impl Normalizer {
    /// Creates a normalizer with an explicit reference date.
    #[must_use]
    pub const fn new(config: NormalizerConfig, today: NaiveDate) -> Self {
        Self { config, today }
    }

    /// Normalizes a batch of raw records.
    ///
    /// Records missing both a publication number and any priority/PCT
    /// linkage are dropped with a logged reason; everything else is
    /// repaired as needed.
    #[must_use]
    pub fn normalize(&self, raw_records: &[RawRecord]) -> NormalizedBatch {
        let mut batch = NormalizedBatch::default();
        for (index, raw) in raw_records.iter().enumerate() {
            match self.normalize_one(raw, index, &mut batch.quality_events) {
                Some(record) => batch.records.push(record),
                None => batch.dropped += 1,
            }
        }
        if batch.dropped > 0 {
            tracing::warn!(
                dropped = batch.dropped,
                total = raw_records.len(),
                "dropped records without publication number or family linkage"
            );
        }
        batch
    }

    fn normalize_one(
        &self,
        raw: &RawRecord,
        index: usize,
        events: &mut Vec<DataQualityEvent>,
    ) -> Option<PatentRecord> {
        let aliases = aliases_for(raw.source);

        let publication_raw = raw.first_string(aliases.publication).map(|s| clean_number(&s));
        // Linkage numbers also get their kind suffix stripped: sources quote
        // the same WO publication with and without it, and a suffixed key
        // would split one family in two.
        let pct_number = raw
            .first_string(aliases.pct)
            .map(|s| split_kind_code(&clean_number(&s)).0)
            .filter(|s| !s.is_empty());
        let priority_number = raw
            .first_string(aliases.priority_number)
            .map(|s| split_kind_code(&clean_number(&s)).0)
            .filter(|s| !s.is_empty());

        // A record with no publication number and no linkage cannot be
        // grouped into any family.
        let (publication_number, kind_from_suffix) = match publication_raw {
            Some(number) if !number.is_empty() => split_kind_code(&number),
            _ => {
                let substitute = pct_number.clone().or_else(|| priority_number.clone());
                match substitute {
                    Some(substitute) => {
                        tracing::debug!(
                            source = %raw.source,
                            substitute = %substitute,
                            "record missing publication number, keyed by linkage number"
                        );
                        events.push(DataQualityEvent {
                            source: Some(raw.source),
                            record: substitute.clone(),
                            issue: QualityIssue::MissingPublicationNumber {
                                substitute: substitute.clone(),
                            },
                        });
                        (substitute, None)
                    }
                    None => {
                        tracing::warn!(source = %raw.source, index, "dropping unlinkable record");
                        events.push(DataQualityEvent {
                            source: Some(raw.source),
                            record: format!("record#{index}"),
                            issue: QualityIssue::DroppedNoLinkage,
                        });
                        return None;
                    }
                }
            }
        };

        let kind_code = raw
            .first_string(aliases.kind)
            .map(|s| clean_number(&s))
            .filter(|s| !s.is_empty())
            .or(kind_from_suffix);

        let country_code = raw
            .first_string(aliases.country)
            .map(|s| s.to_ascii_uppercase())
            .filter(|s| s.len() == 2 && s.chars().all(|c| c.is_ascii_uppercase()))
            .unwrap_or_else(|| leading_country(&publication_number));

        let record_ref = publication_number.clone();
        let filing_date =
            self.parse_date_field(raw, aliases.filing_date, &record_ref, events);
        let publication_date =
            self.parse_date_field(raw, aliases.publication_date, &record_ref, events);
        let priority_date = self.priority_date_with_fallback(
            raw,
            aliases,
            filing_date,
            publication_date,
            &record_ref,
            events,
        );

        Some(PatentRecord {
            source: raw.source,
            country_code,
            publication_number,
            kind_code,
            priority_number,
            priority_date,
            pct_application_number: pct_number,
            applicant_name: raw.first_string(aliases.applicant),
            filing_date,
            publication_date,
        })
    }

    /// Parses the first parseable value among `fields`, logging values that
    /// were present but malformed.
    fn parse_date_field(
        &self,
        raw: &RawRecord,
        fields: &[&str],
        record_ref: &str,
        events: &mut Vec<DataQualityEvent>,
    ) -> Option<NaiveDate> {
        for field in fields {
            let Some(value) = raw.first_string(&[field]) else {
                continue;
            };
            if let Some(date) = parse_date(&value) {
                return Some(date);
            }
            tracing::debug!(field, raw = %value, record = record_ref, "unparseable date");
            events.push(DataQualityEvent {
                source: Some(raw.source),
                record: record_ref.to_string(),
                issue: QualityIssue::UnparseableDate {
                    field: (*field).to_string(),
                    raw: value,
                },
            });
        }
        None
    }

    /// Priority-date fallback chain: parsed field, sibling filing date,
    /// publication date minus the statutory offset, normalization clock
    /// minus a conservative offset. Each fallback is logged.
    fn priority_date_with_fallback(
        &self,
        raw: &RawRecord,
        aliases: &FieldAliases,
        filing_date: Option<NaiveDate>,
        publication_date: Option<NaiveDate>,
        record_ref: &str,
        events: &mut Vec<DataQualityEvent>,
    ) -> NaiveDate {
        if let Some(date) = self.parse_date_field(raw, aliases.priority_date, record_ref, events) {
            return date;
        }

        let (date, fallback) = if let Some(filing) = filing_date {
            (filing, DateFallback::SiblingField {
                field: "filing_date".to_string(),
            })
        } else if let Some(published) = publication_date {
            (
                sub_months(published, self.config.publication_offset_months),
                DateFallback::PublicationOffset,
            )
        } else {
            (
                sub_months(self.today, self.config.clock_offset_months),
                DateFallback::NormalizationClock,
            )
        };

        tracing::info!(
            record = record_ref,
            fallback = ?fallback,
            date = %date,
            "priority date recovered via fallback"
        );
        events.push(DataQualityEvent {
            source: Some(raw.source),
            record: record_ref.to_string(),
            issue: QualityIssue::DateRecovered {
                field: "priority_date".to_string(),
                fallback,
            },
        });
        date
    }
}

fn leading_country(publication_number: &str) -> String {
    let prefix: String = publication_number
        .chars()
        .take(2)
        .filter(char::is_ascii_alphabetic)
        .collect();
    if prefix.len() == 2 {
        prefix
    } else {
        "XX".to_string()
    }
}

fn sub_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months)).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 25).unwrap()
    }

    fn normalizer() -> Normalizer {
        Normalizer::new(NormalizerConfig::default(), today())
    }

    #[test]
    fn kind_code_is_stripped() {
        let (base, kind) = split_kind_code("BR112019017103A2");
        assert_eq!(base, "BR112019017103");
        assert_eq!(kind.as_deref(), Some("A2"));
    }

    #[test]
    fn number_without_kind_code_unchanged() {
        let (base, kind) = split_kind_code("BRPI1011363");
        assert_eq!(base, "BRPI1011363");
        assert_eq!(kind, None);
    }

    #[test]
    fn parses_all_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2015, 4, 10).unwrap();
        assert_eq!(parse_date("2015-04-10"), Some(expected));
        assert_eq!(parse_date("20150410"), Some(expected));
        assert_eq!(parse_date("2015-04-10T00:00:00"), Some(expected));
        assert_eq!(parse_date("2015-04-10T12:30:00+00:00"), Some(expected));
        assert_eq!(parse_date("april 2015"), None);
    }

    #[test]
    fn normalizes_aggregator_record() {
        let raw = RawRecord::from_pairs(
            RecordSource::CommercialAggregator,
            [
                ("patent_number", "BR112019017103A2"),
                ("priority_date", "2017-02-14"),
                ("assignee", "Acme Pharma Inc."),
            ],
        );
        let batch = normalizer().normalize(&[raw]);
        assert_eq!(batch.records.len(), 1);
        let record = &batch.records[0];
        assert_eq!(record.publication_number, "BR112019017103");
        assert_eq!(record.kind_code.as_deref(), Some("A2"));
        assert_eq!(record.country_code, "BR");
        assert_eq!(record.applicant_name.as_deref(), Some("Acme Pharma Inc."));
        assert!(batch.quality_events.is_empty());
    }

    #[test]
    fn sibling_filing_date_fallback_is_logged() {
        let raw = RawRecord::from_pairs(
            RecordSource::NationalOffice,
            [
                ("patent_number", "BR102018000001"),
                ("national_phase_date", "2018-06-01"),
            ],
        );
        let batch = normalizer().normalize(&[raw]);
        let record = &batch.records[0];
        assert_eq!(record.priority_date, NaiveDate::from_ymd_opt(2018, 6, 1).unwrap());
        assert!(batch.quality_events.iter().any(|e| matches!(
            &e.issue,
            QualityIssue::DateRecovered {
                fallback: DateFallback::SiblingField { field },
                ..
            } if field == "filing_date"
        )));
    }

    #[test]
    fn publication_offset_fallback() {
        let raw = RawRecord::from_pairs(
            RecordSource::PctRegistry,
            [
                ("wo_number", "WO2020123456"),
                ("publication_date", "2020-10-01"),
            ],
        );
        let batch = normalizer().normalize(&[raw]);
        let record = &batch.records[0];
        // Publication minus the 18-month statutory offset.
        assert_eq!(record.priority_date, NaiveDate::from_ymd_opt(2019, 4, 1).unwrap());
        assert!(batch.quality_events.iter().any(|e| matches!(
            &e.issue,
            QualityIssue::DateRecovered {
                fallback: DateFallback::PublicationOffset,
                ..
            }
        )));
    }

    #[test]
    fn clock_fallback_when_no_dates_at_all() {
        let raw = RawRecord::from_pairs(
            RecordSource::CommercialAggregator,
            [("patent_number", "US9876543B2")],
        );
        let batch = normalizer().normalize(&[raw]);
        let record = &batch.records[0];
        assert_eq!(record.priority_date, NaiveDate::from_ymd_opt(2025, 2, 25).unwrap());
    }

    #[test]
    fn unlinkable_record_is_dropped_with_reason() {
        let raw = RawRecord::from_pairs(RecordSource::CommercialAggregator, [("title", "noise")]);
        let batch = normalizer().normalize(&[raw]);
        assert!(batch.records.is_empty());
        assert_eq!(batch.dropped, 1);
        assert!(batch
            .quality_events
            .iter()
            .any(|e| matches!(e.issue, QualityIssue::DroppedNoLinkage)));
    }

    #[test]
    fn pct_number_substitutes_for_missing_publication_number() {
        let raw = RawRecord::from_pairs(
            RecordSource::NationalOffice,
            [("pct_number", "WO 2016/170102"), ("priority_date", "2015-04-10")],
        );
        let batch = normalizer().normalize(&[raw]);
        let record = &batch.records[0];
        assert_eq!(record.publication_number, "WO2016170102");
        assert_eq!(record.country_code, "WO");
        assert!(batch.quality_events.iter().any(|e| matches!(
            &e.issue,
            QualityIssue::MissingPublicationNumber { .. }
        )));
    }

    #[test]
    fn kind_suffix_is_stripped_from_linkage_numbers() {
        let raw = RawRecord::from_pairs(
            RecordSource::NationalOffice,
            [
                ("patent_number", "BR112017022234A2"),
                ("wo_reference", "WO2016170102A1"),
                ("priority_date", "2015-04-10"),
            ],
        );
        let batch = normalizer().normalize(&[raw]);
        let record = &batch.records[0];
        assert_eq!(record.pct_application_number.as_deref(), Some("WO2016170102"));
    }

    #[test]
    fn substitute_key_from_suffixed_pct_number_is_bare() {
        let raw = RawRecord::from_pairs(
            RecordSource::NationalOffice,
            [("pct_number", "WO2016170102A1"), ("priority_date", "2015-04-10")],
        );
        let batch = normalizer().normalize(&[raw]);
        let record = &batch.records[0];
        assert_eq!(record.publication_number, "WO2016170102");
        assert_eq!(record.pct_application_number.as_deref(), Some("WO2016170102"));
    }

    #[test]
    fn malformed_date_is_reported_not_masked() {
        let raw = RawRecord::from_pairs(
            RecordSource::InternationalOffice,
            [
                ("publication_number", "EP1234567A1"),
                ("priority_date", "not-a-date"),
                ("filing_date", "2019-01-15"),
            ],
        );
        let batch = normalizer().normalize(&[raw]);
        assert!(batch.quality_events.iter().any(|e| matches!(
            &e.issue,
            QualityIssue::UnparseableDate { field, .. } if field == "priority_date"
        )));
        // Still recovered from the sibling filing date.
        assert_eq!(
            batch.records[0].priority_date,
            NaiveDate::from_ymd_opt(2019, 1, 15).unwrap()
        );
    }
}
