use chrono::NaiveDate;

use crate::domain::{CanonicalRecord, SearchFilters};
use crate::error::BiomodelsError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Free-text search with optional structured filters over a snapshot of
/// cached records.
///
/// The lower-cased query matches a record if it is a substring of `name`,
/// `title`, or `synopsis`; the empty query matches everything. Filters only
/// apply to text-matching records and are AND-ed together. Results keep the
/// iteration order of the input.
pub fn search<'a, I>(
    models: I,
    query: &str,
    filters: Option<&SearchFilters>,
) -> Result<Vec<CanonicalRecord>, BiomodelsError>
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    let query = query.to_lowercase();
    let mut results = Vec::new();
    for model in models {
        if !text_match(model, &query) {
            continue;
        }
        if let Some(filters) = filters {
            if !apply_filters(model, filters)? {
                continue;
            }
        }
        results.push(model.clone());
    }
    Ok(results)
}

fn text_match(model: &CanonicalRecord, query: &str) -> bool {
    field_contains(model.name.as_deref(), query)
        || field_contains(model.title.as_deref(), query)
        || field_contains(model.synopsis.as_deref(), query)
}

fn field_contains(field: Option<&str>, query: &str) -> bool {
    field.unwrap_or("").to_lowercase().contains(query)
}

fn apply_filters(
    model: &CanonicalRecord,
    filters: &SearchFilters,
) -> Result<bool, BiomodelsError> {
    if let Some(authors) = &filters.authors {
        let model_authors: Vec<String> = model
            .authors
            .iter()
            .map(|author| author.to_lowercase())
            .collect();
        let matched = authors
            .iter()
            .any(|author| model_authors.contains(&author.to_lowercase()));
        if !matched {
            return Ok(false);
        }
    }

    if let Some(journals) = &filters.journals {
        let model_journal = model.journal.as_deref().unwrap_or("").to_lowercase();
        let matched = journals
            .iter()
            .any(|journal| journal.to_lowercase() == model_journal);
        if !matched {
            return Ok(false);
        }
    }

    if let Some(range) = &filters.date_range {
        // Any unparseable date in the comparison fails the whole search, a
        // non-match is never inferred from bad input.
        let model_date = parse_date(model.date.as_deref().unwrap_or(""))?;
        let start = parse_date(&range.start)?;
        let end = parse_date(&range.end)?;
        if !(start <= model_date && model_date <= end) {
            return Ok(false);
        }
    }

    Ok(true)
}

fn parse_date(value: &str) -> Result<NaiveDate, BiomodelsError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| BiomodelsError::InvalidFilterDate(value.to_string()))
}
