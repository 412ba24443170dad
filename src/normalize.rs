use serde_json::Value;

use crate::domain::{AuthorList, CanonicalRecord, ModelId, Publication, RawRecord};
use crate::error::BiomodelsError;

/// Converts a heterogeneous upstream record into the canonical cache shape.
///
/// The conversion is total over any raw record that carries a resolvable
/// identifier, and idempotent: normalizing an already-canonical record
/// returns it unchanged. Fields missing at the top level are backfilled from
/// the nested publication sub-object where one exists (`title`, `authors`,
/// `journal`, and `date`, the latter falling back further to `year`).
pub fn normalize(
    raw: RawRecord,
    requested_id: Option<&ModelId>,
) -> Result<CanonicalRecord, BiomodelsError> {
    let RawRecord {
        id,
        model_id,
        name,
        title,
        synopsis,
        citation,
        journal,
        date,
        url,
        authors,
        publication,
        mut extra,
    } = raw;

    let resolved = non_empty(id)
        .or_else(|| non_empty(model_id))
        .or_else(|| requested_id.map(|id| id.as_str().to_string()))
        .ok_or_else(|| {
            BiomodelsError::Normalization(
                "record has no id field and no requested id".to_string(),
            )
        })?;
    let resolved: ModelId = resolved.parse()?;

    let (pub_title, pub_authors, pub_date, pub_journal) = match publication {
        Some(publication) => {
            // The sub-object is passed through unchanged alongside the
            // normalized fields, like any other extra field.
            let value = serde_json::to_value(&publication)
                .map_err(|err| BiomodelsError::Format(err.to_string()))?;
            extra.insert("publication".to_string(), value);

            let Publication {
                title,
                authors,
                date,
                year,
                journal,
                ..
            } = publication;
            let date = non_empty(date).or_else(|| year.and_then(year_string));
            (title, authors, date, journal)
        }
        None => (None, None, None, None),
    };

    let authors = authors
        .map(AuthorList::into_names)
        .filter(|names| !names.is_empty())
        .or_else(|| pub_authors.map(AuthorList::into_names))
        .unwrap_or_default();

    Ok(CanonicalRecord {
        id: resolved.as_str().to_string(),
        model_id: resolved.to_string(),
        name: non_empty(name),
        title: first_non_empty(title, pub_title),
        synopsis: non_empty(synopsis),
        citation: non_empty(citation),
        journal: first_non_empty(journal, pub_journal),
        date: first_non_empty(date, pub_date),
        url: non_empty(url),
        authors,
        extra,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn first_non_empty(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    non_empty(primary).or_else(|| non_empty(fallback))
}

fn year_string(value: Value) -> Option<String> {
    match value {
        Value::String(year) if !year.trim().is_empty() => Some(year),
        Value::Number(year) => Some(year.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw(value: serde_json::Value) -> RawRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn missing_identifier_fails() {
        let err = normalize(raw(json!({ "name": "No id" })), None).unwrap_err();
        assert!(matches!(err, BiomodelsError::Normalization(_)));
    }

    #[test]
    fn requested_id_fills_in_missing_id_field() {
        let requested: ModelId = "42".parse().unwrap();
        let record = normalize(raw(json!({ "name": "M" })), Some(&requested)).unwrap();
        assert_eq!(record.id, "BIOMD0000000042");
        assert_eq!(record.model_id, "BIOMD0000000042");
    }

    #[test]
    fn year_is_the_last_date_fallback() {
        let record = normalize(
            raw(json!({ "id": "BIOMD0000000001", "publication": { "year": 2019 } })),
            None,
        )
        .unwrap();
        assert_eq!(record.date.as_deref(), Some("2019"));
    }
}
