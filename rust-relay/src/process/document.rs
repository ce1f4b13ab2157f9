//! Index document construction.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::content::ContentItem;
use crate::index::IndexDocument;
use crate::webhook::Snapshot;

/// Build the document written to the search index.
///
/// Copies the selected body properties, optionally stamps the Unix-epoch
/// timestamp fields, then sets `objectID` and `publishedDate`. The result
/// depends only on the arguments.
///
/// # Arguments
///
/// * `item` - The fetched content item
/// * `properties` - Body properties to copy, in output order
/// * `snapshot` - The published snapshot from the webhook
/// * `now` - Publication time
/// * `stamp_timestamps` - Whether to add the `_...Date` epoch fields
pub fn build_document(
    item: &ContentItem,
    properties: &[&str],
    snapshot: &Snapshot,
    now: DateTime<Utc>,
    stamp_timestamps: bool,
) -> IndexDocument {
    let mut fields = Map::new();

    for name in properties {
        if let Some(value) = item.body.get(*name) {
            fields.insert((*name).to_string(), value.clone());
        }
    }

    if stamp_timestamps {
        let stamps = [
            ("_lastModifiedDate", Some(now)),
            ("_snapshotCreatedDate", snapshot.created_date),
            ("_contentItemCreatedDate", item.created_date),
            ("_contentItemLastModifiedDate", item.last_modified_date),
        ];
        for (key, date) in stamps {
            if let Some(date) = date {
                fields.insert(key.to_string(), Value::from(date.timestamp()));
            }
        }
    }

    fields.insert("objectID".to_string(), Value::from(item.id.clone()));
    fields.insert(
        "publishedDate".to_string(),
        Value::from(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );

    IndexDocument::new(fields)
}
