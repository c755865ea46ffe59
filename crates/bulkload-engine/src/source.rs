//! Record source: lazy CSV decoding of an uploaded buffer
//!
//! A [`RecordSource`] wraps the raw uploaded bytes and produces decoded
//! [`RawRecord`] values in file order. It is a pure structural decoder:
//! a missing `name` or `email` column decodes to an empty string, and
//! rejecting such records is the engine's job, not the decoder's.
//!
//! The source is restartable: every call to [`RecordSource::records`]
//! starts a fresh decode from the first data row. Resume is implemented by
//! re-decoding from the start and skipping already-processed indices, so
//! there is no seeking into the middle of the encoded stream.

use serde::{Deserialize, Serialize};

/// One decoded row of the upload: a name/email pair.
///
/// Identity key is `email`; uniqueness is enforced by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub name: String,
    pub email: String,
}

impl RawRecord {
    /// Both fields present and non-empty after trimming.
    pub fn has_required_fields(&self) -> bool {
        !self.name.trim().is_empty() && !self.email.trim().is_empty()
    }
}

/// Lazy, restartable decoder over an in-memory CSV buffer with header row.
pub struct RecordSource<'a> {
    buffer: &'a [u8],
}

impl<'a> RecordSource<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer }
    }

    /// Full pre-pass count of data rows (malformed rows included, so the
    /// count matches the number of items the processing loop will see).
    ///
    /// This is a complete traversal and is computed once per processing
    /// attempt, never incrementally.
    pub fn count(&self) -> Result<u64, csv::Error> {
        let mut reader = self.reader();
        reader.headers()?;

        let mut count = 0u64;
        for result in reader.records() {
            // A malformed row still occupies an index in the stream.
            if let Err(err) = result {
                tracing::debug!(error = %err, "Malformed row counted in pre-pass");
            }
            count += 1;
        }
        Ok(count)
    }

    /// Start a fresh decode from the first data row.
    pub fn records(&self) -> Result<Records<'a>, csv::Error> {
        let mut reader = self.reader();
        let headers = reader.headers()?;

        let name_idx = headers.iter().position(|h| h == "name");
        let email_idx = headers.iter().position(|h| h == "email");

        Ok(Records {
            inner: reader.into_records(),
            name_idx,
            email_idx,
        })
    }

    fn reader(&self) -> csv::Reader<&'a [u8]> {
        csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(self.buffer)
    }
}

/// Iterator over decoded records, in file order.
pub struct Records<'a> {
    inner: csv::StringRecordsIntoIter<&'a [u8]>,
    name_idx: Option<usize>,
    email_idx: Option<usize>,
}

impl Records<'_> {
    fn field(record: &csv::StringRecord, idx: Option<usize>) -> String {
        idx.and_then(|i| record.get(i)).unwrap_or("").to_string()
    }
}

impl Iterator for Records<'_> {
    type Item = Result<RawRecord, csv::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.inner.next()?;
        Some(result.map(|record| RawRecord {
            name: Self::field(&record, self.name_idx),
            email: Self::field(&record, self.email_idx),
        }))
    }
}
