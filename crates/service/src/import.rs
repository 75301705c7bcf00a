use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::errors::ServiceError;
use crate::records::{RecordsService, StudentInput};

/// Outcome of a bulk import: rows written to the store versus rows skipped
/// by the required-field check. `accepted.len() + skipped.len()` equals the
/// number of decodable rows in the upload.
#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub accepted: Vec<StudentInput>,
    pub skipped: Vec<StudentInput>,
}

/// Read a CSV file (header row names the record fields) and write each valid
/// row through the same path as a single create. Rows failing the
/// required-field check are skipped, not errors; last write wins on duplicate
/// ids. A store failure aborts mid-batch and rows already written stay
/// written — there are no transaction semantics here.
pub async fn import_csv(records: &RecordsService, path: &Path) -> Result<ImportReport, ServiceError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| ServiceError::Store(format!("cannot read upload: {e}")))?;

    let mut report = ImportReport::default();
    for row in reader.deserialize::<StudentInput>() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, "skipping undecodable CSV row");
                continue;
            }
        };
        match records.create(&row).await {
            Ok(()) => report.accepted.push(row),
            Err(ServiceError::Validation(_)) => report.skipped.push(row),
            Err(e) => return Err(e),
        }
    }

    info!(
        accepted = report.accepted.len(),
        skipped = report.skipped.len(),
        "CSV import processed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use super::*;
    use crate::storage::memory::MemoryKv;

    fn service() -> RecordsService {
        RecordsService::new(Arc::new(MemoryKv::new()), "record:")
    }

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write csv");
        file
    }

    #[tokio::test]
    async fn valid_rows_persist_and_invalid_rows_skip() -> Result<(), ServiceError> {
        let records = service();
        let file = write_csv(
            "id,name,email,contact,college,course,age,address\n\
             1,A,a@x.io,111,MIT,CS,20,X\n\
             ,B,,,,CS,21,Y\n\
             2,C,,,,EE,22,Z\n",
        );

        let report = import_csv(&records, file.path()).await?;
        assert_eq!(report.accepted.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].name.as_deref(), Some("B"));

        let mut listed = records.list().await?;
        listed.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "1");
        assert_eq!(listed[0].email.as_deref(), Some("a@x.io"));
        assert_eq!(listed[1].id, "2");
        // empty cells are absent, not empty strings
        assert_eq!(listed[1].email, None);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_ids_last_write_wins() -> Result<(), ServiceError> {
        let records = service();
        let file = write_csv(
            "id,name,email,contact,college,course,age,address\n\
             1,A,,,,CS,20,X\n\
             1,B,,,,EE,21,Y\n",
        );

        let report = import_csv(&records, file.path()).await?;
        assert_eq!(report.accepted.len(), 2);

        let listed = records.list().await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name.as_deref(), Some("B"));
        assert_eq!(listed[0].course.as_deref(), Some("EE"));
        Ok(())
    }

    #[tokio::test]
    async fn header_only_upload_yields_empty_report() -> Result<(), ServiceError> {
        let records = service();
        let file = write_csv("id,name,email,contact,college,course,age,address\n");

        let report = import_csv(&records, file.path()).await?;
        assert!(report.accepted.is_empty());
        assert!(report.skipped.is_empty());
        assert!(records.list().await?.is_empty());
        Ok(())
    }
}
