use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ServiceError;
use crate::storage::KeyValue;

/// Incoming record payload, shared by create, update and bulk import rows.
/// All fields optional at the type level; presence is what validation checks.
/// On update the body `id` is ignored, the path parameter wins.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct StudentInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub college: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Treat empty and whitespace-only strings as absent.
fn present(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl StudentInput {
    /// Required-field check shared by create and bulk import:
    /// `id`, `name`, `course`, `age`, `address` must be non-empty.
    pub fn require_create_fields(&self) -> Result<&str, ServiceError> {
        let missing = || ServiceError::Validation("All fields are required".to_string());
        let id = present(&self.id).ok_or_else(missing)?;
        for field in [&self.name, &self.course, &self.age, &self.address] {
            if present(field).is_none() {
                return Err(missing());
            }
        }
        Ok(id)
    }

    /// `(attribute, value)` pairs for every present field, in stored order.
    pub fn field_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::new();
        for (name, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("contact", &self.contact),
            ("college", &self.college),
            ("course", &self.course),
            ("age", &self.age),
            ("address", &self.address),
        ] {
            if let Some(v) = present(value) {
                pairs.push((name, v));
            }
        }
        pairs
    }
}

/// A stored record as returned by list: id plus whatever fields the hash
/// holds. Absent fields are omitted from JSON output.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StudentRecord {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub college: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl StudentRecord {
    fn from_hash(id: String, mut fields: HashMap<String, String>) -> Self {
        Self {
            id,
            name: fields.remove("name"),
            email: fields.remove("email"),
            contact: fields.remove("contact"),
            college: fields.remove("college"),
            course: fields.remove("course"),
            age: fields.remove("age"),
            address: fields.remove("address"),
        }
    }
}

/// Domain operations over student records, backed by an injected [`KeyValue`]
/// handle. Records live at `<prefix><id>` as store-side hashes.
#[derive(Clone)]
pub struct RecordsService {
    kv: Arc<dyn KeyValue>,
    prefix: String,
}

impl RecordsService {
    pub fn new(kv: Arc<dyn KeyValue>, prefix: impl Into<String>) -> Self {
        Self { kv, prefix: prefix.into() }
    }

    fn key(&self, id: &str) -> String {
        format!("{}{}", self.prefix, id)
    }

    /// Save a new record, one field write per present field. Overwrites an
    /// existing record at the same id without warning.
    pub async fn create(&self, input: &StudentInput) -> Result<(), ServiceError> {
        let id = input.require_create_fields()?;
        let key = self.key(id);
        for (field, value) in input.field_pairs() {
            self.kv.store(&key, field, value).await?;
        }
        debug!(%id, "student record saved");
        Ok(())
    }

    /// Enumerate every record under the key prefix: one scan, then one
    /// fetch per key. No ordering guarantee, no pagination.
    pub async fn list(&self) -> Result<Vec<StudentRecord>, ServiceError> {
        let keys = self.kv.keys(&format!("{}*", self.prefix)).await?;
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            let fields = self.kv.load(&key).await?;
            if fields.is_empty() {
                // key deleted between scan and fetch
                continue;
            }
            let id = key.strip_prefix(&self.prefix).unwrap_or(&key).to_string();
            records.push(StudentRecord::from_hash(id, fields));
        }
        Ok(records)
    }

    /// Overwrite the supplied fields of an existing record. Each field's own
    /// presence gates its write; absent fields keep their prior value.
    pub async fn update(&self, id: &str, input: &StudentInput) -> Result<(), ServiceError> {
        let pairs = input.field_pairs();
        if pairs.is_empty() {
            return Err(ServiceError::Validation(
                "At least one field is required to update".to_string(),
            ));
        }
        let key = self.key(id);
        let existing = self.kv.load(&key).await?;
        if existing.is_empty() {
            return Err(ServiceError::not_found("student"));
        }
        for (field, value) in pairs {
            self.kv.store(&key, field, value).await?;
        }
        debug!(%id, "student record updated");
        Ok(())
    }

    /// Remove a record. Idempotent: reports success whether or not the id
    /// existed.
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        self.kv.remove(&self.key(id)).await?;
        debug!(%id, "student record deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryKv;

    fn service() -> (Arc<MemoryKv>, RecordsService) {
        let kv = Arc::new(MemoryKv::new());
        let records = RecordsService::new(kv.clone(), "record:");
        (kv, records)
    }

    fn valid_input(id: &str) -> StudentInput {
        StudentInput {
            id: Some(id.into()),
            name: Some("A".into()),
            course: Some("CS".into()),
            age: Some("20".into()),
            address: Some("X".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_then_list_roundtrips() -> Result<(), ServiceError> {
        let (_, records) = service();
        records.create(&valid_input("1")).await?;

        let listed = records.list().await?;
        assert_eq!(listed.len(), 1);
        let rec = &listed[0];
        assert_eq!(rec.id, "1");
        assert_eq!(rec.name.as_deref(), Some("A"));
        assert_eq!(rec.course.as_deref(), Some("CS"));
        assert_eq!(rec.age.as_deref(), Some("20"));
        assert_eq!(rec.address.as_deref(), Some("X"));
        // optional fields were never written
        assert_eq!(rec.email, None);
        assert_eq!(rec.contact, None);
        assert_eq!(rec.college, None);
        Ok(())
    }

    #[tokio::test]
    async fn create_missing_required_writes_nothing() -> Result<(), ServiceError> {
        let (kv, records) = service();
        let mut input = valid_input("1");
        input.name = None;

        let err = records.create(&input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(kv.keys("record:*").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn create_treats_blank_as_missing() {
        let (_, records) = service();
        let mut input = valid_input("1");
        input.address = Some("   ".into());
        assert!(records.create(&input).await.is_err());
    }

    #[tokio::test]
    async fn create_overwrites_existing_record() -> Result<(), ServiceError> {
        let (_, records) = service();
        records.create(&valid_input("1")).await?;
        let mut second = valid_input("1");
        second.name = Some("B".into());
        records.create(&second).await?;

        let listed = records.list().await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name.as_deref(), Some("B"));
        Ok(())
    }

    #[tokio::test]
    async fn update_missing_record_is_not_found() -> Result<(), ServiceError> {
        let (kv, records) = service();
        let input = StudentInput { name: Some("B".into()), ..Default::default() };

        let err = records.update("42", &input).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        // the failed update must not create the record
        assert!(kv.load("record:42").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn update_without_fields_is_rejected() -> Result<(), ServiceError> {
        let (_, records) = service();
        records.create(&valid_input("1")).await?;
        let err = records.update("1", &StudentInput::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        Ok(())
    }

    #[tokio::test]
    async fn update_email_alone_updates_email() -> Result<(), ServiceError> {
        let (_, records) = service();
        records.create(&valid_input("1")).await?;

        let input = StudentInput { email: Some("a@b.c".into()), ..Default::default() };
        records.update("1", &input).await?;

        let listed = records.list().await?;
        assert_eq!(listed[0].email.as_deref(), Some("a@b.c"));
        // untouched fields keep their prior values
        assert_eq!(listed[0].name.as_deref(), Some("A"));
        Ok(())
    }

    #[tokio::test]
    async fn delete_is_idempotent() -> Result<(), ServiceError> {
        let (_, records) = service();
        records.create(&valid_input("1")).await?;

        records.delete("1").await?;
        assert!(records.list().await?.is_empty());
        // deleting an absent id still reports success
        records.delete("1").await?;
        Ok(())
    }
}
