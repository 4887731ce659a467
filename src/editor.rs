use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

use crate::field::MappedFormField;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("form {0:?} not found")]
    FormNotFound(String),

    #[error("insertion index {index} is out of range for a list of {len} fields")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Interface to the subsystem that owns a form's ordered field list.
///
/// The pipeline only produces candidate fields; insertion semantics
/// (ordering, uniqueness, concurrent-edit serialization) belong to
/// the implementor, which is why the method takes `&self`: an editor
/// must be shareable across concurrent pipeline invocations and do
/// its own locking for the duration of the insert only. The whole
/// batch lands at `index`, in order, or not at all.
pub trait FieldListEditor {
    fn insert_fields(
        &self,
        form_id: &str,
        fields: Vec<MappedFormField>,
        index: usize,
    ) -> Result<usize, EditorError>;
}

/// Form store backing the server binary and tests. One field list per
/// form id. The internal lock is only taken for the synchronous
/// splice, never across a request's model call, so concurrent
/// generation requests proceed independently.
#[derive(Debug, Default)]
pub struct InMemoryFormStore {
    forms: Mutex<HashMap<String, Vec<MappedFormField>>>,
}

impl InMemoryFormStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_form(&self, form_id: &str) {
        self.lock().entry(form_id.to_string()).or_default();
    }

    pub fn fields(&self, form_id: &str) -> Option<Vec<MappedFormField>> {
        self.lock().get(form_id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<MappedFormField>>> {
        // A poisoned lock only means another insert panicked mid-way;
        // the map itself is still structurally sound.
        self.forms.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl FieldListEditor for InMemoryFormStore {
    fn insert_fields(
        &self,
        form_id: &str,
        fields: Vec<MappedFormField>,
        index: usize,
    ) -> Result<usize, EditorError> {
        let mut forms = self.lock();
        let list = forms
            .get_mut(form_id)
            .ok_or_else(|| EditorError::FormNotFound(form_id.to_string()))?;

        if index > list.len() {
            return Err(EditorError::IndexOutOfRange {
                index,
                len: list.len(),
            });
        }

        let inserted = fields.len();
        list.splice(index..index, fields);
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{BasicField, FieldBase, FieldType, ValidationOptions};

    fn basic(title: &str) -> MappedFormField {
        MappedFormField::Basic(BasicField {
            base: FieldBase::new(title.to_string(), true, None),
            field_type: FieldType::ShortText,
            validation_options: ValidationOptions::default(),
        })
    }

    #[test]
    fn inserting_at_zero_prepends_the_batch_in_order() {
        let store = InMemoryFormStore::new();
        store.create_form("form-1");
        store
            .insert_fields("form-1", vec![basic("existing")], 0)
            .unwrap();

        let inserted = store
            .insert_fields("form-1", vec![basic("new-a"), basic("new-b")], 0)
            .unwrap();
        assert_eq!(inserted, 2);

        let fields = store.fields("form-1").unwrap();
        let titles: Vec<&str> = fields.iter().map(|f| f.title()).collect();
        assert_eq!(titles, vec!["new-a", "new-b", "existing"]);
    }

    #[test]
    fn unknown_form_is_an_error() {
        let store = InMemoryFormStore::new();
        let err = store.insert_fields("nope", vec![basic("x")], 0).unwrap_err();
        assert_eq!(err, EditorError::FormNotFound("nope".to_string()));
    }

    #[test]
    fn out_of_range_index_is_rejected_without_mutation() {
        let store = InMemoryFormStore::new();
        store.create_form("form-1");
        let err = store.insert_fields("form-1", vec![basic("x")], 3).unwrap_err();
        assert_eq!(err, EditorError::IndexOutOfRange { index: 3, len: 0 });
        assert!(store.fields("form-1").unwrap().is_empty());
    }

    #[test]
    fn store_is_shareable_across_threads() {
        let store = std::sync::Arc::new(InMemoryFormStore::new());
        store.create_form("form-a");
        store.create_form("form-b");

        let handles: Vec<_> = ["form-a", "form-b"]
            .into_iter()
            .map(|form_id| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.insert_fields(form_id, vec![basic("field")], 0).unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }

        assert_eq!(store.fields("form-a").unwrap().len(), 1);
        assert_eq!(store.fields("form-b").unwrap().len(), 1);
    }
}
