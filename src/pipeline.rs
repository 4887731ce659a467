use thiserror::Error;
use tracing::{info, warn};

use crate::editor::{EditorError, FieldListEditor};
use crate::error::ModelError;
use crate::llm::ModelGateway;
use crate::mapper::map_suggested_fields;
use crate::prompt::build_field_generation_prompt;
use crate::suggestion::{parse_model_response, validate_suggestions};

/// Suggested fields always land at the head of the form so they
/// surface first in the editor.
pub const SUGGESTION_INSERT_INDEX: usize = 0;

/// Upper bound on the user's free-text request, enforced at the
/// request boundary before the pipeline runs.
pub const MAX_PROMPT_CHARS: usize = 300;

/// Pipeline stages, in execution order. Any failure short-circuits;
/// the stage name goes into the server-side log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    AwaitingModel,
    Parsing,
    Validating,
    Mapping,
    Inserting,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Stage::AwaitingModel => "awaiting_model",
            Stage::Parsing => "parsing",
            Stage::Validating => "validating",
            Stage::Mapping => "mapping",
            Stage::Inserting => "inserting",
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("failed to insert generated fields: {0}")]
    Insert(#[from] EditorError),
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Model(err) => err.code(),
            PipelineError::Insert(_) => "field_insert_failure",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::Model(err) => err.user_message(),
            PipelineError::Insert(_) => "Could not add the generated fields to the form.",
        }
    }
}

/// Run the whole generation pipeline for one request: build the
/// prompt, call the model once, parse and validate the completion,
/// map it to typed fields, and insert the batch at the head of the
/// form's field list. Returns the number of fields inserted.
///
/// No stage is retried. Failures are logged here with full context
/// (prompt, raw response, violation detail); the caller only ever
/// sees a `PipelineError` with its generic user message and code.
pub async fn generate_fields<G, E>(
    gateway: &G,
    editor: &E,
    form_id: &str,
    user_prompt: &str,
) -> Result<usize, PipelineError>
where
    G: ModelGateway + ?Sized,
    E: FieldListEditor + ?Sized,
{
    let messages = build_field_generation_prompt(user_prompt);

    let completion = gateway
        .send_prompt(&messages)
        .await
        .map_err(|err| fail(form_id, user_prompt, Stage::AwaitingModel, err))?;

    // An empty completion cannot feed the parser; for this pipeline
    // it counts as a provider failure.
    let Some(raw) = completion else {
        return Err(fail(
            form_id,
            user_prompt,
            Stage::AwaitingModel,
            ModelError::ResponseFailure("provider returned no usable completion".to_string()),
        )
        .into());
    };

    let parsed = parse_model_response(&raw).map_err(|err| {
        warn!(form_id, stage = Stage::Parsing.as_str(), raw_response = %raw, %err, "field generation failed");
        err
    })?;

    let suggestions = validate_suggestions(&parsed).map_err(|err| {
        warn!(form_id, stage = Stage::Validating.as_str(), raw_response = %raw, %err, "field generation failed");
        err
    })?;

    let mapped = map_suggested_fields(&suggestions).map_err(|err| {
        warn!(form_id, stage = Stage::Mapping.as_str(), %err, "field generation failed");
        err
    })?;

    let inserted = editor
        .insert_fields(form_id, mapped, SUGGESTION_INSERT_INDEX)
        .map_err(|err| {
            warn!(form_id, stage = Stage::Inserting.as_str(), %err, "field generation failed");
            err
        })?;

    info!(form_id, fields_inserted = inserted, "field generation succeeded");
    Ok(inserted)
}

fn fail(form_id: &str, user_prompt: &str, stage: Stage, err: ModelError) -> ModelError {
    warn!(
        form_id,
        stage = stage.as_str(),
        prompt = user_prompt,
        %err,
        "field generation failed"
    );
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::InMemoryFormStore;
    use crate::field::{BasicField, FieldBase, FieldType, MappedFormField, ValidationOptions};
    use crate::prompt::Message;

    /// Gateway double that replays a canned provider outcome.
    struct StubGateway {
        outcome: Result<Option<String>, ModelError>,
    }

    impl StubGateway {
        fn returning(text: &str) -> Self {
            Self {
                outcome: Ok(Some(text.to_string())),
            }
        }
    }

    #[tonic::async_trait]
    impl ModelGateway for StubGateway {
        async fn send_prompt(&self, _messages: &[Message]) -> Result<Option<String>, ModelError> {
            match &self.outcome {
                Ok(text) => Ok(text.clone()),
                Err(ModelError::ResponseFailure(msg)) => {
                    Err(ModelError::ResponseFailure(msg.clone()))
                }
                Err(ModelError::GetClientFailure(msg)) => {
                    Err(ModelError::GetClientFailure(msg.clone()))
                }
                Err(_) => unreachable!("stub only replays gateway-side failures"),
            }
        }
    }

    fn store_with_form(form_id: &str) -> InMemoryFormStore {
        let store = InMemoryFormStore::new();
        store.create_form(form_id);
        store
    }

    fn existing_field(title: &str) -> MappedFormField {
        MappedFormField::Basic(BasicField {
            base: FieldBase::new(title.to_string(), true, None),
            field_type: FieldType::ShortText,
            validation_options: ValidationOptions::default(),
        })
    }

    #[tokio::test]
    async fn valid_completion_is_inserted_at_the_head_of_the_form() {
        let gateway = StubGateway::returning(
            r#"[
                {"title":"Cat Name","fieldType":"Radio","required":true,
                 "fieldOptions":["Whiskers","Bella"]},
                {"title":"Remarks","fieldType":"LongText","required":false}
            ]"#,
        );
        let store = store_with_form("form-1");
        store
            .insert_fields("form-1", vec![existing_field("Old field")], 0)
            .unwrap();

        let inserted = generate_fields(&gateway, &store, "form-1", "a cat adoption form")
            .await
            .unwrap();

        assert_eq!(inserted, 2);
        let fields = store.fields("form-1").unwrap();
        let titles: Vec<&str> = fields.iter().map(|f| f.title()).collect();
        assert_eq!(titles, vec!["Cat Name", "Remarks", "Old field"]);
    }

    #[tokio::test]
    async fn concurrent_requests_share_the_store_without_exclusive_access() {
        let gateway_a = StubGateway::returning(
            r#"[{"title":"Full Name","fieldType":"ShortText","required":true}]"#,
        );
        let gateway_b = StubGateway::returning(
            r#"[{"title":"Remarks","fieldType":"LongText","required":false}]"#,
        );
        let store = InMemoryFormStore::new();
        store.create_form("form-a");
        store.create_form("form-b");

        // Both invocations run against the same store reference; only
        // the insert itself serializes inside the editor.
        let (a, b) = tokio::join!(
            generate_fields(&gateway_a, &store, "form-a", "a registration form"),
            generate_fields(&gateway_b, &store, "form-b", "a feedback form"),
        );

        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 1);
        assert_eq!(store.fields("form-a").unwrap().len(), 1);
        assert_eq!(store.fields("form-b").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_completion_fails_as_response_failure() {
        let gateway = StubGateway { outcome: Ok(None) };
        let store = store_with_form("form-1");

        let err = generate_fields(&gateway, &store, "form-1", "anything")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "model_response_failure");
        assert!(store.fields("form-1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_json_fails_without_touching_the_form() {
        let gateway = StubGateway::returning(r#"[{"title":"broken""#);
        let store = store_with_form("form-1");

        let err = generate_fields(&gateway, &store, "form-1", "anything")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "model_response_invalid_syntax");
        assert!(store.fields("form-1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_invalid_element_rejects_the_whole_batch() {
        let gateway = StubGateway::returning(
            r#"[
                {"title":"Full Name","fieldType":"ShortText","required":true},
                {"title":"Portrait","fieldType":"Image","required":false}
            ]"#,
        );
        let store = store_with_form("form-1");

        let err = generate_fields(&gateway, &store, "form-1", "anything")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "model_response_invalid_schema_format");
        // Nothing partial: the valid first element was not inserted.
        assert!(store.fields("form-1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_suggestion_array_is_a_schema_failure() {
        let gateway = StubGateway::returning("[]");
        let store = store_with_form("form-1");

        let err = generate_fields(&gateway, &store, "form-1", "anything")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "model_response_invalid_schema_format");
    }

    #[tokio::test]
    async fn gateway_failure_is_surfaced_with_its_own_code() {
        let gateway = StubGateway {
            outcome: Err(ModelError::ResponseFailure("connection reset".to_string())),
        };
        let store = store_with_form("form-1");

        let err = generate_fields(&gateway, &store, "form-1", "anything")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "model_response_failure");
    }

    #[tokio::test]
    async fn unknown_form_surfaces_an_insert_failure() {
        let gateway = StubGateway::returning(
            r#"[{"title":"Full Name","fieldType":"ShortText","required":true}]"#,
        );
        let store = InMemoryFormStore::new();

        let err = generate_fields(&gateway, &store, "missing-form", "anything")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "field_insert_failure");
    }
}
