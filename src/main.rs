use std::net::SocketAddr;

use anyhow::{Context, Result};
use fieldsmith::editor::InMemoryFormStore;
use fieldsmith::error::ModelError;
use fieldsmith::llm::{LlmClient, LlmConfig, ModelGateway};
use fieldsmith::pipeline::{generate_fields, PipelineError, MAX_PROMPT_CHARS};
use fieldsmith::rpc::fieldsmith::fieldsmith_server::{Fieldsmith, FieldsmithServer};
use fieldsmith::rpc::fieldsmith::{GenerateFieldsRequest, GenerateFieldsResponse};
use tonic::{transport::Server, Request, Response, Status};
use tracing::info;
use tracing_subscriber::EnvFilter;

struct FieldsmithService<G> {
    llm: G,
    // Shared by value: the store locks internally, and only for the
    // insert itself, so requests never serialize on the model call.
    store: InMemoryFormStore,
}

#[tonic::async_trait]
impl<G> Fieldsmith for FieldsmithService<G>
where
    G: ModelGateway + 'static,
{
    async fn generate_fields(
        &self,
        request: Request<GenerateFieldsRequest>,
    ) -> Result<Response<GenerateFieldsResponse>, Status> {
        let inner = request.into_inner();

        if inner.form_id.is_empty() {
            return Err(Status::invalid_argument("form_id must not be empty"));
        }
        let prompt = inner.prompt.trim();
        if prompt.is_empty() {
            return Err(Status::invalid_argument("prompt must not be empty"));
        }
        if prompt.chars().count() > MAX_PROMPT_CHARS {
            return Err(Status::invalid_argument(format!(
                "prompt must be at most {MAX_PROMPT_CHARS} characters"
            )));
        }

        self.store.create_form(&inner.form_id);

        match generate_fields(&self.llm, &self.store, &inner.form_id, prompt).await {
            Ok(inserted) => Ok(Response::new(GenerateFieldsResponse {
                fields_inserted: inserted as u32,
            })),
            // Failure detail was already logged by the pipeline; the
            // status carries the machine code plus generic wording.
            Err(err) => Err(status_for(&err)),
        }
    }
}

fn status_for(err: &PipelineError) -> Status {
    let message = format!("{}: {}", err.code(), err.user_message());
    match err {
        PipelineError::Model(ModelError::GetClientFailure(_))
        | PipelineError::Model(ModelError::ResponseFailure(_)) => Status::unavailable(message),
        PipelineError::Model(_) | PipelineError::Insert(_) => Status::internal(message),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr: SocketAddr = std::env::var("FIELDSMITH_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:50051".to_string())
        .parse()
        .context("invalid FIELDSMITH_ADDR")?;

    let config = LlmConfig::from_env();
    info!(endpoint = %config.endpoint, model = %config.model, "using model endpoint");

    let service = FieldsmithService {
        llm: LlmClient::new(config).context("failed to construct model client")?,
        store: InMemoryFormStore::new(),
    };

    info!(%addr, "fieldsmith listening");
    Server::builder()
        .add_service(FieldsmithServer::new(service))
        .serve(addr)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldsmith::prompt::Message;

    struct StubGateway {
        completion: Option<String>,
    }

    #[tonic::async_trait]
    impl ModelGateway for StubGateway {
        async fn send_prompt(&self, _messages: &[Message]) -> Result<Option<String>, ModelError> {
            Ok(self.completion.clone())
        }
    }

    fn service_with(completion: Option<&str>) -> FieldsmithService<StubGateway> {
        FieldsmithService {
            llm: StubGateway {
                completion: completion.map(str::to_string),
            },
            store: InMemoryFormStore::new(),
        }
    }

    fn request(form_id: &str, prompt: &str) -> Request<GenerateFieldsRequest> {
        Request::new(GenerateFieldsRequest {
            form_id: form_id.to_string(),
            prompt: prompt.to_string(),
        })
    }

    #[tokio::test]
    async fn success_reports_the_inserted_count() {
        let service = service_with(Some(
            r#"[{"title":"Full Name","fieldType":"ShortText","required":true}]"#,
        ));

        let resp = service
            .generate_fields(request("form-1", "a registration form"))
            .await
            .unwrap();
        assert_eq!(resp.into_inner().fields_inserted, 1);
        assert_eq!(service.store.fields("form-1").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn pipeline_failure_is_a_status_carrying_the_machine_code() {
        let service = service_with(Some(r#"[{"title":"broken""#));

        let status = service
            .generate_fields(request("form-1", "anything"))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::Internal);
        assert!(status.message().starts_with("model_response_invalid_syntax:"));
        assert!(service.store.fields("form-1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_maps_to_unavailable() {
        let service = service_with(None);

        let status = service
            .generate_fields(request("form-1", "anything"))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::Unavailable);
        assert!(status.message().starts_with("model_response_failure:"));
    }

    #[tokio::test]
    async fn over_long_prompt_is_rejected_before_the_pipeline_runs() {
        let service = service_with(Some("[]"));
        let long_prompt = "x".repeat(MAX_PROMPT_CHARS + 1);

        let status = service
            .generate_fields(request("form-1", &long_prompt))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }
}
