use anyhow::{anyhow, Result};
use std::time::Duration;
use tonic::transport::Channel;

use crate::rpc::fieldsmith::fieldsmith_client::FieldsmithClient;
use crate::rpc::fieldsmith::GenerateFieldsRequest;

/// Convenience wrapper over the generated gRPC client.
pub struct FieldsmithClientWrapper {
    client: FieldsmithClient<Channel>,
}

impl FieldsmithClientWrapper {
    pub async fn connect(addr: String) -> Result<Self> {
        let client = FieldsmithClient::connect(addr)
            .await
            .map_err(|e| anyhow!("Failed to connect to fieldsmith server: {e}"))?;

        Ok(Self { client })
    }

    /// Ask the server to generate and insert fields for a form.
    /// Returns the number of fields inserted. Failures arrive as a
    /// gRPC status whose message starts with the machine error code.
    pub async fn generate_fields(&mut self, form_id: String, prompt: String) -> Result<u32> {
        let request = tonic::Request::new(GenerateFieldsRequest { form_id, prompt });

        let response = self
            .client
            .generate_fields(request)
            .await
            .map_err(|e| anyhow!("Field generation failed: {}", e.message()))?;

        Ok(response.into_inner().fields_inserted)
    }

    pub async fn generate_fields_with_timeout(
        &mut self,
        form_id: String,
        prompt: String,
        timeout: Duration,
    ) -> Result<u32> {
        let request = tonic::Request::new(GenerateFieldsRequest { form_id, prompt });

        let response = tokio::time::timeout(timeout, self.client.generate_fields(request))
            .await
            .map_err(|_| anyhow!("Request timed out after {:?}", timeout))?
            .map_err(|e| anyhow!("Field generation failed: {}", e.message()))?;

        Ok(response.into_inner().fields_inserted)
    }
}
