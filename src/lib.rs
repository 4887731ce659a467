pub mod client;
pub mod editor;
pub mod error;
pub mod field;
pub mod llm;
pub mod mapper;
pub mod pipeline;
pub mod prompt;
pub mod suggestion;

pub mod rpc {
    pub mod fieldsmith {
        tonic::include_proto!("fieldsmith");
    }
}
