use anyhow::{anyhow, Result};
use clap::Parser;
use fieldsmith::client::FieldsmithClientWrapper;
use std::io::{self, Read};

#[derive(Parser)]
#[command(name = "fieldsmith-cli")]
#[command(about = "CLI client for the fieldsmith field-generation service")]
struct Cli {
    /// Target form id
    #[arg(short, long, default_value = "demo-form")]
    form_id: String,

    /// Server address (e.g., "http://localhost:50051")
    #[arg(short, long, default_value = "http://localhost:50051")]
    server: String,

    /// Prompt text describing the fields to generate (use "-" to read
    /// it from stdin)
    #[arg(short, long, default_value = "-")]
    prompt: String,

    /// Request timeout in seconds
    #[arg(short, long, default_value = "60")]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let prompt = if cli.prompt == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| anyhow!("Failed to read from stdin: {e}"))?;
        buffer.trim().to_string()
    } else {
        cli.prompt.clone()
    };

    if prompt.is_empty() {
        return Err(anyhow!("Prompt must not be empty"));
    }

    println!("Connecting to fieldsmith server at {}...", cli.server);
    let mut client = FieldsmithClientWrapper::connect(cli.server.clone())
        .await
        .map_err(|e| anyhow!("Failed to connect: {e}"))?;

    println!("Generating fields for form '{}'...", cli.form_id);

    let timeout = std::time::Duration::from_secs(cli.timeout);
    let inserted = client
        .generate_fields_with_timeout(cli.form_id.clone(), prompt, timeout)
        .await?;

    println!("Inserted {inserted} field(s) at the top of '{}'", cli.form_id);

    Ok(())
}
