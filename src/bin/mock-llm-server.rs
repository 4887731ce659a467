use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Deserialize)]
struct ChatRequest {
    #[allow(dead_code)]
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Serialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Serialize)]
struct ResponseMessage {
    role: String,
    content: String,
}

/// Canned provider behaviors, selected with MOCK_LLM_MODE. Each one
/// exercises a different branch of the pipeline's error taxonomy.
#[derive(Clone, Copy)]
enum Mode {
    Valid,
    BadJson,
    BadSchema,
    EmptyChoices,
}

impl Mode {
    fn from_env() -> Mode {
        match std::env::var("MOCK_LLM_MODE").as_deref() {
            Ok("bad-json") => Mode::BadJson,
            Ok("bad-schema") => Mode::BadSchema,
            Ok("empty-choices") => Mode::EmptyChoices,
            _ => Mode::Valid,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Mode::Valid => "valid",
            Mode::BadJson => "bad-json",
            Mode::BadSchema => "bad-schema",
            Mode::EmptyChoices => "empty-choices",
        }
    }
}

const VALID_SUGGESTIONS: &str = r#"[
    {"title": "Full Name", "fieldType": "ShortText", "required": true},
    {"title": "Preferred contact method", "fieldType": "Radio", "required": true,
     "fieldOptions": ["Email", "Phone", "Post"]},
    {"title": "Household members", "fieldType": "Table", "required": true,
     "columns": ["Name", "Relationship"], "minimumRows": 1, "addMoreRows": true},
    {"title": "Supporting documents", "fieldType": "Attachment", "required": false},
    {"title": "Declaration", "fieldType": "Statement", "required": true,
     "description": "I declare that the information provided is true and correct."}
]"#;

const BAD_SCHEMA_SUGGESTIONS: &str = r#"[
    {"title": "Portrait", "fieldType": "Image", "required": true}
]"#;

fn completion_body(mode: Mode) -> String {
    let choices = match mode {
        Mode::Valid => vec![choice(VALID_SUGGESTIONS)],
        Mode::BadJson => vec![choice(r#"[{"title": "Broken", "fieldType": "#)],
        Mode::BadSchema => vec![choice(BAD_SCHEMA_SUGGESTIONS)],
        Mode::EmptyChoices => Vec::new(),
    };
    serde_json::to_string(&ChatResponse { choices }).expect("static response serializes")
}

fn choice(content: &str) -> Choice {
    Choice {
        message: ResponseMessage {
            role: "assistant".to_string(),
            content: content.to_string(),
        },
    }
}

/// Truncate to at most `max_chars` characters, never inside a
/// multi-byte character.
fn preview(content: &str, max_chars: usize) -> String {
    content.chars().take(max_chars).collect()
}

async fn handle_connection(mut stream: tokio::net::TcpStream, mode: Mode) {
    let mut buffer = [0u8; 65536];

    match stream.read(&mut buffer).await {
        Ok(n) if n > 0 => {
            let request = String::from_utf8_lossy(&buffer[..n]);

            let first_line = request.lines().next().unwrap_or("");
            println!("Received request: {}", first_line);

            if !request.contains("POST") {
                let response = b"HTTP/1.1 404 Not Found\r\nConnection: close\r\n\r\n";
                let _ = stream.write_all(response).await;
                let _ = stream.shutdown().await;
                return;
            }

            // Find the JSON body (after \r\n\r\n)
            let body_start = request.find("\r\n\r\n").map(|i| i + 4).unwrap_or(0);
            let body_str = &request[body_start..];

            let mut content_length = 0;
            for line in request.lines() {
                if line.to_lowercase().starts_with("content-length:") {
                    if let Some(len_str) = line.split(':').nth(1) {
                        content_length = len_str.trim().parse().unwrap_or(0);
                        break;
                    }
                }
            }

            let body = if content_length > 0 && body_str.len() >= content_length {
                &body_str[..content_length]
            } else {
                body_str.trim_end_matches('\0').trim()
            };

            let req: ChatRequest = match serde_json::from_str(body) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Failed to parse chat request: {}", e);
                    let error_response = format!(
                        "HTTP/1.1 400 Bad Request\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n{{\"error\":\"{}\"}}",
                        e
                    );
                    let _ = stream.write_all(error_response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                    return;
                }
            };

            if let Some(user) = req.messages.iter().find(|m| m.role == "user") {
                println!("Prompt preview: {}...", preview(&user.content, 200));
            }
            println!("Mock LLM: answering in '{}' mode", mode.name());

            let response_body = completion_body(mode);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                response_body.len(),
                response_body
            );
            let _ = stream.write_all(response.as_bytes()).await;
        }
        _ => {}
    }

    let _ = stream.shutdown().await;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port = std::env::var("MOCK_LLM_PORT")
        .unwrap_or_else(|_| "8081".to_string())
        .parse::<u16>()
        .unwrap_or(8081);

    let mode = Mode::from_env();

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    println!("Mock LLM server listening on http://{}", addr);
    println!("Answering in '{}' mode (set MOCK_LLM_MODE to change)", mode.name());
    println!("Using simple HTTP/1.1 server (no HTTP/2, no upgrades)");

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                tokio::spawn(async move {
                    handle_connection(stream, mode).await;
                });
            }
            Err(e) => {
                eprintln!("Error accepting connection: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::preview;

    #[test]
    fn preview_truncates_on_character_boundaries() {
        // 'é' is two bytes; a byte-indexed slice at 3 would panic.
        let text = "ééé";
        assert_eq!(preview(text, 2), "éé");
        assert_eq!(preview(text, 10), "ééé");
        assert_eq!(preview("", 5), "");
    }
}
