use serde_json::json;

use crate::AiCommands;
use crate::util::{api_request, parse_json_arg};

pub async fn run(api_url: &str, command: AiCommands) -> i32 {
    match command {
        AiCommands::Tools => {
            api_request(api_url, reqwest::Method::GET, "/ai/tools", None, &[]).await
        }
        AiCommands::Query {
            tool,
            query,
            context,
        } => {
            let mut body = json!({ "tool": tool, "query": query });
            if let Some(raw) = context {
                body["context"] = parse_json_arg("context", &raw);
            }
            api_request(api_url, reqwest::Method::POST, "/ai/query", Some(body), &[]).await
        }
        AiCommands::Chat { message, context } => {
            let mut body = json!({ "message": message });
            if let Some(raw) = context {
                body["context"] = parse_json_arg("context", &raw);
            }
            api_request(api_url, reqwest::Method::POST, "/ai/chat", Some(body), &[]).await
        }
    }
}
