use serde_json::json;

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Execute an API request, print the JSON response, return an exit code.
///
/// Exit codes: 0=success (2xx), 1=client error (4xx), 2=server error (5xx),
///             3=connection error, 4=usage error
pub async fn api_request(
    api_url: &str,
    method: reqwest::Method,
    path: &str,
    body: Option<serde_json::Value>,
    query: &[(String, String)],
) -> i32 {
    let url = match reqwest::Url::parse(&format!("{api_url}{path}")) {
        Ok(mut u) => {
            if !query.is_empty() {
                let mut q = u.query_pairs_mut();
                for (k, v) in query {
                    q.append_pair(k, v);
                }
            }
            u
        }
        Err(e) => {
            let err = json!({
                "error": "cli_error",
                "message": format!("Invalid URL: {api_url}{path}: {e}")
            });
            eprintln!("{}", serde_json::to_string_pretty(&err).unwrap());
            return 4;
        }
    };

    let mut req = client().request(method, url);
    if let Some(b) = body {
        req = req.json(&b);
    }

    let resp = match req.send().await {
        Ok(r) => r,
        Err(e) => {
            let err = json!({
                "error": "connection_error",
                "message": format!("{e}"),
                "docs_hint": "Is the API server running? Check QMS_API_URL."
            });
            eprintln!("{}", serde_json::to_string_pretty(&err).unwrap());
            return 3;
        }
    };

    let status = resp.status().as_u16();
    let exit_code = match status {
        200..=299 => 0,
        400..=499 => 1,
        _ => 2,
    };

    match resp.text().await {
        Ok(text) => {
            // Pretty-print when the body is JSON, pass through otherwise
            match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(value) => println!("{}", serde_json::to_string_pretty(&value).unwrap()),
                Err(_) => println!("{text}"),
            }
        }
        Err(e) => {
            eprintln!("Failed to read response body: {e}");
            return 3;
        }
    }

    exit_code
}

/// Parse an inline JSON argument (e.g. --context), exiting on bad input.
pub fn parse_json_arg(name: &str, raw: &str) -> serde_json::Value {
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            let err = json!({
                "error": "cli_error",
                "message": format!("--{name} must be valid JSON: {e}")
            });
            eprintln!("{}", serde_json::to_string_pretty(&err).unwrap());
            std::process::exit(4);
        }
    }
}
