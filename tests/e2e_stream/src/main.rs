//! E2E Smoke Test Tool for the SiteWatch streaming/detection API
//!
//! Runs against a live server and exercises the HTTP surface end to end.
//!
//! ```bash
//! # All tests
//! cargo run -- --server http://127.0.0.1:8080 --all
//!
//! # Individual test
//! cargo run -- --server http://127.0.0.1:8080 --test push
//! cargo run -- --server http://127.0.0.1:8080 --test upload
//! ```

use anyhow::{anyhow, Result};
use base64::Engine;
use clap::Parser;
use colored::*;
use reqwest::Client;
use std::time::{Duration, Instant};

/// 1x1 baseline JPEG, enough to drive the full decode/detect/encode path.
const SAMPLE_JPEG_BASE64: &str = "/9j/4AAQSkZJRgABAQAAAQABAAD/2wBDABAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBD/wAALCAABAAEBAREA/8QAHwAAAQUBAQEBAQEAAAAAAAAAAAECAwQFBgcICQoL/8QAtRAAAgEDAwIEAwUFBAQAAAF9AQIDAAQRBRIhMUEGE1FhByJxFDKBkaEII0KxwRVS0fAkM2JyggkKFhcYGRolJicoKSo0NTY3ODk6Q0RFRkdISUpTVFVWV1hZWmNkZWZnaGlqc3R1dnd4eXqDhIWGh4iJipKTlJWWl5iZmqKjpKWmp6ipqrKztLW2t7i5usLDxMXGx8jJytLT1NXW19jZ2uHi4+Tl5ufo6erx8vP09fb3+Pn6/9oACAEBAAA/ACv/2Q==";

#[derive(Parser, Debug)]
#[command(name = "sitewatch-e2e")]
#[command(about = "E2E smoke test tool for the SiteWatch streaming/detection API")]
struct Args {
    /// SiteWatch server URL (e.g., http://127.0.0.1:8080)
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Run all tests
    #[arg(long)]
    all: bool,

    /// Run specific test (health, detector, status, push, push_reject, upload, alerts)
    #[arg(long)]
    test: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Result of a single test case
#[derive(Debug)]
struct TestResult {
    name: String,
    success: bool,
    duration_ms: u64,
    message: String,
    details: Option<String>,
}

impl TestResult {
    fn success(name: &str, duration_ms: u64, message: &str) -> Self {
        Self {
            name: name.to_string(),
            success: true,
            duration_ms,
            message: message.to_string(),
            details: None,
        }
    }

    fn failure(name: &str, duration_ms: u64, message: &str) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            duration_ms,
            message: message.to_string(),
            details: None,
        }
    }

    fn with_details(mut self, details: &str) -> Self {
        self.details = Some(details.to_string());
        self
    }

    fn print(&self) {
        let status = if self.success {
            "✅".green()
        } else {
            "❌".red()
        };
        let result = if self.success { "SUCCESS" } else { "FAILED" };
        println!(
            "{} {}: {} ({}ms)",
            status,
            self.name.bold(),
            result
                .to_string()
                .color(if self.success { Color::Green } else { Color::Red }),
            self.duration_ms
        );
        if !self.message.is_empty() {
            println!("   └─ {}", self.message);
        }
        if let Some(ref details) = self.details {
            for line in details.lines() {
                println!("      {}", line.dimmed());
            }
        }
    }
}

/// Drives test cases against a live server
struct TestRunner {
    client: Client,
    server_url: String,
    verbose: bool,
}

impl TestRunner {
    fn new(server_url: &str, verbose: bool) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            server_url: server_url.trim_end_matches('/').to_string(),
            verbose,
        }
    }

    /// Verify the server answers at all before running test cases
    async fn check_reachable(&self) -> Result<String> {
        let url = format!("{}/healthz", self.server_url);
        let resp: serde_json::Value = self.client.get(&url).send().await?.json().await?;
        if resp["status"].as_str() != Some("ok") {
            return Err(anyhow!("unexpected /healthz payload: {}", resp));
        }
        Ok(resp["version"].as_str().unwrap_or("unknown").to_string())
    }

    /// Test 1: service health
    async fn test_health(&self) -> TestResult {
        let start = Instant::now();
        let url = format!("{}/healthz", self.server_url);

        match self.client.get(&url).send().await {
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                let duration = start.elapsed().as_millis() as u64;

                if !status.is_success() {
                    return TestResult::failure("Health", duration, &format!("HTTP {}", status.as_u16()))
                        .with_details(&body);
                }
                match serde_json::from_str::<serde_json::Value>(&body) {
                    Ok(json) if json["status"] == "ok" => {
                        let viewers = json["viewers"].as_u64().unwrap_or(0);
                        let running = json["stream_running"].as_bool().unwrap_or(false);
                        TestResult::success(
                            "Health",
                            duration,
                            &format!("viewers={} stream_running={}", viewers, running),
                        )
                    }
                    Ok(json) => TestResult::failure("Health", duration, &format!("status != ok: {}", json)),
                    Err(e) => TestResult::failure("Health", duration, &format!("Parse error: {}", e)),
                }
            }
            Err(e) => TestResult::failure(
                "Health",
                start.elapsed().as_millis() as u64,
                &format!("Request error: {}", e),
            ),
        }
    }

    /// Test 2: detector model status
    async fn test_detector(&self) -> TestResult {
        let start = Instant::now();
        let url = format!("{}/detect/health", self.server_url);

        match self.client.get(&url).send().await {
            Ok(resp) => {
                let duration = start.elapsed().as_millis() as u64;
                match resp.json::<serde_json::Value>().await {
                    Ok(json) => {
                        let fire = json["fire_loaded"].as_bool().unwrap_or(false);
                        let ppe = json["ppe_loaded"].as_bool().unwrap_or(false);
                        let msg = format!("fire_loaded={} ppe_loaded={}", fire, ppe);
                        if self.verbose {
                            TestResult::success("Detector Health", duration, &msg)
                                .with_details(&serde_json::to_string_pretty(&json).unwrap_or_default())
                        } else {
                            TestResult::success("Detector Health", duration, &msg)
                        }
                    }
                    Err(e) => TestResult::failure("Detector Health", duration, &format!("Parse error: {}", e)),
                }
            }
            Err(e) => TestResult::failure(
                "Detector Health",
                start.elapsed().as_millis() as u64,
                &format!("Request error: {}", e),
            ),
        }
    }

    /// Test 3: stream session status
    async fn test_stream_status(&self) -> TestResult {
        let start = Instant::now();
        let url = format!("{}/stream/status", self.server_url);

        match self.client.get(&url).send().await {
            Ok(resp) => {
                let duration = start.elapsed().as_millis() as u64;
                match resp.json::<serde_json::Value>().await {
                    Ok(json) => {
                        let running = json["running"].as_bool().unwrap_or(false);
                        let url_field = json["url"].as_str().unwrap_or("-");
                        TestResult::success(
                            "Stream Status",
                            duration,
                            &format!("running={} url={}", running, url_field),
                        )
                    }
                    Err(e) => TestResult::failure("Stream Status", duration, &format!("Parse error: {}", e)),
                }
            }
            Err(e) => TestResult::failure(
                "Stream Status",
                start.elapsed().as_millis() as u64,
                &format!("Request error: {}", e),
            ),
        }
    }

    /// Test 4: push a frame through the detection pipeline
    async fn test_push(&self) -> TestResult {
        let start = Instant::now();
        let url = format!("{}/stream/push", self.server_url);
        let body = serde_json::json!({
            "image": format!("data:image/jpeg;base64,{}", SAMPLE_JPEG_BASE64),
            "kind": "both"
        });

        match self.client.post(&url).json(&body).send().await {
            Ok(resp) => {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                let duration = start.elapsed().as_millis() as u64;

                if !status.is_success() {
                    return TestResult::failure("Push Frame", duration, &format!("HTTP {}", status.as_u16()))
                        .with_details(&text);
                }
                match serde_json::from_str::<serde_json::Value>(&text) {
                    Ok(json) if json["ok"] == true => {
                        let score = json["risk"]["score"].as_u64().unwrap_or(0);
                        let level = json["risk"]["level"].as_str().unwrap_or("?");
                        TestResult::success("Push Frame", duration, &format!("score={} level={}", score, level))
                    }
                    Ok(json) => TestResult::failure("Push Frame", duration, &format!("ok != true: {}", json)),
                    Err(e) => TestResult::failure("Push Frame", duration, &format!("Parse error: {}", e)),
                }
            }
            Err(e) => TestResult::failure(
                "Push Frame",
                start.elapsed().as_millis() as u64,
                &format!("Request error: {}", e),
            ),
        }
    }

    /// Test 5: malformed push payloads are rejected, not crashed on
    async fn test_push_reject(&self) -> TestResult {
        let start = Instant::now();
        let url = format!("{}/stream/push", self.server_url);
        let body = serde_json::json!({ "image": "data:text/plain;base64,AAAA" });

        match self.client.post(&url).json(&body).send().await {
            Ok(resp) => {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                let duration = start.elapsed().as_millis() as u64;

                if status.as_u16() == 400 {
                    TestResult::success("Push Reject", duration, "Bad dataURL rejected with 400")
                        .with_details(&text)
                } else {
                    TestResult::failure(
                        "Push Reject",
                        duration,
                        &format!("Expected HTTP 400, got {}", status.as_u16()),
                    )
                    .with_details(&text)
                }
            }
            Err(e) => TestResult::failure(
                "Push Reject",
                start.elapsed().as_millis() as u64,
                &format!("Request error: {}", e),
            ),
        }
    }

    /// Test 6: multipart image upload with annotation
    async fn test_upload(&self) -> TestResult {
        let start = Instant::now();
        let url = format!("{}/detect/image", self.server_url);

        let jpeg = match base64::engine::general_purpose::STANDARD.decode(SAMPLE_JPEG_BASE64) {
            Ok(b) => b,
            Err(e) => return TestResult::failure("Image Upload", 0, &format!("Fixture decode error: {}", e)),
        };
        let part = match reqwest::multipart::Part::bytes(jpeg)
            .file_name("smoke.jpg")
            .mime_str("image/jpeg")
        {
            Ok(p) => p,
            Err(e) => return TestResult::failure("Image Upload", 0, &format!("Part error: {}", e)),
        };
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", "both");

        match self.client.post(&url).multipart(form).send().await {
            Ok(resp) => {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                let duration = start.elapsed().as_millis() as u64;

                if !status.is_success() {
                    return TestResult::failure("Image Upload", duration, &format!("HTTP {}", status.as_u16()))
                        .with_details(&text);
                }
                match serde_json::from_str::<serde_json::Value>(&text) {
                    Ok(json) if json["ok"] == true => {
                        let original = json["original_url"].as_str().unwrap_or("?");
                        let annotated = json["annotated"]
                            .as_object()
                            .map(|m| m.len())
                            .unwrap_or(0);
                        let result = TestResult::success(
                            "Image Upload",
                            duration,
                            &format!("original={} annotated_files={}", original, annotated),
                        );
                        if self.verbose {
                            result.with_details(&text)
                        } else {
                            result
                        }
                    }
                    Ok(json) => TestResult::failure("Image Upload", duration, &format!("ok != true: {}", json)),
                    Err(e) => TestResult::failure("Image Upload", duration, &format!("Parse error: {}", e)),
                }
            }
            Err(e) => TestResult::failure(
                "Image Upload",
                start.elapsed().as_millis() as u64,
                &format!("Request error: {}", e),
            ),
        }
    }

    /// Test 7: alert history listing
    async fn test_alerts(&self) -> TestResult {
        let start = Instant::now();
        let url = format!("{}/alerts?limit=5", self.server_url);

        match self.client.get(&url).send().await {
            Ok(resp) => {
                let duration = start.elapsed().as_millis() as u64;
                match resp.json::<serde_json::Value>().await {
                    Ok(json) if json["ok"] == true => {
                        let count = json["data"].as_array().map(|a| a.len()).unwrap_or(0);
                        TestResult::success("Alerts", duration, &format!("{} recent alert(s)", count))
                    }
                    Ok(json) => TestResult::failure("Alerts", duration, &format!("ok != true: {}", json)),
                    Err(e) => TestResult::failure("Alerts", duration, &format!("Parse error: {}", e)),
                }
            }
            Err(e) => TestResult::failure(
                "Alerts",
                start.elapsed().as_millis() as u64,
                &format!("Request error: {}", e),
            ),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    println!("{}", "═".repeat(60).blue());
    println!("{}", "  SiteWatch Streaming API E2E Test Tool".bold());
    println!("{}", "═".repeat(60).blue());
    println!();
    println!("Target: {}", args.server.cyan());
    println!();

    let runner = TestRunner::new(&args.server, args.verbose);

    println!("{}", "Checking server is reachable...".yellow());
    match runner.check_reachable().await {
        Ok(version) => {
            println!("  {} Server up (v{})", "✓".green(), version.cyan());
        }
        Err(e) => {
            println!("  {} {}", "✗".red(), e);
            return Err(e);
        }
    }
    println!();

    let tests_to_run: Vec<&str> = if args.all {
        vec!["health", "detector", "status", "push", "push_reject", "upload", "alerts"]
    } else if let Some(ref test) = args.test {
        vec![test.as_str()]
    } else {
        vec!["health", "detector", "push"]
    };

    println!("{}", "Running tests...".yellow());
    println!("{}", "─".repeat(60));

    let mut results: Vec<TestResult> = Vec::new();
    for test in &tests_to_run {
        let result = match *test {
            "health" => runner.test_health().await,
            "detector" => runner.test_detector().await,
            "status" => runner.test_stream_status().await,
            "push" => runner.test_push().await,
            "push_reject" => runner.test_push_reject().await,
            "upload" => runner.test_upload().await,
            "alerts" => runner.test_alerts().await,
            _ => TestResult::failure(test, 0, "Unknown test"),
        };
        result.print();
        results.push(result);
    }

    println!("{}", "─".repeat(60));

    let passed = results.iter().filter(|r| r.success).count();
    let failed = results.iter().filter(|r| !r.success).count();
    let total = results.len();

    println!();
    if failed == 0 {
        println!("{} All {} tests passed!", "✅".green(), total);
    } else {
        println!("{} {} passed, {} failed", "⚠️".yellow(), passed, failed);
    }

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
