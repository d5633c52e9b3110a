use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Parser)]
#[command(name = "ql-annotate", about = "Refine content with quill and rate the result")]
struct Args {
    #[arg(long, default_value = "http://localhost:8080")]
    api_base: String,
    /// File to refine; `-` reads stdin.
    #[arg(long)]
    input: PathBuf,
    #[arg(long)]
    style: Option<String>,
    #[arg(long)]
    max_iterations: Option<u32>,
    /// Notes forwarded to every edit round.
    #[arg(long)]
    feedback: Option<String>,
    /// Rate N independently generated variants instead of one refinement.
    #[arg(long)]
    variants: Option<usize>,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct RefineRequest<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_iterations: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    human_feedback: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct VariantsRequest<'a> {
    content: &'a str,
    count: usize,
}

#[derive(Debug, Deserialize)]
struct Review {
    quality_score: f64,
    clarity_score: f64,
    engagement_score: f64,
    accuracy_score: f64,
    #[serde(default)]
    improvements_needed: Vec<String>,
    ready_for_human: bool,
    #[serde(default)]
    overall_feedback: String,
}

#[derive(Debug, Deserialize)]
struct Iteration {
    iteration: u32,
    content: String,
    review: Review,
    review_substituted: bool,
    processing_ms: u64,
}

#[derive(Debug, Deserialize)]
struct Outcome {
    style: String,
    final_content: String,
    termination: String,
    iterations: Vec<Iteration>,
}

#[derive(Debug, Deserialize)]
struct RefineResponse {
    version_id: String,
    style_source: String,
    max_iterations: u32,
    outcome: Outcome,
}

#[derive(Debug, Deserialize)]
struct Variant {
    version_id: String,
    content: String,
    style: String,
    ai_review: Review,
}

#[derive(Debug, Deserialize)]
struct VariantsResponse {
    variants: Vec<Variant>,
    selected_index: usize,
    mode: String,
}

#[derive(Debug, Serialize)]
struct FeedbackRequest<'a> {
    version_id: &'a str,
    rating: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BestParameters {
    style: String,
    iterations: u32,
    avg_score: f64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

// ---------------------------------------------------------------------------
// Terminal helpers
// ---------------------------------------------------------------------------

fn prompt_line(prompt: &str) -> io::Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut input = String::new();
    match io::stdin().read_line(&mut input) {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(input.trim().to_owned())),
        Err(err) => Err(err),
    }
}

fn read_input(path: &Path) -> io::Result<String> {
    if path.as_os_str() == "-" {
        let mut content = String::new();
        io::stdin().read_to_string(&mut content)?;
        Ok(content)
    } else {
        std::fs::read_to_string(path)
    }
}

fn excerpt(text: &str, limit: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

fn print_review(review: &Review) {
    println!(
        "  quality {:.1}  clarity {:.1}  engagement {:.1}  accuracy {:.1}  ready {}",
        review.quality_score,
        review.clarity_score,
        review.engagement_score,
        review.accuracy_score,
        if review.ready_for_human {
            "yes".bright_green()
        } else {
            "no".yellow()
        }
    );
    if !review.improvements_needed.is_empty() {
        println!("  improve: {}", review.improvements_needed.join("; "));
    }
    if !review.overall_feedback.is_empty() {
        println!("  notes: {}", excerpt(&review.overall_feedback, 160).dimmed());
    }
}

/// Asks for a rating in [0, 1]. `None` means the human skipped.
fn ask_rating() -> Option<f64> {
    loop {
        let input = match prompt_line("Rate this version 0.0-1.0 [Enter to skip]: ") {
            Ok(Some(value)) => value,
            Ok(None) => {
                println!();
                return None;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: failed to read rating: {err}").red());
                return None;
            }
        };

        if input.is_empty() {
            return None;
        }
        match input.parse::<f64>() {
            Ok(rating) if (0.0..=1.0).contains(&rating) => return Some(rating),
            _ => eprintln!("{}", "Please enter a number between 0 and 1.".yellow()),
        }
    }
}

fn ask_comment() -> Option<String> {
    match prompt_line("Comment (or Enter to skip): ") {
        Ok(Some(value)) if !value.is_empty() => Some(value),
        Ok(_) => None,
        Err(err) => {
            eprintln!("{}", format!("Error: failed to read comment: {err}").red());
            None
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|v| v.error.message)
        .unwrap_or(body);
    format!("({status}) {message}")
}

async fn post_json<B: Serialize, R: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    body: &B,
) -> Result<R, String> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|err| format!("connection error: {err}. Please check --api-base and server status."))?;
    if !response.status().is_success() {
        return Err(error_message(response).await);
    }
    response
        .json::<R>()
        .await
        .map_err(|err| format!("unexpected response: {err}"))
}

async fn rate_version(client: &reqwest::Client, api_base: &str, version_id: &str) {
    let Some(rating) = ask_rating() else {
        println!("{}", "Skipped.".dimmed());
        return;
    };
    let comment = ask_comment();

    let request = FeedbackRequest {
        version_id,
        rating,
        comment,
    };
    let response = client
        .post(format!("{api_base}/v1/feedback"))
        .json(&request)
        .send()
        .await;

    match response {
        Ok(response) if response.status().is_success() => {
            println!("{}", "Feedback saved.".bright_green());
        }
        Ok(response) => {
            eprintln!(
                "{}",
                format!("Error: failed to save feedback {}", error_message(response).await).red()
            );
        }
        Err(err) => {
            eprintln!("{}", format!("Error: failed to save feedback: {err}").red());
        }
    }
}

// ---------------------------------------------------------------------------
// Flows
// ---------------------------------------------------------------------------

async fn refine_flow(client: &reqwest::Client, api_base: &str, args: &Args, content: &str) {
    let request = RefineRequest {
        content,
        style: args.style.as_deref(),
        max_iterations: args.max_iterations,
        human_feedback: args.feedback.as_deref(),
    };

    println!("{}", "Refining...".bright_cyan());
    let result: RefineResponse =
        match post_json(client, &format!("{api_base}/v1/refine"), &request).await {
            Ok(result) => result,
            Err(err) => {
                eprintln!("{}", format!("Refinement failed: {err}").red());
                return;
            }
        };

    println!(
        "style {} ({}), budget {}",
        result.outcome.style.bold(),
        result.style_source,
        result.max_iterations
    );
    for round in &result.outcome.iterations {
        let marker = if round.review_substituted {
            " (default review)".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "{}{} {}",
            format!("Round {}", round.iteration).bright_cyan(),
            marker,
            format!("{} ms", round.processing_ms).dimmed()
        );
        println!("  {}", excerpt(&round.content, 120));
        print_review(&round.review);
    }
    println!("finished: {}", result.outcome.termination.bold());
    println!();
    println!("{}", result.outcome.final_content.bright_green());
    println!();

    rate_version(client, api_base, &result.version_id).await;
}

async fn variants_flow(client: &reqwest::Client, api_base: &str, count: usize, content: &str) {
    let request = VariantsRequest { content, count };

    println!("{}", format!("Generating {count} variants...").bright_cyan());
    let result: VariantsResponse =
        match post_json(client, &format!("{api_base}/v1/variants"), &request).await {
            Ok(result) => result,
            Err(err) => {
                eprintln!("{}", format!("Variant generation failed: {err}").red());
                return;
            }
        };

    for (index, variant) in result.variants.iter().enumerate() {
        let picked = if index == result.selected_index {
            format!(" <- selected ({})", result.mode).bright_green().to_string()
        } else {
            String::new()
        };
        println!(
            "{}{}",
            format!("Variant {} [{}]", index + 1, variant.style).bright_cyan(),
            picked
        );
        println!("{}", variant.content);
        print_review(&variant.ai_review);
        rate_version(client, api_base, &variant.version_id).await;
        println!();
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let api_base = args.api_base.trim_end_matches('/').to_owned();
    let client = reqwest::Client::new();

    let content = match read_input(&args.input) {
        Ok(content) if !content.trim().is_empty() => content,
        Ok(_) => {
            eprintln!("{}", "Input is empty.".red());
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!(
                "{}",
                format!("Failed to read {}: {err}", args.input.display()).red()
            );
            std::process::exit(1);
        }
    };

    match args.variants {
        Some(count) => variants_flow(&client, &api_base, count, &content).await,
        None => refine_flow(&client, &api_base, &args, &content).await,
    }

    match client
        .get(format!("{api_base}/v1/best-parameters"))
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => {
            if let Ok(best) = response.json::<BestParameters>().await {
                println!(
                    "{}",
                    format!(
                        "Learned best: style {} with {} iterations (avg rating {:.2})",
                        best.style, best.iterations, best.avg_score
                    )
                    .dimmed()
                );
            }
        }
        Ok(response) => {
            eprintln!("{}", error_message(response).await.yellow());
        }
        Err(err) => {
            eprintln!("{}", format!("Failed to fetch best parameters: {err}").yellow());
        }
    }
}
