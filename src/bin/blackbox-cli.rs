use clap::{Parser, Subcommand};
use reqwest::header::HeaderMap;

use blackbox_service::telemetry::propagation::{parse_traceparent, TraceContextPropagator};
use blackbox_service::telemetry::{SpanId, TraceContext, TraceFlags, TraceId};

#[derive(Parser)]
#[command(name = "blackbox-cli")]
#[command(about = "Send traced requests to the blackbox service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8090")]
    url: String,

    /// Continue an existing trace instead of starting a new one
    #[arg(short, long)]
    traceparent: Option<String>,

    /// Requests to send; each gets its own client span id
    #[arg(short, long, default_value_t = 1)]
    count: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET /quote (server span plus kernel span)
    Quote,
    /// GET /calc (kernel span only)
    Calc,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let propagator = TraceContextPropagator::new();

    let trace_id = match &cli.traceparent {
        Some(value) => parse_traceparent(value)?.trace_id(),
        None => TraceId::random(),
    };
    let path = match cli.command {
        Commands::Quote => "quote",
        Commands::Calc => "calc",
    };
    let url = format!("{}/{}", cli.url.trim_end_matches('/'), path);

    for _ in 0..cli.count {
        let context = TraceContext::new(trace_id, SpanId::random(), TraceFlags::SAMPLED, false);
        let mut headers = HeaderMap::new();
        propagator.inject(&context, &mut headers);

        let res = client.get(&url).headers(headers).send().await?;
        let status = res.status();
        let body = res.text().await.unwrap_or_default();

        println!(
            "trace_id={} parent_span_id={} status={} body={:?}",
            context.trace_id(),
            context.span_id(),
            status,
            body
        );
        if !status.is_success() {
            eprintln!("Error: service returned status {}", status);
        }
    }

    Ok(())
}
