use clap::Parser;
use pdf_qa::config::Cli;
use pdf_qa::credentials;
use pdf_qa::error::AppError;
use pdf_qa::rag;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "pdf_qa=debug,info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<AppError>() {
        Some(AppError::MissingApiKey) => println!("{}", credentials::guidance()),
        Some(app_err) if app_err.is_configuration() => {
            println!("Nyaa~! {}", app_err);
        }
        _ => {
            println!("Nya-nya-nya! An error occurred: {:#}", err);
            eprintln!("{:?}", err);

            println!("\nTroubleshooting hints, nyan:");
            println!("1. Check your network connection and that the OpenAI API is reachable");
            println!("2. Check that the API key is correct (--api_key, .env or OPENAI_API_KEY)");
            println!("3. Check that the PDF file exists, is readable and contains text");
            println!("4. Check that the model names are correct (--model, --embedding_model)");
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load .env file if present; variables already in the environment win.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = rag::run(&cli, credentials::env_value()).await {
        report(&e);
        std::process::exit(1);
    }
}
