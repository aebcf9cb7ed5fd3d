use std::error::Error;
use std::path::PathBuf;

use actix_web::{get, route, web, App, HttpResponse, HttpServer, Responder};
use clap::{Parser, Subcommand};

use mangawatch::app_state::AppState;
use mangawatch::cache::SnapshotStore;
use mangawatch::config::{Config, ConfigError};
use mangawatch::notify::Notifier;
use mangawatch::s3::S3Client;
use mangawatch::scheduler;

/// mangawatch - polls manga sites for new chapters and pushes notifications
#[derive(Parser, Debug)]
#[command(name = "mangawatch")]
#[command(author, version, about)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = "mangawatch.toml")]
    config: PathBuf,

    /// Object-storage access key (overrides the config file)
    #[arg(long, global = true, env = "MANGAWATCH_ACCESS_KEY", hide_env_values = true)]
    access_key: Option<String>,

    /// Object-storage secret key (overrides the config file)
    #[arg(long, global = true, env = "MANGAWATCH_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (plus the background checker when configured)
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 8000)]
        port: u16,
    },

    /// Run one check cycle and print the new chapters as JSON
    Check {
        /// Suppress the JSON report on stdout
        #[arg(long)]
        quiet: bool,
    },
}

/// Trigger a check cycle. GET is allowed so the endpoint works behind dumb
/// uptime pingers and cron-over-curl.
#[route("/", method = "GET", method = "POST")]
async fn trigger(data: web::Data<AppState>) -> impl Responder {
    match data.check().await {
        Ok(fresh) => HttpResponse::Ok().json(fresh),
        Err(e) => {
            log::error!("check failed: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({ "error": e.to_string() }))
        }
    }
}

#[get("/ping")]
async fn ping() -> impl Responder {
    HttpResponse::Ok().body("pong")
}

fn init_logging(level: &str) {
    use log4rs::append::console::ConsoleAppender;
    use log4rs::config::{Appender, Root};
    use log4rs::encode::pattern::PatternEncoder;

    if std::path::Path::new("log4rs.yml").exists() {
        log4rs::init_file("log4rs.yml", Default::default()).expect("invalid log4rs.yml");
        return;
    }

    let level = level.parse().unwrap_or(log::LevelFilter::Info);
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%dT%H:%M:%S)} {h({l})} {t} - {m}{n}",
        )))
        .build();
    let config = log4rs::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .expect("default logging config is valid");
    log4rs::init_config(config).expect("logging initialized twice");
}

fn build_state(mut config: Config, cli: &Cli) -> Result<AppState, Box<dyn Error>> {
    let mut bucket = config.bucket.take().ok_or(ConfigError::MissingBucket)?;
    if let Some(access_key) = &cli.access_key {
        bucket.access_key = access_key.clone();
    }
    if let Some(secret_key) = &cli.secret_key {
        bucket.secret_key = secret_key.clone();
    }

    let s3 = S3Client::new(
        &bucket.endpoint,
        bucket.name,
        bucket.region,
        bucket.access_key,
        bucket.secret_key,
    )?;
    let store = SnapshotStore::new(s3, bucket.key);

    let fetcher = config.http.fetcher()?;
    let notifier = Notifier::new(
        fetcher.client().clone(),
        config.notify.webhook_url.as_deref(),
    )?;

    Ok(AppState {
        fetcher,
        store,
        notifier,
        config,
    })
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;
    init_logging(&config.log_level);

    if config.sources.is_empty() {
        log::warn!("no sources configured; every check will come back empty");
    }

    let check_interval_secs = config.check_interval_secs;
    let state = build_state(config, &cli)?;

    match cli.command {
        Commands::Serve { host, port } => {
            let data = web::Data::new(state);

            if check_interval_secs > 0 {
                scheduler::spawn(data.clone(), check_interval_secs);
            }

            log::info!("listening on {host}:{port}");
            HttpServer::new(move || {
                App::new()
                    .app_data(data.clone())
                    .service(trigger)
                    .service(ping)
            })
            .bind((host.as_str(), port))?
            .run()
            .await?;
        }
        Commands::Check { quiet } => {
            let fresh = state.check().await?;
            if !quiet {
                println!("{}", serde_json::to_string_pretty(&fresh)?);
            }
        }
    }

    Ok(())
}
