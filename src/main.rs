use group_matcher::{EngineConfig, Group, HandlerError, MatchRule, Matcher, Settings};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const TOPICS: [&str; 6] = ["reading", "games", "football", "movies", "chat", "shopping"];
const PLACES: [&str; 5] = ["pc-room", "library", "cafe", "restaurant", "outdoors"];
const TIMES: [&str; 3] = ["morning", "noon", "evening"];

/// Pick a random non-empty subset of `options`
fn some_of(rng: &mut impl Rng, options: &[&'static str]) -> HashSet<&'static str> {
    let count = rng.gen_range(1..=options.len());
    options.choose_multiple(rng, count).copied().collect()
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::process::exit(1);
    });

    // Initialize logging
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting group matcher demo...");

    let handler = |rule: MatchRule<&'static str, &'static str>, group: Group<Uuid>| -> Result<(), HandlerError> {
        info!(
            "Match: rule={}, group={}",
            serde_json::to_string(&rule)?,
            serde_json::to_string(&group)?
        );
        Ok(())
    };

    let config = EngineConfig::from_settings(vec!["topic", "place", "time"], &settings.matcher);
    let matcher = match Matcher::new(config, handler) {
        Ok(m) => m,
        Err(e) => {
            error!("Failed to create matcher: {}", e);
            std::process::exit(1);
        }
    };

    let mut rng = rand::thread_rng();
    for _ in 0..settings.demo.participants {
        let sizes: HashSet<usize> = (2..=4).filter(|_| rng.gen_bool(0.5)).collect();
        let sizes = if sizes.is_empty() { HashSet::from([2]) } else { sizes };

        let values = HashMap::from([
            ("topic", some_of(&mut rng, &TOPICS)),
            ("place", some_of(&mut rng, &PLACES)),
            ("time", some_of(&mut rng, &TIMES)),
        ]);

        if let Err(e) = matcher.submit(Uuid::new_v4(), sizes, values) {
            error!("Rejected demo participant: {}", e);
        }
    }

    info!("Submitted {} participants", matcher.waiting());

    if let Err(e) = matcher.start() {
        error!("Failed to start scheduler: {}", e);
        std::process::exit(1);
    }

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(settings.demo.run_secs)) => {}
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C"),
    }

    matcher.stop().await;
    info!("Demo finished, {} participants still waiting", matcher.waiting());
}
