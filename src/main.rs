use anyhow::{anyhow, bail, Context, Result};
use std::env;
use tracing::Level;
use uuid::Uuid;

use pokemon_todo::logging::init_logging;
use pokemon_todo::{
    complete_move_with_reward, open_database, Difficulty, HealthStatus, PowerEstimator, Settings,
};

fn main() -> Result<()> {
    init_logging(Level::WARN);

    let args: Vec<String> = env::args().skip(1).collect();
    let settings = Settings::load_with_dotenv().context("Failed to load settings")?;

    match args.first().map(String::as_str) {
        Some("init") => run_init(&settings),
        Some("estimate") => run_estimate(&settings, &args[1..]),
        Some("complete") => run_complete(&settings, &args[1..]),
        Some("ai-health") => run_ai_health(&settings),
        Some("help") | Some("--help") | Some("-h") | None => {
            print_usage();
            Ok(())
        }
        Some(other) => {
            print_usage();
            bail!("Unknown command '{}'", other)
        }
    }
}

fn print_usage() {
    println!("🎮 Pokemon TODO v{}", pokemon_todo::VERSION);
    println!();
    println!("Usage:");
    println!("  pokemon-todo init                                        Create the database schema");
    println!("  pokemon-todo estimate <name> [description] [--difficulty easy|medium|hard]");
    println!("  pokemon-todo complete <move-id>                          Finish a Move and award experience");
    println!("  pokemon-todo ai-health                                   Check the LM Studio connection");
}

fn run_init(settings: &Settings) -> Result<()> {
    println!("🔧 Setting up database...");
    open_database(settings.database_path())
        .with_context(|| format!("Failed to open database at {}", settings.database_path()))?;
    println!("✓ Database ready at {} (WAL mode, foreign keys on)", settings.database_path());
    Ok(())
}

/// `<name> [description] [--difficulty d]`
fn parse_estimate_args(args: &[String]) -> Result<(String, Option<String>, Difficulty)> {
    let mut positional = Vec::new();
    let mut difficulty = Difficulty::default();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--difficulty" {
            let value = iter.next().ok_or_else(|| anyhow!("--difficulty needs a value"))?;
            difficulty = value.parse().map_err(|e: String| anyhow!(e))?;
        } else {
            positional.push(arg.clone());
        }
    }

    let mut positional = positional.into_iter();
    let name = positional.next().ok_or_else(|| anyhow!("Missing <name>"))?;
    let description = positional.next();

    if positional.next().is_some() {
        bail!("Too many arguments; quote the description");
    }

    Ok((name, description, difficulty))
}

fn run_estimate(settings: &Settings, args: &[String]) -> Result<()> {
    let (name, description, difficulty) = parse_estimate_args(args)?;
    let estimator = PowerEstimator::from_settings(settings)?;

    println!("🔋 Estimating power for \"{}\" ({})...", name, difficulty);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let estimate = runtime.block_on(estimator.estimate_power(&name, description.as_deref(), difficulty));

    let source = if estimate.ai_generated { "🤖 AI" } else { "📏 fallback rules" };
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Power:          {}", estimate.power);
    println!("Difficulty:     {}/10", estimate.difficulty_score);
    println!("Estimated time: {}", estimate.estimated_time);
    println!("Source:         {}", source);
    println!("Reasoning:      {}", estimate.reasoning);
    Ok(())
}

fn run_complete(settings: &Settings, args: &[String]) -> Result<()> {
    let raw_id = args.first().ok_or_else(|| anyhow!("Missing <move-id>"))?;
    let move_id = Uuid::parse_str(raw_id).with_context(|| format!("'{}' is not a valid move id", raw_id))?;

    let conn = open_database(settings.database_path())?;
    let outcome = complete_move_with_reward(&conn, move_id)?;

    if outcome.experience_awarded == 0.0 {
        println!("✓ \"{}\" was already completed, no experience awarded", outcome.mv.name);
        return Ok(());
    }

    println!("✅ Completed \"{}\" (power {})", outcome.mv.name, outcome.mv.power);
    println!(
        "   {} gained {} XP → level {} ({}/100 XP)",
        outcome.pokemon.name, outcome.experience_awarded, outcome.pokemon.level, outcome.pokemon.experience
    );

    if outcome.report.levels_gained > 0 {
        println!("🎉 Level up! +{} level(s)", outcome.report.levels_gained);
    }
    if outcome.report.evolved() {
        println!("✨ {} evolved to stage {}!", outcome.pokemon.name, outcome.pokemon.evolution_stage);
    }
    Ok(())
}

fn run_ai_health(settings: &Settings) -> Result<()> {
    let estimator = PowerEstimator::from_settings(settings)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let report = runtime.block_on(estimator.health_check());

    match report.status {
        HealthStatus::Healthy => {
            println!("✅ LM Studio reachable at {}", settings.lm_studio_url);
            for model in report.available_models.unwrap_or_default() {
                println!("   • {}", model);
            }
            if report.preferred_model_available == Some(false) {
                println!("⚠️  No model matching \"{}\" is loaded", settings.preferred_model_hint);
            }
        }
        HealthStatus::Unhealthy | HealthStatus::Unreachable => {
            eprintln!("❌ LM Studio {:?}: {}", report.status, report.error.unwrap_or_default());
            eprintln!("   Power estimates will use the fallback rules.");
        }
    }
    Ok(())
}
