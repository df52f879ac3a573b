//! NBA season projection CLI
//!
//! Trains per-player cumulative-points models from the NBA stats API and
//! projects end-of-season totals.

use clap::{Parser, Subcommand};
use hoops::{Config, PlayerId, Result, Season, Stat};

#[derive(Parser)]
#[command(name = "hoops")]
#[command(about = "NBA season projections from per-player trend models", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "hoops.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the projection model for one player
    Train {
        /// NBA stats player id
        player: u32,
        /// Season, e.g. 2024-25 (default: current season)
        #[arg(long)]
        season: Option<Season>,
    },
    /// Train projection models for every player in a season
    TrainAll {
        /// Season, e.g. 2024-25 (default: current season)
        season: Option<Season>,
        /// Worker threads (default: from config)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Project a player's season points from the trained model
    Predict {
        /// NBA stats player id
        player: u32,
        #[arg(long)]
        season: Option<Season>,
        /// Project cumulative points through this game instead
        #[arg(long)]
        at: Option<u32>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Heuristic projections for every player in the league
    Projections {
        #[arg(long)]
        season: Option<Season>,
        /// Team abbreviation or id
        #[arg(long)]
        team: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Cumulative stat trend for a player with its heuristic projection
    Trend {
        /// NBA stats player id
        player: u32,
        /// pts, reb or ast
        #[arg(long, default_value = "pts")]
        stat: Stat,
        #[arg(long)]
        season: Option<Season>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Model management commands
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Show a stored model
    Info {
        player: u32,
        #[arg(long)]
        season: Option<Season>,
    },
    /// List stored models
    List,
    /// Delete a stored model
    Delete {
        player: u32,
        #[arg(long)]
        season: Option<Season>,
    },
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Train { player, season } => commands::train(&config, player, season),
        Commands::TrainAll { season, workers } => commands::train_all(&config, season, workers),
        Commands::Predict {
            player,
            season,
            at,
            format,
        } => commands::predict(&config, player, season, at, format),
        Commands::Projections {
            season,
            team,
            format,
        } => commands::projections(&config, season, team, format),
        Commands::Trend {
            player,
            stat,
            season,
            format,
        } => commands::trend(&config, player, stat, season, format),
        Commands::Model { action } => match action {
            ModelCommands::Info { player, season } => commands::model_info(&config, player, season),
            ModelCommands::List => commands::model_list(&config),
            ModelCommands::Delete { player, season } => {
                commands::model_delete(&config, player, season)
            }
        },
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use hoops::data::{ModelKey, ModelStore, NbaStatsClient, StatsSource};
    use hoops::predict::inference::format_projection;
    use hoops::predict::{HeuristicProjector, Predictor};
    use hoops::training::{BatchTrainer, TrainOutcome, Trainer};

    fn season_or_current(season: Option<Season>) -> Season {
        season.unwrap_or_else(|| Season::current(chrono::Local::now().date_naive()))
    }

    fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
        serde_json::to_string_pretty(value)
            .map_err(|e| hoops::ProjectionError::Config(format!("Failed to encode JSON: {}", e)))
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.model_dir)?;
        println!("Created {}/ directory", config.data.model_dir);

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'hoops train-all' to train every player this season");
        println!("  3. Run 'hoops predict <PLAYER_ID>' to project a season total");

        Ok(())
    }

    pub fn train(config: &Config, player: u32, season: Option<Season>) -> Result<()> {
        let season = season_or_current(season);
        let source = NbaStatsClient::new(&config.stats)?;
        let store = ModelStore::open(&config.data.model_dir)?;
        let trainer = Trainer::new(source, store);

        match trainer.train(PlayerId(player), season)? {
            TrainOutcome::Trained(record) => {
                println!(
                    "Trained player {} ({}) on {} games",
                    player, season, record.model.games
                );
                println!(
                    "  cumulative points = {:.3} * game + {:.3}  (r² {:.3})",
                    record.model.slope, record.model.intercept, record.model.r_squared
                );
                println!(
                    "  saved to {}",
                    trainer.store().path(record.key()).display()
                );
            }
            TrainOutcome::Skipped { games } => {
                println!(
                    "Skipped player {} ({}): {} games logged, need at least 2",
                    player, season, games
                );
            }
        }

        Ok(())
    }

    pub fn train_all(
        config: &Config,
        season: Option<Season>,
        workers: Option<usize>,
    ) -> Result<()> {
        let season = season_or_current(season);
        let source = NbaStatsClient::new(&config.stats)?;
        let store = ModelStore::open(&config.data.model_dir)?;
        let batch = BatchTrainer::new(Trainer::new(source, store))
            .with_workers(workers.unwrap_or(config.projection.workers));

        println!("Training all players for {}...", season);
        let report = batch.train_all(season)?;

        println!("\nBatch training complete");
        println!("───────────────────────────────");
        println!("  Trained:  {}", report.trained.len());
        println!("  Skipped:  {}", report.skipped.len());
        println!("  Failed:   {}", report.failed.len());
        for (player, reason) in &report.failed {
            println!("    {}: {}", player, reason);
        }

        Ok(())
    }

    pub fn predict(
        config: &Config,
        player: u32,
        season: Option<Season>,
        at: Option<u32>,
        format: OutputFormat,
    ) -> Result<()> {
        let season = season_or_current(season);
        let store = ModelStore::open(&config.data.model_dir)?;
        let predictor = Predictor::new(store).with_season_games(config.projection.season_games);

        if let Some(game) = at {
            let total = predictor.predict_at(PlayerId(player), season, game)?;
            match format {
                OutputFormat::Json => {
                    let json = serde_json::json!({
                        "player_id": player,
                        "season": season.to_string(),
                        "game": game,
                        "projected_points": total,
                    });
                    println!("{}", to_json(&json)?);
                }
                OutputFormat::Csv => {
                    println!("player_id,season,game,projected_points");
                    println!("{},{},{},{:.1}", player, season, game, total);
                }
                OutputFormat::Table => {
                    println!(
                        "Projected cumulative points through game {}: {:.1}",
                        game, total
                    );
                }
            }
            return Ok(());
        }

        let projection = predictor.predict_season_total(PlayerId(player), season)?;
        match format {
            OutputFormat::Table => {
                print!(
                    "{}",
                    format_projection(&projection, config.projection.season_games)
                );
            }
            OutputFormat::Json => println!("{}", to_json(&projection.to_api())?),
            OutputFormat::Csv => {
                let api = projection.to_api();
                println!("PLAYER_ID,SEASON,PROJECTED_PTS_ML,PROJECTED_PPG_ML");
                println!(
                    "{},{},{},{}",
                    api.player_id, api.season, api.projected_pts_ml, api.projected_ppg_ml
                );
            }
        }

        Ok(())
    }

    pub fn projections(
        config: &Config,
        season: Option<Season>,
        team: Option<String>,
        format: OutputFormat,
    ) -> Result<()> {
        let season = season_or_current(season);
        let source = NbaStatsClient::new(&config.stats)?;
        let rows = source.league_players(season)?;
        let projector = HeuristicProjector::new(config.projection.season_games);
        let projections = projector.project_league(&rows, team.as_deref());

        match format {
            OutputFormat::Json => println!("{}", to_json(&projections)?),
            OutputFormat::Csv => {
                println!("player_id,player,team,gp,pts,reb,ast");
                for p in &projections {
                    println!(
                        "{},\"{}\",{},{},{:.1},{:.1},{:.1}",
                        p.player_id,
                        p.player_name,
                        p.team_abbreviation,
                        p.games_played,
                        p.projected_points,
                        p.projected_rebounds,
                        p.projected_assists
                    );
                }
            }
            OutputFormat::Table => {
                println!("Heuristic projections for {}", season);
                println!(
                    "{:<28} {:<5} {:>4} {:>8} {:>8} {:>8}",
                    "Player", "Team", "GP", "PTS", "REB", "AST"
                );
                for p in &projections {
                    println!(
                        "{:<28} {:<5} {:>4} {:>8.1} {:>8.1} {:>8.1}",
                        p.player_name,
                        p.team_abbreviation,
                        p.games_played,
                        p.projected_points,
                        p.projected_rebounds,
                        p.projected_assists
                    );
                }
                if projections.is_empty() {
                    println!("No players found.");
                }
            }
        }

        Ok(())
    }

    pub fn trend(
        config: &Config,
        player: u32,
        stat: Stat,
        season: Option<Season>,
        format: OutputFormat,
    ) -> Result<()> {
        let season = season_or_current(season);
        let player = PlayerId(player).validate()?;
        let source = NbaStatsClient::new(&config.stats)?;
        let games = source.game_log(player, season)?;
        let trend = HeuristicProjector::new(config.projection.season_games).trend(&games, stat);

        match format {
            OutputFormat::Json => println!("{}", to_json(&trend)?),
            OutputFormat::Csv => {
                println!("game,date,cumulative_{}", stat);
                for (i, (date, value)) in trend.dates.iter().zip(&trend.values).enumerate() {
                    println!("{},{},{}", i + 1, date, value);
                }
            }
            OutputFormat::Table => {
                println!("Cumulative {} for player {} ({})", stat, player, season);
                for (i, (date, value)) in trend.dates.iter().zip(&trend.values).enumerate() {
                    println!("  {:>3}  {}  {:>6}", i + 1, date, value);
                }
                if trend.values.is_empty() {
                    println!("  No games logged.");
                }
                println!("Projected season total: {:.1}", trend.projected);
            }
        }

        Ok(())
    }

    pub fn model_info(config: &Config, player: u32, season: Option<Season>) -> Result<()> {
        let season = season_or_current(season);
        let store = ModelStore::open(&config.data.model_dir)?;
        let key = ModelKey::new(PlayerId(player), season);
        let record = store.get(key)?;

        println!("Model Information");
        println!("───────────────────────────────");
        println!("  Path:       {}", store.path(key).display());
        println!("  Player:     {}", record.player_id);
        println!("  Season:     {}", record.season);
        println!("  Stat:       {}", record.stat);
        println!("  Slope:      {:.4}", record.model.slope);
        println!("  Intercept:  {:.4}", record.model.intercept);
        println!("  r²:         {:.4}", record.model.r_squared);
        println!("  Games:      {}", record.model.games);
        println!("  Trained at: {}", record.trained_at.format("%Y-%m-%d %H:%M:%S UTC"));

        Ok(())
    }

    pub fn model_list(config: &Config) -> Result<()> {
        let store = ModelStore::open(&config.data.model_dir)?;
        let models = store.list()?;

        if models.is_empty() {
            println!("No models in {}", store.root().display());
            return Ok(());
        }

        println!(
            "{:<10} {:<8} {:>6} {:>10} {:>10} {:>7}",
            "Player", "Season", "Games", "Slope", "Intercept", "r²"
        );
        for m in &models {
            println!(
                "{:<10} {:<8} {:>6} {:>10.3} {:>10.3} {:>7.3}",
                m.player_id,
                m.season,
                m.model.games,
                m.model.slope,
                m.model.intercept,
                m.model.r_squared
            );
        }
        println!("\n{} models", models.len());

        Ok(())
    }

    pub fn model_delete(config: &Config, player: u32, season: Option<Season>) -> Result<()> {
        let season = season_or_current(season);
        let store = ModelStore::open(&config.data.model_dir)?;
        let key = ModelKey::new(PlayerId(player), season);
        store.delete(key)?;
        println!("Deleted model for {}", key);
        Ok(())
    }
}
