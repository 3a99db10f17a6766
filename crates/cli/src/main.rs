use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use data_loader::{
    IdSpace, LinkTable, MAX_RATING, MIN_RATING, MovieId, RatingMatrix, ReferencePolicy, UserId,
};
use evaluation::{CrossValidationReport, CrossValidator, RunConfig, SamplePercent, measure_from_flags};
use predictor::{Aggregation, PredictError, Predictor};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use similarity::{
    FeatureSpace, GenreWeighting, InverseDocumentFrequency, Measure, SimilarityEngine,
    TermFrequency,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

/// Reel CF - collaborative-filtering rating predictor
#[derive(Parser)]
#[command(name = "reel-cf")]
#[command(about = "Predict a user's movie ratings from similar users", long_about = None)]
struct Cli {
    /// Path to a MovieLens dataset directory (overrides --full)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Use the full dataset (ml-latest) rather than ml-latest-small
    #[arg(short, long)]
    full: bool,

    /// Accept ratings of movies missing from movies.csv, with no genres
    #[arg(long)]
    allow_unknown_movies: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Similarity measure (mutually exclusive, default Pearson)
#[derive(Args, Debug, Default)]
#[group(multiple = false)]
struct MeasureArgs {
    /// Use Pearson correlation
    #[arg(short, long)]
    pearson: bool,

    /// Use cosine similarity
    #[arg(short, long)]
    cosine: bool,

    /// Use Euclidean distance, weighted as 1 / (1 + d)
    #[arg(short, long)]
    euclidean: bool,
}

/// Catalog the movie IDs come from (default MovieLens)
#[derive(Args, Debug, Default)]
#[group(multiple = false)]
struct IdArgs {
    /// IDs are IMDb IDs (e.g. tt0114709)
    #[arg(short, long)]
    imdb: bool,

    /// IDs are TMDb IDs
    #[arg(short, long)]
    tmdb: bool,

    /// IDs are MovieLens IDs
    #[arg(short, long)]
    movielens: bool,
}

impl IdArgs {
    fn space(&self) -> IdSpace {
        if self.imdb {
            IdSpace::Imdb
        } else if self.tmdb {
            IdSpace::Tmdb
        } else {
            IdSpace::MovieLens
        }
    }
}

/// Term-frequency weighting of genre profiles
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum TfArg {
    /// ln(1 + count)
    Log,
    /// Raw count
    Raw,
    /// Count divided by the profile's total
    Normalized,
    /// 0.5 + 0.5 * count / max count
    Augmented,
    /// 1 if the genre occurs at all
    Boolean,
}

impl From<TfArg> for TermFrequency {
    fn from(arg: TfArg) -> Self {
        match arg {
            TfArg::Log => TermFrequency::Logarithmic,
            TfArg::Raw => TermFrequency::Raw,
            TfArg::Normalized => TermFrequency::Normalized,
            TfArg::Augmented => TermFrequency::Augmented,
            TfArg::Boolean => TermFrequency::Boolean,
        }
    }
}

/// Inverse-document-frequency weighting of genre profiles
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum IdfArg {
    /// ln((1 + users) / df)
    Smooth,
    /// ln(users / df)
    Plain,
    /// No IDF weighting
    Off,
}

impl From<IdfArg> for InverseDocumentFrequency {
    fn from(arg: IdfArg) -> Self {
        match arg {
            IdfArg::Smooth => InverseDocumentFrequency::Smooth,
            IdfArg::Plain => InverseDocumentFrequency::Plain,
            IdfArg::Off => InverseDocumentFrequency::Off,
        }
    }
}

/// Genre profile weighting, used with --genres
#[derive(Args, Debug)]
struct WeightingArgs {
    /// Term-frequency variant
    #[arg(long, value_enum, default_value_t = TfArg::Log)]
    tf: TfArg,

    /// Inverse-document-frequency variant
    #[arg(long, value_enum, default_value_t = IdfArg::Smooth)]
    idf: IdfArg,
}

impl WeightingArgs {
    fn weighting(&self) -> GenreWeighting {
        GenreWeighting {
            term_frequency: self.tf.into(),
            inverse_document_frequency: self.idf.into(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Predict a user's rating for one or more movies
    Predict {
        /// User ID from ratings.csv
        user_id: UserId,

        /// Movies to predict
        #[arg(required = true)]
        movies: Vec<String>,

        #[command(flatten)]
        measure: MeasureArgs,

        /// Compare users by TF-IDF genre profiles instead of co-rated movies
        #[arg(short, long)]
        genres: bool,

        #[command(flatten)]
        ids: IdArgs,

        #[command(flatten)]
        weighting: WeightingArgs,

        /// Add neighbours' deviations from their mean to the user's mean
        #[arg(long)]
        mean_centered: bool,
    },

    /// Cross-validate every measure and report its RMSE
    Rmse {
        /// Percent of users to sample, in (0, 100]
        #[arg(default_value_t = SamplePercent::DEFAULT)]
        percent: f64,

        /// Seed for user sampling (random when omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Also evaluate every measure on genre profiles
        #[arg(short, long)]
        genres: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        weighting: WeightingArgs,

        /// Add neighbours' deviations from their mean to the user's mean
        #[arg(long)]
        mean_centered: bool,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let data_dir = cli.data_dir.clone().unwrap_or_else(|| {
        PathBuf::from(if cli.full {
            "ml-latest"
        } else {
            "ml-latest-small"
        })
    });
    let policy = if cli.allow_unknown_movies {
        ReferencePolicy::EmptyGenres
    } else {
        ReferencePolicy::Strict
    };

    match cli.command {
        Commands::Predict {
            user_id,
            movies,
            measure,
            genres,
            ids,
            weighting,
            mean_centered,
        } => handle_predict(
            &data_dir,
            policy,
            user_id,
            &movies,
            &measure,
            feature_space(genres),
            weighting.weighting(),
            ids.space(),
            aggregation(mean_centered),
        )?,
        Commands::Rmse {
            percent,
            seed,
            genres,
            json,
            weighting,
            mean_centered,
        } => {
            let spaces = if genres {
                vec![FeatureSpace::RawRatings, FeatureSpace::GenreFrequency]
            } else {
                vec![FeatureSpace::RawRatings]
            };
            let config = RunConfig::default()
                .with_sample_percent(SamplePercent::new(percent)?)
                .with_feature_spaces(spaces)
                .with_aggregation(aggregation(mean_centered))
                .with_genre_weighting(weighting.weighting())
                .with_seed(seed);
            handle_rmse(&data_dir, policy, &config, json)?
        }
    }

    Ok(())
}

fn feature_space(genres: bool) -> FeatureSpace {
    if genres {
        FeatureSpace::GenreFrequency
    } else {
        FeatureSpace::RawRatings
    }
}

fn aggregation(mean_centered: bool) -> Aggregation {
    if mean_centered {
        Aggregation::MeanCentered
    } else {
        Aggregation::WeightedAverage
    }
}

/// Load the rating matrix, reporting progress on stderr
fn load_matrix(data_dir: &Path, policy: ReferencePolicy) -> Result<RatingMatrix> {
    eprintln!("Loading MovieLens dataset from {}...", data_dir.display());
    let start = Instant::now();
    let matrix = RatingMatrix::load_from_files(data_dir, policy).with_context(|| {
        format!("Failed to load MovieLens dataset from {}", data_dir.display())
    })?;
    let (users, movies, ratings) = matrix.counts();
    eprintln!(
        "{} Loaded {} users, {} movies, {} ratings in {:?}",
        "✓".green(),
        users,
        movies,
        ratings,
        start.elapsed()
    );
    Ok(matrix)
}

/// Handle the 'predict' command
#[allow(clippy::too_many_arguments)]
fn handle_predict(
    data_dir: &Path,
    policy: ReferencePolicy,
    user_id: UserId,
    movies: &[String],
    measure_args: &MeasureArgs,
    space: FeatureSpace,
    weighting: GenreWeighting,
    id_space: IdSpace,
    aggregation: Aggregation,
) -> Result<()> {
    let measure = measure_from_flags(
        measure_args.pearson,
        measure_args.cosine,
        measure_args.euclidean,
    )?;

    let links = match id_space {
        IdSpace::MovieLens => LinkTable::default(),
        IdSpace::Imdb | IdSpace::Tmdb => {
            LinkTable::load(data_dir).context("Failed to load links.csv")?
        }
    };
    let movie_ids = links
        .resolve(movies, id_space)
        .context("Failed to parse movie IDs")?;
    debug!("Resolved {:?} to MovieLens IDs {:?}", movies, movie_ids);
    if movie_ids.is_empty() {
        bail!("None of the requested movies exist in the MovieLens dataset");
    }

    let matrix = load_matrix(data_dir, policy)?;
    if !matrix.contains_user(user_id) {
        bail!("User {} not found", user_id);
    }

    let engine = SimilarityEngine::new(&matrix).with_genre_weighting(weighting);
    let predictor = Predictor::new(engine).with_aggregation(aggregation);

    println!(
        "{}",
        format!(
            "Predicted ratings for user {} ({}, {}):",
            user_id, measure, space
        )
        .bold()
        .blue()
    );
    for movie_id in movie_ids {
        let label = movie_label(&matrix, movie_id);
        match predictor.predict(user_id, movie_id, measure, space) {
            Ok(prediction) => println!(
                "{} | Predicted rating: {} stars {}",
                label,
                format!("{:.1}", round_stars(prediction.rating)).green().bold(),
                format!(
                    "({} neighbours, raw {:.3})",
                    prediction.neighbors, prediction.rating
                )
                .dimmed()
            ),
            Err(PredictError::NoNeighbors { .. }) => {
                println!("{} | {}", label, "unable to predict".yellow())
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Handle the 'rmse' command
fn handle_rmse(
    data_dir: &Path,
    policy: ReferencePolicy,
    config: &RunConfig,
    json: bool,
) -> Result<()> {
    config.validate()?;
    let matrix = load_matrix(data_dir, policy)?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let start = Instant::now();
    let validator = CrossValidator::from_config(&matrix, config);
    let report = validator.run(config, &mut rng)?;
    let elapsed = start.elapsed();

    if json {
        let output = JsonOutput {
            config,
            report: &report,
            elapsed_secs: elapsed.as_secs_f64(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(config, &report, elapsed);
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    config: &'a RunConfig,
    report: &'a CrossValidationReport,
    elapsed_secs: f64,
}

/// Helper function to print the RMSE table: one row per measure, one
/// column per feature space
fn print_report(config: &RunConfig, report: &CrossValidationReport, elapsed: Duration) {
    println!(
        "{}",
        format!(
            "Cross-validation over {} users, {} held-out ratings",
            report.sampled_users.len(),
            report.held_out
        )
        .bold()
        .blue()
    );

    let mut header = format!("{:<12}", "Measure");
    for space in &config.feature_spaces {
        header.push_str(&format!("{:>26}", format!("{} RMSE", space)));
    }
    println!("{}", header.bold());

    for &measure in &config.measures {
        print!("{}", format!("{:<12}", measure).cyan());
        for &space in &config.feature_spaces {
            print!("{:>26}", rmse_cell(report, measure, space));
        }
        println!();
    }

    println!("{} Finished in {:?}", "✓".green(), elapsed);
}

fn rmse_cell(report: &CrossValidationReport, measure: Measure, space: FeatureSpace) -> String {
    match report.outcome(measure, space) {
        Some(outcome) => match outcome.rmse {
            Some(rmse) => format!(
                "{:.4} ({}/{})",
                rmse, outcome.predicted, report.held_out
            ),
            None => "n/a".to_string(),
        },
        None => "-".to_string(),
    }
}

fn movie_label(matrix: &RatingMatrix, movie_id: MovieId) -> String {
    match matrix.get_movie(movie_id) {
        Some(movie) => format!("{} {}", movie_id, movie.title),
        None => format!("{} (unknown movie)", movie_id),
    }
}

/// Round to the nearest half star, within the rating scale
fn round_stars(rating: f64) -> f64 {
    ((rating * 2.0).round() / 2.0).clamp(f64::from(MIN_RATING), f64::from(MAX_RATING))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_stars() {
        assert_eq!(round_stars(3.74), 3.5);
        assert_eq!(round_stars(3.76), 4.0);
        assert_eq!(round_stars(5.8), 5.0);
        assert_eq!(round_stars(0.1), 0.5);
        assert_eq!(round_stars(-1.2), 0.5);
    }

    #[test]
    fn test_parse_predict() {
        let cli = Cli::try_parse_from(["reel-cf", "predict", "1", "tt0114709", "-i", "-c", "-g"])
            .unwrap();
        match cli.command {
            Commands::Predict {
                user_id,
                movies,
                measure,
                genres,
                ids,
                ..
            } => {
                assert_eq!(user_id, 1);
                assert_eq!(movies, ["tt0114709"]);
                assert!(measure.cosine);
                assert!(genres);
                assert_eq!(ids.space(), IdSpace::Imdb);
            }
            Commands::Rmse { .. } => panic!("expected predict"),
        }
    }

    #[test]
    fn test_parse_genre_weighting() {
        let cli = Cli::try_parse_from(["reel-cf", "rmse", "25", "-g", "--tf", "raw", "--idf", "off"])
            .unwrap();
        match cli.command {
            Commands::Rmse {
                percent, weighting, ..
            } => {
                assert_eq!(percent, 25.0);
                assert_eq!(
                    weighting.weighting(),
                    GenreWeighting {
                        term_frequency: TermFrequency::Raw,
                        inverse_document_frequency: InverseDocumentFrequency::Off,
                    }
                );
            }
            Commands::Predict { .. } => panic!("expected rmse"),
        }

        let cli = Cli::try_parse_from(["reel-cf", "predict", "1", "2", "-g"]).unwrap();
        match cli.command {
            Commands::Predict { weighting, .. } => {
                assert_eq!(weighting.weighting(), GenreWeighting::default());
            }
            Commands::Rmse { .. } => panic!("expected predict"),
        }

        assert!(Cli::try_parse_from(["reel-cf", "rmse", "--tf", "cubic"]).is_err());
    }

    #[test]
    fn test_conflicting_measures_rejected() {
        let result = Cli::try_parse_from(["reel-cf", "predict", "1", "2", "-p", "-e"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_rmse_defaults() {
        let cli = Cli::try_parse_from(["reel-cf", "--full", "rmse"]).unwrap();
        assert!(cli.full);
        match cli.command {
            Commands::Rmse {
                percent,
                seed,
                genres,
                ..
            } => {
                assert_eq!(percent, 10.0);
                assert_eq!(seed, None);
                assert!(!genres);
            }
            Commands::Predict { .. } => panic!("expected rmse"),
        }
    }
}
