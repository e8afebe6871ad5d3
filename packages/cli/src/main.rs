#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for matching traffic citations to street segments.
//!
//! Uses `indicatif-log-bridge` (via [`segment_match_cli_utils::init_logger`])
//! so that log lines and the resolution progress bar share the terminal.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use segment_match_cli_utils::IndicatifProgress;
use segment_match_matcher::normalize::StreetNormalizer;
use segment_match_matcher::paths::RunPaths;
use segment_match_matcher::suffixes::SuffixTable;
use segment_match_matcher::{
    FallbackPolicy, MatchConfig, MatchReport, RunOptions, WriteMode, inspect, load_config,
};

#[derive(Parser)]
#[command(
    name = "segment_match",
    about = "Links traffic citations to street-centerline segments"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match citations to segments and write assignments plus audit
    Run {
        #[command(flatten)]
        config: ConfigArgs,
        /// Read grouped citations from the checkpoint instead of the citation CSV
        #[arg(long)]
        from_checkpoint: bool,
        /// Also write the grouped citations to the checkpoint
        #[arg(long)]
        save_checkpoint: bool,
        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Group citations by address and write the JSON checkpoint only
    Group {
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Spot-check one random assignment from a finished run
    Inspect {
        #[command(flatten)]
        config: ConfigArgs,
        /// Also look up the raw street names on the citation and the segment
        #[arg(long)]
        lookup: bool,
    },
    /// Print the canonical form of street names
    Normalize {
        #[command(flatten)]
        config: ConfigArgs,
        /// Street names to normalize (e.g., "West 56th Street")
        #[arg(required = true)]
        names: Vec<String>,
    },
}

/// Options shared by every subcommand. Flags override the config file.
#[derive(Args)]
struct ConfigArgs {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Citation CSV
    #[arg(long)]
    citations: Option<PathBuf>,
    /// Road-network CSV
    #[arg(long)]
    roads: Option<PathBuf>,
    /// Tab-separated street suffix table
    #[arg(long)]
    suffixes: Option<PathBuf>,
    /// Assignment output file
    #[arg(long)]
    assignments: Option<PathBuf>,
    /// Audit output file
    #[arg(long)]
    audit: Option<PathBuf>,
    /// Grouped-citation JSON checkpoint
    #[arg(long)]
    checkpoint: Option<PathBuf>,
    /// Truncate output files instead of appending
    #[arg(long)]
    overwrite: bool,
    /// Maximum number of citation rows to read (for testing)
    #[arg(long)]
    limit: Option<u64>,
    /// Seed for the random fallback (and for `inspect` sampling)
    #[arg(long)]
    seed: Option<u64>,
    /// Fall back to the smallest segment id instead of a random one
    #[arg(long, conflicts_with = "seed")]
    first_segment: bool,
    /// Fail on a citation id that appears at two different addresses
    #[arg(long)]
    strict_ids: bool,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<MatchConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => MatchConfig::default(),
        };

        let overrides = [
            (&self.citations, &mut config.citations_path),
            (&self.roads, &mut config.roads_path),
            (&self.suffixes, &mut config.suffixes_path),
            (&self.assignments, &mut config.assignments_path),
            (&self.audit, &mut config.audit_path),
            (&self.checkpoint, &mut config.checkpoint_path),
        ];
        for (flag, slot) in overrides {
            if let Some(path) = flag {
                *slot = Some(path.clone());
            }
        }

        if self.overwrite {
            config.write_mode = WriteMode::Overwrite;
        }
        if self.limit.is_some() {
            config.row_limit = self.limit;
        }
        if self.first_segment {
            config.fallback = FallbackPolicy::FirstSegment;
        } else if let Some(seed) = self.seed {
            config.fallback = FallbackPolicy::Random { seed: Some(seed) };
        }
        if self.strict_ids {
            config.strict_citation_ids = true;
        }

        Ok(config)
    }
}

const fn fallback_label(policy: FallbackPolicy) -> &'static str {
    match policy {
        FallbackPolicy::Random { seed: Some(_) } => "seeded random",
        FallbackPolicy::Random { seed: None } => "random",
        FallbackPolicy::FirstSegment => "first-segment",
    }
}

fn print_report(report: &MatchReport) {
    println!("Citations read:        {}", report.citations_read);
    println!("  dropped (missing):   {}", report.dropped_missing_fields);
    println!("  dropped (conflict):  {}", report.dropped_conflicting_ids);
    println!("  grouped:             {}", report.citations_grouped);
    println!("Distinct addresses:    {}", report.groups);
    println!(
        "Road rows:             {} ({} streets, {} incomplete)",
        report.road_rows, report.indexed_streets, report.incomplete_streets
    );
    println!();
    println!("{:<32} CITATIONS", "DECISION");
    println!("{}", "-".repeat(44));
    println!("{:<32} {}", "EXACT_RANGE", report.decisions.exact_range);
    println!(
        "{:<32} {}",
        "RANDOM_NO_NUMBER_STREET", report.decisions.random_no_number_street
    );
    println!(
        "{:<32} {}",
        "RANDOM_ANY_SEGMENT_OF_STREET", report.decisions.random_any_segment_of_street
    );
    println!("{:<32} {}", "STREET_NOT_FOUND", report.decisions.street_not_found);
    println!();
    println!(
        "Match performance: {:.2} % ({} assigned) in {:.1}s",
        report.match_rate(),
        report.assigned_citations,
        report.elapsed_secs
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = segment_match_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            from_checkpoint,
            save_checkpoint,
            json,
        } => {
            let config = config.resolve()?;
            log::info!(
                "Starting match run ({} fallback, {} output)",
                fallback_label(config.fallback),
                config.write_mode
            );
            let options = RunOptions {
                from_checkpoint,
                save_checkpoint,
                progress: Some(IndicatifProgress::batch_bar(&multi, "Resolving addresses")),
            };
            let report = segment_match_matcher::run(&config, &options)?;
            log::info!("Match run complete.");

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Group { config } => {
            let config = config.resolve()?;
            log::info!("Grouping citations...");
            let groups = segment_match_matcher::group_to_checkpoint(&config)?;
            println!(
                "Grouped {} citations into {} addresses ({} dropped, {} conflicting)",
                groups.stats.grouped,
                groups.len(),
                groups.stats.dropped_missing_fields,
                groups.stats.dropped_conflicting_ids
            );
        }
        Commands::Inspect { config: args, lookup } => {
            let config = args.resolve()?;
            let paths = RunPaths::from_config(&config);
            let mut rng = args
                .seed
                .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

            let Some(sampled) = inspect::sample_match(&paths.assignments, &paths.audit, &mut rng)?
            else {
                log::warn!("No assignments in {}", paths.assignments.display());
                return Ok(());
            };
            log::info!(
                "Sampled citation {} -> segment {}",
                sampled.citation_id,
                sampled.segment_id
            );

            println!("Citation:  {}", sampled.citation_id);
            println!("Segment:   {}", sampled.segment_id);
            match sampled.decision {
                Some(decision) => println!("Decision:  {decision}"),
                None => println!("Decision:  (not in audit file)"),
            }

            if lookup {
                let citation_street = inspect::citation_street(
                    &paths.citations,
                    &config.citation_columns,
                    &sampled.citation_id,
                )?;
                let segment_street = inspect::segment_street(
                    &paths.roads,
                    &config.road_columns,
                    &sampled.segment_id,
                )?;
                println!(
                    "Citation street: {}",
                    citation_street.as_deref().unwrap_or("(not found)")
                );
                println!(
                    "Segment street:  {}",
                    segment_street.as_deref().unwrap_or("(not found)")
                );
            }
        }
        Commands::Normalize { config, names } => {
            let config = config.resolve()?;
            let paths = RunPaths::from_config(&config);
            let suffixes = SuffixTable::load(&paths.suffixes)?;
            log::debug!("Normalizing {} street names", names.len());
            let normalizer = StreetNormalizer::new(&suffixes);

            for name in &names {
                println!("{name:<40} -> {}", normalizer.normalize(name));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("segment_match").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_defaults() {
        let Commands::Run { config, json, .. } = parse(&[
            "run",
            "--roads",
            "roads.csv",
            "--overwrite",
            "--seed",
            "7",
            "--limit",
            "10",
            "--json",
        ])
        .command
        else {
            panic!("expected run");
        };
        assert!(json);

        let config = config.resolve().unwrap();
        assert_eq!(config.roads_path, Some(PathBuf::from("roads.csv")));
        assert_eq!(config.citations_path, None);
        assert_eq!(config.write_mode, WriteMode::Overwrite);
        assert_eq!(config.row_limit, Some(10));
        assert_eq!(config.fallback, FallbackPolicy::Random { seed: Some(7) });
        assert_eq!(fallback_label(config.fallback), "seeded random");
    }

    #[test]
    fn first_segment_conflicts_with_seed() {
        let args = ["segment_match", "run", "--first-segment", "--seed", "1"];
        assert!(Cli::try_parse_from(args).is_err());

        let Commands::Group { config } = parse(&["group", "--first-segment"]).command else {
            panic!("expected group");
        };
        let config = config.resolve().unwrap();
        assert_eq!(config.fallback, FallbackPolicy::FirstSegment);
        assert_eq!(fallback_label(config.fallback), "first-segment");
        assert_eq!(fallback_label(FallbackPolicy::default()), "random");
    }
}
