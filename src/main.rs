use std::fmt;
use std::process;
use std::time::Instant;

use clap::Parser;
use nalgebra::{point, Point3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use star_transits::transits::calculator::PARALLEL_THRESHOLD;
use star_transits::{
    brute_force_pairs, BandDefinition, CalculatorConfig, Color, Positioned, TransitCalculator,
    TransitDefinitions, TransitPair,
};

#[derive(Parser)]
#[command(name = "transit-bench", about = "Find star pairs inside a distance band")]
struct Cli {
    /// Number of random stars to generate.
    #[arg(long, default_value = "1000")]
    stars: usize,

    /// Half width of the cube stars are scattered in, in light years.
    #[arg(long, default_value = "50.0")]
    extent: f64,

    /// Exclusive lower bound of the band.
    #[arg(long, default_value = "0.0")]
    lower: f64,

    /// Inclusive upper bound of the band.
    #[arg(long, default_value = "5.0")]
    upper: f64,

    /// Seed for the star generator.
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Never fan out across worker threads.
    #[arg(long)]
    sequential: bool,

    /// Size of a dedicated worker pool (rayon's global pool if omitted).
    #[arg(long)]
    threads: Option<usize>,

    /// Star count at which queries go parallel.
    #[arg(long, default_value_t = PARALLEL_THRESHOLD)]
    threshold: usize,

    /// Compare the result against a brute force search.
    #[arg(long)]
    verify: bool,
}

#[derive(Debug, Clone)]
struct Star {
    name: String,
    position: Point3<f64>,
}

impl Positioned for Star {
    fn position(&self) -> Point3<f64> {
        self.position
    }
}

impl fmt::Display for Star {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn random_stars(count: usize, extent: f64, seed: u64) -> Vec<Star> {
    let mut rng = StdRng::seed_from_u64(seed);

    (0..count)
        .map(|i| Star {
            name: format!("Star-{i}"),
            position: point![
                rng.gen_range(-extent..=extent),
                rng.gen_range(-extent..=extent),
                rng.gen_range(-extent..=extent)
            ],
        })
        .collect()
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if !(cli.extent > 0.0) {
        eprintln!("extent must be positive, got {}", cli.extent);
        process::exit(1);
    }

    let calculator = match TransitCalculator::with_config(CalculatorConfig {
        parallel: !cli.sequential,
        parallel_threshold: cli.threshold,
        worker_threads: cli.threads,
        ..CalculatorConfig::default()
    }) {
        Ok(calculator) => calculator,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let stars = random_stars(cli.stars, cli.extent, cli.seed);
    log::info!(
        "generated {} stars in a cube of half width {} (seed {})",
        stars.len(),
        cli.extent,
        cli.seed
    );

    let band = BandDefinition::new("bench", cli.lower, cli.upper).with_color(Color::CYAN);
    let definitions = TransitDefinitions::new("random", vec![band.clone()]);

    let started = Instant::now();
    let routes = match calculator.calculate_definitions(&definitions, &stars) {
        Ok(mut by_band) => by_band.remove(&band.band_id).unwrap_or_default(),
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };
    let elapsed = started.elapsed();

    println!(
        "{} routes in ({}, {}] among {} stars, {} in {:?}",
        routes.len(),
        cli.lower,
        cli.upper,
        stars.len(),
        if calculator.runs_parallel(stars.len()) {
            "parallel"
        } else {
            "sequential"
        },
        elapsed
    );

    let shortest = routes.iter().min_by(|a, b| a.distance.total_cmp(&b.distance));
    let longest = routes.iter().max_by(|a, b| a.distance.total_cmp(&b.distance));
    if let (Some(shortest), Some(longest)) = (shortest, longest) {
        println!("shortest: {} ({:.3} ly)", shortest.name(), shortest.distance);
        println!("longest:  {} ({:.3} ly)", longest.name(), longest.distance);
    }

    if cli.verify {
        let ends = |pairs: Vec<TransitPair>| {
            let mut ends: Vec<(usize, usize)> = pairs.iter().map(|p| (p.source, p.target)).collect();
            ends.sort();
            ends
        };

        let started = Instant::now();
        let expected = ends(brute_force_pairs(&stars, cli.lower, cli.upper));
        log::info!("brute force search took {:?}", started.elapsed());

        let found = ends(calculator.find_pairs(&stars, cli.lower, cli.upper));
        if found != expected {
            eprintln!(
                "mismatch: indexed search found {} pairs, brute force found {}",
                found.len(),
                expected.len()
            );
            process::exit(1);
        }
        println!("verified against brute force ({} pairs)", expected.len());
    }
}
