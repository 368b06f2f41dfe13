use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use anyhow::{Context, Result};
use baltree::command::{Outcome, Session, HELP};
use baltree::shape::{render_levels, render_sideways};
use baltree::BalancedTree;
use clap::{ArgAction, Parser, ValueEnum};
use ordered_float::NotNan;
use rand::prelude::*;
use rand_pcg::Pcg64;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

/// Insert and delete keys in an AVL tree read from stdin, redrawing it after
/// every change.
#[derive(Parser, Debug)]
#[command(name = "baltree", version)]
struct Cli {
    /// Key domain
    #[arg(long, value_enum, default_value_t = KeyDomain::Int)]
    keys: KeyDomain,

    /// Prefill the tree with this many random keys
    #[arg(long, default_value_t = 0)]
    random: usize,

    /// Seed for --random
    #[arg(long, default_value_t = 5)]
    seed: u64,

    /// Random keys are drawn from [-span, span)
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(i64).range(1..=1_000_000_000))]
    span: i64,

    #[arg(long, value_enum, default_value_t = Style::Sideways)]
    style: Style,

    /// Log verbosity, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count)]
    debug: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum KeyDomain {
    Int,
    Float,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Style {
    Sideways,
    Levels,
}

trait RandomKey: Sized {
    fn random(rng: &mut Pcg64, span: i64) -> Result<Self>;
}

impl RandomKey for i64 {
    fn random(rng: &mut Pcg64, span: i64) -> Result<Self> {
        Ok(rng.random_range(-span..span))
    }
}

impl RandomKey for NotNan<f64> {
    fn random(rng: &mut Pcg64, span: i64) -> Result<Self> {
        let tenths = rng.random_range(-span * 10..span * 10);
        Ok(NotNan::new(tenths as f64 / 10.0)?)
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_names(false);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .init();
}

fn draw<K: Ord + Clone + Display>(
    out: &mut impl Write,
    tree: &BalancedTree<K>,
    style: Style,
) -> Result<()> {
    let shape = tree.snapshot();
    let text = match style {
        Style::Sideways => render_sideways(&shape),
        Style::Levels => render_levels(&shape),
    };
    if text.is_empty() {
        writeln!(out, "(empty)")?;
    } else {
        write!(out, "{}", text)?;
    }
    writeln!(out, "-- {} keys, height {}", tree.len(), tree.height())?;
    out.flush()?;
    Ok(())
}

fn run<K>(cli: &Cli) -> Result<()>
where
    K: Ord + Clone + Display + FromStr + RandomKey,
{
    let mut rng = Pcg64::seed_from_u64(cli.seed);
    let mut tree = BalancedTree::new();
    for _ in 0..cli.random {
        tree.insert(K::random(&mut rng, cli.span)?);
    }
    if cli.random > 0 {
        info!(drawn = cli.random, len = tree.len(), seed = cli.seed, "prefilled tree");
    }

    let mut session = Session::with_tree(tree);
    let mut out = io::stdout().lock();
    draw(&mut out, session.tree(), cli.style)?;

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read command from stdin")?;
        match session.handle_line(&line) {
            Outcome::Redraw => draw(&mut out, session.tree(), cli.style)?,
            Outcome::Help => writeln!(out, "{}", HELP)?,
            Outcome::Quit => break,
            Outcome::Ignored | Outcome::Rejected(_) => {}
        }
    }
    Ok(())
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    match cli.keys {
        KeyDomain::Int => run::<i64>(&cli),
        KeyDomain::Float => run::<NotNan<f64>>(&cli),
    }
}
