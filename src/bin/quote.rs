// Prices a stay from the command line:
//   quote <catalog.json> <property> <check-in> <check-out> <guests> [locale]

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use villa_pricing::{
    parse_iso_date, BookingSession, Catalog, Locale, PropertySlug, QuoteCache,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 5 {
        bail!("usage: quote <catalog.json> <property> <check-in> <check-out> <guests> [locale]");
    }

    let catalog = Catalog::load(&args[0])
        .with_context(|| format!("loading catalog from {}", args[0]))?;
    let slug: PropertySlug = args[1].parse()?;
    let check_in = parse_iso_date(&args[2])?;
    let check_out = parse_iso_date(&args[3])?;
    let guests: u32 = args[4]
        .parse()
        .with_context(|| format!("invalid guest count '{}'", args[4]))?;
    let locale = match args.get(5) {
        Some(tag) => tag.parse::<Locale>().map_err(anyhow::Error::msg)?,
        None => Locale::default(),
    };

    let mut session = BookingSession::new(catalog.get(slug)?, Arc::new(QuoteCache::default()))
        .with_locale(locale);
    session.set_dates(Some(check_in), Some(check_out));
    session.set_guests(guests);

    let Some(breakdown) = session.quote() else {
        bail!("stay is not computable: check-out must be after check-in");
    };

    println!("{}", serde_json::to_string_pretty(&breakdown)?);
    if let Some(total) = session.display_total() {
        println!("{}: {}", session.property().name, total);
    }

    match session.checkout_request() {
        Ok(request) => println!("{}", serde_json::to_string_pretty(&request)?),
        Err(e) => eprintln!("booking not possible: {}", e),
    }

    Ok(())
}
