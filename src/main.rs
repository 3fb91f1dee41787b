use anyhow::Result;
use clap::Parser;
use hemnetfinder::fetcher::{PageFetcher, RendererConfig};
use hemnetfinder::locations::LocationResolver;
use hemnetfinder::models::{LocationRef, SearchFilter, NATIONWIDE_LABEL};
use hemnetfinder::{detail_extractor, query, search_extractor, sold_extractor};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Hemnetfinder - structured property search")]
struct Args {
    /// Municipality or area to search in (omit for a nationwide search)
    #[clap(short, long)]
    location: Option<String>,

    /// Fetch and extract a single listing page instead of searching
    #[clap(long, conflicts_with = "location")]
    url: Option<String>,

    /// Search sold listings instead of active ones
    #[clap(long)]
    sold: bool,

    #[clap(long)]
    min_rooms: Option<u32>,
    #[clap(long)]
    max_rooms: Option<u32>,
    #[clap(long)]
    min_price: Option<u64>,
    #[clap(long)]
    max_price: Option<u64>,
    #[clap(long)]
    min_area: Option<u32>,
    #[clap(long)]
    max_area: Option<u32>,
    #[clap(long)]
    max_fee: Option<u64>,

    /// Property type (repeatable): apartment, house, townhouse, holiday, plot
    #[clap(short = 't', long = "type")]
    property_types: Vec<String>,

    /// Construction status: new or existing
    #[clap(long)]
    construction: Option<String>,

    /// Free-text keywords
    #[clap(short, long)]
    keywords: Option<String>,

    /// Open-house window: today or weekend
    #[clap(long)]
    open_house: Option<String>,

    #[clap(long)]
    balcony: bool,
    #[clap(long)]
    elevator: bool,

    /// Only listings published within this many days
    #[clap(long)]
    max_age_days: Option<u32>,

    /// Sort order: newest, price_asc, price_desc, fee_asc, size_desc
    #[clap(long)]
    sort: Option<String>,

    /// Rendering backend base URL (falls back to HEMNET_RENDERER_URL)
    #[clap(long)]
    renderer_url: Option<String>,

    /// Rendering backend API key (falls back to HEMNET_RENDERER_API_KEY)
    #[clap(long)]
    renderer_api_key: Option<String>,
}

impl Args {
    fn filter(&self) -> SearchFilter {
        SearchFilter {
            min_rooms: self.min_rooms,
            max_rooms: self.max_rooms,
            min_price: self.min_price,
            max_price: self.max_price,
            min_living_area: self.min_area,
            max_living_area: self.max_area,
            max_fee: self.max_fee,
            property_types: self.property_types.clone(),
            construction_status: self.construction.clone(),
            keywords: self.keywords.clone(),
            open_house: self.open_house.clone(),
            balcony: self.balcony,
            elevator: self.elevator,
            max_age_days: self.max_age_days,
            sort: self.sort.clone(),
        }
    }

    fn renderer_config(&self) -> RendererConfig {
        RendererConfig {
            base_url: self
                .renderer_url
                .clone()
                .or_else(|| std::env::var("HEMNET_RENDERER_URL").ok()),
            api_key: self
                .renderer_api_key
                .clone()
                .or_else(|| std::env::var("HEMNET_RENDERER_API_KEY").ok()),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let fetcher = PageFetcher::new(args.renderer_config())?;

    if let Some(listing_url) = &args.url {
        let html = fetcher.fetch_detail_page(listing_url)?;
        let detail = detail_extractor::extract_detail(&html, listing_url);
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    // No location means nationwide: resolution is skipped entirely.
    let location: Option<LocationRef> = match &args.location {
        Some(name) => {
            let resolver = LocationResolver::new(fetcher.clone());
            let resolved = resolver.resolve(name)?;
            info!(name = %resolved.name, id = %resolved.id, kind = %resolved.kind, "resolved location");
            Some(resolved)
        }
        None => None,
    };
    let location_name = location
        .as_ref()
        .map(|l| l.name.clone())
        .unwrap_or_else(|| NATIONWIDE_LABEL.to_string());

    let filter = args.filter();
    if args.sold {
        let url = query::build_sold_search_url(&filter, location.as_ref());
        info!(%url, "searching sold listings");
        let html = fetcher.fetch_page(&url)?;
        let results = sold_extractor::extract_sold_summaries(&html, &location_name);
        info!(count = results.len(), "extraction finished");
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        let url = query::build_search_url(&filter, location.as_ref());
        info!(%url, "searching active listings");
        let html = fetcher.fetch_page(&url)?;
        let results = search_extractor::extract_summaries(&html, &location_name);
        info!(count = results.len(), "extraction finished");
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    Ok(())
}
