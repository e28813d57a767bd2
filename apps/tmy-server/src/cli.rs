use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tmy-server",
    version,
    about = "Serves typical-meteorological-year hourly records in site-local time"
)]
pub struct Args {
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,
    #[arg(long, default_value_t = 8000)]
    pub port: u16,
}
