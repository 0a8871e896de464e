use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = lumo_api::Args::parse();

	lumo_api::run(args).await
}
