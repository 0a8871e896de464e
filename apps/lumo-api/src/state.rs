use std::sync::Arc;

use lumo_domain::Lexicon;
use lumo_service::LumoService;
use lumo_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<LumoService>,
}
impl AppState {
	/// Connects Postgres, applies the schema and loads the segmentation dictionaries.
	///
	/// A configured user dictionary that cannot be read fails start-up.
	pub async fn new(config: lumo_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let lexicon = Lexicon::from_config(&config.lexicon, config.search.max_keywords as usize)?;

		tracing::info!(
			synonyms = lexicon.synonyms().len(),
			max_keywords = lexicon.max_keywords(),
			"Lexicon loaded."
		);

		let service = LumoService::new(config, Arc::new(lexicon), db);

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: LumoService) -> Self {
		Self { service: Arc::new(service) }
	}
}
