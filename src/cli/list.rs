//! List command implementation

use std::process::ExitCode;
use std::sync::Arc;

use crate::config::MapframeConfig;
use crate::host::MemoryHost;
use crate::image_map::ImageMap;
use crate::models::ImageRecord;
use crate::registry::{ImageRegistry, RegistryError};
use crate::resource::{ImageResource, LoadError, ResourceLoader};
use crate::scheduler::InlineScheduler;
use crate::storage::FileStorage;

use super::{EXIT_ERROR, EXIT_SUCCESS};

/// Builds images without decoding their frames; listing only needs metadata.
struct MetadataLoader;

impl ResourceLoader for MetadataLoader {
    fn load(
        &self,
        registry: &Arc<ImageRegistry>,
        record: ImageRecord,
    ) -> Result<Arc<dyn ImageResource>, LoadError> {
        Ok(Arc::new(ImageMap::from_record(registry, record)?))
    }
}

fn describe(image: &dyn ImageResource) -> String {
    let surfaces: Vec<String> = image.surfaces().iter().map(|s| s.to_string()).collect();
    let index = image.index().map_or_else(|| "-".to_string(), |i| i.to_string());
    format!("{:>5}  {}  {}  [{}]", index, image.creator(), image.name(), surfaces.join(", "))
}

fn load_registry(config: &MapframeConfig) -> Result<Arc<ImageRegistry>, RegistryError> {
    let storage = FileStorage::open(&config.storage.dir)?;
    let settings = config.registry_settings();
    let host = MemoryHost::new(settings.surface_size);
    let registry = ImageRegistry::builder(Arc::new(storage), Arc::new(host))
        .loader(Arc::new(MetadataLoader))
        .scheduler(Arc::new(InlineScheduler))
        .settings(settings)
        .build()?;
    let report = registry.bulk_load()?.recv().unwrap_or_default();
    if report.failed > 0 {
        eprintln!("Warning: {} stored image(s) could not be loaded", report.failed);
    }
    Ok(registry)
}

/// Execute the list command
pub fn run_list(config: &MapframeConfig) -> ExitCode {
    let registry = match load_registry(config) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {}: {}", config.storage.dir.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    for image in registry.images() {
        println!("{}", describe(image.as_ref()));
    }
    let deleted = registry.deleted_surfaces();
    if !deleted.is_empty() {
        let ids: Vec<String> = deleted.iter().map(|s| s.to_string()).collect();
        println!("deleted surfaces: {}", ids.join(", "));
    }
    ExitCode::from(EXIT_SUCCESS)
}
