//! Global model registry.
//!
//! Models registered here can be referenced by `"app_label.ModelName"`
//! labels, both from factories and from relation fields.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::model::ModelRef;

static MODEL_REGISTRY: Lazy<RwLock<HashMap<String, ModelRef>>> =
	Lazy::new(|| RwLock::new(HashMap::new()));

/// Model names are matched case-insensitively, app labels are not.
fn registry_key(app_label: &str, model_name: &str) -> String {
	format!("{}.{}", app_label, model_name.to_lowercase())
}

/// Registers a model under its label, replacing any previous registration.
pub fn register_model(model: ModelRef) {
	let key = registry_key(model.app_label(), model.name());
	MODEL_REGISTRY.write().insert(key, model);
}

/// Looks up a model by app label and model name.
pub fn get_model(app_label: &str, model_name: &str) -> Option<ModelRef> {
	MODEL_REGISTRY
		.read()
		.get(&registry_key(app_label, model_name))
		.map(Arc::clone)
}

/// Looks up a model by `"app_label.ModelName"` label.
pub fn get_model_by_label(label: &str) -> Option<ModelRef> {
	let (app_label, model_name) = label.split_once('.')?;
	get_model(app_label, model_name)
}

/// Labels of all registered models, sorted.
pub fn registered_labels() -> Vec<String> {
	let mut labels: Vec<String> = MODEL_REGISTRY
		.read()
		.values()
		.map(|model| model.label())
		.collect();
	labels.sort();
	labels
}

/// Removes every registered model.
pub fn clear_models() {
	MODEL_REGISTRY.write().clear();
}
