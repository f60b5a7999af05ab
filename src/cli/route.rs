//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::cli::parse::{Commands, OutputFormat};
use crate::cli::presentation::{
    format_checklist, format_fact, format_message, format_next_screen, format_return_list,
    format_save_outcome, format_validate_result,
};
use crate::config::{ConfigLoader, FactflowConfig};
use crate::error::{ApiError, FlowError, StorageError};
use crate::fact::{FactDictionary, FactValue};
use crate::flow::{validate_flow, Flow, RouteLocation};
use crate::graph::{parse_concrete, FactGraph};
use crate::path::ItemId;
use crate::store::{ReturnStore, SledReturnStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Runtime context for CLI execution: loaded dictionary, flow and return store.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    dictionary: Arc<FactDictionary>,
    flow: Flow,
    store: SledReturnStore,
    return_id: String,
    format: OutputFormat,
}

fn read_file(path: &Path, what: &str) -> Result<String, ApiError> {
    std::fs::read_to_string(path)
        .map_err(|e| ApiError::ConfigError(format!("Failed to read {} {:?}: {}", what, path, e)))
}

/// Command name for logging (e.g. "add-item")
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Validate => "validate",
        Commands::Get { .. } => "get",
        Commands::Set { .. } => "set",
        Commands::Delete { .. } => "delete",
        Commands::AddItem { .. } => "add-item",
        Commands::RemoveItem { .. } => "remove-item",
        Commands::Next { .. } => "next",
        Commands::Checklist => "checklist",
        Commands::Export { .. } => "export",
        Commands::Import { .. } => "import",
        Commands::Returns => "returns",
        Commands::Discard => "discard",
    }
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        return_id: impl Into<String>,
        format: OutputFormat,
    ) -> Result<Self, ApiError> {
        let config = match config_path {
            Some(ref cfg_path) => ConfigLoader::load_from_file(cfg_path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Self::from_config(&workspace_root, &config, return_id, format)
    }

    /// Create run context from an already loaded configuration
    pub fn from_config(
        workspace_root: &Path,
        config: &FactflowConfig,
        return_id: impl Into<String>,
        format: OutputFormat,
    ) -> Result<Self, ApiError> {
        let return_id = return_id.into();
        if return_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("return id cannot be empty".to_string()));
        }

        // Step 1: fact dictionary
        let dictionary_path = config.dictionary_path(workspace_root);
        let dictionary = Arc::new(FactDictionary::from_json(&read_file(
            &dictionary_path,
            "fact dictionary",
        )?)?);

        // Step 2: flow, with the configured terminal route
        let flow_path = config.flow_path(workspace_root);
        let mut flow = Flow::from_json(&read_file(&flow_path, "flow")?)?;
        if let Some(route) = &config.flow.terminal_route {
            flow.set_terminal_route(route.clone())?;
        }

        // Step 3: return store
        let store_path = config.system.storage.resolve_store_path(workspace_root);
        std::fs::create_dir_all(&store_path).map_err(StorageError::IoError)?;
        let store = SledReturnStore::new(&store_path)?;

        debug!(
            facts = dictionary.len(),
            screens = flow.screens().len(),
            store = ?store_path,
            "CLI context initialized"
        );
        Ok(Self {
            dictionary,
            flow,
            store,
            return_id,
            format,
        })
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    pub fn store(&self) -> &SledReturnStore {
        &self.store
    }

    /// Execute a CLI command via the single route table.
    #[instrument(skip(self, command), fields(command = command_name(command), return_id = %self.return_id))]
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let output = self.execute_inner(command)?;
        info!("Command completed");
        Ok(output)
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Validate => {
                let findings = validate_flow(&self.flow, &self.dictionary);
                format_validate_result(
                    &findings,
                    self.flow.screens().len(),
                    self.dictionary.len(),
                    self.format,
                )
            }
            Commands::Get { path } => {
                let graph = self.load_graph()?;
                let result = graph.get(&parse_concrete(path)?)?;
                format_fact(path, &result, self.format)
            }
            Commands::Set { path, value, json } => {
                let mut graph = self.load_graph()?;
                let concrete = parse_concrete(path)?;
                if *json {
                    let typed: FactValue = serde_json::from_str(value).map_err(|e| {
                        ApiError::InvalidInput(format!("Invalid fact value JSON: {}", e))
                    })?;
                    graph.set(&concrete, typed)?;
                } else {
                    graph.set_raw(&concrete, value)?;
                }
                self.save_and_report(&mut graph, &format!("set {}", path))
            }
            Commands::Delete { path } => {
                let mut graph = self.load_graph()?;
                graph.delete(&parse_concrete(path)?)?;
                self.save_and_report(&mut graph, &format!("delete {}", path))
            }
            Commands::AddItem { collection, id } => {
                let mut graph = self.load_graph()?;
                let id = id.as_deref().map(ItemId::new).transpose()?;
                let added = graph.add_collection_item(&parse_concrete(collection)?, id)?;
                self.save_and_report(&mut graph, &format!("add #{} to {}", added, collection))
            }
            Commands::RemoveItem { collection, id } => {
                let mut graph = self.load_graph()?;
                let id = ItemId::new(id.as_str())?;
                graph.remove_collection_item(&parse_concrete(collection)?, &id)?;
                self.save_and_report(&mut graph, &format!("remove #{} from {}", id, collection))
            }
            Commands::Next { location, submit } => self.next(location.as_deref(), *submit),
            Commands::Checklist => {
                let graph = self.load_graph()?;
                format_checklist(&self.flow.checklist(&graph), self.format)
            }
            Commands::Export { output } => {
                let graph = self.load_graph()?;
                let json = graph.to_json_string()?;
                match output {
                    Some(file) => {
                        std::fs::write(file, &json).map_err(StorageError::IoError)?;
                        format_message(
                            &format!("Exported {} to {}", self.return_id, file.display()),
                            self.format,
                        )
                    }
                    None => Ok(json),
                }
            }
            Commands::Import { file } => {
                let contents = read_file(file, "facts")?;
                let graph = FactGraph::from_json_str(Arc::clone(&self.dictionary), &contents)?;
                self.store.save_graph(&self.return_id, &graph)?;
                format_message(
                    &format!(
                        "Imported {} fact(s) into {}",
                        graph.committed_paths().count(),
                        self.return_id
                    ),
                    self.format,
                )
            }
            Commands::Returns => format_return_list(&self.store.list()?, self.format),
            Commands::Discard => {
                if !self.store.delete(&self.return_id)? {
                    return Err(StorageError::ReturnNotFound(self.return_id.clone()).into());
                }
                format_message(&format!("Deleted return {}", self.return_id), self.format)
            }
        }
    }

    fn load_graph(&self) -> Result<FactGraph, ApiError> {
        self.store
            .load_graph(&self.return_id, Arc::clone(&self.dictionary))
    }

    /// Commit staged writes; the store is only written when the batch is valid
    fn save_and_report(&self, graph: &mut FactGraph, action: &str) -> Result<String, ApiError> {
        let outcome = graph.save();
        if outcome.valid {
            self.store.save_graph(&self.return_id, graph)?;
        }
        format_save_outcome(action, &outcome, self.format)
    }

    fn next(&self, location: Option<&str>, submit: bool) -> Result<String, ApiError> {
        let mut graph = self.load_graph()?;
        let Some(raw) = location else {
            let first = self.flow.navigator().first_screen(&graph);
            return format_next_screen(&first, self.format);
        };

        let location = RouteLocation::parse(raw)?;
        if submit {
            let screen = self
                .flow
                .screen(&location.route)
                .ok_or_else(|| FlowError::UnknownRoute(location.route.clone()))?;
            let applied = screen.apply_actions(&mut graph, location.collection_id.as_ref())?;
            if applied > 0 {
                let outcome = graph.save();
                if !outcome.valid {
                    return format_save_outcome(
                        &format!("submit {}", location),
                        &outcome,
                        self.format,
                    );
                }
                self.store.save_graph(&self.return_id, &graph)?;
            }
        }

        let next = self.flow.next_screen(
            &location.route,
            location.collection_id.as_ref(),
            &graph,
        )?;
        format_next_screen(&next, self.format)
    }
}
