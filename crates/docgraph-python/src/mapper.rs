//! End-to-end pipeline from source directories to displayable objects
//!
//! ```text
//! ModuleLoader (discover + parse)
//!     ↓
//! hide_stdlib_inherited → resolve_placeholders → hide_non_public_children
//!     ↓
//! ObjectStore::build → VisibilityFilter::select
//! ```

use crate::loader::{LoadOutcome, LoadedModules, ModuleLoader};
use crate::stdlib::is_stdlib;
use docgraph::{
    hide_non_public_children, hide_stdlib_inherited, resolve_placeholders, Diagnostics,
    DisplayConfig, Entity, ObjectStore, SkipHook, SnapshotStore, VisibilityFilter,
};
use docgraph_parser_api::{LoaderConfig, ParserMetrics, ParserResult, ProjectInfo};
use tracing::{info, instrument};

/// Output of a mapping run
#[derive(Debug)]
pub struct MappedApi {
    /// Module records after resolution and hiding, in discovery order
    pub modules: Vec<Entity>,
    pub objects: ObjectStore,
    pub project: ProjectInfo,
    pub metrics: ParserMetrics,
    /// Warnings of every stage, in the order they were raised
    pub diagnostics: Diagnostics,
}

/// Loads Python sources and maps them to an [`ObjectStore`]
pub struct PythonMapper {
    loader: ModuleLoader,
    display: DisplayConfig,
    filter: VisibilityFilter,
    totals: ParserMetrics,
}

impl PythonMapper {
    /// # Errors
    /// Returns an error when the display configuration is invalid.
    pub fn new(loader: LoaderConfig, display: DisplayConfig) -> ParserResult<Self> {
        display.validate()?;
        let filter = VisibilityFilter::new(&display);
        Ok(Self {
            loader: ModuleLoader::new(loader),
            display,
            filter,
            totals: ParserMetrics::default(),
        })
    }

    /// Let a caller override individual skip decisions
    pub fn with_skip_hook(mut self, hook: impl SkipHook + 'static) -> Self {
        self.filter = VisibilityFilter::new(&self.display).with_hook(hook);
        self
    }

    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    pub fn display(&self) -> &DisplayConfig {
        &self.display
    }

    /// Load metrics summed over every run that read sources
    pub fn total_metrics(&self) -> &ParserMetrics {
        &self.totals
    }

    /// Load every source and map it
    ///
    /// # Errors
    /// Only configuration errors are returned; unreadable files and
    /// unresolvable imports end up in [`MappedApi::diagnostics`].
    #[instrument(skip(self))]
    pub fn run(&mut self) -> ParserResult<MappedApi> {
        let loaded = self.loader.load_all()?;
        Ok(self.map_loaded(loaded))
    }

    /// Load and map unless the sources are unchanged since the snapshot in
    /// `store`
    ///
    /// The new snapshot is saved whenever the sources were read. Returns
    /// `None` when the previous build can be reused.
    ///
    /// # Errors
    /// Configuration errors, and failures reading or writing `store`.
    #[instrument(skip(self, store))]
    pub fn run_incremental(
        &mut self,
        store: &mut dyn SnapshotStore,
    ) -> ParserResult<Option<MappedApi>> {
        let previous = store.load()?;
        match self.loader.load(previous.as_ref())? {
            LoadOutcome::Unchanged(_) => {
                info!("Sources unchanged, reusing previous build");
                Ok(None)
            }
            LoadOutcome::Loaded(loaded) => {
                store.save(&loaded.snapshot)?;
                Ok(Some(self.map_loaded(loaded)))
            }
        }
    }

    /// Run the mapping passes over already parsed module records
    pub fn map_modules(&self, mut modules: Vec<Entity>) -> (Vec<Entity>, ObjectStore, Diagnostics) {
        let mut diagnostics = Diagnostics::new();

        hide_stdlib_inherited(&mut modules, is_stdlib);
        diagnostics.extend(resolve_placeholders(&mut modules));
        hide_non_public_children(&mut modules);

        let (mut objects, build_diagnostics) = ObjectStore::build(modules.clone(), &self.display);
        diagnostics.extend(build_diagnostics);
        diagnostics.extend(self.filter.select(&mut objects));

        (modules, objects, diagnostics)
    }

    fn map_loaded(&mut self, loaded: LoadedModules) -> MappedApi {
        let LoadedModules {
            modules,
            project,
            diagnostics: load_diagnostics,
            metrics,
            ..
        } = loaded;
        self.totals.merge(&metrics);
        let entities = modules.into_iter().map(|module| module.entity).collect();

        let (modules, objects, map_diagnostics) = self.map_modules(entities);
        let mut diagnostics = load_diagnostics;
        diagnostics.extend(map_diagnostics);

        info!(
            modules = modules.len(),
            objects = objects.len(),
            rendered = objects.objects_to_render().count(),
            warnings = diagnostics.len(),
            "Mapping completed"
        );

        MappedApi {
            modules,
            objects,
            project,
            metrics,
            diagnostics,
        }
    }
}
