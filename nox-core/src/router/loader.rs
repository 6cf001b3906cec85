//! Route table loading
//!
//! Class discovery is left to a [`ClassScanner`]; the crate ships
//! [`ClassRegistry`], an explicit list filled at init time. The
//! [`RouteTableLoader`] keeps every class carrying the controller marker,
//! rejects controllers that do not extend `BaseController` and compiles all
//! route patterns, so a bad declaration fails at load time rather than on
//! the first request. [`ModelClassIdentifier`] does the same for models.

use std::sync::Arc;

use super::controller::{Controller, ControllerDescriptor, RouteMethod};
use super::route::{PathMatcher, Route, RouteBase};
use super::ConfigError;
use crate::orm::Model;

/// Parent every routable controller extends
pub const BASE_CONTROLLER: &str = "BaseController";

/// Interface every model class implements
pub const MODEL_INTERFACE: &str = "MySQLModelInterface";

/// Role markers a scanned class can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassMarker {
    Controller,
    Model,
}

/// What a scanner knows about one class
#[derive(Clone, Default)]
pub struct ClassDescriptor {
    pub name: String,
    pub markers: Vec<ClassMarker>,
    pub parent: Option<String>,
    pub interfaces: Vec<String>,
    pub controller: Option<ControllerDescriptor>,
    pub model: Option<Arc<dyn Model>>,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn marker(mut self, marker: ClassMarker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn with_controller(mut self, descriptor: ControllerDescriptor) -> Self {
        self.controller = Some(descriptor);
        self
    }

    pub fn with_model(mut self, model: Arc<dyn Model>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn has_marker(&self, marker: ClassMarker) -> bool {
        self.markers.contains(&marker)
    }
}

impl std::fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("markers", &self.markers)
            .field("parent", &self.parent)
            .field("interfaces", &self.interfaces)
            .field("controller", &self.controller)
            .field("model", &self.model.as_ref().map(|m| m.name().to_string()))
            .finish()
    }
}

/// Source of class descriptors
pub trait ClassScanner {
    fn scan(&self) -> Vec<ClassDescriptor>;
}

/// Explicit, init-time class registration
///
/// # Example
///
/// ```rust,ignore
/// let classes = ClassRegistry::new()
///     .controller::<HomeController>()
///     .controller::<UsersController>()
///     .model::<UsersModel>();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: Vec<ClassDescriptor>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a controller type; it extends `BaseController`
    pub fn controller<C: Controller>(self) -> Self {
        let descriptor = C::descriptor();
        self.class(
            ClassDescriptor::new(descriptor.name.clone())
                .marker(ClassMarker::Controller)
                .extends(BASE_CONTROLLER)
                .with_controller(descriptor),
        )
    }

    /// Register a model type; it implements `MySQLModelInterface`
    pub fn model<M: Model + Default + 'static>(self) -> Self {
        let model = M::default();
        self.class(
            ClassDescriptor::new(model.instance_name().to_string())
                .marker(ClassMarker::Model)
                .implements(MODEL_INTERFACE)
                .with_model(Arc::new(model)),
        )
    }

    pub fn class(mut self, class: ClassDescriptor) -> Self {
        self.classes.push(class);
        self
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassScanner for ClassRegistry {
    fn scan(&self) -> Vec<ClassDescriptor> {
        self.classes.clone()
    }
}

/// A route with its compiled matcher
#[derive(Debug, Clone)]
pub(crate) struct LoadedRoute {
    pub(crate) route: Route,
    pub(crate) matcher: PathMatcher,
}

#[derive(Debug, Clone)]
pub(crate) struct LoadedMethod {
    pub(crate) method: RouteMethod,
    pub(crate) routes: Vec<LoadedRoute>,
}

#[derive(Debug, Clone)]
pub(crate) struct LoadedBase {
    pub(crate) base: RouteBase,
    pub(crate) matcher: PathMatcher,
}

#[derive(Debug, Clone)]
pub(crate) struct LoadedController {
    pub(crate) name: String,
    pub(crate) base: Option<LoadedBase>,
    pub(crate) methods: Vec<LoadedMethod>,
}

/// Compiled, ordered set of routable controllers
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    pub(crate) controllers: Vec<LoadedController>,
}

impl RouteTable {
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Controller names in dispatch order
    pub fn controller_names(&self) -> Vec<&str> {
        self.controllers.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Builds a [`RouteTable`] from scanned classes
pub struct RouteTableLoader;

impl RouteTableLoader {
    pub fn load_from(scanner: &dyn ClassScanner) -> Result<RouteTable, ConfigError> {
        Self::load(scanner.scan())
    }

    pub fn load(classes: Vec<ClassDescriptor>) -> Result<RouteTable, ConfigError> {
        let mut controllers = Vec::new();

        for class in classes {
            if !class.has_marker(ClassMarker::Controller) {
                continue;
            }
            if class.parent.as_deref() != Some(BASE_CONTROLLER) {
                return Err(ConfigError::ControllerMissingExtension(class.name));
            }

            let descriptor =
                class.controller.unwrap_or_else(|| ControllerDescriptor::new(class.name.clone()));
            let loaded = Self::compile(descriptor)?;
            log::debug!(
                "Loaded controller {} ({} route methods)",
                loaded.name,
                loaded.methods.len()
            );
            controllers.push(loaded);
        }

        log::info!("Route table loaded with {} controllers", controllers.len());
        Ok(RouteTable { controllers })
    }

    fn compile(descriptor: ControllerDescriptor) -> Result<LoadedController, ConfigError> {
        let base = match descriptor.effective_base() {
            Some(base) => Some(LoadedBase {
                matcher: PathMatcher::prefix(base.pattern(), base.is_regex())?,
                base: base.clone(),
            }),
            None => None,
        };

        let mut methods = Vec::with_capacity(descriptor.methods.len());
        for method in descriptor.methods {
            let routes = method
                .routes
                .iter()
                .map(|route| {
                    Ok(LoadedRoute {
                        matcher: PathMatcher::full(route.pattern(), route.is_regex())?,
                        route: route.clone(),
                    })
                })
                .collect::<Result<Vec<_>, ConfigError>>()?;
            methods.push(LoadedMethod { method, routes });
        }

        Ok(LoadedController { name: descriptor.name, base, methods })
    }
}

/// Picks the model classes out of the scanned classes
pub struct ModelClassIdentifier;

impl ModelClassIdentifier {
    pub fn identify(classes: &[ClassDescriptor]) -> Result<Vec<Arc<dyn Model>>, ConfigError> {
        let mut models = Vec::new();
        for class in classes.iter().filter(|c| c.has_marker(ClassMarker::Model)) {
            let implements = class.interfaces.iter().any(|i| i == MODEL_INTERFACE);
            match (&class.model, implements) {
                (Some(model), true) => models.push(model.clone()),
                _ => return Err(ConfigError::ModelMissingImplementation(class.name.clone())),
            }
        }
        Ok(models)
    }
}
