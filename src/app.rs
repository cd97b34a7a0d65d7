use std::sync::Arc;

use crate::{
    config::DispatchConfig,
    controller::{self, ControllerClass},
    dispatcher::{DefaultErrorHandler, Dispatcher, ErrorHandler, FactoryInstances, InstanceProvider},
    error::BuildErrors,
    registry::{self, ControllerRegistry, RegistryBuilder, RegistrySlot},
};

pub struct App {
    cfg: DispatchConfig,
    // None: every controller discovered through inventory
    classes: Option<Vec<ControllerClass>>,
    instances: Arc<dyn InstanceProvider>,
    errors: Arc<dyn ErrorHandler>,
    slot: RegistrySlot,
    published_global: bool,
    started: bool,
}

impl App {
    pub fn new(cfg: DispatchConfig) -> Self {
        Self {
            cfg,
            classes: None,
            instances: Arc::new(FactoryInstances),
            errors: Arc::new(DefaultErrorHandler),
            slot: RegistrySlot::new(),
            published_global: false,
            started: false,
        }
    }

    /// Replaces the dispatch configuration. Only honoured before `start`.
    pub fn config(&mut self, cfg: DispatchConfig) -> &mut Self {
        if self.started {
            tracing::warn!("config called after start(); ignoring");
            return self;
        }
        self.cfg = cfg;
        self
    }

    /// Restricts the candidate set to `classes` instead of every discovered controller.
    pub fn controllers(&mut self, classes: Vec<ControllerClass>) -> &mut Self {
        if self.started {
            tracing::warn!(count = classes.len(), "controllers called after start(); ignoring");
            return self;
        }
        self.classes = Some(classes);
        self
    }

    pub fn instances<P: InstanceProvider + 'static>(&mut self, provider: P) -> &mut Self {
        if self.started {
            tracing::warn!("instances called after start(); ignoring");
            return self;
        }
        self.instances = Arc::new(provider);
        self
    }

    pub fn error_handler<E: ErrorHandler + 'static>(&mut self, handler: E) -> &mut Self {
        if self.started {
            tracing::warn!("error_handler called after start(); ignoring");
            return self;
        }
        self.errors = Arc::new(handler);
        self
    }

    /// Builds the registry from the candidate set and publishes it. All-or-nothing:
    /// on any violation nothing is published and every violation is returned.
    pub fn start(&mut self) -> Result<(), BuildErrors> {
        if self.started {
            return Ok(());
        }
        let classes = match &self.classes {
            Some(explicit) => explicit.clone(),
            None => controller::discovered(),
        };
        for class in &classes {
            tracing::debug!(class = class.type_name, methods = class.methods.len(), "candidate controller");
        }
        let registry = RegistryBuilder::new()
            .default_verbs(self.cfg.default_verbs.clone())
            .build(classes)?;
        let routes: Vec<&str> = registry.handlers().map(|h| h.route.as_str()).collect();
        tracing::info!(?routes, "controller registry built");
        let registry = Arc::new(registry);
        if self.cfg.install_global {
            registry::global().install(registry.clone())?;
            self.published_global = true;
        }
        self.slot.install(registry)?;
        self.started = true;
        Ok(())
    }

    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.slot.clear();
        if self.published_global {
            registry::global().clear();
            self.published_global = false;
        }
        self.started = false;
    }

    /// `None` before `start`.
    pub fn dispatcher(&self) -> Option<Dispatcher> {
        self.slot
            .load()
            .map(|reg| Dispatcher::from_parts(reg, self.instances.clone(), self.errors.clone()))
    }

    pub fn registry(&self) -> Option<Arc<ControllerRegistry>> {
        self.slot.load()
    }

    pub fn dispatch_config(&self) -> &DispatchConfig {
        &self.cfg
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}
