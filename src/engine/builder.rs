//! Engine under construction and the composed engine.

use axum::http::Method;
use axum::Router;

use crate::http::fallback::{FallbackKind, FallbackResponder};

type Interceptor = Box<dyn FnOnce(Router) -> Router + Send>;

/// Mutable engine used during composition.
///
/// Interceptors are recorded in attachment order and applied when the
/// engine is finished: the first one attached becomes the outermost layer,
/// so it sees the request first.
pub struct EngineBuilder {
    router: Router,
    interceptors: Vec<(&'static str, Interceptor)>,
}

impl EngineBuilder {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            interceptors: Vec::new(),
        }
    }

    /// Register an interceptor that wraps everything attached after it.
    pub fn intercept<F>(&mut self, name: &'static str, interceptor: F)
    where
        F: FnOnce(Router) -> Router + Send + 'static,
    {
        self.interceptors.push((name, Box::new(interceptor)));
    }

    /// Register the handler of one fallback condition.
    ///
    /// Must be called after all routes are added: the method fallback is
    /// installed on the routes that exist at call time.
    pub fn fallback(&mut self, responder: FallbackResponder) {
        let router = std::mem::take(&mut self.router);
        self.router = match responder.kind() {
            FallbackKind::NotFound => {
                router.fallback(move |method: Method| responder.clone().handle(method))
            }
            FallbackKind::MethodNotAllowed => router
                .method_not_allowed_fallback(move |method: Method| responder.clone().handle(method)),
        };
    }

    /// Names of the registered interceptors, outermost first.
    pub fn interceptors(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.interceptors.iter().map(|(name, _)| *name)
    }

    pub(crate) fn finish(self, capabilities: Vec<&'static str>) -> Engine {
        let layers: Vec<&'static str> = self.interceptors().collect();
        let router = self
            .interceptors
            .into_iter()
            .rev()
            .fold(self.router, |router, (_, interceptor)| interceptor(router));

        Engine {
            router,
            layers,
            capabilities,
        }
    }
}

/// The composed, immutable request dispatcher.
#[derive(Clone)]
pub struct Engine {
    router: Router,
    layers: Vec<&'static str>,
    capabilities: Vec<&'static str>,
}

impl Engine {
    /// A clone of the composed router, ready to serve.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }

    /// Interceptors wrapping the router, outermost first.
    pub fn layers(&self) -> &[&'static str] {
        &self.layers
    }

    /// Capability modules that attached, in attachment order.
    pub fn capabilities(&self) -> &[&'static str] {
        &self.capabilities
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("layers", &self.layers)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}
