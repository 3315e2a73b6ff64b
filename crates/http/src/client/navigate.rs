//! Login redirect side effect
//!
//! The client calls [`Navigator::redirect_to_login`] exactly once for every
//! refresh that fails. What "redirect" means is up to the front-end.

use std::sync::Arc;

/// Sends the user back to the login entry point
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self);
}

/// Does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn redirect_to_login(&self) {}
}

/// Runs a callback, e.g. to dispatch a UI action
#[derive(Clone)]
pub struct CallbackNavigator {
    callback: Arc<dyn Fn() + Send + Sync>,
}

impl CallbackNavigator {
    pub fn new(callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }
}

impl Navigator for CallbackNavigator {
    fn redirect_to_login(&self) {
        (self.callback)();
    }
}

impl std::fmt::Debug for CallbackNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackNavigator").finish_non_exhaustive()
    }
}

#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub use web::LocationNavigator;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
mod web {
    use super::Navigator;
    use tracing::warn;

    /// Browser path of the login page
    pub const LOGIN_PATH: &str = "/login";

    /// Redirects the browser by assigning `window.location.href`
    #[derive(Debug, Clone)]
    pub struct LocationNavigator {
        login_path: String,
    }

    impl LocationNavigator {
        pub fn new() -> Self {
            Self::with_path(LOGIN_PATH)
        }

        pub fn with_path(login_path: impl Into<String>) -> Self {
            Self {
                login_path: login_path.into(),
            }
        }
    }

    impl Default for LocationNavigator {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Navigator for LocationNavigator {
        fn redirect_to_login(&self) {
            let Some(window) = web_sys::window() else {
                warn!("No window available for login redirect");
                return;
            };
            if let Err(e) = window.location().set_href(&self.login_path) {
                warn!("Login redirect failed: {e:?}");
            }
        }
    }
}
