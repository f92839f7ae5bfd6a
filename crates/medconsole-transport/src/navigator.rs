//! Navigation hook the transport fires on an authorization failure.

/// Route of the login surface.
pub const LOGIN_ROUTE: &str = "/auth/login";
/// Route operators land on after signing in.
pub const DASHBOARD_ROUTE: &str = "/dashboard";

/// Moves the operator to another surface.
///
/// The transport only ever calls this with [`LOGIN_ROUTE`], once per 401.
/// Closures implement it directly:
///
/// ```rust
/// use medconsole_transport::Navigator;
///
/// let nav = |route: &str| println!("go to {route}");
/// nav.navigate("/auth/login");
/// ```
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, route: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync + 'static,
{
    fn navigate(&self, route: &str) {
        self(route)
    }
}

/// A navigator for headless use: records the redirect in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn navigate(&self, route: &str) {
        tracing::info!(route, "navigation requested");
    }
}
