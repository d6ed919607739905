/// Route Table Index
///
/// Enumerates the console's navigable routes, segregated by access class so
/// the guard can decide every navigation from a single table. The paths
/// mirror the remote console's URL scheme; views register themselves against
/// these variants rather than raw strings.
///
/// The two classes map directly to the guard's redirect rules:
/// - `AuthOnly` routes (login, signup, password recovery) are for anonymous
///   visitors and bounce authenticated users back to the landing route.
/// - `Protected` routes require a live session and bounce anonymous visitors
///   to the login route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    // --- Anonymous entry points ---
    Login,
    Signup,
    RecoverPassword,
    ResetPassword,
    // --- Authenticated console ---
    Dashboard,
    Items,
    Settings,
    Admin,
}

/// RouteClass
///
/// Access class of a route, the only property the guard consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    AuthOnly,
    Protected,
}

/// Default landing route: where authenticated users are sent when they hit
/// an auth-only route, and the natural post-login destination.
pub const LANDING: Route = Route::Dashboard;

impl Route {
    pub fn class(self) -> RouteClass {
        match self {
            Route::Login | Route::Signup | Route::RecoverPassword | Route::ResetPassword => {
                RouteClass::AuthOnly
            }
            Route::Dashboard | Route::Items | Route::Settings | Route::Admin => {
                RouteClass::Protected
            }
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::RecoverPassword => "/recover-password",
            Route::ResetPassword => "/reset-password",
            Route::Dashboard => "/",
            Route::Items => "/items",
            Route::Settings => "/settings",
            Route::Admin => "/admin",
        }
    }

    /// Resolves a URL path back to a known route. Unknown paths return
    /// `None`; the guard lets those proceed untouched (not-found chrome is
    /// the presentation layer's concern).
    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = match path.trim_end_matches('/') {
            "" => "/",
            rest => rest,
        };
        match trimmed {
            "/" => Some(Route::Dashboard),
            "/login" => Some(Route::Login),
            "/signup" => Some(Route::Signup),
            "/recover-password" => Some(Route::RecoverPassword),
            "/reset-password" => Some(Route::ResetPassword),
            "/items" => Some(Route::Items),
            "/settings" => Some(Route::Settings),
            "/admin" => Some(Route::Admin),
            _ => None,
        }
    }
}
