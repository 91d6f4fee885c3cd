//! Route classification

/// Routes reachable without a session
pub const DEFAULT_PUBLIC_ROUTES: &[&str] = &["/login", "/forgot-password", "/register", "/students"];

pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

pub const DEFAULT_HOME_ROUTE: &str = "/";

/// Path part of a route: no query, no fragment, no trailing slash
pub fn normalize_route(route: &str) -> &str {
    let end = route.find(['?', '#']).unwrap_or(route.len());
    let path = &route[..end];
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

/// Whether `route` equals a public route or is nested under one
pub fn is_public_route<S: AsRef<str>>(route: &str, public_routes: &[S]) -> bool {
    let route = normalize_route(route);
    public_routes.iter().any(|public| {
        let public = normalize_route(public.as_ref());
        route == public
            || (public != "/"
                && route
                    .strip_prefix(public)
                    .is_some_and(|rest| rest.starts_with('/')))
    })
}

/// Same route once query, fragment and trailing slash are ignored
pub fn same_route(a: &str, b: &str) -> bool {
    normalize_route(a) == normalize_route(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_routes_and_nesting() {
        assert!(is_public_route("/login", DEFAULT_PUBLIC_ROUTES));
        assert!(is_public_route("/login?next=/home", DEFAULT_PUBLIC_ROUTES));
        assert!(is_public_route("/register/", DEFAULT_PUBLIC_ROUTES));
        assert!(is_public_route("/students", DEFAULT_PUBLIC_ROUTES));
        assert!(is_public_route("/students/42/fees", DEFAULT_PUBLIC_ROUTES));

        assert!(!is_public_route("/home", DEFAULT_PUBLIC_ROUTES));
        assert!(!is_public_route("/studentsx", DEFAULT_PUBLIC_ROUTES));
        assert!(!is_public_route("/", DEFAULT_PUBLIC_ROUTES));
    }

    #[test]
    fn route_normalization() {
        assert_eq!(normalize_route("/hostels/?tab=rooms"), "/hostels");
        assert_eq!(normalize_route("/#top"), "/");
        assert!(same_route("/login/", "/login#form"));
    }
}
