use crate::{NavEntry, SiteConfig};

/// Logical widths strictly below this render the collapsed mobile navigation.
pub const MOBILE_BREAKPOINT: f64 = 768.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Desktop,
    Mobile,
}

impl DisplayMode {
    pub fn for_width(logical_width: f64) -> Self {
        if logical_width.is_finite() && logical_width < MOBILE_BREAKPOINT {
            DisplayMode::Mobile
        } else {
            DisplayMode::Desktop
        }
    }
}

/// Single source of truth for the navigation display mode.
///
/// Hosts feed every layout width they see; a mode is reported only when it
/// differs from the previous observation.
#[derive(Debug, Default)]
pub struct WidthObserver {
    current: Option<DisplayMode>,
}

impl WidthObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, logical_width: f64) -> Option<DisplayMode> {
        let mode = DisplayMode::for_width(logical_width);
        if self.current == Some(mode) {
            None
        } else {
            self.current = Some(mode);
            Some(mode)
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.current.unwrap_or(DisplayMode::Desktop)
    }
}

/// Pages known to the site shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Schedule,
    Pricing,
    Coaches,
    Trainings,
    NotFound(String),
}

impl Route {
    pub fn resolve(path: &str) -> Self {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Route::Home,
            "/schedule" => Route::Schedule,
            "/pricing" => Route::Pricing,
            "/coaches" => Route::Coaches,
            "/trainings" => Route::Trainings,
            _ => Route::NotFound(path.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Route::Home => "/",
            Route::Schedule => "/schedule",
            Route::Pricing => "/pricing",
            Route::Coaches => "/coaches",
            Route::Trainings => "/trainings",
            Route::NotFound(path) => path.as_str(),
        }
    }
}

impl SiteConfig {
    /// Navigation entry highlighted for `path`, if any.
    pub fn active_nav(&self, path: &str) -> Option<&NavEntry> {
        let route = Route::resolve(path);
        self.nav
            .iter()
            .find(|entry| Route::resolve(&entry.path) == route)
    }
}
