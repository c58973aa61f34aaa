//! Text and JSON renditions of the site pages.
//!
//! Every page is the same shell: navigation bar, page body, footer. The
//! navigation layout is chosen from an explicit [`DisplayMode`], never
//! inferred from the body.

use std::fmt::Write as _;

use chrono::Datelike;
use serde::Serialize;
use siteconfig::{DisplayMode, NavEntry, Route, SiteConfig, StudioInfo};

const MOBILE_MENU_LABEL: &str = "Меню";
const COMING_SOON: &str = "Скоро здесь будет контент";
const BACK_HOME: &str = "← На главную";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavItem {
    pub label: String,
    pub path: String,
    pub active: bool,
}

/// Navigation bar as laid out for one display mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum NavView {
    /// Inline pills.
    Desktop { items: Vec<NavItem> },
    /// Menu button followed by the stacked list it opens.
    Mobile {
        menu_label: String,
        items: Vec<NavItem>,
    },
}

impl NavView {
    pub fn items(&self) -> &[NavItem] {
        match self {
            NavView::Desktop { items } | NavView::Mobile { items, .. } => items,
        }
    }

    pub fn active(&self) -> Option<&NavItem> {
        self.items().iter().find(|item| item.active)
    }

    fn write_text(&self, out: &mut String) {
        match self {
            NavView::Desktop { items } => {
                let pills: Vec<String> = items
                    .iter()
                    .map(|item| {
                        if item.active {
                            format!("[ {} ]", item.label)
                        } else {
                            format!("( {} )", item.label)
                        }
                    })
                    .collect();
                let _ = writeln!(out, "{}", pills.join("  "));
            }
            NavView::Mobile { menu_label, items } => {
                let _ = writeln!(out, "≡ {menu_label}");
                for item in items {
                    let marker = if item.active { "›" } else { " " };
                    let _ = writeln!(out, "  {marker} {}", item.label);
                }
            }
        }
    }
}

pub struct NavBar<'a> {
    entries: &'a [NavEntry],
}

impl<'a> NavBar<'a> {
    pub fn new(entries: &'a [NavEntry]) -> Self {
        Self { entries }
    }

    /// Lays out the bar for `mode`, highlighting the entry whose route matches `active_path`.
    pub fn render(&self, active_path: &str, mode: DisplayMode) -> NavView {
        let active = Route::resolve(active_path);
        let items = self
            .entries
            .iter()
            .map(|entry| NavItem {
                label: entry.label.clone(),
                path: entry.path.clone(),
                active: Route::resolve(&entry.path) == active,
            })
            .collect();
        match mode {
            DisplayMode::Desktop => NavView::Desktop { items },
            DisplayMode::Mobile => NavView::Mobile {
                menu_label: MOBILE_MENU_LABEL.to_string(),
                items,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub heading: String,
    pub lines: Vec<String>,
}

impl Section {
    fn new(heading: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            heading: heading.into(),
            lines,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Footer {
    pub heading: String,
    pub lines: Vec<String>,
    pub copyright: String,
}

impl Footer {
    pub fn new(studio: &StudioInfo, year: i32) -> Self {
        let heading = match (studio.name.is_empty(), studio.city.is_empty()) {
            (false, false) => format!("{} — {}", studio.name, studio.city),
            (false, true) => studio.name.clone(),
            _ => studio.city.clone(),
        };
        let lines = [&studio.address, &studio.phone]
            .into_iter()
            .filter(|line| !line.is_empty())
            .cloned()
            .collect();
        Self {
            heading,
            lines,
            copyright: format!("© {year} {}. Сделано с ❤️", studio.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView {
    pub path: String,
    pub title: String,
    pub nav: NavView,
    pub sections: Vec<Section>,
    pub footer: Footer,
}

impl PageView {
    pub fn build(config: &SiteConfig, path: &str, mode: DisplayMode, year: i32) -> Self {
        let route = Route::resolve(path);
        let nav = NavBar::new(&config.nav).render(path, mode);
        let nav_title = nav.active().map(|item| item.label.clone());

        let (title, sections) = match &route {
            Route::Home => (config.studio.headline.clone(), home(config)),
            Route::Schedule => (title_or(nav_title, "Расписание"), schedule(config)),
            Route::Pricing => (title_or(nav_title, "Абонементы"), pricing(config)),
            Route::Coaches => ("Наши тренеры".to_string(), coaches(config)),
            Route::Trainings => (title_or(nav_title, "Тренировки"), trainings(config)),
            Route::NotFound(_) => (
                COMING_SOON.to_string(),
                vec![Section::new(BACK_HOME, vec![Route::Home.path().to_string()])],
            ),
        };

        Self {
            path: route.path().to_string(),
            title,
            nav,
            sections,
            footer: Footer::new(&config.studio, year),
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        self.nav.write_text(&mut out);
        out.push('\n');
        let _ = writeln!(out, "# {}", self.title);
        for section in &self.sections {
            out.push('\n');
            let _ = writeln!(out, "## {}", section.heading);
            for line in &section.lines {
                let _ = writeln!(out, "  {line}");
            }
        }
        out.push('\n');
        let _ = writeln!(out, "---");
        let _ = writeln!(out, "{}", self.footer.heading);
        for line in &self.footer.lines {
            let _ = writeln!(out, "{line}");
        }
        let _ = writeln!(out, "{}", self.footer.copyright);
        out
    }
}

pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

fn title_or(nav_title: Option<String>, fallback: &str) -> String {
    nav_title.unwrap_or_else(|| fallback.to_string())
}

fn home(config: &SiteConfig) -> Vec<Section> {
    let studio = &config.studio;
    let mut sections = Vec::new();
    if !studio.tagline.is_empty() {
        sections.push(Section::new(studio.name.clone(), vec![studio.tagline.clone()]));
    }
    if !studio.hours.is_empty() {
        let lines = studio
            .hours
            .iter()
            .map(|hours| format!("{}: {}", hours.label, hours.time))
            .collect();
        sections.push(Section::new("Режим работы", lines));
    }
    if !config.stories.is_empty() {
        // Digit keys open the first nine stories in the window.
        let lines = config
            .stories
            .iter()
            .enumerate()
            .map(|(index, story)| format!("{}. {}", index + 1, story.title))
            .collect();
        sections.push(Section::new("Истории", lines));
    }
    if !studio.links.is_empty() {
        let lines = studio
            .links
            .iter()
            .map(|link| format!("{} → {}", link.label, link.url))
            .collect();
        sections.push(Section::new("Ссылки", lines));
    }
    sections
}

fn schedule(config: &SiteConfig) -> Vec<Section> {
    if config.schedule.is_empty() {
        return vec![Section::new(COMING_SOON, Vec::new())];
    }
    let mut sections: Vec<Section> = Vec::new();
    for entry in &config.schedule {
        let line = match &entry.coach {
            Some(coach) => format!("{}  {} ({coach})", entry.time, entry.class),
            None => format!("{}  {}", entry.time, entry.class),
        };
        match sections.iter_mut().find(|section| section.heading == entry.day) {
            Some(section) => section.lines.push(line),
            None => sections.push(Section::new(entry.day.clone(), vec![line])),
        }
    }
    sections
}

fn pricing(config: &SiteConfig) -> Vec<Section> {
    let mut sections = Vec::new();
    if let Some(featured) = config.featured_tier() {
        sections.push(Section::new(
            "Рекомендуем",
            vec![format!("{} — {}", featured.name, featured.price)],
        ));
    }
    for tier in &config.pricing {
        let heading = if tier.featured {
            format!("{} ★", tier.name)
        } else {
            tier.name.clone()
        };
        let mut lines = vec![tier.price.clone()];
        if !tier.description.is_empty() {
            lines.push(tier.description.clone());
        }
        lines.push(format!(
            "свечение: {} × {:.1}",
            tier.glow_color, tier.glow_intensity
        ));
        sections.push(Section::new(heading, lines));
    }
    sections
}

fn coaches(config: &SiteConfig) -> Vec<Section> {
    let lines = config
        .coaches
        .iter()
        .map(|coach| format!("{} — {}", coach.name, coach.role))
        .collect();
    vec![Section::new("Команда", lines)]
}

fn trainings(config: &SiteConfig) -> Vec<Section> {
    config
        .trainings
        .iter()
        .map(|training| {
            let lines = if training.description.is_empty() {
                Vec::new()
            } else {
                vec![training.description.clone()]
            };
            Section::new(training.name.clone(), lines)
        })
        .collect()
}
