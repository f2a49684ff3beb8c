use std::fmt::Write;
use std::ops::BitOr;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::http::request::MAX_PATH_LEN;
use crate::http::response::ResponseError;
use crate::pages::handler::PageHandler;

/// Longest page title accepted.
pub const MAX_TITLE_LEN: usize = 31;

const MENU_ITEM_START: &str = "&nbsp;<a href=\"";
const MENU_ITEM_MID: &str = "\">";
const MENU_ITEM_END: &str = "</a>";
const MENU_END: &str = "</h3>\n</div>\n";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("page path longer than {MAX_PATH_LEN} bytes")]
    PathTooLong,
    #[error("page path must start with '/'")]
    InvalidPath,
    #[error("page title longer than {MAX_TITLE_LEN} bytes")]
    TitleTooLong,
    #[error("registry is full ({0} pages)")]
    Full(usize),
    #[error("another page is already the {0} page")]
    FlagAlreadyClaimed(&'static str),
}

/// Role markers for the page served at `/`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageFlags(u8);

impl PageFlags {
    pub const NONE: PageFlags = PageFlags(0);
    /// Served at `/` while the device runs as a WiFi client.
    pub const HOME: PageFlags = PageFlags(0x01);
    /// Served at `/` while the device runs its own access point.
    pub const CAPTIVE_PORTAL: PageFlags = PageFlags(0x02);

    pub fn contains(self, other: PageFlags) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

impl BitOr for PageFlags {
    type Output = PageFlags;

    fn bitor(self, rhs: PageFlags) -> PageFlags {
        PageFlags(self.0 | rhs.0)
    }
}

/// A registered page. Immutable once registered.
#[derive(Clone)]
pub struct Page {
    path: String,
    title: String,
    flags: PageFlags,
    handler: Arc<dyn PageHandler>,
}

impl Page {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn flags(&self) -> PageFlags {
        self.flags
    }

    pub fn handler(&self) -> &dyn PageHandler {
        self.handler.as_ref()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("path", &self.path)
            .field("title", &self.title)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// The set of servable pages, kept in registration order.
///
/// Pages are registered before the server starts; the server then shares the
/// registry read-only across all connections.
#[derive(Debug)]
pub struct PageRegistry {
    pages: Vec<Page>,
    banner: String,
    max_pages: usize,
}

impl PageRegistry {
    pub fn new(banner: impl Into<String>, max_pages: usize) -> Self {
        Self {
            pages: Vec::new(),
            banner: banner.into(),
            max_pages,
        }
    }

    /// Adds a page.
    ///
    /// Registering a path that already exists succeeds without changing the
    /// existing page. At most one page may carry each of the home and
    /// captive-portal flags.
    pub fn register(
        &mut self,
        path: &str,
        title: &str,
        handler: Arc<dyn PageHandler>,
        flags: PageFlags,
    ) -> Result<(), RegistryError> {
        if path.len() > MAX_PATH_LEN {
            return Err(RegistryError::PathTooLong);
        }
        if !path.starts_with('/') {
            return Err(RegistryError::InvalidPath);
        }
        if title.len() > MAX_TITLE_LEN {
            return Err(RegistryError::TitleTooLong);
        }

        if self.pages.iter().any(|p| p.path == path) {
            debug!(path, "Web page already exists");
            return Ok(());
        }

        for (flag, role) in [
            (PageFlags::HOME, "home"),
            (PageFlags::CAPTIVE_PORTAL, "captive portal"),
        ] {
            if flags.contains(flag) && self.pages.iter().any(|p| p.flags.contains(flag)) {
                warn!(path, role, "page role already claimed");
                return Err(RegistryError::FlagAlreadyClaimed(role));
            }
        }

        if self.pages.len() >= self.max_pages {
            warn!(path, max_pages = self.max_pages, "Unable to add web page");
            return Err(RegistryError::Full(self.max_pages));
        }

        debug!(path, title, "Adding web page");
        self.pages.push(Page {
            path: path.to_string(),
            title: title.to_string(),
            flags,
            handler,
        });
        Ok(())
    }

    /// Finds the page serving `path`.
    ///
    /// A page matches when `path` starts with the page's path, so `/a` also
    /// serves `/abc` and `/a?x=1`. When several pages match, the longest
    /// registered path wins.
    pub fn find_by_path(&self, path: &str) -> Option<&Page> {
        self.pages
            .iter()
            .filter(|p| path.starts_with(p.path.as_str()))
            .max_by_key(|p| p.path.len())
    }

    /// The page for `/`: the captive portal while an access point is up,
    /// the home page otherwise.
    pub fn find_home_or_portal(&self, ap_active: bool) -> Option<&Page> {
        let flag = if ap_active {
            PageFlags::CAPTIVE_PORTAL
        } else {
            PageFlags::HOME
        };
        self.pages.iter().find(|p| p.flags.contains(flag))
    }

    pub fn home_page(&self) -> Option<&Page> {
        self.find_home_or_portal(false)
    }

    /// Renders the navigation menu linking every page.
    ///
    /// `capacity` is a hard cap: a menu that does not fit is an error, never
    /// a truncated string.
    pub fn render_menu(&self, capacity: usize) -> Result<String, ResponseError> {
        let start = format!(
            "<div>\n<h1 style=\"text-align:center;background-color:#3EE427;\">{}</h1>\n</div>\n<div>\n<h3 style=\"background-color:#1E90FF;\">",
            self.banner
        );
        let item_overhead = MENU_ITEM_START.len() + MENU_ITEM_MID.len() + MENU_ITEM_END.len();
        let needed = start.len()
            + MENU_END.len()
            + self
                .pages
                .iter()
                .map(|p| item_overhead + p.path.len() + p.title.len())
                .sum::<usize>();
        if needed > capacity {
            warn!(needed, capacity, "Menu too big");
            return Err(ResponseError::MenuTooLarge(capacity));
        }

        let mut menu = String::with_capacity(needed);
        menu.push_str(&start);
        for page in &self.pages {
            let _ = write!(
                menu,
                "{MENU_ITEM_START}{}{MENU_ITEM_MID}{}{MENU_ITEM_END}",
                page.path, page.title
            );
        }
        menu.push_str(MENU_END);
        Ok(menu)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
