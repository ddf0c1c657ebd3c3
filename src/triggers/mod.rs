//! # Trigger sources.
//!
//! Adapters that turn host signals into module requests. They only call into
//! [`BundleOptimizer`](crate::BundleOptimizer); their own state is limited to
//! suppressing duplicate triggers.
//!
//! | Trigger             | Host signal                    | Priority |
//! |---------------------|--------------------------------|----------|
//! | [`PageDetector`]    | start + navigation             | normal   |
//! | [`HoverPrefetch`]   | first hover over a `/` link    | low      |
//! | [`ClickInterceptor`]| click on a module-marked node  | high     |
//! | [`ViewportLoader`]  | section near the viewport      | low      |

mod click;
mod hover;
mod navigation;
mod page;
mod viewport;

pub use click::{ClickDecision, ClickInterceptor};
pub use hover::HoverPrefetch;
pub use navigation::{NavigationChannel, NavigationSource};
pub use page::PageDetector;
pub use viewport::{SectionRect, ViewportLoader};
