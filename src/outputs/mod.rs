//! Output generation for the briefing page and its JSON snapshot.
//!
//! # Submodules
//!
//! - [`html`]: Renders the self-refreshing `index.html` briefing page
//! - [`json`]: Writes the [`CollectionResult`](crate::models::CollectionResult) for API consumption
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── index.html     # Article cards + weather sidebar, reloads every 10 minutes
//! └── articles.json  # Articles, weather and generation time
//! ```
//!
//! Both files are rewritten from scratch on every run.

pub mod html;
pub mod json;
