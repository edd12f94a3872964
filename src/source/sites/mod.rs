//! Bundled site adapters.
//!
//! Each adapter accepts an overridden base URL (`with_base_url`) so it can be
//! pointed at a local mock server.

mod baka_updates;
mod light_novels_translations;
mod novel_updates;
mod raising_the_dead;
mod read_light_novel;
mod read_novel_full;
mod reddit;

pub use baka_updates::BakaUpdates;
pub use light_novels_translations::LightNovelsTranslations;
pub use novel_updates::NovelUpdates;
pub use raising_the_dead::RaisingTheDead;
pub use read_light_novel::ReadLightNovel;
pub use read_novel_full::ReadNovelFull;
pub use reddit::Reddit;

/// Ensures a base URL ends with `/` so paths can be appended directly.
fn normalize_base(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// Diagnostic context attached to paged requests.
fn page_context(page: usize, url: &str) -> String {
    format!("page: {page}\nurl: {url}")
}
