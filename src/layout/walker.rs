//! Traversal of layout trees.
//!
//! Every function visits sections, then rows, then cards in document order, so
//! repeated calls on an unchanged layout return identical sequences.

use super::{AssetHolder, Card, Layout, Section};

/// A layout with tenant-specific card settings replaced by placeholders, plus the
/// assets referenced by the original layout.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplatizedLayout {
    /// The rewritten layout
    pub layout: Layout,
    /// Asset references, in the order [`collect_assets`] reports them
    pub assets: Vec<String>,
}

/// Identifiers of records the layout's cards depend on.
#[must_use]
pub fn collect_dependencies(layout: &Layout) -> Vec<String> {
    layout.cards().flat_map(|card| card.kind().dependencies(&card.component.settings)).collect()
}

/// Asset references held by section backgrounds and image-like cards.
///
/// A section's background contributes only when it has a `fileSrc`; its assets
/// precede those of the section's cards.
#[must_use]
pub fn collect_assets(layout: &Layout) -> Vec<String> {
    layout.sections.iter().flat_map(section_assets).collect()
}

/// Rewrite card settings into placeholders while collecting assets.
///
/// Header and footer are copied unmodified.
#[must_use]
pub fn templatize(layout: &Layout) -> TemplatizedLayout {
    let mut templatized = layout.clone();
    let mut assets = Vec::new();

    for section in &mut templatized.sections {
        assets.extend(section_assets(section));
        for card in section.rows.iter_mut().flat_map(|row| row.cards.iter_mut()) {
            card.kind().templatize(&mut card.component.settings);
        }
    }

    tracing::debug!(
        "Templatized layout with {} section(s), {} asset(s)",
        templatized.sections.len(),
        assets.len()
    );
    TemplatizedLayout {
        layout: templatized,
        assets,
    }
}

/// Crop identifiers currently referenced by backgrounds and image-like cards.
#[must_use]
pub fn collect_crop_ids(layout: &Layout) -> Vec<String> {
    let mut ids = Vec::new();
    for section in &layout.sections {
        if let Some(id) = section.background().and_then(|bg| bg.crop_id.as_deref()) {
            ids.push(id.to_string());
        }
        let cards = section.rows.iter().flat_map(|row| row.cards.iter());
        ids.extend(cards.filter_map(card_holder).filter_map(|holder| holder.crop_id));
    }
    ids.retain(|id| !id.is_empty());
    ids
}

fn section_assets(section: &Section) -> Vec<String> {
    let mut assets = match section.background() {
        Some(background) if background.has_file_src() => background.assets(),
        _ => Vec::new(),
    };
    for card in section.rows.iter().flat_map(|row| row.cards.iter()) {
        if let Some(holder) = card_holder(card) {
            assets.extend(holder.assets());
        }
    }
    assets
}

fn card_holder(card: &Card) -> Option<AssetHolder> {
    card.kind()
        .carries_assets()
        .then(|| AssetHolder::from_settings(&card.component.settings))
}
