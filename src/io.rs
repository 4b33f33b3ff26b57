use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::info::{InfoItem, default_info_items};
use crate::components::pool::{ImagePool, PoolImage};
use crate::document::Document;
use crate::error::DocumentError;
use crate::layout::{Column, ElementId, GridItem, ItemCoords, LayoutTree, RowGroup};
use crate::ops::adjust::sanitize_ratio;
use crate::probe::ImageProbe;

/// On-disk document formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentFormat {
    /// The exchange format consumed by the tour site (`.json`).
    Json,
    /// Native project file (`.tfe`): document plus image pool.
    Tfe,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "tfe" => Some(Self::Tfe),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Tfe => "tfe",
        }
    }
}

// ============================================================================
// JSON EXPORT
// ============================================================================

#[derive(Serialize)]
struct ExportDocument<'a> {
    #[serde(rename = "TITLE")]
    title: &'a str,
    #[serde(rename = "DESCRIPTION")]
    description: &'a str,
    #[serde(rename = "NOTE")]
    note: &'a str,
    #[serde(rename = "STATUS", skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
    #[serde(rename = "LAYOUT_SETTINGS")]
    layout_settings: ExportLayoutSettings,
    #[serde(rename = "INFO")]
    info: Vec<ExportInfo<'a>>,
    #[serde(rename = "INNER_IMAGES")]
    inner_images: Vec<ExportImage<'a>>,
}

#[derive(Serialize)]
struct ExportLayoutSettings {
    #[serde(rename = "LEFT_WIDTH")]
    left_width: f64,
}

#[derive(Serialize)]
struct ExportInfo<'a> {
    #[serde(rename = "INFO_TITLE")]
    title: &'a str,
    #[serde(rename = "CONTENT")]
    content: &'a str,
    #[serde(rename = "INFO_NOTE", skip_serializing_if = "Option::is_none")]
    note: Option<&'a str>,
}

#[derive(Serialize)]
struct ExportImage<'a> {
    #[serde(rename = "TITLE")]
    title: &'a str,
    #[serde(rename = "IMAGE_FILE")]
    image_file: String,
    #[serde(rename = "IMAGE_SRC")]
    image_src: &'a str,
    #[serde(rename = "POSITION")]
    position: Position,
}

#[derive(Serialize, Deserialize, Default)]
struct Position {
    #[serde(rename = "GROUP", default)]
    group: usize,
    #[serde(rename = "COL", default)]
    col: usize,
    #[serde(rename = "ITEM", default)]
    item: usize,
    #[serde(rename = "WIDTH_RATIO", default, skip_serializing_if = "Option::is_none")]
    width_ratio: Option<f64>,
    #[serde(rename = "FLEX", default, skip_serializing_if = "Option::is_none")]
    flex: Option<f64>,
}

/// Export file name for an item without one: `img_NN.jpg`,
/// `NN = group*10 + col*3 + item + 1`.
pub fn default_image_file_name(coords: ItemCoords) -> String {
    format!("img_{:02}.jpg", coords.group * 10 + coords.col * 3 + coords.item + 1)
}

fn export_value(doc: &Document) -> ExportDocument<'_> {
    let info = doc
        .info_items
        .iter()
        .map(|i| ExportInfo {
            title: &i.title,
            content: &i.content,
            note: (!i.note.is_empty()).then_some(i.note.as_str()),
        })
        .collect();

    let inner_images = doc
        .layout
        .iter_items()
        .map(|(coords, column, item)| ExportImage {
            title: &item.caption,
            image_file: item
                .file_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| default_image_file_name(coords)),
            image_src: &item.src,
            position: Position {
                group: coords.group,
                col: coords.col,
                item: coords.item,
                width_ratio: Some(column.width_ratio),
                flex: Some(item.flex),
            },
        })
        .collect();

    ExportDocument {
        title: &doc.title,
        description: &doc.description,
        note: &doc.note,
        status: (!doc.status.is_empty()).then_some(doc.status.as_str()),
        layout_settings: ExportLayoutSettings {
            left_width: doc.left_width,
        },
        info,
        inner_images,
    }
}

/// Pretty-printed JSON export of `doc`.
pub fn export_json(doc: &Document) -> Result<String, DocumentError> {
    Ok(serde_json::to_string_pretty(&export_value(doc))?)
}

pub fn write_json_file(doc: &Document, path: &Path) -> Result<(), DocumentError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &export_value(doc))?;
    Ok(())
}

// ============================================================================
// JSON IMPORT
// ============================================================================

#[derive(Deserialize, Default)]
struct ImportDocument {
    #[serde(rename = "TITLE", default)]
    title: Option<String>,
    #[serde(rename = "DESCRIPTION", default)]
    description: Option<String>,
    #[serde(rename = "NOTE", default)]
    note: Option<String>,
    #[serde(rename = "STATUS", default)]
    status: Option<String>,
    #[serde(rename = "LAYOUT_SETTINGS", default)]
    layout_settings: Option<ImportLayoutSettings>,
    #[serde(rename = "INFO", default)]
    info: Option<Vec<ImportInfo>>,
    #[serde(rename = "INNER_IMAGES", default)]
    inner_images: Option<Vec<ImportImage>>,
}

#[derive(Deserialize, Default)]
struct ImportLayoutSettings {
    #[serde(rename = "LEFT_WIDTH", default)]
    left_width: Option<f64>,
}

#[derive(Deserialize, Default)]
struct ImportInfo {
    #[serde(rename = "INFO_TITLE", default)]
    title: Option<String>,
    #[serde(rename = "CONTENT", default)]
    content: Option<String>,
    #[serde(rename = "INFO_NOTE", default)]
    note: Option<String>,
}

#[derive(Deserialize, Default)]
struct ImportImage {
    #[serde(rename = "TITLE", default)]
    title: Option<String>,
    #[serde(rename = "IMAGE_FILE", default)]
    image_file: Option<String>,
    #[serde(rename = "IMAGE_SRC", default)]
    image_src: Option<String>,
    #[serde(rename = "POSITION", default)]
    position: Option<Position>,
}

/// Result of parsing a JSON export.
///
/// `None` fields were absent from the input and leave the current document
/// untouched when applied.
#[derive(Clone, Debug, Default)]
pub struct ImportReport {
    pub title: String,
    pub description: String,
    pub note: String,
    pub status: String,
    pub left_width: Option<f64>,
    pub info_items: Option<Vec<InfoItem>>,
    pub layout: Option<LayoutTree>,
    /// One pool entry per imported image.
    pub pool_images: Vec<PoolImage>,
    /// Image file names (or sources) that could not be loaded.
    pub skipped: Vec<String>,
}

impl ImportReport {
    /// Apply the text fields, info list and layout to `doc`.
    pub fn apply_to(&self, doc: &mut Document) {
        self.apply_metadata(doc);
        if let Some(layout) = &self.layout {
            doc.layout = layout.clone();
        }
    }

    /// Everything but the layout.
    pub fn apply_metadata(&self, doc: &mut Document) {
        doc.title = self.title.clone();
        doc.description = self.description.clone();
        doc.note = self.note.clone();
        doc.status = self.status.clone();
        if let Some(w) = self.left_width {
            doc.left_width = w;
        }
        if let Some(items) = &self.info_items {
            doc.info_items = items.clone();
        }
    }
}

struct ImportColumn {
    width_ratio: f64,
    items: BTreeMap<usize, GridItem>,
}

/// Parse a JSON export. Every image source is probed (in parallel); sources
/// the probe cannot load are skipped and listed in the report.
pub fn import_json<P: ImageProbe + ?Sized>(text: &str, probe: &P) -> Result<ImportReport, DocumentError> {
    let data: ImportDocument = serde_json::from_str(text)?;

    let mut report = ImportReport {
        title: data.title.unwrap_or_default(),
        description: data.description.unwrap_or_default(),
        note: data.note.unwrap_or_default(),
        status: data.status.unwrap_or_default(),
        left_width: data
            .layout_settings
            .and_then(|s| s.left_width)
            .filter(|w| w.is_finite() && *w > 0.0),
        ..ImportReport::default()
    };

    report.info_items = data.info.map(|info| {
        let items: Vec<InfoItem> = info
            .into_iter()
            .map(|i| {
                InfoItem::new(
                    i.title.unwrap_or_default(),
                    i.content.unwrap_or_default(),
                    i.note.unwrap_or_default(),
                )
            })
            .collect();
        if items.is_empty() { default_info_items() } else { items }
    });

    if let Some(images) = data.inner_images {
        let records: Vec<ImportImage> = images
            .into_iter()
            .filter(|img| img.image_src.as_deref().is_some_and(|s| !s.is_empty()))
            .collect();

        let probed: Vec<_> = records
            .par_iter()
            .map(|img| probe.probe(img.image_src.as_deref().unwrap_or_default()))
            .collect();

        let mut groups: BTreeMap<usize, BTreeMap<usize, ImportColumn>> = BTreeMap::new();
        for (img, dims) in records.into_iter().zip(probed) {
            let src = img.image_src.unwrap_or_default();
            let Some(dimensions) = dims else {
                log::warn!("import: skipping unreachable image {}", src);
                report.skipped.push(img.image_file.filter(|f| !f.is_empty()).unwrap_or(src));
                continue;
            };
            let pos = img.position.unwrap_or_default();
            let caption = img.title.unwrap_or_default();

            let column = groups
                .entry(pos.group)
                .or_default()
                .entry(pos.col)
                .or_insert_with(|| ImportColumn {
                    width_ratio: sanitize_ratio(pos.width_ratio.unwrap_or(0.0)),
                    items: BTreeMap::new(),
                });

            let mut item = GridItem::new(src.clone(), dimensions, caption.clone());
            item.flex = sanitize_ratio(pos.flex.unwrap_or(0.0));
            item.file_name = img.image_file.filter(|f| !f.is_empty());
            column.items.insert(pos.item, item);

            let mut pooled = PoolImage::new(src, dimensions);
            pooled.caption = caption;
            report.pool_images.push(pooled);
        }

        let layout = groups
            .into_values()
            .map(|cols| RowGroup {
                id: ElementId::new(),
                columns: cols
                    .into_values()
                    .map(|c| Column {
                        id: ElementId::new(),
                        items: c.items.into_values().collect(),
                        width_ratio: c.width_ratio,
                    })
                    .collect(),
            })
            .collect();
        report.layout = Some(LayoutTree::from_groups(layout));
    }

    if !report.skipped.is_empty() {
        log::info!("import: {} image(s) could not be loaded", report.skipped.len());
    }
    Ok(report)
}

pub fn read_json_file<P: ImageProbe + ?Sized>(path: &Path, probe: &P) -> Result<ImportReport, DocumentError> {
    let text = std::fs::read_to_string(path)?;
    import_json(&text, probe)
}

// ============================================================================
// NATIVE PROJECT FILE (.tfe)
// ============================================================================

const TFE_MAGIC: &str = "TFE1";

/// Upper bounds enforced on load, against crafted files.
const MAX_IMAGES: usize = 4096;
const MAX_GROUPS: usize = 256;

#[derive(Serialize)]
struct ProjectFileRef<'a> {
    magic: &'a str,
    document: &'a Document,
    pool: &'a ImagePool,
}

#[derive(Deserialize)]
struct ProjectFile {
    magic: String,
    document: Document,
    pool: ImagePool,
}

pub fn save_tfe(document: &Document, pool: &ImagePool, path: &Path) -> Result<(), DocumentError> {
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(
        writer,
        &ProjectFileRef {
            magic: TFE_MAGIC,
            document,
            pool,
        },
    )?;
    Ok(())
}

pub fn load_tfe(path: &Path) -> Result<(Document, ImagePool), DocumentError> {
    let raw = std::fs::read(path)?;
    load_tfe_bytes(&raw)
}

pub fn load_tfe_bytes(raw: &[u8]) -> Result<(Document, ImagePool), DocumentError> {
    if raw.len() < 12 {
        return Err(DocumentError::InvalidFormat("File too small".into()));
    }
    // bincode writes a String as an 8-byte length followed by the bytes, so
    // the 4-byte magic sits at 8..12.
    let magic = std::str::from_utf8(&raw[8..12]).unwrap_or("");
    if magic != TFE_MAGIC {
        return Err(DocumentError::InvalidFormat(format!("Unknown magic '{}'", magic)));
    }

    let project: ProjectFile = bincode::deserialize(raw)?;
    if project.magic != TFE_MAGIC {
        return Err(DocumentError::InvalidFormat("Corrupt header".into()));
    }
    let doc = project.document;
    if doc.layout.group_count() > MAX_GROUPS {
        return Err(DocumentError::InvalidFormat(format!(
            "{} row groups exceeds the limit of {}",
            doc.layout.group_count(),
            MAX_GROUPS
        )));
    }
    let images = doc.layout.item_count().max(project.pool.len());
    if images > MAX_IMAGES {
        return Err(DocumentError::InvalidFormat(format!(
            "{} images exceeds the limit of {}",
            images, MAX_IMAGES
        )));
    }
    doc.layout.validate()?;
    Ok((doc, project.pool))
}
