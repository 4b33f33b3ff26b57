use std::path::{Path, PathBuf};

use rayon::prelude::*;
use uuid::Uuid;

use crate::components::drag::{DragOrigin, DragSession, DropPlan, DropRejected, DropResolution, DropZone, PendingDrop};
use crate::components::drop_target::DropTarget;
use crate::components::history::HistoryManager;
use crate::components::info::{self, InfoField};
use crate::components::pool::{ImagePool, PoolImage, UploadStatus};
use crate::components::tour::{self, FieldChoice, ImageChoice, TourData, TourSelections};
use crate::document::Document;
use crate::error::{DocumentError, UploadError};
use crate::io::{self, DocumentFormat, ImportReport};
use crate::layout::{DEFAULT_RATIO, ElementId, GridItem, ImageDimensions, ItemCoords, LayoutTree};
use crate::ops::edit::EditedImage;
use crate::ops::{adjust, grid_ops};
use crate::probe::ImageProbe;
use crate::settings::EditorSettings;
use crate::storage::{self, ImageUploader};

/// Coordinates of the selected grid item.
pub type SelectedItem = ItemCoords;

type SelectionListener = Box<dyn FnMut(Option<SelectedItem>) + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Selection {
    coords: ItemCoords,
    item_id: ElementId,
}

/// What a completed drop did to the layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropOutcome {
    /// The layout changed and a history entry was recorded.
    Applied,
    /// The target no longer fits the layout; nothing changed.
    Ignored,
    /// The pool image failed to load; nothing changed.
    Unreachable,
    /// The result belonged to an earlier drop.
    Stale,
    Rejected(DropRejected),
}

/// An image about to be uploaded to object storage.
pub struct UploadRequest<'a> {
    /// Local preview source shown while the upload runs.
    pub local_src: &'a str,
    pub dimensions: ImageDimensions,
    pub bytes: &'a [u8],
    pub mime: &'a str,
    pub file_name: Option<&'a str>,
}

/// Single open document together with its editing session state.
pub struct Project {
    pub id: Uuid,
    document: Document,
    history: HistoryManager<LayoutTree>,
    pub pool: ImagePool,
    drag: DragSession,
    selection: Option<Selection>,
    selection_listener: Option<SelectionListener>,
    ratio_step: f64,
    default_json_file_name: String,
    /// `None` for unsaved/untitled files.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,

    /// Display name (derived from path or "Untitled-X")
    pub name: String,
}

impl Project {
    pub fn new_untitled(untitled_counter: usize, settings: &EditorSettings) -> Self {
        let mut project = Self::from_parts(
            Document::with_left_width(settings.default_left_width),
            ImagePool::new(),
            settings,
        );
        project.name = format!("Untitled-{}", untitled_counter);
        project
    }

    pub fn from_parts(document: Document, pool: ImagePool, settings: &EditorSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            document,
            history: HistoryManager::new(settings.max_undo_steps),
            pool,
            drag: DragSession::new(),
            selection: None,
            selection_listener: None,
            ratio_step: settings.ratio_step,
            default_json_file_name: settings.default_json_file_name.clone(),
            path: None,
            is_dirty: false,
            name: "Untitled".to_string(),
        }
    }

    /// Open a `.json` export or a `.tfe` project. JSON images are probed;
    /// the returned list names the ones that could not be loaded.
    pub fn open<P: ImageProbe + ?Sized>(
        path: &Path,
        settings: &EditorSettings,
        probe: &P,
    ) -> Result<(Self, Vec<String>), DocumentError> {
        let (mut project, skipped) = match DocumentFormat::from_path(path) {
            Some(DocumentFormat::Tfe) => {
                let (document, pool) = io::load_tfe(path)?;
                (Self::from_parts(document, pool, settings), Vec::new())
            }
            Some(DocumentFormat::Json) => {
                let report = io::read_json_file(path, probe)?;
                let mut document = Document::with_left_width(settings.default_left_width);
                report.apply_to(&mut document);
                let mut pool = ImagePool::new();
                pool.extend(report.pool_images);
                (Self::from_parts(document, pool, settings), report.skipped)
            }
            None => {
                return Err(DocumentError::InvalidFormat(format!(
                    "unsupported file type: {}",
                    path.display()
                )));
            }
        };
        project.path = Some(path.to_path_buf());
        project.update_name_from_path();
        log::info!(
            "opened {} ({} groups, {} images)",
            path.display(),
            project.document.layout.group_count(),
            project.document.layout.item_count()
        );
        Ok((project, skipped))
    }

    /// Write the document in the format implied by the extension.
    pub fn save(&mut self, path: &Path) -> Result<(), DocumentError> {
        match DocumentFormat::from_path(path) {
            Some(DocumentFormat::Json) => {
                if self.document.has_unpublished_images() {
                    log::warn!("{}: some images are not uploaded yet and will not load elsewhere", path.display());
                }
                io::write_json_file(&self.document, path)?
            }
            Some(DocumentFormat::Tfe) => io::save_tfe(&self.document, &self.pool, path)?,
            None => {
                return Err(DocumentError::InvalidFormat(format!(
                    "unsupported file type: {}",
                    path.display()
                )));
            }
        }
        self.path = Some(path.to_path_buf());
        self.update_name_from_path();
        self.mark_clean();
        Ok(())
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn layout(&self) -> &LayoutTree {
        &self.document.layout
    }

    pub fn history(&self) -> &HistoryManager<LayoutTree> {
        &self.history
    }

    pub fn drag(&self) -> &DragSession {
        &self.drag
    }

    // ========================================================================
    // LAYOUT COMMITS
    // ========================================================================

    /// Record the current layout in history and replace it with `next`.
    /// Debug builds refuse a tree that breaks the layout invariants.
    pub fn commit_layout(&mut self, next: LayoutTree, label: &str) -> bool {
        if cfg!(debug_assertions) {
            if let Err(e) = next.validate() {
                log::error!("refusing to commit '{}': {}", label, e);
                return false;
            }
        }
        self.history.push_labeled(&self.document.layout, label);
        self.document.layout = next;
        self.mark_dirty();
        self.refresh_selection();
        true
    }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.undo(&self.document.layout) else {
            return false;
        };
        self.document.layout = previous;
        self.mark_dirty();
        self.refresh_selection();
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.redo(&self.document.layout) else {
            return false;
        };
        self.document.layout = next;
        self.mark_dirty();
        self.refresh_selection();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn delete_item(&mut self, coords: ItemCoords) -> bool {
        match grid_ops::delete_item(&self.document.layout, coords) {
            Some(next) => self.commit_layout(next, "Delete Image"),
            None => false,
        }
    }

    pub fn update_caption(&mut self, coords: ItemCoords, caption: impl Into<String>) -> bool {
        if !self.document.layout.contains(coords) {
            return false;
        }
        let mut next = self.document.layout.clone();
        next.groups[coords.group].columns[coords.col].items[coords.item].caption = caption.into();
        self.commit_layout(next, "Edit Caption")
    }

    /// Adjust a column's width ratio by `delta`. Missing columns leave the
    /// layout and history untouched.
    pub fn update_width_ratio(&mut self, group: usize, col: usize, delta: f64) -> bool {
        match adjust::with_width_ratio(&self.document.layout, group, col, delta) {
            Some(next) => self.commit_layout(next, "Column Width"),
            None => false,
        }
    }

    pub fn update_flex(&mut self, coords: ItemCoords, delta: f64) -> bool {
        match adjust::with_flex(&self.document.layout, coords, delta) {
            Some(next) => self.commit_layout(next, "Image Height"),
            None => false,
        }
    }

    /// `steps` increments of the configured ratio step.
    pub fn nudge_width_ratio(&mut self, group: usize, col: usize, steps: i32) -> bool {
        self.update_width_ratio(group, col, steps as f64 * self.ratio_step)
    }

    pub fn nudge_flex(&mut self, coords: ItemCoords, steps: i32) -> bool {
        self.update_flex(coords, steps as f64 * self.ratio_step)
    }

    // ========================================================================
    // DRAG AND DROP
    // ========================================================================

    pub fn start_drag_from_pool(&mut self, id: ElementId) -> bool {
        match self.pool.get(id) {
            Some(image) => self.drag.start_from_pool(image),
            None => false,
        }
    }

    pub fn start_drag_from_grid(&mut self, coords: ItemCoords) -> bool {
        match self.document.layout.item_at(coords) {
            Some(item) => self.drag.start_from_grid(item, coords),
            None => false,
        }
    }

    pub fn hover(&mut self, target: DropTarget) {
        self.drag.hover(target);
    }

    pub fn leave_drop_target(&mut self) {
        self.drag.leave();
    }

    pub fn end_drag(&mut self) {
        self.drag.end();
    }

    /// First half of a drop whose reachability check runs elsewhere.
    pub fn begin_drop(&mut self, zone: DropZone) -> Result<PendingDrop, DropRejected> {
        self.drag.begin_drop(zone)
    }

    /// Second half: apply the pending drop if its image was reachable.
    pub fn complete_drop(&mut self, pending: PendingDrop, reachable: bool) -> DropOutcome {
        match self.drag.finish_drop(pending, reachable) {
            DropResolution::Stale => {
                log::debug!("ignoring result of a superseded drop");
                DropOutcome::Stale
            }
            DropResolution::Unreachable => {
                log::warn!("drop ignored: the image could not be loaded");
                DropOutcome::Unreachable
            }
            DropResolution::Apply(plan) => self.apply_drop(plan),
        }
    }

    /// Run a whole drop in one go, probing pool images with `probe`.
    pub fn drop_on<P: ImageProbe + ?Sized>(&mut self, zone: DropZone, probe: &P) -> DropOutcome {
        let pending = match self.drag.begin_drop(zone) {
            Ok(p) => p,
            Err(reason) => return DropOutcome::Rejected(reason),
        };
        let reachable = !pending.needs_reachability_check() || probe.is_reachable(&pending.image.src);
        self.complete_drop(pending, reachable)
    }

    fn apply_drop(&mut self, plan: DropPlan) -> DropOutcome {
        let empty_canvas = plan.zone == DropZone::EmptyCanvas;
        let (next, label) = match plan.image.origin {
            DragOrigin::Pool => {
                let mut item = plan.image.to_grid_item();
                if empty_canvas {
                    item.flex = DEFAULT_RATIO;
                }
                (grid_ops::insert(&self.document.layout, plan.target, item), "Add Image")
            }
            DragOrigin::Grid { coords, item_id } => {
                let next = grid_ops::move_item_with(&self.document.layout, coords, plan.target, Some(item_id), |item| {
                    if empty_canvas {
                        item.flex = DEFAULT_RATIO;
                    }
                });
                (next, "Move Image")
            }
        };
        let Some(tree) = next else {
            log::debug!("drop target {:?} does not fit the current layout", plan.target);
            return DropOutcome::Ignored;
        };
        if self.commit_layout(tree, label) {
            DropOutcome::Applied
        } else {
            DropOutcome::Ignored
        }
    }

    // ========================================================================
    // SELECTION
    // ========================================================================

    pub fn select(&mut self, coords: ItemCoords) -> bool {
        let Some(item) = self.document.layout.item_at(coords) else {
            return false;
        };
        let selection = Selection {
            coords,
            item_id: item.id,
        };
        self.set_selection(Some(selection));
        true
    }

    pub fn clear_selection(&mut self) {
        self.set_selection(None);
    }

    pub fn selection(&self) -> Option<SelectedItem> {
        self.selection.map(|s| s.coords)
    }

    pub fn selected_item(&self) -> Option<&GridItem> {
        self.document.layout.item_at(self.selection?.coords)
    }

    /// Called with the new selection every time it changes.
    pub fn on_selection_change(&mut self, listener: impl FnMut(Option<SelectedItem>) + Send + 'static) {
        self.selection_listener = Some(Box::new(listener));
    }

    fn set_selection(&mut self, next: Option<Selection>) {
        if self.selection == next {
            return;
        }
        self.selection = next;
        if let Some(listener) = self.selection_listener.as_mut() {
            listener(next.map(|s| s.coords));
        }
    }

    fn refresh_selection(&mut self) {
        let Some(selection) = self.selection else { return };
        let resolves = self
            .document
            .layout
            .item_at(selection.coords)
            .is_some_and(|item| item.id == selection.item_id);
        if !resolves {
            self.set_selection(None);
        }
    }

    // ========================================================================
    // DOCUMENT FIELDS AND INFO LIST
    // ========================================================================

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.document.title = title.into();
        self.mark_dirty();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.document.description = description.into();
        self.mark_dirty();
    }

    pub fn set_note(&mut self, note: impl Into<String>) {
        self.document.note = note.into();
        self.mark_dirty();
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.document.status = status.into();
        self.mark_dirty();
    }

    pub fn set_left_width(&mut self, left_width: f64) {
        if left_width.is_finite() {
            self.document.left_width = left_width.clamp(10.0, 90.0);
            self.mark_dirty();
        }
    }

    pub fn add_info_item(&mut self) -> ElementId {
        self.mark_dirty();
        info::add_info_item(&mut self.document.info_items)
    }

    pub fn update_info_item(&mut self, id: ElementId, field: InfoField, value: impl Into<String>) -> bool {
        let changed = info::update_info_item(&mut self.document.info_items, id, field, value);
        if changed {
            self.mark_dirty();
        }
        changed
    }

    pub fn delete_info_item(&mut self, id: ElementId) -> bool {
        let changed = info::delete_info_item(&mut self.document.info_items, id);
        if changed {
            self.mark_dirty();
        }
        changed
    }

    pub fn move_info_item(&mut self, index: usize, direction: isize) -> bool {
        let changed = info::move_info_item(&mut self.document.info_items, index, direction);
        if changed {
            self.mark_dirty();
        }
        changed
    }

    // ========================================================================
    // TOUR DATA
    // ========================================================================

    /// Apply tour search data according to the dialog's choices. Added images
    /// are probed in parallel; unreachable ones still join the pool with
    /// 800x600 dimensions. Returns the ids of the added pool images.
    pub fn apply_tour_data<P: ImageProbe + ?Sized>(
        &mut self,
        data: &TourData,
        selections: TourSelections,
        probe: &P,
    ) -> Vec<ElementId> {
        if selections.title == FieldChoice::Incoming {
            self.set_title(data.title.as_str());
        }
        if selections.description == FieldChoice::Incoming {
            self.set_description(data.description.as_str());
        }
        if selections.note == FieldChoice::Incoming {
            self.set_note(data.note.as_str());
        }
        if tour::apply_info(&mut self.document.info_items, &data.info, selections.info) {
            self.mark_dirty();
        }
        if selections.images != ImageChoice::Add || data.images.is_empty() {
            return Vec::new();
        }

        let probed: Vec<_> = data.images.par_iter().map(|img| probe.probe(&img.src)).collect();
        let ids: Vec<ElementId> = data
            .images
            .iter()
            .zip(probed)
            .map(|(img, dims)| {
                let mut image = PoolImage::new(img.src.as_str(), dims.unwrap_or(tour::FALLBACK_DIMENSIONS));
                image.caption = img.caption.clone();
                self.pool.add(image)
            })
            .collect();
        log::info!("added {} tour image(s) to the pool", ids.len());
        self.mark_dirty();
        ids
    }

    // ========================================================================
    // IMAGE POOL
    // ========================================================================

    /// Probe each source in parallel and add the loadable ones to the pool.
    /// Returns the new ids and the sources that could not be loaded.
    pub fn add_pool_images<P: ImageProbe + ?Sized>(&mut self, sources: &[String], probe: &P) -> (Vec<ElementId>, Vec<String>) {
        let probed: Vec<_> = sources.par_iter().map(|src| probe.probe(src)).collect();
        let mut added = Vec::new();
        let mut skipped = Vec::new();
        for (src, dims) in sources.iter().zip(probed) {
            match dims {
                Some(d) => added.push(self.pool.add(PoolImage::new(src.clone(), d))),
                None => skipped.push(src.clone()),
            }
        }
        if !skipped.is_empty() {
            log::warn!("{} image(s) could not be added to the pool", skipped.len());
        }
        (added, skipped)
    }

    /// Add the output of the image editor to the pool. With an uploader the
    /// image goes through [`Project::upload_pool_image`]; without one it
    /// stays local.
    pub fn add_edited_image(
        &mut self,
        edited: &EditedImage,
        local_src: &str,
        uploader: Option<&dyn ImageUploader>,
    ) -> Result<(ElementId, Option<UploadStatus>), UploadError> {
        let Some(uploader) = uploader else {
            return Ok((self.pool.add(PoolImage::new(local_src, edited.dimensions)), None));
        };
        let request = UploadRequest {
            local_src,
            dimensions: edited.dimensions,
            bytes: &edited.bytes,
            mime: EditedImage::MIME,
            file_name: edited.file_name.as_deref(),
        };
        let (id, status) = self.upload_pool_image(request, uploader)?;
        Ok((id, Some(status)))
    }

    pub fn remove_pool_image(&mut self, id: ElementId) -> bool {
        self.pool.remove(id).is_some()
    }

    /// Validate, add as `Uploading`, upload, and record the outcome. A failed
    /// upload leaves the image in the pool with its local source.
    pub fn upload_pool_image(
        &mut self,
        request: UploadRequest<'_>,
        uploader: &dyn ImageUploader,
    ) -> Result<(ElementId, UploadStatus), UploadError> {
        storage::validate_upload(request.bytes.len(), request.mime)?;
        let id = self.pool.add_uploading(request.local_src, request.dimensions);
        let result = uploader.upload(request.bytes, request.mime, request.file_name);
        let status = self.pool.set_upload_result(id, result)?;
        Ok((id, status))
    }

    // ========================================================================
    // JSON EXCHANGE
    // ========================================================================

    /// Replace the document with a JSON export. The layout change is a
    /// regular history entry; the pool is replaced by the imported images.
    pub fn import_json<P: ImageProbe + ?Sized>(&mut self, text: &str, probe: &P) -> Result<ImportReport, DocumentError> {
        let report = io::import_json(text, probe)?;
        self.apply_import(&report)?;
        Ok(report)
    }

    /// Commit an import. The layout goes first: if it is refused, the text
    /// fields and the pool stay as they were.
    pub fn apply_import(&mut self, report: &ImportReport) -> Result<(), DocumentError> {
        if let Some(layout) = &report.layout {
            layout.validate()?;
            if !self.commit_layout(layout.clone(), "Import JSON") {
                return Err(DocumentError::InvalidFormat("imported layout was refused".into()));
            }
        }
        report.apply_metadata(&mut self.document);
        self.pool.clear();
        self.pool.extend(report.pool_images.iter().cloned());
        self.mark_dirty();
        Ok(())
    }

    pub fn export_json(&self) -> Result<String, DocumentError> {
        io::export_json(&self.document)
    }

    // ========================================================================

    /// Pick up changed preferences. A smaller undo limit drops the oldest
    /// entries right away.
    pub fn apply_settings(&mut self, settings: &EditorSettings) {
        self.history.set_max_history_size(settings.max_undo_steps);
        self.ratio_step = settings.ratio_step;
        self.default_json_file_name = settings.default_json_file_name.clone();
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    pub fn update_name_from_path(&mut self) {
        if let Some(ref path) = self.path {
            self.name = path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "Unknown".to_string());
        }
    }

    /// File name offered for a JSON export: the project's own stem, or the
    /// configured default for untitled projects.
    pub fn export_file_name(&self) -> String {
        self.path
            .as_deref()
            .and_then(Path::file_stem)
            .map(|stem| format!("{}.json", stem.to_string_lossy()))
            .unwrap_or_else(|| self.default_json_file_name.clone())
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::components::drag::DragState;
    use crate::components::drop_target::DropPosition;
    use crate::layout::{Column, RowGroup};
    use crate::probe::KnownImages;

    fn item(src: &str) -> GridItem {
        GridItem::new(src, ImageDimensions::new(100, 100), src)
    }

    fn project_with(shape: &[&[&[&str]]]) -> Project {
        let mut doc = Document::new();
        doc.layout = LayoutTree::from_groups(
            shape
                .iter()
                .map(|cols| RowGroup {
                    id: ElementId::new(),
                    columns: cols
                        .iter()
                        .map(|items| Column {
                            id: ElementId::new(),
                            items: items.iter().map(|s| item(s)).collect(),
                            width_ratio: 1.0,
                        })
                        .collect(),
                })
                .collect(),
        );
        Project::from_parts(doc, ImagePool::new(), &EditorSettings::default())
    }

    fn srcs(project: &Project) -> Vec<Vec<Vec<String>>> {
        project
            .layout()
            .groups
            .iter()
            .map(|g| {
                g.columns
                    .iter()
                    .map(|c| c.items.iter().map(|i| i.src.clone()).collect())
                    .collect()
            })
            .collect()
    }

    fn add_to_pool(project: &mut Project, src: &str) -> ElementId {
        project.pool.add(PoolImage::new(src, ImageDimensions::new(10, 10)))
    }

    #[test]
    fn pool_drop_stacks_between_items() {
        let mut p = project_with(&[&[&["a", "b"]]]);
        let x = add_to_pool(&mut p, "x");
        assert!(p.start_drag_from_pool(x));
        p.hover(DropTarget::stack(DropPosition::StackAbove, 0, 0, 1));
        let probe = KnownImages::new().with("x", 10, 10);
        assert_eq!(p.drop_on(DropZone::Target, &probe), DropOutcome::Applied);
        assert_eq!(srcs(&p), vec![vec![vec!["a", "x", "b"]]]);
        assert!(p.can_undo());
        assert_eq!(p.drag().state(), DragState::Idle);
        assert_eq!(p.layout().groups[0].columns[0].items[1].flex, 1.0);
    }

    #[test]
    fn unreachable_pool_drop_changes_nothing() {
        let mut p = project_with(&[&[&["a"]]]);
        let before = p.layout().clone();
        let x = add_to_pool(&mut p, "broken");
        p.start_drag_from_pool(x);
        p.hover(DropTarget::new_group());
        assert_eq!(p.drop_on(DropZone::Target, &KnownImages::new()), DropOutcome::Unreachable);
        assert_eq!(p.layout(), &before);
        assert!(!p.can_undo());
        assert_eq!(p.drag().state(), DragState::Idle);
        assert_eq!(p.drag().drop_target(), None);
    }

    #[test]
    fn moving_sole_item_applies_group_correction() {
        let mut p = project_with(&[&[&["a"]], &[&["b"], &["c"]]]);
        p.start_drag_from_grid(ItemCoords::new(0, 0, 0));
        p.hover(DropTarget::column(DropPosition::NewColRight, 1, 1));
        assert_eq!(p.drop_on(DropZone::Target, &KnownImages::new()), DropOutcome::Applied);
        assert_eq!(srcs(&p), vec![vec![vec!["b"], vec!["c"], vec!["a"]]]);
    }

    #[test]
    fn empty_canvas_drop_resets_flex() {
        let mut p = project_with(&[&[&["a", "b"]]]);
        assert!(p.update_flex(ItemCoords::new(0, 0, 0), 1.0));
        p.start_drag_from_grid(ItemCoords::new(0, 0, 0));
        assert_eq!(p.drop_on(DropZone::EmptyCanvas, &KnownImages::new()), DropOutcome::Applied);
        assert_eq!(srcs(&p), vec![vec![vec!["b"]], vec![vec!["a"]]]);
        assert_eq!(p.layout().groups[1].columns[0].items[0].flex, 1.0);
    }

    #[test]
    fn grid_move_keeps_flex() {
        let mut p = project_with(&[&[&["a"], &["b"]]]);
        p.update_flex(ItemCoords::new(0, 0, 0), 0.5);
        p.start_drag_from_grid(ItemCoords::new(0, 0, 0));
        p.hover(DropTarget::stack(DropPosition::StackBelow, 0, 1, 0));
        assert_eq!(p.drop_on(DropZone::Target, &KnownImages::new()), DropOutcome::Applied);
        assert_eq!(srcs(&p), vec![vec![vec!["b", "a"]]]);
        assert_eq!(p.layout().groups[0].columns[0].items[1].flex, 1.5);
    }

    #[test]
    fn drag_from_a_changed_tree_is_ignored() {
        let mut p = project_with(&[&[&["a", "b"]]]);
        p.start_drag_from_grid(ItemCoords::new(0, 0, 0));
        p.hover(DropTarget::new_group());
        let pending = p.begin_drop(DropZone::Target).unwrap();
        assert!(p.delete_item(ItemCoords::new(0, 0, 0)));
        let history_len = p.history().undo_count();
        assert_eq!(p.complete_drop(pending, true), DropOutcome::Ignored);
        assert_eq!(srcs(&p), vec![vec![vec!["b"]]]);
        assert_eq!(p.history().undo_count(), history_len);
    }

    #[test]
    fn drop_without_hover_is_rejected() {
        let mut p = project_with(&[&[&["a"]]]);
        p.start_drag_from_grid(ItemCoords::new(0, 0, 0));
        assert_eq!(
            p.drop_on(DropZone::Target, &KnownImages::new()),
            DropOutcome::Rejected(DropRejected::NoTarget)
        );
        assert_eq!(p.drop_on(DropZone::Target, &KnownImages::new()), DropOutcome::Rejected(DropRejected::NoDrag));
    }

    #[test]
    fn undo_redo_round_trip() {
        let mut p = project_with(&[&[&["a"]], &[&["b"]]]);
        let original = p.layout().clone();
        assert!(!p.undo());
        assert!(p.delete_item(ItemCoords::new(0, 0, 0)));
        let after = p.layout().clone();
        assert!(p.undo());
        assert_eq!(p.layout(), &original);
        assert!(p.redo());
        assert_eq!(p.layout(), &after);
        assert!(!p.redo());
    }

    #[test]
    fn out_of_range_adjustments_record_nothing() {
        let mut p = project_with(&[&[&["a"]]]);
        assert!(!p.update_width_ratio(0, 3, 0.1));
        assert!(!p.update_flex(ItemCoords::new(2, 0, 0), 0.1));
        assert!(!p.can_undo());

        assert!(p.update_width_ratio(0, 0, 10.0));
        assert_eq!(p.layout().groups[0].columns[0].width_ratio, 4.0);
        assert!(p.update_width_ratio(0, 0, 0.1));
        assert_eq!(p.layout().groups[0].columns[0].width_ratio, 4.0);
        assert_eq!(p.history().undo_count(), 2);

        assert!(p.nudge_flex(ItemCoords::new(0, 0, 0), -3));
        assert_eq!(p.layout().groups[0].columns[0].items[0].flex, 0.7);
    }

    #[test]
    fn selection_follows_the_item() {
        let mut p = project_with(&[&[&["a", "b"]]]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        p.on_selection_change(move |s| sink.lock().unwrap().push(s));

        assert!(p.select(ItemCoords::new(0, 0, 1)));
        assert!(p.select(ItemCoords::new(0, 0, 1)));
        assert!(p.update_caption(ItemCoords::new(0, 0, 1), "B"));
        assert_eq!(p.selected_item().map(|i| i.caption.as_str()), Some("B"));

        assert!(p.delete_item(ItemCoords::new(0, 0, 1)));
        assert_eq!(p.selection(), None);
        assert_eq!(*seen.lock().unwrap(), vec![Some(ItemCoords::new(0, 0, 1)), None]);

        assert!(!p.select(ItemCoords::new(0, 0, 5)));
    }

    #[test]
    fn import_goes_through_history() {
        let mut p = project_with(&[&[&["a"]]]);
        add_to_pool(&mut p, "old.png");
        let before = p.layout().clone();
        let json = r#"{ "TITLE": "Museum", "STATUS": "draft",
            "INNER_IMAGES": [ { "IMAGE_SRC": "x", "TITLE": "X" }, { "IMAGE_SRC": "gone" } ] }"#;
        let probe = KnownImages::new().with("x", 4, 3);
        let report = p.import_json(json, &probe).unwrap();
        assert_eq!(report.skipped, vec!["gone".to_string()]);
        assert_eq!(p.document().title, "Museum");
        assert_eq!(srcs(&p), vec![vec![vec!["x"]]]);
        assert_eq!(p.pool.len(), 1);
        assert_eq!(p.pool.images()[0].src, "x");
        assert_eq!(p.history().undo_description(), Some("Import JSON"));
        assert!(p.undo());
        assert_eq!(p.layout(), &before);

        // A second import replaces the pool instead of piling up copies.
        p.import_json(json, &probe).unwrap();
        assert_eq!(p.pool.len(), 1);
    }

    #[test]
    fn refused_import_changes_nothing() {
        let mut p = project_with(&[&[&["a"]]]);
        add_to_pool(&mut p, "old.png");
        let mut report = io::import_json(r#"{ "TITLE": "Other" }"#, &KnownImages::new()).unwrap();
        report.layout = Some(LayoutTree::from_groups(vec![RowGroup {
            id: ElementId::new(),
            columns: Vec::new(),
        }]));

        assert!(matches!(p.apply_import(&report), Err(DocumentError::Layout(_))));
        assert_eq!(p.document().title, "");
        assert_eq!(p.pool.images()[0].src, "old.png");
        assert!(!p.can_undo());
        assert!(p.import_json("{ not json", &KnownImages::new()).is_err());
        assert_eq!(p.pool.len(), 1);
    }

    struct FakeUploader(Result<String, UploadError>);

    impl ImageUploader for FakeUploader {
        fn upload(&self, _bytes: &[u8], _mime: &str, _file_name: Option<&str>) -> Result<String, UploadError> {
            self.0.clone()
        }
    }

    #[test]
    fn uploads_transition_once() {
        let mut p = project_with(&[]);
        let request = || UploadRequest {
            local_src: "blob:1",
            dimensions: ImageDimensions::new(2, 2),
            bytes: &[0u8; 16],
            mime: "image/png",
            file_name: Some("hall"),
        };
        let ok = FakeUploader(Ok("https://cdn/exhibits/hall.webp".into()));
        let (id, status) = p.upload_pool_image(request(), &ok).unwrap();
        assert_eq!(status, UploadStatus::Success);
        assert_eq!(p.pool.get(id).unwrap().src, "https://cdn/exhibits/hall.webp");

        let failing = FakeUploader(Err(UploadError::Failed("503".into())));
        let (id, status) = p.upload_pool_image(request(), &failing).unwrap();
        assert_eq!(status, UploadStatus::Error);
        assert_eq!(p.pool.get(id).unwrap().src, "blob:1");

        let gif = UploadRequest {
            mime: "image/gif",
            ..request()
        };
        assert!(p.upload_pool_image(gif, &ok).is_err());
        assert_eq!(p.pool.len(), 2);
    }

    #[test]
    fn info_list_edits_mark_dirty() {
        let mut p = project_with(&[]);
        assert!(!p.is_dirty);
        let id = p.add_info_item();
        assert!(p.is_dirty);
        assert!(p.update_info_item(id, InfoField::Title, "Fees"));
        assert!(p.move_info_item(1, -1));
        assert_eq!(p.document().info_items[0].title, "Fees");
        assert!(p.delete_info_item(id));
        assert_eq!(p.document().info_items.len(), 1);
    }

    #[test]
    fn save_and_open_native_project() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tour.tfe");
        let mut p = project_with(&[&[&["a"], &["b"]]]);
        p.set_title("Saved");
        add_to_pool(&mut p, "pool.png");
        assert_eq!(p.export_file_name(), "DT_EX0000.json");
        p.save(&path).unwrap();
        assert!(!p.is_dirty);
        assert_eq!(p.display_title(), "tour.tfe");
        assert_eq!(p.export_file_name(), "tour.json");

        let (opened, skipped) = Project::open(&path, &EditorSettings::default(), &KnownImages::new()).unwrap();
        assert!(skipped.is_empty());
        assert_eq!(opened.document(), p.document());
        assert_eq!(opened.pool.len(), 1);
        assert!(!opened.can_undo());
    }

    #[test]
    fn add_pool_images_reports_failures() {
        let mut p = project_with(&[]);
        let probe = KnownImages::new().with("a", 1, 1).with("c", 1, 1);
        let sources: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let (added, skipped) = p.add_pool_images(&sources, &probe);
        assert_eq!(added.len(), 2);
        assert_eq!(skipped, vec!["b".to_string()]);
    }

    #[test]
    fn tour_data_follows_selections() {
        use crate::components::tour::{InfoChoice, TourImage, TourInfo};

        let mut p = project_with(&[]);
        p.set_title("Mine");
        p.set_note("keep me");
        p.mark_clean();
        let data = TourData {
            title: "Gyeongbokgung".into(),
            description: "Palace".into(),
            note: "theirs".into(),
            info: vec![TourInfo::new("Opening Hours", ""), TourInfo::new("Fee", "3,000")],
            images: vec![
                TourImage { src: "front.jpg".into(), caption: "Front gate".into() },
                TourImage { src: "https://far.away/hall.jpg".into(), caption: String::new() },
            ],
        };
        let selections = TourSelections {
            title: FieldChoice::Incoming,
            description: FieldChoice::Incoming,
            note: FieldChoice::Current,
            info: InfoChoice::Merge,
            images: ImageChoice::Add,
        };
        let probe = KnownImages::new().with("front.jpg", 1200, 800);

        let ids = p.apply_tour_data(&data, selections, &probe);
        assert!(p.is_dirty);
        assert_eq!(p.document().title, "Gyeongbokgung");
        assert_eq!(p.document().description, "Palace");
        assert_eq!(p.document().note, "keep me");
        // The empty default "Opening Hours" row already matches.
        assert_eq!(p.document().info_items.len(), 2);
        assert_eq!(p.document().info_items[1].content, "3,000");

        assert_eq!(ids.len(), 2);
        let front = p.pool.get(ids[0]).unwrap();
        assert_eq!(front.dimensions, ImageDimensions::new(1200, 800));
        assert_eq!(front.caption, "Front gate");
        assert_eq!(p.pool.get(ids[1]).unwrap().dimensions, ImageDimensions::new(800, 600));
        assert!(!p.can_undo());

        let skip = TourSelections::default();
        assert!(p.apply_tour_data(&data, skip, &probe).is_empty());
        assert_eq!(p.pool.len(), 2);
    }

    #[test]
    fn edited_images_join_the_pool() {
        let mut p = project_with(&[]);
        let edited = EditedImage {
            bytes: vec![0u8; 32],
            dimensions: ImageDimensions::new(640, 480),
            file_name: Some("hall".into()),
        };

        let (local, status) = p.add_edited_image(&edited, "blob:local", None).unwrap();
        assert_eq!(status, None);
        assert_eq!(p.pool.get(local).unwrap().src, "blob:local");

        let ok = FakeUploader(Ok("https://cdn/exhibits/hall.webp".into()));
        let (id, status) = p.add_edited_image(&edited, "blob:2", Some(&ok)).unwrap();
        assert_eq!(status, Some(UploadStatus::Success));
        let uploaded = p.pool.get(id).unwrap();
        assert_eq!(uploaded.src, "https://cdn/exhibits/hall.webp");
        assert_eq!(uploaded.dimensions, ImageDimensions::new(640, 480));
    }

    #[test]
    fn settings_changes_reach_an_open_project() {
        let mut p = project_with(&[&[&["a"]]]);
        for _ in 0..5 {
            assert!(p.nudge_flex(ItemCoords::new(0, 0, 0), 1));
        }
        assert_eq!(p.history().undo_count(), 5);

        let settings = EditorSettings {
            max_undo_steps: 3,
            ratio_step: 0.5,
            default_json_file_name: "DT_EX0042.json".into(),
            ..EditorSettings::default()
        };
        p.apply_settings(&settings);
        assert_eq!(p.history().undo_count(), 3);
        assert_eq!(p.export_file_name(), "DT_EX0042.json");

        assert!(p.nudge_flex(ItemCoords::new(0, 0, 0), 1));
        assert_eq!(p.layout().groups[0].columns[0].items[0].flex, 2.0);
        assert_eq!(p.history().undo_count(), 3);
    }
}
