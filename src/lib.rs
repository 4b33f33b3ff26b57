//! Layout engine for tour/exhibit documents: a grid of row groups, columns
//! and stacked images, mutated by drag-and-drop and recorded in a bounded
//! undo/redo history.

pub mod cli;
pub mod components;
pub mod document;
pub mod error;
pub mod io;
pub mod keys;
pub mod layout;
pub mod logger;
pub mod ops;
pub mod probe;
pub mod project;
pub mod settings;
pub mod storage;

pub use components::drag::{DragSession, DragState, DropZone};
pub use components::drop_target::{DropPosition, DropTarget};
pub use components::history::HistoryManager;
pub use document::Document;
pub use error::{DocumentError, LayoutError};
pub use layout::{Column, ElementId, GridItem, ImageDimensions, ItemCoords, LayoutTree, RowGroup};
pub use probe::{FsImageProbe, ImageProbe};
pub use project::{DropOutcome, Project};
