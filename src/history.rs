/*!
Time series recording of sheet state.

A [`History`] snapshots a configurable set of columns at explicit time
points. Because faces are only ever soft deleted and arenas never compacted,
row indices stay comparable across frames and a recorded simulation can be
replayed or analyzed column by column.
*/

use crate::{
    element::{FaceStatus, Handle},
    sheet::Sheet,
};
use glam::DVec3;
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum VertColumn {
    Position,
    IsActive,
    Height,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum EdgeColumn {
    Endpoints,
    Face,
    Length,
    LineTension,
    IsAnchor,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum FaceColumn {
    Status,
    Area,
    Perimeter,
    Volume,
}

/**
 * The set of columns a [`History`] snapshots on every
 * [`record`](History::record) call.
 */
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Columns {
    pub vert: Vec<VertColumn>,
    pub edge: Vec<EdgeColumn>,
    pub face: Vec<FaceColumn>,
}

impl Columns {
    /// Positions and connectivity, enough to replay the tissue shape.
    pub fn minimal() -> Self {
        Columns {
            vert: vec![VertColumn::Position],
            edge: vec![EdgeColumn::Endpoints, EdgeColumn::Face],
            face: vec![FaceColumn::Status],
        }
    }

    /// Every recordable column.
    pub fn full() -> Self {
        Columns {
            vert: vec![VertColumn::Position, VertColumn::IsActive, VertColumn::Height],
            edge: vec![
                EdgeColumn::Endpoints,
                EdgeColumn::Face,
                EdgeColumn::Length,
                EdgeColumn::LineTension,
                EdgeColumn::IsAnchor,
            ],
            face: vec![
                FaceColumn::Status,
                FaceColumn::Area,
                FaceColumn::Perimeter,
                FaceColumn::Volume,
            ],
        }
    }
}

impl Default for Columns {
    fn default() -> Self {
        Columns::minimal()
    }
}

/**
 * One snapshot of the recorded columns. Columns that were not requested, or
 * not available on the sheet, are `None`.
 */
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Frame {
    pub time: f64,
    pub positions: Option<Vec<DVec3>>,
    pub active: Option<Vec<bool>>,
    pub heights: Option<Vec<f64>>,
    pub endpoints: Option<Vec<(u32, u32)>>,
    pub edge_faces: Option<Vec<Option<u32>>>,
    pub lengths: Option<Vec<f64>>,
    pub line_tensions: Option<Vec<f64>>,
    pub anchor_flags: Option<Vec<bool>>,
    pub statuses: Option<Vec<FaceStatus>>,
    pub areas: Option<Vec<f64>>,
    pub perimeters: Option<Vec<f64>>,
    pub volumes: Option<Vec<f64>>,
}

/**
 * An append-only series of [`Frame`]s recorded at increasing times.
 */
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct History {
    columns: Columns,
    frames: Vec<Frame>,
}

impl History {
    pub fn new(columns: Columns) -> Self {
        History {
            columns,
            frames: Vec::new(),
        }
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Snapshots the configured columns of the sheet at the given time.
    ///
    /// Recording out of order is tolerated with a warning; retrieval assumes
    /// frames sorted by time. Requesting the anchor flag column on a sheet
    /// without the anchoring capability warns and leaves that column empty
    /// rather than failing the whole frame.
    pub fn record(&mut self, sheet: &Sheet, time: f64) {
        if let Some(last) = self.frames.last() {
            if time < last.time {
                warn!(
                    "recording frame at t = {time} before the latest frame at t = {}",
                    last.time
                );
            }
        }
        let mut frame = Frame {
            time,
            ..Frame::default()
        };
        for column in &self.columns.vert {
            match column {
                VertColumn::Position => frame.positions = Some(sheet.positions().to_vec()),
                VertColumn::IsActive => {
                    frame.active = Some(sheet.vertices().map(|v| sheet.is_active(v)).collect())
                }
                VertColumn::Height => {
                    frame.heights = Some(sheet.vertices().map(|v| sheet.height(v)).collect())
                }
            }
        }
        for column in &self.columns.edge {
            match column {
                EdgeColumn::Endpoints => {
                    frame.endpoints = Some(
                        sheet
                            .halfedges()
                            .map(|h| (sheet.srce(h).index(), sheet.trgt(h).index()))
                            .collect(),
                    )
                }
                EdgeColumn::Face => {
                    frame.edge_faces = Some(
                        sheet
                            .halfedges()
                            .map(|h| sheet.face(h).map(|f| f.index()))
                            .collect(),
                    )
                }
                EdgeColumn::Length => {
                    frame.lengths = Some(sheet.halfedges().map(|h| sheet.length(h)).collect())
                }
                EdgeColumn::LineTension => {
                    frame.line_tensions =
                        Some(sheet.halfedges().map(|h| sheet.line_tension(h)).collect())
                }
                EdgeColumn::IsAnchor => {
                    if sheet.has_anchors() {
                        frame.anchor_flags = Some(
                            sheet
                                .halfedges()
                                .map(|h| sheet.is_anchor_halfedge(h))
                                .collect(),
                        );
                    } else {
                        warn!("anchor flags requested without the anchoring capability");
                    }
                }
            }
        }
        for column in &self.columns.face {
            match column {
                FaceColumn::Status => {
                    frame.statuses = Some(sheet.faces().map(|f| sheet.status(f)).collect())
                }
                FaceColumn::Area => {
                    frame.areas = Some(sheet.faces().map(|f| sheet.area(f)).collect())
                }
                FaceColumn::Perimeter => {
                    frame.perimeters =
                        Some(sheet.faces().map(|f| sheet.perimeter(f)).collect())
                }
                FaceColumn::Volume => {
                    frame.volumes = Some(sheet.faces().map(|f| sheet.volume(f)).collect())
                }
            }
        }
        self.frames.push(frame);
    }

    /// The latest frame recorded at or before the given time, if any.
    pub fn retrieve(&self, time: f64) -> Option<&Frame> {
        self.frames.iter().rev().find(|frame| frame.time <= time)
    }
}

#[cfg(test)]
mod test {
    use super::{Columns, EdgeColumn, History};
    use crate::{lattice::hexagonal_sheet, macros::assert_f64_eq};
    use glam::DVec3;

    #[test]
    fn t_record_and_retrieve() {
        let mut sheet = hexagonal_sheet(2, 2).expect("Cannot build lattice");
        let mut history = History::new(Columns::minimal());
        history.record(&sheet, 0.0);
        sheet.set_position(0.into(), DVec3::new(10.0, 0.0, 0.0));
        history.record(&sheet, 1.0);
        assert_eq!(history.num_frames(), 2);
        let frame = history.retrieve(0.5).expect("Frame exists at t <= 0.5");
        assert_f64_eq!(frame.time, 0.0);
        let positions = frame.positions.as_ref().expect("Positions recorded");
        assert_ne!(positions[0], DVec3::new(10.0, 0.0, 0.0));
        let frame = history.retrieve(5.0).expect("Frame exists at t <= 5");
        assert_f64_eq!(frame.time, 1.0);
        let positions = frame.positions.as_ref().expect("Positions recorded");
        assert_eq!(positions[0], DVec3::new(10.0, 0.0, 0.0));
        assert!(history.retrieve(-1.0).is_none());
    }

    #[test]
    fn t_minimal_columns_skip_the_rest() {
        let sheet = hexagonal_sheet(1, 1).expect("Cannot build lattice");
        let mut history = History::new(Columns::minimal());
        history.record(&sheet, 0.0);
        let frame = &history.frames()[0];
        assert!(frame.positions.is_some());
        assert!(frame.endpoints.is_some());
        assert!(frame.edge_faces.is_some());
        assert!(frame.statuses.is_some());
        assert!(frame.lengths.is_none());
        assert!(frame.areas.is_none());
    }

    #[test]
    fn t_anchor_column_needs_capability() {
        let mut sheet = hexagonal_sheet(1, 1).expect("Cannot build lattice");
        let mut history = History::new(Columns::full());
        history.record(&sheet, 0.0);
        assert!(history.frames()[0].anchor_flags.is_none());
        sheet.create_anchors();
        history.record(&sheet, 1.0);
        let flags = history.frames()[1]
            .anchor_flags
            .as_ref()
            .expect("Capability enabled");
        assert_eq!(flags.iter().filter(|anchor| **anchor).count(), 6);
    }

    #[test]
    fn t_frames_grow_with_topology() {
        let mut sheet = hexagonal_sheet(3, 3).expect("Cannot build lattice");
        let mut history = History::new(Columns::minimal());
        history.record(&sheet, 0.0);
        let f = sheet
            .faces()
            .find(|f| sheet.face_halfedges(*f).all(|h| sheet.opposite(h).is_some()))
            .expect("Patch has an interior face");
        sheet.cell_division(f, false).expect("Cannot divide");
        history.record(&sheet, 1.0);
        let (a, b) = (&history.frames()[0], &history.frames()[1]);
        let na = a.endpoints.as_ref().expect("Endpoints recorded").len();
        let nb = b.endpoints.as_ref().expect("Endpoints recorded").len();
        assert_eq!(nb, na + 6);
        assert_eq!(
            b.statuses.as_ref().expect("Statuses recorded").len(),
            a.statuses.as_ref().expect("Statuses recorded").len() + 1
        );
    }
}
