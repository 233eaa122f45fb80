//! Outbound notifications for whatever renders or mirrors the chunk meshes.

use std::sync::Arc;

use quarry_mesh::MeshBuffers;
use quarry_physics::{ColliderHandle, RigidBodyHandle};
use quarry_voxel::ChunkLevel;

use crate::tree::MeshId;

/// Receives mesh lifecycle events from the scheduler and the mining path.
///
/// Every id passed to `mesh_created` is later followed by exactly one of
/// `mesh_destroyed` or `mesh_detached`; a detached id is followed by
/// `debris_removed` once its body expires.
pub trait RenderSink {
    fn mesh_created(&mut self, id: MeshId, level: ChunkLevel, buffers: &Arc<MeshBuffers>);

    fn mesh_destroyed(&mut self, id: MeshId);

    fn collider_attached(&mut self, _id: MeshId, _collider: ColliderHandle) {}

    /// The mesh left the tree and now follows a dynamic debris body.
    fn mesh_detached(&mut self, _id: MeshId, _body: RigidBodyHandle) {}

    fn debris_removed(&mut self, _id: MeshId) {}
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn mesh_created(&mut self, _id: MeshId, _level: ChunkLevel, _buffers: &Arc<MeshBuffers>) {}

    fn mesh_destroyed(&mut self, _id: MeshId) {}
}

/// A recorded sink event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkEvent {
    Created { id: MeshId, level: ChunkLevel, vertices: usize },
    Destroyed(MeshId),
    ColliderAttached(MeshId),
    Detached(MeshId),
    DebrisRemoved(MeshId),
}

/// Keeps every event in order, plus running totals of live meshes.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
    live: usize,
    live_vertices: usize,
    vertex_counts: Vec<(MeshId, usize)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Meshes created and not yet destroyed or detached.
    pub fn live_meshes(&self) -> usize {
        self.live
    }

    /// Total vertices across live meshes.
    pub fn live_vertices(&self) -> usize {
        self.live_vertices
    }

    pub fn count(&self, pred: impl Fn(&SinkEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    fn retire(&mut self, id: MeshId) {
        if let Some(at) = self.vertex_counts.iter().position(|(m, _)| *m == id) {
            let (_, vertices) = self.vertex_counts.swap_remove(at);
            self.live -= 1;
            self.live_vertices -= vertices;
        }
    }
}

impl RenderSink for RecordingSink {
    fn mesh_created(&mut self, id: MeshId, level: ChunkLevel, buffers: &Arc<MeshBuffers>) {
        let vertices = buffers.vertex_count();
        self.events.push(SinkEvent::Created {
            id,
            level,
            vertices,
        });
        self.vertex_counts.push((id, vertices));
        self.live += 1;
        self.live_vertices += vertices;
    }

    fn mesh_destroyed(&mut self, id: MeshId) {
        self.events.push(SinkEvent::Destroyed(id));
        self.retire(id);
    }

    fn collider_attached(&mut self, id: MeshId, _collider: ColliderHandle) {
        self.events.push(SinkEvent::ColliderAttached(id));
    }

    fn mesh_detached(&mut self, id: MeshId, _body: RigidBodyHandle) {
        self.events.push(SinkEvent::Detached(id));
        self.retire(id);
    }

    fn debris_removed(&mut self, id: MeshId) {
        self.events.push(SinkEvent::DebrisRemoved(id));
    }
}
